//! # Exit Session
//!
//! Holds the one document an operator is working on.
//!
//! ## Concurrency
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  search("A") ─ticket 1──────────────────────────► result A: stale       │
//! │        search("B") ─ticket 2──────► result B: current, loaded           │
//! │                                                                         │
//! │  save() ──try_lock──► running ──► reload from store                     │
//! │        save() ──try_lock──► busy ──► BillingError::SaveInProgress       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Edits go through [`ExitSession::with_document_mut`] and are synchronous;
//! the document lock is never held across an await.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

use depot_core::{CoreResult, ExitDocument, ExitStatus};

use crate::context::UserContext;
use crate::error::{BillingError, BillingResult};
use crate::persister::ExitPersister;
use crate::resolver::{ExitResolver, Resolution, ResolveState};

/// What happened to a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    /// The result is now the session's document.
    Loaded(ResolveState),
    /// A newer search started before this one finished; the result was dropped.
    Superseded,
}

pub struct ExitSession {
    resolver: Arc<ExitResolver>,
    persister: Arc<ExitPersister>,
    current: Mutex<Option<Resolution>>,
    generation: AtomicU64,
    saving: tokio::sync::Mutex<()>,
}

impl ExitSession {
    pub fn new(resolver: Arc<ExitResolver>, persister: Arc<ExitPersister>) -> Self {
        ExitSession {
            resolver,
            persister,
            current: Mutex::new(None),
            generation: AtomicU64::new(0),
            saving: tokio::sync::Mutex::new(()),
        }
    }

    fn current(&self) -> MutexGuard<'_, Option<Resolution>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ticket(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_current(&self, ticket: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == ticket
    }

    /// Resolves `key` and makes the result the session's document, unless a
    /// later search has started in the meantime.
    ///
    /// Errors of a superseded search are dropped as well. A failed current
    /// search leaves the session without a document.
    pub async fn search(&self, key: &str) -> BillingResult<SearchOutcome> {
        let ticket = self.ticket();
        let result = self.resolver.resolve(key).await;

        if !self.is_current(ticket) {
            debug!(key, ticket, "Discarding superseded search result");
            return Ok(SearchOutcome::Superseded);
        }

        match result {
            Ok(resolution) => {
                let state = resolution.state;
                *self.current() = Some(resolution);
                Ok(SearchOutcome::Loaded(state))
            }
            Err(e) => {
                *self.current() = None;
                Err(e)
            }
        }
    }

    /// State of the loaded document.
    pub fn state(&self) -> Option<ResolveState> {
        self.current().as_ref().map(|r| r.state)
    }

    /// Reads the loaded document.
    pub fn with_document<R>(&self, f: impl FnOnce(&ExitDocument) -> R) -> BillingResult<R> {
        let current = self.current();
        let resolution = current.as_ref().ok_or(BillingError::NoDocument)?;
        Ok(f(&resolution.document))
    }

    /// Edits the loaded document with one of its mutators.
    ///
    /// ```ignore
    /// session.with_document_mut(|doc| doc.set_weights(0, 12_400, 4_100))?;
    /// ```
    pub fn with_document_mut<R>(
        &self,
        f: impl FnOnce(&mut ExitDocument) -> CoreResult<R>,
    ) -> BillingResult<R> {
        let mut current = self.current();
        let resolution = current.as_mut().ok_or(BillingError::NoDocument)?;
        Ok(f(&mut resolution.document)?)
    }

    /// Saves the loaded document and reloads it from the store.
    ///
    /// Only one save runs at a time; a concurrent call fails with
    /// `SaveInProgress` without touching the store.
    pub async fn save(&self, status: ExitStatus, user: &UserContext) -> BillingResult<i64> {
        let _guard = self.saving.try_lock().map_err(|_| BillingError::SaveInProgress)?;

        let ticket = self.generation.load(Ordering::SeqCst);
        let document = self.with_document(|doc| doc.clone())?;

        let exit_id = self.persister.save(&document, status, user).await?;
        let reloaded = self.resolver.load(exit_id).await?;

        if self.is_current(ticket) {
            *self.current() = Some(reloaded);
        }

        info!(exit_id, status = %status, "Session document saved");
        Ok(exit_id)
    }

    /// Deletes the loaded draft and clears the session.
    pub async fn delete(&self, user: &UserContext) -> BillingResult<()> {
        let _guard = self.saving.try_lock().map_err(|_| BillingError::SaveInProgress)?;

        let (id, is_final) = self.with_document(|doc| (doc.id, doc.is_final()))?;
        if is_final {
            return Err(BillingError::immutable(id));
        }
        let id = id.ok_or(BillingError::NoDocument)?;

        self.persister.delete(id, user).await?;
        *self.current() = None;
        Ok(())
    }

    /// Drops the loaded document.
    pub fn clear(&self) {
        self.ticket();
        *self.current() = None;
    }
}
