//! # Exit Persister
//!
//! Writes a document back to the store as a header plus its lines.
//!
//! ## Save Plans
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  guard      final in memory or in the store ──► ImmutableDocument       │
//! │             header/line rules               ──► Validation              │
//! │             (nothing written yet)                                       │
//! │                                                                         │
//! │  new        insert_header ─► assign_reference ─► insert_items           │
//! │             undo: delete items + header                                 │
//! │                                                                         │
//! │  draft      update_header ─► replace_items                              │
//! │             undo: restore previous header, restore previous lines       │
//! │                                                                         │
//! │  delete     remove_items ─► remove_header                               │
//! │             undo: restore previous lines                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Any step failure surfaces as `BillingError::PersistenceFailure` after the
//! completed steps have been compensated.

use async_trait::async_trait;
use tracing::{error, info};

use depot_core::normalize::from_exit_item;
use depot_core::validation::validate_exit_document;
use depot_core::{ExitDocument, ExitHeader, ExitHeaderInput, ExitLineItem, ExitStatus};
use depot_db::{DbError, DbResult};

use crate::context::UserContext;
use crate::error::{BillingError, BillingResult};
use crate::saga::{Saga, SagaFailure, SagaStep};
use crate::store::SharedStore;

/// Everything a write plan needs. Steps fill in `exit_id` as they go.
pub struct WriteContext {
    store: SharedStore,
    exit_id: Option<i64>,
    header: ExitHeaderInput,
    items: Vec<ExitLineItem>,
    previous_header: Option<ExitHeaderInput>,
    previous_items: Vec<ExitLineItem>,
    reference_prefix: String,
}

impl WriteContext {
    fn exit_id(&self) -> DbResult<i64> {
        self.exit_id
            .ok_or_else(|| DbError::Internal("exit id not assigned before dependent step".into()))
    }

    async fn restore_previous_items(&self, exit_id: i64) -> DbResult<()> {
        self.store.delete_exit_items(exit_id).await?;
        if !self.previous_items.is_empty() {
            self.store.insert_exit_items(exit_id, &self.previous_items).await?;
        }
        Ok(())
    }
}

/// `<prefix>-<YYYYMMDD>-<id>`
pub fn reference_number(prefix: &str, header: &ExitHeaderInput, exit_id: i64) -> String {
    format!("{}-{}-{}", prefix, header.exit_date.format("%Y%m%d"), exit_id)
}

// =============================================================================
// Steps
// =============================================================================

struct InsertHeader;

#[async_trait]
impl SagaStep<WriteContext> for InsertHeader {
    fn name(&self) -> &'static str {
        "insert_header"
    }

    async fn execute(&self, ctx: &mut WriteContext) -> DbResult<()> {
        let id = ctx.store.insert_exit(&ctx.header).await?;
        ctx.exit_id = Some(id);
        Ok(())
    }

    async fn compensate(&self, ctx: &mut WriteContext) -> DbResult<()> {
        let id = ctx.exit_id()?;
        ctx.store.delete_exit_items(id).await?;
        ctx.store.delete_exit(id).await?;
        ctx.exit_id = None;
        Ok(())
    }
}

struct AssignReference;

#[async_trait]
impl SagaStep<WriteContext> for AssignReference {
    fn name(&self) -> &'static str {
        "assign_reference"
    }

    async fn execute(&self, ctx: &mut WriteContext) -> DbResult<()> {
        if ctx.header.reference_no.is_some() {
            return Ok(());
        }
        let id = ctx.exit_id()?;
        let reference = reference_number(&ctx.reference_prefix, &ctx.header, id);
        ctx.store.set_reference_no(id, &reference).await?;
        ctx.header.reference_no = Some(reference);
        Ok(())
    }

    async fn compensate(&self, _ctx: &mut WriteContext) -> DbResult<()> {
        // goes away with the header
        Ok(())
    }
}

struct InsertItems;

#[async_trait]
impl SagaStep<WriteContext> for InsertItems {
    fn name(&self) -> &'static str {
        "insert_items"
    }

    async fn execute(&self, ctx: &mut WriteContext) -> DbResult<()> {
        let id = ctx.exit_id()?;
        ctx.store.insert_exit_items(id, &ctx.items).await
    }

    async fn compensate(&self, ctx: &mut WriteContext) -> DbResult<()> {
        let id = ctx.exit_id()?;
        ctx.store.delete_exit_items(id).await.map(|_| ())
    }
}

struct UpdateHeader;

#[async_trait]
impl SagaStep<WriteContext> for UpdateHeader {
    fn name(&self) -> &'static str {
        "update_header"
    }

    async fn execute(&self, ctx: &mut WriteContext) -> DbResult<()> {
        let id = ctx.exit_id()?;
        ctx.store.update_exit(id, &ctx.header).await
    }

    async fn compensate(&self, ctx: &mut WriteContext) -> DbResult<()> {
        let id = ctx.exit_id()?;
        let previous = ctx
            .previous_header
            .as_ref()
            .ok_or_else(|| DbError::Internal("no previous header to restore".into()))?;
        ctx.store.update_exit(id, previous).await
    }
}

/// Delete then insert. A failed insert puts the previous lines back before
/// the error is returned.
struct ReplaceItems;

#[async_trait]
impl SagaStep<WriteContext> for ReplaceItems {
    fn name(&self) -> &'static str {
        "replace_items"
    }

    async fn execute(&self, ctx: &mut WriteContext) -> DbResult<()> {
        let id = ctx.exit_id()?;
        ctx.store.delete_exit_items(id).await?;

        if let Err(e) = ctx.store.insert_exit_items(id, &ctx.items).await {
            if let Err(restore) = ctx.restore_previous_items(id).await {
                error!(exit_id = id, error = %restore, "Failed to restore previous exit items");
            }
            return Err(e);
        }
        Ok(())
    }

    async fn compensate(&self, ctx: &mut WriteContext) -> DbResult<()> {
        let id = ctx.exit_id()?;
        ctx.restore_previous_items(id).await
    }
}

struct RemoveItems;

#[async_trait]
impl SagaStep<WriteContext> for RemoveItems {
    fn name(&self) -> &'static str {
        "remove_items"
    }

    async fn execute(&self, ctx: &mut WriteContext) -> DbResult<()> {
        let id = ctx.exit_id()?;
        ctx.store.delete_exit_items(id).await.map(|_| ())
    }

    async fn compensate(&self, ctx: &mut WriteContext) -> DbResult<()> {
        let id = ctx.exit_id()?;
        ctx.restore_previous_items(id).await
    }
}

struct RemoveHeader;

#[async_trait]
impl SagaStep<WriteContext> for RemoveHeader {
    fn name(&self) -> &'static str {
        "remove_header"
    }

    async fn execute(&self, ctx: &mut WriteContext) -> DbResult<()> {
        let id = ctx.exit_id()?;
        ctx.store.delete_exit(id).await
    }

    async fn compensate(&self, _ctx: &mut WriteContext) -> DbResult<()> {
        Ok(())
    }
}

// =============================================================================
// Persister
// =============================================================================

pub struct ExitPersister {
    store: SharedStore,
    reference_prefix: String,
}

impl ExitPersister {
    pub fn new(store: SharedStore, reference_prefix: impl Into<String>) -> Self {
        ExitPersister {
            store,
            reference_prefix: reference_prefix.into(),
        }
    }

    /// Saves `document` with the target `status` and returns its exit id.
    ///
    /// Totals are re-derived from the lines before writing. Saving with
    /// `ExitStatus::Final` issues the document; it can never be saved again.
    pub async fn save(
        &self,
        document: &ExitDocument,
        status: ExitStatus,
        user: &UserContext,
    ) -> BillingResult<i64> {
        if document.is_final() {
            return Err(BillingError::immutable(document.id));
        }

        let previous = match document.id {
            Some(id) => Some(self.stored_draft(id).await?),
            None => None,
        };

        let mut doc = document.clone();
        doc.recompute();
        validate_exit_document(&doc)?;
        doc.issued_by = Some(user.username.clone());

        let mut header = doc.header_input(status);

        let (saga, mut ctx) = match previous {
            None => {
                let ctx = self.context(None, header, doc.items, None, Vec::new());
                let saga = Saga::<WriteContext>::new()
                    .step(InsertHeader)
                    .step(AssignReference)
                    .step(InsertItems);
                (saga, ctx)
            }
            Some(previous) => {
                let previous_items = self.stored_items(&previous).await?;
                if header.reference_no.is_none() {
                    let reference = previous.reference_no.clone().unwrap_or_else(|| {
                        reference_number(&self.reference_prefix, &header, previous.id)
                    });
                    header.reference_no = Some(reference);
                }
                let ctx = self.context(
                    Some(previous.id),
                    header,
                    doc.items,
                    Some(previous.input()),
                    previous_items,
                );
                let saga = Saga::<WriteContext>::new().step(UpdateHeader).step(ReplaceItems);
                (saga, ctx)
            }
        };

        saga.run(&mut ctx).await.map_err(persistence_failure)?;
        let exit_id = ctx.exit_id()?;

        info!(
            exit_id,
            status = %status,
            user = %user.username,
            reference_no = ?ctx.header.reference_no,
            grand_total = ctx.header.grand_total.units(),
            "Exit saved"
        );
        Ok(exit_id)
    }

    /// Deletes a draft exit: lines first, then the header.
    pub async fn delete(&self, exit_id: i64, user: &UserContext) -> BillingResult<()> {
        let header = self.stored_draft(exit_id).await?;
        let previous_items = self.stored_items(&header).await?;

        let mut ctx = self.context(Some(exit_id), header.input(), Vec::new(), None, previous_items);
        Saga::<WriteContext>::new()
            .step(RemoveItems)
            .step(RemoveHeader)
            .run(&mut ctx)
            .await
            .map_err(persistence_failure)?;

        info!(exit_id, user = %user.username, "Exit deleted");
        Ok(())
    }

    /// The stored header, refusing final documents.
    async fn stored_draft(&self, exit_id: i64) -> BillingResult<ExitHeader> {
        let header = self
            .store
            .find_exit(exit_id)
            .await?
            .ok_or_else(|| BillingError::NotFound {
                key: exit_id.to_string(),
            })?;

        if header.status == ExitStatus::Final {
            return Err(BillingError::immutable(Some(exit_id)));
        }
        Ok(header)
    }

    async fn stored_items(&self, header: &ExitHeader) -> BillingResult<Vec<ExitLineItem>> {
        let records = self.store.exit_items(header.id).await?;
        Ok(records
            .iter()
            .map(|record| from_exit_item(record, header.exit_date))
            .collect())
    }

    fn context(
        &self,
        exit_id: Option<i64>,
        header: ExitHeaderInput,
        items: Vec<ExitLineItem>,
        previous_header: Option<ExitHeaderInput>,
        previous_items: Vec<ExitLineItem>,
    ) -> WriteContext {
        WriteContext {
            store: self.store.clone(),
            exit_id,
            header,
            items,
            previous_header,
            previous_items,
            reference_prefix: self.reference_prefix.clone(),
        }
    }
}

fn persistence_failure(failure: SagaFailure) -> BillingError {
    if !failure.fully_compensated() {
        error!(
            stage = failure.stage,
            failed = failure.compensation_errors.len(),
            "Exit write left partially compensated"
        );
    }
    BillingError::PersistenceFailure {
        stage: failure.stage,
        source: failure.source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{clerk, seeded_store, weighed_document};
    use crate::memory::FailPoint;
    use crate::store::ExitStore;
    use depot_core::Money;

    fn persister(store: SharedStore) -> ExitPersister {
        ExitPersister::new(store, "EX")
    }

    #[tokio::test]
    async fn test_new_draft_writes_header_and_items() {
        let store = seeded_store();
        let doc = weighed_document(&store).await;

        let id = persister(store.clone()).save(&doc, ExitStatus::Draft, &clerk()).await.unwrap();

        let header = store.find_exit(id).await.unwrap().unwrap();
        assert_eq!(header.status, ExitStatus::Draft);
        assert_eq!(header.issued_by.as_deref(), Some("gate-clerk"));
        assert_eq!(header.reference_no, Some(format!("EX-20240630-{}", id)));
        assert_eq!(header.grand_total.units(), 6160);
        assert_eq!(store.item_count(), 1);
    }

    #[tokio::test]
    async fn test_draft_update_replaces_items() {
        let store = seeded_store();
        let persister = persister(store.clone());
        let mut doc = weighed_document(&store).await;

        let id = persister.save(&doc, ExitStatus::Draft, &clerk()).await.unwrap();
        let reference = store.find_exit(id).await.unwrap().unwrap().reference_no;

        doc.id = Some(id);
        doc.set_weighbridge_fee(Money::from_units(500)).unwrap();
        let again = persister.save(&doc, ExitStatus::Draft, &clerk()).await.unwrap();

        assert_eq!(again, id);
        assert_eq!(store.exit_count(), 1);
        assert_eq!(store.item_count(), 1);
        let header = store.find_exit(id).await.unwrap().unwrap();
        assert_eq!(header.weighbridge_fee.units(), 500);
        assert_eq!(header.reference_no, reference);
    }

    #[tokio::test]
    async fn test_item_failure_compensates_header() {
        let store = seeded_store();
        let doc = weighed_document(&store).await;
        store.fail_next(FailPoint::InsertItems);

        let err = persister(store.clone())
            .save(&doc, ExitStatus::Draft, &clerk())
            .await
            .unwrap_err();

        assert!(matches!(err, BillingError::PersistenceFailure { stage: "insert_items", .. }));
        assert_eq!(store.exit_count(), 0);
        assert_eq!(store.item_count(), 0);
    }

    #[tokio::test]
    async fn test_header_failure_stops_immediately() {
        let store = seeded_store();
        let doc = weighed_document(&store).await;
        store.fail_next(FailPoint::InsertExit);

        let err = persister(store.clone())
            .save(&doc, ExitStatus::Draft, &clerk())
            .await
            .unwrap_err();

        assert!(matches!(err, BillingError::PersistenceFailure { stage: "insert_header", .. }));
        assert_eq!(store.write_attempts(), 1);
        assert_eq!(store.exit_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_update_restores_previous_draft() {
        let store = seeded_store();
        let persister = persister(store.clone());
        let mut doc = weighed_document(&store).await;

        let id = persister.save(&doc, ExitStatus::Draft, &clerk()).await.unwrap();
        let before = store.find_exit(id).await.unwrap().unwrap();
        let items_before = store.exit_items(id).await.unwrap();

        doc.id = Some(id);
        doc.set_weights(0, 1200, 200).unwrap();
        store.fail_next(FailPoint::InsertItems);

        let err = persister.save(&doc, ExitStatus::Final, &clerk()).await.unwrap_err();
        assert!(matches!(err, BillingError::PersistenceFailure { stage: "replace_items", .. }));

        let after = store.find_exit(id).await.unwrap().unwrap();
        assert_eq!(after.status, ExitStatus::Draft);
        assert_eq!(after.grand_total, before.grand_total);

        let items_after = store.exit_items(id).await.unwrap();
        assert_eq!(items_after.len(), items_before.len());
        assert_eq!(items_after[0].weight_full_kg, Some(1000));
    }

    #[tokio::test]
    async fn test_final_is_write_once() {
        let store = seeded_store();
        let persister = persister(store.clone());
        let mut doc = weighed_document(&store).await;

        let id = persister.save(&doc, ExitStatus::Final, &clerk()).await.unwrap();
        let writes = store.write_attempts();

        // stale in-memory copy still says draft
        doc.id = Some(id);
        let err = persister.save(&doc, ExitStatus::Draft, &clerk()).await.unwrap_err();
        assert!(matches!(err, BillingError::ImmutableDocument { .. }));

        doc.status = ExitStatus::Final;
        let err = persister.save(&doc, ExitStatus::Final, &clerk()).await.unwrap_err();
        assert!(matches!(err, BillingError::ImmutableDocument { .. }));

        assert!(matches!(
            persister.delete(id, &clerk()).await,
            Err(BillingError::ImmutableDocument { .. })
        ));
        assert_eq!(store.write_attempts(), writes);
    }

    #[tokio::test]
    async fn test_validation_runs_before_writes() {
        let store = seeded_store();
        let mut doc = weighed_document(&store).await;
        doc.set_driver("Sara Ahmadi", "12345").unwrap();

        let err = persister(store.clone())
            .save(&doc, ExitStatus::Draft, &clerk())
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::Validation(_)));
        assert_eq!(store.write_attempts(), 0);
    }

    #[tokio::test]
    async fn test_delete_draft() {
        let store = seeded_store();
        let persister = persister(store.clone());
        let doc = weighed_document(&store).await;

        let id = persister.save(&doc, ExitStatus::Draft, &clerk()).await.unwrap();
        persister.delete(id, &clerk()).await.unwrap();

        assert_eq!(store.exit_count(), 0);
        assert_eq!(store.item_count(), 0);
        assert!(matches!(
            persister.delete(id, &clerk()).await,
            Err(BillingError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_failed_header_delete_restores_items() {
        let store = seeded_store();
        let persister = persister(store.clone());
        let doc = weighed_document(&store).await;

        let id = persister.save(&doc, ExitStatus::Draft, &clerk()).await.unwrap();
        store.fail_next(FailPoint::DeleteExit);

        let err = persister.delete(id, &clerk()).await.unwrap_err();
        assert!(matches!(err, BillingError::PersistenceFailure { stage: "remove_header", .. }));
        assert_eq!(store.exit_count(), 1);
        assert_eq!(store.item_count(), 1);
    }
}
