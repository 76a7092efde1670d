//! # Entry Date Fallback Chain
//!
//! Every line needs a date that starts its storage clock. The chain tries an
//! ordered list of strategies and the first one that produces a date wins.
//!
//! ```text
//!   ┌────────────────┐  none  ┌────────────────────┐  none  ┌─────────────┐
//!   │ LatestReceipt  │ ─────► │ ClearanceTimestamp │ ─────► │ CurrentTime │
//!   │ (per product)  │        │ (per line)         │        │ (clock)     │
//!   └───────┬────────┘        └─────────┬──────────┘        └──────┬──────┘
//!           └──────────── first date found wins ───────────────────┘
//! ```
//!
//! The receipt tier uses the most recent receipt of the product. When a
//! product has several receipts this can shorten the billed duration; the
//! chain is kept separate from the fee logic so it can be replaced.
//!
//! This module is pure. Receipt dates are gathered by the caller (see the
//! store-backed resolver in `depot-billing`) and passed in as evidence.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::clock::Clock;

/// Facts gathered from the store before the chain runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryEvidence {
    /// Most recent receipt date per product id.
    pub latest_receipts: HashMap<i64, DateTime<Utc>>,
}

impl EntryEvidence {
    pub fn new(latest_receipts: HashMap<i64, DateTime<Utc>>) -> Self {
        Self { latest_receipts }
    }
}

/// What is known about one line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntryDateQuery {
    pub product_id: Option<i64>,
    pub cleared_at: Option<DateTime<Utc>>,
}

/// Which tier produced an entry date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntrySource {
    LatestReceipt,
    ClearanceTimestamp,
    CurrentTime,
}

/// A resolved entry date and where it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedEntryDate {
    pub date: DateTime<Utc>,
    pub source: EntrySource,
}

/// One tier of the chain.
pub trait EntryDateStrategy: Send + Sync {
    fn source(&self) -> EntrySource;

    fn resolve(
        &self,
        query: &EntryDateQuery,
        evidence: &EntryEvidence,
        clock: &dyn Clock,
    ) -> Option<DateTime<Utc>>;
}

/// Most recent receipt of the line's product.
#[derive(Debug, Clone, Copy, Default)]
pub struct LatestReceipt;

impl EntryDateStrategy for LatestReceipt {
    fn source(&self) -> EntrySource {
        EntrySource::LatestReceipt
    }

    fn resolve(
        &self,
        query: &EntryDateQuery,
        evidence: &EntryEvidence,
        _clock: &dyn Clock,
    ) -> Option<DateTime<Utc>> {
        query
            .product_id
            .and_then(|id| evidence.latest_receipts.get(&id).copied())
    }
}

/// The clearance timestamp recorded on the line's order item.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClearanceTimestamp;

impl EntryDateStrategy for ClearanceTimestamp {
    fn source(&self) -> EntrySource {
        EntrySource::ClearanceTimestamp
    }

    fn resolve(
        &self,
        query: &EntryDateQuery,
        _evidence: &EntryEvidence,
        _clock: &dyn Clock,
    ) -> Option<DateTime<Utc>> {
        query.cleared_at
    }
}

/// Now. Always succeeds.
#[derive(Debug, Clone, Copy, Default)]
pub struct CurrentTime;

impl EntryDateStrategy for CurrentTime {
    fn source(&self) -> EntrySource {
        EntrySource::CurrentTime
    }

    fn resolve(
        &self,
        _query: &EntryDateQuery,
        _evidence: &EntryEvidence,
        clock: &dyn Clock,
    ) -> Option<DateTime<Utc>> {
        Some(clock.now())
    }
}

/// Ordered list of strategies; first success wins.
pub struct EntryDateChain {
    strategies: Vec<Box<dyn EntryDateStrategy>>,
}

impl EntryDateChain {
    /// Receipt, then clearance, then now.
    pub fn standard() -> Self {
        Self::new(vec![
            Box::new(LatestReceipt),
            Box::new(ClearanceTimestamp),
            Box::new(CurrentTime),
        ])
    }

    /// A custom chain. The clock is still used if no strategy answers.
    pub fn new(strategies: Vec<Box<dyn EntryDateStrategy>>) -> Self {
        Self { strategies }
    }

    /// Resolves the entry date for one line.
    pub fn resolve(
        &self,
        query: &EntryDateQuery,
        evidence: &EntryEvidence,
        clock: &dyn Clock,
    ) -> ResolvedEntryDate {
        self.strategies
            .iter()
            .find_map(|s| {
                s.resolve(query, evidence, clock).map(|date| ResolvedEntryDate {
                    date,
                    source: s.source(),
                })
            })
            .unwrap_or_else(|| ResolvedEntryDate {
                date: clock.now(),
                source: EntrySource::CurrentTime,
            })
    }
}

impl Default for EntryDateChain {
    fn default() -> Self {
        Self::standard()
    }
}

impl std::fmt::Debug for EntryDateChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sources: Vec<EntrySource> = self.strategies.iter().map(|s| s.source()).collect();
        f.debug_struct("EntryDateChain").field("strategies", &sources).finish()
    }
}
