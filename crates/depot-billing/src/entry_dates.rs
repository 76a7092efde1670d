//! # Entry Date Resolution
//!
//! Store-backed front of [`EntryDateChain`]: fetches the receipt evidence for
//! a set of order lines in one call, then runs the chain per line.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use depot_core::entry_date::{EntryDateChain, EntryDateQuery, EntryEvidence, ResolvedEntryDate};
use depot_core::{Clock, OrderLineRecord};

use crate::error::BillingResult;
use crate::store::SharedStore;

pub struct EntryDateResolver {
    store: SharedStore,
    chain: EntryDateChain,
    clock: Arc<dyn Clock>,
}

impl EntryDateResolver {
    /// Resolver with the standard receipt → clearance → now chain.
    pub fn new(store: SharedStore, clock: Arc<dyn Clock>) -> Self {
        Self::with_chain(store, EntryDateChain::standard(), clock)
    }

    pub fn with_chain(store: SharedStore, chain: EntryDateChain, clock: Arc<dyn Clock>) -> Self {
        EntryDateResolver {
            store,
            chain,
            clock,
        }
    }

    /// Most recent receipt date per product. Duplicates in `product_ids` are
    /// looked up once; products without receipts are absent from the map.
    pub async fn resolve(&self, product_ids: &[i64]) -> BillingResult<HashMap<i64, DateTime<Utc>>> {
        let mut unique = product_ids.to_vec();
        unique.sort_unstable();
        unique.dedup();

        if unique.is_empty() {
            return Ok(HashMap::new());
        }

        let dates = self.store.latest_receipt_dates(&unique).await?;
        debug!(requested = unique.len(), found = dates.len(), "Resolved receipt dates");
        Ok(dates)
    }

    /// One entry date per order line, in line order.
    pub async fn for_lines(
        &self,
        lines: &[OrderLineRecord],
    ) -> BillingResult<Vec<ResolvedEntryDate>> {
        let product_ids: Vec<i64> = lines.iter().filter_map(|l| l.product_id).collect();
        let evidence = EntryEvidence::new(self.resolve(&product_ids).await?);

        Ok(lines
            .iter()
            .map(|line| {
                let query = EntryDateQuery {
                    product_id: line.product_id,
                    cleared_at: line.cleared_at,
                };
                self.chain.resolve(&query, &evidence, self.clock.as_ref())
            })
            .collect())
    }
}
