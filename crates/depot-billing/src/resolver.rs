//! # Exit Resolver
//!
//! Turns an operator search key into an editable or read-only document.
//!
//! ## Key Order
//! ```text
//!   key ──► validate_search_key
//!            │
//!            ├─ loading order with this number?
//!            │     ├─ exit exists for it ──► load exit  (ExistingDraft | ExistingFinal)
//!            │     └─ no exit            ──► derive     (NewFromOrder)
//!            │
//!            ├─ numeric and an exit with this id? ──► load exit
//!            │
//!            └─ BillingError::NotFound
//! ```
//!
//! A numeric key that is also an order number resolves to the order.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use depot_core::normalize::{from_exit_item, from_order_item};
use depot_core::validation::validate_search_key;
use depot_core::{Clock, ExitDocument, ExitHeader, ExitStatus, LoadingOrder};

use crate::entry_dates::EntryDateResolver;
use crate::error::{BillingError, BillingResult};
use crate::store::SharedStore;

/// How a search key was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolveState {
    /// Derived from a loading order that has no exit yet; never saved.
    NewFromOrder,
    ExistingDraft,
    /// Read-only.
    ExistingFinal,
}

/// A resolved document and its state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub state: ResolveState,
    pub document: ExitDocument,
}

impl Resolution {
    pub fn is_read_only(&self) -> bool {
        self.state == ResolveState::ExistingFinal
    }
}

pub struct ExitResolver {
    store: SharedStore,
    entry_dates: EntryDateResolver,
    clock: Arc<dyn Clock>,
    monthly_proration: bool,
}

impl ExitResolver {
    /// `monthly_proration` is the default for newly derived documents.
    pub fn new(store: SharedStore, clock: Arc<dyn Clock>, monthly_proration: bool) -> Self {
        let entry_dates = EntryDateResolver::new(store.clone(), clock.clone());
        Self::with_entry_dates(store, entry_dates, clock, monthly_proration)
    }

    pub fn with_entry_dates(
        store: SharedStore,
        entry_dates: EntryDateResolver,
        clock: Arc<dyn Clock>,
        monthly_proration: bool,
    ) -> Self {
        ExitResolver {
            store,
            entry_dates,
            clock,
            monthly_proration,
        }
    }

    /// Resolves a loading-order number or an exit id.
    pub async fn resolve(&self, key: &str) -> BillingResult<Resolution> {
        let key = validate_search_key(key)?;
        debug!(key = %key, "Resolving exit");

        if let Some(order) = self.store.find_loading_order(&key).await? {
            if let Some(header) = self.store.find_exit_by_order(order.id).await? {
                return self.load_header(header).await;
            }
            return self.derive(&order).await;
        }

        if let Ok(id) = key.parse::<i64>() {
            if id > 0 {
                if let Some(header) = self.store.find_exit(id).await? {
                    return self.load_header(header).await;
                }
            }
        }

        info!(key = %key, "No loading order or exit found");
        Err(BillingError::NotFound { key })
    }

    /// Loads a persisted exit by id.
    pub async fn load(&self, exit_id: i64) -> BillingResult<Resolution> {
        let header = self
            .store
            .find_exit(exit_id)
            .await?
            .ok_or_else(|| BillingError::NotFound {
                key: exit_id.to_string(),
            })?;
        self.load_header(header).await
    }

    async fn load_header(&self, header: ExitHeader) -> BillingResult<Resolution> {
        let records = self.store.exit_items(header.id).await?;
        let fallback_entry = self.clock.now();
        let items = records
            .iter()
            .map(|record| from_exit_item(record, fallback_entry))
            .collect();

        let document = ExitDocument::from_persisted(&header, items);
        let state = match document.status {
            ExitStatus::Draft => ResolveState::ExistingDraft,
            ExitStatus::Final => ResolveState::ExistingFinal,
        };

        info!(exit_id = header.id, ?state, lines = document.items.len(), "Loaded exit");
        Ok(Resolution { state, document })
    }

    async fn derive(&self, order: &LoadingOrder) -> BillingResult<Resolution> {
        let lines = self.store.loading_order_lines(order.id).await?;
        let entry_dates = self.entry_dates.for_lines(&lines).await?;

        let items = lines
            .iter()
            .zip(&entry_dates)
            .map(|(line, entry)| from_order_item(line, entry.date))
            .collect();

        let document = ExitDocument::derive(order, items, self.clock.now(), self.monthly_proration);

        info!(
            order_no = %order.order_no,
            lines = document.items.len(),
            "Derived new exit from loading order"
        );
        Ok(Resolution {
            state: ResolveState::NewFromOrder,
            document,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::store::ExitStore;
    use chrono::{DateTime, TimeZone, Utc};
    use depot_core::{FeeBasis, FixedClock, Money};
    use depot_db::{NewLoadingOrder, NewLoadingOrderItem, NewProduct, NewReceipt};

    fn at(m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, m, d, 9, 0, 0).unwrap()
    }

    /// One order "LO-1" with a quantity line (qty 10, rate 100, received 1 June).
    fn store_with_order(order_no: &str) -> (Arc<MemoryStore>, i64) {
        let store = Arc::new(MemoryStore::new());
        let product_id = store.add_product(NewProduct {
            name: "Rice (sack)".to_string(),
            fee_basis: FeeBasis::Quantity,
            storage_rate: Money::from_units(100),
            loading_rate: Money::from_units(25),
        });
        store.add_receipt(NewReceipt {
            product_id,
            qty: 100,
            received_at: at(6, 1),
        });
        let order_id = store.add_loading_order(NewLoadingOrder {
            order_no: order_no.to_string(),
            driver_name: Some("Reza Karimi".to_string()),
            driver_national_code: Some("0087654321".to_string()),
            plate: Some("45D678-12".to_string()),
            issued_at: at(6, 20),
        });
        store.add_loading_order_item(NewLoadingOrderItem {
            loading_order_id: order_id,
            product_id,
            batch_no: "R-1".to_string(),
            qty: 10,
            clearance_id: None,
        });
        (store, order_id)
    }

    fn resolver(store: Arc<MemoryStore>) -> ExitResolver {
        ExitResolver::new(store, Arc::new(FixedClock::new(at(6, 30))), true)
    }

    #[tokio::test]
    async fn test_new_from_order() {
        let (store, order_id) = store_with_order("LO-1");
        let resolution = resolver(store).resolve("  LO-1 ").await.unwrap();

        assert_eq!(resolution.state, ResolveState::NewFromOrder);
        let doc = &resolution.document;
        assert_eq!(doc.id, None);
        assert_eq!(doc.loading_order_id, Some(order_id));
        assert_eq!(doc.driver_name, "Reza Karimi");
        assert_eq!(doc.exit_date, at(6, 30));
        assert_eq!(doc.items.len(), 1);
        assert_eq!(doc.items[0].entry_date, at(6, 1));
        assert_eq!(doc.items[0].weight_full_kg, 0);
        // 29 days: one month, 10 x 100 storage and 10 x 25 loading
        assert_eq!(doc.items[0].storage_fee.units(), 1000);
        assert_eq!(doc.totals.grand_total.units(), 1375);
    }

    #[tokio::test]
    async fn test_existing_exit_wins_over_derivation() {
        let (store, order_id) = store_with_order("LO-1");
        let resolver = resolver(store.clone());

        let derived = resolver.resolve("LO-1").await.unwrap().document;
        let mut header = derived.header_input(ExitStatus::Final);
        header.loading_order_id = Some(order_id);
        let id = store.insert_exit(&header).await.unwrap();
        store.insert_exit_items(id, &derived.items).await.unwrap();

        let resolution = resolver.resolve("LO-1").await.unwrap();
        assert_eq!(resolution.state, ResolveState::ExistingFinal);
        assert!(resolution.is_read_only());
        assert_eq!(resolution.document.id, Some(id));
        assert_eq!(resolution.document.items.len(), 1);
    }

    #[tokio::test]
    async fn test_numeric_key_prefers_order_number() {
        let (store, _) = store_with_order("LO-1");
        let resolver = resolver(store.clone());

        let derived = resolver.resolve("LO-1").await.unwrap().document;
        let mut header = derived.header_input(ExitStatus::Draft);
        header.loading_order_id = None;
        let exit_id = store.insert_exit(&header).await.unwrap();

        store.add_loading_order(NewLoadingOrder {
            order_no: exit_id.to_string(),
            driver_name: None,
            driver_national_code: None,
            plate: None,
            issued_at: at(6, 29),
        });

        let resolution = resolver.resolve(&exit_id.to_string()).await.unwrap();
        assert_eq!(resolution.state, ResolveState::NewFromOrder);
        assert_eq!(resolution.document.id, None);
    }

    #[tokio::test]
    async fn test_numeric_key_finds_exit() {
        let (store, _) = store_with_order("LO-1");
        let resolver = resolver(store.clone());

        let derived = resolver.resolve("LO-1").await.unwrap().document;
        let mut header = derived.header_input(ExitStatus::Draft);
        header.loading_order_id = None;
        let id = store.insert_exit(&header).await.unwrap();

        let resolution = resolver.resolve(&id.to_string()).await.unwrap();
        assert_eq!(resolution.state, ResolveState::ExistingDraft);
        assert_eq!(resolution.document.id, Some(id));
    }

    #[tokio::test]
    async fn test_not_found() {
        let (store, _) = store_with_order("LO-1");
        let resolver = resolver(store);

        let err = resolver.resolve("LO-404").await.unwrap_err();
        assert!(matches!(err, BillingError::NotFound { ref key } if key == "LO-404"));

        assert!(matches!(resolver.resolve("999").await, Err(BillingError::NotFound { .. })));
        assert!(matches!(resolver.resolve("   ").await, Err(BillingError::Validation(_))));
    }
}
