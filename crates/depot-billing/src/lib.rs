//! # depot-billing: Exit Reconciliation & Billing Engine
//!
//! Finds or derives the exit document for a search key, keeps it consistent
//! while the operator edits it, and writes it back to the store.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   key ──► ExitResolver ──► Resolution { state, document }               │
//! │             │                      │                                    │
//! │             │ EntryDateResolver    │ with_document_mut(set_weights ...) │
//! │             ▼                      ▼                                    │
//! │         ExitStore ◄──────── ExitPersister ── Saga (insert/update +      │
//! │     (SQLite | memory)                        compensation)              │
//! │                                                                         │
//! │   ExitSession ties the two together for one operator.                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`store`] - The async storage seam and its SQLite implementation
//! - [`memory`] - In-memory store with failure injection
//! - [`entry_dates`] - Receipt lookups feeding the entry-date chain
//! - [`resolver`] - Search key → new, draft or final document
//! - [`saga`] - Step runner with reverse-order compensation
//! - [`persister`] - Save, finalize and delete plans
//! - [`session`] - Single-flight saves and last-search-wins searches
//! - [`config`] - TOML + environment configuration
//! - [`context`] - Current-user context
//! - [`error`] - Billing error types

pub mod config;
pub mod context;
pub mod entry_dates;
pub mod error;
pub mod memory;
pub mod persister;
pub mod resolver;
pub mod saga;
pub mod session;
pub mod store;

pub use config::DepotConfig;
pub use context::UserContext;
pub use entry_dates::EntryDateResolver;
pub use error::{BillingError, BillingResult};
pub use memory::{FailPoint, MemoryStore};
pub use persister::ExitPersister;
pub use resolver::{ExitResolver, Resolution, ResolveState};
pub use session::{ExitSession, SearchOutcome};
pub use store::{ExitStore, SharedStore};

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::{DateTime, TimeZone, Utc};
    use std::sync::Arc;

    use depot_core::{Clock, ExitDocument, FeeBasis, FixedClock, Money};
    use depot_db::{NewClearance, NewLoadingOrder, NewLoadingOrderItem, NewProduct, NewReceipt};

    use crate::context::{UserContext, PERM_EXIT_SAVE};
    use crate::memory::MemoryStore;
    use crate::resolver::ExitResolver;

    pub fn at(m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, m, d, 9, 0, 0).unwrap()
    }

    /// 30 June 2024, 10:00 UTC.
    pub fn clock() -> Arc<dyn Clock> {
        Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2024, 6, 30, 10, 0, 0).unwrap()))
    }

    pub fn clerk() -> UserContext {
        UserContext::new("gate-clerk", "gate", vec![PERM_EXIT_SAVE.to_string()])
    }

    /// Loading order LO-1001: ten sacks of cement billed by weight (rates 5/2),
    /// received 1 June, cleared at 750 kg.
    pub fn seeded_store() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        let product_id = store.add_product(NewProduct {
            name: "Cement (bulk)".to_string(),
            fee_basis: FeeBasis::Weight,
            storage_rate: Money::from_units(5),
            loading_rate: Money::from_units(2),
        });
        store.add_receipt(NewReceipt {
            product_id,
            qty: 100,
            received_at: at(6, 1),
        });
        let clearance_id = store.add_clearance(NewClearance {
            cleared_weight_kg: 750,
            cleared_at: at(6, 28),
        });
        let order_id = store.add_loading_order(NewLoadingOrder {
            order_no: "LO-1001".to_string(),
            driver_name: Some("Sara Ahmadi".to_string()),
            driver_national_code: Some("0012345678".to_string()),
            plate: Some("12B345-67".to_string()),
            issued_at: at(6, 29),
        });
        store.add_loading_order_item(NewLoadingOrderItem {
            loading_order_id: order_id,
            product_id,
            batch_no: "B-100".to_string(),
            qty: 10,
            clearance_id: Some(clearance_id),
        });
        store
    }

    /// LO-1001 derived and weighed at 1000/200 kg: 4000 storage, 1600 loading.
    pub async fn weighed_document(store: &Arc<MemoryStore>) -> ExitDocument {
        let resolver = ExitResolver::new(store.clone(), clock(), true);
        let mut doc = resolver.resolve("LO-1001").await.unwrap().document;
        doc.set_weights(0, 1000, 200).unwrap();
        doc
    }
}
