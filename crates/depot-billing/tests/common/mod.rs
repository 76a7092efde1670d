//! Shared setup for the engine integration tests.
//!
//! Both stores are seeded with the same warehouse: loading order `LO-1001`
//! with one cement line billed by weight (storage 5, loading 2 per kg),
//! received 1 June 2024 and cleared at 750 kg.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;

use depot_billing::context::{PERM_EXIT_FINALIZE, PERM_EXIT_SAVE};
use depot_billing::{ExitPersister, ExitResolver, MemoryStore, SharedStore, UserContext};
use depot_core::{Clock, FeeBasis, FixedClock, Money};
use depot_db::{
    Database, DbConfig, NewClearance, NewLoadingOrder, NewLoadingOrderItem, NewProduct, NewReceipt,
};

pub const ORDER_NO: &str = "LO-1001";

pub fn at(m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, m, d, 9, 0, 0).unwrap()
}

pub fn clock() -> Arc<dyn Clock> {
    Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2024, 6, 30, 10, 0, 0).unwrap()))
}

pub fn supervisor() -> UserContext {
    UserContext::new(
        "supervisor",
        "gate",
        vec![PERM_EXIT_SAVE.to_string(), PERM_EXIT_FINALIZE.to_string()],
    )
}

fn product() -> NewProduct {
    NewProduct {
        name: "Cement (bulk)".to_string(),
        fee_basis: FeeBasis::Weight,
        storage_rate: Money::from_units(5),
        loading_rate: Money::from_units(2),
    }
}

fn order() -> NewLoadingOrder {
    NewLoadingOrder {
        order_no: ORDER_NO.to_string(),
        driver_name: Some("Sara Ahmadi".to_string()),
        driver_national_code: Some("0012345678".to_string()),
        plate: Some("12B345-67".to_string()),
        issued_at: at(6, 29),
    }
}

pub fn memory_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    let product_id = store.add_product(product());
    store.add_receipt(NewReceipt {
        product_id,
        qty: 100,
        received_at: at(6, 1),
    });
    let clearance_id = store.add_clearance(NewClearance {
        cleared_weight_kg: 750,
        cleared_at: at(6, 28),
    });
    let order_id = store.add_loading_order(order());
    store.add_loading_order_item(NewLoadingOrderItem {
        loading_order_id: order_id,
        product_id,
        batch_no: "B-100".to_string(),
        qty: 10,
        clearance_id: Some(clearance_id),
    });
    store
}

pub async fn sqlite_store() -> Arc<Database> {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();

    let product_id = db.products().insert(&product()).await.unwrap();
    db.receipts()
        .insert(&NewReceipt {
            product_id,
            qty: 100,
            received_at: at(6, 1),
        })
        .await
        .unwrap();
    let clearance_id = db
        .clearances()
        .insert(&NewClearance {
            cleared_weight_kg: 750,
            cleared_at: at(6, 28),
        })
        .await
        .unwrap();
    let order_id = db.loading_orders().insert(&order()).await.unwrap();
    db.loading_orders()
        .insert_item(&NewLoadingOrderItem {
            loading_order_id: order_id,
            product_id,
            batch_no: "B-100".to_string(),
            qty: 10,
            clearance_id: Some(clearance_id),
        })
        .await
        .unwrap();

    Arc::new(db)
}

pub fn engine(store: SharedStore) -> (ExitResolver, ExitPersister) {
    (
        ExitResolver::new(store.clone(), clock(), true),
        ExitPersister::new(store, "EX"),
    )
}
