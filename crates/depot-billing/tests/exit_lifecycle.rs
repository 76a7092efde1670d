//! End-to-end exit lifecycle against both store implementations.

mod common;

use std::sync::Arc;

use common::{engine, memory_store, sqlite_store, supervisor, ORDER_NO};
use depot_billing::{BillingError, ExitStore, FailPoint, ResolveState, SharedStore};
use depot_core::{ExitStatus, Money};

async fn draft_round_trip(store: SharedStore) {
    let (resolver, persister) = engine(store.clone());

    let mut doc = resolver.resolve(ORDER_NO).await.unwrap().document;
    doc.set_weights(0, 1000, 200).unwrap();
    doc.set_weighbridge_fee(Money::from_units(500)).unwrap();
    doc.set_extra_fee(Money::from_units(1000), Some("Forklift".to_string())).unwrap();

    let id = persister.save(&doc, ExitStatus::Draft, &supervisor()).await.unwrap();

    let reloaded = resolver.resolve(ORDER_NO).await.unwrap();
    assert_eq!(reloaded.state, ResolveState::ExistingDraft);

    let loaded = reloaded.document;
    assert_eq!(loaded.id, Some(id));
    assert_eq!(loaded.totals, doc.totals);
    assert_eq!(loaded.totals.grand_total.units(), 7810);
    assert_eq!(loaded.extra_description.as_deref(), Some("Forklift"));
    assert_eq!(loaded.reference_no, Some(format!("EX-20240630-{}", id)));
    assert_eq!(loaded.issued_by.as_deref(), Some("supervisor"));

    assert_eq!(loaded.items.len(), 1);
    let (saved, original) = (&loaded.items[0], &doc.items[0]);
    assert_eq!(saved.order_item_id, original.order_item_id);
    assert_eq!(saved.entry_date, original.entry_date);
    assert_eq!(saved.weight_net_kg, 800);
    assert_eq!(saved.variance_kg, 50);
    assert_eq!(saved.storage_fee, original.storage_fee);
    assert_eq!(saved.loading_fee, original.loading_fee);
    assert_eq!(saved.months_duration, 1);
    assert!(saved.has_weight_excess());

    // lookup by exit id gives the same document
    let by_id = resolver.resolve(&id.to_string()).await.unwrap().document;
    assert_eq!(by_id, loaded);
}

#[tokio::test]
async fn test_draft_round_trip_memory() {
    draft_round_trip(memory_store()).await;
}

#[tokio::test]
async fn test_draft_round_trip_sqlite() {
    draft_round_trip(sqlite_store().await).await;
}

async fn finalize_then_refuse(store: SharedStore) {
    let (resolver, persister) = engine(store.clone());

    let mut doc = resolver.resolve(ORDER_NO).await.unwrap().document;
    doc.set_weights(0, 1000, 200).unwrap();
    let id = persister.save(&doc, ExitStatus::Draft, &supervisor()).await.unwrap();

    let mut draft = resolver.load(id).await.unwrap().document;
    draft.set_exit_date(common::at(7, 15)).unwrap();
    persister.save(&draft, ExitStatus::Final, &supervisor()).await.unwrap();

    let issued = resolver.resolve(ORDER_NO).await.unwrap();
    assert_eq!(issued.state, ResolveState::ExistingFinal);
    // 44 days: two billable months
    assert_eq!(issued.document.items[0].months_duration, 2);
    assert_eq!(issued.document.totals.total_storage.units(), 8000);

    let before = store.find_exit(id).await.unwrap().unwrap();

    let mut stale = issued.document.clone();
    assert!(stale.set_weights(0, 900, 200).is_err());
    let err = persister.save(&stale, ExitStatus::Final, &supervisor()).await.unwrap_err();
    assert!(matches!(err, BillingError::ImmutableDocument { .. }));

    // stale draft copy from before finalization
    let err = persister.save(&draft, ExitStatus::Draft, &supervisor()).await.unwrap_err();
    assert!(matches!(err, BillingError::ImmutableDocument { .. }));

    let after = store.find_exit(id).await.unwrap().unwrap();
    assert_eq!(after, before);
}

#[tokio::test]
async fn test_final_is_immutable_memory() {
    let store = memory_store();
    finalize_then_refuse(store.clone()).await;
    assert_eq!(store.exit_count(), 1);
}

#[tokio::test]
async fn test_final_is_immutable_sqlite() {
    finalize_then_refuse(sqlite_store().await).await;
}

#[tokio::test]
async fn test_refused_final_save_attempts_no_write() {
    let store = memory_store();
    let (resolver, persister) = engine(store.clone());

    let doc = resolver.resolve(ORDER_NO).await.unwrap().document;
    persister.save(&doc, ExitStatus::Final, &supervisor()).await.unwrap();
    let writes = store.write_attempts();

    let issued = resolver.resolve(ORDER_NO).await.unwrap().document;
    let err = persister.save(&issued, ExitStatus::Final, &supervisor()).await.unwrap_err();

    assert!(matches!(err, BillingError::ImmutableDocument { .. }));
    assert_eq!(store.write_attempts(), writes);
}

#[tokio::test]
async fn test_item_failure_leaves_nothing_memory() {
    let store = memory_store();
    let (resolver, persister) = engine(store.clone());

    let mut doc = resolver.resolve(ORDER_NO).await.unwrap().document;
    doc.set_weights(0, 1000, 200).unwrap();
    store.fail_next(FailPoint::InsertItems);

    let err = persister.save(&doc, ExitStatus::Draft, &supervisor()).await.unwrap_err();
    assert!(matches!(err, BillingError::PersistenceFailure { stage: "insert_items", .. }));
    assert_eq!(store.exit_count(), 0);
    assert_eq!(store.item_count(), 0);

    // the order is still free for a new exit
    let retry = resolver.resolve(ORDER_NO).await.unwrap();
    assert_eq!(retry.state, ResolveState::NewFromOrder);
}

#[tokio::test]
async fn test_item_failure_leaves_nothing_sqlite() {
    let db = sqlite_store().await;
    let (resolver, persister) = engine(db.clone());

    let mut doc = resolver.resolve(ORDER_NO).await.unwrap().document;
    doc.set_weights(0, 1000, 200).unwrap();
    // unknown product: the line insert hits a foreign key failure
    doc.items[0].product_id = Some(9_999);

    let err = persister.save(&doc, ExitStatus::Draft, &supervisor()).await.unwrap_err();
    assert!(matches!(err, BillingError::PersistenceFailure { stage: "insert_items", .. }));
    assert_eq!(db.exits().count().await.unwrap(), 0);

    let retry = resolver.resolve(ORDER_NO).await.unwrap();
    assert_eq!(retry.state, ResolveState::NewFromOrder);
}

#[tokio::test]
async fn test_second_exit_for_order_is_rejected() {
    let db = sqlite_store().await;
    let (resolver, persister) = engine(db.clone());

    // two operators derive the same order before either saves
    let first = resolver.resolve(ORDER_NO).await.unwrap().document;
    let second = first.clone();

    persister.save(&first, ExitStatus::Draft, &supervisor()).await.unwrap();
    let err = persister.save(&second, ExitStatus::Draft, &supervisor()).await.unwrap_err();

    assert!(matches!(err, BillingError::PersistenceFailure { stage: "insert_header", .. }));
    assert_eq!(db.exits().count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_delete_draft_frees_order() {
    let store: Arc<depot_db::Database> = sqlite_store().await;
    let (resolver, persister) = engine(store.clone());

    let doc = resolver.resolve(ORDER_NO).await.unwrap().document;
    let id = persister.save(&doc, ExitStatus::Draft, &supervisor()).await.unwrap();

    persister.delete(id, &supervisor()).await.unwrap();
    assert!(store.find_exit(id).await.unwrap().is_none());
    assert!(store.exit_items(id).await.unwrap().is_empty());
    assert_eq!(
        resolver.resolve(ORDER_NO).await.unwrap().state,
        ResolveState::NewFromOrder
    );
}
