//! # In-Memory Store
//!
//! A [`ExitStore`] kept in process memory, for engine tests and dry runs.
//!
//! It enforces the same constraints as the SQLite schema that matter to the
//! engine: one exit per loading order, exit item writes are all-or-nothing,
//! and a header cannot be deleted while it still has items.
//!
//! ## Test Hooks
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  fail_next(FailPoint::InsertItems)   next matching write returns an     │
//! │                                      error and changes nothing          │
//! │  set_latency(Duration)               every call sleeps first            │
//! │  write_attempts()                    writes called, failed ones too     │
//! │  exit_count() / item_count()         rows currently stored              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::debug;

use depot_core::{
    Clearance, ExitHeader, ExitHeaderInput, ExitItemRecord, ExitLineItem, LoadingOrder,
    LoadingOrderItem, OrderLineRecord, Product, Receipt,
};
use depot_db::{
    DbError, DbResult, NewClearance, NewLoadingOrder, NewLoadingOrderItem, NewProduct, NewReceipt,
};

use crate::store::ExitStore;

/// A write that can be made to fail once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    InsertExit,
    UpdateExit,
    SetReference,
    DeleteExit,
    InsertItems,
    DeleteItems,
}

impl FailPoint {
    fn name(&self) -> &'static str {
        match self {
            FailPoint::InsertExit => "insert_exit",
            FailPoint::UpdateExit => "update_exit",
            FailPoint::SetReference => "set_reference_no",
            FailPoint::DeleteExit => "delete_exit",
            FailPoint::InsertItems => "insert_exit_items",
            FailPoint::DeleteItems => "delete_exit_items",
        }
    }
}

#[derive(Debug, Default)]
struct Tables {
    next_id: i64,
    products: BTreeMap<i64, Product>,
    receipts: Vec<Receipt>,
    clearances: BTreeMap<i64, Clearance>,
    orders: BTreeMap<i64, LoadingOrder>,
    order_items: BTreeMap<i64, LoadingOrderItem>,
    exits: BTreeMap<i64, ExitHeader>,
    exit_items: BTreeMap<i64, ExitItemRecord>,
    armed: HashSet<FailPoint>,
    write_attempts: usize,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    /// Counts the write and fires an armed failure for `point`.
    fn begin_write(&mut self, point: FailPoint) -> DbResult<()> {
        self.write_attempts += 1;
        if self.armed.remove(&point) {
            debug!(point = point.name(), "Injected store failure");
            return Err(DbError::QueryFailed(format!("injected failure at {}", point.name())));
        }
        Ok(())
    }

    fn check_order_unique(
        &self,
        loading_order_id: Option<i64>,
        except: Option<i64>,
    ) -> DbResult<()> {
        let Some(order_id) = loading_order_id else {
            return Ok(());
        };
        if !self.orders.contains_key(&order_id) {
            return Err(DbError::ForeignKeyViolation {
                message: format!("loading order {} does not exist", order_id),
            });
        }
        let taken = self
            .exits
            .values()
            .any(|h| h.loading_order_id == Some(order_id) && Some(h.id) != except);
        if taken {
            return Err(DbError::duplicate("exits.loading_order_id", order_id.to_string()));
        }
        Ok(())
    }
}

/// Process-local store with failure injection.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    latency: Mutex<Option<Duration>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn delay(&self) {
        let latency = *self.latency.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }

    // =========================================================================
    // Test Hooks
    // =========================================================================

    /// Makes the next write of this kind fail.
    pub fn fail_next(&self, point: FailPoint) {
        self.tables().armed.insert(point);
    }

    /// Delays every store call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap_or_else(PoisonError::into_inner) = Some(latency);
    }

    /// Number of write calls made so far, failed ones included.
    pub fn write_attempts(&self) -> usize {
        self.tables().write_attempts
    }

    pub fn exit_count(&self) -> usize {
        self.tables().exits.len()
    }

    pub fn item_count(&self) -> usize {
        self.tables().exit_items.len()
    }

    // =========================================================================
    // Seeding
    // =========================================================================

    pub fn add_product(&self, product: NewProduct) -> i64 {
        let mut t = self.tables();
        let id = t.next_id();
        t.products.insert(
            id,
            Product {
                id,
                name: product.name,
                fee_basis: product.fee_basis,
                storage_rate: product.storage_rate,
                loading_rate: product.loading_rate,
            },
        );
        id
    }

    pub fn add_receipt(&self, receipt: NewReceipt) -> i64 {
        let mut t = self.tables();
        let id = t.next_id();
        t.receipts.push(Receipt {
            id,
            product_id: receipt.product_id,
            qty: receipt.qty,
            received_at: receipt.received_at,
        });
        id
    }

    pub fn add_clearance(&self, clearance: NewClearance) -> i64 {
        let mut t = self.tables();
        let id = t.next_id();
        t.clearances.insert(
            id,
            Clearance {
                id,
                cleared_weight_kg: clearance.cleared_weight_kg,
                cleared_at: clearance.cleared_at,
            },
        );
        id
    }

    pub fn add_loading_order(&self, order: NewLoadingOrder) -> i64 {
        let mut t = self.tables();
        let id = t.next_id();
        t.orders.insert(
            id,
            LoadingOrder {
                id,
                order_no: order.order_no,
                driver_name: order.driver_name,
                driver_national_code: order.driver_national_code,
                plate: order.plate,
                issued_at: order.issued_at,
            },
        );
        id
    }

    pub fn add_loading_order_item(&self, item: NewLoadingOrderItem) -> i64 {
        let mut t = self.tables();
        let id = t.next_id();
        t.order_items.insert(
            id,
            LoadingOrderItem {
                id,
                loading_order_id: item.loading_order_id,
                product_id: item.product_id,
                batch_no: item.batch_no,
                qty: item.qty,
                clearance_id: item.clearance_id,
            },
        );
        id
    }
}

fn header_from_input(id: i64, input: &ExitHeaderInput, created_at: DateTime<Utc>) -> ExitHeader {
    ExitHeader {
        id,
        loading_order_id: input.loading_order_id,
        order_no: input.order_no.clone(),
        driver_name: input.driver_name.clone(),
        driver_national_code: input.driver_national_code.clone(),
        plate: input.plate.clone(),
        exit_date: input.exit_date,
        reference_no: input.reference_no.clone(),
        weighbridge_fee: input.weighbridge_fee,
        extra_fee: input.extra_fee,
        extra_description: input.extra_description.clone(),
        payment_method: input.payment_method,
        status: input.status,
        monthly_proration: input.monthly_proration,
        issued_by: input.issued_by.clone(),
        total_storage_fee: input.total_storage_fee,
        total_loading_fee: input.total_loading_fee,
        vat_fee: input.vat_fee,
        grand_total: input.grand_total,
        created_at,
        updated_at: Utc::now(),
    }
}

fn record_from_line(id: i64, exit_id: i64, line_no: i64, item: &ExitLineItem) -> ExitItemRecord {
    ExitItemRecord {
        id,
        exit_id,
        order_item_id: item.order_item_id,
        product_id: item.product_id,
        product_name: Some(item.product_name.clone()),
        batch_no: Some(item.batch_no.clone()),
        qty: Some(item.qty),
        entry_date: Some(item.entry_date),
        fee_basis: Some(item.fee_basis),
        storage_rate: Some(item.storage_rate.units()),
        loading_rate: Some(item.loading_rate.units()),
        cleared_weight_kg: Some(item.cleared_weight_kg),
        weight_full_kg: Some(item.weight_full_kg),
        weight_empty_kg: Some(item.weight_empty_kg),
        days_duration: Some(item.days_duration),
        months_duration: Some(item.months_duration),
        storage_fee: Some(item.storage_fee.units()),
        loading_fee: Some(item.loading_fee.units()),
        line_no,
    }
}

#[async_trait]
impl ExitStore for MemoryStore {
    async fn find_loading_order(&self, order_no: &str) -> DbResult<Option<LoadingOrder>> {
        self.delay().await;
        let t = self.tables();
        Ok(t.orders.values().find(|o| o.order_no == order_no).cloned())
    }

    async fn loading_order_lines(&self, loading_order_id: i64) -> DbResult<Vec<OrderLineRecord>> {
        self.delay().await;
        let t = self.tables();
        let lines = t
            .order_items
            .values()
            .filter(|item| item.loading_order_id == loading_order_id)
            .map(|item| {
                let product = t.products.get(&item.product_id);
                let clearance = item.clearance_id.and_then(|id| t.clearances.get(&id));
                OrderLineRecord {
                    item_id: item.id,
                    product_id: Some(item.product_id),
                    product_name: product.map(|p| p.name.clone()),
                    batch_no: Some(item.batch_no.clone()),
                    qty: Some(item.qty),
                    fee_basis: product.map(|p| p.fee_basis),
                    storage_rate: product.map(|p| p.storage_rate.units()),
                    loading_rate: product.map(|p| p.loading_rate.units()),
                    cleared_weight_kg: clearance.map(|c| c.cleared_weight_kg),
                    cleared_at: clearance.map(|c| c.cleared_at),
                }
            })
            .collect();
        Ok(lines)
    }

    async fn find_exit(&self, id: i64) -> DbResult<Option<ExitHeader>> {
        self.delay().await;
        Ok(self.tables().exits.get(&id).cloned())
    }

    async fn find_exit_by_order(&self, loading_order_id: i64) -> DbResult<Option<ExitHeader>> {
        self.delay().await;
        let t = self.tables();
        Ok(t.exits
            .values()
            .find(|h| h.loading_order_id == Some(loading_order_id))
            .cloned())
    }

    async fn exit_items(&self, exit_id: i64) -> DbResult<Vec<ExitItemRecord>> {
        self.delay().await;
        let t = self.tables();
        let mut items: Vec<ExitItemRecord> = t
            .exit_items
            .values()
            .filter(|i| i.exit_id == exit_id)
            .cloned()
            .collect();
        items.sort_by_key(|i| (i.line_no, i.id));
        Ok(items)
    }

    async fn latest_receipt_dates(
        &self,
        product_ids: &[i64],
    ) -> DbResult<HashMap<i64, DateTime<Utc>>> {
        self.delay().await;
        let t = self.tables();
        let mut latest: HashMap<i64, DateTime<Utc>> = HashMap::new();
        for receipt in t.receipts.iter().filter(|r| product_ids.contains(&r.product_id)) {
            latest
                .entry(receipt.product_id)
                .and_modify(|d| *d = (*d).max(receipt.received_at))
                .or_insert(receipt.received_at);
        }
        Ok(latest)
    }

    async fn insert_exit(&self, header: &ExitHeaderInput) -> DbResult<i64> {
        self.delay().await;
        let mut t = self.tables();
        t.begin_write(FailPoint::InsertExit)?;
        t.check_order_unique(header.loading_order_id, None)?;

        let id = t.next_id();
        t.exits.insert(id, header_from_input(id, header, Utc::now()));
        Ok(id)
    }

    async fn update_exit(&self, id: i64, header: &ExitHeaderInput) -> DbResult<()> {
        self.delay().await;
        let mut t = self.tables();
        t.begin_write(FailPoint::UpdateExit)?;
        t.check_order_unique(header.loading_order_id, Some(id))?;

        let created_at = t
            .exits
            .get(&id)
            .map(|h| h.created_at)
            .ok_or_else(|| DbError::not_found("Exit", id))?;
        t.exits.insert(id, header_from_input(id, header, created_at));
        Ok(())
    }

    async fn set_reference_no(&self, id: i64, reference_no: &str) -> DbResult<()> {
        self.delay().await;
        let mut t = self.tables();
        t.begin_write(FailPoint::SetReference)?;
        let header = t.exits.get_mut(&id).ok_or_else(|| DbError::not_found("Exit", id))?;
        header.reference_no = Some(reference_no.to_string());
        Ok(())
    }

    async fn delete_exit(&self, id: i64) -> DbResult<()> {
        self.delay().await;
        let mut t = self.tables();
        t.begin_write(FailPoint::DeleteExit)?;
        if t.exit_items.values().any(|i| i.exit_id == id) {
            return Err(DbError::ForeignKeyViolation {
                message: format!("exit {} still has items", id),
            });
        }
        t.exits.remove(&id).ok_or_else(|| DbError::not_found("Exit", id))?;
        Ok(())
    }

    async fn insert_exit_items(&self, exit_id: i64, items: &[ExitLineItem]) -> DbResult<()> {
        self.delay().await;
        let mut t = self.tables();
        t.begin_write(FailPoint::InsertItems)?;
        if !t.exits.contains_key(&exit_id) {
            return Err(DbError::ForeignKeyViolation {
                message: format!("exit {} does not exist", exit_id),
            });
        }

        for (line_no, item) in items.iter().enumerate() {
            let id = t.next_id();
            t.exit_items.insert(id, record_from_line(id, exit_id, line_no as i64, item));
        }
        Ok(())
    }

    async fn delete_exit_items(&self, exit_id: i64) -> DbResult<u64> {
        self.delay().await;
        let mut t = self.tables();
        t.begin_write(FailPoint::DeleteItems)?;
        let before = t.exit_items.len();
        t.exit_items.retain(|_, i| i.exit_id != exit_id);
        Ok((before - t.exit_items.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use depot_core::{ExitStatus, FeeBasis, LineOrigin, Money, PaymentMethod};

    fn at(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, d, 9, 0, 0).unwrap()
    }

    fn header(loading_order_id: Option<i64>) -> ExitHeaderInput {
        ExitHeaderInput {
            loading_order_id,
            order_no: None,
            driver_name: "Sara Ahmadi".to_string(),
            driver_national_code: "0012345678".to_string(),
            plate: "12B345-67".to_string(),
            exit_date: at(30),
            reference_no: None,
            weighbridge_fee: Money::zero(),
            extra_fee: Money::zero(),
            extra_description: None,
            payment_method: PaymentMethod::Cash,
            status: ExitStatus::Draft,
            monthly_proration: true,
            issued_by: None,
            total_storage_fee: Money::zero(),
            total_loading_fee: Money::zero(),
            vat_fee: Money::zero(),
            grand_total: Money::zero(),
        }
    }

    fn line() -> ExitLineItem {
        ExitLineItem {
            origin: LineOrigin::OrderItem(1),
            order_item_id: Some(1),
            product_id: Some(1),
            product_name: "Cement".to_string(),
            batch_no: "B-1".to_string(),
            qty: 10,
            entry_date: at(1),
            fee_basis: FeeBasis::Weight,
            storage_rate: Money::from_units(5),
            loading_rate: Money::from_units(2),
            cleared_weight_kg: 750,
            weight_full_kg: 1000,
            weight_empty_kg: 200,
            weight_net_kg: 800,
            days_duration: 29,
            months_duration: 1,
            storage_fee: Money::from_units(4000),
            loading_fee: Money::from_units(1600),
            variance_kg: 50,
        }
    }

    #[tokio::test]
    async fn test_order_lines_join_product_and_clearance() {
        let store = MemoryStore::new();
        let product_id = store.add_product(NewProduct {
            name: "Cement".to_string(),
            fee_basis: FeeBasis::Weight,
            storage_rate: Money::from_units(5),
            loading_rate: Money::from_units(2),
        });
        let clearance_id = store.add_clearance(NewClearance {
            cleared_weight_kg: 750,
            cleared_at: at(3),
        });
        let order_id = store.add_loading_order(NewLoadingOrder {
            order_no: "LO-1".to_string(),
            driver_name: None,
            driver_national_code: None,
            plate: None,
            issued_at: at(2),
        });
        store.add_loading_order_item(NewLoadingOrderItem {
            loading_order_id: order_id,
            product_id,
            batch_no: "B-1".to_string(),
            qty: 10,
            clearance_id: Some(clearance_id),
        });

        let lines = store.loading_order_lines(order_id).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].fee_basis, Some(FeeBasis::Weight));
        assert_eq!(lines[0].storage_rate, Some(5));
        assert_eq!(lines[0].cleared_weight_kg, Some(750));
        assert_eq!(lines[0].cleared_at, Some(at(3)));
    }

    #[tokio::test]
    async fn test_latest_receipt_wins() {
        let store = MemoryStore::new();
        for d in [5, 20, 10] {
            store.add_receipt(NewReceipt {
                product_id: 1,
                qty: 1,
                received_at: at(d),
            });
        }
        let dates = store.latest_receipt_dates(&[1, 2]).await.unwrap();
        assert_eq!(dates.get(&1), Some(&at(20)));
        assert!(!dates.contains_key(&2));
    }

    #[tokio::test]
    async fn test_injected_failure_fires_once() {
        let store = MemoryStore::new();
        let id = store.insert_exit(&header(None)).await.unwrap();

        store.fail_next(FailPoint::InsertItems);
        assert!(store.insert_exit_items(id, &[line()]).await.is_err());
        assert_eq!(store.item_count(), 0);

        store.insert_exit_items(id, &[line(), line()]).await.unwrap();
        assert_eq!(store.item_count(), 2);
        assert_eq!(store.write_attempts(), 3);
    }

    #[tokio::test]
    async fn test_header_constraints() {
        let store = MemoryStore::new();
        let order_id = store.add_loading_order(NewLoadingOrder {
            order_no: "LO-1".to_string(),
            driver_name: None,
            driver_national_code: None,
            plate: None,
            issued_at: at(1),
        });

        let id = store.insert_exit(&header(Some(order_id))).await.unwrap();
        let dup = store.insert_exit(&header(Some(order_id))).await;
        assert!(matches!(dup, Err(DbError::UniqueViolation { .. })));

        let missing = store.insert_exit(&header(Some(999))).await;
        assert!(matches!(missing, Err(DbError::ForeignKeyViolation { .. })));

        store.insert_exit_items(id, &[line()]).await.unwrap();
        let blocked = store.delete_exit(id).await;
        assert!(matches!(blocked, Err(DbError::ForeignKeyViolation { .. })));

        assert_eq!(store.delete_exit_items(id).await.unwrap(), 1);
        store.delete_exit(id).await.unwrap();
        assert_eq!(store.exit_count(), 0);
    }
}
