//! # Exit Store
//!
//! The storage seam of the engine. Everything the resolver and the persister
//! read or write goes through [`ExitStore`].
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         ExitStore (async)                               │
//! │                                                                         │
//! │   reads                           writes                                │
//! │   ─────                           ──────                                │
//! │   find_loading_order              insert_exit / update_exit             │
//! │   loading_order_lines             set_reference_no / delete_exit        │
//! │   find_exit / find_exit_by_order  insert_exit_items (all or nothing)    │
//! │   exit_items                      delete_exit_items                     │
//! │   latest_receipt_dates                                                  │
//! │                                                                         │
//! │   impl for depot_db::Database     impl for MemoryStore (tests)          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;

use depot_core::{
    ExitHeader, ExitHeaderInput, ExitItemRecord, ExitLineItem, LoadingOrder, OrderLineRecord,
};
use depot_db::{Database, DbResult};

/// Typed access to loading orders, exits and receipt history.
///
/// Each method is one write unit. `insert_exit_items` must write every line
/// or none; the other writes touch a single row or a single table.
#[async_trait]
pub trait ExitStore: Send + Sync {
    // Loading orders
    async fn find_loading_order(&self, order_no: &str) -> DbResult<Option<LoadingOrder>>;

    /// Order items joined with their product and clearance.
    async fn loading_order_lines(&self, loading_order_id: i64) -> DbResult<Vec<OrderLineRecord>>;

    // Exits
    async fn find_exit(&self, id: i64) -> DbResult<Option<ExitHeader>>;
    async fn find_exit_by_order(&self, loading_order_id: i64) -> DbResult<Option<ExitHeader>>;
    async fn exit_items(&self, exit_id: i64) -> DbResult<Vec<ExitItemRecord>>;

    /// Most recent receipt date per product. Products without receipts are absent.
    async fn latest_receipt_dates(
        &self,
        product_ids: &[i64],
    ) -> DbResult<HashMap<i64, DateTime<Utc>>>;

    async fn insert_exit(&self, header: &ExitHeaderInput) -> DbResult<i64>;
    async fn update_exit(&self, id: i64, header: &ExitHeaderInput) -> DbResult<()>;
    async fn set_reference_no(&self, id: i64, reference_no: &str) -> DbResult<()>;

    /// Deletes a header. Fails while items still reference it.
    async fn delete_exit(&self, id: i64) -> DbResult<()>;

    async fn insert_exit_items(&self, exit_id: i64, items: &[ExitLineItem]) -> DbResult<()>;
    async fn delete_exit_items(&self, exit_id: i64) -> DbResult<u64>;
}

/// Shared handle used by every engine component.
pub type SharedStore = Arc<dyn ExitStore>;

// =============================================================================
// SQLite
// =============================================================================

#[async_trait]
impl ExitStore for Database {
    async fn find_loading_order(&self, order_no: &str) -> DbResult<Option<LoadingOrder>> {
        self.loading_orders().find_by_order_no(order_no).await
    }

    async fn loading_order_lines(&self, loading_order_id: i64) -> DbResult<Vec<OrderLineRecord>> {
        self.loading_orders().lines(loading_order_id).await
    }

    async fn find_exit(&self, id: i64) -> DbResult<Option<ExitHeader>> {
        self.exits().get_by_id(id).await
    }

    async fn find_exit_by_order(&self, loading_order_id: i64) -> DbResult<Option<ExitHeader>> {
        self.exits().find_by_loading_order(loading_order_id).await
    }

    async fn exit_items(&self, exit_id: i64) -> DbResult<Vec<ExitItemRecord>> {
        self.exits().items(exit_id).await
    }

    async fn latest_receipt_dates(
        &self,
        product_ids: &[i64],
    ) -> DbResult<HashMap<i64, DateTime<Utc>>> {
        self.receipts().latest_dates(product_ids).await
    }

    async fn insert_exit(&self, header: &ExitHeaderInput) -> DbResult<i64> {
        self.exits().insert(header).await
    }

    async fn update_exit(&self, id: i64, header: &ExitHeaderInput) -> DbResult<()> {
        self.exits().update(id, header).await
    }

    async fn set_reference_no(&self, id: i64, reference_no: &str) -> DbResult<()> {
        self.exits().set_reference_no(id, reference_no).await
    }

    async fn delete_exit(&self, id: i64) -> DbResult<()> {
        self.exits().delete(id).await
    }

    async fn insert_exit_items(&self, exit_id: i64, items: &[ExitLineItem]) -> DbResult<()> {
        self.exits().insert_items(exit_id, items).await
    }

    async fn delete_exit_items(&self, exit_id: i64) -> DbResult<u64> {
        self.exits().delete_items(exit_id).await
    }
}
