//! # Loading Order Repository
//!
//! Loading orders and their cargo lines.
//!
//! ## Order Lines
//! ```text
//!   loading_order_items ──LEFT JOIN── products    (name, basis, rates)
//!                       └─LEFT JOIN── clearances  (weight, timestamp)
//!                                │
//!                                ▼
//!                        OrderLineRecord (every value optional)
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use depot_core::{LoadingOrder, LoadingOrderItem, OrderLineRecord};

/// Values for a new loading order.
#[derive(Debug, Clone)]
pub struct NewLoadingOrder {
    pub order_no: String,
    pub driver_name: Option<String>,
    pub driver_national_code: Option<String>,
    pub plate: Option<String>,
    pub issued_at: DateTime<Utc>,
}

/// Values for a new loading order line.
#[derive(Debug, Clone)]
pub struct NewLoadingOrderItem {
    pub loading_order_id: i64,
    pub product_id: i64,
    pub batch_no: String,
    pub qty: i64,
    pub clearance_id: Option<i64>,
}

/// Repository for loading orders.
#[derive(Debug, Clone)]
pub struct LoadingOrderRepository {
    pool: SqlitePool,
}

impl LoadingOrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        LoadingOrderRepository { pool }
    }

    /// Finds an order by its business number (exact match).
    pub async fn find_by_order_no(&self, order_no: &str) -> DbResult<Option<LoadingOrder>> {
        debug!(order_no = %order_no, "Looking up loading order");

        let order = sqlx::query_as::<_, LoadingOrder>(
            r#"
            SELECT id, order_no, driver_name, driver_national_code, plate, issued_at
            FROM loading_orders
            WHERE order_no = ?1
            "#,
        )
        .bind(order_no)
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<LoadingOrder>> {
        let order = sqlx::query_as::<_, LoadingOrder>(
            r#"
            SELECT id, order_no, driver_name, driver_national_code, plate, issued_at
            FROM loading_orders
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    /// Raw lines of an order, in insertion order.
    pub async fn items(&self, loading_order_id: i64) -> DbResult<Vec<LoadingOrderItem>> {
        let items = sqlx::query_as::<_, LoadingOrderItem>(
            r#"
            SELECT id, loading_order_id, product_id, batch_no, qty, clearance_id
            FROM loading_order_items
            WHERE loading_order_id = ?1
            ORDER BY id
            "#,
        )
        .bind(loading_order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Lines of an order joined with product and clearance.
    pub async fn lines(&self, loading_order_id: i64) -> DbResult<Vec<OrderLineRecord>> {
        debug!(loading_order_id, "Loading order lines");

        let lines = sqlx::query_as::<_, OrderLineRecord>(
            r#"
            SELECT
                loi.id              AS item_id,
                loi.product_id      AS product_id,
                p.name              AS product_name,
                loi.batch_no        AS batch_no,
                loi.qty             AS qty,
                p.fee_basis         AS fee_basis,
                p.storage_rate      AS storage_rate,
                p.loading_rate      AS loading_rate,
                c.cleared_weight_kg AS cleared_weight_kg,
                c.cleared_at        AS cleared_at
            FROM loading_order_items loi
            LEFT JOIN products p   ON p.id = loi.product_id
            LEFT JOIN clearances c ON c.id = loi.clearance_id
            WHERE loi.loading_order_id = ?1
            ORDER BY loi.id
            "#,
        )
        .bind(loading_order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lines)
    }

    /// Inserts an order and returns its ID.
    pub async fn insert(&self, order: &NewLoadingOrder) -> DbResult<i64> {
        debug!(order_no = %order.order_no, "Inserting loading order");

        let result = sqlx::query(
            r#"
            INSERT INTO loading_orders (
                order_no, driver_name, driver_national_code, plate, issued_at
            ) VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&order.order_no)
        .bind(&order.driver_name)
        .bind(&order.driver_national_code)
        .bind(&order.plate)
        .bind(order.issued_at)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Inserts an order line and returns its ID.
    pub async fn insert_item(&self, item: &NewLoadingOrderItem) -> DbResult<i64> {
        debug!(
            loading_order_id = item.loading_order_id,
            product_id = item.product_id,
            "Inserting loading order item"
        );

        let result = sqlx::query(
            r#"
            INSERT INTO loading_order_items (
                loading_order_id, product_id, batch_no, qty, clearance_id
            ) VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(item.loading_order_id)
        .bind(item.product_id)
        .bind(&item.batch_no)
        .bind(item.qty)
        .bind(item.clearance_id)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }
}
