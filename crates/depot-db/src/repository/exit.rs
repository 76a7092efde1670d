//! # Exit Repository
//!
//! Exit headers and their line items.
//!
//! ## Write Units
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  insert / update / delete        one statement on `exits`               │
//! │  insert_items                    ONE transaction for all lines          │
//! │  delete_items                    one statement on `exit_items`          │
//! │                                                                         │
//! │  Header and items are separate write units. The saga in depot-billing   │
//! │  compensates the header when the item write fails.                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Deleting a header that still has items fails with a foreign key
//! violation: items go first.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use depot_core::{ExitHeader, ExitHeaderInput, ExitItemRecord, ExitLineItem};

const HEADER_COLUMNS: &str = r#"
    id, loading_order_id, order_no,
    driver_name, driver_national_code, plate,
    exit_date, reference_no,
    weighbridge_fee, extra_fee, extra_description,
    payment_method, status, monthly_proration, issued_by,
    total_storage_fee, total_loading_fee, vat_fee, grand_total,
    created_at, updated_at
"#;

const ITEM_COLUMNS: &str = r#"
    id, exit_id, order_item_id, product_id, product_name, batch_no, qty,
    entry_date, fee_basis, storage_rate, loading_rate,
    cleared_weight_kg, weight_full_kg, weight_empty_kg,
    days_duration, months_duration, storage_fee, loading_fee, line_no
"#;

/// Repository for exits.
#[derive(Debug, Clone)]
pub struct ExitRepository {
    pool: SqlitePool,
}

impl ExitRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ExitRepository { pool }
    }

    // =========================================================================
    // Headers
    // =========================================================================

    /// Gets an exit header by ID.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<ExitHeader>> {
        let header = sqlx::query_as::<_, ExitHeader>(&format!(
            "SELECT {HEADER_COLUMNS} FROM exits WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(header)
    }

    /// Gets the exit issued against a loading order, if any.
    pub async fn find_by_loading_order(
        &self,
        loading_order_id: i64,
    ) -> DbResult<Option<ExitHeader>> {
        let header = sqlx::query_as::<_, ExitHeader>(&format!(
            "SELECT {HEADER_COLUMNS} FROM exits WHERE loading_order_id = ?1"
        ))
        .bind(loading_order_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(header)
    }

    /// Inserts a header and returns its ID.
    pub async fn insert(&self, header: &ExitHeaderInput) -> DbResult<i64> {
        debug!(
            loading_order_id = ?header.loading_order_id,
            status = %header.status,
            "Inserting exit header"
        );
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO exits (
                loading_order_id, order_no,
                driver_name, driver_national_code, plate,
                exit_date, reference_no,
                weighbridge_fee, extra_fee, extra_description,
                payment_method, status, monthly_proration, issued_by,
                total_storage_fee, total_loading_fee, vat_fee, grand_total,
                created_at, updated_at
            ) VALUES (
                ?1, ?2,
                ?3, ?4, ?5,
                ?6, ?7,
                ?8, ?9, ?10,
                ?11, ?12, ?13, ?14,
                ?15, ?16, ?17, ?18,
                ?19, ?19
            )
            "#,
        )
        .bind(header.loading_order_id)
        .bind(&header.order_no)
        .bind(&header.driver_name)
        .bind(&header.driver_national_code)
        .bind(&header.plate)
        .bind(header.exit_date)
        .bind(&header.reference_no)
        .bind(header.weighbridge_fee)
        .bind(header.extra_fee)
        .bind(&header.extra_description)
        .bind(header.payment_method)
        .bind(header.status)
        .bind(header.monthly_proration)
        .bind(&header.issued_by)
        .bind(header.total_storage_fee)
        .bind(header.total_loading_fee)
        .bind(header.vat_fee)
        .bind(header.grand_total)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Overwrites every writable header column.
    pub async fn update(&self, id: i64, header: &ExitHeaderInput) -> DbResult<()> {
        debug!(id, status = %header.status, "Updating exit header");
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE exits SET
                loading_order_id = ?2,
                order_no = ?3,
                driver_name = ?4,
                driver_national_code = ?5,
                plate = ?6,
                exit_date = ?7,
                reference_no = ?8,
                weighbridge_fee = ?9,
                extra_fee = ?10,
                extra_description = ?11,
                payment_method = ?12,
                status = ?13,
                monthly_proration = ?14,
                issued_by = ?15,
                total_storage_fee = ?16,
                total_loading_fee = ?17,
                vat_fee = ?18,
                grand_total = ?19,
                updated_at = ?20
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(header.loading_order_id)
        .bind(&header.order_no)
        .bind(&header.driver_name)
        .bind(&header.driver_national_code)
        .bind(&header.plate)
        .bind(header.exit_date)
        .bind(&header.reference_no)
        .bind(header.weighbridge_fee)
        .bind(header.extra_fee)
        .bind(&header.extra_description)
        .bind(header.payment_method)
        .bind(header.status)
        .bind(header.monthly_proration)
        .bind(&header.issued_by)
        .bind(header.total_storage_fee)
        .bind(header.total_loading_fee)
        .bind(header.vat_fee)
        .bind(header.grand_total)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Exit", id));
        }

        Ok(())
    }

    /// Sets the reference number of a header.
    pub async fn set_reference_no(&self, id: i64, reference_no: &str) -> DbResult<()> {
        let result = sqlx::query("UPDATE exits SET reference_no = ?2 WHERE id = ?1")
            .bind(id)
            .bind(reference_no)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Exit", id));
        }

        Ok(())
    }

    /// Deletes a header. Its items must already be gone.
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        debug!(id, "Deleting exit header");

        let result = sqlx::query("DELETE FROM exits WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Exit", id));
        }

        Ok(())
    }

    /// Counts exit headers.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM exits")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    // =========================================================================
    // Items
    // =========================================================================

    /// Items of an exit, in line order.
    pub async fn items(&self, exit_id: i64) -> DbResult<Vec<ExitItemRecord>> {
        let items = sqlx::query_as::<_, ExitItemRecord>(&format!(
            "SELECT {ITEM_COLUMNS} FROM exit_items WHERE exit_id = ?1 ORDER BY line_no, id"
        ))
        .bind(exit_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Inserts all lines of an exit in one transaction.
    ///
    /// Either every line is written or none is.
    pub async fn insert_items(&self, exit_id: i64, items: &[ExitLineItem]) -> DbResult<()> {
        debug!(exit_id, count = items.len(), "Inserting exit items");

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        for (line_no, item) in items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO exit_items (
                    exit_id, line_no, order_item_id, product_id, product_name, batch_no, qty,
                    entry_date, fee_basis, storage_rate, loading_rate,
                    cleared_weight_kg, weight_full_kg, weight_empty_kg, weight_net_kg,
                    days_duration, months_duration, storage_fee, loading_fee
                ) VALUES (
                    ?1, ?2, ?3, ?4, ?5, ?6, ?7,
                    ?8, ?9, ?10, ?11,
                    ?12, ?13, ?14, ?15,
                    ?16, ?17, ?18, ?19
                )
                "#,
            )
            .bind(exit_id)
            .bind(line_no as i64)
            .bind(item.order_item_id)
            .bind(item.product_id)
            .bind(&item.product_name)
            .bind(&item.batch_no)
            .bind(item.qty)
            .bind(item.entry_date)
            .bind(item.fee_basis)
            .bind(item.storage_rate)
            .bind(item.loading_rate)
            .bind(item.cleared_weight_kg)
            .bind(item.weight_full_kg)
            .bind(item.weight_empty_kg)
            .bind(item.weight_net_kg)
            .bind(item.days_duration)
            .bind(item.months_duration)
            .bind(item.storage_fee)
            .bind(item.loading_fee)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        Ok(())
    }

    /// Deletes all items of an exit. Returns the number removed.
    pub async fn delete_items(&self, exit_id: i64) -> DbResult<u64> {
        debug!(exit_id, "Deleting exit items");

        let result = sqlx::query("DELETE FROM exit_items WHERE exit_id = ?1")
            .bind(exit_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
