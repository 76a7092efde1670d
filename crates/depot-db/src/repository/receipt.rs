//! # Receipt Repository
//!
//! Goods received into the warehouse. The billing engine only needs the most
//! recent receipt date per product.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use depot_core::Receipt;

/// Values for a new receipt row.
#[derive(Debug, Clone)]
pub struct NewReceipt {
    pub product_id: i64,
    pub qty: i64,
    pub received_at: DateTime<Utc>,
}

/// Repository for receipt database operations.
#[derive(Debug, Clone)]
pub struct ReceiptRepository {
    pool: SqlitePool,
}

impl ReceiptRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ReceiptRepository { pool }
    }

    /// Inserts a receipt and returns its ID.
    pub async fn insert(&self, receipt: &NewReceipt) -> DbResult<i64> {
        debug!(product_id = receipt.product_id, qty = receipt.qty, "Inserting receipt");

        let result = sqlx::query(
            r#"
            INSERT INTO receipts (product_id, qty, received_at)
            VALUES (?1, ?2, ?3)
            "#,
        )
        .bind(receipt.product_id)
        .bind(receipt.qty)
        .bind(receipt.received_at)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// All receipts of one product, newest first.
    pub async fn for_product(&self, product_id: i64) -> DbResult<Vec<Receipt>> {
        let mut receipts = sqlx::query_as::<_, Receipt>(
            r#"
            SELECT id, product_id, qty, received_at
            FROM receipts
            WHERE product_id = ?1
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        receipts.sort_by(|a, b| b.received_at.cmp(&a.received_at));
        Ok(receipts)
    }

    /// Most recent receipt date for each of `product_ids` that has one.
    ///
    /// The maximum is taken on parsed timestamps, not on the stored text.
    pub async fn latest_dates(&self, product_ids: &[i64]) -> DbResult<HashMap<i64, DateTime<Utc>>> {
        if product_ids.is_empty() {
            return Ok(HashMap::new());
        }

        debug!(products = product_ids.len(), "Loading latest receipt dates");

        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT product_id, received_at FROM receipts WHERE product_id IN (");
        let mut separated = query.separated(", ");
        for id in product_ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        let rows = query
            .build_query_as::<(i64, DateTime<Utc>)>()
            .fetch_all(&self.pool)
            .await?;

        let mut latest: HashMap<i64, DateTime<Utc>> = HashMap::new();
        for (product_id, received_at) in rows {
            latest
                .entry(product_id)
                .and_modify(|d| {
                    if received_at > *d {
                        *d = received_at;
                    }
                })
                .or_insert(received_at);
        }

        Ok(latest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::fixtures::{self, at};

    #[tokio::test]
    async fn test_latest_dates_picks_most_recent() {
        let db = fixtures::db().await;
        let (product_id, _) = fixtures::order_with_one_line(&db, "LO-1").await;

        for received_at in [at(2024, 3, 1), at(2024, 5, 10), at(2024, 4, 2)] {
            db.receipts()
                .insert(&NewReceipt {
                    product_id,
                    qty: 5,
                    received_at,
                })
                .await
                .unwrap();
        }

        let latest = db.receipts().latest_dates(&[product_id, 999]).await.unwrap();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[&product_id], at(2024, 5, 10));

        let all = db.receipts().for_product(product_id).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].received_at, at(2024, 5, 10));
    }

    #[tokio::test]
    async fn test_latest_dates_empty_input() {
        let db = fixtures::db().await;
        assert!(db.receipts().latest_dates(&[]).await.unwrap().is_empty());
    }
}
