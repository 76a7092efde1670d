//! # Clearance Repository
//!
//! Customs/ownership clearances carrying the manifested weight.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use depot_core::Clearance;

/// Values for a new clearance row.
#[derive(Debug, Clone)]
pub struct NewClearance {
    pub cleared_weight_kg: i64,
    pub cleared_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ClearanceRepository {
    pool: SqlitePool,
}

impl ClearanceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ClearanceRepository { pool }
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Clearance>> {
        let clearance = sqlx::query_as::<_, Clearance>(
            "SELECT id, cleared_weight_kg, cleared_at FROM clearances WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(clearance)
    }

    /// Inserts a clearance and returns its ID.
    pub async fn insert(&self, clearance: &NewClearance) -> DbResult<i64> {
        debug!(weight_kg = clearance.cleared_weight_kg, "Inserting clearance");

        let result = sqlx::query(
            "INSERT INTO clearances (cleared_weight_kg, cleared_at) VALUES (?1, ?2)",
        )
        .bind(clearance.cleared_weight_kg)
        .bind(clearance.cleared_at)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }
}
