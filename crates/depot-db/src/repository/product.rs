//! # Product Repository
//!
//! Products with their fee basis and effective rates.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use depot_core::{FeeBasis, Money, Product};

/// Values for a new product row.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub fee_basis: FeeBasis,
    pub storage_rate: Money,
    pub loading_rate: Money,
}

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Gets a product by ID.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, fee_basis, storage_rate, loading_rate
            FROM products
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Inserts a product and returns its ID.
    pub async fn insert(&self, product: &NewProduct) -> DbResult<i64> {
        debug!(name = %product.name, fee_basis = %product.fee_basis, "Inserting product");

        let result = sqlx::query(
            r#"
            INSERT INTO products (name, fee_basis, storage_rate, loading_rate)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(&product.name)
        .bind(product.fee_basis)
        .bind(product.storage_rate)
        .bind(product.loading_rate)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Counts products.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::fixtures;

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = fixtures::db().await;
        let id = db
            .products()
            .insert(&NewProduct {
                name: "Rebar".to_string(),
                fee_basis: FeeBasis::Quantity,
                storage_rate: Money::from_units(100),
                loading_rate: Money::from_units(7),
            })
            .await
            .unwrap();

        let product = db.products().get_by_id(id).await.unwrap().unwrap();
        assert_eq!(product.name, "Rebar");
        assert_eq!(product.fee_basis, FeeBasis::Quantity);
        assert_eq!(product.storage_rate.units(), 100);
        assert_eq!(db.products().count().await.unwrap(), 1);
        assert!(db.products().get_by_id(id + 1).await.unwrap().is_none());
    }
}
