use std::str::FromStr;

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::Row;

use storefront_core::domain::product::{Category, Product, ProductId};

use super::{ProductRepository, RepositoryError};
use crate::DbPool;

pub struct SqlProductRepository {
    pool: DbPool,
}

impl SqlProductRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Decodes the product columns shared by catalog and cart queries.
pub(crate) fn row_to_product(row: &sqlx::sqlite::SqliteRow) -> Result<Product, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let short_id: i64 =
        row.try_get("short_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let name: String = row.try_get("name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let category: Option<String> =
        row.try_get("category").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let price: String = row.try_get("price").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let short_id = u32::try_from(short_id)
        .map_err(|_| RepositoryError::Decode(format!("short id {short_id} is out of range")))?;
    let category = category
        .map(|value| Category::from_str(&value))
        .transpose()
        .map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let price = Decimal::from_str(&price)
        .map_err(|e| RepositoryError::Decode(format!("invalid price `{price}`: {e}")))?;

    Ok(Product { id: ProductId(id), short_id, name, category, price })
}

#[async_trait::async_trait]
impl ProductRepository for SqlProductRepository {
    async fn list_products(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
            "SELECT id, short_id, name, category, price FROM product ORDER BY short_id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_product).collect::<Result<Vec<_>, _>>()
    }

    async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        let row =
            sqlx::query("SELECT id, short_id, name, category, price FROM product WHERE id = ?")
                .bind(&id.0)
                .fetch_optional(&self.pool)
                .await?;

        row.as_ref().map(row_to_product).transpose()
    }

    async fn find_by_short_id(&self, short_id: u32) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, short_id, name, category, price FROM product WHERE short_id = ?",
        )
        .bind(i64::from(short_id))
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_product).transpose()
    }

    async fn save(&self, product: Product) -> Result<(), RepositoryError> {
        product.validate()?;
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO product (id, short_id, name, category, price, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 short_id = excluded.short_id,
                 name = excluded.name,
                 category = excluded.category,
                 price = excluded.price,
                 updated_at = excluded.updated_at",
        )
        .bind(&product.id.0)
        .bind(i64::from(product.short_id))
        .bind(&product.name)
        .bind(product.category.map(|category| category.as_str()))
        .bind(product.price.to_string())
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
