use chrono::Utc;
use sqlx::Row;

use storefront_core::domain::cart::CartItem;
use storefront_core::domain::product::Product;

use super::product::row_to_product;
use super::{CartRepository, RepositoryError};
use crate::DbPool;

pub struct SqlCartRepository {
    pool: DbPool,
}

impl SqlCartRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl CartRepository for SqlCartRepository {
    async fn add_item(&self, owner: &str, product: &Product) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO cart_item (owner, product_id, quantity, added_at) VALUES (?, ?, 1, ?)",
        )
        .bind(owner)
        .bind(&product.id.0)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn items(&self, owner: &str) -> Result<Vec<CartItem>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
            "SELECT p.id, p.short_id, p.name, p.category, p.price, c.quantity
             FROM cart_item c
             JOIN product p ON p.id = c.product_id
             WHERE c.owner = ?
             ORDER BY c.id ASC",
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let quantity: i64 =
                    row.try_get("quantity").map_err(|e| RepositoryError::Decode(e.to_string()))?;
                let quantity = u32::try_from(quantity).map_err(|_| {
                    RepositoryError::Decode(format!("cart quantity {quantity} is out of range"))
                })?;
                Ok(CartItem { product: row_to_product(row)?, quantity })
            })
            .collect::<Result<Vec<_>, _>>()
    }

    async fn clear(&self, owner: &str) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM cart_item WHERE owner = ?").bind(owner).execute(&self.pool).await?;
        Ok(())
    }
}
