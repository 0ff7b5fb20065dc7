use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::Row;

use storefront_core::domain::order::{Order, OrderId, OrderLine, OrderStatus};
use storefront_core::domain::product::ProductId;

use super::{ensure_lines, OrderRepository, RepositoryError};
use crate::DbPool;

pub struct SqlOrderRepository {
    pool: DbPool,
}

impl SqlOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn lines_for(&self, order_id: i64) -> Result<Vec<OrderLine>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
            "SELECT product_id, short_id, name, unit_price, quantity
             FROM order_line WHERE order_id = ? ORDER BY id ASC",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_line).collect::<Result<Vec<_>, _>>()
    }
}

/// Order ids are integers in SQLite; anything else cannot name a stored order.
fn numeric_id(id: &OrderId) -> Option<i64> {
    id.0.trim().trim_start_matches('#').parse::<i64>().ok()
}

fn decimal_column(row: &sqlx::sqlite::SqliteRow, column: &str) -> Result<Decimal, RepositoryError> {
    let raw: String = row.try_get(column).map_err(|e| RepositoryError::Decode(e.to_string()))?;
    Decimal::from_str(&raw)
        .map_err(|e| RepositoryError::Decode(format!("invalid {column} `{raw}`: {e}")))
}

fn u32_column(row: &sqlx::sqlite::SqliteRow, column: &str) -> Result<u32, RepositoryError> {
    let raw: i64 = row.try_get(column).map_err(|e| RepositoryError::Decode(e.to_string()))?;
    u32::try_from(raw).map_err(|_| RepositoryError::Decode(format!("{column} {raw} is out of range")))
}

fn row_to_line(row: &sqlx::sqlite::SqliteRow) -> Result<OrderLine, RepositoryError> {
    let product_id: String =
        row.try_get("product_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let name: String = row.try_get("name").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(OrderLine {
        product_id: ProductId(product_id),
        short_id: u32_column(row, "short_id")?,
        name,
        unit_price: decimal_column(row, "unit_price")?,
        quantity: u32_column(row, "quantity")?,
    })
}

#[async_trait::async_trait]
impl OrderRepository for SqlOrderRepository {
    async fn place_order(
        &self,
        owner: &str,
        lines: Vec<OrderLine>,
    ) -> Result<Order, RepositoryError> {
        ensure_lines(&lines)?;
        let total = Order::total_of(&lines);
        let created_at = Utc::now();
        let stamp = created_at.to_rfc3339();

        let mut tx = self.pool.begin().await?;
        let inserted = sqlx::query(
            "INSERT INTO customer_order (owner, total, status, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(owner)
        .bind(total.to_string())
        .bind(OrderStatus::Received.as_str())
        .bind(&stamp)
        .bind(&stamp)
        .execute(&mut *tx)
        .await?;
        let order_id = inserted.last_insert_rowid();

        for line in &lines {
            sqlx::query(
                "INSERT INTO order_line (order_id, product_id, short_id, name, unit_price, quantity)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(order_id)
            .bind(&line.product_id.0)
            .bind(i64::from(line.short_id))
            .bind(&line.name)
            .bind(line.unit_price.to_string())
            .bind(i64::from(line.quantity))
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        Ok(Order {
            id: OrderId(order_id.to_string()),
            owner: owner.to_string(),
            lines,
            total,
            status: OrderStatus::Received,
            created_at,
        })
    }

    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError> {
        let Some(order_id) = numeric_id(id) else {
            return Ok(None);
        };

        let row = sqlx::query(
            "SELECT id, owner, total, status, created_at FROM customer_order WHERE id = ?",
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };

        let owner: String = row.try_get("owner").map_err(|e| RepositoryError::Decode(e.to_string()))?;
        let status: String =
            row.try_get("status").map_err(|e| RepositoryError::Decode(e.to_string()))?;
        let created_at: String =
            row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

        let status =
            OrderStatus::from_str(&status).map_err(|e| RepositoryError::Decode(e.to_string()))?;
        let created_at = DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| RepositoryError::Decode(format!("invalid created_at: {e}")))?;

        Ok(Some(Order {
            id: OrderId(order_id.to_string()),
            owner,
            total: decimal_column(&row, "total")?,
            lines: self.lines_for(order_id).await?,
            status,
            created_at,
        }))
    }

    async fn set_status(&self, id: &OrderId, status: OrderStatus) -> Result<bool, RepositoryError> {
        let Some(order_id) = numeric_id(id) else {
            return Ok(false);
        };

        let updated =
            sqlx::query("UPDATE customer_order SET status = ?, updated_at = ? WHERE id = ?")
                .bind(status.as_str())
                .bind(Utc::now().to_rfc3339())
                .bind(order_id)
                .execute(&self.pool)
                .await?;

        Ok(updated.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use storefront_core::domain::order::{OrderId, OrderLine, OrderStatus};
    use storefront_core::domain::product::ProductId;

    use super::SqlOrderRepository;
    use crate::repositories::OrderRepository;
    use crate::{connect_with_settings, migrations};

    async fn repo() -> SqlOrderRepository {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        SqlOrderRepository::new(pool)
    }

    fn lines() -> Vec<OrderLine> {
        vec![
            OrderLine {
                product_id: ProductId("idli".to_string()),
                short_id: 1,
                name: "Idli".to_string(),
                unit_price: Decimal::new(50, 0),
                quantity: 1,
            },
            OrderLine {
                product_id: ProductId("sambar".to_string()),
                short_id: 6,
                name: "Sambar".to_string(),
                unit_price: Decimal::new(3550, 2),
                quantity: 2,
            },
        ]
    }

    #[tokio::test]
    async fn placed_order_reads_back_with_lines_and_total() {
        let repo = repo().await;
        let placed = repo.place_order("guest", lines()).await.expect("place");

        assert_eq!(placed.id, OrderId("1".to_string()));
        assert_eq!(placed.total, Decimal::new(121, 0));
        assert_eq!(placed.status, OrderStatus::Received);

        let found = repo.find_by_id(&placed.id).await.expect("find").expect("order exists");
        assert_eq!(found.lines, lines());
        assert_eq!(found.total, placed.total);
        assert_eq!(found.owner, "guest");
    }

    #[tokio::test]
    async fn hash_prefixed_ids_resolve_and_non_numeric_ids_do_not() {
        let repo = repo().await;
        repo.place_order("guest", lines()).await.expect("place");

        assert!(repo.find_by_id(&OrderId("#1".to_string())).await.expect("find").is_some());
        assert!(repo.find_by_id(&OrderId("abc-1".to_string())).await.expect("find").is_none());
        assert!(repo.find_by_id(&OrderId("42".to_string())).await.expect("find").is_none());
    }

    #[tokio::test]
    async fn set_status_reports_whether_an_order_was_updated() {
        let repo = repo().await;
        let placed = repo.place_order("guest", lines()).await.expect("place");

        assert!(repo.set_status(&placed.id, OrderStatus::OutForDelivery).await.expect("set"));
        assert!(!repo.set_status(&OrderId("99".to_string()), OrderStatus::Delivered).await.expect("set"));
        assert!(!repo.set_status(&OrderId("x".to_string()), OrderStatus::Delivered).await.expect("set"));

        let found = repo.find_by_id(&placed.id).await.expect("find").expect("order exists");
        assert_eq!(found.status, OrderStatus::OutForDelivery);
    }
}
