use std::time::Duration;

use sqlx::sqlite::SqlitePoolOptions;
use storefront_core::config::DatabaseConfig;

pub type DbPool = sqlx::SqlitePool;

pub async fn connect(database_url: &str) -> Result<DbPool, sqlx::Error> {
    connect_with_settings(database_url, 5, 30).await
}

pub async fn connect_from_config(database: &DatabaseConfig) -> Result<DbPool, sqlx::Error> {
    connect_with_settings(&database.url, database.max_connections, database.timeout_secs).await
}

/// Every pooled connection enforces foreign keys so cart rows cannot outlive
/// their product. File databases also get WAL and a busy timeout.
pub async fn connect_with_settings(
    database_url: &str,
    max_connections: u32,
    timeout_secs: u64,
) -> Result<DbPool, sqlx::Error> {
    let in_memory = is_memory_url(database_url);
    // Each connection to `sqlite::memory:` opens its own database.
    let max_connections = if in_memory { 1 } else { max_connections.max(1) };

    SqlitePoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(timeout_secs.max(1)))
        .after_connect(move |conn, _meta| {
            Box::pin(async move {
                sqlx::query("PRAGMA foreign_keys = ON").execute(&mut *conn).await?;
                if !in_memory {
                    sqlx::query("PRAGMA journal_mode = WAL").execute(&mut *conn).await?;
                }
                sqlx::query("PRAGMA busy_timeout = 5000").execute(&mut *conn).await?;
                Ok(())
            })
        })
        .connect(&with_create_mode(database_url))
        .await
}

fn is_memory_url(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}

/// `sqlite://storefront.db` fails when the file is missing; the CLI expects
/// `migrate` to create it.
fn with_create_mode(database_url: &str) -> String {
    if is_memory_url(database_url)
        || !database_url.starts_with("sqlite://")
        || database_url.contains("mode=")
    {
        return database_url.to_string();
    }

    let separator = if database_url.contains('?') { '&' } else { '?' };
    format!("{database_url}{separator}mode=rwc")
}

#[cfg(test)]
mod tests {
    use super::{connect_with_settings, with_create_mode};

    #[test]
    fn file_urls_gain_create_mode() {
        assert_eq!(with_create_mode("sqlite://shop.db"), "sqlite://shop.db?mode=rwc");
        assert_eq!(with_create_mode("sqlite://shop.db?cache=shared"), "sqlite://shop.db?cache=shared&mode=rwc");
        assert_eq!(with_create_mode("sqlite://shop.db?mode=ro"), "sqlite://shop.db?mode=ro");
        assert_eq!(with_create_mode("sqlite::memory:"), "sqlite::memory:");
    }

    #[tokio::test]
    async fn memory_pool_enforces_foreign_keys() {
        let pool = connect_with_settings("sqlite::memory:", 4, 30).await.expect("connect");
        let enabled: i64 =
            sqlx::query_scalar("PRAGMA foreign_keys").fetch_one(&pool).await.expect("pragma");

        assert_eq!(enabled, 1);
        assert_eq!(pool.options().get_max_connections(), 1);
    }
}
