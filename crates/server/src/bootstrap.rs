use std::sync::Arc;

use storefront_bot::transport::TransportError;
use storefront_bot::{
    storefront_dispatcher, BotTransport, PollingPolicy, PollingRunner, StorefrontBotService,
    TelegramTransport,
};
use storefront_core::config::{AppConfig, ConfigError};
use storefront_db::repositories::{ProductRepository, RepositoryError};
use storefront_db::{connect_from_config, migrations, DbPool, DemoCatalog, Stores};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub service: Arc<StorefrontBotService>,
    pub runner: PollingRunner,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("loading the demo catalog failed: {0}")]
    Catalog(#[source] RepositoryError),
    #[error("telegram transport setup failed: {0}")]
    Transport(#[source] TransportError),
}

/// Fails before touching the database when no bot token is configured.
pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    config.require_bot_token()?;
    let transport = TelegramTransport::new(&config.telegram).map_err(BootstrapError::Transport)?;
    bootstrap_with_transport(config, Arc::new(transport)).await
}

pub async fn bootstrap_with_transport(
    config: AppConfig,
    transport: Arc<dyn BotTransport>,
) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", correlation_id = "bootstrap", "starting bot bootstrap");

    let db_pool =
        connect_from_config(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let stores = Stores::sqlite(db_pool.clone());
    ensure_catalog(stores.products.as_ref()).await?;

    let service = Arc::new(StorefrontBotService::new(stores, &config.storefront));
    let runner = PollingRunner::new(
        transport,
        storefront_dispatcher(service.clone()),
        PollingPolicy::from(&config.telegram),
    );

    Ok(Application { config, db_pool, service, runner })
}

/// An empty catalog gets the demo products so `/products` has something to show.
async fn ensure_catalog(products: &dyn ProductRepository) -> Result<usize, BootstrapError> {
    let existing = products.list_products().await.map_err(BootstrapError::Catalog)?;
    if !existing.is_empty() {
        return Ok(existing.len());
    }

    let seeded = DemoCatalog::load(products).await.map_err(BootstrapError::Catalog)?;
    info!(
        event_name = "system.bootstrap.catalog_seeded",
        correlation_id = "bootstrap",
        products = seeded.products_seeded,
        "catalog was empty; demo products loaded"
    );
    Ok(seeded.products_seeded)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use storefront_bot::{NoopTransport, StopReason};
    use storefront_core::config::AppConfig;
    use storefront_core::domain::product::{Product, ProductId};
    use storefront_db::repositories::{InMemoryProductRepository, ProductRepository};
    use storefront_db::DemoCatalog;

    use super::{bootstrap_with_config, bootstrap_with_transport, ensure_catalog};

    fn memory_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.database.url = "sqlite::memory:".to_string();
        config
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_without_a_bot_token() {
        let result = bootstrap_with_config(memory_config()).await;

        let message = result.err().map(|error| error.to_string()).unwrap_or_default();
        assert!(message.contains("telegram.bot_token"), "unexpected error: {message}");
    }

    #[tokio::test]
    async fn bootstrap_migrates_and_seeds_an_empty_database() {
        let app = bootstrap_with_transport(memory_config(), Arc::new(NoopTransport))
            .await
            .expect("bootstrap should succeed against an in-memory database");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master \
             WHERE type = 'table' AND name IN ('product', 'cart_item', 'customer_order', 'order_line')",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("schema query");
        assert_eq!(table_count, 4);

        let (product_count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM product")
            .fetch_one(&app.db_pool)
            .await
            .expect("product count");
        assert_eq!(product_count as usize, DemoCatalog::products().len());

        let summary = app.runner.run(std::future::ready(())).await;
        assert_eq!(summary.stopped, StopReason::Shutdown);
        assert_eq!(app.service.shutdown(), 0);
    }

    #[tokio::test]
    async fn existing_catalogs_are_left_alone() {
        let custom = Product {
            id: ProductId("p-filter-coffee".to_owned()),
            short_id: 1,
            name: "Filter Coffee".to_owned(),
            category: None,
            price: "30".parse().expect("price"),
        };
        let products = InMemoryProductRepository::with_products([custom]);

        assert_eq!(ensure_catalog(&products).await.expect("ensure"), 1);
        let listed = products.list_products().await.expect("list");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "Filter Coffee");
    }
}
