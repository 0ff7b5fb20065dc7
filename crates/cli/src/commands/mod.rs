pub mod chat;
pub mod config;
pub mod migrate;
pub mod products;
pub mod search;
pub mod seed;
pub mod shop;

use serde::Serialize;
use storefront_core::config::{AppConfig, LoadOptions};
use storefront_core::domain::product::Product;
use storefront_db::{connect_from_config, migrations, DbPool, Stores};
use tokio::runtime::Runtime;

/// `(error_class, message, exit_code)` carried out of a command's async block.
pub(crate) type Failure = (&'static str, String, u8);

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    pub(crate) fn from_failure(command: &str, (error_class, message, exit_code): Failure) -> Self {
        Self::failure(command, error_class, message, exit_code)
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

pub(crate) fn load_config(command: &str) -> Result<AppConfig, CommandResult> {
    AppConfig::load(LoadOptions::default()).map_err(|error| {
        CommandResult::failure(
            command,
            "config_validation",
            format!("configuration issue: {error}"),
            2,
        )
    })
}

pub(crate) fn build_runtime(command: &str) -> Result<Runtime, CommandResult> {
    tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
        CommandResult::failure(
            command,
            "runtime_init",
            format!("failed to initialize async runtime: {error}"),
            3,
        )
    })
}

/// Connects and applies pending migrations so every command sees the schema.
pub(crate) async fn open_stores(config: &AppConfig) -> Result<(DbPool, Stores), Failure> {
    let pool = connect_from_config(&config.database)
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
    migrations::run_pending(&pool).await.map_err(|error| ("migration", error.to_string(), 5u8))?;
    let stores = Stores::sqlite(pool.clone());
    Ok((pool, stores))
}

pub(crate) fn render_product(product: &Product, currency: &str) -> String {
    let category = product.category.map(|category| category.as_str()).unwrap_or("uncategorised");
    format!(
        "{}. {} [{category}] - {currency}{}",
        product.short_id,
        product.name,
        product.price.normalize()
    )
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use storefront_core::domain::product::{Category, Product, ProductId};

    use super::{render_product, CommandResult};

    fn product(category: Option<Category>) -> Product {
        Product {
            id: ProductId("p-idli".to_owned()),
            short_id: 1,
            name: "Idli".to_owned(),
            category,
            price: Decimal::new(5000, 2),
        }
    }

    #[test]
    fn product_lines_show_short_id_category_and_normalised_price() {
        assert_eq!(render_product(&product(Some(Category::Breakfast)), "₹"), "1. Idli [breakfast] - ₹50");
        assert_eq!(render_product(&product(None), "$"), "1. Idli [uncategorised] - $50");
    }

    #[test]
    fn failure_payload_carries_error_class() {
        let result = CommandResult::failure("search", "query", "catalog unavailable", 6);
        let payload: serde_json::Value = serde_json::from_str(&result.output).expect("json");

        assert_eq!(result.exit_code, 6);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "query");
    }
}
