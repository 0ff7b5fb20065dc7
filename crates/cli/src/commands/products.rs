use crate::commands::{build_runtime, load_config, open_stores, render_product, CommandResult};
use storefront_db::repositories::ProductRepository;

pub fn run() -> CommandResult {
    let config = match load_config("products") {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match build_runtime("products") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let (pool, stores) = open_stores(&config).await?;
        let listed = stores
            .products
            .list_products()
            .await
            .map_err(|error| ("query", format!("listing products failed: {error}"), 6u8));
        pool.close().await;
        listed
    });

    match result {
        Ok(products) if products.is_empty() => {
            CommandResult::success("products", "catalog is empty; run `storefront seed` to load the demo products")
        }
        Ok(products) => {
            let currency = &config.storefront.currency_symbol;
            let lines =
                products.iter().map(|product| render_product(product, currency)).collect::<Vec<_>>();
            CommandResult::success("products", lines.join("\n"))
        }
        Err(failure) => CommandResult::from_failure("products", failure),
    }
}
