use crate::commands::{build_runtime, load_config, open_stores, CommandResult, Failure};
use storefront_db::DemoCatalog;

pub fn run() -> CommandResult {
    let config = match load_config("seed") {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match build_runtime("seed") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let (pool, stores) = open_stores(&config).await?;

        let seeded = DemoCatalog::load(stores.products.as_ref())
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;
        let verification = DemoCatalog::verify(stores.products.as_ref())
            .await
            .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;

        let outcome: Result<usize, Failure> = if verification.all_present {
            Ok(seeded.products_seeded)
        } else {
            Err(("seed_verification", verification_message(&verification.checks), 6u8))
        };

        pool.close().await;
        outcome
    });

    match result {
        Ok(products_seeded) => {
            let lines = DemoCatalog::products()
                .iter()
                .map(|product| format!("  - {}: {}", product.short_id, product.name))
                .collect::<Vec<_>>();
            CommandResult::success(
                "seed",
                format!("demo catalog loaded with {products_seeded} products:\n{}", lines.join("\n")),
            )
        }
        Err(failure) => CommandResult::from_failure("seed", failure),
    }
}

fn verification_message(checks: &[(&'static str, bool)]) -> String {
    let failed = checks.iter().filter_map(|(id, ok)| (!ok).then_some(*id)).collect::<Vec<_>>();
    if failed.is_empty() {
        "some demo products failed to load".to_string()
    } else {
        format!("seed verification failed for products: {}", failed.join(", "))
    }
}
