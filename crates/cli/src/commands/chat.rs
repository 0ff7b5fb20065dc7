use storefront_core::domain::cart::CartSummary;
use storefront_core::nlu::responder::{Responder, ResponderContext};

use crate::commands::{build_runtime, load_config, open_stores, CommandResult, Failure};

/// One-off message to the assistant with an empty cart. Order tracking reads
/// the configured database.
pub fn run(message: &str) -> CommandResult {
    let config = match load_config("chat") {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match build_runtime("chat") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let (pool, stores) = open_stores(&config).await?;
        let responder = Responder::new(config.storefront.currency_symbol.clone());
        let lookup = stores.status_lookup();
        let context = ResponderContext { cart: CartSummary::default(), orders: &lookup };
        let reply = responder.respond(&message.to_lowercase(), &context).await;
        pool.close().await;
        Ok::<_, Failure>(reply)
    });

    match result {
        Ok(reply) => CommandResult::success("chat", reply.text),
        Err(failure) => CommandResult::from_failure("chat", failure),
    }
}
