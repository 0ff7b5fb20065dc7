mod bootstrap;

use anyhow::Result;
use storefront_bot::StopReason;
use storefront_core::config::{AppConfig, LoadOptions};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// `RUST_LOG` wins over `logging.level` when set.
fn init_logging(config: &AppConfig) {
    use storefront_core::config::LogFormat::*;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.trim().to_ascii_lowercase()));
    let builder = tracing_subscriber::fmt().with_target(false).with_env_filter(filter);

    match config.logging.format {
        Compact => builder.compact().init(),
        Pretty => builder.pretty().init(),
        Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

async fn run() -> Result<()> {
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;
    info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        api_base_url = %app.config.telegram.api_base_url,
        "storefront bot started polling"
    );

    let summary = app.runner.run(wait_for_shutdown()).await;
    let cancelled = app.service.shutdown();
    app.db_pool.close().await;

    if summary.stopped == StopReason::FailureLimit {
        error!(
            event_name = "system.server.polling_gave_up",
            correlation_id = "shutdown",
            max_consecutive_failures = app.config.telegram.max_consecutive_failures,
            "telegram polling kept failing; bot stopped"
        );
    }
    info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        updates_handled = summary.updates_handled,
        replies_sent = summary.replies_sent,
        cancelled_progressions = cancelled,
        "storefront bot stopping"
    );

    Ok(())
}

async fn wait_for_shutdown() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!(
            event_name = "system.server.signal_unavailable",
            error = %error,
            "could not listen for ctrl-c; bot stops only on polling failure"
        );
        std::future::pending::<()>().await;
    }
}
