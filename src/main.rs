//! Opticon - headless client driver
//!
//! Restores any existing session, refreshes every collection once and logs
//! a summary of what the client now knows.

use anyhow::Context;
use opticon::config::{self, LogConfig};
use opticon::{ApiClient, Config, Store};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::load_or_default().context("failed to load configuration")?;

    // Initialize logging; the guard flushes the file writer on exit
    let _guard = init_logging(&config.logging)?;
    info!(base_url = %config.api.base_url, "starting opticon");

    let client = ApiClient::new(config.api.clone()).context("failed to build API client")?;
    let store = Store::with_config(Arc::new(client), &config.api);

    store.check_session().await;
    store.refresh_all().await;

    let state = store.snapshot().await;
    info!(
        signed_in = state.is_logged_in(),
        stocks = state.stocks.len(),
        watchlist = state.watchlist.len(),
        active_alerts = state.active_alerts().len(),
        triggered_alerts = state.triggered_alerts().len(),
        markets = state.markets.len(),
        "refresh complete"
    );
    if let Some(portfolio) = &state.portfolio {
        info!(
            total_value = %portfolio.total_value,
            holdings = portfolio.holdings.len(),
            gain_loss = %state.holdings_total_gain_loss(),
            "portfolio loaded"
        );
    }
    if let Some(error) = &state.error {
        warn!(error = %error, "refresh finished with an error");
    }

    Ok(())
}

fn init_logging(logging: &LogConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("opticon={}", logging.level)));

    let (file_layer, guard) = if logging.file_logging {
        let dir = config::log_dir()?;
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create log directory {}", dir.display()))?;
        let appender = tracing_appender::rolling::daily(dir, "opticon.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        (
            Some(fmt::layer().with_writer(writer).with_ansi(false)),
            Some(guard),
        )
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    Ok(guard)
}
