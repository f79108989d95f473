//! SFin Data - fundamentals retrieval and screening service.
//!
//! Serves cached company statements and screening queries from an upstream
//! equity research website, behind a single managed login session.

use anyhow::Result;
use sfin_common::config::Config;
use sfin_common::logging::init_logging;
use sfin_data::DataService;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;

    init_logging(
        &config.observability.log_level,
        &config.observability.log_format,
    );

    tracing::info!("SFin Data v{}", env!("CARGO_PKG_VERSION"));

    if !config.credentials.is_complete() {
        tracing::warn!(
            "No upstream credentials configured; data requests will fail until \
             SCREENER_EMAIL and SCREENER_PASSWORD are set"
        );
    }

    let service = DataService::new(config);
    service.start().await
}
