//! This file defines the footprints binary entry point.

use footprints::app;
use footprints::app_state::AppState;
use footprints::cli;
use footprints::error::log_error_chain;
use footprints::metrics;
use footprints::server;
use footprints::tracing;

use std::process::exit;
use std::sync::Arc;

/// Application entry point
#[tokio::main]
async fn main() {
    let args = cli::parse();
    tracing::init_tracing(&args);
    ::tracing::debug!(?args, "parsed command line arguments");
    metrics::register_metrics();

    let state = match AppState::init(&args).await {
        Ok(state) => state,
        Err(error) => {
            log_error_chain(&error);
            tracing::shutdown_tracing();
            exit(1)
        }
    };

    let service = app::service(Arc::new(state));
    if let Err(error) = server::serve(&args, service).await {
        ::tracing::error!("server error: {}", error);
        tracing::shutdown_tracing();
        exit(1)
    }
    tracing::shutdown_tracing();
}
