use std::process::ExitCode;
use std::sync::Arc;

use djobba_microcopy::config::Config;
use djobba_microcopy::protocol::{serve, Session};
use djobba_microcopy::services::{cache::MicrocopyCache, resolver::TextResolver, text_store};
use tokio::io::{self, BufReader};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> ExitCode {
    // stdout carries the protocol, logs go to stderr.
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    info!("Loading configuration...");
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let store = match text_store::from_config(&config) {
        Ok(store) => store,
        Err(e) => {
            error!("Text store unavailable: {e}");
            return ExitCode::FAILURE;
        }
    };

    let cache = MicrocopyCache::with_ttl(store, config.ttl);
    if config.prefetch {
        let snapshot = cache.snapshot().await;
        info!("Prefetched {} microcopy entries", snapshot.len());
    }

    let session = Arc::new(Session::new(TextResolver::new(cache)));

    info!("Ready for requests on stdin");
    if let Err(e) = serve(session, BufReader::new(io::stdin()), io::stdout()).await {
        error!("Request loop stopped: {e}");
        return ExitCode::FAILURE;
    }

    info!("stdin closed, shutting down");
    ExitCode::SUCCESS
}
