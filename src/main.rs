use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use tollgate::config::{LogFormat, LoggingConfig, TollgateConfig};
use tollgate::http::{AppState, HttpServer};
use tollgate::ratelimit::{Clock, IdleSweeper, RateLimitPolicy, SystemClock, WindowStore};

/// API key authentication and per-client rate limiting in front of the
/// content service.
#[derive(Parser, Debug)]
#[command(name = "tollgate", version)]
struct Args {
    /// Path to a YAML configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Override the listen address
    #[arg(short, long)]
    bind: Option<SocketAddr>,

    /// Enable debug mode (admits callers when no API key is configured)
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = TollgateConfig::load(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        config.server.bind_addr = bind;
    }
    if args.debug {
        config.auth.debug = true;
    }

    init_tracing(&config.logging);

    info!("Starting {} v{}", config.app.name, config.app.version);
    info!(
        bind_addr = %config.server.bind_addr,
        max_requests = config.rate_limiting.max_requests,
        window_secs = config.rate_limiting.window_secs,
        exempt_paths = ?config.rate_limiting.exempt_paths,
        "Configuration loaded"
    );

    if config.api_key().is_none() {
        if config.auth.debug {
            warn!("No API key configured; business endpoints are open (debug mode)");
        } else {
            warn!("No API key configured; business endpoints will answer 500");
        }
    }

    let store = Arc::new(WindowStore::new(RateLimitPolicy::new(
        config.rate_limiting.max_requests,
        config.rate_limiting.window(),
    )));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    if let Some(every) = config.rate_limiting.eviction_interval() {
        IdleSweeper::new(store.clone(), clock.clone(), every).spawn();
    }

    let state = AppState::new(&config, store, clock);
    let server = HttpServer::new(config.server.bind_addr, state, &config.server.cors_origins);

    // Run the server with graceful shutdown on Ctrl+C
    server.serve_with_shutdown(shutdown_signal()).await?;

    info!("Tollgate stopped");
    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true);

    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
