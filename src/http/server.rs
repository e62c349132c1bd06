//! HTTP server wiring.

use std::net::SocketAddr;

use axum::http::HeaderValue;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use super::handlers;
use super::middleware::admission_middleware;
use super::state::AppState;
use crate::error::{Result, TollgateError};

/// Build the application router with admission control applied.
///
/// CORS sits outside admission, so preflight requests are answered without
/// being charged against the caller's budget.
pub fn router(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/", get(handlers::root))
        .route("/openapi.json", get(handlers::openapi))
        .route("/docs", get(handlers::docs))
        .route("/redoc", get(handlers::redoc))
        .route("/api/v1/generate/description", post(handlers::generate_description))
        .route("/api/v1/translate", post(handlers::translate))
        .fallback(handlers::not_found)
        .layer(middleware::from_fn_with_state(state.clone(), admission_middleware))
        .layer(CompressionLayer::new())
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Origin entry that admits any caller.
const ANY_ORIGIN: &str = "*";

fn cors_layer(origins: &[String]) -> CorsLayer {
    // `*` cannot be sent alongside credentials; echo the caller's origin.
    let allow_origin = if origins.iter().any(|origin| origin == ANY_ORIGIN) {
        AllowOrigin::mirror_request()
    } else {
        AllowOrigin::list(valid_origins(origins))
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

fn valid_origins(origins: &[String]) -> Vec<HeaderValue> {
    origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect()
}

/// HTTP server for the admission layer.
pub struct HttpServer {
    /// Address to bind to
    addr: SocketAddr,
    /// Fully built router
    router: Router,
}

impl HttpServer {
    /// Create a new server serving `state` on `addr`.
    pub fn new(addr: SocketAddr, state: AppState, cors_origins: &[String]) -> Self {
        Self {
            addr,
            router: router(state, cors_origins),
        }
    }

    /// Start the server with graceful shutdown.
    ///
    /// The server stops accepting connections when `signal` resolves and
    /// returns once in-flight requests have completed.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.addr).await.map_err(|e| {
            error!(addr = %self.addr, error = %e, "Failed to bind HTTP listener");
            TollgateError::Io(e)
        })?;

        info!(addr = %self.addr, "Starting HTTP server");

        axum::serve(
            listener,
            self.router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(signal)
        .await
        .map_err(|e| {
            error!(error = %e, "HTTP server failed");
            TollgateError::Io(e)
        })
    }
}
