//! HTTP surface: router, admission middleware and handlers.

mod envelope;
mod handlers;
mod middleware;
mod server;
mod state;

pub use envelope::{ApiError, ApiResponse};
pub use middleware::{
    admission_middleware, ExemptionSet, HEADER_LIMIT, HEADER_REMAINING, HEADER_RESET,
};
pub use server::{router, HttpServer};
pub use state::AppState;

#[cfg(test)]
mod tests;
