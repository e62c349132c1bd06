//! Admission middleware: exemption check, rate check, header bookkeeping.

use std::collections::HashSet;
use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::{debug, trace, warn};

use super::envelope::ApiError;
use super::state::AppState;
use crate::error::AdmissionError;
use crate::ratelimit::{ClientIdentity, RateLimitDecision};

pub const HEADER_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const HEADER_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const HEADER_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Paths that skip both authentication and rate limiting.
///
/// Matching is exact on the request path; query strings never take part.
#[derive(Debug, Clone, Default)]
pub struct ExemptionSet {
    paths: HashSet<String>,
}

impl ExemptionSet {
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths.contains(path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Gate every request on the caller's rate budget.
///
/// Exempt paths pass straight through untouched. Everything else is charged
/// against the peer address; over-budget callers get a 429 without the
/// handler running, admitted callers get their remaining budget attached to
/// the handler's response. Credential checks happen in the business
/// handlers themselves, so both gates apply independently.
pub async fn admission_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path();

    if state.exempt.contains(path) {
        trace!(path = %path, "Exempt path, skipping admission");
        return next.run(request).await;
    }

    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let identity = ClientIdentity::from_peer(peer);

    // The store lock is released before the handler is awaited.
    let decision = state.limiter.check_and_record(&identity, state.clock.now());

    if !decision.allowed {
        warn!(
            identity = %identity,
            path = %path,
            limit = decision.policy.max_requests,
            "Rejecting request over rate limit"
        );
        return ApiError::from(AdmissionError::RateLimitExceeded {
            limit: decision.policy.max_requests,
            window_secs: decision.policy.window_secs(),
        })
        .into_response();
    }

    debug!(
        identity = %identity,
        path = %path,
        remaining = decision.remaining,
        "Request admitted"
    );

    let mut response = next.run(request).await;
    annotate(response.headers_mut(), &decision);
    response
}

/// Attach the caller's budget to an admitted response.
fn annotate(headers: &mut HeaderMap, decision: &RateLimitDecision) {
    headers.insert(HEADER_LIMIT, HeaderValue::from(decision.policy.max_requests));
    headers.insert(HEADER_REMAINING, HeaderValue::from(decision.remaining));
    headers.insert(HEADER_RESET, HeaderValue::from(decision.reset_at_secs()));
}
