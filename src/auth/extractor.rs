//! Axum extractor running the credential check for business handlers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use tracing::debug;

use super::verifier::ApiIdentity;
use crate::http::{ApiError, AppState};

/// Header carrying the caller's API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Proof that the caller presented a valid API key.
///
/// Taking this as a handler argument rejects unauthenticated requests with
/// the error envelope before the handler body runs.
#[derive(Debug, Clone)]
pub struct Authenticated(pub ApiIdentity);

impl FromRequestParts<AppState> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // Header values are raw bytes; decode leniently so a UTF-8 secret can
        // still match and garbage simply fails the comparison.
        let presented = parts
            .headers
            .get(API_KEY_HEADER)
            .map(|value| String::from_utf8_lossy(value.as_bytes()));

        match state.verifier.verify(presented.as_deref()) {
            Ok(identity) => Ok(Authenticated(identity)),
            Err(error) => {
                debug!(path = %parts.uri.path(), error = %error, "Credential check failed");
                Err(ApiError::with_debug(error, state.debug))
            }
        }
    }
}
