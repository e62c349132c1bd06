//! API key authentication.

mod extractor;
mod verifier;

pub use extractor::{Authenticated, API_KEY_HEADER};
pub use verifier::{ApiIdentity, CredentialVerifier};
