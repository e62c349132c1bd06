//! Shared-secret credential verification.

use subtle::ConstantTimeEq;
use tracing::{debug, error};

use crate::error::AdmissionError;

/// Identity token handed to handlers once a caller is authenticated.
///
/// There is a single shared secret, so the key itself stands in for the
/// caller's identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiIdentity(String);

impl ApiIdentity {
    /// Identity issued in debug mode when no key is configured.
    pub const DEBUG: &'static str = "debug";

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Checks presented API keys against the process-wide secret.
#[derive(Clone)]
pub struct CredentialVerifier {
    credential: Option<String>,
    permissive: bool,
}

impl std::fmt::Debug for CredentialVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialVerifier")
            .field("configured", &self.credential.is_some())
            .field("permissive", &self.permissive)
            .finish()
    }
}

impl CredentialVerifier {
    /// Create a verifier. An empty credential counts as unconfigured.
    pub fn new(credential: Option<String>, permissive: bool) -> Self {
        Self {
            credential: credential.filter(|c| !c.is_empty()),
            permissive,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.credential.is_some()
    }

    /// Verify the key a caller presented.
    pub fn verify(&self, presented: Option<&str>) -> Result<ApiIdentity, AdmissionError> {
        let Some(expected) = self.credential.as_deref() else {
            if self.permissive {
                debug!("No API key configured, admitting caller in debug mode");
                return Ok(ApiIdentity(ApiIdentity::DEBUG.to_string()));
            }
            error!("No API key configured and debug mode is off");
            return Err(AdmissionError::Configuration);
        };

        let presented = match presented {
            Some(key) if !key.is_empty() => key,
            _ => return Err(AdmissionError::MissingCredential),
        };

        // Constant-time for equal lengths; a length mismatch returns early.
        let matches: bool = expected.as_bytes().ct_eq(presented.as_bytes()).into();
        if !matches {
            return Err(AdmissionError::InvalidCredential);
        }

        Ok(ApiIdentity(presented.to_string()))
    }
}
