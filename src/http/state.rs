//! Shared state handed to every handler and to the admission middleware.

use std::sync::Arc;

use super::middleware::ExemptionSet;
use crate::auth::CredentialVerifier;
use crate::config::TollgateConfig;
use crate::provider::{ContentGenerator, PlaceholderGenerator, PlaceholderTranslator, Translator};
use crate::ratelimit::{Clock, RateLimiterBackend};

#[derive(Clone)]
pub struct AppState {
    pub service_name: Arc<str>,
    pub service_version: Arc<str>,
    /// Include internal error detail in responses
    pub debug: bool,
    pub verifier: Arc<CredentialVerifier>,
    pub limiter: Arc<dyn RateLimiterBackend>,
    pub clock: Arc<dyn Clock>,
    pub exempt: Arc<ExemptionSet>,
    pub generator: Arc<dyn ContentGenerator>,
    pub translator: Arc<dyn Translator>,
}

impl AppState {
    /// Build state from configuration with the placeholder providers.
    pub fn new(
        config: &TollgateConfig,
        limiter: Arc<dyn RateLimiterBackend>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            service_name: config.app.name.as_str().into(),
            service_version: config.app.version.as_str().into(),
            debug: config.auth.debug,
            verifier: Arc::new(CredentialVerifier::new(
                config.api_key().map(str::to_string),
                config.auth.debug,
            )),
            limiter,
            clock,
            exempt: Arc::new(ExemptionSet::new(
                config.rate_limiting.exempt_paths.iter().cloned(),
            )),
            generator: Arc::new(PlaceholderGenerator),
            translator: Arc::new(PlaceholderTranslator),
        }
    }

    /// Replace the content generator.
    pub fn with_generator(mut self, generator: Arc<dyn ContentGenerator>) -> Self {
        self.generator = generator;
        self
    }

    /// Replace the translator.
    pub fn with_translator(mut self, translator: Arc<dyn Translator>) -> Self {
        self.translator = translator;
        self
    }
}
