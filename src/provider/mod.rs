//! External content providers.
//!
//! Content generation and translation are delegated to outside services.
//! The admission layer only needs the request/response contract defined
//! here; the bundled implementations are placeholders that echo their input.

mod placeholder;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use placeholder::{PlaceholderGenerator, PlaceholderTranslator};

/// Errors reported by a provider.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// The provider could not be reached
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    /// The provider answered with something unusable
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
}

/// Input for a product description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptionRequest {
    pub product_name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub features: Vec<String>,
    pub language: String,
}

/// A generated product description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedContent {
    pub description: String,
    pub language: String,
    pub model: String,
}

/// Generates marketing copy.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(&self, input: &DescriptionRequest) -> Result<GeneratedContent, ProviderError>;
}

/// Translates text between languages.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, from: &str, to: &str) -> Result<String, ProviderError>;
}
