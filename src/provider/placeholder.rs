use async_trait::async_trait;

use super::{ContentGenerator, DescriptionRequest, GeneratedContent, ProviderError, Translator};

/// Model used for Chinese-language copy.
const ZH_MODEL: &str = "ERNIE-Bot-4";
/// Model used for every other language.
const DEFAULT_MODEL: &str = "glm-4-flash";

/// Stand-in generator returning a fixed sentence.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderGenerator;

#[async_trait]
impl ContentGenerator for PlaceholderGenerator {
    async fn generate(&self, input: &DescriptionRequest) -> Result<GeneratedContent, ProviderError> {
        let model = if input.language == "zh" { ZH_MODEL } else { DEFAULT_MODEL };

        Ok(GeneratedContent {
            description: format!("This is a generated description for {}", input.product_name),
            language: input.language.clone(),
            model: model.to_string(),
        })
    }
}

/// Stand-in translator tagging the text with its language pair.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderTranslator;

#[async_trait]
impl Translator for PlaceholderTranslator {
    async fn translate(&self, text: &str, from: &str, to: &str) -> Result<String, ProviderError> {
        Ok(format!("[Translated from {} to {}] {}", from, to, text))
    }
}
