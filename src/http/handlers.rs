//! Route handlers.

use axum::body::Bytes;
use axum::extract::State;
use axum::response::{Html, IntoResponse};
use axum::Json;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info};

use super::envelope::{ApiError, ApiResponse};
use super::state::AppState;
use crate::auth::Authenticated;
use crate::error::AdmissionError;
use crate::provider::DescriptionRequest;

const DEFAULT_DESCRIPTION_LANGUAGE: &str = "zh";
const AUTO_DETECT_LANGUAGE: &str = "auto";

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": &*state.service_name,
        "version": &*state.service_version,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

pub async fn root(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "message": format!("Welcome to {}", state.service_name),
        "version": &*state.service_version,
        "docs": "/docs",
    }))
}

pub async fn openapi(State(state): State<AppState>) -> Json<Value> {
    let secured = json!([{ "ApiKeyAuth": [] }]);
    Json(json!({
        "openapi": "3.0.3",
        "info": {
            "title": &*state.service_name,
            "version": &*state.service_version,
            "description": "AI-powered content generation service for cross-border e-commerce",
        },
        "components": {
            "securitySchemes": {
                "ApiKeyAuth": { "type": "apiKey", "in": "header", "name": "X-API-Key" }
            }
        },
        "paths": {
            "/health": { "get": { "summary": "Health check" } },
            "/": { "get": { "summary": "Service banner" } },
            "/api/v1/generate/description": {
                "post": { "summary": "Generate product description", "security": secured.clone() }
            },
            "/api/v1/translate": {
                "post": { "summary": "Translate text", "security": secured }
            },
        },
    }))
}

pub async fn docs(State(state): State<AppState>) -> Html<String> {
    docs_page(&state.service_name, "API documentation")
}

pub async fn redoc(State(state): State<AppState>) -> Html<String> {
    docs_page(&state.service_name, "API reference")
}

fn docs_page(service: &str, title: &str) -> Html<String> {
    Html(format!(
        "<!doctype html><html><head><title>{service} - {title}</title></head>\
         <body><h1>{service}</h1><p>The OpenAPI document is served at \
         <a href=\"/openapi.json\">/openapi.json</a>.</p></body></html>"
    ))
}

pub async fn not_found() -> ApiError {
    AdmissionError::NotFound.into()
}

/// Parse a JSON body, reporting malformed input in the error envelope.
fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    serde_json::from_slice(body)
        .map_err(|e| AdmissionError::BadRequest(format!("Invalid JSON body: {}", e)).into())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[derive(Debug, Deserialize)]
struct GenerateDescriptionBody {
    product_name: Option<String>,
    category: Option<String>,
    #[serde(default)]
    features: Vec<String>,
    language: Option<String>,
}

pub async fn generate_description(
    State(state): State<AppState>,
    Authenticated(_identity): Authenticated,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let body: GenerateDescriptionBody = parse_body(&body)?;

    let product_name = non_empty(body.product_name)
        .ok_or_else(|| AdmissionError::BadRequest("product_name is required".to_string()))?;

    let request = DescriptionRequest {
        product_name,
        category: body.category,
        features: body.features,
        language: body
            .language
            .unwrap_or_else(|| DEFAULT_DESCRIPTION_LANGUAGE.to_string()),
    };

    let content = state.generator.generate(&request).await.map_err(|e| {
        error!(error = %e, "Content generation failed");
        ApiError::with_debug(e.into(), state.debug)
    })?;

    info!(language = %content.language, model = %content.model, "Description generated");
    Ok(ApiResponse::ok(content))
}

#[derive(Debug, Deserialize)]
struct TranslateBody {
    text: Option<String>,
    from_language: Option<String>,
    to_language: Option<String>,
}

pub async fn translate(
    State(state): State<AppState>,
    Authenticated(_identity): Authenticated,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let body: TranslateBody = parse_body(&body)?;

    let (Some(text), Some(to_language)) = (non_empty(body.text), non_empty(body.to_language))
    else {
        return Err(AdmissionError::BadRequest("text and to_language are required".to_string()).into());
    };
    let from_language = body
        .from_language
        .unwrap_or_else(|| AUTO_DETECT_LANGUAGE.to_string());

    let translated_text = state
        .translator
        .translate(&text, &from_language, &to_language)
        .await
        .map_err(|e| {
            error!(error = %e, "Translation failed");
            ApiError::with_debug(e.into(), state.debug)
        })?;

    info!(from = %from_language, to = %to_language, "Text translated");
    Ok(ApiResponse::ok(json!({
        "translated_text": translated_text,
        "from_language": from_language,
        "to_language": to_language,
    })))
}
