//! Summarizer server: registry-configured code summarization over HTTP.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use super::error_response;
use crate::adapters::GenerateAdapter;
use crate::backend::GgufGenerator;
use crate::error::Result;
use crate::registry;

/// Shared state: the configured model name plus the readiness slot.
pub struct SummarizeState {
    pub model_name: String,
    pub adapter: RwLock<Option<Arc<GenerateAdapter>>>,
}

impl SummarizeState {
    pub fn new(model_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            adapter: RwLock::new(None),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SummarizeRequest {
    text: String,
    #[serde(default)]
    instructions: Option<String>,
    #[serde(default)]
    system_prompt: Option<String>,
}

#[derive(Debug, Serialize)]
struct SummarizeResponse {
    summary: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    model: String,
    available_models: Vec<&'static str>,
}

pub(crate) fn router(state: Arc<SummarizeState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/models", get(super::registry_models))
        .route("/summarize", post(summarize))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

async fn health(State(state): State<Arc<SummarizeState>>) -> Json<HealthResponse> {
    let ready = state.adapter.read().await.is_some();
    Json(HealthResponse {
        status: if ready { "healthy" } else { "model_not_loaded" },
        model: state.model_name.clone(),
        available_models: registry::list_models(),
    })
}

pub(crate) async fn summarize(
    State(state): State<Arc<SummarizeState>>,
    Json(request): Json<SummarizeRequest>,
) -> Response {
    let guard = state.adapter.read().await;
    let Some(adapter) = guard.as_ref().map(Arc::clone) else {
        return error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "Model not loaded. Server may still be initializing.",
        );
    };
    drop(guard);

    if request.text.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "text field cannot be empty");
    }

    let result = adapter
        .summarize(
            &request.text,
            request.instructions.as_deref().unwrap_or(""),
            request.system_prompt.as_deref().unwrap_or(""),
        )
        .await;

    match result {
        Ok(summary) => Json(SummarizeResponse { summary }).into_response(),
        Err(err) => {
            warn!("summarization failed: {err}");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("summarization failed: {err}"),
            )
        }
    }
}

/// Resolve the registry entry, load the generator, then serve until the
/// process is killed.
pub async fn run_summarize_server(
    addr: SocketAddr,
    model_name: &str,
    weights_override: Option<&Path>,
    tokenizer_override: Option<&Path>,
    ctx_size: usize,
) -> Result<()> {
    let config = registry::get_model_config(model_name)?;
    info!("requested model: {model_name} ({})", config.description);

    let weights: PathBuf = weights_override
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(&config.model_id));
    let tokenizer: PathBuf = tokenizer_override
        .map(Path::to_path_buf)
        .unwrap_or_else(|| sibling_tokenizer(&weights));

    let generator = GgufGenerator::load(&weights, &tokenizer, ctx_size, config.eos_token_id)?;
    let adapter = GenerateAdapter::new(Arc::new(generator), config);

    let state = Arc::new(SummarizeState::new(model_name));
    *state.adapter.write().await = Some(Arc::new(adapter));
    info!("model loaded and ready");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("summarizer server listening on {addr}");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// Default tokenizer location: `tokenizer.json` next to the weights.
pub(crate) fn sibling_tokenizer(weights: &Path) -> PathBuf {
    weights
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join("tokenizer.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_not_ready_is_service_unavailable() {
        let state = Arc::new(SummarizeState::new("qwen2.5-1.5b"));
        let response = summarize(
            State(state),
            Json(SummarizeRequest {
                text: "fn main() {}".to_string(),
                instructions: None,
                system_prompt: None,
            }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_blank_text_rejected() {
        use crate::backend::TextGenerator;
        use crate::config::{ModelConfig, SamplingOptions};

        struct EchoGenerator;

        #[async_trait::async_trait]
        impl TextGenerator for EchoGenerator {
            async fn generate(
                &self,
                _prompt: &str,
                _options: &SamplingOptions,
            ) -> Result<String> {
                Ok("summary".to_string())
            }
        }

        let state = Arc::new(SummarizeState::new("qwen2.5-1.5b"));
        *state.adapter.write().await = Some(Arc::new(GenerateAdapter::new(
            Arc::new(EchoGenerator),
            ModelConfig::default(),
        )));

        let response = summarize(
            State(state.clone()),
            Json(SummarizeRequest {
                text: "   ".to_string(),
                instructions: None,
                system_prompt: None,
            }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        // A real request goes through once the model is ready.
        let response = summarize(
            State(state),
            Json(SummarizeRequest {
                text: "fn main() {}".to_string(),
                instructions: Some("One sentence.".to_string()),
                system_prompt: None,
            }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_sibling_tokenizer_path() {
        assert_eq!(
            sibling_tokenizer(Path::new("models/qwen.gguf")),
            PathBuf::from("models/tokenizer.json")
        );
    }

    #[tokio::test]
    async fn test_health_reports_registry() {
        let state = Arc::new(SummarizeState::new("qwen2.5-1.5b"));
        let Json(body) = health(State(state)).await;
        assert_eq!(body.status, "model_not_loaded");
        assert!(body.available_models.contains(&"qwen2.5-1.5b"));
    }
}
