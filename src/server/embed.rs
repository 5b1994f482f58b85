//! Embedding server: batch text-to-vector over HTTP.

use std::net::SocketAddr;
use std::path::Path;
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
use tracing::info;

use super::error_response;
use crate::backend::{BertEmbedder, TextEmbedder};
use crate::error::Result;

/// Shared state: the model identifier plus the readiness slot.
pub struct EmbedState {
    pub model: String,
    pub embedder: RwLock<Option<Arc<dyn TextEmbedder>>>,
}

impl EmbedState {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            embedder: RwLock::new(None),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct EmbedRequest {
    texts: Vec<String>,
}

#[derive(Debug, Serialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    model: String,
    dimension: Option<usize>,
}

pub(crate) fn router(state: Arc<EmbedState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/models", get(super::registry_models))
        .route("/embed", post(embed))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

async fn health(State(state): State<Arc<EmbedState>>) -> Json<HealthResponse> {
    let guard = state.embedder.read().await;
    Json(HealthResponse {
        status: if guard.is_some() {
            "healthy"
        } else {
            "model_not_loaded"
        },
        model: state.model.clone(),
        dimension: guard.as_ref().map(|embedder| embedder.dimension()),
    })
}

pub(crate) async fn embed(
    State(state): State<Arc<EmbedState>>,
    Json(request): Json<EmbedRequest>,
) -> Response {
    let guard = state.embedder.read().await;
    let Some(embedder) = guard.as_ref().map(Arc::clone) else {
        return error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "Model not loaded. Server may still be initializing.",
        );
    };
    drop(guard);

    if request.texts.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "texts cannot be empty");
    }

    match embedder.embed(&request.texts).await {
        Ok(embeddings) => Json(EmbedResponse { embeddings }).into_response(),
        Err(err) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("embedding failed: {err}"),
        ),
    }
}

/// Load the embedding model, then serve until the process is killed.
pub async fn run_embed_server(addr: SocketAddr, model_dir: &Path) -> Result<()> {
    info!("loading embedding model from {}", model_dir.display());
    let embedder = BertEmbedder::load(model_dir)?;

    let state = Arc::new(EmbedState::new(model_dir.display().to_string()));
    *state.embedder.write().await = Some(Arc::new(embedder));
    info!("model loaded and ready");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("embedding server listening on {addr}");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InferError;

    struct TinyEmbedder;

    #[async_trait::async_trait]
    impl TextEmbedder for TinyEmbedder {
        fn dimension(&self) -> usize {
            2
        }

        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            if texts.iter().any(|t| t == "poison") {
                return Err(InferError::Inference("bad batch".to_string()));
            }
            Ok(texts.iter().map(|_| vec![0.0, 1.0]).collect())
        }
    }

    async fn ready_state() -> Arc<EmbedState> {
        let state = Arc::new(EmbedState::new("test-model"));
        *state.embedder.write().await = Some(Arc::new(TinyEmbedder));
        state
    }

    #[tokio::test]
    async fn test_not_ready_is_service_unavailable() {
        let state = Arc::new(EmbedState::new("test-model"));
        let response = embed(
            State(state),
            Json(EmbedRequest {
                texts: vec!["hello".to_string()],
            }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_empty_texts_rejected_before_model_call() {
        let state = ready_state().await;
        let response = embed(State(state), Json(EmbedRequest { texts: vec![] })).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_embed_success() {
        let state = ready_state().await;
        let response = embed(
            State(state),
            Json(EmbedRequest {
                texts: vec!["a".to_string(), "b".to_string()],
            }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_backend_error_is_internal_error() {
        let state = ready_state().await;
        let response = embed(
            State(state),
            Json(EmbedRequest {
                texts: vec!["poison".to_string()],
            }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
