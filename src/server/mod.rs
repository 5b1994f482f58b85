//! Long-lived HTTP wrappers around the same adapters the CLI exposes.
//!
//! Each wrapper holds exactly one model instance in shared state behind a
//! readiness slot; requests that arrive before the model is ready get 503
//! instead of a null dereference. Concurrency policy: the generator
//! serializes its calls on an internal lock, the embedder's forward pass is
//! reentrant, so neither wrapper takes a lock of its own around model calls.

mod embed;
mod summarize;

pub use embed::{run_embed_server, EmbedState};
pub use summarize::{run_summarize_server, SummarizeState};

use std::collections::BTreeMap;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::registry;

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ModelsResponse {
    models: BTreeMap<&'static str, String>,
}

/// Registry listing shared by both wrappers; no model loads involved.
pub(crate) async fn registry_models() -> Json<ModelsResponse> {
    let models = registry::list_models()
        .into_iter()
        .map(|name| {
            let info = registry::model_info(name).unwrap_or_else(|err| format!("Error: {err}"));
            (name, info)
        })
        .collect();
    Json(ModelsResponse { models })
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_status() {
        let response = error_response(StatusCode::BAD_REQUEST, "nope");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_registry_models_lists_every_entry() {
        let Json(body) = registry_models().await;
        assert_eq!(body.models.len(), registry::list_models().len());
    }
}
