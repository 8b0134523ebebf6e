//! HTTP route handlers for the API.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use ragdemo_common::RagError;
use serde::Serialize;
use tracing::{debug, error};

use crate::AppState;
use crate::scenarios::{DemoView, Scenario};

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
    pub chat_model: String,
    pub embedding_model: String,
    pub stored_records: u64,
}

/// Health check endpoint.
pub async fn health(State(state): State<Arc<AppState>>) -> Result<Json<HealthResponse>, ApiError> {
    let stored_records = state.store.count().await?;

    Ok(Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.uptime_seconds(),
        chat_model: state.chat.model_name().to_string(),
        embedding_model: state.embedder.model_name().to_string(),
        stored_records,
    }))
}

/// Landing page linking every scenario.
pub async fn index() -> Html<String> {
    let items: String = Scenario::ALL
        .iter()
        .map(|s| format!("      <li><a href=\"/{n}\">{n}: {}</a></li>\n", s.title(), n = s.number()))
        .collect();

    Html(format!(
        "<!DOCTYPE html>\n<html>\n  <head><title>RAG demo</title></head>\n  <body>\n    \
         <h1>Retrieval-Augmented Generation demo</h1>\n    <ol>\n{items}    </ol>\n  </body>\n</html>\n"
    ))
}

/// Runs scenario `n`.
pub async fn scenario(
    State(state): State<Arc<AppState>>,
    Path(n): Path<String>,
) -> Result<Json<DemoView>, ApiError> {
    let scenario = n
        .parse::<usize>()
        .ok()
        .and_then(Scenario::from_number)
        .ok_or_else(|| ApiError::NotFound(format!("No demo numbered '{n}'")))?;

    debug!(scenario = scenario.number(), "Dispatching scenario");
    let view = scenario.run(&state).await?;
    Ok(Json(view))
}

/// API error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    Rag(RagError),
}

impl From<RagError> for ApiError {
    fn from(e: RagError) -> Self {
        ApiError::Rag(e)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Rag(RagError::ModelUnavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Rag(RagError::GenerationFailed(_)) => StatusCode::BAD_GATEWAY,
            ApiError::Rag(RagError::Document(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Rag(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::NotFound(error) => ErrorResponse {
                error,
                code: "NOT_FOUND",
            },
            ApiError::Rag(e) => {
                error!(error = %e, code = e.code(), "Request failed");
                ErrorResponse {
                    error: e.to_string(),
                    code: e.code(),
                }
            }
        };
        (status, Json(body)).into_response()
    }
}
