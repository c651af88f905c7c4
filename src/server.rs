//! HTTP surface: frame ingestion and the crowd-direction read endpoint.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use log::{error, info};
use serde::Deserialize;
use serde_json::json;

use crate::aggregate::{aggregate, dominant};
use crate::config::ReadMode;
use crate::ingest::Ingestor;
use crate::models::{AnalysisOutcome, Direction, Frame};
use crate::store::RecordStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub ingestor: Arc<Ingestor>,
    pub read_mode: ReadMode,
}

/// Boundary errors. Internal detail stays in the log; the client sees one of
/// the generic messages below.
enum ApiError {
    /// Read-side store failure.
    Internal,
    /// Ingestion failure, classifier and persistence alike.
    Analysis,
    /// The submitted frame payload could not be parsed.
    BadFrame,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error"),
            ApiError::Analysis => (StatusCode::INTERNAL_SERVER_ERROR, "Failed to analyze frame"),
            ApiError::BadFrame => (StatusCode::BAD_REQUEST, "invalid frame payload"),
        };
        (
            status,
            [(header::CACHE_CONTROL, "no-store")],
            Json(json!({ "error": message })),
        )
            .into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/crowd-analysis", get(crowd_analysis))
        .route("/api/analyze-frame", post(analyze_frame))
        .with_state(state)
}

pub async fn serve(state: AppState, bind_addr: &str) -> Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    info!("listening on http://{bind_addr}");
    axum::serve(listener, app).await.context("server terminated")
}

async fn crowd_analysis(State(state): State<AppState>) -> Result<Response, ApiError> {
    let body = match state.read_mode {
        ReadMode::Aggregate => {
            let records = state.store.all().await.map_err(|err| {
                error!("failed to read analysis history: {err}");
                ApiError::Internal
            })?;
            let direction = dominant(&aggregate(&records));
            json!({ "Crowd": direction.display_label() })
        }
        ReadMode::Latest => {
            let latest = state.store.latest().await.map_err(|err| {
                error!("failed to read latest analysis: {err}");
                ApiError::Internal
            })?;
            let direction = latest
                .map(|record| record.direction)
                .unwrap_or(Direction::NEUTRAL);
            json!({ "position": direction.display_label() })
        }
    };

    // Each call must reflect current store state; never let the HTTP layer
    // serve a stale copy.
    Ok(([(header::CACHE_CONTROL, "no-store")], Json(body)).into_response())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeFrameRequest {
    frame_data_uri: String,
}

async fn analyze_frame(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeFrameRequest>,
) -> Result<Json<AnalysisOutcome>, ApiError> {
    let frame = Frame::from_data_uri(&request.frame_data_uri).map_err(|err| {
        error!("rejecting frame submission: {err}");
        ApiError::BadFrame
    })?;

    let outcome = state
        .ingestor
        .analyze_frame(&frame)
        .await
        .map_err(|_| ApiError::Analysis)?;

    Ok(Json(outcome))
}
