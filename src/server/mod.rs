use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::pipeline::{ProcessResult, ProcessingPipeline};
use crate::youtube::transcript::Transcript;
use crate::youtube::VideoRequest;
use crate::ProcessorError;

const LANDING_PAGE: &str = r#"<!doctype html>
<html>
  <head><title>YouTube Processor API</title></head>
  <body>
    <h1>YouTube Processor API</h1>
    <p>Fetch transcripts from YouTube videos and capture a frame for every caption.</p>
    <ul>
      <li><code>POST /transcript</code> with <code>{"video": "&lt;url or id&gt;"}</code> returns the transcript</li>
      <li><code>POST /process</code> with <code>{"video": "&lt;url or id&gt;"}</code> stores frames and records</li>
    </ul>
  </body>
</html>
"#;

/// State shared by all handlers
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ProcessingPipeline>,
}

impl AppState {
    pub fn new(pipeline: ProcessingPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }
}

/// Error response with the underlying message in `detail`
#[derive(Debug)]
pub struct ApiError(ProcessorError);

impl From<ProcessorError> for ApiError {
    fn from(err: ProcessorError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!("Request failed: {}", self.0);
        } else {
            tracing::debug!("Rejected request: {}", self.0);
        }

        (status, Json(json!({ "detail": self.0.to_string() }))).into_response()
    }
}

/// Creates the router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/transcript", post(transcript))
        .route("/process", post(process))
        .with_state(state)
}

/// Router with request tracing and CORS
pub fn create_app(state: AppState) -> Router {
    create_router(state).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    )
    .layer(CorsLayer::permissive())
}

/// Bind `addr` and serve until the process is stopped
pub async fn serve(addr: &str, state: AppState) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("Server listening on http://{}", addr);
    if !state.pipeline.can_publish() {
        tracing::warn!("POST /process will fail until storage and database are configured");
    }

    axum::serve(listener, create_app(state)).await?;
    Ok(())
}

async fn root() -> Html<&'static str> {
    Html(LANDING_PAGE)
}

async fn transcript(
    State(state): State<AppState>,
    Json(request): Json<VideoRequest>,
) -> Result<Json<Transcript>, ApiError> {
    let transcript = state.pipeline.fetch_transcript(&request.video).await?;
    Ok(Json(transcript))
}

async fn process(
    State(state): State<AppState>,
    Json(request): Json<VideoRequest>,
) -> Result<Json<ProcessResult>, ApiError> {
    tracing::info!("Processing video: {}", request.video);
    let result = state.pipeline.process(&request.video).await?;
    Ok(Json(result))
}
