use crate::config::ApiConfig;
use crate::form::{IntakeForm, Notification};
use crate::pipeline::SubmissionPipeline;
use crate::render::render_page;
use crate::ticket::PhotoFile;
use anyhow::{Context, Result};
use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::future::Future;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, instrument, warn};

/// Multipart part carrying the photo
const PHOTO_FIELD: &str = "photo";

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<SubmissionPipeline>,
}

/// Create the API router
pub fn create_router(state: AppState, config: &ApiConfig) -> Router {
    let cors = if config.cors_enabled {
        if config.cors_origins.is_empty() {
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        } else {
            let origins: Vec<_> = config
                .cors_origins
                .iter()
                .filter_map(|o| o.parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(Any)
                .allow_headers(Any)
        }
    } else {
        CorsLayer::new()
    };

    Router::new()
        .route("/", get(show_form))
        .route("/tickets", post(submit_ticket))
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Empty form
async fn show_form() -> Html<String> {
    Html(render_page(&IntakeForm::new(), None))
}

/// Accept a submitted form and run it through the pipeline
#[instrument(skip_all)]
async fn submit_ticket(State(state): State<AppState>, multipart: Multipart) -> Response {
    let mut form = match read_form(multipart).await {
        Ok(form) => form,
        Err(message) => {
            warn!(error = %message, "Rejected malformed submission");
            return (StatusCode::BAD_REQUEST, message).into_response();
        }
    };

    let notification = form.submit(&state.pipeline).await;
    let status = match notification {
        Notification::Created { .. } => StatusCode::OK,
        Notification::UploadFailed(_) | Notification::SaveFailed(_) => StatusCode::BAD_GATEWAY,
    };

    (status, Html(render_page(&form, Some(&notification)))).into_response()
}

/// Replay the multipart parts onto a fresh form
async fn read_form(mut multipart: Multipart) -> Result<IntakeForm, String> {
    let mut form = IntakeForm::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| format!("Invalid multipart data: {e}"))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if name == PHOTO_FIELD {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let content_type = field.content_type().map(String::from);
            let data = field
                .bytes()
                .await
                .map_err(|e| format!("Failed to read photo: {e}"))?;

            // Browsers send a part without a file name when no file was chosen
            if file_name.is_empty() {
                form.select_photo(None);
            } else {
                form.select_photo(Some(PhotoFile::new(file_name, content_type, data.to_vec())));
            }
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| format!("Failed to read field {name}: {e}"))?;
            form.set_field(&name, value).map_err(|e| e.to_string())?;
        }
    }

    Ok(form)
}

/// Health check endpoint
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "intake-service"
    }))
}

/// Readiness check endpoint
async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.pipeline.table().ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "ready",
                "database": "connected"
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({
                "status": "not_ready",
                "database": "disconnected",
                "error": e.to_string()
            })),
        ),
    }
}

/// Start the intake HTTP server
pub async fn start_api_server(
    state: AppState,
    config: &ApiConfig,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let router = create_router(state, config);
    let addr = format!("{}:{}", config.host, config.port);

    info!(address = %addr, "Starting intake form server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .context("API server error")?;

    Ok(())
}
