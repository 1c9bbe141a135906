use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing::get, routing::post};
use color_eyre::eyre::{Context, eyre};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::http_server::{error::Report, state::AppState};
use crate::services::rescue::{RescueMode, RescueService};

async fn root() -> &'static str {
    "playlist-rescuer"
}

pub async fn start(port: u16, state: Arc<AppState>) -> color_eyre::Result<()> {
    let app = Router::new()
        .route("/", get(root))
        .route("/rescue-playlists/{mode}", post(rescue_playlists))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .wrap_err_with(|| eyre!("Failed to bind to port {}", port))?;
    log::info!("Listening on 0.0.0.0:{}", port);
    axum::serve(listener, app)
        .await
        .wrap_err("Failed to start HTTP server")?;

    Ok(())
}

/// Scheduled trigger: run a rescue pass for the cadence in the path.
///
/// The caller authenticates with a shared secret; verifying a full request
/// signature is the fronting scheduler's concern, this endpoint only sees the
/// pass/fail outcome of presenting the secret. The response is a bare ok;
/// per-collection failures are logged, never surfaced to the scheduler.
async fn rescue_playlists(
    State(state): State<Arc<AppState>>,
    Path(mode): Path<String>,
    headers: HeaderMap,
) -> Response {
    let presented = headers
        .get("x-rescue-secret")
        .and_then(|value| value.to_str().ok());
    if presented != Some(state.rescue_secret.as_str()) {
        return (StatusCode::UNAUTHORIZED, "invalid rescue secret").into_response();
    }

    let mode: RescueMode = match mode.parse() {
        Ok(mode) => mode,
        Err(err) => return (StatusCode::BAD_REQUEST, err.to_string()).into_response(),
    };

    let service = RescueService::new(state.db.clone(), state.spotify.clone());
    match service.run(mode).await {
        Ok(report) => {
            log::info!(
                "Triggered {} run delivered {} tracks across {} collections",
                mode,
                report.tracks_delivered,
                report.collections_processed
            );
            Json(serde_json::json!({ "status": "ok" })).into_response()
        }
        Err(err) => Report::from(err).into_response(),
    }
}
