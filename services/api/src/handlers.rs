//! Axum Handlers for the REST API
//!
//! The command endpoints never fail at the transport level: every request
//! gets a 200 with a textual result, and anything that goes wrong inside a
//! capability surfaces as `Error: ...` text in that result. It uses `utoipa`
//! doc comments to generate OpenAPI documentation.

use axum::{
    extract::{Query, State},
    response::{Html, Json},
};
use std::sync::Arc;
use tracing::warn;

use crate::{
    models::{CommandPayload, CommandResponse, StopResponse, SuggestQuery},
    state::AppState,
};

/// Serve the assistant's web page.
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "The assistant UI", content_type = "text/html")
    )
)]
pub async fn index() -> Html<&'static str> {
    Html(include_str!("../assets/index.html"))
}

/// Capture one voice command from the microphone and execute it.
#[utoipa::path(
    post,
    path = "/listen",
    responses(
        (status = 200, description = "Recognized command and its result", body = CommandResponse)
    )
)]
pub async fn listen(State(state): State<Arc<AppState>>) -> Json<CommandResponse> {
    let command = state.transcriber.listen(state.config.listen_timeout).await;
    let result = state.router.dispatch(&command).await;
    Json(CommandResponse { result, command })
}

/// Execute a typed command.
#[utoipa::path(
    post,
    path = "/command",
    request_body = CommandPayload,
    responses(
        (status = 200, description = "Result of executing the command", body = CommandResponse)
    )
)]
pub async fn run_command(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CommandPayload>,
) -> Json<CommandResponse> {
    let result = state.router.dispatch(&payload.command).await;
    Json(CommandResponse {
        result,
        command: payload.command,
    })
}

/// Interrupt the current speech playback.
#[utoipa::path(
    post,
    path = "/stop_speech",
    responses(
        (status = 200, description = "Whether speech was stopped", body = StopResponse)
    )
)]
pub async fn stop_speech(State(state): State<Arc<AppState>>) -> Json<StopResponse> {
    let result = state.speech.stop().await;
    Json(StopResponse { result })
}

/// Proxy search suggestions for the command input box.
///
/// Degrades to an empty suggestion list on any upstream failure so the UI
/// keeps working offline.
#[utoipa::path(
    get,
    path = "/suggest",
    params(SuggestQuery),
    responses(
        (status = 200, description = "Suggestion array in firefox suggest format")
    )
)]
pub async fn suggest(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SuggestQuery>,
) -> Json<serde_json::Value> {
    match fetch_suggestions(&state.http, &state.config.suggest_endpoint, &query.q).await {
        Ok(suggestions) => Json(suggestions),
        Err(e) => {
            warn!(error = %e, q = %query.q, "Suggestion lookup failed");
            Json(serde_json::json!([query.q, []]))
        }
    }
}

async fn fetch_suggestions(
    http: &reqwest::Client,
    endpoint: &str,
    q: &str,
) -> anyhow::Result<serde_json::Value> {
    let response = http
        .get(endpoint)
        .query(&[("client", "firefox"), ("q", q)])
        .send()
        .await?
        .error_for_status()?;
    Ok(response.json().await?)
}
