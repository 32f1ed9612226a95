//! Axum Router Configuration
//!
//! This module defines the complete HTTP routing for the application,
//! including the assistant UI, the command API, and OpenAPI documentation.

use crate::{
    handlers,
    models::{CommandPayload, CommandResponse, StopResponse},
    state::AppState,
};

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::index,
        handlers::listen,
        handlers::run_command,
        handlers::stop_speech,
        handlers::suggest,
    ),
    components(schemas(CommandPayload, CommandResponse, StopResponse)),
    tags(
        (name = "Nova API", description = "Voice and text command endpoints for the Nova assistant")
    )
)]
pub struct ApiDoc;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    // Group all routes that require AppState into their own router.
    let api_router = Router::new()
        .route("/", get(handlers::index))
        .route("/listen", post(handlers::listen))
        .route("/command", post(handlers::run_command))
        .route("/stop_speech", post(handlers::stop_speech))
        .route("/suggest", get(handlers::suggest))
        .with_state(app_state);

    // Merge the stateful routes with the stateless Swagger UI.
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api_router)
}
