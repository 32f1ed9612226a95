//! Main Entrypoint for the Nova API Service
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment.
//! 2. Initializing logging (console plus a durable file log).
//! 3. Initializing the capability services and the command router.
//! 4. Constructing the Axum router and applying middleware.
//! 5. Starting the web server and handling graceful shutdown.

use anyhow::Context;
use nova_api::{config::Config, router::create_router, state::AppState};
use nova_core::{
    answer::GeminiClient,
    automation::{KeystrokeAutomation, SystemBrowser},
    dispatch::CommandRouter,
    speech::{EspeakEngine, SpeechOutput},
    transcribe::{MicrophoneTranscriber, WhisperApiStt},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Listens for the `Ctrl+C` signal to gracefully shut down the server.
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    info!("Received shutdown signal. Shutting down gracefully...");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load configuration")?;

    // --- 2. Initialize Logging ---
    std::fs::create_dir_all(&config.log_dir).context("Failed to create log directory")?;
    let file_appender = tracing_appender::rolling::never(&config.log_dir, "app.log");
    let (file_writer, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(EnvFilter::new(config.log_level.to_string()))
        .with(fmt::layer().with_timer(fmt::time::ChronoLocal::rfc_3339()))
        .with(
            fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_timer(fmt::time::ChronoLocal::rfc_3339()),
        )
        .init();
    info!("Configuration loaded. Initializing application state...");

    // --- 3. Initialize Shared Services ---
    let speech = Arc::new(SpeechOutput::new(
        Arc::new(EspeakEngine::new(config.tts_binary.clone())),
        config.voice_hint.clone(),
    ));
    let answers = Arc::new(GeminiClient::new(
        config.gemini_api_key.clone(),
        config.gemini_model.clone(),
    ));
    let transcriber = Arc::new(MicrophoneTranscriber::new(Arc::new(WhisperApiStt::new(
        config.stt_endpoint.clone(),
        config.stt_api_key.clone(),
    ))));
    let router = Arc::new(CommandRouter::new(
        speech.clone(),
        answers,
        Arc::new(SystemBrowser),
        Arc::new(KeystrokeAutomation),
    ));

    let app_state = Arc::new(AppState {
        router,
        speech,
        transcriber,
        http: reqwest::Client::new(),
        config: Arc::new(config.clone()),
    });

    // --- 4. Create Router and Apply Middleware ---
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(app_state).layer(cors);

    // --- 5. Start Server ---
    info!(
        model = %config.gemini_model,
        tts = %config.tts_binary,
        bind_address = %config.bind_address,
        "Service configured. Starting server..."
    );
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server has shut down.");
    Ok(())
}
