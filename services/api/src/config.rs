use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

use nova_core::transcribe::DEFAULT_STT_ENDPOINT;

pub const DEFAULT_SUGGEST_ENDPOINT: &str = "https://suggestqueries.google.com/complete/search";

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub stt_endpoint: String,
    pub stt_api_key: Option<String>,
    pub suggest_endpoint: String,
    pub tts_binary: String,
    pub voice_hint: String,
    pub listen_timeout: Duration,
    pub log_level: Level,
    pub log_dir: PathBuf,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:5000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let gemini_api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| ConfigError::MissingVar("GEMINI_API_KEY".to_string()))?;

        let gemini_model =
            std::env::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-1.5-flash".to_string());

        let stt_endpoint =
            std::env::var("STT_ENDPOINT").unwrap_or_else(|_| DEFAULT_STT_ENDPOINT.to_string());
        let stt_api_key = std::env::var("STT_API_KEY").ok();

        let suggest_endpoint = std::env::var("SUGGEST_ENDPOINT")
            .unwrap_or_else(|_| DEFAULT_SUGGEST_ENDPOINT.to_string());

        let tts_binary = std::env::var("TTS_BIN").unwrap_or_else(|_| "espeak-ng".to_string());
        let voice_hint = std::env::var("TTS_VOICE_HINT").unwrap_or_else(|_| "zira".to_string());

        let listen_timeout_str =
            std::env::var("LISTEN_TIMEOUT_SECS").unwrap_or_else(|_| "5".to_string());
        let listen_timeout_secs = listen_timeout_str.parse::<u64>().map_err(|e| {
            ConfigError::InvalidValue("LISTEN_TIMEOUT_SECS".to_string(), e.to_string())
        })?;
        let listen_timeout = Duration::from_secs(listen_timeout_secs);

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let log_dir = std::env::var("LOG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./logs"));

        Ok(Self {
            bind_address,
            gemini_api_key,
            gemini_model,
            stt_endpoint,
            stt_api_key,
            suggest_endpoint,
            tts_binary,
            voice_hint,
            listen_timeout,
            log_level,
            log_dir,
        })
    }
}
