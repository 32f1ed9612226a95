//! Answer Backend
//!
//! Wraps the generative-language service used for commands no rule claims.
//! Failures are typed: the dispatcher maps each tag to the user-facing
//! `Error: ...` string instead of catching untyped errors at call sites.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

/// Failure tags for the answer backend. The `Display` text is exactly what
/// the user sees after the dispatcher prefixes it with `Error: `.
#[derive(Debug, thiserror::Error)]
pub enum AnswerError {
    /// The service could not be reached or answered with an error status.
    #[error("Unable to contact Gemini API.")]
    Transport(String),
    /// The service answered, but the body was not the expected shape.
    #[error("Unexpected response format from Gemini API.")]
    Format(String),
}

/// External generative-language capability.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AnswerBackend: Send + Sync {
    async fn ask(&self, prompt: &str) -> Result<String, AnswerError>;
}

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Client for the Gemini `generateContent` REST endpoint.
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::with_base_url(DEFAULT_BASE_URL, api_key, model)
    }

    /// Same as [`GeminiClient::new`] with an overridable service root, so
    /// tests can point the client at a local server.
    pub fn with_base_url(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }
}

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

/// Extracts `candidates[0].content.parts[0].text`.
fn first_candidate_text(response: GenerateContentResponse) -> Option<String> {
    response
        .candidates
        .into_iter()
        .next()?
        .content
        .parts
        .into_iter()
        .next()
        .map(|part| part.text)
}

#[async_trait]
impl AnswerBackend for GeminiClient {
    async fn ask(&self, prompt: &str) -> Result<String, AnswerError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );
        let body = GenerateContentRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        debug!(model = %self.model, "Querying Gemini");
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                error!(cause = %e, "Error querying Gemini API");
                AnswerError::Transport(e.to_string())
            })?;

        let decoded: GenerateContentResponse = response.json().await.map_err(|e| {
            error!(cause = %e, "Gemini response could not be decoded");
            AnswerError::Format(e.to_string())
        })?;

        first_candidate_text(decoded).ok_or_else(|| {
            error!("Gemini response carried no candidate text");
            AnswerError::Format("missing candidates[0].content.parts[0].text".to_string())
        })
    }
}
