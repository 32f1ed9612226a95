//! API Models
//!
//! Request and response bodies for the command endpoints, shared between the
//! handlers and the OpenAPI documentation generated with `utoipa`.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// A typed or dictated command submitted for execution.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CommandPayload {
    /// Missing or null command text is treated as no input.
    #[serde(default)]
    #[schema(example = "what is the time")]
    pub command: String,
}

/// Result of executing one command.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CommandResponse {
    #[schema(example = "The time is 09:41 AM")]
    pub result: String,
    /// The command text that was executed, echoed back for display.
    #[schema(example = "what is the time")]
    pub command: String,
}

/// Result of a stop-speech request.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StopResponse {
    #[schema(example = "Speech stopped.")]
    pub result: String,
}

/// Query parameters for the search-suggestion proxy.
#[derive(Debug, Deserialize, IntoParams)]
pub struct SuggestQuery {
    /// Partial query to complete.
    #[serde(default)]
    pub q: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_command_field_defaults_to_empty() {
        let payload: CommandPayload = serde_json::from_str("{}").unwrap();
        assert_eq!(payload.command, "");
    }

    #[test]
    fn command_response_serializes_both_fields() {
        let response = CommandResponse {
            result: "Goodbye! Exiting now...".to_string(),
            command: "exit".to_string(),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["result"], "Goodbye! Exiting now...");
        assert_eq!(json["command"], "exit");
    }
}
