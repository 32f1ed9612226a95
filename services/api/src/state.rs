//! Shared Application State
//!
//! This module defines the `AppState` struct, which holds the command router
//! and the shared capability services it is built from.

use crate::config::Config;
use nova_core::{dispatch::CommandRouter, speech::SpeechOutput, transcribe::Transcriber};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<CommandRouter>,
    pub speech: Arc<SpeechOutput>,
    pub transcriber: Arc<dyn Transcriber>,
    pub http: reqwest::Client,
    pub config: Arc<Config>,
}
