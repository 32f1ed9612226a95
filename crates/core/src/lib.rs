//! Nova Assistant Core
//!
//! This crate contains the command classification and dispatch engine for the
//! Nova personal assistant, together with the wrappers around its external
//! capabilities: speech output, voice transcription, the generative answer
//! backend, and browser/desktop automation. The web service in `services/api`
//! is a thin shell over these pieces.

pub mod answer;
pub mod automation;
pub mod command;
pub mod dispatch;
pub mod speech;
pub mod transcribe;
