//! Speech Output
//!
//! Asynchronous text-to-speech with a single process-wide session slot.
//! `SpeechOutput` owns the slot as instance state and is injected wherever
//! speech is needed, so tests can substitute an engine that records calls
//! instead of producing audio. The engine seam is the `VoiceEngine` trait;
//! the production implementation drives a CLI synthesizer subprocess
//! (`espeak-ng` by default) whose spawn is the asynchronous start and whose
//! kill is the skip-to-end primitive.

use std::io;
use std::process::{Child, Stdio};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, error, warn};

/// Bounded "effectively all" count passed to the skip primitive.
pub const SKIP_ALL_SENTENCES: u32 = 1000;

#[derive(Debug, thiserror::Error)]
pub enum SpeechError {
    #[error("voice engine failure: {0}")]
    Engine(String),
    #[error("playback failure: {0}")]
    Playback(String),
}

/// One synthesizer voice, as advertised by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voice {
    /// Identifier understood by the engine (e.g. an espeak voice name).
    pub id: String,
    /// Human-readable description, matched against the configured voice hint.
    pub description: String,
}

/// Control handle for one in-flight utterance.
pub trait PlaybackHandle: Send {
    /// Skip forward through up to `sentences` remaining sentence units.
    ///
    /// Skipping an utterance that already finished must succeed.
    fn skip(&mut self, sentences: u32) -> Result<(), SpeechError>;
}

/// External text-to-speech capability.
pub trait VoiceEngine: Send + Sync {
    /// Enumerates the voices this engine can speak with.
    fn voices(&self) -> Result<Vec<Voice>, SpeechError>;

    /// Begins asynchronous playback of `text` and returns without waiting
    /// for it to finish. `None` selects the engine default voice.
    fn start(&self, text: &str, voice: Option<&Voice>)
    -> Result<Box<dyn PlaybackHandle>, SpeechError>;
}

/// The speech-output service: voice selection plus the single session slot.
///
/// Starting a new utterance overwrites the slot without cancelling the
/// previous playback; `stop` only ever affects the most recently started
/// utterance. This matches the one-human-operator assumption of the system.
pub struct SpeechOutput {
    engine: Arc<dyn VoiceEngine>,
    voice_hint: String,
    session: Mutex<Option<Box<dyn PlaybackHandle>>>,
}

impl SpeechOutput {
    pub fn new(engine: Arc<dyn VoiceEngine>, voice_hint: impl Into<String>) -> Self {
        Self {
            engine,
            voice_hint: voice_hint.into(),
            session: Mutex::new(None),
        }
    }

    /// Speaks `text` without blocking on playback.
    ///
    /// Any engine failure is logged and swallowed; a command must never fail
    /// because audio output is unavailable.
    pub async fn speak(&self, text: &str) {
        let voice = self.pick_voice();
        match self.engine.start(text, voice.as_ref()) {
            Ok(handle) => {
                let mut slot = self.session.lock().await;
                *slot = Some(handle);
            }
            Err(e) => error!(error = %e, "Failed to start speech playback"),
        }
    }

    /// Interrupts the most recently started utterance.
    pub async fn stop(&self) -> String {
        let mut slot = self.session.lock().await;
        match slot.as_mut() {
            Some(handle) => match handle.skip(SKIP_ALL_SENTENCES) {
                Ok(()) => "Speech stopped.".to_string(),
                Err(e) => {
                    error!(error = %e, "Error stopping speech");
                    format!("Error: {e}")
                }
            },
            None => "No speech in progress.".to_string(),
        }
    }

    /// Prefers a voice whose description contains the configured hint
    /// (case-insensitive), falling back to the engine default.
    fn pick_voice(&self) -> Option<Voice> {
        let hint = self.voice_hint.to_lowercase();
        match self.engine.voices() {
            Ok(voices) => voices
                .into_iter()
                .find(|v| v.description.to_lowercase().contains(&hint)),
            Err(e) => {
                warn!(error = %e, "Voice enumeration failed, using engine default");
                None
            }
        }
    }
}

/// CLI synthesizer engine. Voices are probed once at construction so the
/// per-utterance path never shells out for enumeration.
pub struct EspeakEngine {
    binary: String,
    voices: Vec<Voice>,
}

impl EspeakEngine {
    pub fn new(binary: impl Into<String>) -> Self {
        let binary = binary.into();
        let voices = match probe_voices(&binary) {
            Ok(voices) => voices,
            Err(e) => {
                warn!(error = %e, binary = %binary, "Voice probe failed, default voice only");
                Vec::new()
            }
        };
        Self { binary, voices }
    }
}

impl VoiceEngine for EspeakEngine {
    fn voices(&self) -> Result<Vec<Voice>, SpeechError> {
        Ok(self.voices.clone())
    }

    fn start(
        &self,
        text: &str,
        voice: Option<&Voice>,
    ) -> Result<Box<dyn PlaybackHandle>, SpeechError> {
        let mut command = std::process::Command::new(&self.binary);
        if let Some(voice) = voice {
            command.arg("-v").arg(&voice.id);
        }
        command.arg(text).stdout(Stdio::null()).stderr(Stdio::null());
        let child = command
            .spawn()
            .map_err(|e| SpeechError::Playback(format!("failed to spawn {}: {e}", self.binary)))?;
        debug!(pid = child.id(), "Speech playback started");
        Ok(Box::new(SubprocessPlayback { child }))
    }
}

fn probe_voices(binary: &str) -> anyhow::Result<Vec<Voice>> {
    let output = std::process::Command::new(binary)
        .arg("--voices=en")
        .output()?;
    if !output.status.success() {
        anyhow::bail!("voice listing exited with {}", output.status);
    }
    Ok(parse_voice_listing(&String::from_utf8_lossy(&output.stdout)))
}

/// Parses `espeak-ng --voices` output. The fourth column is the voice name;
/// the whole line (language, gender marker, name) serves as the description
/// so hints like "zira" or a gender tag can match anywhere in it.
fn parse_voice_listing(listing: &str) -> Vec<Voice> {
    listing
        .lines()
        .skip(1)
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            let name = fields.get(3)?;
            Some(Voice {
                id: (*name).to_string(),
                description: line.trim().to_string(),
            })
        })
        .collect()
}

struct SubprocessPlayback {
    child: Child,
}

impl Drop for SubprocessPlayback {
    fn drop(&mut self) {
        // Collect the child if playback already finished. A still-running
        // process is left alone: a newer utterance must not cut it off.
        if let Err(e) = self.child.try_wait() {
            warn!(error = %e, "Failed to reap speech process");
        }
    }
}

impl PlaybackHandle for SubprocessPlayback {
    fn skip(&mut self, _sentences: u32) -> Result<(), SpeechError> {
        // Killing the synthesizer drops everything still queued. A process
        // that already finished counts as successfully skipped.
        match self.child.kill() {
            Ok(()) => {
                let _ = self.child.wait();
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::InvalidInput => Ok(()),
            Err(e) => Err(SpeechError::Playback(e.to_string())),
        }
    }
}
