//! Voice Transcription
//!
//! Captures one utterance from the default microphone and sends it to an
//! HTTP transcription service. The capture stream lives entirely inside the
//! blocking capture call, so the microphone is released on every exit path,
//! including timeout and recognition failure. All failures are logged with
//! their specific cause and collapse to the `"none"` sentinel; callers never
//! see an error.

use std::io::Cursor;
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use reqwest::multipart;
use tracing::{debug, error, info, warn};

use crate::command::NO_INPUT;

/// Sample rate expected by the transcription service.
pub const TARGET_SAMPLE_RATE: u32 = 16_000;
/// Mean-absolute amplitude above which a chunk counts as speech.
const ENERGY_THRESHOLD: f32 = 0.01;
/// Silence duration that marks the end of an utterance.
const PAUSE_THRESHOLD: Duration = Duration::from_millis(800);

pub const DEFAULT_STT_ENDPOINT: &str = "https://api.openai.com/v1/audio/transcriptions";

/// External speech-to-text capability.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Listens for one voice command, waiting at most `timeout` for speech
    /// to begin. Returns recognized text, or [`NO_INPUT`] when nothing
    /// usable was heard.
    async fn listen(&self, timeout: Duration) -> String;
}

/// Recognition backend that turns captured samples into text.
#[async_trait]
pub trait SttBackend: Send + Sync {
    /// Transcribes 16 kHz mono f32 audio.
    async fn transcribe(&self, audio: &[f32]) -> Result<String>;
}

/// Captures from the default input device and delegates recognition to an
/// [`SttBackend`].
pub struct MicrophoneTranscriber {
    stt: Arc<dyn SttBackend>,
}

impl MicrophoneTranscriber {
    pub fn new(stt: Arc<dyn SttBackend>) -> Self {
        Self { stt }
    }
}

#[async_trait]
impl Transcriber for MicrophoneTranscriber {
    async fn listen(&self, timeout: Duration) -> String {
        info!("Listening for voice command...");
        let captured = tokio::task::spawn_blocking(move || capture_utterance(timeout)).await;
        let samples = match captured {
            Ok(Ok(Some(samples))) => samples,
            Ok(Ok(None)) => {
                warn!("Listening timed out.");
                return NO_INPUT.to_string();
            }
            Ok(Err(e)) => {
                error!(error = %e, "Microphone capture failed");
                return NO_INPUT.to_string();
            }
            Err(e) => {
                error!(error = %e, "Capture task failed");
                return NO_INPUT.to_string();
            }
        };

        info!(samples = samples.len(), "Recognizing voice command...");
        match self.stt.transcribe(&samples).await {
            Ok(text) if !text.is_empty() => {
                info!(command = %text, "User said");
                text
            }
            Ok(_) => {
                warn!("Could not understand audio.");
                NO_INPUT.to_string()
            }
            Err(e) => {
                error!(error = %e, "Speech recognition error");
                NO_INPUT.to_string()
            }
        }
    }
}

/// Records one utterance from the default input device.
///
/// Waits up to `timeout` for a chunk above the energy threshold, then
/// accumulates until the pause threshold of continuous silence. `None` means
/// speech never started before the timeout.
fn capture_utterance(timeout: Duration) -> Result<Option<Vec<f32>>> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .context("no default input device available")?;
    let supported = device
        .default_input_config()
        .context("failed to read default input config")?;
    let native_rate = supported.sample_rate().0;
    let channels = supported.channels();
    let config: cpal::StreamConfig = supported.into();

    let (tx, rx) = mpsc::channel::<Vec<f32>>();
    let stream = device
        .build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let mono = downmix(data, channels);
                let _ = tx.send(resample(&mono, native_rate, TARGET_SAMPLE_RATE));
            },
            |err| error!(error = %err, "Audio input stream error"),
            None,
        )
        .context("failed to build input stream")?;
    stream.play().context("failed to start input stream")?;

    let started = Instant::now();
    let mut utterance: Vec<f32> = Vec::new();
    let mut speaking = false;
    let mut silence_start: Option<Instant> = None;

    loop {
        match rx.recv_timeout(Duration::from_millis(100)) {
            Ok(chunk) => {
                let level = energy(&chunk);
                if !speaking {
                    if level >= ENERGY_THRESHOLD {
                        debug!(level, "Speech detected");
                        speaking = true;
                        utterance.extend(chunk);
                    } else if started.elapsed() >= timeout {
                        return Ok(None);
                    }
                } else {
                    utterance.extend(chunk);
                    if level < ENERGY_THRESHOLD {
                        let since = silence_start.get_or_insert_with(Instant::now);
                        if since.elapsed() >= PAUSE_THRESHOLD {
                            return Ok(Some(utterance));
                        }
                    } else {
                        silence_start = None;
                    }
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                if !speaking && started.elapsed() >= timeout {
                    return Ok(None);
                }
            }
            Err(RecvTimeoutError::Disconnected) => {
                anyhow::bail!("audio input stream closed unexpectedly")
            }
        }
    }
    // `stream` drops here on every return path, releasing the microphone.
}

/// Down-mixes interleaved multi-channel audio to mono by averaging frames.
fn downmix(samples: &[f32], channels: u16) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    let width = channels as usize;
    samples
        .chunks_exact(width)
        .map(|frame| frame.iter().sum::<f32>() / width as f32)
        .collect()
}

/// Linear resampler for mono f32 samples.
fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate {
        return samples.to_vec();
    }
    let ratio = from_rate as f64 / to_rate as f64;
    let out_len = (samples.len() as f64 / ratio).floor() as usize;
    let mut out = Vec::with_capacity(out_len);
    for i in 0..out_len {
        let pos = i as f64 * ratio;
        let idx = pos.floor() as usize;
        let frac = (pos - idx as f64) as f32;
        let a = samples.get(idx).copied().unwrap_or(0.0);
        let b = samples.get(idx + 1).copied().unwrap_or(a);
        out.push(a + frac * (b - a));
    }
    out
}

/// Mean absolute amplitude, a simple proxy for signal energy.
fn energy(chunk: &[f32]) -> f32 {
    if chunk.is_empty() {
        return 0.0;
    }
    chunk.iter().map(|s| s.abs()).sum::<f32>() / chunk.len() as f32
}

/// Whisper-style HTTP transcription backend (multipart WAV upload).
pub struct WhisperApiStt {
    endpoint: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl WhisperApiStt {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl SttBackend for WhisperApiStt {
    async fn transcribe(&self, audio: &[f32]) -> Result<String> {
        let wav = encode_wav(audio)?;
        debug!(bytes = wav.len(), endpoint = %self.endpoint, "Uploading audio for transcription");

        let file_part = multipart::Part::bytes(wav)
            .file_name("command.wav")
            .mime_str("audio/wav")?;
        let form = multipart::Form::new()
            .text("model", "whisper-1")
            .part("file", file_part);

        let mut request = self.client.post(&self.endpoint).multipart(form);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("transcription service error {status}: {body}");
        }

        let decoded: serde_json::Value = response.json().await?;
        Ok(decoded["text"].as_str().unwrap_or("").trim().to_string())
    }
}

/// Encodes 16 kHz mono f32 samples as 16-bit PCM WAV.
fn encode_wav(audio: &[f32]) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: TARGET_SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
    for &sample in audio {
        writer.write_sample((sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16)?;
    }
    writer.finalize()?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn energy_of_silence_is_zero() {
        assert_eq!(energy(&[]), 0.0);
        assert_eq!(energy(&[0.0; 16]), 0.0);
    }

    #[test]
    fn energy_is_mean_absolute_amplitude() {
        let level = energy(&[0.5, -0.5, 0.25, -0.25]);
        assert!((level - 0.375).abs() < f32::EPSILON);
    }

    #[test]
    fn downmix_averages_channels() {
        let stereo = [1.0, 0.0, 0.5, 0.5];
        assert_eq!(downmix(&stereo, 2), vec![0.5, 0.5]);
        assert_eq!(downmix(&stereo, 1), stereo.to_vec());
    }

    #[test]
    fn resample_is_identity_at_equal_rates() {
        let samples = [0.1, 0.2, 0.3];
        assert_eq!(resample(&samples, 16_000, 16_000), samples.to_vec());
    }

    #[test]
    fn resample_halves_length_at_double_rate() {
        let samples: Vec<f32> = (0..32).map(|i| i as f32 / 32.0).collect();
        let out = resample(&samples, 32_000, 16_000);
        assert_eq!(out.len(), 16);
    }

    #[test]
    fn wav_encoding_produces_riff_header() {
        let wav = encode_wav(&[0.0, 0.5, -0.5]).unwrap();
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        // 44-byte header plus 2 bytes per sample.
        assert_eq!(wav.len(), 44 + 6);
    }
}
