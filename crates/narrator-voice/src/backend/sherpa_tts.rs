//! Sherpa-ONNX VITS backend, implementing [`TtsBackend`] via `sherpa-rs`.
//!
//! Loads Piper-style VITS voices. `VitsTts::create` takes `&mut self` while
//! the trait uses `&self`, so the engine sits behind an `Arc<Mutex<…>>` and
//! each call runs on the blocking pool.

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use sherpa_rs::tts::{VitsTts, VitsTtsConfig};

use crate::backend::{TtsAudio, TtsBackend};
use crate::error::SpeechError;

/// Output rate of the common Piper voices.
pub const SHERPA_VITS_SAMPLE_RATE: u32 = 22_050;

/// Sherpa-ONNX VITS TTS backend.
pub struct SherpaTtsBackend {
    engine: Arc<Mutex<VitsTts>>,
    sample_rate: u32,
}

impl SherpaTtsBackend {
    /// Load a VITS voice from a directory.
    ///
    /// The directory must contain:
    /// - `model.onnx`: the VITS ONNX model
    /// - `tokens.txt`: tokenizer vocabulary
    /// - `espeak-ng-data/`: espeak-ng phonemizer data
    pub fn load(model_dir: &Path) -> Result<Self, SpeechError> {
        if !model_dir.exists() {
            return Err(SpeechError::ModelNotFound(model_dir.to_path_buf()));
        }

        let model_path = model_dir.join("model.onnx");
        let tokens_path = model_dir.join("tokens.txt");
        let data_dir = model_dir.join("espeak-ng-data");

        for path in [&model_path, &tokens_path, &data_dir] {
            if !path.exists() {
                return Err(SpeechError::ModelNotFound(path.clone()));
            }
            tracing::debug!(path = %path.display(), "Found TTS model file");
        }

        tracing::info!(dir = %model_dir.display(), "Loading sherpa VITS model");

        let config = VitsTtsConfig {
            model: path_to_string(&model_path)?,
            tokens: path_to_string(&tokens_path)?,
            data_dir: path_to_string(&data_dir)?,
            ..Default::default()
        };
        let engine = VitsTts::new(config);

        tracing::info!("Sherpa VITS model loaded");

        Ok(Self {
            engine: Arc::new(Mutex::new(engine)),
            sample_rate: SHERPA_VITS_SAMPLE_RATE,
        })
    }
}

#[async_trait::async_trait]
impl TtsBackend for SherpaTtsBackend {
    async fn synthesize(
        &self,
        text: &str,
        speaker_id: i32,
        speed: f32,
    ) -> Result<TtsAudio, SpeechError> {
        if text.trim().is_empty() {
            return Ok(TtsAudio::new(Vec::new(), self.sample_rate));
        }

        tracing::debug!(text_len = text.len(), speaker_id, speed, "Synthesizing (sherpa VITS)");

        let engine = Arc::clone(&self.engine);
        let text = text.to_string();

        let audio = tokio::task::spawn_blocking(move || {
            let mut guard = engine.lock().unwrap_or_else(PoisonError::into_inner);
            guard
                .create(&text, speaker_id, speed)
                .map_err(|e| SpeechError::SynthesisError(e.to_string()))
        })
        .await
        .map_err(|e| SpeechError::SynthesisError(format!("spawn_blocking join error: {e}")))??;

        let audio = TtsAudio::new(audio.samples, audio.sample_rate);

        tracing::debug!(
            samples = audio.samples.len(),
            sample_rate = audio.sample_rate,
            duration_ms = audio.duration.as_millis(),
            "Speech synthesized (sherpa VITS)"
        );

        Ok(audio)
    }
}

/// Convert a path to a string, rejecting invalid UTF-8.
fn path_to_string(path: &Path) -> Result<String, SpeechError> {
    path.to_str()
        .map(ToString::to_string)
        .ok_or_else(|| SpeechError::SynthesisError(format!("Invalid path: {}", path.display())))
}
