//! Speech-to-text: one `AudioTurn` of PCM in, one transcript out.
//!
//! Backends: an OpenAI-compatible `/audio/transcriptions` endpoint, local Whisper
//! (feature `whisper`), or a fixed placeholder for running without a microphone.

use crate::ear::AudioTurn;
use crate::error::{VoiceError, VoiceResult};
use roomguard_core::VoiceConfig;
use std::time::Duration;
use tracing::{debug, info};

/// Backend for converting PCM to text.
pub trait SttBackend: Send + Sync {
    /// Transcribe one turn. PCM is 16kHz mono f32; empty string if nothing was said.
    fn transcribe_turn(&self, turn: &AudioTurn) -> VoiceResult<String>;
}

/// Encode f32 PCM (mono) to 16-bit WAV bytes for API upload.
pub(crate) fn pcm_f32_to_wav(samples: &[f32], sample_rate: u32) -> Vec<u8> {
    let data_len = (samples.len() * 2) as u32; // 16-bit = 2 bytes per sample
    let mut buf = Vec::with_capacity(44 + data_len as usize);
    // RIFF header
    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&(36 + data_len).to_le_bytes());
    buf.extend_from_slice(b"WAVE");
    // fmt subchunk
    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&16u32.to_le_bytes());
    buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
    buf.extend_from_slice(&1u16.to_le_bytes()); // mono
    buf.extend_from_slice(&sample_rate.to_le_bytes());
    buf.extend_from_slice(&(sample_rate * 2).to_le_bytes()); // byte rate
    buf.extend_from_slice(&2u16.to_le_bytes()); // block align
    buf.extend_from_slice(&16u16.to_le_bytes()); // bits per sample
    // data subchunk
    buf.extend_from_slice(b"data");
    buf.extend_from_slice(&data_len.to_le_bytes());
    for &s in samples {
        let i = (s.clamp(-1.0, 1.0) * 32767.0).round() as i16;
        buf.extend_from_slice(&i.to_le_bytes());
    }
    buf
}

/// Placeholder STT: hears nothing unless given a fixed response.
#[derive(Debug, Default)]
pub struct PlaceholderStt {
    pub response: Option<String>,
}

impl PlaceholderStt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(s: impl Into<String>) -> Self {
        Self {
            response: Some(s.into()),
        }
    }
}

impl SttBackend for PlaceholderStt {
    fn transcribe_turn(&self, _turn: &AudioTurn) -> VoiceResult<String> {
        Ok(self.response.clone().unwrap_or_default())
    }
}

/// OpenAI-compatible transcription API (OpenAI Whisper, Groq, local servers).
#[derive(Debug, Clone)]
pub struct HttpStt {
    /// Base URL without trailing slash (e.g. https://api.openai.com/v1).
    pub base_url: String,
    pub api_key: String,
    /// whisper-1, gpt-4o-transcribe, etc.
    pub model: String,
    /// ISO-639-1 hint; empty lets the service detect.
    pub language: String,
    client: reqwest::blocking::Client,
}

/// Key lookup order: ROOMGUARD_STT_API_KEY, STT_API_KEY, OPENAI_API_KEY.
fn stt_api_key() -> Option<String> {
    ["ROOMGUARD_STT_API_KEY", "STT_API_KEY", "OPENAI_API_KEY"]
        .iter()
        .filter_map(|k| std::env::var(k).ok())
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
}

impl HttpStt {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        language: impl Into<String>,
    ) -> VoiceResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| VoiceError::Stt(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            language: language.into(),
            client,
        })
    }

    /// Endpoint and model from `[voice]`, key from the environment.
    pub fn from_config(cfg: &VoiceConfig) -> VoiceResult<Self> {
        let api_key = stt_api_key().ok_or_else(|| {
            VoiceError::Config("STT requires ROOMGUARD_STT_API_KEY, STT_API_KEY, or OPENAI_API_KEY".to_string())
        })?;
        Self::new(&cfg.stt_api_url, api_key, &cfg.stt_model, &cfg.language)
    }
}

impl SttBackend for HttpStt {
    fn transcribe_turn(&self, turn: &AudioTurn) -> VoiceResult<String> {
        if turn.samples.is_empty() {
            return Ok(String::new());
        }
        let wav = pcm_f32_to_wav(&turn.samples, turn.sample_rate);
        let url = format!("{}/audio/transcriptions", self.base_url);
        let part = reqwest::blocking::multipart::Part::bytes(wav)
            .file_name("audio.wav")
            .mime_str("audio/wav")
            .map_err(|e| VoiceError::Stt(e.to_string()))?;
        let mut form = reqwest::blocking::multipart::Form::new()
            .part("file", part)
            .text("model", self.model.clone());
        if !self.language.is_empty() {
            form = form.text("language", self.language.clone());
        }
        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .map_err(|e| VoiceError::Stt(e.to_string()))?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().unwrap_or_default();
            return Err(VoiceError::Stt(format!("STT API error {}: {}", status, body)));
        }
        let json: serde_json::Value = res.json().map_err(|e| VoiceError::Stt(e.to_string()))?;
        let text = json
            .get("text")
            .and_then(|t| t.as_str())
            .unwrap_or("")
            .trim()
            .to_string();
        debug!(chars = text.len(), "transcribed");
        Ok(text)
    }
}

#[cfg(feature = "whisper")]
mod whisper_stt {
    use super::*;
    use std::sync::Mutex;
    use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

    /// Local Whisper: a ggml model (e.g. ggml-base.en.bin) run on-device.
    pub struct WhisperStt {
        #[allow(dead_code)]
        context: WhisperContext,
        state: Mutex<whisper_rs::WhisperState>,
        language: String,
    }

    impl WhisperStt {
        pub fn new(model_path: &str, language: &str) -> VoiceResult<Self> {
            let context = WhisperContext::new_with_params(model_path, WhisperContextParameters::default())
                .map_err(|e| VoiceError::Stt(format!("Whisper load failed: {}", e)))?;
            let state = context
                .create_state()
                .map_err(|e| VoiceError::Stt(format!("Whisper state init failed: {}", e)))?;
            Ok(Self {
                context,
                state: Mutex::new(state),
                language: language.to_string(),
            })
        }
    }

    impl SttBackend for WhisperStt {
        fn transcribe_turn(&self, turn: &AudioTurn) -> VoiceResult<String> {
            if turn.samples.is_empty() {
                return Ok(String::new());
            }
            if turn.sample_rate != 16000 {
                return Err(VoiceError::Stt(format!(
                    "Whisper expects 16 kHz; got {} Hz",
                    turn.sample_rate
                )));
            }
            let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
            params.set_print_progress(false);
            params.set_print_realtime(false);
            params.set_no_timestamps(true);
            if !self.language.is_empty() {
                params.set_language(Some(&self.language));
            }

            let mut state = self
                .state
                .lock()
                .map_err(|e| VoiceError::Stt(format!("Whisper lock poisoned: {}", e)))?;
            state
                .full(params, &turn.samples)
                .map_err(|e| VoiceError::Stt(format!("Whisper inference failed: {}", e)))?;
            let text = state
                .as_iter()
                .filter_map(|seg| seg.to_str().ok().map(str::to_string))
                .collect::<Vec<_>>()
                .join(" ")
                .trim()
                .to_string();
            Ok(text)
        }
    }
}

#[cfg(feature = "whisper")]
pub use whisper_stt::WhisperStt;

/// Best available backend. Priority: local Whisper when `WHISPER_MODEL_PATH` loads
/// (feature `whisper`), then the HTTP API when a key is set, then the placeholder.
pub fn create_best_stt(cfg: &VoiceConfig) -> Box<dyn SttBackend> {
    #[cfg(feature = "whisper")]
    {
        if let Ok(path) = std::env::var("WHISPER_MODEL_PATH") {
            let path = path.trim();
            if !path.is_empty() {
                match whisper_stt::WhisperStt::new(path, &cfg.language) {
                    Ok(w) => {
                        info!(model = %path, "STT: local whisper");
                        return Box::new(w);
                    }
                    Err(e) => tracing::warn!(error = %e, "local whisper unavailable"),
                }
            }
        }
    }
    match HttpStt::from_config(cfg) {
        Ok(http) => {
            info!(url = %http.base_url, model = %http.model, "STT: http");
            Box::new(http)
        }
        Err(e) => {
            info!(reason = %e, "STT: placeholder (nothing will be heard)");
            Box::new(PlaceholderStt::new())
        }
    }
}
