//! Text-to-speech synthesis and blocking playback through a `rodio::Sink`.

use crate::error::{VoiceError, VoiceResult};
use roomguard_core::VoiceConfig;
use rodio::{OutputStream, OutputStreamHandle, Sink, Source};
use std::io::Cursor;
use std::time::Duration;
use tracing::info;

/// Turns text into encoded audio (WAV/MP3).
pub trait TtsBackend: Send + Sync {
    /// Empty bytes means "nothing to play".
    fn synthesize(&self, text: &str) -> VoiceResult<Vec<u8>>;
}

/// Silent TTS; the spoken text only reaches the log.
#[derive(Debug, Default)]
pub struct PlaceholderTts;

impl TtsBackend for PlaceholderTts {
    fn synthesize(&self, _text: &str) -> VoiceResult<Vec<u8>> {
        Ok(Vec::new())
    }
}

/// OpenAI-compatible `/audio/speech` endpoint.
#[derive(Debug, Clone)]
pub struct HttpTts {
    /// Base URL without trailing slash (e.g. https://api.openai.com/v1).
    pub base_url: String,
    pub api_key: String,
    /// tts-1 (fast) or tts-1-hd.
    pub model: String,
    /// alloy, echo, fable, onyx, nova, shimmer...
    pub voice: String,
    client: reqwest::blocking::Client,
}

/// Key lookup order: ROOMGUARD_TTS_API_KEY, TTS_API_KEY, OPENAI_API_KEY.
fn tts_api_key() -> Option<String> {
    ["ROOMGUARD_TTS_API_KEY", "TTS_API_KEY", "OPENAI_API_KEY"]
        .iter()
        .filter_map(|k| std::env::var(k).ok())
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
}

impl HttpTts {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        voice: impl Into<String>,
    ) -> VoiceResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| VoiceError::Tts(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            voice: voice.into(),
            client,
        })
    }

    pub fn from_config(cfg: &VoiceConfig) -> VoiceResult<Self> {
        let api_key = tts_api_key().ok_or_else(|| {
            VoiceError::Config("TTS requires ROOMGUARD_TTS_API_KEY, TTS_API_KEY, or OPENAI_API_KEY".to_string())
        })?;
        Self::new(&cfg.tts_api_url, api_key, &cfg.tts_model, &cfg.tts_voice)
    }

    fn request_body(&self, text: &str) -> serde_json::Value {
        serde_json::json!({
            "model": self.model,
            "input": text,
            "voice": self.voice,
        })
    }
}

impl TtsBackend for HttpTts {
    fn synthesize(&self, text: &str) -> VoiceResult<Vec<u8>> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Vec::new());
        }
        let url = format!("{}/audio/speech", self.base_url);
        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(text))
            .send()
            .map_err(|e| VoiceError::Tts(e.to_string()))?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().unwrap_or_default();
            return Err(VoiceError::Tts(format!("TTS API error {}: {}", status, body)));
        }
        let bytes = res.bytes().map_err(|e| VoiceError::Tts(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

/// HTTP TTS when a key is configured, otherwise the silent placeholder.
pub fn create_best_tts(cfg: &VoiceConfig) -> Box<dyn TtsBackend> {
    match HttpTts::from_config(cfg) {
        Ok(tts) => {
            info!(url = %tts.base_url, voice = %tts.voice, "TTS: http");
            Box::new(tts)
        }
        Err(e) => {
            info!(reason = %e, "TTS: placeholder (speech goes to the log only)");
            Box::new(PlaceholderTts)
        }
    }
}

/// Default output device. Playback blocks until the queue drains.
pub struct VoiceOutput {
    _stream: OutputStream,
    _stream_handle: OutputStreamHandle,
    sink: Sink,
}

impl VoiceOutput {
    pub fn new() -> VoiceResult<Self> {
        let (stream, stream_handle) =
            OutputStream::try_default().map_err(|e| VoiceError::Playback(e.to_string()))?;
        let sink = Sink::try_new(&stream_handle).map_err(|e| VoiceError::Playback(e.to_string()))?;
        info!("VoiceOutput: sink ready for TTS playback");
        Ok(Self {
            _stream: stream,
            _stream_handle: stream_handle,
            sink,
        })
    }

    /// Decode WAV/MP3 bytes and play them to the end.
    pub fn play_bytes(&self, bytes: &[u8]) -> VoiceResult<()> {
        if bytes.is_empty() {
            return Ok(());
        }
        let source = rodio::Decoder::new(Cursor::new(bytes.to_vec()))
            .map_err(|e| VoiceError::Playback(format!("Decode failed: {}", e)))?;
        self.sink.append(source.convert_samples::<f32>());
        self.sink.sleep_until_end();
        Ok(())
    }

    /// Stop playback immediately and clear the queue.
    pub fn stop(&self) {
        self.sink.stop();
    }

    pub fn is_playing(&self) -> bool {
        !self.sink.empty()
    }
}
