//! Guard configuration loaded from `config/roomguard.toml` and the environment.
//!
//! Every field has a default, so an empty file (or no file at all) yields a working
//! agent. Precedence: defaults < TOML file < `ROOMGUARD_*` environment variables
//! (`__` separates sections, e.g. `ROOMGUARD_MATCHING__ACTIVATION_THRESHOLD=82`).
//!
//! Thresholds are a tunable trade-off: lower values accept more mis-heard phrases
//! (false activations), higher values reject more genuine ones.

use crate::error::GuardResult;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_CONFIG_PATH: &str = "config/roomguard.toml";

/// Full agent configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    pub phrases: PhraseConfig,
    pub matching: MatchingConfig,
    pub listen: ListenConfig,
    pub escalation: EscalationConfig,
    pub vision: VisionConfig,
    pub responder: ResponderConfig,
    pub voice: VoiceConfig,
    pub paths: PathsConfig,
}

/// Canonical phrase sets. Stored lowercase; the matcher normalizes again anyway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhraseConfig {
    pub wake: Vec<String>,
    pub deactivate: Vec<String>,
    pub confirm: Vec<String>,
    pub shutdown: Vec<String>,
}

impl Default for PhraseConfig {
    fn default() -> Self {
        Self {
            wake: strings(&["guard my room", "guard the room", "guard my room please"]),
            deactivate: strings(&["stop guard", "deactivate guard", "turn off guard", "disarm guard"]),
            confirm: strings(&["yes", "yeah", "yup", "confirm", "activate"]),
            shutdown: strings(&["shut down guard agent", "shutdown agent", "goodbye guard"]),
        }
    }
}

/// Fuzzy acceptance thresholds on the 0–100 scale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Wake, deactivate and shutdown phrases (default 78).
    pub activation_threshold: f64,
    /// Yes/no confirmation (default 70).
    pub confirm_threshold: f64,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            activation_threshold: 78.0,
            confirm_threshold: 70.0,
        }
    }
}

/// Bounded listen windows in seconds. A timeout is "no response", never an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenConfig {
    pub wake_secs: f64,
    pub confirm_secs: f64,
    pub challenge_secs: f64,
    pub command_secs: f64,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            wake_secs: 6.0,
            confirm_secs: 3.0,
            challenge_secs: 8.0,
            command_secs: 5.0,
        }
    }
}

impl ListenConfig {
    pub fn wake(&self) -> Duration {
        secs(self.wake_secs)
    }

    pub fn confirm(&self) -> Duration {
        secs(self.confirm_secs)
    }

    pub fn challenge(&self) -> Duration {
        secs(self.challenge_secs)
    }

    pub fn command(&self) -> Duration {
        secs(self.command_secs)
    }
}

/// Escalation loop pacing and failure budgets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EscalationConfig {
    /// Pause between observation cycles.
    pub scan_interval_ms: u64,
    /// Consecutive capture failures before the frame source is reopened.
    pub capture_retry_limit: u32,
    /// Pause after a failed capture or classification.
    pub retry_backoff_ms: u64,
    /// Spoken when the responder cannot produce a level-2 warning.
    pub fallback_warning: String,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            scan_interval_ms: 1500,
            capture_retry_limit: 5,
            retry_backoff_ms: 500,
            fallback_warning: "You are not recognized. Leave this room now, or the authorities will be contacted."
                .to_string(),
        }
    }
}

impl EscalationConfig {
    pub fn scan_interval(&self) -> Duration {
        Duration::from_millis(self.scan_interval_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

/// Camera and face-matching collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    /// Snapshot endpoint returning one JPEG/PNG per GET.
    pub camera_url: String,
    /// Face-encoding service base URL.
    pub face_service_url: String,
    /// Euclidean distance under which two face encodings are the same person.
    pub tolerance: f32,
    /// Keep-alive probe period for the camera handle.
    pub keepalive_ms: u64,
    pub request_timeout_secs: u64,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            camera_url: "http://127.0.0.1:8081/snapshot.jpg".to_string(),
            face_service_url: "http://127.0.0.1:8090".to_string(),
            tolerance: 0.6,
            keepalive_ms: 2000,
            request_timeout_secs: 10,
        }
    }
}

/// Language-model responder (OpenAI-compatible chat completions).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponderConfig {
    pub api_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl Default for ResponderConfig {
    fn default() -> Self {
        Self {
            api_url: "https://openrouter.ai/api/v1".to_string(),
            model: "meta-llama/llama-3.3-70b-instruct".to_string(),
            max_tokens: 256,
            temperature: 0.7,
            timeout_secs: 30,
        }
    }
}

impl ResponderConfig {
    /// API key from environment: ROOMGUARD_LLM_API_KEY, then OPENROUTER_API_KEY.
    pub fn api_key(&self) -> Option<String> {
        std::env::var("ROOMGUARD_LLM_API_KEY")
            .or_else(|_| std::env::var("OPENROUTER_API_KEY"))
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }
}

/// Speech backends (OpenAI-compatible STT/TTS endpoints).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    pub stt_api_url: String,
    pub stt_model: String,
    /// Transcription language hint (ISO-639-1).
    pub language: String,
    pub tts_api_url: String,
    pub tts_model: String,
    pub tts_voice: String,
    /// Longest single phrase accepted once speech has started.
    pub phrase_limit_secs: f64,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            stt_api_url: "https://api.openai.com/v1".to_string(),
            stt_model: "whisper-1".to_string(),
            language: "en".to_string(),
            tts_api_url: "https://api.openai.com/v1".to_string(),
            tts_model: "tts-1".to_string(),
            tts_voice: "onyx".to_string(),
            phrase_limit_secs: 8.0,
        }
    }
}

/// Filesystem locations bootstrapped by the daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub trusted_faces: PathBuf,
    pub log_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            trusted_faces: PathBuf::from("data/trustedFaces"),
            log_dir: PathBuf::from("logs"),
        }
    }
}

impl GuardConfig {
    /// Load config: env `ROOMGUARD_CONFIG` path > `config/roomguard.toml` > defaults,
    /// then `ROOMGUARD_*` env overrides.
    pub fn load() -> GuardResult<Self> {
        let path = std::env::var("ROOMGUARD_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        Self::load_from(&path)
    }

    /// Load from an explicit file path. A missing file is not an error.
    pub fn load_from(path: &Path) -> GuardResult<Self> {
        let mut builder = config::Config::builder();
        if path.exists() {
            builder = builder.add_source(config::File::from(path));
        }
        let built = builder
            .add_source(
                config::Environment::with_prefix("ROOMGUARD")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        let cfg: GuardConfig = built.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject configurations the state machine cannot run with.
    pub fn validate(&self) -> GuardResult<()> {
        use crate::error::GuardError;

        for (name, set) in [
            ("wake", &self.phrases.wake),
            ("deactivate", &self.phrases.deactivate),
            ("confirm", &self.phrases.confirm),
        ] {
            if set.iter().all(|p| p.trim().is_empty()) {
                return Err(GuardError::Config(format!("phrase set '{}' is empty", name)));
            }
        }
        for (name, t) in [
            ("activation_threshold", self.matching.activation_threshold),
            ("confirm_threshold", self.matching.confirm_threshold),
        ] {
            if !(0.0..=100.0).contains(&t) {
                return Err(GuardError::Config(format!("{} must be within 0..=100, got {}", name, t)));
            }
        }
        for (name, secs) in [
            ("listen.wake_secs", self.listen.wake_secs),
            ("listen.confirm_secs", self.listen.confirm_secs),
            ("listen.challenge_secs", self.listen.challenge_secs),
            ("listen.command_secs", self.listen.command_secs),
            ("voice.phrase_limit_secs", self.voice.phrase_limit_secs),
        ] {
            if !secs.is_finite() || secs <= 0.0 {
                return Err(GuardError::Config(format!("{} must be a positive number of seconds, got {}", name, secs)));
            }
        }
        if !self.vision.tolerance.is_finite() || self.vision.tolerance <= 0.0 {
            return Err(GuardError::Config("vision.tolerance must be positive".to_string()));
        }
        Ok(())
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Out-of-range values (negative, NaN, infinite) become zero; `validate` rejects them first.
fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}
