//! # roomguard-voice - speech in and out for the guard agent
//!
//! Microphone capture and turn detection run locally; transcription and synthesis go
//! to OpenAI-compatible endpoints (or local Whisper with the `whisper` feature).
//! [`VoiceGateway`] packages all of it behind `roomguard_core::VoiceIo`.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        VoiceGateway                          │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐        │
//! │  │   Audio In   │→ │  WebRTC VAD  │→ │ Turn Manager │→ STT   │
//! │  │    (cpal)    │  │  (30ms)      │  │  (800ms gap) │        │
//! │  └──────────────┘  └──────────────┘  └──────────────┘        │
//! │                                                              │
//! │  TTS → ┌──────────────┐                                      │
//! │        │  Audio Out   │  blocks until playback ends          │
//! │        │   (rodio)    │                                      │
//! │        └──────────────┘                                      │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod audio;
pub mod ear;
pub mod error;
pub mod gateway;
pub mod stt;
pub mod turn;
pub mod vad;
pub mod voice_output;

pub use audio::{AudioCapture, AudioChunk, AudioConfig};
pub use ear::{AudioTurn, EarConfig, EarHandle, TurnSource, VoiceEar};
pub use error::{VoiceError, VoiceResult};
pub use gateway::{Speaker, VoiceGateway};
pub use stt::{create_best_stt, HttpStt, PlaceholderStt, SttBackend};
#[cfg(feature = "whisper")]
pub use stt::WhisperStt;
pub use turn::{TurnConfig, TurnEvent, TurnManager};
pub use vad::{VadConfig, VadDetector};
pub use voice_output::{create_best_tts, HttpTts, PlaceholderTts, TtsBackend, VoiceOutput};
