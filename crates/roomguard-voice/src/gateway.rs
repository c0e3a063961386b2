//! `VoiceIo` for the guard agent: microphone + STT in, TTS + speaker out.
//!
//! Capture and playback are serialized so the agent never hears itself. Every
//! backend failure degrades to "nothing heard" or "nothing played" with a warning.

use crate::ear::{EarConfig, TurnSource, VoiceEar};
use crate::error::VoiceResult;
use crate::stt::{create_best_stt, SttBackend};
use crate::voice_output::{create_best_tts, TtsBackend, VoiceOutput};
use roomguard_core::{VoiceConfig, VoiceIo};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Plays encoded audio to completion.
pub trait Speaker {
    fn play(&self, audio: &[u8]) -> VoiceResult<()>;
}

impl Speaker for VoiceOutput {
    fn play(&self, audio: &[u8]) -> VoiceResult<()> {
        self.play_bytes(audio)
    }
}

pub struct VoiceGateway {
    turns: Option<Box<dyn TurnSource>>,
    stt: Box<dyn SttBackend>,
    tts: Box<dyn TtsBackend>,
    speaker: Option<Box<dyn Speaker>>,
    io: Mutex<()>,
}

impl VoiceGateway {
    /// Without `turns` every listen waits out its window and hears nothing; without
    /// `speaker` speech is synthesized but not played.
    pub fn new(
        turns: Option<Box<dyn TurnSource>>,
        stt: Box<dyn SttBackend>,
        tts: Box<dyn TtsBackend>,
        speaker: Option<Box<dyn Speaker>>,
    ) -> Self {
        Self {
            turns,
            stt,
            tts,
            speaker,
            io: Mutex::new(()),
        }
    }

    /// Open the default microphone and speaker and pick the best STT/TTS backends.
    /// Missing audio devices are logged and tolerated.
    pub fn from_config(cfg: &VoiceConfig) -> Self {
        let turns: Option<Box<dyn TurnSource>> =
            match VoiceEar::new(EarConfig::from_voice_config(cfg)).start_listening() {
                Ok(ear) => Some(Box::new(ear)),
                Err(e) => {
                    warn!(error = %e, "microphone unavailable; the agent will hear nothing");
                    None
                }
            };
        let speaker: Option<Box<dyn Speaker>> = match VoiceOutput::new() {
            Ok(out) => Some(Box::new(out)),
            Err(e) => {
                warn!(error = %e, "speaker unavailable; speech goes to the log only");
                None
            }
        };
        Self::new(turns, create_best_stt(cfg), create_best_tts(cfg), speaker)
    }
}

impl VoiceIo for VoiceGateway {
    fn listen(&self, window: Duration) -> Option<String> {
        let _io = self.io.lock().unwrap_or_else(|p| p.into_inner());
        let Some(turns) = &self.turns else {
            std::thread::sleep(window);
            return None;
        };
        let turn = turns.next_turn(window)?;
        debug!(samples = turn.samples.len(), duration = ?turn.duration, "phrase captured");

        match self.stt.transcribe_turn(&turn) {
            Ok(text) => {
                let text = text.trim().to_lowercase();
                if text.is_empty() {
                    return None;
                }
                info!(target: "roomguard::speech", "[ASR] {}", text);
                Some(text)
            }
            Err(e) => {
                warn!(error = %e, "transcription failed; treating as silence");
                None
            }
        }
    }

    fn say(&self, text: &str) {
        let _io = self.io.lock().unwrap_or_else(|p| p.into_inner());
        let audio = match self.tts.synthesize(text) {
            Ok(a) => a,
            Err(e) => {
                warn!(error = %e, "speech synthesis failed");
                return;
            }
        };
        if audio.is_empty() {
            return;
        }
        if let Some(speaker) = &self.speaker {
            if let Err(e) = speaker.play(&audio) {
                warn!(error = %e, "playback failed");
            }
        }
    }
}
