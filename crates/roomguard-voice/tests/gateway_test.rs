//! Integration tests for the voice gateway with scripted turns and backends.
//!
//! No audio hardware needed: turns come from a queue, STT/TTS are fakes.

use chrono::Utc;
use roomguard_core::VoiceIo;
use roomguard_voice::{
    AudioTurn, PlaceholderStt, PlaceholderTts, Speaker, SttBackend, TtsBackend, TurnSource,
    VoiceError, VoiceGateway, VoiceResult,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

struct QueuedTurns(Mutex<VecDeque<Option<AudioTurn>>>);

impl QueuedTurns {
    fn speaking(n: usize) -> Self {
        Self(Mutex::new((0..n).map(|_| Some(turn())).collect()))
    }
}

impl TurnSource for QueuedTurns {
    fn next_turn(&self, _window: Duration) -> Option<AudioTurn> {
        self.0.lock().unwrap().pop_front().flatten()
    }
}

fn turn() -> AudioTurn {
    AudioTurn {
        samples: vec![0.1; 4800],
        timestamp: Utc::now(),
        duration: Duration::from_millis(300),
        sample_rate: 16000,
    }
}

struct FailingStt;

impl SttBackend for FailingStt {
    fn transcribe_turn(&self, _turn: &AudioTurn) -> VoiceResult<String> {
        Err(VoiceError::Stt("service unavailable".into()))
    }
}

struct EchoTts;

impl TtsBackend for EchoTts {
    fn synthesize(&self, text: &str) -> VoiceResult<Vec<u8>> {
        Ok(text.as_bytes().to_vec())
    }
}

struct FailingTts;

impl TtsBackend for FailingTts {
    fn synthesize(&self, _text: &str) -> VoiceResult<Vec<u8>> {
        Err(VoiceError::Tts("quota exceeded".into()))
    }
}

#[derive(Clone, Default)]
struct RecordingSpeaker(Arc<Mutex<Vec<Vec<u8>>>>);

impl Speaker for RecordingSpeaker {
    fn play(&self, audio: &[u8]) -> VoiceResult<()> {
        self.0.lock().unwrap().push(audio.to_vec());
        Ok(())
    }
}

fn init_logging() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

#[test]
fn transcript_is_trimmed_and_lowercased() {
    init_logging();
    let gw = VoiceGateway::new(
        Some(Box::new(QueuedTurns::speaking(1))),
        Box::new(PlaceholderStt::with_response("  Guard My Room ")),
        Box::new(PlaceholderTts),
        None,
    );
    assert_eq!(gw.listen(Duration::from_secs(6)).as_deref(), Some("guard my room"));
}

#[test]
fn silence_in_window_is_none() {
    let gw = VoiceGateway::new(
        Some(Box::new(QueuedTurns(Mutex::new(VecDeque::from([None]))))),
        Box::new(PlaceholderStt::with_response("yes")),
        Box::new(PlaceholderTts),
        None,
    );
    assert_eq!(gw.listen(Duration::from_secs(3)), None);
}

#[test]
fn empty_transcript_is_none() {
    let gw = VoiceGateway::new(
        Some(Box::new(QueuedTurns::speaking(1))),
        Box::new(PlaceholderStt::new()),
        Box::new(PlaceholderTts),
        None,
    );
    assert_eq!(gw.listen(Duration::from_secs(3)), None);
}

#[test]
fn transcription_failure_is_none() {
    init_logging();
    let gw = VoiceGateway::new(
        Some(Box::new(QueuedTurns::speaking(1))),
        Box::new(FailingStt),
        Box::new(PlaceholderTts),
        None,
    );
    assert_eq!(gw.listen(Duration::from_secs(3)), None);
}

#[test]
fn without_microphone_listen_waits_out_the_window() {
    let gw = VoiceGateway::new(None, Box::new(PlaceholderStt::with_response("yes")), Box::new(PlaceholderTts), None);
    let started = Instant::now();
    assert_eq!(gw.listen(Duration::from_millis(50)), None);
    assert!(started.elapsed() >= Duration::from_millis(50));
}

#[test]
fn say_plays_synthesized_audio() {
    let speaker = RecordingSpeaker::default();
    let gw = VoiceGateway::new(
        None,
        Box::new(PlaceholderStt::new()),
        Box::new(EchoTts),
        Some(Box::new(speaker.clone())),
    );
    gw.say("Guard mode activated.");
    assert_eq!(*speaker.0.lock().unwrap(), vec![b"Guard mode activated.".to_vec()]);
}

#[test]
fn say_survives_tts_failure_and_placeholder() {
    let speaker = RecordingSpeaker::default();
    let failing = VoiceGateway::new(None, Box::new(PlaceholderStt::new()), Box::new(FailingTts), Some(Box::new(speaker.clone())));
    failing.say("Activation canceled.");

    let silent = VoiceGateway::new(None, Box::new(PlaceholderStt::new()), Box::new(PlaceholderTts), Some(Box::new(speaker.clone())));
    silent.say("Activation canceled.");

    assert!(speaker.0.lock().unwrap().is_empty());
}
