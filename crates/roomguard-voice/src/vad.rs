//! Voice Activity Detection using WebRTC VAD
//!
//! Classifies 30ms frames as speech or silence. Nothing leaves the machine.

use crate::error::{VoiceError, VoiceResult};
use tracing::{info, trace};
use webrtc_vad::{SampleRate, Vad, VadMode};

/// Configuration for VAD detection
#[derive(Debug, Clone)]
pub struct VadConfig {
    /// Sample rate (must be 8000, 16000, 32000, or 48000 Hz for WebRTC VAD)
    pub sample_rate: u32,

    /// Detection mode (0-3, where 3 is most aggressive)
    pub mode: u8,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            // Room microphones pick up fans and street noise; 2 rejects most of it.
            mode: 2,
        }
    }
}

/// Voice Activity Detector using WebRTC VAD
pub struct VadDetector {
    vad: Vad,
    config: VadConfig,
    chunk_size: usize,
}

fn vad_mode(mode: u8) -> VadMode {
    match mode {
        0 => VadMode::Quality,
        1 => VadMode::LowBitrate,
        2 => VadMode::Aggressive,
        _ => VadMode::VeryAggressive,
    }
}

fn vad_rate(sample_rate: u32) -> VoiceResult<SampleRate> {
    match sample_rate {
        8000 => Ok(SampleRate::Rate8kHz),
        16000 => Ok(SampleRate::Rate16kHz),
        32000 => Ok(SampleRate::Rate32kHz),
        48000 => Ok(SampleRate::Rate48kHz),
        other => Err(VoiceError::Config(format!(
            "WebRTC VAD only supports 8000, 16000, 32000, or 48000 Hz, got {}",
            other
        ))),
    }
}

fn build_vad(config: &VadConfig) -> VoiceResult<Vad> {
    let mut vad = Vad::new();
    vad.set_mode(vad_mode(config.mode));
    vad.set_sample_rate(vad_rate(config.sample_rate)?);
    Ok(vad)
}

impl VadDetector {
    pub fn new(config: VadConfig) -> VoiceResult<Self> {
        if config.mode > 3 {
            return Err(VoiceError::Config(format!("VAD mode must be 0-3, got {}", config.mode)));
        }
        let vad = build_vad(&config).map_err(|e| VoiceError::VadInit(e.to_string()))?;

        // WebRTC VAD accepts 10, 20 or 30ms frames; 30ms at 16kHz = 480 samples.
        let chunk_size = (config.sample_rate as f32 * 0.03) as usize;
        info!(
            sample_rate = config.sample_rate,
            mode = config.mode,
            chunk_size,
            "VAD initialized"
        );

        Ok(Self {
            vad,
            config,
            chunk_size,
        })
    }

    /// Whether one `chunk_size` frame contains speech.
    pub fn is_speech(&mut self, audio: &[f32]) -> VoiceResult<bool> {
        if audio.len() != self.chunk_size {
            return Err(VoiceError::VadProcessing(format!(
                "Expected {} samples, got {}",
                self.chunk_size,
                audio.len()
            )));
        }

        let audio_i16: Vec<i16> = audio
            .iter()
            .map(|&sample| (sample.clamp(-1.0, 1.0) * 32767.0) as i16)
            .collect();

        let speech = self
            .vad
            .is_voice_segment(&audio_i16)
            .map_err(|e| VoiceError::VadProcessing(format!("VAD processing failed: {:?}", e)))?;
        trace!(speech, "vad frame");
        Ok(speech)
    }

    /// Expected chunk size in samples
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    /// WebRTC VAD has no reset; rebuild it.
    pub fn reset(&mut self) -> VoiceResult<()> {
        self.vad = build_vad(&self.config)?;
        Ok(())
    }
}
