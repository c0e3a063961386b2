//! Microphone capture using CPAL
//!
//! Samples are cut into fixed-size chunks on the audio callback thread and handed
//! to the ear over a std channel.

use crate::error::{VoiceError, VoiceResult};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig};
use std::sync::mpsc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Audio configuration
#[derive(Debug, Clone)]
pub struct AudioConfig {
    /// Sample rate in Hz (default: 16000)
    pub sample_rate: u32,

    /// Number of channels (default: 1 for mono)
    pub channels: u16,

    /// Buffer size in samples (default: 480 for 30ms at 16kHz)
    pub buffer_size: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            channels: 1,
            buffer_size: 480, // 30ms at 16kHz
        }
    }
}

/// Audio chunk sent from the capture callback
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// Audio samples (f32, normalized to -1.0 to 1.0)
    pub samples: Vec<f32>,

    /// Timestamp when captured
    pub timestamp: Instant,
}

/// Default input device, opened with a fixed mono config
pub struct AudioCapture {
    config: AudioConfig,
    device: Device,
    stream_config: StreamConfig,
}

impl AudioCapture {
    pub fn new(config: AudioConfig) -> VoiceResult<Self> {
        info!(
            sample_rate = config.sample_rate,
            channels = config.channels,
            "initializing audio capture"
        );

        let device = cpal::default_host()
            .default_input_device()
            .ok_or_else(|| VoiceError::AudioDevice("No input device available".to_string()))?;

        info!(
            device = %device.name().unwrap_or_else(|_| "Unknown".to_string()),
            "using input device"
        );

        let default_config = device.default_input_config()?;
        debug!(?default_config, "device default input config");

        let stream_config = StreamConfig {
            channels: config.channels,
            sample_rate: cpal::SampleRate(config.sample_rate),
            buffer_size: cpal::BufferSize::Fixed(config.buffer_size as u32),
        };

        Ok(Self {
            config,
            device,
            stream_config,
        })
    }

    /// Start the input stream; each full chunk is sent on `chunk_tx`.
    /// The stream stops when the returned handle is dropped.
    pub fn start_capture(self, chunk_tx: mpsc::Sender<AudioChunk>) -> VoiceResult<Stream> {
        let buffer_size = self.config.buffer_size;
        let mut sample_buffer = Vec::with_capacity(buffer_size);

        let stream = self.device.build_input_stream(
            &self.stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                for &sample in data {
                    sample_buffer.push(sample);
                    if sample_buffer.len() >= buffer_size {
                        let chunk = AudioChunk {
                            samples: std::mem::replace(&mut sample_buffer, Vec::with_capacity(buffer_size)),
                            timestamp: Instant::now(),
                        };
                        // Receiver gone means the ear shut down; drop silently.
                        let _ = chunk_tx.send(chunk);
                    }
                }
            },
            move |err| {
                warn!("Audio stream error: {}", err);
            },
            None,
        )?;

        stream.play()?;
        info!("audio capture started");
        Ok(stream)
    }

    /// List available input devices
    pub fn list_input_devices() -> VoiceResult<Vec<String>> {
        let host = cpal::default_host();
        let devices = host.input_devices()?;
        Ok(devices.filter_map(|d| d.name().ok()).collect())
    }
}
