//! Camera frames from an HTTP snapshot endpoint.
//!
//! `open` starts a keep-alive thread that probes the device every `keepalive_ms` and
//! keeps the "online" flag current, so a camera that drops off the network shows up in
//! the log before the next capture. `release` stops and joins it.

use crate::error::VisionError;
use roomguard_core::{Frame, FrameSource, GuardResult, VisionConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const STOP_POLL: Duration = Duration::from_millis(100);

struct KeepAlive {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

pub struct HttpFrameSource {
    url: String,
    timeout: Duration,
    keepalive_every: Duration,
    client: Option<reqwest::blocking::Client>,
    online: Arc<AtomicBool>,
    keepalive: Option<KeepAlive>,
}

impl HttpFrameSource {
    pub fn new(url: impl Into<String>, timeout: Duration, keepalive_every: Duration) -> Self {
        Self {
            url: url.into(),
            timeout,
            keepalive_every,
            client: None,
            online: Arc::new(AtomicBool::new(false)),
            keepalive: None,
        }
    }

    pub fn from_config(cfg: &VisionConfig) -> Self {
        Self::new(
            cfg.camera_url.clone(),
            Duration::from_secs(cfg.request_timeout_secs.max(1)),
            Duration::from_millis(cfg.keepalive_ms),
        )
    }

    pub fn is_open(&self) -> bool {
        self.client.is_some()
    }

    /// Last keep-alive verdict.
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    fn fetch(client: &reqwest::blocking::Client, url: &str) -> Result<Vec<u8>, VisionError> {
        let res = client.get(url).send()?;
        if !res.status().is_success() {
            return Err(VisionError::CameraStatus {
                status: res.status().as_u16(),
            });
        }
        let bytes = res.bytes()?;
        if bytes.is_empty() {
            return Err(VisionError::EmptyFrame);
        }
        Ok(bytes.to_vec())
    }

    fn spawn_keepalive(&self, client: reqwest::blocking::Client) -> Option<KeepAlive> {
        if self.keepalive_every.is_zero() {
            return None;
        }
        let stop = Arc::new(AtomicBool::new(false));
        let worker_stop = Arc::clone(&stop);
        let online = Arc::clone(&self.online);
        let url = self.url.clone();
        let every = self.keepalive_every;

        let handle = thread::spawn(move || {
            let mut next_probe = Instant::now() + every;
            while !worker_stop.load(Ordering::SeqCst) {
                if Instant::now() < next_probe {
                    thread::sleep(STOP_POLL.min(every));
                    continue;
                }
                next_probe = Instant::now() + every;
                let up = Self::fetch(&client, &url).is_ok();
                let was = online.swap(up, Ordering::SeqCst);
                match (was, up) {
                    (true, false) => warn!(%url, "camera went offline"),
                    (false, true) => info!(%url, "camera back online"),
                    _ => debug!(%url, up, "camera keep-alive"),
                }
            }
        });
        Some(KeepAlive { stop, handle })
    }
}

impl FrameSource for HttpFrameSource {
    fn open(&mut self) -> GuardResult<()> {
        if self.is_open() {
            return Ok(());
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| VisionError::from(e).into_capture())?;
        self.keepalive = self.spawn_keepalive(client.clone());

        // Stays open even if the first probe fails; captures retry on their own.
        let probe = Self::fetch(&client, &self.url);
        self.client = Some(client);
        self.online.store(probe.is_ok(), Ordering::SeqCst);
        match probe {
            Ok(_) => {
                info!(url = %self.url, "camera opened");
                Ok(())
            }
            Err(e) => Err(e.into_capture()),
        }
    }

    fn capture_frame(&mut self) -> GuardResult<Frame> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| VisionError::NotOpen.into_capture())?;
        let bytes = Self::fetch(client, &self.url).map_err(VisionError::into_capture)?;
        self.online.store(true, Ordering::SeqCst);
        Ok(Frame::new(bytes))
    }

    fn release(&mut self) {
        if let Some(ka) = self.keepalive.take() {
            ka.stop.store(true, Ordering::SeqCst);
            if ka.handle.join().is_err() {
                warn!("camera keep-alive thread panicked");
            }
        }
        if self.client.take().is_some() {
            self.online.store(false, Ordering::SeqCst);
            info!(url = %self.url, "camera released");
        }
    }
}

impl Drop for HttpFrameSource {
    fn drop(&mut self) {
        self.release();
    }
}
