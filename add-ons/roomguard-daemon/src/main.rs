//! Room guard daemon.
//!
//! Loads `.env` and `config/roomguard.toml`, sets up console + file logging, builds the
//! blocking adapters (microphone/speaker, camera, face sidecar, responder) on a worker
//! thread and runs the guard agent there until "goodbye guard" or Ctrl-C.

use anyhow::Context;
use roomguard_core::events::{self, EventReceiver};
use roomguard_core::{
    FaceMatcher, GuardAgent, GuardConfig, GuardPorts, GuardSession, LogNotifier,
    OpenRouterResponder, PresenceClassifier, Responder,
};
use roomguard_vision::{HttpFrameSource, SidecarFaceMatcher};
use roomguard_voice::VoiceGateway;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (before any env::var calls)
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("[roomguard] .env not loaded: {} (using system environment)", e);
    }

    let config = GuardConfig::load().context("load guard config")?;
    bootstrap_dirs(&config)?;

    let log_path = log_file_path(&config.paths.log_dir, chrono::Local::now());
    let log_file = File::create(&log_path)
        .with_context(|| format!("create log file {}", log_path.display()))?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(log_file)),
        )
        .init();

    info!(
        log_file = %log_path.display(),
        trusted_faces = %config.paths.trusted_faces.display(),
        camera = %config.vision.camera_url,
        "roomguard daemon starting"
    );

    let (tx, rx) = events::channel();
    let timeline = tokio::spawn(forward_events(rx));

    let shutdown = Arc::new(AtomicBool::new(false));
    let agent_shutdown = Arc::clone(&shutdown);
    let mut worker = tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
        let mut agent = build_agent(config)?
            .with_events(tx)
            .with_shutdown(agent_shutdown);
        agent.run();
        info!(cycles = agent.cycles(), "guard agent exited");
        Ok(())
    });

    let finished = tokio::select! {
        res = &mut worker => Some(res),
        _ = tokio::signal::ctrl_c() => None,
    };
    let outcome = match finished {
        Some(res) => res,
        None => {
            info!("CTRL-C received; stopping guard agent at the next boundary");
            shutdown.store(true, Ordering::SeqCst);
            worker.await
        }
    };

    // Agent (and its event sender) is gone; let the timeline drain.
    if timeline.await.is_err() {
        warn!("event timeline task aborted");
    }

    match outcome {
        Ok(Ok(())) => {
            info!("roomguard daemon stopped");
            Ok(())
        }
        Ok(Err(e)) => {
            error!(error = %e, "guard agent failed to start");
            Err(e)
        }
        Err(join) => Err(anyhow::anyhow!("guard worker panicked: {}", join)),
    }
}

/// Create the trusted-faces and log directories if absent.
fn bootstrap_dirs(config: &GuardConfig) -> anyhow::Result<()> {
    for dir in [&config.paths.trusted_faces, &config.paths.log_dir] {
        std::fs::create_dir_all(dir).with_context(|| format!("create directory {}", dir.display()))?;
    }
    Ok(())
}

fn log_file_path(dir: &Path, now: chrono::DateTime<chrono::Local>) -> PathBuf {
    dir.join(format!("log_{}.txt", now.format("%Y%m%d_%H%M%S")))
}

/// Build every adapter and the agent. Runs on the blocking pool: the reqwest blocking
/// clients and the audio devices must not be created on an async worker.
fn build_agent(config: GuardConfig) -> anyhow::Result<GuardAgent> {
    let voice = VoiceGateway::from_config(&config.voice);
    let camera = HttpFrameSource::from_config(&config.vision);
    let matcher = SidecarFaceMatcher::from_config(&config.vision).context("build face matcher")?;

    let trusted = matcher
        .load_trusted_set(&config.paths.trusted_faces)
        .context("load trusted faces")?;
    if trusted.is_empty() {
        warn!(
            dir = %config.paths.trusted_faces.display(),
            "no trusted faces enrolled; every subject will be treated as unknown"
        );
    }

    let responder: Option<Box<dyn Responder>> = match OpenRouterResponder::from_config(&config.responder) {
        Ok(r) => {
            info!(model = %config.responder.model, "responder ready");
            Some(Box::new(r))
        }
        Err(e) => {
            warn!(error = %e, "responder disabled; level-2 warnings use the fallback");
            None
        }
    };

    let session = GuardSession::new(Arc::new(trusted));
    let ports = GuardPorts {
        voice: Box::new(voice),
        camera: Box::new(camera),
        classifier: PresenceClassifier::new(Box::new(matcher)),
        responder,
        notifier: Box::new(LogNotifier),
    };
    Ok(GuardAgent::new(config, session, ports))
}

/// Log every guard event as one JSON line: the incident timeline.
async fn forward_events(mut rx: EventReceiver) {
    while let Some(event) = rx.recv().await {
        match serde_json::to_string(&event) {
            Ok(json) => info!(target: "roomguard::timeline", event = %json, "guard event"),
            Err(e) => warn!(error = %e, ?event, "guard event not serializable"),
        }
    }
}
