//! The shipped `config/roomguard.toml` parses and matches the built-in defaults.

use roomguard_core::GuardConfig;
use std::path::Path;

const SAMPLE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../../config/roomguard.toml");

#[test]
fn sample_config_parses_and_validates() {
    let text = std::fs::read_to_string(SAMPLE).unwrap();
    let cfg: GuardConfig = toml::from_str(&text).unwrap();
    cfg.validate().unwrap();

    let defaults = GuardConfig::default();
    assert_eq!(cfg.phrases.wake, defaults.phrases.wake);
    assert_eq!(cfg.phrases.shutdown, defaults.phrases.shutdown);
    assert_eq!(cfg.matching.activation_threshold, defaults.matching.activation_threshold);
    assert_eq!(cfg.escalation.capture_retry_limit, defaults.escalation.capture_retry_limit);
    assert_eq!(cfg.vision.face_service_url, defaults.vision.face_service_url);
    assert_eq!(cfg.paths.trusted_faces, defaults.paths.trusted_faces);
}

#[test]
fn sample_config_loads_through_config_builder() {
    let cfg = GuardConfig::load_from(Path::new(SAMPLE)).unwrap();
    assert_eq!(cfg.listen.confirm_secs, 3.0);
    assert_eq!(cfg.voice.tts_voice, "onyx");
}

#[test]
fn partial_file_keeps_other_defaults() {
    let cfg: GuardConfig = toml::from_str("[matching]\nactivation_threshold = 85.0\n").unwrap();
    assert_eq!(cfg.matching.activation_threshold, 85.0);
    assert_eq!(cfg.matching.confirm_threshold, 70.0);
    assert_eq!(cfg.listen.wake_secs, 6.0);
}

#[test]
fn empty_wake_set_is_rejected() {
    let cfg: GuardConfig = toml::from_str("[phrases]\nwake = []\n").unwrap();
    assert_eq!(cfg.validate().unwrap_err().kind(), "config");
}
