//! Face matching through an HTTP face-encoding sidecar.
//!
//! The sidecar does detection and embedding (`POST {url}/encode` with the raw image,
//! answering `{"encodings": [[f32; 128], ...]}`, one entry per detected face). Enrollment
//! and the distance comparison stay here.

use crate::error::VisionError;
use roomguard_core::{
    FaceEncoding, FaceMatcher, Frame, GuardResult, Presence, TrustedFace, TrustedIdentitySet,
    VisionConfig,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "bmp", "webp"];

#[derive(Debug, Deserialize)]
pub struct EncodeResponse {
    #[serde(default)]
    pub encodings: Vec<Vec<f32>>,
}

impl EncodeResponse {
    pub fn into_encodings(self) -> Vec<FaceEncoding> {
        self.encodings.into_iter().map(FaceEncoding).collect()
    }
}

pub struct SidecarFaceMatcher {
    base_url: String,
    tolerance: f32,
    client: reqwest::blocking::Client,
}

impl SidecarFaceMatcher {
    pub fn new(base_url: impl Into<String>, tolerance: f32, timeout: Duration) -> GuardResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| VisionError::from(e).into_classification())?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tolerance,
            client,
        })
    }

    pub fn from_config(cfg: &VisionConfig) -> GuardResult<Self> {
        Self::new(
            cfg.face_service_url.clone(),
            cfg.tolerance,
            Duration::from_secs(cfg.request_timeout_secs.max(1)),
        )
    }

    /// Encodings of every face the sidecar finds in `image`.
    pub fn encode(&self, image: &[u8]) -> Result<Vec<FaceEncoding>, VisionError> {
        let res = self
            .client
            .post(format!("{}/encode", self.base_url))
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(image.to_vec())
            .send()?;
        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().unwrap_or_default();
            return Err(VisionError::FaceService { status, body });
        }
        let parsed: EncodeResponse = res.json()?;
        Ok(parsed.into_encodings())
    }
}

/// Image files directly under `dir`, sorted for a stable enrollment order.
pub fn trusted_images(dir: &Path) -> Vec<PathBuf> {
    let mut images: Vec<PathBuf> = WalkDir::new(dir)
        .max_depth(1)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| {
            p.extension()
                .and_then(|x| x.to_str())
                .map(|x| IMAGE_EXTENSIONS.contains(&x.to_ascii_lowercase().as_str()))
                .unwrap_or(false)
        })
        .collect();
    images.sort();
    images
}

impl FaceMatcher for SidecarFaceMatcher {
    fn load_trusted_set(&self, dir: &Path) -> GuardResult<TrustedIdentitySet> {
        if !dir.is_dir() {
            warn!(dir = %dir.display(), "trusted faces directory missing; nobody will be recognized");
            return Ok(TrustedIdentitySet::default());
        }

        let mut faces = Vec::new();
        for path in trusted_images(dir) {
            let bytes = std::fs::read(&path)?;
            let encodings = self
                .encode(&bytes)
                .map_err(VisionError::into_classification)?;
            match encodings.into_iter().next() {
                Some(encoding) => {
                    debug!(image = %path.display(), "trusted face enrolled");
                    faces.push(TrustedFace { source: path, encoding });
                }
                None => warn!(image = %path.display(), "no faces found in trusted image"),
            }
        }

        info!(dir = %dir.display(), faces = faces.len(), "trusted identities loaded");
        Ok(TrustedIdentitySet::new(faces))
    }

    fn classify(&self, frame: &Frame, trusted: &TrustedIdentitySet) -> GuardResult<Presence> {
        let observed = self
            .encode(&frame.bytes)
            .map_err(VisionError::into_classification)?;
        debug!(faces = observed.len(), "faces in frame");
        if trusted.any_recognized(&observed, self.tolerance) {
            Ok(Presence::Known)
        } else {
            Ok(Presence::Unknown)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_response_parses_multiple_faces() {
        let json = r#"{"encodings": [[0.1, 0.2, 0.3], [0.4, 0.5, 0.6]]}"#;
        let parsed: EncodeResponse = serde_json::from_str(json).unwrap();
        let enc = parsed.into_encodings();
        assert_eq!(enc.len(), 2);
        assert_eq!(enc[1].0, vec![0.4, 0.5, 0.6]);
    }

    #[test]
    fn encode_response_without_faces() {
        let parsed: EncodeResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.into_encodings().is_empty());
    }

    #[test]
    fn only_top_level_images_are_enrolled() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.JPG"), b"x").unwrap();
        std::fs::write(dir.path().join("a.png"), b"x").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        std::fs::create_dir(dir.path().join("old")).unwrap();
        std::fs::write(dir.path().join("old").join("c.jpg"), b"x").unwrap();

        let names: Vec<String> = trusted_images(dir.path())
            .iter()
            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
            .collect();
        assert_eq!(names, vec!["a.png".to_string(), "b.JPG".to_string()]);
    }

    #[test]
    fn missing_directory_yields_empty_set() {
        let dir = tempfile::tempdir().unwrap();
        let matcher = SidecarFaceMatcher::new("http://127.0.0.1:9", 0.6, Duration::from_secs(1)).unwrap();
        let set = matcher.load_trusted_set(&dir.path().join("absent")).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn empty_directory_needs_no_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let matcher = SidecarFaceMatcher::new("http://127.0.0.1:9", 0.6, Duration::from_secs(1)).unwrap();
        assert!(matcher.load_trusted_set(dir.path()).unwrap().is_empty());
    }
}
