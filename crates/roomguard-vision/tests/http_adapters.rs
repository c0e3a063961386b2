//! Camera and face-sidecar adapters against a `wiremock` server.
//!
//! The adapters are blocking, so every call runs on `spawn_blocking` while the mock
//! server lives on the test runtime.

use roomguard_core::{
    FaceEncoding, FaceMatcher, Frame, FrameSource, Presence, TrustedFace, TrustedIdentitySet,
};
use roomguard_vision::{HttpFrameSource, SidecarFaceMatcher};
use std::path::PathBuf;
use std::time::Duration;
use wiremock::matchers::{body_bytes, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn trusted(encoding: Vec<f32>) -> TrustedIdentitySet {
    TrustedIdentitySet::new(vec![TrustedFace {
        source: PathBuf::from("owner.jpg"),
        encoding: FaceEncoding(encoding),
    }])
}

async fn mount_encodings(server: &MockServer, json: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path("/encode"))
        .and(header("content-type", "application/octet-stream"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json))
        .mount(server)
        .await;
}

/// Blocking clients must be built off the async runtime, so this runs inside `spawn_blocking`.
fn matcher(base: &str) -> SidecarFaceMatcher {
    SidecarFaceMatcher::new(base, 0.6, Duration::from_secs(2)).unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn camera_captures_snapshot_bytes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/snapshot.jpg"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(vec![0xff, 0xd8, 0xff, 0xe0])
                .insert_header("content-type", "image/jpeg"),
        )
        .mount(&server)
        .await;

    let url = format!("{}/snapshot.jpg", server.uri());
    tokio::task::spawn_blocking(move || {
        let mut cam = HttpFrameSource::new(url, Duration::from_secs(2), Duration::from_millis(50));
        cam.open().unwrap();
        assert!(cam.is_open());
        assert!(cam.is_online());

        let frame = cam.capture_frame().unwrap();
        assert_eq!(frame.bytes, vec![0xff, 0xd8, 0xff, 0xe0]);

        // Let the keep-alive probe at least once, then stop it.
        std::thread::sleep(Duration::from_millis(150));
        cam.release();
        assert!(!cam.is_open());
        assert!(!cam.is_online());
    })
    .await
    .unwrap();

    // Open probe, capture, and at least one keep-alive probe.
    let requests = server.received_requests().await.unwrap();
    assert!(requests.len() >= 3, "got {} requests", requests.len());
}

#[tokio::test(flavor = "multi_thread")]
async fn camera_error_status_is_capture_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
        .mount(&server)
        .await;

    let url = server.uri();
    tokio::task::spawn_blocking(move || {
        let mut cam = HttpFrameSource::new(url, Duration::from_secs(2), Duration::ZERO);
        let err = cam.open().unwrap_err();
        assert_eq!(err.kind(), "capture");
        // Stays open so later captures can retry.
        assert!(cam.is_open());
        assert!(!cam.is_online());
        assert_eq!(cam.capture_frame().unwrap_err().kind(), "capture");
    })
    .await
    .unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn camera_empty_body_is_capture_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let url = server.uri();
    tokio::task::spawn_blocking(move || {
        let mut cam = HttpFrameSource::new(url, Duration::from_secs(2), Duration::ZERO);
        let err = cam.open().unwrap_err();
        assert!(err.to_string().contains("empty frame"));
    })
    .await
    .unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn sidecar_recognizes_face_within_tolerance() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/encode"))
        .and(body_bytes(vec![1u8, 2, 3]))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "encodings": [[0.1, 0.2, 0.3]]
        })))
        .expect(2)
        .mount(&server)
        .await;

    let base = server.uri();
    tokio::task::spawn_blocking(move || {
        let sidecar = matcher(&base);
        let frame = Frame::new(vec![1, 2, 3]);
        assert_eq!(sidecar.classify(&frame, &trusted(vec![0.1, 0.2, 0.35])).unwrap(), Presence::Known);
        assert_eq!(sidecar.classify(&frame, &trusted(vec![0.9, 0.9, 0.9])).unwrap(), Presence::Unknown);
    })
    .await
    .unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn frame_without_faces_is_unknown() {
    let server = MockServer::start().await;
    mount_encodings(&server, serde_json::json!({ "encodings": [] })).await;

    let base = server.uri();
    let presence = tokio::task::spawn_blocking(move || {
        matcher(&base).classify(&Frame::new(vec![1]), &trusted(vec![0.1, 0.2, 0.3]))
    })
    .await
    .unwrap()
    .unwrap();
    assert_eq!(presence, Presence::Unknown);
}

#[tokio::test(flavor = "multi_thread")]
async fn sidecar_failure_is_classification_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/encode"))
        .respond_with(ResponseTemplate::new(500).set_body_string("model not loaded"))
        .mount(&server)
        .await;

    let base = server.uri();
    let err = tokio::task::spawn_blocking(move || {
        matcher(&base).classify(&Frame::new(vec![1]), &TrustedIdentitySet::default())
    })
    .await
    .unwrap()
    .unwrap_err();
    assert_eq!(err.kind(), "classification");
    assert!(err.to_string().contains("model not loaded"));
}

#[tokio::test(flavor = "multi_thread")]
async fn enrollment_keeps_first_face_per_image() {
    let server = MockServer::start().await;
    mount_encodings(&server, serde_json::json!({ "encodings": [[0.5, 0.5], [0.9, 0.9]] })).await;

    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("owner.jpg"), b"jpeg").unwrap();
    std::fs::write(dir.path().join("partner.png"), b"png").unwrap();

    let base = server.uri();
    let root = dir.path().to_path_buf();
    let set = tokio::task::spawn_blocking(move || matcher(&base).load_trusted_set(&root))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(set.len(), 2);
    assert!(set.faces().iter().all(|f| f.encoding.0 == vec![0.5, 0.5]));
}

#[tokio::test(flavor = "multi_thread")]
async fn enrollment_skips_images_without_faces() {
    let server = MockServer::start().await;
    mount_encodings(&server, serde_json::json!({ "encodings": [] })).await;

    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("landscape.jpg"), b"jpeg").unwrap();

    let base = server.uri();
    let root = dir.path().to_path_buf();
    let set = tokio::task::spawn_blocking(move || matcher(&base).load_trusted_set(&root))
        .await
        .unwrap()
        .unwrap();
    assert!(set.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn enrollment_fails_when_sidecar_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("owner.jpg"), b"jpeg").unwrap();

    let base = server.uri();
    let root = dir.path().to_path_buf();
    let err = tokio::task::spawn_blocking(move || matcher(&base).load_trusted_set(&root))
        .await
        .unwrap()
        .unwrap_err();
    assert_eq!(err.kind(), "classification");
}
