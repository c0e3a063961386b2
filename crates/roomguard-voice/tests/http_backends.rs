//! HTTP STT and TTS backends against a `wiremock` server.

use roomguard_voice::{AudioTurn, HttpStt, HttpTts, SttBackend, TtsBackend, VoiceResult};
use std::time::Duration;
use wiremock::matchers::{body_json, header, header_regex, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn turn(samples: Vec<f32>) -> AudioTurn {
    AudioTurn {
        samples,
        timestamp: chrono::Utc::now(),
        duration: Duration::from_millis(600),
        sample_rate: 16000,
    }
}

/// Blocking clients are built and used on the blocking pool.
async fn transcribe(base: String, samples: Vec<f32>) -> VoiceResult<String> {
    tokio::task::spawn_blocking(move || {
        HttpStt::new(base, "sk-stt", "whisper-1", "en")?.transcribe_turn(&turn(samples))
    })
    .await
    .unwrap()
}

async fn synthesize(base: String, text: &'static str) -> VoiceResult<Vec<u8>> {
    tokio::task::spawn_blocking(move || HttpTts::new(base, "sk-tts", "tts-1", "onyx")?.synthesize(text))
        .await
        .unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn stt_posts_wav_form_and_trims_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/audio/transcriptions"))
        .and(header("authorization", "Bearer sk-stt"))
        .and(header_regex("content-type", "^multipart/form-data"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "text": "  Guard my room. "
        })))
        .expect(1)
        .mount(&server)
        .await;

    let text = transcribe(format!("{}/v1/", server.uri()), vec![0.1; 4800]).await.unwrap();
    assert_eq!(text, "Guard my room.");

    // The form body is binary (WAV), so look for the fields byte-wise.
    let requests = server.received_requests().await.unwrap();
    let body = &requests[0].body;
    let needles: [&[u8]; 4] = [b"whisper-1", b"RIFF", b"WAVE", b"name=\"language\""];
    for needle in needles {
        assert!(body.windows(needle.len()).any(|w| w == needle), "missing {:?}", String::from_utf8_lossy(needle));
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn stt_error_status_is_stt_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid key"))
        .mount(&server)
        .await;

    let err = transcribe(server.uri(), vec![0.1; 480]).await.unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("401"), "{}", msg);
    assert!(msg.contains("invalid key"), "{}", msg);
}

#[tokio::test(flavor = "multi_thread")]
async fn stt_missing_text_is_empty_transcript() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .mount(&server)
        .await;

    assert_eq!(transcribe(server.uri(), vec![0.1; 480]).await.unwrap(), "");
}

#[tokio::test(flavor = "multi_thread")]
async fn stt_skips_request_for_empty_turn() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    assert_eq!(transcribe(server.uri(), Vec::new()).await.unwrap(), "");
}

#[tokio::test(flavor = "multi_thread")]
async fn tts_returns_audio_bytes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/audio/speech"))
        .and(header("authorization", "Bearer sk-tts"))
        .and(body_json(serde_json::json!({
            "model": "tts-1",
            "input": "Guard mode activated.",
            "voice": "onyx"
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(vec![0xFF, 0xFB, 0x90, 0x00])
                .insert_header("content-type", "audio/mpeg"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let audio = synthesize(server.uri(), "  Guard mode activated.  ").await.unwrap();
    assert_eq!(audio, vec![0xFF, 0xFB, 0x90, 0x00]);
}

#[tokio::test(flavor = "multi_thread")]
async fn tts_error_status_is_tts_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let err = synthesize(server.uri(), "Access granted.").await.unwrap_err();
    assert!(err.to_string().contains("overloaded"));
}

#[tokio::test(flavor = "multi_thread")]
async fn tts_blank_text_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    assert!(synthesize(server.uri(), "   ").await.unwrap().is_empty());
}
