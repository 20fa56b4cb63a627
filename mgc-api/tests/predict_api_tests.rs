//! Prediction Endpoint Integration Tests
//!
//! `POST /api/predict` with uploads, built-in samples and invalid input.

mod helpers;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use serial_test::serial;
use std::path::Path;
use std::sync::Arc;
use tower::ServiceExt;

use helpers::{wav_bytes, AudioConfig, MultipartBuilder};
use mgc_api::api::predict::{INVALID_FILE_TYPE, MISSING_INPUT, SAMPLE_NOT_FOUND};
use mgc_api::{build_router, AppState};
use mgc_common::{Catalog, FeatureExtractor, Genre, GenreClassifier, SongRecommender};

fn test_app_state() -> AppState {
    let catalog = Arc::new(Catalog::embedded().unwrap());
    AppState::new(
        FeatureExtractor::default(),
        GenreClassifier::mock(),
        SongRecommender::new(catalog),
    )
}

async fn send(state: AppState, form: MultipartBuilder) -> (StatusCode, Value) {
    let (content_type, body) = form.build();
    let response = build_router(state)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/predict")
                .header("content-type", content_type)
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn genre_names() -> Vec<&'static str> {
    Genre::ALL.iter().map(|g| g.as_str()).collect()
}

/// Shared checks on a successful response body
fn assert_prediction_shape(body: &Value) {
    let prediction = &body["prediction"];
    let genre = prediction["genre"].as_str().unwrap();
    assert!(genre_names().contains(&genre), "unexpected genre {}", genre);

    let probabilities = prediction["probabilities"].as_object().unwrap();
    assert_eq!(probabilities.len(), 10);
    let total: f64 = probabilities.values().map(|v| v.as_f64().unwrap()).sum();
    assert!((total - 1.0).abs() < 1e-6);
    assert_eq!(
        prediction["confidence"].as_f64().unwrap(),
        probabilities[genre].as_f64().unwrap()
    );

    let recommendations = body["recommendations"].as_array().unwrap();
    let similarities: Vec<f64> = recommendations
        .iter()
        .map(|r| r["similarity"].as_f64().unwrap())
        .collect();
    assert!(similarities.windows(2).all(|w| w[0] >= w[1]));
    assert!(similarities.iter().all(|s| (0.70..=0.95).contains(s)));
    for rec in recommendations {
        assert_eq!(rec["genre"], genre);
        assert!(rec["title"].is_string());
        assert!(rec["artist"].is_string());
        assert!(rec["duration"].is_string());
    }
}

#[tokio::test]
async fn test_predict_sample_returns_its_genre() {
    // Given: the jazz sample
    let form = MultipartBuilder::new().text("sample_id", "sample-2");

    // When: predicting
    let (status, body) = send(test_app_state(), form).await;

    // Then: jazz with a boosted confidence and three jazz songs
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["prediction"]["genre"], "jazz");
    let confidence = body["prediction"]["confidence"].as_f64().unwrap();
    assert!((0.65..0.90).contains(&confidence));
    assert_eq!(body["recommendations"].as_array().unwrap().len(), 3);
    assert_prediction_shape(&body);
}

#[tokio::test]
async fn test_predict_sample_is_deterministic() {
    let (_, first) = send(
        test_app_state(),
        MultipartBuilder::new().text("sample_id", "sample-4"),
    )
    .await;
    let (_, second) = send(
        test_app_state(),
        MultipartBuilder::new().text("sample_id", "sample-4"),
    )
    .await;

    assert_eq!(first, second);
    assert_eq!(first["prediction"]["genre"], "classical");
}

#[tokio::test]
async fn test_predict_unknown_sample_is_404() {
    let form = MultipartBuilder::new().text("sample_id", "sample-99");

    let (status, body) = send(test_app_state(), form).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], SAMPLE_NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_predict_without_input_is_400() {
    let (status, body) = send(test_app_state(), MultipartBuilder::new()).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], MISSING_INPUT);
}

#[tokio::test]
async fn test_predict_non_multipart_body_is_400() {
    let response = build_router(test_app_state())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/predict")
                .header("content-type", "application/json")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["detail"], MISSING_INPUT);
}

#[tokio::test]
async fn test_predict_rejects_non_audio_upload() {
    let form = MultipartBuilder::new().file(
        "audio_file",
        "notes.txt",
        Some("text/plain"),
        b"definitely not audio",
    );

    let (status, body) = send(test_app_state(), form).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], INVALID_FILE_TYPE);
}

#[tokio::test]
async fn test_upload_takes_precedence_over_sample() {
    // Given: both a (non-audio) file and a valid sample id
    let form = MultipartBuilder::new()
        .text("sample_id", "sample-2")
        .file("audio_file", "notes.txt", Some("text/plain"), b"text");

    // When: predicting
    let (status, body) = send(test_app_state(), form).await;

    // Then: the file is validated, the sample ignored
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], INVALID_FILE_TYPE);
}

#[tokio::test]
#[serial]
async fn test_predict_wav_upload() {
    let wav = wav_bytes(&AudioConfig::default()).unwrap();
    let form = MultipartBuilder::new().file("audio_file", "clip.wav", Some("audio/wav"), &wav);

    let (status, body) = send(test_app_state(), form).await;

    assert_eq!(status, StatusCode::OK, "body: {}", body);
    assert_eq!(body["recommendations"].as_array().unwrap().len(), 3);
    assert_prediction_shape(&body);
}

#[tokio::test]
#[serial]
async fn test_predict_sniffs_undeclared_wav() {
    let wav = wav_bytes(&AudioConfig {
        duration_seconds: 1.0,
        sample_rate: 22050,
        channels: 1,
        ..AudioConfig::default()
    })
    .unwrap();
    let form = MultipartBuilder::new().file("audio_file", "clip", None, &wav);

    let (status, body) = send(test_app_state(), form).await;

    assert_eq!(status, StatusCode::OK, "body: {}", body);
    assert_prediction_shape(&body);
}

#[tokio::test]
#[serial]
async fn test_undecodable_audio_still_predicts() {
    // Declared audio that fails to decode falls back to mock features
    let form = MultipartBuilder::new().file(
        "audio_file",
        "broken.mp3",
        Some("audio/mpeg"),
        b"\x00\x01\x02\x03 not an mp3",
    );

    let (status, body) = send(test_app_state(), form).await;

    assert_eq!(status, StatusCode::OK);
    assert_prediction_shape(&body);
}

#[tokio::test]
async fn test_oversized_upload_is_rejected() {
    let mut state = test_app_state();
    state.max_upload_bytes = 1024;
    let wav = wav_bytes(&AudioConfig::default()).unwrap();
    let form = MultipartBuilder::new().file("audio_file", "clip.wav", Some("audio/wav"), &wav);

    let (status, _) = send(state, form).await;

    assert!(status.is_client_error(), "got {}", status);
}

/// Upload temp files left in `dir`
fn upload_leftovers(dir: &Path) -> Vec<String> {
    std::fs::read_dir(dir)
        .unwrap()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with("mgc-upload-"))
        .collect()
}

#[tokio::test]
#[serial]
async fn test_upload_temp_files_are_removed() {
    let scratch = tempfile::TempDir::new().unwrap();
    let previous = std::env::var_os("TMPDIR");
    std::env::set_var("TMPDIR", scratch.path());

    let wav = wav_bytes(&AudioConfig::default()).unwrap();
    let uploads: [(&str, &str, &[u8]); 2] = [
        ("clip.wav", "audio/wav", &wav),
        ("bad.mp3", "audio/mpeg", b"\x00\x01 not an mp3"),
    ];
    let mut results = Vec::new();
    for (file_name, mime, data) in uploads {
        let form = MultipartBuilder::new().file("audio_file", file_name, Some(mime), data);
        let (status, _) = send(test_app_state(), form).await;
        results.push((file_name, status, upload_leftovers(scratch.path())));
    }

    match previous {
        Some(dir) => std::env::set_var("TMPDIR", dir),
        None => std::env::remove_var("TMPDIR"),
    }

    for (file_name, status, leftovers) in results {
        assert_eq!(status, StatusCode::OK, "{}", file_name);
        assert!(leftovers.is_empty(), "after {}: leftover {:?}", file_name, leftovers);
    }
}
