//! Genre prediction endpoint
//!
//! Accepts multipart form data with either an `audio_file` upload or a
//! `sample_id` naming one of the built-in samples. When both are sent the
//! upload wins.

use axum::{
    body::Bytes,
    extract::{multipart::MultipartRejection, Multipart, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use mgc_common::{GenrePrediction, Recommendation};
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

use crate::{ApiError, ApiResult, AppState};

pub const MISSING_INPUT: &str = "Please provide an audio file or select a sample";
pub const INVALID_FILE_TYPE: &str = "Invalid file type. Please upload an audio file.";
pub const SAMPLE_NOT_FOUND: &str = "Sample file not found";

/// Extension used for the temp file when the upload name has none
const DEFAULT_EXTENSION: &str = "wav";

/// Prediction plus similar songs
#[derive(Debug, Serialize)]
pub struct PredictionResponse {
    pub prediction: GenrePrediction,
    pub recommendations: Vec<Recommendation>,
}

/// File part of the form
#[derive(Debug)]
struct Upload {
    file_name: Option<String>,
    content_type: Option<String>,
    data: Bytes,
}

impl Upload {
    /// Declared type must be `audio/*`; undeclared types are sniffed from the bytes
    fn is_audio(&self) -> bool {
        match self.content_type.as_deref() {
            Some(declared) => declared.starts_with("audio/"),
            None => infer::get(&self.data)
                .map(|kind| kind.matcher_type() == infer::MatcherType::Audio)
                .unwrap_or(false),
        }
    }

    fn temp_suffix(&self) -> String {
        let ext = self
            .file_name
            .as_deref()
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .unwrap_or(DEFAULT_EXTENSION);
        format!(".{}", ext.to_ascii_lowercase())
    }
}

#[derive(Debug, Default)]
struct PredictForm {
    upload: Option<Upload>,
    sample_id: Option<String>,
}

fn multipart_error(err: axum::extract::multipart::MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(err.body_text())
    } else {
        ApiError::BadRequest(format!("Malformed multipart body: {}", err.body_text()))
    }
}

async fn read_form(mut multipart: Multipart) -> ApiResult<PredictForm> {
    let mut form = PredictForm::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "audio_file" => {
                let file_name = field.file_name().map(|s| s.to_string());
                let content_type = field.content_type().map(|s| s.to_string());
                let data = field.bytes().await.map_err(multipart_error)?;

                // Browsers send an empty, unnamed part when no file was picked
                let unnamed = file_name.as_deref().map_or(true, str::is_empty);
                if unnamed && data.is_empty() {
                    continue;
                }
                form.upload = Some(Upload {
                    file_name,
                    content_type,
                    data,
                });
            }
            "sample_id" => {
                form.sample_id = Some(field.text().await.map_err(multipart_error)?);
            }
            other => debug!(field = other, "Ignoring unknown form field"),
        }
    }

    Ok(form)
}

/// POST /api/predict
pub async fn predict(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<PredictionResponse>> {
    // A request that is not multipart at all carries neither input
    let form = match multipart {
        Ok(multipart) => read_form(multipart).await?,
        Err(rejection) => {
            debug!("Predict request without multipart body: {}", rejection);
            PredictForm::default()
        }
    };

    let response = match (form.upload, form.sample_id) {
        (Some(upload), _) => predict_upload(state, upload).await?,
        (None, Some(sample_id)) => predict_sample(&state, &sample_id)?,
        (None, None) => return Err(ApiError::BadRequest(MISSING_INPUT.to_string())),
    };

    Ok(Json(response))
}

async fn predict_upload(state: AppState, upload: Upload) -> ApiResult<PredictionResponse> {
    if !upload.is_audio() {
        return Err(ApiError::BadRequest(INVALID_FILE_TYPE.to_string()));
    }

    info!(
        file_name = upload.file_name.as_deref().unwrap_or(""),
        bytes = upload.data.len(),
        "Classifying upload"
    );

    let suffix = upload.temp_suffix();
    tokio::task::spawn_blocking(move || -> ApiResult<PredictionResponse> {
        // Removed when `tmp` drops, on every path
        let mut tmp = tempfile::Builder::new()
            .prefix("mgc-upload-")
            .suffix(&suffix)
            .tempfile()?;
        tmp.write_all(&upload.data)?;
        tmp.flush()?;

        let features = state.extractor.extract(tmp.path());
        let prediction = state.classifier.predict(&features);
        let recommendations =
            state
                .recommender
                .recommend(Some(&features), Some(prediction.genre), state.top_k);

        Ok(PredictionResponse {
            prediction,
            recommendations,
        })
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Prediction task failed: {}", e)))?
}

fn predict_sample(state: &AppState, sample_id: &str) -> ApiResult<PredictionResponse> {
    let sample = state
        .recommender
        .catalog()
        .sample(sample_id)
        .ok_or_else(|| ApiError::NotFound(SAMPLE_NOT_FOUND.to_string()))?;

    info!(sample_id, genre = %sample.genre, "Classifying sample");

    let prediction = state.classifier.predict_for_genre(sample.genre);
    let recommendations = state
        .recommender
        .recommend(None, Some(sample.genre), state.top_k);

    Ok(PredictionResponse {
        prediction,
        recommendations,
    })
}

pub fn predict_routes() -> Router<AppState> {
    Router::new().route("/api/predict", post(predict))
}
