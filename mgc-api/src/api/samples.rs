//! Built-in demo samples

use axum::{extract::State, routing::get, Json, Router};
use mgc_common::recommender::SampleFile;

use crate::AppState;

/// GET /api/samples
///
/// The sample table in catalog order.
pub async fn list_samples(State(state): State<AppState>) -> Json<Vec<SampleFile>> {
    Json(state.recommender.catalog().samples().to_vec())
}

pub fn sample_routes() -> Router<AppState> {
    Router::new().route("/api/samples", get(list_samples))
}
