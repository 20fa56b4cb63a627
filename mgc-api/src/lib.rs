//! mgc-api library interface
//!
//! Exposes the router and state so integration tests can drive the service
//! without binding a socket.

pub mod api;
pub mod error;

pub use crate::error::{ApiError, ApiResult};

use axum::extract::DefaultBodyLimit;
use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use mgc_common::config::ServiceConfig;
use mgc_common::{Catalog, FeatureExtractor, GenreClassifier, SongRecommender};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub extractor: Arc<FeatureExtractor>,
    /// Strategy chosen once at startup
    pub classifier: Arc<GenreClassifier>,
    pub recommender: Arc<SongRecommender>,
    /// Recommendations per prediction
    pub top_k: usize,
    pub max_upload_bytes: usize,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        extractor: FeatureExtractor,
        classifier: GenreClassifier,
        recommender: SongRecommender,
    ) -> Self {
        let defaults = ServiceConfig::default();
        Self {
            extractor: Arc::new(extractor),
            classifier: Arc::new(classifier),
            recommender: Arc::new(recommender),
            top_k: defaults.recommender.top_k,
            max_upload_bytes: defaults.max_upload_bytes,
            startup_time: Utc::now(),
        }
    }

    /// Build every component from a validated configuration
    pub fn from_config(config: &ServiceConfig) -> mgc_common::Result<Self> {
        config.validate()?;

        let catalog = Arc::new(Catalog::load(config.catalog_path.as_deref())?);
        info!(
            "Catalog: {} songs, {} samples",
            catalog.songs().len(),
            catalog.samples().len()
        );

        let classifier = GenreClassifier::load(&config.resolved_model_path());
        let recommender = SongRecommender::with_selection(catalog, config.recommender.selection);

        let mut state = Self::new(
            FeatureExtractor::from_config(&config.extractor),
            classifier,
            recommender,
        );
        state.top_k = config.recommender.top_k;
        state.max_upload_bytes = config.max_upload_bytes;
        Ok(state)
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.max_upload_bytes;

    Router::new()
        .merge(api::health_routes())
        .merge(api::sample_routes())
        .merge(api::predict_routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
