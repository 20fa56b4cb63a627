//! HTTP API handlers for mgc-api

pub mod health;
pub mod predict;
pub mod samples;

pub use health::health_routes;
pub use predict::predict_routes;
pub use samples::sample_routes;
