//! Test Helper Utilities
//!
//! Shared utilities for testing mgc-api

#![allow(dead_code)]

pub mod audio_generator;
pub mod multipart;

pub use audio_generator::{generate_test_wav, wav_bytes, AudioConfig};
pub use multipart::MultipartBuilder;
