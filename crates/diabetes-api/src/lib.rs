//! Diabetes risk predictor service
//!
//! HTTP surface over the model registry in `model_lib`.

pub mod api;
pub mod config;
