//! Library exports for the prediction service, its tools, benches and tests.
/// Application directory helpers.
pub mod app_dirs;
/// Service and training configuration.
pub mod config;
/// Historical training data loading and splitting.
pub mod dataset;
/// Feature encoding fitted at training time.
pub mod encoder;
/// Single-record prediction.
pub mod inference;
/// Logging configuration and helpers.
pub mod logging;
/// Classifiers and evaluation metrics.
pub mod ml;
/// Persisted model artifact and its load-once store.
pub mod model_store;
/// Input record schema and validation.
pub mod schema;
/// HTTP transport.
pub mod server;
/// Offline training pipeline.
pub mod trainer;
