//! Deterministic gradient-boosted decision stumps for binary outcomes.
//!
//! A small tree-ensemble baseline that avoids external ML dependencies while
//! still capturing thresholds and interactions a linear model misses:
//! - Log-odds prior as the starting score.
//! - One stump per round, fitted to logistic residuals on binned features.
//! - Newton-step leaf values, reproducible JSON export.

mod model;
mod train;

pub use model::{GbdtStumpModel, Stump};
pub use train::{TrainOptions, train_gbdt_stump};
