//! Model training
//!
//! Hold-out split, burn fitting loop and evaluation metrics.

pub mod metrics;
pub mod trainer;

pub use metrics::{ClassifierMetrics, RegressionMetrics, ScoreMetrics};
pub use trainer::{split_indices, BundleTrainer, LinearTrainer, TrainBackend};
