//! Fitted models
//!
//! Plain-data linear models and the immutable bundle used for serving.

pub mod bundle;
pub mod linear;

pub use bundle::{ClassifierArtifact, ModelBundle, ScoreArtifact};
pub use linear::{LinearModel, LogisticModel, RegressionModel, Standardizer};
