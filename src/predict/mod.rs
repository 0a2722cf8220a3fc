//! Serving predictions
//!
//! Team name resolution, the model registry and the prediction engine.

pub mod engine;
pub mod registry;
pub mod teams;

pub use engine::{listing_sides, GameListing, ListedTeam, PredictionEngine};
pub use registry::{ModelInfo, ModelRegistry, ModelStatus, RetrainStatus};
pub use teams::TeamDirectory;
