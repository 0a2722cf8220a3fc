//! Feature derivation
//!
//! Turns the game log into causal, fixed-schema features, either for the
//! whole history at once (training) or for one matchup as of a date
//! (serving). Both paths produce identical values for the same game.

pub mod batch;
pub mod head_to_head;
pub mod point_in_time;
pub mod schema;
pub mod team_stats;

pub use batch::{BatchFeatureBuilder, TrainingRow};
pub use head_to_head::{HeadToHead, HeadToHeadIndex, HeadToHeadResolver};
pub use point_in_time::PointInTimeFeatureBuilder;
pub use schema::{
    ClassifierFeatures, FeatureRow, FeatureSchema, RegressorFeatures, SideFeatures,
    FEATURE_COLUMNS,
};
pub use team_stats::{RollingWindow, SeasonForm};
