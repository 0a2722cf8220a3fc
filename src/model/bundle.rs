//! Model artifacts and the immutable bundle served to predictions
//!
//! The classifier and the score regressors are stored as separate JSON
//! files. Each carries its ordered feature list, which must match the
//! documented schema before the artifact is accepted.

use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

use super::linear::{LogisticModel, RegressionModel};
use crate::features::{ClassifierFeatures, FeatureSchema, RegressorFeatures};
use crate::training::metrics::{ClassifierMetrics, ScoreMetrics};
use crate::{CourtsideError, Result};

pub const CLASSIFIER_KIND: &str = "logistic_regression";

/// Fitted win/loss classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierArtifact {
    pub model_type: String,
    pub model: LogisticModel,
    pub features: Vec<String>,
    pub metrics: ClassifierMetrics,
    pub trained_at: String,
}

impl ClassifierArtifact {
    /// Check the feature list and parameter shapes
    pub fn validate(&self) -> Result<()> {
        ClassifierFeatures::check_columns(&self.features)?;
        self.model.validate(self.features.len())
    }

    /// Probability that the home team wins
    pub fn home_win_probability(&self, features: &ClassifierFeatures) -> f64 {
        self.model.predict_proba(&features.to_vec())
    }
}

/// Fitted home and away score regressors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreArtifact {
    pub home_model: RegressionModel,
    pub away_model: RegressionModel,
    pub features: Vec<String>,
    pub metrics: ScoreMetrics,
    pub trained_at: String,
}

impl ScoreArtifact {
    pub fn validate(&self) -> Result<()> {
        RegressorFeatures::check_columns(&self.features)?;
        self.home_model.validate(self.features.len())?;
        self.away_model.validate(self.features.len())
    }

    /// Raw `(home, away)` point predictions
    pub fn predict(&self, features: &RegressorFeatures) -> (f64, f64) {
        let x = features.to_vec();
        (self.home_model.predict(&x), self.away_model.predict(&x))
    }
}

/// Everything needed to serve predictions; never mutated once built
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelBundle {
    pub classifier: ClassifierArtifact,
    pub scores: Option<ScoreArtifact>,
}

impl ModelBundle {
    pub fn new(classifier: ClassifierArtifact, scores: Option<ScoreArtifact>) -> Result<Self> {
        classifier.validate()?;
        if let Some(scores) = &scores {
            scores.validate()?;
        }
        Ok(ModelBundle { classifier, scores })
    }

    /// Load both artifacts.
    ///
    /// The classifier is required. A missing or unreadable score artifact
    /// only disables score predictions.
    pub fn load<P: AsRef<Path>, Q: AsRef<Path>>(classifier_path: P, score_path: Q) -> Result<Self> {
        let classifier: ClassifierArtifact = read_json(classifier_path.as_ref())?;
        classifier.validate()?;
        log::info!(
            "Loaded {} classifier with {} features ({})",
            classifier.model_type,
            classifier.features.len(),
            classifier.metrics
        );

        let score_path = score_path.as_ref();
        let scores = if score_path.exists() {
            match read_json::<ScoreArtifact>(score_path).and_then(|s| s.validate().map(|_| s)) {
                Ok(scores) => {
                    log::info!(
                        "Loaded score regressors with {} features ({})",
                        scores.features.len(),
                        scores.metrics
                    );
                    Some(scores)
                }
                Err(e) => {
                    log::warn!("Score model at {} unusable: {}", score_path.display(), e);
                    None
                }
            }
        } else {
            log::info!("No score model at {}", score_path.display());
            None
        };

        Ok(ModelBundle { classifier, scores })
    }

    /// Write both artifacts, creating parent directories.
    ///
    /// Both files are staged next to their targets before either is
    /// replaced, so a failed write leaves the previous bundle in place.
    pub fn save<P: AsRef<Path>, Q: AsRef<Path>>(&self, classifier_path: P, score_path: Q) -> Result<()> {
        let (classifier_path, score_path) = (classifier_path.as_ref(), score_path.as_ref());
        let classifier = stage_json(classifier_path, &self.classifier)?;
        let scores = match &self.scores {
            Some(scores) => Some(stage_json(score_path, scores)?),
            None => None,
        };

        classifier.persist(classifier_path).map_err(|e| e.error)?;
        match scores {
            Some(staged) => {
                staged.persist(score_path).map_err(|e| e.error)?;
            }
            // Never pair a new classifier with stale regressors
            None if score_path.exists() => std::fs::remove_file(score_path)?,
            None => {}
        }
        Ok(())
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        CourtsideError::Io(std::io::Error::new(
            e.kind(),
            format!("{}: {}", path.display(), e),
        ))
    })?;
    Ok(serde_json::from_str(&content)?)
}

/// Serialize into a temporary file in the target's directory
fn stage_json<T: Serialize>(path: &Path, value: &T) -> Result<NamedTempFile> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;
    let mut staged = NamedTempFile::new_in(parent)?;
    staged.write_all(serde_json::to_string_pretty(value)?.as_bytes())?;
    staged.as_file().sync_all()?;
    Ok(staged)
}
