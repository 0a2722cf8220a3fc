//! Owner of the currently served model bundle
//!
//! Readers take a cheap `Arc` clone of the bundle. Loading and retraining
//! build a complete bundle first and then replace the pointer under a short
//! write lock, so a reader never observes a half-updated model.

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::data::TeamGameHistory;
use crate::features::BatchFeatureBuilder;
use crate::model::ModelBundle;
use crate::training::{BundleTrainer, ClassifierMetrics, ScoreMetrics};
use crate::{DataConfig, TrainingConfig};

#[derive(Debug, Clone)]
enum ModelState {
    Unloaded,
    Loaded(Arc<ModelBundle>),
    LoadFailed(String),
}

/// Externally visible registry state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelStatus {
    Unloaded,
    Loaded,
    LoadFailed,
}

/// Outcome of a retrain request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RetrainStatus {
    Success {
        classifier: ClassifierMetrics,
        scores: Option<ScoreMetrics>,
    },
    Error {
        error: String,
    },
}

impl RetrainStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, RetrainStatus::Success { .. })
    }
}

/// Metadata about the served models
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub status: ModelStatus,
    pub error: Option<String>,
    pub model_type: Option<String>,
    pub trained_at: Option<String>,
    pub classifier_features: Vec<String>,
    pub classifier_metrics: Option<ClassifierMetrics>,
    pub score_features: Vec<String>,
    pub score_metrics: Option<ScoreMetrics>,
}

/// Single owner of the served [`ModelBundle`]
#[derive(Debug)]
pub struct ModelRegistry {
    classifier_path: PathBuf,
    score_path: PathBuf,
    state: RwLock<ModelState>,
}

impl ModelRegistry {
    /// Registry for the given artifact paths, initially unloaded
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(classifier_path: P, score_path: Q) -> Self {
        ModelRegistry {
            classifier_path: classifier_path.as_ref().to_path_buf(),
            score_path: score_path.as_ref().to_path_buf(),
            state: RwLock::new(ModelState::Unloaded),
        }
    }

    pub fn from_config(config: &DataConfig) -> Self {
        Self::new(&config.classifier_path, &config.score_model_path)
    }

    fn read(&self) -> RwLockReadGuard<'_, ModelState> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, ModelState> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Load artifacts from disk, replacing whatever is served
    pub fn load(&self) -> ModelStatus {
        let next = match ModelBundle::load(&self.classifier_path, &self.score_path) {
            Ok(bundle) => ModelState::Loaded(Arc::new(bundle)),
            Err(e) => {
                log::error!(
                    "Failed to load classifier from {}: {}",
                    self.classifier_path.display(),
                    e
                );
                ModelState::LoadFailed(e.to_string())
            }
        };
        *self.write() = next;
        self.status()
    }

    /// The served bundle, if one is loaded
    pub fn get(&self) -> Option<Arc<ModelBundle>> {
        match &*self.read() {
            ModelState::Loaded(bundle) => Some(Arc::clone(bundle)),
            _ => None,
        }
    }

    pub fn status(&self) -> ModelStatus {
        match &*self.read() {
            ModelState::Unloaded => ModelStatus::Unloaded,
            ModelState::Loaded(_) => ModelStatus::Loaded,
            ModelState::LoadFailed(_) => ModelStatus::LoadFailed,
        }
    }

    /// Serve an already-built bundle
    pub fn install(&self, bundle: ModelBundle) {
        *self.write() = ModelState::Loaded(Arc::new(bundle));
    }

    /// Fit a new bundle from the full history, persist it and serve it.
    ///
    /// On failure the previously served bundle stays in place.
    pub fn retrain(&self, history: &TeamGameHistory, config: &TrainingConfig) -> RetrainStatus {
        log::info!("Retraining on {} log rows", history.len());
        let rows = BatchFeatureBuilder::build(history);

        let fitted = BundleTrainer::new(config.clone())
            .fit(&rows)
            .and_then(|bundle| {
                bundle.save(&self.classifier_path, &self.score_path)?;
                Ok(bundle)
            });

        match fitted {
            Ok(bundle) => {
                let status = RetrainStatus::Success {
                    classifier: bundle.classifier.metrics.clone(),
                    scores: bundle.scores.as_ref().map(|s| s.metrics.clone()),
                };
                self.install(bundle);
                log::info!("Retrain complete, new bundle is live");
                status
            }
            Err(e) => {
                log::error!("Retrain failed, keeping current bundle: {}", e);
                RetrainStatus::Error {
                    error: e.to_string(),
                }
            }
        }
    }

    pub fn info(&self) -> ModelInfo {
        let state = self.read().clone();
        let mut info = ModelInfo {
            status: ModelStatus::Unloaded,
            error: None,
            model_type: None,
            trained_at: None,
            classifier_features: Vec::new(),
            classifier_metrics: None,
            score_features: Vec::new(),
            score_metrics: None,
        };
        match state {
            ModelState::Unloaded => {}
            ModelState::LoadFailed(error) => {
                info.status = ModelStatus::LoadFailed;
                info.error = Some(error);
            }
            ModelState::Loaded(bundle) => {
                info.status = ModelStatus::Loaded;
                info.model_type = Some(bundle.classifier.model_type.clone());
                info.trained_at = Some(bundle.classifier.trained_at.clone());
                info.classifier_features = bundle.classifier.features.clone();
                info.classifier_metrics = Some(bundle.classifier.metrics.clone());
                if let Some(scores) = &bundle.scores {
                    info.score_features = scores.features.clone();
                    info.score_metrics = Some(scores.metrics.clone());
                }
            }
        }
        info
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::bundle::tests::sample_bundle;

    #[test]
    fn test_starts_unloaded() {
        let registry = ModelRegistry::new("a.json", "b.json");
        assert_eq!(registry.status(), ModelStatus::Unloaded);
        assert!(registry.get().is_none());
    }

    #[test]
    fn test_missing_artifact_marks_load_failed() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ModelRegistry::new(dir.path().join("none.json"), dir.path().join("x.json"));
        assert_eq!(registry.load(), ModelStatus::LoadFailed);
        assert!(registry.get().is_none());
        assert!(registry.info().error.is_some());
    }

    #[test]
    fn test_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let classifier = dir.path().join("clf.json");
        let scores = dir.path().join("scores.json");
        sample_bundle().save(&classifier, &scores).unwrap();

        let registry = ModelRegistry::new(&classifier, &scores);
        assert_eq!(registry.load(), ModelStatus::Loaded);
        let info = registry.info();
        assert_eq!(info.classifier_features.len(), 12);
        assert_eq!(info.score_features.len(), 27);
    }

    #[test]
    fn test_failed_retrain_keeps_current_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ModelRegistry::new(dir.path().join("clf.json"), dir.path().join("s.json"));
        registry.install(sample_bundle());
        let before = registry.get().unwrap();

        let status = registry.retrain(&TeamGameHistory::new(), &crate::Config::default().training);
        assert!(!status.is_success());
        let after = registry.get().unwrap();
        assert!(Arc::ptr_eq(&before, &after));
    }

    #[test]
    fn test_retrain_status_json_shape() {
        let status = RetrainStatus::Error {
            error: "boom".to_string(),
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["error"], "boom");
    }
}
