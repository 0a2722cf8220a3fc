//! Model fitting
//!
//! Linear heads are fitted with full-batch SGD on a burn autodiff backend,
//! then exported to plain [`LinearModel`] parameters.

use burn::backend::{Autodiff, NdArray};
use burn::nn::{Linear, LinearConfig};
use burn::optim::adaptor::OptimizerAdaptor;
use burn::optim::{GradientsParams, Optimizer, Sgd, SgdConfig};
use burn::tensor::activation::sigmoid;
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::{ElementConversion, Tensor};
use rand::seq::SliceRandom;
use rand::SeedableRng;

use super::metrics::{ClassifierMetrics, ScoreMetrics};
use crate::features::{ClassifierFeatures, FeatureSchema, RegressorFeatures, TrainingRow};
use crate::model::bundle::{ClassifierArtifact, ModelBundle, ScoreArtifact, CLASSIFIER_KIND};
use crate::model::linear::{LinearModel, LogisticModel, RegressionModel, Standardizer, MIN_STD};
use crate::{CourtsideError, Result, TrainingConfig};

/// Backend used for fitting
pub type TrainBackend = Autodiff<NdArray<f32>>;

/// Fewest rows worth fitting a model on
pub const MIN_TRAINING_ROWS: usize = 10;

#[derive(Debug, Clone, Copy)]
enum Objective {
    /// Sigmoid output, binary cross-entropy
    Logistic,
    /// Identity output, mean squared error
    LeastSquares,
}

/// Fits single-layer linear models
pub struct LinearTrainer<B: AutodiffBackend> {
    device: B::Device,
    learning_rate: f64,
    epochs: usize,
    log_every: usize,
}

impl<B: AutodiffBackend> LinearTrainer<B> {
    pub fn new(device: B::Device, config: &TrainingConfig) -> Self {
        LinearTrainer {
            device,
            learning_rate: config.learning_rate,
            epochs: config.epochs,
            log_every: config.log_every,
        }
    }

    /// Fit a logistic classifier on raw features
    pub fn fit_logistic(&self, x: &[Vec<f64>], y: &[bool]) -> Result<LogisticModel> {
        let scaling = Standardizer::fit(x)?;
        let targets: Vec<f64> = y.iter().map(|&won| if won { 1.0 } else { 0.0 }).collect();
        let linear = self.fit(&scaling, x, &targets, Objective::Logistic)?;
        Ok(LogisticModel { scaling, linear })
    }

    /// Fit a least-squares regressor on raw features and targets
    pub fn fit_regression(&self, x: &[Vec<f64>], y: &[f64]) -> Result<RegressionModel> {
        let scaling = Standardizer::fit(x)?;
        let n = y.len().max(1) as f64;
        let target_mean = y.iter().sum::<f64>() / n;
        let target_std = (y.iter().map(|v| (v - target_mean).powi(2)).sum::<f64>() / n)
            .sqrt()
            .max(MIN_STD);
        let targets: Vec<f64> = y.iter().map(|v| (v - target_mean) / target_std).collect();
        let linear = self.fit(&scaling, x, &targets, Objective::LeastSquares)?;
        Ok(RegressionModel {
            scaling,
            linear,
            target_mean,
            target_std,
        })
    }

    fn fit(
        &self,
        scaling: &Standardizer,
        x: &[Vec<f64>],
        targets: &[f64],
        objective: Objective,
    ) -> Result<LinearModel> {
        let n = x.len();
        let dim = scaling.dim();
        if n == 0 || n != targets.len() {
            return Err(CourtsideError::Training(format!(
                "{} samples for {} targets",
                n,
                targets.len()
            )));
        }

        let flat: Vec<f32> = x
            .iter()
            .flat_map(|row| scaling.transform(row))
            .map(|v| v as f32)
            .collect();
        let inputs = Tensor::<B, 1>::from_floats(flat.as_slice(), &self.device).reshape([n, dim]);
        let flat_targets: Vec<f32> = targets.iter().map(|v| *v as f32).collect();
        let targets =
            Tensor::<B, 1>::from_floats(flat_targets.as_slice(), &self.device).reshape([n, 1]);

        let mut model: Linear<B> = LinearConfig::new(dim, 1).init(&self.device);
        let mut optimizer: OptimizerAdaptor<Sgd<B::InnerBackend>, Linear<B>, B> =
            SgdConfig::new().init();

        log::info!(
            "Fitting {:?} model on {} samples x {} features for {} epochs",
            objective,
            n,
            dim,
            self.epochs
        );

        for epoch in 0..self.epochs {
            let output = model.forward(inputs.clone());
            let loss = match objective {
                Objective::Logistic => binary_cross_entropy(sigmoid(output), targets.clone()),
                Objective::LeastSquares => (output - targets.clone()).powf_scalar(2.0).mean(),
            };
            let loss_value: f32 = loss.clone().into_scalar().elem();
            if !loss_value.is_finite() {
                return Err(CourtsideError::Training(format!(
                    "loss diverged at epoch {}",
                    epoch + 1
                )));
            }

            let grads = loss.backward();
            let grads_params = GradientsParams::from_grads(grads, &model);
            model = optimizer.step(self.learning_rate, model, grads_params);

            if self.log_every > 0 && (epoch % self.log_every == 0 || epoch + 1 == self.epochs) {
                log::info!("Epoch {}/{}: loss={:.4}", epoch + 1, self.epochs, loss_value);
            }
        }

        export(&model)
    }
}

fn binary_cross_entropy<B: AutodiffBackend>(
    probs: Tensor<B, 2>,
    targets: Tensor<B, 2>,
) -> Tensor<B, 1> {
    let eps = 1e-7;
    let probs_clamped = probs.clamp(eps, 1.0 - eps);
    let loss = targets.clone().neg() * probs_clamped.clone().log()
        - (targets.neg() + 1.0) * (probs_clamped.neg() + 1.0).log();
    loss.mean()
}

/// Copy fitted parameters out of the burn module
fn export<B: AutodiffBackend>(model: &Linear<B>) -> Result<LinearModel> {
    let to_vec = |data: burn::tensor::TensorData| -> Result<Vec<f64>> {
        data.convert::<f32>()
            .to_vec::<f32>()
            .map(|values| values.into_iter().map(f64::from).collect())
            .map_err(|e| CourtsideError::Training(format!("cannot read parameters: {:?}", e)))
    };

    let weights = to_vec(model.weight.val().into_data())?;
    let bias = match &model.bias {
        Some(bias) => to_vec(bias.val().into_data())?.first().copied().unwrap_or(0.0),
        None => 0.0,
    };
    Ok(LinearModel { weights, bias })
}

/// Shuffle row indices with a fixed seed and split off a test share.
///
/// Both sides get at least one row.
pub fn split_indices(n: usize, test_fraction: f64, seed: u64) -> Result<(Vec<usize>, Vec<usize>)> {
    if n < 2 {
        return Err(CourtsideError::Training(format!(
            "need at least 2 rows to split, found {}",
            n
        )));
    }
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let test = ((n as f64 * test_fraction).round() as usize).clamp(1, n - 1);
    let test_indices = indices.split_off(n - test);
    Ok((indices, test_indices))
}

/// Fits a complete [`ModelBundle`] from training rows
pub struct BundleTrainer {
    config: TrainingConfig,
}

impl BundleTrainer {
    pub fn new(config: TrainingConfig) -> Self {
        BundleTrainer { config }
    }

    pub fn fit(&self, rows: &[TrainingRow]) -> Result<ModelBundle> {
        if rows.len() < MIN_TRAINING_ROWS {
            return Err(CourtsideError::Training(format!(
                "need at least {} training rows, found {}",
                MIN_TRAINING_ROWS,
                rows.len()
            )));
        }
        let trainer = LinearTrainer::<TrainBackend>::new(Default::default(), &self.config);
        let trained_at = chrono::Utc::now().to_rfc3339();

        let classifier = self.fit_classifier(&trainer, rows, &trained_at)?;
        log::info!("Classifier: {}", classifier.metrics);

        let scored: Vec<&TrainingRow> = rows.iter().filter(|r| r.scores().is_some()).collect();
        let scores = if scored.len() >= MIN_TRAINING_ROWS {
            let scores = self.fit_scores(&trainer, &scored, &trained_at)?;
            log::info!("Score regressors: {}", scores.metrics);
            Some(scores)
        } else {
            log::warn!(
                "Only {} rows carry final scores, skipping score regressors",
                scored.len()
            );
            None
        };

        ModelBundle::new(classifier, scores)
    }

    fn fit_classifier(
        &self,
        trainer: &LinearTrainer<TrainBackend>,
        rows: &[TrainingRow],
        trained_at: &str,
    ) -> Result<ClassifierArtifact> {
        let (train, test) = split_indices(rows.len(), self.config.test_fraction, self.config.seed)?;
        let x = |i: &usize| ClassifierFeatures::from_row(&rows[*i].features).to_vec();

        let train_x: Vec<Vec<f64>> = train.iter().map(x).collect();
        let train_y: Vec<bool> = train.iter().map(|i| rows[*i].home_won).collect();
        let model = trainer.fit_logistic(&train_x, &train_y)?;

        let probs: Vec<f64> = test.iter().map(|i| model.predict_proba(&x(i))).collect();
        let labels: Vec<bool> = test.iter().map(|i| rows[*i].home_won).collect();

        Ok(ClassifierArtifact {
            model_type: CLASSIFIER_KIND.to_string(),
            model,
            features: ClassifierFeatures::column_names(),
            metrics: ClassifierMetrics::evaluate(&probs, &labels, train.len()),
            trained_at: trained_at.to_string(),
        })
    }

    fn fit_scores(
        &self,
        trainer: &LinearTrainer<TrainBackend>,
        rows: &[&TrainingRow],
        trained_at: &str,
    ) -> Result<ScoreArtifact> {
        let (train, test) = split_indices(rows.len(), self.config.test_fraction, self.config.seed)?;
        let x = |i: &usize| RegressorFeatures::from_row(&rows[*i].features).to_vec();
        let points = |i: &usize| -> (f64, f64) {
            let (home, away) = rows[*i].scores().unwrap_or_default();
            (home as f64, away as f64)
        };

        let train_x: Vec<Vec<f64>> = train.iter().map(x).collect();
        let (home_y, away_y): (Vec<f64>, Vec<f64>) = train.iter().map(points).unzip();
        let home_model = trainer.fit_regression(&train_x, &home_y)?;
        let away_model = trainer.fit_regression(&train_x, &away_y)?;

        let predicted: Vec<(f64, f64)> = test
            .iter()
            .map(|i| {
                let features = x(i);
                (home_model.predict(&features), away_model.predict(&features))
            })
            .collect();
        let actual: Vec<(f64, f64)> = test.iter().map(points).collect();

        Ok(ScoreArtifact {
            home_model,
            away_model,
            features: RegressorFeatures::column_names(),
            metrics: ScoreMetrics::evaluate(&predicted, &actual, train.len()),
            trained_at: trained_at.to_string(),
        })
    }
}
