//! Fitted linear models
//!
//! Parameters are plain data so a loaded model can be shared across threads
//! and evaluated without a tensor backend.

use serde::{Deserialize, Serialize};

use crate::{CourtsideError, Result};

/// Smallest standard deviation used when scaling a feature
pub const MIN_STD: f64 = 0.001;

/// Z-score scaling fitted on training features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Standardizer {
    pub mean: Vec<f64>,
    pub std: Vec<f64>,
}

impl Standardizer {
    /// Fit on row-major samples
    pub fn fit(rows: &[Vec<f64>]) -> Result<Self> {
        let Some(first) = rows.first() else {
            return Err(CourtsideError::Training(
                "cannot fit scaling on an empty sample".to_string(),
            ));
        };
        let dim = first.len();
        let n = rows.len() as f64;

        let mut mean = vec![0.0; dim];
        for row in rows {
            if row.len() != dim {
                return Err(CourtsideError::Training(format!(
                    "ragged sample: expected {} values, found {}",
                    dim,
                    row.len()
                )));
            }
            for (m, v) in mean.iter_mut().zip(row) {
                *m += v;
            }
        }
        for m in &mut mean {
            *m /= n;
        }

        let mut var = vec![0.0; dim];
        for row in rows {
            for ((s, v), m) in var.iter_mut().zip(row).zip(&mean) {
                *s += (v - m) * (v - m);
            }
        }
        let std = var.iter().map(|s| (s / n).sqrt().max(MIN_STD)).collect();

        Ok(Standardizer { mean, std })
    }

    pub fn dim(&self) -> usize {
        self.mean.len()
    }

    pub fn transform(&self, values: &[f64]) -> Vec<f64> {
        values
            .iter()
            .zip(self.mean.iter().zip(&self.std))
            .map(|(v, (m, s))| (v - m) / s)
            .collect()
    }
}

/// `y = w·x + b`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub weights: Vec<f64>,
    pub bias: f64,
}

impl LinearModel {
    pub fn forward(&self, x: &[f64]) -> f64 {
        self.weights.iter().zip(x).map(|(w, v)| w * v).sum::<f64>() + self.bias
    }
}

pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Logistic regression over standardised features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticModel {
    pub scaling: Standardizer,
    pub linear: LinearModel,
}

impl LogisticModel {
    /// Probability of the positive class
    pub fn predict_proba(&self, features: &[f64]) -> f64 {
        sigmoid(self.linear.forward(&self.scaling.transform(features)))
    }

    pub fn predict(&self, features: &[f64]) -> bool {
        self.predict_proba(features) > 0.5
    }

    pub fn validate(&self, dim: usize) -> Result<()> {
        check_dims("classifier", &self.scaling, &self.linear, dim)
    }
}

/// Linear regression over standardised features with a standardised target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionModel {
    pub scaling: Standardizer,
    pub linear: LinearModel,
    pub target_mean: f64,
    pub target_std: f64,
}

impl RegressionModel {
    pub fn predict(&self, features: &[f64]) -> f64 {
        let z = self.linear.forward(&self.scaling.transform(features));
        z * self.target_std + self.target_mean
    }

    pub fn validate(&self, dim: usize) -> Result<()> {
        check_dims("regressor", &self.scaling, &self.linear, dim)
    }
}

fn check_dims(name: &str, scaling: &Standardizer, linear: &LinearModel, dim: usize) -> Result<()> {
    if scaling.dim() != dim || scaling.std.len() != dim || linear.weights.len() != dim {
        return Err(CourtsideError::schema(
            name,
            format!(
                "expected {} inputs, model has {} means, {} stds and {} weights",
                dim,
                scaling.dim(),
                scaling.std.len(),
                linear.weights.len()
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standardizer_fit() {
        let rows = vec![vec![1.0, 5.0], vec![3.0, 5.0]];
        let scaling = Standardizer::fit(&rows).unwrap();
        assert_eq!(scaling.mean, vec![2.0, 5.0]);
        assert_eq!(scaling.std[0], 1.0);
        // Constant column is floored
        assert_eq!(scaling.std[1], MIN_STD);
        assert_eq!(scaling.transform(&[3.0, 5.0]), vec![1.0, 0.0]);
    }

    #[test]
    fn test_standardizer_rejects_empty_and_ragged() {
        assert!(Standardizer::fit(&[]).is_err());
        assert!(Standardizer::fit(&[vec![1.0], vec![1.0, 2.0]]).is_err());
    }

    #[test]
    fn test_logistic_prediction() {
        let model = LogisticModel {
            scaling: Standardizer {
                mean: vec![0.0],
                std: vec![1.0],
            },
            linear: LinearModel {
                weights: vec![2.0],
                bias: 0.0,
            },
        };
        assert_eq!(model.predict_proba(&[0.0]), 0.5);
        assert!(model.predict(&[1.0]));
        assert!(!model.predict(&[-1.0]));
        assert!(model.validate(1).is_ok());
        assert!(model.validate(2).is_err());
    }

    #[test]
    fn test_regression_restores_target_scale() {
        let model = RegressionModel {
            scaling: Standardizer {
                mean: vec![10.0],
                std: vec![2.0],
            },
            linear: LinearModel {
                weights: vec![1.0],
                bias: 0.0,
            },
            target_mean: 110.0,
            target_std: 12.0,
        };
        assert_eq!(model.predict(&[10.0]), 110.0);
        assert_eq!(model.predict(&[12.0]), 122.0);
    }
}
