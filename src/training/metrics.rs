//! Hold-out evaluation metrics

use serde::{Deserialize, Serialize};
use std::fmt;

/// Win/loss classifier quality on the test split
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassifierMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub auc_roc: f64,
    pub train_samples: usize,
    pub test_samples: usize,
}

impl ClassifierMetrics {
    /// Evaluate predicted home-win probabilities against outcomes
    pub fn evaluate(probs: &[f64], labels: &[bool], train_samples: usize) -> Self {
        let mut tp = 0usize;
        let mut fp = 0usize;
        let mut fn_ = 0usize;
        let mut correct = 0usize;
        for (p, &label) in probs.iter().zip(labels) {
            let predicted = *p > 0.5;
            if predicted == label {
                correct += 1;
            }
            match (predicted, label) {
                (true, true) => tp += 1,
                (true, false) => fp += 1,
                (false, true) => fn_ += 1,
                (false, false) => {}
            }
        }

        let ratio = |num: usize, den: usize| if den == 0 { 0.0 } else { num as f64 / den as f64 };
        let precision = ratio(tp, tp + fp);
        let recall = ratio(tp, tp + fn_);
        let f1 = if precision + recall == 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        };

        ClassifierMetrics {
            accuracy: ratio(correct, probs.len()),
            precision,
            recall,
            f1,
            auc_roc: auc_roc(probs, labels),
            train_samples,
            test_samples: probs.len(),
        }
    }
}

impl fmt::Display for ClassifierMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "accuracy={:.1}% precision={:.3} recall={:.3} f1={:.3} auc={:.3} (train={}, test={})",
            self.accuracy * 100.0,
            self.precision,
            self.recall,
            self.f1,
            self.auc_roc,
            self.train_samples,
            self.test_samples
        )
    }
}

/// Area under the ROC curve from ranks, ties sharing the average rank.
///
/// 0.5 when either class is absent.
pub fn auc_roc(scores: &[f64], labels: &[bool]) -> f64 {
    let positives = labels.iter().filter(|l| **l).count();
    let negatives = labels.len() - positives;
    if positives == 0 || negatives == 0 {
        return 0.5;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut ranks = vec![0.0; scores.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        let rank = (i + j) as f64 / 2.0 + 1.0;
        for k in i..=j {
            ranks[order[k]] = rank;
        }
        i = j + 1;
    }

    let positive_rank_sum: f64 = ranks
        .iter()
        .zip(labels)
        .filter(|(_, l)| **l)
        .map(|(r, _)| *r)
        .sum();
    let p = positives as f64;
    (positive_rank_sum - p * (p + 1.0) / 2.0) / (p * negatives as f64)
}

/// Error summary for one regressor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    pub mae: f64,
    pub rmse: f64,
    pub r2: f64,
    /// Share of predictions within 5 points
    pub within_5: f64,
}

impl RegressionMetrics {
    pub fn evaluate(predicted: &[f64], actual: &[f64]) -> Self {
        if actual.is_empty() {
            return Self::default();
        }
        let n = actual.len() as f64;
        let errors: Vec<f64> = predicted.iter().zip(actual).map(|(p, a)| p - a).collect();
        let mae = errors.iter().map(|e| e.abs()).sum::<f64>() / n;
        let sse: f64 = errors.iter().map(|e| e * e).sum();
        let mean = actual.iter().sum::<f64>() / n;
        let sst: f64 = actual.iter().map(|a| (a - mean) * (a - mean)).sum();
        RegressionMetrics {
            mae,
            rmse: (sse / n).sqrt(),
            r2: if sst == 0.0 { 0.0 } else { 1.0 - sse / sst },
            within_5: errors.iter().filter(|e| e.abs() <= 5.0).count() as f64 / n,
        }
    }
}

/// Score regressor pair quality on the test split
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreMetrics {
    pub home: RegressionMetrics,
    pub away: RegressionMetrics,
    pub total_mae: f64,
    pub margin_mae: f64,
    /// Winner picked from the sign of the predicted margin
    pub winner_accuracy: f64,
    pub train_samples: usize,
    pub test_samples: usize,
}

impl ScoreMetrics {
    /// `predicted` and `actual` are `(home, away)` score pairs
    pub fn evaluate(predicted: &[(f64, f64)], actual: &[(f64, f64)], train_samples: usize) -> Self {
        let split = |pairs: &[(f64, f64)]| -> (Vec<f64>, Vec<f64>) { pairs.iter().copied().unzip() };
        let (home_pred, away_pred) = split(predicted);
        let (home_true, away_true) = split(actual);

        let n = actual.len().max(1) as f64;
        let mut total_err = 0.0;
        let mut margin_err = 0.0;
        let mut winners = 0usize;
        for ((ph, pa), (ah, aa)) in predicted.iter().zip(actual) {
            total_err += ((ph + pa) - (ah + aa)).abs();
            margin_err += ((ph - pa) - (ah - aa)).abs();
            if (ph > pa) == (ah > aa) {
                winners += 1;
            }
        }

        ScoreMetrics {
            home: RegressionMetrics::evaluate(&home_pred, &home_true),
            away: RegressionMetrics::evaluate(&away_pred, &away_true),
            total_mae: total_err / n,
            margin_mae: margin_err / n,
            winner_accuracy: winners as f64 / n,
            train_samples,
            test_samples: actual.len(),
        }
    }
}

impl fmt::Display for ScoreMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "home MAE={:.2} away MAE={:.2} total MAE={:.2} margin MAE={:.2} winner={:.1}% (train={}, test={})",
            self.home.mae,
            self.away.mae,
            self.total_mae,
            self.margin_mae,
            self.winner_accuracy * 100.0,
            self.train_samples,
            self.test_samples
        )
    }
}
