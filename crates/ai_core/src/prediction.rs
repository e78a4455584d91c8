//! Prediction adapter: runs a classifier over a feature vector
//!
//! Wraps the [`Classifier`] capability, checks what it returns and ranks
//! classes by probability. Holds no state of its own.

use crate::classifier::{ClassId, Classifier};
use crate::errors::InferenceError;
use crate::features::FeatureVector;
use serde::Serialize;

/// Tolerance for a probability vector that should sum to one
const DISTRIBUTION_EPSILON: f64 = 1e-6;

/// Entropy (nats) above which a disease prediction is flagged as uncertain
pub const UNCERTAIN_ENTROPY: f64 = 2.5;

/// Classifier output before label resolution
#[derive(Debug, Clone, PartialEq)]
pub struct RawPrediction {
    pub class_id: ClassId,
    /// Aligned with the classifier's `classes()`; absent when the model has
    /// no probability interface
    pub probabilities: Option<Vec<f64>>,
}

impl RawPrediction {
    /// Probability of the predicted class, when known
    pub fn confidence(&self, classes: &[ClassId]) -> Option<f64> {
        let probs = self.probabilities.as_ref()?;
        classes
            .iter()
            .position(|c| *c == self.class_id)
            .and_then(|i| probs.get(i).copied())
    }
}

/// Score one feature vector
pub fn run_inference(
    model: &dyn Classifier,
    features: &FeatureVector,
) -> Result<RawPrediction, InferenceError> {
    if features.len() != model.n_features() {
        return Err(InferenceError::ShapeMismatch {
            expected: model.n_features(),
            actual: features.len(),
        });
    }

    let class_id = model.predict(features.as_slice())?;
    let probabilities = model.predict_proba(features.as_slice())?;

    if let Some(probs) = &probabilities {
        check_distribution(probs, model.classes().len())?;
    }

    Ok(RawPrediction {
        class_id,
        probabilities,
    })
}

fn check_distribution(probs: &[f64], n_classes: usize) -> Result<(), InferenceError> {
    if probs.len() != n_classes {
        return Err(InferenceError::InvalidDistribution(format!(
            "{} probabilities for {n_classes} classes",
            probs.len()
        )));
    }
    if probs.iter().any(|p| !p.is_finite() || *p < 0.0) {
        return Err(InferenceError::InvalidDistribution(
            "probabilities must be finite and non-negative".to_string(),
        ));
    }
    let sum: f64 = probs.iter().sum();
    if (sum - 1.0).abs() > DISTRIBUTION_EPSILON {
        return Err(InferenceError::InvalidDistribution(format!(
            "probabilities sum to {sum}"
        )));
    }
    Ok(())
}

/// Indices of the `k` most probable classes, highest first.
///
/// Equal probabilities keep ascending class order. `k` larger than the class
/// count yields every class.
pub fn top_k(probabilities: &[f64], k: usize) -> Vec<(usize, f64)> {
    let mut ranked: Vec<(usize, f64)> = probabilities.iter().copied().enumerate().collect();
    // sort_by is stable, so ties stay in index order
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked.truncate(k);
    ranked
}

/// Shannon entropy in nats; zero-probability classes contribute nothing
pub fn entropy(probabilities: &[f64]) -> f64 {
    probabilities
        .iter()
        .filter(|p| **p > 0.0)
        .map(|p| -p * p.ln())
        .sum()
}

/// Coarse confidence band for a disease prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

impl ConfidenceLevel {
    pub fn from_probability(p: f64) -> Self {
        if p >= 0.8 {
            ConfidenceLevel::High
        } else if p >= 0.5 {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }
}
