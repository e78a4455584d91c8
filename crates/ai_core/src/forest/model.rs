//! Forest classifier artifact
//!
//! Implements a random-forest style classifier with:
//! - JSON artifact format with a canonical fingerprint
//! - Fixed-point split comparisons
//! - Per-class leaf weights averaged across trees for `predict_proba`

use super::tree::{checked_weight_sum, Tree};
use crate::classifier::{ClassId, Classifier};
use crate::errors::InferenceError;
use crate::serde_canon::Fingerprint;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Forest artifact errors
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Model validation failed: {0}")]
    ValidationFailed(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Default scale factor for fixed-point thresholds (1e6)
pub const SCALE: i64 = 1_000_000;

/// Convert a real feature value to the fixed-point domain
pub fn to_fixed(value: f64, scale: i64) -> i64 {
    // `as` saturates at the i64 bounds
    (value * scale as f64).round() as i64
}

/// Ensemble of decision trees voting over a fixed class list
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ForestClassifier {
    /// Artifact format version (always 1 for now)
    pub version: i32,

    /// Fixed-point scale factor for thresholds
    pub scale: i64,

    /// Number of features the forest was trained on
    pub n_features: usize,

    /// Class identifiers, in leaf-weight order
    pub classes: Vec<ClassId>,

    /// Decision trees in the ensemble
    pub trees: Vec<Tree>,
}

impl ForestClassifier {
    pub fn new(n_features: usize, classes: Vec<ClassId>, trees: Vec<Tree>) -> Self {
        Self {
            version: 1,
            scale: SCALE,
            n_features,
            classes,
            trees,
        }
    }

    /// Validate model structure
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.version != 1 {
            return Err(ModelError::ValidationFailed(format!(
                "Unsupported model version: {}",
                self.version
            )));
        }

        if self.scale <= 0 {
            return Err(ModelError::ValidationFailed(format!(
                "Invalid scale: {}",
                self.scale
            )));
        }

        if self.classes.is_empty() {
            return Err(ModelError::ValidationFailed(
                "Model declares no classes".to_string(),
            ));
        }

        if self.trees.is_empty() {
            return Err(ModelError::ValidationFailed(
                "Model has no trees".to_string(),
            ));
        }

        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.classes.len(), self.n_features)
                .map_err(|e| {
                    ModelError::ValidationFailed(format!("Tree {i} validation failed: {e}"))
                })?;
        }

        Ok(())
    }

    /// Average per-tree class distributions for one feature vector
    pub fn probabilities(&self, features: &[f64]) -> Result<Vec<f64>, InferenceError> {
        if features.len() != self.n_features {
            return Err(InferenceError::ShapeMismatch {
                expected: self.n_features,
                actual: features.len(),
            });
        }

        let fixed: Vec<i64> = features.iter().map(|v| to_fixed(*v, self.scale)).collect();
        let mut totals = vec![0.0f64; self.classes.len()];

        for (i, tree) in self.trees.iter().enumerate() {
            let weights = tree.evaluate(&fixed).ok_or_else(|| {
                InferenceError::Failed(format!("tree {i} did not reach a leaf"))
            })?;
            let sum = match checked_weight_sum(weights) {
                Some(sum) if sum > 0 && weights.len() == totals.len() => sum,
                _ => {
                    return Err(InferenceError::InvalidDistribution(format!(
                        "tree {i} leaf has unusable weights"
                    )))
                }
            };
            for (total, w) in totals.iter_mut().zip(weights) {
                *total += *w as f64 / sum as f64;
            }
        }

        let n_trees = self.trees.len() as f64;
        for total in &mut totals {
            *total /= n_trees;
        }
        Ok(totals)
    }

    /// Compute the artifact fingerprint
    pub fn fingerprint(&self) -> Result<Fingerprint, ModelError> {
        Ok(Fingerprint::of(self)?)
    }

    /// Load and validate a model from a JSON file
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self, ModelError> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn from_json_str(json: &str) -> Result<Self, ModelError> {
        let model: ForestClassifier = serde_json::from_str(json)?;
        model.validate()?;
        Ok(model)
    }
}

/// Index of the highest value; the lowest index wins ties
pub(crate) fn argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, v) in values.iter().copied().enumerate() {
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

impl Classifier for ForestClassifier {
    fn classes(&self) -> &[ClassId] {
        &self.classes
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict(&self, features: &[f64]) -> Result<ClassId, InferenceError> {
        let proba = self.probabilities(features)?;
        let best = argmax(&proba).ok_or_else(|| {
            InferenceError::InvalidDistribution("empty distribution".to_string())
        })?;
        Ok(self.classes[best].clone())
    }

    fn predict_proba(&self, features: &[f64]) -> Result<Option<Vec<f64>>, InferenceError> {
        self.probabilities(features).map(Some)
    }
}
