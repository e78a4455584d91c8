//! Classifier capability consumed by the prediction adapter
//!
//! Model artifacts are opaque to the rest of the pipeline: anything that can
//! map a feature vector to a class identifier (and optionally to a
//! distribution over its classes) can back a recommender.

use crate::errors::InferenceError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Class identifier emitted by a classifier: an integer index or a string label
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClassId {
    Index(i64),
    Name(String),
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassId::Index(idx) => write!(f, "{idx}"),
            ClassId::Name(name) => f.write_str(name),
        }
    }
}

impl From<i64> for ClassId {
    fn from(value: i64) -> Self {
        ClassId::Index(value)
    }
}

impl From<&str> for ClassId {
    fn from(value: &str) -> Self {
        ClassId::Name(value.to_string())
    }
}

/// A fitted classifier. Implementations must not mutate shared state during
/// inference so a single instance can serve concurrent requests.
pub trait Classifier: Send + Sync {
    /// Class identifiers in the order used by `predict_proba`
    fn classes(&self) -> &[ClassId];

    /// Number of features the model was trained on
    fn n_features(&self) -> usize;

    /// Predict the single best class
    fn predict(&self, features: &[f64]) -> Result<ClassId, InferenceError>;

    /// Probability per class, aligned with `classes()`.
    ///
    /// Returns `Ok(None)` when the model has no probability interface.
    fn predict_proba(&self, features: &[f64]) -> Result<Option<Vec<f64>>, InferenceError>;
}
