//! Standardization applied to encoded features before inference

use crate::errors::InferenceError;
use crate::features::FeatureVector;
use serde::{Deserialize, Serialize};

/// Per-feature `(x - mean) / scale`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    pub fn validate(&self, n_features: usize) -> Result<(), String> {
        if self.mean.len() != n_features || self.scale.len() != n_features {
            return Err(format!(
                "scaler has {} means and {} scales, model expects {n_features} features",
                self.mean.len(),
                self.scale.len()
            ));
        }
        if self
            .mean
            .iter()
            .chain(self.scale.iter())
            .any(|v| !v.is_finite())
        {
            return Err("scaler contains non-finite parameters".to_string());
        }
        Ok(())
    }

    /// Standardize in place. A zero scale leaves the centered value as is.
    pub fn transform(&self, features: &mut FeatureVector) -> Result<(), InferenceError> {
        if features.len() != self.mean.len() {
            return Err(InferenceError::ShapeMismatch {
                expected: self.mean.len(),
                actual: features.len(),
            });
        }

        for ((x, mean), scale) in features
            .as_mut_slice()
            .iter_mut()
            .zip(&self.mean)
            .zip(&self.scale)
        {
            let centered = *x - mean;
            *x = if *scale == 0.0 {
                centered
            } else {
                centered / scale
            };
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standardizes_each_feature() {
        let scaler = StandardScaler {
            mean: vec![10.0, 0.0],
            scale: vec![2.0, 0.0],
        };
        let mut fv = FeatureVector::new(vec![14.0, 3.0]);
        scaler.transform(&mut fv).unwrap();
        assert_eq!(fv.as_slice(), &[2.0, 3.0]);
    }

    #[test]
    fn length_mismatch_is_reported() {
        let scaler = StandardScaler {
            mean: vec![0.0],
            scale: vec![1.0],
        };
        assert!(scaler.validate(2).is_err());
        let mut fv = FeatureVector::new(vec![1.0, 2.0]);
        assert!(scaler.transform(&mut fv).is_err());
    }
}
