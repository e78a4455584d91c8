//! Error types for the prediction pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Rejected request input. Always names the first offending field when there is one.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Body was not a key-value object
    #[error("Invalid JSON body")]
    InvalidBody,

    /// A required field is absent
    #[error("Missing field: {field}")]
    MissingField { field: String },

    /// A field could not be coerced to a number
    #[error("Invalid value for {field}: expected a number, got {raw}")]
    NotNumeric { field: String, raw: String },

    /// A field parsed to NaN or infinity
    #[error("Invalid value for {field}: must be a finite number")]
    NonFinite { field: String },

    /// A field with an enforced range fell outside it
    #[error("{field} should be between {min} and {max}, got {value}")]
    OutOfRange {
        field: String,
        min: f64,
        max: f64,
        value: f64,
    },

    /// A categorical field holds a value the encoder does not know
    #[error("Unknown {field} '{value}'; expected one of: {}", allowed.join(", "))]
    UnknownCategory {
        field: String,
        value: String,
        allowed: Vec<String>,
    },

    /// Image payload could not be decoded
    #[error("Invalid image: {0}")]
    InvalidImage(String),
}

impl ValidationError {
    /// Field the error refers to, if any
    pub fn field(&self) -> Option<&str> {
        match self {
            ValidationError::MissingField { field }
            | ValidationError::NotNumeric { field, .. }
            | ValidationError::NonFinite { field }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::UnknownCategory { field, .. } => Some(field),
            ValidationError::InvalidBody | ValidationError::InvalidImage(_) => None,
        }
    }
}

/// The model raised while scoring a feature vector. Reported, never retried.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InferenceError {
    /// Feature vector length differs from what the model was trained on
    #[error("Feature vector has {actual} values but the model expects {expected}")]
    ShapeMismatch { expected: usize, actual: usize },

    /// Probability output is unusable
    #[error("Model produced an invalid probability distribution: {0}")]
    InvalidDistribution(String),

    /// Any other failure inside the model
    #[error("Model execution failed: {0}")]
    Failed(String),
}

/// A class identifier that maps onto no known label
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown class identifier: {class_id}")]
pub struct UnknownClassError {
    pub class_id: String,
}

/// Mandatory artifacts were absent or corrupt at startup
#[derive(Error, Debug)]
pub enum ModelNotLoadedError {
    #[error("Artifact not found: {}", path.display())]
    MissingArtifact { path: PathBuf },

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid artifact {}: {reason}", path.display())]
    Invalid { path: PathBuf, reason: String },
}

/// Any failure along the request pipeline
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Inference(#[from] InferenceError),

    #[error(transparent)]
    UnknownClass(#[from] UnknownClassError),

    #[error(transparent)]
    ModelNotLoaded(#[from] ModelNotLoadedError),
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_field_message_names_field() {
        let err = ValidationError::MissingField {
            field: "rainfall".into(),
        };
        assert_eq!(err.to_string(), "Missing field: rainfall");
        assert_eq!(err.field(), Some("rainfall"));
    }

    #[test]
    fn unknown_category_lists_allowed_values() {
        let err = ValidationError::UnknownCategory {
            field: "soil_type".into(),
            value: "Peat".into(),
            allowed: vec!["Black".into(), "Red".into()],
        };
        assert_eq!(
            err.to_string(),
            "Unknown soil_type 'Peat'; expected one of: Black, Red"
        );
    }
}
