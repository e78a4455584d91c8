//! Request validation and feature vector assembly
//!
//! A [`FeatureSchema`] lists the fields a model consumes, in training order.
//! Validation walks the schema in that order and stops at the first field that
//! is missing or malformed, so error messages are deterministic.

use crate::errors::ValidationError;
use crate::labels::LabelEncoder;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

/// Raw request payload: field name to form string or JSON value
pub type RawPayload = Map<String, Value>;

/// Ordered numeric inputs, exactly as the model expects them
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureVector(Vec<f64>);

impl FeatureVector {
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<f64> {
        self.0
    }
}

/// Inclusive plausible range for a numeric field
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    pub fn contains(&self, value: f64) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// Real-valued input. The range is rejected on only when `enforced`.
    Numeric {
        range: Option<ValueRange>,
        enforced: bool,
    },
    /// Named category encoded through its training-time encoder
    Categorical { encoder: LabelEncoder },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
}

impl FieldSpec {
    /// Numeric field without a documented range
    pub fn numeric(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: FieldKind::Numeric {
                range: None,
                enforced: false,
            },
        }
    }

    /// Numeric field with a documented range that is not enforced
    pub fn advisory(name: &str, min: f64, max: f64) -> Self {
        Self {
            name: name.to_string(),
            kind: FieldKind::Numeric {
                range: Some(ValueRange { min, max }),
                enforced: false,
            },
        }
    }

    /// Numeric field whose range is rejected on
    pub fn bounded(name: &str, min: f64, max: f64) -> Self {
        Self {
            name: name.to_string(),
            kind: FieldKind::Numeric {
                range: Some(ValueRange { min, max }),
                enforced: true,
            },
        }
    }

    pub fn categorical(name: &str, classes: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            kind: FieldKind::Categorical {
                encoder: LabelEncoder::new(classes),
            },
        }
    }

    fn coerce(&self, raw: &Value) -> Result<f64, ValidationError> {
        match &self.kind {
            FieldKind::Numeric { range, enforced } => {
                let value = coerce_number(&self.name, raw)?;
                if let Some(range) = range {
                    if !range.contains(value) {
                        if *enforced {
                            return Err(ValidationError::OutOfRange {
                                field: self.name.clone(),
                                min: range.min,
                                max: range.max,
                                value,
                            });
                        }
                        debug!(
                            field = %self.name,
                            value,
                            min = range.min,
                            max = range.max,
                            "value outside documented range"
                        );
                    }
                }
                Ok(value)
            }
            FieldKind::Categorical { encoder } => {
                let value = match raw {
                    Value::String(s) => s.trim().to_string(),
                    other => other.to_string(),
                };
                encoder
                    .transform(&value)
                    .map(|idx| idx as f64)
                    .ok_or_else(|| ValidationError::UnknownCategory {
                        field: self.name.clone(),
                        value,
                        allowed: encoder.classes.clone(),
                    })
            }
        }
    }
}

fn coerce_number(field: &str, raw: &Value) -> Result<f64, ValidationError> {
    let parsed = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    let value = parsed.ok_or_else(|| ValidationError::NotNumeric {
        field: field.to_string(),
        raw: match raw {
            Value::String(s) => format!("'{s}'"),
            other => other.to_string(),
        },
    })?;

    if !value.is_finite() {
        return Err(ValidationError::NonFinite {
            field: field.to_string(),
        });
    }

    Ok(value)
}

/// Fixed, model-specific field order
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSchema {
    fields: Vec<FieldSpec>,
}

impl FeatureSchema {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// Accepted values of a categorical field
    pub fn categories(&self, name: &str) -> Option<&[String]> {
        self.fields.iter().find(|f| f.name == name).and_then(|f| match &f.kind {
            FieldKind::Categorical { encoder } => Some(encoder.classes.as_slice()),
            FieldKind::Numeric { .. } => None,
        })
    }

    /// Validate a payload and produce the feature vector in schema order.
    ///
    /// Pure: the payload is not modified and unknown extra fields are ignored.
    pub fn validate(&self, payload: &RawPayload) -> Result<FeatureVector, ValidationError> {
        let mut values = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            let raw = match payload.get(&field.name) {
                None | Some(Value::Null) => {
                    return Err(ValidationError::MissingField {
                        field: field.name.clone(),
                    })
                }
                Some(raw) => raw,
            };
            values.push(field.coerce(raw)?);
        }
        Ok(FeatureVector(values))
    }
}
