//! Canonical JSON and artifact fingerprints
//!
//! Artifacts are fingerprinted over a canonical rendering (object keys sorted
//! recursively, no whitespace) so the same model always hashes the same,
//! regardless of how the file on disk was formatted.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Serialize a value to canonical JSON
pub fn to_canonical_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let value = serde_json::to_value(value)?;
    serde_json::to_string(&canonicalize(value))
}

fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<String, Value> = map
                .into_iter()
                .map(|(k, v)| (k, canonicalize(v)))
                .collect();
            Value::Object(sorted.into_iter().collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

/// Blake3 fingerprint of an artifact's canonical JSON
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        let json = to_canonical_json(value)?;
        Ok(Self(hex::encode(blake3::hash(json.as_bytes()).as_bytes())))
    }

    pub fn hex(&self) -> &str {
        &self.0
    }

    /// First 12 hex characters, enough to tell deployed artifacts apart
    pub fn short(&self) -> &str {
        &self.0[..12]
    }
}
