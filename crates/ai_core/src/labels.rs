//! Label resolution: class identifiers to human-readable labels and info text
//!
//! Lookup order for integer identifiers:
//! 1. the trained label encoder's inverse mapping, when present
//! 2. the alphabetical fallback: the identifier indexes a sorted list of known
//!    label names
//!
//! The fallback is an approximation. It is only correct when the model's
//! internal class order matches the sorted name list, which
//! [`LabelResolver::alignment`] reports on at load time.

use crate::classifier::ClassId;
use crate::errors::UnknownClassError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Inverse of the training-time label encoding (`classes[i]` is class `i`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEncoder {
    pub classes: Vec<String>,
}

impl LabelEncoder {
    pub fn new(classes: Vec<String>) -> Self {
        Self { classes }
    }

    pub fn inverse_transform(&self, index: i64) -> Option<&str> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.classes.get(i))
            .map(String::as_str)
    }

    /// Forward encoding: exact match first, then case-insensitive
    pub fn transform(&self, label: &str) -> Option<usize> {
        self.classes
            .iter()
            .position(|c| c == label)
            .or_else(|| self.classes.iter().position(|c| c.eq_ignore_ascii_case(label)))
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

/// Structured info for a label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct InfoDetails {
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scientific_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plant: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub benefits: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub symptoms: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub treatment: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prevention: Vec<String>,
}

/// Info table value: plain text or a structured record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InfoEntry {
    Text(String),
    Detailed(InfoDetails),
}

impl InfoEntry {
    pub fn summary(&self) -> &str {
        match self {
            InfoEntry::Text(text) => text,
            InfoEntry::Detailed(details) => &details.description,
        }
    }

    pub fn details(&self) -> Option<&InfoDetails> {
        match self {
            InfoEntry::Text(_) => None,
            InfoEntry::Detailed(details) => Some(details),
        }
    }
}

/// Info entries keyed by label as written; lookups ignore case
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct InfoTable {
    entries: BTreeMap<String, InfoEntry>,
    #[serde(skip)]
    folded: HashMap<String, String>,
}

impl InfoTable {
    pub fn new<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, InfoEntry)>,
        K: Into<String>,
    {
        let entries: BTreeMap<String, InfoEntry> =
            entries.into_iter().map(|(k, v)| (k.into(), v)).collect();
        let folded = entries
            .keys()
            .map(|key| (key.to_lowercase(), key.clone()))
            .collect();
        Self { entries, folded }
    }

    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        let raw: BTreeMap<String, InfoEntry> = serde_json::from_str(json)?;
        Ok(Self::new(raw))
    }

    pub fn get(&self, label: &str) -> Option<&InfoEntry> {
        self.entries.get(label).or_else(|| {
            self.folded
                .get(&label.to_lowercase())
                .and_then(|key| self.entries.get(key))
        })
    }

    /// Keys in code-point order, case preserved; the alphabetical fallback list
    pub fn sorted_labels(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &InfoEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Where integer class identifiers get their names from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelSource {
    Encoder,
    AlphabeticalFallback,
    /// Model emits string labels directly
    ModelLabels,
}

/// How labels are shown to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayStyle {
    #[default]
    AsIs,
    /// `Tomato___Late_blight` becomes `Tomato - Late Blight`
    PlantCondition,
}

impl DisplayStyle {
    pub fn render(self, label: &str) -> String {
        match self {
            DisplayStyle::AsIs => label.to_string(),
            DisplayStyle::PlantCondition => format_disease_name(label),
        }
    }
}

/// Format a `Plant___Condition` class key for display
pub fn format_disease_name(key: &str) -> String {
    key.split("___")
        .map(|part| {
            part.split(|c: char| c == '_' || c.is_whitespace())
                .filter(|w| !w.is_empty())
                .map(title_case)
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" - ")
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// A class identifier resolved to its label and info
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedLabel {
    /// Raw label (class key)
    pub key: String,
    /// Label rendered for display
    pub label: String,
    pub info: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<InfoDetails>,
}

/// Report on how well the label space covers a model's classes
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AlignmentReport {
    pub source: Option<LabelSource>,
    /// Model classes no label can be found for
    pub unresolved: Vec<ClassId>,
    /// Fallback list length vs. model class count, when they differ
    pub fallback_size_mismatch: Option<(usize, usize)>,
}

impl AlignmentReport {
    pub fn is_clean(&self) -> bool {
        self.unresolved.is_empty() && self.fallback_size_mismatch.is_none()
    }
}

/// Immutable class-id to label mapping, built once at startup
#[derive(Debug, Clone)]
pub struct LabelResolver {
    encoder: Option<LabelEncoder>,
    info: InfoTable,
    fallback: Vec<String>,
    default_info: String,
    default_details: Option<InfoDetails>,
    style: DisplayStyle,
}

impl LabelResolver {
    /// Resolver whose fallback list is the sorted info-table keys
    pub fn new(encoder: Option<LabelEncoder>, info: InfoTable, default_info: &str) -> Self {
        let fallback = info.sorted_labels();
        Self {
            encoder,
            info,
            fallback,
            default_info: default_info.to_string(),
            default_details: None,
            style: DisplayStyle::AsIs,
        }
    }

    /// Structured entry returned for labels missing from the info table
    pub fn with_default_details(mut self, details: InfoDetails) -> Self {
        self.default_details = Some(details);
        self
    }

    pub fn with_style(mut self, style: DisplayStyle) -> Self {
        self.style = style;
        self
    }

    pub fn info_table(&self) -> &InfoTable {
        &self.info
    }

    pub fn encoder(&self) -> Option<&LabelEncoder> {
        self.encoder.as_ref()
    }

    pub fn default_info(&self) -> &str {
        &self.default_info
    }

    pub fn style(&self) -> DisplayStyle {
        self.style
    }

    /// Source used for integer identifiers
    pub fn source(&self) -> LabelSource {
        if self.encoder.is_some() {
            LabelSource::Encoder
        } else {
            LabelSource::AlphabeticalFallback
        }
    }

    /// Map a class identifier to its raw label
    pub fn label_for(&self, class_id: &ClassId) -> Result<String, UnknownClassError> {
        match class_id {
            ClassId::Name(name) => Ok(name.clone()),
            ClassId::Index(idx) => self
                .encoder
                .as_ref()
                .and_then(|enc| enc.inverse_transform(*idx))
                .or_else(|| {
                    usize::try_from(*idx)
                        .ok()
                        .and_then(|i| self.fallback.get(i))
                        .map(String::as_str)
                })
                .map(str::to_string)
                .ok_or_else(|| UnknownClassError {
                    class_id: class_id.to_string(),
                }),
        }
    }

    /// Inverse of `label_for` over the active label space
    pub fn class_for(&self, label: &str) -> Option<ClassId> {
        let space: &[String] = match &self.encoder {
            Some(encoder) => &encoder.classes,
            None => &self.fallback,
        };
        space
            .iter()
            .position(|l| l == label)
            .map(|i| ClassId::Index(i as i64))
    }

    /// Resolve a class identifier to label, info and details
    pub fn resolve(&self, class_id: &ClassId) -> Result<ResolvedLabel, UnknownClassError> {
        let key = self.label_for(class_id)?;
        Ok(self.describe(key))
    }

    /// Attach info to an already known label
    pub fn describe(&self, key: String) -> ResolvedLabel {
        let (info, details) = match self.info.get(&key) {
            Some(entry) => (
                Some(entry.summary().to_string()).filter(|s| !s.is_empty()),
                entry.details().cloned(),
            ),
            None => (None, self.default_details.clone()),
        };
        ResolvedLabel {
            label: self.style.render(&key),
            info: info.unwrap_or_else(|| self.default_info.clone()),
            details,
            key,
        }
    }

    /// Label used when a class cannot be resolved
    pub fn unknown(&self) -> ResolvedLabel {
        ResolvedLabel {
            key: "unknown".to_string(),
            label: "unknown".to_string(),
            info: self.default_info.clone(),
            details: None,
        }
    }

    /// Check every model class against the label space
    pub fn alignment(&self, classes: &[ClassId]) -> AlignmentReport {
        let all_named = classes.iter().all(|c| matches!(c, ClassId::Name(_)));
        let source = if all_named {
            LabelSource::ModelLabels
        } else {
            self.source()
        };

        let unresolved = classes
            .iter()
            .filter(|c| self.label_for(c).is_err())
            .cloned()
            .collect();

        let fallback_size_mismatch = (source == LabelSource::AlphabeticalFallback
            && self.fallback.len() != classes.len())
        .then_some((self.fallback.len(), classes.len()));

        AlignmentReport {
            source: Some(source),
            unresolved,
            fallback_size_mismatch,
        }
    }
}
