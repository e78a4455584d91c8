//! The three recommenders and their fixed per-service settings

use crate::features::{FeatureSchema, FieldSpec};
use crate::labels::{DisplayStyle, InfoDetails, InfoEntry, InfoTable};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const MODEL_FILE: &str = "model.json";
pub const LABEL_ENCODER_FILE: &str = "label_encoder.json";
pub const CROP_INFO_FILE: &str = "crop_info.json";
pub const SOIL_ENCODER_FILE: &str = "soil_encoder.json";
pub const CROP_ENCODER_FILE: &str = "crop_encoder.json";
pub const FERTILIZER_ENCODER_FILE: &str = "fertilizer_encoder.json";
pub const FERTILIZER_INFO_FILE: &str = "fertilizer_info.json";
pub const FEATURE_SCALER_FILE: &str = "feature_scaler.json";
pub const DISEASE_INFO_FILE: &str = "disease_info.json";

/// Field names shared with the HTTP layer
pub const SOIL_TYPE_FIELD: &str = "soil_type";
pub const CROP_TYPE_FIELD: &str = "crop_type";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommenderKind {
    Crop,
    Fertilizer,
    Disease,
}

impl RecommenderKind {
    pub const ALL: [RecommenderKind; 3] = [
        RecommenderKind::Crop,
        RecommenderKind::Fertilizer,
        RecommenderKind::Disease,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RecommenderKind::Crop => "crop",
            RecommenderKind::Fertilizer => "fertilizer",
            RecommenderKind::Disease => "disease",
        }
    }

    pub fn default_port(self) -> u16 {
        match self {
            RecommenderKind::Crop => 5000,
            RecommenderKind::Fertilizer => 5001,
            RecommenderKind::Disease => 5002,
        }
    }

    /// Length of the ranked list in responses
    pub fn default_top_k(self) -> usize {
        match self {
            RecommenderKind::Crop | RecommenderKind::Fertilizer => 3,
            RecommenderKind::Disease => 5,
        }
    }

    /// Info text for labels missing from the info table
    pub fn default_info(self) -> &'static str {
        match self {
            RecommenderKind::Crop => "No information available for this crop.",
            RecommenderKind::Fertilizer => "Specialized blend.",
            RecommenderKind::Disease => "No information available for this disease.",
        }
    }

    pub fn default_details(self) -> Option<InfoDetails> {
        match self {
            RecommenderKind::Fertilizer => Some(InfoDetails {
                description: "Specialized blend.".to_string(),
                benefits: vec!["Optimized nutrition".to_string()],
                rate: Some("As per soil test".to_string()),
                ..InfoDetails::default()
            }),
            RecommenderKind::Crop | RecommenderKind::Disease => None,
        }
    }

    pub fn display_style(self) -> DisplayStyle {
        match self {
            RecommenderKind::Disease => DisplayStyle::PlantCondition,
            RecommenderKind::Crop | RecommenderKind::Fertilizer => DisplayStyle::AsIs,
        }
    }

    /// Label encoder for model outputs
    pub fn output_encoder_file(self) -> &'static str {
        match self {
            RecommenderKind::Fertilizer => FERTILIZER_ENCODER_FILE,
            RecommenderKind::Crop | RecommenderKind::Disease => LABEL_ENCODER_FILE,
        }
    }

    pub fn info_file(self) -> &'static str {
        match self {
            RecommenderKind::Crop => CROP_INFO_FILE,
            RecommenderKind::Fertilizer => FERTILIZER_INFO_FILE,
            RecommenderKind::Disease => DISEASE_INFO_FILE,
        }
    }

    /// Whether a missing info table keeps the model from loading
    pub fn info_required(self) -> bool {
        matches!(self, RecommenderKind::Crop)
    }
}

impl fmt::Display for RecommenderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecommenderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "crop" => Ok(RecommenderKind::Crop),
            "fertilizer" | "fertiliser" => Ok(RecommenderKind::Fertilizer),
            "disease" | "plant-disease" => Ok(RecommenderKind::Disease),
            other => Err(format!(
                "unknown service '{other}', expected crop, fertilizer or disease"
            )),
        }
    }
}

/// Crop recommender inputs, in model order
pub fn crop_schema() -> FeatureSchema {
    FeatureSchema::new(vec![
        FieldSpec::advisory("nitrogen", 0.0, 140.0),
        FieldSpec::advisory("phosphorus", 0.0, 145.0),
        FieldSpec::advisory("potassium", 0.0, 205.0),
        FieldSpec::advisory("temperature", 0.0, 51.0),
        FieldSpec::advisory("humidity", 0.0, 100.0),
        FieldSpec::advisory("ph", 0.0, 14.0),
        FieldSpec::advisory("rainfall", 0.0, 500.0),
    ])
}

/// Fertilizer recommender inputs, in model order
pub fn fertilizer_schema(soil_types: Vec<String>, crop_types: Vec<String>) -> FeatureSchema {
    FeatureSchema::new(vec![
        FieldSpec::bounded("temperature", 0.0, 60.0),
        FieldSpec::bounded("humidity", 0.0, 100.0),
        FieldSpec::bounded("moisture", 0.0, 100.0),
        FieldSpec::categorical(SOIL_TYPE_FIELD, soil_types),
        FieldSpec::categorical(CROP_TYPE_FIELD, crop_types),
        FieldSpec::bounded("nitrogen", 0.0, 300.0),
        FieldSpec::bounded("potassium", 0.0, 300.0),
        FieldSpec::bounded("phosphorous", 0.0, 300.0),
    ])
}

/// Bundled info for the common fertilizers
pub fn builtin_fertilizer_info() -> InfoTable {
    let entry = |description: &str, benefits: [&str; 2], rate: &str| {
        InfoEntry::Detailed(InfoDetails {
            description: description.to_string(),
            benefits: benefits.iter().map(|b| b.to_string()).collect(),
            rate: Some(rate.to_string()),
            ..InfoDetails::default()
        })
    };

    InfoTable::new([
        (
            "Urea",
            entry(
                "High nitrogen content (46% N).",
                ["Promotes leafy growth", "Improves protein content"],
                "100-200 kg/ha",
            ),
        ),
        (
            "DAP",
            entry(
                "Di-ammonium Phosphate (18% N, 46% P₂O₅).",
                ["Root development", "Early plant growth"],
                "50-100 kg/ha",
            ),
        ),
        (
            "14-35-14",
            entry(
                "NPK complex (14% N, 35% P₂O₅, 14% K₂O).",
                ["Balanced nutrition", "Root development"],
                "150-250 kg/ha",
            ),
        ),
        (
            "28-28",
            entry(
                "NPK fertilizer (28% N, 28% P₂O₅).",
                ["Balanced N-P nutrition", "Strong root system"],
                "100-150 kg/ha",
            ),
        ),
        (
            "17-17-17",
            entry(
                "Balanced NPK (17% each N, P₂O₅, K₂O).",
                ["Complete balanced nutrition", "All-round growth"],
                "150-200 kg/ha",
            ),
        ),
        (
            "20-20",
            entry(
                "NPK fertilizer (20% N, 20% P₂O₅).",
                ["Good N-P balance", "Vigorous growth"],
                "125-175 kg/ha",
            ),
        ),
        (
            "10-26-26",
            entry(
                "NPK fertilizer (10% N, 26% P₂O₅, 26% K₂O).",
                ["High P-K content", "Disease resistance"],
                "100-200 kg/ha",
            ),
        ),
    ])
}
