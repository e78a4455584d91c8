//! Response formatter: shapes pipeline results into the wire format
//!
//! Crop and fertilizer predictions serialize as
//! `{"prediction", "info", "top_3": [{"label", "probability", "info"}]}`;
//! the ranked list key follows the configured length (`top_5` for disease).

use crate::errors::PipelineError;
use crate::imaging::ImageStats;
use crate::labels::InfoDetails;
use crate::pipeline::{PredictionResult, RankedLabel};
use crate::prediction::{ConfidenceLevel, UNCERTAIN_ENTROPY};
use crate::recommenders::RecommenderKind;
use serde::Serialize;
use std::collections::BTreeMap;

/// Message returned for model failures; details only go to the log
pub const INFERENCE_FAILURE_MESSAGE: &str = "Prediction failed. Please try again later.";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedEntry {
    pub label: String,
    pub probability: f64,
    pub info: String,
    /// Raw class key, when it differs from the display label
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percentage: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendationResponse {
    pub prediction: String,
    pub info: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<InfoDetails>,
    /// `top_{k}`; empty when the model exposes no probabilities
    #[serde(flatten)]
    pub ranked: BTreeMap<String, Vec<RankedEntry>>,
    /// Top probability in percent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiseaseResponse {
    /// Display name, e.g. `Tomato - Late Blight`
    pub prediction: String,
    /// Raw class key, e.g. `Tomato___Late_blight`
    pub class: String,
    pub info: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<InfoDetails>,
    /// Probability of the predicted class, 0-1
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence_level: Option<ConfidenceLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entropy: Option<f64>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub uncertain: bool,
    #[serde(flatten)]
    pub ranked: BTreeMap<String, Vec<RankedEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PredictionResponse {
    Recommendation(RecommendationResponse),
    Disease(DiseaseResponse),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorPayload {
    pub error: String,
}

/// Build the success payload for a recommender
pub fn format_prediction(
    kind: RecommenderKind,
    top_k: usize,
    result: &PredictionResult,
) -> PredictionResponse {
    let with_percentage = kind == RecommenderKind::Disease;
    let ranked: BTreeMap<String, Vec<RankedEntry>> = result
        .ranked
        .as_ref()
        .filter(|r| !r.is_empty())
        .map(|entries| {
            let key = format!("top_{top_k}");
            let list = entries
                .iter()
                .map(|e| ranked_entry(e, with_percentage))
                .collect();
            BTreeMap::from([(key, list)])
        })
        .unwrap_or_default();

    match kind {
        RecommenderKind::Crop | RecommenderKind::Fertilizer => {
            PredictionResponse::Recommendation(RecommendationResponse {
                prediction: result.top.label.clone(),
                info: result.top.info.clone(),
                details: result.top.details.clone(),
                ranked,
                confidence: if kind == RecommenderKind::Fertilizer {
                    result.confidence.map(|p| p * 100.0)
                } else {
                    None
                },
                warning: result.warning(),
            })
        }
        RecommenderKind::Disease => PredictionResponse::Disease(DiseaseResponse {
            prediction: result.top.label.clone(),
            class: result.top.key.clone(),
            info: result.top.info.clone(),
            details: result.top.details.clone(),
            confidence: result.confidence,
            confidence_level: result.confidence.map(ConfidenceLevel::from_probability),
            entropy: result.entropy,
            uncertain: result.entropy.is_some_and(|h| h > UNCERTAIN_ENTROPY),
            ranked,
            image: result.image.clone(),
            warning: result.warning(),
        }),
    }
}

fn ranked_entry(entry: &RankedLabel, with_percentage: bool) -> RankedEntry {
    let resolved = &entry.resolved;
    RankedEntry {
        label: resolved.label.clone(),
        probability: entry.probability,
        info: resolved.info.clone(),
        class: (resolved.key != resolved.label).then(|| resolved.key.clone()),
        percentage: with_percentage.then(|| entry.probability * 100.0),
    }
}

/// Error payload for a failed request. Model failures get a generic message.
pub fn format_error(err: &PipelineError) -> ErrorPayload {
    let error = match err {
        PipelineError::Inference(_) => INFERENCE_FAILURE_MESSAGE.to_string(),
        PipelineError::Validation(e) => e.to_string(),
        PipelineError::UnknownClass(e) => e.to_string(),
        PipelineError::ModelNotLoaded(_) => "Model not loaded".to_string(),
    };
    ErrorPayload { error }
}
