//! Request pipeline: validate, infer, resolve labels
//!
//! A [`Pipeline`] is built once by the bundle loader and shared read-only
//! across request handlers. Every method takes `&self`.

use crate::classifier::{ClassId, Classifier};
use crate::errors::{PipelineError, ValidationError};
use crate::features::{FeatureSchema, FeatureVector, RawPayload};
use crate::imaging::{ImagePreprocessor, ImageStats};
use crate::labels::{AlignmentReport, InfoDetails, LabelResolver, LabelSource, ResolvedLabel};
use crate::prediction::{self, RawPrediction};
use crate::recommenders::RecommenderKind;
use crate::scaler::StandardScaler;
use crate::serde_canon::Fingerprint;
use std::sync::Arc;
use tracing::{debug, warn};

/// How raw requests become feature vectors
#[derive(Debug, Clone)]
pub enum InputStage {
    /// Named fields validated against a schema
    Tabular(FeatureSchema),
    /// Encoded image bytes
    Image(ImagePreprocessor),
}

impl InputStage {
    /// Feature vector length this stage produces
    pub fn n_features(&self) -> usize {
        match self {
            InputStage::Tabular(schema) => schema.len(),
            InputStage::Image(pre) => pre.n_features(),
        }
    }
}

/// One entry of the ranked class list
#[derive(Debug, Clone, PartialEq)]
pub struct RankedLabel {
    pub class_id: ClassId,
    pub resolved: ResolvedLabel,
    pub probability: f64,
}

/// A completed prediction, before response formatting
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionResult {
    pub class_id: ClassId,
    pub top: ResolvedLabel,
    /// Most probable classes, highest first; absent without probabilities
    pub ranked: Option<Vec<RankedLabel>>,
    /// Probability of the predicted class
    pub confidence: Option<f64>,
    /// Shannon entropy of the distribution
    pub entropy: Option<f64>,
    pub image: Option<ImageStats>,
    /// Non-fatal problems, such as classes without a label
    pub warnings: Vec<String>,
}

impl PredictionResult {
    pub fn warning(&self) -> Option<String> {
        (!self.warnings.is_empty()).then(|| self.warnings.join("; "))
    }
}

pub struct Pipeline {
    kind: RecommenderKind,
    input: InputStage,
    scaler: Option<StandardScaler>,
    model: Arc<dyn Classifier>,
    resolver: LabelResolver,
    top_k: usize,
    fingerprint: Option<Fingerprint>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("kind", &self.kind)
            .field("input", &self.input)
            .field("n_classes", &self.model.classes().len())
            .field("top_k", &self.top_k)
            .field("fingerprint", &self.fingerprint)
            .finish()
    }
}

impl Pipeline {
    pub fn new(
        kind: RecommenderKind,
        input: InputStage,
        model: Arc<dyn Classifier>,
        resolver: LabelResolver,
    ) -> Self {
        Self {
            kind,
            input,
            scaler: None,
            model,
            resolver,
            top_k: kind.default_top_k(),
            fingerprint: None,
        }
    }

    pub fn with_scaler(mut self, scaler: StandardScaler) -> Self {
        self.scaler = Some(scaler);
        self
    }

    pub fn with_top_k(mut self, k: usize) -> Self {
        self.top_k = k.max(1);
        self
    }

    pub fn with_fingerprint(mut self, fingerprint: Fingerprint) -> Self {
        self.fingerprint = Some(fingerprint);
        self
    }

    pub fn kind(&self) -> RecommenderKind {
        self.kind
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn fingerprint(&self) -> Option<&Fingerprint> {
        self.fingerprint.as_ref()
    }

    pub fn resolver(&self) -> &LabelResolver {
        &self.resolver
    }

    pub fn classifier(&self) -> &dyn Classifier {
        self.model.as_ref()
    }

    pub fn schema(&self) -> Option<&FeatureSchema> {
        match &self.input {
            InputStage::Tabular(schema) => Some(schema),
            InputStage::Image(_) => None,
        }
    }

    pub fn accepts_images(&self) -> bool {
        matches!(self.input, InputStage::Image(_))
    }

    pub fn alignment(&self) -> AlignmentReport {
        self.resolver.alignment(self.model.classes())
    }

    pub fn label_source(&self) -> LabelSource {
        self.alignment().source.unwrap_or_else(|| self.resolver.source())
    }

    /// Predict from named request fields
    pub fn predict_fields(&self, payload: &RawPayload) -> Result<PredictionResult, PipelineError> {
        let schema = match &self.input {
            InputStage::Tabular(schema) => schema,
            InputStage::Image(_) => return Err(ValidationError::InvalidBody.into()),
        };
        let features = schema.validate(payload)?;
        self.infer(features, None)
    }

    /// Predict from encoded image bytes
    pub fn predict_image(&self, bytes: &[u8]) -> Result<PredictionResult, PipelineError> {
        let pre = match &self.input {
            InputStage::Image(pre) => pre,
            InputStage::Tabular(_) => return Err(ValidationError::InvalidBody.into()),
        };
        let (features, stats) = pre.preprocess(bytes)?;
        self.infer(features, Some(stats))
    }

    fn infer(
        &self,
        mut features: FeatureVector,
        image: Option<ImageStats>,
    ) -> Result<PredictionResult, PipelineError> {
        if let Some(scaler) = &self.scaler {
            scaler.transform(&mut features)?;
        }

        let raw = prediction::run_inference(self.model.as_ref(), &features)?;
        let mut warnings = Vec::new();
        let top = self.resolve_or_unknown(&raw.class_id, &mut warnings);
        let ranked = self.rank(&raw, &mut warnings);
        let probs = raw.probabilities.as_deref();

        debug!(
            service = %self.kind,
            class = %raw.class_id,
            label = %top.key,
            "prediction complete"
        );

        Ok(PredictionResult {
            confidence: raw.confidence(self.model.classes()),
            entropy: probs.map(prediction::entropy),
            class_id: raw.class_id,
            top,
            ranked,
            image,
            warnings,
        })
    }

    fn rank(&self, raw: &RawPrediction, warnings: &mut Vec<String>) -> Option<Vec<RankedLabel>> {
        let probs = raw.probabilities.as_ref()?;
        let classes = self.model.classes();
        let ranked = prediction::top_k(probs, self.top_k)
            .into_iter()
            .filter_map(|(idx, probability)| {
                let class_id = classes.get(idx)?.clone();
                let resolved = self.resolve_or_unknown(&class_id, warnings);
                Some(RankedLabel {
                    class_id,
                    resolved,
                    probability,
                })
            })
            .collect();
        Some(ranked)
    }

    fn resolve_or_unknown(&self, class_id: &ClassId, warnings: &mut Vec<String>) -> ResolvedLabel {
        match self.resolver.resolve(class_id) {
            Ok(resolved) => resolved,
            Err(err) => {
                warn!(service = %self.kind, %err, "class has no label");
                let message = err.to_string();
                if !warnings.contains(&message) {
                    warnings.push(message);
                }
                self.resolver.unknown()
            }
        }
    }

    /// Info entries with structured details, for listing endpoints
    pub fn catalog(&self) -> Vec<(String, String, Option<InfoDetails>)> {
        self.resolver
            .info_table()
            .iter()
            .map(|(key, entry)| (key.clone(), entry.summary().to_string(), entry.details().cloned()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forest::{ForestClassifier, Node, Tree, SCALE};
    use crate::labels::{InfoEntry, InfoTable};
    use crate::recommenders::crop_schema;
    use serde_json::json;

    fn crop_pipeline(classes: Vec<ClassId>) -> Pipeline {
        // Splits on rainfall (feature 6)
        let tree = Tree::new(vec![
            Node::internal(0, 6, 150 * SCALE, 1, 2),
            Node::leaf(1, vec![7, 2, 1]),
            Node::leaf(2, vec![1, 1, 8]),
        ]);
        let model = ForestClassifier::new(7, classes, vec![tree]);
        let info = InfoTable::new([
            ("maize", InfoEntry::Text("Maize info".into())),
            ("chickpea", InfoEntry::Text("Chickpea info".into())),
            ("rice", InfoEntry::Text("Rice info".into())),
        ]);
        Pipeline::new(
            RecommenderKind::Crop,
            InputStage::Tabular(crop_schema()),
            Arc::new(model),
            LabelResolver::new(None, info, RecommenderKind::Crop.default_info()),
        )
    }

    fn payload(rainfall: f64) -> RawPayload {
        json!({
            "nitrogen": 90, "phosphorus": 42, "potassium": 43,
            "temperature": 20.8, "humidity": 82.0, "ph": 6.5, "rainfall": rainfall
        })
        .as_object()
        .cloned()
        .unwrap()
    }

    #[test]
    fn resolves_through_alphabetical_fallback() {
        // sorted fallback: chickpea, maize, rice
        let pipeline = crop_pipeline((0..3).map(ClassId::Index).collect());
        let result = pipeline.predict_fields(&payload(202.9)).unwrap();
        assert_eq!(result.top.label, "rice");
        assert_eq!(result.top.info, "Rice info");
        let ranked = result.ranked.unwrap();
        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].resolved.label, "rice");
        assert!((ranked[0].probability - 0.8).abs() < 1e-9);
        assert!(result.warnings.is_empty());
        assert_eq!(pipeline.label_source(), LabelSource::AlphabeticalFallback);
    }

    #[test]
    fn unknown_class_becomes_warning_not_failure() {
        let pipeline = crop_pipeline(vec![ClassId::Index(0), ClassId::Index(1), ClassId::Index(9)]);
        let result = pipeline.predict_fields(&payload(300.0)).unwrap();
        assert_eq!(result.top.label, "unknown");
        assert_eq!(result.top.info, "No information available for this crop.");
        assert_eq!(result.warning().unwrap(), "Unknown class identifier: 9");
        assert!(!pipeline.alignment().is_clean());
    }

    #[test]
    fn validation_errors_surface_unchanged() {
        let pipeline = crop_pipeline((0..3).map(ClassId::Index).collect());
        let mut p = payload(10.0);
        p.remove("rainfall");
        let err = pipeline.predict_fields(&p).unwrap_err();
        assert_eq!(err.to_string(), "Missing field: rainfall");
    }

    #[test]
    fn image_bytes_are_rejected_by_tabular_pipeline() {
        let pipeline = crop_pipeline((0..3).map(ClassId::Index).collect());
        assert!(matches!(
            pipeline.predict_image(b"png"),
            Err(PipelineError::Validation(ValidationError::InvalidBody))
        ));
    }
}
