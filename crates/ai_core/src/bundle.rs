//! Model loader: reads a recommender's artifact directory into a [`Pipeline`]
//!
//! Runs once at startup. Mandatory artifacts that are absent or corrupt yield
//! [`ModelNotLoadedError`]; missing optional ones are logged and skipped.

use crate::classifier::Classifier;
use crate::errors::ModelNotLoadedError;
use crate::forest::ForestClassifier;
use crate::imaging::ImagePreprocessor;
use crate::labels::{InfoEntry, InfoTable, LabelEncoder, LabelResolver, LabelSource};
use crate::pipeline::{InputStage, Pipeline};
use crate::recommenders::{
    self, RecommenderKind, CROP_ENCODER_FILE, FEATURE_SCALER_FILE, MODEL_FILE, SOIL_ENCODER_FILE,
};
use crate::scaler::StandardScaler;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Load options beyond the artifact directory
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Overrides the recommender's ranked list length
    pub top_k: Option<usize>,
}

/// Load with default options
pub fn load_pipeline(kind: RecommenderKind, dir: &Path) -> Result<Pipeline, ModelNotLoadedError> {
    load_pipeline_with(kind, dir, &LoadOptions::default())
}

pub fn load_pipeline_with(
    kind: RecommenderKind,
    dir: &Path,
    options: &LoadOptions,
) -> Result<Pipeline, ModelNotLoadedError> {
    let model_path = dir.join(MODEL_FILE);
    info!(service = %kind, path = %model_path.display(), "loading model");

    let model: ForestClassifier = read_json(&model_path)?;
    model.validate().map_err(|e| ModelNotLoadedError::Invalid {
        path: model_path.clone(),
        reason: e.to_string(),
    })?;
    let fingerprint = model.fingerprint().map_err(|e| ModelNotLoadedError::Invalid {
        path: model_path.clone(),
        reason: e.to_string(),
    })?;

    let input = input_stage(kind, dir)?;
    if input.n_features() != model.n_features() {
        return Err(ModelNotLoadedError::Invalid {
            path: model_path,
            reason: format!(
                "model expects {} features, {kind} inputs produce {}",
                model.n_features(),
                input.n_features()
            ),
        });
    }

    let scaler = if kind == RecommenderKind::Fertilizer {
        load_scaler(dir, model.n_features())?
    } else {
        None
    };

    let resolver = label_resolver(kind, dir)?;
    log_alignment(kind, &resolver, &model);

    let mut pipeline = Pipeline::new(kind, input, Arc::new(model), resolver)
        .with_fingerprint(fingerprint.clone());
    if let Some(scaler) = scaler {
        pipeline = pipeline.with_scaler(scaler);
    }
    if let Some(k) = options.top_k {
        pipeline = pipeline.with_top_k(k);
    }

    info!(
        service = %kind,
        fingerprint = %fingerprint.short(),
        classes = pipeline.classifier().classes().len(),
        "model loaded"
    );
    Ok(pipeline)
}

fn input_stage(kind: RecommenderKind, dir: &Path) -> Result<InputStage, ModelNotLoadedError> {
    Ok(match kind {
        RecommenderKind::Crop => InputStage::Tabular(recommenders::crop_schema()),
        RecommenderKind::Fertilizer => {
            let soil: LabelEncoder = read_json(&dir.join(SOIL_ENCODER_FILE))?;
            let crop: LabelEncoder = read_json(&dir.join(CROP_ENCODER_FILE))?;
            for (file, encoder) in [(SOIL_ENCODER_FILE, &soil), (CROP_ENCODER_FILE, &crop)] {
                if encoder.is_empty() {
                    return Err(ModelNotLoadedError::Invalid {
                        path: dir.join(file),
                        reason: "encoder has no classes".to_string(),
                    });
                }
            }
            InputStage::Tabular(recommenders::fertilizer_schema(soil.classes, crop.classes))
        }
        RecommenderKind::Disease => InputStage::Image(ImagePreprocessor::default()),
    })
}

fn load_scaler(
    dir: &Path,
    n_features: usize,
) -> Result<Option<StandardScaler>, ModelNotLoadedError> {
    let path = dir.join(FEATURE_SCALER_FILE);
    let Some(scaler) = read_optional::<StandardScaler>(&path)? else {
        return Ok(None);
    };
    scaler
        .validate(n_features)
        .map_err(|reason| ModelNotLoadedError::Invalid { path, reason })?;
    Ok(Some(scaler))
}

fn label_resolver(kind: RecommenderKind, dir: &Path) -> Result<LabelResolver, ModelNotLoadedError> {
    let encoder: Option<LabelEncoder> = read_optional(&dir.join(kind.output_encoder_file()))?;

    let info_path = dir.join(kind.info_file());
    let info = if kind.info_required() {
        read_info(&info_path)?
    } else {
        match read_optional::<BTreeMap<String, InfoEntry>>(&info_path)? {
            Some(raw) => InfoTable::new(raw),
            None if kind == RecommenderKind::Fertilizer => recommenders::builtin_fertilizer_info(),
            None => InfoTable::default(),
        }
    };

    let mut resolver =
        LabelResolver::new(encoder, info, kind.default_info()).with_style(kind.display_style());
    if let Some(details) = kind.default_details() {
        resolver = resolver.with_default_details(details);
    }
    Ok(resolver)
}

fn read_info(path: &Path) -> Result<InfoTable, ModelNotLoadedError> {
    let raw: BTreeMap<String, InfoEntry> = read_json(path)?;
    Ok(InfoTable::new(raw))
}

fn log_alignment(kind: RecommenderKind, resolver: &LabelResolver, model: &ForestClassifier) {
    let report = resolver.alignment(model.classes());
    match report.source {
        Some(LabelSource::AlphabeticalFallback) => warn!(
            service = %kind,
            "no label encoder found, mapping class ids through the sorted label list"
        ),
        Some(source) => info!(service = %kind, ?source, "label source"),
        None => {}
    }
    if let Some((labels, classes)) = report.fallback_size_mismatch {
        warn!(
            service = %kind,
            labels,
            classes,
            "fallback label list and model classes differ in size"
        );
    }
    if !report.unresolved.is_empty() {
        let ids: Vec<String> = report.unresolved.iter().map(ToString::to_string).collect();
        warn!(service = %kind, unresolved = %ids.join(","), "model classes without a label");
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ModelNotLoadedError> {
    if !path.exists() {
        return Err(ModelNotLoadedError::MissingArtifact {
            path: path.to_path_buf(),
        });
    }
    let text = fs::read_to_string(path).map_err(|source| ModelNotLoadedError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| ModelNotLoadedError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Absent is `Ok(None)` with a warning; present but corrupt is still an error
fn read_optional<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, ModelNotLoadedError> {
    if !path.exists() {
        warn!(path = %path.display(), "optional artifact not found");
        return Ok(None);
    }
    read_json(path).map(Some)
}

/// Artifact paths a recommender reads, for diagnostics
pub fn artifact_paths(kind: RecommenderKind, dir: &Path) -> Vec<PathBuf> {
    let mut files = vec![MODEL_FILE, kind.output_encoder_file(), kind.info_file()];
    if kind == RecommenderKind::Fertilizer {
        files.extend([SOIL_ENCODER_FILE, CROP_ENCODER_FILE, FEATURE_SCALER_FILE]);
    }
    files.into_iter().map(|f| dir.join(f)).collect()
}
