//! End-to-end pipeline tests over artifact directories on disk

mod common;

use common::*;
use krushi_ai_core::labels::LabelSource;
use krushi_ai_core::{
    format_prediction, load_pipeline, load_pipeline_with, LoadOptions, ModelNotLoadedError,
    PipelineError, RawPayload, RecommenderKind, ValidationError,
};
use serde_json::{json, Value};
use tempfile::tempdir;

fn object(value: Value) -> RawPayload {
    value.as_object().cloned().unwrap()
}

#[test]
fn crop_scenario_returns_prediction_and_top_three() {
    let dir = tempdir().unwrap();
    write_crop_bundle(dir.path());
    let pipeline = load_pipeline(RecommenderKind::Crop, dir.path()).unwrap();
    assert_eq!(pipeline.label_source(), LabelSource::AlphabeticalFallback);
    assert!(pipeline.alignment().is_clean());

    let result = pipeline.predict_fields(&object(crop_payload())).unwrap();
    let body = serde_json::to_value(format_prediction(
        pipeline.kind(),
        pipeline.top_k(),
        &result,
    ))
    .unwrap();

    assert_eq!(body["prediction"], "rice");
    assert_eq!(
        body["info"],
        "Rice thrives in warm, humid conditions with standing water."
    );
    let top = body["top_3"].as_array().unwrap();
    assert_eq!(top.len(), 3);
    let labels: Vec<&str> = top.iter().map(|e| e["label"].as_str().unwrap()).collect();
    // chickpea and cotton tie at 0.1; lower class index first
    assert_eq!(labels, vec!["rice", "maize", "chickpea"]);
    let probs: Vec<f64> = top.iter().map(|e| e["probability"].as_f64().unwrap()).collect();
    assert!(probs.windows(2).all(|w| w[0] >= w[1]));
}

#[test]
fn numeric_strings_from_forms_are_accepted() {
    let dir = tempdir().unwrap();
    write_crop_bundle(dir.path());
    let pipeline = load_pipeline(RecommenderKind::Crop, dir.path()).unwrap();

    let payload = object(json!({
        "nitrogen": "90", "phosphorus": "42", "potassium": "43",
        "temperature": "20.8", "humidity": "50", "ph": "6.5", "rainfall": " 100 "
    }));
    let result = pipeline.predict_fields(&payload).unwrap();
    assert_eq!(result.top.label, "chickpea");
}

#[test]
fn missing_rainfall_is_named() {
    let dir = tempdir().unwrap();
    write_crop_bundle(dir.path());
    let pipeline = load_pipeline(RecommenderKind::Crop, dir.path()).unwrap();

    let mut payload = object(crop_payload());
    payload.remove("rainfall");
    let err = pipeline.predict_fields(&payload).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Validation(ValidationError::MissingField { ref field }) if field == "rainfall"
    ));
}

#[test]
fn label_encoder_overrides_fallback() {
    let dir = tempdir().unwrap();
    write_crop_bundle(dir.path());
    write_json(
        dir.path(),
        "label_encoder.json",
        &json!({"classes": ["rice", "maize", "cotton", "chickpea"]}),
    );
    let pipeline = load_pipeline(RecommenderKind::Crop, dir.path()).unwrap();
    assert_eq!(pipeline.label_source(), LabelSource::Encoder);

    let result = pipeline.predict_fields(&object(crop_payload())).unwrap();
    assert_eq!(result.top.label, "chickpea");
    assert_eq!(result.top.info, "Chickpea prefers cool, dry climates.");
}

#[test]
fn missing_model_is_model_not_loaded() {
    let dir = tempdir().unwrap();
    write_json(dir.path(), "crop_info.json", &crop_info());
    let err = load_pipeline(RecommenderKind::Crop, dir.path()).unwrap_err();
    assert!(matches!(err, ModelNotLoadedError::MissingArtifact { .. }));
}

#[test]
fn missing_crop_info_is_fatal() {
    let dir = tempdir().unwrap();
    write_model(dir.path(), &crop_model());
    let err = load_pipeline(RecommenderKind::Crop, dir.path()).unwrap_err();
    assert!(err.to_string().contains("crop_info.json"));
}

#[test]
fn feature_count_mismatch_is_rejected_at_load() {
    let dir = tempdir().unwrap();
    write_crop_bundle(dir.path());
    write_model(dir.path(), &fertilizer_model());
    let err = load_pipeline(RecommenderKind::Crop, dir.path()).unwrap_err();
    assert!(matches!(err, ModelNotLoadedError::Invalid { .. }));
}

#[test]
fn fertilizer_uses_builtin_info_and_reports_confidence() {
    let dir = tempdir().unwrap();
    write_fertilizer_bundle(dir.path());
    let pipeline = load_pipeline(RecommenderKind::Fertilizer, dir.path()).unwrap();

    let result = pipeline.predict_fields(&object(fertilizer_payload())).unwrap();
    let body = serde_json::to_value(format_prediction(
        pipeline.kind(),
        pipeline.top_k(),
        &result,
    ))
    .unwrap();
    assert_eq!(body["prediction"], "Urea");
    assert_eq!(body["info"], "High nitrogen content (46% N).");
    assert_eq!(body["details"]["rate"], "100-200 kg/ha");
    assert!((body["confidence"].as_f64().unwrap() - 80.0).abs() < 1e-9);
    assert_eq!(body["top_3"].as_array().unwrap().len(), 3);
}

#[test]
fn fertilizer_rejects_unknown_soil_and_out_of_range_values() {
    let dir = tempdir().unwrap();
    write_fertilizer_bundle(dir.path());
    let pipeline = load_pipeline(RecommenderKind::Fertilizer, dir.path()).unwrap();

    let mut payload = object(fertilizer_payload());
    payload.insert("soil_type".into(), json!("Peat"));
    let err = pipeline.predict_fields(&payload).unwrap_err();
    assert!(err.to_string().starts_with("Unknown soil_type 'Peat'"));

    let mut payload = object(fertilizer_payload());
    payload.insert("moisture".into(), json!(140));
    let err = pipeline.predict_fields(&payload).unwrap_err();
    assert_eq!(err.to_string(), "moisture should be between 0 and 100, got 140");
}

#[test]
fn fertilizer_scaler_is_applied_before_inference() {
    let dir = tempdir().unwrap();
    write_fertilizer_bundle(dir.path());
    let mut mean = vec![0.0; 8];
    mean[5] = 30.0;
    write_json(
        dir.path(),
        "feature_scaler.json",
        &json!({"mean": mean, "scale": vec![1.0; 8]}),
    );
    let pipeline = load_pipeline(RecommenderKind::Fertilizer, dir.path()).unwrap();

    // nitrogen 37 standardizes to 7, below the split
    let result = pipeline.predict_fields(&object(fertilizer_payload())).unwrap();
    assert_eq!(result.top.label, "DAP");
}

#[test]
fn fertilizer_without_output_encoder_keeps_label_case() {
    let dir = tempdir().unwrap();
    write_fertilizer_bundle(dir.path());
    write_model(dir.path(), &fertilizer_fallback_model());
    std::fs::remove_file(dir.path().join("fertilizer_encoder.json")).unwrap();
    let pipeline = load_pipeline(RecommenderKind::Fertilizer, dir.path()).unwrap();
    assert_eq!(pipeline.label_source(), LabelSource::AlphabeticalFallback);
    assert!(pipeline.alignment().is_clean());

    // Fallback order: 10-26-26, 14-35-14, 17-17-17, 20-20, 28-28, DAP, Urea
    let result = pipeline.predict_fields(&object(fertilizer_payload())).unwrap();
    assert_eq!(result.top.label, "Urea");
    assert_eq!(result.top.info, "High nitrogen content (46% N).");
    assert!(result.warnings.is_empty());

    let mut payload = object(fertilizer_payload());
    payload.insert("nitrogen".into(), json!(12));
    let result = pipeline.predict_fields(&payload).unwrap();
    assert_eq!(result.top.label, "DAP");
}

#[test]
fn fertilizer_without_soil_encoder_does_not_load() {
    let dir = tempdir().unwrap();
    write_fertilizer_bundle(dir.path());
    std::fs::remove_file(dir.path().join("soil_encoder.json")).unwrap();
    let err = load_pipeline(RecommenderKind::Fertilizer, dir.path()).unwrap_err();
    assert!(matches!(err, ModelNotLoadedError::MissingArtifact { .. }));
}

#[test]
fn disease_image_is_classified_with_details() {
    let dir = tempdir().unwrap();
    write_disease_bundle(dir.path());
    let pipeline = load_pipeline(RecommenderKind::Disease, dir.path()).unwrap();

    let result = pipeline.predict_image(&png([230, 40, 40])).unwrap();
    let body = serde_json::to_value(format_prediction(
        pipeline.kind(),
        pipeline.top_k(),
        &result,
    ))
    .unwrap();
    assert_eq!(body["prediction"], "Tomato - Late Blight");
    assert_eq!(body["class"], "Tomato___Late_blight");
    assert_eq!(body["details"]["severity"], "Critical");
    assert_eq!(body["confidence_level"], "high");
    assert_eq!(body["image"]["width"], 64);
    assert_eq!(body["top_5"].as_array().unwrap().len(), 3);
    assert!(body.get("uncertain").is_none());

    let result = pipeline.predict_image(&png([10, 200, 10])).unwrap();
    assert_eq!(result.top.label, "Apple - Healthy");
}

#[test]
fn top_k_override_changes_list_length() {
    let dir = tempdir().unwrap();
    write_crop_bundle(dir.path());
    let pipeline =
        load_pipeline_with(RecommenderKind::Crop, dir.path(), &LoadOptions { top_k: Some(2) })
            .unwrap();
    let result = pipeline.predict_fields(&object(crop_payload())).unwrap();
    assert_eq!(result.ranked.unwrap().len(), 2);
}

#[test]
fn fingerprint_is_stable_across_formatting() {
    let a = tempdir().unwrap();
    let b = tempdir().unwrap();
    write_crop_bundle(a.path());
    write_json(b.path(), "crop_info.json", &crop_info());
    std::fs::write(
        b.path().join("model.json"),
        serde_json::to_string_pretty(&crop_model()).unwrap(),
    )
    .unwrap();

    let pa = load_pipeline(RecommenderKind::Crop, a.path()).unwrap();
    let pb = load_pipeline(RecommenderKind::Crop, b.path()).unwrap();
    assert_eq!(pa.fingerprint(), pb.fingerprint());
}
