#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use krushi_ai_core::forest::{ForestClassifier, Node, Tree, SCALE};
use krushi_ai_core::{load_pipeline, ClassId, RecommenderKind};
use krushi_ai_service::{build_router, AppState, ModelState};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tower::ServiceExt;

fn write_json(dir: &Path, name: &str, value: &Value) {
    fs::write(dir.join(name), serde_json::to_string_pretty(value).unwrap()).unwrap();
}

fn write_model(dir: &Path, model: &ForestClassifier) {
    fs::write(dir.join("model.json"), serde_json::to_string(model).unwrap()).unwrap();
}

fn classes(n: i64) -> Vec<ClassId> {
    (0..n).map(ClassId::Index).collect()
}

/// Sorted labels: chickpea, cotton, maize, rice; wet fields lean to rice
pub fn write_crop_bundle(dir: &Path) {
    let tree = Tree::new(vec![
        Node::internal(0, 6, 150 * SCALE, 1, 2),
        Node::leaf(1, vec![6, 2, 1, 1]),
        Node::leaf(2, vec![1, 1, 2, 6]),
    ]);
    write_model(dir, &ForestClassifier::new(7, classes(4), vec![tree]));
    write_json(
        dir,
        "crop_info.json",
        &json!({
            "rice": "Rice thrives in warm, humid conditions with standing water.",
            "maize": "Maize grows well in well-drained fertile soils.",
            "chickpea": "Chickpea prefers cool, dry climates.",
            "cotton": "Cotton needs a long frost-free season."
        }),
    );
}

pub fn crop_payload() -> Value {
    json!({
        "nitrogen": 90,
        "phosphorus": 42,
        "potassium": 43,
        "temperature": 20.8,
        "humidity": 82.0,
        "ph": 6.5,
        "rainfall": 202.9
    })
}

pub fn write_fertilizer_bundle(dir: &Path) {
    let tree = Tree::new(vec![
        Node::internal(0, 5, 30 * SCALE, 1, 2),
        Node::leaf(1, vec![1, 6, 3]),
        Node::leaf(2, vec![1, 1, 8]),
    ]);
    write_model(dir, &ForestClassifier::new(8, classes(3), vec![tree]));
    write_json(
        dir,
        "soil_encoder.json",
        &json!({"classes": ["Black", "Clayey", "Loamy", "Red", "Sandy"]}),
    );
    write_json(
        dir,
        "crop_encoder.json",
        &json!({"classes": ["Cotton", "Maize", "Paddy", "Wheat"]}),
    );
    write_json(
        dir,
        "fertilizer_encoder.json",
        &json!({"classes": ["10-26-26", "DAP", "Urea"]}),
    );
}

/// Bright red images score as late blight, dark ones as healthy apple
pub fn write_disease_bundle(dir: &Path) {
    let tree = Tree::new(vec![
        Node::internal(0, 0, SCALE / 2, 1, 2),
        Node::leaf(1, vec![8, 1, 1]),
        Node::leaf(2, vec![1, 1, 8]),
    ]);
    write_model(dir, &ForestClassifier::new(128 * 128 * 3, classes(3), vec![tree]));
    write_json(
        dir,
        "label_encoder.json",
        &json!({"classes": ["Apple___healthy", "Tomato___Early_blight", "Tomato___Late_blight"]}),
    );
    write_json(
        dir,
        "disease_info.json",
        &json!({
            "Tomato___Late_blight": {
                "plant": "Tomato",
                "severity": "Critical",
                "description": "A devastating disease caused by Phytophthora infestans."
            },
            "Tomato___Early_blight": {
                "plant": "Tomato",
                "severity": "Moderate",
                "description": "Concentric rings on older leaves."
            },
            "Apple___healthy": {
                "plant": "Apple",
                "severity": "None",
                "description": "The leaf shows no signs of disease."
            }
        }),
    );
}

pub fn png(color: [u8; 3]) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(32, 32, image::Rgb(color));
    let mut buf = std::io::Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
    buf.into_inner()
}

/// Router over a freshly loaded bundle; the tempdir must outlive the router
pub fn ready_app(kind: RecommenderKind, dir: &Path) -> Router {
    match kind {
        RecommenderKind::Crop => write_crop_bundle(dir),
        RecommenderKind::Fertilizer => write_fertilizer_bundle(dir),
        RecommenderKind::Disease => write_disease_bundle(dir),
    }
    let pipeline = load_pipeline(kind, dir).unwrap();
    app(AppState::new(kind, ModelState::Ready(Arc::new(pipeline))))
}

pub fn app(state: AppState) -> Router {
    build_router(Arc::new(state))
}

pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, body.to_vec())
}

pub async fn send_json(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, body) = send(app, request).await;
    (status, serde_json::from_slice(&body).unwrap())
}

pub fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}
