#![allow(dead_code)]

use krushi_ai_core::forest::{ForestClassifier, Node, Tree, SCALE};
use krushi_ai_core::ClassId;
use serde_json::{json, Value};
use std::fs;
use std::path::Path;

pub fn write_json(dir: &Path, name: &str, value: &Value) {
    fs::write(dir.join(name), serde_json::to_string_pretty(value).unwrap()).unwrap();
}

pub fn write_model(dir: &Path, model: &ForestClassifier) {
    fs::write(dir.join("model.json"), serde_json::to_string(model).unwrap()).unwrap();
}

fn index_classes(n: i64) -> Vec<ClassId> {
    (0..n).map(ClassId::Index).collect()
}

/// Sorted labels: chickpea, cotton, maize, rice
pub fn crop_model() -> ForestClassifier {
    let by_rainfall = Tree::new(vec![
        Node::internal(0, 6, 150 * SCALE, 1, 2),
        Node::leaf(1, vec![6, 2, 1, 1]),
        Node::leaf(2, vec![1, 1, 2, 6]),
    ]);
    let by_humidity = Tree::new(vec![
        Node::internal(0, 4, 60 * SCALE, 1, 2),
        Node::leaf(1, vec![2, 5, 2, 1]),
        Node::leaf(2, vec![1, 1, 2, 6]),
    ]);
    ForestClassifier::new(7, index_classes(4), vec![by_rainfall, by_humidity])
}

pub fn crop_info() -> Value {
    json!({
        "rice": "Rice thrives in warm, humid conditions with standing water.",
        "maize": "Maize grows well in well-drained fertile soils.",
        "chickpea": "Chickpea prefers cool, dry climates.",
        "cotton": "Cotton needs a long frost-free season."
    })
}

pub fn write_crop_bundle(dir: &Path) {
    write_model(dir, &crop_model());
    write_json(dir, "crop_info.json", &crop_info());
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

/// Classes: 10-26-26, DAP, Urea; splits on nitrogen
pub fn fertilizer_model() -> ForestClassifier {
    let tree = Tree::new(vec![
        Node::internal(0, 5, 30 * SCALE, 1, 2),
        Node::leaf(1, vec![1, 6, 3]),
        Node::leaf(2, vec![1, 1, 8]),
    ]);
    ForestClassifier::new(8, index_classes(3), vec![tree])
}

/// Seven index classes, one per bundled fertilizer; high nitrogen favors Urea
pub fn fertilizer_fallback_model() -> ForestClassifier {
    let tree = Tree::new(vec![
        Node::internal(0, 5, 30 * SCALE, 1, 2),
        Node::leaf(1, vec![1, 1, 1, 1, 1, 5, 1]),
        Node::leaf(2, vec![1, 1, 1, 1, 1, 1, 7]),
    ]);
    ForestClassifier::new(8, index_classes(7), vec![tree])
}

pub fn write_fertilizer_bundle(dir: &Path) {
    write_model(dir, &fertilizer_model());
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

pub fn fertilizer_payload() -> Value {
    json!({
        "temperature": 26,
        "humidity": 52,
        "moisture": 38,
        "soil_type": "Sandy",
        "crop_type": "Maize",
        "nitrogen": 37,
        "potassium": 0,
        "phosphorous": 0
    })
}

/// Splits on the red channel of the first pixel
pub fn disease_model() -> ForestClassifier {
    let tree = Tree::new(vec![
        Node::internal(0, 0, SCALE / 2, 1, 2),
        Node::leaf(1, vec![8, 1, 1]),
        Node::leaf(2, vec![1, 1, 8]),
    ]);
    ForestClassifier::new(128 * 128 * 3, index_classes(3), vec![tree])
}

pub fn write_disease_bundle(dir: &Path) {
    write_model(dir, &disease_model());
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
                "name": "Late Blight",
                "plant": "Tomato",
                "severity": "Critical",
                "description": "A devastating disease caused by Phytophthora infestans.",
                "symptoms": ["Dark water-soaked lesions"],
                "treatment": ["Apply copper-based fungicides"],
                "prevention": ["Avoid overhead watering"]
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
    let img = image::RgbImage::from_pixel(64, 48, image::Rgb(color));
    let mut buf = std::io::Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
    buf.into_inner()
}
