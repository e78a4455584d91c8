//! KrushiAI prediction pipeline
//!
//! Turns raw agronomic inputs (soil nutrients, weather, leaf images) into a
//! validated feature vector, runs a pre-trained classifier over it and maps
//! the class it returns to a human-readable label with advisory text.
//!
//! Modules:
//! - `features`: Request validation against per-model field schemas
//! - `forest`: Forest classifier artifact and inference
//! - `classifier`: The classifier capability the pipeline depends on
//! - `prediction`: Prediction adapter, top-K ranking and entropy
//! - `labels`: Label encoder, info tables and the label resolver
//! - `response`: Response formatter
//! - `bundle`: Model loader for a recommender's artifact directory
//! - `recommenders`: Crop, fertilizer and disease settings
//! - `imaging`: Leaf image preprocessing
//! - `pipeline`: The assembled read-only request pipeline

pub mod bundle;
pub mod classifier;
pub mod errors;
pub mod features;
pub mod forest;
pub mod imaging;
pub mod labels;
pub mod pipeline;
pub mod prediction;
pub mod recommenders;
pub mod response;
pub mod scaler;
pub mod serde_canon;

pub use bundle::{load_pipeline, load_pipeline_with, LoadOptions};
pub use classifier::{ClassId, Classifier};
pub use errors::{
    InferenceError, ModelNotLoadedError, PipelineError, UnknownClassError, ValidationError,
};
pub use features::{FeatureSchema, FeatureVector, FieldSpec, RawPayload};
pub use forest::ForestClassifier;
pub use labels::{LabelEncoder, LabelResolver, LabelSource, ResolvedLabel};
pub use pipeline::{Pipeline, PredictionResult};
pub use recommenders::RecommenderKind;
pub use response::{format_error, format_prediction, ErrorPayload, PredictionResponse};
pub use serde_canon::Fingerprint;

/// Crate version string reported by `/health`
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
