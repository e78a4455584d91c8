//! HTTP surface for one recommender service
//!
//! [`build_router`] wires prediction, health, listing and metrics routes onto a
//! shared [`AppState`]. The model may be absent; routes that need it answer 503
//! while health and static routes keep serving.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use axum::body::{Body, Bytes};
use axum::extract::{DefaultBodyLimit, Query, State};
use axum::http::{header, HeaderMap, HeaderValue, Method, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use krushi_ai_core::labels::InfoDetails;
use krushi_ai_core::recommenders::{CROP_TYPE_FIELD, SOIL_TYPE_FIELD};
use krushi_ai_core::response::INFERENCE_FAILURE_MESSAGE;
use krushi_ai_core::{
    format_prediction, Pipeline, PipelineError, PredictionResponse, RawPayload, RecommenderKind,
    ValidationError,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::signal;
use tokio::sync::Notify;
use tower::ServiceExt;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use crate::config::AllowedOrigins;
use crate::errors::ApiError;
use crate::health::{health_report, HealthStatus};
use crate::metrics::{render_prometheus, MetricsCollector, Outcome};

/// Upper bound on request bodies; leaf photos are the largest inputs
pub const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Whether the recommender is ready to serve
#[derive(Debug, Clone)]
pub enum ModelState {
    Ready(Arc<Pipeline>),
    /// Artifacts failed to load; prediction routes answer 503
    Unavailable { reason: String },
}

pub struct AppState {
    pub kind: RecommenderKind,
    pub model: ModelState,
    pub metrics: MetricsCollector,
    pub debug: bool,
    pub static_dir: Option<PathBuf>,
    pub allowed_origins: AllowedOrigins,
    pub shutdown: Arc<Notify>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(kind: RecommenderKind, model: ModelState) -> Self {
        Self {
            kind,
            model,
            metrics: MetricsCollector::new(),
            debug: false,
            static_dir: None,
            allowed_origins: AllowedOrigins::Any,
            shutdown: Arc::new(Notify::new()),
        }
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_static_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.static_dir = dir;
        self
    }

    pub fn with_allowed_origins(mut self, origins: AllowedOrigins) -> Self {
        self.allowed_origins = origins;
        self
    }

    fn pipeline(&self) -> Result<Arc<Pipeline>, ApiError> {
        match &self.model {
            ModelState::Ready(pipeline) => Ok(pipeline.clone()),
            ModelState::Unavailable { .. } => {
                Err(ApiError::service_unavailable("Model not loaded"))
            }
        }
    }
}

pub async fn serve(state: SharedState, addr: &str) -> Result<()> {
    let app = build_router(state.clone());
    let listener = bind_listener(addr).await?;
    info!(service = %state.kind, %addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state.shutdown.clone()))
        .await
        .context("HTTP server terminated unexpectedly")
}

async fn bind_listener(addr: &str) -> Result<tokio::net::TcpListener> {
    if let Ok(socket_addr) = addr.parse::<SocketAddr>() {
        tokio::net::TcpListener::bind(socket_addr)
            .await
            .with_context(|| format!("failed to bind listener on {socket_addr}"))
    } else {
        tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind listener on {addr}"))
    }
}

async fn shutdown_signal(requested: Arc<Notify>) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!("Unable to listen for shutdown signal: {}", err);
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        _ = ctrl_c => info!("Received shutdown signal"),
        _ = requested.notified() => info!("Shutdown requested over HTTP"),
    }
}

pub fn build_router(state: SharedState) -> Router {
    let mut router = Router::new()
        .route("/health", get(handle_health))
        .route("/predict", post(handle_predict))
        .route("/api/predict", post(handle_predict))
        .route("/api/classes", get(handle_classes))
        .route("/api/diseases", get(handle_diseases))
        .route("/metrics", get(handle_metrics))
        .route("/shutdown", post(handle_shutdown));

    match &state.static_dir {
        Some(static_root) if Path::new(static_root).exists() => {
            info!("Serving frontend assets from {:?}", static_root);
            router = router.fallback(serve_static_assets);
        }
        Some(static_root) => {
            warn!("Frontend assets directory {:?} does not exist", static_root);
            router = router.fallback(handle_not_found);
        }
        None => router = router.fallback(handle_not_found),
    }

    router
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors_layer(&state.allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &AllowedOrigins) -> CorsLayer {
    match origins {
        AllowedOrigins::Any => CorsLayer::permissive(),
        AllowedOrigins::List(list) => {
            let values: Vec<HeaderValue> = list
                .iter()
                .filter_map(|origin| match HeaderValue::from_str(origin) {
                    Ok(value) => Some(value),
                    Err(_) => {
                        warn!("Ignoring invalid CORS origin {:?}", origin);
                        None
                    }
                })
                .collect();
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(values))
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers(Any)
        }
    }
}

async fn handle_health(State(state): State<SharedState>) -> Response {
    state.metrics.record_request();
    let report = health_report(state.kind, &state.model, state.metrics.uptime_seconds());
    let status = match report.status {
        HealthStatus::Ok => StatusCode::OK,
        HealthStatus::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status, Json(report)).into_response()
}

/// Request body after content negotiation
#[derive(Debug)]
enum PredictInput {
    Fields(RawPayload),
    Image(Vec<u8>),
}

async fn handle_predict(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<PredictionResponse>, ApiError> {
    state.metrics.record_request();
    let started = Instant::now();
    let elapsed_us = || started.elapsed().as_micros() as u64;

    let pipeline = match state.pipeline() {
        Ok(pipeline) => pipeline,
        Err(err) => {
            state.metrics.record_prediction(Outcome::Unavailable, elapsed_us());
            return Err(err);
        }
    };

    let input = match parse_input(&headers, &body, pipeline.accepts_images()) {
        Ok(input) => input,
        Err(err) => {
            debug!(error = %err, "rejected request body");
            state
                .metrics
                .record_prediction(Outcome::ValidationError, elapsed_us());
            return Err(err.into());
        }
    };

    let worker = pipeline.clone();
    let joined = tokio::task::spawn_blocking(move || match input {
        PredictInput::Fields(payload) => worker.predict_fields(&payload),
        PredictInput::Image(bytes) => worker.predict_image(&bytes),
    })
    .await;

    let outcome = match joined {
        Ok(outcome) => outcome,
        Err(err) => {
            error!(error = %err, "prediction task panicked");
            state
                .metrics
                .record_prediction(Outcome::InferenceError, elapsed_us());
            return Err(ApiError::internal(INFERENCE_FAILURE_MESSAGE));
        }
    };

    match outcome {
        Ok(result) => {
            state.metrics.record_prediction(Outcome::Success, elapsed_us());
            if !result.warnings.is_empty() {
                state.metrics.record_unknown_class();
            }
            Ok(Json(format_prediction(
                pipeline.kind(),
                pipeline.top_k(),
                &result,
            )))
        }
        Err(err) => {
            let outcome = match &err {
                PipelineError::Validation(_) => Outcome::ValidationError,
                PipelineError::ModelNotLoaded(_) => Outcome::Unavailable,
                PipelineError::Inference(_) | PipelineError::UnknownClass(_) => {
                    Outcome::InferenceError
                }
            };
            state.metrics.record_prediction(outcome, elapsed_us());
            Err(err.into())
        }
    }
}

fn parse_input(
    headers: &HeaderMap,
    body: &[u8],
    accepts_images: bool,
) -> Result<PredictInput, ValidationError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(|value| value.trim().to_ascii_lowercase())
        .unwrap_or_default();

    if content_type.starts_with("image/") || content_type == "application/octet-stream" {
        return if accepts_images {
            Ok(PredictInput::Image(body.to_vec()))
        } else {
            Err(ValidationError::InvalidBody)
        };
    }

    let payload: RawPayload = if content_type == "application/x-www-form-urlencoded" {
        url::form_urlencoded::parse(body)
            .map(|(key, value)| (key.into_owned(), Value::String(value.into_owned())))
            .collect()
    } else {
        match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(map)) => map,
            _ => return Err(ValidationError::InvalidBody),
        }
    };

    if !accepts_images {
        return Ok(PredictInput::Fields(payload));
    }

    let encoded = match payload.get("image") {
        Some(Value::String(encoded)) => encoded,
        Some(_) => return Err(ValidationError::InvalidImage("image must be a base64 string".into())),
        None => {
            return Err(ValidationError::MissingField {
                field: "image".to_string(),
            })
        }
    };
    // Accept data URLs from browser uploads
    let data = match encoded.split_once(";base64,") {
        Some((_, data)) => data,
        None => encoded.as_str(),
    };
    let bytes = STANDARD
        .decode(data.trim())
        .map_err(|err| ValidationError::InvalidImage(format!("invalid base64: {err}")))?;
    Ok(PredictInput::Image(bytes))
}

#[derive(Debug, Serialize)]
struct ClassesResponse {
    soil_types: Vec<String>,
    crop_types: Vec<String>,
}

async fn handle_classes(State(state): State<SharedState>) -> Result<Json<ClassesResponse>, ApiError> {
    state.metrics.record_request();
    if state.kind != RecommenderKind::Fertilizer {
        return Err(ApiError::not_found("Not Found"));
    }
    let pipeline = state.pipeline()?;
    let schema = pipeline
        .schema()
        .ok_or_else(|| ApiError::internal("fertilizer service has no input schema"))?;
    let categories = |field: &str| {
        schema
            .categories(field)
            .map(<[String]>::to_vec)
            .unwrap_or_default()
    };
    Ok(Json(ClassesResponse {
        soil_types: categories(SOIL_TYPE_FIELD),
        crop_types: categories(CROP_TYPE_FIELD),
    }))
}

#[derive(Debug, Deserialize, Default)]
struct DiseaseFilter {
    #[serde(default)]
    plant: Option<String>,
    #[serde(default)]
    severity: Option<String>,
}

#[derive(Debug, Serialize)]
struct DiseaseEntry {
    key: String,
    name: String,
    info: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<InfoDetails>,
}

#[derive(Debug, Serialize)]
struct DiseasesResponse {
    count: usize,
    diseases: Vec<DiseaseEntry>,
}

async fn handle_diseases(
    State(state): State<SharedState>,
    Query(filter): Query<DiseaseFilter>,
) -> Result<Json<DiseasesResponse>, ApiError> {
    state.metrics.record_request();
    if state.kind != RecommenderKind::Disease {
        return Err(ApiError::not_found("Not Found"));
    }
    let pipeline = state.pipeline()?;
    let style = pipeline.resolver().style();

    let field_matches = |wanted: &Option<String>, actual: Option<&str>| match wanted {
        Some(wanted) => actual.is_some_and(|a| a.eq_ignore_ascii_case(wanted.trim())),
        None => true,
    };

    let diseases: Vec<DiseaseEntry> = pipeline
        .catalog()
        .into_iter()
        .filter(|(_, _, details)| {
            let details = details.as_ref();
            field_matches(&filter.plant, details.and_then(|d| d.plant.as_deref()))
                && field_matches(&filter.severity, details.and_then(|d| d.severity.as_deref()))
        })
        .map(|(key, info, details)| DiseaseEntry {
            name: style.render(&key),
            key,
            info,
            details,
        })
        .collect();

    Ok(Json(DiseasesResponse {
        count: diseases.len(),
        diseases,
    }))
}

async fn handle_metrics(State(state): State<SharedState>) -> Response {
    state.metrics.record_request();
    let loaded = matches!(state.model, ModelState::Ready(_));
    let body = render_prometheus(state.kind, &state.metrics.snapshot(), loaded);

    let mut response = Response::new(Body::from(body));
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; version=0.0.4"),
    );
    response
}

async fn handle_shutdown(State(state): State<SharedState>) -> Result<&'static str, ApiError> {
    if !state.debug {
        return Err(ApiError::not_found("Not Found"));
    }
    info!("Shutdown requested");
    state.shutdown.notify_one();
    Ok("Server shutting down...")
}

async fn handle_not_found() -> ApiError {
    ApiError::not_found("Not Found")
}

async fn serve_static_assets(State(state): State<SharedState>, req: Request<Body>) -> Response {
    let Some(static_root) = state.static_dir.clone() else {
        return ApiError::not_found("Not Found").into_response();
    };

    let index_path = static_root.join("index.html");
    let service = ServeDir::new(static_root)
        .append_index_html_on_directories(true)
        .fallback(ServeFile::new(index_path));

    match service.oneshot(req).await {
        Ok(response) => response.into_response(),
        Err(err) => {
            warn!("Static asset error: {}", err);
            ApiError::internal(format!("failed to serve static asset: {err}")).into_response()
        }
    }
}
