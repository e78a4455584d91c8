//! Request counters and their Prometheus text rendering

use krushi_ai_core::RecommenderKind;
use serde::Serialize;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Outcome class of a prediction request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    ValidationError,
    InferenceError,
    Unavailable,
}

/// Lock-free counters shared by all handlers
#[derive(Debug)]
pub struct MetricsCollector {
    total_requests: AtomicU64,
    predictions_ok: AtomicU64,
    validation_errors: AtomicU64,
    inference_errors: AtomicU64,
    unavailable: AtomicU64,
    unknown_classes: AtomicU64,
    prediction_duration_us: AtomicU64,
    start_time: Instant,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub predictions_ok: u64,
    pub validation_errors: u64,
    pub inference_errors: u64,
    pub unavailable: u64,
    pub unknown_classes: u64,
    pub prediction_duration_us: u64,
    pub uptime_seconds: u64,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            total_requests: AtomicU64::new(0),
            predictions_ok: AtomicU64::new(0),
            validation_errors: AtomicU64::new(0),
            inference_errors: AtomicU64::new(0),
            unavailable: AtomicU64::new(0),
            unknown_classes: AtomicU64::new(0),
            prediction_duration_us: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Count any HTTP request
    pub fn record_request(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_prediction(&self, outcome: Outcome, duration_us: u64) {
        let counter = match outcome {
            Outcome::Success => &self.predictions_ok,
            Outcome::ValidationError => &self.validation_errors,
            Outcome::InferenceError => &self.inference_errors,
            Outcome::Unavailable => &self.unavailable,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.prediction_duration_us
            .fetch_add(duration_us, Ordering::Relaxed);
    }

    pub fn record_unknown_class(&self) {
        self.unknown_classes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            predictions_ok: self.predictions_ok.load(Ordering::Relaxed),
            validation_errors: self.validation_errors.load(Ordering::Relaxed),
            inference_errors: self.inference_errors.load(Ordering::Relaxed),
            unavailable: self.unavailable.load(Ordering::Relaxed),
            unknown_classes: self.unknown_classes.load(Ordering::Relaxed),
            prediction_duration_us: self.prediction_duration_us.load(Ordering::Relaxed),
            uptime_seconds: self.uptime_seconds(),
        }
    }
}

/// Render counters in the Prometheus text exposition format
pub fn render_prometheus(
    kind: RecommenderKind,
    snapshot: &MetricsSnapshot,
    model_loaded: bool,
) -> String {
    let mut output = String::new();
    let service = kind.as_str();

    let _ = writeln!(
        output,
        "# HELP krushi_uptime_seconds Uptime of the service in seconds"
    );
    let _ = writeln!(output, "# TYPE krushi_uptime_seconds gauge");
    let _ = writeln!(
        output,
        "krushi_uptime_seconds{{service=\"{service}\"}} {}",
        snapshot.uptime_seconds
    );

    let _ = writeln!(
        output,
        "# HELP krushi_model_loaded Whether the model artifacts loaded (1) or not (0)"
    );
    let _ = writeln!(output, "# TYPE krushi_model_loaded gauge");
    let _ = writeln!(
        output,
        "krushi_model_loaded{{service=\"{service}\"}} {}",
        u8::from(model_loaded)
    );

    let _ = writeln!(
        output,
        "# HELP krushi_http_requests_total Total HTTP requests handled"
    );
    let _ = writeln!(output, "# TYPE krushi_http_requests_total counter");
    let _ = writeln!(
        output,
        "krushi_http_requests_total{{service=\"{service}\"}} {}",
        snapshot.total_requests
    );

    let _ = writeln!(
        output,
        "# HELP krushi_predictions_total Prediction requests by outcome"
    );
    let _ = writeln!(output, "# TYPE krushi_predictions_total counter");
    for (outcome, value) in [
        ("success", snapshot.predictions_ok),
        ("validation_error", snapshot.validation_errors),
        ("inference_error", snapshot.inference_errors),
        ("unavailable", snapshot.unavailable),
    ] {
        let _ = writeln!(
            output,
            "krushi_predictions_total{{service=\"{service}\",outcome=\"{outcome}\"}} {value}"
        );
    }

    let _ = writeln!(
        output,
        "# HELP krushi_unknown_class_total Predictions whose class had no label"
    );
    let _ = writeln!(output, "# TYPE krushi_unknown_class_total counter");
    let _ = writeln!(
        output,
        "krushi_unknown_class_total{{service=\"{service}\"}} {}",
        snapshot.unknown_classes
    );

    let _ = writeln!(
        output,
        "# HELP krushi_prediction_duration_microseconds_total Time spent serving predictions"
    );
    let _ = writeln!(
        output,
        "# TYPE krushi_prediction_duration_microseconds_total counter"
    );
    let _ = writeln!(
        output,
        "krushi_prediction_duration_microseconds_total{{service=\"{service}\"}} {}",
        snapshot.prediction_duration_us
    );

    output
}
