//! Health report for orchestration and load balancers

use crate::server::ModelState;
use krushi_ai_core::labels::LabelSource;
use krushi_ai_core::{Classifier, RecommenderKind, VERSION};
use serde::Serialize;
use std::collections::BTreeMap;

/// Overall status; `ok` maps to HTTP 200, `unavailable` to 503
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
    Unavailable,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CheckResult {
    pub status: CheckStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CheckResult {
    fn pass() -> Self {
        Self {
            status: CheckStatus::Pass,
            message: None,
        }
    }

    fn warn(message: String) -> Self {
        Self {
            status: CheckStatus::Warn,
            message: Some(message),
        }
    }

    fn fail(message: String) -> Self {
        Self {
            status: CheckStatus::Fail,
            message: Some(message),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub service: RecommenderKind,
    pub version: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_source: Option<LabelSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classes: Option<usize>,
    pub uptime_seconds: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub checks: BTreeMap<String, CheckResult>,
}

/// Build the health report for the current model state
pub fn health_report(kind: RecommenderKind, model: &ModelState, uptime_seconds: u64) -> HealthResponse {
    let mut checks = BTreeMap::new();

    let (fingerprint, label_source, classes, error) = match model {
        ModelState::Ready(pipeline) => {
            checks.insert("model".to_string(), CheckResult::pass());

            let report = pipeline.alignment();
            let labels = if report.is_clean() {
                CheckResult::pass()
            } else {
                let mut problems = Vec::new();
                if let Some((labels, classes)) = report.fallback_size_mismatch {
                    problems.push(format!("{labels} fallback labels for {classes} classes"));
                }
                if !report.unresolved.is_empty() {
                    problems.push(format!("{} classes without a label", report.unresolved.len()));
                }
                CheckResult::warn(problems.join("; "))
            };
            checks.insert("labels".to_string(), labels);

            (
                pipeline.fingerprint().map(|f| f.short().to_string()),
                report.source,
                Some(pipeline.classifier().classes().len()),
                None,
            )
        }
        ModelState::Unavailable { reason } => {
            checks.insert("model".to_string(), CheckResult::fail(reason.clone()));
            (None, None, None, Some(reason.clone()))
        }
    };

    HealthResponse {
        status: determine_health_status(&checks),
        service: kind,
        version: VERSION,
        fingerprint,
        label_source,
        classes,
        uptime_seconds,
        error,
        checks,
    }
}

/// Any failing check makes the service unavailable; warnings do not
pub fn determine_health_status(checks: &BTreeMap<String, CheckResult>) -> HealthStatus {
    if checks.values().any(|c| c.status == CheckStatus::Fail) {
        HealthStatus::Unavailable
    } else {
        HealthStatus::Ok
    }
}
