use std::time::{Duration, Instant};

use clap::Parser;
use reqwest::Client;
use serde::{Deserialize, Serialize};

#[derive(Parser, Debug)]
#[command(
    name = "krushi-check-services",
    about = "Check that KrushiAI recommender services are up and have their models loaded"
)]
struct Cli {
    /// Base URLs of the services (e.g. http://127.0.0.1:5000)
    #[arg(
        long = "url",
        value_name = "URL",
        num_args = 1..,
        value_delimiter = ',',
        default_values = ["http://127.0.0.1:5000", "http://127.0.0.1:5001", "http://127.0.0.1:5002"]
    )]
    urls: Vec<String>,

    /// Path to the health endpoint
    #[arg(long, value_name = "PATH", default_value = "/health")]
    health_path: String,

    /// Timeout (in seconds) for each HTTP request
    #[arg(long, default_value_t = 5)]
    timeout_seconds: u64,

    /// Keep polling unhealthy services for up to this many seconds
    #[arg(long, default_value_t = 0)]
    wait_seconds: u64,

    /// Delay between polls while waiting
    #[arg(long, default_value_t = 500)]
    interval_ms: u64,

    /// Emit JSON instead of a human readable table
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Deserialize, Clone, Default)]
struct HealthPayload {
    status: Option<String>,
    service: Option<String>,
    version: Option<String>,
    fingerprint: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Serialize, Default)]
struct ServiceReport {
    url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    service: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fingerprint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    health_status: Option<String>,
    healthy: bool,
    attempts: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let Cli {
        urls,
        health_path,
        timeout_seconds,
        wait_seconds,
        interval_ms,
        json,
    } = Cli::parse();

    let client = Client::builder()
        .timeout(Duration::from_secs(timeout_seconds))
        .build()?;

    let deadline = Instant::now() + Duration::from_secs(wait_seconds);
    let mut reports = Vec::with_capacity(urls.len());

    for base in &urls {
        let url = join_url(base, &health_path);
        let mut attempts = 0;
        let report = loop {
            attempts += 1;
            let mut report = check_service(&client, base, &url).await;
            report.attempts = attempts;
            if report.healthy || Instant::now() >= deadline {
                break report;
            }
            tokio::time::sleep(Duration::from_millis(interval_ms)).await;
        };
        reports.push(report);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        print_table(&reports);
    }

    if reports.iter().all(|r| r.healthy) {
        Ok(())
    } else {
        std::process::exit(1);
    }
}

async fn check_service(client: &Client, base: &str, url: &str) -> ServiceReport {
    let mut report = ServiceReport {
        url: base.to_string(),
        ..Default::default()
    };

    let (code, payload, error) = fetch_json::<HealthPayload>(client, url).await;
    report.status_code = code;
    if let Some(err) = error {
        report.errors.push(err);
    }
    if let Some(payload) = payload {
        if let Some(err) = &payload.error {
            report.errors.push(format!("model: {err}"));
        }
        report.health_status = payload.status;
        report.service = payload.service;
        report.version = payload.version;
        report.fingerprint = payload.fingerprint;
    }

    report.healthy = is_healthy(report.status_code, report.health_status.as_deref());
    report
}

fn is_healthy(code: Option<u16>, status: Option<&str>) -> bool {
    code == Some(200) && status.is_some_and(|s| s.eq_ignore_ascii_case("ok"))
}

/// The health endpoint answers 503 with a JSON body, so the body is parsed for any status
async fn fetch_json<T>(client: &Client, url: &str) -> (Option<u16>, Option<T>, Option<String>)
where
    T: for<'de> Deserialize<'de>,
{
    match client.get(url).send().await {
        Ok(response) => {
            let code = response.status().as_u16();
            match response.bytes().await {
                Ok(bytes) => match serde_json::from_slice::<T>(&bytes) {
                    Ok(payload) => (Some(code), Some(payload), None),
                    Err(err) => {
                        let snippet = String::from_utf8_lossy(&bytes);
                        (
                            Some(code),
                            None,
                            Some(format!(
                                "HTTP {code}: failed to parse JSON ({err}): {}",
                                truncate(&snippet)
                            )),
                        )
                    }
                },
                Err(err) => (Some(code), None, Some(format!("failed to read body: {err}"))),
            }
        }
        Err(err) => (None, None, Some(err.to_string())),
    }
}

fn join_url(base: &str, path: &str) -> String {
    let trimmed = base.trim_end_matches('/');
    if path.is_empty() {
        return trimmed.to_string();
    }
    if path.starts_with('/') {
        format!("{trimmed}{path}")
    } else {
        format!("{trimmed}/{path}")
    }
}

fn truncate(text: &str) -> String {
    const LIMIT: usize = 120;
    match text.char_indices().nth(LIMIT) {
        Some((end, _)) => format!("{}…", &text[..end]),
        None => text.to_string(),
    }
}

fn print_table(reports: &[ServiceReport]) {
    for report in reports {
        println!(
            "{} {} ({})",
            if report.healthy { "✅" } else { "❌" },
            report.service.as_deref().unwrap_or("<unknown service>"),
            report.url
        );
        println!(
            "  Status: {} (code: {:?}, attempts: {})",
            report.health_status.as_deref().unwrap_or("<missing>"),
            report.status_code,
            report.attempts
        );
        if let Some(version) = &report.version {
            println!("  Version: {version}");
        }
        if let Some(fingerprint) = &report.fingerprint {
            println!("  Model: {fingerprint}");
        }
        for err in &report.errors {
            println!("  ! {err}");
        }
        println!();
    }
}
