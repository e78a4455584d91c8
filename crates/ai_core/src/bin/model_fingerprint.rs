use anyhow::{Context, Result};
use krushi_ai_core::ForestClassifier;
use std::env;
use std::path::PathBuf;

fn main() -> Result<()> {
    let model_path = env::args()
        .nth(1)
        .map(PathBuf::from)
        .context("Usage: model_fingerprint <model.json>")?;

    let model = ForestClassifier::load_json(&model_path)
        .with_context(|| format!("Failed to load model from {}", model_path.display()))?;

    let fingerprint = model.fingerprint()?;
    println!("{}", fingerprint.hex());
    Ok(())
}
