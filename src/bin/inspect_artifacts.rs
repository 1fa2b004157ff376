//! Utility to load the scoring artifacts and print the schema they describe.
//!
//! Usage: `inspect_artifacts [MODEL_DIR]`. Without an argument the usual environment
//! configuration is used. Exits non-zero when the artifacts fail to load or the models
//! disagree with `feature_cols`.

use serde_json::Value;
use territory_scoring_api::artifacts::load_artifact;
use territory_scoring_api::config::Config;
use territory_scoring_api::context::ScoringContext;

fn main() -> anyhow::Result<()> {
    let config = match std::env::args().nth(1) {
        Some(dir) => Config::with_model_dir(dir),
        None => Config::from_env()?,
    };

    let ctx = ScoringContext::from_config(&config)?;
    let params = ctx.params();
    let schema = ctx.schema();

    println!("Model version: {}", params.model_version);
    println!("Variant:       {}", schema.variant.as_str());
    println!("Features:      {}", schema.feature_count());
    for (idx, col) in schema.columns.iter().enumerate() {
        println!("  {:>2}. {}", idx, col);
    }

    println!("Medians:");
    for (col, median) in params.median_table() {
        println!("  - {}: {}", col, median);
    }

    if !params.top_industries.is_empty() {
        println!("Top industries: {}", params.top_industries.join(", "));
    }

    println!("Checksums (sha256):");
    for path in [
        &config.params_path,
        &config.classifier_path,
        &config.regressor_path,
    ] {
        let artifact = load_artifact::<Value>(path, None)?;
        println!("  - {}: {}", path.display(), artifact.checksum);
    }

    println!("Column alignment: OK");
    Ok(())
}
