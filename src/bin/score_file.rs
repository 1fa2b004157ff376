//! Offline batch scoring of a JSON file of companies.
//!
//! Usage: `score_file <INPUT.json> [MODEL_DIR]`. The input is either an array of
//! company records or an object with a `companies` array. The batch response is
//! written to stdout as pretty-printed JSON.

use anyhow::Context;
use serde_json::{json, Value};
use territory_scoring_api::batch::{parse_batch_request, score_batch};
use territory_scoring_api::config::Config;
use territory_scoring_api::context::ScoringContext;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "territory_scoring_api=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut args = std::env::args().skip(1);
    let input = args
        .next()
        .context("usage: score_file <INPUT.json> [MODEL_DIR]")?;
    let config = match args.next() {
        Some(dir) => Config::with_model_dir(dir),
        None => Config::from_env()?,
    };

    let ctx = ScoringContext::from_config(&config)?;

    let raw = std::fs::read(&input).with_context(|| format!("failed to read {}", input))?;
    let payload: Value =
        serde_json::from_slice(&raw).with_context(|| format!("{} is not valid JSON", input))?;
    let payload = match payload {
        Value::Array(companies) => json!({ "companies": companies }),
        other => other,
    };

    let companies = parse_batch_request(&payload, usize::MAX)?;
    let response = score_batch(&ctx, companies);

    println!("{}", serde_json::to_string_pretty(&response)?);
    eprintln!(
        "Scored {} of {} companies ({} not applicable, {} failed)",
        response.successful, response.total, response.not_applicable, response.failed
    );
    Ok(())
}
