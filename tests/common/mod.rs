//! Shared helpers for integration tests: fixture loading and request bodies.
#![allow(dead_code)]

use serde_json::{Map, Value};
use std::path::PathBuf;
use territory_scoring_api::config::Config;
use territory_scoring_api::context::ScoringContext;

/// Directory holding one fixture variant (`full` or `simplified`).
pub fn fixture_dir(variant: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(variant)
}

pub fn fixture_config(variant: &str) -> Config {
    let mut config = Config::with_model_dir(fixture_dir(variant));
    config.strict_schema = true;
    config
}

pub fn load_context(variant: &str) -> ScoringContext {
    ScoringContext::from_config(&fixture_config(variant)).expect("fixture artifacts should load")
}

/// Unwraps a `json!` object literal into a raw record.
pub fn raw(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {}", other),
    }
}
