use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    pub params_path: PathBuf,
    pub classifier_path: PathBuf,
    pub regressor_path: PathBuf,
    pub model_name: String,
    /// Expected SHA-256 of the preprocessing parameters artifact (hex).
    pub params_sha256: Option<String>,
    /// Check every feature vector against the models' declared columns.
    pub strict_schema: bool,
    pub max_batch_size: usize,
    pub request_body_limit_bytes: usize,
    pub rate_limit_per_second: u64,
    pub rate_limit_burst: u32,
}

pub const DEFAULT_PARAMS_FILE: &str = "preprocessing_params.json";
pub const DEFAULT_CLASSIFIER_FILE: &str = "model_a.json";
pub const DEFAULT_REGRESSOR_FILE: &str = "model_b.json";

fn env_or<T: FromStr>(name: &str, default: T) -> anyhow::Result<T> {
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("{} has an invalid value: {}", name, raw)),
        _ => Ok(default),
    }
}

fn env_flag(name: &str, default: bool) -> anyhow::Result<bool> {
    match std::env::var(name) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "" => Ok(default),
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => anyhow::bail!("{} must be a boolean, got {}", name, raw),
        },
        Err(_) => Ok(default),
    }
}

impl Config {
    /// Configuration pointing at the three artifacts inside `model_dir`, all other
    /// settings at their defaults.
    pub fn with_model_dir(model_dir: impl AsRef<Path>) -> Self {
        let dir = model_dir.as_ref();
        Self {
            port: 5000,
            params_path: dir.join(DEFAULT_PARAMS_FILE),
            classifier_path: dir.join(DEFAULT_CLASSIFIER_FILE),
            regressor_path: dir.join(DEFAULT_REGRESSOR_FILE),
            model_name: "V3 Territory Design".to_string(),
            params_sha256: None,
            strict_schema: cfg!(debug_assertions),
            max_batch_size: 1000,
            request_body_limit_bytes: 5 * 1024 * 1024,
            rate_limit_per_second: 10,
            rate_limit_burst: 20,
        }
    }

    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let model_dir = PathBuf::from(env_or("MODEL_DIR", "artifacts".to_string())?);
        let defaults = Self::with_model_dir(&model_dir);

        let config = Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            params_path: std::env::var("PARAMS_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.params_path),
            classifier_path: std::env::var("CLASSIFIER_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.classifier_path),
            regressor_path: std::env::var("REGRESSOR_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.regressor_path),
            model_name: std::env::var("MODEL_NAME")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.model_name),
            params_sha256: std::env::var("PARAMS_SHA256")
                .ok()
                .map(|s| s.trim().to_ascii_lowercase())
                .filter(|s| !s.is_empty())
                .map(|sum| {
                    if sum.len() != 64 || !sum.chars().all(|c| c.is_ascii_hexdigit()) {
                        anyhow::bail!("PARAMS_SHA256 must be a 64 character hex digest");
                    }
                    Ok(sum)
                })
                .transpose()?,
            strict_schema: env_flag("STRICT_SCHEMA", defaults.strict_schema)?,
            max_batch_size: env_or("MAX_BATCH_SIZE", defaults.max_batch_size)?,
            request_body_limit_bytes: env_or(
                "REQUEST_BODY_LIMIT_BYTES",
                defaults.request_body_limit_bytes,
            )?,
            rate_limit_per_second: env_or("RATE_LIMIT_PER_SECOND", defaults.rate_limit_per_second)?,
            rate_limit_burst: env_or("RATE_LIMIT_BURST", defaults.rate_limit_burst)?,
        };

        if config.max_batch_size == 0 {
            anyhow::bail!("MAX_BATCH_SIZE must be at least 1");
        }
        if config.rate_limit_per_second == 0 || config.rate_limit_burst == 0 {
            anyhow::bail!("RATE_LIMIT_PER_SECOND and RATE_LIMIT_BURST must be at least 1");
        }

        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Params artifact: {}", config.params_path.display());
        tracing::debug!("Classifier artifact: {}", config.classifier_path.display());
        tracing::debug!("Regressor artifact: {}", config.regressor_path.display());
        tracing::debug!("Strict schema checks: {}", config.strict_schema);
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }
}
