use crate::batch::{parse_batch_request, score_batch};
use crate::config::Config;
use crate::context::ScoringContext;
use crate::docs::{serve_openapi_spec, serve_swagger_ui};
use crate::errors::AppError;
use crate::features::{RawInput, FIELD_MAPPING};
use crate::models::{BatchResponse, Identity, RecordOutcome};
use crate::processor::process_record;
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use uuid::Uuid;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Parameters, schema and models. Read-only for the life of the process.
    pub scoring: Arc<ScoringContext>,
    /// Application configuration.
    pub config: Config,
}

impl AppState {
    pub fn new(scoring: ScoringContext, config: Config) -> Arc<Self> {
        Arc::new(Self {
            scoring: Arc::new(scoring),
            config,
        })
    }
}

/// Parses a request body as JSON. An empty body counts as no input.
fn parse_body(body: &Bytes) -> Result<Value, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(AppError::RequestMalformed(
            "No input data provided".to_string(),
        ));
    }
    serde_json::from_slice(body)
        .map_err(|e| AppError::RequestMalformed(format!("Invalid JSON body: {}", e)))
}

/// Health check endpoint.
///
/// Not rate limited, so orchestrators can poll it freely.
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    let schema = state.scoring.schema();
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "model": state.config.model_name,
            "version": state.scoring.params().model_version,
            "features": schema.feature_count(),
            "variant": schema.variant,
            "artifact_checksum": state.scoring.artifact_checksum(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        })),
    )
}

/// GET /
///
/// Describes the service, its endpoints and the inputs `/predict` understands.
pub async fn service_info(State(state): State<Arc<AppState>>) -> Json<Value> {
    let params = state.scoring.params();
    let required: Vec<&str> = if params.required_inputs.is_empty() {
        vec!["marketing_headcount"]
    } else {
        params.required_inputs.iter().map(String::as_str).collect()
    };
    let optional: Vec<&str> = FIELD_MAPPING
        .iter()
        .map(|(external, _)| *external)
        .filter(|name| !required.contains(name))
        .chain(["company_name", "domain"])
        .collect();

    Json(json!({
        "service": "Territory Scoring API",
        "version": env!("CARGO_PKG_VERSION"),
        "model": state.config.model_name,
        "model_version": params.model_version,
        "endpoints": {
            "/": "GET - Service information",
            "/health": "GET - Health check",
            "/predict": "POST - Score a single company",
            "/batch": "POST - Score multiple companies",
            "/docs": "GET - Swagger UI",
        },
        "required_inputs": required,
        "optional_inputs": optional,
        "features_used": state.scoring.schema().feature_count(),
    }))
}

/// POST /predict
///
/// Scores one company.
///
/// # Returns
///
/// * `Result<Json<RecordOutcome>, AppError>` - A scored or "Not Applicable" record.
///   A missing `marketing_headcount` key is a 400; an uncoercible field is a 400 naming
///   the field.
pub async fn predict(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<RecordOutcome>, AppError> {
    let request_id = Uuid::new_v4();

    let raw: RawInput = match parse_body(&body)? {
        Value::Object(map) if !map.is_empty() => map,
        Value::Null | Value::Object(_) => {
            return Err(AppError::RequestMalformed(
                "No input data provided".to_string(),
            ))
        }
        _ => {
            return Err(AppError::RequestMalformed(
                "Request body must be a JSON object".to_string(),
            ))
        }
    };

    let identity = Identity::from_raw(&raw, "Unknown");
    tracing::info!(
        "[{}] POST /predict - company: {}",
        request_id,
        identity.company_name
    );

    let outcome = process_record(&state.scoring, &raw, identity).map_err(|e| {
        tracing::warn!("[{}] Prediction failed: {}", request_id, e);
        e
    })?;

    match &outcome {
        RecordOutcome::Scored(record) => tracing::info!(
            "[{}] Scored {} as {} ({})",
            request_id,
            record.identity.company_name,
            record.segment.label(),
            record.close_score_percent
        ),
        RecordOutcome::NotApplicable(record) => tracing::info!(
            "[{}] {} is not applicable for this model",
            request_id,
            record.identity.company_name
        ),
    }

    Ok(Json(outcome))
}

/// POST /batch
///
/// Scores every entry of `companies` independently and in order.
pub async fn batch(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<BatchResponse>, AppError> {
    let request_id = Uuid::new_v4();
    let payload = parse_body(&body)?;
    let companies = parse_batch_request(&payload, state.config.max_batch_size)?;

    tracing::info!(
        "[{}] POST /batch - {} companies",
        request_id,
        companies.len()
    );

    let response = score_batch(&state.scoring, companies);
    if response.failed > 0 {
        tracing::warn!(
            "[{}] {} of {} batch records failed",
            request_id,
            response.failed,
            response.total
        );
    }

    Ok(Json(response))
}

/// Scoring endpoints. Kept separate so the entry point can wrap only these in the
/// body-size and rate limits.
pub fn scoring_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/predict", post(predict))
        .route("/batch", post(batch))
}

/// Scoring endpoints with request bodies capped at `limit_bytes`.
///
/// axum's own 2 MB extractor limit is disabled so the configured cap is the only one.
pub fn limited_scoring_routes(limit_bytes: usize) -> Router<Arc<AppState>> {
    scoring_routes().layer(
        ServiceBuilder::new()
            .layer(DefaultBodyLimit::disable())
            .layer(RequestBodyLimitLayer::new(limit_bytes)),
    )
}

/// Assembles the full application around already-layered scoring routes.
pub fn app(state: Arc<AppState>, scoring: Router<Arc<AppState>>) -> Router {
    Router::new()
        .route("/", get(service_info))
        .route("/health", get(health))
        .route("/docs", get(serve_swagger_ui))
        .route("/api-docs/openapi.yml", get(serve_openapi_spec))
        .merge(scoring)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
