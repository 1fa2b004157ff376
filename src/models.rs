use crate::features::RawInput;
use crate::params::SchemaVariant;
use crate::scorer::{Score, Segment};
use serde::Serialize;
use serde_json::Value;

// ============ Shared Helpers ============

/// Segment label for records outside the model's domain.
pub const NOT_APPLICABLE_SEGMENT: &str = "Not Applicable";

/// Error text attached to "Not Applicable" records.
pub const NOT_APPLICABLE_ERROR: &str = "V3 model requires marketing_headcount > 0";

/// Rounds to `decimals` places, exact ties going to the even digit.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round_ties_even() / factor
}

/// Whole numbers become JSON integers, everything else stays a float.
pub fn json_number(value: f64) -> Value {
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0;
    if value.fract() == 0.0 && value.abs() < MAX_EXACT {
        Value::from(value as i64)
    } else {
        Value::from(value)
    }
}

// ============ Request Identity ============

/// Pass-through identifying fields, echoed unchanged.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Identity {
    pub company_name: String,
    pub domain: String,
}

impl Identity {
    /// Extracts `company_name` and `domain`, falling back to `fallback_name` and `""`.
    pub fn from_raw(raw: &RawInput, fallback_name: impl Into<String>) -> Self {
        let text = |key: &str| match raw.get(key) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
        };

        Self {
            company_name: text("company_name").unwrap_or_else(|| fallback_name.into()),
            domain: text("domain").unwrap_or_default(),
        }
    }
}

// ============ Response Models ============

/// Normalized inputs echoed back for auditability.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InputsEcho {
    pub marketing_headcount: Value,
    pub people_count: Value,
    pub company_revenue: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    pub is_b2b: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_volume: Option<Value>,
}

/// Which model produced a score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelInfo {
    pub version: String,
    pub variant: SchemaVariant,
    pub features: usize,
}

/// A successfully scored company.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredRecord {
    #[serde(flatten)]
    pub identity: Identity,
    pub close_score: f64,
    pub close_score_percent: String,
    pub predicted_acv: f64,
    pub expected_value: f64,
    pub segment: Segment,
    pub marketing_to_headcount_ratio: f64,
    pub marketing_ratio_percent: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inputs: Option<InputsEcho>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_info: Option<ModelInfo>,
    /// Unrounded model output, kept for batch statistics.
    #[serde(skip)]
    pub score: Score,
}

impl ScoredRecord {
    pub fn new(identity: Identity, score: Score, ratio: f64) -> Self {
        Self {
            identity,
            close_score: round_to(score.close_score, 4),
            close_score_percent: format!("{:.1}%", score.close_score * 100.0),
            predicted_acv: round_to(score.predicted_acv, 2),
            expected_value: round_to(score.expected_value, 2),
            segment: score.segment,
            marketing_to_headcount_ratio: round_to(ratio, 4),
            marketing_ratio_percent: format!("{:.2}%", ratio * 100.0),
            inputs: None,
            model_info: None,
            score,
        }
    }

    /// Drops the per-request audit blocks, as batch results do.
    pub fn without_details(mut self) -> Self {
        self.inputs = None;
        self.model_info = None;
        self
    }
}

/// A company the model declines to score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotApplicableRecord {
    #[serde(flatten)]
    pub identity: Identity,
    pub error: String,
    pub message: String,
    pub close_score: Option<f64>,
    pub predicted_acv: Option<f64>,
    pub expected_value: Option<f64>,
    pub segment: &'static str,
}

impl NotApplicableRecord {
    pub fn new(identity: Identity) -> Self {
        Self {
            identity,
            error: NOT_APPLICABLE_ERROR.to_string(),
            message: "This model is designed for companies with marketing teams".to_string(),
            close_score: None,
            predicted_acv: None,
            expected_value: None,
            segment: NOT_APPLICABLE_SEGMENT,
        }
    }
}

/// A batch entry that could not be processed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedRecord {
    #[serde(flatten)]
    pub identity: Identity,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

/// Result of the record processor for one company.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RecordOutcome {
    Scored(ScoredRecord),
    NotApplicable(NotApplicableRecord),
}

/// One entry of a batch response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BatchItem {
    Scored(ScoredRecord),
    NotApplicable(NotApplicableRecord),
    Failed(FailedRecord),
}

impl BatchItem {
    pub fn is_success(&self) -> bool {
        matches!(self, BatchItem::Scored(_))
    }
}

/// Aggregates over the successfully scored subset of a batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryStats {
    pub avg_close_score: f64,
    pub avg_expected_value: f64,
    pub ideal_targets: usize,
    pub good_targets: usize,
    pub medium_targets: usize,
    pub low_priority: usize,
}

/// Response of `POST /batch`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchResponse {
    pub total: usize,
    pub successful: usize,
    pub not_applicable: usize,
    pub failed: usize,
    pub results: Vec<BatchItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary_stats: Option<SummaryStats>,
}
