//! Feature builder: one raw company record in, one fixed-order feature vector out.
//!
//! The steps run in a fixed order (rename, impute, ratio, log transforms, industry
//! one-hot, schema completion, projection) and mirror the transformation the models
//! were trained on. The models are position-sensitive, so the projection onto
//! `feature_cols` is the real output contract.
use crate::errors::AppError;
use crate::params::{columns, FeatureSchema};
use serde_json::Value;
use std::collections::HashMap;

/// Untyped record as supplied by the caller.
pub type RawInput = serde_json::Map<String, Value>;

/// External request field -> canonical training column.
pub const FIELD_MAPPING: [(&str, &str); 6] = [
    ("people_count", columns::PEOPLE_COUNT),
    ("marketing_headcount", columns::MARKETING_HEADCOUNT),
    ("company_revenue", columns::COMPANY_REVENUE),
    ("industry", columns::INDUSTRY),
    ("is_b2b", columns::IS_B2B),
    ("prompt_volume", columns::PROMPT_VOLUME),
];

/// Ordered numeric model input. Every entry is finite.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    values: Vec<f64>,
}

impl FeatureVector {
    /// Wraps already-ordered values, rejecting NaN and infinities.
    pub fn new(values: Vec<f64>) -> Result<Self, AppError> {
        if let Some(pos) = values.iter().position(|v| !v.is_finite()) {
            return Err(AppError::InternalComputation(format!(
                "feature at position {} is not finite",
                pos
            )));
        }
        Ok(Self { values })
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Inputs after imputation and coercion, echoed back to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedInputs {
    pub marketing_headcount: f64,
    pub people_count: f64,
    pub company_revenue: f64,
    pub prompt_volume: Option<f64>,
    pub is_b2b: u8,
    /// Grouped industry label; `None` when the schema has no industry encoding.
    pub industry: Option<String>,
    pub marketing_to_headcount_ratio: f64,
}

/// Output of [`build_features`].
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltFeatures {
    pub vector: FeatureVector,
    pub inputs: NormalizedInputs,
}

/// Step 1: relabel external fields with their canonical column names.
fn rename_fields(raw: &RawInput) -> HashMap<&'static str, &Value> {
    FIELD_MAPPING
        .iter()
        .filter_map(|(external, canonical)| raw.get(*external).map(|v| (*canonical, v)))
        .collect()
}

fn external_name(canonical: &str) -> &'static str {
    FIELD_MAPPING
        .iter()
        .find(|(_, c)| *c == canonical)
        .map(|(external, _)| *external)
        .unwrap_or("unknown")
}

/// Coerces a JSON value to a number.
///
/// `null`, blank strings and NaN count as missing. Numeric strings are accepted.
pub fn coerce_number(field: &str, value: Option<&Value>) -> Result<Option<f64>, AppError> {
    let number = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| AppError::invalid(field, "number is out of range"))?,
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            trimmed.parse::<f64>().map_err(|_| {
                AppError::invalid(field, format!("expected a number, got \"{}\"", s))
            })?
        }
        Some(other) => {
            return Err(AppError::invalid(
                field,
                format!("expected a number, got {}", json_type(other)),
            ))
        }
    };

    if number.is_nan() {
        return Ok(None);
    }
    if !number.is_finite() {
        return Err(AppError::invalid(field, "must be a finite number"));
    }
    Ok(Some(number))
}

/// Like [`coerce_number`] but rejects negative values.
fn coerce_nonnegative(canonical: &str, value: Option<&Value>) -> Result<Option<f64>, AppError> {
    let field = external_name(canonical);
    match coerce_number(field, value)? {
        Some(n) if n < 0.0 => Err(AppError::invalid(field, "must not be negative")),
        other => Ok(other),
    }
}

/// `is_b2b`: absent or null defaults to 1.
fn coerce_flag(value: Option<&Value>) -> Result<u8, AppError> {
    let field = external_name(columns::IS_B2B);
    if let Some(Value::Bool(b)) = value {
        return Ok(u8::from(*b));
    }
    match coerce_number(field, value)? {
        None => Ok(1),
        Some(n) if n == 0.0 => Ok(0),
        Some(n) if n == 1.0 => Ok(1),
        Some(_) => Err(AppError::invalid(field, "must be 0 or 1")),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Step 5 grouping: exact match against the trained vocabulary, else `Other`.
fn group_industry(schema: &FeatureSchema, value: Option<&Value>) -> Result<String, AppError> {
    match value {
        None | Some(Value::Null) => Ok(columns::OTHER_INDUSTRY.to_string()),
        Some(Value::String(s)) if schema.top_industries.contains(s) => Ok(s.clone()),
        Some(Value::String(_)) => Ok(columns::OTHER_INDUSTRY.to_string()),
        Some(other) => Err(AppError::invalid(
            external_name(columns::INDUSTRY),
            format!("expected a string, got {}", json_type(other)),
        )),
    }
}

/// Builds the model input for one record.
///
/// # Arguments
///
/// * `raw` - The record as received.
/// * `schema` - Feature schema derived from the preprocessing parameters.
///
/// # Returns
///
/// * `Result<BuiltFeatures, AppError>` - The ordered vector plus the normalized inputs,
///   or `InvalidInput` naming the field that could not be coerced.
pub fn build_features(raw: &RawInput, schema: &FeatureSchema) -> Result<BuiltFeatures, AppError> {
    let fields = rename_fields(raw);
    let mut frame: HashMap<&str, f64> = HashMap::new();

    // Required by the gate; the record processor normally checks this first
    let marketing_headcount = coerce_nonnegative(
        columns::MARKETING_HEADCOUNT,
        fields.get(columns::MARKETING_HEADCOUNT).copied(),
    )?
    .ok_or_else(|| AppError::RequestMalformed("marketing_headcount is required".to_string()))?;

    // Imputation
    let people_count = match coerce_nonnegative(
        columns::PEOPLE_COUNT,
        fields.get(columns::PEOPLE_COUNT).copied(),
    )? {
        Some(n) if n > 0.0 || !schema.impute_nonpositive_people_count => n,
        _ => schema.medians.people_count,
    };
    let company_revenue = coerce_nonnegative(
        columns::COMPANY_REVENUE,
        fields.get(columns::COMPANY_REVENUE).copied(),
    )?
    .unwrap_or(schema.medians.company_revenue);
    let prompt_volume = match schema.medians.prompt_volume {
        Some(median) if schema.prompt_volume => Some(
            coerce_nonnegative(
                columns::PROMPT_VOLUME,
                fields.get(columns::PROMPT_VOLUME).copied(),
            )?
            .unwrap_or(median),
        ),
        _ => None,
    };
    let is_b2b = coerce_flag(fields.get(columns::IS_B2B).copied())?;

    frame.insert(columns::MARKETING_HEADCOUNT, marketing_headcount);
    frame.insert(columns::PEOPLE_COUNT, people_count);
    frame.insert(columns::COMPANY_REVENUE, company_revenue);
    frame.insert(columns::IS_B2B, f64::from(is_b2b));

    // A zero head-count base must not poison the vector
    let mut ratio = marketing_headcount / people_count;
    if !ratio.is_finite() {
        ratio = 0.0;
    }
    frame.insert(columns::RATIO, ratio);

    frame.insert(columns::LOG_REVENUE, company_revenue.ln_1p());
    frame.insert(columns::LOG_PEOPLE, people_count.ln_1p());
    if let Some(pv) = prompt_volume {
        frame.insert(columns::PROMPT_VOLUME, pv);
        frame.insert(columns::LOG_PROMPT_VOLUME, pv.ln_1p());
    }

    let industry = if schema.industry_one_hot {
        let grouped = group_industry(schema, fields.get(columns::INDUSTRY).copied())?;
        for (col, label) in &schema.industry_columns {
            let hot = if *label == grouped { 1.0 } else { 0.0 };
            frame.insert(col.as_str(), hot);
        }
        Some(grouped)
    } else {
        None
    };

    // Schema completion and projection in training order
    let values: Vec<f64> = schema
        .columns
        .iter()
        .map(|col| frame.get(col.as_str()).copied().unwrap_or(0.0))
        .collect();

    let vector = FeatureVector::new(values)?;

    tracing::debug!(
        "Built {} features (ratio={:.4}, industry={:?})",
        vector.len(),
        ratio,
        industry
    );

    Ok(BuiltFeatures {
        vector,
        inputs: NormalizedInputs {
            marketing_headcount,
            people_count,
            company_revenue,
            prompt_volume,
            is_b2b,
            industry,
            marketing_to_headcount_ratio: ratio,
        },
    })
}
