//! Record processor: applicability gate, feature building, scoring and response shaping
//! for a single company. Shared by `/predict` and the batch aggregator.
use crate::context::ScoringContext;
use crate::errors::AppError;
use crate::features::{build_features, coerce_number, RawInput};
use crate::models::{
    json_number, Identity, InputsEcho, ModelInfo, NotApplicableRecord, RecordOutcome,
    ScoredRecord,
};
use crate::scorer::score;

/// Outcome of the marketing-team gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applicability {
    Applicable,
    NotApplicable,
}

/// The model only covers companies with a marketing function.
///
/// A missing `marketing_headcount` key is a malformed request. A present value that is
/// null, zero or negative means the company is out of scope, which is not an error.
pub fn check_applicability(raw: &RawInput) -> Result<Applicability, AppError> {
    let value = raw.get("marketing_headcount").ok_or_else(|| {
        AppError::RequestMalformed("marketing_headcount is required".to_string())
    })?;

    match coerce_number("marketing_headcount", Some(value))? {
        Some(headcount) if headcount > 0.0 => Ok(Applicability::Applicable),
        _ => Ok(Applicability::NotApplicable),
    }
}

/// Scores one company.
///
/// # Arguments
///
/// * `ctx` - Loaded parameters and models.
/// * `raw` - The record as received.
/// * `identity` - Echoed identifying fields.
///
/// # Returns
///
/// * `Result<RecordOutcome, AppError>` - A scored or "Not Applicable" record, or the
///   validation/internal error for this record only.
pub fn process_record(
    ctx: &ScoringContext,
    raw: &RawInput,
    identity: Identity,
) -> Result<RecordOutcome, AppError> {
    if check_applicability(raw)? == Applicability::NotApplicable {
        tracing::debug!(
            "{} has no marketing team, returning Not Applicable",
            identity.company_name
        );
        return Ok(RecordOutcome::NotApplicable(NotApplicableRecord::new(
            identity,
        )));
    }

    let built = build_features(raw, ctx.schema())?;
    ctx.verify_vector(&built.vector)?;
    let result = score(ctx.classifier(), ctx.regressor(), &built.vector)?;

    tracing::debug!(
        "Scored {}: close_score={:.4}, predicted_acv={:.2}, segment={}",
        identity.company_name,
        result.close_score,
        result.predicted_acv,
        result.segment.label()
    );

    let inputs = &built.inputs;
    let mut record = ScoredRecord::new(identity, result, inputs.marketing_to_headcount_ratio);
    record.inputs = Some(InputsEcho {
        marketing_headcount: json_number(inputs.marketing_headcount),
        people_count: json_number(inputs.people_count),
        company_revenue: json_number(inputs.company_revenue),
        industry: inputs.industry.clone(),
        is_b2b: inputs.is_b2b,
        prompt_volume: inputs.prompt_volume.map(json_number),
    });
    record.model_info = Some(ModelInfo {
        version: ctx.params().model_version.clone(),
        variant: ctx.schema().variant,
        features: ctx.schema().feature_count(),
    });

    Ok(RecordOutcome::Scored(record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn raw(value: Value) -> RawInput {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_gate_missing_key_is_malformed() {
        let err = check_applicability(&raw(json!({ "people_count": 10 }))).unwrap_err();
        assert!(matches!(err, AppError::RequestMalformed(_)));
    }

    #[test]
    fn test_gate_nonpositive_is_not_applicable() {
        for headcount in [json!(0), json!(-3), json!(null), json!("0")] {
            let gate = check_applicability(&raw(json!({ "marketing_headcount": headcount })));
            assert_eq!(gate.unwrap(), Applicability::NotApplicable);
        }
    }

    #[test]
    fn test_gate_positive_is_applicable() {
        let gate = check_applicability(&raw(json!({ "marketing_headcount": 0.5 })));
        assert_eq!(gate.unwrap(), Applicability::Applicable);
    }

    #[test]
    fn test_gate_garbage_is_invalid_input() {
        let err = check_applicability(&raw(json!({ "marketing_headcount": "many" }))).unwrap_err();
        assert_eq!(err.field(), Some("marketing_headcount"));
    }
}
