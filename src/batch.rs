//! Batch aggregator.
//!
//! Runs the record processor over every entry, keeps input order, and isolates
//! failures: one bad record never aborts its siblings.
use crate::context::ScoringContext;
use crate::errors::AppError;
use crate::models::{
    round_to, BatchItem, BatchResponse, FailedRecord, Identity, RecordOutcome, ScoredRecord,
    SummaryStats,
};
use crate::processor::process_record;
use crate::scorer::Segment;
use serde_json::Value;

/// Pulls the `companies` array out of a batch request body.
pub fn parse_batch_request(body: &Value, max_batch_size: usize) -> Result<&[Value], AppError> {
    let companies = body
        .get("companies")
        .and_then(Value::as_array)
        .ok_or_else(|| AppError::RequestMalformed("companies array is required".to_string()))?;

    if companies.len() > max_batch_size {
        return Err(AppError::RequestMalformed(format!(
            "batch of {} companies exceeds the limit of {}",
            companies.len(),
            max_batch_size
        )));
    }
    Ok(companies)
}

/// Scores one batch entry. Never fails; errors become a [`BatchItem::Failed`].
fn process_entry(ctx: &ScoringContext, idx: usize, entry: &Value) -> BatchItem {
    let fallback_name = format!("Company {}", idx + 1);

    let Some(raw) = entry.as_object() else {
        return BatchItem::Failed(FailedRecord {
            identity: Identity {
                company_name: fallback_name,
                domain: String::new(),
            },
            error: "record must be a JSON object".to_string(),
            field: None,
        });
    };

    let identity = Identity::from_raw(raw, fallback_name);
    match process_record(ctx, raw, identity.clone()) {
        Ok(RecordOutcome::Scored(record)) => BatchItem::Scored(record.without_details()),
        Ok(RecordOutcome::NotApplicable(record)) => BatchItem::NotApplicable(record),
        Err(e) => {
            tracing::warn!(
                "Batch record {} ({}) failed: {}",
                idx + 1,
                identity.company_name,
                e
            );
            BatchItem::Failed(FailedRecord {
                identity,
                error: e.public_message(),
                field: e.field().map(str::to_string),
            })
        }
    }
}

/// Summary over scored records only; `None` when nothing was scored.
pub fn summarize<'a>(scored: impl IntoIterator<Item = &'a ScoredRecord>) -> Option<SummaryStats> {
    let scored: Vec<&ScoredRecord> = scored.into_iter().collect();
    if scored.is_empty() {
        return None;
    }

    let n = scored.len() as f64;
    let count = |segment: Segment| scored.iter().filter(|r| r.segment == segment).count();

    Some(SummaryStats {
        avg_close_score: round_to(
            scored.iter().map(|r| r.score.close_score).sum::<f64>() / n,
            4,
        ),
        avg_expected_value: round_to(
            scored.iter().map(|r| r.score.expected_value).sum::<f64>() / n,
            2,
        ),
        ideal_targets: count(Segment::IdealTarget),
        good_targets: count(Segment::GoodTarget),
        medium_targets: count(Segment::MediumTarget),
        low_priority: count(Segment::LowPriority),
    })
}

/// Scores every company in order and aggregates the results.
///
/// # Arguments
///
/// * `ctx` - Loaded parameters and models.
/// * `companies` - Raw batch entries, in caller order.
///
/// # Returns
///
/// * `BatchResponse` - One result per entry plus counts and optional summary stats.
pub fn score_batch(ctx: &ScoringContext, companies: &[Value]) -> BatchResponse {
    let results: Vec<BatchItem> = companies
        .iter()
        .enumerate()
        .map(|(idx, entry)| process_entry(ctx, idx, entry))
        .collect();

    let successful = results.iter().filter(|r| r.is_success()).count();
    let not_applicable = results
        .iter()
        .filter(|r| matches!(r, BatchItem::NotApplicable(_)))
        .count();
    let failed = results.len() - successful - not_applicable;

    let summary_stats = summarize(results.iter().filter_map(|r| match r {
        BatchItem::Scored(record) => Some(record),
        _ => None,
    }));

    tracing::info!(
        "Batch complete: {} total, {} scored, {} not applicable, {} failed",
        results.len(),
        successful,
        not_applicable,
        failed
    );

    BatchResponse {
        total: companies.len(),
        successful,
        not_applicable,
        failed,
        results,
        summary_stats,
    }
}
