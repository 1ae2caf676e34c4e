//! Batch Operations
//!
//! The backend exposes no bulk endpoint for updates, so `run_bounded` fans a
//! batch out as independent per-id requests with a fixed number in flight at
//! once. True bulk endpoints (delete, remove-from-class) go through
//! `run_bulk` as exactly one call. Both report per-id success/failure and
//! never abort the batch because one id failed.

mod tests;

use std::collections::HashSet;
use std::future::Future;

use futures_util::stream::{self, StreamExt};
use serde_json::{Map, Value};

use crate::error::{DeptError, Result};
use crate::types::{BatchFailure, BatchReport, Progress};

/// Maximum simultaneously in-flight requests when the caller does not pick.
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Progress observer: called once per settled id, `done` strictly counting
/// up from 1 to the deduplicated total.
pub type ProgressFn = dyn Fn(Progress) + Send + Sync;

/// Drop repeated ids, keeping first-seen order.
pub fn dedupe(ids: &[String]) -> Vec<String> {
    let mut seen = HashSet::with_capacity(ids.len());
    let mut out = Vec::with_capacity(ids.len());
    for id in ids {
        if seen.insert(id.clone()) {
            out.push(id.clone());
        }
    }
    out
}

/// Execute `op` once per id with at most `concurrency` operations in flight.
///
/// Ids are deduplicated first; an empty batch is rejected before any call.
/// A failing id is recorded and the rest of the batch keeps going; the
/// returned report puts every id in exactly one of `success`/`failed`.
/// Completion order between ids is not guaranteed.
pub async fn run_bounded<F, Fut>(
    ids: &[String],
    concurrency: usize,
    on_progress: Option<&ProgressFn>,
    op: F,
) -> Result<BatchReport>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let ids = dedupe(ids);
    if ids.is_empty() {
        return Err(DeptError::validation("no ids to process"));
    }
    let total = ids.len();

    let mut in_flight = stream::iter(ids)
        .map(|id| {
            let fut = op(id.clone());
            async move { (id, fut.await) }
        })
        .buffer_unordered(concurrency.max(1));

    // Single consumer: accumulation and the progress tick happen between
    // suspension points, so `done` is seen as exactly 1, 2, ..., total.
    let mut report = BatchReport::default();
    let mut done = 0usize;
    while let Some((id, outcome)) = in_flight.next().await {
        match outcome {
            Ok(()) => report.success.push(id),
            Err(e) => report.failed.push(BatchFailure {
                id,
                error: e.to_string(),
            }),
        }
        done += 1;
        if let Some(tick) = on_progress {
            tick(Progress { done, total });
        }
    }
    Ok(report)
}

/// Issue one bulk call covering the whole id set.
///
/// On success every id is marked succeeded; on failure every id is marked
/// failed with the same captured error. The progress callback fires exactly
/// once, at completion, since a single call has no partial progress to
/// report.
pub async fn run_bulk<F, Fut>(
    ids: &[String],
    on_progress: Option<&ProgressFn>,
    call: F,
) -> Result<BatchReport>
where
    F: FnOnce(Vec<String>) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let ids = dedupe(ids);
    if ids.is_empty() {
        return Err(DeptError::validation("no ids to process"));
    }
    let total = ids.len();

    let report = match call(ids.clone()).await {
        Ok(()) => BatchReport {
            success: ids,
            failed: Vec::new(),
        },
        Err(e) => {
            let error = e.to_string();
            BatchReport {
                success: Vec::new(),
                failed: ids
                    .into_iter()
                    .map(|id| BatchFailure {
                        id,
                        error: error.clone(),
                    })
                    .collect(),
            }
        }
    };
    if let Some(tick) = on_progress {
        tick(Progress { done: total, total });
    }
    Ok(report)
}

/* ------------ update sanitization ------------ */

/// Reduce a raw update mapping to the allow-listed mutable student fields.
///
/// `semester` must be numeric (numeric strings are coerced), `division` a
/// non-empty string after trimming. Anything else, and anything that fails
/// coercion, is silently dropped; callers reject the batch pre-flight when
/// the result is empty.
pub fn sanitize_update(updates: &Map<String, Value>) -> Map<String, Value> {
    let mut out = Map::new();
    if let Some(semester) = updates.get("semester").and_then(coerce_semester) {
        out.insert("semester".to_string(), semester);
    }
    if let Some(division) = updates.get("division").and_then(coerce_division) {
        out.insert("division".to_string(), division);
    }
    out
}

fn coerce_semester(value: &Value) -> Option<Value> {
    match value {
        Value::Number(n) if n.is_u64() => Some(value.clone()),
        Value::String(s) => s.trim().parse::<u64>().ok().map(Value::from),
        _ => None,
    }
}

fn coerce_division(value: &Value) -> Option<Value> {
    let trimmed = value.as_str()?.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(Value::from(trimmed))
}
