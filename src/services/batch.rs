// src/services/batch.rs

//! Best-effort batch processing: every id is attempted, failures are counted,
//! nothing aborts the run.

use std::{fmt::Debug, future::Future};

use crate::models::batch::BatchOperationResult;

/// Running tally of a batch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchOutcome {
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchOutcome {
    pub fn record<T, E: Debug>(mut self, operation: &str, id: i64, result: Result<T, E>) -> Self {
        match result {
            Ok(_) => self.succeeded += 1,
            Err(e) => {
                tracing::warn!("Batch {} skipped record {}: {:?}", operation, id, e);
                self.failed += 1;
            }
        }
        self
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }

    pub fn into_result(self, operation: &str) -> BatchOperationResult {
        BatchOperationResult {
            operation: operation.to_string(),
            success_count: self.succeeded,
            total_count: self.total(),
        }
    }
}

/// Runs `op` for each id in order and folds the results.
pub async fn run<F, Fut, T, E>(operation: &str, ids: &[i64], mut op: F) -> BatchOperationResult
where
    F: FnMut(i64) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Debug,
{
    let mut outcome = BatchOutcome::default();
    for &id in ids {
        outcome = outcome.record(operation, id, op(id).await);
    }
    outcome.into_result(operation)
}
