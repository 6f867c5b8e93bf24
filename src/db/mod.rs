// src/db/mod.rs

//! Record Store Gateway.
//!
//! Everything the review service persists goes through [`ReviewStore`]. Two
//! backends exist: [`PgStore`] for production and [`MemoryStore`] for local
//! runs without a database and for tests.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{
    review_log::{LogQuery, NewReviewLog, Page, ReviewLog},
    wrong_answer::{RecordFilter, WrongAnswerRecord},
};

#[derive(Debug, Error)]
pub enum StoreError {
    /// Absent, or owned by a different user.
    #[error("record not found")]
    NotFound,
    /// The stored version moved on since the record was loaded.
    #[error("record was modified concurrently")]
    Conflict,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            other => StoreError::Unavailable(other.to_string()),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait ReviewStore: Send + Sync {
    async fn find_by_user_and_question(
        &self,
        user_id: i64,
        question_id: i64,
    ) -> StoreResult<Option<WrongAnswerRecord>>;

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<WrongAnswerRecord>>;

    /// Persists a new record and returns it with its assigned id.
    async fn insert(&self, record: &WrongAnswerRecord) -> StoreResult<WrongAnswerRecord>;

    /// Optimistic update keyed on `record.version`. Returns the stored record
    /// with the bumped version, or `Conflict` if someone else wrote first.
    async fn update(&self, record: &WrongAnswerRecord) -> StoreResult<WrongAnswerRecord>;

    /// Fails with `NotFound` unless the record exists and belongs to `user_id`.
    async fn delete(&self, user_id: i64, id: i64) -> StoreResult<()>;

    async fn list_by_user(
        &self,
        user_id: i64,
        filter: &RecordFilter,
    ) -> StoreResult<Vec<WrongAnswerRecord>>;

    /// Records with a non-null `next_review_time <= now`, earliest first.
    async fn list_due(&self, user_id: i64, now: DateTime<Utc>)
    -> StoreResult<Vec<WrongAnswerRecord>>;

    /// Updates the record and appends the log as one unit: either both are
    /// stored or neither is.
    async fn save_review(
        &self,
        record: &WrongAnswerRecord,
        log: NewReviewLog,
    ) -> StoreResult<(WrongAnswerRecord, ReviewLog)>;

    async fn list_logs(
        &self,
        user_id: i64,
        record_id: i64,
        query: &LogQuery,
    ) -> StoreResult<Page<ReviewLog>>;
}

/// Shared filter logic for backends that evaluate log queries in process.
pub(crate) fn log_matches(log: &ReviewLog, query: &LogQuery) -> bool {
    query.result.is_none_or(|r| log.result == r)
        && query.from.is_none_or(|from| log.review_at >= from)
        && query.to.is_none_or(|to| log.review_at <= to)
}

pub(crate) fn record_matches(record: &WrongAnswerRecord, filter: &RecordFilter) -> bool {
    filter.status.is_none_or(|s| record.review_status == s)
        && filter.source.is_none_or(|s| record.source == s)
}
