// src/db/memory.rs

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use super::{ReviewStore, StoreError, StoreResult, log_matches, record_matches};
use crate::models::{
    review_log::{LogQuery, NewReviewLog, Page, ReviewLog},
    wrong_answer::{RecordFilter, WrongAnswerRecord},
};

#[derive(Default)]
struct Inner {
    records: BTreeMap<i64, WrongAnswerRecord>,
    logs: Vec<ReviewLog>,
    next_record_id: i64,
    next_log_id: i64,
}

impl Inner {
    /// Version check shared by `update` and `save_review`.
    fn apply_update(&mut self, record: &WrongAnswerRecord) -> StoreResult<WrongAnswerRecord> {
        let stored = self.records.get_mut(&record.id).ok_or(StoreError::NotFound)?;
        if stored.version != record.version {
            return Err(StoreError::Conflict);
        }
        let mut updated = record.clone();
        updated.version += 1;
        *stored = updated.clone();
        Ok(updated)
    }
}

/// Process-local store. All operations take one lock, so `save_review` is
/// trivially atomic.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log_count(&self) -> usize {
        self.inner.lock().logs.len()
    }
}

#[async_trait]
impl ReviewStore for MemoryStore {
    async fn find_by_user_and_question(
        &self,
        user_id: i64,
        question_id: i64,
    ) -> StoreResult<Option<WrongAnswerRecord>> {
        let inner = self.inner.lock();
        Ok(inner
            .records
            .values()
            .find(|r| r.user_id == user_id && r.question_id == question_id)
            .cloned())
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<WrongAnswerRecord>> {
        Ok(self.inner.lock().records.get(&id).cloned())
    }

    async fn insert(&self, record: &WrongAnswerRecord) -> StoreResult<WrongAnswerRecord> {
        let mut inner = self.inner.lock();
        if inner
            .records
            .values()
            .any(|r| r.user_id == record.user_id && r.question_id == record.question_id)
        {
            return Err(StoreError::Conflict);
        }
        inner.next_record_id += 1;
        let mut stored = record.clone();
        stored.id = inner.next_record_id;
        stored.version = 1;
        inner.records.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn update(&self, record: &WrongAnswerRecord) -> StoreResult<WrongAnswerRecord> {
        self.inner.lock().apply_update(record)
    }

    async fn delete(&self, user_id: i64, id: i64) -> StoreResult<()> {
        let mut inner = self.inner.lock();
        match inner.records.get(&id) {
            Some(r) if r.user_id == user_id => {
                inner.records.remove(&id);
                Ok(())
            }
            _ => Err(StoreError::NotFound),
        }
    }

    async fn list_by_user(
        &self,
        user_id: i64,
        filter: &RecordFilter,
    ) -> StoreResult<Vec<WrongAnswerRecord>> {
        let inner = self.inner.lock();
        let mut records: Vec<WrongAnswerRecord> = inner
            .records
            .values()
            .filter(|r| r.user_id == user_id && record_matches(r, filter))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(records)
    }

    async fn list_due(
        &self,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<WrongAnswerRecord>> {
        let inner = self.inner.lock();
        let mut records: Vec<WrongAnswerRecord> = inner
            .records
            .values()
            .filter(|r| r.user_id == user_id && r.is_due(now))
            .cloned()
            .collect();
        records.sort_by_key(|r| r.next_review_time);
        Ok(records)
    }

    async fn save_review(
        &self,
        record: &WrongAnswerRecord,
        log: NewReviewLog,
    ) -> StoreResult<(WrongAnswerRecord, ReviewLog)> {
        let mut inner = self.inner.lock();
        let updated = inner.apply_update(record)?;
        inner.next_log_id += 1;
        let log = log.into_log(inner.next_log_id);
        inner.logs.push(log.clone());
        Ok((updated, log))
    }

    async fn list_logs(
        &self,
        user_id: i64,
        record_id: i64,
        query: &LogQuery,
    ) -> StoreResult<Page<ReviewLog>> {
        let inner = self.inner.lock();
        let mut matching: Vec<&ReviewLog> = inner
            .logs
            .iter()
            .filter(|l| l.user_id == user_id && l.wrong_answer_id == record_id)
            .filter(|l| log_matches(l, query))
            .collect();
        matching.sort_by(|a, b| b.review_at.cmp(&a.review_at).then(b.id.cmp(&a.id)));

        let total = matching.len() as i64;
        let items = matching
            .into_iter()
            .skip(query.offset() as usize)
            .take(query.size as usize)
            .cloned()
            .collect();

        Ok(Page {
            items,
            total,
            page: query.page,
            size: query.size,
        })
    }
}
