// src/services/review.rs

//! Review orchestration: load, apply outcome, schedule, prioritise, persist.

use std::{collections::HashSet, sync::Arc};

use chrono::Utc;

use super::{
    analysis::AnalysisExecutor,
    batch, priority,
    scheduler::{self, Quality, SchedulerHandle},
    statistics,
};
use crate::{
    db::ReviewStore,
    error::AppError,
    models::{
        analysis::{BatchAnalysisReport, RecordAnalysis},
        batch::BatchOperationResult,
        review_log::{LogQuery, NewReviewLog, Page, ReviewInput, ReviewLog},
        statistics::{RankedRecord, ReviewPlanOverview, WrongAnswerAnalytics, WrongAnswerStatistics},
        wrong_answer::{NewOutcome, RecordFilter, ReviewStatus, WrongAnswerRecord, dedup_tags},
    },
    utils::html::clean_notes,
};

#[derive(Clone)]
pub struct ReviewService {
    store: Arc<dyn ReviewStore>,
    scheduler: SchedulerHandle,
    analysis: AnalysisExecutor,
}

impl ReviewService {
    pub fn new(store: Arc<dyn ReviewStore>, scheduler: SchedulerHandle, analysis: AnalysisExecutor) -> Self {
        Self {
            store,
            scheduler,
            analysis,
        }
    }

    pub fn scheduler(&self) -> &SchedulerHandle {
        &self.scheduler
    }

    /// Loads a record, hiding records of other users behind `NotFound`.
    async fn owned(&self, user_id: i64, record_id: i64) -> Result<WrongAnswerRecord, AppError> {
        self.store
            .find_by_id(record_id)
            .await?
            .filter(|r| r.user_id == user_id)
            .ok_or_else(|| AppError::NotFound("Record not found".to_string()))
    }

    /// Records one answer outcome, creating the record on the first wrong or
    /// right answer to a question.
    pub async fn record_outcome(
        &self,
        user_id: i64,
        outcome: NewOutcome,
    ) -> Result<WrongAnswerRecord, AppError> {
        let now = Utc::now();
        let config = self.scheduler.snapshot();

        let existing = self
            .store
            .find_by_user_and_question(user_id, outcome.question_id)
            .await?;
        let is_new = existing.is_none();
        let mut record = match existing {
            Some(mut record) => {
                fill_metadata(&mut record, &outcome);
                record
            }
            None => WrongAnswerRecord::new(user_id, &outcome, now),
        };

        scheduler::apply_outcome(&mut record, outcome.is_correct, now);
        config
            .strategy
            .schedule(&mut record, Quality::PLAIN, &config, now);
        record.review_priority = priority::priority_label(&record);
        record.updated_at = now;

        let saved = if is_new {
            self.store.insert(&record).await?
        } else {
            let saved = self.store.update(&record).await?;
            self.analysis.invalidate(saved.id);
            saved
        };
        Ok(saved)
    }

    /// One explicit review. The record update and its log entry are stored
    /// together or not at all.
    pub async fn review_once(
        &self,
        user_id: i64,
        record_id: i64,
        input: ReviewInput,
    ) -> Result<WrongAnswerRecord, AppError> {
        let mut record = self.owned(user_id, record_id).await?;
        let now = Utc::now();
        let config = self.scheduler.snapshot();
        let previous_status = record.review_status;

        scheduler::apply_outcome(&mut record, input.result.is_correct(), now);
        config
            .strategy
            .schedule(&mut record, Quality::from_result(input.result), &config, now);
        record.review_priority = priority::priority_label(&record);
        record.updated_at = now;

        let log = NewReviewLog {
            user_id,
            wrong_answer_id: record.id,
            result: input.result,
            time_spent_sec: input.time_spent_sec.max(0),
            previous_status,
            new_status: record.review_status,
            notes: input.notes.as_deref().and_then(clean_notes),
            review_at: now,
        };

        let (saved, _log) = self.store.save_review(&record, log).await?;
        self.analysis.invalidate(saved.id);
        Ok(saved)
    }

    /// Recomputes `next_review_time` of every non-mastered record with the
    /// current strategy. Returns how many records were rescheduled.
    pub async fn generate_review_plan(&self, user_id: i64) -> Result<usize, AppError> {
        let now = Utc::now();
        let config = self.scheduler.snapshot();
        let records = self
            .store
            .list_by_user(user_id, &RecordFilter::default())
            .await?;

        let mut rescheduled = 0;
        for mut record in records
            .into_iter()
            .filter(|r| r.review_status != ReviewStatus::Mastered)
        {
            config.strategy.replan(&mut record, now);
            self.store.update(&record).await?;
            rescheduled += 1;
        }
        tracing::info!(
            "Rescheduled {} records of user {} with {}",
            rescheduled,
            user_id,
            config.strategy
        );
        Ok(rescheduled)
    }

    /// Explicit status override. Mastery clears the schedule; the other
    /// statuses leave scheduling fields as they are.
    pub async fn change_status(
        &self,
        user_id: i64,
        record_id: i64,
        status: ReviewStatus,
    ) -> Result<WrongAnswerRecord, AppError> {
        let mut record = self.owned(user_id, record_id).await?;
        record.review_status = status;
        if status == ReviewStatus::Mastered {
            record.next_review_time = None;
        }
        record.updated_at = Utc::now();

        let saved = self.store.update(&record).await?;
        self.analysis.invalidate(saved.id);
        Ok(saved)
    }

    pub async fn mark_mastered(&self, user_id: i64, record_id: i64) -> Result<WrongAnswerRecord, AppError> {
        self.change_status(user_id, record_id, ReviewStatus::Mastered).await
    }

    pub async fn mark_reviewing(&self, user_id: i64, record_id: i64) -> Result<WrongAnswerRecord, AppError> {
        self.change_status(user_id, record_id, ReviewStatus::Reviewing).await
    }

    pub async fn update_notes(
        &self,
        user_id: i64,
        record_id: i64,
        notes: &str,
    ) -> Result<WrongAnswerRecord, AppError> {
        let mut record = self.owned(user_id, record_id).await?;
        record.user_notes = clean_notes(notes);
        record.updated_at = Utc::now();
        Ok(self.store.update(&record).await?)
    }

    /// Replaces the tag list.
    pub async fn update_tags(
        &self,
        user_id: i64,
        record_id: i64,
        tags: Vec<String>,
    ) -> Result<WrongAnswerRecord, AppError> {
        let mut record = self.owned(user_id, record_id).await?;
        record.user_tags = dedup_tags(tags);
        record.updated_at = Utc::now();
        Ok(self.store.update(&record).await?)
    }

    async fn add_tags(&self, user_id: i64, record_id: i64, tags: &[String]) -> Result<WrongAnswerRecord, AppError> {
        let mut record = self.owned(user_id, record_id).await?;
        record.user_tags = dedup_tags(record.user_tags.drain(..).chain(tags.iter().cloned()));
        record.updated_at = Utc::now();
        Ok(self.store.update(&record).await?)
    }

    async fn remove_tags(
        &self,
        user_id: i64,
        record_id: i64,
        tags: &HashSet<String>,
    ) -> Result<WrongAnswerRecord, AppError> {
        let mut record = self.owned(user_id, record_id).await?;
        record.user_tags.retain(|t| !tags.contains(t));
        record.updated_at = Utc::now();
        Ok(self.store.update(&record).await?)
    }

    pub async fn delete(&self, user_id: i64, record_id: i64) -> Result<(), AppError> {
        self.store.delete(user_id, record_id).await?;
        self.analysis.invalidate(record_id);
        Ok(())
    }

    pub async fn get(&self, user_id: i64, record_id: i64) -> Result<WrongAnswerRecord, AppError> {
        self.owned(user_id, record_id).await
    }

    pub async fn list(&self, user_id: i64, filter: &RecordFilter) -> Result<Vec<WrongAnswerRecord>, AppError> {
        Ok(self.store.list_by_user(user_id, filter).await?)
    }

    /// Records due now, most urgent first.
    pub async fn due_for_review(&self, user_id: i64) -> Result<Vec<RankedRecord>, AppError> {
        let now = Utc::now();
        let due = self.store.list_due(user_id, now).await?;
        Ok(priority::sort_by_priority(due, now))
    }

    pub async fn review_logs(
        &self,
        user_id: i64,
        record_id: i64,
        query: &LogQuery,
    ) -> Result<Page<ReviewLog>, AppError> {
        self.owned(user_id, record_id).await?;
        Ok(self.store.list_logs(user_id, record_id, query).await?)
    }

    pub async fn statistics(&self, user_id: i64) -> Result<WrongAnswerStatistics, AppError> {
        let records = self.list(user_id, &RecordFilter::default()).await?;
        Ok(statistics::statistics(user_id, &records, Utc::now()))
    }

    pub async fn analytics(&self, user_id: i64, days: i64) -> Result<WrongAnswerAnalytics, AppError> {
        let records = self.list(user_id, &RecordFilter::default()).await?;
        Ok(statistics::analytics(&records, days, Utc::now()))
    }

    /// Priority summary, suggested daily volume and the queue to work through.
    pub async fn review_plan_overview(
        &self,
        user_id: i64,
        hours_per_day: f64,
    ) -> Result<ReviewPlanOverview, AppError> {
        let now = Utc::now();
        let records = self.list(user_id, &RecordFilter::default()).await?;
        let summary = priority::summarize(&records, now);
        let recommended_daily_count = priority::recommended_daily_count(&summary, hours_per_day);

        let pending = records
            .into_iter()
            .filter(|r| r.review_status != ReviewStatus::Mastered)
            .collect();
        let mut queue = priority::sort_by_priority(pending, now);
        queue.truncate(recommended_daily_count);

        Ok(ReviewPlanOverview {
            summary,
            recommended_daily_count,
            queue,
        })
    }

    pub async fn analyze(&self, user_id: i64, record_id: i64) -> Result<RecordAnalysis, AppError> {
        let record = self.owned(user_id, record_id).await?;
        Ok(self.analysis.analyze_one(record).await)
    }

    /// Ids that are missing or belong to someone else are skipped before the fan-out.
    pub async fn analyze_many(&self, user_id: i64, record_ids: &[i64]) -> BatchAnalysisReport {
        let mut records = Vec::with_capacity(record_ids.len());
        for &id in record_ids {
            match self.owned(user_id, id).await {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!("Batch analysis skipped record {}: {:?}", id, e),
            }
        }
        self.analysis.analyze_many(records).await
    }

    pub async fn batch_update_status(
        &self,
        user_id: i64,
        record_ids: &[i64],
        status: ReviewStatus,
    ) -> BatchOperationResult {
        batch::run("update_status", record_ids, |id| {
            self.change_status(user_id, id, status)
        })
        .await
    }

    pub async fn batch_add_tags(&self, user_id: i64, record_ids: &[i64], tags: &[String]) -> BatchOperationResult {
        let tags = dedup_tags(tags.iter().cloned());
        batch::run("add_tags", record_ids, |id| self.add_tags(user_id, id, &tags)).await
    }

    pub async fn batch_remove_tags(
        &self,
        user_id: i64,
        record_ids: &[i64],
        tags: &[String],
    ) -> BatchOperationResult {
        let tags: HashSet<String> = tags.iter().map(|t| t.trim().to_string()).collect();
        batch::run("remove_tags", record_ids, |id| self.remove_tags(user_id, id, &tags)).await
    }

    pub async fn batch_delete(&self, user_id: i64, record_ids: &[i64]) -> BatchOperationResult {
        batch::run("delete", record_ids, |id| self.delete(user_id, id)).await
    }
}

/// Later answers may carry question metadata the first one lacked.
fn fill_metadata(record: &mut WrongAnswerRecord, outcome: &NewOutcome) {
    if record.question_title.is_none() {
        record.question_title = outcome.question_title.clone();
    }
    if record.question_content.is_none() {
        record.question_content = outcome.question_content.clone();
    }
    if record.difficulty.is_none() {
        record.difficulty = outcome.difficulty;
    }
    if record.source_instance_id.is_none() {
        record.source_instance_id = outcome.source_instance_id.clone();
    }
    if record.knowledge_points.is_empty() {
        record.knowledge_points = outcome.knowledge_points.clone();
    }
    if !outcome.user_tags.is_empty() {
        record.user_tags = dedup_tags(
            record
                .user_tags
                .drain(..)
                .chain(outcome.user_tags.iter().cloned()),
        );
    }
}
