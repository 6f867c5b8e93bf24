// tests/review_service_tests.rs

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use parking_lot::Mutex;
use chrono::{DateTime, Utc};
use review_backend::{
    db::{MemoryStore, ReviewStore, StoreError, StoreResult},
    error::AppError,
    models::{
        review_log::{LogQuery, NewReviewLog, Page, ReviewInput, ReviewLog, ReviewResult},
        wrong_answer::{
            AnswerSource, Difficulty, NewOutcome, RecordFilter, ReviewStatus, WrongAnswerRecord,
        },
    },
    services::{
        AnalysisExecutor, ReviewService, SchedulerConfig, SchedulerHandle,
        scheduler::{SchedulerConfigUpdate, SchedulingStrategy},
    },
};

/// Memory store whose atomic review write can be made to fail, and whose
/// reads can be pinned to an earlier copy of a record.
#[derive(Default)]
struct FaultyStore {
    inner: MemoryStore,
    fail_reviews: AtomicBool,
    pinned: Mutex<Option<WrongAnswerRecord>>,
}

#[async_trait]
impl ReviewStore for FaultyStore {
    async fn find_by_user_and_question(
        &self,
        user_id: i64,
        question_id: i64,
    ) -> StoreResult<Option<WrongAnswerRecord>> {
        self.inner.find_by_user_and_question(user_id, question_id).await
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<WrongAnswerRecord>> {
        let pinned = self.pinned.lock().clone().filter(|r| r.id == id);
        if pinned.is_some() {
            return Ok(pinned);
        }
        self.inner.find_by_id(id).await
    }

    async fn insert(&self, record: &WrongAnswerRecord) -> StoreResult<WrongAnswerRecord> {
        self.inner.insert(record).await
    }

    async fn update(&self, record: &WrongAnswerRecord) -> StoreResult<WrongAnswerRecord> {
        self.inner.update(record).await
    }

    async fn delete(&self, user_id: i64, id: i64) -> StoreResult<()> {
        self.inner.delete(user_id, id).await
    }

    async fn list_by_user(
        &self,
        user_id: i64,
        filter: &RecordFilter,
    ) -> StoreResult<Vec<WrongAnswerRecord>> {
        self.inner.list_by_user(user_id, filter).await
    }

    async fn list_due(
        &self,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<WrongAnswerRecord>> {
        self.inner.list_due(user_id, now).await
    }

    async fn save_review(
        &self,
        record: &WrongAnswerRecord,
        log: NewReviewLog,
    ) -> StoreResult<(WrongAnswerRecord, ReviewLog)> {
        if self.fail_reviews.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("connection reset".to_string()));
        }
        self.inner.save_review(record, log).await
    }

    async fn list_logs(
        &self,
        user_id: i64,
        record_id: i64,
        query: &LogQuery,
    ) -> StoreResult<Page<ReviewLog>> {
        self.inner.list_logs(user_id, record_id, query).await
    }
}

fn service(store: Arc<dyn ReviewStore>, config: SchedulerConfig) -> ReviewService {
    ReviewService::new(store, SchedulerHandle::new(config), AnalysisExecutor::heuristic())
}

fn outcome(question_id: i64, is_correct: bool) -> NewOutcome {
    NewOutcome {
        question_id,
        source: AnswerSource::QuestionBank,
        source_instance_id: Some("bank-1".to_string()),
        is_correct,
        difficulty: Some(Difficulty::Medium),
        question_title: Some("Two sum".to_string()),
        question_content: None,
        knowledge_points: vec!["hashing".to_string()],
        user_tags: vec![],
    }
}

fn review(result: ReviewResult) -> ReviewInput {
    ReviewInput {
        result,
        time_spent_sec: 30,
        notes: None,
    }
}

#[tokio::test]
async fn failed_review_write_leaves_no_log_and_no_update() {
    let store = Arc::new(FaultyStore::default());
    let reviews = service(store.clone(), SchedulerConfig::default());

    let record = reviews.record_outcome(1, outcome(10, false)).await.unwrap();
    store.fail_reviews.store(true, Ordering::SeqCst);

    let err = reviews
        .review_once(1, record.id, review(ReviewResult::Pass))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ServiceUnavailable(_)));

    assert_eq!(store.inner.log_count(), 0);
    let stored = reviews.get(1, record.id).await.unwrap();
    assert_eq!(stored, record);

    // Once storage recovers both writes land together.
    store.fail_reviews.store(false, Ordering::SeqCst);
    let reviewed = reviews
        .review_once(1, record.id, review(ReviewResult::Pass))
        .await
        .unwrap();
    assert_eq!(reviewed.correct_count, 1);
    assert_eq!(store.inner.log_count(), 1);
}

#[tokio::test]
async fn three_cumulative_correct_answers_reach_mastery() {
    let reviews = service(Arc::new(MemoryStore::new()), SchedulerConfig::default());

    let mut last_correct = 0;
    for is_correct in [false, true, false, true, false, true] {
        let record = reviews.record_outcome(2, outcome(20, is_correct)).await.unwrap();
        assert!(record.correct_count >= last_correct);
        last_correct = record.correct_count;
    }

    let record = reviews
        .list(2, &RecordFilter::default())
        .await
        .unwrap()
        .remove(0);
    assert_eq!(record.correct_count, 3);
    assert_eq!(record.wrong_count, 3);
    assert_eq!(record.review_status, ReviewStatus::Mastered);
    assert_eq!(record.next_review_time, None);
}

#[tokio::test]
async fn doubt_counts_as_a_miss_but_keeps_the_recall_quality() {
    let reviews = service(Arc::new(MemoryStore::new()), SchedulerConfig::default());
    let record = reviews.record_outcome(3, outcome(30, false)).await.unwrap();

    let reviewed = reviews
        .review_once(3, record.id, review(ReviewResult::Doubt))
        .await
        .unwrap();
    assert_eq!(reviewed.wrong_count, 2);
    assert_eq!(reviewed.last_quality, Some(3));
    assert_eq!(reviewed.repetitions, 1);

    let logs = reviews
        .review_logs(3, record.id, &LogQuery::default())
        .await
        .unwrap();
    assert_eq!(logs.total, 1);
    assert_eq!(logs.items[0].result, ReviewResult::Doubt);
    assert_eq!(logs.items[0].previous_status, ReviewStatus::Reviewing);
    assert_eq!(logs.items[0].new_status, ReviewStatus::Reviewing);
}

#[tokio::test]
async fn reviewing_someone_elses_record_is_not_found() {
    let reviews = service(Arc::new(MemoryStore::new()), SchedulerConfig::default());
    let record = reviews.record_outcome(4, outcome(40, false)).await.unwrap();

    let err = reviews
        .review_once(5, record.id, review(ReviewResult::Pass))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn review_from_a_stale_copy_is_a_conflict() {
    let store = Arc::new(FaultyStore::default());
    let reviews = service(store.clone(), SchedulerConfig::default());
    let record = reviews.record_outcome(6, outcome(60, false)).await.unwrap();

    // A second device loaded the record before the first review landed.
    let reviewed = reviews
        .review_once(6, record.id, review(ReviewResult::Pass))
        .await
        .unwrap();
    *store.pinned.lock() = Some(record.clone());

    let err = reviews
        .review_once(6, record.id, review(ReviewResult::Fail))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    *store.pinned.lock() = None;
    assert_eq!(store.inner.log_count(), 1);
    assert_eq!(reviews.get(6, record.id).await.unwrap(), reviewed);
}

#[tokio::test]
async fn strategy_switch_applies_to_later_schedules_and_replans() {
    let reviews = service(Arc::new(MemoryStore::new()), SchedulerConfig::default());
    let mut record = reviews.record_outcome(7, outcome(70, false)).await.unwrap();
    for _ in 0..2 {
        record = reviews.record_outcome(7, outcome(70, false)).await.unwrap();
    }
    assert_eq!(record.wrong_count, 3);
    assert_eq!(record.interval_days, 1);

    let effective = reviews.scheduler().apply(&SchedulerConfigUpdate {
        strategy: Some("ebbinghaus".to_string()),
        fsrs_alpha: None,
    });
    assert_eq!(effective.strategy, SchedulingStrategy::Ebbinghaus);

    let rescheduled = reviews.generate_review_plan(7).await.unwrap();
    assert_eq!(rescheduled, 1);

    let replanned = reviews.get(7, record.id).await.unwrap();
    assert_eq!(replanned.interval_days, 7);
    assert_eq!(replanned.wrong_count, record.wrong_count);
    assert_eq!(replanned.correct_count, record.correct_count);
    assert_eq!(replanned.review_status, record.review_status);
    assert_eq!(replanned.updated_at, record.updated_at);
}

#[tokio::test]
async fn batch_status_updates_are_best_effort() {
    let reviews = service(Arc::new(MemoryStore::new()), SchedulerConfig::default());
    let a = reviews.record_outcome(8, outcome(1, false)).await.unwrap();
    let b = reviews.record_outcome(8, outcome(2, false)).await.unwrap();

    let result = reviews
        .batch_update_status(8, &[a.id, 404, b.id], ReviewStatus::Mastered)
        .await;
    assert_eq!((result.success_count, result.total_count), (2, 3));

    let due = reviews.due_for_review(8).await.unwrap();
    assert!(due.is_empty());
    for id in [a.id, b.id] {
        let record = reviews.get(8, id).await.unwrap();
        assert_eq!(record.review_status, ReviewStatus::Mastered);
        assert_eq!(record.next_review_time, None);
    }
}
