// src/services/analysis.rs

//! Per-record analysis and the bounded batch executor around it.

use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use thiserror::Error;
use tokio::{sync::Semaphore, time::timeout};

use crate::models::{
    analysis::{
        AnalysisStatus, BatchAnalysisReport, HintLevel, PlanPriority, RecordAnalysis, StudyPlan,
    },
    wrong_answer::{Difficulty, WrongAnswerRecord},
};

pub const DEFAULT_WORKERS: usize = 5;
pub const DEFAULT_TASK_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("analysis provider failed: {0}")]
    Provider(String),
    #[error("analysis timed out after {0:?}")]
    Timeout(Duration),
    #[error("analysis task aborted: {0}")]
    Aborted(String),
}

/// Produces the analysis of one record. Implementations may call out to a
/// remote model; every error they return is absorbed by the executor.
#[async_trait]
pub trait AnalysisProvider: Send + Sync {
    async fn analyze(&self, record: &WrongAnswerRecord) -> Result<RecordAnalysis, AnalysisError>;
}

/// Local rules engine. No outbound calls.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeuristicAnalyzer;

impl HeuristicAnalyzer {
    pub fn analyze_at(record: &WrongAnswerRecord, now: DateTime<Utc>) -> RecordAnalysis {
        let mastery = truncated_mastery(record);
        let (hint_level, hints) = hints(mastery);

        RecordAnalysis {
            record_id: Some(record.id),
            status: AnalysisStatus::Success,
            insights: insights(record),
            hints,
            hint_level: Some(hint_level),
            difficulty: record.difficulty,
            plan: Some(study_plan(record, mastery, now)),
            generated_at: Some(now),
        }
    }
}

#[async_trait]
impl AnalysisProvider for HeuristicAnalyzer {
    async fn analyze(&self, record: &WrongAnswerRecord) -> Result<RecordAnalysis, AnalysisError> {
        Ok(Self::analyze_at(record, Utc::now()))
    }
}

/// Percentage of correct attempts, rounded down.
fn truncated_mastery(record: &WrongAnswerRecord) -> i64 {
    let attempts = i64::from(record.correct_count) + i64::from(record.wrong_count);
    if attempts <= 0 {
        return 0;
    }
    i64::from(record.correct_count) * 100 / attempts
}

fn is_hard(record: &WrongAnswerRecord) -> bool {
    record.difficulty == Some(Difficulty::Hard)
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn insights(record: &WrongAnswerRecord) -> Vec<String> {
    let attempts = record.correct_count + record.wrong_count;
    let mut insights = Vec::new();

    if attempts > 0 {
        let success_rate = f64::from(record.correct_count) * 100.0 / f64::from(attempts);
        insights.extend(if success_rate >= 80.0 {
            strings(&[
                "You have a solid grasp of the core concept behind this question",
                "Keep practising similar questions to stay sharp",
            ])
        } else if success_rate >= 50.0 {
            strings(&[
                "Your understanding is not deep enough yet and needs more practice",
                "Walk through the key steps of the mistakes you made",
            ])
        } else {
            strings(&[
                "This question is difficult for you and needs systematic study",
                "Revisit the underlying fundamentals and concepts",
            ])
        });
    }

    if is_hard(record) {
        insights.push("This is a hard question; mastering it will noticeably raise your level".into());
    }
    insights
}

fn hints(mastery: i64) -> (HintLevel, Vec<String>) {
    match mastery {
        m if m < 30 => (
            HintLevel::Foundational,
            strings(&[
                "Understand the core concept",
                "Finish the basic exercises",
                "Review the related knowledge points",
            ]),
        ),
        m if m < 60 => (
            HintLevel::Intermediate,
            strings(&[
                "Deepen your understanding",
                "Practise mixed problems",
                "Analyse why the answer was wrong",
            ]),
        ),
        _ => (
            HintLevel::Advanced,
            strings(&[
                "Refine your solution approach",
                "Work through variants of the question",
                "Connect it to the wider topic",
            ]),
        ),
    }
}

fn study_plan(record: &WrongAnswerRecord, mastery: i64, now: DateTime<Utc>) -> StudyPlan {
    let hard = is_hard(record);

    let mut interval = match mastery {
        m if m >= 80 => 7,
        m if m >= 60 => 3,
        _ => 1,
    };
    if hard {
        interval = (interval / 2).max(1);
    }

    let reviews_needed = match mastery {
        m if m >= 85 => 1,
        m if m >= 60 => 2,
        m if m >= 40 => 3,
        _ => 4,
    };

    let estimated_time = match record.difficulty {
        Some(Difficulty::Easy) => 5,
        Some(Difficulty::Hard) => 20,
        _ => 10,
    };

    let mut focus_areas = Vec::new();
    if hard {
        focus_areas.extend(strings(&["core concept understanding", "solution approach analysis"]));
    }
    focus_areas.extend(strings(&["error cause analysis", "knowledge consolidation"]));

    let priority = if mastery < 40 || hard {
        PlanPriority::High
    } else if mastery < 60 {
        PlanPriority::Medium
    } else {
        PlanPriority::Low
    };

    StudyPlan {
        next_review_date: now + chrono::Duration::days(interval),
        reviews_needed,
        estimated_time,
        focus_areas,
        priority,
    }
}

struct CachedAnalysis {
    version: i64,
    analysis: RecordAnalysis,
}

/// Memoized analyses keyed by record id.
///
/// Each entry remembers the record version it was computed from and is only
/// served for that version. `generations` is bumped on every invalidation; a
/// write from a task started under an older generation is dropped.
#[derive(Default)]
struct AnalysisCache {
    entries: HashMap<i64, CachedAnalysis>,
    generations: HashMap<i64, u64>,
}

impl AnalysisCache {
    fn generation(&self, record_id: i64) -> u64 {
        self.generations.get(&record_id).copied().unwrap_or(0)
    }

    fn lookup(&self, record: &WrongAnswerRecord) -> Option<RecordAnalysis> {
        self.entries
            .get(&record.id)
            .filter(|entry| entry.version == record.version)
            .map(|entry| entry.analysis.clone())
    }

    fn store(&mut self, record: &WrongAnswerRecord, generation: u64, analysis: &RecordAnalysis) {
        if self.generation(record.id) != generation {
            return;
        }
        match self.entries.get(&record.id) {
            Some(entry) if entry.version >= record.version => {}
            _ => {
                self.entries.insert(
                    record.id,
                    CachedAnalysis {
                        version: record.version,
                        analysis: analysis.clone(),
                    },
                );
            }
        }
    }

    fn invalidate(&mut self, record_id: i64) {
        self.entries.remove(&record_id);
        *self.generations.entry(record_id).or_default() += 1;
    }
}

/// Runs analyses on a fixed number of workers with a per-task wait.
///
/// Successful analyses are memoized per record version. A task that misses
/// its deadline keeps running detached and may still fill the cache later,
/// unless the record was invalidated in the meantime.
#[derive(Clone)]
pub struct AnalysisExecutor {
    provider: Arc<dyn AnalysisProvider>,
    cache: Arc<RwLock<AnalysisCache>>,
    permits: Arc<Semaphore>,
    task_timeout: Duration,
}

impl AnalysisExecutor {
    pub fn new(provider: Arc<dyn AnalysisProvider>, workers: usize, task_timeout: Duration) -> Self {
        Self {
            provider,
            cache: Arc::new(RwLock::new(AnalysisCache::default())),
            permits: Arc::new(Semaphore::new(workers.max(1))),
            task_timeout,
        }
    }

    pub fn heuristic() -> Self {
        Self::new(Arc::new(HeuristicAnalyzer), DEFAULT_WORKERS, DEFAULT_TASK_TIMEOUT)
    }

    pub fn cached(&self, record_id: i64) -> Option<RecordAnalysis> {
        self.cache
            .read()
            .entries
            .get(&record_id)
            .map(|entry| entry.analysis.clone())
    }

    /// Drops the memoized analysis after the record changed.
    pub fn invalidate(&self, record_id: i64) {
        self.cache.write().invalidate(record_id);
    }

    /// Single-record analysis. Degrades instead of failing.
    pub async fn analyze_one(&self, record: WrongAnswerRecord) -> RecordAnalysis {
        let id = record.id;
        let task = self.spawn(record);
        self.collect(id, task).await
    }

    /// Fans every record out to the pool and gathers the results in input order.
    pub async fn analyze_many(&self, records: Vec<WrongAnswerRecord>) -> BatchAnalysisReport {
        let total_count = records.len();
        let tasks: Vec<_> = records
            .into_iter()
            .map(|record| (record.id, self.spawn(record)))
            .collect();

        let mut analyses = Vec::with_capacity(total_count);
        for (id, task) in tasks {
            analyses.push(self.collect(id, task).await);
        }

        let success_count = analyses.iter().filter(|a| a.is_success()).count();
        BatchAnalysisReport {
            analyses,
            total_count,
            success_count,
            timestamp: Utc::now(),
        }
    }

    fn spawn(
        &self,
        record: WrongAnswerRecord,
    ) -> tokio::task::JoinHandle<Result<RecordAnalysis, AnalysisError>> {
        let provider = self.provider.clone();
        let cache = self.cache.clone();
        let permits = self.permits.clone();
        let generation = self.cache.read().generation(record.id);

        tokio::spawn(async move {
            let hit = cache.read().lookup(&record);
            if let Some(hit) = hit {
                return Ok(hit);
            }

            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|e| AnalysisError::Aborted(e.to_string()))?;

            let analysis = provider.analyze(&record).await?;
            if analysis.is_success() {
                cache.write().store(&record, generation, &analysis);
            }
            Ok::<_, AnalysisError>(analysis)
        })
    }

    async fn collect(
        &self,
        record_id: i64,
        task: tokio::task::JoinHandle<Result<RecordAnalysis, AnalysisError>>,
    ) -> RecordAnalysis {
        let error = match timeout(self.task_timeout, task).await {
            Ok(Ok(Ok(analysis))) => return analysis,
            Ok(Ok(Err(e))) => e,
            Ok(Err(join_err)) => AnalysisError::Aborted(join_err.to_string()),
            Err(_) => AnalysisError::Timeout(self.task_timeout),
        };
        tracing::warn!("Analysis of record {} degraded: {}", record_id, error);
        RecordAnalysis::unavailable(Some(record_id))
    }
}
