// src/services/scheduler.rs

//! Review-state machine and interval strategies.
//!
//! Everything here is pure: callers pass `now` in and persist the mutated record.

use std::{fmt, str::FromStr, sync::Arc};

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::models::{
    review_log::ReviewResult,
    wrong_answer::{Difficulty, ParseEnumError, ReviewStatus, WrongAnswerRecord},
};

pub const MIN_EASE_FACTOR: f64 = 1.3;
/// Cumulative correct answers needed for mastery.
pub const MASTERY_THRESHOLD: i32 = 3;

/// SM-2 answer quality, 0 to 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Quality(u8);

impl Quality {
    /// Used when an outcome is recorded without an explicit review result.
    pub const PLAIN: Quality = Quality(2);

    pub fn new(value: u8) -> Self {
        Self(value.min(5))
    }

    pub fn from_result(result: ReviewResult) -> Self {
        match result {
            ReviewResult::Pass => Self(5),
            ReviewResult::Doubt => Self(3),
            ReviewResult::Fail => Self(1),
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulingStrategy {
    Sm2,
    Ebbinghaus,
    Fsrs,
}

impl SchedulingStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sm2 => "sm2",
            Self::Ebbinghaus => "ebbinghaus",
            Self::Fsrs => "fsrs",
        }
    }

    /// Updates the scheduling fields of `record` after an answer of the given quality.
    ///
    /// The review status must already reflect the outcome (see [`apply_outcome`]);
    /// a mastered record always ends up with no next review time.
    pub fn schedule(
        self,
        record: &mut WrongAnswerRecord,
        quality: Quality,
        config: &SchedulerConfig,
        now: DateTime<Utc>,
    ) {
        match self {
            Self::Sm2 => sm2(record, quality, now),
            Self::Ebbinghaus => {
                if record.review_status != ReviewStatus::Mastered {
                    let interval = ebbinghaus_interval(record.wrong_count);
                    record.interval_days = interval;
                    record.next_review_time = Some(now + Duration::days(interval.into()));
                }
            }
            Self::Fsrs => {
                sm2(record, quality, now);
                let adjusted = fsrs_interval(
                    record.interval_days,
                    record.difficulty,
                    record.repetitions,
                    config.fsrs_alpha,
                );
                record.interval_days = adjusted;
                record.next_review_time = Some(now + Duration::days(adjusted.into()));
            }
        }

        if record.review_status == ReviewStatus::Mastered {
            record.next_review_time = None;
        }
    }

    /// Recomputes only `next_review_time` (and, where it is derived, the interval)
    /// without touching counters, ease or status. Mastered records are left alone.
    ///
    /// sm2 and fsrs reuse the stored interval, which already carries any fsrs
    /// weighting from the last schedule.
    pub fn replan(self, record: &mut WrongAnswerRecord, now: DateTime<Utc>) {
        if record.review_status == ReviewStatus::Mastered {
            record.next_review_time = None;
            return;
        }

        record.interval_days = match self {
            Self::Sm2 | Self::Fsrs => record.interval_days.max(1),
            Self::Ebbinghaus => ebbinghaus_interval(record.wrong_count),
        };
        record.next_review_time = Some(now + Duration::days(record.interval_days.into()));
    }
}

impl FromStr for SchedulingStrategy {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sm2" => Ok(Self::Sm2),
            "ebbinghaus" => Ok(Self::Ebbinghaus),
            "fsrs" => Ok(Self::Fsrs),
            _ => Err(ParseEnumError {
                kind: "scheduling strategy",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for SchedulingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Applies the wrong/correct transition of the review-state machine.
pub fn apply_outcome(record: &mut WrongAnswerRecord, is_correct: bool, now: DateTime<Utc>) {
    if is_correct {
        record.correct_count += 1;
        record.last_correct_time = Some(now);
        if record.correct_count >= MASTERY_THRESHOLD {
            record.review_status = ReviewStatus::Mastered;
            record.next_review_time = None;
        } else if record.review_status != ReviewStatus::Reviewing {
            record.review_status = ReviewStatus::Reviewing;
        }
    } else {
        record.wrong_count += 1;
        record.last_wrong_time = Some(now);
        record.review_status = ReviewStatus::Reviewing;
    }
}

/// Simplified SM-2. The interval grows with the ease factor from before this answer.
fn sm2(record: &mut WrongAnswerRecord, quality: Quality, now: DateTime<Utc>) {
    let q = quality.value();

    if q < 3 {
        record.repetitions = 0;
        record.interval_days = 1;
    } else {
        record.interval_days = match record.repetitions {
            r if r <= 0 => 1,
            1 => 6,
            _ => ((record.interval_days as f64 * record.ease_factor).round() as i32).max(1),
        };
        record.repetitions = record.repetitions.max(0) + 1;
    }

    let miss = f64::from(5 - q);
    record.ease_factor =
        (record.ease_factor + (0.1 - miss * (0.08 + miss * 0.02))).max(MIN_EASE_FACTOR);
    record.last_quality = Some(i32::from(q));
    record.next_review_time = Some(now + Duration::days(record.interval_days.into()));
}

/// Fixed forgetting-curve table keyed by cumulative wrong answers.
pub fn ebbinghaus_interval(wrong_count: i32) -> i32 {
    match wrong_count {
        i32::MIN..=1 => 1,
        2 => 3,
        3 => 7,
        4 => 14,
        _ => 30,
    }
}

/// Lightweight FSRS-style scaling of an SM-2 interval. Never below one day.
pub fn fsrs_interval(
    base_interval: i32,
    difficulty: Option<Difficulty>,
    repetitions: i32,
    alpha: f64,
) -> i32 {
    let diff_weight = match difficulty {
        Some(Difficulty::Hard) => 0.85,
        Some(Difficulty::Easy) => 1.1,
        _ => 1.0,
    };
    let reps_weight = 1.0 + (f64::from(repetitions.max(0)).ln_1p() / 10.0).min(0.25);
    let adjusted = (f64::from(base_interval) * diff_weight * reps_weight * alpha).round();

    if adjusted < 1.0 { 1 } else { adjusted as i32 }
}

/// Process-wide scheduler settings. Always handled as an immutable snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub strategy: SchedulingStrategy,
    pub fsrs_alpha: f64,
}

impl SchedulerConfig {
    pub const DEFAULT_ALPHA: f64 = 1.0;

    pub fn is_valid_alpha(alpha: f64) -> bool {
        alpha > 0.0 && alpha <= 3.0
    }

    /// Builds the startup config from raw environment values, ignoring invalid ones.
    pub fn from_raw(strategy: Option<&str>, alpha: Option<&str>) -> Self {
        let mut config = Self::default();
        if let Some(strategy) = strategy.and_then(|s| s.parse().ok()) {
            config.strategy = strategy;
        }
        if let Some(alpha) = alpha
            .and_then(|a| a.trim().parse::<f64>().ok())
            .filter(|a| Self::is_valid_alpha(*a))
        {
            config.fsrs_alpha = alpha;
        }
        config
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            strategy: SchedulingStrategy::Sm2,
            fsrs_alpha: Self::DEFAULT_ALPHA,
        }
    }
}

/// DTO for the administrative config update. Out-of-range values are dropped.
#[derive(Debug, Default, Deserialize)]
pub struct SchedulerConfigUpdate {
    pub strategy: Option<String>,
    pub fsrs_alpha: Option<f64>,
}

/// Shared handle to the current [`SchedulerConfig`].
///
/// Updates build a complete new snapshot and swap it in; readers only clone the
/// `Arc`, so a strategy is never paired with another snapshot's alpha.
#[derive(Clone)]
pub struct SchedulerHandle {
    current: Arc<RwLock<Arc<SchedulerConfig>>>,
}

impl SchedulerHandle {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(config))),
        }
    }

    pub fn snapshot(&self) -> Arc<SchedulerConfig> {
        self.current.read().clone()
    }

    /// Applies the valid parts of `update` and returns the effective config.
    pub fn apply(&self, update: &SchedulerConfigUpdate) -> Arc<SchedulerConfig> {
        let mut current = self.current.write();
        let mut next = SchedulerConfig::clone(&current);

        if let Some(raw) = update.strategy.as_deref() {
            match raw.parse::<SchedulingStrategy>() {
                Ok(strategy) => next.strategy = strategy,
                Err(e) => tracing::warn!("Ignoring scheduler update: {}", e),
            }
        }
        if let Some(alpha) = update.fsrs_alpha {
            if SchedulerConfig::is_valid_alpha(alpha) {
                next.fsrs_alpha = alpha;
            } else {
                tracing::warn!("Ignoring out-of-range fsrs_alpha {}", alpha);
            }
        }

        if next != **current {
            tracing::info!(
                "Scheduler config changed: strategy={} fsrs_alpha={}",
                next.strategy,
                next.fsrs_alpha
            );
            *current = Arc::new(next);
        }
        current.clone()
    }
}

impl Default for SchedulerHandle {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}
