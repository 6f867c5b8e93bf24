// src/models/statistics.rs

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::wrong_answer::WrongAnswerRecord;

/// Counts and percentages over all of a user's records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WrongAnswerStatistics {
    pub user_id: i64,
    pub total_wrong_count: usize,
    pub mastered_count: usize,
    pub reviewing_count: usize,
    pub unreviewed_count: usize,
    pub mastered_percentage: f64,
    /// Every known source is present, zero when unused.
    pub count_by_source: BTreeMap<String, usize>,
    /// Every known difficulty is present, zero when unused.
    pub count_by_difficulty: BTreeMap<String, usize>,
    /// Records answered (right or wrong) during the current local day.
    pub today_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WrongAnswerAnalytics {
    pub window_days: i64,
    pub total_wrong_answers: usize,
    pub mastered_count: usize,
    pub reviewing_count: usize,
    pub unreviewed_count: usize,
    /// Records updated inside the window.
    pub recent_count: usize,
    /// Mastered share of the windowed records, in percent.
    pub mastery_rate: f64,
    /// Records updated during the last seven days, regardless of the window.
    pub weekly_review_count: usize,
    pub source_distribution: BTreeMap<String, usize>,
    pub difficulty_distribution: BTreeMap<String, usize>,
}

/// Priority-based summary used to size a day's review queue.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrioritySummary {
    pub total: usize,
    pub mastered: usize,
    pub reviewing: usize,
    pub unreviewed: usize,
    pub mastered_percentage: i64,
    pub average_priority: i64,
    pub average_mastery: i64,
    pub next_review_count: usize,
    /// Records scoring at least `priority::OVERDUE_SCORE`.
    pub overdue_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RankedRecord {
    pub priority_score: i64,
    #[serde(flatten)]
    pub record: WrongAnswerRecord,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewPlanOverview {
    pub summary: PrioritySummary,
    pub recommended_daily_count: usize,
    pub queue: Vec<RankedRecord>,
}

#[derive(Debug, Deserialize)]
pub struct AnalyticsParams {
    pub days: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewPlanParams {
    pub hours_per_day: Option<f64>,
}
