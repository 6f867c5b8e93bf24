// src/models/analysis.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::wrong_answer::Difficulty;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    Success,
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HintLevel {
    Foundational,
    Intermediate,
    Advanced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PlanPriority {
    Low,
    Medium,
    High,
}

/// Advisory study plan. Never fed back into scheduling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyPlan {
    pub next_review_date: DateTime<Utc>,
    pub reviews_needed: u32,
    /// Minutes.
    pub estimated_time: u32,
    pub focus_areas: Vec<String>,
    pub priority: PlanPriority,
}

/// Analysis of one record. A degraded entry has `status == unavailable` and
/// empty `insights`/`hints`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordAnalysis {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<i64>,
    pub status: AnalysisStatus,
    pub insights: Vec<String>,
    pub hints: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint_level: Option<HintLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<StudyPlan>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<DateTime<Utc>>,
}

impl RecordAnalysis {
    pub fn unavailable(record_id: Option<i64>) -> Self {
        Self {
            record_id,
            status: AnalysisStatus::Unavailable,
            insights: Vec::new(),
            hints: Vec::new(),
            hint_level: None,
            difficulty: None,
            plan: None,
            generated_at: None,
        }
    }

    /// Counts towards a batch's `success_count`.
    pub fn is_success(&self) -> bool {
        self.status == AnalysisStatus::Success
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchAnalysisReport {
    pub analyses: Vec<RecordAnalysis>,
    pub total_count: usize,
    pub success_count: usize,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct BatchAnalysisRequest {
    #[validate(length(
        min = 1,
        max = 200,
        message = "record_ids must contain between 1 and 200 ids"
    ))]
    pub record_ids: Vec<i64>,
}
