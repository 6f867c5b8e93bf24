// src/models/wrong_answer.rs

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};
use thiserror::Error;
use validator::Validate;

/// Returned when a stored or submitted string does not name a known variant.
#[derive(Debug, Error)]
#[error("invalid {kind}: '{value}'")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Coarse mastery state of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    Unreviewed,
    Reviewing,
    Mastered,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unreviewed => "unreviewed",
            Self::Reviewing => "reviewing",
            Self::Mastered => "mastered",
        }
    }
}

impl FromStr for ReviewStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "unreviewed" => Ok(Self::Unreviewed),
            "reviewing" => Ok(Self::Reviewing),
            "mastered" => Ok(Self::Mastered),
            _ => Err(ParseEnumError::new("review status", s)),
        }
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// UI grouping label for urgency. The sortable score lives in `services::priority`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewPriority {
    Low,
    Medium,
    High,
}

impl ReviewPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl FromStr for ReviewPriority {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(ParseEnumError::new("review priority", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Self::Easy, Self::Medium, Self::Hard];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }
}

impl FromStr for Difficulty {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            _ => Err(ParseEnumError::new("difficulty", s)),
        }
    }
}

/// Where the wrong answer was first observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerSource {
    AiInterview,
    QuestionBank,
    MockExam,
    Custom,
}

impl AnswerSource {
    pub const ALL: [AnswerSource; 4] = [
        Self::AiInterview,
        Self::QuestionBank,
        Self::MockExam,
        Self::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AiInterview => "ai_interview",
            Self::QuestionBank => "question_bank",
            Self::MockExam => "mock_exam",
            Self::Custom => "custom",
        }
    }
}

impl FromStr for AnswerSource {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ai_interview" => Ok(Self::AiInterview),
            "question_bank" => Ok(Self::QuestionBank),
            "mock_exam" => Ok(Self::MockExam),
            "custom" => Ok(Self::Custom),
            _ => Err(ParseEnumError::new("answer source", s)),
        }
    }
}

/// One record per `(user_id, question_id)` the user has ever answered wrongly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WrongAnswerRecord {
    pub id: i64,
    pub user_id: i64,
    pub question_id: i64,

    pub source: AnswerSource,
    /// E.g. the interview session the answer came from.
    pub source_instance_id: Option<String>,

    pub wrong_count: i32,
    pub correct_count: i32,
    pub last_wrong_time: Option<DateTime<Utc>>,
    pub last_correct_time: Option<DateTime<Utc>>,

    pub review_status: ReviewStatus,
    /// Always `None` while mastered.
    pub next_review_time: Option<DateTime<Utc>>,
    pub review_priority: ReviewPriority,

    /// Consecutive successful SM-2 reviews.
    pub repetitions: i32,
    /// Never below 1.3.
    pub ease_factor: f64,
    /// Zero only before the first scheduling pass.
    pub interval_days: i32,
    pub last_quality: Option<i32>,

    pub user_notes: Option<String>,
    pub user_tags: Vec<String>,

    /// Copied from the question catalog at creation time.
    pub question_title: Option<String>,
    pub question_content: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub knowledge_points: Vec<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Optimistic lock, bumped by the store on every update.
    #[serde(skip_serializing)]
    #[serde(default)]
    pub version: i64,
}

impl WrongAnswerRecord {
    pub const DEFAULT_EASE_FACTOR: f64 = 2.5;

    /// Builds an unsaved record with SM-2 defaults. `id` stays 0 until the store assigns one.
    pub fn new(user_id: i64, outcome: &NewOutcome, now: DateTime<Utc>) -> Self {
        Self {
            id: 0,
            user_id,
            question_id: outcome.question_id,
            source: outcome.source,
            source_instance_id: outcome.source_instance_id.clone(),
            wrong_count: 0,
            correct_count: 0,
            last_wrong_time: None,
            last_correct_time: None,
            review_status: ReviewStatus::Unreviewed,
            next_review_time: None,
            review_priority: ReviewPriority::Low,
            repetitions: 0,
            ease_factor: Self::DEFAULT_EASE_FACTOR,
            interval_days: 0,
            last_quality: None,
            user_notes: None,
            user_tags: dedup_tags(outcome.user_tags.iter().cloned()),
            question_title: outcome.question_title.clone(),
            question_content: outcome.question_content.clone(),
            difficulty: outcome.difficulty,
            knowledge_points: outcome.knowledge_points.clone(),
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_review_time.is_some_and(|t| t <= now)
    }
}

/// Removes blanks and repeats while keeping first-seen order.
pub fn dedup_tags<I>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.trim().to_string();
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

/// Raw `wrong_answer_records` row as returned by Postgres.
#[derive(Debug, FromRow)]
pub struct WrongAnswerRow {
    pub id: i64,
    pub user_id: i64,
    pub question_id: i64,
    pub source: String,
    pub source_instance_id: Option<String>,
    pub wrong_count: i32,
    pub correct_count: i32,
    pub last_wrong_time: Option<DateTime<Utc>>,
    pub last_correct_time: Option<DateTime<Utc>>,
    pub review_status: String,
    pub next_review_time: Option<DateTime<Utc>>,
    pub review_priority: String,
    pub repetitions: i32,
    pub ease_factor: f64,
    pub interval_days: i32,
    pub last_quality: Option<i32>,
    pub user_notes: Option<String>,
    pub user_tags: Json<Vec<String>>,
    pub question_title: Option<String>,
    pub question_content: Option<String>,
    pub difficulty: Option<String>,
    pub knowledge_points: Json<Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: i64,
}

impl TryFrom<WrongAnswerRow> for WrongAnswerRecord {
    type Error = ParseEnumError;

    fn try_from(row: WrongAnswerRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            question_id: row.question_id,
            source: row.source.parse()?,
            source_instance_id: row.source_instance_id,
            wrong_count: row.wrong_count,
            correct_count: row.correct_count,
            last_wrong_time: row.last_wrong_time,
            last_correct_time: row.last_correct_time,
            review_status: row.review_status.parse()?,
            next_review_time: row.next_review_time,
            review_priority: row.review_priority.parse()?,
            repetitions: row.repetitions,
            ease_factor: row.ease_factor,
            interval_days: row.interval_days,
            last_quality: row.last_quality,
            user_notes: row.user_notes,
            user_tags: row.user_tags.0,
            question_title: row.question_title,
            question_content: row.question_content,
            // Unknown legacy values are treated as absent rather than failing the row.
            difficulty: row.difficulty.as_deref().and_then(|d| d.parse().ok()),
            knowledge_points: row.knowledge_points.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
            version: row.version,
        })
    }
}

/// A validated answer outcome, ready for the review service.
#[derive(Debug, Clone)]
pub struct NewOutcome {
    pub question_id: i64,
    pub source: AnswerSource,
    pub source_instance_id: Option<String>,
    pub is_correct: bool,
    pub difficulty: Option<Difficulty>,
    pub question_title: Option<String>,
    pub question_content: Option<String>,
    pub knowledge_points: Vec<String>,
    pub user_tags: Vec<String>,
}

/// DTO for recording an answer outcome.
#[derive(Debug, Deserialize, Validate)]
pub struct RecordOutcomeRequest {
    #[validate(range(min = 1, message = "question_id must be positive"))]
    pub question_id: i64,
    pub source: AnswerSource,
    #[validate(length(max = 128))]
    pub source_instance_id: Option<String>,
    #[validate(required(message = "is_correct is required"))]
    pub is_correct: Option<bool>,
    pub difficulty: Option<Difficulty>,
    #[validate(length(max = 500))]
    pub question_title: Option<String>,
    #[validate(length(max = 10000))]
    pub question_content: Option<String>,
    #[serde(default)]
    #[validate(length(max = 50))]
    pub knowledge_points: Vec<String>,
    #[serde(default)]
    #[validate(length(max = 50))]
    pub user_tags: Vec<String>,
}

impl RecordOutcomeRequest {
    /// Consumes a request that already passed `validate()`.
    pub fn into_outcome(self) -> Option<NewOutcome> {
        Some(NewOutcome {
            question_id: self.question_id,
            source: self.source,
            source_instance_id: self.source_instance_id,
            is_correct: self.is_correct?,
            difficulty: self.difficulty,
            question_title: self.question_title,
            question_content: self.question_content,
            knowledge_points: self.knowledge_points,
            user_tags: self.user_tags,
        })
    }
}

/// Optional list filters.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct RecordFilter {
    pub status: Option<ReviewStatus>,
    pub source: Option<AnswerSource>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct NotesUpdateRequest {
    #[validate(length(max = 5000))]
    pub notes: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct TagsUpdateRequest {
    #[validate(length(max = 50))]
    pub tags: Vec<String>,
}
