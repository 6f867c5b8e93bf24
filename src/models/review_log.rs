// src/models/review_log.rs

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::wrong_answer::{ParseEnumError, ReviewStatus};

/// Outcome of one explicit review.
///
/// `mastered` is accepted as an alias of `pass`, and `partial` as an alias of `doubt`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewResult {
    Pass,
    Fail,
    Doubt,
}

impl ReviewResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Fail => "fail",
            Self::Doubt => "doubt",
        }
    }

    pub fn is_correct(&self) -> bool {
        matches!(self, Self::Pass)
    }
}

impl FromStr for ReviewResult {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pass" | "mastered" => Ok(Self::Pass),
            "doubt" | "partial" => Ok(Self::Doubt),
            "fail" => Ok(Self::Fail),
            _ => Err(ParseEnumError {
                kind: "review result",
                value: s.to_string(),
            }),
        }
    }
}

/// Immutable audit entry written together with the record update of a review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewLog {
    pub id: i64,
    pub user_id: i64,
    pub wrong_answer_id: i64,
    pub result: ReviewResult,
    pub time_spent_sec: i32,
    pub previous_status: ReviewStatus,
    pub new_status: ReviewStatus,
    pub notes: Option<String>,
    pub review_at: DateTime<Utc>,
}

/// A log entry before the store assigns its id.
#[derive(Debug, Clone)]
pub struct NewReviewLog {
    pub user_id: i64,
    pub wrong_answer_id: i64,
    pub result: ReviewResult,
    pub time_spent_sec: i32,
    pub previous_status: ReviewStatus,
    pub new_status: ReviewStatus,
    pub notes: Option<String>,
    pub review_at: DateTime<Utc>,
}

impl NewReviewLog {
    pub fn into_log(self, id: i64) -> ReviewLog {
        ReviewLog {
            id,
            user_id: self.user_id,
            wrong_answer_id: self.wrong_answer_id,
            result: self.result,
            time_spent_sec: self.time_spent_sec,
            previous_status: self.previous_status,
            new_status: self.new_status,
            notes: self.notes,
            review_at: self.review_at,
        }
    }
}

/// Raw `wrong_answer_review_logs` row.
#[derive(Debug, FromRow)]
pub struct ReviewLogRow {
    pub id: i64,
    pub user_id: i64,
    pub wrong_answer_id: i64,
    pub result: String,
    pub time_spent_sec: i32,
    pub previous_status: String,
    pub new_status: String,
    pub notes: Option<String>,
    pub review_at: DateTime<Utc>,
}

impl TryFrom<ReviewLogRow> for ReviewLog {
    type Error = ParseEnumError;

    fn try_from(row: ReviewLogRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            wrong_answer_id: row.wrong_answer_id,
            result: row.result.parse()?,
            time_spent_sec: row.time_spent_sec,
            previous_status: row.previous_status.parse()?,
            new_status: row.new_status.parse()?,
            notes: row.notes,
            review_at: row.review_at,
        })
    }
}

/// DTO for one explicit review. A missing `result` is recorded as a failed recall.
#[derive(Debug, Deserialize, Validate)]
pub struct ReviewRequest {
    #[validate(length(min = 1, max = 20))]
    pub result: Option<String>,
    #[validate(range(min = 0, max = 86400))]
    pub time_spent_sec: Option<i32>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

/// A parsed review, ready for the review service.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewInput {
    pub result: ReviewResult,
    pub time_spent_sec: i32,
    pub notes: Option<String>,
}

impl TryFrom<ReviewRequest> for ReviewInput {
    type Error = ParseEnumError;

    fn try_from(req: ReviewRequest) -> Result<Self, Self::Error> {
        let result = match req.result.as_deref() {
            Some(raw) => raw.parse()?,
            None => ReviewResult::Fail,
        };
        Ok(Self {
            result,
            time_spent_sec: req.time_spent_sec.unwrap_or(0),
            notes: req.notes,
        })
    }
}

/// Query string for the paged review log.
#[derive(Debug, Default, Deserialize)]
pub struct LogQueryParams {
    pub page: Option<i64>,
    pub size: Option<i64>,
    pub result: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

/// Normalized log query handed to the store.
#[derive(Debug, Clone, PartialEq)]
pub struct LogQuery {
    pub result: Option<ReviewResult>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub page: i64,
    pub size: i64,
}

impl LogQuery {
    pub const DEFAULT_SIZE: i64 = 20;
    pub const MAX_SIZE: i64 = 200;

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.size
    }
}

impl Default for LogQuery {
    fn default() -> Self {
        Self {
            result: None,
            from: None,
            to: None,
            page: 1,
            size: Self::DEFAULT_SIZE,
        }
    }
}

impl TryFrom<LogQueryParams> for LogQuery {
    type Error = ParseEnumError;

    fn try_from(params: LogQueryParams) -> Result<Self, Self::Error> {
        let page = params.page.filter(|p| *p >= 1).unwrap_or(1);
        let size = params
            .size
            .filter(|s| (1..=Self::MAX_SIZE).contains(s))
            .unwrap_or(Self::DEFAULT_SIZE);
        let result = params.result.as_deref().map(str::parse).transpose()?;

        Ok(Self {
            result,
            from: params.from,
            to: params.to,
            page,
            size,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub size: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_aliases_collapse() {
        assert_eq!("MASTERED".parse::<ReviewResult>().unwrap(), ReviewResult::Pass);
        assert_eq!("partial".parse::<ReviewResult>().unwrap(), ReviewResult::Doubt);
        assert!("maybe".parse::<ReviewResult>().is_err());
    }

    #[test]
    fn log_query_clamps_paging() {
        let query = LogQuery::try_from(LogQueryParams {
            page: Some(0),
            size: Some(500),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(query.page, 1);
        assert_eq!(query.size, LogQuery::DEFAULT_SIZE);

        let query = LogQuery::try_from(LogQueryParams {
            page: Some(3),
            size: Some(10),
            result: Some("fail".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(query.offset(), 20);
        assert_eq!(query.result, Some(ReviewResult::Fail));
    }

    #[test]
    fn missing_result_counts_as_fail() {
        let input = ReviewInput::try_from(ReviewRequest {
            result: None,
            time_spent_sec: None,
            notes: None,
        })
        .unwrap();
        assert_eq!(input.result, ReviewResult::Fail);
        assert_eq!(input.time_spent_sec, 0);

        let bad = ReviewInput::try_from(ReviewRequest {
            result: Some("sorta".into()),
            time_spent_sec: Some(30),
            notes: None,
        });
        assert!(bad.is_err());
    }
}
