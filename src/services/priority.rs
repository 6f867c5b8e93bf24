// src/services/priority.rs

use chrono::{DateTime, Utc};

use crate::models::{
    statistics::{PrioritySummary, RankedRecord},
    wrong_answer::{Difficulty, ReviewPriority, ReviewStatus, WrongAnswerRecord},
};

/// Score from which a record counts as overdue in a [`PrioritySummary`].
pub const OVERDUE_SCORE: i64 = 200;
/// Queue size suggested before the user has any records.
pub const DEFAULT_DAILY_COUNT: usize = 10;
pub const DEFAULT_HOURS_PER_DAY: f64 = 1.0;
const MINUTES_PER_QUESTION: f64 = 2.0;

pub fn difficulty_score(difficulty: Option<Difficulty>) -> i64 {
    match difficulty {
        Some(Difficulty::Easy) => 2,
        Some(Difficulty::Hard) => 10,
        _ => 5,
    }
}

/// Whole days past `next_review_time`, 0 when not yet due or never scheduled.
pub fn overdue_days(record: &WrongAnswerRecord, now: DateTime<Utc>) -> i64 {
    record
        .next_review_time
        .map(|next| (now - next).num_days().max(0))
        .unwrap_or(0)
}

pub fn priority_score(record: &WrongAnswerRecord, now: DateTime<Utc>) -> i64 {
    let score = overdue_days(record, now) * 100
        + i64::from(record.wrong_count) * 50
        + difficulty_score(record.difficulty) * 30
        - i64::from(record.correct_count) * 10;
    score.max(0)
}

/// Coarse label for UI grouping. Independent of [`priority_score`].
pub fn priority_label(record: &WrongAnswerRecord) -> ReviewPriority {
    if record.wrong_count >= 3 || record.difficulty == Some(Difficulty::Hard) {
        ReviewPriority::High
    } else if record.wrong_count >= 2 {
        ReviewPriority::Medium
    } else {
        ReviewPriority::Low
    }
}

pub fn assess(record: &WrongAnswerRecord, now: DateTime<Utc>) -> (i64, ReviewPriority) {
    (priority_score(record, now), priority_label(record))
}

/// Highest score first. The sort is stable, so equal scores keep their input order.
pub fn sort_by_priority(records: Vec<WrongAnswerRecord>, now: DateTime<Utc>) -> Vec<RankedRecord> {
    let mut ranked: Vec<RankedRecord> = records
        .into_iter()
        .map(|record| RankedRecord {
            priority_score: priority_score(&record, now),
            record,
        })
        .collect();
    ranked.sort_by(|a, b| b.priority_score.cmp(&a.priority_score));
    ranked
}

/// Percentage of correct answers, 0 without any attempt.
pub fn mastery_score(record: &WrongAnswerRecord) -> i64 {
    let attempts = i64::from(record.correct_count) + i64::from(record.wrong_count);
    if attempts <= 0 {
        return 0;
    }
    (i64::from(record.correct_count) as f64 * 100.0 / attempts as f64).round() as i64
}

pub fn mastery_band(score: i64) -> ReviewStatus {
    match score {
        s if s >= 85 => ReviewStatus::Mastered,
        s if s >= 60 => ReviewStatus::Reviewing,
        _ => ReviewStatus::Unreviewed,
    }
}

fn rounded_ratio(part: i64, total: usize) -> i64 {
    if total == 0 {
        0
    } else {
        (part as f64 / total as f64).round() as i64
    }
}

pub fn summarize(records: &[WrongAnswerRecord], now: DateTime<Utc>) -> PrioritySummary {
    let mut summary = PrioritySummary {
        total: records.len(),
        ..Default::default()
    };
    let mut priority_sum = 0;
    let mut mastery_sum = 0;

    for record in records {
        let priority = priority_score(record, now);
        let mastery = mastery_score(record);
        priority_sum += priority;
        mastery_sum += mastery;

        match mastery_band(mastery) {
            ReviewStatus::Mastered => summary.mastered += 1,
            ReviewStatus::Reviewing => summary.reviewing += 1,
            ReviewStatus::Unreviewed => summary.unreviewed += 1,
        }
        if record.is_due(now) {
            summary.next_review_count += 1;
        }
        if priority >= OVERDUE_SCORE {
            summary.overdue_count += 1;
        }
    }

    summary.mastered_percentage = rounded_ratio(summary.mastered as i64 * 100, summary.total);
    summary.average_priority = rounded_ratio(priority_sum, summary.total);
    summary.average_mastery = rounded_ratio(mastery_sum, summary.total);
    summary
}

/// Questions to review per day, assuming two minutes a question.
pub fn recommended_daily_count(summary: &PrioritySummary, hours_per_day: f64) -> usize {
    if summary.total == 0 {
        return DEFAULT_DAILY_COUNT;
    }

    let base = (hours_per_day * 60.0 / MINUTES_PER_QUESTION) as usize;
    let overdue_ratio = summary.overdue_count as f64 / summary.total as f64;
    if overdue_ratio > 0.2 {
        (base as f64 * 1.5) as usize
    } else if overdue_ratio > 0.1 {
        (base as f64 * 1.2) as usize
    } else {
        base
    }
}
