// src/services/statistics.rs

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Local, TimeZone, Utc};

use crate::models::{
    statistics::{WrongAnswerAnalytics, WrongAnswerStatistics},
    wrong_answer::{AnswerSource, Difficulty, ReviewStatus, WrongAnswerRecord},
};

pub const DEFAULT_ANALYTICS_DAYS: i64 = 30;
pub const MAX_ANALYTICS_DAYS: i64 = 365;
const WEEK_DAYS: i64 = 7;
const UNKNOWN: &str = "unknown";

fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (part as f64 / total as f64 * 10_000.0).round() / 100.0
}

fn count_status(records: &[WrongAnswerRecord], status: ReviewStatus) -> usize {
    records.iter().filter(|r| r.review_status == status).count()
}

/// True when `time` falls on the same calendar day as `now` in `tz`.
fn same_day<Tz: TimeZone>(time: DateTime<Utc>, now: DateTime<Utc>, tz: &Tz) -> bool {
    time.with_timezone(tz).date_naive() == now.with_timezone(tz).date_naive()
}

/// Per-user counters. "Today" is the server's local calendar day.
pub fn statistics(
    user_id: i64,
    records: &[WrongAnswerRecord],
    now: DateTime<Utc>,
) -> WrongAnswerStatistics {
    statistics_in(user_id, records, now, &Local)
}

pub fn statistics_in<Tz: TimeZone>(
    user_id: i64,
    records: &[WrongAnswerRecord],
    now: DateTime<Utc>,
    tz: &Tz,
) -> WrongAnswerStatistics {
    let total = records.len();
    let mastered = count_status(records, ReviewStatus::Mastered);

    let mut count_by_source: BTreeMap<String, usize> = AnswerSource::ALL
        .iter()
        .map(|s| (s.as_str().to_string(), 0))
        .collect();
    let mut count_by_difficulty: BTreeMap<String, usize> = Difficulty::ALL
        .iter()
        .map(|d| (d.as_str().to_string(), 0))
        .collect();

    for record in records {
        *count_by_source
            .entry(record.source.as_str().to_string())
            .or_default() += 1;
        if let Some(difficulty) = record.difficulty {
            *count_by_difficulty
                .entry(difficulty.as_str().to_string())
                .or_default() += 1;
        }
    }

    let today_count = records
        .iter()
        .filter(|r| {
            [r.last_wrong_time, r.last_correct_time]
                .into_iter()
                .flatten()
                .any(|t| same_day(t, now, tz))
        })
        .count();

    WrongAnswerStatistics {
        user_id,
        total_wrong_count: total,
        mastered_count: mastered,
        reviewing_count: count_status(records, ReviewStatus::Reviewing),
        unreviewed_count: count_status(records, ReviewStatus::Unreviewed),
        mastered_percentage: percentage(mastered, total),
        count_by_source,
        count_by_difficulty,
        today_count,
    }
}

/// Activity over the last `days`. Status counts and distributions cover every
/// record; only `recent_count` and `mastery_rate` are windowed.
pub fn analytics(records: &[WrongAnswerRecord], days: i64, now: DateTime<Utc>) -> WrongAnswerAnalytics {
    let window_start = now - Duration::days(days);
    let week_start = now - Duration::days(WEEK_DAYS);

    let recent: Vec<&WrongAnswerRecord> = records
        .iter()
        .filter(|r| r.updated_at > window_start)
        .collect();
    let recent_mastered = recent
        .iter()
        .filter(|r| r.review_status == ReviewStatus::Mastered)
        .count();

    let mut source_distribution = BTreeMap::new();
    let mut difficulty_distribution = BTreeMap::new();
    for record in records {
        *source_distribution
            .entry(record.source.as_str().to_string())
            .or_insert(0) += 1;
        let difficulty = record.difficulty.map_or(UNKNOWN, |d| d.as_str());
        *difficulty_distribution
            .entry(difficulty.to_string())
            .or_insert(0) += 1;
    }

    WrongAnswerAnalytics {
        window_days: days,
        total_wrong_answers: records.len(),
        mastered_count: count_status(records, ReviewStatus::Mastered),
        reviewing_count: count_status(records, ReviewStatus::Reviewing),
        unreviewed_count: count_status(records, ReviewStatus::Unreviewed),
        recent_count: recent.len(),
        mastery_rate: percentage(recent_mastered, recent.len()),
        weekly_review_count: records.iter().filter(|r| r.updated_at > week_start).count(),
        source_distribution,
        difficulty_distribution,
    }
}
