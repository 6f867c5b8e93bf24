// src/handlers/wrong_answers.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        statistics::{AnalyticsParams, ReviewPlanParams},
        wrong_answer::{NotesUpdateRequest, RecordFilter, RecordOutcomeRequest, TagsUpdateRequest},
    },
    services::{
        ReviewService,
        priority::DEFAULT_HOURS_PER_DAY,
        statistics::{DEFAULT_ANALYTICS_DAYS, MAX_ANALYTICS_DAYS},
    },
    utils::jwt::Claims,
};

/// Record one answer outcome for a question.
pub async fn record_outcome(
    State(reviews): State<ReviewService>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<RecordOutcomeRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }
    let user_id = claims.user_id()?;

    let outcome = payload
        .into_outcome()
        .ok_or_else(|| AppError::BadRequest("is_correct is required".to_string()))?;
    let record = reviews.record_outcome(user_id, outcome).await?;

    Ok(Json(record))
}

/// List the caller's records, optionally filtered by status and source.
pub async fn list_records(
    State(reviews): State<ReviewService>,
    Extension(claims): Extension<Claims>,
    Query(filter): Query<RecordFilter>,
) -> Result<impl IntoResponse, AppError> {
    let records = reviews.list(claims.user_id()?, &filter).await?;
    Ok(Json(records))
}

pub async fn get_record(
    State(reviews): State<ReviewService>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let record = reviews.get(claims.user_id()?, id).await?;
    Ok(Json(record))
}

pub async fn delete_record(
    State(reviews): State<ReviewService>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    reviews.delete(claims.user_id()?, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Records due now, most urgent first.
pub async fn list_due(
    State(reviews): State<ReviewService>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let due = reviews.due_for_review(claims.user_id()?).await?;
    Ok(Json(due))
}

pub async fn mark_mastered(
    State(reviews): State<ReviewService>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let record = reviews.mark_mastered(claims.user_id()?, id).await?;
    Ok(Json(record))
}

pub async fn mark_reviewing(
    State(reviews): State<ReviewService>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let record = reviews.mark_reviewing(claims.user_id()?, id).await?;
    Ok(Json(record))
}

pub async fn update_notes(
    State(reviews): State<ReviewService>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<NotesUpdateRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let record = reviews
        .update_notes(claims.user_id()?, id, &payload.notes)
        .await?;
    Ok(Json(record))
}

pub async fn update_tags(
    State(reviews): State<ReviewService>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<TagsUpdateRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let record = reviews
        .update_tags(claims.user_id()?, id, payload.tags)
        .await?;
    Ok(Json(record))
}

pub async fn get_statistics(
    State(reviews): State<ReviewService>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let stats = reviews.statistics(claims.user_id()?).await?;
    Ok(Json(stats))
}

pub async fn get_analytics(
    State(reviews): State<ReviewService>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<AnalyticsParams>,
) -> Result<impl IntoResponse, AppError> {
    let days = params.days.unwrap_or(DEFAULT_ANALYTICS_DAYS);
    if !(1..=MAX_ANALYTICS_DAYS).contains(&days) {
        return Err(AppError::BadRequest(format!(
            "days must be between 1 and {}",
            MAX_ANALYTICS_DAYS
        )));
    }

    let analytics = reviews.analytics(claims.user_id()?, days).await?;
    Ok(Json(analytics))
}

/// Priority summary, suggested daily volume and today's queue.
pub async fn get_review_plan(
    State(reviews): State<ReviewService>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<ReviewPlanParams>,
) -> Result<impl IntoResponse, AppError> {
    let hours = params.hours_per_day.unwrap_or(DEFAULT_HOURS_PER_DAY);
    if !hours.is_finite() || hours <= 0.0 || hours > 24.0 {
        return Err(AppError::BadRequest(
            "hours_per_day must be greater than 0 and at most 24".to_string(),
        ));
    }

    let overview = reviews.review_plan_overview(claims.user_id()?, hours).await?;
    Ok(Json(overview))
}

/// Reschedule every open record with the current strategy.
pub async fn generate_review_plan(
    State(reviews): State<ReviewService>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let rescheduled = reviews.generate_review_plan(claims.user_id()?).await?;
    Ok(Json(json!({ "rescheduled": rescheduled })))
}
