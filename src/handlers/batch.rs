// src/handlers/batch.rs

//! Best-effort batch endpoints. Once the payload validates, they always answer
//! 200 with `{operation, success_count, total_count}`.

use axum::{Extension, Json, extract::State, response::IntoResponse};
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        batch::{BatchIdsRequest, BatchStatusRequest, BatchTagsRequest},
        wrong_answer::ReviewStatus,
    },
    services::ReviewService,
    utils::jwt::Claims,
};

pub async fn update_status(
    State(reviews): State<ReviewService>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<BatchStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }
    let status: ReviewStatus = payload.status.parse()?;
    let user_id = claims.user_id()?;

    let result = reviews
        .batch_update_status(user_id, &payload.record_ids, status)
        .await;
    Ok(Json(result))
}

pub async fn add_tags(
    State(reviews): State<ReviewService>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<BatchTagsRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }
    let user_id = claims.user_id()?;

    let result = reviews
        .batch_add_tags(user_id, &payload.record_ids, &payload.tags)
        .await;
    Ok(Json(result))
}

pub async fn remove_tags(
    State(reviews): State<ReviewService>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<BatchTagsRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }
    let user_id = claims.user_id()?;

    let result = reviews
        .batch_remove_tags(user_id, &payload.record_ids, &payload.tags)
        .await;
    Ok(Json(result))
}

pub async fn delete(
    State(reviews): State<ReviewService>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<BatchIdsRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }
    let user_id = claims.user_id()?;

    let result = reviews.batch_delete(user_id, &payload.record_ids).await;
    Ok(Json(result))
}
