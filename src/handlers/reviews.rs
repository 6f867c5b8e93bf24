// src/handlers/reviews.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    error::AppError,
    models::review_log::{LogQuery, LogQueryParams, ReviewInput, ReviewRequest},
    services::ReviewService,
    utils::jwt::Claims,
};

/// Apply one explicit review (`pass`, `fail` or `doubt`) and log it.
pub async fn review_once(
    State(reviews): State<ReviewService>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<ReviewRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }
    let user_id = claims.user_id()?;

    let input = ReviewInput::try_from(payload)?;
    let record = reviews.review_once(user_id, id, input).await?;

    Ok(Json(record))
}

/// Paged review history of one record, newest first.
pub async fn list_logs(
    State(reviews): State<ReviewService>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Query(params): Query<LogQueryParams>,
) -> Result<impl IntoResponse, AppError> {
    let query = LogQuery::try_from(params)?;
    let page = reviews.review_logs(claims.user_id()?, id, &query).await?;
    Ok(Json(page))
}
