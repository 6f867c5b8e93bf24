// src/handlers/analysis.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    error::AppError, models::analysis::BatchAnalysisRequest, services::ReviewService,
    utils::jwt::Claims,
};

pub async fn analyze_record(
    State(reviews): State<ReviewService>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let analysis = reviews.analyze(claims.user_id()?, id).await?;
    Ok(Json(analysis))
}

/// Analyses many records. Individual failures show up as `unavailable`
/// entries, never as an error response.
pub async fn analyze_batch(
    State(reviews): State<ReviewService>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<BatchAnalysisRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let report = reviews
        .analyze_many(claims.user_id()?, &payload.record_ids)
        .await;
    Ok(Json(report))
}
