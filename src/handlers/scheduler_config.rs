// src/handlers/scheduler_config.rs

use axum::{Json, extract::State, response::IntoResponse};

use crate::{
    error::AppError,
    services::{SchedulerHandle, scheduler::SchedulerConfigUpdate},
};

pub async fn get_config(
    State(scheduler): State<SchedulerHandle>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(scheduler.snapshot().as_ref().clone()))
}

/// Admin only. Invalid fields are ignored; the response is the config now in effect.
pub async fn update_config(
    State(scheduler): State<SchedulerHandle>,
    Json(payload): Json<SchedulerConfigUpdate>,
) -> Result<impl IntoResponse, AppError> {
    let effective = scheduler.apply(&payload);
    Ok(Json(effective.as_ref().clone()))
}
