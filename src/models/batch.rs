// src/models/batch.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

/// DTO for batch status updates. `status` is parsed after validation so that
/// an invalid value fails upfront with a readable message.
#[derive(Debug, Deserialize, Validate)]
pub struct BatchStatusRequest {
    #[validate(length(
        min = 1,
        max = 500,
        message = "record_ids must contain between 1 and 500 ids"
    ))]
    pub record_ids: Vec<i64>,
    #[validate(length(min = 1, message = "status cannot be empty"))]
    pub status: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct BatchTagsRequest {
    #[validate(length(
        min = 1,
        max = 1000,
        message = "record_ids must contain between 1 and 1000 ids"
    ))]
    pub record_ids: Vec<i64>,
    #[validate(length(min = 1, max = 50, message = "tags must contain between 1 and 50 tags"))]
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct BatchIdsRequest {
    #[validate(length(
        min = 1,
        max = 1000,
        message = "record_ids must contain between 1 and 1000 ids"
    ))]
    pub record_ids: Vec<i64>,
}

/// Response body of every batch endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOperationResult {
    pub operation: String,
    pub success_count: usize,
    pub total_count: usize,
}
