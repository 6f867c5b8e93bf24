// src/handlers/mod.rs

pub mod analysis;
pub mod batch;
pub mod reviews;
pub mod scheduler_config;
pub mod wrong_answers;
