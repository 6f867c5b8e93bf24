// src/models/mod.rs

pub mod analysis;
pub mod batch;
pub mod review_log;
pub mod statistics;
pub mod wrong_answer;
