// src/services/mod.rs

pub mod analysis;
pub mod batch;
pub mod priority;
pub mod review;
pub mod scheduler;
pub mod statistics;

pub use analysis::{AnalysisExecutor, AnalysisProvider, HeuristicAnalyzer};
pub use review::ReviewService;
pub use scheduler::{SchedulerConfig, SchedulerHandle};
