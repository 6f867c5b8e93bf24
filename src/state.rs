// src/state.rs

use std::sync::Arc;

use axum::extract::FromRef;

use crate::{
    config::Config,
    db::ReviewStore,
    services::{AnalysisExecutor, HeuristicAnalyzer, ReviewService, SchedulerHandle},
};

#[derive(Clone)]
pub struct AppState {
    pub reviews: ReviewService,
    pub config: Config,
}

impl AppState {
    /// Wires the review service over `store` with the heuristic analyzer.
    pub fn new(store: Arc<dyn ReviewStore>, config: Config) -> Self {
        let scheduler = SchedulerHandle::new(config.scheduler.clone());
        let analysis = AnalysisExecutor::new(
            Arc::new(HeuristicAnalyzer),
            config.analysis_workers,
            config.analysis_timeout,
        );
        Self {
            reviews: ReviewService::new(store, scheduler, analysis),
            config,
        }
    }
}

impl FromRef<AppState> for ReviewService {
    fn from_ref(state: &AppState) -> Self {
        state.reviews.clone()
    }
}

impl FromRef<AppState> for SchedulerHandle {
    fn from_ref(state: &AppState) -> Self {
        state.reviews.scheduler().clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
