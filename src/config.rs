// src/config.rs

use std::{env, time::Duration};

use dotenvy::dotenv;

use crate::services::{SchedulerConfig, analysis};

#[derive(Debug, Clone)]
pub struct Config {
    /// Without a database URL the service runs on the in-memory store.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub server_port: u16,
    /// Initial scheduler snapshot. Runtime changes go through `SchedulerHandle`.
    pub scheduler: SchedulerConfig,
    pub analysis_workers: usize,
    pub analysis_timeout: Duration,
}

fn parsed_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").ok().filter(|v| !v.is_empty());

        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let scheduler = SchedulerConfig::from_raw(
            env::var("WRONG_ANSWERS_SCHEDULER").ok().as_deref(),
            env::var("WRONG_ANSWERS_FSRS_ALPHA").ok().as_deref(),
        );

        Self {
            database_url,
            jwt_secret,
            jwt_expiration: parsed_or("JWT_EXPIRATION", 86_400),
            rust_log,
            server_port: parsed_or("SERVER_PORT", 3000),
            scheduler,
            analysis_workers: parsed_or("ANALYSIS_WORKERS", analysis::DEFAULT_WORKERS),
            analysis_timeout: Duration::from_secs(parsed_or(
                "ANALYSIS_TIMEOUT_SECS",
                analysis::DEFAULT_TASK_TIMEOUT.as_secs(),
            )),
        }
    }

    /// Settings for tests and embedding: in-memory store, default scheduler.
    pub fn for_secret(jwt_secret: impl Into<String>) -> Self {
        Self {
            database_url: None,
            jwt_secret: jwt_secret.into(),
            jwt_expiration: 86_400,
            rust_log: "info".to_string(),
            server_port: 0,
            scheduler: SchedulerConfig::default(),
            analysis_workers: analysis::DEFAULT_WORKERS,
            analysis_timeout: analysis::DEFAULT_TASK_TIMEOUT,
        }
    }
}
