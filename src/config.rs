//! Runtime configuration, read from the environment (spec.md §6).

use lazy_static::lazy_static;

#[derive(Debug, Clone)]
pub struct Config {
    pub experiment_id: String,
    pub db_uri: String,
    pub update_rate_ms: u64,
    pub update_cycles: Option<u64>,
    pub read_only: bool,
    pub commit_mode: CommitMode,
    pub max_backlog_age_steps: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitMode {
    Strict,
    Lenient,
}

lazy_static! {
    pub static ref CONFIG: Config = {
        let experiment_id =
            std::env::var("EXPERIMENT_ID").unwrap_or_else(|_| "default-experiment".to_string());
        let db_uri = std::env::var("DB_URI").unwrap_or_else(|_| "postgres://localhost/proxima".to_string());
        let update_rate_ms = std::env::var("UPDATE_RATE_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        let update_cycles = std::env::var("UPDATE_CYCLES")
            .ok()
            .and_then(|v| v.parse().ok());
        let read_only = std::env::var("READ_ONLY")
            .map(|val| val == "1")
            .unwrap_or(false);
        let commit_mode = match std::env::var("COMMIT_MODE").as_deref() {
            Ok("lenient") => CommitMode::Lenient,
            _ => CommitMode::Strict,
        };
        let max_backlog_age_steps = std::env::var("MAX_BACKLOG_AGE_STEPS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(500);
        Config {
            experiment_id,
            db_uri,
            update_rate_ms,
            update_cycles,
            read_only,
            commit_mode,
            max_backlog_age_steps,
        }
    };
}
