//! Error taxonomy for the simulation kernel (spec.md §7).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProximaError {
    #[error("config error: {0}")]
    Config(String),

    #[error("commit overdraft: sector {sector} resource {resource} would go to {would_be}")]
    CommitOverdraft {
        sector: String,
        resource: String,
        would_be: f64,
    },

    #[error("event delivery error on topic {topic}: {source}")]
    EventDelivery { topic: String, source: String },

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
}

pub type Result<T> = std::result::Result<T, ProximaError>;
