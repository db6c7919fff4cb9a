use rust_decimal::Decimal;
use thiserror::Error;

use super::models::JobStatus;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("insufficient balance: {required} required, {available} available")]
    InsufficientBalance {
        required: Decimal,
        available: Decimal,
    },

    #[error("no employer profile loaded")]
    NoEmployerProfile,

    #[error("job belongs to employer {draft}, session employer is {session}")]
    EmployerMismatch { draft: String, session: String },

    #[error("employer profile {0} is already registered")]
    EmployerAlreadyRegistered(String),

    #[error("{count} candidates selected, limit is {limit}")]
    TooManyCandidates { count: usize, limit: usize },

    #[error("job not found: {0}")]
    JobNotFound(String),

    #[error("job {job_id} cannot move from {from} to {to}")]
    InvalidTransition {
        job_id: String,
        from: JobStatus,
        to: JobStatus,
    },

    #[error("persistence failure: {0}")]
    PersistenceFailure(#[from] StoreError),

    #[error("corrupt record {key}: {source}")]
    CorruptRecord {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
