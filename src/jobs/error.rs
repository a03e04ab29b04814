use thiserror::Error;

use super::state::JobPhase;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum JobError {
    #[error("job already exists: {0}")]
    Duplicate(String),

    #[error("job not found: {0}")]
    NotFound(String),

    #[error("job {id}: illegal transition {from} -> {to}")]
    IllegalTransition {
        id: String,
        from: JobPhase,
        to: JobPhase,
    },
}

pub type Result<T> = std::result::Result<T, JobError>;
