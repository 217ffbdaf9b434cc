//! Replay error types.

use thiserror::Error;

pub type ReplayResult<T> = Result<T, ReplayError>;

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("Engine error: {0}")]
    Engine(#[from] autoptz_engine::PtzError),

    #[error("Output encoding failed: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
