//! Error taxonomy for the grid trading core
//!
//! `NotFound` variants surface unresolved ids to the caller; `InvalidArgument`
//! rejects bad input before any mutation. Insufficient funds and the 19-band
//! ceiling are not errors; they silently end the buy pass inside the engine.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GridError {
    #[error("strategy not found: {0}")]
    StrategyNotFound(i64),

    #[error("band not found: strategy {strategy_id}, level {level}")]
    BandNotFound { strategy_id: i64, level: u8 },

    #[error("fill not found: {0}")]
    FillNotFound(i64),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl GridError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        GridError::InvalidArgument(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, GridError>;
