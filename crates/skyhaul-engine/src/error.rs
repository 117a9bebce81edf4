//! Engine error taxonomy.
//!
//! Every user-facing failure is a typed variant the caller can render;
//! only `Db` and `Data` represent unexpected persistence failures, which
//! abort the whole operation before anything commits.

use skyhaul_core::{Cents, GroundOpsError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("not authorized: {0}")]
    Unauthorized(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Distinguishable from a hard error so callers can offer to ferry
    /// the aircraft instead of just failing the start.
    #[error("aircraft {registry} is not at origin {origin}")]
    AircraftNotAtOrigin { registry: String, origin: String },

    #[error("insufficient funds: need {needed} cents, have {available}")]
    InsufficientFunds { needed: Cents, available: Cents },

    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),

    #[error("stored data error: {0}")]
    Data(#[from] serde_json::Error),
}

impl From<GroundOpsError> for EngineError {
    fn from(err: GroundOpsError) -> Self {
        match err {
            GroundOpsError::FuelOutOfRange { .. } => EngineError::InvalidInput(err.to_string()),
            GroundOpsError::FuelNotSold { .. } => EngineError::InvalidState(err.to_string()),
            GroundOpsError::UnsupportedCategory { .. } => EngineError::InvalidState(err.to_string()),
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
