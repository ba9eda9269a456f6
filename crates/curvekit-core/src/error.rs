use std::collections::TryReserveError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CurveError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Out of range: {0}")]
    OutOfRange(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Unsupported type: {0}")]
    UnsupportedType(String),

    #[error("Missing feature: {0}")]
    MissingFeature(String),

    #[error("Memory error: {0}")]
    Memory(#[from] TryReserveError),

    /// Newton iteration ran out of steps; `parameter` is the last pivot.
    #[error("No convergence, last parameter {parameter}")]
    NoConvergence { parameter: f64 },
}

impl CurveError {
    /// Last pivot of a failed arc-length inversion, if that is what this is.
    pub fn last_parameter(&self) -> Option<f64> {
        match self {
            Self::NoConvergence { parameter } => Some(*parameter),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, CurveError>;
