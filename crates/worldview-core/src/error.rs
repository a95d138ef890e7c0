use std::fmt;

use thiserror::Error;

/// Which end of a causal link failed to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Cause,
    Effect,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cause => write!(f, "cause"),
            Self::Effect => write!(f, "effect"),
        }
    }
}

#[derive(Debug, Error)]
pub enum WorldviewError {
    #[error("Unknown {side} concept: {name}")]
    UnknownConcept { side: Side, name: String },

    #[error("corrupt state: {0}")]
    CorruptState(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type WorldviewResult<T> = Result<T, WorldviewError>;
