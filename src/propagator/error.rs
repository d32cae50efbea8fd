use thiserror::Error;

use crate::Epoch;

#[derive(Debug, Error)]
pub enum PropagationError {
    #[error("invalid tle: {0}")]
    InvalidTle(String),
    #[error("propagation failed at {epoch}: {message}")]
    Propagation { epoch: Epoch, message: String },
    #[error("epoch {epoch} is outside the representable datetime range")]
    EpochOutOfRange { epoch: Epoch },
    #[error("step size must be positive, got {dt}")]
    InvalidStep { dt: f64 },
}

impl PropagationError {
    /// The epoch at which propagation failed, when one is attached.
    pub fn epoch(&self) -> Option<Epoch> {
        match self {
            PropagationError::InvalidTle(_) | PropagationError::InvalidStep { .. } => None,
            PropagationError::Propagation { epoch, .. }
            | PropagationError::EpochOutOfRange { epoch } => Some(*epoch),
        }
    }
}
