use thiserror::Error;

use crate::propagator::PropagationError;

#[derive(Debug, Error)]
pub enum PassError {
    #[error("invalid ground location: {0}")]
    InvalidGround(String),
    #[error("propagation error: {0}")]
    Propagation(#[from] PropagationError),
}
