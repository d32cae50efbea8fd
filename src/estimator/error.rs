use thiserror::Error;

use crate::propagator::PropagationError;
use crate::Epoch;

#[derive(Debug, Error)]
pub enum EstimationError {
    #[error("propagation error: {0}")]
    Propagation(#[from] PropagationError),
    #[error("singular innovation covariance at {epoch}; check the Q/R configuration")]
    SingularInnovation { epoch: Epoch },
    #[error("step size must be positive, got {dt}")]
    InvalidStep { dt: f64 },
}
