use nalgebra::{Matrix3, Matrix6};

use crate::propagator::{PropagationError, Propagator};
use crate::Epoch;

/// Strategy producing the 6x6 state-transition operator linearized around
/// the trajectory at `epoch` for a step of `dt` days.
///
/// The operator is recomputed every filter step from the current epoch and
/// never cached: orbital dynamics are non-stationary, so a transition
/// matrix is only valid in the neighborhood it was derived in.
pub trait TransitionModel {
    fn estimate(&self, epoch: Epoch, dt: f64) -> Result<Matrix6<f64>, PropagationError>;
}

/// Finite-difference transition model over a propagator.
///
/// Builds the block operator
///
/// ```text
/// [ I3                 I3 * dt ]
/// [ diag((p1-p2)/dt)   I3      ]
/// ```
///
/// from two propagator evaluations at `epoch` and `epoch + dt`. The
/// off-diagonal coupling is a per-axis finite-difference surrogate for the
/// velocity-position Jacobian, not a proper Jacobian; it is only usable for
/// small `dt` and is kept as-is as a documented approximation.
pub struct TleTransitionModel<P> {
    propagator: P,
}

impl<P> TleTransitionModel<P> {
    pub fn new(propagator: P) -> Self {
        Self { propagator }
    }
}

impl<P: Propagator> TransitionModel for TleTransitionModel<P> {
    fn estimate(&self, epoch: Epoch, dt: f64) -> Result<Matrix6<f64>, PropagationError> {
        let (p1, _) = self.propagator.eci_state(epoch)?;
        let (p2, _) = self.propagator.eci_state(epoch + dt)?;

        let mut a = Matrix6::zeros();
        a.fixed_view_mut::<3, 3>(0, 0)
            .copy_from(&Matrix3::identity());
        a.fixed_view_mut::<3, 3>(0, 3)
            .copy_from(&(Matrix3::identity() * dt));
        a.fixed_view_mut::<3, 3>(3, 0)
            .copy_from(&Matrix3::from_diagonal(&((p1 - p2) / dt)));
        a.fixed_view_mut::<3, 3>(3, 3)
            .copy_from(&Matrix3::identity());
        Ok(a)
    }
}
