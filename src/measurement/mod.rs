//! Measurement sources feeding the estimator's update step.

use nalgebra::Vector3;
use rand::Rng;
use rand_distr::StandardNormal;

use crate::propagator::{PropagationError, Propagator};
use crate::Epoch;

/// Default 1-sigma of the synthetic GPS perturbation, applied to every
/// state component independently.
pub const DEFAULT_GPS_STD_DEV: f64 = 25.0;

/// Produces a position/velocity observation at an epoch.
///
/// A failure of the underlying propagator propagates unchanged.
pub trait MeasurementSource {
    fn measurement_at(
        &self,
        epoch: Epoch,
    ) -> Result<(Vector3<f64>, Vector3<f64>), PropagationError>;
}

/// Forwards the propagator's output untouched. Useful as a noise-free
/// reference source.
pub struct GroundTruthGps<P> {
    propagator: P,
}

impl<P> GroundTruthGps<P> {
    pub fn new(propagator: P) -> Self {
        Self { propagator }
    }
}

impl<P: Propagator> MeasurementSource for GroundTruthGps<P> {
    fn measurement_at(
        &self,
        epoch: Epoch,
    ) -> Result<(Vector3<f64>, Vector3<f64>), PropagationError> {
        self.propagator.eci_state(epoch)
    }
}

/// Simulates a GPS receiver by perturbing the propagated state with
/// independent zero-mean Gaussian noise on all six components.
///
/// Every call draws fresh noise from the thread-local generator; no seed
/// state is kept on the source itself.
pub struct NoisyGps<P> {
    propagator: P,
    std_dev: f64,
}

impl<P> NoisyGps<P> {
    pub fn new(propagator: P) -> Self {
        Self::with_std_dev(propagator, DEFAULT_GPS_STD_DEV)
    }

    pub fn with_std_dev(propagator: P, std_dev: f64) -> Self {
        Self { propagator, std_dev }
    }
}

impl<P: Propagator> MeasurementSource for NoisyGps<P> {
    fn measurement_at(
        &self,
        epoch: Epoch,
    ) -> Result<(Vector3<f64>, Vector3<f64>), PropagationError> {
        let (position, velocity) = self.propagator.eci_state(epoch)?;
        let mut rng = rand::thread_rng();
        let mut jitter = |component: f64| {
            component + rng.sample::<f64, _>(StandardNormal) * self.std_dev
        };
        Ok((position.map(&mut jitter), velocity.map(&mut jitter)))
    }
}
