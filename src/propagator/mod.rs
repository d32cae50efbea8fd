//! The dynamics-model seam: anything that can produce an inertial
//! position/velocity at an epoch, plus the SGP4-backed default.

mod error;

pub use error::PropagationError;

use std::sync::Arc;

use nalgebra::Vector3;
use sgp4::{Constants, Elements};

use crate::coords::{self, EarthShape, Geodetic};
use crate::Epoch;

/// Source of inertial (TEME) state.
///
/// A propagation failure (orbital decay past the element set's validity,
/// unrepresentable epoch) is surfaced as an error naming the epoch; it is
/// never substituted with a default state.
pub trait Propagator {
    fn eci_state(&self, epoch: Epoch) -> Result<(Vector3<f64>, Vector3<f64>), PropagationError>;
}

impl<P: Propagator + ?Sized> Propagator for &P {
    fn eci_state(&self, epoch: Epoch) -> Result<(Vector3<f64>, Vector3<f64>), PropagationError> {
        (**self).eci_state(epoch)
    }
}

impl<P: Propagator + ?Sized> Propagator for Arc<P> {
    fn eci_state(&self, epoch: Epoch) -> Result<(Vector3<f64>, Vector3<f64>), PropagationError> {
        (**self).eci_state(epoch)
    }
}

/// SGP4 propagation of a two-line element set.
pub struct TlePropagator {
    elements: Elements,
    constants: Constants,
}

impl TlePropagator {
    pub fn from_tle(line1: &str, line2: &str) -> Result<Self, PropagationError> {
        let elements = Elements::from_tle(None, line1.as_bytes(), line2.as_bytes())
            .map_err(|e| PropagationError::InvalidTle(e.to_string()))?;
        let constants = Constants::from_elements(&elements)
            .map_err(|e| PropagationError::InvalidTle(e.to_string()))?;
        Ok(Self {
            elements,
            constants,
        })
    }

    /// Ground-observable coordinates of the propagated state at `epoch`.
    pub fn geodetic_at(&self, epoch: Epoch, shape: EarthShape) -> Result<Geodetic, PropagationError> {
        let (position, _) = self.eci_state(epoch)?;
        let earth_fixed = coords::inertial_to_earth_fixed(&position, epoch);
        Ok(coords::earth_fixed_to_geodetic(&earth_fixed, shape))
    }

    /// Samples the propagated state over a fixed-step grid from `start` to
    /// `end` (exclusive). Aborts on the first failing epoch. A non-positive
    /// `dt` is rejected up front, since the grid would never reach `end`.
    pub fn sample_range(
        &self,
        start: Epoch,
        end: Epoch,
        dt: f64,
    ) -> Result<Vec<(Epoch, Vector3<f64>, Vector3<f64>)>, PropagationError> {
        if !(dt > 0.0) {
            return Err(PropagationError::InvalidStep { dt });
        }
        let mut samples = Vec::new();
        let mut step = 0usize;
        loop {
            let epoch = start + step as f64 * dt;
            if epoch >= end {
                break;
            }
            let (position, velocity) = self.eci_state(epoch)?;
            samples.push((epoch, position, velocity));
            step += 1;
        }
        Ok(samples)
    }
}

impl Propagator for TlePropagator {
    fn eci_state(&self, epoch: Epoch) -> Result<(Vector3<f64>, Vector3<f64>), PropagationError> {
        let datetime = epoch
            .datetime()
            .ok_or(PropagationError::EpochOutOfRange { epoch })?;
        let minutes = self
            .elements
            .datetime_to_minutes_since_epoch(&datetime.naive_utc())
            .map_err(|e| PropagationError::Propagation {
                epoch,
                message: e.to_string(),
            })?;
        let prediction =
            self.constants
                .propagate(minutes)
                .map_err(|e| PropagationError::Propagation {
                    epoch,
                    message: e.to_string(),
                })?;
        Ok((
            Vector3::from(prediction.position),
            Vector3::from(prediction.velocity),
        ))
    }
}
