//! Detection of epochs where a satellite's ground track falls within a
//! tolerance of a fixed ground location.

mod error;

pub use error::PassError;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::coords::{self, EarthShape, WGS84_A_KM, WGS84_F};
use crate::propagator::Propagator;
use crate::Epoch;

/// Sample count used by [`PassPredictor::find_passes_default`].
pub const DEFAULT_SAMPLE_COUNT: usize = 1000;

/// A fixed observation point on the ground.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GroundLocation {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub altitude_km: f64,
}

impl GroundLocation {
    pub fn new(latitude_deg: f64, longitude_deg: f64, altitude_km: f64) -> Self {
        Self {
            latitude_deg,
            longitude_deg,
            altitude_km,
        }
    }

    pub fn lat_rad(&self) -> f64 {
        self.latitude_deg.to_radians()
    }

    pub fn lon_rad(&self) -> f64 {
        self.longitude_deg.to_radians()
    }

    /// WGS-84 Earth-fixed Cartesian position, km.
    pub fn position_ecef_km(&self) -> Vector3<f64> {
        let e2 = WGS84_F * (2.0 - WGS84_F);
        let lat = self.lat_rad();
        let lon = self.lon_rad();
        let (sin_lat, cos_lat) = lat.sin_cos();
        let (sin_lon, cos_lon) = lon.sin_cos();
        let n = WGS84_A_KM / (1.0 - e2 * sin_lat * sin_lat).sqrt();
        Vector3::new(
            (n + self.altitude_km) * cos_lat * cos_lon,
            (n + self.altitude_km) * cos_lat * sin_lon,
            (n * (1.0 - e2) + self.altitude_km) * sin_lat,
        )
    }

    fn validate(&self) -> Result<(), PassError> {
        for (name, value) in [
            ("latitude", self.latitude_deg),
            ("longitude", self.longitude_deg),
            ("altitude", self.altitude_km),
        ] {
            if !value.is_finite() {
                return Err(PassError::InvalidGround(format!("{name} is not finite")));
            }
        }
        if self.latitude_deg.abs() > 90.0 {
            return Err(PassError::InvalidGround(format!(
                "latitude {} outside [-90, 90]",
                self.latitude_deg
            )));
        }
        Ok(())
    }
}

/// A sample epoch whose ground track satisfied the proximity test.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Pass {
    pub epoch: Epoch,
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub altitude_km: f64,
}

/// Samples a propagated trajectory and reports epochs close to a ground
/// location. Stateless between calls.
pub struct PassPredictor<P> {
    propagator: P,
    shape: EarthShape,
}

impl<P: Propagator> PassPredictor<P> {
    pub fn new(propagator: P) -> Self {
        Self {
            propagator,
            shape: EarthShape::default(),
        }
    }

    /// Selects the Earth model used for the geodetic conversion.
    pub fn with_shape(mut self, shape: EarthShape) -> Self {
        self.shape = shape;
        self
    }

    /// [`PassPredictor::find_passes`] with [`DEFAULT_SAMPLE_COUNT`] samples.
    pub fn find_passes_default(
        &self,
        ground: &GroundLocation,
        start: Epoch,
        end: Epoch,
        threshold: f64,
    ) -> Result<Vec<Pass>, PassError> {
        self.find_passes(ground, start, end, threshold, DEFAULT_SAMPLE_COUNT)
    }

    /// Samples `sample_count` epochs evenly spaced (inclusive) across
    /// `[start, end]` and reports each one whose geodetic coordinates fall
    /// within `threshold` (relative margin) of `ground`.
    ///
    /// The altitude criterion only participates when the ground altitude is
    /// non-zero, so sea-level stations are matched on latitude/longitude
    /// alone. A threshold of 0 demands an exact match; combined with a
    /// ground latitude or longitude of exactly 0 the margin collapses to
    /// zero, which is the documented degenerate behavior, not an error.
    ///
    /// Adjacent accepted samples are reported individually, never merged
    /// into windows; merging is the caller's choice.
    pub fn find_passes(
        &self,
        ground: &GroundLocation,
        start: Epoch,
        end: Epoch,
        threshold: f64,
        sample_count: usize,
    ) -> Result<Vec<Pass>, PassError> {
        ground.validate()?;

        let span_days = end - start;
        let mut passes = Vec::new();
        for sample in 0..sample_count {
            let fraction = if sample_count > 1 {
                sample as f64 / (sample_count - 1) as f64
            } else {
                0.0
            };
            let epoch = start + span_days * fraction;

            let (position, _) = self.propagator.eci_state(epoch)?;
            let earth_fixed = coords::inertial_to_earth_fixed(&position, epoch);
            let geo = coords::earth_fixed_to_geodetic(&earth_fixed, self.shape);

            let close = within(geo.latitude_deg, ground.latitude_deg, threshold)
                && within(geo.longitude_deg, ground.longitude_deg, threshold)
                && (ground.altitude_km == 0.0
                    || within(geo.altitude_km, ground.altitude_km, threshold));
            if close {
                passes.push(Pass {
                    epoch,
                    latitude_deg: geo.latitude_deg,
                    longitude_deg: geo.longitude_deg,
                    altitude_km: geo.altitude_km,
                });
            }
        }
        log::debug!(
            "{} of {} samples within threshold {threshold} of ({}, {})",
            passes.len(),
            sample_count,
            ground.latitude_deg,
            ground.longitude_deg
        );
        Ok(passes)
    }
}

/// Relative proximity test: the margin scales with the target magnitude.
fn within(value: f64, target: f64, threshold: f64) -> bool {
    (value - target).abs() <= threshold * target.abs()
}
