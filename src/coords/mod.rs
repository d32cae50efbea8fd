//! Frame transforms between the inertial (TEME) frame, the Earth-fixed
//! (ECEF) frame and geodetic coordinates.
//!
//! All functions here are pure; both the estimator's measurement chain and
//! pass detection go through them.

use nalgebra::Vector3;
use serde::Serialize;

use crate::Epoch;

/// WGS-84 semi-major axis, km.
pub const WGS84_A_KM: f64 = 6378.137;
/// WGS-84 flattening.
pub const WGS84_F: f64 = 1.0 / 298.257223563;

const GEODETIC_TOLERANCE_RAD: f64 = 1e-10;
const GEODETIC_MAX_ITERATIONS: usize = 32;
// Below this equatorial radius (km) the point is treated as on the polar axis.
const POLAR_AXIS_RADIUS_KM: f64 = 1e-9;

/// Earth model used by the geodetic inversion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EarthShape {
    /// WGS-84 ellipsoid.
    #[default]
    Wgs84,
    /// Sphere of radius [`WGS84_A_KM`], no flattening.
    Sphere,
}

/// Geodetic coordinates with a convergence tag from the iterative inversion.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Geodetic {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    /// Height above the ellipsoid (or sphere), km.
    pub altitude_km: f64,
    /// False when the latitude iteration hit its cap before the tolerance.
    pub converged: bool,
}

/// Rotates an inertial-frame position into the Earth-fixed frame using the
/// Greenwich mean sidereal angle at `epoch`.
pub fn inertial_to_earth_fixed(position: &Vector3<f64>, epoch: Epoch) -> Vector3<f64> {
    let gmst = sidereal_angle(epoch);
    let (sin_gmst, cos_gmst) = gmst.sin_cos();
    Vector3::new(
        position.x * cos_gmst + position.y * sin_gmst,
        -position.x * sin_gmst + position.y * cos_gmst,
        position.z,
    )
}

/// Inverse of [`inertial_to_earth_fixed`].
pub fn earth_fixed_to_inertial(position: &Vector3<f64>, epoch: Epoch) -> Vector3<f64> {
    let gmst = sidereal_angle(epoch);
    let (sin_gmst, cos_gmst) = gmst.sin_cos();
    Vector3::new(
        position.x * cos_gmst - position.y * sin_gmst,
        position.x * sin_gmst + position.y * cos_gmst,
        position.z,
    )
}

/// Converts an Earth-fixed Cartesian position (km) to geodetic coordinates.
///
/// The ellipsoidal inversion iterates the latitude until successive
/// estimates differ by less than 1e-10 rad, with a hard iteration cap.
/// Non-convergence is flagged on the result and logged, not raised: it only
/// occurs under near-pole ill-conditioning where the altitude is still
/// usable. Longitude is in (-180, 180] degrees, latitude in [-90, 90].
pub fn earth_fixed_to_geodetic(position: &Vector3<f64>, shape: EarthShape) -> Geodetic {
    let r = position.xy().norm();
    let z = position.z;
    let longitude_deg = normalize_longitude(position.y.atan2(position.x).to_degrees());

    match shape {
        EarthShape::Sphere => Geodetic {
            latitude_deg: z.atan2(r).to_degrees(),
            longitude_deg,
            altitude_km: position.norm() - WGS84_A_KM,
            converged: true,
        },
        EarthShape::Wgs84 => ellipsoidal_inversion(r, z, longitude_deg),
    }
}

fn ellipsoidal_inversion(r: f64, z: f64, longitude_deg: f64) -> Geodetic {
    let e2 = WGS84_F * (2.0 - WGS84_F);

    if r < POLAR_AXIS_RADIUS_KM {
        // On the polar axis the longitude is undefined and the latitude
        // iteration would divide by zero; return the degenerate result.
        let polar_radius = WGS84_A_KM * (1.0 - WGS84_F);
        return Geodetic {
            latitude_deg: if z >= 0.0 { 90.0 } else { -90.0 },
            longitude_deg,
            altitude_km: z.abs() - polar_radius,
            converged: true,
        };
    }

    let mut latitude = z.atan2(r * (1.0 - e2));
    let mut converged = false;
    for _ in 0..GEODETIC_MAX_ITERATIONS {
        let sin_lat = latitude.sin();
        let n = WGS84_A_KM / (1.0 - e2 * sin_lat * sin_lat).sqrt();
        let next = (z + e2 * n * sin_lat).atan2(r);
        let done = (next - latitude).abs() < GEODETIC_TOLERANCE_RAD;
        latitude = next;
        if done {
            converged = true;
            break;
        }
    }
    if !converged {
        log::warn!(
            "geodetic latitude iteration unconverged after {} iterations (r={r} km, z={z} km)",
            GEODETIC_MAX_ITERATIONS
        );
    }

    let sin_lat = latitude.sin();
    let cos_lat = latitude.cos();
    let n = WGS84_A_KM / (1.0 - e2 * sin_lat * sin_lat).sqrt();
    // Near the pole cos(lat) vanishes; measure the height along z instead.
    let altitude_km = if cos_lat.abs() > 1e-10 {
        r / cos_lat - n
    } else {
        z.abs() - n * (1.0 - e2)
    };

    Geodetic {
        latitude_deg: latitude.to_degrees(),
        longitude_deg,
        altitude_km,
        converged,
    }
}

/// Greenwich mean sidereal angle at `epoch`, radians.
fn sidereal_angle(epoch: Epoch) -> f64 {
    sgp4::iau_epoch_to_sidereal_time(epoch.julian_years_since_j2000())
}

fn normalize_longitude(longitude_deg: f64) -> f64 {
    if longitude_deg <= -180.0 {
        longitude_deg + 360.0
    } else {
        longitude_deg
    }
}
