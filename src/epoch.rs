use std::fmt;
use std::ops::{Add, Sub};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const UNIX_EPOCH_JD: f64 = 2_440_587.5;
const SECONDS_PER_DAY: f64 = 86_400.0;

/// A point in continuous time as a fractional Julian date.
///
/// All crate interfaces take and return `Epoch`; conversion from wall-clock
/// time happens once, at the system boundary, via [`Epoch::from_datetime`].
/// Day offsets are added directly: `epoch + 0.5` is twelve hours later.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Epoch(f64);

impl Epoch {
    pub fn from_julian_days(jd: f64) -> Self {
        Self(jd)
    }

    pub fn from_datetime(datetime: DateTime<Utc>) -> Self {
        let seconds =
            datetime.timestamp() as f64 + f64::from(datetime.timestamp_subsec_nanos()) * 1e-9;
        Self(UNIX_EPOCH_JD + seconds / SECONDS_PER_DAY)
    }

    pub fn julian_days(self) -> f64 {
        self.0
    }

    /// Julian years since the J2000.0 epoch, the argument expected by the
    /// IAU sidereal-time expression.
    pub fn julian_years_since_j2000(self) -> f64 {
        (self.0 - 2_451_545.0) / 365.25
    }

    /// `None` when the epoch falls outside chrono's representable range.
    pub fn datetime(self) -> Option<DateTime<Utc>> {
        let seconds = (self.0 - UNIX_EPOCH_JD) * SECONDS_PER_DAY;
        if !seconds.is_finite() {
            return None;
        }
        let whole = seconds.floor();
        let nanos = (((seconds - whole) * 1e9).round() as u32).min(999_999_999);
        DateTime::from_timestamp(whole as i64, nanos)
    }
}

impl Add<f64> for Epoch {
    type Output = Epoch;

    /// Offsets the epoch by `days`.
    fn add(self, days: f64) -> Epoch {
        Epoch(self.0 + days)
    }
}

impl Sub for Epoch {
    type Output = f64;

    /// Difference in days.
    fn sub(self, other: Epoch) -> f64 {
        self.0 - other.0
    }
}

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JD {:.8}", self.0)
    }
}
