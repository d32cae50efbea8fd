//! Orbit determination from two-line element sets and GPS-like measurements.
//!
//! The crate fuses an SGP4-propagated dynamics model with noisy position
//! measurements through a linear Kalman filter whose state-transition
//! operator is re-linearized around the current trajectory at every step.
//! On top of the refined inertial state it derives ground-observable
//! geodetic coordinates and detects epochs where a satellite's ground track
//! falls within a tolerance of a fixed ground location.

mod epoch;

pub mod coords;
pub mod estimator;
pub mod measurement;
pub mod passes;
pub mod propagator;

pub use coords::{EarthShape, Geodetic};
pub use epoch::Epoch;
pub use estimator::{Estimate, EstimationError, OrbitDeterminator, TleTransitionModel, TransitionModel};
pub use measurement::{GroundTruthGps, MeasurementSource, NoisyGps};
pub use passes::{GroundLocation, Pass, PassError, PassPredictor, DEFAULT_SAMPLE_COUNT};
pub use propagator::{PropagationError, Propagator, TlePropagator};
