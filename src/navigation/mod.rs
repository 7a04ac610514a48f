//! Dynamic dimension Kalman filter internals
mod component;
mod convergence;
mod kalman;
mod ledger;
mod measurement;
mod transition;

pub(crate) mod stochastic;

pub use component::{Axis, Component, SecondarySystem};
pub use kalman::KfEstimate;
pub use ledger::Layout;
pub use measurement::{DesignRow, SatelliteObservation};
pub use stochastic::{Propagation, StochasticModel};
pub use transition::Transition;

pub(crate) use convergence::ConvergenceTracker;
pub(crate) use kalman::Kalman;
pub(crate) use ledger::CovarianceLedger;
pub(crate) use measurement::{MeasurementModel, Row};
