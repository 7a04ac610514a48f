#![doc = include_str!("../README.md")]
#![cfg_attr(docrs, feature(doc_cfg))]

extern crate gnss_rs as gnss;

// private modules
mod cfg;
mod error;
mod navigation;
mod solutions;
mod solver;
mod stations;

#[cfg(test)]
mod tests;

// prelude
pub mod prelude {
    pub use crate::cfg::{
        Config, ConvergenceOpts, Error as ConfigError, Models, Priors, ReferenceFrame, Systems,
    };
    pub use crate::error::{Error, FailureKind};
    pub use crate::navigation::{
        Axis, Component, DesignRow, KfEstimate, Propagation, SatelliteObservation,
        SecondarySystem, StochasticModel, Transition,
    };
    pub use crate::solutions::{ComponentEstimate, PPPSolution, SVResiduals};
    pub use crate::solver::Solver;
    pub use crate::stations::{process_station, process_stations, StationEpochs, StationReport};
    // re-export
    pub use gnss::prelude::{Constellation, SV};
    pub use hifitime::{Duration, Epoch, TimeScale};
}
