//! PPP Solution
use crate::{
    cfg::ReferenceFrame,
    navigation::{Axis, Component, SecondarySystem},
    prelude::{Epoch, SV},
};

#[cfg(feature = "serde")]
use serde::Serialize;

/// Estimate of one state [Component]
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct ComponentEstimate {
    /// [Component]
    pub component: Component,
    /// Estimated value (m)
    pub value: f64,
    /// Estimated variance (m²)
    pub variance: f64,
}

/// Postfit residuals of one [SV]
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct SVResiduals {
    /// [SV]
    pub sv: SV,
    /// Code postfit residual (m)
    pub code_m: Option<f64>,
    /// Phase postfit residual (m)
    pub phase_m: Option<f64>,
}

/// PPP Solution, always expressed as the correction to apply
/// to the a priori state that served to compute the prefit residuals.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct PPPSolution {
    /// [Epoch] of this solution
    pub epoch: Epoch,
    /// [ReferenceFrame] of the coordinates offsets
    pub frame: ReferenceFrame,
    /// Every active state [Component] and its estimate, in state order
    pub estimates: Vec<ComponentEstimate>,
    /// Postfit residuals of each [SV] that contributed
    pub residuals: Vec<SVResiduals>,
    /// Number of satellites used
    pub satellites: usize,
    /// True while the latest epochs of the convergence window
    /// all lie within tolerance
    pub converged: bool,
}

impl PPPSolution {
    /// Returns [ComponentEstimate] of this [Component], if active
    pub fn estimate(&self, component: &Component) -> Option<&ComponentEstimate> {
        self.estimates.iter().find(|e| e.component == *component)
    }

    /// Returns estimated value of this [Component], if active
    pub fn value(&self, component: &Component) -> Option<f64> {
        self.estimate(component).map(|e| e.value)
    }

    /// Returns estimated variance of this [Component], if active
    pub fn variance(&self, component: &Component) -> Option<f64> {
        self.estimate(component).map(|e| e.variance)
    }

    /// Coordinates offsets (m), in the [ReferenceFrame] of this solution
    pub fn coordinates_m(&self) -> (f64, f64, f64) {
        let value = |axis| self.value(&Component::Coordinate(axis)).unwrap_or_default();
        (value(Axis::X), value(Axis::Y), value(Axis::Z))
    }

    /// Zenith wet tropospheric delay (m)
    pub fn wet_troposphere_m(&self) -> f64 {
        self.value(&Component::WetTroposphere).unwrap_or_default()
    }

    /// Receiver clock offset (m)
    pub fn receiver_clock_m(&self) -> f64 {
        self.value(&Component::ReceiverClock).unwrap_or_default()
    }

    /// Inter system bias (m) of this [SecondarySystem], if estimated
    pub fn isb_m(&self, system: SecondarySystem) -> Option<f64> {
        self.value(&Component::InterSystemBias(system))
    }

    /// Float ambiguity (m) of this [SV], if tracked
    pub fn ambiguity_m(&self, sv: SV) -> Option<f64> {
        self.value(&Component::Ambiguity(sv))
    }

    /// Postfit residuals of this [SV], if it contributed
    pub fn sv_residuals(&self, sv: SV) -> Option<&SVResiduals> {
        self.residuals.iter().find(|r| r.sv == sv)
    }
}
