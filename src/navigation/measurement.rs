//! Measurement model assembly
use nalgebra::{DMatrix, DVector};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    error::Error,
    navigation::{Axis, Component, Layout, SecondarySystem},
    prelude::SV,
};

/// Partial derivatives of one satellite observation
/// with respect to the fixed block.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DesignRow {
    /// Coordinates partials (in the selected reference frame)
    pub position: [f64; 3],
    /// Wet troposphere mapping function
    pub wet_mapping: f64,
    /// Receiver clock partial
    pub clock: f64,
}

impl Default for DesignRow {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            wet_mapping: 0.0,
            clock: 1.0,
        }
    }
}

impl DesignRow {
    /// Builds a [DesignRow] from coordinates partials and wet mapping,
    /// with unitary clock partial.
    pub fn new(position: [f64; 3], wet_mapping: f64) -> Self {
        Self {
            position,
            wet_mapping,
            clock: 1.0,
        }
    }
}

/// [SatelliteObservation] describes one satellite contribution
/// to the current epoch: ionosphere-free prefit residuals, their
/// design partials, weight and cycle slip flag.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SatelliteObservation {
    /// [SV]
    pub sv: SV,
    /// Code prefit residual (m)
    pub code_prefit_m: Option<f64>,
    /// Phase prefit residual (m)
    pub phase_prefit_m: Option<f64>,
    /// Design partials
    pub design: DesignRow,
    /// Code weight. Unitary when omitted.
    /// Phase weight is scaled by the phase weight factor.
    pub weight: Option<f64>,
    /// Cycle slip flag: this satellite's arc restarts
    pub cycle_slip: bool,
}

impl SatelliteObservation {
    /// Builds a new [SatelliteObservation] with both code and phase residuals
    pub fn new(sv: SV, code_prefit_m: f64, phase_prefit_m: f64, design: DesignRow) -> Self {
        Self {
            sv,
            design,
            code_prefit_m: Some(code_prefit_m),
            phase_prefit_m: Some(phase_prefit_m),
            weight: None,
            cycle_slip: false,
        }
    }

    /// Builds a code only [SatelliteObservation]
    pub fn code_only(sv: SV, code_prefit_m: f64, design: DesignRow) -> Self {
        Self {
            sv,
            design,
            code_prefit_m: Some(code_prefit_m),
            phase_prefit_m: None,
            weight: None,
            cycle_slip: false,
        }
    }

    /// Copies and returns [SatelliteObservation] with given weight
    pub fn with_weight(&self, weight: f64) -> Self {
        let mut s = *self;
        s.weight = Some(weight);
        s
    }

    /// Copies and returns [SatelliteObservation] with cycle slip flag
    pub fn with_cycle_slip(&self, cycle_slip: bool) -> Self {
        let mut s = *self;
        s.cycle_slip = cycle_slip;
        s
    }

    /// True if this observation contributes a phase row
    pub fn has_phase(&self) -> bool {
        self.phase_prefit_m.is_some()
    }

    /// True if this observation contributes to the solution
    pub fn is_usable(&self) -> bool {
        self.code_prefit_m.is_some() || self.phase_prefit_m.is_some()
    }

    /// True if the weight, when specified, is finite and strictly positive
    pub fn has_valid_weight(&self) -> bool {
        match self.weight {
            Some(weight) => weight.is_finite() && weight > 0.0,
            None => true,
        }
    }

    fn code_weight(&self) -> f64 {
        self.weight.unwrap_or(1.0)
    }

    fn phase_weight(&self, weight_factor: f64) -> f64 {
        self.code_weight() * weight_factor
    }

    /// [SecondarySystem] of this satellite, if any
    pub fn secondary_system(&self) -> Option<SecondarySystem> {
        SecondarySystem::from_constellation(self.sv.constellation)
    }
}

/// Measurement [Row] identification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Row {
    /// Code observation of this [SV]
    Code(SV),
    /// Phase observation of this [SV]
    Phase(SV),
}

/// [MeasurementModel] of one epoch: prefit vector, design matrix
/// and weight matrix, with all code rows first then all phase rows.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementModel {
    /// Prefit residuals
    pub y: DVector<f64>,
    /// Design matrix
    pub h: DMatrix<f64>,
    /// Weight matrix
    pub w: DMatrix<f64>,
    /// Row identification
    pub rows: Vec<Row>,
}

impl MeasurementModel {
    /// Assembles the [MeasurementModel] for this [Layout].
    /// ## Input
    /// - observations: usable [SatelliteObservation]s
    /// - layout: current [Layout]
    /// - weight_factor: phase to code weight ratio
    pub fn assemble(
        observations: &[SatelliteObservation],
        layout: &Layout,
        weight_factor: f64,
    ) -> Result<Self, Error> {
        let rows = observations
            .iter()
            .filter(|obs| obs.code_prefit_m.is_some())
            .map(|obs| Row::Code(obs.sv))
            .chain(
                observations
                    .iter()
                    .filter(|obs| obs.has_phase())
                    .map(|obs| Row::Phase(obs.sv)),
            )
            .collect::<Vec<_>>();

        let (m, n) = (rows.len(), layout.len());

        let mut y = DVector::<f64>::zeros(m);
        let mut h = DMatrix::<f64>::zeros(m, n);
        let mut w = DMatrix::<f64>::zeros(m, m);

        let column = |component: Component| -> Result<usize, Error> {
            layout
                .position(&component)
                .ok_or(Error::UnknownComponent(component))
        };

        for (i, row) in rows.iter().enumerate() {
            let sv = match row {
                Row::Code(sv) | Row::Phase(sv) => *sv,
            };

            let obs = observations
                .iter()
                .find(|obs| obs.sv == sv)
                .ok_or(Error::MissingMeasurement(sv))?;

            for axis in Axis::ALL {
                h[(i, column(Component::Coordinate(axis))?)] = obs.design.position[axis.index()];
            }

            h[(i, column(Component::WetTroposphere)?)] = obs.design.wet_mapping;
            h[(i, column(Component::ReceiverClock)?)] = obs.design.clock;

            if let Some(system) = obs.secondary_system() {
                h[(i, column(Component::InterSystemBias(system))?)] = 1.0;
            }

            match row {
                Row::Code(_) => {
                    y[i] = obs.code_prefit_m.ok_or(Error::MissingMeasurement(sv))?;
                    w[(i, i)] = obs.code_weight();
                },
                Row::Phase(_) => {
                    y[i] = obs.phase_prefit_m.ok_or(Error::MissingMeasurement(sv))?;
                    w[(i, i)] = obs.phase_weight(weight_factor);
                    h[(i, column(Component::Ambiguity(sv))?)] = 1.0;
                },
            }
        }

        Ok(Self { y, h, w, rows })
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns postfit residuals y - Hx
    pub fn residuals(&self, x: &DVector<f64>) -> DVector<f64> {
        &self.y - &self.h * x
    }
}
