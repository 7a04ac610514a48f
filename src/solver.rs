//! PPP solver
use log::{debug, error, info, warn};

use crate::{
    cfg::Config,
    error::Error,
    navigation::{
        Axis, Component, ConvergenceTracker, CovarianceLedger, KfEstimate, Kalman, Layout,
        MeasurementModel, Row, SatelliteObservation, SecondarySystem, StochasticModel, Transition,
    },
    prelude::{Duration, Epoch},
    solutions::{ComponentEstimate, PPPSolution, SVResiduals},
};

/// Predicted state of one epoch, prior measurement update.
#[derive(Debug, Clone)]
pub(crate) struct Prediction {
    /// [Layout] of this epoch
    pub layout: Layout,
    /// [Transition] that was applied
    pub transition: Transition,
    /// Predicted [KfEstimate]
    pub predicted: KfEstimate,
    /// Retained observations
    pub observations: Vec<SatelliteObservation>,
    /// True if this epoch starts a new episode (data gap)
    pub gap: bool,
}

/// [Solver] resolves [PPPSolution]s, epoch after epoch, for one station.
/// It owns the filter state exclusively: process one
/// station's time series per [Solver].
#[derive(Debug, Clone)]
pub struct Solver {
    /// Solver parametrization
    cfg: Config,
    /// [Kalman] filter
    kalman: Kalman,
    /// [CovarianceLedger] holding the filter state
    ledger: CovarianceLedger,
    /// [ConvergenceTracker]
    convergence: ConvergenceTracker,
    /// [Transition] of the last successful epoch
    transition: Option<Transition>,
}

impl Solver {
    /// Creates a new PPP [Solver].
    /// ## Input
    /// - cfg: [Config] preset, verified here: configuration
    ///   errors are reported at construction time and never mid run.
    pub fn new(cfg: &Config) -> Result<Self, Error> {
        cfg.validate()?;

        let enabled = cfg.systems.enabled();
        if enabled.is_empty() {
            info!("gps only navigation");
        } else {
            info!("secondary systems: {:?}", enabled);
        }

        if matches!(cfg.models.x, StochasticModel::WhiteNoise { .. }) {
            info!("kinematic navigation");
        }

        Ok(Self {
            cfg: cfg.clone(),
            kalman: Kalman::new(cfg.singularity_tolerance),
            ledger: CovarianceLedger::default(),
            convergence: ConvergenceTracker::new(cfg.convergence.window),
            transition: None,
        })
    }

    /// Returns [Config] in use
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Drops the filter state. Next epoch starts a new convergence episode.
    /// Time to first convergence of past episodes is preserved.
    pub fn reset(&mut self) {
        info!("filter reset");
        self.ledger.reset();
        self.convergence.end_episode();
        self.transition = None;
    }

    /// Designs the upcoming epoch and predicts its state.
    /// Nothing is modified, except the convergence episode start time.
    pub(crate) fn predict(
        &mut self,
        t: Epoch,
        observations: &[SatelliteObservation],
    ) -> Result<Prediction, Error> {
        if let Some(last) = self.ledger.epoch() {
            if t < last {
                error!("{} - epoch prior {}", t, last);
                return Err(Error::TimeUnderflow(t));
            }
        }

        let gap = match (self.ledger.epoch(), self.cfg.reset_gap) {
            (Some(last), Some(max_gap)) => t - last > max_gap,
            _ => false,
        };

        if !self.convergence.is_started() {
            self.convergence.start(t);
        }

        let observations = self.retain(t, observations);

        let needed = self.cfg.min_satellites;
        let found = observations.len();

        if found < needed {
            warn!("{} - not enough satellites ({}/{})", t, found, needed);
            return Err(Error::NotEnoughSatellites { needed, found });
        }

        let empty = CovarianceLedger::default();
        let ledger = if gap { &empty } else { &self.ledger };

        let tracks = observations
            .iter()
            .filter(|obs| obs.has_phase())
            .map(|obs| (obs.sv, obs.cycle_slip))
            .collect::<Vec<_>>();

        let mut isb = Vec::<SecondarySystem>::with_capacity(3);
        for system in observations.iter().filter_map(|obs| obs.secondary_system()) {
            if !isb.contains(&system) {
                isb.push(system);
            }
        }

        let layout = ledger.layout(t, &tracks, &isb);
        let prior = ledger.prior(&layout, |c| self.cfg.prior_variance(c));

        let dt_s = match ledger.epoch() {
            Some(last) => (t - last).to_seconds(),
            None => 0.0,
        };

        let transition = Transition::new(&layout, &self.cfg.models, dt_s);
        let predicted = self.kalman.predict(&prior, &transition);

        Ok(Prediction {
            layout,
            transition,
            predicted,
            observations,
            gap,
        })
    }

    /// Retains observations that may contribute to this epoch
    fn retain(&self, t: Epoch, observations: &[SatelliteObservation]) -> Vec<SatelliteObservation> {
        let mut retained = Vec::<SatelliteObservation>::with_capacity(observations.len());

        for obs in observations.iter() {
            if !self.cfg.systems.accepts(obs.sv.constellation) {
                debug!("{}({}) - system not enabled", t, obs.sv);
            } else if !obs.is_usable() {
                warn!("{}({}) - no code nor phase measurement", t, obs.sv);
            } else if !obs.has_valid_weight() {
                warn!("{}({}) - invalid weight {:?}", t, obs.sv, obs.weight);
            } else if retained.iter().any(|r| r.sv == obs.sv) {
                warn!("{}({}) - duplicated observation", t, obs.sv);
            } else {
                retained.push(*obs);
            }
        }

        retained
    }

    /// [PPPSolution] resolution attempt.
    /// On failure, the epoch is skipped and the filter state is left untouched:
    /// processing may continue with the next epoch.
    /// ## Input
    /// - t: [Epoch] of this observation set, epochs must be
    ///   proposed in chronological order
    /// - observations: [SatelliteObservation]s of this epoch
    /// ## Returns
    /// - [PPPSolution] on success
    /// - [Error] on failure, [Error::kind] tells whether this is
    ///   an epoch local failure or not.
    pub fn resolve(
        &mut self,
        t: Epoch,
        observations: &[SatelliteObservation],
    ) -> Result<PPPSolution, Error> {
        let Prediction {
            layout,
            transition,
            predicted,
            observations,
            gap,
        } = self.predict(t, observations)?;

        let measurement =
            MeasurementModel::assemble(&observations, &layout, self.cfg.phase_weight_factor)?;

        debug!(
            "{} - {} satellites, {} arcs, {} measurements",
            t,
            observations.len(),
            layout.nb_ambiguities(),
            measurement.len()
        );

        let corrected = match self.kalman.correct(&predicted, &measurement) {
            Ok(corrected) => corrected,
            Err(e) => {
                error!("{} - epoch skipped ({:?} failure): {}", t, e.kind(), e);
                return Err(e);
            },
        };

        let residuals = measurement.residuals(&corrected.x);

        if gap {
            info!("{} - data gap: new convergence episode", t);
            self.convergence.end_episode();
            self.convergence.start(t);
        }

        self.ledger.commit(t, layout, corrected);
        self.transition = Some(transition);

        let x = &self.ledger.state().x;
        let offsets = (x[0], x[1], x[2]);

        let within = self
            .cfg
            .convergence
            .within_tolerance(self.cfg.frame, offsets);

        self.convergence.push(t, within);

        debug!(
            "{} - dx={:.4}m dy={:.4}m dz={:.4}m (within tolerance: {})",
            t, offsets.0, offsets.1, offsets.2, within
        );

        Ok(self.solution(t, &observations, &measurement.rows, residuals.as_slice()))
    }

    fn solution(
        &self,
        t: Epoch,
        observations: &[SatelliteObservation],
        rows: &[Row],
        residuals: &[f64],
    ) -> PPPSolution {
        let state = self.ledger.state();

        let estimates = self
            .ledger
            .components()
            .iter()
            .enumerate()
            .map(|(i, component)| ComponentEstimate {
                component: *component,
                value: state.x[i],
                variance: state.p[(i, i)],
            })
            .collect();

        let residuals = observations
            .iter()
            .map(|obs| {
                let mut sv_residuals = SVResiduals {
                    sv: obs.sv,
                    code_m: None,
                    phase_m: None,
                };
                for (row, value) in rows.iter().zip(residuals.iter()) {
                    match row {
                        Row::Code(sv) if *sv == obs.sv => sv_residuals.code_m = Some(*value),
                        Row::Phase(sv) if *sv == obs.sv => sv_residuals.phase_m = Some(*value),
                        _ => {},
                    }
                }
                sv_residuals
            })
            .collect();

        PPPSolution {
            epoch: t,
            frame: self.cfg.frame,
            estimates,
            residuals,
            satellites: observations.len(),
            converged: self.convergence.converged(),
        }
    }

    /// Converged flag of the current episode.
    /// Fails if no epoch was ever processed since last reset.
    pub fn converged(&self) -> Result<bool, Error> {
        if self.ledger.is_empty() {
            Err(Error::UninitializedFilter)
        } else {
            Ok(self.convergence.converged())
        }
    }

    /// Time to first convergence of each convergence episode
    pub fn ttfc(&self) -> &[Duration] {
        self.convergence.ttfc()
    }

    /// Current estimate of this [Component]
    pub fn estimate(&self, component: &Component) -> Result<f64, Error> {
        if self.ledger.is_empty() {
            return Err(Error::UninitializedFilter);
        }
        self.ledger
            .estimate(component)
            .ok_or(Error::UnknownComponent(*component))
    }

    /// Current variance of this [Component]
    pub fn variance(&self, component: &Component) -> Result<f64, Error> {
        if self.ledger.is_empty() {
            return Err(Error::UninitializedFilter);
        }
        self.ledger
            .variance(component)
            .ok_or(Error::UnknownComponent(*component))
    }

    /// Current covariance between two [Component]s
    pub fn covariance(&self, a: &Component, b: &Component) -> Result<f64, Error> {
        if self.ledger.is_empty() {
            return Err(Error::UninitializedFilter);
        }
        for component in [a, b] {
            if self.ledger.variance(component).is_none() {
                return Err(Error::UnknownComponent(*component));
            }
        }
        self.ledger
            .covariance(a, b)
            .ok_or(Error::UnknownComponent(*a))
    }

    /// Current coordinates offsets (m)
    pub fn coordinates_m(&self) -> Result<(f64, f64, f64), Error> {
        Ok((
            self.estimate(&Component::Coordinate(Axis::X))?,
            self.estimate(&Component::Coordinate(Axis::Y))?,
            self.estimate(&Component::Coordinate(Axis::Z))?,
        ))
    }

    /// Active state [Component]s, in state order
    pub fn components(&self) -> &[Component] {
        self.ledger.components()
    }

    /// Current [KfEstimate]
    pub fn state(&self) -> &KfEstimate {
        self.ledger.state()
    }

    /// Phase weight factor in use
    pub fn weight_factor(&self) -> f64 {
        self.cfg.phase_weight_factor
    }

    /// [Transition] of the last successful epoch
    pub fn last_transition(&self) -> Option<&Transition> {
        self.transition.as_ref()
    }
}
