use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    navigation::{Component, SecondarySystem, StochasticModel},
    prelude::{Constellation, Duration},
};

mod models;
pub use models::Models;

/// Configuration Error
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("invalid phase weight factor: {0}")]
    InvalidWeightFactor(f64),

    #[error("convergence window must contain at least one epoch")]
    InvalidConvergenceWindow,

    #[error("at least one satellite is required")]
    InvalidMinimumSatellites,

    #[error("invalid {0} prior variance")]
    InvalidPrior(&'static str),

    #[error("invalid singularity tolerance")]
    InvalidTolerance,

    /// Sharing a state-aware model between the three axes
    /// is rejected: assign one model per axis instead.
    #[error("state-aware models cannot be shared by all coordinates")]
    SharedStatefulCoordinateModel,

    #[error("phase ambiguity model assigned to {0}")]
    MisplacedAmbiguityModel(Component),

    #[error("phase ambiguities require a phase ambiguity model")]
    InvalidAmbiguityModel,

    #[error("invalid stochastic model parameter for {0}")]
    InvalidModelParameter(Component),

    #[error("isb model defined for disabled system {0}")]
    IsbModelForDisabledSystem(SecondarySystem),
}

/// Estimated coordinates [ReferenceFrame]. This choice is
/// fixed for the lifetime of the filter.
#[derive(Default, Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ReferenceFrame {
    /// dx, dy, dz offsets (m)
    #[default]
    ECEF,
    /// dLat, dLon, dH offsets (m), north, east and up
    #[cfg_attr(feature = "serde", serde(alias = "NEU", alias = "local"))]
    Local,
}

/// Secondary [Systems] selection. GPS is always used as the reference system.
#[derive(Default, Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Systems {
    #[cfg_attr(feature = "serde", serde(default))]
    pub glonass: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub galileo: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub beidou: bool,
}

impl Systems {
    /// GPS only [Systems]
    pub fn gps_only() -> Self {
        Self::default()
    }

    /// True if this [SecondarySystem] is enabled
    pub fn is_enabled(&self, system: SecondarySystem) -> bool {
        match system {
            SecondarySystem::Glonass => self.glonass,
            SecondarySystem::Galileo => self.galileo,
            SecondarySystem::BeiDou => self.beidou,
        }
    }

    /// Enabled [SecondarySystem]s, in enablement order
    pub fn enabled(&self) -> Vec<SecondarySystem> {
        SecondarySystem::ALL
            .into_iter()
            .filter(|system| self.is_enabled(*system))
            .collect()
    }

    /// True if satellites of this [Constellation] may contribute
    pub fn accepts(&self, constellation: Constellation) -> bool {
        if constellation == Constellation::GPS {
            return true;
        }
        match SecondarySystem::from_constellation(constellation) {
            Some(system) => self.is_enabled(system),
            None => false,
        }
    }
}

const fn default_window() -> usize {
    10
}

const fn default_horizontal_tolerance() -> f64 {
    0.1
}

const fn default_vertical_tolerance() -> f64 {
    0.1
}

/// [ConvergenceOpts] defines when a solution is considered converged.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConvergenceOpts {
    /// Number of consecutive epochs within tolerance,
    /// required to declare convergence.
    #[cfg_attr(feature = "serde", serde(default = "default_window"))]
    pub window: usize,
    /// Horizontal tolerance (m), applies to dLat and dLon in local frame.
    #[cfg_attr(feature = "serde", serde(default = "default_horizontal_tolerance"))]
    pub horizontal_m: f64,
    /// Vertical tolerance (m), applies to dH in local frame.
    /// In ECEF, the 3D offset is compared to the
    /// combination of both horizontal and vertical tolerances.
    #[cfg_attr(feature = "serde", serde(default = "default_vertical_tolerance"))]
    pub vertical_m: f64,
}

impl Default for ConvergenceOpts {
    fn default() -> Self {
        Self {
            window: default_window(),
            horizontal_m: default_horizontal_tolerance(),
            vertical_m: default_vertical_tolerance(),
        }
    }
}

impl ConvergenceOpts {
    /// True if these coordinates offsets are within tolerance.
    pub(crate) fn within_tolerance(&self, frame: ReferenceFrame, offsets: (f64, f64, f64)) -> bool {
        let (x, y, z) = offsets;
        match frame {
            ReferenceFrame::Local => {
                x.abs() <= self.horizontal_m
                    && y.abs() <= self.horizontal_m
                    && z.abs() <= self.vertical_m
            },
            ReferenceFrame::ECEF => {
                let norm = (x.powi(2) + y.powi(2) + z.powi(2)).sqrt();
                let tolerance =
                    (2.0 * self.horizontal_m.powi(2) + self.vertical_m.powi(2)).sqrt();
                norm <= tolerance
            },
        }
    }
}

const fn default_coordinates_prior() -> f64 {
    1.0E4
}

const fn default_tropo_prior() -> f64 {
    0.25
}

const fn default_clock_prior() -> f64 {
    9.0E10
}

const fn default_isb_prior() -> f64 {
    9.0E10
}

/// Initial variances (m²) of each state component category,
/// applied when the component is created. Ambiguity
/// priors are defined by their [StochasticModel].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Priors {
    #[cfg_attr(feature = "serde", serde(default = "default_coordinates_prior"))]
    pub coordinates_m2: f64,
    #[cfg_attr(feature = "serde", serde(default = "default_tropo_prior"))]
    pub wet_troposphere_m2: f64,
    #[cfg_attr(feature = "serde", serde(default = "default_clock_prior"))]
    pub receiver_clock_m2: f64,
    #[cfg_attr(feature = "serde", serde(default = "default_isb_prior"))]
    pub isb_m2: f64,
}

impl Default for Priors {
    fn default() -> Self {
        Self {
            coordinates_m2: default_coordinates_prior(),
            wet_troposphere_m2: default_tropo_prior(),
            receiver_clock_m2: default_clock_prior(),
            isb_m2: default_isb_prior(),
        }
    }
}

impl Priors {
    fn validate(&self) -> Result<(), Error> {
        let checks = [
            ("coordinates", self.coordinates_m2),
            ("wet troposphere", self.wet_troposphere_m2),
            ("receiver clock", self.receiver_clock_m2),
            ("isb", self.isb_m2),
        ];
        for (category, variance) in checks {
            if !variance.is_finite() || variance < 0.0 {
                return Err(Error::InvalidPrior(category));
            }
        }
        Ok(())
    }
}

const fn default_weight_factor() -> f64 {
    1.0E4
}

const fn default_min_satellites() -> usize {
    4
}

const fn default_singularity_tolerance() -> f64 {
    1.0E-20
}

/// PPP [Config]uration, consumed once when building the
/// [Solver](crate::prelude::Solver).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Config {
    /// Coordinates [ReferenceFrame]
    #[cfg_attr(feature = "serde", serde(default))]
    pub frame: ReferenceFrame,
    /// Secondary [Systems]
    #[cfg_attr(feature = "serde", serde(default))]
    pub systems: Systems,
    /// Weight multiplying phase measurements, with respect to code measurements.
    /// This is the squared code/phase sigma ratio. The default value (10000)
    /// means 1m code sigma and 1cm phase sigma.
    #[cfg_attr(feature = "serde", serde(default = "default_weight_factor"))]
    pub phase_weight_factor: f64,
    /// [ConvergenceOpts]
    #[cfg_attr(feature = "serde", serde(default))]
    pub convergence: ConvergenceOpts,
    /// Minimal number of usable satellites to attempt an update
    #[cfg_attr(feature = "serde", serde(default = "default_min_satellites"))]
    pub min_satellites: usize,
    /// Filter is reset (and a new convergence episode starts)
    /// when the time elapsed since the last update exceeds this [Duration].
    #[cfg_attr(feature = "serde", serde(default))]
    pub reset_gap: Option<Duration>,
    /// Relative pivot below which the innovation covariance
    /// is considered singular.
    #[cfg_attr(feature = "serde", serde(default = "default_singularity_tolerance"))]
    pub singularity_tolerance: f64,
    /// Stochastic [Models]
    #[cfg_attr(feature = "serde", serde(default))]
    pub models: Models,
    /// Initial variances
    #[cfg_attr(feature = "serde", serde(default))]
    pub priors: Priors,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            frame: Default::default(),
            systems: Default::default(),
            phase_weight_factor: default_weight_factor(),
            convergence: Default::default(),
            min_satellites: default_min_satellites(),
            reset_gap: None,
            singularity_tolerance: default_singularity_tolerance(),
            models: Default::default(),
            priors: Default::default(),
        }
    }
}

impl Config {
    /// Kinematic [Config]: coordinates are modeled as
    /// independent white noise on each axis.
    pub fn kinematic(sigma_x: f64, sigma_y: f64, sigma_z: f64) -> Self {
        Self::default().with_models(Models::kinematic(sigma_x, sigma_y, sigma_z))
    }

    /// Copies and returns [Config] with updated [ReferenceFrame]
    pub fn with_frame(&self, frame: ReferenceFrame) -> Self {
        let mut s = self.clone();
        s.frame = frame;
        s
    }

    /// Copies and returns [Config] with updated [Systems]
    pub fn with_systems(&self, systems: Systems) -> Self {
        let mut s = self.clone();
        s.systems = systems;
        s
    }

    /// Copies and returns [Config] with updated phase weight factor
    pub fn with_weight_factor(&self, factor: f64) -> Self {
        let mut s = self.clone();
        s.phase_weight_factor = factor;
        s
    }

    /// Copies and returns [Config] with phase weight factor
    /// defined from the code/phase sigma ratio.
    /// For 1m code sigma and 10cm phase sigma, the ratio is 10.
    pub fn with_sigma_ratio(&self, ratio: f64) -> Self {
        self.with_weight_factor(ratio.powi(2))
    }

    /// Returns code/phase sigma ratio
    pub fn sigma_ratio(&self) -> f64 {
        self.phase_weight_factor.sqrt()
    }

    /// Copies and returns [Config] with updated convergence window size
    pub fn with_convergence_window(&self, window: usize) -> Self {
        let mut s = self.clone();
        s.convergence.window = window;
        s
    }

    /// Copies and returns [Config] with updated [ConvergenceOpts]
    pub fn with_convergence(&self, convergence: ConvergenceOpts) -> Self {
        let mut s = self.clone();
        s.convergence = convergence;
        s
    }

    /// Copies and returns [Config] with updated minimal number of satellites
    pub fn with_min_satellites(&self, min_satellites: usize) -> Self {
        let mut s = self.clone();
        s.min_satellites = min_satellites;
        s
    }

    /// Copies and returns [Config] with data gap reset
    pub fn with_reset_gap(&self, gap: Duration) -> Self {
        let mut s = self.clone();
        s.reset_gap = Some(gap);
        s
    }

    /// Copies and returns [Config] with updated [Models]
    pub fn with_models(&self, models: Models) -> Self {
        let mut s = self.clone();
        s.models = models;
        s
    }

    /// Copies and returns [Config] with updated [Priors]
    pub fn with_priors(&self, priors: Priors) -> Self {
        let mut s = self.clone();
        s.priors = priors;
        s
    }

    /// Applies the same memoryless [StochasticModel] to all three axes.
    /// State-aware models are rejected, see [Models::with_coordinates_model].
    pub fn with_coordinates_model(&self, model: StochasticModel) -> Result<Self, Error> {
        let mut s = self.clone();
        s.models = self.models.with_coordinates_model(model)?;
        Ok(s)
    }

    /// Verifies this [Config] prior deployment.
    pub fn validate(&self) -> Result<(), Error> {
        if !self.phase_weight_factor.is_finite() || self.phase_weight_factor <= 0.0 {
            return Err(Error::InvalidWeightFactor(self.phase_weight_factor));
        }
        if self.convergence.window == 0 {
            return Err(Error::InvalidConvergenceWindow);
        }
        if self.min_satellites == 0 {
            return Err(Error::InvalidMinimumSatellites);
        }
        if !self.singularity_tolerance.is_finite() || self.singularity_tolerance < 0.0 {
            return Err(Error::InvalidTolerance);
        }
        self.priors.validate()?;
        self.models.validate(&self.systems.enabled())
    }

    /// Prior variance of a newly created [Component]
    pub(crate) fn prior_variance(&self, component: &Component) -> f64 {
        match component {
            Component::Coordinate(_) => self.priors.coordinates_m2,
            Component::WetTroposphere => self.priors.wet_troposphere_m2,
            Component::ReceiverClock => self.priors.receiver_clock_m2,
            Component::InterSystemBias(_) => self.priors.isb_m2,
            Component::Ambiguity(_) => self.models.fresh_ambiguity_variance(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::{Config, ConvergenceOpts, Error, ReferenceFrame, Systems};
    use crate::{
        navigation::{SecondarySystem, StochasticModel},
        prelude::Constellation,
    };

    #[test]
    fn default_config() {
        let cfg = Config::default();
        assert_eq!(cfg.frame, ReferenceFrame::ECEF);
        assert_eq!(cfg.phase_weight_factor, 1.0E4);
        assert_eq!(cfg.sigma_ratio(), 100.0);
        assert_eq!(cfg.min_satellites, 4);
        assert!(cfg.systems.enabled().is_empty());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn sigma_ratio() {
        let cfg = Config::default().with_sigma_ratio(10.0);
        assert_eq!(cfg.phase_weight_factor, 100.0);
        assert_eq!(cfg.sigma_ratio(), 10.0);
    }

    #[test]
    fn systems() {
        let systems = Systems {
            glonass: false,
            galileo: true,
            beidou: true,
        };
        assert_eq!(
            systems.enabled(),
            vec![SecondarySystem::Galileo, SecondarySystem::BeiDou]
        );
        assert!(systems.accepts(Constellation::GPS));
        assert!(systems.accepts(Constellation::Galileo));
        assert!(!systems.accepts(Constellation::Glonass));
        assert!(!systems.accepts(Constellation::SBAS));
    }

    #[test]
    fn invalid_config() {
        let cfg = Config::default().with_weight_factor(0.0);
        assert_eq!(cfg.validate(), Err(Error::InvalidWeightFactor(0.0)));

        let cfg = Config::default().with_convergence_window(0);
        assert_eq!(cfg.validate(), Err(Error::InvalidConvergenceWindow));

        let cfg = Config::default().with_min_satellites(0);
        assert_eq!(cfg.validate(), Err(Error::InvalidMinimumSatellites));

        let mut cfg = Config::default();
        cfg.priors.receiver_clock_m2 = f64::NAN;
        assert_eq!(cfg.validate(), Err(Error::InvalidPrior("receiver clock")));

        let cfg = Config::default().with_coordinates_model(StochasticModel::random_walk(1.0));
        assert_eq!(cfg, Err(Error::SharedStatefulCoordinateModel));

        let mut cfg = Config::default();
        cfg.models.glonass_isb = Some(StochasticModel::Constant);
        assert_eq!(
            cfg.validate(),
            Err(Error::IsbModelForDisabledSystem(SecondarySystem::Glonass))
        );
    }

    #[test]
    fn convergence_tolerance() {
        let opts = ConvergenceOpts::default();
        assert!(opts.within_tolerance(ReferenceFrame::Local, (0.05, -0.05, 0.1)));
        assert!(!opts.within_tolerance(ReferenceFrame::Local, (0.05, -0.2, 0.0)));
        assert!(!opts.within_tolerance(ReferenceFrame::Local, (0.0, 0.0, -0.11)));
        assert!(opts.within_tolerance(ReferenceFrame::ECEF, (0.1, 0.1, 0.0)));
        assert!(!opts.within_tolerance(ReferenceFrame::ECEF, (0.1, 0.1, 0.11)));
    }

    #[test]
    fn kinematic_config() {
        let cfg = Config::kinematic(100.0, 100.0, 100.0);
        assert_eq!(cfg.models.x, StochasticModel::white_noise(100.0));
        assert_eq!(cfg.models.z, StochasticModel::white_noise(100.0));
        assert!(cfg.validate().is_ok());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn config_deserialization() {
        let content = r#"{
            "frame": "Local",
            "systems": { "galileo": true },
            "phase_weight_factor": 2500.0,
            "convergence": { "window": 5 }
        }"#;

        let cfg: Config = serde_json::from_str(content)
            .unwrap_or_else(|e| panic!("failed to deserialize config: {}", e));

        assert_eq!(cfg.frame, ReferenceFrame::Local);
        assert!(cfg.systems.galileo);
        assert!(!cfg.systems.glonass);
        assert_eq!(cfg.phase_weight_factor, 2500.0);
        assert_eq!(cfg.convergence.window, 5);
        assert_eq!(cfg.convergence.horizontal_m, 0.1);
        assert_eq!(cfg.min_satellites, 4);
        assert!(cfg.validate().is_ok());
    }
}
