//! Stochastic models driving the state transition.
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default random walk spectral density of the wet troposphere (m².s⁻¹)
pub const DEFAULT_TROPO_QPRIME: f64 = 3.0E-8;

/// Default random walk spectral density of the inter system biases (m².s⁻¹)
pub const DEFAULT_ISB_QPRIME: f64 = 1.0E-8;

/// Default receiver clock white noise sigma (m)
pub const DEFAULT_CLOCK_SIGMA: f64 = 3.0E5;

/// Default phase ambiguity sigma (m), applied each time an arc starts
pub const DEFAULT_AMBIGUITY_SIGMA: f64 = 2.0E7;

/// Default coordinates sigma (m) in kinematic mode
pub const DEFAULT_KINEMATIC_SIGMA: f64 = 100.0;

/// Transition coefficient and process noise of one state component
/// for one epoch interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Propagation {
    /// State transition coefficient
    pub phi: f64,
    /// Process noise variance
    pub q: f64,
}

/// [StochasticModel] of one state component. All supported models
/// are scalar first order Markov processes.
#[derive(Default, Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum StochasticModel {
    /// Constant parameter: no process noise
    #[default]
    Constant,
    /// White noise: previous value is forgotten at every epoch
    WhiteNoise {
        /// Sigma (m)
        sigma: f64,
    },
    /// Random walk, process noise grows with elapsed time
    RandomWalk {
        /// Process spectral density (m².s⁻¹)
        q_prime: f64,
    },
    /// Constant along a continuous arc, reset to white noise
    /// each time the arc (re)starts.
    PhaseAmbiguity {
        /// Sigma (m) applied on arc (re)start
        sigma: f64,
    },
}

impl std::fmt::Display for StochasticModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Constant => write!(f, "constant"),
            Self::WhiteNoise { sigma } => write!(f, "white-noise(sigma={}m)", sigma),
            Self::RandomWalk { q_prime } => write!(f, "random-walk(q'={}m².s⁻¹)", q_prime),
            Self::PhaseAmbiguity { sigma } => write!(f, "phase-ambiguity(sigma={}m)", sigma),
        }
    }
}

impl StochasticModel {
    /// Builds a [StochasticModel::WhiteNoise]
    pub fn white_noise(sigma: f64) -> Self {
        Self::WhiteNoise { sigma }
    }

    /// Builds a [StochasticModel::RandomWalk]
    pub fn random_walk(q_prime: f64) -> Self {
        Self::RandomWalk { q_prime }
    }

    /// Builds a [StochasticModel::PhaseAmbiguity]
    pub fn phase_ambiguity(sigma: f64) -> Self {
        Self::PhaseAmbiguity { sigma }
    }

    /// Returns [Propagation] over one epoch interval.
    /// ## Input
    /// - dt_s: elapsed time since previous update of this component, in seconds
    /// - reset: true when the component has just been (re)created
    pub fn propagation(&self, dt_s: f64, reset: bool) -> Propagation {
        match self {
            Self::Constant => Propagation { phi: 1.0, q: 0.0 },
            Self::WhiteNoise { sigma } => Propagation {
                phi: 0.0,
                q: sigma.powi(2),
            },
            Self::RandomWalk { q_prime } => Propagation {
                phi: 1.0,
                q: q_prime * dt_s.max(0.0),
            },
            Self::PhaseAmbiguity { sigma } => {
                if reset {
                    Propagation {
                        phi: 0.0,
                        q: sigma.powi(2),
                    }
                } else {
                    Propagation { phi: 1.0, q: 0.0 }
                }
            },
        }
    }

    /// True if this model does not carry any information
    /// between epochs other than the state itself.
    /// Random walks accumulate noise over their own update history.
    pub fn is_memoryless(&self) -> bool {
        matches!(self, Self::Constant | Self::WhiteNoise { .. })
    }

    /// Variance applied to a freshly created component, if this model defines one.
    pub fn reset_variance(&self) -> Option<f64> {
        match self {
            Self::WhiteNoise { sigma } | Self::PhaseAmbiguity { sigma } => Some(sigma.powi(2)),
            _ => None,
        }
    }

    /// True if all parameters are finite and positive.
    pub(crate) fn is_valid(&self) -> bool {
        match self {
            Self::Constant => true,
            Self::WhiteNoise { sigma } | Self::PhaseAmbiguity { sigma } => {
                sigma.is_finite() && *sigma >= 0.0
            },
            Self::RandomWalk { q_prime } => q_prime.is_finite() && *q_prime >= 0.0,
        }
    }
}
