//! Stochastic model assignment, per state component category
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    cfg::Error,
    navigation::{
        stochastic::{
            DEFAULT_AMBIGUITY_SIGMA, DEFAULT_CLOCK_SIGMA, DEFAULT_ISB_QPRIME,
            DEFAULT_KINEMATIC_SIGMA, DEFAULT_TROPO_QPRIME,
        },
        Axis, Component, SecondarySystem, StochasticModel,
    },
};

fn default_coordinates_model() -> StochasticModel {
    StochasticModel::Constant
}

fn default_tropo_model() -> StochasticModel {
    StochasticModel::random_walk(DEFAULT_TROPO_QPRIME)
}

fn default_clock_model() -> StochasticModel {
    StochasticModel::white_noise(DEFAULT_CLOCK_SIGMA)
}

fn default_isb_model() -> StochasticModel {
    StochasticModel::random_walk(DEFAULT_ISB_QPRIME)
}

fn default_ambiguity_model() -> StochasticModel {
    StochasticModel::phase_ambiguity(DEFAULT_AMBIGUITY_SIGMA)
}

/// [Models] assigns one [StochasticModel] to each state component category.
/// Each axis owns its own model: there is no way to share one model
/// between independently estimated coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Models {
    /// dx (or dLat) model
    #[cfg_attr(feature = "serde", serde(default = "default_coordinates_model"))]
    pub x: StochasticModel,
    /// dy (or dLon) model
    #[cfg_attr(feature = "serde", serde(default = "default_coordinates_model"))]
    pub y: StochasticModel,
    /// dz (or dH) model
    #[cfg_attr(feature = "serde", serde(default = "default_coordinates_model"))]
    pub z: StochasticModel,
    /// Zenith wet troposphere model
    #[cfg_attr(feature = "serde", serde(default = "default_tropo_model"))]
    pub wet_troposphere: StochasticModel,
    /// Receiver clock model
    #[cfg_attr(feature = "serde", serde(default = "default_clock_model"))]
    pub receiver_clock: StochasticModel,
    /// Glonass ISB model override
    #[cfg_attr(feature = "serde", serde(default))]
    pub glonass_isb: Option<StochasticModel>,
    /// Galileo ISB model override
    #[cfg_attr(feature = "serde", serde(default))]
    pub galileo_isb: Option<StochasticModel>,
    /// BeiDou ISB model override
    #[cfg_attr(feature = "serde", serde(default))]
    pub beidou_isb: Option<StochasticModel>,
    /// Phase ambiguities model
    #[cfg_attr(feature = "serde", serde(default = "default_ambiguity_model"))]
    pub ambiguity: StochasticModel,
}

impl Default for Models {
    fn default() -> Self {
        Self {
            x: default_coordinates_model(),
            y: default_coordinates_model(),
            z: default_coordinates_model(),
            wet_troposphere: default_tropo_model(),
            receiver_clock: default_clock_model(),
            glonass_isb: None,
            galileo_isb: None,
            beidou_isb: None,
            ambiguity: default_ambiguity_model(),
        }
    }
}

impl Models {
    /// Kinematic [Models]: each axis is modeled as independent white noise.
    pub fn kinematic(sigma_x: f64, sigma_y: f64, sigma_z: f64) -> Self {
        Self {
            x: StochasticModel::white_noise(sigma_x),
            y: StochasticModel::white_noise(sigma_y),
            z: StochasticModel::white_noise(sigma_z),
            ..Default::default()
        }
    }

    /// Kinematic [Models] with default sigma on each axis.
    pub fn default_kinematic() -> Self {
        Self::kinematic(
            DEFAULT_KINEMATIC_SIGMA,
            DEFAULT_KINEMATIC_SIGMA,
            DEFAULT_KINEMATIC_SIGMA,
        )
    }

    /// Returns the [StochasticModel] of this [SecondarySystem] bias
    pub fn isb(&self, system: SecondarySystem) -> StochasticModel {
        self.isb_override(system).unwrap_or_else(default_isb_model)
    }

    fn isb_override(&self, system: SecondarySystem) -> Option<StochasticModel> {
        match system {
            SecondarySystem::Glonass => self.glonass_isb,
            SecondarySystem::Galileo => self.galileo_isb,
            SecondarySystem::BeiDou => self.beidou_isb,
        }
    }

    /// Returns the [StochasticModel] governing this [Component]
    pub fn model(&self, component: &Component) -> StochasticModel {
        match component {
            Component::Coordinate(Axis::X) => self.x,
            Component::Coordinate(Axis::Y) => self.y,
            Component::Coordinate(Axis::Z) => self.z,
            Component::WetTroposphere => self.wet_troposphere,
            Component::ReceiverClock => self.receiver_clock,
            Component::InterSystemBias(system) => self.isb(*system),
            Component::Ambiguity(_) => self.ambiguity,
        }
    }

    /// Applies a single [StochasticModel] to all three axes.
    /// Only memoryless models (constant or white noise) may be shared:
    /// use per axis assignment for anything else.
    pub fn with_coordinates_model(&self, model: StochasticModel) -> Result<Self, Error> {
        if !model.is_memoryless() {
            return Err(Error::SharedStatefulCoordinateModel);
        }
        let mut s = *self;
        s.x = model;
        s.y = model;
        s.z = model;
        Ok(s)
    }

    /// Validates these [Models] against the enabled secondary systems.
    pub(crate) fn validate(&self, enabled: &[SecondarySystem]) -> Result<(), Error> {
        let fixed = [
            (Component::Coordinate(Axis::X), self.x),
            (Component::Coordinate(Axis::Y), self.y),
            (Component::Coordinate(Axis::Z), self.z),
            (Component::WetTroposphere, self.wet_troposphere),
            (Component::ReceiverClock, self.receiver_clock),
        ];

        for (component, model) in fixed.iter() {
            if matches!(model, StochasticModel::PhaseAmbiguity { .. }) {
                return Err(Error::MisplacedAmbiguityModel(*component));
            }
            if !model.is_valid() {
                return Err(Error::InvalidModelParameter(*component));
            }
        }

        for system in SecondarySystem::ALL {
            if let Some(model) = self.isb_override(system) {
                if !enabled.contains(&system) {
                    return Err(Error::IsbModelForDisabledSystem(system));
                }
                let component = Component::InterSystemBias(system);
                if matches!(model, StochasticModel::PhaseAmbiguity { .. }) {
                    return Err(Error::MisplacedAmbiguityModel(component));
                }
                if !model.is_valid() {
                    return Err(Error::InvalidModelParameter(component));
                }
            }
        }

        match self.ambiguity {
            StochasticModel::PhaseAmbiguity { sigma } => {
                if !sigma.is_finite() || sigma <= 0.0 {
                    return Err(Error::InvalidAmbiguityModel);
                }
            },
            _ => return Err(Error::InvalidAmbiguityModel),
        }

        Ok(())
    }

    /// Variance of a freshly (re)created ambiguity
    pub fn fresh_ambiguity_variance(&self) -> f64 {
        self.ambiguity
            .reset_variance()
            .unwrap_or(DEFAULT_AMBIGUITY_SIGMA.powi(2))
    }
}

#[cfg(test)]
mod test {
    use super::Models;
    use crate::{
        cfg::Error,
        navigation::{Axis, Component, SecondarySystem, StochasticModel},
    };

    #[test]
    fn default_models() {
        let models = Models::default();
        assert_eq!(
            models.model(&Component::Coordinate(Axis::Y)),
            StochasticModel::Constant
        );
        assert_eq!(
            models.model(&Component::WetTroposphere),
            StochasticModel::random_walk(3.0E-8)
        );
        assert_eq!(
            models.model(&Component::ReceiverClock),
            StochasticModel::white_noise(3.0E5)
        );
        assert_eq!(
            models.model(&Component::InterSystemBias(SecondarySystem::Galileo)),
            StochasticModel::random_walk(1.0E-8)
        );
        assert_eq!(models.fresh_ambiguity_variance(), 4.0E14);
        assert!(models.validate(&[]).is_ok());
    }

    #[test]
    fn shared_coordinates_model() {
        let models = Models::default();

        let wn = models
            .with_coordinates_model(StochasticModel::white_noise(100.0))
            .unwrap_or_else(|e| panic!("white noise should be accepted: {}", e));

        assert_eq!(wn, Models::default_kinematic());

        assert_eq!(
            models.with_coordinates_model(StochasticModel::random_walk(0.04)),
            Err(Error::SharedStatefulCoordinateModel)
        );

        // per axis assignment accepts any model
        let mut per_axis = Models::kinematic(2.0, 2.0, 2.0);
        per_axis.z = StochasticModel::random_walk(0.04);
        assert!(per_axis.validate(&[]).is_ok());
    }

    #[test]
    fn invalid_models() {
        let mut models = Models::default();
        models.wet_troposphere = StochasticModel::phase_ambiguity(1.0);
        assert_eq!(
            models.validate(&[]),
            Err(Error::MisplacedAmbiguityModel(Component::WetTroposphere))
        );

        let mut models = Models::default();
        models.ambiguity = StochasticModel::Constant;
        assert_eq!(models.validate(&[]), Err(Error::InvalidAmbiguityModel));

        let mut models = Models::default();
        models.beidou_isb = Some(StochasticModel::Constant);
        assert_eq!(
            models.validate(&[SecondarySystem::Glonass]),
            Err(Error::IsbModelForDisabledSystem(SecondarySystem::BeiDou))
        );
        assert!(models.validate(&[SecondarySystem::BeiDou]).is_ok());

        let mut models = Models::default();
        models.receiver_clock = StochasticModel::white_noise(-1.0);
        assert_eq!(
            models.validate(&[]),
            Err(Error::InvalidModelParameter(Component::ReceiverClock))
        );
    }
}
