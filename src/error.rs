use thiserror::Error;

use crate::{
    cfg::Error as ConfigError,
    navigation::Component,
    prelude::{Epoch, SV},
};

/// [FailureKind] classifies every [Error], so the caller
/// may decide whether to skip the current epoch or to abort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Too few usable satellites to determine the state this epoch.
    /// The epoch is skipped, the filter state is preserved.
    Observability,
    /// Singular or ill-conditioned measurement update.
    /// The epoch is skipped, the filter state is preserved.
    Numerical,
    /// Invalid [Config](crate::prelude::Config), detected at construction time.
    Configuration,
    /// Invalid API usage (bad time ordering, unknown component..).
    Usage,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Not enough usable satellites were proposed, the system is not observable.
    #[error("not enough satellites: {found} usable, {needed} required")]
    NotEnoughSatellites { needed: usize, found: usize },

    /// Weight matrix could not be inverted into a measurement noise covariance.
    /// This typically happens when null weights are proposed.
    #[error("singular weight matrix")]
    SingularWeightMatrix,

    /// Innovation covariance is singular or too poorly conditioned
    /// to complete the measurement update.
    #[error("singular innovation covariance")]
    SingularInnovation,

    /// Measurement update produced non finite values.
    #[error("measurement update produced non finite values")]
    NonFiniteSolution,

    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Epochs must be proposed in chronological order.
    #[error("bad operation: negative time ({0} is prior last epoch)")]
    TimeUnderflow(Epoch),

    /// Querying the filter prior any epoch was processed.
    #[error("internal error: filter is not initialized (bad op)")]
    UninitializedFilter,

    /// Design matrix refers to a state component that is not active.
    #[error("unknown state component {0}")]
    UnknownComponent(Component),

    /// Satellite proposed without any code or phase measurement.
    #[error("{0} - no code nor phase measurement")]
    MissingMeasurement(SV),
}

impl Error {
    /// Returns the [FailureKind] of this [Error]
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::NotEnoughSatellites { .. } => FailureKind::Observability,
            Self::SingularWeightMatrix | Self::SingularInnovation | Self::NonFiniteSolution => {
                FailureKind::Numerical
            },
            Self::Config(_) => FailureKind::Configuration,
            Self::TimeUnderflow(_)
            | Self::UninitializedFilter
            | Self::UnknownComponent(_)
            | Self::MissingMeasurement(_) => FailureKind::Usage,
        }
    }

    /// True when this [Error] only invalidates the current epoch:
    /// processing may resume with the following epoch.
    pub fn is_epoch_local(&self) -> bool {
        matches!(
            self.kind(),
            FailureKind::Observability | FailureKind::Numerical
        )
    }
}
