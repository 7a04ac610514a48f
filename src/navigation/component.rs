use std::cmp::Ordering;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::prelude::{Constellation, SV};

/// Coordinate [Axis]. Its meaning depends on the selected
/// [ReferenceFrame](crate::prelude::ReferenceFrame):
/// (dx, dy, dz) in ECEF, (dLat, dLon, dH) in the local frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Axis {
    /// dx or dLat
    X,
    /// dy or dLon
    Y,
    /// dz or dH
    Z,
}

impl Axis {
    pub(crate) const ALL: [Self; 3] = [Self::X, Self::Y, Self::Z];

    pub(crate) fn index(&self) -> usize {
        match self {
            Self::X => 0,
            Self::Y => 1,
            Self::Z => 2,
        }
    }
}

/// Secondary [SecondarySystem]s, each one contributing its own
/// inter-system bias with respect to the GPS reference clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SecondarySystem {
    Glonass,
    Galileo,
    BeiDou,
}

impl std::fmt::Display for SecondarySystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Glonass => write!(f, "GLO"),
            Self::Galileo => write!(f, "GAL"),
            Self::BeiDou => write!(f, "BDS"),
        }
    }
}

impl SecondarySystem {
    pub(crate) const ALL: [Self; 3] = [Self::Glonass, Self::Galileo, Self::BeiDou];

    /// Returns [SecondarySystem] this [Constellation] belongs to.
    /// None for GPS (reference system) and non supported systems.
    pub fn from_constellation(constellation: Constellation) -> Option<Self> {
        match constellation {
            Constellation::Glonass => Some(Self::Glonass),
            Constellation::Galileo => Some(Self::Galileo),
            Constellation::BeiDou => Some(Self::BeiDou),
            _ => None,
        }
    }

    /// Returns [Constellation] of this [SecondarySystem]
    pub fn constellation(&self) -> Constellation {
        match self {
            Self::Glonass => Constellation::Glonass,
            Self::Galileo => Constellation::Galileo,
            Self::BeiDou => Constellation::BeiDou,
        }
    }
}

fn constellation_rank(constellation: Constellation) -> u8 {
    match constellation {
        Constellation::GPS => 0,
        Constellation::Glonass => 1,
        Constellation::Galileo => 2,
        Constellation::BeiDou => 3,
        _ => 4,
    }
}

/// State [Component] of the PPP filter.
/// The fixed block ([Component::Coordinate], [Component::WetTroposphere]
/// and [Component::ReceiverClock]) lives as long as the filter does.
/// [Component::Ambiguity] and [Component::InterSystemBias] are created
/// and destroyed dynamically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Component {
    /// Receiver coordinate offset (m)
    Coordinate(Axis),
    /// Zenith wet tropospheric delay (m)
    WetTroposphere,
    /// Receiver clock offset (m)
    ReceiverClock,
    /// Float phase ambiguity of this [SV] (m)
    Ambiguity(SV),
    /// Inter system bias of this [SecondarySystem] (m)
    InterSystemBias(SecondarySystem),
}

impl Component {
    /// Number of [Component]s in the fixed block
    pub const NB_FIXED: usize = 5;

    /// Fixed block, in canonical order
    pub const FIXED: [Self; Self::NB_FIXED] = [
        Self::Coordinate(Axis::X),
        Self::Coordinate(Axis::Y),
        Self::Coordinate(Axis::Z),
        Self::WetTroposphere,
        Self::ReceiverClock,
    ];

    /// True if this [Component] belongs to the fixed block
    pub fn is_fixed(&self) -> bool {
        matches!(
            self,
            Self::Coordinate(_) | Self::WetTroposphere | Self::ReceiverClock
        )
    }

    /// Returns [SV] this ambiguity [Component] is attached to
    pub fn ambiguity_sv(&self) -> Option<SV> {
        match self {
            Self::Ambiguity(sv) => Some(*sv),
            _ => None,
        }
    }

    /// Canonical ordering: fixed block, then ambiguities
    /// in satellite order, then inter system biases.
    fn sort_key(&self) -> (u8, u8, u8) {
        match self {
            Self::Coordinate(axis) => (0, axis.index() as u8, 0),
            Self::WetTroposphere => (1, 0, 0),
            Self::ReceiverClock => (2, 0, 0),
            Self::Ambiguity(sv) => (3, constellation_rank(sv.constellation), sv.prn),
            Self::InterSystemBias(system) => (4, *system as u8, 0),
        }
    }
}

impl PartialOrd for Component {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Component {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl std::fmt::Display for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Coordinate(Axis::X) => write!(f, "x"),
            Self::Coordinate(Axis::Y) => write!(f, "y"),
            Self::Coordinate(Axis::Z) => write!(f, "z"),
            Self::WetTroposphere => write!(f, "wet-tropo"),
            Self::ReceiverClock => write!(f, "clock"),
            Self::Ambiguity(sv) => write!(f, "amb({})", sv),
            Self::InterSystemBias(system) => write!(f, "isb({})", system),
        }
    }
}
