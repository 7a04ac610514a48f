//! State index and covariance ledger
use std::collections::HashMap;

use itertools::Itertools;
use log::{debug, info};
use nalgebra::{DMatrix, DVector};

use crate::{
    navigation::{Component, KfEstimate, SecondarySystem},
    prelude::{Epoch, SV},
};

/// [Origin] of one [Component] in the upcoming [Layout]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Origin {
    /// Carried forward from the ledger, at this index
    Carried(usize),
    /// Newly created (or reset) component
    Fresh,
}

/// State [Layout] of one epoch: ordered list of active [Component]s,
/// and where each one of them comes from.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    components: Vec<Component>,
    origins: Vec<Origin>,
    index: HashMap<Component, usize>,
}

impl Layout {
    fn new(components: Vec<Component>, origins: Vec<Origin>) -> Self {
        let index = components
            .iter()
            .enumerate()
            .map(|(i, c)| (*c, i))
            .collect();
        Self {
            components,
            origins,
            index,
        }
    }

    /// Number of active [Component]s
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Active [Component]s, in canonical order
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// Position of this [Component] in the state vector
    pub fn position(&self, component: &Component) -> Option<usize> {
        self.index.get(component).copied()
    }

    /// True if this [Component] is created (or reset) this epoch
    pub fn is_fresh(&self, i: usize) -> bool {
        matches!(self.origins.get(i), Some(Origin::Fresh))
    }

    pub(crate) fn origin(&self, i: usize) -> Origin {
        self.origins[i]
    }

    /// Number of tracked satellites (ambiguities)
    pub fn nb_ambiguities(&self) -> usize {
        self.components
            .iter()
            .filter(|c| matches!(c, Component::Ambiguity(_)))
            .count()
    }
}

/// [CovarianceLedger] stores the filter state of the last committed epoch,
/// indexed by stable [Component] identity. Components disappear by
/// structural removal (row and column deletion), which preserves
/// the covariance of every other component.
#[derive(Debug, Clone, Default)]
pub struct CovarianceLedger {
    /// Active [Component]s, in canonical order
    components: Vec<Component>,
    /// [Component] to state index
    index: HashMap<Component, usize>,
    /// Last committed [KfEstimate]
    estimate: KfEstimate,
    /// [Epoch] of last commit
    t: Option<Epoch>,
}

impl CovarianceLedger {
    /// True if nothing has been committed yet
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// [Epoch] of last commit
    pub fn epoch(&self) -> Option<Epoch> {
        self.t
    }

    /// Active [Component]s, in canonical order
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// Last committed [KfEstimate]
    pub fn state(&self) -> &KfEstimate {
        &self.estimate
    }

    /// Estimated value of this [Component]
    pub fn estimate(&self, component: &Component) -> Option<f64> {
        let i = self.index.get(component)?;
        Some(self.estimate.x[*i])
    }

    /// Estimated variance of this [Component]
    pub fn variance(&self, component: &Component) -> Option<f64> {
        let i = self.index.get(component)?;
        Some(self.estimate.p[(*i, *i)])
    }

    /// Estimated covariance between two [Component]s
    pub fn covariance(&self, a: &Component, b: &Component) -> Option<f64> {
        let i = self.index.get(a)?;
        let j = self.index.get(b)?;
        Some(self.estimate.p[(*i, *j)])
    }

    /// Secondary systems currently estimated
    pub fn isb_systems(&self) -> Vec<SecondarySystem> {
        self.components
            .iter()
            .filter_map(|c| match c {
                Component::InterSystemBias(system) => Some(*system),
                _ => None,
            })
            .collect()
    }

    /// Drops everything
    pub fn reset(&mut self) {
        self.components.clear();
        self.index.clear();
        self.estimate = KfEstimate::default();
        self.t = None;
    }

    /// Designs the [Layout] of the upcoming epoch. Pure operation,
    /// nothing is modified until [Self::commit].
    /// ## Input
    /// - t: upcoming [Epoch]
    /// - tracks: satellites contributing phase observations, with their cycle slip flag
    /// - isb: secondary systems with at least one usable satellite this epoch
    pub fn layout(&self, t: Epoch, tracks: &[(SV, bool)], isb: &[SecondarySystem]) -> Layout {
        let mut components = Component::FIXED.to_vec();

        components.extend(tracks.iter().map(|(sv, _)| Component::Ambiguity(*sv)));

        // once created, a bias lasts until the filter is reset
        components.extend(
            isb.iter()
                .chain(self.isb_systems().iter())
                .map(|system| Component::InterSystemBias(*system)),
        );

        let components = components.into_iter().sorted().dedup().collect::<Vec<_>>();

        let origins = components
            .iter()
            .map(|component| {
                let slipped = match component {
                    Component::Ambiguity(sv) => tracks
                        .iter()
                        .any(|(tracked, slip)| tracked == sv && *slip),
                    _ => false,
                };

                match self.index.get(component) {
                    Some(i) if !slipped => Origin::Carried(*i),
                    Some(_) => {
                        debug!("{}({}) - cycle slip: arc reset", t, component);
                        Origin::Fresh
                    },
                    None => {
                        if let Component::InterSystemBias(system) = component {
                            info!("{} - new {} inter system bias", t, system);
                        } else if !self.is_empty() {
                            debug!("{}({}) - new arc", t, component);
                        }
                        Origin::Fresh
                    },
                }
            })
            .collect::<Vec<_>>();

        for component in self.components.iter() {
            if !components.contains(component) {
                debug!("{}({}) - track lost", t, component);
            }
        }

        Layout::new(components, origins)
    }

    /// Builds the prior [KfEstimate] of this [Layout]: carried components keep
    /// their value and (co)variances, fresh components start at zero,
    /// with their prior variance and no correlation to anything else.
    /// ## Input
    /// - layout: upcoming [Layout]
    /// - prior_variance: variance of a fresh [Component]
    pub fn prior<F: Fn(&Component) -> f64>(&self, layout: &Layout, prior_variance: F) -> KfEstimate {
        let n = layout.len();

        let mut x = DVector::<f64>::zeros(n);
        let mut p = DMatrix::<f64>::zeros(n, n);

        for i in 0..n {
            match layout.origin(i) {
                Origin::Carried(old_i) => {
                    x[i] = self.estimate.x[old_i];

                    for j in 0..n {
                        if let Origin::Carried(old_j) = layout.origin(j) {
                            p[(i, j)] = self.estimate.p[(old_i, old_j)];
                        }
                    }
                },
                Origin::Fresh => {
                    p[(i, i)] = prior_variance(&layout.components[i]);
                },
            }
        }

        KfEstimate::new(x, p)
    }

    /// Commits a new [KfEstimate], described by this [Layout].
    pub fn commit(&mut self, t: Epoch, layout: Layout, estimate: KfEstimate) {
        self.components = layout.components;
        self.index = layout.index;
        self.estimate = estimate;
        self.t = Some(t);
    }
}

#[cfg(test)]
mod test {
    use super::{CovarianceLedger, Layout};
    use crate::{
        navigation::{Axis, Component, KfEstimate, SecondarySystem},
        prelude::{Constellation, Epoch, SV},
    };
    use nalgebra::{DMatrix, DVector};

    const G01: SV = SV {
        constellation: Constellation::GPS,
        prn: 1,
    };
    const G02: SV = SV {
        constellation: Constellation::GPS,
        prn: 2,
    };
    const G03: SV = SV {
        constellation: Constellation::GPS,
        prn: 3,
    };
    const E05: SV = SV {
        constellation: Constellation::Galileo,
        prn: 5,
    };

    fn t0() -> Epoch {
        Epoch::from_gpst_seconds(1.0E9)
    }

    /// Commits a dense, fully correlated estimate, so carried entries
    /// are easy to track: P(i, j) = 100 * (i + 1) + (j + 1) and x(i) = i + 1.
    fn commit_dense(ledger: &mut CovarianceLedger, layout: Layout) {
        let n = layout.len();
        let x = DVector::from_fn(n, |i, _| (i + 1) as f64);
        let p = DMatrix::from_fn(n, n, |i, j| {
            let (a, b) = (i.min(j), i.max(j));
            if i == j {
                1.0E6 + i as f64
            } else {
                100.0 * (a + 1) as f64 + (b + 1) as f64
            }
        });
        ledger.commit(t0(), layout, KfEstimate::new(x, p));
    }

    #[test]
    fn first_layout() {
        let ledger = CovarianceLedger::default();
        let layout = ledger.layout(t0(), &[(G02, false), (G01, false)], &[]);

        assert_eq!(layout.len(), Component::NB_FIXED + 2);
        assert_eq!(layout.nb_ambiguities(), 2);
        assert_eq!(layout.position(&Component::Ambiguity(G01)), Some(5));
        assert_eq!(layout.position(&Component::Ambiguity(G02)), Some(6));
        assert!((0..layout.len()).all(|i| layout.is_fresh(i)));

        let prior = ledger.prior(&layout, |c| match c {
            Component::Ambiguity(_) => 4.0E14,
            _ => 1.0,
        });

        assert_eq!(prior.x, DVector::zeros(7));
        assert_eq!(prior.p[(6, 6)], 4.0E14);
        assert_eq!(prior.p[(0, 0)], 1.0);
        assert_eq!(prior.p[(0, 6)], 0.0);
    }

    #[test]
    fn lost_track_is_structurally_removed() {
        let mut ledger = CovarianceLedger::default();
        let layout = ledger.layout(t0(), &[(G01, false), (G02, false), (G03, false)], &[]);
        commit_dense(&mut ledger, layout);

        let amb1 = Component::Ambiguity(G01);
        let amb3 = Component::Ambiguity(G03);
        let clock = Component::ReceiverClock;

        let cov_13 = ledger.covariance(&amb1, &amb3).unwrap();
        let cov_c3 = ledger.covariance(&clock, &amb3).unwrap();
        let var_3 = ledger.variance(&amb3).unwrap();
        let x_3 = ledger.estimate(&amb3).unwrap();

        // G02 is lost
        let layout = ledger.layout(t0(), &[(G01, false), (G03, false)], &[]);
        assert_eq!(layout.len(), Component::NB_FIXED + 2);
        assert_eq!(layout.position(&Component::Ambiguity(G02)), None);

        let prior = ledger.prior(&layout, |_| 0.0);

        let i1 = layout.position(&amb1).unwrap();
        let i3 = layout.position(&amb3).unwrap();
        let ic = layout.position(&clock).unwrap();

        assert_eq!(prior.p[(i1, i3)], cov_13);
        assert_eq!(prior.p[(i3, i1)], cov_13);
        assert_eq!(prior.p[(ic, i3)], cov_c3);
        assert_eq!(prior.p[(i3, i3)], var_3);
        assert_eq!(prior.x[i3], x_3);

        // fixed block is untouched
        for i in 0..Component::NB_FIXED {
            for j in 0..Component::NB_FIXED {
                assert_eq!(prior.p[(i, j)], ledger.state().p[(i, j)]);
            }
        }
    }

    #[test]
    fn cycle_slip_resets_arc() {
        let mut ledger = CovarianceLedger::default();
        let layout = ledger.layout(t0(), &[(G01, false), (G02, false)], &[]);
        commit_dense(&mut ledger, layout);

        let layout = ledger.layout(t0(), &[(G01, true), (G02, false)], &[]);
        let prior = ledger.prior(&layout, |c| match c {
            Component::Ambiguity(_) => 4.0E14,
            _ => 1.0,
        });

        let i1 = layout.position(&Component::Ambiguity(G01)).unwrap();
        let i2 = layout.position(&Component::Ambiguity(G02)).unwrap();

        assert!(layout.is_fresh(i1));
        assert!(!layout.is_fresh(i2));

        assert_eq!(prior.x[i1], 0.0);
        assert_eq!(prior.p[(i1, i1)], 4.0E14);

        for j in 0..layout.len() {
            if j != i1 {
                assert_eq!(prior.p[(i1, j)], 0.0);
                assert_eq!(prior.p[(j, i1)], 0.0);
            }
        }

        assert_eq!(
            prior.p[(i2, i2)],
            ledger.variance(&Component::Ambiguity(G02)).unwrap()
        );
    }

    #[test]
    fn inter_system_bias_persists() {
        let mut ledger = CovarianceLedger::default();
        let layout = ledger.layout(
            t0(),
            &[(G01, false), (E05, false)],
            &[SecondarySystem::Galileo],
        );

        let isb = Component::InterSystemBias(SecondarySystem::Galileo);
        assert_eq!(layout.position(&isb), Some(layout.len() - 1));
        commit_dense(&mut ledger, layout);

        // no Galileo satellite in sight: bias is preserved
        let layout = ledger.layout(t0(), &[(G01, false)], &[]);
        assert_eq!(layout.len(), Component::NB_FIXED + 2);

        let i = layout.position(&isb).unwrap();
        assert!(!layout.is_fresh(i));

        ledger.reset();
        assert!(ledger.is_empty());
        assert!(ledger.isb_systems().is_empty());
        assert_eq!(
            ledger.layout(t0(), &[], &[]).components(),
            &Component::FIXED
        );
        assert_eq!(
            ledger.layout(t0(), &[], &[]).position(&Component::Coordinate(Axis::Z)),
            Some(2)
        );
    }
}
