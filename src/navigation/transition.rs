use nalgebra::DMatrix;

use crate::{
    cfg::Models,
    navigation::{Layout, Propagation},
};

/// [Transition] over one epoch interval: diagonal state transition
/// matrix and diagonal process noise matrix, both sized to the
/// [Layout] they were built for.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    /// State transition matrix Φ
    pub phi: DMatrix<f64>,
    /// Process noise matrix Q
    pub q: DMatrix<f64>,
}

impl Transition {
    /// Builds the [Transition] of this [Layout].
    /// Each component is propagated by its own stochastic model.
    /// Fresh components see a zero time interval, and are flagged for reset.
    /// ## Input
    /// - layout: [Layout] of upcoming epoch
    /// - models: [Models] in use
    /// - dt_s: elapsed time since previous commit, in seconds
    pub fn new(layout: &Layout, models: &Models, dt_s: f64) -> Self {
        let n = layout.len();

        let mut phi = DMatrix::<f64>::zeros(n, n);
        let mut q = DMatrix::<f64>::zeros(n, n);

        for (i, component) in layout.components().iter().enumerate() {
            let fresh = layout.is_fresh(i);
            let dt_s = if fresh { 0.0 } else { dt_s };

            let Propagation { phi: phi_i, q: q_i } =
                models.model(component).propagation(dt_s, fresh);

            phi[(i, i)] = phi_i;
            q[(i, i)] = q_i;
        }

        Self { phi, q }
    }

    /// Dimension of this [Transition]
    pub fn len(&self) -> usize {
        self.phi.nrows()
    }

    /// True if this [Transition] is empty
    pub fn is_empty(&self) -> bool {
        self.phi.is_empty()
    }
}
