use log::error;
use nalgebra::{DMatrix, DVector};

use crate::{
    error::Error,
    navigation::{MeasurementModel, Transition},
};

/// Filter state estimate, dimensioned at runtime
#[derive(Debug, Clone, PartialEq)]
pub struct KfEstimate {
    /// P Matrix
    pub p: DMatrix<f64>,

    /// x Vector
    pub x: DVector<f64>,
}

impl Default for KfEstimate {
    fn default() -> Self {
        Self::zero(0)
    }
}

impl KfEstimate {
    /// Create a zero [KfEstimate] of dimension n
    pub fn zero(n: usize) -> Self {
        let x = DVector::<f64>::zeros(n);
        let p = DMatrix::<f64>::zeros(n, n);
        Self { p, x }
    }

    /// Create new [KfEstimate]
    pub fn new(x: DVector<f64>, p: DMatrix<f64>) -> Self {
        Self { p, x }
    }

    /// Dimension of this [KfEstimate]
    pub fn len(&self) -> usize {
        self.x.nrows()
    }

    /// True if this [KfEstimate] is empty
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// True if all values are finite
    pub fn is_finite(&self) -> bool {
        self.x.iter().chain(self.p.iter()).all(|v| v.is_finite())
    }

    /// Sum of the variances of the first n states
    pub fn partial_trace(&self, n: usize) -> f64 {
        (0..n.min(self.len())).map(|i| self.p[(i, i)]).sum()
    }
}

/// [Kalman] filter with runtime dimension.
/// It does not own the state: each step consumes
/// an estimate and returns a new one, so a failed step
/// never alters the caller's state.
#[derive(Debug, Clone, Copy)]
pub struct Kalman {
    /// Smallest acceptable ratio between the smallest and the
    /// largest pivot of the innovation covariance factorization.
    tolerance: f64,
}

impl Kalman {
    /// Create a new [Kalman] filter
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }

    /// Time update, returns predicted [KfEstimate]:
    /// x = Φx and P = ΦPΦᵀ + Q
    pub fn predict(&self, estimate: &KfEstimate, transition: &Transition) -> KfEstimate {
        let phi = &transition.phi;
        let x = phi * &estimate.x;
        let p = phi * &estimate.p * phi.transpose() + &transition.q;
        KfEstimate { x, p }
    }

    /// Measurement update, returns corrected [KfEstimate].
    /// Gain is obtained by Cholesky solving of the innovation covariance,
    /// and covariance is updated in Joseph form then symmetrized.
    ///
    /// ## Input
    /// - predicted: predicted [KfEstimate]
    /// - measurement: [MeasurementModel] of the current epoch
    pub fn correct(
        &self,
        predicted: &KfEstimate,
        measurement: &MeasurementModel,
    ) -> Result<KfEstimate, Error> {
        let h = &measurement.h;

        let r = measurement
            .w
            .clone()
            .try_inverse()
            .ok_or(Error::SingularWeightMatrix)?;

        if !r.iter().all(|v| v.is_finite()) {
            return Err(Error::SingularWeightMatrix);
        }

        let p_ht = &predicted.p * h.transpose();

        let s = h * &p_ht + &r;
        let s = (&s + s.transpose()) * 0.5;

        let cholesky = s.cholesky().ok_or(Error::SingularInnovation)?;

        let pivots = cholesky.l_dirty().diagonal().map(|l_ii| l_ii * l_ii);
        let (min, max) = (pivots.min(), pivots.max());

        if min / max < self.tolerance {
            error!("ill-conditioned innovation: pivot ratio {:e}", min / max);
            return Err(Error::SingularInnovation);
        }

        // K = PHᵀS⁻¹, solved as Kᵀ = S⁻¹HP
        let k = cholesky.solve(&p_ht.transpose()).transpose();

        let innovation = &measurement.y - h * &predicted.x;
        let x = &predicted.x + &k * innovation;

        let n = predicted.len();
        let i_kh = DMatrix::<f64>::identity(n, n) - &k * h;

        let p = &i_kh * &predicted.p * i_kh.transpose() + &k * r * k.transpose();
        let p = (&p + p.transpose()) * 0.5;

        let estimate = KfEstimate { x, p };

        if !estimate.is_finite() {
            return Err(Error::NonFiniteSolution);
        }

        Ok(estimate)
    }
}
