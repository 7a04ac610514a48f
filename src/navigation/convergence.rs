use std::collections::VecDeque;

use log::{info, warn};

use crate::prelude::{Duration, Epoch};

/// [ConvergenceTracker] monitors the coordinates offsets
/// over a sliding window of epochs. Convergence is declared
/// while the window is full and every one of its epochs lies within tolerance,
/// and is lost as soon as one of them does not.
/// Time to first convergence is recorded once per episode.
#[derive(Debug, Clone, Default)]
pub struct ConvergenceTracker {
    /// Window size, in epochs
    size: usize,
    /// Latest tolerance tests
    window: VecDeque<bool>,
    /// Start of current episode
    t0: Option<Epoch>,
    /// Current converged flag
    converged: bool,
    /// True once this episode's first convergence is recorded
    ttfc_recorded: bool,
    /// Time to first convergence, per episode
    ttfc: Vec<Duration>,
}

impl ConvergenceTracker {
    /// Creates a new [ConvergenceTracker] with this window size
    pub fn new(size: usize) -> Self {
        Self {
            size,
            ..Default::default()
        }
    }

    /// True once the current episode has started
    pub fn is_started(&self) -> bool {
        self.t0.is_some()
    }

    /// Starts a new episode at this [Epoch]
    pub fn start(&mut self, t: Epoch) {
        self.t0 = Some(t);
        self.window.clear();
        self.converged = false;
        self.ttfc_recorded = false;
    }

    /// Pushes one new tolerance test, returns true if this episode's
    /// first convergence is declared on this very epoch.
    pub fn push(&mut self, t: Epoch, within_tolerance: bool) -> bool {
        self.window.push_back(within_tolerance);

        while self.window.len() > self.size {
            self.window.pop_front();
        }

        let converged =
            self.window.len() == self.size && self.window.iter().all(|within| *within);

        if self.converged && !converged {
            warn!("{} - convergence lost", t);
        }

        self.converged = converged;

        if !converged || self.ttfc_recorded {
            return false;
        }

        self.ttfc_recorded = true;

        if let Some(t0) = self.t0 {
            let ttfc = t - t0;
            info!("{} - converged (ttfc={})", t, ttfc);
            self.ttfc.push(ttfc);
        }

        true
    }

    /// Current converged flag
    pub fn converged(&self) -> bool {
        self.converged
    }

    /// Time to first convergence of each converged episode
    pub fn ttfc(&self) -> &[Duration] {
        &self.ttfc
    }

    /// Ends current episode. History of past episodes is preserved.
    pub fn end_episode(&mut self) {
        self.t0 = None;
        self.window.clear();
        self.converged = false;
        self.ttfc_recorded = false;
    }
}

#[cfg(test)]
mod test {
    use super::ConvergenceTracker;
    use crate::prelude::{Duration, Epoch};

    #[test]
    fn window_must_be_full() {
        let t0 = Epoch::from_gpst_seconds(1.0E9);
        let dt = Duration::from_seconds(30.0);

        let mut tracker = ConvergenceTracker::new(3);
        tracker.start(t0);

        assert!(!tracker.push(t0, true));
        assert!(!tracker.push(t0 + dt, true));
        assert!(tracker.push(t0 + dt * 2_i64, true));
        assert!(tracker.converged());
        assert_eq!(tracker.ttfc(), &[dt * 2_i64]);

        // one outlier is enough to lose convergence
        assert!(!tracker.push(t0 + dt * 3_i64, false));
        assert!(!tracker.converged());
        assert!(!tracker.push(t0 + dt * 4_i64, true));
        assert!(!tracker.converged());

        // recovered, but the first convergence is recorded only once
        assert!(!tracker.push(t0 + dt * 5_i64, true));
        assert!(!tracker.push(t0 + dt * 6_i64, true));
        assert!(tracker.converged());
        assert_eq!(tracker.ttfc(), &[dt * 2_i64]);
    }

    #[test]
    fn outlier_restarts_window() {
        let t0 = Epoch::from_gpst_seconds(1.0E9);
        let dt = Duration::from_seconds(1.0);

        let mut tracker = ConvergenceTracker::new(3);
        tracker.start(t0);

        let tests = [true, true, false, true, true, true];
        let declared = tests
            .iter()
            .enumerate()
            .map(|(i, within)| tracker.push(t0 + dt * i as i64, *within))
            .collect::<Vec<_>>();

        assert_eq!(declared, vec![false, false, false, false, false, true]);
        assert_eq!(tracker.ttfc(), &[dt * 5_i64]);
    }

    #[test]
    fn episodes() {
        let t0 = Epoch::from_gpst_seconds(1.0E9);
        let dt = Duration::from_seconds(10.0);

        let mut tracker = ConvergenceTracker::new(1);
        tracker.start(t0);
        assert!(tracker.push(t0 + dt, true));

        tracker.end_episode();
        assert!(!tracker.converged());
        assert!(!tracker.is_started());

        tracker.start(t0 + dt * 10_i64);
        assert!(tracker.push(t0 + dt * 12_i64, true));
        assert_eq!(tracker.ttfc(), &[dt, dt * 2_i64]);
    }
}
