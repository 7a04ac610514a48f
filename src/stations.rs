//! Multi station processing
use std::thread;

use log::{debug, error};

use crate::{
    cfg::Config,
    error::Error,
    navigation::SatelliteObservation,
    prelude::{Duration, Epoch},
    solutions::PPPSolution,
    solver::Solver,
};

/// Time ordered observations of one station
pub type StationEpochs = Vec<(Epoch, Vec<SatelliteObservation>)>;

/// [StationReport] summarizes the processing of one station
#[derive(Debug, Clone, Default)]
pub struct StationReport {
    /// Solutions of each successful epoch
    pub solutions: Vec<PPPSolution>,
    /// Skipped epochs and their cause
    pub skipped: Vec<(Epoch, Error)>,
    /// Time to first convergence of each convergence episode
    pub ttfc: Vec<Duration>,
}

impl StationReport {
    /// True if the last successful epoch was converged
    pub fn converged(&self) -> bool {
        self.solutions.last().map(|s| s.converged).unwrap_or(false)
    }
}

/// Processes the time series of one station, in a dedicated [Solver].
/// Epoch local failures are reported and skipped,
/// any other failure aborts this station.
pub fn process_station(
    cfg: &Config,
    epochs: &[(Epoch, Vec<SatelliteObservation>)],
) -> Result<StationReport, Error> {
    let mut solver = Solver::new(cfg)?;
    let mut report = StationReport::default();

    for (t, observations) in epochs.iter() {
        match solver.resolve(*t, observations) {
            Ok(solution) => report.solutions.push(solution),
            Err(e) => {
                if !e.is_epoch_local() {
                    error!("{} - aborting: {}", t, e);
                    return Err(e);
                }
                report.skipped.push((*t, e));
            },
        }
    }

    report.ttfc = solver.ttfc().to_vec();
    Ok(report)
}

/// Processes several stations in parallel, one thread and one
/// [Solver] per station. Filter states are never shared.
/// ## Input
/// - cfg: [Config] applied to every station
/// - stations: station identifiers and their time series
/// ## Returns
/// - one result per station, in input order
pub fn process_stations<'a, K>(
    cfg: &Config,
    stations: &'a [(K, StationEpochs)],
) -> Vec<(&'a K, Result<StationReport, Error>)> {
    thread::scope(|scope| {
        let handles = stations
            .iter()
            .enumerate()
            .map(|(i, (key, epochs))| {
                debug!("spawning station #{}", i);
                (key, scope.spawn(move || process_station(cfg, epochs)))
            })
            .collect::<Vec<_>>();

        handles
            .into_iter()
            .map(|(key, handle)| {
                let report = handle
                    .join()
                    .unwrap_or_else(|panic| std::panic::resume_unwind(panic));
                (key, report)
            })
            .collect()
    })
}
