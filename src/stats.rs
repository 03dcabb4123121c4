//! Budget accounting and the incumbent trajectory.

use std::path::Path;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::config::Configuration;
use crate::error::Result;
use crate::persistence;
use crate::scenario::Scenario;
use crate::types::Cost;

/// One incumbent change.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryEntry {
    pub config: Configuration,
    pub cost: Cost,
    /// Number of finished trials when the incumbent changed.
    pub trial: usize,
    /// Wall-clock seconds used when the incumbent changed.
    pub walltime: f64,
}

#[derive(Clone, Copy, Debug)]
struct Limits {
    walltime: f64,
    cputime: f64,
    n_trials: usize,
}

impl Limits {
    fn from_scenario(scenario: &Scenario) -> Self {
        Self {
            walltime: scenario.walltime_limit,
            cputime: scenario.cputime_limit,
            n_trials: scenario.n_trials,
        }
    }
}

/// Counters of the running optimization.
///
/// `submitted` and `finished` only ever grow during a run. The wall clock
/// keeps counting across a save and reload: the persisted amount is the
/// base the live timer adds to.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Stats {
    /// Trials handed to the runner.
    pub submitted: usize,
    /// Trials whose result was told.
    pub finished: usize,
    /// Distinct configurations in the run history.
    pub n_configs: usize,
    /// Summed runtime reported by the target function, in seconds.
    pub target_function_walltime_used: f64,
    /// Number of incumbent changes.
    pub incumbent_changed: usize,
    walltime_used: f64,
    trajectory: Vec<TrajectoryEntry>,
    #[serde(skip)]
    started: Option<Instant>,
    #[serde(skip, default = "default_limits")]
    limits: Limits,
}

fn default_limits() -> Limits {
    Limits {
        walltime: f64::INFINITY,
        cputime: f64::INFINITY,
        n_trials: usize::MAX,
    }
}

impl Stats {
    /// Fresh counters using the limits of `scenario`.
    #[must_use]
    pub fn new(scenario: &Scenario) -> Self {
        Self::with_limits(Limits::from_scenario(scenario))
    }

    fn with_limits(limits: Limits) -> Self {
        Self {
            submitted: 0,
            finished: 0,
            n_configs: 0,
            target_function_walltime_used: 0.0,
            incumbent_changed: 0,
            walltime_used: 0.0,
            trajectory: Vec::new(),
            started: None,
            limits,
        }
    }

    /// Start (or restart) the wall clock.
    pub fn start_timing(&mut self) {
        if let Some(started) = self.started.take() {
            self.walltime_used += started.elapsed().as_secs_f64();
        }
        self.started = Some(Instant::now());
    }

    /// Wall-clock seconds used so far, including previous sessions.
    #[must_use]
    pub fn walltime_used(&self) -> f64 {
        self.walltime_used + self.started.map_or(0.0, |s| s.elapsed().as_secs_f64())
    }

    #[must_use]
    pub fn remaining_walltime(&self) -> f64 {
        self.limits.walltime - self.walltime_used()
    }

    #[must_use]
    pub fn remaining_cputime(&self) -> f64 {
        self.limits.cputime - self.target_function_walltime_used
    }

    #[must_use]
    pub fn remaining_trials(&self) -> usize {
        self.limits.n_trials.saturating_sub(self.submitted)
    }

    /// Returns `true` once any budget is used up.
    #[must_use]
    pub fn is_budget_exhausted(&self) -> bool {
        self.remaining_walltime() <= 0.0 || self.remaining_cputime() <= 0.0 || self.remaining_trials() == 0
    }

    /// Record a new incumbent.
    pub fn update_trajectory(&mut self, config: &Configuration, cost: Cost) {
        self.incumbent_changed += 1;
        self.trajectory.push(TrajectoryEntry {
            config: config.clone(),
            cost,
            trial: self.finished,
            walltime: self.walltime_used(),
        });
    }

    /// The most recent incumbent, if any.
    #[must_use]
    pub fn incumbent(&self) -> Option<&Configuration> {
        self.trajectory.last().map(|e| &e.config)
    }

    #[must_use]
    pub fn trajectory(&self) -> &[TrajectoryEntry] {
        &self.trajectory
    }

    /// Log a summary of the counters.
    pub fn print(&self) {
        trace_info!(
            submitted = self.submitted,
            finished = self.finished,
            configs = self.n_configs,
            incumbent_changed = self.incumbent_changed,
            walltime_used = self.walltime_used(),
            target_function_walltime_used = self.target_function_walltime_used,
            "statistics"
        );
    }

    /// Zero every counter and clear the trajectory. Limits are kept.
    pub fn reset(&mut self) {
        *self = Self::with_limits(self.limits);
    }

    /// Write the counters to `path`. The live timer is folded into the
    /// persisted wall-clock amount.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`](crate::Error::Storage) if the file cannot
    /// be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut snapshot = self.clone();
        snapshot.walltime_used = self.walltime_used();
        persistence::write_json_atomic(path, &snapshot)
    }

    /// Read counters written by [`save`](Self::save), applying the limits of
    /// `scenario`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`](crate::Error::Storage) if the file is
    /// missing or malformed.
    pub fn load(path: &Path, scenario: &Scenario) -> Result<Self> {
        let mut stats: Self = persistence::read_json(path)?;
        stats.limits = Limits::from_scenario(scenario);
        Ok(stats)
    }
}
