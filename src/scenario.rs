//! The scenario: everything that defines an optimization run.
//!
//! A [`Scenario`] is plain data. It is compared field by field against the
//! persisted copy of a previous run to decide whether that run can be
//! resumed, so everything that changes the meaning of a run belongs here.
//!
//! ```
//! use smbo::config::ConfigSpace;
//! use smbo::Scenario;
//!
//! let scenario = Scenario::builder(ConfigSpace::new().float("x", -5.0, 5.0))
//!     .name("quadratic")
//!     .n_trials(50)
//!     .n_workers(2)
//!     .deterministic(true)
//!     .build()
//!     .unwrap();
//! assert_eq!(scenario.n_workers, 2);
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::ConfigSpace;
use crate::error::{Error, Result};
use crate::persistence::{self, SCENARIO_FILE};
use crate::types::{Cost, Direction};

/// Which racing policy drives the run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntensifierKind {
    /// One trial per challenger, no instance or budget racing.
    #[default]
    Simple,
}

/// Full description of an optimization run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Human-readable run name.
    pub name: String,
    /// The search space.
    pub config_space: ConfigSpace,
    /// Whether the target function is deterministic. Deterministic runs use
    /// seed `0` for every trial.
    pub deterministic: bool,
    /// Number of objectives the target function reports.
    pub n_objectives: usize,
    /// Whether lower or higher cost is better.
    pub direction: Direction,
    /// Problem instances; `None` if the target function takes none.
    pub instances: Option<Vec<String>>,
    /// Maximum number of trials in flight at once.
    pub n_workers: usize,
    /// Wall-clock budget of the whole run, in seconds.
    #[serde(with = "crate::types::json_f64")]
    pub walltime_limit: f64,
    /// Budget of summed target-function runtime, in seconds.
    #[serde(with = "crate::types::json_f64")]
    pub cputime_limit: f64,
    /// Maximum number of submitted trials.
    pub n_trials: usize,
    /// Per-trial wall-clock allowance handed to runners, in seconds.
    pub trial_walltime_limit: Option<f64>,
    /// Cost recorded for crashed or timed-out trials.
    pub crash_cost: Cost,
    /// Fraction of decision time granted to intensification.
    pub intensify_percentage: f64,
    /// Which racing policy to use.
    pub intensifier: IntensifierKind,
    /// Seed for every random source of the run.
    pub seed: u64,
    /// Where run history, stats and the scenario are persisted. `None`
    /// disables persistence and resuming.
    pub output_directory: Option<PathBuf>,
}

impl Scenario {
    /// Returns a [`ScenarioBuilder`] over `config_space` with default settings.
    #[must_use]
    pub fn builder(config_space: ConfigSpace) -> ScenarioBuilder {
        ScenarioBuilder::new(config_space)
    }

    /// Path of the persisted scenario, if an output directory is set.
    #[must_use]
    pub fn scenario_path(&self) -> Option<PathBuf> {
        self.output_directory.as_ref().map(|d| d.join(SCENARIO_FILE))
    }

    /// Write the scenario to its output directory. A no-op without one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the file cannot be written.
    pub fn save(&self) -> Result<()> {
        match self.scenario_path() {
            Some(path) => persistence::write_json_atomic(&path, self),
            None => Ok(()),
        }
    }

    /// Load a scenario persisted in `output_directory`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the file is missing or malformed.
    pub fn load(output_directory: impl AsRef<Path>) -> Result<Self> {
        persistence::read_json(&output_directory.as_ref().join(SCENARIO_FILE))
    }

    /// Names of the top-level fields that differ between two scenarios.
    #[must_use]
    pub fn diff(&self, other: &Scenario) -> Vec<String> {
        let (Ok(serde_json::Value::Object(a)), Ok(serde_json::Value::Object(b))) =
            (serde_json::to_value(self), serde_json::to_value(other))
        else {
            return vec!["<unserializable scenario>".to_string()];
        };
        a.iter()
            .filter(|(key, value)| b.get(*key) != Some(*value))
            .map(|(key, value)| {
                let old = b.get(key).map_or_else(|| "<missing>".to_string(), ToString::to_string);
                format!("scenario.{key}: {old} -> {value}")
            })
            .collect()
    }
}

/// Fluent builder for [`Scenario`].
///
/// # Defaults
///
/// - one worker, one objective, [`Minimize`](Direction::Minimize)
/// - non-deterministic target function, no instances
/// - unlimited wall-clock and target-function time, 100 trials
/// - `crash_cost` is the worst value for the direction (`∞`, or `-∞` when
///   maximizing), `intensify_percentage = 0.5`, seed `0`
/// - no output directory
pub struct ScenarioBuilder {
    scenario: Scenario,
    crash_cost: Option<Cost>,
}

impl ScenarioBuilder {
    fn new(config_space: ConfigSpace) -> Self {
        Self {
            scenario: Scenario {
                name: "smbo".to_string(),
                config_space,
                deterministic: false,
                n_objectives: 1,
                direction: Direction::Minimize,
                instances: None,
                n_workers: 1,
                walltime_limit: f64::INFINITY,
                cputime_limit: f64::INFINITY,
                n_trials: 100,
                trial_walltime_limit: None,
                crash_cost: Cost::single(f64::INFINITY),
                intensify_percentage: 0.5,
                intensifier: IntensifierKind::Simple,
                seed: 0,
                output_directory: None,
            },
            crash_cost: None,
        }
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.scenario.name = name.into();
        self
    }

    #[must_use]
    pub fn deterministic(mut self, deterministic: bool) -> Self {
        self.scenario.deterministic = deterministic;
        self
    }

    #[must_use]
    pub fn n_objectives(mut self, n: usize) -> Self {
        self.scenario.n_objectives = n;
        self
    }

    #[must_use]
    pub fn direction(mut self, direction: Direction) -> Self {
        self.scenario.direction = direction;
        self
    }

    #[must_use]
    pub fn instances<S: Into<String>>(mut self, instances: impl IntoIterator<Item = S>) -> Self {
        self.scenario.instances = Some(instances.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn n_workers(mut self, n: usize) -> Self {
        self.scenario.n_workers = n;
        self
    }

    /// Wall-clock budget of the run in seconds.
    #[must_use]
    pub fn walltime_limit(mut self, seconds: f64) -> Self {
        self.scenario.walltime_limit = seconds;
        self
    }

    /// Budget of summed target-function runtime in seconds.
    #[must_use]
    pub fn cputime_limit(mut self, seconds: f64) -> Self {
        self.scenario.cputime_limit = seconds;
        self
    }

    #[must_use]
    pub fn n_trials(mut self, n: usize) -> Self {
        self.scenario.n_trials = n;
        self
    }

    #[must_use]
    pub fn trial_walltime_limit(mut self, seconds: f64) -> Self {
        self.scenario.trial_walltime_limit = Some(seconds);
        self
    }

    /// Cost recorded for failed trials. Defaults to `∞` for every objective.
    #[must_use]
    pub fn crash_cost(mut self, cost: impl Into<Cost>) -> Self {
        self.crash_cost = Some(cost.into());
        self
    }

    #[must_use]
    pub fn intensify_percentage(mut self, p: f64) -> Self {
        self.scenario.intensify_percentage = p;
        self
    }

    #[must_use]
    pub fn intensifier(mut self, kind: IntensifierKind) -> Self {
        self.scenario.intensifier = kind;
        self
    }

    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.scenario.seed = seed;
        self
    }

    #[must_use]
    pub fn output_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scenario.output_directory = Some(dir.into());
        self
    }

    /// Validate and build the scenario.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidScenario`] if the configuration space is
    /// invalid, `n_workers` or `n_objectives` is zero, the intensification
    /// percentage is outside `[0, 1)`, a limit is negative, or the crash cost
    /// has the wrong number of objectives.
    pub fn build(mut self) -> Result<Scenario> {
        let s = &mut self.scenario;
        s.config_space.validate()?;
        if s.n_workers == 0 {
            return Err(Error::InvalidScenario("n_workers must be at least 1".into()));
        }
        if s.n_objectives == 0 {
            return Err(Error::InvalidScenario("n_objectives must be at least 1".into()));
        }
        if !(0.0..1.0).contains(&s.intensify_percentage) {
            return Err(Error::InvalidScenario(format!(
                "intensify_percentage {} must be in [0, 1)",
                s.intensify_percentage
            )));
        }
        if s.walltime_limit.is_nan() || s.walltime_limit < 0.0 || s.cputime_limit.is_nan() || s.cputime_limit < 0.0 {
            return Err(Error::InvalidScenario("time limits must be non-negative".into()));
        }
        if s.instances.as_ref().is_some_and(Vec::is_empty) {
            return Err(Error::InvalidScenario("instance list cannot be empty".into()));
        }
        s.crash_cost = match self.crash_cost {
            Some(cost) if cost.n_objectives() == s.n_objectives => cost,
            Some(cost) if cost.n_objectives() == 1 => Cost::uniform(cost.values()[0], s.n_objectives),
            Some(cost) => {
                return Err(Error::InvalidScenario(format!(
                    "crash cost has {} values but the scenario has {} objectives",
                    cost.n_objectives(),
                    s.n_objectives
                )));
            }
            None => Cost::uniform(s.direction.worst(), s.n_objectives),
        };
        Ok(self.scenario)
    }
}
