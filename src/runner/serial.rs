use std::collections::VecDeque;
use std::time::Instant;

use super::{Runner, TargetFunction, TrialContext, execute};
use crate::config::Configuration;
use crate::runhistory::{TrialInfo, TrialValue};
use crate::scenario::Scenario;
use crate::types::Cost;

/// Runs each trial to completion inside [`submit`](Runner::submit).
///
/// There is never more than one trial in flight, so waiting is a no-op.
/// Results are buffered until the loop drains them and count as running
/// until then.
pub struct SerialRunner<T> {
    target: T,
    crash_cost: Cost,
    trial_walltime_limit: Option<f64>,
    epoch: Instant,
    results: VecDeque<(TrialInfo, TrialValue)>,
}

impl<T: TargetFunction> SerialRunner<T> {
    /// A runner for `target` using the crash cost and per-trial wall-clock
    /// limit of `scenario`.
    #[must_use]
    pub fn new(target: T, scenario: &Scenario) -> Self {
        Self {
            target,
            crash_cost: scenario.crash_cost.clone(),
            trial_walltime_limit: scenario.trial_walltime_limit,
            epoch: Instant::now(),
            results: VecDeque::new(),
        }
    }
}

impl<T: TargetFunction> Runner for SerialRunner<T> {
    fn submit(&mut self, info: TrialInfo) {
        let value = self.run(&info.config, &TrialContext::from(&info));
        trace_debug!(seed = info.seed, status = ?value.status, "trial evaluated");
        self.results.push_back((info, value));
    }

    fn wait(&mut self) {}

    fn iter_results(&mut self) -> Vec<(TrialInfo, TrialValue)> {
        self.results.drain(..).collect()
    }

    fn is_running(&self) -> bool {
        !self.results.is_empty()
    }

    fn run(&self, config: &Configuration, context: &TrialContext) -> TrialValue {
        execute(
            &self.target,
            config,
            context,
            &self.crash_cost,
            self.epoch,
            self.trial_walltime_limit,
        )
    }
}
