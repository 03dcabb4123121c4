use std::collections::{HashMap, VecDeque};

use super::{Intensifier, TrialInfoIntent};
use crate::config::Configuration;
use crate::rng_util;
use crate::runhistory::{RunHistory, TrialInfo, TrialKey, TrialValue};
use crate::scenario::Scenario;
use crate::types::Direction;

/// Proposals rejected as already evaluated before a tick gives up and skips.
/// Candidate sources may be infinite, so the pull has to be bounded.
pub(crate) const MAX_REJECTED_CHALLENGERS: usize = 1_000;

/// The plain Bayesian-optimization loop: every challenger is evaluated once
/// and compared against the incumbent on its aggregated cost.
///
/// No instance or budget racing takes place. If the scenario lists
/// instances, every trial uses the last one.
pub struct SimpleIntensifier {
    /// `false` while a submitted trial has not been processed.
    run_tracker: HashMap<TrialKey, bool>,
    deterministic: bool,
    instances: Option<Vec<String>>,
    direction: Direction,
    intensify_percentage: f64,
    num_trials: usize,
    iteration_done: bool,
    seeds: Vec<u64>,
    rng: fastrand::Rng,
}

impl SimpleIntensifier {
    #[must_use]
    pub fn new(scenario: &Scenario) -> Self {
        Self {
            run_tracker: HashMap::new(),
            deterministic: scenario.deterministic,
            instances: scenario.instances.clone(),
            direction: scenario.direction,
            intensify_percentage: scenario.intensify_percentage,
            num_trials: 0,
            iteration_done: false,
            seeds: Vec::new(),
            rng: fastrand::Rng::with_seed(scenario.seed),
        }
    }

    /// Number of submitted trials whose results have not been processed.
    #[must_use]
    pub fn n_active(&self) -> usize {
        self.run_tracker.values().filter(|finished| !**finished).count()
    }

    fn next_challenger(
        challengers: &mut VecDeque<Configuration>,
        next_configurations: Option<&mut dyn Iterator<Item = Configuration>>,
        history: &RunHistory,
        repeat_configs: bool,
    ) -> Option<Configuration> {
        let usable = |config: &Configuration| repeat_configs || !history.contains_config(config);
        while let Some(config) = challengers.pop_front() {
            if usable(&config) {
                return Some(config);
            }
        }
        let found = next_configurations?
            .take(MAX_REJECTED_CHALLENGERS)
            .find(|config| usable(config));
        if found.is_none() {
            trace_debug!(
                limit = MAX_REJECTED_CHALLENGERS,
                "no unevaluated challenger among the proposals"
            );
        }
        found
    }

    fn compare_configs(
        &self,
        challenger: &Configuration,
        incumbent: Configuration,
        history: &RunHistory,
        log_trajectory: bool,
    ) -> Configuration {
        if *challenger == incumbent {
            return incumbent;
        }
        let Some(challenger_cost) = history.get_cost(challenger) else {
            return incumbent;
        };
        let incumbent_cost = history.get_cost(&incumbent).unwrap_or(self.direction.worst());
        if self.direction.is_better(challenger_cost, incumbent_cost) {
            if log_trajectory {
                trace_info!(
                    challenger = %challenger,
                    challenger_cost,
                    incumbent_cost,
                    "challenger replaces the incumbent"
                );
            }
            challenger.clone()
        } else {
            trace_debug!(challenger_cost, incumbent_cost, "incumbent kept");
            incumbent
        }
    }
}

impl Intensifier for SimpleIntensifier {
    fn get_next_run(
        &mut self,
        challengers: &mut VecDeque<Configuration>,
        _incumbent: Option<&Configuration>,
        next_configurations: Option<&mut dyn Iterator<Item = Configuration>>,
        history: &RunHistory,
        repeat_configs: bool,
        n_workers: usize,
    ) -> TrialInfoIntent {
        self.iteration_done = false;

        if self.n_active() >= n_workers {
            return TrialInfoIntent::Wait;
        }

        let Some(config) = Self::next_challenger(challengers, next_configurations, history, repeat_configs)
        else {
            return TrialInfoIntent::Skip;
        };

        let seed = if self.deterministic {
            0
        } else {
            rng_util::seed(&mut self.rng)
        };
        if !self.seeds.contains(&seed) {
            self.seeds.push(seed);
        }

        let info = TrialInfo {
            config,
            instance: self.instances.as_ref().and_then(|i| i.last().cloned()),
            seed,
            budget: None,
        };
        self.run_tracker.insert(info.key(), false);
        TrialInfoIntent::Run(info)
    }

    fn process_results(
        &mut self,
        info: &TrialInfo,
        _value: &TrialValue,
        incumbent: Option<&Configuration>,
        history: &RunHistory,
        _time_bound: f64,
        log_trajectory: bool,
    ) -> (Configuration, f64) {
        self.run_tracker.insert(info.key(), true);

        let incumbent = match incumbent {
            Some(incumbent) => incumbent.clone(),
            None => {
                trace_info!("first run: the challenger becomes the incumbent");
                info.config.clone()
            }
        };
        self.num_trials += 1;

        let incumbent = self.compare_configs(&info.config, incumbent, history, log_trajectory);
        let cost = history.get_cost(&incumbent).unwrap_or(self.direction.worst());
        self.iteration_done = true;
        (incumbent, cost)
    }

    fn uses_seeds(&self) -> bool {
        true
    }

    fn uses_budgets(&self) -> bool {
        false
    }

    fn uses_instances(&self) -> bool {
        self.instances.is_some()
    }

    fn num_trials(&self) -> usize {
        self.num_trials
    }

    fn iteration_done(&self) -> bool {
        self.iteration_done
    }

    fn intensify_percentage(&self) -> Option<f64> {
        Some(self.intensify_percentage)
    }

    fn target_function_seeds(&self) -> Vec<u64> {
        if self.deterministic {
            vec![0]
        } else {
            self.seeds.clone()
        }
    }

    fn name(&self) -> &'static str {
        "SimpleIntensifier"
    }
}
