use std::collections::VecDeque;

use smbo::config::{ConfigSpace, Configuration};
use smbo::initial_design::{FixedInitialDesign, RandomInitialDesign};
use smbo::runhistory::RunHistory;
use smbo::runner::{SerialRunner, TrialContext};
use smbo::{
    Direction, Error, Intensifier, Scenario, Smbo, TrialInfo, TrialInfoIntent, TrialStatus,
    TrialValue,
};

use super::{NoRandom, config, cost_is_x, space, x_of};

#[test]
fn test_run_stops_after_n_trials() {
    let scenario = Scenario::builder(space())
        .deterministic(true)
        .n_trials(12)
        .seed(4)
        .build()
        .unwrap();
    let runner = SerialRunner::new(cost_is_x, &scenario);
    let mut smbo = Smbo::builder(scenario, runner)
        .initial_design(RandomInitialDesign::new(3, 1))
        .build()
        .unwrap();

    let incumbent = smbo.run().unwrap();
    assert!(smbo.is_finished());
    assert_eq!(smbo.stats().submitted, 12);
    assert_eq!(smbo.stats().finished, 12);
    assert_eq!(smbo.runhistory().n_finished(), 12);

    let best = smbo
        .runhistory()
        .iter()
        .map(|(_, v)| v.cost.scalar())
        .fold(f64::INFINITY, f64::min);
    assert_eq!(smbo.runhistory().get_cost(&incumbent), Some(best));
}

#[test]
fn test_run_after_finish_returns_the_same_incumbent() {
    let scenario = Scenario::builder(space())
        .deterministic(true)
        .n_trials(5)
        .build()
        .unwrap();
    let runner = SerialRunner::new(cost_is_x, &scenario);
    let mut smbo = Smbo::builder(scenario, runner).build().unwrap();

    let first = smbo.run().unwrap();
    let second = smbo.run().unwrap();
    assert_eq!(first, second);
    assert_eq!(smbo.stats().finished, 5);
}

#[test]
fn test_zero_trials_yield_no_incumbent() {
    let scenario = Scenario::builder(space()).n_trials(0).build().unwrap();
    let runner = SerialRunner::new(cost_is_x, &scenario);
    let mut smbo = Smbo::builder(scenario, runner).build().unwrap();

    assert!(matches!(smbo.run(), Err(Error::NoIncumbent)));
    assert_eq!(smbo.stats().submitted, 0);
    assert!(smbo.runhistory().is_empty());
}

#[test]
fn test_finite_candidates_end_the_run() {
    let scenario = Scenario::builder(space())
        .deterministic(true)
        .n_trials(100)
        .build()
        .unwrap();
    let runner = SerialRunner::new(cost_is_x, &scenario);
    let mut smbo = Smbo::builder(scenario, runner)
        .initial_design(FixedInitialDesign::new([config(30), config(10), config(20)]))
        .candidate_source(|_: &RunHistory| Vec::<Configuration>::new())
        .random_design(NoRandom)
        .build()
        .unwrap();

    let incumbent = smbo.run().unwrap();
    assert_eq!(incumbent, config(10));
    assert_eq!(smbo.stats().finished, 3);
}

#[test]
fn test_crashed_trials_do_not_stop_the_run() {
    let scenario = Scenario::builder(space())
        .deterministic(true)
        .crash_cost(1e6)
        .build()
        .unwrap();
    let runner = SerialRunner::new(
        |c: &Configuration, _: &TrialContext| {
            let x = x_of(c);
            if x % 2 == 1 { Err(format!("odd x = {x}")) } else { Ok(x as f64) }
        },
        &scenario,
    );
    let mut smbo = Smbo::builder(scenario, runner)
        .initial_design(FixedInitialDesign::new((1..=6).map(config)))
        .candidate_source(|_: &RunHistory| Vec::<Configuration>::new())
        .random_design(NoRandom)
        .build()
        .unwrap();

    let incumbent = smbo.run().unwrap();
    assert_eq!(incumbent, config(2));
    assert_eq!(smbo.stats().finished, 6);

    let crashed: Vec<_> = smbo
        .runhistory()
        .iter()
        .filter(|(_, v)| v.status == TrialStatus::Crashed)
        .collect();
    assert_eq!(crashed.len(), 3);
    assert!(crashed.iter().all(|(_, v)| v.cost.values() == [1e6]));
    assert_eq!(crashed[0].1.additional_info["error"], "odd x = 1");
}

#[test]
fn test_exhausted_discrete_space_ends_the_run() {
    let scenario = Scenario::builder(ConfigSpace::new().int("x", 0, 2))
        .deterministic(true)
        .n_trials(10)
        .build()
        .unwrap();
    let runner = SerialRunner::new(cost_is_x, &scenario);
    let mut smbo = Smbo::builder(scenario, runner).build().unwrap();

    let incumbent = smbo.run().unwrap();
    assert_eq!(incumbent, config(0));
    assert!(smbo.is_finished());
    assert_eq!(smbo.stats().submitted, 3);
    assert_eq!(smbo.runhistory().n_finished(), 3);
}

#[test]
fn test_crashes_never_win_when_maximizing() {
    let scenario = Scenario::builder(space())
        .deterministic(true)
        .direction(Direction::Maximize)
        .build()
        .unwrap();
    let runner = SerialRunner::new(
        |c: &Configuration, _: &TrialContext| {
            let x = x_of(c);
            if x % 2 == 0 { Err(format!("even x = {x}")) } else { Ok(x as f64) }
        },
        &scenario,
    );
    let mut smbo = Smbo::builder(scenario, runner)
        .initial_design(FixedInitialDesign::new([config(8), config(3), config(6), config(5), config(2)]))
        .candidate_source(|_: &RunHistory| Vec::<Configuration>::new())
        .random_design(NoRandom)
        .build()
        .unwrap();

    let incumbent = smbo.run().unwrap();
    assert_eq!(incumbent, config(5));
    assert_eq!(smbo.runhistory().get_cost(&incumbent), Some(5.0));
    assert!(
        smbo.runhistory()
            .iter()
            .filter(|(_, v)| v.status == TrialStatus::Crashed)
            .all(|(_, v)| v.cost.values() == [f64::NEG_INFINITY])
    );
}

#[test]
fn test_random_design_interleaves_model_proposals() {
    let scenario = Scenario::builder(space())
        .deterministic(true)
        .n_trials(9)
        .build()
        .unwrap();
    let runner = SerialRunner::new(cost_is_x, &scenario);
    let mut smbo = Smbo::builder(scenario, runner)
        .candidate_source(|history: &RunHistory| {
            vec![config(600 + history.len() as i64).with_origin("model")]
        })
        .build()
        .unwrap();

    smbo.run().unwrap();
    let origins: Vec<_> = smbo
        .runhistory()
        .configs()
        .iter()
        .filter_map(Configuration::origin)
        .collect();
    assert!(origins.contains(&"model"));
    assert!(origins.contains(&"random design"));
    assert_eq!(origins[0], "initial design: default");
}

#[test]
fn test_config_ids_are_assigned_on_submission() {
    let scenario = Scenario::builder(space())
        .deterministic(true)
        .n_trials(4)
        .build()
        .unwrap();
    let runner = SerialRunner::new(cost_is_x, &scenario);
    let mut smbo = Smbo::builder(scenario, runner).build().unwrap();

    let incumbent = smbo.run().unwrap();
    let id = incumbent.config_id().unwrap();
    assert_eq!(smbo.runhistory().get_config(id), Some(&incumbent));
    let ids: Vec<_> = smbo.runhistory().configs().iter().filter_map(Configuration::config_id).collect();
    assert_eq!(ids, vec![1, 2, 3, 4]);
}

/// Waits forever without submitting anything.
struct AlwaysWait;

impl Intensifier for AlwaysWait {
    fn get_next_run(
        &mut self,
        _challengers: &mut VecDeque<Configuration>,
        _incumbent: Option<&Configuration>,
        _next_configurations: Option<&mut dyn Iterator<Item = Configuration>>,
        _history: &RunHistory,
        _repeat_configs: bool,
        _n_workers: usize,
    ) -> TrialInfoIntent {
        TrialInfoIntent::Wait
    }

    fn process_results(
        &mut self,
        info: &TrialInfo,
        _value: &TrialValue,
        _incumbent: Option<&Configuration>,
        _history: &RunHistory,
        _time_bound: f64,
        _log_trajectory: bool,
    ) -> (Configuration, f64) {
        (info.config.clone(), 0.0)
    }

    fn uses_seeds(&self) -> bool {
        false
    }

    fn uses_budgets(&self) -> bool {
        false
    }

    fn uses_instances(&self) -> bool {
        false
    }

    fn num_trials(&self) -> usize {
        0
    }

    fn iteration_done(&self) -> bool {
        false
    }

    fn intensify_percentage(&self) -> Option<f64> {
        None
    }

    fn target_function_seeds(&self) -> Vec<u64> {
        Vec::new()
    }

    fn name(&self) -> &'static str {
        "AlwaysWait"
    }
}

#[test]
fn test_waiting_on_an_idle_runner_is_an_error() {
    let scenario = Scenario::builder(space()).build().unwrap();
    let runner = SerialRunner::new(cost_is_x, &scenario);
    let mut smbo = Smbo::builder(scenario, runner)
        .intensifier(AlwaysWait)
        .build()
        .unwrap();

    assert!(matches!(smbo.run(), Err(Error::Stalled)));
    assert_eq!(smbo.intensifier().name(), "AlwaysWait");
}
