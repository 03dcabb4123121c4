use smbo::config::Configuration;
use smbo::initial_design::FixedInitialDesign;
use smbo::runhistory::RunHistory;
use smbo::runner::{SerialRunner, TrialContext};
use smbo::{Cost, Error, Scenario, Smbo, TrialInfo, TrialInfoIntent, TrialValue};

use super::{NoRandom, config, cost_is_x, space};

fn manual(scenario: Scenario, initial: impl IntoIterator<Item = Configuration>) -> Smbo {
    let runner = SerialRunner::new(cost_is_x, &scenario);
    Smbo::builder(scenario, runner)
        .initial_design(FixedInitialDesign::new(initial))
        .candidate_source(|_: &RunHistory| Vec::<Configuration>::new())
        .random_design(NoRandom)
        .build()
        .unwrap()
}

fn ask_run(smbo: &mut Smbo) -> TrialInfo {
    match smbo.ask() {
        TrialInfoIntent::Run(info) => info,
        other => panic!("expected a trial to run, got {other:?}"),
    }
}

#[test]
fn test_incumbent_only_changes_on_strict_improvement() {
    let scenario = Scenario::builder(space()).deterministic(true).build().unwrap();
    let mut smbo = manual(scenario, [config(1), config(2), config(3)]);

    for (cost, expected) in [(5.0, 1), (3.0, 2), (4.0, 2)] {
        let info = ask_run(&mut smbo);
        smbo.tell(info, TrialValue::success(cost), None, false).unwrap();
        assert_eq!(smbo.incumbent(), Some(&config(expected)));
    }

    let trajectory: Vec<_> = smbo.stats().trajectory().iter().map(|e| e.cost.clone()).collect();
    assert_eq!(trajectory, vec![Cost::single(5.0), Cost::single(3.0)]);
    assert_eq!(smbo.stats().incumbent_changed, 2);
    assert_eq!(smbo.runhistory().get_cost(&config(2)), Some(3.0));
}

#[test]
fn test_equal_cost_keeps_the_incumbent() {
    let scenario = Scenario::builder(space()).deterministic(true).build().unwrap();
    let mut smbo = manual(scenario, [config(1), config(2)]);

    for _ in 0..2 {
        let info = ask_run(&mut smbo);
        smbo.tell(info, TrialValue::success(2.0), None, false).unwrap();
    }
    assert_eq!(smbo.incumbent(), Some(&config(1)));
}

#[test]
fn test_wait_when_all_workers_are_busy() {
    let scenario = Scenario::builder(space())
        .deterministic(true)
        .n_workers(2)
        .build()
        .unwrap();
    let mut smbo = manual(scenario, [config(1), config(2), config(3)]);

    let first = ask_run(&mut smbo);
    let _second = ask_run(&mut smbo);
    assert_eq!(smbo.ask(), TrialInfoIntent::Wait);
    assert_eq!(smbo.ask(), TrialInfoIntent::Wait);
    assert_eq!(smbo.pending_initial_configurations(), 1);

    smbo.tell(first, TrialValue::success(1.0), None, false).unwrap();
    assert_eq!(ask_run(&mut smbo).config, config(3));
}

#[test]
fn test_skip_when_candidates_run_out() {
    let scenario = Scenario::builder(space()).deterministic(true).build().unwrap();
    let mut smbo = manual(scenario, [config(1)]);

    let info = ask_run(&mut smbo);
    smbo.tell(info, TrialValue::success(1.0), None, false).unwrap();
    assert_eq!(smbo.ask(), TrialInfoIntent::Skip);
}

#[test]
fn test_telling_twice_is_rejected() {
    let scenario = Scenario::builder(space()).deterministic(true).build().unwrap();
    let mut smbo = manual(scenario, [config(1)]);

    let info = ask_run(&mut smbo);
    smbo.tell(info.clone(), TrialValue::success(1.0), None, false).unwrap();
    let err = smbo.tell(info, TrialValue::success(0.5), None, false).unwrap_err();
    assert!(matches!(err, Error::AlreadyTold(_)));
    assert_eq!(smbo.stats().finished, 1);
    assert_eq!(smbo.runhistory().get_cost(&config(1)), Some(1.0));
}

#[test]
fn test_tell_without_ask_counts_as_submitted() {
    let scenario = Scenario::builder(space()).deterministic(true).build().unwrap();
    let mut smbo = manual(scenario, [config(1)]);

    smbo.tell(TrialInfo::new(config(42), 0), TrialValue::success(0.5), None, false)
        .unwrap();
    assert_eq!(smbo.stats().submitted, 1);
    assert_eq!(smbo.stats().finished, 1);
    assert_eq!(smbo.stats().n_configs, 1);
    assert_eq!(smbo.incumbent(), Some(&config(42)));
    assert_eq!(smbo.incumbent().and_then(Configuration::config_id), Some(1));
}

#[test]
fn test_incumbent_cost_never_gets_worse() {
    let scenario = Scenario::builder(space()).deterministic(true).build().unwrap();
    let mut smbo = manual(scenario, [config(0)]);
    let mut rng = fastrand::Rng::with_seed(17);

    let mut best = f64::INFINITY;
    for x in 1..60 {
        let cost = rng.f64() * 100.0;
        smbo.tell(TrialInfo::new(config(x), 0), TrialValue::success(cost), None, false)
            .unwrap();
        let incumbent = smbo.incumbent().unwrap();
        let incumbent_cost = smbo.runhistory().get_cost(incumbent).unwrap();
        assert!(incumbent_cost <= best);
        best = incumbent_cost;
    }
    let min = smbo
        .runhistory()
        .iter()
        .map(|(_, v)| v.cost.scalar())
        .fold(f64::INFINITY, f64::min);
    assert!((best - min).abs() < f64::EPSILON);
}

#[test]
fn test_failed_trials_are_recorded_outcomes() {
    let scenario = Scenario::builder(space())
        .deterministic(true)
        .crash_cost(1000.0)
        .build()
        .unwrap();
    let mut smbo = manual(scenario, [config(1), config(2)]);

    let info = ask_run(&mut smbo);
    let crashed = TrialValue::new(smbo::TrialStatus::Crashed, 1000.0);
    smbo.tell(info, crashed, None, false).unwrap();
    assert_eq!(smbo.incumbent(), Some(&config(1)));

    let info = ask_run(&mut smbo);
    smbo.tell(info, TrialValue::success(7.0), None, false).unwrap();
    assert_eq!(smbo.incumbent(), Some(&config(2)));
}

#[test]
fn test_validate_uses_fresh_runs() {
    let scenario = Scenario::builder(space()).deterministic(true).build().unwrap();
    let smbo = manual(scenario, [config(1)]);

    let cost = smbo.validate(&config(7), None, None).unwrap();
    assert_eq!(cost, Cost::single(7.0));
    assert!(smbo.runhistory().is_empty());
}

#[test]
fn test_validate_averages_over_instances() {
    let scenario = Scenario::builder(space())
        .instances(["a", "bb"])
        .build()
        .unwrap();
    let runner = SerialRunner::new(
        |_: &Configuration, ctx: &TrialContext| {
            Ok::<_, String>(ctx.instance.as_ref().map_or(0, String::len) as f64)
        },
        &scenario,
    );
    let smbo = Smbo::builder(scenario, runner).build().unwrap();

    let cost = smbo.validate(&config(1), None, Some(5)).unwrap();
    assert_eq!(cost, Cost::single(1.5));

    let given = ["cccc".to_owned()];
    let cost = smbo.validate(&config(1), Some(given.as_slice()), None).unwrap();
    assert_eq!(cost, Cost::single(4.0));
}
