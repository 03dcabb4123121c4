use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use smbo::config::ConfigSpace;
use smbo::persistence::{RUNHISTORY_FILE, SCENARIO_FILE, STATS_FILE};
use smbo::runner::SerialRunner;
use smbo::{
    Cost, Error, FixedDecision, ResumeDecision, RunHistory, Scenario, Smbo, SmboBuilder, Stats,
    TrialInfo, TrialValue,
};

use super::{TempDir, config, cost_is_x, space};

fn scenario(dir: &Path, n_trials: usize) -> Scenario {
    Scenario::builder(space())
        .deterministic(true)
        .n_trials(n_trials)
        .output_directory(dir)
        .build()
        .unwrap()
}

fn builder(scenario: Scenario) -> SmboBuilder {
    let runner = SerialRunner::new(cost_is_x, &scenario);
    Smbo::builder(scenario, runner).resume_decider(FixedDecision(None))
}

/// Runs `n_trials` trials into `dir` and returns the incumbent.
fn first_run(dir: &Path, n_trials: usize) -> smbo::config::Configuration {
    builder(scenario(dir, n_trials)).build().unwrap().run().unwrap()
}

#[test]
fn test_state_is_persisted() {
    let dir = TempDir::new("resume_persisted");
    first_run(dir.path(), 4);

    for file in [SCENARIO_FILE, RUNHISTORY_FILE, STATS_FILE] {
        assert!(dir.path().join(file).exists(), "{file} missing");
    }
    let history = RunHistory::load(&dir.path().join(RUNHISTORY_FILE), &space()).unwrap();
    assert_eq!(history.n_finished(), 4);
}

#[test]
fn test_same_scenario_continues_the_previous_run() {
    let dir = TempDir::new("resume_same");
    let incumbent = first_run(dir.path(), 6);

    let mut smbo = builder(scenario(dir.path(), 6)).build().unwrap();
    assert_eq!(smbo.stats().finished, 6);
    assert_eq!(smbo.runhistory().len(), 6);
    assert_eq!(smbo.incumbent(), Some(&incumbent));

    assert_eq!(smbo.run().unwrap(), incumbent);
    assert_eq!(smbo.stats().finished, 6);
}

#[test]
fn test_replaying_the_history_reproduces_the_incumbent() {
    let dir = TempDir::new("resume_replay");
    let incumbent = first_run(dir.path(), 8);
    let history = RunHistory::load(&dir.path().join(RUNHISTORY_FILE), &space()).unwrap();

    let fresh = Scenario::builder(space()).deterministic(true).build().unwrap();
    let runner = SerialRunner::new(cost_is_x, &fresh);
    let mut replay = Smbo::builder(fresh, runner).build().unwrap();
    for (key, value) in history.iter() {
        let info = TrialInfo {
            config: key.config.clone(),
            instance: key.instance.clone(),
            seed: key.seed.unwrap_or(0),
            budget: key.budget,
        };
        replay.tell(info, value.clone(), None, false).unwrap();
    }
    assert_eq!(replay.incumbent(), Some(&incumbent));
}

#[test]
fn test_changed_scenario_without_decision_aborts() {
    let dir = TempDir::new("resume_abort");
    first_run(dir.path(), 3);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&seen);
    let runner_scenario = scenario(dir.path(), 5);
    let runner = SerialRunner::new(cost_is_x, &runner_scenario);
    let result = Smbo::builder(runner_scenario, runner)
        .resume_decider(move |diff: &[String]| {
            recorded.lock().extend_from_slice(diff);
            None::<ResumeDecision>
        })
        .build();

    assert!(matches!(result, Err(Error::ResumeAborted)));
    let seen = seen.lock();
    assert_eq!(seen.len(), 1);
    assert!(seen[0].starts_with("scenario.n_trials"));
}

#[test]
fn test_changed_scenario_can_overwrite() {
    let dir = TempDir::new("resume_overwrite");
    first_run(dir.path(), 3);

    let mut smbo = builder(scenario(dir.path(), 5))
        .resume_decider(FixedDecision(Some(ResumeDecision::Overwrite)))
        .build()
        .unwrap();
    assert!(smbo.runhistory().is_empty());
    assert_eq!(smbo.stats().finished, 0);

    smbo.run().unwrap();
    assert_eq!(smbo.stats().finished, 5);
    assert_eq!(Scenario::load(dir.path()).unwrap().n_trials, 5);
}

#[test]
fn test_changed_scenario_can_reuse_the_run_history() {
    let dir = TempDir::new("resume_reuse");
    let incumbent = first_run(dir.path(), 3);

    let mut smbo = builder(scenario(dir.path(), 7))
        .resume_decider(FixedDecision(Some(ResumeDecision::ReuseRunHistory)))
        .build()
        .unwrap();
    assert_eq!(smbo.runhistory().len(), 3);
    assert_eq!(smbo.incumbent(), Some(&incumbent));

    smbo.run().unwrap();
    assert_eq!(smbo.stats().submitted, 7);
    assert_eq!(smbo.stats().finished, 7);
    assert_eq!(smbo.runhistory().n_finished(), 7);
}

#[test]
fn test_reuse_requires_the_same_config_space() {
    let dir = TempDir::new("resume_mismatch");
    first_run(dir.path(), 3);

    let other = Scenario::builder(ConfigSpace::new().int("x", 0, 10))
        .deterministic(true)
        .n_trials(3)
        .output_directory(dir.path())
        .build()
        .unwrap();
    let result = builder(other)
        .resume_decider(FixedDecision(Some(ResumeDecision::ReuseRunHistory)))
        .build();
    assert!(matches!(result, Err(Error::ConfigSpaceMismatch)));
}

#[test]
fn test_overwrite_flag_ignores_previous_run() {
    let dir = TempDir::new("resume_overwrite_flag");
    first_run(dir.path(), 3);

    let smbo = builder(scenario(dir.path(), 3)).overwrite(true).build().unwrap();
    assert!(smbo.runhistory().is_empty());
    assert!(smbo.incumbent().is_none());
}

#[test]
fn test_orphaned_running_trials_are_discarded() {
    let dir = TempDir::new("resume_orphans");
    let scenario = scenario(dir.path(), 10);
    scenario.save().unwrap();

    let mut history = RunHistory::new();
    history.add(TrialInfo::new(config(5), 0).key(), TrialValue::success(5.0), false);
    history.add_running(&TrialInfo::new(config(6), 0), 1);
    history.save(&dir.path().join(RUNHISTORY_FILE)).unwrap();

    let mut stats = Stats::new(&scenario);
    stats.submitted = 2;
    stats.finished = 1;
    stats.update_trajectory(&config(5), Cost::single(5.0));
    stats.save(&dir.path().join(STATS_FILE)).unwrap();

    let smbo = builder(scenario).build().unwrap();
    assert_eq!(smbo.runhistory().len(), 1);
    assert_eq!(smbo.stats().submitted, 1);
    assert_eq!(smbo.incumbent(), Some(&config(5)));
    assert_eq!(smbo.incumbent().and_then(|c| c.config_id()), Some(1));
}

#[test]
fn test_run_that_never_finished_a_trial_starts_over() {
    let dir = TempDir::new("resume_unfinished");
    let scenario = scenario(dir.path(), 10);
    scenario.save().unwrap();

    let mut history = RunHistory::new();
    history.add_running(&TrialInfo::new(config(6), 0), 1);
    history.save(&dir.path().join(RUNHISTORY_FILE)).unwrap();

    let mut stats = Stats::new(&scenario);
    stats.submitted = 1;
    stats.save(&dir.path().join(STATS_FILE)).unwrap();

    let smbo = builder(scenario).build().unwrap();
    assert!(smbo.runhistory().is_empty());
    assert_eq!(smbo.stats().submitted, 0);
}

#[test]
fn test_history_without_incumbent_is_inconsistent() {
    let dir = TempDir::new("resume_inconsistent");
    let scenario = scenario(dir.path(), 10);
    scenario.save().unwrap();

    let mut history = RunHistory::new();
    history.add(TrialInfo::new(config(5), 0).key(), TrialValue::success(5.0), false);
    history.save(&dir.path().join(RUNHISTORY_FILE)).unwrap();
    Stats::new(&scenario).save(&dir.path().join(STATS_FILE)).unwrap();

    let result = builder(scenario).build();
    assert!(matches!(result, Err(Error::InconsistentState(_))));
}
