use std::ops::ControlFlow;
use std::sync::Arc;

use parking_lot::Mutex;
use smbo::runner::SerialRunner;
use smbo::{Callback, Error, Scenario, Smbo, TrialInfo, TrialValue};

use super::{cost_is_x, space};

fn smbo(n_trials: usize) -> Smbo {
    let scenario = Scenario::builder(space())
        .deterministic(true)
        .n_trials(n_trials)
        .build()
        .unwrap();
    let runner = SerialRunner::new(cost_is_x, &scenario);
    Smbo::builder(scenario, runner).build().unwrap()
}

#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Vec<&'static str>>>);

impl Recorder {
    fn events(&self) -> Vec<&'static str> {
        self.0.lock().clone()
    }

    fn count(&self, event: &str) -> usize {
        self.0.lock().iter().filter(|e| **e == event).count()
    }
}

impl Callback for Recorder {
    fn on_start(&mut self, _smbo: &Smbo) -> ControlFlow<()> {
        self.0.lock().push("start");
        ControlFlow::Continue(())
    }

    fn on_iteration_start(&mut self, _smbo: &Smbo) -> ControlFlow<()> {
        self.0.lock().push("iteration_start");
        ControlFlow::Continue(())
    }

    fn on_iteration_end(&mut self, _smbo: &Smbo) -> ControlFlow<()> {
        self.0.lock().push("iteration_end");
        ControlFlow::Continue(())
    }

    fn on_tell_end(&mut self, _smbo: &Smbo, _info: &TrialInfo, _value: &TrialValue) -> ControlFlow<()> {
        self.0.lock().push("tell");
        ControlFlow::Continue(())
    }

    fn on_end(&mut self, _smbo: &Smbo) {
        self.0.lock().push("end");
    }
}

/// Requests a stop once `n` results were told.
struct StopAfter(usize);

impl Callback for StopAfter {
    fn on_tell_end(&mut self, smbo: &Smbo, _info: &TrialInfo, _value: &TrialValue) -> ControlFlow<()> {
        if smbo.stats().finished >= self.0 {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }
}

#[test]
fn test_hooks_fire_in_order() {
    let recorder = Recorder::default();
    let mut smbo = smbo(5);
    smbo.register_callback(recorder.clone());
    smbo.run().unwrap();

    let events = recorder.events();
    assert_eq!(events.first(), Some(&"start"));
    assert_eq!(events.last(), Some(&"end"));
    assert_eq!(recorder.count("start"), 1);
    assert_eq!(recorder.count("end"), 1);
    assert_eq!(recorder.count("tell"), 5);
    assert!(recorder.count("iteration_start") >= 5);
    assert_eq!(events[1], "iteration_start");
}

#[test]
fn test_callback_can_stop_the_run() {
    let recorder = Recorder::default();
    let scenario = Scenario::builder(space())
        .deterministic(true)
        .build()
        .unwrap();
    let runner = SerialRunner::new(cost_is_x, &scenario);
    let mut smbo = Smbo::builder(scenario, runner)
        .callback(StopAfter(3))
        .callback(recorder.clone())
        .build()
        .unwrap();

    smbo.run().unwrap();
    assert_eq!(smbo.stats().finished, 3);
    assert_eq!(recorder.count("tell"), 3);
    assert!(smbo.stop_handle().is_stopped());
}

#[test]
fn test_stop_before_run_submits_nothing() {
    let mut smbo = smbo(10);
    smbo.stop_handle().stop();

    assert!(matches!(smbo.run(), Err(Error::NoIncumbent)));
    assert_eq!(smbo.stats().submitted, 0);
}
