use core::time::Duration;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Condvar, Mutex};

use super::{Runner, TargetFunction, TrialContext, execute};
use crate::config::Configuration;
use crate::error::{Error, Result};
use crate::runhistory::{TrialInfo, TrialValue};
use crate::scenario::Scenario;
use crate::types::{Cost, TrialStatus};

#[derive(Default)]
struct Queue {
    results: VecDeque<(TrialInfo, TrialValue)>,
    in_flight: usize,
}

#[derive(Default)]
struct Shared {
    queue: Mutex<Queue>,
    changed: Condvar,
}

/// Runs trials on a tokio blocking pool with one thread per worker.
///
/// Each trial gets the scenario's `trial_walltime_limit`, counted from
/// the moment a worker thread starts it; a trial that exceeds it is
/// reported as [`Timeout`](TrialStatus::Timeout) with the crash cost. A
/// timed-out target function keeps its thread until it returns. A panicking target function is reported as
/// [`Crashed`](TrialStatus::Crashed).
///
/// # Examples
///
/// ```
/// # #[cfg(feature = "async")]
/// # fn example() -> smbo::Result<()> {
/// use smbo::config::{ConfigSpace, Configuration, ParamValue};
/// use smbo::runner::{Runner, ThreadedRunner, TrialContext};
/// use smbo::runhistory::TrialInfo;
/// use smbo::Scenario;
///
/// let scenario = Scenario::builder(ConfigSpace::new().float("x", 0.0, 1.0))
///     .n_workers(2)
///     .build()?;
/// let mut runner = ThreadedRunner::new(
///     |_: &Configuration, _: &TrialContext| Ok::<_, String>(1.0),
///     &scenario,
/// )?;
/// runner.submit(TrialInfo::new(Configuration::new([("x", ParamValue::Float(0.5))]), 0));
/// runner.wait();
/// assert_eq!(runner.iter_results().len(), 1);
/// # Ok(())
/// # }
/// ```
pub struct ThreadedRunner<T> {
    target: Arc<T>,
    runtime: Option<tokio::runtime::Runtime>,
    shared: Arc<Shared>,
    crash_cost: Cost,
    trial_walltime_limit: Option<Duration>,
    epoch: Instant,
}

impl<T: TargetFunction + 'static> ThreadedRunner<T> {
    /// A runner with `scenario.n_workers` worker threads.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Runner`] if the tokio runtime cannot be built.
    pub fn new(target: T, scenario: &Scenario) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(scenario.n_workers)
            .thread_name("smbo-worker")
            .enable_time()
            .build()
            .map_err(|e| Error::Runner(e.to_string()))?;
        Ok(Self {
            target: Arc::new(target),
            runtime: Some(runtime),
            shared: Arc::new(Shared::default()),
            crash_cost: scenario.crash_cost.clone(),
            trial_walltime_limit: scenario
                .trial_walltime_limit
                .and_then(|secs| Duration::try_from_secs_f64(secs).ok()),
            epoch: Instant::now(),
        })
    }
}

impl<T: TargetFunction + 'static> Runner for ThreadedRunner<T> {
    fn submit(&mut self, info: TrialInfo) {
        let Some(runtime) = &self.runtime else {
            return;
        };
        self.shared.queue.lock().in_flight += 1;

        let target = Arc::clone(&self.target);
        let shared = Arc::clone(&self.shared);
        let crash_cost = self.crash_cost.clone();
        let limit = self.trial_walltime_limit;
        let epoch = self.epoch;

        runtime.spawn(async move {
            let config = info.config.clone();
            let context = TrialContext::from(&info);
            let cost = crash_cost.clone();
            let (started_tx, started_rx) = tokio::sync::oneshot::channel();
            let task = tokio::task::spawn_blocking(move || {
                let _ = started_tx.send(epoch.elapsed().as_secs_f64());
                execute(&*target, &config, &context, &cost, epoch, None)
            });

            // The limit starts once a pool thread picks the trial up, not
            // while it queues behind a timed-out trial.
            let started = started_rx.await.ok();
            let starttime = started.unwrap_or_else(|| epoch.elapsed().as_secs_f64());
            let joined = match (limit, started) {
                (Some(limit), Some(_)) => tokio::time::timeout(limit, task).await.ok(),
                _ => Some(task.await),
            };
            let endtime = epoch.elapsed().as_secs_f64();
            let value = match joined {
                Some(Ok(value)) => value,
                Some(Err(e)) => TrialValue::new(TrialStatus::Crashed, crash_cost)
                    .with_timing(starttime, endtime)
                    .with_info("error", e.to_string()),
                None => {
                    trace_warn!(seed = info.seed, "trial exceeded its wall-clock limit");
                    TrialValue::new(TrialStatus::Timeout, crash_cost).with_timing(starttime, endtime)
                }
            };

            let mut queue = shared.queue.lock();
            queue.in_flight -= 1;
            queue.results.push_back((info, value));
            shared.changed.notify_all();
        });
    }

    fn wait(&mut self) {
        let mut queue = self.shared.queue.lock();
        while queue.results.is_empty() && queue.in_flight > 0 {
            self.shared.changed.wait(&mut queue);
        }
    }

    fn iter_results(&mut self) -> Vec<(TrialInfo, TrialValue)> {
        self.shared.queue.lock().results.drain(..).collect()
    }

    fn is_running(&self) -> bool {
        let queue = self.shared.queue.lock();
        queue.in_flight > 0 || !queue.results.is_empty()
    }

    fn run(&self, config: &Configuration, context: &TrialContext) -> TrialValue {
        execute(&*self.target, config, context, &self.crash_cost, self.epoch, None)
    }
}

impl<T> Drop for ThreadedRunner<T> {
    fn drop(&mut self) {
        // Timed-out trials may still be running on the blocking pool.
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}
