//! The ask/tell optimization loop.
//!
//! [`Smbo`] owns the run history, the stats and the incumbent. Each tick it
//! asks the intensifier what to do, submits runnable trials to the runner,
//! and tells every finished result back, until a budget is exhausted or a
//! stop is requested. Trials still in flight at that point are waited for
//! and told before [`Smbo::run`] returns.
//!
//! The loop can also be driven by hand:
//!
//! ```
//! use smbo::config::{ConfigSpace, Configuration, ParamValue};
//! use smbo::runner::{SerialRunner, TrialContext};
//! use smbo::{Scenario, Smbo, TrialInfoIntent, TrialValue};
//!
//! let scenario = Scenario::builder(ConfigSpace::new().int("x", 0, 10))
//!     .deterministic(true)
//!     .build()?;
//! let runner = SerialRunner::new(|_: &Configuration, _: &TrialContext| Ok::<_, String>(0.0), &scenario);
//! let mut smbo = Smbo::builder(scenario, runner).build()?;
//!
//! if let TrialInfoIntent::Run(info) = smbo.ask() {
//!     let x = match info.config.get("x") {
//!         Some(ParamValue::Int(x)) => *x as f64,
//!         _ => unreachable!(),
//!     };
//!     smbo.tell(info, TrialValue::success(x), None, false)?;
//! }
//! assert!(smbo.incumbent().is_some());
//! # Ok::<(), smbo::Error>(())
//! ```

mod builder;
mod callback;
mod resume;
mod validate;

use core::mem;
use core::sync::atomic::{AtomicBool, Ordering};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

pub use builder::SmboBuilder;
pub use callback::Callback;
pub use resume::{FixedDecision, PromptDecider, ResumeDecider, ResumeDecision};

use crate::candidates::{CandidateSource, ChallengerList};
use crate::config::Configuration;
use crate::error::{Error, Result};
use crate::intensifier::{Intensifier, TrialInfoIntent};
use crate::persistence::{RUNHISTORY_FILE, STATS_FILE};
use crate::random_design::RandomDesign;
use crate::runhistory::{RunHistory, TrialInfo, TrialValue};
use crate::runner::Runner;
use crate::scenario::Scenario;
use crate::stats::Stats;
use crate::types::Cost;

/// A cloneable handle that asks a running loop to stop.
///
/// The loop checks the flag once per iteration; trials already in flight
/// are still waited for and told.
#[derive(Clone, Debug, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    /// Request a stop.
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Time the intensifier may spend, given the time spent choosing
/// challengers and the fraction `p` reserved for intensification.
///
/// Unbounded when no time was spent, when `p` is absent or when `p >= 1`.
pub(crate) fn time_bound(intensify_percentage: Option<f64>, time_spent: f64) -> f64 {
    match intensify_percentage {
        Some(p) if p < 1.0 && time_spent > 0.0 => p * (time_spent / (1.0 - p)),
        _ => f64::INFINITY,
    }
}

/// The optimization loop.
pub struct Smbo {
    scenario: Scenario,
    stats: Stats,
    runhistory: RunHistory,
    intensifier: Box<dyn Intensifier>,
    runner: Box<dyn Runner>,
    candidate_source: Box<dyn CandidateSource>,
    random_design: Box<dyn RandomDesign>,
    initial_design_configs: VecDeque<Configuration>,
    incumbent: Option<Configuration>,
    callbacks: Vec<Box<dyn Callback>>,
    stop: StopHandle,
    finished: bool,
    rng: fastrand::Rng,
    challenger_index: u64,
    repeat_configs: bool,
}

impl Smbo {
    /// Returns an [`SmboBuilder`] for `scenario`, evaluating trials with
    /// `runner`.
    #[must_use]
    pub fn builder(scenario: Scenario, runner: impl Runner + 'static) -> SmboBuilder {
        SmboBuilder::new(scenario, Box::new(runner))
    }

    #[must_use]
    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    #[must_use]
    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    #[must_use]
    pub fn runhistory(&self) -> &RunHistory {
        &self.runhistory
    }

    #[must_use]
    pub fn intensifier(&self) -> &dyn Intensifier {
        self.intensifier.as_ref()
    }

    /// The best configuration so far. Never returns to `None` once set.
    #[must_use]
    pub fn incumbent(&self) -> Option<&Configuration> {
        self.incumbent.as_ref()
    }

    /// Initial-design configurations that have not been handed out yet.
    #[must_use]
    pub fn pending_initial_configurations(&self) -> usize {
        self.initial_design_configs.len()
    }

    /// A handle for stopping [`run`](Self::run) from elsewhere.
    #[must_use]
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Returns `true` once [`run`](Self::run) completed.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Register a callback after construction.
    pub fn register_callback(&mut self, callback: impl Callback + 'static) {
        self.callbacks.push(Box::new(callback));
    }

    /// Ask the intensifier what to do next.
    ///
    /// Initial-design configurations are handed out first, then challengers
    /// from the candidate source interleaved with random ones. The run
    /// history is not modified.
    pub fn ask(&mut self) -> TrialInfoIntent {
        let Self {
            scenario,
            runhistory,
            intensifier,
            candidate_source,
            random_design,
            initial_design_configs,
            incumbent,
            rng,
            challenger_index,
            repeat_configs,
            ..
        } = self;

        let proposals = candidate_source.next_configurations(runhistory, &scenario.config_space);
        let mut challengers = ChallengerList::new(
            proposals,
            random_design.as_mut(),
            &scenario.config_space,
            rng,
            challenger_index,
        );
        let challengers: &mut dyn Iterator<Item = Configuration> = &mut challengers;
        intensifier.get_next_run(
            initial_design_configs,
            incumbent.as_ref(),
            Some(challengers),
            runhistory,
            *repeat_configs,
            scenario.n_workers,
        )
    }

    /// Record the result of a trial and update the incumbent.
    ///
    /// `time_left` is the intensification time bound handed to the
    /// intensifier (unbounded if `None`). With `save`, the run history and
    /// stats are persisted afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyTold`] if this trial already has a result,
    /// and [`Error::Storage`] if saving fails.
    pub fn tell(&mut self, info: TrialInfo, value: TrialValue, time_left: Option<f64>, save: bool) -> Result<()> {
        let mut callbacks = mem::take(&mut self.callbacks);
        let result = self.tell_with(&mut callbacks, info, value, time_left, save);
        self.callbacks = callbacks;
        result
    }

    fn tell_with(
        &mut self,
        callbacks: &mut [Box<dyn Callback>],
        info: TrialInfo,
        value: TrialValue,
        time_left: Option<f64>,
        save: bool,
    ) -> Result<()> {
        let key = info.key();
        match self.runhistory.get(&key) {
            Some(existing) if existing.status.is_terminal() => {
                return Err(Error::AlreadyTold(format!("{} with seed {}", info.config, info.seed)));
            }
            Some(_) => {}
            None => self.stats.submitted += 1,
        }

        self.stats.target_function_walltime_used += value.time;
        self.stats.finished += 1;
        self.runhistory.add(key, value.clone(), true);
        self.stats.n_configs = self.runhistory.configs().len();

        let (incumbent, cost) = self.intensifier.process_results(
            &info,
            &value,
            self.incumbent.as_ref(),
            &self.runhistory,
            time_left.unwrap_or(f64::INFINITY),
            true,
        );
        if self.incumbent.as_ref() != Some(&incumbent) {
            let average = self
                .runhistory
                .average_cost(&incumbent)
                .unwrap_or_else(|| Cost::uniform(cost, self.scenario.n_objectives));
            self.stats.update_trajectory(&incumbent, average);
        }
        self.incumbent = Some(match self.runhistory.config_id(&incumbent) {
            Some(id) => incumbent.with_config_id(id),
            None => incumbent,
        });

        if self.intensifier.iteration_done() {
            self.random_design.next_iteration();
        }

        for callback in callbacks.iter_mut() {
            if callback.on_tell_end(self, &info, &value).is_break() {
                self.stop.stop();
            }
        }

        if save { self.save() } else { Ok(()) }
    }

    /// Run the loop until a budget is exhausted, a stop is requested or the
    /// candidate supply runs dry, and return the incumbent.
    ///
    /// Calling `run` again after it finished returns the same incumbent
    /// without running anything.
    ///
    /// # Errors
    ///
    /// - [`Error::Stalled`] if the intensifier waits on trials the runner
    ///   does not have.
    /// - [`Error::NoIncumbent`] if the loop ended before any trial finished.
    /// - [`Error::Storage`] if persisting state fails.
    pub fn run(&mut self) -> Result<Configuration> {
        if self.finished {
            return self.incumbent.clone().ok_or(Error::NoIncumbent);
        }

        #[cfg(feature = "tracing")]
        let _span = tracing::info_span!(
            "smbo_run",
            name = %self.scenario.name,
            n_workers = self.scenario.n_workers,
            intensifier = self.intensifier.name()
        )
        .entered();

        self.stats.start_timing();
        let mut callbacks = mem::take(&mut self.callbacks);
        let result = self.run_loop(&mut callbacks);
        for callback in &mut callbacks {
            callback.on_end(self);
        }
        self.callbacks = callbacks;
        result?;

        self.finished = true;
        self.save()?;
        self.stats.print();
        self.incumbent.clone().ok_or(Error::NoIncumbent)
    }

    fn run_loop(&mut self, callbacks: &mut [Box<dyn Callback>]) -> Result<()> {
        for callback in callbacks.iter_mut() {
            if callback.on_start(self).is_break() {
                self.stop.stop();
            }
        }

        let mut time_left: Option<f64> = None;
        let mut time_spent = 0.0;
        loop {
            let start = Instant::now();
            for callback in callbacks.iter_mut() {
                if callback.on_iteration_start(self).is_break() {
                    self.stop.stop();
                }
            }

            let mut intent = self.ask();

            let elapsed = start.elapsed().as_secs_f64();
            time_spent = if self.intensifier.num_trials() == 0 || time_left.is_none() {
                elapsed
            } else {
                time_spent + elapsed
            };
            time_left = Some(time_bound(self.intensifier.intensify_percentage(), time_spent));

            let exhausted = self.stats.is_budget_exhausted();
            if exhausted || self.stop.is_stopped() {
                intent = TrialInfoIntent::Skip;
            }

            let mut out_of_candidates = false;
            match intent {
                TrialInfoIntent::Run(mut info) => {
                    let id = self.runhistory.add_running(&info, self.scenario.n_objectives);
                    info.config = info.config.with_config_id(id);
                    self.stats.submitted += 1;
                    trace_debug!(config_id = id, seed = info.seed, "submitting trial");
                    self.runner.submit(info);
                }
                TrialInfoIntent::Skip if !exhausted && !self.stop.is_stopped() => {
                    if self.runner.is_running() {
                        self.runner.wait();
                    } else {
                        out_of_candidates = true;
                    }
                }
                TrialInfoIntent::Skip => {}
                TrialInfoIntent::Wait => {
                    if !self.runner.is_running() {
                        return Err(Error::Stalled);
                    }
                    self.runner.wait();
                }
            }

            for (info, value) in self.runner.iter_results() {
                self.tell_with(callbacks, info, value, time_left, true)?;
            }

            if self.stats.is_budget_exhausted() || self.stop.is_stopped() || out_of_candidates {
                if self.stats.is_budget_exhausted() {
                    trace_info!(
                        remaining_walltime = self.stats.remaining_walltime(),
                        remaining_cputime = self.stats.remaining_cputime(),
                        remaining_trials = self.stats.remaining_trials(),
                        "budget exhausted"
                    );
                } else if out_of_candidates {
                    trace_info!("no more challengers to evaluate");
                } else {
                    trace_info!("stop requested");
                }

                while self.runner.is_running() {
                    self.runner.wait();
                    for (info, value) in self.runner.iter_results() {
                        self.tell_with(callbacks, info, value, time_left, true)?;
                    }
                }
                return Ok(());
            }

            for callback in callbacks.iter_mut() {
                if callback.on_iteration_end(self).is_break() {
                    self.stop.stop();
                }
            }

            if self.intensifier.iteration_done() {
                self.stats.print();
            }
        }
    }

    /// Persist the run history and stats to the output directory. A no-op
    /// without one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if a file cannot be written.
    pub fn save(&self) -> Result<()> {
        let Some(dir) = &self.scenario.output_directory else {
            return Ok(());
        };
        self.stats.save(&dir.join(STATS_FILE))?;
        self.runhistory.save(&dir.join(RUNHISTORY_FILE))
    }
}
