//! Trial execution.
//!
//! The loop only talks to a [`Runner`]: it submits trials, waits for
//! capacity, and drains whatever results are ready. How and where the
//! [`TargetFunction`] actually runs is up to the implementation.
//!
//! | Runner | Execution | Feature flag |
//! |--------|-----------|-------------|
//! | [`SerialRunner`] | In-line on `submit`, one trial at a time | — |
//! | `ThreadedRunner` | tokio blocking pool, per-trial timeout | `async` |

mod serial;
mod target;
#[cfg(feature = "async")]
mod threaded;

use std::time::Instant;

pub use serial::SerialRunner;
pub use target::{Evaluation, TargetFunction, TrialContext};
#[cfg(feature = "async")]
pub use threaded::ThreadedRunner;

use crate::config::Configuration;
use crate::runhistory::{TrialInfo, TrialValue};
use crate::types::{Cost, TrialStatus};

/// Executes trials on behalf of the loop.
///
/// Every submitted trial must eventually come back from
/// [`iter_results`](Runner::iter_results) exactly once.
pub trait Runner: Send {
    /// Enqueue a trial. Never blocks on the trial itself.
    fn submit(&mut self, info: TrialInfo);

    /// Block until a result is available or nothing is running.
    fn wait(&mut self);

    /// Drain the results that are ready, in completion order. Never blocks.
    fn iter_results(&mut self) -> Vec<(TrialInfo, TrialValue)>;

    /// Returns `true` while any submitted trial has not been drained.
    fn is_running(&self) -> bool;

    /// Evaluate `config` synchronously, outside the submission queue.
    fn run(&self, config: &Configuration, context: &TrialContext) -> TrialValue;
}

/// Evaluate once and turn the outcome into a [`TrialValue`].
///
/// Errors become crashed trials with `crash_cost`. A successful trial that
/// exceeded `walltime_limit` is recorded as a timeout.
pub(crate) fn execute<T: TargetFunction + ?Sized>(
    target: &T,
    config: &Configuration,
    context: &TrialContext,
    crash_cost: &Cost,
    epoch: Instant,
    walltime_limit: Option<f64>,
) -> TrialValue {
    let starttime = epoch.elapsed().as_secs_f64();
    let outcome = target.evaluate(config, context);
    let endtime = epoch.elapsed().as_secs_f64();

    let mut value = match outcome {
        Ok(output) => {
            let eval = output.into();
            TrialValue {
                additional_info: eval.additional_info,
                ..TrialValue::new(eval.status, eval.cost)
            }
        }
        Err(e) => TrialValue::new(TrialStatus::Crashed, crash_cost.clone()).with_info("error", e.to_string()),
    }
    .with_timing(starttime, endtime);

    if value.status == TrialStatus::Success && walltime_limit.is_some_and(|limit| value.time > limit) {
        value.status = TrialStatus::Timeout;
        value.cost = crash_cost.clone();
    }
    value
}
