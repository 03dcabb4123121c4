use core::ops::ControlFlow;

use super::Smbo;
use crate::runhistory::{TrialInfo, TrialValue};

/// Hooks into the optimization loop.
///
/// Every hook receives a read-only view of the loop. Returning
/// `ControlFlow::Break(())` from any hook but [`on_end`](Callback::on_end)
/// requests a stop: no further trials are submitted and the loop returns
/// once every in-flight trial has been told.
///
/// # Examples
///
/// ```
/// use std::ops::ControlFlow;
///
/// use smbo::{Callback, Smbo, TrialInfo, TrialValue};
///
/// /// Stop once the incumbent costs less than `target`.
/// struct StopBelow {
///     target: f64,
/// }
///
/// impl Callback for StopBelow {
///     fn on_tell_end(&mut self, smbo: &Smbo, _info: &TrialInfo, _value: &TrialValue) -> ControlFlow<()> {
///         let good_enough = smbo
///             .incumbent()
///             .and_then(|inc| smbo.runhistory().get_cost(inc))
///             .is_some_and(|cost| cost < self.target);
///         if good_enough { ControlFlow::Break(()) } else { ControlFlow::Continue(()) }
///     }
/// }
/// ```
pub trait Callback: Send {
    /// Called once before the first iteration of [`Smbo::run`].
    fn on_start(&mut self, _smbo: &Smbo) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }

    /// Called at the start of every loop iteration, before asking.
    fn on_iteration_start(&mut self, _smbo: &Smbo) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }

    /// Called at the end of every loop iteration that did not stop the loop.
    fn on_iteration_end(&mut self, _smbo: &Smbo) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }

    /// Called after a result was recorded and the incumbent updated.
    fn on_tell_end(&mut self, _smbo: &Smbo, _info: &TrialInfo, _value: &TrialValue) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }

    /// Called once after the loop finished.
    fn on_end(&mut self, _smbo: &Smbo) {}
}
