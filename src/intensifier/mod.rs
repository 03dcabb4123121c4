//! Racing policies.
//!
//! An [`Intensifier`] decides what to run next and whether a finished
//! challenger displaces the incumbent. The loop picks the concrete policy
//! from [`Scenario::intensifier`] through [`from_scenario`].
//!
//! | Kind | Policy |
//! |------|--------|
//! | [`IntensifierKind::Simple`] | [`SimpleIntensifier`]: one trial per challenger, at most `n_workers` in flight |

mod simple;

use std::collections::VecDeque;

pub use simple::SimpleIntensifier;

use crate::config::Configuration;
use crate::runhistory::{RunHistory, TrialInfo, TrialValue};
use crate::scenario::{IntensifierKind, Scenario};

/// What the loop should do on this tick.
#[derive(Clone, Debug, PartialEq)]
pub enum TrialInfoIntent {
    /// Submit this trial.
    Run(TrialInfo),
    /// Nothing to submit right now.
    Skip,
    /// Every worker is busy: wait for a result before asking again.
    Wait,
}

impl TrialInfoIntent {
    /// The trial to run, if any.
    #[must_use]
    pub fn trial(&self) -> Option<&TrialInfo> {
        match self {
            Self::Run(info) => Some(info),
            Self::Skip | Self::Wait => None,
        }
    }
}

/// A racing policy.
///
/// The intensifier owns the bookkeeping of which of its trials are still
/// unfinished. It only reads the run history; the loop is the single writer.
pub trait Intensifier: Send {
    /// Pick the next trial.
    ///
    /// Challengers are taken from `challengers` first, then from
    /// `next_configurations`. Unless `repeat_configs` is set, configurations
    /// already in `history` are skipped. Returns [`TrialInfoIntent::Wait`]
    /// while `n_workers` trials are unfinished, without consuming a
    /// challenger.
    fn get_next_run(
        &mut self,
        challengers: &mut VecDeque<Configuration>,
        incumbent: Option<&Configuration>,
        next_configurations: Option<&mut dyn Iterator<Item = Configuration>>,
        history: &RunHistory,
        repeat_configs: bool,
        n_workers: usize,
    ) -> TrialInfoIntent;

    /// Account for a finished trial and return the (possibly new) incumbent
    /// with its aggregated cost.
    fn process_results(
        &mut self,
        info: &TrialInfo,
        value: &TrialValue,
        incumbent: Option<&Configuration>,
        history: &RunHistory,
        time_bound: f64,
        log_trajectory: bool,
    ) -> (Configuration, f64);

    fn uses_seeds(&self) -> bool;

    fn uses_budgets(&self) -> bool;

    fn uses_instances(&self) -> bool;

    /// Number of results processed so far.
    fn num_trials(&self) -> usize;

    /// Returns `true` right after an intensification iteration finished.
    fn iteration_done(&self) -> bool;

    /// Fraction of decision time reserved for intensification, if the
    /// policy bounds it.
    fn intensify_percentage(&self) -> Option<f64>;

    /// Seeds handed to the target function so far.
    fn target_function_seeds(&self) -> Vec<u64>;

    /// Budgets handed to the target function so far, in increasing order.
    fn target_function_budgets(&self) -> Vec<f64> {
        Vec::new()
    }

    fn name(&self) -> &'static str;
}

/// The intensifier selected by `scenario.intensifier`.
#[must_use]
pub fn from_scenario(scenario: &Scenario) -> Box<dyn Intensifier> {
    match scenario.intensifier {
        IntensifierKind::Simple => Box::new(SimpleIntensifier::new(scenario)),
    }
}
