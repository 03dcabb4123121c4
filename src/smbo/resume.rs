//! Picking up the state of a previous run.

use std::io::{BufRead, Write};

use crate::error::{Error, Result};
use crate::persistence::{RUNHISTORY_FILE, SCENARIO_FILE, STATS_FILE};
use crate::runhistory::RunHistory;
use crate::scenario::Scenario;
use crate::stats::Stats;

/// How to proceed when the output directory holds a different run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResumeDecision {
    /// Ignore the previous run and start from scratch.
    Overwrite,
    /// Start a new run but keep the previous run history and stats. The
    /// configuration spaces must be identical.
    ReuseRunHistory,
}

/// Answers the question of what to do with a different previous run.
///
/// `diff` lists the scenario fields that changed. Returning `None` aborts
/// construction with [`Error::ResumeAborted`].
pub trait ResumeDecider {
    fn decide(&mut self, diff: &[String]) -> Option<ResumeDecision>;
}

impl<F> ResumeDecider for F
where
    F: FnMut(&[String]) -> Option<ResumeDecision>,
{
    fn decide(&mut self, diff: &[String]) -> Option<ResumeDecision> {
        self(diff)
    }
}

/// Always gives the same answer. Useful for headless runs and tests.
#[derive(Clone, Copy, Debug)]
pub struct FixedDecision(pub Option<ResumeDecision>);

impl ResumeDecider for FixedDecision {
    fn decide(&mut self, _diff: &[String]) -> Option<ResumeDecision> {
        self.0
    }
}

/// Asks the operator on stderr/stdin. This is the default.
#[derive(Clone, Copy, Debug, Default)]
pub struct PromptDecider;

impl ResumeDecider for PromptDecider {
    fn decide(&mut self, diff: &[String]) -> Option<ResumeDecision> {
        let mut stderr = std::io::stderr().lock();
        let prompt = writeln!(stderr, "Found a previous run that differs from the current one:")
            .and_then(|()| diff.iter().try_for_each(|line| writeln!(stderr, "  {line}")))
            .and_then(|()| {
                writeln!(
                    stderr,
                    "Press one of the following numbers to continue or any other key to abort:\n\
                     (1) Overwrite the previous run completely.\n\
                     (2) Overwrite the previous run and reuse its run history. \
                     The configuration space has to be the same."
                )
            });
        if prompt.is_err() {
            return None;
        }

        let mut answer = String::new();
        std::io::stdin().lock().read_line(&mut answer).ok()?;
        match answer.trim() {
            "1" => Some(ResumeDecision::Overwrite),
            "2" => Some(ResumeDecision::ReuseRunHistory),
            _ => None,
        }
    }
}

/// Load or discard the state persisted in the scenario's output directory
/// and write the current scenario there.
pub(super) fn initialize_state(
    scenario: &Scenario,
    overwrite: bool,
    decider: &mut dyn ResumeDecider,
) -> Result<(RunHistory, Stats)> {
    let mut history = RunHistory::new();
    let mut stats = Stats::new(scenario);

    if let (false, Some(dir)) = (overwrite, &scenario.output_directory) {
        let history_path = dir.join(RUNHISTORY_FILE);
        let stats_path = dir.join(STATS_FILE);
        if dir.join(SCENARIO_FILE).exists() && history_path.exists() && stats_path.exists() {
            let previous = Scenario::load(dir)?;
            if *scenario == previous {
                trace_info!(dir = %dir.display(), "continuing from previous run");
                history = RunHistory::load(&history_path, &scenario.config_space)?;
                stats = Stats::load(&stats_path, scenario)?;
                if stats.submitted == 1 && stats.finished == 0 {
                    trace_info!("previous run never finished a trial, starting from scratch");
                    history.reset();
                    stats.reset();
                }
            } else {
                let diff = scenario.diff(&previous);
                trace_info!(dir = %dir.display(), changes = diff.len(), "found a different previous run");
                match decider.decide(&diff) {
                    Some(ResumeDecision::Overwrite) => {
                        trace_info!("overwriting previous run");
                    }
                    Some(ResumeDecision::ReuseRunHistory) => {
                        if scenario.config_space != previous.config_space {
                            return Err(Error::ConfigSpaceMismatch);
                        }
                        trace_info!("reusing run history of previous run");
                        history = RunHistory::load(&history_path, &scenario.config_space)?;
                        stats = Stats::load(&stats_path, scenario)?;
                    }
                    None => return Err(Error::ResumeAborted),
                }
            }

            let orphaned = history.discard_running();
            if orphaned > 0 {
                trace_warn!(orphaned, "discarded trials that were still running when the previous run stopped");
                stats.submitted = stats.submitted.saturating_sub(orphaned);
            }
        }
    }

    scenario.save()?;
    Ok((history, stats))
}
