//! Where challengers come from.
//!
//! A [`CandidateSource`] proposes configurations, typically from a surrogate
//! model. The loop asks it for a fresh, lazy sequence on every tick and
//! wraps that sequence in a [`ChallengerList`], which interleaves random
//! configurations according to the [`RandomDesign`].
//!
//! Any `FnMut(&RunHistory) -> Vec<Configuration>` closure is a source:
//!
//! ```
//! use smbo::candidates::CandidateSource;
//! use smbo::config::{ConfigSpace, Configuration, ParamValue};
//! use smbo::runhistory::RunHistory;
//!
//! let mut propose = |history: &RunHistory| {
//!     vec![Configuration::new([("x", ParamValue::Int(history.len() as i64))])]
//! };
//! let space = ConfigSpace::new().int("x", 0, 10);
//! let history = RunHistory::new();
//! let first = propose.next_configurations(&history, &space).next();
//! assert_eq!(first.unwrap().get("x"), Some(&ParamValue::Int(0)));
//! ```

use crate::config::{ConfigSpace, Configuration};
use crate::random_design::RandomDesign;
use crate::runhistory::RunHistory;

/// A lazy, possibly infinite, restartable supply of configurations.
pub trait CandidateSource: Send {
    /// A fresh sequence of proposals given the current run history.
    fn next_configurations<'a>(
        &'a mut self,
        history: &'a RunHistory,
        config_space: &'a ConfigSpace,
    ) -> Box<dyn Iterator<Item = Configuration> + 'a>;
}

impl<F> CandidateSource for F
where
    F: FnMut(&RunHistory) -> Vec<Configuration> + Send,
{
    fn next_configurations<'a>(
        &'a mut self,
        history: &'a RunHistory,
        _config_space: &'a ConfigSpace,
    ) -> Box<dyn Iterator<Item = Configuration> + 'a> {
        Box::new(core::iter::once_with(move || self(history)).flatten())
    }
}

/// Proposes uniformly random configurations forever.
#[derive(Clone, Debug)]
pub struct RandomCandidates {
    rng: fastrand::Rng,
}

impl RandomCandidates {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: fastrand::Rng::with_seed(seed),
        }
    }
}

impl CandidateSource for RandomCandidates {
    fn next_configurations<'a>(
        &'a mut self,
        _history: &'a RunHistory,
        config_space: &'a ConfigSpace,
    ) -> Box<dyn Iterator<Item = Configuration> + 'a> {
        let rng = &mut self.rng;
        Box::new(core::iter::repeat_with(move || {
            config_space.sample(rng).with_origin("random")
        }))
    }
}

/// Interleaves random configurations into a stream of proposals.
///
/// The iteration counter is borrowed from the caller so that the random
/// schedule keeps its position across ticks.
pub struct ChallengerList<'a> {
    proposals: Box<dyn Iterator<Item = Configuration> + 'a>,
    random_design: &'a mut dyn RandomDesign,
    config_space: &'a ConfigSpace,
    rng: &'a mut fastrand::Rng,
    iteration: &'a mut u64,
}

impl<'a> ChallengerList<'a> {
    pub fn new(
        proposals: Box<dyn Iterator<Item = Configuration> + 'a>,
        random_design: &'a mut dyn RandomDesign,
        config_space: &'a ConfigSpace,
        rng: &'a mut fastrand::Rng,
        iteration: &'a mut u64,
    ) -> Self {
        Self {
            proposals,
            random_design,
            config_space,
            rng,
            iteration,
        }
    }
}

impl Iterator for ChallengerList<'_> {
    type Item = Configuration;

    fn next(&mut self) -> Option<Configuration> {
        let iteration = *self.iteration;
        *self.iteration += 1;
        if self.random_design.check(iteration) {
            return Some(self.config_space.sample(self.rng).with_origin("random design"));
        }
        self.proposals.next()
    }
}
