use std::collections::{HashSet, VecDeque};

use super::resume::{self, PromptDecider, ResumeDecider};
use super::{Callback, Smbo, StopHandle};
use crate::candidates::{CandidateSource, RandomCandidates};
use crate::error::{Error, Result};
use crate::initial_design::{DefaultInitialDesign, InitialDesign};
use crate::intensifier::{self, Intensifier};
use crate::random_design::{ModulusRandomDesign, RandomDesign};
use crate::runner::Runner;
use crate::scenario::Scenario;

/// A builder for constructing [`Smbo`] instances with a fluent API.
///
/// Created via [`Smbo::builder()`]. Only the scenario and the runner are
/// required.
///
/// # Defaults
///
/// - Candidate source: [`RandomCandidates`] seeded with the scenario seed
/// - Random design: [`ModulusRandomDesign`] with modulus `2`
/// - Initial design: [`DefaultInitialDesign`]
/// - Intensifier: selected by [`Scenario::intensifier`]
/// - Resume decider: [`PromptDecider`]
/// - `overwrite = false`, `repeat_configs = false`
///
/// # Examples
///
/// ```
/// use smbo::config::{ConfigSpace, Configuration, ParamValue};
/// use smbo::initial_design::RandomInitialDesign;
/// use smbo::runner::{SerialRunner, TrialContext};
/// use smbo::{Scenario, Smbo};
///
/// let scenario = Scenario::builder(ConfigSpace::new().float("x", -5.0, 5.0))
///     .n_trials(20)
///     .deterministic(true)
///     .build()?;
/// let runner = SerialRunner::new(
///     |c: &Configuration, _: &TrialContext| match c.get("x") {
///         Some(ParamValue::Float(x)) => Ok(x * x),
///         _ => Err("x missing"),
///     },
///     &scenario,
/// );
///
/// let mut smbo = Smbo::builder(scenario, runner)
///     .initial_design(RandomInitialDesign::new(5, 0))
///     .build()?;
/// let incumbent = smbo.run()?;
/// assert_eq!(smbo.stats().finished, 20);
/// assert!(smbo.runhistory().get_cost(&incumbent).is_some());
/// # Ok::<(), smbo::Error>(())
/// ```
pub struct SmboBuilder {
    scenario: Scenario,
    runner: Box<dyn Runner>,
    candidate_source: Option<Box<dyn CandidateSource>>,
    random_design: Option<Box<dyn RandomDesign>>,
    initial_design: Option<Box<dyn InitialDesign>>,
    intensifier: Option<Box<dyn Intensifier>>,
    callbacks: Vec<Box<dyn Callback>>,
    resume_decider: Option<Box<dyn ResumeDecider>>,
    overwrite: bool,
    repeat_configs: bool,
}

impl SmboBuilder {
    pub(super) fn new(scenario: Scenario, runner: Box<dyn Runner>) -> Self {
        Self {
            scenario,
            runner,
            candidate_source: None,
            random_design: None,
            initial_design: None,
            intensifier: None,
            callbacks: Vec::new(),
            resume_decider: None,
            overwrite: false,
            repeat_configs: false,
        }
    }

    /// Set the source of model-proposed challengers.
    #[must_use]
    pub fn candidate_source(mut self, source: impl CandidateSource + 'static) -> Self {
        self.candidate_source = Some(Box::new(source));
        self
    }

    /// Set the schedule for interleaving random challengers.
    #[must_use]
    pub fn random_design(mut self, design: impl RandomDesign + 'static) -> Self {
        self.random_design = Some(Box::new(design));
        self
    }

    /// Set the design that produces the first challengers.
    #[must_use]
    pub fn initial_design(mut self, design: impl InitialDesign + 'static) -> Self {
        self.initial_design = Some(Box::new(design));
        self
    }

    /// Use a custom racing policy instead of the one the scenario selects.
    #[must_use]
    pub fn intensifier(mut self, intensifier: impl Intensifier + 'static) -> Self {
        self.intensifier = Some(Box::new(intensifier));
        self
    }

    /// Register a loop callback. Callbacks run in registration order.
    #[must_use]
    pub fn callback(mut self, callback: impl Callback + 'static) -> Self {
        self.callbacks.push(Box::new(callback));
        self
    }

    /// Set who decides what to do with a different previous run.
    #[must_use]
    pub fn resume_decider(mut self, decider: impl ResumeDecider + 'static) -> Self {
        self.resume_decider = Some(Box::new(decider));
        self
    }

    /// Ignore any previous run in the output directory.
    #[must_use]
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Allow configurations that are already in the run history to be
    /// evaluated again.
    #[must_use]
    pub fn repeat_configs(mut self, repeat: bool) -> Self {
        self.repeat_configs = repeat;
        self
    }

    /// Select the initial configurations, restore any previous run and
    /// build the loop.
    ///
    /// # Errors
    ///
    /// - [`Error::NoInitialConfigurations`] if the initial design is empty.
    /// - [`Error::ResumeAborted`] if a different previous run exists and the
    ///   decider gave no answer.
    /// - [`Error::ConfigSpaceMismatch`] if a previous run history is reused
    ///   with a different configuration space.
    /// - [`Error::InconsistentState`] if the restored run history and stats
    ///   disagree about whether anything finished.
    /// - [`Error::Storage`] if persisted state cannot be read or written.
    pub fn build(self) -> Result<Smbo> {
        let scenario = self.scenario;

        let mut initial_design = self
            .initial_design
            .unwrap_or_else(|| Box::new(DefaultInitialDesign));
        let mut seen = HashSet::new();
        let initial_design_configs: VecDeque<_> = initial_design
            .select_configurations(&scenario.config_space)
            .into_iter()
            .filter(|c| seen.insert(c.clone()))
            .collect();
        if initial_design_configs.is_empty() {
            return Err(Error::NoInitialConfigurations);
        }

        let mut decider = self
            .resume_decider
            .unwrap_or_else(|| Box::new(PromptDecider));
        let (runhistory, stats) = resume::initialize_state(&scenario, self.overwrite, decider.as_mut())?;

        let incumbent = stats.incumbent().map(|config| match runhistory.config_id(config) {
            Some(id) => config.clone().with_config_id(id),
            None => config.clone(),
        });
        if stats.finished == 0 || incumbent.is_none() {
            if !runhistory.is_empty() {
                return Err(Error::InconsistentState(
                    "run history has entries but no trial finished",
                ));
            }
        } else if runhistory.is_empty() {
            return Err(Error::InconsistentState(
                "an incumbent exists but the run history is empty",
            ));
        } else {
            trace_info!(
                incumbent = %incumbent.as_ref().map(ToString::to_string).unwrap_or_default(),
                "starting optimization with incumbent"
            );
            stats.print();
        }

        let intensifier = self
            .intensifier
            .unwrap_or_else(|| intensifier::from_scenario(&scenario));
        let candidate_source = self
            .candidate_source
            .unwrap_or_else(|| Box::new(RandomCandidates::new(scenario.seed)));
        let random_design = self
            .random_design
            .unwrap_or_else(|| Box::new(ModulusRandomDesign::default()));
        let rng = fastrand::Rng::with_seed(scenario.seed.wrapping_add(1));

        Ok(Smbo {
            scenario,
            stats,
            runhistory,
            intensifier,
            runner: self.runner,
            candidate_source,
            random_design,
            initial_design_configs,
            incumbent,
            callbacks: self.callbacks,
            stop: StopHandle::default(),
            finished: false,
            rng,
            challenger_index: 1,
            repeat_configs: self.repeat_configs,
        })
    }
}
