#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![deny(unreachable_pub)]
#![deny(clippy::correctness)]
#![deny(clippy::suspicious)]
#![deny(clippy::style)]
#![deny(clippy::complexity)]
#![deny(clippy::perf)]
#![deny(clippy::pedantic)]
#![deny(clippy::std_instead_of_core)]

//! Sequential model-based optimization with an ask/tell loop, in the style
//! of SMAC. The loop keeps a resumable run history, races challengers
//! against an incumbent through a pluggable intensifier, interleaves random
//! configurations on a schedule, and never has more trials in flight than
//! there are workers.
//!
//! # Getting Started
//!
//! ```
//! use smbo::prelude::*;
//!
//! let scenario = Scenario::builder(ConfigSpace::new().float("x", -10.0, 10.0))
//!     .n_trials(30)
//!     .deterministic(true)
//!     .build()?;
//!
//! let target = |config: &Configuration, _: &TrialContext| match config.get("x") {
//!     Some(ParamValue::Float(x)) => Ok((x - 3.0).powi(2)),
//!     _ => Err("x missing"),
//! };
//! let runner = SerialRunner::new(target, &scenario);
//!
//! let mut smbo = Smbo::builder(scenario, runner).build()?;
//! let incumbent = smbo.run()?;
//! println!("best: {incumbent} at {:?}", smbo.runhistory().get_cost(&incumbent));
//! # Ok::<(), smbo::Error>(())
//! ```
//!
//! # Core Concepts
//!
//! | Type | Role |
//! |------|------|
//! | [`Scenario`] | Everything that defines a run: search space, budgets, workers, persistence. |
//! | [`Smbo`] | The loop. Drive it with [`Smbo::run`] or by hand with [`Smbo::ask`]/[`Smbo::tell`]. |
//! | [`RunHistory`] | Ledger of every submitted and finished trial. |
//! | [`Intensifier`] | Racing policy: what runs next and who becomes incumbent. |
//! | [`RandomDesign`](random_design::RandomDesign) | When to interleave a random challenger. |
//! | [`CandidateSource`](candidates::CandidateSource) | Where model-proposed challengers come from. |
//! | [`Runner`](runner::Runner) | How trials are executed. |
//!
//! # Feature Flags
//!
//! | Flag | What it enables | Default |
//! |------|----------------|---------|
//! | `async` | [`ThreadedRunner`](runner::ThreadedRunner): parallel trials on a tokio blocking pool | off |
//! | `sobol` | `SobolInitialDesign`: scrambled Sobol initial design via `sobol_burley` | off |
//! | `tracing` | Structured log events via [`tracing`](https://docs.rs/tracing) at key loop points | on |

/// Emit a `tracing::info!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_info {
    ($($arg:tt)*) => { tracing::info!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_info {
    ($($arg:tt)*) => {};
}

/// Emit a `tracing::debug!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_debug {
    ($($arg:tt)*) => { tracing::debug!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_debug {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "tracing")]
macro_rules! trace_warn {
    ($($arg:tt)*) => { tracing::warn!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_warn {
    ($($arg:tt)*) => {};
}

pub mod candidates;
pub mod config;
mod error;
pub mod initial_design;
pub mod intensifier;
pub mod persistence;
pub mod random_design;
mod rng_util;
pub mod runhistory;
pub mod runner;
pub mod scenario;
mod smbo;
pub mod stats;
mod types;

pub use error::{Error, Result};
pub use intensifier::{Intensifier, TrialInfoIntent};
pub use runhistory::{RunHistory, TrialInfo, TrialKey, TrialValue};
pub use scenario::{IntensifierKind, Scenario, ScenarioBuilder};
pub use smbo::{
    Callback, FixedDecision, PromptDecider, ResumeDecider, ResumeDecision, Smbo, SmboBuilder,
    StopHandle,
};
pub use stats::Stats;
pub use types::{Cost, Direction, MAXINT, TrialStatus};

/// Convenient wildcard import for the most common types.
///
/// ```
/// use smbo::prelude::*;
/// ```
pub mod prelude {
    pub use crate::candidates::{CandidateSource, RandomCandidates};
    pub use crate::config::{ConfigSpace, Configuration, Hyperparameter, ParamValue};
    pub use crate::error::{Error, Result};
    pub use crate::initial_design::{
        DefaultInitialDesign, FixedInitialDesign, InitialDesign, RandomInitialDesign,
    };
    #[cfg(feature = "sobol")]
    pub use crate::initial_design::SobolInitialDesign;
    pub use crate::intensifier::{Intensifier, SimpleIntensifier, TrialInfoIntent};
    pub use crate::random_design::{
        LinearCoolDownRandomDesign, ModulusRandomDesign, RandomDesign,
    };
    pub use crate::runhistory::{RunHistory, TrialInfo, TrialValue};
    #[cfg(feature = "async")]
    pub use crate::runner::ThreadedRunner;
    pub use crate::runner::{Evaluation, Runner, SerialRunner, TargetFunction, TrialContext};
    pub use crate::scenario::{IntensifierKind, Scenario};
    pub use crate::smbo::{Callback, FixedDecision, ResumeDecision, Smbo, StopHandle};
    pub use crate::types::{Cost, Direction, TrialStatus};
}
