/// Errors raised while building or driving an optimization loop.
///
/// Only setup and bookkeeping problems are errors. A trial that crashes,
/// times out or runs out of memory is a normal outcome and is reported
/// through [`TrialValue::status`](crate::runhistory::TrialValue::status).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when the initial design produced no configurations.
    #[error("the initial design produced no configurations")]
    NoInitialConfigurations,

    /// Returned when a scenario fails validation.
    #[error("invalid scenario: {0}")]
    InvalidScenario(String),

    /// Returned when a previous run was found, it differs from the current
    /// scenario, and no usable resume decision was given.
    #[error("a different previous run exists and no resume decision was made")]
    ResumeAborted,

    /// Returned when run-history data is reused from a previous run whose
    /// configuration space differs from the current one.
    #[error("configuration space of the previous run does not match the current one")]
    ConfigSpaceMismatch,

    /// Returned when restored state violates a loop invariant.
    #[error("inconsistent optimizer state: {0}")]
    InconsistentState(&'static str),

    /// Returned when a result is told twice for the same trial.
    #[error("trial {0} was already told")]
    AlreadyTold(String),

    /// Returned when the intensifier waits on trials the runner does not know about.
    #[error("intensifier is waiting for trials but the runner has nothing in flight")]
    Stalled,

    /// Returned when the loop terminated before any trial completed.
    #[error("no trial completed, so there is no incumbent")]
    NoIncumbent,

    /// Returned when reading or writing persisted state fails.
    #[error("storage error: {0}")]
    Storage(String),

    /// Returned when a runner cannot be set up.
    #[error("runner error: {0}")]
    Runner(String),
}

pub type Result<T> = core::result::Result<T, Error>;
