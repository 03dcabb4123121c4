use crate::config::Configuration;
use crate::runhistory::TrialInfo;
use crate::types::{Cost, TrialStatus};

/// What a trial gets to know besides its configuration.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrialContext {
    pub instance: Option<String>,
    pub seed: u64,
    pub budget: Option<f64>,
}

impl From<&TrialInfo> for TrialContext {
    fn from(info: &TrialInfo) -> Self {
        Self {
            instance: info.instance.clone(),
            seed: info.seed,
            budget: info.budget,
        }
    }
}

/// The result a target function reports for one trial.
///
/// Plain costs convert into a successful evaluation:
///
/// ```
/// use smbo::runner::Evaluation;
/// use smbo::TrialStatus;
///
/// let eval: Evaluation = 0.25.into();
/// assert_eq!(eval.status, TrialStatus::Success);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Evaluation {
    pub status: TrialStatus,
    pub cost: Cost,
    pub additional_info: serde_json::Map<String, serde_json::Value>,
}

impl Evaluation {
    /// A successful evaluation with the given cost.
    #[must_use]
    pub fn new(cost: impl Into<Cost>) -> Self {
        Self {
            status: TrialStatus::Success,
            cost: cost.into(),
            additional_info: serde_json::Map::new(),
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: TrialStatus) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn with_info(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.additional_info.insert(key.into(), value.into());
        self
    }
}

impl From<f64> for Evaluation {
    fn from(cost: f64) -> Self {
        Self::new(cost)
    }
}

impl From<Vec<f64>> for Evaluation {
    fn from(cost: Vec<f64>) -> Self {
        Self::new(cost)
    }
}

impl From<Cost> for Evaluation {
    fn from(cost: Cost) -> Self {
        Self::new(cost)
    }
}

/// The black-box function being optimized.
///
/// Any `Fn(&Configuration, &TrialContext) -> Result<O, E>` closure where `O`
/// converts into an [`Evaluation`] is a target function. An `Err` is
/// recorded as a [`Crashed`](TrialStatus::Crashed) trial, never propagated.
pub trait TargetFunction: Send + Sync {
    type Output: Into<Evaluation>;
    type Error: ToString;

    /// Evaluate `config` once.
    ///
    /// # Errors
    ///
    /// Any error; the runner turns it into a crashed trial.
    fn evaluate(&self, config: &Configuration, context: &TrialContext) -> Result<Self::Output, Self::Error>;
}

impl<F, O, E> TargetFunction for F
where
    F: Fn(&Configuration, &TrialContext) -> Result<O, E> + Send + Sync,
    O: Into<Evaluation>,
    E: ToString,
{
    type Output = O;
    type Error = E;

    fn evaluate(&self, config: &Configuration, context: &TrialContext) -> Result<O, E> {
        self(config, context)
    }
}
