//! Configurations and the search space they are drawn from.
//!
//! The loop treats a [`Configuration`] as an opaque, immutable value that
//! only needs structural equality and hashing. [`ConfigSpace`] is the small
//! descriptor used to sample random configurations (initial designs, the
//! random design, the default candidate source) and to check that persisted
//! configurations still belong to the current space.
//!
//! ```
//! use smbo::config::{ConfigSpace, ParamValue};
//!
//! let space = ConfigSpace::new()
//!     .float("x", -5.0, 5.0)
//!     .log_float("lr", 1e-4, 1e-1)
//!     .int("layers", 1, 8)
//!     .categorical("activation", ["relu", "tanh"]);
//!
//! let mut rng = fastrand::Rng::with_seed(7);
//! let config = space.sample(&mut rng);
//! assert!(space.contains(&config));
//! assert!(matches!(config.get("layers"), Some(ParamValue::Int(1..=8))));
//! ```

use core::fmt;
use core::hash::{Hash, Hasher};
use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::rng_util;

/// A single parameter value inside a [`Configuration`].
///
/// Floats compare and hash by bit pattern so that `Eq` and `Hash` agree.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// An integer parameter value.
    Int(i64),
    /// A floating-point parameter value.
    Float(f64),
    /// A categorical choice.
    Categorical(String),
}

impl PartialEq for ParamValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::Categorical(a), Self::Categorical(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for ParamValue {}

impl Hash for ParamValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        core::mem::discriminant(self).hash(state);
        match self {
            Self::Int(v) => v.hash(state),
            Self::Float(v) => v.to_bits().hash(state),
            Self::Categorical(v) => v.hash(state),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Categorical(v) => write!(f, "{v}"),
        }
    }
}

/// One point in the search space.
///
/// Cloning is cheap: the values live behind an `Arc`. Equality and hashing
/// only look at the values, never at [`origin`](Self::origin) or
/// [`config_id`](Self::config_id).
#[derive(Clone, Serialize, Deserialize)]
pub struct Configuration {
    values: Arc<BTreeMap<String, ParamValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    origin: Option<String>,
    #[serde(skip)]
    config_id: Option<u64>,
}

impl Configuration {
    /// Creates a configuration from name/value pairs.
    pub fn new<K: Into<String>>(values: impl IntoIterator<Item = (K, ParamValue)>) -> Self {
        Self {
            values: Arc::new(values.into_iter().map(|(k, v)| (k.into(), v)).collect()),
            origin: None,
            config_id: None,
        }
    }

    /// Labels where this configuration came from (e.g. `"random design"`).
    #[must_use]
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Attaches the identifier assigned by the run history.
    #[must_use]
    pub fn with_config_id(mut self, id: u64) -> Self {
        self.config_id = Some(id);
        self
    }

    /// Returns the value of the named parameter.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    /// Iterates over `(name, value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if the configuration has no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    #[must_use]
    pub fn config_id(&self) -> Option<u64> {
        self.config_id
    }
}

impl PartialEq for Configuration {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.values, &other.values) || self.values == other.values
    }
}

impl Eq for Configuration {}

impl Hash for Configuration {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.values.hash(state);
    }
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.values.iter()).finish()
    }
}

impl fmt::Display for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (name, value)) in self.values.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}: {value}")?;
        }
        f.write_str("}")
    }
}

/// How a single parameter is sampled.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Hyperparameter {
    /// Float range `[low, high]`, optionally sampled in log space.
    Float { low: f64, high: f64, log: bool },
    /// Integer range `[low, high]`, optionally sampled in log space.
    Int { low: i64, high: i64, log: bool },
    /// One of a fixed set of choices.
    Categorical { choices: Vec<String> },
}

impl Hyperparameter {
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    fn sample(&self, rng: &mut fastrand::Rng) -> ParamValue {
        match self {
            Self::Float { low, high, log } => {
                let value = if *log {
                    rng_util::f64_range(rng, low.ln(), high.ln()).exp()
                } else {
                    rng_util::f64_range(rng, *low, *high)
                };
                ParamValue::Float(value.clamp(*low, *high))
            }
            Self::Int { low, high, log } => {
                let value = if *log {
                    let raw = rng_util::f64_range(rng, (*low as f64).ln(), (*high as f64).ln())
                        .exp()
                        .round() as i64;
                    raw.clamp(*low, *high)
                } else {
                    rng.i64(*low..=*high)
                };
                ParamValue::Int(value)
            }
            Self::Categorical { choices } => {
                ParamValue::Categorical(choices[rng.usize(0..choices.len())].clone())
            }
        }
    }

    /// Maps a point in `[0, 1)` onto the parameter's range.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_precision_loss,
        clippy::cast_sign_loss
    )]
    fn value_at(&self, point: f64) -> ParamValue {
        let point = point.clamp(0.0, 1.0);
        match self {
            Self::Float { low, high, log } => {
                let value = if *log {
                    (low.ln() + point * (high.ln() - low.ln())).exp()
                } else {
                    low + point * (high - low)
                };
                ParamValue::Float(value.clamp(*low, *high))
            }
            Self::Int { low, high, log } => {
                let value = if *log {
                    let (log_low, log_high) = ((*low as f64).ln(), (*high as f64).ln());
                    (log_low + point * (log_high - log_low)).exp().round() as i64
                } else {
                    let range = (high - low + 1) as f64;
                    low + (point * range).floor() as i64
                };
                ParamValue::Int(value.clamp(*low, *high))
            }
            Self::Categorical { choices } => {
                let index = (point * choices.len() as f64).floor() as usize;
                ParamValue::Categorical(choices[index.min(choices.len() - 1)].clone())
            }
        }
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    fn default_value(&self) -> ParamValue {
        match self {
            Self::Float { low, high, log } => {
                let mid = if *log {
                    ((low.ln() + high.ln()) / 2.0).exp()
                } else {
                    low + (high - low) / 2.0
                };
                ParamValue::Float(mid.clamp(*low, *high))
            }
            Self::Int { low, high, log } => {
                let mid = if *log {
                    (((*low as f64).ln() + (*high as f64).ln()) / 2.0).exp()
                } else {
                    (*low as f64 + *high as f64) / 2.0
                };
                ParamValue::Int((mid.round() as i64).clamp(*low, *high))
            }
            Self::Categorical { choices } => ParamValue::Categorical(choices[0].clone()),
        }
    }

    fn contains(&self, value: &ParamValue) -> bool {
        match (self, value) {
            (Self::Float { low, high, .. }, ParamValue::Float(v)) => (*low..=*high).contains(v),
            (Self::Int { low, high, .. }, ParamValue::Int(v)) => (*low..=*high).contains(v),
            (Self::Categorical { choices }, ParamValue::Categorical(v)) => choices.contains(v),
            _ => false,
        }
    }

    fn validate(&self, name: &str) -> Result<()> {
        let invalid = |reason: &str| Err(Error::InvalidScenario(format!("parameter '{name}': {reason}")));
        match self {
            Self::Float { low, high, log } => {
                if low.is_nan() || high.is_nan() || low > high {
                    return invalid("low must be less than or equal to high");
                }
                if *log && *low <= 0.0 {
                    return invalid("low must be positive for log scale");
                }
            }
            Self::Int { low, high, log } => {
                if low > high {
                    return invalid("low must be less than or equal to high");
                }
                if *log && *low <= 0 {
                    return invalid("low must be positive for log scale");
                }
            }
            Self::Categorical { choices } => {
                if choices.is_empty() {
                    return invalid("categorical choices cannot be empty");
                }
            }
        }
        Ok(())
    }
}

/// The search space: named hyperparameters in name order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigSpace {
    params: BTreeMap<String, Hyperparameter>,
}

impl ConfigSpace {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a parameter, replacing any earlier one with the same name.
    #[must_use]
    pub fn add(mut self, name: impl Into<String>, hyperparameter: Hyperparameter) -> Self {
        self.params.insert(name.into(), hyperparameter);
        self
    }

    /// Adds a uniform float parameter on `[low, high]`.
    #[must_use]
    pub fn float(self, name: impl Into<String>, low: f64, high: f64) -> Self {
        self.add(name, Hyperparameter::Float { low, high, log: false })
    }

    /// Adds a log-uniform float parameter on `[low, high]`.
    #[must_use]
    pub fn log_float(self, name: impl Into<String>, low: f64, high: f64) -> Self {
        self.add(name, Hyperparameter::Float { low, high, log: true })
    }

    /// Adds a uniform integer parameter on `[low, high]`.
    #[must_use]
    pub fn int(self, name: impl Into<String>, low: i64, high: i64) -> Self {
        self.add(name, Hyperparameter::Int { low, high, log: false })
    }

    /// Adds a categorical parameter.
    #[must_use]
    pub fn categorical<S: Into<String>>(
        self,
        name: impl Into<String>,
        choices: impl IntoIterator<Item = S>,
    ) -> Self {
        let choices = choices.into_iter().map(Into::into).collect();
        self.add(name, Hyperparameter::Categorical { choices })
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Hyperparameter> {
        self.params.get(name)
    }

    /// Number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Checks every parameter's bounds and choices.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidScenario`] naming the first bad parameter.
    pub fn validate(&self) -> Result<()> {
        if self.params.is_empty() {
            return Err(Error::InvalidScenario(
                "configuration space has no parameters".to_string(),
            ));
        }
        self.params.iter().try_for_each(|(name, hp)| hp.validate(name))
    }

    /// Draws one configuration uniformly at random.
    pub fn sample(&self, rng: &mut fastrand::Rng) -> Configuration {
        Configuration::new(
            self.params
                .iter()
                .map(|(name, hp)| (name.clone(), hp.sample(rng))),
        )
    }

    /// The configuration at a point of the unit hypercube, one coordinate
    /// per parameter in name order. Missing coordinates count as `0`.
    #[must_use]
    pub fn configuration_at(&self, point: &[f64]) -> Configuration {
        Configuration::new(self.params.iter().enumerate().map(|(i, (name, hp))| {
            (name.clone(), hp.value_at(point.get(i).copied().unwrap_or(0.0)))
        }))
    }

    /// The configuration at the centre of every range (first choice for
    /// categoricals).
    #[must_use]
    pub fn default_configuration(&self) -> Configuration {
        Configuration::new(
            self.params
                .iter()
                .map(|(name, hp)| (name.clone(), hp.default_value())),
        )
    }

    /// Returns `true` if `config` sets exactly this space's parameters to
    /// in-range values.
    #[must_use]
    pub fn contains(&self, config: &Configuration) -> bool {
        config.len() == self.params.len()
            && config.iter().all(|(name, value)| {
                self.params
                    .get(name)
                    .is_some_and(|hp| hp.contains(value))
            })
    }
}
