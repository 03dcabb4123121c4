//! Core types shared by the loop, the intensifier and the run history.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Upper bound (exclusive) for sampled target-function seeds, also used as
/// the placeholder cost of trials that are still running.
pub const MAXINT: u64 = 2_147_483_647;

/// The direction of optimization.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Lower cost is better (the default).
    #[default]
    Minimize,
    /// Higher cost is better.
    Maximize,
}

impl Direction {
    /// Returns `true` if `challenger` is strictly better than `incumbent`.
    ///
    /// Ties are never better, so an equal challenger never displaces the
    /// incumbent.
    #[must_use]
    pub fn is_better(self, challenger: f64, incumbent: f64) -> bool {
        match self {
            Direction::Minimize => challenger < incumbent,
            Direction::Maximize => challenger > incumbent,
        }
    }

    /// The worst possible cost under this direction.
    #[must_use]
    pub fn worst(self) -> f64 {
        match self {
            Direction::Minimize => f64::INFINITY,
            Direction::Maximize => f64::NEG_INFINITY,
        }
    }
}

/// The state of a trial in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrialStatus {
    /// The trial finished and reported a cost.
    Success,
    /// The trial ran out of its wall-clock allowance.
    Timeout,
    /// The target function failed.
    Crashed,
    /// The trial was aborted before finishing.
    Abort,
    /// The trial ran out of memory.
    MemoryOut,
    /// The trial was submitted and has not been told yet.
    Running,
}

impl TrialStatus {
    /// Returns `true` for every status except [`Running`](Self::Running).
    #[must_use]
    pub fn is_terminal(self) -> bool {
        self != TrialStatus::Running
    }
}

/// Serde adapter for `f64` fields that may hold `inf` or `NaN`.
///
/// JSON has no literal for non-finite numbers and `serde_json` writes them
/// as `null`, which does not read back. These are written as the strings
/// `"inf"`, `"-inf"` and `"nan"` instead.
pub(crate) mod json_f64 {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    pub(crate) fn serialize<S: Serializer>(value: &f64, s: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            s.serialize_f64(*value)
        } else if value.is_nan() {
            s.serialize_str("nan")
        } else if value.is_sign_positive() {
            s.serialize_str("inf")
        } else {
            s.serialize_str("-inf")
        }
    }

    pub(crate) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        match Repr::deserialize(d)? {
            Repr::Number(v) => Ok(v),
            Repr::Text(text) => match text.as_str() {
                "inf" => Ok(f64::INFINITY),
                "-inf" => Ok(f64::NEG_INFINITY),
                "nan" => Ok(f64::NAN),
                other => Err(D::Error::custom(format!("invalid float `{other}`"))),
            },
        }
    }
}

#[derive(Serialize, Deserialize)]
struct JsonF64(#[serde(with = "json_f64")] f64);

/// The cost of one trial: one value per objective.
#[derive(Clone, Debug, PartialEq)]
pub struct Cost(pub Vec<f64>);

impl Serialize for Cost {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_seq(self.0.iter().map(|v| JsonF64(*v)))
    }
}

impl<'de> Deserialize<'de> for Cost {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let values = Vec::<JsonF64>::deserialize(d)?;
        Ok(Self(values.into_iter().map(|v| v.0).collect()))
    }
}

impl Cost {
    /// A single-objective cost.
    #[must_use]
    pub fn single(value: f64) -> Self {
        Self(vec![value])
    }

    /// The same value repeated for each of `n_objectives` objectives.
    #[must_use]
    pub fn uniform(value: f64, n_objectives: usize) -> Self {
        Self(vec![value; n_objectives.max(1)])
    }

    /// Number of objectives.
    #[must_use]
    pub fn n_objectives(&self) -> usize {
        self.0.len()
    }

    /// The values, one per objective.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.0
    }

    /// Scalar used for incumbent comparison: the mean over objectives.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn scalar(&self) -> f64 {
        if self.0.is_empty() {
            return f64::NAN;
        }
        self.0.iter().sum::<f64>() / self.0.len() as f64
    }
}

impl From<f64> for Cost {
    fn from(value: f64) -> Self {
        Self::single(value)
    }
}

impl From<Vec<f64>> for Cost {
    fn from(values: Vec<f64>) -> Self {
        Self(values)
    }
}
