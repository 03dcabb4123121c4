//! The trial ledger.
//!
//! [`RunHistory`] maps every [`TrialKey`] that was ever submitted or told to
//! its latest [`TrialValue`], in insertion order, and hands out stable
//! configuration identifiers. Only the loop writes to it; the intensifier
//! reads aggregated costs through a shared borrow.
//!
//! A submitted trial is first recorded as a [`TrialStatus::Running`]
//! placeholder with a sentinel cost of [`MAXINT`] per objective. Telling the
//! result replaces the placeholder; any other existing record is only
//! replaced when the caller forces it.

use core::hash::{Hash, Hasher};
use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::{ConfigSpace, Configuration};
use crate::error::{Error, Result};
use crate::persistence;
use crate::types::{Cost, MAXINT, TrialStatus};

/// Identifies one executable unit of work.
///
/// Two trials with the same key are never in flight at the same time.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrialKey {
    pub config: Configuration,
    pub instance: Option<String>,
    pub seed: Option<u64>,
    pub budget: Option<f64>,
}

impl PartialEq for TrialKey {
    fn eq(&self, other: &Self) -> bool {
        self.config == other.config
            && self.instance == other.instance
            && self.seed == other.seed
            && self.budget.map(f64::to_bits) == other.budget.map(f64::to_bits)
    }
}

impl Eq for TrialKey {}

impl Hash for TrialKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.config.hash(state);
        self.instance.hash(state);
        self.seed.hash(state);
        self.budget.map(f64::to_bits).hash(state);
    }
}

/// A request to execute one trial.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrialInfo {
    pub config: Configuration,
    pub instance: Option<String>,
    /// Always set: `0` for deterministic target functions, sampled otherwise.
    pub seed: u64,
    pub budget: Option<f64>,
}

impl TrialInfo {
    /// A trial of `config` with the given seed and no instance or budget.
    #[must_use]
    pub fn new(config: Configuration, seed: u64) -> Self {
        Self {
            config,
            instance: None,
            seed,
            budget: None,
        }
    }

    #[must_use]
    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = Some(instance.into());
        self
    }

    #[must_use]
    pub fn with_budget(mut self, budget: f64) -> Self {
        self.budget = Some(budget);
        self
    }

    /// The ledger key of this trial.
    #[must_use]
    pub fn key(&self) -> TrialKey {
        TrialKey {
            config: self.config.clone(),
            instance: self.instance.clone(),
            seed: Some(self.seed),
            budget: self.budget,
        }
    }
}

/// The outcome of one trial.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrialValue {
    pub status: TrialStatus,
    pub cost: Cost,
    /// Runtime of the target function in seconds.
    pub time: f64,
    /// Start time in seconds since the loop started.
    pub starttime: f64,
    /// End time in seconds since the loop started.
    pub endtime: f64,
    /// Free-form information reported by the runner or target function.
    #[serde(default)]
    pub additional_info: serde_json::Map<String, serde_json::Value>,
}

impl TrialValue {
    /// An outcome with the given status and cost and zero runtime.
    #[must_use]
    pub fn new(status: TrialStatus, cost: impl Into<Cost>) -> Self {
        Self {
            status,
            cost: cost.into(),
            time: 0.0,
            starttime: 0.0,
            endtime: 0.0,
            additional_info: serde_json::Map::new(),
        }
    }

    /// A successful outcome with the given cost.
    #[must_use]
    pub fn success(cost: impl Into<Cost>) -> Self {
        Self::new(TrialStatus::Success, cost)
    }

    /// Sets the measured runtime and the start and end timestamps.
    #[must_use]
    pub fn with_timing(mut self, starttime: f64, endtime: f64) -> Self {
        self.starttime = starttime;
        self.endtime = endtime;
        self.time = (endtime - starttime).max(0.0);
        self
    }

    /// Adds an entry to [`additional_info`](Self::additional_info).
    #[must_use]
    pub fn with_info(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.additional_info.insert(key.into(), value.into());
        self
    }

    fn running(n_objectives: usize) -> Self {
        #[allow(clippy::cast_precision_loss)]
        let sentinel = MAXINT as f64;
        Self::new(TrialStatus::Running, Cost::uniform(sentinel, n_objectives))
    }
}

/// Append-only ledger of trials and their outcomes.
#[derive(Clone, Debug, Default)]
pub struct RunHistory {
    configs: Vec<Configuration>,
    config_ids: HashMap<Configuration, u64>,
    data: Vec<(TrialKey, TrialValue)>,
    index: HashMap<TrialKey, usize>,
}

impl RunHistory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the identifier of `config`, registering it if it is new.
    /// Identifiers start at `1` and never change.
    pub fn add_config(&mut self, config: &Configuration) -> u64 {
        if let Some(&id) = self.config_ids.get(config) {
            return id;
        }
        let id = self.configs.len() as u64 + 1;
        self.configs.push(config.clone().with_config_id(id));
        self.config_ids.insert(config.clone(), id);
        id
    }

    /// Record `value` under `key`.
    ///
    /// A new key is always inserted. An existing record is replaced if it is
    /// a running placeholder or if `force_update` is set; otherwise the call
    /// is ignored. Returns `true` if the record was written.
    pub fn add(&mut self, key: TrialKey, value: TrialValue, force_update: bool) -> bool {
        self.add_config(&key.config);
        match self.index.get(&key) {
            Some(&pos) => {
                let existing = &mut self.data[pos].1;
                if existing.status == TrialStatus::Running || force_update {
                    *existing = value;
                    true
                } else {
                    false
                }
            }
            None => {
                self.index.insert(key.clone(), self.data.len());
                self.data.push((key, value));
                true
            }
        }
    }

    /// Record a running placeholder for `info` and return its configuration
    /// identifier.
    pub fn add_running(&mut self, info: &TrialInfo, n_objectives: usize) -> u64 {
        self.add(info.key(), TrialValue::running(n_objectives), false);
        self.add_config(&info.config)
    }

    /// The identifier assigned to `config`, if it was ever recorded.
    #[must_use]
    pub fn config_id(&self, config: &Configuration) -> Option<u64> {
        self.config_ids.get(config).copied()
    }

    /// The configuration with identifier `id`, with its identifier attached.
    #[must_use]
    pub fn get_config(&self, id: u64) -> Option<&Configuration> {
        let idx = usize::try_from(id).ok()?.checked_sub(1)?;
        self.configs.get(idx)
    }

    /// All recorded configurations in identifier order.
    #[must_use]
    pub fn configs(&self) -> &[Configuration] {
        &self.configs
    }

    /// Returns `true` if any trial of `config` was recorded.
    #[must_use]
    pub fn contains_config(&self, config: &Configuration) -> bool {
        self.config_ids.contains_key(config)
    }

    #[must_use]
    pub fn get(&self, key: &TrialKey) -> Option<&TrialValue> {
        self.index.get(key).map(|&pos| &self.data[pos].1)
    }

    /// Per-objective mean cost of every finished trial of `config`.
    /// Running placeholders are ignored.
    #[must_use]
    pub fn average_cost(&self, config: &Configuration) -> Option<Cost> {
        let mut sums: Vec<f64> = Vec::new();
        let mut n = 0_u32;
        for (_, value) in self
            .data
            .iter()
            .filter(|(key, value)| key.config == *config && value.status.is_terminal())
        {
            if sums.is_empty() {
                sums = vec![0.0; value.cost.n_objectives()];
            }
            for (sum, v) in sums.iter_mut().zip(value.cost.values()) {
                *sum += v;
            }
            n += 1;
        }
        if n == 0 {
            return None;
        }
        Some(Cost(sums.into_iter().map(|s| s / f64::from(n)).collect()))
    }

    /// Aggregated scalar cost of `config`, used to compare challengers.
    #[must_use]
    pub fn get_cost(&self, config: &Configuration) -> Option<f64> {
        self.average_cost(config).map(|c| c.scalar())
    }

    /// Iterates over records in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&TrialKey, &TrialValue)> {
        self.data.iter().map(|(k, v)| (k, v))
    }

    /// Number of records, running placeholders included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of records with a terminal status.
    #[must_use]
    pub fn n_finished(&self) -> usize {
        self.data.iter().filter(|(_, v)| v.status.is_terminal()).count()
    }

    /// Drop every running placeholder and return how many were dropped.
    /// Configuration identifiers are kept.
    pub fn discard_running(&mut self) -> usize {
        let before = self.data.len();
        self.data.retain(|(_, v)| v.status.is_terminal());
        self.index = self
            .data
            .iter()
            .enumerate()
            .map(|(pos, (key, _))| (key.clone(), pos))
            .collect();
        before - self.data.len()
    }

    /// Forget everything.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Write a JSON snapshot to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        let snapshot = Snapshot {
            configs: self.configs.clone(),
            data: self
                .data
                .iter()
                .map(|(key, value)| Record {
                    config_id: self.config_ids.get(&key.config).copied().unwrap_or_default(),
                    instance: key.instance.clone(),
                    seed: key.seed,
                    budget: key.budget,
                    value: value.clone(),
                })
                .collect(),
        };
        persistence::write_json_atomic(path, &snapshot)
    }

    /// Read a snapshot written by [`save`](Self::save).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the file is missing or malformed or a
    /// record points at an unknown configuration, and
    /// [`Error::ConfigSpaceMismatch`] if a stored configuration is not a
    /// member of `config_space`.
    pub fn load(path: &Path, config_space: &ConfigSpace) -> Result<Self> {
        let snapshot: Snapshot = persistence::read_json(path)?;
        let mut history = Self::new();
        for config in &snapshot.configs {
            if !config_space.contains(config) {
                return Err(Error::ConfigSpaceMismatch);
            }
            history.add_config(config);
        }
        for record in snapshot.data {
            let config = history
                .get_config(record.config_id)
                .cloned()
                .ok_or_else(|| Error::Storage(format!("unknown config id {}", record.config_id)))?;
            let key = TrialKey {
                config,
                instance: record.instance,
                seed: record.seed,
                budget: record.budget,
            };
            history.add(key, record.value, true);
        }
        Ok(history)
    }
}

#[derive(Serialize, Deserialize)]
struct Snapshot {
    configs: Vec<Configuration>,
    data: Vec<Record>,
}

#[derive(Serialize, Deserialize)]
struct Record {
    config_id: u64,
    instance: Option<String>,
    seed: Option<u64>,
    budget: Option<f64>,
    value: TrialValue,
}
