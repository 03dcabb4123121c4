//! Configurations evaluated before any candidate source is consulted.
//!
//! | Design | Configurations |
//! |--------|----------------|
//! | [`DefaultInitialDesign`] | The space's default configuration |
//! | [`FixedInitialDesign`] | A user-supplied list |
//! | [`RandomInitialDesign`] | `n` uniform draws |
//! | `SobolInitialDesign` | `n` points of a scrambled Sobol sequence (feature `sobol`) |

use crate::config::{ConfigSpace, Configuration};
#[cfg(feature = "sobol")]
use crate::scenario::Scenario;

/// Produces the configurations that seed the run.
pub trait InitialDesign: Send {
    /// The initial configurations, in evaluation order. Duplicates are
    /// dropped by the loop.
    fn select_configurations(&mut self, config_space: &ConfigSpace) -> Vec<Configuration>;
}

/// A fixed, user-supplied list.
#[derive(Clone, Debug, Default)]
pub struct FixedInitialDesign {
    configs: Vec<Configuration>,
}

impl FixedInitialDesign {
    #[must_use]
    pub fn new(configs: impl IntoIterator<Item = Configuration>) -> Self {
        Self {
            configs: configs.into_iter().collect(),
        }
    }
}

impl InitialDesign for FixedInitialDesign {
    fn select_configurations(&mut self, _config_space: &ConfigSpace) -> Vec<Configuration> {
        self.configs
            .iter()
            .map(|c| c.clone().with_origin("initial design"))
            .collect()
    }
}

/// `n` configurations drawn uniformly at random.
#[derive(Clone, Debug)]
pub struct RandomInitialDesign {
    n: usize,
    rng: fastrand::Rng,
}

impl RandomInitialDesign {
    #[must_use]
    pub fn new(n: usize, seed: u64) -> Self {
        Self {
            n,
            rng: fastrand::Rng::with_seed(seed),
        }
    }
}

impl InitialDesign for RandomInitialDesign {
    fn select_configurations(&mut self, config_space: &ConfigSpace) -> Vec<Configuration> {
        (0..self.n)
            .map(|_| config_space.sample(&mut self.rng).with_origin("initial design: random"))
            .collect()
    }
}

/// Only the space's default configuration.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultInitialDesign;

impl InitialDesign for DefaultInitialDesign {
    fn select_configurations(&mut self, config_space: &ConfigSpace) -> Vec<Configuration> {
        vec![config_space.default_configuration().with_origin("initial design: default")]
    }
}

/// `n` points of a scrambled Sobol sequence (Burley 2020), spread more
/// evenly over the space than uniform draws.
///
/// Each parameter, in name order, takes one Sobol dimension. Spaces with
/// more than 256 parameters fill the remaining dimensions uniformly at
/// random.
///
/// Requires the **`sobol`** feature flag.
#[cfg(feature = "sobol")]
#[derive(Clone, Debug)]
pub struct SobolInitialDesign {
    n: usize,
    seed: u32,
    rng: fastrand::Rng,
}

#[cfg(feature = "sobol")]
impl SobolInitialDesign {
    /// Dimensions covered by `sobol_burley`.
    const MAX_DIMENSIONS: usize = 256;

    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn new(n: usize, seed: u64) -> Self {
        Self {
            n,
            seed: seed as u32,
            rng: fastrand::Rng::with_seed(seed),
        }
    }

    /// Sized from the scenario: `n_configs_per_hyperparameter` points per
    /// parameter, at most `max_config_ratio` of the trial budget and at
    /// least one. Seeded with the scenario seed.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_precision_loss,
        clippy::cast_sign_loss
    )]
    pub fn from_scenario(scenario: &Scenario, n_configs_per_hyperparameter: usize, max_config_ratio: f64) -> Self {
        let per_space = n_configs_per_hyperparameter.saturating_mul(scenario.config_space.len());
        let per_budget = (max_config_ratio * scenario.n_trials as f64).floor().max(0.0) as usize;
        Self::new(per_space.min(per_budget).max(1), scenario.seed)
    }

    /// Number of configurations this design selects.
    #[must_use]
    pub fn n_configs(&self) -> usize {
        self.n
    }
}

#[cfg(feature = "sobol")]
impl InitialDesign for SobolInitialDesign {
    #[allow(clippy::cast_possible_truncation)]
    fn select_configurations(&mut self, config_space: &ConfigSpace) -> Vec<Configuration> {
        let dims = config_space.len();
        if dims > Self::MAX_DIMENSIONS {
            trace_warn!(dims, "more parameters than Sobol dimensions; the rest are drawn at random");
        }
        let mut point = Vec::with_capacity(dims);
        (0..self.n)
            .map(|index| {
                point.clear();
                point.extend((0..dims).map(|dim| {
                    if dim < Self::MAX_DIMENSIONS {
                        f64::from(sobol_burley::sample(index as u32, dim as u32, self.seed))
                    } else {
                        self.rng.f64()
                    }
                }));
                config_space.configuration_at(&point).with_origin("initial design: sobol")
            })
            .collect()
    }
}
