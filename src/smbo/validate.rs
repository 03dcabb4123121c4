use super::Smbo;
use crate::config::Configuration;
use crate::error::{Error, Result};
use crate::rng_util;
use crate::runner::TrialContext;
use crate::types::Cost;

impl Smbo {
    /// Re-evaluate `config` outside the run history and return its mean cost
    /// per objective.
    ///
    /// One trial is run for every combination of seed, instance and budget:
    /// as many fresh seeds as the intensifier used (at least one), the given
    /// `instances` or the scenario's if the intensifier uses instances, and
    /// the largest budget if it uses budgets. Nothing is recorded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Runner`] if a trial reports a cost with the wrong
    /// number of objectives.
    pub fn validate(&self, config: &Configuration, instances: Option<&[String]>, seed: Option<u64>) -> Result<Cost> {
        let mut rng = fastrand::Rng::with_seed(seed.unwrap_or(self.scenario.seed));
        let n_seeds = self.intensifier.target_function_seeds().len().max(1);
        let seeds: Vec<u64> = if self.scenario.deterministic {
            vec![0; n_seeds]
        } else {
            (0..n_seeds).map(|_| rng_util::seed(&mut rng)).collect()
        };

        let budgets: Vec<Option<f64>> = if self.intensifier.uses_budgets() {
            vec![self.intensifier.target_function_budgets().last().copied()]
        } else {
            vec![None]
        };

        let instances: Vec<Option<String>> = match (self.intensifier.uses_instances(), instances) {
            (true, Some(given)) => given.iter().cloned().map(Some).collect(),
            (true, None) => self
                .scenario
                .instances
                .iter()
                .flatten()
                .cloned()
                .map(Some)
                .collect(),
            (false, _) => vec![None],
        };

        let n_objectives = self.scenario.n_objectives;
        let mut sums = vec![0.0; n_objectives];
        let mut n = 0_u32;
        for &seed in &seeds {
            for instance in &instances {
                for &budget in &budgets {
                    let context = TrialContext {
                        instance: instance.clone(),
                        seed,
                        budget,
                    };
                    let value = self.runner.run(config, &context);
                    if value.cost.n_objectives() != n_objectives {
                        return Err(Error::Runner(format!(
                            "expected {n_objectives} objectives, trial reported {}",
                            value.cost.n_objectives()
                        )));
                    }
                    for (sum, v) in sums.iter_mut().zip(value.cost.values()) {
                        *sum += v;
                    }
                    n += 1;
                }
            }
        }

        if n == 0 {
            return Err(Error::Runner("no trial to validate".to_owned()));
        }
        trace_debug!(trials = n, "validated configuration");
        Ok(Cost(sums.into_iter().map(|s| s / f64::from(n)).collect()))
    }
}
