//! Schedules that interleave random configurations with model proposals.
//!
//! | Design | Random when | Changes over time |
//! |--------|-------------|-------------------|
//! | [`ModulusRandomDesign`] | `iteration % modulus < 1` | never |
//! | [`LinearCoolDownRandomDesign`] | `(iteration - last) % modulus < 1` | modulus grows by `increment` per iteration, up to `end` |
//!
//! # Examples
//!
//! ```
//! use smbo::random_design::{LinearCoolDownRandomDesign, RandomDesign};
//!
//! let mut design = LinearCoolDownRandomDesign::new(2.0, 1.0, 4.0);
//! assert!(design.check(0));
//! design.next_iteration();
//! design.next_iteration();
//! design.next_iteration();
//! assert_eq!(design.modulus(), 4.0);
//! ```

/// Decides per iteration whether the next challenger should be random.
pub trait RandomDesign: Send {
    /// Returns `true` if `iteration` should draw a random configuration.
    fn check(&mut self, iteration: u64) -> bool;

    /// Advance the schedule. Called once per finished intensification
    /// iteration.
    fn next_iteration(&mut self);
}

#[allow(clippy::cast_precision_loss)]
fn fires(distance: u64, modulus: f64) -> bool {
    (distance as f64) % modulus < 1.0
}

/// Every `modulus`-th configuration is random.
#[derive(Clone, Debug)]
pub struct ModulusRandomDesign {
    modulus: f64,
}

impl ModulusRandomDesign {
    /// A modulus of `1` or less makes every configuration random, which is
    /// logged as a warning.
    #[must_use]
    pub fn new(modulus: f64) -> Self {
        if modulus <= 1.0 {
            trace_warn!(modulus, "random design modulus <= 1: every configuration will be random");
        }
        Self { modulus }
    }

    #[must_use]
    pub fn modulus(&self) -> f64 {
        self.modulus
    }
}

impl Default for ModulusRandomDesign {
    fn default() -> Self {
        Self::new(2.0)
    }
}

impl RandomDesign for ModulusRandomDesign {
    fn check(&mut self, iteration: u64) -> bool {
        fires(iteration, self.modulus)
    }

    fn next_iteration(&mut self) {}
}

/// Random configurations that become rarer over time.
///
/// The distance is measured from the last iteration that fired, so the gap
/// between two random configurations tracks the current modulus.
#[derive(Clone, Debug)]
pub struct LinearCoolDownRandomDesign {
    modulus: f64,
    increment: f64,
    end: f64,
    last_iteration: u64,
}

impl LinearCoolDownRandomDesign {
    /// Starts at `start` and adds `increment` on every
    /// [`next_iteration`](RandomDesign::next_iteration) until `end` is
    /// reached. A start of `1` or less or a non-positive increment is
    /// logged as a warning.
    #[must_use]
    pub fn new(start: f64, increment: f64, end: f64) -> Self {
        if start <= 1.0 {
            trace_warn!(start, "random design start modulus <= 1: every configuration starts random");
        }
        if increment <= 0.0 {
            trace_warn!(increment, "random design increment <= 0: the random rate never cools down");
        }
        Self {
            modulus: start,
            increment,
            end,
            last_iteration: 0,
        }
    }

    #[must_use]
    pub fn modulus(&self) -> f64 {
        self.modulus
    }
}

impl Default for LinearCoolDownRandomDesign {
    fn default() -> Self {
        Self::new(2.0, 0.3, f64::INFINITY)
    }
}

impl RandomDesign for LinearCoolDownRandomDesign {
    fn check(&mut self, iteration: u64) -> bool {
        if fires(iteration.saturating_sub(self.last_iteration), self.modulus) {
            self.last_iteration = iteration;
            true
        } else {
            false
        }
    }

    fn next_iteration(&mut self) {
        self.modulus = (self.modulus + self.increment).min(self.end);
        self.last_iteration = 0;
    }
}
