#![allow(
    clippy::cast_sign_loss,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation
)]

mod ask_tell;
mod callbacks;
mod resume;
mod run_loop;

use std::path::{Path, PathBuf};

use smbo::config::{ConfigSpace, Configuration, ParamValue};
use smbo::random_design::RandomDesign;
use smbo::runner::TrialContext;

/// A fresh directory under the system temp dir, removed on drop.
struct TempDir(PathBuf);

impl TempDir {
    fn new(name: &str) -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let path = std::env::temp_dir().join(format!(
            "smbo_{name}_{}_{}",
            std::process::id(),
            COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        let _ = std::fs::remove_dir_all(&path);
        Self(path)
    }

    fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

fn space() -> ConfigSpace {
    ConfigSpace::new().int("x", 0, 1000)
}

fn config(x: i64) -> Configuration {
    Configuration::new([("x", ParamValue::Int(x))])
}

fn x_of(config: &Configuration) -> i64 {
    match config.get("x") {
        Some(ParamValue::Int(x)) => *x,
        other => panic!("unexpected value for x: {other:?}"),
    }
}

/// Target function whose cost is the value of `x`.
fn cost_is_x(config: &Configuration, _: &TrialContext) -> Result<f64, String> {
    Ok(x_of(config) as f64)
}

/// Never interleaves random configurations.
struct NoRandom;

impl RandomDesign for NoRandom {
    fn check(&mut self, _iteration: u64) -> bool {
        false
    }

    fn next_iteration(&mut self) {}
}
