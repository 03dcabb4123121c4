//! JSON snapshot helpers shared by the scenario, run history and stats.

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{Error, Result};

/// File name of the persisted scenario inside an output directory.
pub const SCENARIO_FILE: &str = "scenario.json";
/// File name of the persisted run history inside an output directory.
pub const RUNHISTORY_FILE: &str = "runhistory.json";
/// File name of the persisted stats inside an output directory.
pub const STATS_FILE: &str = "stats.json";

/// Serialize `value` as pretty JSON to `path`.
///
/// Writes to a temp file in the same directory and renames it over `path`,
/// so a crash mid-write never leaves a truncated file behind. Missing parent
/// directories are created.
pub(crate) fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent).map_err(|e| Error::Storage(e.to_string()))?;

    let tmp_path = parent.join(format!(
        ".{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy()
    ));
    let file = std::fs::File::create(&tmp_path).map_err(|e| Error::Storage(e.to_string()))?;
    let mut writer = std::io::BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value).map_err(|e| Error::Storage(e.to_string()))?;
    writer.flush().map_err(|e| Error::Storage(e.to_string()))?;
    std::fs::rename(&tmp_path, path).map_err(|e| Error::Storage(e.to_string()))
}

/// Read a JSON document written by [`write_json_atomic`].
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = std::fs::File::open(path)
        .map_err(|e| Error::Storage(format!("{}: {e}", path.display())))?;
    serde_json::from_reader(std::io::BufReader::new(file))
        .map_err(|e| Error::Storage(format!("{}: {e}", path.display())))
}
