//! Reading and writing `record.json`.
//!
//! The file holds a JSON object keyed by test name with exactly one entry:
//!
//! ```json
//! {"login": {"version": 1, "settings": {...}, "steps": [{"Click": {...}}]}}
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::types::{RunError, RunResult, Test};
use crate::config::DATA_VERSION;
use crate::session::RECORD_FILE;

/// Load a recorded test from a `record.json` file.
///
/// Steps come back sorted by offset.
pub fn read_recorded_run(path: &Path) -> RunResult<Test> {
    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(RunError::DoesNotExist {
                path: path.to_path_buf(),
            });
        }
        Err(source) => {
            return Err(RunError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    if metadata.len() == 0 {
        return Err(RunError::Empty {
            path: path.to_path_buf(),
        });
    }

    let contents = fs::read_to_string(path).map_err(|source| RunError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let document: serde_json::Value =
        serde_json::from_str(&contents).map_err(|source| RunError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    let malformed = |reason: String| RunError::Malformed {
        path: path.to_path_buf(),
        reason,
    };

    let entries = document
        .as_object()
        .ok_or_else(|| malformed("top level must be an object keyed by test name".to_string()))?;
    if entries.len() != 1 {
        return Err(malformed(format!("expected one test, found {}", entries.len())));
    }
    let Some((name, entry)) = entries.iter().next() else {
        return Err(malformed("no test entry".to_string()));
    };

    let version = entry
        .get("version")
        .and_then(|v| v.as_u64())
        .ok_or_else(|| malformed(format!("test {} has no numeric version", name)))?;
    if version != u64::from(DATA_VERSION) {
        return Err(RunError::VersionMismatch {
            path: path.to_path_buf(),
            found: version,
            expected: DATA_VERSION,
        });
    }

    let mut test: Test =
        serde_json::from_value(entry.clone()).map_err(|e| malformed(e.to_string()))?;
    test.sort_steps();
    debug!("Loaded {} steps for {} from {}", test.steps.len(), name, path.display());
    Ok(test)
}

/// Persist `test` as `record.json` inside `dir`, returning the file path
pub fn write_recorded_run(dir: &Path, test: &Test) -> RunResult<PathBuf> {
    let path = dir.join(RECORD_FILE);
    let mut document = BTreeMap::new();
    document.insert(test.name(), test);
    let json = serde_json::to_string_pretty(&document)?;
    fs::write(&path, json).map_err(|source| RunError::Io {
        path: path.clone(),
        source,
    })?;
    debug!("Wrote {} steps to {}", test.steps.len(), path.display());
    Ok(path)
}
