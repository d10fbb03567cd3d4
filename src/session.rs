//! On-disk layout of a recorded test.
//!
//! Every test owns one directory:
//! - `record.json` with the persisted steps and settings
//! - `screenshot<N>.png` baselines
//! - `last/screenshot<N>.png` working copies from the latest playback
//! - `diff.png` for the latest mismatch, when diff saving is on
//!
//! No lock is taken; callers must not run the same test twice at once.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config;
use crate::run::Mode;

/// Persisted steps file inside a test directory
pub const RECORD_FILE: &str = "record.json";

/// Subdirectory for working screenshots
pub const WORKING_DIR: &str = "last";

/// Diff image written on mismatch
pub const DIFF_FILE: &str = "diff.png";

/// Result type for test directory operations
pub type SessionResult<T> = Result<T, SessionError>;

/// Error types for test directory operations
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Replay of a test that was never recorded
    #[error("{} does not exist", .path.display())]
    DoesNotExist { path: PathBuf },

    /// Recording over an existing test without permission to overwrite
    #[error("refusing to overwrite existing test data in {}", .path.display())]
    DoNotOverwrite { path: PathBuf },

    /// I/O error
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> SessionError + '_ {
    move |source| SessionError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Storage directory of a single test
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestDir {
    path: PathBuf,
}

impl TestDir {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Directory for `name` under the data directory
    pub fn default_for(data_dir: &Path, name: &str) -> Self {
        Self::new(data_dir.join(sanitize_name(name)))
    }

    /// Directory for `name` under the configured data directory
    pub fn from_config(name: &str) -> Self {
        Self::default_for(Path::new(&config::data_dir()), name)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Baseline screenshot for a screenshot index
    pub fn baseline(&self, index: u32) -> PathBuf {
        self.path.join(format!("screenshot{}.png", index))
    }

    pub fn working_dir(&self) -> PathBuf {
        self.path.join(WORKING_DIR)
    }

    /// Working screenshot captured during playback
    pub fn working(&self, index: u32) -> PathBuf {
        self.working_dir().join(format!("screenshot{}.png", index))
    }

    pub fn diff(&self) -> PathBuf {
        self.path.join(DIFF_FILE)
    }

    pub fn record_file(&self) -> PathBuf {
        self.path.join(RECORD_FILE)
    }

    /// Create the working screenshot directory if needed
    pub fn ensure_working_dir(&self) -> SessionResult<()> {
        let dir = self.working_dir();
        fs::create_dir_all(&dir).map_err(io_error(&dir))
    }

    /// Get the directory ready for a run in `mode`.
    ///
    /// Recording creates the directory, or clears stale screenshots and
    /// steps from an existing one when `overwrite` is set. Replaying
    /// requires the directory to exist.
    pub fn prepare(&self, mode: Mode, overwrite: bool) -> SessionResult<()> {
        let exists = self.path.is_dir();
        match mode {
            Mode::Record if exists => {
                let has_data = fs::read_dir(&self.path)
                    .map_err(io_error(&self.path))?
                    .next()
                    .is_some();
                if has_data {
                    if !overwrite {
                        return Err(SessionError::DoNotOverwrite {
                            path: self.path.clone(),
                        });
                    }
                    remove_with_extensions(&self.path, &["png", "json"])?;
                    let working = self.working_dir();
                    if working.is_dir() {
                        remove_with_extensions(&working, &["png"])?;
                    }
                }
                self.ensure_working_dir()
            }
            Mode::Record => self.ensure_working_dir(),
            Mode::Rerecord | Mode::Playback if !exists => Err(SessionError::DoesNotExist {
                path: self.path.clone(),
            }),
            Mode::Rerecord | Mode::Playback => self.ensure_working_dir(),
        }
    }

    /// List baseline screenshots in name order
    pub fn list_screenshots(&self) -> SessionResult<Vec<PathBuf>> {
        let mut captures = Vec::new();
        if self.path.exists() {
            for entry in fs::read_dir(&self.path).map_err(io_error(&self.path))? {
                let path = entry.map_err(io_error(&self.path))?.path();
                let is_baseline = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.starts_with("screenshot") && n.ends_with(".png"))
                    .unwrap_or(false);
                if path.is_file() && is_baseline {
                    captures.push(path);
                }
            }
        }
        captures.sort();
        Ok(captures)
    }
}

fn remove_with_extensions(dir: &Path, extensions: &[&str]) -> SessionResult<()> {
    for entry in fs::read_dir(dir).map_err(io_error(dir))? {
        let path = entry.map_err(io_error(dir))?.path();
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| extensions.contains(&e))
            .unwrap_or(false);
        if path.is_file() && matches {
            fs::remove_file(&path).map_err(io_error(&path))?;
        }
    }
    Ok(())
}

/// Sanitize a test name for use as a directory name
fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' => c,
            _ => '_',
        })
        .collect()
}
