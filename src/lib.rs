//! Gossamer - visual regression testing for web pages.
//!
//! This crate provides:
//! - A recorded step model (click, keypress, text, screenshot, scroll)
//! - Replay of recorded tests through a browser automation capability
//! - Screenshot comparison with an RMS tolerance and diff images
//! - `record.json` persistence and per-test directory management
//! - MockBrowser, an in-memory framebuffer browser for testing
//!
//! # Example
//!
//! ```rust,no_run
//! use std::collections::BTreeMap;
//! use std::path::Path;
//! use gossamer::{Dispatcher, MockBrowser, Mode, read_recorded_run};
//!
//! let test = read_recorded_run(Path::new("gossamer/login/record.json")).unwrap();
//! let mut browser = MockBrowser::new(1024, 768);
//! let verdicts = Dispatcher::new(&mut browser)
//!     .output(std::io::stdout())
//!     .dispatch(Mode::Playback, BTreeMap::from([("login".to_string(), test)]));
//! assert!(verdicts.values().all(|v| v.is_pass()));
//! ```

pub mod browser;
pub mod config;
pub mod dispatch;
pub mod images;
pub mod logging;
pub mod run;
pub mod runner;
pub mod session;
pub mod step;

// Re-export browser capability
pub use browser::{Browser, BrowserError, BrowserResult, Element, Locator, MockBrowser};

// Re-export dispatch and verdict types
pub use dispatch::Dispatcher;
pub use runner::{Failure, Fault, FaultCause, RunReport, State, StepPosition, TestReport, Verdict};

// Re-export image diff engine
pub use images::{DiffError, DiffResult, DiffSummary, ImageDiff, PixelMode};

// Re-export recorded test types
pub use run::{Mode, Recorder, RunError, RunResult, Settings, Test, read_recorded_run, write_recorded_run};

// Re-export session management
pub use session::{SessionError, SessionResult, TestDir};

// Re-export step model
pub use step::{Action, Step, StepContext, StepError, StepOutcome, StepResult, resolve_key_events};
