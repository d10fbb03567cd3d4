//! Types for dispatch verdicts and run reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::run::{Mode, RunError};
use crate::session::SessionError;
use crate::step::{ScreenshotMismatch, StepError};
use crate::browser::BrowserError;

/// Outcome class of a single test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum State {
    Pass,
    Fail,
    Error,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            State::Pass => "PASS",
            State::Fail => "FAIL",
            State::Error => "ERROR",
        };
        f.write_str(name)
    }
}

/// Position of a step in its test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepPosition {
    pub index: usize,
    pub offset_time: u64,
}

/// A screenshot differed from its baseline
#[derive(Debug)]
pub struct Failure {
    pub test: String,
    pub step: StepPosition,
    pub mismatch: ScreenshotMismatch,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: step {} at {}ms: {}",
            self.test, self.step.index, self.step.offset_time, self.mismatch
        )
    }
}

/// What went wrong when a test errored
#[derive(Debug, thiserror::Error)]
pub enum FaultCause {
    #[error(transparent)]
    Step(#[from] StepError),

    #[error(transparent)]
    Run(#[from] RunError),

    #[error(transparent)]
    Browser(#[from] BrowserError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Any fault other than a screenshot mismatch
#[derive(Debug)]
pub struct Fault {
    pub test: String,
    /// The step being executed, when the fault came from one
    pub step: Option<StepPosition>,
    pub cause: FaultCause,
}

impl Fault {
    pub fn new(test: impl Into<String>, cause: impl Into<FaultCause>) -> Self {
        Self {
            test: test.into(),
            step: None,
            cause: cause.into(),
        }
    }

    pub fn at_step(mut self, step: StepPosition) -> Self {
        self.step = Some(step);
        self
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.step {
            Some(step) => write!(
                f,
                "{}: step {} at {}ms: {}",
                self.test, step.index, step.offset_time, self.cause
            ),
            None => write!(f, "{}: {}", self.test, self.cause),
        }
    }
}

/// Final result of one test in a dispatch
#[derive(Debug)]
pub enum Verdict {
    Pass,
    Fail(Failure),
    Error(Fault),
}

impl Verdict {
    pub fn state(&self) -> State {
        match self {
            Verdict::Pass => State::Pass,
            Verdict::Fail(_) => State::Fail,
            Verdict::Error(_) => State::Error,
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Pass)
    }

    /// Human-readable description; `None` for a pass
    pub fn message(&self) -> Option<String> {
        match self {
            Verdict::Pass => None,
            Verdict::Fail(failure) => Some(failure.to_string()),
            Verdict::Error(fault) => Some(fault.to_string()),
        }
    }
}

/// Serializable summary of one test's verdict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestReport {
    pub name: String,
    pub state: State,
    /// Failure or error description (None on pass)
    pub message: Option<String>,
    /// Screenshot mismatch details on failure
    pub mismatch: Option<ScreenshotMismatch>,
}

/// Serializable summary of a whole dispatch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub mode: Mode,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub tests: Vec<TestReport>,
}

impl RunReport {
    pub fn from_verdicts(
        mode: Mode,
        started_at: DateTime<Utc>,
        verdicts: &BTreeMap<String, Verdict>,
    ) -> Self {
        let tests = verdicts
            .iter()
            .map(|(name, verdict)| TestReport {
                name: name.clone(),
                state: verdict.state(),
                message: verdict.message(),
                mismatch: match verdict {
                    Verdict::Fail(failure) => Some(failure.mismatch.clone()),
                    _ => None,
                },
            })
            .collect();
        Self {
            mode,
            started_at,
            finished_at: Utc::now(),
            tests,
        }
    }

    /// Whether every reported test passed
    pub fn success(&self) -> bool {
        self.tests.iter().all(|t| t.state == State::Pass)
    }

    pub fn count(&self, state: State) -> usize {
        self.tests.iter().filter(|t| t.state == state).count()
    }
}
