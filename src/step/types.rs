// Core types for recorded steps

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::browser::{BrowserError, Locator};
use crate::images::{DiffError, DiffSummary};

/// A position on the page, or a scroll delta
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

impl Point {
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// How a text step finds its element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentifierType {
    /// `element.id`
    Id,
    /// `element.className`
    ClassName,
    /// `element.classList`, rendered as a compound CSS selector
    ClassList,
}

impl IdentifierType {
    /// Locator strategy for an identifier of this type
    pub fn locator(self, identifier: &str) -> Locator {
        match self {
            IdentifierType::Id => Locator::Id(identifier.to_string()),
            IdentifierType::ClassName => Locator::ClassName(identifier.to_string()),
            IdentifierType::ClassList => Locator::Css(identifier.to_string()),
        }
    }
}

/// Click on whatever element sits at `pos`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Click {
    pub offset_time: u64,
    pub pos: Point,
}

/// Raw fields of a recorded keypress, as captured and as persisted.
///
/// Of the three identifier slots at least one must be populated; empty
/// strings and empty lists count as missing.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct KeyEventFields {
    pub offset_time: u64,
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shift: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ecn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ecl: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eid_val: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ecn_val: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ecl_val: Option<String>,
}

/// A single recorded keypress. Never replayed; see [`super::resolve_key_events`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "KeyEventFields", into = "KeyEventFields")]
pub struct KeyEvent {
    fields: KeyEventFields,
}

impl KeyEvent {
    /// Validate and normalize a recorded keypress
    pub fn new(mut fields: KeyEventFields) -> StepResult<Self> {
        fields.eid = fields.eid.filter(|s| !s.is_empty());
        fields.ecn = fields.ecn.filter(|s| !s.is_empty());
        fields.ecl = fields
            .ecl
            .map(|classes| classes.into_iter().filter(|c| !c.is_empty()).collect::<Vec<_>>())
            .filter(|classes| !classes.is_empty());

        if fields.eid.is_none() && fields.ecn.is_none() && fields.ecl.is_none() {
            return Err(StepError::InvalidStep {
                offset_time: fields.offset_time,
            });
        }
        Ok(Self { fields })
    }

    pub fn offset_time(&self) -> u64 {
        self.fields.offset_time
    }

    pub fn key(&self) -> &str {
        &self.fields.key
    }

    pub fn shift(&self) -> Option<bool> {
        self.fields.shift
    }

    pub fn fields(&self) -> &KeyEventFields {
        &self.fields
    }

    /// Element identifier and its type, preferring id, then class list, then class name
    pub fn identifier(&self) -> (String, IdentifierType) {
        let f = &self.fields;
        if let Some(eid) = &f.eid {
            (eid.clone(), IdentifierType::Id)
        } else if let Some(classes) = &f.ecl {
            (format!(".{}", classes.join(".")), IdentifierType::ClassList)
        } else {
            // new() guarantees one slot is set
            (f.ecn.clone().unwrap_or_default(), IdentifierType::ClassName)
        }
    }

    /// Element value recorded alongside the keypress
    pub fn value(&self) -> Option<&str> {
        let f = &self.fields;
        let value = if f.eid.is_some() {
            &f.eid_val
        } else if f.ecl.is_some() {
            &f.ecl_val
        } else {
            &f.ecn_val
        };
        value.as_deref()
    }
}

impl TryFrom<KeyEventFields> for KeyEvent {
    type Error = StepError;

    fn try_from(fields: KeyEventFields) -> StepResult<Self> {
        KeyEvent::new(fields)
    }
}

impl From<KeyEvent> for KeyEventFields {
    fn from(event: KeyEvent) -> Self {
        event.fields
    }
}

/// Text typed into an element, resolved from key events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Text {
    pub offset_time: u64,
    pub identifier: String,
    pub identifier_type: IdentifierType,
    pub value: String,
}

/// Screenshot checkpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Screenshot {
    pub offset_time: u64,
    /// Monotonic per test; names the baseline and working files
    pub index: u32,
}

/// Relative scroll of the viewport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scroll {
    pub offset_time: u64,
    pub pos: Point,
}

/// A recorded step, persisted externally tagged (`{"Click": {...}}`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Step {
    Click(Click),
    Key(KeyEvent),
    Text(Text),
    Screenshot(Screenshot),
    Scroll(Scroll),
}

impl Step {
    /// Short variant name for logs and reports
    pub fn kind(&self) -> &'static str {
        match self {
            Step::Click(_) => "click",
            Step::Key(_) => "key",
            Step::Text(_) => "text",
            Step::Screenshot(_) => "screenshot",
            Step::Scroll(_) => "scroll",
        }
    }
}

/// What a successfully executed step produced
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    Done,
    /// A screenshot differed from its baseline beyond tolerance
    Mismatch(ScreenshotMismatch),
}

/// A screenshot that did not match its baseline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenshotMismatch {
    pub index: u32,
    pub baseline: PathBuf,
    pub candidate: PathBuf,
    /// Diff image and its summary, when diff saving is enabled
    pub diff: Option<(PathBuf, DiffSummary)>,
}

impl fmt::Display for ScreenshotMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.diff {
            Some((path, summary)) => write!(
                f,
                "Screenshot {} was different; compare {} with {}. See {} for the comparison. rms={:.2} ({}x{})",
                self.index,
                self.baseline.display(),
                self.candidate.display(),
                path.display(),
                summary.rms,
                summary.width,
                summary.height
            ),
            None => write!(
                f,
                "Screenshot {} was different; compare {} with {}.",
                self.index,
                self.baseline.display(),
                self.candidate.display()
            ),
        }
    }
}

/// Result type for step operations
pub type StepResult<T> = Result<T, StepError>;

/// Error types for step construction and execution
#[derive(Debug, thiserror::Error)]
pub enum StepError {
    /// Key event without any element identifier
    #[error("key event at {offset_time}ms has no element id, class name or class list")]
    InvalidStep { offset_time: u64 },

    /// Step kind that only exists as a recording artifact
    #[error("{kind} step at {offset_time}ms cannot be replayed")]
    NotReplayable { kind: &'static str, offset_time: u64 },

    /// Target element of a text step is not on the page
    #[error("element not found: {0}")]
    ElementNotFound(Locator),

    /// Playback reached a screenshot that was never recorded
    #[error("baseline screenshot {} does not exist; rerecord the test", .path.display())]
    MissingBaseline { path: PathBuf },

    /// The browser reported a fault
    #[error(transparent)]
    Browser(BrowserError),

    /// Screenshots could not be compared
    #[error(transparent)]
    Image(#[from] DiffError),

    /// I/O error around screenshot files
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<BrowserError> for StepError {
    fn from(err: BrowserError) -> Self {
        match err {
            BrowserError::ElementNotFound(locator) => StepError::ElementNotFound(locator),
            other => StepError::Browser(other),
        }
    }
}
