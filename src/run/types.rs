// Core types for recorded tests

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::config;
use crate::step::{Action, Step, sort_steps};

/// How a dispatch treats screenshots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Capture a new test; nothing is replayed
    Record,
    /// Replay and overwrite every baseline
    Rerecord,
    /// Replay and verify against baselines
    Playback,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::Record => "record",
            Mode::Rerecord => "rerecord",
            Mode::Playback => "playback",
        };
        f.write_str(name)
    }
}

fn default_browser() -> String {
    config::get().defaults.browser.clone()
}

fn default_screensize() -> (u32, u32) {
    config::get().defaults.screensize
}

fn default_diffcolor() -> [u8; 3] {
    config::get().defaults.diffcolor
}

fn default_mode() -> Mode {
    Mode::Playback
}

/// Per-test settings persisted alongside the steps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    pub url: String,
    #[serde(default = "default_mode")]
    pub mode: Mode,
    /// Storage directory of the test
    pub path: PathBuf,
    #[serde(default = "default_browser")]
    pub browser: String,
    /// Window size as (width, height)
    #[serde(default = "default_screensize")]
    pub screensize: (u32, u32),
    /// Form fields submitted as a POST on navigation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postdata: Option<serde_json::Value>,
    #[serde(default = "default_diffcolor")]
    pub diffcolor: [u8; 3],
    #[serde(default)]
    pub save_diff: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookies: Option<serde_json::Value>,
}

impl Settings {
    /// Settings for a new recording, with configured defaults
    pub fn new(name: impl Into<String>, url: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        let defaults = &config::get().defaults;
        Self {
            name: name.into(),
            desc: None,
            url: url.into(),
            mode: Mode::Record,
            path: path.into(),
            browser: defaults.browser.clone(),
            screensize: defaults.screensize,
            postdata: None,
            diffcolor: defaults.diffcolor,
            save_diff: false,
            cookies: None,
        }
    }

    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn desc(mut self, desc: impl Into<String>) -> Self {
        self.desc = Some(desc.into());
        self
    }

    pub fn browser(mut self, browser: impl Into<String>) -> Self {
        self.browser = browser.into();
        self
    }

    pub fn screensize(mut self, width: u32, height: u32) -> Self {
        self.screensize = (width, height);
        self
    }

    pub fn postdata(mut self, postdata: serde_json::Value) -> Self {
        self.postdata = Some(postdata);
        self
    }

    pub fn diffcolor(mut self, diffcolor: [u8; 3]) -> Self {
        self.diffcolor = diffcolor;
        self
    }

    pub fn save_diff(mut self, save_diff: bool) -> Self {
        self.save_diff = save_diff;
        self
    }

    pub fn cookies(mut self, cookies: serde_json::Value) -> Self {
        self.cookies = Some(cookies);
        self
    }
}

/// A recorded test: settings plus steps in offset order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Test {
    pub version: u32,
    pub settings: Settings,
    pub steps: Vec<Step>,
}

impl Test {
    /// Build a test at the current data version, sorting `steps`
    pub fn new(settings: Settings, steps: Vec<Step>) -> Self {
        let mut test = Self {
            version: config::DATA_VERSION,
            settings,
            steps,
        };
        test.sort_steps();
        test
    }

    pub fn name(&self) -> &str {
        &self.settings.name
    }

    pub fn sort_steps(&mut self) {
        sort_steps(&mut self.steps);
    }

    pub fn screenshot_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| matches!(s, Step::Screenshot(_)))
            .count()
    }

    /// Steps that are executed on replay
    pub fn playback_steps(&self) -> impl Iterator<Item = &Step> {
        self.steps.iter().filter(|s| s.playback())
    }
}

/// Result type for loading and persisting tests
pub type RunResult<T> = Result<T, RunError>;

/// Error types for loading and persisting tests
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("{} does not exist", .path.display())]
    DoesNotExist { path: PathBuf },

    #[error("{} is empty", .path.display())]
    Empty { path: PathBuf },

    #[error("{} is not valid JSON: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{} is not a recorded test: {reason}", .path.display())]
    Malformed { path: PathBuf, reason: String },

    #[error("{} has data version {found}, expected {expected}; rerecord the test", .path.display())]
    VersionMismatch {
        path: PathBuf,
        found: u64,
        expected: u32,
    },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize test: {0}")]
    Serialize(#[from] serde_json::Error),

    /// A recording must capture at least one screenshot
    #[error("test {name} recorded no screenshots")]
    NoScreenshotsRecorded { name: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::{Click, KeyEvent, KeyEventFields, Point, Screenshot};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_new_sorts_steps_and_sets_version() {
        let steps = vec![
            Step::Screenshot(Screenshot { offset_time: 30, index: 0 }),
            Step::Click(Click { offset_time: 10, pos: Point::new(1, 1) }),
        ];
        let test = Test::new(Settings::new("t", "http://localhost/", "/tmp/t"), steps);
        assert_eq!(test.version, config::DATA_VERSION);
        assert_eq!(test.steps[0].kind(), "click");
        assert_eq!(test.screenshot_count(), 1);
    }

    #[test]
    fn test_playback_steps_leave_out_key_events() {
        let key = KeyEvent::new(KeyEventFields {
            offset_time: 5,
            key: "a".into(),
            eid: Some("q".into()),
            ..Default::default()
        })
        .unwrap();
        let steps = vec![
            Step::Key(key),
            Step::Screenshot(Screenshot { offset_time: 30, index: 0 }),
            Step::Click(Click { offset_time: 10, pos: Point::new(1, 1) }),
        ];
        let test = Test::new(Settings::new("t", "http://localhost/", "/tmp/t"), steps);
        let kinds: Vec<_> = test.playback_steps().map(|s| s.kind()).collect();
        assert_eq!(kinds, vec!["click", "screenshot"]);
    }

    #[test]
    fn test_settings_defaults_on_deserialize() {
        let settings: Settings = serde_json::from_value(serde_json::json!({
            "name": "login",
            "url": "http://localhost/",
            "path": "/data/login"
        }))
        .unwrap();
        assert_eq!(settings.mode, Mode::Playback);
        assert!(!settings.save_diff);
        assert_eq!(settings.postdata, None);
        assert_eq!(settings.screensize, config::get().defaults.screensize);
    }

    #[test]
    fn test_settings_builder() {
        let settings = Settings::new("s", "http://x/", "/p")
            .mode(Mode::Rerecord)
            .desc("search page")
            .browser("chrome")
            .screensize(800, 600)
            .diffcolor([1, 2, 3])
            .save_diff(true)
            .cookies(serde_json::json!({"a": "b"}));
        assert_eq!(settings.mode, Mode::Rerecord);
        assert_eq!(settings.desc.as_deref(), Some("search page"));
        assert_eq!(settings.browser, "chrome");
        assert_eq!(settings.screensize, (800, 600));
        assert_eq!(settings.diffcolor, [1, 2, 3]);
        assert!(settings.save_diff);
        assert!(settings.cookies.is_some());
    }

    #[test]
    fn test_mode_serializes_lowercase() {
        assert_eq!(serde_json::to_value(Mode::Rerecord).unwrap(), serde_json::json!("rerecord"));
        assert_eq!(Mode::Playback.to_string(), "playback");
    }
}
