//! Capture-side API used while a test is being recorded.

use std::fs;
use std::time::Instant;
use tracing::{debug, info};

use super::types::{Settings, Test};
use crate::browser::Browser;
use crate::session::TestDir;
use crate::step::{
    Click, KeyEvent, KeyEventFields, Point, Screenshot, Scroll, Step, StepError, StepResult,
    resolve_key_events,
};

/// Collects steps with their offsets from the start of the recording.
///
/// The test directory should be prepared with
/// [`TestDir::prepare`](crate::session::TestDir::prepare) beforehand.
pub struct Recorder {
    settings: Settings,
    started: Instant,
    steps: Vec<Step>,
    next_screenshot: u32,
}

impl Recorder {
    /// Start recording; offsets are measured from this call
    pub fn new(settings: Settings) -> Self {
        info!("Recording {} at {}", settings.name, settings.url);
        Self {
            settings,
            started: Instant::now(),
            steps: Vec::new(),
            next_screenshot: 0,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Milliseconds since the recording started
    pub fn elapsed(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    /// Append a step at its own offset
    pub fn push(&mut self, step: Step) {
        debug!("Recorded {} step", step.kind());
        self.steps.push(step);
    }

    pub fn click(&mut self, x: i64, y: i64) {
        let offset_time = self.elapsed();
        self.push(Step::Click(Click {
            offset_time,
            pos: Point::new(x, y),
        }));
    }

    /// Record a keypress; the offset in `fields` is replaced with the elapsed time
    pub fn key(&mut self, mut fields: KeyEventFields) -> StepResult<()> {
        fields.offset_time = self.elapsed();
        let event = KeyEvent::new(fields)?;
        self.push(Step::Key(event));
        Ok(())
    }

    pub fn scroll(&mut self, dx: i64, dy: i64) {
        let offset_time = self.elapsed();
        self.push(Step::Scroll(Scroll {
            offset_time,
            pos: Point::new(dx, dy),
        }));
    }

    /// Capture the next baseline now and record the checkpoint.
    ///
    /// Returns the screenshot index.
    pub fn screenshot(&mut self, browser: &mut dyn Browser) -> StepResult<u32> {
        let offset_time = self.elapsed();
        let index = self.next_screenshot;
        let dir = TestDir::new(&self.settings.path);
        fs::create_dir_all(dir.path()).map_err(|source| StepError::Io {
            path: dir.path().to_path_buf(),
            source,
        })?;
        browser.save_screenshot(&dir.baseline(index))?;

        self.next_screenshot += 1;
        self.push(Step::Screenshot(Screenshot { offset_time, index }));
        Ok(index)
    }

    /// Stop recording and build the test, folding key events into text steps
    pub fn finish(self) -> Test {
        let steps = resolve_key_events(self.steps);
        info!("Recorded {} steps for {}", steps.len(), self.settings.name);
        Test::new(self.settings, steps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::MockBrowser;
    use crate::step::{Action, IdentifierType, Text};

    #[test]
    fn test_screenshot_indices_are_monotonic() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = Recorder::new(Settings::new("r", "http://localhost/", dir.path()));
        let mut browser = MockBrowser::new(4, 4);

        assert_eq!(recorder.screenshot(&mut browser).unwrap(), 0);
        assert_eq!(recorder.screenshot(&mut browser).unwrap(), 1);
        assert!(dir.path().join("screenshot0.png").is_file());
        assert!(dir.path().join("screenshot1.png").is_file());
    }

    #[test]
    fn test_finish_resolves_keys_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = Recorder::new(Settings::new("r", "http://localhost/", dir.path()));
        let mut browser = MockBrowser::new(4, 4);

        recorder.push(Step::Click(Click { offset_time: u64::MAX, pos: Point::new(1, 1) }));
        for (key, value) in [("h", "h"), ("i", "hi")] {
            recorder
                .key(KeyEventFields {
                    key: key.into(),
                    eid: Some("q".into()),
                    eid_val: Some(value.into()),
                    ..Default::default()
                })
                .unwrap();
        }
        recorder.scroll(0, 10);
        recorder.screenshot(&mut browser).unwrap();

        let test = recorder.finish();
        assert!(test.steps.iter().all(|s| s.playback()));
        assert!(matches!(
            &test.steps[0],
            Step::Text(Text { identifier_type: IdentifierType::Id, value, .. }) if value == "hi"
        ));
        assert_eq!(test.steps.last().map(|s| s.kind()), Some("click"));
        assert_eq!(test.screenshot_count(), 1);
    }

    #[test]
    fn test_key_without_identifier_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = Recorder::new(Settings::new("r", "http://localhost/", dir.path()));
        let err = recorder
            .key(KeyEventFields {
                key: "a".into(),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, StepError::InvalidStep { .. }));
        assert_eq!(recorder.finish().steps.len(), 0);
    }
}
