//! Runs tests against a browser in one mode and collects a verdict per test.
//!
//! - `Mode::Record`: key events are resolved, the test must hold a screenshot,
//!   and `record.json` is written. Nothing is replayed.
//! - `Mode::Rerecord`: playback steps are replayed and every baseline is
//!   overwritten.
//! - `Mode::Playback`: playback steps are replayed and screenshots are
//!   verified; the first mismatch fails the test.
//!
//! Progress lines (`name ... PASS`) go to the configured output writer.

use std::collections::BTreeMap;
use std::io::Write;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::browser::Browser;
use crate::config::{self, DATA_VERSION};
use crate::images::ImageDiff;
use crate::run::{Mode, RunError, Test, write_recorded_run};
use crate::runner::{Failure, Fault, StepPosition, Verdict};
use crate::session::TestDir;
use crate::step::{Action, StepContext, StepOutcome, resolve_key_events};

/// Executes tests one after another against a single browser session
pub struct Dispatcher<'a> {
    browser: &'a mut dyn Browser,
    engine: ImageDiff,
    sleep_factor: f64,
    stop_on_error: bool,
    output: Box<dyn Write + 'a>,
}

impl<'a> Dispatcher<'a> {
    /// Dispatcher with configured tolerance and sleep factor, writing no progress
    pub fn new(browser: &'a mut dyn Browser) -> Self {
        Self {
            browser,
            engine: ImageDiff::default(),
            sleep_factor: config::sleep_factor(),
            stop_on_error: false,
            output: Box::new(std::io::sink()),
        }
    }

    pub fn engine(mut self, engine: ImageDiff) -> Self {
        self.engine = engine;
        self
    }

    /// Multiplier for recorded delays; 0 replays without waiting
    pub fn sleep_factor(mut self, factor: f64) -> Self {
        self.sleep_factor = factor.max(0.0);
        self
    }

    /// Stop after the first test that does not pass
    pub fn stop_on_error(mut self, stop: bool) -> Self {
        self.stop_on_error = stop;
        self
    }

    pub fn output(mut self, output: impl Write + 'a) -> Self {
        self.output = Box::new(output);
        self
    }

    /// Run every test in name order and return their verdicts.
    ///
    /// With `stop_on_error`, tests after the first FAIL or ERROR get no verdict.
    pub fn dispatch(&mut self, mode: Mode, tests: BTreeMap<String, Test>) -> BTreeMap<String, Verdict> {
        info!("Dispatching {} tests in {} mode", tests.len(), mode);
        let mut verdicts = BTreeMap::new();

        for (name, test) in tests {
            let verdict = match mode {
                Mode::Record => self.record(&name, test),
                Mode::Rerecord | Mode::Playback => self.replay(mode, &name, test),
            };
            self.report(&name, &verdict);

            let stop = self.stop_on_error && !verdict.is_pass();
            verdicts.insert(name, verdict);
            if stop {
                info!("Stopping after first failure");
                break;
            }
        }
        verdicts
    }

    fn report(&mut self, name: &str, verdict: &Verdict) {
        match verdict.message() {
            Some(message) => warn!("{} ... {}: {}", name, verdict.state(), message),
            None => info!("{} ... {}", name, verdict.state()),
        }
        let mut line = format!("{} ... {}\n", name, verdict.state());
        if let Some(message) = verdict.message() {
            line.push_str(&format!("    {}\n", message));
        }
        if let Err(e) = self.output.write_all(line.as_bytes()) {
            warn!("Failed to write progress: {}", e);
        }
    }

    fn record(&mut self, name: &str, test: Test) -> Verdict {
        let Test { settings, steps, .. } = test;
        let test = Test::new(settings, resolve_key_events(steps));

        if test.screenshot_count() == 0 {
            return Verdict::Error(Fault::new(
                name,
                RunError::NoScreenshotsRecorded {
                    name: name.to_string(),
                },
            ));
        }
        match write_recorded_run(&test.settings.path, &test) {
            Ok(path) => {
                debug!("Persisted {} to {}", name, path.display());
                Verdict::Pass
            }
            Err(e) => Verdict::Error(Fault::new(name, e)),
        }
    }

    fn replay(&mut self, mode: Mode, name: &str, mut test: Test) -> Verdict {
        let dir = TestDir::new(&test.settings.path);
        if test.version != DATA_VERSION {
            return Verdict::Error(Fault::new(
                name,
                RunError::VersionMismatch {
                    path: dir.record_file(),
                    found: u64::from(test.version),
                    expected: DATA_VERSION,
                },
            ));
        }
        test.sort_steps();

        if let Err(e) = dir.prepare(mode, false) {
            return Verdict::Error(Fault::new(name, e));
        }
        if let Err(e) = self.open_page(&test) {
            return Verdict::Error(Fault::new(name, e));
        }

        let mut ctx = StepContext {
            browser: &mut *self.browser,
            settings: &test.settings,
            mode,
            engine: &self.engine,
        };
        let mut last_offset = 0;

        for (index, step) in test.steps.iter().enumerate() {
            if !step.playback() {
                debug!("Skipping {} step {}", step.kind(), index);
                continue;
            }
            let offset_time = step.offset_time();
            settle(offset_time.saturating_sub(last_offset), self.sleep_factor);
            last_offset = offset_time;

            let position = StepPosition { index, offset_time };
            match step.execute(&mut ctx) {
                Ok(StepOutcome::Done) => {}
                Ok(StepOutcome::Mismatch(mismatch)) => {
                    return Verdict::Fail(Failure {
                        test: name.to_string(),
                        step: position,
                        mismatch,
                    });
                }
                Err(e) => return Verdict::Error(Fault::new(name, e).at_step(position)),
            }
        }
        Verdict::Pass
    }

    /// Size the window, set cookies and load the test's start page
    fn open_page(&mut self, test: &Test) -> crate::browser::BrowserResult<()> {
        let settings = &test.settings;
        let (width, height) = settings.screensize;
        self.browser.set_window_size(width, height)?;

        if let Some(cookies) = &settings.cookies {
            // Cookies only stick once a document from the site is loaded
            self.browser.navigate(&settings.url, None)?;
            self.browser.add_cookies(cookies)?;
        }
        self.browser.navigate(&settings.url, settings.postdata.as_ref())
    }
}

/// Wait out the recorded gap between two steps
fn settle(delta_ms: u64, factor: f64) {
    let millis = delta_ms as f64 * factor;
    if millis > 0.0 {
        thread::sleep(Duration::from_secs_f64(millis / 1000.0));
    }
}
