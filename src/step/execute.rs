//! Execution contract shared by all steps.

use std::fs;
use tracing::debug;

use super::types::{
    Click, KeyEvent, Screenshot, ScreenshotMismatch, Scroll, Step, StepError, StepOutcome,
    StepResult, Text,
};
use crate::browser::Browser;
use crate::images::ImageDiff;
use crate::run::{Mode, Settings};
use crate::session::TestDir;

/// Everything a step needs to run against the page
pub struct StepContext<'a> {
    pub browser: &'a mut dyn Browser,
    pub settings: &'a Settings,
    /// Mode of the current dispatch; decides how screenshots behave
    pub mode: Mode,
    pub engine: &'a ImageDiff,
}

/// A recorded action that may be replayed against a browser
pub trait Action {
    /// Milliseconds since test start; the ordering key
    fn offset_time(&self) -> u64;

    /// Whether the step is ever executed during playback
    fn playback(&self) -> bool;

    /// Run the step. Must not be called when [`Action::playback`] is false.
    fn execute(&self, ctx: &mut StepContext<'_>) -> StepResult<StepOutcome>;
}

impl Action for Click {
    fn offset_time(&self) -> u64 {
        self.offset_time
    }

    fn playback(&self) -> bool {
        true
    }

    fn execute(&self, ctx: &mut StepContext<'_>) -> StepResult<StepOutcome> {
        debug!("Clicking {}", self.pos);
        // Synthetic DOM click; native coordinate clicks are unreliable across drivers
        ctx.browser.execute_script(&format!(
            "document.elementFromPoint({}, {}).click();",
            self.pos.x, self.pos.y
        ))?;
        Ok(StepOutcome::Done)
    }
}

impl Action for KeyEvent {
    fn offset_time(&self) -> u64 {
        KeyEvent::offset_time(self)
    }

    fn playback(&self) -> bool {
        false
    }

    fn execute(&self, _ctx: &mut StepContext<'_>) -> StepResult<StepOutcome> {
        debug_assert!(false, "key events are resolved into text steps before playback");
        Err(StepError::NotReplayable {
            kind: "key",
            offset_time: KeyEvent::offset_time(self),
        })
    }
}

impl Action for Text {
    fn offset_time(&self) -> u64 {
        self.offset_time
    }

    fn playback(&self) -> bool {
        true
    }

    fn execute(&self, ctx: &mut StepContext<'_>) -> StepResult<StepOutcome> {
        debug!(
            "Text '{}' into element '{}' by {:?}",
            self.value, self.identifier, self.identifier_type
        );
        let locator = self.identifier_type.locator(&self.identifier);
        let mut element = ctx.browser.find_element(&locator)?;
        // The value is the field's full content, not a suffix
        element.clear()?;
        element.send_keys(&self.value)?;
        Ok(StepOutcome::Done)
    }
}

impl Action for Screenshot {
    fn offset_time(&self) -> u64 {
        self.offset_time
    }

    fn playback(&self) -> bool {
        true
    }

    fn execute(&self, ctx: &mut StepContext<'_>) -> StepResult<StepOutcome> {
        debug!("Taking screenshot {}", self.index);
        let dir = TestDir::new(&ctx.settings.path);
        let baseline = dir.baseline(self.index);

        match ctx.mode {
            Mode::Record | Mode::Rerecord => {
                ctx.browser.save_screenshot(&baseline)?;
                Ok(StepOutcome::Done)
            }
            Mode::Playback => {
                if !baseline.is_file() {
                    return Err(StepError::MissingBaseline { path: baseline });
                }
                let candidate = dir.working(self.index);
                let working_dir = dir.working_dir();
                fs::create_dir_all(&working_dir).map_err(|source| StepError::Io {
                    path: working_dir,
                    source,
                })?;
                ctx.browser.save_screenshot(&candidate)?;

                if ctx.engine.images_identical(&baseline, &candidate)? {
                    return Ok(StepOutcome::Done);
                }

                let diff = if ctx.settings.save_diff {
                    let diffpath = dir.diff();
                    let summary =
                        ctx.engine
                            .image_diff(&baseline, &candidate, &diffpath, ctx.settings.diffcolor)?;
                    Some((diffpath, summary))
                } else {
                    None
                };
                Ok(StepOutcome::Mismatch(ScreenshotMismatch {
                    index: self.index,
                    baseline,
                    candidate,
                    diff,
                }))
            }
        }
    }
}

impl Action for Scroll {
    fn offset_time(&self) -> u64 {
        self.offset_time
    }

    fn playback(&self) -> bool {
        true
    }

    fn execute(&self, ctx: &mut StepContext<'_>) -> StepResult<StepOutcome> {
        debug!("Scrolling by {}", self.pos);
        ctx.browser
            .execute_script(&format!("window.scrollBy({}, {});", self.pos.x, self.pos.y))?;
        Ok(StepOutcome::Done)
    }
}

impl Step {
    fn action(&self) -> &dyn Action {
        match self {
            Step::Click(step) => step,
            Step::Key(step) => step,
            Step::Text(step) => step,
            Step::Screenshot(step) => step,
            Step::Scroll(step) => step,
        }
    }
}

impl Action for Step {
    fn offset_time(&self) -> u64 {
        self.action().offset_time()
    }

    fn playback(&self) -> bool {
        self.action().playback()
    }

    fn execute(&self, ctx: &mut StepContext<'_>) -> StepResult<StepOutcome> {
        self.action().execute(ctx)
    }
}

/// Sort steps by offset time, keeping the input order of ties
pub fn sort_steps(steps: &mut [Step]) {
    steps.sort_by_key(|step| step.offset_time());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::{Locator, MockBrowser};
    use crate::step::types::{IdentifierType, Point};
    use image::{Rgb, RgbImage};

    fn settings(path: &std::path::Path) -> Settings {
        Settings::new("unit", "http://localhost/", path)
            .screensize(8, 8)
            .diffcolor([255, 0, 0])
    }

    #[test]
    fn test_click_dispatches_synthetic_click() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path());
        let mut browser = MockBrowser::new(8, 8);
        let engine = ImageDiff::new(573.0);
        let mut ctx = StepContext {
            browser: &mut browser,
            settings: &settings,
            mode: Mode::Playback,
            engine: &engine,
        };

        let step = Step::Click(Click {
            offset_time: 0,
            pos: Point::new(3, 4),
        });
        assert_eq!(step.execute(&mut ctx).unwrap(), StepOutcome::Done);
        assert_eq!(browser.scripts(), &["document.elementFromPoint(3, 4).click();".to_string()]);
    }

    #[test]
    fn test_scroll_uses_relative_delta() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path());
        let mut browser = MockBrowser::new(8, 8);
        let engine = ImageDiff::new(573.0);
        let mut ctx = StepContext {
            browser: &mut browser,
            settings: &settings,
            mode: Mode::Playback,
            engine: &engine,
        };

        let step = Step::Scroll(Scroll {
            offset_time: 0,
            pos: Point::new(0, -250),
        });
        step.execute(&mut ctx).unwrap();
        assert_eq!(browser.scripts(), &["window.scrollBy(0, -250);".to_string()]);
    }

    #[test]
    fn test_text_sends_keys_or_reports_missing_element() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path());
        let mut browser = MockBrowser::new(64, 8);
        browser.add_element(Locator::Css(".search.wide".into()), 0, 0, 64, 8);
        let engine = ImageDiff::new(573.0);

        let typed = Step::Text(Text {
            offset_time: 0,
            identifier: ".search.wide".into(),
            identifier_type: IdentifierType::ClassList,
            value: "rust".into(),
        });
        let missing = Step::Text(Text {
            offset_time: 1,
            identifier: "nope".into(),
            identifier_type: IdentifierType::Id,
            value: "x".into(),
        });

        let mut ctx = StepContext {
            browser: &mut browser,
            settings: &settings,
            mode: Mode::Playback,
            engine: &engine,
        };
        typed.execute(&mut ctx).unwrap();
        let err = missing.execute(&mut ctx).unwrap_err();
        assert!(matches!(err, StepError::ElementNotFound(Locator::Id(_))));
        assert_eq!(browser.element_text(&Locator::Css(".search.wide".into())), Some("rust"));
    }

    #[test]
    fn test_text_replaces_existing_value() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path());
        let mut browser = MockBrowser::new(64, 8);
        let locator = Locator::Id("q".into());
        browser.add_element(locator.clone(), 0, 0, 64, 8);
        browser.find_element(&locator).unwrap().send_keys("a").unwrap();
        let engine = ImageDiff::new(573.0);

        let step = Step::Text(Text {
            offset_time: 0,
            identifier: "q".into(),
            identifier_type: IdentifierType::Id,
            value: "ab".into(),
        });
        let mut ctx = StepContext {
            browser: &mut browser,
            settings: &settings,
            mode: Mode::Playback,
            engine: &engine,
        };
        step.execute(&mut ctx).unwrap();
        assert_eq!(browser.element_text(&locator), Some("ab"));
    }

    #[test]
    fn test_screenshot_rerecord_overwrites_baseline() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path());
        let baseline = dir.path().join("screenshot0.png");
        RgbImage::from_pixel(8, 8, Rgb([1, 2, 3])).save(&baseline).unwrap();

        let mut browser = MockBrowser::with_color(8, 8, [200, 100, 0]);
        let engine = ImageDiff::new(573.0);
        let mut ctx = StepContext {
            browser: &mut browser,
            settings: &settings,
            mode: Mode::Rerecord,
            engine: &engine,
        };
        let step = Step::Screenshot(Screenshot {
            offset_time: 0,
            index: 0,
        });
        assert_eq!(step.execute(&mut ctx).unwrap(), StepOutcome::Done);

        let stored = image::open(&baseline).unwrap().to_rgb8();
        assert_eq!(stored.get_pixel(0, 0).0, [200, 100, 0]);
        assert!(!dir.path().join("last").exists());
    }

    #[test]
    fn test_screenshot_playback_without_baseline_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path());
        let mut browser = MockBrowser::new(8, 8);
        let engine = ImageDiff::new(573.0);
        let mut ctx = StepContext {
            browser: &mut browser,
            settings: &settings,
            mode: Mode::Playback,
            engine: &engine,
        };
        let step = Step::Screenshot(Screenshot {
            offset_time: 0,
            index: 4,
        });
        let err = step.execute(&mut ctx).unwrap_err();
        assert!(matches!(err, StepError::MissingBaseline { .. }));
        assert!(browser.screenshots().is_empty());
    }

    #[test]
    fn test_screenshot_playback_mismatch_without_diff() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path()).save_diff(false);
        RgbImage::from_pixel(8, 8, Rgb([0, 0, 0]))
            .save(dir.path().join("screenshot0.png"))
            .unwrap();

        let mut browser = MockBrowser::with_color(8, 8, [255, 255, 255]);
        let engine = ImageDiff::new(573.0);
        let mut ctx = StepContext {
            browser: &mut browser,
            settings: &settings,
            mode: Mode::Playback,
            engine: &engine,
        };
        let step = Step::Screenshot(Screenshot {
            offset_time: 0,
            index: 0,
        });
        match step.execute(&mut ctx).unwrap() {
            StepOutcome::Mismatch(mismatch) => {
                assert_eq!(mismatch.index, 0);
                assert_eq!(mismatch.candidate, dir.path().join("last").join("screenshot0.png"));
                assert!(mismatch.diff.is_none());
            }
            other => panic!("expected mismatch, got {:?}", other),
        }
        assert!(!dir.path().join("diff.png").exists());
    }

    #[test]
    fn test_key_event_is_not_playback() {
        let event = KeyEvent::new(crate::step::KeyEventFields {
            key: "a".into(),
            eid: Some("q".into()),
            ..Default::default()
        })
        .unwrap();
        assert!(!Step::Key(event).playback());
    }

    #[test]
    fn test_sort_steps_is_stable() {
        let mut steps = vec![
            Step::Screenshot(Screenshot { offset_time: 50, index: 1 }),
            Step::Click(Click { offset_time: 10, pos: Point::new(1, 1) }),
            Step::Screenshot(Screenshot { offset_time: 10, index: 0 }),
        ];
        sort_steps(&mut steps);
        let order: Vec<_> = steps.iter().map(|s| (s.kind(), s.offset_time())).collect();
        assert_eq!(order, vec![("click", 10), ("screenshot", 10), ("screenshot", 50)]);
    }
}
