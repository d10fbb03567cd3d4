//! Integration tests for recording and replaying tests against the mock browser

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::Utc;
use gossamer::browser::{Browser, Locator, MockBrowser};
use gossamer::run::{Mode, Recorder, RunError, Settings, Test, read_recorded_run};
use gossamer::runner::{RunReport, State, Verdict};
use gossamer::session::TestDir;
use gossamer::step::{Action, KeyEventFields, Step};
use gossamer::{Dispatcher, ImageDiff};

const GREEN: [u8; 3] = [0, 255, 0];

/// A 64x32 login form with user and password fields
fn login_page() -> MockBrowser {
    let mut page = MockBrowser::new(64, 32);
    page.add_element(Locator::Id("user".into()), 0, 0, 64, 8);
    page.add_element(Locator::Id("pass".into()), 0, 16, 64, 8);
    page
}

fn type_into(page: &mut MockBrowser, recorder: &mut Recorder, id: &str, text: &str) {
    let mut typed = String::new();
    for c in text.chars() {
        typed.push(c);
        page.find_element(&Locator::Id(id.into()))
            .unwrap()
            .send_keys(&c.to_string())
            .unwrap();
        recorder
            .key(KeyEventFields {
                key: c.to_string(),
                eid: Some(id.into()),
                eid_val: Some(typed.clone()),
                ..Default::default()
            })
            .unwrap();
    }
}

/// Record the login test into `root/login` and return its directory
fn record_login(root: &Path) -> TestDir {
    let dir = TestDir::default_for(root, "login");
    dir.prepare(Mode::Record, false).unwrap();

    let settings = Settings::new("login", "http://localhost/login", dir.path())
        .screensize(64, 32)
        .diffcolor(GREEN)
        .save_diff(true);
    let mut page = login_page();
    let mut recorder = Recorder::new(settings);
    type_into(&mut page, &mut recorder, "user", "al");
    type_into(&mut page, &mut recorder, "pass", "pw");
    recorder.screenshot(&mut page).unwrap();
    recorder.click(4, 4);

    let test = recorder.finish();
    let verdicts = Dispatcher::new(&mut page).dispatch(Mode::Record, tests("login", test));
    assert!(verdicts["login"].is_pass(), "record failed: {:?}", verdicts["login"]);
    dir
}

fn tests(name: &str, test: Test) -> BTreeMap<String, Test> {
    BTreeMap::from([(name.to_string(), test)])
}

fn replay(page: &mut MockBrowser, mode: Mode, dir: &TestDir) -> Verdict {
    let test = read_recorded_run(&dir.record_file()).unwrap();
    let mut verdicts = Dispatcher::new(page)
        .engine(ImageDiff::new(573.0))
        .sleep_factor(0.0)
        .dispatch(mode, tests("login", test));
    verdicts.remove("login").unwrap()
}

/// Changes an 8x8 block below the form
fn tampered_login_page() -> MockBrowser {
    let mut page = login_page();
    page.draw_rect(56, 24, 8, 8, [0, 0, 0]);
    page
}

#[test]
fn test_recording_persists_resolved_steps() {
    let root = tempfile::tempdir().unwrap();
    let dir = record_login(root.path());

    let test = read_recorded_run(&dir.record_file()).unwrap();
    let kinds: Vec<_> = test.steps.iter().map(|s| s.kind()).collect();
    assert_eq!(kinds, vec!["text", "text", "screenshot", "click"]);
    assert!(dir.baseline(0).is_file());
    assert!(test.settings.save_diff);
}

#[test]
fn test_login_playback_passes_on_unchanged_page() {
    let root = tempfile::tempdir().unwrap();
    let dir = record_login(root.path());

    let mut page = login_page();
    let verdict = replay(&mut page, Mode::Playback, &dir);

    assert_eq!(verdict.state(), State::Pass, "{:?}", verdict.message());
    assert_eq!(page.element_text(&Locator::Id("user".into())), Some("al"));
    assert_eq!(page.element_text(&Locator::Id("pass".into())), Some("pw"));
    assert!(dir.working(0).is_file());
    assert!(!dir.diff().exists());
    assert_eq!(
        page.scripts().last().map(String::as_str),
        Some("document.elementFromPoint(4, 4).click();")
    );
}

#[test]
fn test_login_playback_fails_and_paints_diff() {
    let root = tempfile::tempdir().unwrap();
    let dir = record_login(root.path());

    let mut page = tampered_login_page();
    let verdict = replay(&mut page, Mode::Playback, &dir);

    match &verdict {
        Verdict::Fail(failure) => {
            assert_eq!(failure.mismatch.index, 0);
            assert_eq!(failure.step.index, 2);
            let (path, summary) = failure.mismatch.diff.as_ref().unwrap();
            assert_eq!(path, &dir.diff());
            assert!(summary.rms > 573.0);
            assert_eq!((summary.width, summary.height), (64, 32));
        }
        other => panic!("expected FAIL, got {:?}", other),
    }

    let diff = image::open(dir.diff()).unwrap().to_rgb8();
    assert_eq!(diff.get_pixel(60, 28).0, GREEN);
    assert_eq!(diff.get_pixel(2, 30).0, [255, 255, 255]);

    // Steps after the mismatch never run
    assert!(!page.scripts().iter().any(|s| s.contains("elementFromPoint")));
}

#[test]
fn test_rerecord_overwrites_baseline() {
    let root = tempfile::tempdir().unwrap();
    let dir = record_login(root.path());

    let mut page = tampered_login_page();
    assert_eq!(replay(&mut page, Mode::Rerecord, &dir).state(), State::Pass);

    let baseline = image::open(dir.baseline(0)).unwrap().to_rgb8();
    assert_eq!(baseline.get_pixel(60, 28).0, [0, 0, 0]);

    let mut page = tampered_login_page();
    assert_eq!(replay(&mut page, Mode::Playback, &dir).state(), State::Pass);

    let mut page = login_page();
    assert_eq!(replay(&mut page, Mode::Playback, &dir).state(), State::Fail);
}

#[test]
fn test_typing_split_by_screenshot_replays_identically() {
    let root = tempfile::tempdir().unwrap();
    let dir = TestDir::default_for(root.path(), "search");
    dir.prepare(Mode::Record, false).unwrap();

    let mut page = login_page();
    let mut recorder = Recorder::new(
        Settings::new("search", "http://localhost/", dir.path()).screensize(64, 32),
    );
    type_into(&mut page, &mut recorder, "user", "a");
    recorder.screenshot(&mut page).unwrap();
    page.find_element(&Locator::Id("user".into()))
        .unwrap()
        .send_keys("b")
        .unwrap();
    recorder
        .key(KeyEventFields {
            key: "b".into(),
            eid: Some("user".into()),
            eid_val: Some("ab".into()),
            ..Default::default()
        })
        .unwrap();
    recorder.screenshot(&mut page).unwrap();
    assert_eq!(page.element_text(&Locator::Id("user".into())), Some("ab"));

    let test = recorder.finish();
    let verdicts = Dispatcher::new(&mut page).dispatch(Mode::Record, tests("search", test));
    assert!(verdicts["search"].is_pass());

    let mut fresh = login_page();
    let test = read_recorded_run(&dir.record_file()).unwrap();
    let verdicts = Dispatcher::new(&mut fresh)
        .sleep_factor(0.0)
        .dispatch(Mode::Playback, tests("search", test));

    assert!(verdicts["search"].is_pass(), "{:?}", verdicts["search"].message());
    assert_eq!(fresh.element_text(&Locator::Id("user".into())), Some("ab"));
}

#[test]
fn test_rgba_screenshots_match_themselves() {
    let root = tempfile::tempdir().unwrap();
    let dir = TestDir::new(root.path());
    let mut page = login_page().rgba(true);
    page.save_screenshot(&dir.baseline(0)).unwrap();

    let test = Test::new(
        Settings::new("rgba", "http://localhost/", root.path()).screensize(64, 32),
        vec![Step::Screenshot(gossamer::step::Screenshot { offset_time: 0, index: 0 })],
    );
    let verdicts = Dispatcher::new(&mut page)
        .sleep_factor(0.0)
        .dispatch(Mode::Playback, tests("rgba", test));
    assert!(verdicts["rgba"].is_pass(), "{:?}", verdicts["rgba"]);
}

#[test]
fn test_key_events_in_record_file_are_not_executed() {
    let root = tempfile::tempdir().unwrap();
    let dir = TestDir::new(root.path());
    let mut page = login_page();
    page.save_screenshot(&dir.baseline(0)).unwrap();

    let record = serde_json::json!({
        "keys": {
            "version": 1,
            "settings": {"name": "keys", "url": "http://localhost/", "path": root.path(), "screensize": [64, 32]},
            "steps": [
                {"Screenshot": {"offset_time": 20, "index": 0}},
                {"Key": {"offset_time": 10, "key": "x", "eid": "nowhere"}}
            ]
        }
    });
    fs::write(dir.record_file(), record.to_string()).unwrap();

    let test = read_recorded_run(&dir.record_file()).unwrap();
    assert_eq!(test.steps[0].kind(), "key");
    assert!(!test.steps[0].playback());

    let verdicts = Dispatcher::new(&mut page)
        .sleep_factor(0.0)
        .dispatch(Mode::Playback, tests("keys", test));
    assert!(verdicts["keys"].is_pass(), "{:?}", verdicts["keys"]);
    assert_eq!(page.screenshots(), &[dir.baseline(0), dir.working(0)]);
}

#[test]
fn test_other_data_versions_are_rejected_before_any_step() {
    let root = tempfile::tempdir().unwrap();
    let dir = record_login(root.path());

    let mut document: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.record_file()).unwrap()).unwrap();
    document["login"]["version"] = serde_json::json!(2);
    fs::write(dir.record_file(), document.to_string()).unwrap();

    let err = read_recorded_run(&dir.record_file()).unwrap_err();
    assert!(matches!(err, RunError::VersionMismatch { found: 2, .. }));
}

#[test]
fn test_stop_on_error_and_report() {
    let root = tempfile::tempdir().unwrap();
    let dir = record_login(root.path());
    let login = read_recorded_run(&dir.record_file()).unwrap();

    let mut all = BTreeMap::new();
    let missing = Settings::new("a_missing", "http://localhost/", root.path().join("none"));
    all.insert("a_missing".to_string(), Test::new(missing, vec![]));
    all.insert("login".to_string(), login);

    let started_at = Utc::now();
    let mut page = login_page();
    let mut output = Vec::new();
    let verdicts = Dispatcher::new(&mut page)
        .sleep_factor(0.0)
        .output(&mut output)
        .dispatch(Mode::Playback, all.clone());
    let report = RunReport::from_verdicts(Mode::Playback, started_at, &verdicts);

    assert_eq!(report.count(State::Error), 1);
    assert_eq!(report.count(State::Pass), 1);
    assert!(!report.success());
    let printed = String::from_utf8(output).unwrap();
    assert!(printed.contains("a_missing ... ERROR"));
    assert!(printed.contains("login ... PASS"));

    let mut page = login_page();
    let verdicts = Dispatcher::new(&mut page)
        .sleep_factor(0.0)
        .stop_on_error(true)
        .dispatch(Mode::Playback, all);
    assert_eq!(verdicts.keys().collect::<Vec<_>>(), vec!["a_missing"]);
}
