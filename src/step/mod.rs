//! Recorded steps and their execution against a browser.
//!
//! A test is an ordered list of [`Step`]s. Each variant implements
//! [`Action`]; the dispatcher executes the playback-capable ones in
//! `offset_time` order with the current [`crate::run::Mode`].

pub mod execute;
pub mod resolve;
pub mod types;

pub use execute::{Action, StepContext, sort_steps};
pub use resolve::resolve_key_events;
pub use types::{
    Click, IdentifierType, KeyEvent, KeyEventFields, Point, Screenshot, ScreenshotMismatch, Scroll,
    Step, StepError, StepOutcome, StepResult, Text,
};
