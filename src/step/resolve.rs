//! Folding recorded keypresses into replayable text steps.

use std::collections::HashMap;

use super::execute::{Action, sort_steps};
use super::types::{IdentifierType, KeyEvent, Step, Text};

/// A run of key events aimed at the same element
struct PendingText {
    offset_time: u64,
    identifier: String,
    identifier_type: IdentifierType,
    keys: String,
    value: Option<String>,
}

impl PendingText {
    fn start(event: &KeyEvent) -> Self {
        let (identifier, identifier_type) = event.identifier();
        let mut pending = Self {
            offset_time: event.offset_time(),
            identifier,
            identifier_type,
            keys: String::new(),
            value: None,
        };
        pending.push(event);
        pending
    }

    fn targets(&self, event: &KeyEvent) -> bool {
        event.identifier() == (self.identifier.clone(), self.identifier_type)
    }

    fn push(&mut self, event: &KeyEvent) {
        self.keys.push_str(event.key());
        if let Some(value) = event.value() {
            self.value = Some(value.to_string());
        }
    }

    /// Emit the text step, tracking what the element holds afterwards
    fn finish(self, contents: &mut HashMap<(String, IdentifierType), String>) -> Step {
        let key = (self.identifier, self.identifier_type);
        let value = match self.value {
            Some(value) => value,
            None => {
                let mut value = contents.get(&key).cloned().unwrap_or_default();
                value.push_str(&self.keys);
                value
            }
        };
        contents.insert(key.clone(), value.clone());

        let (identifier, identifier_type) = key;
        Step::Text(Text {
            offset_time: self.offset_time,
            identifier,
            identifier_type,
            value,
        })
    }
}

/// Replace key events with text steps.
///
/// Steps are sorted by offset first. Each maximal run of consecutive key
/// events on the same element becomes one text step at the offset of the
/// run's first key. A text step holds the element's full content after the
/// run, since replay clears the element before typing: the last element value
/// recorded in the run, or else the element's content from its previous run
/// followed by the run's keys. Other steps pass through untouched.
pub fn resolve_key_events(mut steps: Vec<Step>) -> Vec<Step> {
    sort_steps(&mut steps);

    let mut resolved = Vec::with_capacity(steps.len());
    let mut pending: Option<PendingText> = None;
    let mut contents = HashMap::new();

    for step in steps {
        match step {
            Step::Key(event) => {
                if pending.as_ref().is_some_and(|p| p.targets(&event)) {
                    if let Some(p) = pending.as_mut() {
                        p.push(&event);
                    }
                } else {
                    resolved.extend(pending.take().map(|p| p.finish(&mut contents)));
                    pending = Some(PendingText::start(&event));
                }
            }
            other => {
                resolved.extend(pending.take().map(|p| p.finish(&mut contents)));
                resolved.push(other);
            }
        }
    }
    resolved.extend(pending.take().map(|p| p.finish(&mut contents)));

    debug_assert!(resolved.iter().all(|s| s.playback()));
    resolved
}
