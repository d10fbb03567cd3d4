// Core types for the browser automation capability

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Strategy used to locate an element on the page
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Locator {
    /// Exact DOM id lookup
    Id(String),
    /// Single class name lookup
    ClassName(String),
    /// CSS selector lookup
    Css(String),
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Id(id) => write!(f, "id={}", id),
            Locator::ClassName(name) => write!(f, "class name={}", name),
            Locator::Css(selector) => write!(f, "css={}", selector),
        }
    }
}

/// Result type for browser operations
pub type BrowserResult<T> = Result<T, BrowserError>;

/// Error types for browser operations
#[derive(Debug, thiserror::Error)]
pub enum BrowserError {
    /// No element matched the locator
    #[error("no element matches {0}")]
    ElementNotFound(Locator),

    /// The automation driver reported a fault
    #[error("driver error: {0}")]
    Driver(String),

    /// I/O error while writing a screenshot
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Handle to an element found on the page
pub trait Element {
    /// Empty the element's current value
    fn clear(&mut self) -> BrowserResult<()>;

    /// Type `text` into the element as keystrokes
    fn send_keys(&mut self, text: &str) -> BrowserResult<()>;
}

/// The browser automation capability.
///
/// The four required operations are the only calls the step engine makes
/// against a live page. Session creation and teardown belong to the caller.
pub trait Browser {
    /// Run a JavaScript snippet in the page and return its JSON result
    fn execute_script(&mut self, script: &str) -> BrowserResult<serde_json::Value>;

    /// Locate a single element
    fn find_element(&mut self, locator: &Locator) -> BrowserResult<Box<dyn Element + '_>>;

    /// Write a PNG screenshot of the viewport to `path`
    fn save_screenshot(&mut self, path: &Path) -> BrowserResult<()>;

    /// Resize the browser window
    fn set_window_size(&mut self, width: u32, height: u32) -> BrowserResult<()> {
        self.execute_script(&format!("window.resizeTo({}, {});", width, height))?;
        Ok(())
    }

    /// Set cookies on the current document.
    ///
    /// Accepts either an object of `name: value` pairs or a list of
    /// `{"name": .., "value": ..}` records.
    fn add_cookies(&mut self, cookies: &serde_json::Value) -> BrowserResult<()> {
        for (name, value) in cookie_pairs(cookies)? {
            let cookie = format!("{}={}", name, value);
            let script = format!(
                "document.cookie = {};",
                serde_json::Value::String(cookie)
            );
            self.execute_script(&script)?;
        }
        Ok(())
    }

    /// Navigate to `url`, submitting `postdata` as a POST form when present
    fn navigate(&mut self, url: &str, postdata: Option<&serde_json::Value>) -> BrowserResult<()> {
        let script = match postdata {
            Some(data) => post_form_script(url, data)?,
            None => format!(
                "window.location.href = {};",
                serde_json::Value::String(url.to_string())
            ),
        };
        self.execute_script(&script)?;
        Ok(())
    }
}

/// Build the script that submits `data` to `url` through a hidden form
pub(crate) fn post_form_script(url: &str, data: &serde_json::Value) -> BrowserResult<String> {
    let fields = data
        .as_object()
        .ok_or_else(|| BrowserError::Driver("postdata must be a JSON object".to_string()))?;

    let mut script = String::from(
        "var form = document.createElement('form');\n\
         form.setAttribute('method', 'POST');\n",
    );
    script.push_str(&format!(
        "form.setAttribute('action', {});\n",
        serde_json::Value::String(url.to_string())
    ));
    for (name, value) in fields {
        let value = match value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        script.push_str(&format!(
            "var input = document.createElement('input');\n\
             input.setAttribute('type', 'hidden');\n\
             input.setAttribute('name', {});\n\
             input.setAttribute('value', {});\n\
             form.appendChild(input);\n",
            serde_json::Value::String(name.clone()),
            serde_json::Value::String(value)
        ));
    }
    script.push_str("document.body.appendChild(form);\nform.submit();");
    Ok(script)
}

fn cookie_pairs(cookies: &serde_json::Value) -> BrowserResult<Vec<(String, String)>> {
    fn text(value: &serde_json::Value) -> String {
        match value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    match cookies {
        serde_json::Value::Object(map) => Ok(map.iter().map(|(k, v)| (k.clone(), text(v))).collect()),
        serde_json::Value::Array(items) => items
            .iter()
            .map(|item| {
                let name = item.get("name").and_then(|v| v.as_str());
                let value = item.get("value");
                match (name, value) {
                    (Some(name), Some(value)) => Ok((name.to_string(), text(value))),
                    _ => Err(BrowserError::Driver(format!(
                        "cookie record needs `name` and `value`: {}",
                        item
                    ))),
                }
            })
            .collect(),
        serde_json::Value::Null => Ok(Vec::new()),
        other => Err(BrowserError::Driver(format!("unsupported cookie payload: {}", other))),
    }
}
