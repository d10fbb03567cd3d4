pub mod mock;
pub mod types;

pub use mock::MockBrowser;
pub use types::{Browser, BrowserError, BrowserResult, Element, Locator};
