pub mod diff;
pub mod mode;
pub mod types;

pub use diff::ImageDiff;
pub use mode::PixelMode;
pub use types::{DiffError, DiffResult, DiffSummary};
