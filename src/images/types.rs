// Core types for screenshot comparison

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::mode::PixelMode;

/// Outcome of a diff image generation, kept for reporting
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiffSummary {
    /// RMS difference on the reference histogram scale
    pub rms: f64,
    pub width: u32,
    pub height: u32,
}

/// Result type for image comparison
pub type DiffResult<T> = Result<T, DiffError>;

/// Error types for image comparison
#[derive(Debug, thiserror::Error)]
pub enum DiffError {
    /// Screenshot could not be read
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Screenshot could not be decoded
    #[error("cannot decode {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Diff image could not be written
    #[error("cannot write diff image {}: {source}", .path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Baseline and candidate use different channel layouts
    #[error(
        "different pixel modes between {} ({baseline_mode}) and {} ({candidate_mode})",
        .baseline.display(),
        .candidate.display()
    )]
    IncompatibleModes {
        baseline: PathBuf,
        baseline_mode: PixelMode,
        candidate: PathBuf,
        candidate_mode: PixelMode,
    },

    /// Baseline and candidate have different pixel dimensions
    #[error(
        "different dimensions between {} ({baseline_size:?}) and {} ({candidate_size:?})",
        .baseline.display(),
        .candidate.display()
    )]
    IncompatibleDimensions {
        baseline: PathBuf,
        baseline_size: (u32, u32),
        candidate: PathBuf,
        candidate_size: (u32, u32),
    },

    /// Indexed images cannot be highlighted without a nearest-colour lookup
    #[error("palette image {} is not supported for diffing", .path.display())]
    PaletteUnsupported { path: PathBuf },

    /// Any other mode the highlighter has no diff value for
    #[error("pixel mode {mode} of {} is not supported for diffing", .path.display())]
    UnsupportedMode { path: PathBuf, mode: PixelMode },
}

impl DiffError {
    /// True for mode or dimension mismatches between the two images
    pub fn is_incompatible(&self) -> bool {
        matches!(
            self,
            DiffError::IncompatibleModes { .. } | DiffError::IncompatibleDimensions { .. }
        )
    }
}
