//! Configuration management with environment variable support.
//!
//! This module provides centralized configuration for gossamer, supporting:
//! - Environment variables for all configurable values
//! - Defaults that keep existing recorded baselines comparable
//! - Parsers for the `WxH` screen size and `R,G,B` diff color formats
//!
//! # Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `GOSSAMER_DATA_DIR` | Base directory for recorded tests | `gossamer` |
//! | `GOSSAMER_BROWSER` | Browser identity stored with new recordings | `firefox` |
//! | `GOSSAMER_SCREENSIZE` | Window size for new recordings | `1024x768` |
//! | `GOSSAMER_DIFFCOLOR` | Color used to paint mismatched pixels | `0,255,0` |
//! | `GOSSAMER_SLEEP_FACTOR` | Multiplier applied to recorded step delays | `1.0` |
//! | `GOSSAMER_RMS_TOLERANCE` | Maximum RMS difference for identical screenshots | `573` |
//!
//! # Example
//!
//! ```bash
//! # Replay twice as fast as recorded
//! export GOSSAMER_SLEEP_FACTOR=0.5
//!
//! # Paint differences red
//! export GOSSAMER_DIFFCOLOR="255,0,0"
//! ```

use std::env;
use std::sync::OnceLock;

// ============================================================================
// Default Values
// ============================================================================

/// The only supported `record.json` schema version
pub const DATA_VERSION: u32 = 1;

/// Default base directory for recorded tests
pub const DEFAULT_DATA_DIR: &str = "gossamer";

/// Default browser identity
pub const DEFAULT_BROWSER: &str = "firefox";

/// Default window size
pub const DEFAULT_SCREENSIZE: &str = "1024x768";

/// Default diff color
pub const DEFAULT_DIFFCOLOR: &str = "0,255,0";

/// Default sleep factor between steps
pub const DEFAULT_SLEEP_FACTOR: f64 = 1.0;

/// Default RMS tolerance.
///
/// Empirical value on the reference histogram scale (see [`crate::images`]).
/// Changing it changes pass/fail outcomes for every existing baseline.
pub const DEFAULT_RMS_TOLERANCE: f64 = 573.0;

// ============================================================================
// Environment Variable Names
// ============================================================================

/// Environment variable for the data directory
pub const ENV_DATA_DIR: &str = "GOSSAMER_DATA_DIR";

/// Environment variable for the browser
pub const ENV_BROWSER: &str = "GOSSAMER_BROWSER";

/// Environment variable for the screen size
pub const ENV_SCREENSIZE: &str = "GOSSAMER_SCREENSIZE";

/// Environment variable for the diff color
pub const ENV_DIFFCOLOR: &str = "GOSSAMER_DIFFCOLOR";

/// Environment variable for the sleep factor
pub const ENV_SLEEP_FACTOR: &str = "GOSSAMER_SLEEP_FACTOR";

/// Environment variable for the RMS tolerance
pub const ENV_RMS_TOLERANCE: &str = "GOSSAMER_RMS_TOLERANCE";

// ============================================================================
// Configuration Getters (with caching)
// ============================================================================

static CONFIG: OnceLock<Config> = OnceLock::new();

/// Get the global configuration (initialized from environment on first access)
pub fn get() -> &'static Config {
    CONFIG.get_or_init(Config::from_env)
}

/// Centralized configuration for gossamer
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Base directory for recorded tests
    pub data_dir: String,
    /// Default values for new recordings
    pub defaults: RecordDefaults,
    /// Playback tuning
    pub playback: PlaybackSettings,
}

/// Values applied to new recordings when the caller gives none
#[derive(Debug, Clone, PartialEq)]
pub struct RecordDefaults {
    pub browser: String,
    pub screensize: (u32, u32),
    pub diffcolor: [u8; 3],
}

/// Playback tuning
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSettings {
    /// Multiplier applied to the recorded delay between steps
    pub sleep_factor: f64,
    /// Maximum RMS difference for two screenshots to count as identical
    pub rms_tolerance: f64,
}

impl Config {
    /// Create configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        Self {
            data_dir: env::var(ENV_DATA_DIR).unwrap_or_else(|_| DEFAULT_DATA_DIR.to_string()),
            defaults: RecordDefaults::from_env(),
            playback: PlaybackSettings::from_env(),
        }
    }

    /// Create configuration with all defaults (ignoring environment)
    pub fn defaults() -> Self {
        Self {
            data_dir: DEFAULT_DATA_DIR.to_string(),
            defaults: RecordDefaults::defaults(),
            playback: PlaybackSettings::defaults(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

impl RecordDefaults {
    pub fn from_env() -> Self {
        let fallback = Self::defaults();
        Self {
            browser: env::var(ENV_BROWSER).unwrap_or(fallback.browser),
            screensize: env::var(ENV_SCREENSIZE)
                .ok()
                .and_then(|s| parse_screensize(&s))
                .unwrap_or(fallback.screensize),
            diffcolor: env::var(ENV_DIFFCOLOR)
                .ok()
                .and_then(|s| parse_diffcolor(&s))
                .unwrap_or(fallback.diffcolor),
        }
    }

    pub fn defaults() -> Self {
        Self {
            browser: DEFAULT_BROWSER.to_string(),
            screensize: (1024, 768),
            diffcolor: [0, 255, 0],
        }
    }
}

impl PlaybackSettings {
    pub fn from_env() -> Self {
        Self {
            sleep_factor: env::var(ENV_SLEEP_FACTOR)
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|f: &f64| f.is_finite() && *f >= 0.0)
                .unwrap_or(DEFAULT_SLEEP_FACTOR),
            rms_tolerance: env::var(ENV_RMS_TOLERANCE)
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|f: &f64| f.is_finite() && *f >= 0.0)
                .unwrap_or(DEFAULT_RMS_TOLERANCE),
        }
    }

    pub fn defaults() -> Self {
        Self {
            sleep_factor: DEFAULT_SLEEP_FACTOR,
            rms_tolerance: DEFAULT_RMS_TOLERANCE,
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Parse a screen size string like `1024x768` into (width, height)
pub fn parse_screensize(size: &str) -> Option<(u32, u32)> {
    let (w, h) = size.trim().split_once('x')?;
    let w = w.trim().parse().ok()?;
    let h = h.trim().parse().ok()?;
    if w == 0 || h == 0 {
        return None;
    }
    Some((w, h))
}

/// Parse a diff color string like `0,255,0` into RGB components
pub fn parse_diffcolor(color: &str) -> Option<[u8; 3]> {
    let parts: Vec<&str> = color.split(',').collect();
    if parts.len() != 3 {
        return None;
    }
    let mut rgb = [0u8; 3];
    for (slot, part) in rgb.iter_mut().zip(parts) {
        *slot = part.trim().parse().ok()?;
    }
    Some(rgb)
}

/// Get the data directory (convenience function)
pub fn data_dir() -> String {
    get().data_dir.clone()
}

/// Get the RMS tolerance (convenience function)
pub fn rms_tolerance() -> f64 {
    get().playback.rms_tolerance
}

/// Get the default sleep factor (convenience function)
pub fn sleep_factor() -> f64 {
    get().playback.sleep_factor
}
