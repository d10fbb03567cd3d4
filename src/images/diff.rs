//! Screenshot similarity test and diff visualization.

use image::{ColorType, ImageFormat};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::mode::PixelMode;
use super::types::{DiffError, DiffResult, DiffSummary};
use crate::config;

/// A decoded raster in its stored channel layout
#[derive(Debug, Clone)]
struct Raster {
    path: PathBuf,
    mode: PixelMode,
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Raster {
    fn open(path: &Path) -> DiffResult<Self> {
        let bytes = fs::read(path).map_err(|source| DiffError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let img = image::load_from_memory(&bytes).map_err(|source| DiffError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
        let mode = PixelMode::from_png_header(&bytes).unwrap_or_else(|| PixelMode::from_decoded(&img));

        // 16-bit samples are reduced to 8 bits here
        let data = match mode {
            PixelMode::Bilevel | PixelMode::Grey => img.to_luma8().into_raw(),
            PixelMode::GreyAlpha => img.to_luma_alpha8().into_raw(),
            PixelMode::Rgb | PixelMode::Palette => img.to_rgb8().into_raw(),
            PixelMode::Rgba => img.to_rgba8().into_raw(),
        };

        Ok(Self {
            path: path.to_path_buf(),
            mode,
            width: img.width(),
            height: img.height(),
            data,
        })
    }

    fn pixels(&self) -> std::slice::ChunksExact<'_, u8> {
        self.data.chunks_exact(self.mode.channels())
    }
}

/// The image diff engine.
///
/// Holds the RMS tolerance used by [`ImageDiff::images_identical`]. The RMS
/// value is computed on the reference histogram scale: colour bands of the
/// difference image are histogrammed back to back (band `b` owns buckets
/// `256*b..256*b+255`) and every bucket contributes `count * index²`. Identical
/// greyscale images score 0, identical colour images score the band offset
/// floor of about 572.4, and the default tolerance of 573 sits just above it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageDiff {
    tolerance: f64,
}

impl Default for ImageDiff {
    fn default() -> Self {
        Self::new(config::rms_tolerance())
    }
}

impl ImageDiff {
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// RMS difference between two screenshots on disk
    pub fn rms_diff(&self, baseline: &Path, candidate: &Path) -> DiffResult<f64> {
        let (a, b) = open_pair(baseline, candidate)?;
        Ok(rms(&a, &b))
    }

    /// Whether two screenshots match within tolerance
    pub fn images_identical(&self, baseline: &Path, candidate: &Path) -> DiffResult<bool> {
        let rms = self.rms_diff(baseline, candidate)?;
        debug!(
            baseline = %baseline.display(),
            candidate = %candidate.display(),
            rms,
            tolerance = self.tolerance,
            "compared screenshots"
        );
        Ok(rms <= self.tolerance)
    }

    /// Paint every pixel where `candidate` differs from `baseline` and save
    /// the result to `outpath`.
    ///
    /// Greyscale images are painted white, RGB images with `diffcolor` and
    /// RGBA images with `diffcolor` at full opacity.
    ///
    /// Comparison and output work at 8 bits per channel. 16-bit screenshots
    /// are reduced to 8 bits before comparing, and the diff is written as an
    /// 8-bit image. Bilevel input is written back as 8-bit greyscale.
    pub fn image_diff(
        &self,
        baseline: &Path,
        candidate: &Path,
        outpath: &Path,
        diffcolor: [u8; 3],
    ) -> DiffResult<DiffSummary> {
        let (a, mut b) = open_pair(baseline, candidate)?;

        let (value, color_type): (Vec<u8>, ColorType) = match a.mode {
            PixelMode::Bilevel | PixelMode::Grey => (vec![255], ColorType::L8),
            PixelMode::Rgb => (diffcolor.to_vec(), ColorType::Rgb8),
            PixelMode::Rgba => (vec![diffcolor[0], diffcolor[1], diffcolor[2], 255], ColorType::Rgba8),
            PixelMode::Palette => return Err(DiffError::PaletteUnsupported { path: a.path }),
            mode @ PixelMode::GreyAlpha => return Err(DiffError::UnsupportedMode { path: a.path, mode }),
        };

        let rms = rms(&a, &b);
        debug!(rms, "rmsdiff");

        let channels = a.mode.channels();
        let mut painted = 0usize;
        for (pa, pb) in a.pixels().zip(b.data.chunks_exact_mut(channels)) {
            if pa != &pb[..] {
                pb.copy_from_slice(&value);
                painted += 1;
            }
        }

        image::save_buffer_with_format(outpath, &b.data, b.width, b.height, color_type, ImageFormat::Png)
            .map_err(|source| DiffError::Encode {
                path: outpath.to_path_buf(),
                source,
            })?;
        debug!(outpath = %outpath.display(), painted, "wrote diff image");

        Ok(DiffSummary {
            rms,
            width: b.width,
            height: b.height,
        })
    }
}

/// Load both images and reject mismatched modes or sizes before any pixel work
fn open_pair(baseline: &Path, candidate: &Path) -> DiffResult<(Raster, Raster)> {
    let a = Raster::open(baseline)?;
    let b = Raster::open(candidate)?;

    if a.mode != b.mode {
        return Err(DiffError::IncompatibleModes {
            baseline: a.path,
            baseline_mode: a.mode,
            candidate: b.path,
            candidate_mode: b.mode,
        });
    }
    if (a.width, a.height) != (b.width, b.height) {
        return Err(DiffError::IncompatibleDimensions {
            baseline: a.path,
            baseline_size: (a.width, a.height),
            candidate: b.path,
            candidate_size: (b.width, b.height),
        });
    }
    Ok((a, b))
}

fn rms(a: &Raster, b: &Raster) -> f64 {
    let pixel_count = u64::from(a.width) * u64::from(a.height);
    if pixel_count == 0 {
        return 0.0;
    }

    let bands = a.mode.color_bands();
    let mut histogram = vec![0u64; 256 * bands];
    for (pa, pb) in a.pixels().zip(b.pixels()) {
        for band in 0..bands {
            let delta = pa[band].abs_diff(pb[band]);
            histogram[band * 256 + usize::from(delta)] += 1;
        }
    }

    let sum_of_squares: f64 = histogram
        .iter()
        .enumerate()
        .map(|(idx, &count)| count as f64 * (idx as f64).powi(2))
        .sum();
    (sum_of_squares / pixel_count as f64).sqrt()
}
