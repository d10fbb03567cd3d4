//! In-memory browser for tests and fixture generation.
//!
//! `MockBrowser` implements [`Browser`] on top of an RGB framebuffer:
//! - `execute_script()` records every script it is given
//! - `find_element()` resolves against elements registered with `add_element()`
//! - `send_keys()` renders the typed text into the element's rectangle, `clear()` empties it
//! - `save_screenshot()` writes the framebuffer as an RGB or RGBA PNG
//!
//! Scripts and screenshots can be made to fail to exercise driver faults.

use font8x8::{BASIC_FONTS, UnicodeFonts};
use image::{DynamicImage, ImageBuffer, RgbImage};
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use super::types::{Browser, BrowserError, BrowserResult, Element, Locator};

/// An element registered on the mock page
#[derive(Debug, Clone)]
struct MockElement {
    locator: Locator,
    x: u32,
    y: u32,
    width: u32,
    height: u32,
    text: String,
}

/// A framebuffer-backed [`Browser`] double
#[derive(Debug, Clone)]
pub struct MockBrowser {
    /// Width in pixels
    width: u32,
    /// Height in pixels
    height: u32,
    /// RGB pixel buffer (row-major, 3 bytes per pixel)
    buffer: Vec<u8>,
    /// Write RGBA screenshots instead of RGB
    alpha: bool,
    elements: Vec<MockElement>,
    scripts: Vec<String>,
    screenshots: Vec<PathBuf>,
    fail_scripts: bool,
    fail_screenshots: bool,
}

impl MockBrowser {
    /// Create a new page with the given dimensions, initialized to white
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_color(width, height, [255, 255, 255])
    }

    /// Create a page initialized to a specific color
    pub fn with_color(width: u32, height: u32, color: [u8; 3]) -> Self {
        let mut browser = Self {
            width,
            height,
            buffer: vec![0u8; (width * height * 3) as usize],
            alpha: false,
            elements: Vec::new(),
            scripts: Vec::new(),
            screenshots: Vec::new(),
            fail_scripts: false,
            fail_screenshots: false,
        };
        browser.fill(color);
        browser
    }

    /// Write RGBA screenshots (fully opaque) instead of RGB
    pub fn rgba(mut self, alpha: bool) -> Self {
        self.alpha = alpha;
        self
    }

    /// Make every subsequent `execute_script` call fail
    pub fn fail_scripts(&mut self, fail: bool) {
        self.fail_scripts = fail;
    }

    /// Make every subsequent `save_screenshot` call fail
    pub fn fail_screenshots(&mut self, fail: bool) {
        self.fail_screenshots = fail;
    }

    /// Register an element occupying the given rectangle
    pub fn add_element(&mut self, locator: Locator, x: u32, y: u32, width: u32, height: u32) {
        self.elements.push(MockElement {
            locator,
            x,
            y,
            width,
            height,
            text: String::new(),
        });
    }

    /// Text typed into the element matching `locator` so far
    pub fn element_text(&self, locator: &Locator) -> Option<&str> {
        self.elements
            .iter()
            .find(|e| &e.locator == locator)
            .map(|e| e.text.as_str())
    }

    /// Every script executed, in order
    pub fn scripts(&self) -> &[String] {
        &self.scripts
    }

    /// Every screenshot path written, in order
    pub fn screenshots(&self) -> &[PathBuf] {
        &self.screenshots
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Fill the entire page with a color
    pub fn fill(&mut self, color: [u8; 3]) {
        for chunk in self.buffer.chunks_exact_mut(3) {
            chunk.copy_from_slice(&color);
        }
    }

    /// Draw a filled rectangle
    pub fn draw_rect(&mut self, x: u32, y: u32, w: u32, h: u32, color: [u8; 3]) {
        for py in y..(y + h).min(self.height) {
            for px in x..(x + w).min(self.width) {
                self.set_pixel(px, py, color);
            }
        }
    }

    /// Draw text using font8x8 glyphs
    ///
    /// Each character is 8x8 pixels. Text does not wrap.
    pub fn draw_text(&mut self, x: u32, y: u32, text: &str, fg: [u8; 3], bg: [u8; 3]) {
        let mut cursor_x = x;
        for ch in text.chars() {
            if cursor_x >= self.width {
                break;
            }
            self.draw_char(cursor_x, y, ch, fg, bg);
            cursor_x += 8;
        }
    }

    fn draw_char(&mut self, x: u32, y: u32, ch: char, fg: [u8; 3], bg: [u8; 3]) {
        let glyph = BASIC_FONTS.get(ch).unwrap_or([0u8; 8]);
        for (row_idx, row) in glyph.iter().enumerate() {
            let py = y + row_idx as u32;
            if py >= self.height {
                break;
            }
            for bit in 0..8 {
                let px = x + bit;
                if px >= self.width {
                    break;
                }
                // font8x8 stores LSB as leftmost pixel
                let color = if (row >> bit) & 1 == 1 { fg } else { bg };
                self.set_pixel(px, py, color);
            }
        }
    }

    /// Get the color of a pixel
    pub fn get_pixel(&self, x: u32, y: u32) -> [u8; 3] {
        if x >= self.width || y >= self.height {
            return [0, 0, 0];
        }
        let idx = ((y * self.width + x) * 3) as usize;
        [self.buffer[idx], self.buffer[idx + 1], self.buffer[idx + 2]]
    }

    /// Set the color of a pixel
    pub fn set_pixel(&mut self, x: u32, y: u32, color: [u8; 3]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let idx = ((y * self.width + x) * 3) as usize;
        self.buffer[idx..idx + 3].copy_from_slice(&color);
    }

    /// Encode the page as PNG bytes
    pub fn to_png(&self) -> BrowserResult<Vec<u8>> {
        let rgb: RgbImage = ImageBuffer::from_raw(self.width, self.height, self.buffer.clone())
            .ok_or_else(|| BrowserError::Driver("framebuffer size mismatch".to_string()))?;
        let img = if self.alpha {
            DynamicImage::ImageRgba8(DynamicImage::ImageRgb8(rgb).to_rgba8())
        } else {
            DynamicImage::ImageRgb8(rgb)
        };

        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .map_err(|e| BrowserError::Driver(format!("Failed to encode PNG: {}", e)))?;
        Ok(bytes)
    }

    fn render_element(&mut self, index: usize) {
        let element = self.elements[index].clone();
        self.draw_rect(element.x, element.y, element.width, element.height, [255, 255, 255]);
        let visible: String = element.text.chars().take((element.width / 8) as usize).collect();
        self.draw_text(element.x, element.y, &visible, [0, 0, 0], [255, 255, 255]);
    }
}

/// Element handle borrowed from a [`MockBrowser`]
struct MockElementHandle<'a> {
    browser: &'a mut MockBrowser,
    index: usize,
}

impl Element for MockElementHandle<'_> {
    fn clear(&mut self) -> BrowserResult<()> {
        self.browser.elements[self.index].text.clear();
        self.browser.render_element(self.index);
        Ok(())
    }

    fn send_keys(&mut self, text: &str) -> BrowserResult<()> {
        self.browser.elements[self.index].text.push_str(text);
        self.browser.render_element(self.index);
        Ok(())
    }
}

impl Browser for MockBrowser {
    fn execute_script(&mut self, script: &str) -> BrowserResult<serde_json::Value> {
        if self.fail_scripts {
            return Err(BrowserError::Driver("script execution failed".to_string()));
        }
        self.scripts.push(script.to_string());
        Ok(serde_json::Value::Null)
    }

    fn find_element(&mut self, locator: &Locator) -> BrowserResult<Box<dyn Element + '_>> {
        let index = self
            .elements
            .iter()
            .position(|e| &e.locator == locator)
            .ok_or_else(|| BrowserError::ElementNotFound(locator.clone()))?;
        Ok(Box::new(MockElementHandle {
            browser: self,
            index,
        }))
    }

    fn save_screenshot(&mut self, path: &Path) -> BrowserResult<()> {
        if self.fail_screenshots {
            return Err(BrowserError::Driver("screenshot capture failed".to_string()));
        }
        let png = self.to_png()?;
        fs::write(path, png)?;
        self.screenshots.push(path.to_path_buf());
        Ok(())
    }
}
