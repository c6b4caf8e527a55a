//! Captured frames.
//!
//! A `Frame` owns one RGB24 image for the duration of a single pipeline pass.
//! Frames are never written to disk, logged, or kept past the frame they were
//! captured for; the pixel buffer is zeroized when the frame is dropped.

use anyhow::{anyhow, Result};
use std::time::Instant;
use zeroize::Zeroize;

/// One captured RGB24 frame.
pub struct Frame {
    /// Interleaved RGB pixels, row-major.
    pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Monotonic capture time. The decision engine reads its clock from here.
    pub captured_at: Instant,
}

impl Frame {
    /// Wrap an RGB24 buffer captured now.
    pub fn from_rgb(pixels: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        Self::from_rgb_at(pixels, width, height, Instant::now())
    }

    pub fn from_rgb_at(
        pixels: Vec<u8>,
        width: u32,
        height: u32,
        captured_at: Instant,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(anyhow!("frame dimensions must be non-zero"));
        }
        let expected = rgb_len(width, height)?;
        if pixels.len() != expected {
            return Err(anyhow!(
                "RGB frame length mismatch: expected {}, got {}",
                expected,
                pixels.len()
            ));
        }
        Ok(Self {
            pixels,
            width,
            height,
            captured_at,
        })
    }

    /// Read-only pixel access for detector backends.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Mean grayscale intensity in [0, 255].
    ///
    /// Uses BT.601 luma weights, the same conversion camera stacks use for BGR→GRAY.
    pub fn mean_brightness(&self) -> f32 {
        mean_luma(&self.pixels)
    }
}

impl Drop for Frame {
    fn drop(&mut self) {
        self.pixels.zeroize();
    }
}

pub(crate) fn rgb_len(width: u32, height: u32) -> Result<usize> {
    width
        .checked_mul(height)
        .and_then(|v| v.checked_mul(3))
        .map(|v| v as usize)
        .ok_or_else(|| anyhow!("RGB frame dimensions overflow"))
}

fn mean_luma(rgb: &[u8]) -> f32 {
    let pixel_count = rgb.len() / 3;
    if pixel_count == 0 {
        return 0.0;
    }
    let sum: f64 = rgb
        .chunks_exact(3)
        .map(|px| 0.299 * px[0] as f64 + 0.587 * px[1] as f64 + 0.114 * px[2] as f64)
        .sum();
    (sum / pixel_count as f64) as f32
}
