//! Synthetic frame source (`stub://`).
//!
//! Produces mid-gray frames with a little noise, optionally dimming to a dark
//! scene on a fixed period so the low-light channel can be exercised without a
//! camera. Query parameters:
//!
//! - `frames=N`: end the stream after N frames (default: never)
//! - `dark_every=K`: every K-th frame, and the K/2 frames after it, are dark
//!
//! Example: `stub://hallway?frames=300&dark_every=100`.

use anyhow::{anyhow, Result};
use rand::Rng;

use super::{FrameSource, SourceStats};
use crate::frame::{rgb_len, Frame};

const BRIGHT_LEVEL: u8 = 128;
const DARK_LEVEL: u8 = 12;
const NOISE: u8 = 6;

#[derive(Clone, Debug, PartialEq)]
pub struct SyntheticConfig {
    pub url: String,
    pub width: u32,
    pub height: u32,
    pub frame_limit: Option<u64>,
    pub dark_every: Option<u64>,
}

impl SyntheticConfig {
    pub fn from_url(url: &str, width: u32, height: u32) -> Result<Self> {
        let rest = url
            .strip_prefix("stub://")
            .ok_or_else(|| anyhow!("synthetic source URL must start with stub://"))?;
        let mut config = Self {
            url: url.to_string(),
            width,
            height,
            frame_limit: None,
            dark_every: None,
        };
        let Some((_, query)) = rest.split_once('?') else {
            return Ok(config);
        };
        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| anyhow!("malformed query parameter '{}' in {}", pair, url))?;
            let parsed: u64 = value
                .parse()
                .map_err(|_| anyhow!("{} must be an integer in {}", key, url))?;
            match key {
                "frames" => config.frame_limit = Some(parsed),
                "dark_every" if parsed > 0 => config.dark_every = Some(parsed),
                "dark_every" => return Err(anyhow!("dark_every must be at least 1")),
                other => return Err(anyhow!("unknown parameter '{}' in {}", other, url)),
            }
        }
        Ok(config)
    }
}

pub struct SyntheticSource {
    config: SyntheticConfig,
    frame_count: u64,
}

impl SyntheticSource {
    pub fn new(config: SyntheticConfig) -> Self {
        Self {
            config,
            frame_count: 0,
        }
    }

    fn is_dark_frame(&self, index: u64) -> bool {
        match self.config.dark_every {
            Some(period) => index % period < (period / 2).max(1) && index >= period,
            None => false,
        }
    }

    fn generate_pixels(&self, level: u8) -> Result<Vec<u8>> {
        let len = rgb_len(self.config.width, self.config.height)?;
        let mut rng = rand::thread_rng();
        let pixels = (0..len)
            .map(|_| level.saturating_add(rng.gen_range(0..=NOISE)))
            .collect();
        Ok(pixels)
    }
}

impl FrameSource for SyntheticSource {
    /// Synthetic sources are always "connected".
    fn connect(&mut self) -> Result<()> {
        log::info!("SyntheticSource: connected to {}", self.config.url);
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self
            .config
            .frame_limit
            .is_some_and(|limit| self.frame_count >= limit)
        {
            return Ok(None);
        }
        let level = if self.is_dark_frame(self.frame_count) {
            DARK_LEVEL
        } else {
            BRIGHT_LEVEL
        };
        self.frame_count += 1;
        let pixels = self.generate_pixels(level)?;
        Frame::from_rgb(pixels, self.config.width, self.config.height).map(Some)
    }

    fn is_healthy(&self) -> bool {
        true
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            origin: self.config.url.clone(),
        }
    }
}
