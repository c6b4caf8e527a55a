//! Frame sources.
//!
//! - Synthetic scenes (`stub://name`), always available
//! - Directories of still images (feature: ingest-images)
//! - USB/V4L2 cameras (feature: ingest-v4l2)
//!
//! Every source hands out owned `Frame`s stamped with their capture instant.
//! `next_frame` returns `Ok(None)` at end of stream; an `Err` is a hard
//! failure. Both end the session.
//!
//! Sources MUST NOT store frames to disk or log pixel content.

#[cfg(feature = "ingest-images")]
pub mod images;
#[cfg(feature = "ingest-v4l2")]
mod normalize;
pub mod synthetic;
#[cfg(feature = "ingest-v4l2")]
pub mod v4l2;

use anyhow::Result;

use crate::config::CameraSettings;
use crate::frame::Frame;

#[cfg(feature = "ingest-images")]
pub use images::ImageDirSource;
pub use synthetic::{SyntheticConfig, SyntheticSource};
#[cfg(feature = "ingest-v4l2")]
pub use v4l2::{V4l2Config, V4l2Source};

/// Statistics for a frame source.
#[derive(Clone, Debug)]
pub struct SourceStats {
    pub frames_captured: u64,
    pub origin: String,
}

pub trait FrameSource {
    /// Open the underlying device or stream.
    fn connect(&mut self) -> Result<()>;

    /// Capture the next frame, or `None` once the stream has ended.
    fn next_frame(&mut self) -> Result<Option<Frame>>;

    fn is_healthy(&self) -> bool;

    fn stats(&self) -> SourceStats;
}

/// Build the source named by `settings.source`.
///
/// - `stub://...` synthetic scene
/// - `/dev/video*` V4L2 device
/// - any other local path: directory of images
pub fn open_source(settings: &CameraSettings) -> Result<Box<dyn FrameSource>> {
    let uri = settings.source.trim();
    if uri.starts_with("stub://") {
        let config = SyntheticConfig::from_url(uri, settings.width, settings.height)?;
        return Ok(Box::new(SyntheticSource::new(config)));
    }
    if uri.contains("://") {
        anyhow::bail!("unsupported frame source '{}': only local sources are allowed", uri);
    }
    if uri.starts_with("/dev/video") {
        #[cfg(feature = "ingest-v4l2")]
        {
            return Ok(Box::new(V4l2Source::new(V4l2Config {
                device: uri.to_string(),
                target_fps: settings.target_fps,
                width: settings.width,
                height: settings.height,
            })?));
        }
        #[cfg(not(feature = "ingest-v4l2"))]
        {
            anyhow::bail!("camera capture requires the ingest-v4l2 feature");
        }
    }
    #[cfg(feature = "ingest-images")]
    {
        Ok(Box::new(ImageDirSource::new(uri)?))
    }
    #[cfg(not(feature = "ingest-images"))]
    {
        anyhow::bail!("image directory sources require the ingest-images feature")
    }
}
