use anyhow::Result;

use crate::detect::result::Detection;
use crate::frame::Frame;

/// Object detector backend.
///
/// The detector is an opaque oracle: given a frame it returns a finite list of
/// detections in its own output order. That order matters downstream (the
/// arbiter announces the first in-focus detection), so backends must not
/// shuffle it.
///
/// Implementations must treat the frame pixels as read-only and must not keep
/// them past the `detect` call.
pub trait DetectorBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run detection on a frame. Blocking is expected; it gates the pipeline.
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
