use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::Detection;
use crate::frame::Frame;

/// On-disk detection script: one detection list per frame.
///
/// ```json
/// { "frames": [
///     [],
///     [{ "label": "cup", "confidence": 0.9, "bbox": { "x1": 280, "y1": 200, "x2": 360, "y2": 320 } }]
/// ] }
/// ```
#[derive(Debug, Deserialize)]
pub struct DetectionScript {
    pub frames: Vec<Vec<Detection>>,
}

/// Backend that replays a fixed detection script, one entry per frame,
/// wrapping around at the end. Pixels are ignored.
pub struct ScriptedBackend {
    frames: Vec<Vec<Detection>>,
    cursor: usize,
}

impl ScriptedBackend {
    pub fn new(frames: Vec<Vec<Detection>>) -> Result<Self> {
        if frames.is_empty() {
            return Err(anyhow!("detection script must contain at least one frame"));
        }
        Ok(Self { frames, cursor: 0 })
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read detection script {}", path.display()))?;
        let script: DetectionScript = serde_json::from_str(&raw)
            .with_context(|| format!("invalid detection script {}", path.display()))?;
        log::info!(
            "ScriptedBackend: loaded {} frames from {}",
            script.frames.len(),
            path.display()
        );
        Self::new(script.frames)
    }
}

impl DetectorBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn detect(&mut self, _frame: &Frame) -> Result<Vec<Detection>> {
        let detections = self.frames[self.cursor].clone();
        self.cursor = (self.cursor + 1) % self.frames.len();
        Ok(detections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::result::BoundingBox;
    use std::io::Write;

    #[test]
    fn replays_and_wraps() -> Result<()> {
        let cup = Detection::new("cup", 0.9, BoundingBox::new(280, 200, 360, 320));
        let mut backend = ScriptedBackend::new(vec![vec![], vec![cup.clone()]])?;
        let frame = Frame::from_rgb(vec![0u8; 12], 2, 2)?;

        assert!(backend.detect(&frame)?.is_empty());
        assert_eq!(backend.detect(&frame)?, vec![cup]);
        assert!(backend.detect(&frame)?.is_empty());
        Ok(())
    }

    #[test]
    fn rejects_empty_script() {
        assert!(ScriptedBackend::new(Vec::new()).is_err());
    }

    #[test]
    fn loads_script_from_json_file() -> Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        write!(
            file,
            r#"{{ "frames": [[{{ "label": "person", "confidence": 0.8,
                 "bbox": {{ "x1": 250, "y1": 20, "x2": 390, "y2": 470 }} }}]] }}"#
        )?;

        let mut backend = ScriptedBackend::from_path(file.path())?;
        let frame = Frame::from_rgb(vec![0u8; 12], 2, 2)?;
        let detections = backend.detect(&frame)?;
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].label, "person");
        assert_eq!(detections[0].bbox.height(), 450);
        Ok(())
    }
}
