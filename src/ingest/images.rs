//! Still-image directory source.
//!
//! Plays the JPEG/PNG files of a local directory in file-name order, one frame
//! per image, then ends the stream. Handy for bench-testing a detector model
//! against recorded scenes. Images are decoded in memory only.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};

use super::{FrameSource, SourceStats};
use crate::frame::Frame;

const EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

pub struct ImageDirSource {
    dir: PathBuf,
    files: Vec<PathBuf>,
    cursor: usize,
    last_error: Option<String>,
}

impl ImageDirSource {
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.is_dir() {
            return Err(anyhow!("image source {} is not a directory", dir.display()));
        }
        Ok(Self {
            dir,
            files: Vec::new(),
            cursor: 0,
            last_error: None,
        })
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

impl FrameSource for ImageDirSource {
    fn connect(&mut self) -> Result<()> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(&self.dir)
            .with_context(|| format!("read image directory {}", self.dir.display()))?
        {
            let path = entry?.path();
            if path.is_file() && has_image_extension(&path) {
                files.push(path);
            }
        }
        files.sort();
        if files.is_empty() {
            return Err(anyhow!("no images found in {}", self.dir.display()));
        }
        log::info!(
            "ImageDirSource: connected to {} ({} images)",
            self.dir.display(),
            files.len()
        );
        self.files = files;
        self.cursor = 0;
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        let Some(path) = self.files.get(self.cursor) else {
            return Ok(None);
        };
        self.cursor += 1;
        let image = image::open(path)
            .map_err(|err| {
                self.last_error = Some(err.to_string());
                err
            })
            .with_context(|| format!("decode image {}", path.display()))?
            .to_rgb8();
        let (width, height) = image.dimensions();
        Frame::from_rgb(image.into_raw(), width, height).map(Some)
    }

    fn is_healthy(&self) -> bool {
        self.last_error.is_none()
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.cursor as u64,
            origin: self.dir.display().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plays_images_in_name_order() -> Result<()> {
        let dir = tempfile::tempdir()?;
        image::RgbImage::from_pixel(8, 6, image::Rgb([10, 10, 10])).save(dir.path().join("b.png"))?;
        image::RgbImage::from_pixel(8, 6, image::Rgb([200, 200, 200]))
            .save(dir.path().join("a.png"))?;
        std::fs::write(dir.path().join("notes.txt"), "not an image")?;

        let mut source = ImageDirSource::new(dir.path())?;
        source.connect()?;

        let first = source.next_frame()?.expect("first frame");
        assert!(first.mean_brightness() > 150.0);
        let second = source.next_frame()?.expect("second frame");
        assert!(second.mean_brightness() < 40.0);
        assert_eq!((second.width, second.height), (8, 6));
        assert!(source.next_frame()?.is_none());
        assert_eq!(source.stats().frames_captured, 2);
        Ok(())
    }

    #[test]
    fn empty_directory_fails_to_connect() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut source = ImageDirSource::new(dir.path())?;
        assert!(source.connect().is_err());
        Ok(())
    }
}
