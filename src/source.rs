//! Image sources
//!
//! Handlers fetch input images by index through [`ImageSource`]. The
//! directory-backed source reads raw interleaved RGB files of a fixed size,
//! which is what the detection model consumes without any decoding step.

use crate::error::{EdgeError, Result};
use crate::image::ImageFrame;
use std::fs;
use std::path::{Path, PathBuf};

/// Indexed collection of fixed-size images
pub trait ImageSource {
    fn count(&self) -> usize;

    fn name(&self, index: usize) -> Option<&str>;

    fn image(&self, index: usize) -> Result<ImageFrame>;
}

/// Raw RGB files (`*.rgb`, `*.raw`) in a directory, sorted by file name
#[derive(Debug)]
pub struct RawImageDir {
    width: usize,
    height: usize,
    files: Vec<(String, PathBuf)>,
}

impl RawImageDir {
    const EXTENSIONS: [&'static str; 2] = ["rgb", "raw"];

    pub fn open(dir: impl AsRef<Path>, width: usize, height: usize) -> Result<Self> {
        let dir = dir.as_ref();
        let mut files = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            let matches = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| Self::EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
                .unwrap_or(false);
            if !matches || !path.is_file() {
                continue;
            }
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            files.push((name, path));
        }
        files.sort_by(|a, b| a.0.cmp(&b.0));

        if files.is_empty() {
            return Err(EdgeError::InvalidInput(format!(
                "no .rgb or .raw images in {}",
                dir.display()
            )));
        }
        log::info!("Found {} images in {}", files.len(), dir.display());

        Ok(Self {
            width,
            height,
            files,
        })
    }

    pub fn image_size(&self) -> usize {
        self.width * self.height * 3
    }
}

impl ImageSource for RawImageDir {
    fn count(&self) -> usize {
        self.files.len()
    }

    fn name(&self, index: usize) -> Option<&str> {
        self.files.get(index).map(|(name, _)| name.as_str())
    }

    fn image(&self, index: usize) -> Result<ImageFrame> {
        let (name, path) = self.files.get(index).ok_or_else(|| {
            EdgeError::InvalidInput(format!(
                "image index {} out of range ({} images)",
                index,
                self.files.len()
            ))
        })?;
        let data = fs::read(path)?;
        if data.len() != self.image_size() {
            log::error!("{}: expected {} bytes, got {}", name, self.image_size(), data.len());
            return Err(EdgeError::InvalidInputSize {
                expected: self.image_size(),
                actual: data.len(),
            });
        }
        ImageFrame::new(self.width, self.height, 3, data)
    }
}
