//! Presentation sinks
//!
//! Handlers push images and text to a [`DataPresentation`]. On a board this is
//! the LCD; here the provided sink writes to the log and can optionally dump
//! every presented image as a binary PNM file for inspection.

use crate::error::Result;
use crate::image::ImageFrame;
use std::fs;
use std::path::PathBuf;
use strum::{Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumString, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Color {
    #[default]
    Black,
    White,
    Green,
    Red,
}

/// Display-like output surface
pub trait DataPresentation {
    fn clear(&mut self, color: Color) -> Result<()>;

    /// Show `image` with its top-left corner at `(x, y)`
    fn present_image(&mut self, image: &ImageFrame, x: usize, y: usize) -> Result<()>;

    fn present_text(&mut self, text: &str, x: usize, y: usize) -> Result<()>;

    fn set_text_color(&mut self, color: Color) -> Result<()>;
}

/// Sink that reports everything through the `log` facade
#[derive(Debug, Default)]
pub struct LogPresentation {
    text_color: Color,
    output_dir: Option<PathBuf>,
    images_written: usize,
}

impl LogPresentation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also write each presented image to `dir` as `frame_NNNN.pgm`/`.ppm`
    pub fn with_output_dir(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            output_dir: Some(dir),
            ..Self::default()
        })
    }

    pub fn images_written(&self) -> usize {
        self.images_written
    }
}

impl DataPresentation for LogPresentation {
    fn clear(&mut self, color: Color) -> Result<()> {
        log::debug!("display: clear ({})", color);
        Ok(())
    }

    fn present_image(&mut self, image: &ImageFrame, x: usize, y: usize) -> Result<()> {
        log::debug!(
            "display: {}x{}x{} image at ({}, {})",
            image.width,
            image.height,
            image.channels,
            x,
            y
        );
        if let Some(dir) = &self.output_dir {
            let (magic, ext) = match image.channels {
                1 => ("P5", "pgm"),
                3 => ("P6", "ppm"),
                other => {
                    log::warn!("display: cannot dump {}-channel image", other);
                    return Ok(());
                }
            };
            let path = dir.join(format!("frame_{:04}.{}", self.images_written, ext));
            let mut bytes = format!("{}\n{} {}\n255\n", magic, image.width, image.height).into_bytes();
            bytes.extend_from_slice(&image.data);
            fs::write(&path, bytes)?;
            log::info!("display: wrote {}", path.display());
            self.images_written += 1;
        }
        Ok(())
    }

    fn present_text(&mut self, text: &str, x: usize, y: usize) -> Result<()> {
        let text = text.trim();
        if !text.is_empty() {
            log::info!("display [{} @ {},{}]: {}", self.text_color, x, y, text);
        }
        Ok(())
    }

    fn set_text_color(&mut self, color: Color) -> Result<()> {
        self.text_color = color;
        Ok(())
    }
}
