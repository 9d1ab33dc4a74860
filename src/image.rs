//! Image buffer helpers
//!
//! Raw, uncompressed, row-major images with interleaved channels. Only the
//! conversions the detection pipeline needs live here.

use crate::error::{EdgeError, Result};

/// Owned raw image
#[derive(Debug, Clone, PartialEq)]
pub struct ImageFrame {
    pub width: usize,
    pub height: usize,
    pub channels: usize,
    pub data: Vec<u8>,
}

impl ImageFrame {
    pub fn new(width: usize, height: usize, channels: usize, data: Vec<u8>) -> Result<Self> {
        let expected = width * height * channels;
        if data.len() != expected {
            return Err(EdgeError::InvalidInputSize {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    /// All-black image
    pub fn blank(width: usize, height: usize, channels: usize) -> Self {
        Self {
            width,
            height,
            channels,
            data: vec![0; width * height * channels],
        }
    }

    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    /// Single-channel copy of an RGB frame; other frames are cloned
    pub fn to_grayscale(&self) -> Self {
        if self.channels != 3 {
            return self.clone();
        }
        let mut gray = vec![0u8; self.pixel_count()];
        rgb_to_grayscale(&self.data, &mut gray);
        Self {
            width: self.width,
            height: self.height,
            channels: 1,
            data: gray,
        }
    }
}

/// Luma of interleaved RGB pixels, `0.299 R + 0.587 G + 0.114 B`.
///
/// Converts `min(src.len() / 3, dst.len())` pixels and returns that count.
pub fn rgb_to_grayscale(src: &[u8], dst: &mut [u8]) -> usize {
    let mut written = 0;
    for (rgb, out) in src.chunks_exact(3).zip(dst.iter_mut()) {
        let luma = 0.299 * rgb[0] as f32 + 0.587 * rgb[1] as f32 + 0.114 * rgb[2] as f32;
        *out = luma.round().clamp(0.0, 255.0) as u8;
        written += 1;
    }
    written
}

/// Shift unsigned pixels into the signed range in place.
///
/// Each byte afterwards reads as the `i8` value `x - 128`.
pub fn convert_img_to_int8(data: &mut [u8]) {
    for byte in data.iter_mut() {
        *byte = byte.wrapping_sub(128);
    }
}

/// Outline a box on `frame` with a 2-pixel wide 0xFF border.
///
/// Coordinates are in pixels and may extend past the frame; anything outside
/// is skipped.
pub fn draw_box_on_image(frame: &mut ImageFrame, x0: i32, y0: i32, w: i32, h: i32) {
    const LINE_WIDTH: i32 = 2;
    if w <= 0 || h <= 0 {
        return;
    }
    let x1 = x0 + w - 1;
    let y1 = y0 + h - 1;

    for t in 0..LINE_WIDTH {
        for x in x0..=x1 {
            set_white(frame, x, y0 + t);
            set_white(frame, x, y1 - t);
        }
        for y in y0..=y1 {
            set_white(frame, x0 + t, y);
            set_white(frame, x1 - t, y);
        }
    }
}

fn set_white(frame: &mut ImageFrame, x: i32, y: i32) {
    if x < 0 || y < 0 || x as usize >= frame.width || y as usize >= frame.height {
        return;
    }
    let start = (y as usize * frame.width + x as usize) * frame.channels;
    frame.data[start..start + frame.channels].fill(0xFF);
}
