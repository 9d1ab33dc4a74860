//! Object detection application
//!
//! For each image: grayscale it into the model input (shifted to signed when
//! the input is int8), run the detector, decode both output branches, draw
//! the resulting boxes on a presentation copy of the image and report them.

use super::{next_index, run_inference, select_index};
use crate::arena::TensorArena;
use crate::detection::{DetectionResult, DetectorPostProcessing};
use crate::error::{EdgeError, Result};
use crate::image::{convert_img_to_int8, draw_box_on_image, rgb_to_grayscale, ImageFrame};
use crate::models::{ensure_inited, Model};
use crate::presentation::{Color, DataPresentation};
use crate::profiler::Profiler;
use crate::source::ImageSource;
use crate::tensor::DataType;

const IMAGE_START_X: usize = 10;
const IMAGE_START_Y: usize = 35;
const TEXT_START_X: usize = 150;
const TEXT_START_Y: usize = 40;
const RUNNING_TEXT: &str = "Running inference... ";

/// Detections for one image
#[derive(Debug, Clone)]
pub struct ImageDetections {
    pub index: usize,
    pub name: String,
    pub results: Vec<DetectionResult>,
}

pub struct ObjectDetectionHandler<'a> {
    model: &'a mut dyn Model,
    source: &'a dyn ImageSource,
    presentation: &'a mut dyn DataPresentation,
    post_processing: &'a DetectorPostProcessing,
    profiler: &'a mut Profiler,
    arena: &'a mut TensorArena,
    presentation_channels: usize,
    img_index: usize,
}

impl<'a> ObjectDetectionHandler<'a> {
    pub fn new(
        model: &'a mut dyn Model,
        source: &'a dyn ImageSource,
        presentation: &'a mut dyn DataPresentation,
        post_processing: &'a DetectorPostProcessing,
        profiler: &'a mut Profiler,
        arena: &'a mut TensorArena,
    ) -> Self {
        Self {
            model,
            source,
            presentation,
            post_processing,
            profiler,
            arena,
            presentation_channels: 3,
            img_index: 0,
        }
    }

    /// Present images in colour (3) or grayscale (1)
    pub fn with_presentation_channels(mut self, channels: usize) -> Self {
        self.presentation_channels = if channels == 1 { 1 } else { 3 };
        self
    }

    pub fn image_index(&self) -> usize {
        self.img_index
    }

    /// Run on image `img_index` (or the current one), then advance.
    ///
    /// With `run_all` every image is processed once, wrapping around, until
    /// the starting index comes up again.
    pub fn run(&mut self, img_index: Option<usize>, run_all: bool) -> Result<Vec<ImageDetections>> {
        self.presentation.clear(Color::Black)?;

        let count = self.source.count();
        if count == 0 {
            return Err(EdgeError::InvalidInput("image source is empty".to_string()));
        }
        self.img_index = select_index(img_index, self.img_index, count);
        ensure_inited(&*self.model)?;

        let input = self.model.input_tensor(0)?;
        if input.shape.len() < 3 {
            log::error!("Input tensor dimension should be >= 3");
            return Err(EdgeError::InvalidTensorShape(format!(
                "input tensor dimension should be >= 3, got {:?}",
                input.shape
            )));
        }
        if !matches!(input.data_type, DataType::Int8 | DataType::UInt8) {
            return Err(EdgeError::InvalidTensorShape(format!(
                "detector input must be 8-bit, got {}",
                input.data_type
            )));
        }
        let rows = input.shape[1];
        let cols = input.shape[2];
        let signed = input.data_type.is_signed();

        let start = self.img_index;
        let mut all = Vec::new();
        loop {
            all.push(self.process_image(rows, cols, input.byte_len(), signed)?);
            self.img_index = next_index(self.img_index, count);
            if !run_all || self.img_index == start {
                break;
            }
        }
        Ok(all)
    }

    fn process_image(
        &mut self,
        rows: usize,
        cols: usize,
        input_bytes: usize,
        signed: bool,
    ) -> Result<ImageDetections> {
        let index = self.img_index;
        let name = self.source.name(index).unwrap_or("<unnamed>").to_string();
        let image = self.source.image(index)?;
        if image.width != cols || image.height != rows || image.channels != 3 {
            return Err(EdgeError::InvalidInputSize {
                expected: rows * cols * 3,
                actual: image.data.len(),
            });
        }

        // source images are read-only, boxes go on a copy
        let mut shown = if self.presentation_channels == 3 {
            image.clone()
        } else {
            image.to_grayscale()
        };

        self.arena.reset();
        let staging = self.arena.allocate(input_bytes)?;
        rgb_to_grayscale(&image.data, self.arena.get_mut(staging));

        self.presentation.present_image(&shown, IMAGE_START_X, IMAGE_START_Y)?;

        if signed {
            convert_img_to_int8(self.arena.get_mut(staging));
        }

        self.presentation.present_text(RUNNING_TEXT, TEXT_START_X, TEXT_START_Y)?;
        log::info!("Running inference on image {} => {}", index, name);

        self.model.copy_to_input(0, self.arena.get(staging))?;
        run_inference(&mut *self.model, &mut *self.profiler)?;

        let erase = " ".repeat(RUNNING_TEXT.len());
        self.presentation.present_text(&erase, TEXT_START_X, TEXT_START_Y)?;

        let results = {
            let outputs = [self.model.output_tensor(0)?, self.model.output_tensor(1)?];
            self.post_processing.run_post_processing(rows, cols, &outputs)?
        };

        draw_detections(&mut shown, &results);
        self.presentation.present_image(&shown, IMAGE_START_X, IMAGE_START_Y)?;

        self.present_inference_result(&results)?;
        self.profiler.print_profiling_result();

        Ok(ImageDetections {
            index,
            name,
            results,
        })
    }

    fn present_inference_result(&mut self, results: &[DetectionResult]) -> Result<()> {
        self.presentation.set_text_color(Color::Green)?;

        log::info!("Final results:");
        log::info!("Total number of inferences: 1");
        for (i, r) in results.iter().enumerate() {
            log::info!(
                "{}) ({:.6}) -> Detection box: {{x={},y={},w={},h={}}}",
                i,
                r.normalised_val,
                r.x0 as i32,
                r.y0 as i32,
                r.w as i32,
                r.h as i32
            );
        }
        Ok(())
    }
}

/// Draw `results` on `frame`, as the handler does before presenting
pub fn draw_detections(frame: &mut ImageFrame, results: &[DetectionResult]) {
    for r in results {
        draw_box_on_image(frame, r.x0 as i32, r.y0 as i32, r.w as i32, r.h as i32);
    }
}
