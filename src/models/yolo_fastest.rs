//! Yolo Fastest object detector
//!
//! Single grayscale NHWC input and two output branches (coarse then fine
//! grid), decoded by [`crate::detection::DetectorPostProcessing`].

use super::{ensure_inited, Model};
use crate::error::{EdgeError, Result};
use crate::tensor::{TensorInfo, TensorView};

/// Wraps any [`Model`] and checks it has the Yolo Fastest layout on init
#[derive(Debug)]
pub struct YoloFastestModel<M: Model> {
    inner: M,
}

impl<M: Model> YoloFastestModel<M> {
    pub const INPUT_ROWS_IDX: usize = 1;
    pub const INPUT_COLS_IDX: usize = 2;
    pub const INPUT_CHANNELS_IDX: usize = 3;
    pub const OUTPUT_COUNT: usize = 2;

    pub fn new(inner: M) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> M {
        self.inner
    }

    pub fn input_rows(&self) -> Result<usize> {
        self.input_dim(Self::INPUT_ROWS_IDX)
    }

    pub fn input_cols(&self) -> Result<usize> {
        self.input_dim(Self::INPUT_COLS_IDX)
    }

    pub fn input_channels(&self) -> Result<usize> {
        self.input_dim(Self::INPUT_CHANNELS_IDX)
    }

    fn input_dim(&self, idx: usize) -> Result<usize> {
        ensure_inited(self)?;
        let shape = self.inner.input_tensor(0)?.shape;
        // NHW inputs have an implicit single channel
        Ok(shape.get(idx).copied().unwrap_or(1))
    }

    fn check_layout(&self) -> Result<()> {
        let input = self.inner.input_tensor(0)?;
        if input.shape.len() < 3 {
            return Err(EdgeError::InvalidTensorShape(format!(
                "input tensor dimension should be >= 3, got {:?}",
                input.shape
            )));
        }
        if self.inner.output_count() != Self::OUTPUT_COUNT {
            return Err(EdgeError::InvalidTensorShape(format!(
                "expected {} output tensors, model has {}",
                Self::OUTPUT_COUNT,
                self.inner.output_count()
            )));
        }
        Ok(())
    }
}

impl<M: Model> Model for YoloFastestModel<M> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn init(&mut self) -> Result<()> {
        self.inner.init()?;
        self.check_layout()
    }

    fn is_inited(&self) -> bool {
        self.inner.is_inited()
    }

    fn input_count(&self) -> usize {
        self.inner.input_count()
    }

    fn input_tensor(&self, index: usize) -> Result<TensorInfo> {
        self.inner.input_tensor(index)
    }

    fn copy_to_input(&mut self, index: usize, bytes: &[u8]) -> Result<()> {
        self.inner.copy_to_input(index, bytes)
    }

    fn run_inference(&mut self) -> Result<()> {
        self.inner.run_inference()
    }

    fn output_count(&self) -> usize {
        self.inner.output_count()
    }

    fn output_tensor(&self, index: usize) -> Result<TensorView<'_>> {
        self.inner.output_tensor(index)
    }
}
