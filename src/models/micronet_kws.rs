//! MicroNet keyword spotting model
//!
//! Takes an int8 `[1, audio_windows, mfcc_features(, 1)]` feature map and
//! produces one score per keyword.

use super::{ensure_inited, Model};
use crate::error::{EdgeError, Result};
use crate::tensor::{DataType, TensorInfo, TensorView};

#[derive(Debug)]
pub struct MicroNetKwsModel<M: Model> {
    inner: M,
}

impl<M: Model> MicroNetKwsModel<M> {
    pub const INPUT_ROWS_IDX: usize = 1;
    pub const INPUT_COLS_IDX: usize = 2;

    pub fn new(inner: M) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> M {
        self.inner
    }

    /// Number of audio windows in one inference
    pub fn num_audio_windows(&self) -> Result<usize> {
        self.input_dim(Self::INPUT_ROWS_IDX)
    }

    /// Features per audio window
    pub fn num_mfcc_features(&self) -> Result<usize> {
        self.input_dim(Self::INPUT_COLS_IDX)
    }

    /// Number of keyword classes
    pub fn num_labels(&self) -> Result<usize> {
        Ok(self.inner.output_tensor(0)?.len())
    }

    fn input_dim(&self, idx: usize) -> Result<usize> {
        ensure_inited(self)?;
        let shape = self.inner.input_tensor(0)?.shape;
        shape.get(idx).copied().ok_or_else(|| {
            EdgeError::InvalidTensorShape(format!("input shape {:?} has no dimension {}", shape, idx))
        })
    }

    fn check_layout(&self) -> Result<()> {
        let input = self.inner.input_tensor(0)?;
        if input.data_type != DataType::Int8 {
            return Err(EdgeError::InvalidTensorShape(format!(
                "keyword model expects an int8 input, got {}",
                input.data_type
            )));
        }
        if input.shape.len() < 3 {
            return Err(EdgeError::InvalidTensorShape(format!(
                "keyword model input should be [1, windows, features], got {:?}",
                input.shape
            )));
        }
        if self.inner.output_count() != 1 {
            return Err(EdgeError::InvalidTensorShape(format!(
                "keyword model should have one output, has {}",
                self.inner.output_count()
            )));
        }
        Ok(())
    }
}

impl<M: Model> Model for MicroNetKwsModel<M> {
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
