//! Inference capability
//!
//! Every network the pipelines run sits behind the [`Model`] trait: handlers
//! copy prepared bytes into an input, invoke the network and read outputs as
//! [`TensorView`]s. The executor itself is interchangeable; a TensorFlow Lite
//! backend is available with the `tflite` feature, and the model-family
//! wrappers check that a loaded network has the layout they expect.

pub mod micronet_kws;
#[cfg(feature = "tflite")]
pub mod tflite;
pub mod yolo_fastest;

use crate::error::{EdgeError, Result};
use crate::tensor::{TensorInfo, TensorView};

pub use micronet_kws::MicroNetKwsModel;
#[cfg(feature = "tflite")]
pub use tflite::TfliteModel;
pub use yolo_fastest::YoloFastestModel;

/// A loaded network that can be fed and invoked
pub trait Model {
    /// Human readable model name for logs
    fn name(&self) -> &str;

    /// Prepare the network for inference. Calling it again is a no-op.
    fn init(&mut self) -> Result<()>;

    fn is_inited(&self) -> bool;

    fn input_count(&self) -> usize;

    /// Type, shape and quantization of input `index`
    fn input_tensor(&self, index: usize) -> Result<TensorInfo>;

    /// Overwrite input `index` with raw native-endian bytes.
    ///
    /// `bytes.len()` must equal the tensor's byte size.
    fn copy_to_input(&mut self, index: usize, bytes: &[u8]) -> Result<()>;

    /// Run the network on the current inputs
    fn run_inference(&mut self) -> Result<()>;

    fn output_count(&self) -> usize;

    /// Output `index` of the most recent inference
    fn output_tensor(&self, index: usize) -> Result<TensorView<'_>>;

    /// Whether input 0 holds signed data
    fn is_data_signed(&self) -> Result<bool> {
        Ok(self.input_tensor(0)?.data_type.is_signed())
    }
}

/// Fail with [`EdgeError::UninitializedModel`] unless `model` is ready
pub fn ensure_inited(model: &dyn Model) -> Result<()> {
    if model.is_inited() {
        Ok(())
    } else {
        log::error!("Model {} is not initialised", model.name());
        Err(EdgeError::UninitializedModel)
    }
}

/// Index check shared by the model implementations
pub(crate) fn check_index(kind: &str, index: usize, count: usize) -> Result<()> {
    if index < count {
        Ok(())
    } else {
        Err(EdgeError::InvalidInput(format!(
            "{} tensor index {} out of range ({} available)",
            kind, index, count
        )))
    }
}

impl<M: Model + ?Sized> Model for Box<M> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn init(&mut self) -> Result<()> {
        (**self).init()
    }

    fn is_inited(&self) -> bool {
        (**self).is_inited()
    }

    fn input_count(&self) -> usize {
        (**self).input_count()
    }

    fn input_tensor(&self, index: usize) -> Result<TensorInfo> {
        (**self).input_tensor(index)
    }

    fn copy_to_input(&mut self, index: usize, bytes: &[u8]) -> Result<()> {
        (**self).copy_to_input(index, bytes)
    }

    fn run_inference(&mut self) -> Result<()> {
        (**self).run_inference()
    }

    fn output_count(&self) -> usize {
        (**self).output_count()
    }

    fn output_tensor(&self, index: usize) -> Result<TensorView<'_>> {
        (**self).output_tensor(index)
    }
}
