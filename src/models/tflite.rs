//! TensorFlow Lite backed [`Model`]

use super::{check_index, Model};
use crate::error::{EdgeError, Result};
use crate::math::QuantParams;
use crate::tensor::{DataType, OwnedTensor, TensorBuffer, TensorInfo, TensorView};
use std::path::PathBuf;

use tflitec::interpreter::{Interpreter, Options};
use tflitec::tensor::{DataType as TfDataType, Tensor};

/// Model loaded from a `.tflite` flatbuffer on disk
pub struct TfliteModel {
    name: String,
    path: PathBuf,
    thread_count: i32,
    interpreter: Option<Interpreter<'static>>,
    outputs: Vec<OwnedTensor>,
}

impl std::fmt::Debug for TfliteModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TfliteModel")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("inited", &self.interpreter.is_some())
            .finish()
    }
}

impl TfliteModel {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "tflite".to_string());
        Self {
            name,
            path,
            thread_count: 1,
            interpreter: None,
            outputs: Vec::new(),
        }
    }

    pub fn with_threads(mut self, thread_count: i32) -> Self {
        self.thread_count = thread_count.max(1);
        self
    }

    fn interpreter(&self) -> Result<&Interpreter<'static>> {
        self.interpreter.as_ref().ok_or(EdgeError::UninitializedModel)
    }

    fn snapshot_outputs(&mut self) -> Result<()> {
        let interpreter = self.interpreter()?;
        let mut outputs = Vec::with_capacity(interpreter.output_tensor_count());
        for i in 0..interpreter.output_tensor_count() {
            let tensor = interpreter
                .output(i)
                .map_err(|e| EdgeError::TfLite(format!("Failed to read output {}: {}", i, e)))?;
            outputs.push(owned_from_tensor(&tensor)?);
        }
        self.outputs = outputs;
        Ok(())
    }
}

impl Model for TfliteModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn init(&mut self) -> Result<()> {
        if self.interpreter.is_some() {
            return Ok(());
        }
        let path = self.path.to_string_lossy().into_owned();

        // The interpreter borrows the model for its whole life
        let model = Box::leak(Box::new(tflitec::model::Model::new(&path).map_err(|e| {
            EdgeError::ModelLoadError(format!("Failed to load {}: {}", path, e))
        })?));

        let mut options = Options::default();
        options.thread_count = self.thread_count;

        let interpreter = Interpreter::new(model, Some(options)).map_err(|e| {
            EdgeError::ModelLoadError(format!("Failed to create interpreter for {}: {}", path, e))
        })?;
        interpreter.allocate_tensors().map_err(|e| {
            EdgeError::ModelLoadError(format!("Failed to allocate tensors for {}: {}", path, e))
        })?;

        log::info!(
            "Loaded {} ({} inputs, {} outputs)",
            path,
            interpreter.input_tensor_count(),
            interpreter.output_tensor_count()
        );
        self.interpreter = Some(interpreter);
        Ok(())
    }

    fn is_inited(&self) -> bool {
        self.interpreter.is_some()
    }

    fn input_count(&self) -> usize {
        self.interpreter
            .as_ref()
            .map(|i| i.input_tensor_count())
            .unwrap_or(0)
    }

    fn input_tensor(&self, index: usize) -> Result<TensorInfo> {
        let interpreter = self.interpreter()?;
        check_index("input", index, interpreter.input_tensor_count())?;
        let tensor = interpreter
            .input(index)
            .map_err(|e| EdgeError::TfLite(format!("Failed to read input {}: {}", index, e)))?;
        tensor_info(&tensor)
    }

    fn copy_to_input(&mut self, index: usize, bytes: &[u8]) -> Result<()> {
        let expected = self.input_tensor(index)?.byte_len();
        if bytes.len() != expected {
            return Err(EdgeError::InvalidInputSize {
                expected,
                actual: bytes.len(),
            });
        }
        self.interpreter()?
            .copy(bytes, index)
            .map_err(|e| EdgeError::TfLite(format!("Failed to copy input {}: {}", index, e)))
    }

    fn run_inference(&mut self) -> Result<()> {
        self.interpreter()?
            .invoke()
            .map_err(|e| EdgeError::InferenceFailed(e.to_string()))?;
        self.snapshot_outputs()
    }

    fn output_count(&self) -> usize {
        self.interpreter
            .as_ref()
            .map(|i| i.output_tensor_count())
            .unwrap_or(0)
    }

    fn output_tensor(&self, index: usize) -> Result<TensorView<'_>> {
        check_index("output", index, self.outputs.len())?;
        Ok(self.outputs[index].view())
    }
}

fn convert_data_type(data_type: TfDataType) -> Result<DataType> {
    match data_type {
        TfDataType::Int8 => Ok(DataType::Int8),
        TfDataType::Uint8 => Ok(DataType::UInt8),
        TfDataType::Int16 => Ok(DataType::Int16),
        TfDataType::Float32 => Ok(DataType::Float32),
        other => Err(EdgeError::TfLite(format!("Unsupported tensor type {:?}", other))),
    }
}

fn tensor_info(tensor: &Tensor) -> Result<TensorInfo> {
    let quant = tensor
        .quantization_parameters()
        .map(|q| QuantParams::new(q.scale, q.zero_point))
        .unwrap_or_default();
    Ok(TensorInfo::new(
        convert_data_type(tensor.data_type())?,
        tensor.shape().dimensions().clone(),
        quant,
    ))
}

fn owned_from_tensor(tensor: &Tensor) -> Result<OwnedTensor> {
    let info = tensor_info(tensor)?;
    let buffer = match info.data_type {
        DataType::Int8 => TensorBuffer::Int8(tensor.data::<i8>().to_vec()),
        DataType::UInt8 => TensorBuffer::UInt8(tensor.data::<u8>().to_vec()),
        DataType::Int16 => TensorBuffer::Int16(tensor.data::<i16>().to_vec()),
        DataType::Float32 => TensorBuffer::Float32(tensor.data::<f32>().to_vec()),
    };
    OwnedTensor::new(buffer, info.shape, info.quant)
}
