//! Read-only tensor views
//!
//! A [`TensorView`] borrows the buffer of an input or output tensor owned by
//! the inference engine together with its element type, shape and
//! quantization parameters. Consumers never mutate or retain it beyond a call.

use crate::error::{EdgeError, Result};
use crate::math::QuantParams;
use strum::{Display, EnumString};

/// Element type tag of a tensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "lowercase")]
pub enum DataType {
    Int8,
    UInt8,
    Int16,
    Float32,
}

impl DataType {
    pub fn size_in_bytes(&self) -> usize {
        match self {
            DataType::Int8 | DataType::UInt8 => 1,
            DataType::Int16 => 2,
            DataType::Float32 => 4,
        }
    }

    pub fn is_signed(&self) -> bool {
        !matches!(self, DataType::UInt8)
    }
}

/// Typed borrow of a tensor buffer
#[derive(Debug, Clone, Copy)]
pub enum TensorData<'a> {
    Int8(&'a [i8]),
    UInt8(&'a [u8]),
    Int16(&'a [i16]),
    Float32(&'a [f32]),
}

impl TensorData<'_> {
    pub fn len(&self) -> usize {
        match self {
            TensorData::Int8(d) => d.len(),
            TensorData::UInt8(d) => d.len(),
            TensorData::Int16(d) => d.len(),
            TensorData::Float32(d) => d.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn data_type(&self) -> DataType {
        match self {
            TensorData::Int8(_) => DataType::Int8,
            TensorData::UInt8(_) => DataType::UInt8,
            TensorData::Int16(_) => DataType::Int16,
            TensorData::Float32(_) => DataType::Float32,
        }
    }
}

/// Read-only descriptor over a tensor buffer
#[derive(Debug, Clone)]
pub struct TensorView<'a> {
    data: TensorData<'a>,
    shape: Vec<usize>,
    quant: QuantParams,
}

impl<'a> TensorView<'a> {
    /// Create a view, checking that the shape covers the buffer exactly
    pub fn new(data: TensorData<'a>, shape: Vec<usize>, quant: QuantParams) -> Result<Self> {
        let elements: usize = shape.iter().product();
        if elements != data.len() {
            return Err(EdgeError::InvalidTensorShape(format!(
                "shape {:?} describes {} elements but buffer holds {}",
                shape,
                elements,
                data.len()
            )));
        }
        Ok(Self { data, shape, quant })
    }

    pub fn data(&self) -> TensorData<'a> {
        self.data
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn quant_params(&self) -> QuantParams {
        self.quant
    }

    pub fn data_type(&self) -> DataType {
        self.data.data_type()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn byte_len(&self) -> usize {
        self.len() * self.data_type().size_in_bytes()
    }

    /// Real value of the element at `index` (flat, row-major).
    ///
    /// Float tensors are returned as-is; integer tensors are dequantized with
    /// this tensor's own scale and offset.
    #[inline]
    pub fn dequantize(&self, index: usize) -> f32 {
        match self.data {
            TensorData::Float32(d) => d[index],
            TensorData::Int8(d) => self.quant.dequantize(d[index] as i32),
            TensorData::UInt8(d) => self.quant.dequantize(d[index] as i32),
            TensorData::Int16(d) => self.quant.dequantize(d[index] as i32),
        }
    }

    /// Dequantize the whole tensor
    pub fn to_f32_vec(&self) -> Vec<f32> {
        (0..self.len()).map(|i| self.dequantize(i)).collect()
    }

    /// Shape with leading dimensions of size 1 removed
    pub fn squeezed_shape(&self) -> &[usize] {
        let first = self
            .shape
            .iter()
            .position(|&d| d != 1)
            .unwrap_or(self.shape.len());
        &self.shape[first..]
    }
}

/// Element type, shape and quantization of a tensor, without its data
#[derive(Debug, Clone, PartialEq)]
pub struct TensorInfo {
    pub data_type: DataType,
    pub shape: Vec<usize>,
    pub quant: QuantParams,
}

impl TensorInfo {
    pub fn new(data_type: DataType, shape: Vec<usize>, quant: QuantParams) -> Self {
        Self {
            data_type,
            shape,
            quant,
        }
    }

    pub fn element_count(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn byte_len(&self) -> usize {
        self.element_count() * self.data_type.size_in_bytes()
    }
}

/// Owned tensor storage
#[derive(Debug, Clone, PartialEq)]
pub enum TensorBuffer {
    Int8(Vec<i8>),
    UInt8(Vec<u8>),
    Int16(Vec<i16>),
    Float32(Vec<f32>),
}

impl TensorBuffer {
    /// Decode native-endian bytes as elements of `data_type`
    pub fn from_ne_bytes(data_type: DataType, bytes: &[u8]) -> Result<Self> {
        let size = data_type.size_in_bytes();
        if bytes.len() % size != 0 {
            return Err(EdgeError::InvalidInput(format!(
                "{} bytes is not a whole number of {} elements",
                bytes.len(),
                data_type
            )));
        }
        Ok(match data_type {
            DataType::Int8 => TensorBuffer::Int8(bytes.iter().map(|&b| b as i8).collect()),
            DataType::UInt8 => TensorBuffer::UInt8(bytes.to_vec()),
            DataType::Int16 => TensorBuffer::Int16(
                bytes
                    .chunks_exact(2)
                    .map(|c| i16::from_ne_bytes([c[0], c[1]]))
                    .collect(),
            ),
            DataType::Float32 => TensorBuffer::Float32(
                bytes
                    .chunks_exact(4)
                    .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
                    .collect(),
            ),
        })
    }

    pub fn as_data(&self) -> TensorData<'_> {
        match self {
            TensorBuffer::Int8(v) => TensorData::Int8(v),
            TensorBuffer::UInt8(v) => TensorData::UInt8(v),
            TensorBuffer::Int16(v) => TensorData::Int16(v),
            TensorBuffer::Float32(v) => TensorData::Float32(v),
        }
    }
}

/// Tensor that owns its buffer, e.g. a snapshot of a model output
#[derive(Debug, Clone, PartialEq)]
pub struct OwnedTensor {
    buffer: TensorBuffer,
    shape: Vec<usize>,
    quant: QuantParams,
}

impl OwnedTensor {
    pub fn new(buffer: TensorBuffer, shape: Vec<usize>, quant: QuantParams) -> Result<Self> {
        // reuse the view's shape check
        TensorView::new(buffer.as_data(), shape.clone(), quant)?;
        Ok(Self {
            buffer,
            shape,
            quant,
        })
    }

    /// Tensor described by `info` filled from raw native-endian bytes
    pub fn from_bytes(info: &TensorInfo, bytes: &[u8]) -> Result<Self> {
        if bytes.len() != info.byte_len() {
            return Err(EdgeError::InvalidInputSize {
                expected: info.byte_len(),
                actual: bytes.len(),
            });
        }
        let buffer = TensorBuffer::from_ne_bytes(info.data_type, bytes)?;
        Self::new(buffer, info.shape.clone(), info.quant)
    }

    pub fn info(&self) -> TensorInfo {
        TensorInfo::new(self.buffer.as_data().data_type(), self.shape.clone(), self.quant)
    }

    pub fn buffer(&self) -> &TensorBuffer {
        &self.buffer
    }

    pub fn view(&self) -> TensorView<'_> {
        TensorView {
            data: self.buffer.as_data(),
            shape: self.shape.clone(),
            quant: self.quant,
        }
    }
}
