//! Shared numeric helpers
//!
//! Affine quantization between real values and the fixed-width integer types
//! used by quantized tensors, plus the small activation functions the
//! post-processing stages need.

use num_traits::{Bounded, PrimInt, ToPrimitive};
use serde::{Deserialize, Serialize};

/// Integer element types a quantized tensor can hold
pub trait QuantizedType: PrimInt + Bounded + ToPrimitive + Send + Sync + 'static {
    /// Size of one element in bytes
    const BYTES: usize;

    /// Native-endian byte representation
    fn write_ne_bytes(self, out: &mut Vec<u8>);
}

impl QuantizedType for i8 {
    const BYTES: usize = 1;

    fn write_ne_bytes(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_ne_bytes());
    }
}

impl QuantizedType for u8 {
    const BYTES: usize = 1;

    fn write_ne_bytes(self, out: &mut Vec<u8>) {
        out.push(self);
    }
}

impl QuantizedType for i16 {
    const BYTES: usize = 2;

    fn write_ne_bytes(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_ne_bytes());
    }
}

/// Scale and zero-point of an affine quantization
///
/// `real = (quantized - offset) * scale`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuantParams {
    pub scale: f32,
    pub offset: i32,
}

impl Default for QuantParams {
    fn default() -> Self {
        Self {
            scale: 1.0,
            offset: 0,
        }
    }
}

impl QuantParams {
    pub fn new(scale: f32, offset: i32) -> Self {
        Self { scale, offset }
    }

    /// Quantize a real value into `T`.
    ///
    /// Rounds half away from zero, adds the offset and saturates to the
    /// representable range of `T`.
    pub fn quantize<T: QuantizedType>(&self, value: f32) -> T {
        saturating_cast((value / self.scale).round() + self.offset as f32)
    }

    /// Map a raw quantized value back to a real value
    pub fn dequantize(&self, quantized: i32) -> f32 {
        (quantized - self.offset) as f32 * self.scale
    }
}

/// Clamp `value` into `[T::MIN, T::MAX]` and convert.
///
/// NaN maps to zero.
pub fn saturating_cast<T: QuantizedType>(value: f32) -> T {
    if value.is_nan() {
        return T::zero();
    }
    let lo = T::min_value().to_f32().unwrap_or(f32::MIN);
    let hi = T::max_value().to_f32().unwrap_or(f32::MAX);
    let clamped = value.clamp(lo, hi);
    if clamped <= lo {
        T::min_value()
    } else if clamped >= hi {
        T::max_value()
    } else {
        T::from(clamped).unwrap_or_else(T::zero)
    }
}

#[inline]
pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Numerically stable softmax
pub fn softmax(values: &[f32]) -> Vec<f32> {
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = values.iter().map(|&v| (v - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    if sum == 0.0 || !sum.is_finite() {
        return vec![0.0; values.len()];
    }
    exps.into_iter().map(|e| e / sum).collect()
}
