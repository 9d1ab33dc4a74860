//! Machine sound anomaly detection
//!
//! A clip is cut into overlapping windows, each window becomes one log-mel
//! frame quantized for the model input, and consecutive frames are stacked
//! into inputs (one row per frame). Every inference yields per-machine
//! scores; the clip's anomaly score is the mean negated softmax probability
//! of the machine the clip was recorded from.

use super::run_inference;
use crate::audio::{window_offsets, MelSpecParams, MelSpectrogram};
use crate::error::{EdgeError, Result};
use crate::math::{softmax, QuantizedType};
use crate::models::{ensure_inited, Model};
use crate::profiler::Profiler;
use crate::tensor::{DataType, TensorInfo};
use serde::{Deserialize, Serialize};

/// Settings for the anomaly detection application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalyConfig {
    /// Samples per mel window
    pub frame_len: usize,
    /// Samples between consecutive windows
    pub frame_stride: usize,
    /// Frames between consecutive inputs, `None` for non-overlapping inputs
    pub input_stride_frames: Option<usize>,
    /// Mean log-mel energy of the training set, subtracted from every bin
    pub training_mean: f32,
    /// Output index of the machine under test
    pub machine_id: usize,
    /// Scores above this are anomalous
    pub score_threshold: f32,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            frame_len: 1024,
            frame_stride: 512,
            input_stride_frames: None,
            training_mean: 0.0,
            machine_id: 0,
            score_threshold: -0.8,
        }
    }
}

impl AnomalyConfig {
    pub fn validate(&self) -> Result<()> {
        if self.frame_len == 0 || self.frame_stride == 0 {
            return Err(EdgeError::Config(
                "frame_len and frame_stride must be positive".to_string(),
            ));
        }
        if self.input_stride_frames == Some(0) {
            return Err(EdgeError::Config("input_stride_frames must be positive".to_string()));
        }
        if !self.score_threshold.is_finite() {
            return Err(EdgeError::Config("score_threshold must be finite".to_string()));
        }
        Ok(())
    }

    pub fn mel_params(&self) -> MelSpecParams {
        MelSpecParams {
            training_mean: self.training_mean,
            ..MelSpecParams::anomaly_detection(self.frame_len)
        }
    }
}

/// Outcome for one clip
#[derive(Debug, Clone, PartialEq)]
pub struct AnomalyResult {
    /// Mean score over all inferences
    pub score: f32,
    pub inferences: usize,
    pub is_anomaly: bool,
}

pub struct AnomalyDetectionHandler<'a> {
    model: &'a mut dyn Model,
    profiler: &'a mut Profiler,
    config: AnomalyConfig,
    mel: MelSpectrogram,
}

impl<'a> AnomalyDetectionHandler<'a> {
    pub fn new(
        model: &'a mut dyn Model,
        profiler: &'a mut Profiler,
        config: AnomalyConfig,
    ) -> Result<Self> {
        config.validate()?;
        let mel = MelSpectrogram::new(config.mel_params())?;
        Ok(Self {
            model,
            profiler,
            config,
            mel,
        })
    }

    /// Score one clip of 16 kHz mono samples
    pub fn run(&mut self, samples: &[i16]) -> Result<AnomalyResult> {
        ensure_inited(&*self.model)?;

        let input = self.model.input_tensor(0)?;
        let (frames_per_input, bins) = input_geometry(&input)?;
        if bins != self.mel.num_bins() {
            return Err(EdgeError::InvalidTensorShape(format!(
                "model input has {} mel bins per frame, extractor produces {}",
                bins,
                self.mel.num_bins()
            )));
        }

        let frames = self.compute_frames(samples, &input)?;
        if frames.len() < frames_per_input {
            return Err(EdgeError::InvalidInputSize {
                expected: frames_per_input,
                actual: frames.len(),
            });
        }
        log::info!(
            "{} mel frames from {} samples, {} frames per inference",
            frames.len(),
            samples.len(),
            frames_per_input
        );

        let stride = self.config.input_stride_frames.unwrap_or(frames_per_input);
        let mut total = 0.0f32;
        let mut inferences = 0usize;
        for start in window_offsets(frames.len(), frames_per_input, stride) {
            let bytes: Vec<u8> = frames[start..start + frames_per_input].concat();
            self.model.copy_to_input(0, &bytes)?;
            run_inference(&mut *self.model, &mut *self.profiler)?;

            let score = self.score_output()?;
            log::debug!("Inference {}: score {:.4}", inferences, score);
            total += score;
            inferences += 1;
        }

        let score = total / inferences as f32;
        let is_anomaly = score > self.config.score_threshold;
        log::info!("Average anomaly score is: {:.6}", score);
        log::info!("Anomaly threshold is: {:.6}", self.config.score_threshold);
        if is_anomaly {
            log::info!("Anomaly detected!");
        } else {
            log::info!("Everything fine, no anomaly detected!");
        }
        self.profiler.print_profiling_result();

        Ok(AnomalyResult {
            score,
            inferences,
            is_anomaly,
        })
    }

    /// One encoded input row per window, in the input tensor's element type
    fn compute_frames(&self, samples: &[i16], input: &TensorInfo) -> Result<Vec<Vec<u8>>> {
        let (scale, offset) = (input.quant.scale, input.quant.offset);
        window_offsets(samples.len(), self.config.frame_len, self.config.frame_stride)
            .map(|start| {
                let window = &samples[start..start + self.config.frame_len];
                match input.data_type {
                    DataType::Int8 => encode(self.mel.mel_spec_compute_quant::<i8>(window, scale, offset)?),
                    DataType::UInt8 => encode(self.mel.mel_spec_compute_quant::<u8>(window, scale, offset)?),
                    DataType::Int16 => encode(self.mel.mel_spec_compute_quant::<i16>(window, scale, offset)?),
                    DataType::Float32 => Ok(self
                        .mel
                        .compute_mel_spec(window)?
                        .iter()
                        .flat_map(|v| v.to_ne_bytes())
                        .collect()),
                }
            })
            .collect()
    }

    fn score_output(&self) -> Result<f32> {
        let output = self.model.output_tensor(0)?.to_f32_vec();
        let probabilities = softmax(&output);
        let p = probabilities.get(self.config.machine_id).ok_or_else(|| {
            EdgeError::InvalidTensorShape(format!(
                "machine id {} out of range for {} outputs",
                self.config.machine_id,
                probabilities.len()
            ))
        })?;
        Ok(-p)
    }
}

/// `(frames, bins)` of an input shaped `[1, frames, bins]` or `[1, frames, bins, 1]`
fn input_geometry(input: &TensorInfo) -> Result<(usize, usize)> {
    let mut dims = input.shape.as_slice();
    // batch, then channel; the frame count itself may be 1
    if dims.len() > 2 && dims[0] == 1 {
        dims = &dims[1..];
    }
    if dims.len() > 2 && dims[dims.len() - 1] == 1 {
        dims = &dims[..dims.len() - 1];
    }
    match dims {
        [frames, bins] => Ok((*frames, *bins)),
        _ => Err(EdgeError::InvalidTensorShape(format!(
            "expected a [frames, mel bins] input, got {:?}",
            input.shape
        ))),
    }
}

fn encode<T: QuantizedType>(values: Vec<T>) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(values.len() * T::BYTES);
    for v in values {
        v.write_ne_bytes(&mut out);
    }
    Ok(out)
}
