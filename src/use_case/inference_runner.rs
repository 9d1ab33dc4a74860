//! Generic inference runner
//!
//! Runs any model once on random (or caller supplied) input bytes and reports
//! what came out. Useful to smoke-test a model file and time it on a target.

use super::run_inference;
use crate::error::{EdgeError, Result};
use crate::models::Model;
use crate::profiler::Profiler;
use crate::tensor::{DataType, TensorView};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Statistics of one output tensor
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSummary {
    pub index: usize,
    pub data_type: DataType,
    pub shape: Vec<usize>,
    pub min: f32,
    pub max: f32,
    pub mean: f32,
    /// Flat index of the largest value
    pub argmax: usize,
}

impl OutputSummary {
    fn from_view(index: usize, view: &TensorView<'_>) -> Self {
        let values = view.to_f32_vec();
        let (argmax, max) = values
            .iter()
            .copied()
            .enumerate()
            .fold((0, f32::NEG_INFINITY), |best, (i, v)| if v > best.1 { (i, v) } else { best });
        let min = values.iter().copied().fold(f32::INFINITY, f32::min);
        let mean = if values.is_empty() {
            0.0
        } else {
            values.iter().sum::<f32>() / values.len() as f32
        };
        Self {
            index,
            data_type: view.data_type(),
            shape: view.shape().to_vec(),
            min,
            max,
            mean,
            argmax,
        }
    }
}

/// Initialise `model` if needed, fill its inputs and run it once.
///
/// Input 0 gets `input` when given; every other input (and input 0 without
/// `input`) is filled with random bytes from `seed`, or from entropy when
/// `seed` is `None`.
pub fn run_inference_runner(
    model: &mut dyn Model,
    profiler: &mut Profiler,
    input: Option<&[u8]>,
    seed: Option<u64>,
) -> Result<Vec<OutputSummary>> {
    if !model.is_inited() {
        log::info!("Initialising {}", model.name());
        model.init()?;
    }

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    for i in 0..model.input_count() {
        let info = model.input_tensor(i)?;
        let bytes = match (i, input) {
            (0, Some(data)) => {
                if data.len() != info.byte_len() {
                    return Err(EdgeError::InvalidInputSize {
                        expected: info.byte_len(),
                        actual: data.len(),
                    });
                }
                data.to_vec()
            }
            _ => {
                let mut buf = vec![0u8; info.byte_len()];
                rng.fill(buf.as_mut_slice());
                buf
            }
        };
        log::debug!("Input {}: {:?} {} ({} bytes)", i, info.shape, info.data_type, bytes.len());
        model.copy_to_input(i, &bytes)?;
    }

    run_inference(model, profiler)?;

    let mut summaries = Vec::with_capacity(model.output_count());
    for i in 0..model.output_count() {
        let summary = OutputSummary::from_view(i, &model.output_tensor(i)?);
        log::info!(
            "Output {}: {} {:?} min={:.4} max={:.4} mean={:.4} argmax={}",
            summary.index,
            summary.data_type,
            summary.shape,
            summary.min,
            summary.max,
            summary.mean,
            summary.argmax
        );
        summaries.push(summary);
    }
    profiler.print_profiling_result();

    Ok(summaries)
}
