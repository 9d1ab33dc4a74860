//! Log-mel spectrogram feature extraction
//!
//! Converts one fixed-length window of signed 16-bit audio into a vector of
//! log mel-filterbank energies, optionally quantized into the integer
//! representation a target network expects.
//!
//! ```text
//! i16 samples → /32768 → Hann window → zero-pad → FFT → |X[k]|²
//!             → triangular mel filters → log → (- training mean) → [quantize]
//! ```
//!
//! The window, the FFT plan (twiddle factors) and the filterbank are built
//! once in [`MelSpectrogram::new`] and never change afterwards, so a single
//! extractor can be shared between threads.

use crate::error::{EdgeError, Result};
use crate::math::{QuantParams, QuantizedType};
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use strum::{Display, EnumString};

/// Energy floor added before taking the logarithm
const ENERGY_FLOOR: f32 = 1e-10;

/// log10(e), turns a natural log into a base-10 one
const LOG10_E: f32 = 0.434_294_48;

// Slaney mel scale constants
const FREQ_STEP: f32 = 200.0 / 3.0;
const MIN_LOG_HZ: f32 = 1000.0;
const MIN_LOG_MEL: f32 = MIN_LOG_HZ / FREQ_STEP;
/// ln(6.4) / 27
const LOG_STEP: f32 = 1.856_297_9 / 27.0;

/// Frequency to mel conversion formula
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MelScale {
    /// Linear below 1 kHz, logarithmic above (librosa default)
    Slaney,
    /// `1127 * ln(1 + f/700)`
    Htk,
}

impl MelScale {
    pub fn hz_to_mel(&self, freq: f32) -> f32 {
        match self {
            MelScale::Htk => 1127.0 * (1.0 + freq / 700.0).ln(),
            MelScale::Slaney => {
                if freq >= MIN_LOG_HZ {
                    MIN_LOG_MEL + (freq / MIN_LOG_HZ).ln() / LOG_STEP
                } else {
                    freq / FREQ_STEP
                }
            }
        }
    }

    pub fn mel_to_hz(&self, mel: f32) -> f32 {
        match self {
            MelScale::Htk => 700.0 * ((mel / 1127.0).exp() - 1.0),
            MelScale::Slaney => {
                if mel >= MIN_LOG_MEL {
                    MIN_LOG_HZ * (LOG_STEP * (mel - MIN_LOG_MEL)).exp()
                } else {
                    FREQ_STEP * mel
                }
            }
        }
    }
}

/// Weight normalisation applied to each triangular filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterNorm {
    /// Peak weight of every filter is 1
    None,
    /// Area normalisation: weights scaled by `2 / (f_right - f_left)`
    Slaney,
}

/// Logarithm applied to the filterbank energies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogScale {
    /// `ln(energy)`
    Natural,
    /// `10 * log10(energy)`
    Decibel,
}

/// Parameters of a mel spectrogram extractor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MelSpecParams {
    /// Sampling frequency in Hz
    pub sampling_freq: u32,
    /// Number of mel filters (output length)
    pub num_fbank_bins: usize,
    /// Lower edge of the first filter in Hz
    pub mel_lo_freq: f32,
    /// Upper edge of the last filter in Hz
    pub mel_hi_freq: f32,
    /// Samples per analysis window
    pub frame_len: usize,
    pub mel_scale: MelScale,
    pub filter_norm: FilterNorm,
    pub log_scale: LogScale,
    /// Subtracted from every log energy
    pub training_mean: f32,
}

impl Default for MelSpecParams {
    fn default() -> Self {
        Self::anomaly_detection(1024)
    }
}

impl MelSpecParams {
    /// Parameters used by the anomaly detection models: 16 kHz audio, 64
    /// Slaney-normalised filters between 0 and 8 kHz, energies in dB.
    pub fn anomaly_detection(frame_len: usize) -> Self {
        Self {
            sampling_freq: 16000,
            num_fbank_bins: 64,
            mel_lo_freq: 0.0,
            mel_hi_freq: 8000.0,
            frame_len,
            mel_scale: MelScale::Slaney,
            filter_norm: FilterNorm::Slaney,
            log_scale: LogScale::Decibel,
            training_mean: 0.0,
        }
    }

    /// FFT length: the frame length rounded up to a power of two
    pub fn frame_len_padded(&self) -> usize {
        self.frame_len.next_power_of_two()
    }

    pub fn validate(&self) -> Result<()> {
        if self.frame_len == 0 {
            return Err(EdgeError::Config("frame_len must be positive".to_string()));
        }
        if self.num_fbank_bins == 0 {
            return Err(EdgeError::Config(
                "num_fbank_bins must be positive".to_string(),
            ));
        }
        if self.sampling_freq == 0 {
            return Err(EdgeError::Config(
                "sampling_freq must be positive".to_string(),
            ));
        }
        let nyquist = self.sampling_freq as f32 / 2.0;
        if !(self.mel_lo_freq >= 0.0 && self.mel_lo_freq < self.mel_hi_freq) {
            return Err(EdgeError::Config(format!(
                "mel frequency range [{}, {}] is empty",
                self.mel_lo_freq, self.mel_hi_freq
            )));
        }
        if self.mel_hi_freq > nyquist {
            return Err(EdgeError::Config(format!(
                "mel_hi_freq {} is above the Nyquist frequency {}",
                self.mel_hi_freq, nyquist
            )));
        }
        Ok(())
    }
}

/// Non-zero span of one triangular filter
#[derive(Debug, Clone)]
struct MelFilter {
    /// Index of the first FFT bin with a non-zero weight
    first_bin: usize,
    weights: Vec<f32>,
}

/// Mel spectrogram extractor with precomputed, read-only tables
pub struct MelSpectrogram {
    params: MelSpecParams,
    window: Vec<f32>,
    fft: Arc<dyn Fft<f32>>,
    filters: Vec<MelFilter>,
}

impl std::fmt::Debug for MelSpectrogram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MelSpectrogram")
            .field("params", &self.params)
            .field("fft_len", &self.fft.len())
            .finish()
    }
}

impl MelSpectrogram {
    pub fn new(params: MelSpecParams) -> Result<Self> {
        params.validate()?;

        let window = hann_window(params.frame_len);
        let fft = FftPlanner::<f32>::new().plan_fft_forward(params.frame_len_padded());
        let filters = create_mel_filter_bank(&params);

        log::debug!(
            "Mel spectrogram: frame {} (fft {}), {} bins over {}-{} Hz",
            params.frame_len,
            params.frame_len_padded(),
            params.num_fbank_bins,
            params.mel_lo_freq,
            params.mel_hi_freq
        );

        Ok(Self {
            params,
            window,
            fft,
            filters,
        })
    }

    pub fn params(&self) -> &MelSpecParams {
        &self.params
    }

    pub fn frame_len(&self) -> usize {
        self.params.frame_len
    }

    pub fn num_bins(&self) -> usize {
        self.params.num_fbank_bins
    }

    /// Compute the log-mel energies of one audio window
    ///
    /// # Arguments
    /// * `samples` - Exactly `frame_len` signed 16-bit samples
    ///
    /// # Returns
    /// * `Vec<f32>` - `num_fbank_bins` log energies
    pub fn compute_mel_spec(&self, samples: &[i16]) -> Result<Vec<f32>> {
        if samples.len() != self.params.frame_len {
            return Err(EdgeError::InvalidInputSize {
                expected: self.params.frame_len,
                actual: samples.len(),
            });
        }

        let mut buffer = vec![Complex::new(0.0f32, 0.0); self.fft.len()];
        for ((slot, &sample), &w) in buffer.iter_mut().zip(samples).zip(&self.window) {
            slot.re = (sample as f32 / 32768.0) * w;
        }
        self.fft.process(&mut buffer);

        let half = self.fft.len() / 2;
        let power: Vec<f32> = buffer[..=half].iter().map(|c| c.norm_sqr()).collect();

        let mut energies = self.apply_mel_filter_bank(&power);
        self.convert_to_log_scale(&mut energies);
        Ok(energies)
    }

    /// Compute the log-mel energies and quantize them into `T`
    ///
    /// Each value becomes `round(value / scale) + offset`, rounded half away
    /// from zero and saturated to `T::MIN..=T::MAX`.
    pub fn mel_spec_compute_quant<T: QuantizedType>(
        &self,
        samples: &[i16],
        scale: f32,
        offset: i32,
    ) -> Result<Vec<T>> {
        if scale.is_nan() || scale <= 0.0 {
            return Err(EdgeError::InvalidInput(format!(
                "quantization scale must be positive, got {}",
                scale
            )));
        }
        let quant = QuantParams::new(scale, offset);
        Ok(self
            .compute_mel_spec(samples)?
            .into_iter()
            .map(|v| quant.quantize::<T>(v))
            .collect())
    }

    fn apply_mel_filter_bank(&self, power: &[f32]) -> Vec<f32> {
        self.filters
            .iter()
            .map(|filter| {
                let span = power.iter().skip(filter.first_bin);
                filter
                    .weights
                    .iter()
                    .zip(span)
                    .fold(ENERGY_FLOOR, |acc, (w, p)| acc + w * p)
            })
            .collect()
    }

    fn convert_to_log_scale(&self, energies: &mut [f32]) {
        let multiplier = match self.params.log_scale {
            LogScale::Natural => 1.0,
            LogScale::Decibel => 10.0 * LOG10_E,
        };
        for energy in energies.iter_mut() {
            *energy = energy.ln() * multiplier - self.params.training_mean;
        }
    }
}

/// Periodic Hann window
fn hann_window(len: usize) -> Vec<f32> {
    let multiplier = 2.0 * std::f32::consts::PI / len as f32;
    (0..len)
        .map(|i| 0.5 - 0.5 * (multiplier * i as f32).cos())
        .collect()
}

fn create_mel_filter_bank(params: &MelSpecParams) -> Vec<MelFilter> {
    let scale = params.mel_scale;
    let fft_len = params.frame_len_padded();
    let num_fft_bins = fft_len / 2;
    let fft_bin_width = params.sampling_freq as f32 / fft_len as f32;

    let mel_low = scale.hz_to_mel(params.mel_lo_freq);
    let mel_high = scale.hz_to_mel(params.mel_hi_freq);
    let mel_delta = (mel_high - mel_low) / (params.num_fbank_bins + 1) as f32;

    let bin_mels: Vec<f32> = (0..num_fft_bins)
        .map(|i| scale.hz_to_mel(fft_bin_width * i as f32))
        .collect();

    (0..params.num_fbank_bins)
        .map(|bin| {
            let left = mel_low + bin as f32 * mel_delta;
            let center = mel_low + (bin + 1) as f32 * mel_delta;
            let right = mel_low + (bin + 2) as f32 * mel_delta;

            let normaliser = match params.filter_norm {
                FilterNorm::None => 1.0,
                FilterNorm::Slaney => 2.0 / (scale.mel_to_hz(right) - scale.mel_to_hz(left)),
            };

            let mut first_bin = None;
            let mut weights = Vec::new();
            for (i, &mel) in bin_mels.iter().enumerate() {
                if mel <= left || mel >= right {
                    if first_bin.is_some() {
                        break;
                    }
                    continue;
                }
                let weight = if mel <= center {
                    (mel - left) / (center - left)
                } else {
                    (right - mel) / (right - center)
                };
                first_bin.get_or_insert(i);
                weights.push(weight * normaliser);
            }

            MelFilter {
                first_bin: first_bin.unwrap_or(0),
                weights,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, len: usize, amplitude: f32) -> Vec<i16> {
        (0..len)
            .map(|i| {
                let t = i as f32 / 16000.0;
                (amplitude * (2.0 * std::f32::consts::PI * freq * t).sin()) as i16
            })
            .collect()
    }

    #[test]
    fn test_slaney_scale_roundtrip() {
        for &hz in &[0.0f32, 100.0, 440.0, 999.0, 1000.0, 4000.0, 8000.0] {
            let mel = MelScale::Slaney.hz_to_mel(hz);
            let back = MelScale::Slaney.mel_to_hz(mel);
            assert!((hz - back).abs() < 0.05, "roundtrip failed for {} Hz", hz);
        }
        assert!((MelScale::Slaney.hz_to_mel(1000.0) - 15.0).abs() < 1e-4);
    }

    #[test]
    fn test_htk_scale_roundtrip() {
        for &hz in &[0.0f32, 300.0, 2500.0, 7999.0] {
            let back = MelScale::Htk.mel_to_hz(MelScale::Htk.hz_to_mel(hz));
            assert!((hz - back).abs() < 0.05);
        }
    }

    #[test]
    fn test_hann_window_is_periodic() {
        let w = hann_window(8);
        assert_eq!(w[0], 0.0);
        assert!((w[4] - 1.0).abs() < 1e-6);
        assert!((w[1] - w[7]).abs() < 1e-6);
    }

    #[test]
    fn test_filter_bank_spans_are_contiguous() {
        let params = MelSpecParams::anomaly_detection(1024);
        let filters = create_mel_filter_bank(&params);
        assert_eq!(filters.len(), 64);
        for pair in filters.windows(2) {
            assert!(pair[1].first_bin >= pair[0].first_bin);
        }
        for filter in &filters {
            assert!(!filter.weights.is_empty());
            assert!(filter.weights.iter().all(|&w| w > 0.0));
            assert!(filter.first_bin + filter.weights.len() <= 512);
        }
    }

    #[test]
    fn test_frame_is_zero_padded() {
        let params = MelSpecParams::anomaly_detection(640);
        assert_eq!(params.frame_len_padded(), 1024);
        let mel = MelSpectrogram::new(params).unwrap();
        let out = mel.compute_mel_spec(&sine(1000.0, 640, 8000.0)).unwrap();
        assert_eq!(out.len(), 64);
        assert!(out.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_silence_hits_energy_floor() {
        let mel = MelSpectrogram::new(MelSpecParams::anomaly_detection(1024)).unwrap();
        let out = mel.compute_mel_spec(&[0i16; 1024]).unwrap();
        // 10 * log10(1e-10) = -100 dB
        for v in out {
            assert!((v + 100.0).abs() < 1e-3, "got {}", v);
        }
    }

    #[test]
    fn test_sine_peaks_in_matching_filter() {
        let params = MelSpecParams::anomaly_detection(1024);
        let mel = MelSpectrogram::new(params.clone()).unwrap();
        let out = mel.compute_mel_spec(&sine(2000.0, 1024, 10000.0)).unwrap();

        let peak = out
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();

        // Centre frequency of the peak filter should be close to 2 kHz
        let scale = params.mel_scale;
        let delta = scale.hz_to_mel(params.mel_hi_freq) / (params.num_fbank_bins + 1) as f32;
        let centre_hz = scale.mel_to_hz((peak + 1) as f32 * delta);
        assert!((centre_hz - 2000.0).abs() < 150.0, "peak at {} Hz", centre_hz);
    }

    #[test]
    fn test_training_mean_is_subtracted() {
        let samples = sine(500.0, 1024, 4000.0);
        let plain = MelSpectrogram::new(MelSpecParams::anomaly_detection(1024)).unwrap();
        let shifted = MelSpectrogram::new(MelSpecParams {
            training_mean: 3.0,
            ..MelSpecParams::anomaly_detection(1024)
        })
        .unwrap();
        let a = plain.compute_mel_spec(&samples).unwrap();
        let b = shifted.compute_mel_spec(&samples).unwrap();
        for (x, y) in a.iter().zip(&b) {
            assert!((x - 3.0 - y).abs() < 1e-4);
        }
    }

    #[test]
    fn test_natural_log_scale() {
        let samples = sine(750.0, 1024, 6000.0);
        let db = MelSpectrogram::new(MelSpecParams::anomaly_detection(1024)).unwrap();
        let ln = MelSpectrogram::new(MelSpecParams {
            log_scale: LogScale::Natural,
            ..MelSpecParams::anomaly_detection(1024)
        })
        .unwrap();
        let a = db.compute_mel_spec(&samples).unwrap();
        let b = ln.compute_mel_spec(&samples).unwrap();
        for (x, y) in a.iter().zip(&b) {
            assert!((x - y * 10.0 * LOG10_E).abs() < 1e-3);
        }
    }

    #[test]
    fn test_invalid_params_rejected() {
        let bad = MelSpecParams {
            mel_hi_freq: 9000.0,
            ..MelSpecParams::anomaly_detection(1024)
        };
        assert!(MelSpectrogram::new(bad).is_err());

        let empty = MelSpecParams {
            num_fbank_bins: 0,
            ..MelSpecParams::anomaly_detection(1024)
        };
        assert!(MelSpectrogram::new(empty).is_err());
    }

    #[test]
    fn test_non_positive_quant_scale_rejected() {
        let mel = MelSpectrogram::new(MelSpecParams::anomaly_detection(1024)).unwrap();
        let result = mel.mel_spec_compute_quant::<i8>(&[0i16; 1024], 0.0, 0);
        assert!(matches!(result, Err(EdgeError::InvalidInput(_))));
    }
}
