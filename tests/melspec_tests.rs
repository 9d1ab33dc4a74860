mod common;

use common::{init_logging, TEST_WAV, TEST_WAV_MEL_SPEC};
use edge_ml_rs::audio::{load_wav, MelSpecParams, MelSpectrogram};
use edge_ml_rs::math::QuantizedType;
use edge_ml_rs::EdgeError;
use num_traits::ToPrimitive;

const QUANT_SCALE: f32 = 0.1410219967365265;
const QUANT_OFFSET: i32 = 11;

fn extractor() -> MelSpectrogram {
    MelSpectrogram::new(MelSpecParams::anomaly_detection(1024)).unwrap()
}

#[test]
fn test_matches_golden_mel_spec() {
    init_logging();
    let output = extractor().compute_mel_spec(&TEST_WAV).unwrap();

    assert_eq!(output.len(), TEST_WAV_MEL_SPEC.len());
    for (i, (got, want)) in output.iter().zip(TEST_WAV_MEL_SPEC.iter()).enumerate() {
        assert!(
            (got - want).abs() <= 0.1,
            "bin {}: got {}, expected {}",
            i,
            got,
            want
        );
    }
}

fn check_quantized<T>()
where
    T: QuantizedType + std::fmt::Debug,
{
    let output = extractor()
        .mel_spec_compute_quant::<T>(&TEST_WAV, QUANT_SCALE, QUANT_OFFSET)
        .unwrap();
    assert_eq!(output.len(), TEST_WAV_MEL_SPEC.len());

    let min = T::min_value().to_i64().unwrap();
    let max = T::max_value().to_i64().unwrap();
    for (i, (got, golden)) in output.iter().zip(TEST_WAV_MEL_SPEC.iter()).enumerate() {
        let expected = ((golden / QUANT_SCALE) as f64 + QUANT_OFFSET as f64).round() as i64;
        let expected = expected.clamp(min, max);
        let got = got.to_i64().unwrap();
        assert!(
            (got - expected).abs() <= 1,
            "bin {}: got {}, expected {}",
            i,
            got,
            expected
        );
    }
}

#[test]
fn test_quantized_int8() {
    check_quantized::<i8>();
}

#[test]
fn test_quantized_uint8() {
    check_quantized::<u8>();
}

#[test]
fn test_quantized_int16() {
    check_quantized::<i16>();
}

#[test]
fn test_repeated_calls_are_identical() {
    let mel = extractor();
    let first = mel.compute_mel_spec(&TEST_WAV).unwrap();
    let second = mel.compute_mel_spec(&TEST_WAV).unwrap();
    let first_bits: Vec<u32> = first.iter().map(|v| v.to_bits()).collect();
    let second_bits: Vec<u32> = second.iter().map(|v| v.to_bits()).collect();
    assert_eq!(first_bits, second_bits);
}

#[test]
fn test_wrong_window_length() {
    let mel = extractor();
    match mel.compute_mel_spec(&TEST_WAV[..1000]) {
        Err(EdgeError::InvalidInputSize { expected, actual }) => {
            assert_eq!(expected, 1024);
            assert_eq!(actual, 1000);
        }
        other => panic!("expected InvalidInputSize, got {:?}", other),
    }
    assert!(mel
        .mel_spec_compute_quant::<i8>(&[0i16; 2048], QUANT_SCALE, QUANT_OFFSET)
        .is_err());
}

#[test]
fn test_extractor_is_shareable_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<MelSpectrogram>();

    let mel = std::sync::Arc::new(extractor());
    let handles: Vec<_> = (0..2)
        .map(|_| {
            let mel = mel.clone();
            std::thread::spawn(move || mel.compute_mel_spec(&TEST_WAV).unwrap())
        })
        .collect();
    let results: Vec<Vec<f32>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(results[0], results[1]);
}

#[test]
fn test_wav_file_to_mel_frames() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clip.wav");

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 16000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec).unwrap();
    for &s in TEST_WAV.iter() {
        writer.write_sample(s).unwrap();
    }
    writer.finalize().unwrap();

    let clip = load_wav(&path, 16000, 0).unwrap();
    assert_eq!(clip.samples.len(), 1024);

    let from_file = extractor().compute_mel_spec(&clip.samples).unwrap();
    let direct = extractor().compute_mel_spec(&TEST_WAV).unwrap();
    assert_eq!(from_file, direct);
}
