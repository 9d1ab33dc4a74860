use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use edge_ml_rs::{
    arena::TensorArena,
    audio::{load_wav, window_offsets, MelSpectrogram},
    config::AppConfig,
    detection::{DetectorPostProcessing, NmsMode},
    models::{MicroNetKwsModel, Model, YoloFastestModel},
    presentation::LogPresentation,
    profiler::Profiler,
    source::RawImageDir,
    use_case::{run_inference_runner, AnomalyDetectionHandler, ObjectDetectionHandler},
};
use log::info;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "edge-ml")]
#[command(about = "Run quantized edge ML pipelines on files")]
#[command(long_about = "
Feature extraction, object detection and anomaly detection pipelines for
quantized TensorFlow Lite models.

EXAMPLES:
  # Print log-mel frames of a clip as JSON lines
  edge-ml melspec --wav clip.wav

  # Detect objects in every 192x192 .rgb image of a directory
  edge-ml detect --model yolo_fastest.tflite --images ./images --all

  # Score a machine sound clip
  edge-ml anomaly --model ad.tflite --wav pump.wav --machine-id 2

Settings can also be provided through --config and EDGE_ML_* variables.
")]
struct Args {
    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compute log-mel spectrogram frames of a WAV file
    Melspec {
        #[arg(long)]
        wav: PathBuf,

        /// Channel to read from multi-channel files
        #[arg(long, default_value = "0")]
        channel: usize,

        /// Samples between frames (defaults to the frame length)
        #[arg(long)]
        stride: Option<usize>,

        /// Quantize frames with this scale
        #[arg(long)]
        quant_scale: Option<f32>,

        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        quant_offset: i32,

        #[arg(long, value_enum, default_value = "int8")]
        quant_type: QuantType,
    },

    /// Run the object detector over raw RGB images
    Detect {
        #[arg(long)]
        model: PathBuf,

        /// Directory with .rgb/.raw images
        #[arg(long)]
        images: PathBuf,

        /// Image to start from
        #[arg(long)]
        index: Option<usize>,

        /// Process every image once
        #[arg(long)]
        all: bool,

        #[arg(long)]
        threshold: Option<f32>,

        #[arg(long)]
        nms_threshold: Option<f32>,

        #[arg(long)]
        nms_mode: Option<NmsMode>,

        /// Present images in grayscale
        #[arg(long)]
        grayscale: bool,

        /// Write presented frames with boxes to this directory
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },

    /// Score a machine sound clip for anomalies
    Anomaly {
        #[arg(long)]
        model: PathBuf,

        #[arg(long)]
        wav: PathBuf,

        #[arg(long)]
        machine_id: Option<usize>,

        #[arg(long, allow_hyphen_values = true)]
        threshold: Option<f32>,
    },

    /// Run a model once on random or given input
    Infer {
        #[arg(long)]
        model: PathBuf,

        /// Raw bytes for input 0
        #[arg(long)]
        input: Option<PathBuf>,

        /// Seed for the random input
        #[arg(long)]
        seed: Option<u64>,

        /// Check the model has the keyword spotting layout
        #[arg(long)]
        kws: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum QuantType {
    Int8,
    Uint8,
    Int16,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = AppConfig::load(args.config.as_deref()).context("loading configuration")?;
    info!("🚀 edge-ml starting");

    match args.command {
        Command::Melspec {
            wav,
            channel,
            stride,
            quant_scale,
            quant_offset,
            quant_type,
        } => melspec(&config, &wav, channel, stride, quant_scale.map(|s| (s, quant_offset, quant_type))),
        Command::Detect {
            model,
            images,
            index,
            all,
            threshold,
            nms_threshold,
            nms_mode,
            grayscale,
            output_dir,
        } => {
            if let Some(t) = threshold {
                config.detector.threshold = t;
            }
            if let Some(t) = nms_threshold {
                config.detector.nms_threshold = t;
            }
            if let Some(mode) = nms_mode {
                config.detector.nms_mode = mode;
            }
            if grayscale {
                config.image.presentation_channels = 1;
            }
            config.validate()?;
            detect(&config, &model, &images, index, all, output_dir.as_deref())
        }
        Command::Anomaly {
            model,
            wav,
            machine_id,
            threshold,
        } => {
            if let Some(id) = machine_id {
                config.anomaly.machine_id = id;
            }
            if let Some(t) = threshold {
                config.anomaly.score_threshold = t;
            }
            config.validate()?;
            anomaly(&config, &model, &wav)
        }
        Command::Infer {
            model,
            input,
            seed,
            kws,
        } => infer(&config, &model, input.as_deref(), seed, kws),
    }
}

fn melspec(
    config: &AppConfig,
    wav: &Path,
    channel: usize,
    stride: Option<usize>,
    quant: Option<(f32, i32, QuantType)>,
) -> anyhow::Result<()> {
    let params = config.mel_spec.clone();
    let clip = load_wav(wav, params.sampling_freq, channel)?;
    let mel = MelSpectrogram::new(params)?;
    let stride = stride.unwrap_or(mel.frame_len());

    let mut frames = 0;
    for start in window_offsets(clip.samples.len(), mel.frame_len(), stride) {
        let window = &clip.samples[start..start + mel.frame_len()];
        let line = match quant {
            None => serde_json::to_string(&mel.compute_mel_spec(window)?)?,
            Some((scale, offset, QuantType::Int8)) => {
                serde_json::to_string(&mel.mel_spec_compute_quant::<i8>(window, scale, offset)?)?
            }
            Some((scale, offset, QuantType::Uint8)) => {
                serde_json::to_string(&mel.mel_spec_compute_quant::<u8>(window, scale, offset)?)?
            }
            Some((scale, offset, QuantType::Int16)) => {
                serde_json::to_string(&mel.mel_spec_compute_quant::<i16>(window, scale, offset)?)?
            }
        };
        println!("{}", line);
        frames += 1;
    }
    info!("{} frames from {:.2}s of audio", frames, clip.duration_secs());
    Ok(())
}

fn detect(
    config: &AppConfig,
    model_path: &Path,
    images: &Path,
    index: Option<usize>,
    all: bool,
    output_dir: Option<&Path>,
) -> anyhow::Result<()> {
    let mut model = YoloFastestModel::new(open_model(model_path, config.threads)?);
    model.init()?;
    info!(
        "Detector input {}x{}",
        model.input_cols()?,
        model.input_rows()?
    );

    let source = RawImageDir::open(images, config.image.width, config.image.height)?;
    let mut presentation = match output_dir {
        Some(dir) => LogPresentation::with_output_dir(dir)?,
        None => LogPresentation::new(),
    };
    let post = DetectorPostProcessing::new(config.detector.clone())?;
    let mut profiler = Profiler::new("object_detection");
    let mut arena = TensorArena::new(config.arena_size);

    let mut handler = ObjectDetectionHandler::new(
        &mut model,
        &source,
        &mut presentation,
        &post,
        &mut profiler,
        &mut arena,
    )
    .with_presentation_channels(config.image.presentation_channels);

    let detections = handler.run(index, all)?;
    let total: usize = detections.iter().map(|d| d.results.len()).sum();
    info!("✅ {} detections in {} images", total, detections.len());
    Ok(())
}

fn anomaly(config: &AppConfig, model_path: &Path, wav: &Path) -> anyhow::Result<()> {
    let mut model = open_model(model_path, config.threads)?;
    model.init()?;

    let clip = load_wav(wav, config.mel_spec.sampling_freq, 0)?;
    let mut profiler = Profiler::new("anomaly_detection");
    let mut handler = AnomalyDetectionHandler::new(&mut model, &mut profiler, config.anomaly.clone())?;
    let result = handler.run(&clip.samples)?;

    println!(
        "{}: score {:.6} over {} inferences -> {}",
        wav.display(),
        result.score,
        result.inferences,
        if result.is_anomaly { "ANOMALY" } else { "normal" }
    );
    Ok(())
}

fn infer(
    config: &AppConfig,
    model_path: &Path,
    input: Option<&Path>,
    seed: Option<u64>,
    kws: bool,
) -> anyhow::Result<()> {
    let bytes = match input {
        Some(path) => Some(std::fs::read(path).with_context(|| format!("reading {}", path.display()))?),
        None => None,
    };
    let mut profiler = Profiler::new("inference_runner");

    let inner = open_model(model_path, config.threads)?;
    let summaries = if kws {
        let mut model = MicroNetKwsModel::new(inner);
        model.init()?;
        info!(
            "Keyword model: {} windows x {} features",
            model.num_audio_windows()?,
            model.num_mfcc_features()?
        );
        run_inference_runner(&mut model, &mut profiler, bytes.as_deref(), seed)?
    } else {
        let mut model = inner;
        run_inference_runner(&mut model, &mut profiler, bytes.as_deref(), seed)?
    };

    for s in &summaries {
        println!(
            "output {}: {} {:?} argmax={} max={:.4}",
            s.index, s.data_type, s.shape, s.argmax, s.max
        );
    }
    info!("Inference completed.");
    Ok(())
}

#[cfg(feature = "tflite")]
fn open_model(path: &Path, threads: i32) -> anyhow::Result<Box<dyn Model>> {
    use edge_ml_rs::models::TfliteModel;
    Ok(Box::new(TfliteModel::new(path).with_threads(threads)))
}

#[cfg(not(feature = "tflite"))]
fn open_model(path: &Path, _threads: i32) -> anyhow::Result<Box<dyn Model>> {
    anyhow::bail!(
        "cannot load {}: edge-ml was built without the `tflite` feature",
        path.display()
    )
}
