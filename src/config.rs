//! Application configuration
//!
//! Settings come from three layers, later ones winning:
//!
//! 1. built-in defaults,
//! 2. an optional JSON file,
//! 3. `EDGE_ML_*` environment variables (a `.env` file is loaded first).
//!
//! Command line flags are applied on top by the binary.

use crate::arena::DEFAULT_ARENA_SIZE;
use crate::audio::MelSpecParams;
use crate::detection::DetectorConfig;
use crate::error::{EdgeError, Result};
use crate::use_case::AnomalyConfig;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Prefix of every environment override
pub const ENV_PREFIX: &str = "EDGE_ML_";

/// Geometry of the images fed to the detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    pub width: usize,
    pub height: usize,
    /// 3 to present in colour, 1 for grayscale
    pub presentation_channels: usize,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            width: 192,
            height: 192,
            presentation_channels: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub mel_spec: MelSpecParams,
    pub detector: DetectorConfig,
    pub anomaly: AnomalyConfig,
    pub image: ImageConfig,
    pub arena_size: usize,
    /// Worker threads for the inference backend
    pub threads: i32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            mel_spec: MelSpecParams::anomaly_detection(1024),
            detector: DetectorConfig::default(),
            anomaly: AnomalyConfig::default(),
            image: ImageConfig::default(),
            arena_size: DEFAULT_ARENA_SIZE,
            threads: 1,
        }
    }
}

impl AppConfig {
    /// Defaults, then `path` if given, then the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        // .env is optional
        dotenvy::dotenv().ok();

        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        log::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Apply `EDGE_ML_*` overrides read through `lookup`
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let get = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));

        override_from(&get, "DETECTOR_THRESHOLD", &mut self.detector.threshold)?;
        override_from(&get, "NMS_THRESHOLD", &mut self.detector.nms_threshold)?;
        override_from(&get, "NMS_MODE", &mut self.detector.nms_mode)?;
        override_from(&get, "TOP_N", &mut self.detector.top_n)?;
        override_from(&get, "NUM_CLASSES", &mut self.detector.num_classes)?;
        override_from(&get, "FRAME_LEN", &mut self.anomaly.frame_len)?;
        override_from(&get, "FRAME_STRIDE", &mut self.anomaly.frame_stride)?;
        override_from(&get, "TRAINING_MEAN", &mut self.anomaly.training_mean)?;
        override_from(&get, "MACHINE_ID", &mut self.anomaly.machine_id)?;
        override_from(&get, "ANOMALY_THRESHOLD", &mut self.anomaly.score_threshold)?;
        override_from(&get, "IMAGE_WIDTH", &mut self.image.width)?;
        override_from(&get, "IMAGE_HEIGHT", &mut self.image.height)?;
        override_from(&get, "ARENA_SIZE", &mut self.arena_size)?;
        override_from(&get, "THREADS", &mut self.threads)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.mel_spec.validate()?;
        self.detector.validate()?;
        self.anomaly.validate()?;
        if self.image.width == 0 || self.image.height == 0 {
            return Err(EdgeError::Config("image size must be positive".to_string()));
        }
        if !matches!(self.image.presentation_channels, 1 | 3) {
            return Err(EdgeError::Config(format!(
                "presentation_channels must be 1 or 3, got {}",
                self.image.presentation_channels
            )));
        }
        if self.arena_size == 0 {
            return Err(EdgeError::Config("arena_size must be positive".to_string()));
        }
        if self.threads < 1 {
            return Err(EdgeError::Config("threads must be at least 1".to_string()));
        }
        Ok(())
    }
}

fn override_from<T>(
    get: &impl Fn(&str) -> Option<String>,
    name: &str,
    target: &mut T,
) -> Result<()>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    if let Some(raw) = get(name) {
        *target = raw.trim().parse().map_err(|e: T::Err| {
            EdgeError::Config(format!("{}{}={:?}: {}", ENV_PREFIX, name, raw, e))
        })?;
        log::debug!("config override {}{}", ENV_PREFIX, name);
    }
    Ok(())
}
