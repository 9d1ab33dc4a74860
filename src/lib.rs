//! Feature extraction and post-processing for quantized edge ML models
//!
//! The crate turns sensor data into model inputs and model outputs into
//! results:
//!
//! * [`audio`] computes log-mel spectrogram frames from 16-bit audio and
//!   quantizes them for an input tensor;
//! * [`detection`] decodes anchor-based detector outputs and removes
//!   overlapping boxes;
//! * [`use_case`] wires sources, a [`models::Model`] and presentation sinks
//!   into complete applications.

pub mod arena;
pub mod audio;
pub mod config;
pub mod detection;
pub mod error;
pub mod image;
pub mod math;
pub mod models;
pub mod presentation;
pub mod profiler;
pub mod source;
pub mod tensor;
pub mod use_case;

pub use error::{EdgeError, Result};
