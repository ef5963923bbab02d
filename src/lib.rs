//! Wavesync library - phase-locked, spectrally tinted oscilloscope

pub mod analysis;
pub mod audio;
pub mod cli;
pub mod driver;
pub mod error;
pub mod params;
pub mod rendering;
