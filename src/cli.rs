//! Command-line argument parsing.

use clap::Parser;
use std::path::PathBuf;

use crate::params::{BufferConfig, MoodConfig, RenderConfig, MAX_ZOOM, MIN_ZOOM};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "wavesync")]
#[command(about = "Phase-locked oscilloscope with spectral tinting", long_about = None)]
pub struct Args {
    /// Play a WAV file into the scope instead of the live input device
    #[arg(long, value_name = "PATH", conflicts_with = "silent")]
    pub wav: Option<PathBuf>,

    /// Run without any audio producer attached (flat trace)
    #[arg(long)]
    pub silent: bool,

    /// Initial zoom (raw samples averaged per displayed point, clamped to 1-4)
    #[arg(long, value_name = "FACTOR", default_value_t = 2, allow_negative_numbers = true)]
    pub zoom: i64,

    /// Ring buffer capacity per channel (samples)
    #[arg(long, value_name = "SAMPLES", default_value_t = BufferConfig::default().capacity)]
    pub capacity: usize,

    /// Spectral transform size (power of 2)
    #[arg(long, value_name = "SIZE", default_value_t = MoodConfig::default().fft_size)]
    pub fft_size: usize,

    /// Load a replacement WGSL shader
    #[arg(long, value_name = "PATH")]
    pub shader: Option<PathBuf>,

    /// Initial window width (logical pixels, clamped to 150-900; height is fixed at 300)
    #[arg(long, value_name = "PIXELS", default_value_t = RenderConfig::default().window_width)]
    pub width: u32,
}

impl Args {
    pub fn buffer_config(&self) -> BufferConfig {
        BufferConfig {
            capacity: self.capacity,
            ..BufferConfig::default()
        }
    }

    pub fn mood_config(&self) -> MoodConfig {
        MoodConfig {
            fft_size: self.fft_size,
            ..MoodConfig::default()
        }
    }

    pub fn render_config(&self) -> RenderConfig {
        RenderConfig {
            window_width: self.width,
            ..RenderConfig::default()
        }
    }

    /// Warn when the requested zoom will be clamped
    pub fn check_zoom(&self) {
        if self.zoom < MIN_ZOOM as i64 || self.zoom > MAX_ZOOM as i64 {
            log::warn!(
                "Zoom {} out of range, clamping to {}-{}",
                self.zoom,
                MIN_ZOOM,
                MAX_ZOOM
            );
        }
    }
}
