//! Waveform synchronization and spectral mood configuration.

use std::ops::RangeInclusive;

use crate::error::VizError;

/// Number of points in the displayed waveform (and in the shader's sample array)
pub const VIZ_POINTS: usize = 512;

/// Finest zoom: one raw sample per displayed sample
pub const MIN_ZOOM: usize = 1;

/// Coarsest zoom: four raw samples averaged per displayed sample
pub const MAX_ZOOM: usize = 4;

/// Decimation factor applied before synchronization, always in [MIN_ZOOM, MAX_ZOOM]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Zoom(usize);

impl Zoom {
    /// Build a zoom from an untrusted value, clamping into range
    pub fn clamped(factor: i64) -> Self {
        Self(factor.clamp(MIN_ZOOM as i64, MAX_ZOOM as i64) as usize)
    }

    pub fn factor(self) -> usize {
        self.0
    }
}

impl Default for Zoom {
    fn default() -> Self {
        Self(2)
    }
}

/// Spectral feature extraction parameters
#[derive(Debug, Clone)]
pub struct MoodConfig {
    /// Forward transform length (must be power of 2)
    pub fft_size: usize,

    /// Bins aggregated into warmth (low band)
    pub warmth_bins: RangeInclusive<usize>,

    /// First bin aggregated into cool; the band runs to fft_size / 2 - 1
    pub cool_start_bin: usize,

    /// Per-tick release multiplier (dimensionless, 0.99 = ~1% per frame)
    pub decay: f32,
}

impl Default for MoodConfig {
    fn default() -> Self {
        Self {
            fft_size: 512,
            warmth_bins: 0..=3,
            cool_start_bin: 20,
            decay: 0.99,
        }
    }
}

impl MoodConfig {
    /// Bins aggregated into cool (high band)
    pub fn cool_bins(&self) -> RangeInclusive<usize> {
        self.cool_start_bin..=(self.fft_size / 2).saturating_sub(1)
    }

    /// Validate configuration (FFT size must be power of 2, bands non-empty, etc.)
    pub fn validate(&self) -> Result<(), VizError> {
        if !self.fft_size.is_power_of_two() {
            return Err(VizError::FftSizeNotPowerOfTwo(self.fft_size));
        }
        if self.warmth_bins.is_empty() {
            return Err(VizError::EmptyWarmthBand {
                start: *self.warmth_bins.start(),
                end: *self.warmth_bins.end(),
            });
        }
        let nyquist = self.fft_size / 2;
        if self.cool_bins().is_empty() || *self.warmth_bins.end() >= nyquist {
            return Err(VizError::FftSizeTooSmall {
                size: self.fft_size,
                start: self.cool_start_bin,
            });
        }
        if !(self.decay > 0.0 && self.decay <= 1.0) {
            return Err(VizError::InvalidDecay(self.decay));
        }
        Ok(())
    }
}
