//! Spectral "mood" features driving the shader tint.
//!
//! Rather than track a pitch, energy is aggregated over a fixed low band
//! (warmth) and a fixed high band (cool), then passed through a peak-hold
//! envelope: instant attack, exponential release.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

use crate::error::VizError;
use crate::params::MoodConfig;

/// Smoothed band energies, each in [0, 1]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MoodState {
    pub warmth: f32,
    pub cool: f32,
}

/// Peak-hold with decay: snap up to `estimate` if it is higher, clamp, then release
pub fn envelope_step(stored: f32, estimate: f32, decay: f32) -> f32 {
    let held = if estimate > stored { estimate } else { stored };
    held.clamp(0.0, 1.0) * decay
}

/// Forward transform plus band aggregation, owned by the render loop
pub struct MoodExtractor {
    config: MoodConfig,
    fft: Arc<dyn Fft<f32>>,
    spectrum: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    state: MoodState,

    /// Normalizers (constant for a given band layout)
    warmth_norm: f32,
    cool_norm: f32,
}

impl MoodExtractor {
    /// Plan the transform and precompute band normalizers
    pub fn new(config: MoodConfig) -> Result<Self, VizError> {
        config.validate()?;

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(config.fft_size);
        let scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];

        let warmth_norm = config
            .warmth_bins
            .clone()
            .map(|i| 12.0 / (i as f32 + 3.0))
            .sum();
        let cool_norm = config.cool_bins().map(|i| i as f32).sum();

        Ok(Self {
            spectrum: vec![Complex::new(0.0, 0.0); config.fft_size],
            scratch,
            fft,
            config,
            state: MoodState::default(),
            warmth_norm,
            cool_norm,
        })
    }

    pub fn state(&self) -> MoodState {
        self.state
    }

    /// Instantaneous (warmth, cool) estimates for `signal`, before dynamics.
    ///
    /// The signal is zero-padded or truncated to the transform size.
    pub fn estimate(&mut self, signal: &[f32]) -> (f32, f32) {
        for (i, bin) in self.spectrum.iter_mut().enumerate() {
            *bin = Complex::new(signal.get(i).copied().unwrap_or(0.0), 0.0);
        }
        self.fft.process_with_scratch(&mut self.spectrum, &mut self.scratch);

        let warmth = self
            .config
            .warmth_bins
            .clone()
            .map(|i| self.spectrum[i].re.abs() / (i as f32 + 2.0))
            .sum::<f32>()
            / self.warmth_norm;

        let cool = self
            .config
            .cool_bins()
            .map(|i| 2.0 * self.spectrum[i].re.abs() * i as f32)
            .sum::<f32>()
            / self.cool_norm;

        (warmth, cool)
    }

    /// Run one tick: estimate, then apply attack/clamp/decay to each scalar
    pub fn update(&mut self, signal: &[f32]) -> MoodState {
        let (warmth, cool) = self.estimate(signal);
        let decay = self.config.decay;

        self.state = MoodState {
            warmth: envelope_step(self.state.warmth, warmth, decay),
            cool: envelope_step(self.state.cool, cool, decay),
        };
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn extractor() -> MoodExtractor {
        MoodExtractor::new(MoodConfig::default()).unwrap()
    }

    fn tone(bin: usize, amplitude: f32) -> Vec<f32> {
        (0..512)
            .map(|i| amplitude * (2.0 * PI * bin as f32 * i as f32 / 512.0).cos())
            .collect()
    }

    #[test]
    fn test_envelope_attack_and_decay() {
        assert!((envelope_step(0.2, 0.8, 0.99) - 0.8 * 0.99).abs() < 1e-6);
        assert!((envelope_step(0.8, 0.2, 0.99) - 0.8 * 0.99).abs() < 1e-6);
        // Over-range estimates clamp before decaying
        assert!((envelope_step(0.0, 40.0, 0.99) - 0.99).abs() < 1e-6);
        assert_eq!(envelope_step(0.5, f32::NEG_INFINITY, 1.0), 0.5);
    }

    #[test]
    fn test_silence_estimates_zero() {
        let mut mood = extractor();
        assert_eq!(mood.estimate(&[0.0; 512]), (0.0, 0.0));
    }

    #[test]
    fn test_low_tone_drives_warmth() {
        let mut mood = extractor();
        let (warmth, cool) = mood.estimate(&tone(2, 0.01));

        // Bin 2 of a 512-point cosine: |Re| = 0.01 * 256 = 2.56, weighted by 1/4
        let norm: f32 = (0..=3).map(|i| 12.0 / (i as f32 + 3.0)).sum();
        assert!((warmth - 2.56 / 4.0 / norm).abs() < 1e-3);
        assert!(cool < 1e-3);
    }

    #[test]
    fn test_high_tone_drives_cool() {
        let mut mood = extractor();
        let (warmth, cool) = mood.estimate(&tone(100, 0.01));

        let norm: f32 = (20..=255).map(|i| i as f32).sum();
        assert!((cool - 2.0 * 2.56 * 100.0 / norm).abs() < 1e-3);
        assert!(warmth < 1e-3);
    }

    #[test]
    fn test_short_signal_is_zero_padded() {
        let mut mood = extractor();
        let (warmth, _) = mood.estimate(&[1.0; 4]);

        // DC bin sums the four ones
        assert!(warmth > 0.0);
    }

    #[test]
    fn test_decay_law_without_excitation() {
        let mut mood = extractor();
        let loud = tone(1, 0.05);

        let peak = mood.update(&loud);
        assert!(peak.warmth > 0.0);

        for k in 1..=50 {
            let state = mood.update(&[0.0; 512]);
            let expected = peak.warmth * 0.99f32.powi(k);
            assert!((state.warmth - expected).abs() < 1e-5);
            assert!((state.cool - peak.cool * 0.99f32.powi(k)).abs() < 1e-5);
        }
    }

    #[test]
    fn test_empty_warmth_band_fails_construction() {
        let config = MoodConfig {
            warmth_bins: 3..=2,
            ..MoodConfig::default()
        };
        assert!(matches!(
            MoodExtractor::new(config),
            Err(VizError::EmptyWarmthBand { .. })
        ));
    }

    #[test]
    fn test_bounds_hold_for_extreme_input() {
        let mut mood = extractor();
        let signals = [
            tone(1, 1000.0),
            tone(200, 1000.0),
            vec![f32::MAX / 1e6; 512],
            (0..512).map(|i| if i % 2 == 0 { 5.0 } else { -5.0 }).collect(),
            vec![0.0; 512],
        ];

        for _ in 0..200 {
            for signal in &signals {
                let state = mood.update(signal);
                assert!((0.0..=1.0).contains(&state.warmth));
                assert!((0.0..=1.0).contains(&state.cool));
            }
        }
    }
}
