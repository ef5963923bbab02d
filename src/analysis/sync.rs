//! Cross-correlation waveform synchronization.
//!
//! Each tick the incoming chunk is folded to mono, decimated by the zoom
//! factor, and searched for the offset that best matches the previously
//! displayed waveform. Copying the window at that offset keeps a periodic
//! signal visually stationary instead of drifting across the screen.

use crate::params::{Zoom, VIZ_POINTS};

/// Average all channels and decimate by `zoom` into `out`.
///
/// Each output sample is the mean of `zoom` consecutive frames across all
/// channels. The most recent `(len / zoom) * zoom` frames are used, so a
/// remainder is dropped from the oldest end. `out` is resized to `len / zoom`.
pub fn downsample<S: AsRef<[f32]>>(chunk: &[S], zoom: Zoom, out: &mut Vec<f32>) {
    let zoom = zoom.factor();
    let len = chunk.iter().map(|ch| ch.as_ref().len()).min().unwrap_or(0);
    let points = if chunk.is_empty() { 0 } else { len / zoom };

    out.clear();
    out.resize(points, 0.0);
    if points == 0 {
        return;
    }

    let skip = len - points * zoom;
    let weight = 1.0 / (chunk.len() * zoom) as f32;

    for channel in chunk {
        let samples = &channel.as_ref()[skip..len];
        for (point, group) in out.iter_mut().zip(samples.chunks_exact(zoom)) {
            *point += group.iter().sum::<f32>() * weight;
        }
    }
}

/// Sliding dot product of `kernel` over `signal`.
///
/// `out[s] = Σ signal[s + i] · kernel[i]` for every `s` in `0..=signal.len() - kernel.len()`.
/// `out` is empty when the kernel is longer than the signal.
pub fn cross_correlate(signal: &[f32], kernel: &[f32], out: &mut Vec<f32>) {
    out.clear();
    if kernel.len() > signal.len() {
        return;
    }

    out.extend(
        signal
            .windows(kernel.len())
            .map(|window| window.iter().zip(kernel).map(|(a, b)| a * b).sum::<f32>()),
    );
}

/// Index of the first maximum (ascending scan, strict `>`). Zero for an empty slice.
pub fn first_max_index(values: &[f32]) -> usize {
    let mut best = 0;
    for (i, &value) in values.iter().enumerate().skip(1) {
        if value > values[best] {
            best = i;
        }
    }
    best
}

/// Keeps the displayed waveform phase-locked from tick to tick
pub struct WaveformSynchronizer {
    /// Last displayed, phase-aligned waveform (raw amplitudes)
    visualization: [f32; VIZ_POINTS],

    /// Downsampled mono scratch
    mono: Vec<f32>,

    /// Correlation scratch
    correlation: Vec<f32>,

    /// Offset chosen by the most recent synchronization
    last_sync_pos: usize,
}

impl Default for WaveformSynchronizer {
    fn default() -> Self {
        Self::new()
    }
}

impl WaveformSynchronizer {
    pub fn new() -> Self {
        Self {
            visualization: [0.0; VIZ_POINTS],
            mono: Vec::new(),
            correlation: Vec::new(),
            last_sync_pos: 0,
        }
    }

    /// Current waveform, always exactly VIZ_POINTS long
    pub fn visualization(&self) -> &[f32; VIZ_POINTS] {
        &self.visualization
    }

    pub fn last_sync_pos(&self) -> usize {
        self.last_sync_pos
    }

    /// Align a new chunk to the displayed waveform and overwrite it in place.
    ///
    /// Candidate offsets are limited to `0..=M - VIZ_POINTS` where `M` is the
    /// downsampled length. If `M < VIZ_POINTS` (prevented by buffer validation)
    /// the available points are copied to the front and the rest zero-filled.
    /// Returns the chosen offset.
    pub fn synchronize<S: AsRef<[f32]>>(&mut self, chunk: &[S], zoom: Zoom) -> usize {
        downsample(chunk, zoom, &mut self.mono);

        if self.mono.len() < VIZ_POINTS {
            let available = self.mono.len();
            self.visualization[..available].copy_from_slice(&self.mono);
            self.visualization[available..].fill(0.0);
            self.last_sync_pos = 0;
            return 0;
        }

        cross_correlate(&self.mono, &self.visualization, &mut self.correlation);
        let sync_pos = first_max_index(&self.correlation);

        self.visualization
            .copy_from_slice(&self.mono[sync_pos..sync_pos + VIZ_POINTS]);
        self.last_sync_pos = sync_pos;
        sync_pos
    }

    /// Zero the waveform (no producer attached)
    pub fn silence(&mut self) {
        self.visualization.fill(0.0);
        self.last_sync_pos = 0;
    }
}
