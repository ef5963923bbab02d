//! Per-tick signal analysis: waveform synchronization and mood features.

mod mood;
mod sync;

// Re-export public types
pub use mood::{envelope_step, MoodExtractor, MoodState};
pub use sync::{cross_correlate, downsample, first_max_index, WaveformSynchronizer};
