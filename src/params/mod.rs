//! Parameter definitions with documented units and ranges.
//!
//! All tunable numbers live here with:
//! - Units (samples, bins, pixels)
//! - Documented ranges and meanings
//! - Validation that fails fast at construction time

mod analysis;
mod audio;
mod render;

// Re-export all types
pub use analysis::{MoodConfig, Zoom, MAX_ZOOM, MIN_ZOOM, VIZ_POINTS};
pub use audio::{audio_constants, BufferConfig};
pub use render::RenderConfig;
