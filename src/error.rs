//! Error types for configuration, producers and the rendering backend.

use thiserror::Error;

/// Errors raised while configuring or starting the visualizer
#[derive(Debug, Error)]
pub enum VizError {
    #[error("Ring buffer needs at least one channel")]
    NoChannels,

    #[error("Ring buffer capacity {capacity} is below the {required}-sample sync window")]
    CapacityTooSmall { capacity: usize, required: usize },

    #[error("Warmth band {start}..={end} contains no bins")]
    EmptyWarmthBand { start: usize, end: usize },

    #[error("Audio device reports {0} channels, capture supports 1-{1}")]
    UnsupportedChannelCount(usize, usize),

    #[error("FFT size must be power of 2, got {0}")]
    FftSizeNotPowerOfTwo(usize),

    #[error("FFT size {size} leaves the cool band starting at bin {start} empty")]
    FftSizeTooSmall { size: usize, start: usize },

    #[error("Decay factor must be in (0, 1], got {0}")]
    InvalidDecay(f32),

    #[error("Audio device error: {0}")]
    Device(String),

    #[error("Failed to read WAV file: {0}")]
    Wav(#[from] hound::Error),

    #[error("GPU initialization failed: {0}")]
    Gpu(String),
}

/// Transient, non-fatal failures reported by a rendering backend
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Shader program failed to compile: {0}")]
    ShaderCompile(String),

    #[error("No shader program available")]
    NoProgram,

    #[error("Surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),
}
