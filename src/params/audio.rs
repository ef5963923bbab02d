//! Ring buffer sizing shared by producer and consumer.

use super::analysis::{MAX_ZOOM, VIZ_POINTS};
use crate::error::VizError;

/// Shape of the ring buffer that carries samples from the audio path to the render loop
#[derive(Debug, Clone)]
pub struct BufferConfig {
    /// Number of channels (2 = stereo)
    pub channels: usize,

    /// Samples retained per channel
    /// Must cover VIZ_POINTS at the coarsest zoom (512 * 4 = 2048)
    pub capacity: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            channels: 2,
            capacity: 2048 + 1024,
        }
    }
}

impl BufferConfig {
    /// Smallest capacity that keeps a full synchronization window at every zoom
    pub const fn min_capacity() -> usize {
        VIZ_POINTS * MAX_ZOOM
    }

    /// Validate configuration (at least one channel, window fits at max zoom)
    pub fn validate(&self) -> Result<(), VizError> {
        if self.channels == 0 {
            return Err(VizError::NoChannels);
        }
        if self.capacity < Self::min_capacity() {
            return Err(VizError::CapacityTooSmall {
                capacity: self.capacity,
                required: Self::min_capacity(),
            });
        }
        Ok(())
    }
}

/// Audio constants (compile-time)
pub mod audio_constants {
    /// Frames pushed per block by the file producer
    /// 512 frames = 11.6ms @ 44.1kHz
    pub const FILE_BLOCK_FRAMES: usize = 512;

    /// Samples converted per chunk inside the capture callback
    pub const CAPTURE_SCRATCH_SAMPLES: usize = 1024;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(BufferConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_small_capacity() {
        let config = BufferConfig {
            channels: 2,
            capacity: 1024,
        };
        assert!(matches!(
            config.validate(),
            Err(VizError::CapacityTooSmall {
                capacity: 1024,
                required: 2048
            })
        ));
    }

    #[test]
    fn test_rejects_zero_channels() {
        let config = BufferConfig {
            channels: 0,
            capacity: 4096,
        };
        assert!(matches!(config.validate(), Err(VizError::NoChannels)));
    }
}
