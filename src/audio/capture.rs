//! Live input tap: the default capture device feeds the ring buffer.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample as CpalSample, SizedSample};
use std::sync::Arc;

use super::ring_buffer::RingBuffer;
use crate::error::VizError;
use crate::params::audio_constants::CAPTURE_SCRATCH_SAMPLES;

/// Audio input stream writing every callback block into a shared ring buffer
pub struct AudioCapture {
    /// Input stream (kept alive)
    _stream: cpal::Stream,
}

impl AudioCapture {
    /// Open the default input device and start streaming into `ring`
    pub fn start(ring: Arc<RingBuffer>) -> Result<Self, VizError> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| VizError::Device("No audio input device found".to_string()))?;

        let config = device
            .default_input_config()
            .map_err(|e| VizError::Device(format!("Failed to get input config: {}", e)))?;

        log::info!(
            "Audio input: {} @ {}Hz, {} channels, {:?}",
            device.name().unwrap_or_else(|_| "Unknown".to_string()),
            config.sample_rate().0,
            config.channels(),
            config.sample_format()
        );

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => build_stream::<f32>(&device, &config.config(), ring),
            cpal::SampleFormat::I16 => build_stream::<i16>(&device, &config.config(), ring),
            cpal::SampleFormat::U16 => build_stream::<u16>(&device, &config.config(), ring),
            other => {
                return Err(VizError::Device(format!(
                    "Unsupported input sample format: {:?}",
                    other
                )))
            }
        }?;

        stream
            .play()
            .map_err(|e| VizError::Device(format!("Failed to start input stream: {}", e)))?;

        Ok(Self { _stream: stream })
    }
}

/// Build an input stream converting `T` samples to f32 through a stack scratch
fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    ring: Arc<RingBuffer>,
) -> Result<cpal::Stream, VizError>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let channels = config.channels as usize;
    let chunk_len = scratch_chunk_len(channels)?;

    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                let mut scratch = [0.0f32; CAPTURE_SCRATCH_SAMPLES];
                for chunk in data.chunks(chunk_len) {
                    let converted = &mut scratch[..chunk.len()];
                    for (out, sample) in converted.iter_mut().zip(chunk) {
                        *out = sample.to_sample::<f32>();
                    }
                    ring.write_interleaved(converted, channels);
                }
            },
            |err| log::warn!("Audio input stream error: {}", err),
            None,
        )
        .map_err(|e| VizError::Device(format!("Failed to build input stream: {}", e)))
}

/// Samples converted per scratch pass: whole frames only, so interleaving is never split
fn scratch_chunk_len(channels: usize) -> Result<usize, VizError> {
    if channels == 0 || channels > CAPTURE_SCRATCH_SAMPLES {
        return Err(VizError::UnsupportedChannelCount(
            channels,
            CAPTURE_SCRATCH_SAMPLES,
        ));
    }
    Ok(CAPTURE_SCRATCH_SAMPLES / channels * channels)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_len_holds_whole_frames() {
        assert_eq!(scratch_chunk_len(1).unwrap(), CAPTURE_SCRATCH_SAMPLES);
        assert_eq!(scratch_chunk_len(2).unwrap(), CAPTURE_SCRATCH_SAMPLES);
        assert_eq!(scratch_chunk_len(3).unwrap(), 1023);
        assert_eq!(
            scratch_chunk_len(CAPTURE_SCRATCH_SAMPLES).unwrap(),
            CAPTURE_SCRATCH_SAMPLES
        );
    }

    #[test]
    fn test_chunk_len_rejects_oversized_devices() {
        for channels in [0, CAPTURE_SCRATCH_SAMPLES + 1, 4096] {
            assert!(matches!(
                scratch_chunk_len(channels),
                Err(VizError::UnsupportedChannelCount(c, _)) if c == channels
            ));
        }
    }
}
