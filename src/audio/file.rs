//! WAV file producer: streams a decoded file into the ring buffer at
//! real-time pace, standing in for a host audio callback.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use super::ring_buffer::RingBuffer;
use crate::error::VizError;
use crate::params::audio_constants::FILE_BLOCK_FRAMES;

/// Interleaved samples decoded from a WAV file
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub channels: usize,
    pub sample_rate: u32,
}

impl DecodedAudio {
    /// Decode a WAV file (integer or float) into normalized f32 samples
    pub fn from_wav(path: impl AsRef<Path>) -> Result<Self, VizError> {
        let mut reader = hound::WavReader::open(path)?;
        let spec = reader.spec();

        let samples = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .collect::<Result<Vec<_>, _>>()?,
            hound::SampleFormat::Int => {
                let scale = 1.0 / (1u64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 * scale))
                    .collect::<Result<Vec<_>, _>>()?
            }
        };

        Ok(Self {
            samples,
            channels: spec.channels as usize,
            sample_rate: spec.sample_rate,
        })
    }

    pub fn frame_count(&self) -> usize {
        self.samples.len() / self.channels.max(1)
    }

    /// Wall-clock duration of `frames` frames
    pub fn block_duration(&self, frames: usize) -> Duration {
        Duration::from_secs_f64(frames as f64 / self.sample_rate.max(1) as f64)
    }
}

/// Producer thread pushing file blocks into a ring buffer, looping at end of file
pub struct FileFeeder {
    running: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<()>>,
}

impl FileFeeder {
    /// Decode `path` and start feeding `ring`
    pub fn spawn(path: impl AsRef<Path>, ring: Arc<RingBuffer>) -> Result<Self, VizError> {
        let audio = DecodedAudio::from_wav(path.as_ref())?;
        if audio.frame_count() == 0 {
            return Err(VizError::Device(format!(
                "WAV file {} contains no audio",
                path.as_ref().display()
            )));
        }

        log::info!(
            "Audio file: {} @ {}Hz, {} channels, {} frames",
            path.as_ref().display(),
            audio.sample_rate,
            audio.channels,
            audio.frame_count()
        );

        Ok(Self::spawn_decoded(audio, ring))
    }

    /// Start feeding already-decoded audio into `ring`
    pub fn spawn_decoded(audio: DecodedAudio, ring: Arc<RingBuffer>) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let running_thread = Arc::clone(&running);

        let thread = thread::spawn(move || {
            let block_len = FILE_BLOCK_FRAMES * audio.channels;
            let pause = audio.block_duration(FILE_BLOCK_FRAMES);

            while running_thread.load(Ordering::Relaxed) {
                for block in audio.samples.chunks(block_len) {
                    if !running_thread.load(Ordering::Relaxed) {
                        return;
                    }
                    ring.write_interleaved(block, audio.channels);
                    thread::sleep(pause);
                }
            }
        });

        Self {
            running,
            thread: Some(thread),
        }
    }

    /// Stop the feeder thread and wait for it to exit
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for FileFeeder {
    fn drop(&mut self) {
        self.stop();
    }
}
