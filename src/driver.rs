//! Render loop driver: read, synchronize, extract, publish, draw.
//!
//! Lives entirely on the consumer side. The only state it shares with the
//! audio path is the attached ring buffer.

use glam::Vec2;
use std::sync::Arc;

use crate::analysis::{MoodExtractor, MoodState, WaveformSynchronizer};
use crate::audio::RingBuffer;
use crate::error::{BackendError, VizError};
use crate::params::{BufferConfig, MoodConfig, Zoom, VIZ_POINTS};

/// Per-frame data handed to the rendering backend
#[derive(Debug, Clone, Copy)]
pub struct FrameUniforms<'a> {
    /// Viewport size in physical pixels
    pub resolution: Vec2,
    /// Phase-aligned waveform, raw amplitudes
    pub samples: &'a [f32; VIZ_POINTS],
    pub warmth: f32,
    pub cool: f32,
}

/// Drawing surface driven by the render loop
pub trait RenderBackend {
    /// A rendering context became available: build the shader program.
    ///
    /// Failure is recorded by the caller and is not retried until the next
    /// context creation.
    fn context_created(&mut self) -> Result<(), BackendError>;

    /// The context is going away: release program and bound resources
    fn context_closing(&mut self);

    /// Whether a valid shader program exists
    fn has_program(&self) -> bool;

    /// Upload this frame's uniform set
    fn publish(&mut self, uniforms: &FrameUniforms<'_>);

    /// Draw the full-screen quad with the last published uniforms
    fn draw(&mut self) -> Result<(), BackendError>;
}

/// Render loop lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Stopped,
    Running,
}

/// Outcome of a single tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// Loop is stopped; nothing happened
    Idle,
    /// Uniforms published but no shader program, draw skipped
    Skipped,
    Drawn,
}

/// Drives one waveform trace from a ring buffer to a rendering backend
pub struct RenderLoop<B: RenderBackend> {
    backend: B,
    state: LoopState,
    ring: Option<Arc<RingBuffer>>,
    zoom: Zoom,

    /// Per-channel AudioChunk scratch, sized at attach time
    chunk: Vec<Vec<f32>>,

    sync: WaveformSynchronizer,
    mood: MoodExtractor,

    /// Most recent backend failure (shader compile etc.)
    last_error: Option<BackendError>,
}

impl<B: RenderBackend> RenderLoop<B> {
    pub fn new(backend: B, mood_config: MoodConfig) -> Result<Self, VizError> {
        Ok(Self {
            backend,
            state: LoopState::Stopped,
            ring: None,
            zoom: Zoom::default(),
            chunk: Vec::new(),
            sync: WaveformSynchronizer::new(),
            mood: MoodExtractor::new(mood_config)?,
            last_error: None,
        })
    }

    /// Bind the shared ring buffer read each tick.
    ///
    /// Rejects buffers too small to hold a synchronization window at the
    /// coarsest zoom. Replaces any previously attached buffer.
    pub fn attach(&mut self, ring: Arc<RingBuffer>) -> Result<(), VizError> {
        BufferConfig {
            channels: ring.channel_count(),
            capacity: ring.capacity(),
        }
        .validate()?;

        self.chunk = vec![vec![0.0; ring.capacity()]; ring.channel_count()];
        log::info!(
            "Ring buffer attached: {} channels x {} samples",
            ring.channel_count(),
            ring.capacity()
        );
        self.ring = Some(ring);
        Ok(())
    }

    /// Drop the consumer's handle on the ring buffer; the producer keeps its own
    pub fn detach(&mut self) -> Option<Arc<RingBuffer>> {
        let ring = self.ring.take();
        if ring.is_some() {
            log::info!("Ring buffer detached");
        }
        ring
    }

    pub fn is_attached(&self) -> bool {
        self.ring.is_some()
    }

    /// Set the downsampling factor; out-of-range values are clamped to [1, 4]
    pub fn set_zoom(&mut self, factor: i64) {
        self.zoom = Zoom::clamped(factor);
    }

    pub fn zoom(&self) -> Zoom {
        self.zoom
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn mood(&self) -> MoodState {
        self.mood.state()
    }

    pub fn visualization(&self) -> &[f32; VIZ_POINTS] {
        self.sync.visualization()
    }

    pub fn last_error(&self) -> Option<&BackendError> {
        self.last_error.as_ref()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Begin ticking. Idempotent.
    ///
    /// Each start is a fresh context for the backend, so the shader program is
    /// built here. A compile failure is recorded and the loop still runs.
    pub fn start(&mut self) {
        if self.state == LoopState::Running {
            return;
        }

        match self.backend.context_created() {
            Ok(()) => self.last_error = None,
            Err(e) => {
                log::warn!("Shader setup failed, frames will not be drawn: {}", e);
                self.last_error = Some(e);
            }
        }

        self.state = LoopState::Running;
        log::info!("Render loop started");
    }

    /// Stop ticking and release backend resources. Idempotent.
    pub fn stop(&mut self) {
        if self.state == LoopState::Stopped {
            return;
        }

        self.backend.context_closing();
        self.state = LoopState::Stopped;
        log::info!("Render loop stopped");
    }

    /// Run one frame: read, synchronize, extract, publish, draw.
    ///
    /// Draw errors are returned so the owner can react (e.g. reconfigure a lost
    /// surface); analysis state has already advanced when they occur.
    pub fn tick(&mut self, resolution: Vec2) -> Result<FrameStatus, BackendError> {
        if self.state == LoopState::Stopped {
            return Ok(FrameStatus::Idle);
        }

        match &self.ring {
            Some(ring) => {
                let capacity = ring.capacity();
                ring.read_latest(&mut self.chunk, capacity);
                let sync_pos = self.sync.synchronize(&self.chunk, self.zoom);
                log::trace!("sync_pos = {}", sync_pos);
            }
            None => self.sync.silence(),
        }

        let mood = self.mood.update(self.sync.visualization());

        self.backend.publish(&FrameUniforms {
            resolution,
            samples: self.sync.visualization(),
            warmth: mood.warmth,
            cool: mood.cool,
        });

        if !self.backend.has_program() {
            return Ok(FrameStatus::Skipped);
        }

        self.backend.draw()?;
        Ok(FrameStatus::Drawn)
    }
}

impl<B: RenderBackend> Drop for RenderLoop<B> {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    /// In-memory backend recording what the loop hands it
    #[derive(Default)]
    struct RecordingBackend {
        fail_compile: bool,
        program: bool,
        compiles: usize,
        releases: usize,
        draws: usize,
        published: Vec<(Vec2, Vec<f32>, f32, f32)>,
    }

    impl RenderBackend for RecordingBackend {
        fn context_created(&mut self) -> Result<(), BackendError> {
            self.compiles += 1;
            if self.fail_compile {
                return Err(BackendError::ShaderCompile("syntax error".to_string()));
            }
            self.program = true;
            Ok(())
        }

        fn context_closing(&mut self) {
            self.program = false;
            self.releases += 1;
        }

        fn has_program(&self) -> bool {
            self.program
        }

        fn publish(&mut self, uniforms: &FrameUniforms<'_>) {
            self.published.push((
                uniforms.resolution,
                uniforms.samples.to_vec(),
                uniforms.warmth,
                uniforms.cool,
            ));
        }

        fn draw(&mut self) -> Result<(), BackendError> {
            self.draws += 1;
            Ok(())
        }
    }

    const RES: Vec2 = Vec2::new(600.0, 300.0);

    fn render_loop(backend: RecordingBackend) -> RenderLoop<RecordingBackend> {
        RenderLoop::new(backend, MoodConfig::default()).unwrap()
    }

    fn ring() -> Arc<RingBuffer> {
        Arc::new(RingBuffer::new(&BufferConfig::default()).unwrap())
    }

    fn write_tone(ring: &RingBuffer, frames: usize, period: f32, amplitude: f32) {
        let block: Vec<f32> = (0..frames)
            .map(|i| amplitude * (2.0 * PI * i as f32 / period).sin())
            .collect();
        ring.write(&[&block[..], &block[..]]);
    }

    #[test]
    fn test_start_stop_are_idempotent() {
        let mut rl = render_loop(RecordingBackend::default());
        assert_eq!(rl.state(), LoopState::Stopped);

        rl.start();
        rl.start();
        assert_eq!(rl.state(), LoopState::Running);
        assert_eq!(rl.backend().compiles, 1);

        rl.stop();
        rl.stop();
        assert_eq!(rl.state(), LoopState::Stopped);
        assert_eq!(rl.backend().releases, 1);
        assert!(!rl.backend().has_program());

        // Restart is a new context: compile again
        rl.start();
        assert_eq!(rl.backend().compiles, 2);
    }

    #[test]
    fn test_stopped_loop_does_nothing() {
        let mut rl = render_loop(RecordingBackend::default());
        assert_eq!(rl.tick(RES).unwrap(), FrameStatus::Idle);
        assert!(rl.backend().published.is_empty());
    }

    #[test]
    fn test_tick_publishes_then_draws() {
        let mut rl = render_loop(RecordingBackend::default());
        let ring = ring();
        rl.attach(Arc::clone(&ring)).unwrap();
        write_tone(&ring, 4096, 64.0, 0.5);

        rl.start();
        assert_eq!(rl.tick(RES).unwrap(), FrameStatus::Drawn);

        let backend = rl.backend();
        assert_eq!(backend.draws, 1);
        let (resolution, samples, warmth, cool) = &backend.published[0];
        assert_eq!(*resolution, RES);
        assert_eq!(samples.len(), VIZ_POINTS);
        assert!(samples.iter().any(|&s| s != 0.0));
        assert!((0.0..=1.0).contains(warmth));
        assert!((0.0..=1.0).contains(cool));
    }

    #[test]
    fn test_compile_failure_skips_draw_but_keeps_running() {
        let mut rl = render_loop(RecordingBackend {
            fail_compile: true,
            ..Default::default()
        });
        rl.attach(ring()).unwrap();

        rl.start();
        assert_eq!(rl.state(), LoopState::Running);
        assert!(matches!(
            rl.last_error(),
            Some(BackendError::ShaderCompile(_))
        ));

        for _ in 0..3 {
            assert_eq!(rl.tick(RES).unwrap(), FrameStatus::Skipped);
        }
        assert_eq!(rl.backend().draws, 0);
        assert_eq!(rl.backend().published.len(), 3);
        // No retry within the same context
        assert_eq!(rl.backend().compiles, 1);
    }

    #[test]
    fn test_silence_without_producer() {
        let mut rl = render_loop(RecordingBackend::default());
        let ring = ring();
        rl.attach(Arc::clone(&ring)).unwrap();
        write_tone(&ring, 4096, 8.0, 0.8);
        rl.start();
        rl.tick(RES).unwrap();
        let excited = rl.mood();
        assert!(excited.cool > 0.0);

        rl.detach();
        let mut previous = excited;
        for _ in 0..10 {
            rl.tick(RES).unwrap();
            assert!(rl.visualization().iter().all(|&s| s == 0.0));

            let mood = rl.mood();
            assert!(mood.warmth <= previous.warmth);
            assert!(mood.cool < previous.cool);
            previous = mood;
        }
    }

    #[test]
    fn test_never_attached_is_silent() {
        let mut rl = render_loop(RecordingBackend::default());
        rl.start();
        for _ in 0..5 {
            assert_eq!(rl.tick(RES).unwrap(), FrameStatus::Drawn);
            assert!(rl.visualization().iter().all(|&s| s == 0.0));
            assert_eq!(rl.mood(), MoodState::default());
        }
    }

    #[test]
    fn test_attach_validates_capacity() {
        let mut rl = render_loop(RecordingBackend::default());

        // 2047 samples cannot hold 512 points at zoom 4
        let too_small = Arc::new(RingBuffer::with_shape(2, 2047));
        assert!(matches!(
            rl.attach(too_small),
            Err(VizError::CapacityTooSmall { required: 2048, .. })
        ));
        assert!(!rl.is_attached());

        let no_channels = Arc::new(RingBuffer::with_shape(0, 4096));
        assert!(matches!(rl.attach(no_channels), Err(VizError::NoChannels)));

        let minimum = Arc::new(RingBuffer::with_shape(2, 2048));
        rl.attach(minimum).unwrap();
        assert!(rl.is_attached());
        assert!(rl.detach().is_some());
        assert!(rl.detach().is_none());
    }

    #[test]
    fn test_zoom_is_clamped() {
        let mut rl = render_loop(RecordingBackend::default());
        rl.set_zoom(0);
        assert_eq!(rl.zoom(), Zoom::clamped(1));
        rl.set_zoom(10);
        assert_eq!(rl.zoom().factor(), 4);
        rl.set_zoom(3);
        assert_eq!(rl.zoom().factor(), 3);
    }

    #[test]
    fn test_zoom_changes_waveform_scale() {
        let ring = ring();
        write_tone(&ring, 4096, 256.0, 0.5);

        let mut fine = render_loop(RecordingBackend::default());
        fine.attach(Arc::clone(&ring)).unwrap();
        fine.set_zoom(1);
        fine.start();
        fine.tick(RES).unwrap();

        let mut coarse = render_loop(RecordingBackend::default());
        coarse.attach(Arc::clone(&ring)).unwrap();
        coarse.set_zoom(4);
        coarse.start();
        coarse.tick(RES).unwrap();

        // Count upward zero crossings: 2 periods at zoom 1, 8 at zoom 4
        let crossings = |w: &[f32]| w.windows(2).filter(|p| p[0] < 0.0 && p[1] >= 0.0).count();
        let fine_crossings = crossings(&fine.visualization()[..]);
        let coarse_crossings = crossings(&coarse.visualization()[..]);
        assert!((1..=2).contains(&fine_crossings));
        assert!((7..=8).contains(&coarse_crossings));
    }
}
