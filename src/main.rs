//! Wavesync - a phase-locked oscilloscope for live or recorded audio.
//!
//! The trace stays still on periodic signals; low and high spectral energy
//! tint it warm or cool.

use clap::Parser;
use std::error::Error;
use std::sync::Arc;
use winit::{
    application::ApplicationHandler,
    dpi::LogicalSize,
    event::*,
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use wavesync::audio::{AudioCapture, FileFeeder, RingBuffer};
use wavesync::cli::Args;
use wavesync::driver::{LoopState, RenderLoop};
use wavesync::error::BackendError;
use wavesync::params::{MoodConfig, RenderConfig};
use wavesync::rendering::ScopeRenderer;

/// Whatever is writing into the ring buffer (kept alive for the app's lifetime)
enum Producer {
    Live { _capture: AudioCapture },
    File { _feeder: FileFeeder },
    None,
}

impl Producer {
    fn is_attached(&self) -> bool {
        !matches!(self, Producer::None)
    }
}

/// Main application state
struct App {
    // Window and rendering
    window: Option<Arc<Window>>,
    render_loop: Option<RenderLoop<ScopeRenderer>>,

    // Audio path
    ring: Arc<RingBuffer>,
    producer: Producer,

    // Configuration
    render_config: RenderConfig,
    mood_config: MoodConfig,
    shader_source: Option<String>,
    zoom: i64,
}

impl App {
    fn new(args: &Args) -> Result<Self, Box<dyn Error>> {
        let ring = Arc::new(RingBuffer::new(&args.buffer_config())?);
        let mood_config = args.mood_config();
        mood_config.validate()?;
        args.check_zoom();

        let producer = if args.silent {
            Producer::None
        } else if let Some(path) = &args.wav {
            Producer::File {
                _feeder: FileFeeder::spawn(path, Arc::clone(&ring))?,
            }
        } else {
            match AudioCapture::start(Arc::clone(&ring)) {
                Ok(capture) => Producer::Live { _capture: capture },
                Err(e) => {
                    log::warn!("{}; running without audio", e);
                    Producer::None
                }
            }
        };

        let shader_source = args
            .shader
            .as_ref()
            .map(std::fs::read_to_string)
            .transpose()?;

        Ok(Self {
            window: None,
            render_loop: None,
            ring,
            producer,
            render_config: args.render_config(),
            mood_config,
            shader_source,
            zoom: args.zoom,
        })
    }

    /// Build the renderer and render loop for a freshly created window
    fn init_rendering(&mut self, window: Arc<Window>) -> Result<(), Box<dyn Error>> {
        let renderer = pollster::block_on(ScopeRenderer::new(
            Arc::clone(&window),
            self.shader_source.clone(),
        ))?;

        let mut render_loop = RenderLoop::new(renderer, self.mood_config.clone())?;
        if self.producer.is_attached() {
            render_loop.attach(Arc::clone(&self.ring))?;
        }
        render_loop.set_zoom(self.zoom);

        self.window = Some(window);
        self.render_loop = Some(render_loop);
        Ok(())
    }

    /// Handle runtime key bindings
    fn handle_key(&mut self, key: KeyCode) {
        let Some(render_loop) = self.render_loop.as_mut() else {
            return;
        };

        match key {
            KeyCode::Digit1 | KeyCode::Digit2 | KeyCode::Digit3 | KeyCode::Digit4 => {
                let factor = match key {
                    KeyCode::Digit1 => 1,
                    KeyCode::Digit2 => 2,
                    KeyCode::Digit3 => 3,
                    _ => 4,
                };
                render_loop.set_zoom(factor);
                self.zoom = factor;
                log::info!("Zoom: {}", factor);
            }
            KeyCode::Space => match render_loop.state() {
                LoopState::Running => render_loop.stop(),
                LoopState::Stopped => render_loop.start(),
            },
            _ => {}
        }
    }

    /// Render a single frame
    fn render_frame(&mut self, event_loop: &ActiveEventLoop) {
        let Some(render_loop) = self.render_loop.as_mut() else {
            return;
        };

        let resolution = render_loop.backend().resolution();
        match render_loop.tick(resolution) {
            Ok(_) => {}
            Err(BackendError::Surface(
                wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated,
            )) => {
                if let Some(window) = &self.window {
                    let size = window.inner_size();
                    render_loop.backend_mut().resize(size.width, size.height);
                }
            }
            Err(BackendError::Surface(wgpu::SurfaceError::OutOfMemory)) => {
                log::error!("GPU out of memory");
                event_loop.exit();
            }
            Err(e) => log::warn!("Render error: {}", e),
        }
    }
}

impl ApplicationHandler for App {
    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            let (width, height) = self.render_config.initial_size();
            let (min_width, min_height) = self.render_config.min_size();
            let (max_width, max_height) = self.render_config.max_size();

            let window_attributes = Window::default_attributes()
                .with_title("Wavesync")
                .with_inner_size(LogicalSize::new(width, height))
                .with_min_inner_size(LogicalSize::new(min_width, min_height))
                .with_max_inner_size(LogicalSize::new(max_width, max_height))
                .with_resizable(true);

            let window = match event_loop.create_window(window_attributes) {
                Ok(window) => Arc::new(window),
                Err(e) => {
                    log::error!("Failed to create window: {}", e);
                    event_loop.exit();
                    return;
                }
            };

            if let Err(e) = self.init_rendering(window) {
                log::error!("Failed to initialize rendering: {}", e);
                event_loop.exit();
                return;
            }
        }

        if let Some(render_loop) = self.render_loop.as_mut() {
            render_loop.start();
        }
    }

    fn suspended(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(render_loop) = self.render_loop.as_mut() {
            render_loop.stop();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested
            | WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        ..
                    },
                ..
            } => event_loop.exit(),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(key),
                        repeat: false,
                        ..
                    },
                ..
            } => self.handle_key(key),
            WindowEvent::Resized(size) => {
                if let Some(render_loop) = self.render_loop.as_mut() {
                    render_loop.backend_mut().resize(size.width, size.height);
                }
            }
            WindowEvent::RedrawRequested => self.render_frame(event_loop),
            _ => {}
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    log::info!("Wavesync starting (zoom {}, capacity {})", args.zoom, args.capacity);

    let mut app = App::new(&args)?;
    let event_loop = EventLoop::new()?;
    event_loop.run_app(&mut app)?;

    if let Some(render_loop) = app.render_loop.as_mut() {
        render_loop.stop();
    }
    Ok(())
}
