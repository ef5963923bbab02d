//! Rendering system with wgpu pipeline and shader management.

use bytemuck::{Pod, Zeroable};
use glam::Vec2;
use std::borrow::Cow;
use std::sync::Arc;
use wgpu::util::DeviceExt;

use crate::driver::{FrameUniforms, RenderBackend};
use crate::error::{BackendError, VizError};
use crate::params::VIZ_POINTS;

/// Built-in oscilloscope shader
pub const SCOPE_SHADER: &str = include_str!("scope.wgsl");

/// Vertex data for the full-screen quad (clip-space position)
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct QuadVertex {
    pub position: [f32; 3],
}

/// Full-screen quad, static for the lifetime of the renderer
pub const QUAD_VERTICES: [QuadVertex; 4] = [
    QuadVertex {
        position: [1.0, 1.0, 0.0], // Top right
    },
    QuadVertex {
        position: [1.0, -1.0, 0.0], // Bottom right
    },
    QuadVertex {
        position: [-1.0, -1.0, 0.0], // Bottom left
    },
    QuadVertex {
        position: [-1.0, 1.0, 0.0], // Top left
    },
];

/// Two triangles covering the quad
pub const QUAD_INDICES: [u16; 6] = [0, 1, 3, 1, 2, 3];

/// Uniform buffer for the scope shader (resolution, mood, packed waveform)
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct ScopeUniforms {
    pub resolution: [f32; 2],
    pub warmth: f32,
    pub cool: f32,
    /// VIZ_POINTS samples, four per 16-byte element
    pub samples: [[f32; 4]; VIZ_POINTS / 4],
}

impl ScopeUniforms {
    pub fn from_frame(frame: &FrameUniforms<'_>) -> Self {
        let mut samples = [[0.0; 4]; VIZ_POINTS / 4];
        for (packed, chunk) in samples.iter_mut().zip(frame.samples.chunks_exact(4)) {
            packed.copy_from_slice(chunk);
        }

        Self {
            resolution: frame.resolution.to_array(),
            warmth: frame.warmth,
            cool: frame.cool,
            samples,
        }
    }
}

/// Shader program state tied to one context lifetime
struct ScopeProgram {
    pipeline: wgpu::RenderPipeline,
    bind_group: wgpu::BindGroup,
}

/// Rendering system managing wgpu device, surface, quad geometry and the scope program
pub struct ScopeRenderer {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    uniform_buffer: wgpu::Buffer,
    bind_group_layout: wgpu::BindGroupLayout,
    program: Option<ScopeProgram>,
    shader_source: Cow<'static, str>,
}

impl ScopeRenderer {
    /// Create new rendering system for `window`.
    ///
    /// The shader program is not built here; that happens in `context_created`.
    pub async fn new(
        window: Arc<winit::window::Window>,
        shader_source: Option<String>,
    ) -> Result<Self, VizError> {
        let size = window.inner_size();

        // Create wgpu instance
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        // Create surface (window must have 'static lifetime via Arc)
        let surface = instance
            .create_surface(window)
            .map_err(|e| VizError::Gpu(format!("Failed to create surface: {}", e)))?;

        // Request adapter
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::LowPower,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| VizError::Gpu("Failed to find suitable GPU adapter".to_string()))?;

        // Request device
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Scope Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await
            .map_err(|e| VizError::Gpu(format!("Failed to request device: {}", e)))?;

        // Configure surface; colours are computed for a linear framebuffer
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| !f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or_else(|| VizError::Gpu("Surface reports no formats".to_string()))?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        // Create buffers
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Quad Vertex Buffer"),
            contents: bytemuck::cast_slice(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Quad Index Buffer"),
            contents: bytemuck::cast_slice(&QUAD_INDICES),
            usage: wgpu::BufferUsages::INDEX,
        });

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Scope Uniform Buffer"),
            contents: bytemuck::bytes_of(&ScopeUniforms::zeroed()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Scope Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        log::info!(
            "GPU: {} ({:?}), surface {}x{} {:?}",
            adapter.get_info().name,
            adapter.get_info().backend,
            config.width,
            config.height,
            config.format
        );

        Ok(Self {
            surface,
            device,
            queue,
            config,
            vertex_buffer,
            index_buffer,
            uniform_buffer,
            bind_group_layout,
            program: None,
            shader_source: shader_source
                .map(Cow::Owned)
                .unwrap_or(Cow::Borrowed(SCOPE_SHADER)),
        })
    }

    /// Reconfigure the surface after a window resize (zero sizes are ignored)
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
    }

    /// Viewport size in physical pixels
    pub fn resolution(&self) -> Vec2 {
        Vec2::new(self.config.width as f32, self.config.height as f32)
    }

    /// Compile the shader and build the pipeline inside a validation error scope
    fn build_program(&self) -> Result<ScopeProgram, BackendError> {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let shader = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("Scope Shader"),
                source: wgpu::ShaderSource::Wgsl(self.shader_source.clone()),
            });

        let pipeline_layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Scope Pipeline Layout"),
                bind_group_layouts: &[&self.bind_group_layout],
                push_constant_ranges: &[],
            });

        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Scope Render Pipeline"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    buffers: &[wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<QuadVertex>() as wgpu::BufferAddress,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &[wgpu::VertexAttribute {
                            offset: 0,
                            shader_location: 0,
                            format: wgpu::VertexFormat::Float32x3,
                        }],
                    }],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: self.config.format,
                        blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            });

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Scope Bind Group"),
            layout: &self.bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: self.uniform_buffer.as_entire_binding(),
            }],
        });

        if let Some(error) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(BackendError::ShaderCompile(error.to_string()));
        }

        Ok(ScopeProgram {
            pipeline,
            bind_group,
        })
    }
}

impl RenderBackend for ScopeRenderer {
    fn context_created(&mut self) -> Result<(), BackendError> {
        self.program = None;
        let program = self.build_program()?;
        self.program = Some(program);
        log::info!("Scope shader compiled");
        Ok(())
    }

    fn context_closing(&mut self) {
        self.program = None;
    }

    fn has_program(&self) -> bool {
        self.program.is_some()
    }

    fn publish(&mut self, uniforms: &FrameUniforms<'_>) {
        let uniforms = ScopeUniforms::from_frame(uniforms);
        self.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));
    }

    fn draw(&mut self) -> Result<(), BackendError> {
        let program = self.program.as_ref().ok_or(BackendError::NoProgram)?;

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Scope Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scope Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            render_pass.set_pipeline(&program.pipeline);
            render_pass.set_bind_group(0, &program.bind_group, &[]);
            render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
            render_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
            render_pass.draw_indexed(0..QUAD_INDICES.len() as u32, 0, 0..1);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_layout() {
        // 16-byte header followed by 128 vec4 elements, no padding
        assert_eq!(std::mem::size_of::<ScopeUniforms>(), 16 + VIZ_POINTS * 4);
        assert_eq!(std::mem::size_of::<ScopeUniforms>() % 16, 0);
    }

    #[test]
    fn test_uniforms_pack_samples_in_order() {
        let mut samples = [0.0f32; VIZ_POINTS];
        for (i, s) in samples.iter_mut().enumerate() {
            *s = i as f32;
        }
        let frame = FrameUniforms {
            resolution: Vec2::new(1200.0, 600.0),
            samples: &samples,
            warmth: 0.25,
            cool: 0.75,
        };

        let uniforms = ScopeUniforms::from_frame(&frame);
        assert_eq!(uniforms.resolution, [1200.0, 600.0]);
        assert_eq!(uniforms.warmth, 0.25);
        assert_eq!(uniforms.cool, 0.75);
        assert_eq!(uniforms.samples[0], [0.0, 1.0, 2.0, 3.0]);
        assert_eq!(uniforms.samples[127], [508.0, 509.0, 510.0, 511.0]);

        // Byte view matches the flat sample order after the header
        let floats: &[f32] = bytemuck::cast_slice(bytemuck::bytes_of(&uniforms));
        assert_eq!(&floats[4..], &samples[..]);
    }

    #[test]
    fn test_quad_covers_clip_space() {
        assert_eq!(QUAD_INDICES.len(), 6);
        assert!(QUAD_INDICES.iter().all(|&i| (i as usize) < QUAD_VERTICES.len()));

        let (min, max) = QUAD_VERTICES.iter().fold(
            ([f32::MAX; 2], [f32::MIN; 2]),
            |(min, max), v| {
                (
                    [min[0].min(v.position[0]), min[1].min(v.position[1])],
                    [max[0].max(v.position[0]), max[1].max(v.position[1])],
                )
            },
        );
        assert_eq!(min, [-1.0, -1.0]);
        assert_eq!(max, [1.0, 1.0]);
    }

    #[test]
    fn test_shader_declares_entry_points() {
        assert!(SCOPE_SHADER.contains("fn vs_main"));
        assert!(SCOPE_SHADER.contains("fn fs_main"));
        assert!(SCOPE_SHADER.contains(&format!("array<vec4<f32>, {}>", VIZ_POINTS / 4)));
    }
}
