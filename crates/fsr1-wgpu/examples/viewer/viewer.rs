//! Window, GPU setup and per-frame rendering for the FSR1 viewer
//!
//! Each frame the test scene is drawn on the CPU into the upscaler's color
//! input, the three FSR1 passes are recorded, and the output surface is drawn
//! over the whole window.

use fsr1_wgpu::gpu::{WgpuContext, WgpuDevice, write_rgba_f32};
use fsr1_wgpu::{Extent, QualityMode, Upscaler, UpscalerDescriptor};
use std::sync::Arc;
use std::time::Instant;
use winit::{
    dpi::PhysicalSize,
    event_loop::ActiveEventLoop,
    window::{Window, WindowAttributes},
};

/// Background color used for clearing the swapchain
const BACKGROUND_COLOR: wgpu::Color = wgpu::Color::BLACK;

/// All state of a running viewer
pub struct ViewerContext {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    surface_configuration: wgpu::SurfaceConfiguration,
    device: WgpuDevice,
    queue: wgpu::Queue,
    upscaler: Upscaler<WgpuDevice>,
    blit_pipeline: wgpu::RenderPipeline,
    blit_sampler: wgpu::Sampler,
    started_at: Instant,
}

/// Input size that upscales to roughly `window` at `quality`
fn source_size(window: PhysicalSize<u32>, quality: QualityMode) -> Extent {
    let scale_factor = quality.scale_factor();
    Extent::new(
        ((window.width as f64 / scale_factor).floor() as u32).max(1),
        ((window.height as f64 / scale_factor).floor() as u32).max(1),
    )
}

impl ViewerContext {
    /// Creates the window, the GPU device and the upscaler
    ///
    /// # Arguments
    /// * `event_loop` - The active event loop for window management
    /// * `window_size` - Initial inner size of the window
    /// * `quality` - Initial quality mode
    pub fn new(event_loop: &ActiveEventLoop, window_size: (u32, u32), quality: QualityMode) -> Result<Self, Box<dyn std::error::Error>> {
        let window = Arc::new(
            event_loop.create_window(
                WindowAttributes::default()
                    .with_resizable(true)
                    .with_inner_size(PhysicalSize::new(window_size.0, window_size.1))
                    .with_title("FSR1-wgpu Viewer"),
            )?,
        );

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });
        let surface = instance.create_surface(window.clone())?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))?;

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("FSR1 Viewer Device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: wgpu::MemoryHints::default(),
            trace: Default::default(),
        }))?;

        let size = window.inner_size();
        let surface_capabilities = surface.get_capabilities(&adapter);
        let surface_texture_format = surface_capabilities
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .or_else(|| surface_capabilities.formats.first().copied())
            .ok_or("Surface is not supported by the adapter")?;

        let surface_configuration = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            width: size.width.max(1),
            height: size.height.max(1),
            format: surface_texture_format,
            view_formats: vec![surface_texture_format, surface_texture_format.remove_srgb_suffix()],
            alpha_mode: surface_capabilities.alpha_modes[0],
            present_mode: surface_capabilities.present_modes[0],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_configuration);

        let blit_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Blit sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let blit_shader_module = device.create_shader_module(wgpu::include_wgsl!("blit.wgsl"));
        let blit_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Blit pipeline"),
            layout: None,
            cache: None,
            vertex: wgpu::VertexState {
                module: &blit_shader_module,
                buffers: &[],
                compilation_options: Default::default(),
                entry_point: None,
            },
            fragment: Some(wgpu::FragmentState {
                module: &blit_shader_module,
                targets: &[Some(wgpu::ColorTargetState {
                    // The output is already display-encoded
                    format: surface_configuration.format.remove_srgb_suffix(),
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
                entry_point: None,
            }),
            primitive: wgpu::PrimitiveState::default(),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            depth_stencil: None,
        });

        let device = WgpuDevice::new(&device);
        let source = source_size(size, quality);
        let upscaler = Upscaler::new(
            &device,
            &UpscalerDescriptor {
                width: source.width,
                height: source.height,
                quality,
            },
        )?;

        let context = Self {
            window,
            surface,
            surface_configuration,
            device,
            queue,
            upscaler,
            blit_pipeline,
            blit_sampler,
            started_at: Instant::now(),
        };

        context.update_window_title();
        context.window.request_redraw();

        Ok(context)
    }

    /// Renders and presents one frame, then schedules the next
    pub fn handle_redraw(&mut self) {
        if let Err(e) = self.render() {
            match e {
                wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => {
                    self.surface.configure(self.device.device(), &self.surface_configuration);
                }
                e => tracing::error!("Failed to render frame: {e}"),
            }
        }

        self.window.request_redraw();
    }

    /// Reconfigures the surface and re-targets the upscaler input to the new window size
    pub fn resize(&mut self, size: PhysicalSize<u32>) {
        if size.width == 0 || size.height == 0 {
            return;
        }

        self.surface_configuration.width = size.width;
        self.surface_configuration.height = size.height;
        self.surface.configure(self.device.device(), &self.surface_configuration);

        let source = source_size(size, self.upscaler.quality_mode());
        if let Err(e) = self.upscaler.resize(source.width, source.height) {
            tracing::error!("Failed to resize upscaler: {e}");
        }

        self.update_window_title();
    }

    /// Switches the quality mode, keeping the output close to the window size
    pub fn set_quality_mode(&mut self, quality: QualityMode) {
        let source = source_size(self.window.inner_size(), quality);
        if let Err(e) = self.upscaler.reconfigure(source.width, source.height, quality) {
            tracing::error!("Failed to switch quality mode: {e}");
        }

        self.update_window_title();
    }

    fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        if let Some(color_input) = self.upscaler.color_input() {
            let pixels = render_scene(self.upscaler.dimensions(), self.started_at.elapsed().as_secs_f32());
            write_rgba_f32(&self.queue, &color_input.texture, &pixels);
        }

        let frame = self.surface.get_current_texture()?;
        let frame_view = frame.texture.create_view(&wgpu::TextureViewDescriptor {
            format: Some(frame.texture.format().remove_srgb_suffix()),
            ..Default::default()
        });

        let mut command_encoder = self.device.device().create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("FSR1 Viewer Frame") });

        if let Err(e) = self.upscaler.upscale(&mut WgpuContext::new(&self.device, &mut command_encoder)) {
            tracing::warn!("Skipping upscale: {e}");
        }

        {
            let mut blit_pass = command_encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Blit pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &frame_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(BACKGROUND_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                ..Default::default()
            });

            if let Some(output) = self.upscaler.output() {
                let blit_bind_group = self.device.device().create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("Blit bind group"),
                    layout: &self.blit_pipeline.get_bind_group_layout(0),
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: wgpu::BindingResource::TextureView(&output.read_view),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::Sampler(&self.blit_sampler),
                        },
                    ],
                });

                blit_pass.set_pipeline(&self.blit_pipeline);
                blit_pass.set_bind_group(0, &blit_bind_group, &[]);
                blit_pass.draw(0..3, 0..1);
            }
        }

        self.queue.submit(std::iter::once(command_encoder.finish()));
        self.window.pre_present_notify();
        frame.present();

        Ok(())
    }

    fn update_window_title(&self) {
        let source = self.upscaler.dimensions();
        let target = self.upscaler.target_dimensions();
        self.window.set_title(&format!(
            "FSR1-wgpu Viewer - {} ({}x{} -> {}x{})",
            self.upscaler.quality_mode(),
            source.width,
            source.height,
            target.width,
            target.height
        ));
    }
}

/// Draws an animated test scene in linear RGBA
///
/// Thin rings and a rotating checkerboard give the upsampler diagonal and
/// curved edges to work on.
fn render_scene(size: Extent, time: f32) -> Vec<f32> {
    let (width, height) = (size.width as f32, size.height as f32);
    let (sin, cos) = (time * 0.25).sin_cos();
    let mut pixels = Vec::with_capacity((size.width * size.height * 4) as usize);

    for y in 0..size.height {
        for x in 0..size.width {
            let u = (x as f32 + 0.5) / width - 0.5;
            let v = ((y as f32 + 0.5) / height - 0.5) * height / width;

            let radius = (u * u + v * v).sqrt();
            let ring = if ((radius * 40.0 - time * 2.0).sin()) > 0.0 { 1.0 } else { 0.1 };

            let (ru, rv) = (u * cos - v * sin, u * sin + v * cos);
            let checker = if ((ru * 12.0).floor() + (rv * 12.0).floor()) as i32 % 2 == 0 { 0.8 } else { 0.2 };

            pixels.extend_from_slice(&[ring * checker, checker * 0.6, (1.0 - ring) * 0.5 + 0.1, 1.0]);
        }
    }

    pixels
}
