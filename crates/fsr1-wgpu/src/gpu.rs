//! wgpu implementation of the compute backend
//!
//! Every pass shares one explicit bind group layout:
//!
//! | Binding | Resource                                  |
//! |---------|-------------------------------------------|
//! | 0       | point sampler                             |
//! | 1       | `texture_2d<f32>` input view              |
//! | 2       | `texture_storage_2d<rgba16float, write>`  |
//!
//! Object creation runs inside validation and out-of-memory error scopes so a
//! rejected texture or pipeline surfaces as a [`DeviceError`] instead of the
//! device's uncaptured error handler.

use crate::backend::{
    AddressMode, ComputeContext, ComputeDevice, DeviceError, DispatchSize, FilterMode, INPUT_BINDING, OUTPUT_BINDING, SAMPLER_BINDING, SamplerDescriptor, SurfaceDescriptor,
    SurfaceFormat, SurfaceUsage,
};

fn texture_format(format: SurfaceFormat) -> wgpu::TextureFormat {
    match format {
        SurfaceFormat::Rgba16Float => wgpu::TextureFormat::Rgba16Float,
    }
}

fn texture_usages(usage: SurfaceUsage) -> wgpu::TextureUsages {
    match usage {
        SurfaceUsage::ColorInput => wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        SurfaceUsage::Work => wgpu::TextureUsages::STORAGE_BINDING | wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_SRC,
    }
}

fn filter_mode(filter: FilterMode) -> wgpu::FilterMode {
    match filter {
        FilterMode::Point => wgpu::FilterMode::Nearest,
    }
}

fn address_mode(mode: AddressMode) -> wgpu::AddressMode {
    match mode {
        AddressMode::Clamp => wgpu::AddressMode::ClampToEdge,
    }
}

/// A compiled compute pipeline
#[derive(Debug, Clone)]
pub struct WgpuKernel {
    label: String,
    pipeline: wgpu::ComputePipeline,
}

/// [`ComputeDevice`] backed by a `wgpu::Device`
///
/// Cloning is cheap; clones share the device and the bind group layout.
#[derive(Debug, Clone)]
pub struct WgpuDevice {
    device: wgpu::Device,
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
}

impl WgpuDevice {
    /// Wraps a device and creates the bind group layout shared by every pass
    ///
    /// # Arguments
    /// * `device` - The host's device; only a handle is kept
    pub fn new(device: &wgpu::Device) -> Self {
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("FSR1 Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: SAMPLER_BINDING,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: INPUT_BINDING,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: OUTPUT_BINDING,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::StorageTexture {
                        access: wgpu::StorageTextureAccess::WriteOnly,
                        format: texture_format(SurfaceFormat::Rgba16Float),
                        view_dimension: wgpu::TextureViewDimension::D2,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("FSR1 Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        Self {
            device: device.clone(),
            bind_group_layout,
            pipeline_layout,
        }
    }

    /// The wrapped device
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// Runs `f` inside validation and out-of-memory error scopes
    fn scoped<T>(&self, what: &str, f: impl FnOnce(&wgpu::Device) -> T) -> Result<T, DeviceError> {
        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let value = f(&self.device);

        let validation = pollster::block_on(self.device.pop_error_scope());
        let out_of_memory = pollster::block_on(self.device.pop_error_scope());

        match validation.or(out_of_memory) {
            Some(error) => Err(DeviceError::new(format!("{what}: {error}"))),
            None => Ok(value),
        }
    }
}

impl ComputeDevice for WgpuDevice {
    type Texture = wgpu::Texture;
    type ReadView = wgpu::TextureView;
    type WriteView = wgpu::TextureView;
    type Kernel = WgpuKernel;
    type Sampler = wgpu::Sampler;

    fn create_texture(&self, descriptor: &SurfaceDescriptor<'_>) -> Result<wgpu::Texture, DeviceError> {
        let size = descriptor.size;
        self.scoped(&format!("texture {}x{}", size.width, size.height), |device| {
            device.create_texture(&wgpu::TextureDescriptor {
                label: Some(descriptor.label),
                size: wgpu::Extent3d {
                    width: size.width,
                    height: size.height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: texture_format(descriptor.format),
                usage: texture_usages(descriptor.usage),
                view_formats: &[],
            })
        })
    }

    fn create_read_view(&self, texture: &wgpu::Texture, label: &str) -> Result<wgpu::TextureView, DeviceError> {
        self.scoped("read view", |_| {
            texture.create_view(&wgpu::TextureViewDescriptor {
                label: Some(&format!("{label} Read View")),
                ..Default::default()
            })
        })
    }

    fn create_write_view(&self, texture: &wgpu::Texture, label: &str) -> Result<wgpu::TextureView, DeviceError> {
        self.scoped("write view", |_| {
            texture.create_view(&wgpu::TextureViewDescriptor {
                label: Some(&format!("{label} Write View")),
                ..Default::default()
            })
        })
    }

    fn create_kernel(&self, source: &str, entry_point: &str, label: &str) -> Result<WgpuKernel, DeviceError> {
        let module = self.scoped("shader module", |device| {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            })
        })?;

        // Compilation info carries the located compiler output
        let info = pollster::block_on(module.get_compilation_info());
        let diagnostics: Vec<_> = info
            .messages
            .iter()
            .filter(|message| matches!(message.message_type, wgpu::CompilationMessageType::Error))
            .map(|message| match &message.location {
                Some(location) => format!("{}:{}: {}", location.line_number, location.line_position, message.message),
                None => message.message.clone(),
            })
            .collect();
        if !diagnostics.is_empty() {
            return Err(DeviceError::new(diagnostics.join("\n")));
        }

        let pipeline = self.scoped(&format!("compute pipeline `{entry_point}`"), |device| {
            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(label),
                layout: Some(&self.pipeline_layout),
                module: &module,
                entry_point: Some(entry_point),
                compilation_options: Default::default(),
                cache: None,
            })
        })?;

        Ok(WgpuKernel {
            label: label.to_string(),
            pipeline,
        })
    }

    fn create_sampler(&self, descriptor: &SamplerDescriptor<'_>) -> Result<wgpu::Sampler, DeviceError> {
        let filter = filter_mode(descriptor.filter);
        let address = address_mode(descriptor.address_mode);
        self.scoped("sampler", |device| {
            device.create_sampler(&wgpu::SamplerDescriptor {
                label: Some(descriptor.label),
                address_mode_u: address,
                address_mode_v: address,
                address_mode_w: address,
                mag_filter: filter,
                min_filter: filter,
                mipmap_filter: wgpu::FilterMode::Nearest,
                lod_min_clamp: 0.0,
                lod_max_clamp: 0.0,
                compare: None,
                anisotropy_clamp: 1,
                border_color: None,
            })
        })
    }
}

/// [`ComputeContext`] recording into a `wgpu::CommandEncoder`
///
/// Each dispatch becomes its own compute pass, so wgpu orders the passes and
/// inserts the texture transitions between them.
pub struct WgpuContext<'a> {
    device: &'a WgpuDevice,
    encoder: &'a mut wgpu::CommandEncoder,
    sampler: Option<wgpu::Sampler>,
    input: Option<wgpu::TextureView>,
    output: Option<wgpu::TextureView>,
    kernel: Option<WgpuKernel>,
}

impl<'a> WgpuContext<'a> {
    /// Creates a context recording into `encoder`
    ///
    /// # Arguments
    /// * `device` - The device the upscaler was created with
    /// * `encoder` - The host's command encoder for this frame
    pub fn new(device: &'a WgpuDevice, encoder: &'a mut wgpu::CommandEncoder) -> Self {
        Self {
            device,
            encoder,
            sampler: None,
            input: None,
            output: None,
            kernel: None,
        }
    }
}

impl ComputeContext<WgpuDevice> for WgpuContext<'_> {
    fn set_sampler(&mut self, binding: u32, sampler: &wgpu::Sampler) {
        debug_assert_eq!(binding, SAMPLER_BINDING);
        self.sampler = Some(sampler.clone());
    }

    fn set_read_view(&mut self, binding: u32, view: &wgpu::TextureView) {
        debug_assert_eq!(binding, INPUT_BINDING);
        self.input = Some(view.clone());
    }

    fn set_write_view(&mut self, binding: u32, view: &wgpu::TextureView) {
        debug_assert_eq!(binding, OUTPUT_BINDING);
        self.output = Some(view.clone());
    }

    fn set_kernel(&mut self, kernel: &WgpuKernel) {
        self.kernel = Some(kernel.clone());
    }

    fn dispatch(&mut self, size: DispatchSize) {
        let (Some(sampler), Some(input), Some(output), Some(kernel)) = (&self.sampler, &self.input, &self.output, &self.kernel) else {
            debug_assert!(false, "dispatch recorded before kernel, sampler, input and output were bound");
            tracing::error!("Dispatch skipped: kernel, sampler, input and output must all be bound");
            return;
        };

        let bind_group = self.device.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&kernel.label),
            layout: &self.device.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: SAMPLER_BINDING,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
                wgpu::BindGroupEntry {
                    binding: INPUT_BINDING,
                    resource: wgpu::BindingResource::TextureView(input),
                },
                wgpu::BindGroupEntry {
                    binding: OUTPUT_BINDING,
                    resource: wgpu::BindingResource::TextureView(output),
                },
            ],
        });

        let mut compute_pass = self.encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some(&kernel.label),
            timestamp_writes: None,
        });
        compute_pass.set_pipeline(&kernel.pipeline);
        compute_pass.set_bind_group(0, &bind_group, &[]);
        compute_pass.dispatch_workgroups(size.x, size.y, size.z);
    }
}

/// Uploads linear RGBA pixels into a `Rgba16Float` texture
///
/// # Arguments
/// * `queue` - Queue to write through
/// * `texture` - Destination, typically the upscaler's color input
/// * `pixels` - Four floats per texel, row-major, exactly covering the texture
pub fn write_rgba_f32(queue: &wgpu::Queue, texture: &wgpu::Texture, pixels: &[f32]) {
    let texels: Vec<half::f16> = pixels.iter().copied().map(half::f16::from_f32).collect();
    let bytes_per_pixel = SurfaceFormat::Rgba16Float.bytes_per_pixel();

    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        bytemuck::cast_slice(&texels),
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(texture.width() * bytes_per_pixel),
            rows_per_image: Some(texture.height()),
        },
        texture.size(),
    );
}
