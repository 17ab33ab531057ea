//! Device and command-recording abstractions
//!
//! The upscaler talks to the GPU through two small traits: [`ComputeDevice`],
//! a factory for textures, views, kernels and samplers, and [`ComputeContext`],
//! which records bindings and dispatches onto a single command stream. The wgpu
//! implementation lives in [`crate::gpu`].

/// Binding slot of the point sampler
pub const SAMPLER_BINDING: u32 = 0;
/// Binding slot of the readable input view
pub const INPUT_BINDING: u32 = 1;
/// Binding slot of the writable output view
pub const OUTPUT_BINDING: u32 = 2;

/// Size of a surface in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Extent {
    pub width: u32,
    pub height: u32,
}

impl Extent {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Scales both axes, truncating toward zero
    pub fn scaled(self, scale_factor: f64) -> Self {
        Self {
            width: (self.width as f64 * scale_factor).floor() as u32,
            height: (self.height as f64 * scale_factor).floor() as u32,
        }
    }
}

/// Pixel formats a surface can use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceFormat {
    /// Four 16-bit float channels; enough range for HDR intermediates
    Rgba16Float,
}

impl SurfaceFormat {
    /// Size of one texel in bytes
    pub fn bytes_per_pixel(self) -> u32 {
        match self {
            SurfaceFormat::Rgba16Float => 8,
        }
    }
}

/// How a surface is used by the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceUsage {
    /// Written by the host, sampled by the first pass
    ColorInput,
    /// Written by one pass, sampled by the next, readable by the host
    Work,
}

/// Describes a single-sample, single-mip 2D surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceDescriptor<'a> {
    pub label: &'a str,
    pub size: Extent,
    pub format: SurfaceFormat,
    pub usage: SurfaceUsage,
}

/// Sampler texel filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterMode {
    /// Nearest neighbor sampling
    Point,
}

/// Sampler addressing outside [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressMode {
    Clamp,
}

/// Describes a sampler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerDescriptor<'a> {
    pub label: &'a str,
    pub filter: FilterMode,
    pub address_mode: AddressMode,
}

/// Number of thread groups to dispatch along each axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DispatchSize {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl DispatchSize {
    /// Grid that covers `extent` with square tiles of `tile_size` pixels
    pub fn covering(extent: Extent, tile_size: u32) -> Self {
        Self {
            x: extent.width.div_ceil(tile_size),
            y: extent.height.div_ceil(tile_size),
            z: 1,
        }
    }
}

/// Failure reported by a backend
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct DeviceError {
    pub message: String,
}

impl DeviceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// Factory for the GPU objects the upscaler owns
///
/// Handles are released when dropped. Cloning a device must be cheap and must
/// refer to the same underlying device; the upscaler keeps one clone for its
/// whole lifetime.
pub trait ComputeDevice: Clone {
    type Texture;
    type ReadView;
    type WriteView;
    type Kernel;
    type Sampler;

    fn create_texture(&self, descriptor: &SurfaceDescriptor<'_>) -> Result<Self::Texture, DeviceError>;

    /// Creates a view the kernels sample from
    fn create_read_view(&self, texture: &Self::Texture, label: &str) -> Result<Self::ReadView, DeviceError>;

    /// Creates a view the kernels store into
    fn create_write_view(&self, texture: &Self::Texture, label: &str) -> Result<Self::WriteView, DeviceError>;

    /// Compiles one compute entry point of `source`
    ///
    /// On failure the error message carries the compiler diagnostic.
    fn create_kernel(&self, source: &str, entry_point: &str, label: &str) -> Result<Self::Kernel, DeviceError>;

    fn create_sampler(&self, descriptor: &SamplerDescriptor<'_>) -> Result<Self::Sampler, DeviceError>;
}

/// Records bindings and dispatches onto one command stream
///
/// Bindings persist until replaced. Dispatches execute in recording order.
pub trait ComputeContext<D: ComputeDevice> {
    fn set_sampler(&mut self, binding: u32, sampler: &D::Sampler);

    fn set_read_view(&mut self, binding: u32, view: &D::ReadView);

    fn set_write_view(&mut self, binding: u32, view: &D::WriteView);

    fn set_kernel(&mut self, kernel: &D::Kernel);

    fn dispatch(&mut self, size: DispatchSize);
}
