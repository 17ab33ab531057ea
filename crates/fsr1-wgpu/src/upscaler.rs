//! The FSR1 upscaler
//!
//! [`Upscaler`] owns the compiled kernels, the point sampler and the surface
//! group for the current input size and quality mode. Kernels and sampler are
//! created once; resizing and quality changes only rebuild the surfaces.

use crate::backend::{AddressMode, ComputeContext, ComputeDevice, DispatchSize, Extent, FilterMode, INPUT_BINDING, OUTPUT_BINDING, SAMPLER_BINDING, SamplerDescriptor};
use crate::error::Error;
use crate::kernels::{KernelSet, PassDescriptor};
use crate::program::{PASSES, PROGRAM_SOURCE};
use crate::quality::QualityMode;
use crate::resources::{ColorSurface, ResourceSet, SurfaceId, WorkSurface};
use std::fmt;

const SAMPLER_LABEL: &str = "FSR1 Point Sampler";

/// Initial configuration of an [`Upscaler`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpscalerDescriptor {
    /// Width of the low-resolution input in pixels
    pub width: u32,
    /// Height of the low-resolution input in pixels
    pub height: u32,
    /// Initial quality mode
    pub quality: QualityMode,
}

/// Lifecycle state of an [`Upscaler`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpscalerState {
    /// Kernels and surfaces are built; `upscale` may be called
    Ready,
    /// Kernels are built but surfaces are not, after a release or a failed rebuild
    Unbuilt,
    /// Everything has been released
    Destroyed,
}

impl fmt::Display for UpscalerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpscalerState::Ready => f.write_str("ready"),
            UpscalerState::Unbuilt => f.write_str("unbuilt"),
            UpscalerState::Destroyed => f.write_str("destroyed"),
        }
    }
}

/// One dispatch of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedDispatch {
    /// Pass the dispatch runs
    pub pass: &'static PassDescriptor,
    /// Thread groups along each axis
    pub size: DispatchSize,
}

struct Inner<D: ComputeDevice> {
    device: D,
    kernels: KernelSet<D>,
    sampler: D::Sampler,
    resources: Option<ResourceSet<D>>,
}

/// Three-pass spatial upscaler
///
/// The upscaler never presents. The host refreshes [`Upscaler::color_input`]
/// before each [`Upscaler::upscale`] and consumes [`Upscaler::output`] after the
/// recorded work has executed.
pub struct Upscaler<D: ComputeDevice> {
    inner: Option<Inner<D>>,
    dimensions: Extent,
    quality: QualityMode,
}

impl<D: ComputeDevice> Upscaler<D> {
    /// Compiles the kernels and builds the surfaces for the initial configuration
    ///
    /// # Arguments
    /// * `device` - Device to create everything on; a clone is kept for rebuilds
    /// * `descriptor` - Input size and quality mode
    ///
    /// # Returns
    /// A ready upscaler. On failure everything created so far is released.
    pub fn new(device: &D, descriptor: &UpscalerDescriptor) -> Result<Self, Error> {
        let dimensions = checked_extent(descriptor.width, descriptor.height)?;
        let quality = descriptor.quality;

        let kernels = KernelSet::compile(device, PROGRAM_SOURCE, PASSES)?;
        let resources = ResourceSet::build(device, dimensions, quality.scale_factor())?;
        let sampler = device
            .create_sampler(&SamplerDescriptor {
                label: SAMPLER_LABEL,
                filter: FilterMode::Point,
                address_mode: AddressMode::Clamp,
            })
            .map_err(|e| Error::ResourceCreation {
                resource: SAMPLER_LABEL.to_string(),
                reason: e.message,
            })?;

        tracing::info!(
            "FSR1 upscaler ready: {}x{} -> {}x{} ({quality})",
            dimensions.width,
            dimensions.height,
            resources.target_size().width,
            resources.target_size().height,
        );

        Ok(Self {
            inner: Some(Inner {
                device: device.clone(),
                kernels,
                sampler,
                resources: Some(resources),
            }),
            dimensions,
            quality,
        })
    }

    pub fn state(&self) -> UpscalerState {
        match &self.inner {
            None => UpscalerState::Destroyed,
            Some(Inner { resources: None, .. }) => UpscalerState::Unbuilt,
            Some(_) => UpscalerState::Ready,
        }
    }

    /// Current low-resolution input size
    pub fn dimensions(&self) -> Extent {
        self.dimensions
    }

    /// Output size for the current input size and quality mode
    pub fn target_dimensions(&self) -> Extent {
        self.dimensions.scaled(self.scale_factor())
    }

    pub fn quality_mode(&self) -> QualityMode {
        self.quality
    }

    pub fn scale_factor(&self) -> f64 {
        self.quality.scale_factor()
    }

    /// The device the upscaler was created with, until it is destroyed
    pub fn device(&self) -> Option<&D> {
        self.inner.as_ref().map(|inner| &inner.device)
    }

    /// The low-resolution color input the host writes each frame
    pub fn color_input(&self) -> Option<&ColorSurface<D>> {
        self.resources().map(ResourceSet::color)
    }

    /// The display-ready output surface
    pub fn output(&self) -> Option<&WorkSurface<D>> {
        self.resources().and_then(|resources| resources.work(SurfaceId::Output))
    }

    fn resources(&self) -> Option<&ResourceSet<D>> {
        self.inner.as_ref().and_then(|inner| inner.resources.as_ref())
    }

    /// Dispatches a frame records for the current input size, in order
    pub fn dispatch_plan(&self) -> Vec<PlannedDispatch> {
        PASSES
            .iter()
            .map(|pass| PlannedDispatch {
                pass,
                size: DispatchSize::covering(self.dimensions, pass.tile_size),
            })
            .collect()
    }

    /// Changes the input size, rebuilding the surfaces
    ///
    /// Does nothing when the upscaler is ready and the size is unchanged.
    ///
    /// # Arguments
    /// * `width` - New input width; must be positive
    /// * `height` - New input height; must be positive
    ///
    /// # Returns
    /// `Ok(())` once the surfaces match the new size. If the rebuild fails the
    /// old surfaces are already gone: the upscaler keeps the new size and is
    /// left unbuilt.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        self.require_alive("resize")?;
        let dimensions = checked_extent(width, height)?;

        if self.state() == UpscalerState::Ready && dimensions == self.dimensions {
            return Ok(());
        }

        tracing::info!(
            "Resizing FSR1 input from {}x{} to {}x{}",
            self.dimensions.width,
            self.dimensions.height,
            dimensions.width,
            dimensions.height
        );
        self.dimensions = dimensions;
        self.rebuild_resources()
    }

    /// Changes the quality mode, rebuilding the surfaces at the new scale factor
    ///
    /// Does nothing when the upscaler is ready and the mode is unchanged. Failure
    /// behaves as in [`Upscaler::resize`].
    pub fn set_quality_mode(&mut self, quality: QualityMode) -> Result<(), Error> {
        self.require_alive("set quality mode")?;

        if self.state() == UpscalerState::Ready && quality == self.quality {
            return Ok(());
        }

        tracing::info!("Switching FSR1 quality mode from {} to {quality}", self.quality);
        self.quality = quality;
        self.rebuild_resources()
    }

    /// Changes the input size and the quality mode with a single rebuild
    ///
    /// Hosts that derive the input size from the quality mode use this instead
    /// of chaining [`Upscaler::set_quality_mode`] and [`Upscaler::resize`],
    /// which would build the surfaces twice. Does nothing when the upscaler is
    /// ready and neither value changes. Failure behaves as in
    /// [`Upscaler::resize`].
    ///
    /// # Arguments
    /// * `width` - New input width; must be positive
    /// * `height` - New input height; must be positive
    /// * `quality` - New quality mode
    pub fn reconfigure(&mut self, width: u32, height: u32, quality: QualityMode) -> Result<(), Error> {
        self.require_alive("reconfigure")?;
        let dimensions = checked_extent(width, height)?;

        if self.state() == UpscalerState::Ready && dimensions == self.dimensions && quality == self.quality {
            return Ok(());
        }

        tracing::info!(
            "Reconfiguring FSR1 from {}x{} ({}) to {}x{} ({quality})",
            self.dimensions.width,
            self.dimensions.height,
            self.quality,
            dimensions.width,
            dimensions.height
        );
        self.dimensions = dimensions;
        self.quality = quality;
        self.rebuild_resources()
    }

    /// Rebuilds the surfaces for the current size and quality mode
    ///
    /// Used to recover from a failed resize or quality change, or after
    /// [`Upscaler::release_resources`].
    pub fn rebuild(&mut self) -> Result<(), Error> {
        self.require_alive("rebuild")?;
        self.rebuild_resources()
    }

    /// Releases the surfaces, keeping kernels and sampler
    ///
    /// Safe to call repeatedly. The upscaler is unbuilt afterwards.
    pub fn release_resources(&mut self) {
        if let Some(inner) = self.inner.as_mut() {
            if inner.resources.take().is_some() {
                tracing::debug!("Released FSR1 resources");
            }
        }
    }

    /// Releases everything and drops the device handle
    ///
    /// Safe to call repeatedly; dropping the upscaler does the same.
    pub fn destroy(&mut self) {
        if self.inner.take().is_some() {
            tracing::info!("FSR1 upscaler destroyed");
        }
    }

    /// Records the three passes of one frame into `context`
    ///
    /// The sampler and color input are bound first. Each pass then selects its
    /// input view, kernel and output view and dispatches a grid sized from the
    /// input dimensions and the pass tile.
    ///
    /// # Arguments
    /// * `context` - Context to record into; borrowed for the whole frame so
    ///   nothing can rebind between a pass's bindings and its dispatch
    ///
    /// # Returns
    /// `Error::InvalidState` without recording anything unless the upscaler is ready
    pub fn upscale<C: ComputeContext<D>>(&self, context: &mut C) -> Result<(), Error> {
        let (Some(inner), Some(resources)) = (self.inner.as_ref(), self.resources()) else {
            return Err(Error::InvalidState {
                operation: "upscale",
                state: self.state(),
            });
        };

        // Passes never write the color input; the manifest check rejects it
        let write_views = inner
            .kernels
            .iter()
            .map(|kernel| {
                let write_view = resources.write_view(kernel.pass.output);
                debug_assert!(write_view.is_some(), "{} writes the color input", kernel.pass.name);
                write_view.ok_or_else(|| {
                    tracing::error!("{} writes the color input; nothing recorded", kernel.pass.name);
                    Error::InvalidState {
                        operation: "upscale",
                        state: self.state(),
                    }
                })
            })
            .collect::<Result<Vec<_>, Error>>()?;

        context.set_sampler(SAMPLER_BINDING, &inner.sampler);
        context.set_read_view(INPUT_BINDING, resources.read_view(SurfaceId::Color));
        let mut bound_input = SurfaceId::Color;

        for (kernel, write_view) in inner.kernels.iter().zip(write_views) {
            let pass = kernel.pass;
            if pass.input != bound_input {
                context.set_read_view(INPUT_BINDING, resources.read_view(pass.input));
                bound_input = pass.input;
            }

            let size = DispatchSize::covering(resources.source_size(), pass.tile_size);
            tracing::trace!("Dispatching {} ({}x{}x{})", pass.name, size.x, size.y, size.z);

            context.set_kernel(&kernel.kernel);
            context.set_write_view(OUTPUT_BINDING, write_view);
            context.dispatch(size);
        }

        Ok(())
    }

    fn require_alive(&self, operation: &'static str) -> Result<(), Error> {
        match self.state() {
            UpscalerState::Destroyed => Err(Error::InvalidState {
                operation,
                state: UpscalerState::Destroyed,
            }),
            _ => Ok(()),
        }
    }

    fn rebuild_resources(&mut self) -> Result<(), Error> {
        let Some(inner) = self.inner.as_mut() else {
            return Err(Error::InvalidState {
                operation: "rebuild",
                state: UpscalerState::Destroyed,
            });
        };

        // Release before building so the old and new surfaces never coexist
        inner.resources = None;

        match ResourceSet::build(&inner.device, self.dimensions, self.quality.scale_factor()) {
            Ok(resources) => {
                inner.resources = Some(resources);
                Ok(())
            }
            Err(e) => {
                tracing::error!("Failed to rebuild FSR1 resources: {e}");
                Err(e)
            }
        }
    }
}

fn checked_extent(width: u32, height: u32) -> Result<Extent, Error> {
    if width == 0 || height == 0 {
        return Err(Error::InvalidDimensions { width, height });
    }
    Ok(Extent::new(width, height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{Command, MockContext, MockDevice};

    fn descriptor(width: u32, height: u32, quality: QualityMode) -> UpscalerDescriptor {
        UpscalerDescriptor { width, height, quality }
    }

    fn upscaler(device: &MockDevice, quality: QualityMode) -> Upscaler<MockDevice> {
        Upscaler::new(device, &descriptor(800, 600, quality)).unwrap()
    }

    #[test]
    fn test_construction() {
        let device = MockDevice::new();
        let upscaler = upscaler(&device, QualityMode::Balanced);

        assert_eq!(upscaler.state(), UpscalerState::Ready);
        assert_eq!(upscaler.dimensions(), Extent::new(800, 600));
        assert_eq!(upscaler.target_dimensions(), Extent::new(1360, 1020));
        assert_eq!(upscaler.quality_mode(), QualityMode::Balanced);
        assert_eq!(upscaler.scale_factor(), 1.7);

        let stats = device.stats();
        assert_eq!(stats.kernels_compiled, 3);
        assert_eq!(stats.textures_created, 4);
        assert_eq!(stats.samplers_created, 1);

        assert_eq!(upscaler.color_input().unwrap().texture.size, Extent::new(800, 600));
        assert_eq!(upscaler.output().unwrap().texture.size, Extent::new(1360, 1020));
        assert_eq!(upscaler.output().unwrap().texture.label, SurfaceId::Output.label());
    }

    #[test]
    fn test_construction_rejects_zero_dimensions() {
        let device = MockDevice::new();
        for (width, height) in [(0, 600), (800, 0), (0, 0)] {
            let result = Upscaler::new(&device, &descriptor(width, height, QualityMode::Quality));
            assert!(matches!(result, Err(Error::InvalidDimensions { width: w, height: h }) if w == width && h == height));
        }
        assert_eq!(device.stats(), Default::default());
    }

    #[test]
    fn test_construction_fails_on_shader_error() {
        let device = MockDevice::new();
        device.fail_entry_point("finalize");

        let result = Upscaler::new(&device, &descriptor(800, 600, QualityMode::Quality));
        assert!(matches!(result, Err(Error::ShaderCompile { entry_point: "finalize", .. })));
        assert_eq!(device.stats().textures_created, 0);
        assert_eq!(device.live_textures(), 0);
    }

    #[test]
    fn test_construction_fails_on_resource_error() {
        let device = MockDevice::new();
        device.fail_texture_creation_at(4);

        let result = Upscaler::new(&device, &descriptor(800, 600, QualityMode::Quality));
        assert!(matches!(result, Err(Error::ResourceCreation { .. })));
        assert_eq!(device.live_textures(), 0);
    }

    #[test]
    fn test_construction_fails_on_sampler_error() {
        let device = MockDevice::new();
        device.fail_sampler();

        let result = Upscaler::new(&device, &descriptor(800, 600, QualityMode::Quality));
        match result {
            Err(Error::ResourceCreation { resource, .. }) => assert_eq!(resource, SAMPLER_LABEL),
            _ => panic!("expected a resource creation error"),
        }

        // The surfaces were built before the sampler and are released with it
        assert_eq!(device.stats().textures_created, 4);
        assert_eq!(device.live_textures(), 0);
    }

    #[test]
    fn test_construction_fails_on_view_error() {
        let device = MockDevice::new();
        device.fail_write_view(SurfaceId::Output.label());

        let result = Upscaler::new(&device, &descriptor(800, 600, QualityMode::Quality));
        match result {
            Err(Error::ResourceCreation { resource, .. }) => assert_eq!(resource, "FSR1 Output write view"),
            _ => panic!("expected a resource creation error"),
        }
        assert_eq!(device.stats().samplers_created, 0);
        assert_eq!(device.live_textures(), 0);
    }

    #[test]
    fn test_resize_to_same_dimensions_allocates_nothing() {
        let device = MockDevice::new();
        let mut upscaler = upscaler(&device, QualityMode::Quality);
        let before = device.stats();

        upscaler.resize(800, 600).unwrap();

        assert_eq!(device.stats(), before);
        assert_eq!(upscaler.state(), UpscalerState::Ready);
    }

    #[test]
    fn test_same_quality_mode_allocates_nothing() {
        let device = MockDevice::new();
        let mut upscaler = upscaler(&device, QualityMode::Performance);
        let before = device.stats();

        upscaler.set_quality_mode(QualityMode::Performance).unwrap();

        assert_eq!(device.stats(), before);
    }

    #[test]
    fn test_resize_rebuilds_surfaces() {
        let device = MockDevice::new();
        let mut upscaler = upscaler(&device, QualityMode::Quality);

        upscaler.resize(1280, 720).unwrap();

        assert_eq!(upscaler.dimensions(), Extent::new(1280, 720));
        assert_eq!(upscaler.color_input().unwrap().texture.size, Extent::new(1280, 720));
        assert_eq!(upscaler.output().unwrap().texture.size, Extent::new(1920, 1080));
        assert_eq!(device.stats().textures_created, 8);
        assert_eq!(device.live_textures(), 4);
    }

    #[test]
    fn test_quality_change_rescales_targets_only() {
        let device = MockDevice::new();
        let mut upscaler = upscaler(&device, QualityMode::UltraQuality);
        assert_eq!(upscaler.output().unwrap().texture.size, Extent::new(1040, 780));

        upscaler.set_quality_mode(QualityMode::Performance).unwrap();

        assert_eq!(upscaler.quality_mode(), QualityMode::Performance);
        assert_eq!(upscaler.color_input().unwrap().texture.size, Extent::new(800, 600));
        assert_eq!(upscaler.output().unwrap().texture.size, Extent::new(1600, 1200));
        assert_eq!(device.live_textures(), 4);
    }

    #[test]
    fn test_reconfigure_rebuilds_once() {
        let device = MockDevice::new();
        let mut upscaler = upscaler(&device, QualityMode::Quality);
        let before = device.stats();

        upscaler.reconfigure(640, 360, QualityMode::Performance).unwrap();

        assert_eq!(upscaler.dimensions(), Extent::new(640, 360));
        assert_eq!(upscaler.quality_mode(), QualityMode::Performance);
        assert_eq!(upscaler.output().unwrap().texture.size, Extent::new(1280, 720));
        assert_eq!(device.stats().textures_created - before.textures_created, 4);
        assert_eq!(device.live_textures(), 4);

        let before = device.stats();
        upscaler.reconfigure(640, 360, QualityMode::Performance).unwrap();
        assert_eq!(device.stats(), before);
    }

    #[test]
    fn test_reconfigure_rejects_zero_dimensions() {
        let device = MockDevice::new();
        let mut upscaler = upscaler(&device, QualityMode::Quality);

        let result = upscaler.reconfigure(0, 360, QualityMode::Performance);

        assert_eq!(result, Err(Error::InvalidDimensions { width: 0, height: 360 }));
        assert_eq!(upscaler.quality_mode(), QualityMode::Quality);
        assert_eq!(upscaler.state(), UpscalerState::Ready);
        assert_eq!(device.live_textures(), 4);
    }

    #[test]
    fn test_kernels_compile_once() {
        let device = MockDevice::new();
        let mut upscaler = upscaler(&device, QualityMode::Quality);

        upscaler.resize(1024, 768).unwrap();
        upscaler.resize(640, 480).unwrap();
        upscaler.set_quality_mode(QualityMode::Balanced).unwrap();

        let stats = device.stats();
        assert_eq!(stats.kernels_compiled, 3);
        assert_eq!(stats.samplers_created, 1);
        assert_eq!(stats.textures_created, 16);
    }

    #[test]
    fn test_dispatch_grids() {
        let device = MockDevice::new();
        let upscaler = upscaler(&device, QualityMode::Quality);
        let mut context = MockContext::new();

        upscaler.upscale(&mut context).unwrap();

        assert_eq!(
            context.dispatches(),
            [
                DispatchSize { x: 100, y: 75, z: 1 },
                DispatchSize { x: 50, y: 38, z: 1 },
                DispatchSize { x: 100, y: 75, z: 1 },
            ]
        );

        let plan: Vec<_> = upscaler.dispatch_plan().iter().map(|step| (step.pass.entry_point, step.size)).collect();
        assert_eq!(
            plan,
            [
                ("upsample", DispatchSize { x: 100, y: 75, z: 1 }),
                ("sharpen", DispatchSize { x: 50, y: 38, z: 1 }),
                ("finalize", DispatchSize { x: 100, y: 75, z: 1 }),
            ]
        );
    }

    #[test]
    fn test_dispatch_grids_ignore_quality_mode() {
        let device = MockDevice::new();
        let mut upscaler = upscaler(&device, QualityMode::UltraQuality);
        let mut before = MockContext::new();
        upscaler.upscale(&mut before).unwrap();

        upscaler.set_quality_mode(QualityMode::Performance).unwrap();
        let mut after = MockContext::new();
        upscaler.upscale(&mut after).unwrap();

        assert_eq!(before.dispatches(), after.dispatches());
    }

    #[test]
    fn test_binding_order() {
        let device = MockDevice::new();
        let upscaler = upscaler(&device, QualityMode::Quality);
        let mut context = MockContext::new();

        upscaler.upscale(&mut context).unwrap();

        let color = upscaler.color_input().unwrap().texture.id;
        let output = upscaler.output().unwrap().texture.id;
        let (upsampled, sharpened) = (color + 1, color + 2);
        let sampler = match &context.commands[0] {
            Command::SetSampler { sampler, .. } => *sampler,
            other => panic!("sampler must be bound first, got {other:?}"),
        };
        let grid = |x, y| Command::Dispatch(DispatchSize { x, y, z: 1 });

        assert_eq!(
            context.commands,
            [
                Command::SetSampler { binding: SAMPLER_BINDING, sampler },
                Command::SetReadView { binding: INPUT_BINDING, texture: color },
                Command::SetKernel("upsample".to_string()),
                Command::SetWriteView { binding: OUTPUT_BINDING, texture: upsampled },
                grid(100, 75),
                Command::SetReadView { binding: INPUT_BINDING, texture: upsampled },
                Command::SetKernel("sharpen".to_string()),
                Command::SetWriteView { binding: OUTPUT_BINDING, texture: sharpened },
                grid(50, 38),
                Command::SetReadView { binding: INPUT_BINDING, texture: sharpened },
                Command::SetKernel("finalize".to_string()),
                Command::SetWriteView { binding: OUTPUT_BINDING, texture: output },
                grid(100, 75),
            ]
        );
    }

    #[test]
    fn test_no_dispatch_reads_its_target() {
        let device = MockDevice::new();
        let upscaler = upscaler(&device, QualityMode::Balanced);
        let mut context = MockContext::new();
        upscaler.upscale(&mut context).unwrap();

        let mut input = None;
        let mut output = None;
        for command in &context.commands {
            match command {
                Command::SetReadView { texture, .. } => input = Some(*texture),
                Command::SetWriteView { texture, .. } => output = Some(*texture),
                Command::Dispatch(_) => assert_ne!(input, output),
                _ => {}
            }
        }
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "writes the color input")]
    fn test_pass_writing_color_input_is_not_recorded() {
        static PASSES_WRITING_COLOR: [PassDescriptor; 1] = [PassDescriptor {
            name: "Broken",
            entry_point: "upsample",
            tile_size: 8,
            input: SurfaceId::Upsampled,
            output: SurfaceId::Color,
        }];

        let device = MockDevice::new();
        let mut upscaler = upscaler(&device, QualityMode::Quality);
        if let Some(inner) = upscaler.inner.as_mut() {
            inner.kernels = KernelSet::compile(&device, PROGRAM_SOURCE, &PASSES_WRITING_COLOR).unwrap();
        }

        let mut context = MockContext::new();
        let _ = upscaler.upscale(&mut context);
    }

    #[test]
    fn test_upscale_after_destroy() {
        let device = MockDevice::new();
        let mut upscaler = upscaler(&device, QualityMode::Quality);

        upscaler.destroy();
        upscaler.destroy();

        let mut context = MockContext::new();
        assert_eq!(
            upscaler.upscale(&mut context),
            Err(Error::InvalidState {
                operation: "upscale",
                state: UpscalerState::Destroyed,
            })
        );
        assert!(context.commands.is_empty());
        assert_eq!(upscaler.state(), UpscalerState::Destroyed);
        assert!(upscaler.device().is_none());
        assert_eq!(device.live_textures(), 0);

        assert!(matches!(upscaler.resize(640, 480), Err(Error::InvalidState { operation: "resize", .. })));
        assert!(matches!(upscaler.set_quality_mode(QualityMode::Balanced), Err(Error::InvalidState { .. })));
        assert!(matches!(upscaler.rebuild(), Err(Error::InvalidState { .. })));
    }

    #[test]
    fn test_failed_rebuild_leaves_upscaler_unbuilt() {
        let device = MockDevice::new();
        let mut upscaler = upscaler(&device, QualityMode::Quality);
        device.set_max_dimension(2000);

        // 1500 * 1.5 = 2250 exceeds the device limit
        let result = upscaler.resize(1500, 1500);
        assert!(matches!(result, Err(Error::ResourceCreation { .. })));

        assert_eq!(upscaler.state(), UpscalerState::Unbuilt);
        assert_eq!(upscaler.dimensions(), Extent::new(1500, 1500));
        assert!(upscaler.output().is_none());
        assert_eq!(device.live_textures(), 0);

        let mut context = MockContext::new();
        assert_eq!(
            upscaler.upscale(&mut context),
            Err(Error::InvalidState {
                operation: "upscale",
                state: UpscalerState::Unbuilt,
            })
        );
        assert!(context.commands.is_empty());

        // The same size is retried while unbuilt
        device.heal();
        upscaler.resize(1500, 1500).unwrap();
        assert_eq!(upscaler.state(), UpscalerState::Ready);
        assert_eq!(upscaler.output().unwrap().texture.size, Extent::new(2250, 2250));
    }

    #[test]
    fn test_failed_quality_change_keeps_requested_mode() {
        let device = MockDevice::new();
        let mut upscaler = upscaler(&device, QualityMode::UltraQuality);
        device.set_max_dimension(1500);

        assert!(upscaler.set_quality_mode(QualityMode::Performance).is_err());
        assert_eq!(upscaler.quality_mode(), QualityMode::Performance);
        assert_eq!(upscaler.state(), UpscalerState::Unbuilt);

        device.heal();
        upscaler.rebuild().unwrap();
        assert_eq!(upscaler.state(), UpscalerState::Ready);
        assert_eq!(upscaler.target_dimensions(), Extent::new(1600, 1200));
    }

    #[test]
    fn test_invalid_resize_keeps_resources() {
        let device = MockDevice::new();
        let mut upscaler = upscaler(&device, QualityMode::Quality);
        let before = device.stats();

        assert_eq!(upscaler.resize(0, 480), Err(Error::InvalidDimensions { width: 0, height: 480 }));

        assert_eq!(upscaler.state(), UpscalerState::Ready);
        assert_eq!(upscaler.dimensions(), Extent::new(800, 600));
        assert_eq!(device.stats(), before);
        assert_eq!(device.live_textures(), 4);
    }

    #[test]
    fn test_release_is_idempotent() {
        let device = MockDevice::new();
        let mut upscaler = upscaler(&device, QualityMode::Quality);

        upscaler.release_resources();
        upscaler.release_resources();

        assert_eq!(upscaler.state(), UpscalerState::Unbuilt);
        assert_eq!(device.live_textures(), 0);
        assert!(upscaler.color_input().is_none());

        upscaler.rebuild().unwrap();
        assert_eq!(upscaler.state(), UpscalerState::Ready);
        assert_eq!(device.live_textures(), 4);
        assert_eq!(device.stats().kernels_compiled, 3);
    }

    #[test]
    fn test_drop_releases_everything() {
        let device = MockDevice::new();
        let upscaler = upscaler(&device, QualityMode::Quality);
        assert_eq!(device.live_textures(), 4);

        drop(upscaler);
        assert_eq!(device.live_textures(), 0);
    }

    #[test]
    fn test_state_display() {
        let error = Error::InvalidState {
            operation: "upscale",
            state: UpscalerState::Unbuilt,
        };
        assert_eq!(error.to_string(), "cannot upscale while the upscaler is unbuilt");
    }
}
