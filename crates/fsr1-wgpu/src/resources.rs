//! Working surfaces of the upscaler
//!
//! A [`ResourceSet`] owns the low-resolution color input and the three
//! target-sized work surfaces, each with the views the passes bind. The set is
//! built and dropped as a unit: there is no way to hold some surfaces without
//! the others, and a failed build releases whatever it had already created.

use crate::backend::{ComputeDevice, Extent, SurfaceDescriptor, SurfaceFormat, SurfaceUsage};
use crate::error::Error;

/// Format of every surface in the set
pub const SURFACE_FORMAT: SurfaceFormat = SurfaceFormat::Rgba16Float;

/// Identifies a surface in the resource set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceId {
    /// Low-resolution color input, refreshed by the host every frame
    Color,
    /// Work surface 1, written by the upsampling pass
    Upsampled,
    /// Work surface 2, written by the sharpening pass
    Sharpened,
    /// Work surface 3, the display-ready output
    Output,
}

impl SurfaceId {
    /// Label used for GPU objects backing this surface
    pub fn label(self) -> &'static str {
        match self {
            SurfaceId::Color => "FSR1 Color Input",
            SurfaceId::Upsampled => "FSR1 Upsampled",
            SurfaceId::Sharpened => "FSR1 Sharpened",
            SurfaceId::Output => "FSR1 Output",
        }
    }

    fn work_index(self) -> Option<usize> {
        match self {
            SurfaceId::Color => None,
            SurfaceId::Upsampled => Some(0),
            SurfaceId::Sharpened => Some(1),
            SurfaceId::Output => Some(2),
        }
    }
}

/// A texture with the view the kernels sample from
pub struct ColorSurface<D: ComputeDevice> {
    pub texture: D::Texture,
    pub read_view: D::ReadView,
}

/// A target-sized texture with both views
pub struct WorkSurface<D: ComputeDevice> {
    pub texture: D::Texture,
    pub read_view: D::ReadView,
    pub write_view: D::WriteView,
}

/// The complete group of surfaces for one input size and scale factor
pub struct ResourceSet<D: ComputeDevice> {
    source_size: Extent,
    target_size: Extent,
    color: ColorSurface<D>,
    work: [WorkSurface<D>; 3],
}

impl<D: ComputeDevice> ResourceSet<D> {
    /// Allocates the color input at `source_size` and three work surfaces at
    /// `floor(source_size * scale_factor)`
    ///
    /// # Arguments
    /// * `device` - Device to allocate on
    /// * `source_size` - Low-resolution input size
    /// * `scale_factor` - Output to input ratio
    ///
    /// # Returns
    /// The built set, or a `ResourceCreation` error naming the object the device
    /// rejected. Surfaces created before the failure are dropped on return.
    pub fn build(device: &D, source_size: Extent, scale_factor: f64) -> Result<Self, Error> {
        let target_size = source_size.scaled(scale_factor);

        tracing::debug!(
            "Building FSR1 resources: {}x{} -> {}x{} (scale factor {scale_factor})",
            source_size.width,
            source_size.height,
            target_size.width,
            target_size.height,
        );

        let color_texture = create_texture(device, SurfaceId::Color, source_size, SurfaceUsage::ColorInput)?;
        let color = ColorSurface {
            read_view: create_read_view(device, &color_texture, SurfaceId::Color)?,
            texture: color_texture,
        };

        let work = [
            build_work_surface(device, SurfaceId::Upsampled, target_size)?,
            build_work_surface(device, SurfaceId::Sharpened, target_size)?,
            build_work_surface(device, SurfaceId::Output, target_size)?,
        ];

        Ok(Self {
            source_size,
            target_size,
            color,
            work,
        })
    }

    /// Size of the color input
    pub fn source_size(&self) -> Extent {
        self.source_size
    }

    /// Size of every work surface
    pub fn target_size(&self) -> Extent {
        self.target_size
    }

    pub fn color(&self) -> &ColorSurface<D> {
        &self.color
    }

    /// Returns a work surface, or `None` for [`SurfaceId::Color`]
    pub fn work(&self, id: SurfaceId) -> Option<&WorkSurface<D>> {
        id.work_index().map(|index| &self.work[index])
    }

    /// Readable view of any surface in the set
    pub fn read_view(&self, id: SurfaceId) -> &D::ReadView {
        match self.work(id) {
            Some(surface) => &surface.read_view,
            None => &self.color.read_view,
        }
    }

    /// Writable view of a work surface; the color input has none
    pub fn write_view(&self, id: SurfaceId) -> Option<&D::WriteView> {
        self.work(id).map(|surface| &surface.write_view)
    }
}

fn create_texture<D: ComputeDevice>(device: &D, id: SurfaceId, size: Extent, usage: SurfaceUsage) -> Result<D::Texture, Error> {
    device
        .create_texture(&SurfaceDescriptor {
            label: id.label(),
            size,
            format: SURFACE_FORMAT,
            usage,
        })
        .map_err(|e| Error::ResourceCreation {
            resource: format!("{} texture", id.label()),
            reason: e.message,
        })
}

fn create_read_view<D: ComputeDevice>(device: &D, texture: &D::Texture, id: SurfaceId) -> Result<D::ReadView, Error> {
    device.create_read_view(texture, id.label()).map_err(|e| Error::ResourceCreation {
        resource: format!("{} read view", id.label()),
        reason: e.message,
    })
}

fn build_work_surface<D: ComputeDevice>(device: &D, id: SurfaceId, size: Extent) -> Result<WorkSurface<D>, Error> {
    let texture = create_texture(device, id, size, SurfaceUsage::Work)?;
    let read_view = create_read_view(device, &texture, id)?;
    let write_view = device.create_write_view(&texture, id.label()).map_err(|e| Error::ResourceCreation {
        resource: format!("{} write view", id.label()),
        reason: e.message,
    })?;

    Ok(WorkSurface { texture, read_view, write_view })
}
