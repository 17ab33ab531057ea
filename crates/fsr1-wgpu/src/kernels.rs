//! Compiled compute kernels of the FSR1 pipeline

use crate::backend::ComputeDevice;
use crate::error::Error;
use crate::resources::SurfaceId;

/// Static description of one compute pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassDescriptor {
    /// Human-readable pass name
    pub name: &'static str,
    /// Compute entry point in the embedded program
    pub entry_point: &'static str,
    /// Source pixels covered by one thread group along each axis
    pub tile_size: u32,
    /// Surface the pass samples from
    pub input: SurfaceId,
    /// Surface the pass writes to
    pub output: SurfaceId,
}

/// A compiled pass
pub struct Kernel<D: ComputeDevice> {
    pub pass: &'static PassDescriptor,
    pub kernel: D::Kernel,
}

/// The compiled kernels of every pass, in dispatch order
///
/// Kernels do not depend on surface sizes, so one set serves the upscaler for
/// its whole lifetime.
pub struct KernelSet<D: ComputeDevice> {
    kernels: Vec<Kernel<D>>,
}

impl<D: ComputeDevice> KernelSet<D> {
    /// Compiles every pass of `passes` from `source`
    ///
    /// # Arguments
    /// * `device` - Device to compile on
    /// * `source` - Program source shared by every pass
    /// * `passes` - Pass table in dispatch order
    ///
    /// # Returns
    /// The compiled set, or a `ShaderCompile` error for the first entry point
    /// that failed. The diagnostic is also logged.
    pub fn compile(device: &D, source: &str, passes: &'static [PassDescriptor]) -> Result<Self, Error> {
        let kernels = passes
            .iter()
            .map(|pass| {
                tracing::debug!("Compiling {} (entry point `{}`)", pass.name, pass.entry_point);

                let kernel = device.create_kernel(source, pass.entry_point, pass.name).map_err(|e| {
                    tracing::error!("Failed to compile {} (entry point `{}`):\n{}", pass.name, pass.entry_point, e.message);
                    Error::ShaderCompile {
                        pass: pass.name,
                        entry_point: pass.entry_point,
                        diagnostic: e.message,
                    }
                })?;

                Ok(Kernel { pass, kernel })
            })
            .collect::<Result<Vec<_>, Error>>()?;

        Ok(Self { kernels })
    }

    /// Iterates the kernels in dispatch order
    pub fn iter(&self) -> impl Iterator<Item = &Kernel<D>> {
        self.kernels.iter()
    }

    pub fn len(&self) -> usize {
        self.kernels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kernels.is_empty()
    }
}
