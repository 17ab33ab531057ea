//! FSR1-wgpu: real-time spatial upscaling on wgpu
//!
//! This crate upscales a low-resolution color buffer with a fixed three-pass
//! compute pipeline modeled on AMD FidelityFX Super Resolution 1.0:
//!
//! 1. edge-adaptive upsampling into the target resolution,
//! 2. contrast-adaptive sharpening,
//! 3. a display pass that encodes the result for presentation.
//!
//! The output size follows from the input size and a [`QualityMode`]. The
//! [`Upscaler`] compiles its kernels once and rebuilds only its surfaces when
//! the input size or quality mode changes.
//!
//! ```no_run
//! use fsr1_wgpu::gpu::{WgpuContext, WgpuDevice};
//! use fsr1_wgpu::{QualityMode, Upscaler, UpscalerDescriptor};
//!
//! # fn frame(device: &wgpu::Device, queue: &wgpu::Queue) -> Result<(), fsr1_wgpu::Error> {
//! let device = WgpuDevice::new(device);
//! let upscaler = Upscaler::new(
//!     &device,
//!     &UpscalerDescriptor {
//!         width: 1280,
//!         height: 720,
//!         quality: QualityMode::Quality,
//!     },
//! )?;
//!
//! let mut encoder = device.device().create_command_encoder(&wgpu::CommandEncoderDescriptor::default());
//! upscaler.upscale(&mut WgpuContext::new(&device, &mut encoder))?;
//! queue.submit(Some(encoder.finish()));
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod error;
pub mod gpu;
pub mod kernels;
pub mod program;
pub mod quality;
pub mod resources;
pub mod upscaler;

#[cfg(test)]
mod mock;

pub use backend::{ComputeContext, ComputeDevice, DispatchSize, Extent};
pub use error::Error;
pub use quality::{QualityMode, scale_factor_of_raw};
pub use upscaler::{PlannedDispatch, Upscaler, UpscalerDescriptor, UpscalerState};
