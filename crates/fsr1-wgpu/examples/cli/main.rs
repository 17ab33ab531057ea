//! FSR1 CLI Image Upscaler
//!
//! A headless host for the upscaler: loads an image, runs one frame of the
//! three-pass pipeline on the GPU and writes the display-ready output.
//!
//! # Usage
//! ```bash
//! fsr1-cli input.png output.png --quality balanced
//! ```

use clap::Parser;
use fsr1_wgpu::gpu::{WgpuContext, WgpuDevice, write_rgba_f32};
use fsr1_wgpu::{QualityMode, Upscaler, UpscalerDescriptor};
use image::GenericImageView;
use std::path::PathBuf;

/// Command-line arguments for the FSR1 image upscaler
#[derive(Parser)]
#[command(version, about = "CLI tool for upscaling images using FSR1")]
struct Args {
    /// Input image file path
    input: PathBuf,

    /// Output image file path
    output: PathBuf,

    /// Quality mode (ultra-quality, quality, balanced, performance)
    #[arg(long, short, default_value = "quality")]
    quality: QualityMode,

    /// Print the dispatch plan before running
    #[arg(long, short)]
    verbose: bool,
}

/// Main application entry point
///
/// 1. Load the input image and convert it to linear RGBA
/// 2. Initialize the GPU and the upscaler
/// 3. Upload the image into the color input and record one frame
/// 4. Read back the output surface and save it
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(if args.verbose { tracing::Level::DEBUG } else { tracing::Level::WARN })
        .init();

    println!("Loading image from: {}", args.input.display());
    let input_image = image::open(&args.input)?;
    let (input_width, input_height) = input_image.dimensions();
    println!("Input image: {input_width}x{input_height}");

    println!("Initializing GPU...");
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::PRIMARY,
        ..Default::default()
    });

    let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::HighPerformance,
        compatible_surface: None,
        force_fallback_adapter: false,
    }))?;

    let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
        label: None,
        required_features: wgpu::Features::empty(),
        required_limits: wgpu::Limits::default(),
        memory_hints: wgpu::MemoryHints::default(),
        trace: Default::default(),
    }))?;

    let device = WgpuDevice::new(&device);
    let upscaler = Upscaler::new(
        &device,
        &UpscalerDescriptor {
            width: input_width,
            height: input_height,
            quality: args.quality,
        },
    )?;

    let target = upscaler.target_dimensions();
    println!("Expected output: {}x{} ({}, scale factor {})", target.width, target.height, args.quality, upscaler.scale_factor());

    if args.verbose {
        for step in upscaler.dispatch_plan() {
            println!("  {:<10} {}x{}x{} thread groups", step.pass.name, step.size.x, step.size.y, step.size.z);
        }
    }

    let color_input = upscaler.color_input().ok_or("Upscaler has no color input")?;
    let pixels: Vec<f32> = input_image.to_rgba32f().as_raw().chunks_exact(4).flat_map(linearize).collect();
    write_rgba_f32(&queue, &color_input.texture, &pixels);

    println!("Executing FSR1 pipeline...");
    let mut encoder = device.device().create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("FSR1 Upscale") });
    upscaler.upscale(&mut WgpuContext::new(&device, &mut encoder))?;
    queue.submit(std::iter::once(encoder.finish()));

    device.device().poll(wgpu::PollType::Wait)?;

    println!("Saving result to: {}", args.output.display());
    let output = upscaler.output().ok_or("Upscaler has no output")?;
    let output_image = save_texture_to_image(device.device(), &queue, &output.texture)?;
    image::DynamicImage::ImageRgba32F(output_image).to_rgba8().save(&args.output)?;

    println!("Successfully upscaled image from {input_width}x{input_height} to {}x{}", target.width, target.height);

    Ok(())
}

/// Decodes one sRGB-encoded RGBA texel to linear, keeping alpha
fn linearize(texel: &[f32]) -> [f32; 4] {
    let decode = |c: f32| if c <= 0.04045 { c / 12.92 } else { ((c + 0.055) / 1.055).powf(2.4) };
    [decode(texel[0]), decode(texel[1]), decode(texel[2]), texel[3]]
}

/// Reads an `Rgba16Float` texture back into an RGBA32F image
///
/// Rows are copied with the padding wgpu requires and unpadded on the CPU.
///
/// # Arguments
/// * `device` - wgpu device for creating the staging buffer
/// * `queue` - Command queue for the copy
/// * `texture` - Texture to read; must have `COPY_SRC` usage
///
/// # Returns
/// An RGBA32F image ready for format conversion and saving
fn save_texture_to_image(device: &wgpu::Device, queue: &wgpu::Queue, texture: &wgpu::Texture) -> Result<image::Rgba32FImage, Box<dyn std::error::Error>> {
    let wgpu::Extent3d { width, height, .. } = texture.size();
    if texture.format() != wgpu::TextureFormat::Rgba16Float {
        return Err(format!("Unsupported texture format for saving: {:?}", texture.format()).into());
    }

    let unpadded_bytes_per_row = width * 8;
    let bytes_per_row = unpadded_bytes_per_row.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT) * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Output Buffer"),
        size: (bytes_per_row * height) as u64,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("Copy Encoder") });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &buffer,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(bytes_per_row),
                rows_per_image: Some(height),
            },
        },
        texture.size(),
    );
    queue.submit(std::iter::once(encoder.finish()));

    let buffer_slice = buffer.slice(..);
    let (sender, receiver) = futures_intrusive::channel::shared::oneshot_channel();
    buffer_slice.map_async(wgpu::MapMode::Read, move |v| sender.send(v).unwrap());

    device.poll(wgpu::PollType::Wait)?;

    pollster::block_on(receiver.receive()).ok_or("Failed to map buffer for reading")??;

    let data = buffer_slice.get_mapped_range();
    let rgba_data: Vec<f32> = data
        .chunks_exact(bytes_per_row as usize)
        .flat_map(|row| bytemuck::cast_slice::<u8, half::f16>(&row[..unpadded_bytes_per_row as usize]).iter().map(|c| c.to_f32()))
        .collect();

    Ok(image::Rgba32FImage::from_raw(width, height, rgba_data).ok_or("Failed to create RGBA32F image from data")?)
}
