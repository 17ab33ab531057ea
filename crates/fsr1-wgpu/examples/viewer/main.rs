//! FSR1 Viewer Example
//!
//! Renders an animated low-resolution test scene, upscales it with FSR1 every
//! frame and presents the result in a resizable window. The scene is rendered at
//! the window size divided by the current scale factor, so switching quality
//! modes changes the render resolution while the window stays the same.
//!
//! # Usage
//! ```bash
//! cargo run --example viewer -- --quality balanced
//! ```

/// Application event handling
mod app;

/// Window, surface and per-frame rendering
mod viewer;

use crate::app::ViewerApp;
use clap::Parser;
use fsr1_wgpu::QualityMode;
use winit::event_loop::{ControlFlow, EventLoop};

/// Command-line arguments for the viewer
#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// Initial quality mode (ultra-quality, quality, balanced, performance)
    #[arg(long, short, default_value = "quality")]
    quality: QualityMode,

    /// Initial window width
    #[arg(long, default_value_t = 1280)]
    width: u32,

    /// Initial window height
    #[arg(long, default_value_t = 720)]
    height: u32,
}

fn main() -> Result<(), winit::error::EventLoopError> {
    let args = Args::parse();

    let subscriber = tracing_subscriber::fmt().with_max_level(tracing::Level::DEBUG).finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to install tracing subscriber");

    tracing::info!("Starting FSR1 viewer...");

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = ViewerApp::new(args.quality, args.width, args.height);
    event_loop.run_app(&mut app)
}
