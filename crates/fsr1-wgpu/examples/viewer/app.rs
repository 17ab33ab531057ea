//! Application event handler for the FSR1 viewer

use super::viewer::ViewerContext;
use fsr1_wgpu::QualityMode;
use winit::{
    application::ApplicationHandler,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::ActiveEventLoop,
    keyboard::{KeyCode, PhysicalKey},
    window::WindowId,
};

/// Main viewer application structure
pub struct ViewerApp {
    /// Quality mode used when the window is created
    quality: QualityMode,
    /// Requested initial window size
    window_size: (u32, u32),
    /// Window, GPU and upscaler state; created on resume
    context: Option<ViewerContext>,
}

impl ViewerApp {
    pub fn new(quality: QualityMode, width: u32, height: u32) -> Self {
        Self {
            quality,
            window_size: (width, height),
            context: None,
        }
    }
}

impl ApplicationHandler for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.context.is_some() {
            return;
        }

        match ViewerContext::new(event_loop, self.window_size, self.quality) {
            Ok(context) => self.context = Some(context),
            Err(e) => {
                tracing::error!("Failed to initialize viewer: {e}");
                event_loop.exit();
                return;
            }
        }

        println!();
        println!("Keyboard shortcuts:");
        println!("  - Esc: Quit");
        println!("  - 1-4: Set quality mode (Ultra Quality, Quality, Balanced, Performance)");
        println!();
    }

    /// Handles window events:
    /// - Escape: Quit application
    /// - 1-4: Set quality mode
    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::KeyboardInput {
                event: KeyEvent {
                    state: ElementState::Pressed,
                    physical_key: PhysicalKey::Code(KeyCode::Escape),
                    ..
                },
                ..
            }
            | WindowEvent::CloseRequested => {
                event_loop.exit();
            }

            WindowEvent::KeyboardInput {
                event: KeyEvent {
                    state: ElementState::Pressed,
                    physical_key: PhysicalKey::Code(keycode),
                    ..
                },
                ..
            } => {
                let quality = match keycode {
                    KeyCode::Digit1 => Some(QualityMode::UltraQuality),
                    KeyCode::Digit2 => Some(QualityMode::Quality),
                    KeyCode::Digit3 => Some(QualityMode::Balanced),
                    KeyCode::Digit4 => Some(QualityMode::Performance),
                    _ => None,
                };

                if let (Some(quality), Some(context)) = (quality, self.context.as_mut()) {
                    context.set_quality_mode(quality);
                }
            }

            WindowEvent::RedrawRequested => {
                if let Some(context) = self.context.as_mut() {
                    context.handle_redraw();
                }
            }

            WindowEvent::Resized(new_size) => {
                if let Some(context) = self.context.as_mut() {
                    context.resize(new_size);
                }
            }

            _ => {}
        }
    }
}
