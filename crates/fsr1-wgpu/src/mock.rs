//! In-memory backend used by the unit tests
//!
//! Records every allocation and command so tests can check allocation counts,
//! binding order and release behavior without a GPU.

use crate::backend::{ComputeContext, ComputeDevice, DeviceError, DispatchSize, Extent, SamplerDescriptor, SurfaceDescriptor, SurfaceFormat, SurfaceUsage};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Counters shared by every clone of a [`MockDevice`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MockStats {
    pub textures_created: usize,
    pub kernels_compiled: usize,
    pub samplers_created: usize,
}

#[derive(Default)]
struct MockState {
    stats: Cell<MockStats>,
    live_textures: Rc<Cell<usize>>,
    next_id: Cell<u64>,
    /// 1-based index of the texture creation that fails
    fail_texture_at: Cell<Option<usize>>,
    texture_attempts: Cell<usize>,
    max_dimension: Cell<Option<u32>>,
    failing_entry_point: RefCell<Option<String>>,
    /// Surface labels whose read or write views are rejected
    failing_read_view: RefCell<Option<String>>,
    failing_write_view: RefCell<Option<String>>,
    fail_sampler: Cell<bool>,
}

impl MockState {
    fn next_id(&self) -> u64 {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        id
    }

    fn update(&self, f: impl FnOnce(&mut MockStats)) {
        let mut stats = self.stats.get();
        f(&mut stats);
        self.stats.set(stats);
    }
}

#[derive(Clone, Default)]
pub struct MockDevice {
    state: Rc<MockState>,
}

pub struct MockTexture {
    pub id: u64,
    pub label: String,
    pub size: Extent,
    pub format: SurfaceFormat,
    pub usage: SurfaceUsage,
    live: Rc<Cell<usize>>,
}

impl Drop for MockTexture {
    fn drop(&mut self) {
        self.live.set(self.live.get() - 1);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockView {
    pub texture_id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockKernel {
    pub entry_point: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockSampler {
    pub id: u64,
}

impl MockDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> MockStats {
        self.state.stats.get()
    }

    /// Number of textures created and not yet dropped
    pub fn live_textures(&self) -> usize {
        self.state.live_textures.get()
    }

    /// Makes the `index`-th texture creation (1-based, counted from now) fail
    pub fn fail_texture_creation_at(&self, index: usize) {
        self.state.texture_attempts.set(0);
        self.state.fail_texture_at.set(Some(index));
    }

    /// Rejects textures larger than `max` on either axis
    pub fn set_max_dimension(&self, max: u32) {
        self.state.max_dimension.set(Some(max));
    }

    /// Makes compilation of `entry_point` fail
    pub fn fail_entry_point(&self, entry_point: &str) {
        *self.state.failing_entry_point.borrow_mut() = Some(entry_point.to_string());
    }

    /// Makes creation of the read view labelled `label` fail
    pub fn fail_read_view(&self, label: &str) {
        *self.state.failing_read_view.borrow_mut() = Some(label.to_string());
    }

    /// Makes creation of the write view labelled `label` fail
    pub fn fail_write_view(&self, label: &str) {
        *self.state.failing_write_view.borrow_mut() = Some(label.to_string());
    }

    /// Makes every sampler creation fail
    pub fn fail_sampler(&self) {
        self.state.fail_sampler.set(true);
    }

    /// Clears every injected failure
    pub fn heal(&self) {
        self.state.fail_texture_at.set(None);
        self.state.max_dimension.set(None);
        *self.state.failing_entry_point.borrow_mut() = None;
        *self.state.failing_read_view.borrow_mut() = None;
        *self.state.failing_write_view.borrow_mut() = None;
        self.state.fail_sampler.set(false);
    }
}

impl ComputeDevice for MockDevice {
    type Texture = MockTexture;
    type ReadView = MockView;
    type WriteView = MockView;
    type Kernel = MockKernel;
    type Sampler = MockSampler;

    fn create_texture(&self, descriptor: &SurfaceDescriptor<'_>) -> Result<MockTexture, DeviceError> {
        let attempt = self.state.texture_attempts.get() + 1;
        self.state.texture_attempts.set(attempt);
        if self.state.fail_texture_at.get() == Some(attempt) {
            return Err(DeviceError::new("out of memory"));
        }

        let Extent { width, height } = descriptor.size;
        if let Some(max) = self.state.max_dimension.get() {
            if width > max || height > max {
                return Err(DeviceError::new(format!("texture size {width}x{height} exceeds the limit of {max}")));
            }
        }

        self.state.update(|stats| stats.textures_created += 1);
        let live = self.state.live_textures.clone();
        live.set(live.get() + 1);

        Ok(MockTexture {
            id: self.state.next_id(),
            label: descriptor.label.to_string(),
            size: descriptor.size,
            format: descriptor.format,
            usage: descriptor.usage,
            live,
        })
    }

    fn create_read_view(&self, texture: &MockTexture, label: &str) -> Result<MockView, DeviceError> {
        if self.state.failing_read_view.borrow().as_deref() == Some(label) {
            return Err(DeviceError::new("view format not supported"));
        }
        Ok(MockView { texture_id: texture.id })
    }

    fn create_write_view(&self, texture: &MockTexture, label: &str) -> Result<MockView, DeviceError> {
        if self.state.failing_write_view.borrow().as_deref() == Some(label) {
            return Err(DeviceError::new("storage binding not supported"));
        }
        Ok(MockView { texture_id: texture.id })
    }

    fn create_kernel(&self, source: &str, entry_point: &str, _label: &str) -> Result<MockKernel, DeviceError> {
        if self.state.failing_entry_point.borrow().as_deref() == Some(entry_point) {
            return Err(DeviceError::new(format!("error: unknown identifier in `{entry_point}`")));
        }
        if !source.contains(entry_point) {
            return Err(DeviceError::new(format!("entry point `{entry_point}` not found")));
        }

        self.state.update(|stats| stats.kernels_compiled += 1);
        Ok(MockKernel {
            entry_point: entry_point.to_string(),
        })
    }

    fn create_sampler(&self, _descriptor: &SamplerDescriptor<'_>) -> Result<MockSampler, DeviceError> {
        if self.state.fail_sampler.get() {
            return Err(DeviceError::new("too many samplers"));
        }
        self.state.update(|stats| stats.samplers_created += 1);
        Ok(MockSampler { id: self.state.next_id() })
    }
}

/// A recorded context call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    SetSampler { binding: u32, sampler: u64 },
    SetReadView { binding: u32, texture: u64 },
    SetWriteView { binding: u32, texture: u64 },
    SetKernel(String),
    Dispatch(DispatchSize),
}

#[derive(Debug, Default)]
pub struct MockContext {
    pub commands: Vec<Command>,
}

impl MockContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dispatches(&self) -> Vec<DispatchSize> {
        self.commands
            .iter()
            .filter_map(|command| match command {
                Command::Dispatch(size) => Some(*size),
                _ => None,
            })
            .collect()
    }
}

impl ComputeContext<MockDevice> for MockContext {
    fn set_sampler(&mut self, binding: u32, sampler: &MockSampler) {
        self.commands.push(Command::SetSampler { binding, sampler: sampler.id });
    }

    fn set_read_view(&mut self, binding: u32, view: &MockView) {
        self.commands.push(Command::SetReadView {
            binding,
            texture: view.texture_id,
        });
    }

    fn set_write_view(&mut self, binding: u32, view: &MockView) {
        self.commands.push(Command::SetWriteView {
            binding,
            texture: view.texture_id,
        });
    }

    fn set_kernel(&mut self, kernel: &MockKernel) {
        self.commands.push(Command::SetKernel(kernel.entry_point.clone()));
    }

    fn dispatch(&mut self, size: DispatchSize) {
        self.commands.push(Command::Dispatch(size));
    }
}
