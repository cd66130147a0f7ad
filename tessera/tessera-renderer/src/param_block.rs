//! Uniform parameter blocks with an explicit flush.

use bytemuck::Pod;
use wgpu::util::DeviceExt;

/// CPU copy of a parameter block plus whether the GPU copy is stale.
#[derive(Clone, Debug)]
pub struct Staged<T> {
    value: T,
    dirty: bool,
}

impl<T: Copy> Staged<T> {
    pub fn new(value: T) -> Self {
        Self { value, dirty: true }
    }

    pub fn set(&mut self, value: T) {
        self.value = value;
        self.dirty = true;
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// A block read by a dispatch must not hold unflushed changes.
    pub fn check_flushed(&self) {
        debug_assert!(!self.dirty, "parameter block bound before flush_to_gpu");
    }

    /// The value to upload, if it changed since the last call.
    pub fn take_pending(&mut self) -> Option<T> {
        if !self.dirty {
            return None;
        }
        self.dirty = false;
        Some(self.value)
    }
}

/// A uniform buffer and its staged contents. `flush_to_gpu` must be recorded between
/// `set` and the dispatch that reads the block.
pub struct ParamBlock<T: Pod> {
    staged: Staged<T>,
    buffer: wgpu::Buffer,
}

impl<T: Pod> ParamBlock<T> {
    pub fn new(device: &wgpu::Device, label: &str, value: T) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: std::mem::size_of::<T>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        Self {
            staged: Staged::new(value),
            buffer,
        }
    }

    pub fn set(&mut self, value: T) {
        self.staged.set(value);
    }

    pub fn get(&self) -> &T {
        self.staged.get()
    }

    pub fn is_dirty(&self) -> bool {
        self.staged.is_dirty()
    }

    /// Records a copy of the staged value into the block. Only commands recorded after
    /// it see the new value, so several frames may share one submit.
    pub fn flush_to_gpu(&mut self, device: &wgpu::Device, encoder: &mut wgpu::CommandEncoder) {
        if let Some(value) = self.staged.take_pending() {
            let staging = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("param_block_staging"),
                contents: bytemuck::bytes_of(&value),
                usage: wgpu::BufferUsages::COPY_SRC,
            });
            encoder.copy_buffer_to_buffer(&staging, 0, &self.buffer, 0, std::mem::size_of::<T>() as u64);
        }
    }

    /// Binding for a dispatch. The block must have been flushed since its last `set`.
    pub fn binding(&self) -> wgpu::BindingResource<'_> {
        self.staged.check_flushed();
        self.buffer.as_entire_binding()
    }

    /// Underlying uniform buffer, for passes that take the block as an input.
    pub fn buffer(&self) -> &wgpu::Buffer {
        self.staged.check_flushed();
        &self.buffer
    }

    pub fn min_binding_size() -> Option<wgpu::BufferSize> {
        wgpu::BufferSize::new(std::mem::size_of::<T>() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_dirty_and_flushes_once() {
        let mut staged = Staged::new([1i32, 2]);
        assert!(staged.is_dirty());
        assert_eq!(staged.take_pending(), Some([1, 2]));
        assert!(!staged.is_dirty());
        assert_eq!(staged.take_pending(), None);
    }

    #[test]
    fn set_marks_dirty_even_with_same_value() {
        let mut staged = Staged::new(0u32);
        let _ = staged.take_pending();
        staged.set(0);
        assert_eq!(staged.take_pending(), Some(0));
        staged.set(5);
        staged.set(6);
        assert_eq!(staged.take_pending(), Some(6));
    }

    #[test]
    fn flushed_block_passes_the_bind_check() {
        let mut staged = Staged::new(1u32);
        let _ = staged.take_pending();
        staged.check_flushed();
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "bound before flush_to_gpu")]
    fn binding_an_unflushed_block_panics() {
        let mut staged = Staged::new(1u32);
        let _ = staged.take_pending();
        staged.set(2);
        staged.check_flushed();
    }
}
