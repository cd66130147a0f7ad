//! Storage buffers for per-frame record arrays (lights, reflection probes).

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

/// Read-only storage buffer of `T`s that grows to the largest upload seen so far.
/// Never empty, since zero sized bindings are invalid.
pub struct StorageArray<T: Pod + Zeroable> {
    label: &'static str,
    buffer: wgpu::Buffer,
    capacity: usize,
    len: usize,
    _marker: std::marker::PhantomData<T>,
}

/// Capacity to allocate for `len` records when `current` is too small.
pub(crate) fn grown_capacity(current: usize, len: usize) -> usize {
    if len <= current {
        current
    } else {
        len.next_power_of_two().max(1)
    }
}

impl<T: Pod + Zeroable> StorageArray<T> {
    pub fn new(device: &wgpu::Device, label: &'static str, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            label,
            buffer: Self::allocate(device, label, capacity),
            capacity,
            len: 0,
            _marker: std::marker::PhantomData,
        }
    }

    fn allocate(device: &wgpu::Device, label: &str, capacity: usize) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: (capacity * std::mem::size_of::<T>()) as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    /// Records a copy of `items` into the buffer, reallocating when they do not fit.
    /// Only commands recorded after it see the new contents. Returns true when the
    /// buffer was replaced, so bind groups holding the old one must be rebuilt.
    pub fn upload(&mut self, device: &wgpu::Device, encoder: &mut wgpu::CommandEncoder, items: &[T]) -> bool {
        let capacity = grown_capacity(self.capacity, items.len());
        let replaced = capacity != self.capacity;
        if replaced {
            log::debug!("{}: growing from {} to {} records", self.label, self.capacity, capacity);
            self.buffer = Self::allocate(device, self.label, capacity);
            self.capacity = capacity;
        }
        if !items.is_empty() {
            let staging = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("storage_array_staging"),
                contents: bytemuck::cast_slice(items),
                usage: wgpu::BufferUsages::COPY_SRC,
            });
            encoder.copy_buffer_to_buffer(&staging, 0, &self.buffer, 0, std::mem::size_of_val(items) as u64);
        }
        self.len = items.len();
        replaced
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grows_to_power_of_two() {
        assert_eq!(grown_capacity(16, 3), 16);
        assert_eq!(grown_capacity(16, 16), 16);
        assert_eq!(grown_capacity(16, 17), 32);
        assert_eq!(grown_capacity(1, 1000), 1024);
        assert_eq!(grown_capacity(1, 0), 1);
    }
}
