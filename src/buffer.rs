//! Growable GPU buffers for per-instance data.
//!
//! Instance buffers only ever grow: when a frame needs more room than a buffer
//! has, it is recreated at `max(required, 2 * capacity)` elements and the old
//! one is dropped. Capacities are counted in elements, not bytes.

use std::marker::PhantomData;

use wgpu::util::DeviceExt;

pub const DEFAULT_INSTANCE_CAPACITY: usize = 1024;

/// New capacity for a buffer holding `current` elements that needs `required`.
///
/// Never shrinks. An empty buffer grows to exactly what is required, anything
/// else at least doubles.
pub fn grown_capacity(current: usize, required: usize) -> usize {
    if required <= current {
        return current;
    }
    if current == 0 {
        required
    } else {
        required.max(current.saturating_mul(2))
    }
}

/// A vertex buffer of `T` that is recreated bigger whenever it runs out of room.
#[derive(Debug)]
pub struct GrowableBuffer<T: bytemuck::Pod> {
    label: &'static str,
    buffer: wgpu::Buffer,
    capacity: usize,
    len: usize,
    _marker: PhantomData<T>,
}

impl<T: bytemuck::Pod> GrowableBuffer<T> {
    pub fn new(device: &wgpu::Device, label: &'static str, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            label,
            buffer: Self::allocate(device, label, capacity),
            capacity,
            len: 0,
            _marker: PhantomData,
        }
    }

    fn allocate(device: &wgpu::Device, label: &str, capacity: usize) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: (capacity * std::mem::size_of::<T>()) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    /// Make room for `required` elements. Returns whether the buffer was replaced.
    pub fn ensure_capacity(&mut self, device: &wgpu::Device, required: usize) -> bool {
        let capacity = grown_capacity(self.capacity, required);
        if capacity == self.capacity {
            return false;
        }
        log::debug!(
            "Growing {} from {} to {} elements",
            self.label,
            self.capacity,
            capacity
        );
        self.buffer = Self::allocate(device, self.label, capacity);
        self.capacity = capacity;
        true
    }

    /// Replace the contents with `data`, growing first if needed.
    pub fn upload(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, data: &[T]) {
        self.ensure_capacity(device, data.len());
        if !data.is_empty() {
            queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(data));
        }
        self.len = data.len();
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Elements written by the last upload.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// A static vertex buffer created once with its contents, sized exactly.
///
/// Rewrites that fit reuse the allocation; bigger ones recreate it.
#[derive(Debug)]
pub struct StaticBuffer {
    buffer: wgpu::Buffer,
    size: wgpu::BufferAddress,
}

impl StaticBuffer {
    pub fn new(device: &wgpu::Device, label: &str, contents: &[u8]) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });
        Self {
            buffer,
            size: contents.len() as wgpu::BufferAddress,
        }
    }

    pub fn write(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        label: &str,
        contents: &[u8],
    ) {
        if contents.len() as wgpu::BufferAddress > self.size {
            *self = Self::new(device, label, contents);
        } else if !contents.is_empty() {
            queue.write_buffer(&self.buffer, 0, contents);
        }
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }
}
