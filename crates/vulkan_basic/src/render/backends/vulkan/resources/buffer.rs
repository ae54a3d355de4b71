//! Buffers and device memory
//!
//! Vertex and index data live in device-local buffers filled once through a
//! host-visible staging buffer and a one-time transfer command. Uniforms stay
//! in persistently mapped host-visible memory.

use crate::render::backends::vulkan::rendering::CommandPool;
use crate::render::backends::vulkan::{VulkanError, VulkanResult};
use ash::{vk, Device};
use bytemuck::Pod;
use std::marker::PhantomData;

/// Index of the first memory type allowed by `type_filter` that has every
/// flag in `properties`
pub fn find_memory_type(
    memory_properties: &vk::PhysicalDeviceMemoryProperties,
    type_filter: u32,
    properties: vk::MemoryPropertyFlags,
) -> VulkanResult<u32> {
    let count = memory_properties.memory_type_count as usize;
    memory_properties
        .memory_types
        .iter()
        .take(count)
        .zip(0u32..)
        .find(|&(memory_type, index)| {
            type_filter & (1u32 << index) != 0 && memory_type.property_flags.contains(properties)
        })
        .map(|(_, index)| index)
        .ok_or(VulkanError::NoSuitableMemoryType)
}

/// Buffer wrapper with memory management
pub struct Buffer {
    device: Device,
    buffer: vk::Buffer,
    memory: vk::DeviceMemory,
    size: vk::DeviceSize,
}

impl Buffer {
    /// Create a buffer and bind freshly allocated memory to it
    pub fn new(
        device: Device,
        memory_properties: &vk::PhysicalDeviceMemoryProperties,
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
        properties: vk::MemoryPropertyFlags,
    ) -> VulkanResult<Self> {
        let buffer_info = vk::BufferCreateInfo::builder()
            .size(size)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let buffer = unsafe { device.create_buffer(&buffer_info, None) }.map_err(VulkanError::Api)?;

        let requirements = unsafe { device.get_buffer_memory_requirements(buffer) };
        let memory = find_memory_type(memory_properties, requirements.memory_type_bits, properties)
            .and_then(|memory_type_index| {
                let alloc_info = vk::MemoryAllocateInfo::builder()
                    .allocation_size(requirements.size)
                    .memory_type_index(memory_type_index);
                unsafe { device.allocate_memory(&alloc_info, None) }.map_err(VulkanError::Api)
            });
        let memory = match memory {
            Ok(memory) => memory,
            Err(err) => {
                unsafe { device.destroy_buffer(buffer, None) };
                return Err(err);
            }
        };

        // From here on Drop releases both handles.
        let this = Self {
            device,
            buffer,
            memory,
            size,
        };
        unsafe { this.device.bind_buffer_memory(buffer, memory, 0) }.map_err(VulkanError::Api)?;

        Ok(this)
    }

    /// Host-visible, host-coherent transfer source of `size` bytes
    pub fn staging(
        device: Device,
        memory_properties: &vk::PhysicalDeviceMemoryProperties,
        size: vk::DeviceSize,
    ) -> VulkanResult<Self> {
        Self::new(
            device,
            memory_properties,
            size,
            vk::BufferUsageFlags::TRANSFER_SRC,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        )
    }

    /// Copy `data` into host-visible memory
    pub fn write_data<T: Pod>(&self, data: &[T]) -> VulkanResult<()> {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        if bytes.len() as vk::DeviceSize > self.size {
            return Err(VulkanError::InvalidOperation {
                reason: format!("Write of {} bytes exceeds buffer size {}", bytes.len(), self.size),
            });
        }

        unsafe {
            let ptr = self
                .device
                .map_memory(self.memory, 0, self.size, vk::MemoryMapFlags::empty())
                .map_err(VulkanError::Api)?;
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr.cast::<u8>(), bytes.len());
            self.device.unmap_memory(self.memory);
        }
        Ok(())
    }

    /// Get buffer handle
    pub const fn handle(&self) -> vk::Buffer {
        self.buffer
    }

    /// Get size
    pub const fn size(&self) -> vk::DeviceSize {
        self.size
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_buffer(self.buffer, None);
            self.device.free_memory(self.memory, None);
        }
    }
}

/// Device-local buffer uploaded once through a staging buffer
pub struct DeviceLocalBuffer {
    buffer: Buffer,
    element_count: u32,
}

impl DeviceLocalBuffer {
    /// Upload `data` into a new device-local buffer with `usage`
    pub fn with_data<T: Pod>(
        device: &Device,
        memory_properties: &vk::PhysicalDeviceMemoryProperties,
        command_pool: &CommandPool,
        queue: vk::Queue,
        usage: vk::BufferUsageFlags,
        data: &[T],
    ) -> VulkanResult<Self> {
        let size = std::mem::size_of_val(data) as vk::DeviceSize;
        if size == 0 {
            return Err(VulkanError::InvalidOperation {
                reason: "Cannot create an empty buffer".to_string(),
            });
        }

        let staging = Buffer::staging(device.clone(), memory_properties, size)?;
        staging.write_data(data)?;

        let buffer = Buffer::new(
            device.clone(),
            memory_properties,
            size,
            usage | vk::BufferUsageFlags::TRANSFER_DST,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
        )?;

        command_pool.one_time_submit(queue, |recorder| {
            recorder.cmd_copy_buffer(staging.handle(), buffer.handle(), size)
        })?;

        Ok(Self {
            buffer,
            element_count: u32::try_from(data.len()).map_err(|_| VulkanError::InvalidOperation {
                reason: format!("{} elements do not fit in u32", data.len()),
            })?,
        })
    }

    /// Get buffer handle
    pub const fn handle(&self) -> vk::Buffer {
        self.buffer.handle()
    }

    /// Number of elements uploaded
    pub const fn element_count(&self) -> u32 {
        self.element_count
    }
}

/// Host-visible uniform buffer holding one `T`, mapped for its whole life
///
/// Writes go straight to coherent memory, so the caller must know no
/// submitted frame still reads the buffer.
pub struct UniformBuffer<T: Pod> {
    buffer: Buffer,
    mapped: *mut u8,
    _marker: PhantomData<T>,
}

impl<T: Pod> UniformBuffer<T> {
    /// Allocate and map storage for one `T`
    pub fn new(device: &Device, memory_properties: &vk::PhysicalDeviceMemoryProperties) -> VulkanResult<Self> {
        let size = std::mem::size_of::<T>() as vk::DeviceSize;
        let buffer = Buffer::new(
            device.clone(),
            memory_properties,
            size,
            vk::BufferUsageFlags::UNIFORM_BUFFER,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        )?;

        let mapped = unsafe {
            buffer
                .device
                .map_memory(buffer.memory, 0, vk::WHOLE_SIZE, vk::MemoryMapFlags::empty())
        }
        .map_err(VulkanError::Api)?
        .cast::<u8>();

        Ok(Self {
            buffer,
            mapped,
            _marker: PhantomData,
        })
    }

    /// Overwrite the stored value
    pub fn update(&self, value: &T) {
        let bytes = bytemuck::bytes_of(value);
        unsafe {
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), self.mapped, bytes.len());
        }
    }

    /// Get buffer handle
    pub const fn handle(&self) -> vk::Buffer {
        self.buffer.handle()
    }

    /// Descriptor info covering the whole buffer
    pub fn descriptor_info(&self) -> vk::DescriptorBufferInfo {
        vk::DescriptorBufferInfo {
            buffer: self.buffer.handle(),
            offset: 0,
            range: self.buffer.size(),
        }
    }
}

impl<T: Pod> Drop for UniformBuffer<T> {
    fn drop(&mut self) {
        unsafe {
            self.buffer.device.unmap_memory(self.buffer.memory);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn properties(types: &[vk::MemoryPropertyFlags]) -> vk::PhysicalDeviceMemoryProperties {
        let mut props = vk::PhysicalDeviceMemoryProperties {
            memory_type_count: u32::try_from(types.len()).unwrap(),
            ..Default::default()
        };
        for (slot, flags) in props.memory_types.iter_mut().zip(types) {
            slot.property_flags = *flags;
        }
        props
    }

    #[test]
    fn test_find_memory_type_matches_flags() {
        let props = properties(&[
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        ]);
        let host = vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT;
        assert_eq!(find_memory_type(&props, 0b11, host).unwrap(), 1);
        assert_eq!(
            find_memory_type(&props, 0b11, vk::MemoryPropertyFlags::DEVICE_LOCAL).unwrap(),
            0
        );
    }

    #[test]
    fn test_find_memory_type_respects_filter() {
        let props = properties(&[
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
            vk::MemoryPropertyFlags::DEVICE_LOCAL | vk::MemoryPropertyFlags::HOST_VISIBLE,
        ]);
        assert_eq!(
            find_memory_type(&props, 0b10, vk::MemoryPropertyFlags::DEVICE_LOCAL).unwrap(),
            1
        );
    }

    #[test]
    fn test_find_memory_type_ignores_unused_slots() {
        let props = properties(&[vk::MemoryPropertyFlags::DEVICE_LOCAL]);
        assert!(matches!(
            find_memory_type(&props, u32::MAX, vk::MemoryPropertyFlags::HOST_VISIBLE),
            Err(VulkanError::NoSuitableMemoryType)
        ));
    }
}
