//! Descriptor set layout, pool and the quad's per-image descriptor sets
//!
//! Binding 0 is the transform uniform buffer read by the vertex stage,
//! binding 1 the combined image sampler read by the fragment stage.

use crate::render::backends::vulkan::{VulkanError, VulkanResult};
use ash::{vk, Device};

/// Binding of the transform uniform buffer
pub const UNIFORM_BINDING: u32 = 0;
/// Binding of the texture sampler
pub const SAMPLER_BINDING: u32 = 1;

/// Descriptor set layout builder for creating reusable layouts
#[derive(Debug, Default)]
pub struct DescriptorSetLayoutBuilder {
    bindings: Vec<vk::DescriptorSetLayoutBinding>,
}

impl DescriptorSetLayoutBuilder {
    /// Create a new descriptor set layout builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a uniform buffer binding
    #[must_use]
    pub fn add_uniform_buffer(self, binding: u32, stage_flags: vk::ShaderStageFlags) -> Self {
        self.add(binding, vk::DescriptorType::UNIFORM_BUFFER, stage_flags)
    }

    /// Add a combined image sampler binding
    #[must_use]
    pub fn add_combined_image_sampler(self, binding: u32, stage_flags: vk::ShaderStageFlags) -> Self {
        self.add(binding, vk::DescriptorType::COMBINED_IMAGE_SAMPLER, stage_flags)
    }

    fn add(mut self, binding: u32, ty: vk::DescriptorType, stage_flags: vk::ShaderStageFlags) -> Self {
        self.bindings.push(
            vk::DescriptorSetLayoutBinding::builder()
                .binding(binding)
                .descriptor_type(ty)
                .descriptor_count(1)
                .stage_flags(stage_flags)
                .build(),
        );
        self
    }

    /// Bindings added so far
    pub fn bindings(&self) -> &[vk::DescriptorSetLayoutBinding] {
        &self.bindings
    }

    /// Pool sizes with one descriptor per binding for each of `sets` sets
    pub fn pool_sizes(&self, sets: u32) -> Vec<vk::DescriptorPoolSize> {
        pool_sizes(&self.bindings, sets)
    }

    /// Build the descriptor set layout
    pub fn build(self, device: &Device) -> VulkanResult<DescriptorSetLayout> {
        let layout_info = vk::DescriptorSetLayoutCreateInfo::builder().bindings(&self.bindings);

        let layout =
            unsafe { device.create_descriptor_set_layout(&layout_info, None) }.map_err(VulkanError::Api)?;

        Ok(DescriptorSetLayout {
            layout,
            device: device.clone(),
            bindings: self.bindings,
        })
    }
}

fn pool_sizes(bindings: &[vk::DescriptorSetLayoutBinding], sets: u32) -> Vec<vk::DescriptorPoolSize> {
    let mut sizes: Vec<vk::DescriptorPoolSize> = Vec::new();
    for binding in bindings {
        match sizes.iter_mut().find(|size| size.ty == binding.descriptor_type) {
            Some(size) => size.descriptor_count += binding.descriptor_count * sets,
            None => sizes.push(vk::DescriptorPoolSize {
                ty: binding.descriptor_type,
                descriptor_count: binding.descriptor_count * sets,
            }),
        }
    }
    sizes
}

/// The layout the quad pipeline is built against
pub fn quad_layout_builder() -> DescriptorSetLayoutBuilder {
    DescriptorSetLayoutBuilder::new()
        .add_uniform_buffer(UNIFORM_BINDING, vk::ShaderStageFlags::VERTEX)
        .add_combined_image_sampler(SAMPLER_BINDING, vk::ShaderStageFlags::FRAGMENT)
}

/// Descriptor set layout wrapper with automatic cleanup
pub struct DescriptorSetLayout {
    layout: vk::DescriptorSetLayout,
    device: Device,
    bindings: Vec<vk::DescriptorSetLayoutBinding>,
}

impl DescriptorSetLayout {
    /// Get the Vulkan descriptor set layout handle
    pub const fn handle(&self) -> vk::DescriptorSetLayout {
        self.layout
    }

    /// Get the bindings used in this layout
    pub fn bindings(&self) -> &[vk::DescriptorSetLayoutBinding] {
        &self.bindings
    }
}

impl Drop for DescriptorSetLayout {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_descriptor_set_layout(self.layout, None);
        }
    }
}

/// Descriptor pool sized for a fixed number of sets; sets are freed with it
pub struct DescriptorPool {
    pool: vk::DescriptorPool,
    device: Device,
}

impl DescriptorPool {
    /// Create a pool able to hold `max_sets` sets of `layout`
    pub fn new(device: Device, layout: &DescriptorSetLayout, max_sets: u32) -> VulkanResult<Self> {
        let pool_sizes = pool_sizes(layout.bindings(), max_sets);

        let pool_info = vk::DescriptorPoolCreateInfo::builder()
            .pool_sizes(&pool_sizes)
            .max_sets(max_sets);

        let pool = unsafe { device.create_descriptor_pool(&pool_info, None) }.map_err(VulkanError::Api)?;

        Ok(Self { pool, device })
    }

    /// Allocate `count` sets of `layout`
    pub fn allocate(&self, layout: &DescriptorSetLayout, count: u32) -> VulkanResult<Vec<vk::DescriptorSet>> {
        let layouts = vec![layout.handle(); count as usize];
        let alloc_info = vk::DescriptorSetAllocateInfo::builder()
            .descriptor_pool(self.pool)
            .set_layouts(&layouts);

        unsafe { self.device.allocate_descriptor_sets(&alloc_info) }.map_err(VulkanError::Api)
    }

    /// Point `set` at the uniform buffer and texture
    pub fn write_quad_set(
        &self,
        set: vk::DescriptorSet,
        uniform: vk::DescriptorBufferInfo,
        texture: vk::DescriptorImageInfo,
    ) {
        let buffer_infos = [uniform];
        let image_infos = [texture];
        let writes = [
            vk::WriteDescriptorSet::builder()
                .dst_set(set)
                .dst_binding(UNIFORM_BINDING)
                .dst_array_element(0)
                .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                .buffer_info(&buffer_infos)
                .build(),
            vk::WriteDescriptorSet::builder()
                .dst_set(set)
                .dst_binding(SAMPLER_BINDING)
                .dst_array_element(0)
                .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                .image_info(&image_infos)
                .build(),
        ];

        unsafe {
            self.device.update_descriptor_sets(&writes, &[]);
        }
    }

    /// Get the pool handle
    pub const fn handle(&self) -> vk::DescriptorPool {
        self.pool
    }
}

impl Drop for DescriptorPool {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_descriptor_pool(self.pool, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quad_layout_bindings() {
        let builder = quad_layout_builder();
        let bindings = builder.bindings();
        assert_eq!(bindings.len(), 2);

        assert_eq!(bindings[0].binding, UNIFORM_BINDING);
        assert_eq!(bindings[0].descriptor_type, vk::DescriptorType::UNIFORM_BUFFER);
        assert_eq!(bindings[0].stage_flags, vk::ShaderStageFlags::VERTEX);

        assert_eq!(bindings[1].binding, SAMPLER_BINDING);
        assert_eq!(bindings[1].descriptor_type, vk::DescriptorType::COMBINED_IMAGE_SAMPLER);
        assert_eq!(bindings[1].stage_flags, vk::ShaderStageFlags::FRAGMENT);
    }

    #[test]
    fn test_pool_sizes_merge_types() {
        let builder = DescriptorSetLayoutBuilder::new()
            .add_uniform_buffer(0, vk::ShaderStageFlags::VERTEX)
            .add_uniform_buffer(1, vk::ShaderStageFlags::FRAGMENT)
            .add_combined_image_sampler(2, vk::ShaderStageFlags::FRAGMENT);
        let sizes = builder.pool_sizes(3);
        assert_eq!(sizes.len(), 2);
        assert_eq!(sizes[0].ty, vk::DescriptorType::UNIFORM_BUFFER);
        assert_eq!(sizes[0].descriptor_count, 6);
        assert_eq!(sizes[1].descriptor_count, 3);
    }
}
