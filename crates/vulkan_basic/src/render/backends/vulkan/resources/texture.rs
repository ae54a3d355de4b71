//! Sampled texture: image, memory, view and sampler

use super::buffer::{find_memory_type, Buffer};
use crate::assets::ImageData;
use crate::render::backends::vulkan::rendering::CommandPool;
use crate::render::backends::vulkan::{VulkanError, VulkanResult};
use ash::{vk, Device};

/// Maximum sampler anisotropy when the device supports it
pub const MAX_ANISOTROPY: f32 = 16.0;

/// Access masks and pipeline stages for a supported layout transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionMasks {
    /// Access that must complete before the transition
    pub src_access: vk::AccessFlags,
    /// Access that waits for the transition
    pub dst_access: vk::AccessFlags,
    /// Stage producing `src_access`
    pub src_stage: vk::PipelineStageFlags,
    /// Stage consuming `dst_access`
    pub dst_stage: vk::PipelineStageFlags,
}

/// Barrier masks for the two transitions a texture upload needs
pub fn layout_transition_masks(old: vk::ImageLayout, new: vk::ImageLayout) -> VulkanResult<TransitionMasks> {
    match (old, new) {
        (vk::ImageLayout::UNDEFINED, vk::ImageLayout::TRANSFER_DST_OPTIMAL) => Ok(TransitionMasks {
            src_access: vk::AccessFlags::empty(),
            dst_access: vk::AccessFlags::TRANSFER_WRITE,
            src_stage: vk::PipelineStageFlags::TOP_OF_PIPE,
            dst_stage: vk::PipelineStageFlags::TRANSFER,
        }),
        (vk::ImageLayout::TRANSFER_DST_OPTIMAL, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL) => {
            Ok(TransitionMasks {
                src_access: vk::AccessFlags::TRANSFER_WRITE,
                dst_access: vk::AccessFlags::SHADER_READ,
                src_stage: vk::PipelineStageFlags::TRANSFER,
                dst_stage: vk::PipelineStageFlags::FRAGMENT_SHADER,
            })
        }
        _ => Err(VulkanError::UnsupportedLayoutTransition { old, new }),
    }
}

const COLOR_RANGE: vk::ImageSubresourceRange = vk::ImageSubresourceRange {
    aspect_mask: vk::ImageAspectFlags::COLOR,
    base_mip_level: 0,
    level_count: 1,
    base_array_layer: 0,
    layer_count: 1,
};

/// Texture resources; all four handles are released on drop
pub struct Texture {
    device: Device,
    image: vk::Image,
    memory: vk::DeviceMemory,
    image_view: vk::ImageView,
    sampler: vk::Sampler,
    extent: vk::Extent2D,
}

impl Texture {
    /// Format used for every texture
    pub const FORMAT: vk::Format = vk::Format::R8G8B8A8_UNORM;

    /// Upload RGBA pixels and create the view and sampler
    pub fn from_image_data(
        device: &Device,
        memory_properties: &vk::PhysicalDeviceMemoryProperties,
        command_pool: &CommandPool,
        queue: vk::Queue,
        image_data: &ImageData,
        anisotropy_enabled: bool,
    ) -> VulkanResult<Self> {
        image_data.validate()?;
        let extent = vk::Extent2D {
            width: image_data.width,
            height: image_data.height,
        };

        let staging = Buffer::staging(device.clone(), memory_properties, image_data.data.len() as vk::DeviceSize)?;
        staging.write_data(&image_data.data)?;

        let image_info = vk::ImageCreateInfo::builder()
            .image_type(vk::ImageType::TYPE_2D)
            .extent(vk::Extent3D {
                width: extent.width,
                height: extent.height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .format(Self::FORMAT)
            .tiling(vk::ImageTiling::OPTIMAL)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .usage(vk::ImageUsageFlags::TRANSFER_DST | vk::ImageUsageFlags::SAMPLED)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .samples(vk::SampleCountFlags::TYPE_1);

        let image = unsafe { device.create_image(&image_info, None) }.map_err(VulkanError::Api)?;

        let requirements = unsafe { device.get_image_memory_requirements(image) };
        let memory = find_memory_type(
            memory_properties,
            requirements.memory_type_bits,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
        )
        .and_then(|memory_type_index| {
            let alloc_info = vk::MemoryAllocateInfo::builder()
                .allocation_size(requirements.size)
                .memory_type_index(memory_type_index);
            unsafe { device.allocate_memory(&alloc_info, None) }.map_err(VulkanError::Api)
        });
        let memory = match memory {
            Ok(memory) => memory,
            Err(err) => {
                unsafe { device.destroy_image(image, None) };
                return Err(err);
            }
        };

        // Null view and sampler are ignored by the destroy calls in Drop.
        let mut texture = Self {
            device: device.clone(),
            image,
            memory,
            image_view: vk::ImageView::null(),
            sampler: vk::Sampler::null(),
            extent,
        };

        unsafe { device.bind_image_memory(image, memory, 0) }.map_err(VulkanError::Api)?;

        command_pool.one_time_submit(queue, |recorder| {
            let to_transfer = transition_barrier(
                image,
                vk::ImageLayout::UNDEFINED,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            )?;
            recorder.cmd_image_barrier(to_transfer.0.src_stage, to_transfer.0.dst_stage, to_transfer.1)?;

            recorder.cmd_copy_buffer_to_image(staging.handle(), image, extent.width, extent.height)?;

            let to_shader = transition_barrier(
                image,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            )?;
            recorder.cmd_image_barrier(to_shader.0.src_stage, to_shader.0.dst_stage, to_shader.1)
        })?;

        let view_info = vk::ImageViewCreateInfo::builder()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(Self::FORMAT)
            .subresource_range(COLOR_RANGE);
        texture.image_view = unsafe { device.create_image_view(&view_info, None) }.map_err(VulkanError::Api)?;

        let sampler_info = vk::SamplerCreateInfo::builder()
            .mag_filter(vk::Filter::LINEAR)
            .min_filter(vk::Filter::LINEAR)
            .address_mode_u(vk::SamplerAddressMode::REPEAT)
            .address_mode_v(vk::SamplerAddressMode::REPEAT)
            .address_mode_w(vk::SamplerAddressMode::REPEAT)
            .anisotropy_enable(anisotropy_enabled)
            .max_anisotropy(if anisotropy_enabled { MAX_ANISOTROPY } else { 1.0 })
            .border_color(vk::BorderColor::INT_OPAQUE_BLACK)
            .unnormalized_coordinates(false)
            .compare_enable(false)
            .compare_op(vk::CompareOp::ALWAYS)
            .mipmap_mode(vk::SamplerMipmapMode::LINEAR)
            .min_lod(0.0)
            .max_lod(0.0);
        texture.sampler = unsafe { device.create_sampler(&sampler_info, None) }.map_err(VulkanError::Api)?;

        log::debug!("Uploaded {}x{} texture", extent.width, extent.height);

        Ok(texture)
    }

    /// Descriptor info for a combined image sampler
    pub fn descriptor_info(&self) -> vk::DescriptorImageInfo {
        vk::DescriptorImageInfo {
            sampler: self.sampler,
            image_view: self.image_view,
            image_layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        }
    }

    /// Texture size in pixels
    pub const fn extent(&self) -> vk::Extent2D {
        self.extent
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_sampler(self.sampler, None);
            self.device.destroy_image_view(self.image_view, None);
            self.device.destroy_image(self.image, None);
            self.device.free_memory(self.memory, None);
        }
    }
}

fn transition_barrier(
    image: vk::Image,
    old: vk::ImageLayout,
    new: vk::ImageLayout,
) -> VulkanResult<(TransitionMasks, vk::ImageMemoryBarrier)> {
    let masks = layout_transition_masks(old, new)?;
    let barrier = vk::ImageMemoryBarrier::builder()
        .old_layout(old)
        .new_layout(new)
        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .image(image)
        .subresource_range(COLOR_RANGE)
        .src_access_mask(masks.src_access)
        .dst_access_mask(masks.dst_access)
        .build();
    Ok((masks, barrier))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_transition() {
        let masks =
            layout_transition_masks(vk::ImageLayout::UNDEFINED, vk::ImageLayout::TRANSFER_DST_OPTIMAL).unwrap();
        assert_eq!(masks.src_access, vk::AccessFlags::empty());
        assert_eq!(masks.dst_access, vk::AccessFlags::TRANSFER_WRITE);
        assert_eq!(masks.src_stage, vk::PipelineStageFlags::TOP_OF_PIPE);
        assert_eq!(masks.dst_stage, vk::PipelineStageFlags::TRANSFER);
    }

    #[test]
    fn test_shader_read_transition() {
        let masks = layout_transition_masks(
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        )
        .unwrap();
        assert_eq!(masks.src_access, vk::AccessFlags::TRANSFER_WRITE);
        assert_eq!(masks.dst_access, vk::AccessFlags::SHADER_READ);
        assert_eq!(masks.dst_stage, vk::PipelineStageFlags::FRAGMENT_SHADER);
    }

    #[test]
    fn test_unsupported_transition() {
        let err = layout_transition_masks(
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            vk::ImageLayout::PRESENT_SRC_KHR,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            VulkanError::UnsupportedLayoutTransition {
                old: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                new: vk::ImageLayout::PRESENT_SRC_KHR,
            }
        ));
    }

    #[test]
    fn test_barrier_carries_layouts() {
        let (_, barrier) = transition_barrier(
            vk::Image::null(),
            vk::ImageLayout::UNDEFINED,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        )
        .unwrap();
        assert_eq!(barrier.old_layout, vk::ImageLayout::UNDEFINED);
        assert_eq!(barrier.new_layout, vk::ImageLayout::TRANSFER_DST_OPTIMAL);
        assert_eq!(barrier.src_queue_family_index, vk::QUEUE_FAMILY_IGNORED);
    }
}
