//! Command pools, command buffer sets and a typed recorder

use crate::render::backends::vulkan::{VulkanError, VulkanResult};
use ash::{vk, Device};

/// Command pool wrapper with RAII cleanup
pub struct CommandPool {
    device: Device,
    command_pool: vk::CommandPool,
}

impl CommandPool {
    /// Create a command pool for `queue_family_index`
    pub fn new(device: Device, queue_family_index: u32) -> VulkanResult<Self> {
        let pool_create_info = vk::CommandPoolCreateInfo::builder().queue_family_index(queue_family_index);

        let command_pool =
            unsafe { device.create_command_pool(&pool_create_info, None) }.map_err(VulkanError::Api)?;

        Ok(Self { device, command_pool })
    }

    /// Allocate primary command buffers owned by a [`CommandBufferSet`]
    pub fn allocate(&self, count: u32) -> VulkanResult<CommandBufferSet> {
        let alloc_info = vk::CommandBufferAllocateInfo::builder()
            .command_pool(self.command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(count);

        let buffers = unsafe { self.device.allocate_command_buffers(&alloc_info) }.map_err(VulkanError::Api)?;

        Ok(CommandBufferSet {
            device: self.device.clone(),
            pool: self.command_pool,
            buffers,
        })
    }

    /// Get the command pool handle
    pub const fn handle(&self) -> vk::CommandPool {
        self.command_pool
    }

    /// Record a transient command buffer with `record`, submit it to `queue`
    /// and wait for the queue to drain
    pub fn one_time_submit<F>(&self, queue: vk::Queue, record: F) -> VulkanResult<()>
    where
        F: FnOnce(&mut CommandRecorder) -> VulkanResult<()>,
    {
        let set = self.allocate(1)?;
        let command_buffer = set.buffers[0];

        let mut recorder = CommandRecorder::new(command_buffer, self.device.clone());
        recorder.begin(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT)?;
        record(&mut recorder)?;
        let command_buffer = recorder.end()?;

        let command_buffers = [command_buffer];
        let submit_info = vk::SubmitInfo::builder().command_buffers(&command_buffers).build();

        unsafe {
            self.device
                .queue_submit(queue, &[submit_info], vk::Fence::null())
                .map_err(VulkanError::Api)?;
            self.device.queue_wait_idle(queue).map_err(VulkanError::Api)?;
        }
        Ok(())
    }
}

impl Drop for CommandPool {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_command_pool(self.command_pool, None);
        }
    }
}

/// Command buffers freed back to their pool on drop
pub struct CommandBufferSet {
    device: Device,
    pool: vk::CommandPool,
    buffers: Vec<vk::CommandBuffer>,
}

impl CommandBufferSet {
    /// Number of buffers
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Buffer at `index`
    pub fn get(&self, index: usize) -> Option<vk::CommandBuffer> {
        self.buffers.get(index).copied()
    }

    /// All buffers in allocation order
    pub fn handles(&self) -> &[vk::CommandBuffer] {
        &self.buffers
    }

    /// Recorder for the buffer at `index`
    pub fn recorder(&self, index: usize) -> VulkanResult<CommandRecorder> {
        let buffer = self.get(index).ok_or_else(|| VulkanError::InvalidOperation {
            reason: format!("Command buffer {index} out of range ({} allocated)", self.buffers.len()),
        })?;
        Ok(CommandRecorder::new(buffer, self.device.clone()))
    }
}

impl Drop for CommandBufferSet {
    fn drop(&mut self) {
        if self.buffers.is_empty() {
            return;
        }
        unsafe {
            self.device.free_command_buffers(self.pool, &self.buffers);
        }
    }
}

/// Type-safe command buffer recorder
pub struct CommandRecorder {
    command_buffer: vk::CommandBuffer,
    device: Device,
    recording: bool,
}

impl CommandRecorder {
    /// Create a new command recorder
    pub const fn new(command_buffer: vk::CommandBuffer, device: Device) -> Self {
        Self {
            command_buffer,
            device,
            recording: false,
        }
    }

    /// Begin command recording
    pub fn begin(&mut self, flags: vk::CommandBufferUsageFlags) -> VulkanResult<&mut Self> {
        if self.recording {
            return Err(VulkanError::InvalidOperation {
                reason: "Command buffer already recording".to_string(),
            });
        }

        let begin_info = vk::CommandBufferBeginInfo::builder().flags(flags);

        unsafe {
            self.device
                .begin_command_buffer(self.command_buffer, &begin_info)
                .map_err(VulkanError::Api)?;
        }

        self.recording = true;
        Ok(self)
    }

    /// Begin render pass
    pub fn begin_render_pass(
        &mut self,
        render_pass: vk::RenderPass,
        framebuffer: vk::Framebuffer,
        render_area: vk::Rect2D,
        clear_values: &[vk::ClearValue],
    ) -> VulkanResult<ActiveRenderPass<'_>> {
        self.ensure_recording()?;

        let render_pass_begin = vk::RenderPassBeginInfo::builder()
            .render_pass(render_pass)
            .framebuffer(framebuffer)
            .render_area(render_area)
            .clear_values(clear_values);

        unsafe {
            self.device
                .cmd_begin_render_pass(self.command_buffer, &render_pass_begin, vk::SubpassContents::INLINE);
        }

        Ok(ActiveRenderPass { recorder: self })
    }

    /// Copy `size` bytes between buffers
    pub fn cmd_copy_buffer(&mut self, src: vk::Buffer, dst: vk::Buffer, size: vk::DeviceSize) -> VulkanResult<()> {
        self.ensure_recording()?;
        let region = vk::BufferCopy {
            src_offset: 0,
            dst_offset: 0,
            size,
        };
        unsafe {
            self.device.cmd_copy_buffer(self.command_buffer, src, dst, &[region]);
        }
        Ok(())
    }

    /// Copy a tightly packed buffer into a color image
    pub fn cmd_copy_buffer_to_image(
        &mut self,
        src: vk::Buffer,
        image: vk::Image,
        width: u32,
        height: u32,
    ) -> VulkanResult<()> {
        self.ensure_recording()?;
        let region = vk::BufferImageCopy {
            buffer_offset: 0,
            buffer_row_length: 0,
            buffer_image_height: 0,
            image_subresource: vk::ImageSubresourceLayers {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                mip_level: 0,
                base_array_layer: 0,
                layer_count: 1,
            },
            image_offset: vk::Offset3D { x: 0, y: 0, z: 0 },
            image_extent: vk::Extent3D {
                width,
                height,
                depth: 1,
            },
        };
        unsafe {
            self.device.cmd_copy_buffer_to_image(
                self.command_buffer,
                src,
                image,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[region],
            );
        }
        Ok(())
    }

    /// Record a single image memory barrier
    pub fn cmd_image_barrier(
        &mut self,
        src_stage: vk::PipelineStageFlags,
        dst_stage: vk::PipelineStageFlags,
        barrier: vk::ImageMemoryBarrier,
    ) -> VulkanResult<()> {
        self.ensure_recording()?;
        unsafe {
            self.device.cmd_pipeline_barrier(
                self.command_buffer,
                src_stage,
                dst_stage,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[barrier],
            );
        }
        Ok(())
    }

    /// End command recording
    pub fn end(mut self) -> VulkanResult<vk::CommandBuffer> {
        self.ensure_recording()?;

        unsafe {
            self.device
                .end_command_buffer(self.command_buffer)
                .map_err(VulkanError::Api)?;
        }

        self.recording = false;
        Ok(self.command_buffer)
    }

    fn ensure_recording(&self) -> VulkanResult<()> {
        if self.recording {
            Ok(())
        } else {
            Err(VulkanError::InvalidOperation {
                reason: "Command buffer not recording".to_string(),
            })
        }
    }
}

/// Active render pass, ended on drop
pub struct ActiveRenderPass<'a> {
    recorder: &'a mut CommandRecorder,
}

impl ActiveRenderPass<'_> {
    /// Bind graphics pipeline
    pub fn cmd_bind_pipeline(&mut self, pipeline: vk::Pipeline) {
        unsafe {
            self.recorder
                .device
                .cmd_bind_pipeline(self.recorder.command_buffer, vk::PipelineBindPoint::GRAPHICS, pipeline);
        }
    }

    /// Bind vertex buffers
    pub fn cmd_bind_vertex_buffers(&mut self, first_binding: u32, buffers: &[vk::Buffer], offsets: &[vk::DeviceSize]) {
        unsafe {
            self.recorder
                .device
                .cmd_bind_vertex_buffers(self.recorder.command_buffer, first_binding, buffers, offsets);
        }
    }

    /// Bind index buffer
    pub fn cmd_bind_index_buffer(&mut self, buffer: vk::Buffer, offset: vk::DeviceSize, index_type: vk::IndexType) {
        unsafe {
            self.recorder
                .device
                .cmd_bind_index_buffer(self.recorder.command_buffer, buffer, offset, index_type);
        }
    }

    /// Bind descriptor sets at set 0
    pub fn cmd_bind_descriptor_sets(&mut self, layout: vk::PipelineLayout, sets: &[vk::DescriptorSet]) {
        unsafe {
            self.recorder.device.cmd_bind_descriptor_sets(
                self.recorder.command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                layout,
                0,
                sets,
                &[],
            );
        }
    }

    /// Draw indexed
    pub fn cmd_draw_indexed(&mut self, index_count: u32, instance_count: u32) {
        unsafe {
            self.recorder
                .device
                .cmd_draw_indexed(self.recorder.command_buffer, index_count, instance_count, 0, 0, 0);
        }
    }
}

impl Drop for ActiveRenderPass<'_> {
    fn drop(&mut self) {
        unsafe {
            self.recorder.device.cmd_end_render_pass(self.recorder.command_buffer);
        }
    }
}
