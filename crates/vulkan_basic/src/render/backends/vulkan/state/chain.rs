//! Everything that is rebuilt when the swap chain goes stale
//!
//! Swap chain, image views, render pass, pipeline, framebuffers, one uniform
//! buffer and descriptor set per image, and one pre-recorded command buffer
//! per image. Fields drop in reverse creation order.
//!
//! Each image owns its uniform buffer, so the buffer for an image can be
//! rewritten as soon as the submission that last rendered that image has
//! retired, while other frames are still in flight.

use super::framebuffer::{create_framebuffers, Framebuffer};
use super::swapchain::Swapchain;
use crate::render::backends::vulkan::rendering::{
    CommandBufferSet, CommandPool, GraphicsPipeline, RenderPass, SpirvCode,
};
use crate::render::backends::vulkan::resources::{DescriptorPool, DescriptorSetLayout, UniformBuffer};
use crate::render::backends::vulkan::{VulkanContext, VulkanResult};
use crate::render::uniforms::UniformBufferObject;
use ash::vk;

/// Buffers and texture the recorded draw refers to
#[derive(Debug, Clone, Copy)]
pub struct DrawBindings {
    /// Vertex buffer bound at binding 0
    pub vertex_buffer: vk::Buffer,
    /// 16-bit index buffer
    pub index_buffer: vk::Buffer,
    /// Indices drawn per frame
    pub index_count: u32,
    /// Sampler and view written into every descriptor set
    pub texture: vk::DescriptorImageInfo,
    /// Clear color for the color attachment
    pub clear_color: [f32; 4],
}

/// Shader binaries kept in memory for rebuilds
pub struct ShaderSources<'a> {
    /// Vertex stage
    pub vertex: &'a SpirvCode,
    /// Fragment stage
    pub fragment: &'a SpirvCode,
}

/// Swap-chain-dependent objects
pub struct PresentationChain {
    command_buffers: CommandBufferSet,
    descriptor_pool: DescriptorPool,
    descriptor_sets: Vec<vk::DescriptorSet>,
    uniform_buffers: Vec<UniformBuffer<UniformBufferObject>>,
    framebuffers: Vec<Framebuffer>,
    pipeline: GraphicsPipeline,
    render_pass: RenderPass,
    swapchain: Swapchain,
}

impl PresentationChain {
    /// Build the chain for `window_extent`, retiring `old_swapchain` if set
    pub fn new(
        context: &VulkanContext,
        command_pool: &CommandPool,
        shaders: &ShaderSources<'_>,
        set_layout: &DescriptorSetLayout,
        draw: &DrawBindings,
        window_extent: vk::Extent2D,
        old_swapchain: vk::SwapchainKHR,
    ) -> VulkanResult<Self> {
        let device = context.raw_device();
        let memory_properties = context.physical_device().memory_properties;

        let swapchain = Swapchain::new(
            device.clone(),
            context.swapchain_loader().clone(),
            context.surface(),
            context.surface_loader(),
            context.physical_device(),
            window_extent,
            old_swapchain,
        )?;
        let extent = swapchain.extent();
        let image_count = swapchain.image_count();

        let render_pass = RenderPass::new_present_pass(device.clone(), swapchain.format().format)?;
        let pipeline = GraphicsPipeline::new(
            device.clone(),
            render_pass.handle(),
            shaders.vertex,
            shaders.fragment,
            set_layout.handle(),
            extent,
        )?;
        let framebuffers = create_framebuffers(&device, render_pass.handle(), swapchain.image_views(), extent)?;

        let uniform_buffers = (0..image_count)
            .map(|_| UniformBuffer::new(&device, &memory_properties))
            .collect::<VulkanResult<Vec<_>>>()?;
        let descriptor_pool = DescriptorPool::new(device.clone(), set_layout, image_count)?;
        let descriptor_sets = descriptor_pool.allocate(set_layout, image_count)?;
        for (set, uniform_buffer) in descriptor_sets.iter().zip(&uniform_buffers) {
            descriptor_pool.write_quad_set(*set, uniform_buffer.descriptor_info(), draw.texture);
        }

        let command_buffers = command_pool.allocate(image_count)?;

        let chain = Self {
            command_buffers,
            descriptor_pool,
            descriptor_sets,
            uniform_buffers,
            framebuffers,
            pipeline,
            render_pass,
            swapchain,
        };
        chain.record(draw)?;

        log::debug!(
            "Presentation chain ready: {} images at {}x{}",
            image_count,
            extent.width,
            extent.height
        );

        Ok(chain)
    }

    fn record(&self, draw: &DrawBindings) -> VulkanResult<()> {
        let extent = self.swapchain.extent();
        let clear_values = [vk::ClearValue {
            color: vk::ClearColorValue {
                float32: draw.clear_color,
            },
        }];
        let render_area = vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent,
        };

        for (index, (framebuffer, set)) in self.framebuffers.iter().zip(&self.descriptor_sets).enumerate() {
            let mut recorder = self.command_buffers.recorder(index)?;
            recorder.begin(vk::CommandBufferUsageFlags::SIMULTANEOUS_USE)?;
            {
                let mut pass = recorder.begin_render_pass(
                    self.render_pass.handle(),
                    framebuffer.handle(),
                    render_area,
                    &clear_values,
                )?;
                pass.cmd_bind_pipeline(self.pipeline.handle());
                pass.cmd_bind_vertex_buffers(0, &[draw.vertex_buffer], &[0]);
                pass.cmd_bind_index_buffer(draw.index_buffer, 0, vk::IndexType::UINT16);
                pass.cmd_bind_descriptor_sets(self.pipeline.layout(), &[*set]);
                pass.cmd_draw_indexed(draw.index_count, 1);
            }
            recorder.end()?;
        }
        Ok(())
    }

    /// Swap chain handle
    pub const fn swapchain(&self) -> &Swapchain {
        &self.swapchain
    }

    /// Number of swap chain images
    pub fn image_count(&self) -> u32 {
        self.swapchain.image_count()
    }

    /// Current extent
    pub const fn extent(&self) -> vk::Extent2D {
        self.swapchain.extent()
    }

    /// Pre-recorded command buffer for `image_index`
    pub fn command_buffer(&self, image_index: u32) -> Option<vk::CommandBuffer> {
        self.command_buffers.get(image_index as usize)
    }

    /// Pool the per-image descriptor sets come from
    pub const fn descriptor_pool(&self) -> vk::DescriptorPool {
        self.descriptor_pool.handle()
    }

    /// Uniform buffer read by the command buffer for `image_index`
    pub fn uniform_buffer(&self, image_index: u32) -> Option<&UniformBuffer<UniformBufferObject>> {
        self.uniform_buffers.get(image_index as usize)
    }
}
