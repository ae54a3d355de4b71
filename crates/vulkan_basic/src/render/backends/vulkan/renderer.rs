//! Vulkan renderer for the textured quad
//!
//! Owns every Vulkan object and implements [`PresentationBackend`] so a
//! [`FramePresenter`](crate::render::frame::FramePresenter) can drive it.
//! Transforms are written into the acquired image's uniform buffer at submit
//! time, so they always match the swap chain being drawn to.

use super::initialization::{VulkanContext, Window};
use super::rendering::{CommandPool, SpirvCode};
use super::resources::{quad_layout_builder, DescriptorSetLayout, DeviceLocalBuffer, Texture};
use super::state::chain::{DrawBindings, ShaderSources};
use super::state::{FrameSyncRing, PresentationChain};
use super::VulkanResult;
use crate::assets::ImageData;
use crate::core::config::ApplicationConfig;
use crate::render::frame::PresentationBackend;
use crate::render::mesh::{QUAD_INDICES, QUAD_VERTICES};
use crate::render::uniforms::UniformBufferObject;
use ash::prelude::VkResult;
use ash::vk;

/// Renders one textured, spinning quad
pub struct VulkanRenderer {
    // Fields drop in declaration order, dependents first.
    sync: FrameSyncRing,
    chain: PresentationChain,
    index_buffer: DeviceLocalBuffer,
    vertex_buffer: DeviceLocalBuffer,
    texture: Texture,
    descriptor_set_layout: DescriptorSetLayout,
    command_pool: CommandPool,
    vertex_shader: SpirvCode,
    fragment_shader: SpirvCode,
    clear_color: [f32; 4],
    elapsed_seconds: f32,
    window_extent: vk::Extent2D,
    context: VulkanContext,
}

impl VulkanRenderer {
    /// Create every Vulkan object needed to draw into `window`
    pub fn new(window: &Window, config: &ApplicationConfig) -> VulkanResult<Self> {
        log::info!("Initializing Vulkan renderer");

        let context = VulkanContext::new(window, &config.renderer)?;
        let device = context.raw_device();
        let memory_properties = context.physical_device().memory_properties;
        let graphics_queue = context.graphics_queue();

        let vertex_shader = SpirvCode::from_file(&config.renderer.shaders.vertex_shader_path)?;
        let fragment_shader = SpirvCode::from_file(&config.renderer.shaders.fragment_shader_path)?;

        let descriptor_set_layout = quad_layout_builder().build(&device)?;
        let command_pool = CommandPool::new(device.clone(), context.queue_families().graphics)?;

        let image = ImageData::from_file(&config.assets.texture_path)?;
        let texture = Texture::from_image_data(
            &device,
            &memory_properties,
            &command_pool,
            graphics_queue,
            &image,
            context.device().anisotropy_enabled,
        )?;

        let vertex_buffer = DeviceLocalBuffer::with_data(
            &device,
            &memory_properties,
            &command_pool,
            graphics_queue,
            vk::BufferUsageFlags::VERTEX_BUFFER,
            &QUAD_VERTICES,
        )?;
        let index_buffer = DeviceLocalBuffer::with_data(
            &device,
            &memory_properties,
            &command_pool,
            graphics_queue,
            vk::BufferUsageFlags::INDEX_BUFFER,
            &QUAD_INDICES,
        )?;
        let clear_color = config.renderer.clear_color;
        let draw = draw_bindings(&vertex_buffer, &index_buffer, &texture, clear_color);

        let window_extent = window.framebuffer_extent();
        let chain = PresentationChain::new(
            &context,
            &command_pool,
            &ShaderSources {
                vertex: &vertex_shader,
                fragment: &fragment_shader,
            },
            &descriptor_set_layout,
            &draw,
            window_extent,
            vk::SwapchainKHR::null(),
        )?;

        let sync = FrameSyncRing::new(&device, config.renderer.frames_in_flight, chain.image_count())?;

        let renderer = Self {
            sync,
            chain,
            index_buffer,
            vertex_buffer,
            texture,
            descriptor_set_layout,
            command_pool,
            vertex_shader,
            fragment_shader,
            clear_color,
            elapsed_seconds: 0.0,
            window_extent,
            context,
        };

        log::info!(
            "Vulkan renderer ready ({} images, {} frame(s) in flight)",
            renderer.chain.image_count(),
            renderer.sync.len()
        );

        Ok(renderer)
    }

    /// Set the animation time used for frames submitted from now on
    pub fn set_animation_time(&mut self, elapsed_seconds: f32) {
        self.elapsed_seconds = elapsed_seconds;
    }

    /// Current swap chain extent
    pub const fn extent(&self) -> vk::Extent2D {
        self.chain.extent()
    }

    /// Texture size in pixels
    pub const fn texture_extent(&self) -> vk::Extent2D {
        self.texture.extent()
    }

    /// Block until the device is idle
    pub fn wait_idle(&self) -> VulkanResult<()> {
        self.context.wait_idle()
    }

    /// Whether validation output is routed to the log
    pub const fn validation_enabled(&self) -> bool {
        self.context.validation_enabled()
    }
}

impl PresentationBackend for VulkanRenderer {
    fn image_count(&self) -> u32 {
        self.chain.image_count()
    }

    fn frames_in_flight(&self) -> usize {
        self.sync.len()
    }

    fn wait_for_slot(&mut self, slot: usize) -> VkResult<()> {
        self.sync.wait(slot)
    }

    fn acquire_next_image(&mut self, slot: usize, timeout: u64) -> VkResult<(u32, bool)> {
        let frame = self.sync.frame(slot).ok_or(vk::Result::ERROR_UNKNOWN)?;
        unsafe {
            self.context.swapchain_loader().acquire_next_image(
                self.chain.swapchain().handle(),
                timeout,
                frame.image_available.handle(),
                vk::Fence::null(),
            )
        }
    }

    fn submit(&mut self, slot: usize, image_index: u32) -> VkResult<()> {
        let command_buffer = self
            .chain
            .command_buffer(image_index)
            .ok_or(vk::Result::ERROR_UNKNOWN)?;
        self.sync.claim_image(slot, image_index)?;

        // No retired-or-pending submission reads this image's buffer any more.
        let extent = self.chain.extent();
        let ubo = UniformBufferObject::spinning_quad(self.elapsed_seconds, extent.width, extent.height);
        self.chain
            .uniform_buffer(image_index)
            .ok_or(vk::Result::ERROR_UNKNOWN)?
            .update(&ubo);

        let frame = self.sync.frame(slot).ok_or(vk::Result::ERROR_UNKNOWN)?;
        let wait_semaphores = [frame.image_available.handle()];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let command_buffers = [command_buffer];
        let signal_semaphores = [frame.render_finished.handle()];

        let submit_info = vk::SubmitInfo::builder()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores)
            .build();

        // Reset only once a submission is certain to signal the fence again.
        frame.in_flight.reset()?;
        unsafe {
            self.context.device().device.queue_submit(
                self.context.graphics_queue(),
                &[submit_info],
                frame.in_flight.handle(),
            )
        }
    }

    fn present(&mut self, slot: usize, image_index: u32) -> VkResult<bool> {
        let frame = self.sync.frame(slot).ok_or(vk::Result::ERROR_UNKNOWN)?;
        let wait_semaphores = [frame.render_finished.handle()];
        let swapchains = [self.chain.swapchain().handle()];
        let image_indices = [image_index];

        let present_info = vk::PresentInfoKHR::builder()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        unsafe {
            self.context
                .swapchain_loader()
                .queue_present(self.context.present_queue(), &present_info)
        }
    }

    fn wait_idle(&mut self) -> VkResult<()> {
        unsafe { self.context.device().device.device_wait_idle() }
    }

    fn rebuild_swapchain(&mut self, window_extent: Option<vk::Extent2D>) -> VulkanResult<u32> {
        if let Some(extent) = window_extent {
            self.window_extent = extent;
        }

        let chain = PresentationChain::new(
            &self.context,
            &self.command_pool,
            &ShaderSources {
                vertex: &self.vertex_shader,
                fragment: &self.fragment_shader,
            },
            &self.descriptor_set_layout,
            &draw_bindings(&self.vertex_buffer, &self.index_buffer, &self.texture, self.clear_color),
            self.window_extent,
            self.chain.swapchain().handle(),
        )?;
        // The retired chain is destroyed here, after its successor exists.
        self.chain = chain;

        let image_count = self.chain.image_count();
        // An abandoned frame can leave a semaphore signaled; the device is idle,
        // so the whole ring is replaced.
        self.sync = FrameSyncRing::new(&self.context.raw_device(), self.sync.len(), image_count)?;

        let extent = self.chain.extent();
        log::debug!(
            "Swap chain rebuilt at {}x{} with {} images",
            extent.width,
            extent.height,
            image_count
        );
        Ok(image_count)
    }
}

fn draw_bindings(
    vertex_buffer: &DeviceLocalBuffer,
    index_buffer: &DeviceLocalBuffer,
    texture: &Texture,
    clear_color: [f32; 4],
) -> DrawBindings {
    DrawBindings {
        vertex_buffer: vertex_buffer.handle(),
        index_buffer: index_buffer.handle(),
        index_count: index_buffer.element_count(),
        texture: texture.descriptor_info(),
        clear_color,
    }
}

impl Drop for VulkanRenderer {
    fn drop(&mut self) {
        if let Err(e) = self.context.wait_idle() {
            log::error!("Device wait failed during renderer shutdown: {}", e);
        }
        log::debug!("Destroying Vulkan renderer");
    }
}
