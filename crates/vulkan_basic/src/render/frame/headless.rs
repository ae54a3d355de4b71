//! Deterministic backend with no GPU behind it
//!
//! Models what the presenter can observe of a real device: a swap chain sized
//! by the same selection rules as the Vulkan backend, per-slot semaphores
//! that must be signaled and waited in order, and a presentation chain whose
//! objects are counted on creation and destruction. Acquire, submit and
//! present results can be scripted to inject staleness or failures. Each
//! submit records the extent its uniforms were computed for.

use super::backend::PresentationBackend;
use crate::render::backends::vulkan::state::swapchain::{choose_extent, choose_image_count};
use crate::render::backends::vulkan::{VulkanError, VulkanResult};
use ash::prelude::VkResult;
use ash::vk;
use std::collections::VecDeque;

/// Stages of a presentation chain rebuild, in the order they happen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildStep {
    /// Device idle wait before anything is destroyed
    WaitIdle,
    /// Old chain released
    DestroyChain,
    /// Swap chain created
    CreateSwapchain,
    /// One view per swap chain image
    CreateImageViews,
    /// Render pass for the new surface format
    CreateRenderPass,
    /// Pipeline sized to the new extent
    CreatePipeline,
    /// One framebuffer per image view
    CreateFramebuffers,
    /// One uniform buffer and descriptor set per image
    CreateUniformBuffers,
    /// One command buffer per framebuffer
    RecordCommandBuffers,
}

/// Sizes of the per-image collections
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceCounts {
    /// Swap chain images
    pub images: usize,
    /// Image views
    pub image_views: usize,
    /// Framebuffers
    pub framebuffers: usize,
    /// Per-image uniform buffers
    pub uniform_buffers: usize,
    /// Recorded command buffers
    pub command_buffers: usize,
}

impl ResourceCounts {
    /// Whether every collection has the same length
    pub const fn is_consistent(&self) -> bool {
        self.images == self.image_views
            && self.image_views == self.framebuffers
            && self.framebuffers == self.uniform_buffers
            && self.uniform_buffers == self.command_buffers
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct SlotSync {
    image_available: bool,
    render_finished: bool,
    in_flight: bool,
}

/// Headless [`PresentationBackend`]
#[derive(Debug)]
pub struct HeadlessBackend {
    capabilities: vk::SurfaceCapabilitiesKHR,
    window_extent: vk::Extent2D,
    extent: vk::Extent2D,
    image_count: u32,
    next_image: u32,
    slots: Vec<SlotSync>,
    counts: ResourceCounts,
    acquire_script: VecDeque<VkResult<(u32, bool)>>,
    submit_script: VecDeque<VkResult<()>>,
    present_script: VecDeque<VkResult<bool>>,
    submissions: Vec<u32>,
    submitted_extents: Vec<vk::Extent2D>,
    steps: Vec<RebuildStep>,
    present_calls: u64,
    idle_waits: u64,
    slot_waits: u64,
    validation_errors: u64,
    created_objects: u64,
    destroyed_objects: u64,
}

impl HeadlessBackend {
    /// Build a backend and its initial presentation chain
    ///
    /// Fails if `window_extent` and `capabilities` yield a zero-area swap chain.
    pub fn new(
        capabilities: vk::SurfaceCapabilitiesKHR,
        window_extent: vk::Extent2D,
        frames_in_flight: usize,
    ) -> VulkanResult<Self> {
        let mut backend = Self {
            capabilities,
            window_extent,
            extent: vk::Extent2D::default(),
            image_count: 0,
            next_image: 0,
            slots: vec![SlotSync::default(); frames_in_flight.max(1)],
            counts: ResourceCounts::default(),
            acquire_script: VecDeque::new(),
            submit_script: VecDeque::new(),
            present_script: VecDeque::new(),
            submissions: Vec::new(),
            submitted_extents: Vec::new(),
            steps: Vec::new(),
            present_calls: 0,
            idle_waits: 0,
            slot_waits: 0,
            validation_errors: 0,
            created_objects: 0,
            destroyed_objects: 0,
        };
        backend.build_chain()?;
        Ok(backend)
    }

    /// Surface capabilities with the given image count limits and current
    /// extent; pass a width of `u32::MAX` to let the window decide
    pub fn capabilities(
        min_image_count: u32,
        max_image_count: u32,
        current_extent: vk::Extent2D,
    ) -> vk::SurfaceCapabilitiesKHR {
        vk::SurfaceCapabilitiesKHR {
            min_image_count,
            max_image_count,
            current_extent,
            min_image_extent: vk::Extent2D { width: 1, height: 1 },
            max_image_extent: vk::Extent2D { width: 4096, height: 4096 },
            max_image_array_layers: 1,
            ..Default::default()
        }
    }

    /// Queue the result of a future acquire
    pub fn script_acquire(&mut self, result: VkResult<(u32, bool)>) {
        self.acquire_script.push_back(result);
    }

    /// Queue the result of a future submit
    pub fn script_submit(&mut self, result: VkResult<()>) {
        self.submit_script.push_back(result);
    }

    /// Queue the result of a future present
    pub fn script_present(&mut self, result: VkResult<bool>) {
        self.present_script.push_back(result);
    }

    /// Change the surface as a window resize would
    pub fn resize_surface(&mut self, extent: vk::Extent2D) {
        self.window_extent = extent;
        if self.capabilities.current_extent.width != u32::MAX {
            self.capabilities.current_extent = extent;
        }
    }

    /// Replace the surface capabilities
    pub fn set_capabilities(&mut self, capabilities: vk::SurfaceCapabilitiesKHR) {
        self.capabilities = capabilities;
    }

    /// Extent of the current swap chain
    pub const fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    /// Per-image collection sizes
    pub const fn resource_counts(&self) -> ResourceCounts {
        self.counts
    }

    /// Objects created and not yet destroyed
    pub const fn live_objects(&self) -> u64 {
        self.created_objects - self.destroyed_objects
    }

    /// Objects a chain of `image_count` images owns: swap chain, render pass,
    /// pipeline, descriptor pool, plus a view, framebuffer, uniform buffer and
    /// command buffer per image
    pub const fn chain_object_count(image_count: u32) -> u64 {
        4 + 4 * image_count as u64
    }

    /// Image indices submitted so far, in order
    pub fn submissions(&self) -> &[u32] {
        &self.submissions
    }

    /// Swap chain extent at each submission, in order
    pub fn submitted_extents(&self) -> &[vk::Extent2D] {
        &self.submitted_extents
    }

    /// Rebuild stages recorded so far
    pub fn steps(&self) -> &[RebuildStep] {
        &self.steps
    }

    /// Forget recorded rebuild stages
    pub fn clear_steps(&mut self) {
        self.steps.clear();
    }

    /// Present calls made, whatever their result
    pub const fn present_calls(&self) -> u64 {
        self.present_calls
    }

    /// Device idle waits made
    pub const fn idle_waits(&self) -> u64 {
        self.idle_waits
    }

    /// Slot fence waits made
    pub const fn slot_waits(&self) -> u64 {
        self.slot_waits
    }

    /// Semaphore misuse detected
    pub const fn validation_errors(&self) -> u64 {
        self.validation_errors
    }

    /// Whether any semaphore in the ring is currently signaled
    pub fn any_semaphore_signaled(&self) -> bool {
        self.slots.iter().any(|s| s.image_available || s.render_finished)
    }

    fn validation_failed(&mut self, what: &str) -> vk::Result {
        log::error!("Headless validation: {}", what);
        self.validation_errors += 1;
        vk::Result::ERROR_VALIDATION_FAILED_EXT
    }

    fn destroy_chain(&mut self) {
        self.steps.push(RebuildStep::DestroyChain);
        self.destroyed_objects += Self::chain_object_count(self.image_count);
        self.counts = ResourceCounts::default();
        self.image_count = 0;
    }

    fn surface_extent(&self) -> VulkanResult<vk::Extent2D> {
        let extent = choose_extent(&self.capabilities, self.window_extent);
        if extent.width == 0 || extent.height == 0 {
            return Err(VulkanError::ZeroAreaSurface {
                width: extent.width,
                height: extent.height,
            });
        }
        Ok(extent)
    }

    fn build_chain(&mut self) -> VulkanResult<u32> {
        let extent = self.surface_extent()?;
        let image_count = choose_image_count(&self.capabilities);
        let per_image = image_count as usize;

        self.steps.push(RebuildStep::CreateSwapchain);
        self.counts.images = per_image;
        self.steps.push(RebuildStep::CreateImageViews);
        self.counts.image_views = per_image;
        self.steps.push(RebuildStep::CreateRenderPass);
        self.steps.push(RebuildStep::CreatePipeline);
        self.steps.push(RebuildStep::CreateFramebuffers);
        self.counts.framebuffers = per_image;
        self.steps.push(RebuildStep::CreateUniformBuffers);
        self.counts.uniform_buffers = per_image;
        self.steps.push(RebuildStep::RecordCommandBuffers);
        self.counts.command_buffers = per_image;

        self.created_objects += Self::chain_object_count(image_count);
        self.extent = extent;
        self.image_count = image_count;
        self.next_image = 0;
        Ok(image_count)
    }
}

impl PresentationBackend for HeadlessBackend {
    fn image_count(&self) -> u32 {
        self.image_count
    }

    fn frames_in_flight(&self) -> usize {
        self.slots.len()
    }

    fn wait_for_slot(&mut self, slot: usize) -> VkResult<()> {
        self.slot_waits += 1;
        // Work completes instantly, so the fence is always reached.
        self.slots[slot].in_flight = false;
        Ok(())
    }

    fn acquire_next_image(&mut self, slot: usize, _timeout: u64) -> VkResult<(u32, bool)> {
        if self.slots[slot].image_available {
            return Err(self.validation_failed("acquire signals an already signaled semaphore"));
        }

        let (image_index, suboptimal) = match self.acquire_script.pop_front() {
            Some(result) => result?,
            None => {
                let index = self.next_image;
                self.next_image = (self.next_image + 1) % self.image_count.max(1);
                (index, false)
            }
        };

        self.slots[slot].image_available = true;
        Ok((image_index, suboptimal))
    }

    fn submit(&mut self, slot: usize, image_index: u32) -> VkResult<()> {
        if let Some(result) = self.submit_script.pop_front() {
            result?;
        }
        if image_index >= self.image_count {
            return Err(self.validation_failed("submit for an image outside the swap chain"));
        }
        if !self.slots[slot].image_available {
            return Err(self.validation_failed("submit waits on an unsignaled semaphore"));
        }
        if self.slots[slot].in_flight {
            return Err(self.validation_failed("submit reuses a slot whose fence was not waited"));
        }

        let sync = &mut self.slots[slot];
        sync.image_available = false;
        sync.render_finished = true;
        sync.in_flight = true;
        self.submissions.push(image_index);
        self.submitted_extents.push(self.extent);
        Ok(())
    }

    fn present(&mut self, slot: usize, _image_index: u32) -> VkResult<bool> {
        self.present_calls += 1;
        if !self.slots[slot].render_finished {
            return Err(self.validation_failed("present waits on an unsignaled semaphore"));
        }
        self.slots[slot].render_finished = false;

        self.present_script.pop_front().unwrap_or(Ok(false))
    }

    fn wait_idle(&mut self) -> VkResult<()> {
        self.idle_waits += 1;
        self.steps.push(RebuildStep::WaitIdle);
        for sync in &mut self.slots {
            sync.in_flight = false;
        }
        Ok(())
    }

    fn rebuild_swapchain(&mut self, window_extent: Option<vk::Extent2D>) -> VulkanResult<u32> {
        if let Some(extent) = window_extent {
            self.resize_surface(extent);
        }
        // A zero-area surface keeps the current chain, as swap chain creation
        // fails before anything is retired.
        self.surface_extent()?;
        self.destroy_chain();
        // Semaphores left signaled by an abandoned frame are recreated unsignaled.
        self.slots.fill(SlotSync::default());
        self.build_chain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> HeadlessBackend {
        HeadlessBackend::new(
            HeadlessBackend::capabilities(2, 0, vk::Extent2D { width: 640, height: 480 }),
            vk::Extent2D { width: 640, height: 480 },
            1,
        )
        .unwrap()
    }

    #[test]
    fn test_initial_chain() {
        let backend = backend();
        assert_eq!(backend.image_count(), 3);
        assert!(backend.resource_counts().is_consistent());
        assert_eq!(backend.live_objects(), HeadlessBackend::chain_object_count(3));
    }

    #[test]
    fn test_double_acquire_is_a_validation_error() {
        let mut backend = backend();
        backend.acquire_next_image(0, u64::MAX).unwrap();
        assert_eq!(
            backend.acquire_next_image(0, u64::MAX),
            Err(vk::Result::ERROR_VALIDATION_FAILED_EXT)
        );
        assert_eq!(backend.validation_errors(), 1);
    }

    #[test]
    fn test_submit_without_fence_wait_is_a_validation_error() {
        let mut backend = backend();
        let (index, _) = backend.acquire_next_image(0, u64::MAX).unwrap();
        backend.submit(0, index).unwrap();
        backend.present(0, index).unwrap();

        let (index, _) = backend.acquire_next_image(0, u64::MAX).unwrap();
        assert!(backend.submit(0, index).is_err());

        backend.wait_for_slot(0).unwrap();
        assert!(backend.submit(0, index).is_ok());
    }

    #[test]
    fn test_window_sized_surface_follows_resize() {
        let mut backend = HeadlessBackend::new(
            HeadlessBackend::capabilities(2, 3, vk::Extent2D { width: u32::MAX, height: u32::MAX }),
            vk::Extent2D { width: 300, height: 200 },
            2,
        )
        .unwrap();
        assert_eq!(backend.extent(), vk::Extent2D { width: 300, height: 200 });

        backend
            .rebuild_swapchain(Some(vk::Extent2D { width: 5000, height: 100 }))
            .unwrap();
        assert_eq!(backend.extent(), vk::Extent2D { width: 4096, height: 100 });
    }

    #[test]
    fn test_zero_area_rebuild_fails() {
        let mut backend = backend();
        let result = backend.rebuild_swapchain(Some(vk::Extent2D { width: 0, height: 480 }));
        assert!(matches!(
            result,
            Err(VulkanError::ZeroAreaSurface { width: 0, height: 480 })
        ));
        assert_eq!(backend.image_count(), 3);
        assert!(backend.resource_counts().is_consistent());
        assert_eq!(backend.live_objects(), HeadlessBackend::chain_object_count(3));
    }
}
