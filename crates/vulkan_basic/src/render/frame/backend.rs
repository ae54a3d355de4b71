//! The device-facing half of the presentation loop

use crate::render::backends::vulkan::VulkanResult;
use ash::prelude::VkResult;
use ash::vk;

/// Operations the presenter needs from a device, swap chain and queues
///
/// `slot` selects an entry in the frames-in-flight ring and is always in
/// `0..frames_in_flight()`. Raw `vk::Result` codes are returned so the
/// presenter can tell staleness apart from failure.
pub trait PresentationBackend {
    /// Images in the current swap chain
    fn image_count(&self) -> u32;

    /// Size of the synchronization ring
    fn frames_in_flight(&self) -> usize;

    /// Block until the last submission made through `slot` has retired
    fn wait_for_slot(&mut self, slot: usize) -> VkResult<()>;

    /// Acquire the next image, signaling the slot's "image available"
    /// semaphore; the flag reports a suboptimal swap chain
    fn acquire_next_image(&mut self, slot: usize, timeout: u64) -> VkResult<(u32, bool)>;

    /// Write the per-frame uniforms for `image_index` at the current extent,
    /// then submit its pre-recorded command buffer, waiting on "image
    /// available" and signaling "render finished"
    fn submit(&mut self, slot: usize, image_index: u32) -> VkResult<()>;

    /// Present `image_index` after "render finished"; the flag reports a
    /// suboptimal swap chain
    fn present(&mut self, slot: usize, image_index: u32) -> VkResult<bool>;

    /// Block until the device has no outstanding work
    fn wait_idle(&mut self) -> VkResult<()>;

    /// Destroy and recreate the presentation chain and the ring's
    /// semaphores, optionally for a new window extent; returns the new image
    /// count
    ///
    /// Only called after [`wait_idle`](Self::wait_idle) succeeded. A surface
    /// with zero area must fail with
    /// [`VulkanError::ZeroAreaSurface`](crate::render::backends::vulkan::VulkanError::ZeroAreaSurface)
    /// and leave the current chain in place.
    fn rebuild_swapchain(&mut self, window_extent: Option<vk::Extent2D>) -> VulkanResult<u32>;
}
