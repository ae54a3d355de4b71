//! Vulkan synchronization primitives for GPU/CPU coordination
//!
//! Semaphores order acquire, render and present on the GPU. One fence per
//! ring slot lets the CPU wait until a slot's previous submission retired
//! before its semaphores are reused.

use crate::render::backends::vulkan::{VulkanError, VulkanResult};
use ash::{vk, Device};

/// GPU-GPU synchronization primitive with automatic resource management
pub struct Semaphore {
    device: Device,
    semaphore: vk::Semaphore,
}

impl Semaphore {
    /// Create a new semaphore
    pub fn new(device: Device) -> VulkanResult<Self> {
        let create_info = vk::SemaphoreCreateInfo::builder();

        let semaphore = unsafe { device.create_semaphore(&create_info, None) }.map_err(VulkanError::Api)?;

        Ok(Self { device, semaphore })
    }

    /// Get the semaphore handle
    pub const fn handle(&self) -> vk::Semaphore {
        self.semaphore
    }
}

impl Drop for Semaphore {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_semaphore(self.semaphore, None);
        }
    }
}

/// Fence wrapper with RAII cleanup
pub struct Fence {
    device: Device,
    fence: vk::Fence,
}

impl Fence {
    /// Create a new fence
    pub fn new(device: Device, signaled: bool) -> VulkanResult<Self> {
        let flags = if signaled {
            vk::FenceCreateFlags::SIGNALED
        } else {
            vk::FenceCreateFlags::empty()
        };

        let create_info = vk::FenceCreateInfo::builder().flags(flags);

        let fence = unsafe { device.create_fence(&create_info, None) }.map_err(VulkanError::Api)?;

        Ok(Self { device, fence })
    }

    /// Wait for fence
    pub fn wait(&self, timeout: u64) -> ash::prelude::VkResult<()> {
        unsafe { self.device.wait_for_fences(&[self.fence], true, timeout) }
    }

    /// Reset fence
    pub fn reset(&self) -> ash::prelude::VkResult<()> {
        unsafe { self.device.reset_fences(&[self.fence]) }
    }

    /// Get the fence handle
    pub const fn handle(&self) -> vk::Fence {
        self.fence
    }
}

impl Drop for Fence {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_fence(self.fence, None);
        }
    }
}

/// Frame synchronization objects for one ring slot
pub struct FrameSync {
    /// Signaled by acquire, waited on by submit
    pub image_available: Semaphore,
    /// Signaled by submit, waited on by present
    pub render_finished: Semaphore,
    /// Signaled when the slot's submission retires; created signaled
    pub in_flight: Fence,
}

impl FrameSync {
    /// Create frame synchronization objects
    pub fn new(device: Device) -> VulkanResult<Self> {
        let image_available = Semaphore::new(device.clone())?;
        let render_finished = Semaphore::new(device.clone())?;
        let in_flight = Fence::new(device, true)?;

        Ok(Self {
            image_available,
            render_finished,
            in_flight,
        })
    }
}

/// Which ring slot's fence guards each swap chain image
///
/// An image can be acquired again while the slot that last rendered to it is
/// still executing; the new submission must wait for that slot first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageOwnership {
    owners: Vec<Option<usize>>,
}

impl ImageOwnership {
    /// Table for `image_count` images with no owners
    pub fn new(image_count: u32) -> Self {
        Self {
            owners: vec![None; image_count as usize],
        }
    }

    /// Record `slot` as the owner of `image_index`, returning the previous
    /// owner when it was a different slot
    pub fn claim(&mut self, image_index: u32, slot: usize) -> Option<usize> {
        let entry = self.owners.get_mut(image_index as usize)?;
        let previous = entry.replace(slot);
        previous.filter(|&owner| owner != slot)
    }

    /// Owner of `image_index`
    pub fn owner(&self, image_index: u32) -> Option<usize> {
        self.owners.get(image_index as usize).copied().flatten()
    }

    /// Number of tracked images
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    /// Whether no images are tracked
    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}

/// Ring of per-frame synchronization objects
pub struct FrameSyncRing {
    frames: Vec<FrameSync>,
    images: ImageOwnership,
}

impl FrameSyncRing {
    /// Create `frames_in_flight` slots for a swap chain of `image_count` images
    pub fn new(device: &Device, frames_in_flight: usize, image_count: u32) -> VulkanResult<Self> {
        if frames_in_flight == 0 {
            return Err(VulkanError::InvalidOperation {
                reason: "Frames in flight must be at least 1".to_string(),
            });
        }

        let frames = (0..frames_in_flight)
            .map(|_| FrameSync::new(device.clone()))
            .collect::<VulkanResult<Vec<_>>>()?;

        log::debug!("Created {} frame sync slots", frames.len());

        Ok(Self {
            frames,
            images: ImageOwnership::new(image_count),
        })
    }

    /// Number of slots
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether the ring has no slots
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Synchronization objects for `slot`
    pub fn frame(&self, slot: usize) -> Option<&FrameSync> {
        self.frames.get(slot)
    }

    /// Wait for the slot's previous submission to retire
    pub fn wait(&self, slot: usize) -> ash::prelude::VkResult<()> {
        self.frames
            .get(slot)
            .ok_or(vk::Result::ERROR_UNKNOWN)?
            .in_flight
            .wait(u64::MAX)
    }

    /// Make `slot` the owner of `image_index`, first waiting for any other
    /// slot still rendering to that image
    pub fn claim_image(&mut self, slot: usize, image_index: u32) -> ash::prelude::VkResult<()> {
        if let Some(previous) = self.images.claim(image_index, slot) {
            if let Some(frame) = self.frames.get(previous) {
                frame.in_flight.wait(u64::MAX)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_claim_has_no_previous_owner() {
        let mut images = ImageOwnership::new(3);
        assert_eq!(images.len(), 3);
        assert!(!images.is_empty());
        assert_eq!(images.claim(0, 0), None);
        assert_eq!(images.owner(0), Some(0));
        assert_eq!(images.owner(1), None);
    }

    #[test]
    fn test_claim_by_other_slot_reports_owner() {
        let mut images = ImageOwnership::new(2);
        images.claim(1, 0);
        assert_eq!(images.claim(1, 1), Some(0));
        assert_eq!(images.owner(1), Some(1));
    }

    #[test]
    fn test_reclaim_by_same_slot() {
        let mut images = ImageOwnership::new(2);
        images.claim(0, 1);
        assert_eq!(images.claim(0, 1), None);
    }

    #[test]
    fn test_out_of_range_claim_is_ignored() {
        let mut images = ImageOwnership::new(2);
        assert_eq!(images.claim(5, 0), None);
        assert_eq!(images.owner(5), None);
    }
}
