//! Frame loop errors

use super::state::FrameState;
use crate::render::backends::vulkan::VulkanError;
use ash::vk;
use thiserror::Error;

/// Errors raised while driving a frame
///
/// [`FrameError::SurfaceOutOfDate`] is recoverable by rebuilding the swap
/// chain and [`FrameError::SurfaceMinimized`] by retrying the rebuild once the
/// surface has a size again; everything else ends the render loop.
#[derive(Error, Debug)]
pub enum FrameError {
    /// The surface changed and the swap chain can no longer be used
    #[error("Swap chain is out of date with its surface")]
    SurfaceOutOfDate,

    /// A rebuild found a zero-area surface; the rebuild stays pending
    #[error("Surface has zero area; swap chain rebuild deferred")]
    SurfaceMinimized,

    /// Image acquisition failed
    #[error("Failed to acquire swap chain image: {0:?}")]
    Acquire(vk::Result),

    /// Waiting for a frame slot to retire failed
    #[error("Failed to wait for frame slot: {0:?}")]
    SlotWait(vk::Result),

    /// Queue submission failed
    #[error("Failed to submit draw command buffer: {0:?}")]
    Submit(vk::Result),

    /// Presentation failed for a reason other than staleness
    #[error("Failed to present swap chain image: {0:?}")]
    Present(vk::Result),

    /// An image index outside the swap chain was about to be submitted
    #[error("Image index {index} out of range for swap chain with {image_count} images")]
    ImageIndexOutOfRange {
        /// Offending index
        index: u32,
        /// Images in the current swap chain
        image_count: u32,
    },

    /// An operation was called from a state that does not allow it
    #[error("Cannot {operation} while frame is {state:?}")]
    InvalidTransition {
        /// State at the time of the call
        state: FrameState,
        /// Attempted operation
        operation: &'static str,
    },

    /// Waiting for the device to go idle before a rebuild failed
    #[error("Failed to wait for device idle: {0:?}")]
    DeviceIdle(vk::Result),

    /// Recreating the presentation chain failed
    #[error("Swap chain rebuild failed: {0}")]
    Rebuild(#[source] VulkanError),
}

/// Result type for frame operations
pub type FrameResult<T> = Result<T, FrameError>;
