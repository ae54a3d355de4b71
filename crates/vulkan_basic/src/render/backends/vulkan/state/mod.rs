//! Objects that live as long as one swap chain, plus the frame ring

pub mod chain;
pub mod framebuffer;
pub mod swapchain;
pub mod sync;

pub use chain::PresentationChain;
pub use framebuffer::{create_framebuffers, Framebuffer};
pub use swapchain::{Swapchain, SwapchainSupport};
pub use sync::{Fence, FrameSync, FrameSyncRing, ImageOwnership, Semaphore};
