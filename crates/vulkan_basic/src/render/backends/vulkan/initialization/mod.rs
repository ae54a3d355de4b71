//! Instance, device and window setup

pub mod context;
pub mod window;

pub use context::{
    LogicalDevice, PhysicalDeviceInfo, QueueFamilyIndices, VulkanContext, VulkanError, VulkanInstance,
    VulkanResult,
};
pub use window::{Window, WindowError, WindowEvent, WindowResult};
