//! Vulkan backend implementation
//!
//! Organized into initialization, resources, rendering and state modules.

/// Vulkan initialization types (context, window)
pub mod initialization;

/// Vulkan resource management (buffers, textures, descriptors)
pub mod resources;

/// Vulkan rendering operations (shaders, pipelines, render passes, commands)
pub mod rendering;

/// Swap chain, presentation chain and frame synchronization
pub mod state;

/// Main Vulkan renderer implementation
pub mod renderer;

pub use renderer::VulkanRenderer;

pub use initialization::context::{
    LogicalDevice, PhysicalDeviceInfo, QueueFamilyIndices, VulkanContext, VulkanError, VulkanInstance,
    VulkanResult,
};
pub use initialization::window::{Window, WindowError, WindowEvent};

pub use resources::buffer::{Buffer, DeviceLocalBuffer, UniformBuffer};
pub use resources::descriptor_set::{DescriptorPool, DescriptorSetLayout, DescriptorSetLayoutBuilder};
pub use resources::texture::Texture;

pub use rendering::commands::{ActiveRenderPass, CommandPool, CommandRecorder};
pub use rendering::render_pass::RenderPass;
pub use rendering::shader::{GraphicsPipeline, ShaderModule, SpirvCode};

pub use state::framebuffer::Framebuffer;
pub use state::swapchain::Swapchain;
pub use state::sync::{Fence, FrameSync, FrameSyncRing, Semaphore};
pub use state::PresentationChain;
