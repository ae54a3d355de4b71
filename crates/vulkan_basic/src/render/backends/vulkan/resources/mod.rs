//! GPU resources that outlive swap chain rebuilds

pub mod buffer;
pub mod descriptor_set;
pub mod texture;

pub use buffer::{find_memory_type, Buffer, DeviceLocalBuffer, UniformBuffer};
pub use descriptor_set::{quad_layout_builder, DescriptorPool, DescriptorSetLayout, DescriptorSetLayoutBuilder};
pub use texture::{layout_transition_masks, Texture, TransitionMasks};
