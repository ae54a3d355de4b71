//! Rendering
//!
//! [`frame`] owns the presentation state machine; [`backends::vulkan`] is the
//! GPU side it drives. [`mesh`] and [`uniforms`] describe the data fed to the
//! pipeline.

pub mod backends;
pub mod frame;
pub mod mesh;
pub mod uniforms;

pub use mesh::{Vertex, QUAD_INDICES, QUAD_VERTICES};
pub use uniforms::UniformBufferObject;
