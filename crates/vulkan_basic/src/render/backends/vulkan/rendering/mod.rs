//! Render pass, pipeline and command recording

pub mod commands;
pub mod render_pass;
pub mod shader;

pub use commands::{ActiveRenderPass, CommandBufferSet, CommandPool, CommandRecorder};
pub use render_pass::RenderPass;
pub use shader::{GraphicsPipeline, ShaderModule, SpirvCode};
