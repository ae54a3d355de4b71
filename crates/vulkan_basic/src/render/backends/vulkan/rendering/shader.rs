//! SPIR-V loading, shader modules and the quad's graphics pipeline

use crate::render::backends::vulkan::{VulkanError, VulkanResult};
use crate::render::mesh::Vertex;
use ash::{vk, Device};
use std::ffi::CStr;
use std::io::Cursor;
use std::path::Path;

const ENTRY_POINT: &CStr = c"main";

/// Decoded SPIR-V words
///
/// Kept in memory so the pipeline can be rebuilt without touching the disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpirvCode {
    words: Vec<u32>,
}

impl SpirvCode {
    /// Decode a SPIR-V binary; the length must be a multiple of four and the
    /// magic number must match
    pub fn from_bytes(bytes: &[u8]) -> VulkanResult<Self> {
        let words = ash::util::read_spv(&mut Cursor::new(bytes))
            .map_err(|e| VulkanError::InvalidSpirv(e.to_string()))?;
        if words.is_empty() {
            return Err(VulkanError::InvalidSpirv("empty shader binary".to_string()));
        }
        Ok(Self { words })
    }

    /// Read and decode a SPIR-V file
    pub fn from_file<P: AsRef<Path>>(path: P) -> VulkanResult<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| VulkanError::ShaderLoad {
            path: path.display().to_string(),
            source,
        })?;
        log::debug!("Loaded shader {} ({} bytes)", path.display(), bytes.len());
        Self::from_bytes(&bytes)
    }

    /// SPIR-V words
    pub fn words(&self) -> &[u32] {
        &self.words
    }
}

/// Shader module wrapper with RAII cleanup
pub struct ShaderModule {
    device: Device,
    module: vk::ShaderModule,
}

impl ShaderModule {
    /// Create shader module from decoded SPIR-V
    pub fn new(device: Device, code: &SpirvCode) -> VulkanResult<Self> {
        let create_info = vk::ShaderModuleCreateInfo::builder().code(code.words());

        let module = unsafe { device.create_shader_module(&create_info, None) }.map_err(VulkanError::Api)?;

        Ok(Self { device, module })
    }

    /// Get shader module handle
    pub const fn handle(&self) -> vk::ShaderModule {
        self.module
    }

    /// Create shader stage create info
    pub fn create_stage_info(&self, stage: vk::ShaderStageFlags) -> vk::PipelineShaderStageCreateInfo {
        vk::PipelineShaderStageCreateInfo::builder()
            .stage(stage)
            .module(self.module)
            .name(ENTRY_POINT)
            .build()
    }
}

impl Drop for ShaderModule {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_shader_module(self.module, None);
        }
    }
}

/// Viewport covering the whole extent with depth 0..1
#[allow(clippy::cast_precision_loss)]
pub fn full_viewport(extent: vk::Extent2D) -> vk::Viewport {
    vk::Viewport {
        x: 0.0,
        y: 0.0,
        width: extent.width as f32,
        height: extent.height as f32,
        min_depth: 0.0,
        max_depth: 1.0,
    }
}

/// Graphics pipeline wrapper with RAII cleanup
pub struct GraphicsPipeline {
    device: Device,
    pipeline: vk::Pipeline,
    layout: vk::PipelineLayout,
}

impl GraphicsPipeline {
    /// Build the textured quad pipeline with a fixed viewport for `extent`
    pub fn new(
        device: Device,
        render_pass: vk::RenderPass,
        vertex_code: &SpirvCode,
        fragment_code: &SpirvCode,
        descriptor_set_layout: vk::DescriptorSetLayout,
        extent: vk::Extent2D,
    ) -> VulkanResult<Self> {
        // Modules only need to outlive pipeline creation.
        let vertex_shader = ShaderModule::new(device.clone(), vertex_code)?;
        let fragment_shader = ShaderModule::new(device.clone(), fragment_code)?;
        let shader_stages = [
            vertex_shader.create_stage_info(vk::ShaderStageFlags::VERTEX),
            fragment_shader.create_stage_info(vk::ShaderStageFlags::FRAGMENT),
        ];

        let binding_descriptions = [Vertex::binding_description()];
        let attribute_descriptions = Vertex::attribute_descriptions();
        let vertex_input_info = vk::PipelineVertexInputStateCreateInfo::builder()
            .vertex_binding_descriptions(&binding_descriptions)
            .vertex_attribute_descriptions(&attribute_descriptions);

        let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::builder()
            .topology(vk::PrimitiveTopology::TRIANGLE_LIST)
            .primitive_restart_enable(false);

        let viewports = [full_viewport(extent)];
        let scissors = [vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent,
        }];
        let viewport_state = vk::PipelineViewportStateCreateInfo::builder()
            .viewports(&viewports)
            .scissors(&scissors);

        // The projection flips Y, so quad indices wound counter-clockwise stay front-facing.
        let rasterizer = vk::PipelineRasterizationStateCreateInfo::builder()
            .depth_clamp_enable(false)
            .rasterizer_discard_enable(false)
            .polygon_mode(vk::PolygonMode::FILL)
            .line_width(1.0)
            .cull_mode(vk::CullModeFlags::BACK)
            .front_face(vk::FrontFace::COUNTER_CLOCKWISE)
            .depth_bias_enable(false);

        let multisampling = vk::PipelineMultisampleStateCreateInfo::builder()
            .sample_shading_enable(false)
            .rasterization_samples(vk::SampleCountFlags::TYPE_1);

        let color_blend_attachment = vk::PipelineColorBlendAttachmentState::builder()
            .color_write_mask(vk::ColorComponentFlags::RGBA)
            .blend_enable(false)
            .build();
        let color_blend_attachments = [color_blend_attachment];
        let color_blending = vk::PipelineColorBlendStateCreateInfo::builder()
            .logic_op_enable(false)
            .attachments(&color_blend_attachments);

        let set_layouts = [descriptor_set_layout];
        let layout_info = vk::PipelineLayoutCreateInfo::builder().set_layouts(&set_layouts);
        let layout = unsafe { device.create_pipeline_layout(&layout_info, None) }.map_err(VulkanError::Api)?;

        let pipeline_info = vk::GraphicsPipelineCreateInfo::builder()
            .stages(&shader_stages)
            .vertex_input_state(&vertex_input_info)
            .input_assembly_state(&input_assembly)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterizer)
            .multisample_state(&multisampling)
            .color_blend_state(&color_blending)
            .layout(layout)
            .render_pass(render_pass)
            .subpass(0)
            .build();

        let pipelines = unsafe {
            device.create_graphics_pipelines(vk::PipelineCache::null(), &[pipeline_info], None)
        };
        let pipeline = match pipelines {
            Ok(pipelines) => pipelines.into_iter().next().unwrap_or_default(),
            Err((_, err)) => {
                unsafe { device.destroy_pipeline_layout(layout, None) };
                return Err(VulkanError::Api(err));
            }
        };

        Ok(Self {
            device,
            pipeline,
            layout,
        })
    }

    /// Get pipeline handle
    pub const fn handle(&self) -> vk::Pipeline {
        self.pipeline
    }

    /// Get layout handle
    pub const fn layout(&self) -> vk::PipelineLayout {
        self.layout
    }
}

impl Drop for GraphicsPipeline {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_pipeline(self.pipeline, None);
            self.device.destroy_pipeline_layout(self.layout, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPIRV_MAGIC: u32 = 0x0723_0203;

    fn spirv_bytes(words: &[u32]) -> Vec<u8> {
        words.iter().flat_map(|w| w.to_le_bytes()).collect()
    }

    #[test]
    fn test_valid_spirv_decodes() {
        let code = SpirvCode::from_bytes(&spirv_bytes(&[SPIRV_MAGIC, 0x0001_0000, 0, 1, 0])).unwrap();
        assert_eq!(code.words().len(), 5);
        assert_eq!(code.words()[0], SPIRV_MAGIC);
    }

    #[test]
    fn test_unaligned_spirv_rejected() {
        let mut bytes = spirv_bytes(&[SPIRV_MAGIC, 0]);
        bytes.push(0);
        assert!(matches!(SpirvCode::from_bytes(&bytes), Err(VulkanError::InvalidSpirv(_))));
    }

    #[test]
    fn test_empty_spirv_rejected() {
        assert!(matches!(SpirvCode::from_bytes(&[]), Err(VulkanError::InvalidSpirv(_))));
    }

    #[test]
    fn test_missing_shader_file() {
        let err = SpirvCode::from_file("does/not/exist.spv").unwrap_err();
        match err {
            VulkanError::ShaderLoad { path, .. } => assert!(path.ends_with("exist.spv")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_shader_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quad.vert.spv");
        std::fs::write(&path, spirv_bytes(&[SPIRV_MAGIC, 0x0001_0000, 0, 8, 0])).unwrap();
        let code = SpirvCode::from_file(&path).unwrap();
        assert_eq!(code.words()[3], 8);
    }

    #[test]
    fn test_full_viewport() {
        let viewport = full_viewport(vk::Extent2D {
            width: 800,
            height: 600,
        });
        assert_eq!(viewport.width, 800.0);
        assert_eq!(viewport.height, 600.0);
        assert_eq!(viewport.max_depth, 1.0);
    }
}
