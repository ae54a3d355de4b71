//! Vertex layout and quad geometry

use ash::vk;
use std::mem;

/// Per-vertex data: position, color and texture coordinate
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    /// Position in model space (xy)
    pub position: [f32; 2],
    /// Linear RGB color
    pub color: [f32; 3],
    /// Texture coordinate
    pub tex_coord: [f32; 2],
}

// Three f32 arrays, no padding.
unsafe impl bytemuck::Pod for Vertex {}
unsafe impl bytemuck::Zeroable for Vertex {}

impl Vertex {
    /// Create a vertex
    pub const fn new(position: [f32; 2], color: [f32; 3], tex_coord: [f32; 2]) -> Self {
        Self { position, color, tex_coord }
    }

    /// Binding 0, advanced per vertex
    pub fn binding_description() -> vk::VertexInputBindingDescription {
        vk::VertexInputBindingDescription {
            binding: 0,
            stride: mem::size_of::<Self>() as u32,
            input_rate: vk::VertexInputRate::VERTEX,
        }
    }

    /// Locations 0, 1 and 2 match the vertex shader inputs
    pub fn attribute_descriptions() -> [vk::VertexInputAttributeDescription; 3] {
        [
            vk::VertexInputAttributeDescription {
                location: 0,
                binding: 0,
                format: vk::Format::R32G32_SFLOAT,
                offset: mem::offset_of!(Self, position) as u32,
            },
            vk::VertexInputAttributeDescription {
                location: 1,
                binding: 0,
                format: vk::Format::R32G32B32_SFLOAT,
                offset: mem::offset_of!(Self, color) as u32,
            },
            vk::VertexInputAttributeDescription {
                location: 2,
                binding: 0,
                format: vk::Format::R32G32_SFLOAT,
                offset: mem::offset_of!(Self, tex_coord) as u32,
            },
        ]
    }
}

/// Unit quad centred on the origin, counter-clockwise
pub const QUAD_VERTICES: [Vertex; 4] = [
    Vertex::new([-0.5, -0.5], [1.0, 0.0, 0.0], [0.0, 0.0]),
    Vertex::new([0.5, -0.5], [0.0, 1.0, 0.0], [1.0, 0.0]),
    Vertex::new([0.5, 0.5], [0.0, 0.0, 1.0], [1.0, 1.0]),
    Vertex::new([-0.5, 0.5], [1.0, 1.0, 1.0], [0.0, 1.0]),
];

/// Two triangles covering [`QUAD_VERTICES`]
pub const QUAD_INDICES: [u16; 6] = [0, 1, 2, 2, 3, 0];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_layout() {
        assert_eq!(mem::size_of::<Vertex>(), 28);
        assert_eq!(Vertex::binding_description().stride, 28);

        let offsets: Vec<u32> = Vertex::attribute_descriptions().iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![0, 8, 20]);

        let locations: Vec<u32> = Vertex::attribute_descriptions().iter().map(|a| a.location).collect();
        assert_eq!(locations, vec![0, 1, 2]);
    }

    #[test]
    fn test_indices_reference_every_vertex() {
        for index in QUAD_INDICES {
            assert!((index as usize) < QUAD_VERTICES.len());
        }
        for vertex in 0..QUAD_VERTICES.len() as u16 {
            assert!(QUAD_INDICES.contains(&vertex));
        }
    }

    #[test]
    fn test_triangles_wind_counter_clockwise() {
        for tri in QUAD_INDICES.chunks(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| QUAD_VERTICES[i as usize].position);
            let cross = (b[0] - a[0]) * (c[1] - a[1]) - (b[1] - a[1]) * (c[0] - a[0]);
            assert!(cross > 0.0);
        }
    }

    #[test]
    fn test_cast_to_bytes() {
        let bytes: &[u8] = bytemuck::cast_slice(&QUAD_VERTICES);
        assert_eq!(bytes.len(), 4 * 28);
    }
}
