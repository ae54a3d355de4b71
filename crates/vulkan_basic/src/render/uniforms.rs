//! Uniform block for the quad's vertex shader

use crate::foundation::math::{look_at, perspective_vulkan, rotation_z, to_columns, Mat4, Point3, Vec3};

/// Spin speed of the quad about +Z
pub const ROTATION_DEGREES_PER_SECOND: f32 = 90.0;
/// Vertical field of view
pub const FIELD_OF_VIEW_DEGREES: f32 = 45.0;
/// Near clip plane
pub const NEAR_PLANE: f32 = 0.1;
/// Far clip plane
pub const FAR_PLANE: f32 = 10.0;

/// Model, view and projection matrices, laid out as three GLSL `mat4`s
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniformBufferObject {
    /// Model transform
    pub model: [[f32; 4]; 4],
    /// Camera transform
    pub view: [[f32; 4]; 4],
    /// Clip-space projection
    pub projection: [[f32; 4]; 4],
}

unsafe impl bytemuck::Pod for UniformBufferObject {}
unsafe impl bytemuck::Zeroable for UniformBufferObject {}

impl UniformBufferObject {
    /// Pack three matrices
    pub fn from_matrices(model: &Mat4, view: &Mat4, projection: &Mat4) -> Self {
        Self {
            model: to_columns(model),
            view: to_columns(view),
            projection: to_columns(projection),
        }
    }

    /// Transforms for the spinning quad after `elapsed_seconds`, viewed from
    /// (2, 2, 2) on a surface of the given size
    pub fn spinning_quad(elapsed_seconds: f32, width: u32, height: u32) -> Self {
        let model = rotation_z(elapsed_seconds * ROTATION_DEGREES_PER_SECOND.to_radians());
        let view = look_at(
            &Point3::new(2.0, 2.0, 2.0),
            &Point3::origin(),
            &Vec3::new(0.0, 1.0, 0.0),
        );
        let aspect = width.max(1) as f32 / height.max(1) as f32;
        let projection = perspective_vulkan(
            FIELD_OF_VIEW_DEGREES.to_radians(),
            aspect,
            NEAR_PLANE,
            FAR_PLANE,
        );
        Self::from_matrices(&model, &view, &projection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_size_matches_three_mat4() {
        assert_eq!(std::mem::size_of::<UniformBufferObject>(), 3 * 64);
        let ubo = UniformBufferObject::spinning_quad(0.0, 800, 600);
        assert_eq!(bytemuck::bytes_of(&ubo).len(), 192);
    }

    #[test]
    fn test_model_starts_at_identity() {
        let ubo = UniformBufferObject::spinning_quad(0.0, 800, 600);
        assert_eq!(ubo.model, to_columns(&Mat4::identity()));
    }

    #[test]
    fn test_model_rotates_quarter_turn_per_second() {
        let ubo = UniformBufferObject::spinning_quad(1.0, 800, 600);
        // Column 0 is the image of +X.
        assert_relative_eq!(ubo.model[0][0], 0.0, epsilon = 1e-6);
        assert_relative_eq!(ubo.model[0][1], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_projection_tracks_aspect() {
        let wide = UniformBufferObject::spinning_quad(0.0, 1600, 600);
        let narrow = UniformBufferObject::spinning_quad(0.0, 800, 600);
        assert_relative_eq!(wide.projection[0][0] * 2.0, narrow.projection[0][0], epsilon = 1e-6);
        assert!(narrow.projection[1][1] < 0.0);
    }

    #[test]
    fn test_zero_height_does_not_produce_nan() {
        let ubo = UniformBufferObject::spinning_quad(0.5, 800, 0);
        assert!(ubo.projection.iter().flatten().all(|v| v.is_finite()));
    }
}
