//! Math types and the transforms used by the quad's uniform block
//!
//! Matrices are `nalgebra` column-major `f32` matrices. Projections target
//! Vulkan clip space: depth in `[0, 1]` and +Y pointing down.

use nalgebra::{Matrix4, Point3 as NPoint3, Vector2, Vector3};

/// 2D vector
pub type Vec2 = Vector2<f32>;
/// 3D vector
pub type Vec3 = Vector3<f32>;
/// 3D point
pub type Point3 = NPoint3<f32>;
/// 4x4 matrix
pub type Mat4 = Matrix4<f32>;

/// Right-handed perspective projection for Vulkan clip space
///
/// `fovy` is the vertical field of view in radians. The camera looks down -Z.
pub fn perspective_vulkan(fovy: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
    let focal = 1.0 / (fovy * 0.5).tan();
    let mut m = Mat4::zeros();
    m[(0, 0)] = focal / aspect;
    m[(1, 1)] = -focal;
    m[(2, 2)] = far / (near - far);
    m[(2, 3)] = near * far / (near - far);
    m[(3, 2)] = -1.0;
    m
}

/// Right-handed view matrix looking from `eye` at `target`
pub fn look_at(eye: &Point3, target: &Point3, up: &Vec3) -> Mat4 {
    Mat4::look_at_rh(eye, target, up)
}

/// Rotation about the +Z axis
pub fn rotation_z(angle: f32) -> Mat4 {
    Mat4::from_axis_angle(&Vec3::z_axis(), angle)
}

/// Convert a matrix into the column arrays a GLSL `mat4` expects
pub fn to_columns(m: &Mat4) -> [[f32; 4]; 4] {
    (*m).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector4;

    fn project(m: &Mat4, p: Vector4<f32>) -> Vector4<f32> {
        let clip = m * p;
        clip / clip.w
    }

    #[test]
    fn test_perspective_depth_range() {
        let proj = perspective_vulkan(45f32.to_radians(), 4.0 / 3.0, 0.1, 10.0);

        let near = project(&proj, Vector4::new(0.0, 0.0, -0.1, 1.0));
        assert_relative_eq!(near.z, 0.0, epsilon = 1e-5);

        let far = project(&proj, Vector4::new(0.0, 0.0, -10.0, 1.0));
        assert_relative_eq!(far.z, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_perspective_flips_y() {
        let proj = perspective_vulkan(90f32.to_radians(), 1.0, 0.1, 10.0);
        let up = project(&proj, Vector4::new(0.0, 1.0, -1.0, 1.0));
        assert_relative_eq!(up.y, -1.0, epsilon = 1e-5);

        let right = project(&proj, Vector4::new(1.0, 0.0, -1.0, 1.0));
        assert_relative_eq!(right.x, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_aspect_scales_x_only() {
        let square = perspective_vulkan(1.0, 1.0, 0.1, 10.0);
        let wide = perspective_vulkan(1.0, 2.0, 0.1, 10.0);
        assert_relative_eq!(wide[(0, 0)] * 2.0, square[(0, 0)]);
        assert_relative_eq!(wide[(1, 1)], square[(1, 1)]);
    }

    #[test]
    fn test_look_at_moves_target_onto_negative_z() {
        let view = look_at(
            &Point3::new(2.0, 2.0, 2.0),
            &Point3::origin(),
            &Vec3::new(0.0, 1.0, 0.0),
        );
        let origin = view.transform_point(&Point3::origin());
        assert_relative_eq!(origin.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(origin.y, 0.0, epsilon = 1e-5);
        assert_relative_eq!(origin.z, -(12f32).sqrt(), epsilon = 1e-5);
    }

    #[test]
    fn test_rotation_z_quarter_turn() {
        let rot = rotation_z(std::f32::consts::FRAC_PI_2);
        let v = rot.transform_vector(&Vec3::x());
        assert_relative_eq!(v, Vec3::y(), epsilon = 1e-6);
    }

    #[test]
    fn test_columns_are_column_major() {
        let mut m = Mat4::identity();
        m[(0, 3)] = 5.0;
        let cols = to_columns(&m);
        assert_relative_eq!(cols[3][0], 5.0);
        assert_relative_eq!(cols[0][3], 0.0);
    }
}
