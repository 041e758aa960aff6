use cgmath::{InnerSpace, Matrix, Matrix4, Point3, Vector4};

/// Six clip planes `(n, d)` with `dot(n, p) + d >= 0` inside, normalised by
/// the length of `n`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Frustum {
    pub planes: [Vector4<f32>; 6],
}

impl Frustum {
    /// Extract the planes of a `proj * view` matrix whose clip depth range is
    /// `[0, 1]` (wgpu convention), so the near plane is row 2 alone.
    pub fn from_view_proj(view_proj: &Matrix4<f32>) -> Self {
        let r0 = view_proj.row(0);
        let r1 = view_proj.row(1);
        let r2 = view_proj.row(2);
        let r3 = view_proj.row(3);
        let planes = [r3 + r0, r3 - r0, r3 + r1, r3 - r1, r2, r3 - r2].map(normalize_plane);
        Self { planes }
    }

    pub fn contains_point(&self, point: Point3<f32>) -> bool {
        let p = Vector4::new(point.x, point.y, point.z, 1.0);
        self.planes.iter().all(|plane| plane.dot(p) >= 0.0)
    }
}

fn normalize_plane(plane: Vector4<f32>) -> Vector4<f32> {
    let length = plane.truncate().magnitude();
    if length > f32::EPSILON {
        plane / length
    } else {
        plane
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{Deg, perspective};

    fn looking_down_negative_z() -> Frustum {
        let proj = crate::camera::OPENGL_TO_WGPU_MATRIX * perspective(Deg(60.0), 1.0, 0.1, 100.0);
        let view = Matrix4::look_at_rh(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.0, 0.0, -1.0),
            cgmath::Vector3::unit_y(),
        );
        Frustum::from_view_proj(&(proj * view))
    }

    #[test]
    fn points_in_front_are_inside() {
        let frustum = looking_down_negative_z();
        assert!(frustum.contains_point(Point3::new(0.0, 0.0, -10.0)));
        assert!(frustum.contains_point(Point3::new(1.0, -1.0, -5.0)));
    }

    #[test]
    fn points_behind_beyond_or_aside_are_outside() {
        let frustum = looking_down_negative_z();
        assert!(!frustum.contains_point(Point3::new(0.0, 0.0, 5.0)));
        assert!(!frustum.contains_point(Point3::new(0.0, 0.0, -150.0)));
        assert!(!frustum.contains_point(Point3::new(50.0, 0.0, -5.0)));
        assert!(!frustum.contains_point(Point3::new(0.0, 0.0, -0.05)));
    }

    #[test]
    fn planes_are_normalised() {
        for plane in looking_down_negative_z().planes {
            assert!((plane.truncate().magnitude() - 1.0).abs() < 1e-4);
        }
    }
}
