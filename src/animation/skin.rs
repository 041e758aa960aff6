use cgmath::{Matrix4, SquareMatrix};

/// Upper bound on joints the skinning program can address.
pub const MAX_JOINTS: usize = 64;

/// A skeleton binding: the joint nodes and their inverse bind matrices.
#[derive(Clone, Debug, PartialEq)]
pub struct Skin {
    pub name: String,
    pub joints: Vec<usize>,
    pub inverse_bind: Vec<Matrix4<f32>>,
}

impl Skin {
    /// Missing inverse bind matrices default to identity, extra ones are
    /// ignored.
    pub fn new(name: impl Into<String>, joints: Vec<usize>, mut inverse_bind: Vec<Matrix4<f32>>) -> Self {
        inverse_bind.resize(joints.len(), Matrix4::identity());
        Self {
            name: name.into(),
            joints,
            inverse_bind,
        }
    }

    /// Number of palette entries this skin produces.
    pub fn palette_len(&self) -> usize {
        self.joints.len().min(MAX_JOINTS)
    }

    /// `palette[j] = global[joints[j]] * inverse_bind[j]` for the first
    /// [`palette_len`](Self::palette_len) joints. Joints pointing past
    /// `globals` stay at identity.
    pub fn write_palette(&self, globals: &[Matrix4<f32>], palette: &mut Vec<Matrix4<f32>>) {
        palette.clear();
        palette.extend(
            self.joints
                .iter()
                .zip(&self.inverse_bind)
                .take(MAX_JOINTS)
                .map(|(&node, inverse_bind)| match globals.get(node) {
                    Some(global) => global * inverse_bind,
                    None => Matrix4::identity(),
                }),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::Vector3;

    #[test]
    fn palette_is_capped_at_max_joints() {
        let skin = Skin::new("big", (0..80).collect(), Vec::new());
        let globals = vec![Matrix4::identity(); 80];
        let mut palette = Vec::new();
        skin.write_palette(&globals, &mut palette);
        assert_eq!(palette.len(), MAX_JOINTS);
        assert_eq!(skin.palette_len(), MAX_JOINTS);
    }

    #[test]
    fn bind_pose_yields_identity_palette() {
        let bind = Matrix4::from_translation(Vector3::new(0.0, 1.0, 0.0));
        let skin = Skin::new("arm", vec![0], vec![bind.invert().unwrap()]);
        let mut palette = Vec::new();
        skin.write_palette(&[bind], &mut palette);
        assert!(palette[0].is_identity());
    }
}
