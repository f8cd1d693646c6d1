use glam::{Affine3A, Mat4, Quat, Vec3};

/// Local TRS transform of a scene node.
///
/// Holds the decomposed translation / rotation / scale together with the
/// cached local and world matrices. A glTF `matrix` is kept verbatim as the
/// local matrix; the TRS fields then only approximate it when it has shear.
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,

    /// Local matrix given by the document. Takes precedence over TRS.
    pub(crate) matrix: Option<Affine3A>,
    pub(crate) local_matrix: Affine3A,
    pub(crate) world_matrix: Affine3A,
}

impl Transform {
    #[must_use]
    pub fn new() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            matrix: None,
            local_matrix: Affine3A::IDENTITY,
            world_matrix: Affine3A::IDENTITY,
        }
    }

    #[must_use]
    pub fn from_scale_rotation_translation(scale: Vec3, rotation: Quat, position: Vec3) -> Self {
        Self {
            position,
            rotation,
            scale,
            matrix: None,
            local_matrix: Affine3A::from_scale_rotation_translation(scale, rotation, position),
            world_matrix: Affine3A::IDENTITY,
        }
    }

    /// Builds a transform from a column-major glTF `matrix`, which stays the
    /// local matrix as given.
    #[must_use]
    pub fn from_cols_array(matrix: &[f32; 16]) -> Self {
        let affine = Affine3A::from_mat4(Mat4::from_cols_array(matrix));
        let mut transform = Self::new();
        transform.apply_local_matrix(affine);
        transform.matrix = Some(affine);
        transform
    }

    /// The document-provided local matrix, if any.
    #[inline]
    #[must_use]
    pub fn matrix(&self) -> Option<&Affine3A> {
        self.matrix.as_ref()
    }

    /// Whether the TRS fields reproduce the document matrix (always true
    /// without one). False for sheared matrices.
    #[must_use]
    pub fn trs_matches_matrix(&self) -> bool {
        self.matrix.is_none_or(|matrix| {
            Affine3A::from_scale_rotation_translation(self.scale, self.rotation, self.position)
                .abs_diff_eq(matrix, 1e-4)
        })
    }

    /// Recomputes the local matrix from the document matrix or the TRS fields.
    pub fn update_local_matrix(&mut self) {
        self.local_matrix = self.matrix.unwrap_or_else(|| {
            Affine3A::from_scale_rotation_translation(self.scale, self.rotation, self.position)
        });
    }

    /// Sets the local matrix and decomposes it into TRS, which become
    /// authoritative again.
    pub fn apply_local_matrix(&mut self, mat: Affine3A) {
        self.matrix = None;
        self.local_matrix = mat;
        let (scale, rotation, translation) = mat.to_scale_rotation_translation();
        self.scale = scale;
        self.rotation = rotation;
        self.position = translation;
    }

    pub fn apply_local_matrix_from_mat4(&mut self, mat: Mat4) {
        self.apply_local_matrix(Affine3A::from_mat4(mat));
    }

    #[inline]
    #[must_use]
    pub fn local_matrix(&self) -> &Affine3A {
        &self.local_matrix
    }

    /// World matrix as of the last [`Scene::update_world_matrices`](crate::scene::Scene::update_world_matrices).
    #[inline]
    #[must_use]
    pub fn world_matrix(&self) -> &Affine3A {
        &self.world_matrix
    }

    #[inline]
    #[must_use]
    pub fn world_matrix_as_mat4(&self) -> Mat4 {
        Mat4::from(self.world_matrix)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::new()
    }
}
