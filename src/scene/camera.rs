use glam::Mat4;

/// Camera projection, as described by a glTF camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    Perspective {
        /// Vertical field of view in radians.
        yfov: f32,
        aspect_ratio: Option<f32>,
        znear: f32,
        /// `None` means an infinite projection.
        zfar: Option<f32>,
    },
    Orthographic {
        xmag: f32,
        ymag: f32,
        znear: f32,
        zfar: f32,
    },
}

/// A camera component.
///
/// Several camera components may be created from the same glTF camera when
/// more than one node references it; `source` keeps the glTF index so
/// animation mappings can address all of them.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub name: Option<String>,
    /// glTF camera index.
    pub source: usize,
    pub projection: Projection,
}

impl Camera {
    #[must_use]
    pub fn new(source: usize, projection: Projection) -> Self {
        Self {
            name: None,
            source,
            projection,
        }
    }

    /// Right-handed projection matrix. Perspective cameras without an aspect
    /// ratio use `fallback_aspect`.
    #[must_use]
    pub fn projection_matrix(&self, fallback_aspect: f32) -> Mat4 {
        match self.projection {
            Projection::Perspective {
                yfov,
                aspect_ratio,
                znear,
                zfar,
            } => {
                let aspect = aspect_ratio.unwrap_or(fallback_aspect);
                match zfar {
                    Some(zfar) => Mat4::perspective_rh(yfov, aspect, znear, zfar),
                    None => Mat4::perspective_infinite_rh(yfov, aspect, znear),
                }
            }
            Projection::Orthographic {
                xmag,
                ymag,
                znear,
                zfar,
            } => Mat4::orthographic_rh(-xmag, xmag, -ymag, ymag, znear, zfar),
        }
    }
}
