use smallvec::SmallVec;

use crate::scene::transform::Transform;
use crate::scene::{CameraKey, LightKey, NodeHandle, SkeletonKey};

/// Mesh primitive carried by a primitive entity.
///
/// Each glTF primitive becomes its own child entity of the node that
/// references the mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrimitiveRef {
    /// Index into `ImportedAsset::meshes`.
    pub mesh: usize,
    /// Index into the mesh's primitive list.
    pub primitive: usize,
    /// Index into `ImportedAsset::materials`.
    pub material: Option<usize>,
}

/// A scene node (entity).
///
/// # Hierarchy
///
/// - `parent`: optional handle to the parent node (`None` for roots)
/// - `children`: child handles in insertion order
///
/// Hierarchy edges should be edited through [`Scene::attach`](crate::scene::Scene::attach),
/// which keeps both ends in sync.
#[derive(Debug, Clone, Default)]
pub struct Node {
    pub name: Option<String>,

    pub(crate) parent: Option<NodeHandle>,
    pub(crate) children: Vec<NodeHandle>,

    pub transform: Transform,

    // === Components ===
    pub camera: Option<CameraKey>,
    pub light: Option<LightKey>,
    /// glTF mesh referenced by this node.
    pub mesh: Option<usize>,
    /// Set on primitive entities.
    pub primitive: Option<PrimitiveRef>,
    /// Skeleton driving the primitive (skinned primitive entities only).
    pub armature: Option<SkeletonKey>,
    /// `KDAB_kuesa_layers` layer names.
    pub layers: SmallVec<[String; 2]>,
    /// Default morph target weights.
    pub morph_weights: Vec<f32>,
}

impl Node {
    #[must_use]
    pub fn new(name: Option<String>) -> Self {
        Self {
            name,
            ..Self::default()
        }
    }

    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<NodeHandle> {
        self.parent
    }

    #[inline]
    #[must_use]
    pub fn children(&self) -> &[NodeHandle] {
        &self.children
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}
