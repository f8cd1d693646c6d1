use std::path::PathBuf;
use std::sync::Arc;

use crate::animation::{AnimationClip, AnimationMapping};
use crate::assets::loaders::gltf::document::AssetInfo;
use crate::assets::loaders::gltf::hierarchy::TreeNode;
use crate::assets::loaders::gltf::material::{ImageRecord, MaterialRecord, SamplerRecord, TextureRecord};
use crate::assets::loaders::gltf::mesh::MeshData;
use crate::errors::ImportWarning;
use crate::scene::{NodeHandle, Scene, SkeletonKey};

/// Root entities of one declared glTF scene.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneRoot {
    pub name: Option<String>,
    /// glTF scene index.
    pub index: usize,
    pub nodes: Vec<NodeHandle>,
}

/// A fully materialized glTF import.
///
/// Owns the scene graph and every record produced while parsing. Nothing in
/// here borrows from the source bytes, so the value can be moved across
/// threads freely.
#[derive(Debug)]
pub struct ImportedAsset {
    pub asset: AssetInfo,

    /// Node arena with camera, light and skeleton pools.
    pub scene: Scene,
    /// The `gltf_root` entity parenting every root entity.
    pub root: NodeHandle,
    pub scenes: Vec<SceneRoot>,
    pub default_scene: Option<usize>,

    pub clips: Vec<AnimationClip>,
    /// One mapping table per clip, same order as `clips`.
    pub mappings: Vec<AnimationMapping>,
    /// Skeleton created for each glTF skin.
    pub skeletons: Vec<SkeletonKey>,

    pub meshes: Vec<MeshData>,
    pub materials: Vec<MaterialRecord>,
    pub textures: Vec<TextureRecord>,
    pub samplers: Vec<SamplerRecord>,
    pub images: Vec<ImageRecord>,
    /// Per-node records, indexed by glTF node index.
    pub nodes: Vec<TreeNode>,

    /// Local files read or referenced by the import.
    pub dependencies: Vec<PathBuf>,
    pub warnings: Vec<ImportWarning>,
}

impl ImportedAsset {
    /// Entity created for glTF node `index`.
    #[must_use]
    pub fn entity_of_node(&self, index: usize) -> Option<NodeHandle> {
        self.nodes.get(index).and_then(|node| node.entity)
    }

    #[must_use]
    pub fn clip(&self, name: &str) -> Option<&AnimationClip> {
        self.clips.iter().find(|clip| clip.name == name)
    }

    #[must_use]
    pub fn mapping(&self, clip_name: &str) -> Option<&AnimationMapping> {
        self.mappings.iter().find(|mapping| mapping.name == clip_name)
    }

    #[must_use]
    pub fn default_scene(&self) -> Option<&SceneRoot> {
        self.default_scene.and_then(|index| self.scenes.get(index))
    }
}

/// Thread-safe shared import result.
pub type SharedAsset = Arc<ImportedAsset>;
