//! Channel-to-scene mappings.
//!
//! A baked clip only knows glTF indices. Mappings bind each channel name to
//! the concrete scene objects materialized for its target, using the
//! [`TargetResolver`] registered for the channel's property.

use crate::animation::clip::AnimationClip;
use crate::animation::registry::{
    self, CameraProperty, LightProperty, MaterialProperty, TargetResolver, TransformProperty,
};
use crate::assets::loaders::gltf::hierarchy::TreeNode;
use crate::scene::{CameraKey, LightKey, NodeHandle, SkeletonKey};

/// A scene object driven by a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingTarget {
    Transform {
        entity: NodeHandle,
        property: TransformProperty,
    },
    Joint {
        skeleton: SkeletonKey,
        joint: usize,
        property: TransformProperty,
    },
    MorphWeights {
        entity: NodeHandle,
    },
    CameraLens {
        camera: CameraKey,
        property: CameraProperty,
    },
    Light {
        light: LightKey,
        property: LightProperty,
    },
    Material {
        material: usize,
        property: MaterialProperty,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMapping {
    pub channel_name: String,
    pub target: MappingTarget,
}

/// All mappings of one clip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimationMapping {
    pub name: String,
    /// Index of the clip in `ImportedAsset::clips`.
    pub clip: usize,
    pub entries: Vec<ChannelMapping>,
}

impl AnimationMapping {
    pub fn targets_of<'a>(&'a self, channel_name: &'a str) -> impl Iterator<Item = &'a MappingTarget> + 'a {
        self.entries
            .iter()
            .filter(move |entry| entry.channel_name == channel_name)
            .map(|entry| &entry.target)
    }
}

/// Materialized objects the resolvers look up, indexed by glTF index.
#[derive(Debug, Clone, Copy)]
pub struct MappingScope<'a> {
    pub nodes: &'a [TreeNode],
    /// Primitive entities created for each node.
    pub primitive_entities: &'a [Vec<NodeHandle>],
    /// Camera components created from each glTF camera.
    pub cameras: &'a [Vec<CameraKey>],
    /// Light components created from each punctual light.
    pub lights: &'a [Vec<LightKey>],
}

impl TargetResolver {
    /// Scene objects targeted by `target_id` for this property.
    #[must_use]
    pub fn resolve(&self, target_id: usize, scope: &MappingScope<'_>) -> Vec<MappingTarget> {
        match *self {
            Self::NodeTransform(property) => {
                let Some(node) = scope.nodes.get(target_id) else {
                    return Vec::new();
                };
                let entity = node
                    .entity
                    .map(|entity| MappingTarget::Transform { entity, property });
                let joints = node.joints.iter().map(|handle| MappingTarget::Joint {
                    skeleton: handle.skeleton,
                    joint: handle.joint,
                    property,
                });
                entity.into_iter().chain(joints).collect()
            }
            Self::MorphWeights => scope
                .primitive_entities
                .get(target_id)
                .into_iter()
                .flatten()
                .map(|&entity| MappingTarget::MorphWeights { entity })
                .collect(),
            Self::CameraLens(property) => scope
                .cameras
                .get(target_id)
                .into_iter()
                .flatten()
                .map(|&camera| MappingTarget::CameraLens { camera, property })
                .collect(),
            Self::Light(property) => scope
                .lights
                .get(target_id)
                .into_iter()
                .flatten()
                .map(|&light| MappingTarget::Light { light, property })
                .collect(),
            Self::Material(property) => vec![MappingTarget::Material {
                material: target_id,
                property,
            }],
        }
    }
}

/// Builds the mapping table of `clip`.
#[must_use]
pub fn generate_mapping(clip_index: usize, clip: &AnimationClip, scope: &MappingScope<'_>) -> AnimationMapping {
    let mut entries = Vec::new();
    for channel in &clip.channels {
        let Some(info) = registry::lookup(channel.target.target_type, &channel.target.path) else {
            continue;
        };
        let targets = info.resolver.resolve(channel.target.target_id, scope);
        if targets.is_empty() {
            log::debug!(
                "Channel '{}' of clip '{}' has no materialized target",
                channel.name,
                clip.name
            );
        }
        entries.extend(targets.into_iter().map(|target| ChannelMapping {
            channel_name: channel.name.clone(),
            target,
        }));
    }

    AnimationMapping {
        name: clip.name.clone(),
        clip: clip_index,
        entries,
    }
}
