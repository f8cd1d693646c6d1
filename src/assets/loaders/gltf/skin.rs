//! Skin to skeleton conversion.
//!
//! The skeleton root is the lowest common ancestor of all listed joints.
//! Joints are numbered depth first from that root over every node on a path
//! to a listed joint, so intermediate nodes become joints too. Skins whose
//! joints live in disjoint trees get a synthetic root at index 0.

use std::collections::BTreeMap;

use glam::Mat4;
use rustc_hash::FxHashMap;

use crate::assets::loaders::gltf::accessor::{self, AccessorRecord, ComponentType, ElementShape};
use crate::assets::loaders::gltf::buffers::{BufferViewRecord, RawBuffer};
use crate::assets::loaders::gltf::document;
use crate::assets::loaders::gltf::hierarchy::{NodeHierarchy, TreeNode};
use crate::errors::{ImportError, ImportWarning, Result};
use crate::scene::{Joint, JointPose, Skeleton};

/// A validated skin.
#[derive(Debug, Clone, PartialEq)]
pub struct SkinRecord {
    pub index: usize,
    pub name: Option<String>,
    pub joints: Vec<usize>,
    pub skeleton_hint: Option<usize>,
    /// One matrix per joint slot; identity when the skin has none.
    pub inverse_bind_matrices: Vec<Mat4>,
}

fn skin_error(index: usize, reason: impl Into<String>) -> ImportError {
    ImportError::InvalidSkin {
        index,
        reason: reason.into(),
    }
}

/// Validates skins and decodes their inverse bind matrices.
pub fn parse_skins(
    skins: &[document::Skin],
    node_count: usize,
    accessors: &[AccessorRecord],
    views: &[BufferViewRecord],
    buffers: &[RawBuffer],
) -> Result<Vec<SkinRecord>> {
    skins
        .iter()
        .enumerate()
        .map(|(index, skin)| {
            if skin.joints.is_empty() {
                return Err(skin_error(index, "skin has no joints"));
            }
            if let Some(&joint) = skin.joints.iter().find(|&&joint| joint >= node_count) {
                return Err(ImportError::out_of_bounds(format!("skin {index} joint"), joint));
            }
            if let Some(hint) = skin.skeleton.filter(|&hint| hint >= node_count) {
                return Err(ImportError::out_of_bounds(format!("skin {index} skeleton"), hint));
            }

            let inverse_bind_matrices = match skin.inverse_bind_matrices {
                Some(accessor_index) => {
                    let decoded = accessor::decode_index(accessor_index, accessors, views, buffers)?;
                    if decoded.component_type != ComponentType::Float || decoded.shape != ElementShape::Mat4 {
                        return Err(skin_error(index, "inverseBindMatrices must be float MAT4"));
                    }
                    if decoded.count != skin.joints.len() {
                        return Err(skin_error(
                            index,
                            format!(
                                "{} inverse bind matrices for {} joints",
                                decoded.count,
                                skin.joints.len()
                            ),
                        ));
                    }
                    decoded
                        .to_f32()
                        .chunks_exact(16)
                        .map(Mat4::from_cols_slice)
                        .collect()
                }
                None => vec![Mat4::IDENTITY; skin.joints.len()],
            };

            Ok(SkinRecord {
                index,
                name: skin.name.clone(),
                joints: skin.joints.clone(),
                skeleton_hint: skin.skeleton,
                inverse_bind_matrices,
            })
        })
        .collect()
}

/// Lowest common ancestor of `nodes`.
///
/// Returns `None` when the nodes do not share an ultimate root (or the list
/// is empty). Fails on cyclic ancestor chains.
pub fn multi_lca(hierarchy: &NodeHierarchy, nodes: &[usize]) -> Result<Option<usize>> {
    let paths = nodes
        .iter()
        .map(|&node| hierarchy.ancestor_path(node))
        .collect::<Result<Vec<_>>>()?;

    let Some(first) = paths.first() else {
        return Ok(None);
    };
    if paths.iter().any(|path| path[0] != first[0]) {
        return Ok(None);
    }

    let shortest = paths.iter().map(Vec::len).min().unwrap_or(0);
    let mut lca = first[0];
    for depth in 0..shortest {
        let candidate = first[depth];
        if paths.iter().all(|path| path[depth] == candidate) {
            lca = candidate;
        } else {
            break;
        }
    }
    Ok(Some(lca))
}

/// Builds the skeleton of `skin`.
///
/// Re-flags `hierarchy` with this skin's joints before walking it.
pub fn build_skeleton(
    skin: &SkinRecord,
    hierarchy: &mut NodeHierarchy,
    tree: &[TreeNode],
    warnings: &mut Vec<ImportWarning>,
) -> Result<Skeleton> {
    hierarchy.clear_joint_marks();
    hierarchy.mark_joints(&skin.joints);

    let name = skin
        .name
        .clone()
        .unwrap_or_else(|| format!("skin_{}", skin.index));

    let mut builder = JointBuilder {
        skin,
        hierarchy,
        tree,
        joints: Vec::new(),
        local_of_node: FxHashMap::default(),
    };

    let lca = multi_lca(builder.hierarchy, &skin.joints)?;
    let synthetic_root = match lca {
        Some(root) => {
            builder.walk(root, None);
            false
        }
        None => {
            builder.joints.push(Joint {
                name: format!("{name}_root"),
                node: None,
                parent: None,
                inverse_bind_matrix: Mat4::IDENTITY,
                rest: JointPose::IDENTITY,
            });

            let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
            for &joint in &skin.joints {
                let root = builder.hierarchy.ancestor_path(joint)?[0];
                groups.entry(root).or_default().push(joint);
            }
            for group in groups.values() {
                let group_root = multi_lca(builder.hierarchy, group)?
                    .ok_or_else(|| skin_error(skin.index, "joint group without a common root"))?;
                builder.walk(group_root, Some(0));
            }
            log::debug!(
                "Skin {} spans {} disjoint trees, added a synthetic root",
                skin.index,
                groups.len()
            );
            true
        }
    };

    if let Some(hint) = skin.skeleton_hint {
        let consistent = match lca {
            Some(root) => builder.hierarchy.ancestor_path(root)?.contains(&hint),
            None => false,
        };
        if !consistent {
            let warning = ImportWarning::SkeletonHintMismatch {
                skin: skin.index,
                hint,
                computed: lca,
            };
            log::warn!("{warning}");
            warnings.push(warning);
        }
    }

    let remap = skin
        .joints
        .iter()
        .map(|node| {
            builder
                .local_of_node
                .get(node)
                .copied()
                .ok_or_else(|| skin_error(skin.index, format!("joint node {node} not reached")))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Skeleton {
        name,
        skin: skin.index,
        joints: builder.joints,
        synthetic_root,
        remap,
    })
}

struct JointBuilder<'a> {
    skin: &'a SkinRecord,
    hierarchy: &'a NodeHierarchy,
    tree: &'a [TreeNode],
    joints: Vec<Joint>,
    local_of_node: FxHashMap<usize, usize>,
}

impl JointBuilder<'_> {
    /// Depth-first walk over flagged nodes below (and including) `root`.
    fn walk(&mut self, root: usize, parent: Option<usize>) {
        let mut stack = vec![(root, parent)];
        while let Some((node, parent)) = stack.pop() {
            if self.local_of_node.contains_key(&node) {
                continue;
            }

            let local = self.joints.len();
            let record = &self.tree[node];
            let inverse_bind_matrix = self
                .skin
                .joints
                .iter()
                .position(|&joint| joint == node)
                .map_or(Mat4::IDENTITY, |slot| self.skin.inverse_bind_matrices[slot]);

            self.joints.push(Joint {
                name: record.name.clone().unwrap_or_else(|| format!("joint_{node}")),
                node: Some(node),
                parent,
                inverse_bind_matrix,
                rest: JointPose {
                    translation: record.transform.position,
                    rotation: record.transform.rotation,
                    scale: record.transform.scale,
                },
            });
            self.local_of_node.insert(node, local);

            for &child in self.hierarchy.children(node).iter().rev() {
                if self.hierarchy.has_joints(child) {
                    stack.push((child, Some(local)));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hierarchy(children: &[&[usize]]) -> (Vec<TreeNode>, NodeHierarchy) {
        let tree: Vec<TreeNode> = children
            .iter()
            .enumerate()
            .map(|(index, children)| {
                let node = document::Node {
                    children: children.to_vec(),
                    ..document::Node::default()
                };
                TreeNode::from_document(index, &node)
            })
            .collect();
        let hierarchy = NodeHierarchy::build(&tree, &mut Vec::new());
        (tree, hierarchy)
    }

    #[test]
    fn lca_of_siblings_is_their_parent() {
        let (_, hierarchy) = hierarchy(&[&[1], &[2, 3], &[], &[]]);
        assert_eq!(multi_lca(&hierarchy, &[2, 3]).unwrap(), Some(1));
        assert_eq!(multi_lca(&hierarchy, &[1, 3]).unwrap(), Some(1));
        assert_eq!(multi_lca(&hierarchy, &[]).unwrap(), None);
    }

    #[test]
    fn disjoint_roots_have_no_lca() {
        let (_, hierarchy) = hierarchy(&[&[1], &[], &[3], &[]]);
        assert_eq!(multi_lca(&hierarchy, &[1, 3]).unwrap(), None);
    }

    #[test]
    fn depth_first_numbering_includes_intermediate_nodes() {
        // 0 -> 1 -> 2 -> 3, skin lists [3, 1].
        let (tree, mut hierarchy) = hierarchy(&[&[1], &[2], &[3], &[]]);
        let skin = SkinRecord {
            index: 0,
            name: None,
            joints: vec![3, 1],
            skeleton_hint: None,
            inverse_bind_matrices: vec![Mat4::from_scale(glam::Vec3::splat(2.0)), Mat4::IDENTITY],
        };
        let skeleton = build_skeleton(&skin, &mut hierarchy, &tree, &mut Vec::new()).unwrap();

        let nodes: Vec<_> = skeleton.joints.iter().map(|j| j.node).collect();
        assert_eq!(nodes, vec![Some(1), Some(2), Some(3)]);
        assert_eq!(skeleton.remap, vec![2, 0]);
        assert_eq!(skeleton.joints[1].inverse_bind_matrix, Mat4::IDENTITY);
        assert_eq!(skeleton.joints[2].inverse_bind_matrix, skin.inverse_bind_matrices[0]);
    }
}
