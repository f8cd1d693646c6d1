//! Node graph construction.
//!
//! glTF nodes are first linked into a transient [`NodeHierarchy`] (indices
//! only) so graph algorithms can run before any entity exists. Entities are
//! then created by climbing from every leaf towards its root, which creates
//! each node exactly once and never duplicates a shared subtree.

use glam::{Quat, Vec3};
use smallvec::SmallVec;

use crate::assets::loaders::gltf::document;
use crate::errors::{ImportError, ImportWarning, Result};
use crate::scene::{Node, NodeHandle, Scene, SkeletonKey, Transform};

/// Joint created for a glTF node in one skeleton.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JointHandle {
    pub skin: usize,
    pub skeleton: SkeletonKey,
    /// Skeleton-local joint index.
    pub joint: usize,
}

/// Per-node record of the parse context.
///
/// Filled from the document, then updated in place while materializing: it
/// receives the node's entity handle and one [`JointHandle`] per skin that
/// uses it as a joint.
#[derive(Debug, Clone)]
pub struct TreeNode {
    pub index: usize,
    pub name: Option<String>,
    pub transform: Transform,
    pub children: Vec<usize>,
    pub mesh: Option<usize>,
    pub camera: Option<usize>,
    pub skin: Option<usize>,
    pub light: Option<usize>,
    /// `KDAB_kuesa_layers` indices.
    pub layers: SmallVec<[usize; 2]>,
    pub morph_weights: Option<Vec<f32>>,

    pub entity: Option<NodeHandle>,
    pub joints: SmallVec<[JointHandle; 1]>,
    pub is_root_node: bool,
}

impl TreeNode {
    /// Builds the record for node `index`.
    ///
    /// A `matrix` wins over TRS properties.
    #[must_use]
    pub fn from_document(index: usize, node: &document::Node) -> Self {
        let transform = match node.matrix {
            Some(matrix) => Transform::from_cols_array(&matrix),
            None => Transform::from_scale_rotation_translation(
                node.scale.map_or(Vec3::ONE, Vec3::from),
                node.rotation.map_or(Quat::IDENTITY, Quat::from_array),
                node.translation.map_or(Vec3::ZERO, Vec3::from),
            ),
        };
        if !transform.trs_matches_matrix() {
            log::warn!("Node {index}: matrix is not a pure TRS; its decomposed translation/rotation/scale are approximate");
        }

        Self {
            index,
            name: node.name.clone(),
            transform,
            children: node.children.clone(),
            mesh: node.mesh,
            camera: node.camera,
            skin: node.skin,
            light: node.extensions.light.map(|light| light.light),
            layers: node
                .extensions
                .layers
                .as_ref()
                .map(|layers| layers.layers.iter().copied().collect())
                .unwrap_or_default(),
            morph_weights: node.weights.clone(),
            entity: None,
            joints: SmallVec::new(),
            is_root_node: false,
        }
    }

    /// Joint index of this node in the given skin, if it is one of its joints.
    #[must_use]
    pub fn joint_in_skin(&self, skin: usize) -> Option<&JointHandle> {
        self.joints.iter().find(|handle| handle.skin == skin)
    }
}

/// Transient graph node used before entities exist.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HierarchyNode {
    pub node_idx: usize,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    pub has_joints: bool,
}

/// Index-only node graph.
#[derive(Debug, Clone, Default)]
pub struct NodeHierarchy {
    nodes: Vec<HierarchyNode>,
}

impl NodeHierarchy {
    /// Links nodes from their children lists.
    ///
    /// Out-of-range, self-referencing and duplicate child references are
    /// reported as warnings and skipped.
    #[must_use]
    pub fn build(tree: &[TreeNode], warnings: &mut Vec<ImportWarning>) -> Self {
        let mut nodes: Vec<HierarchyNode> = (0..tree.len())
            .map(|node_idx| HierarchyNode {
                node_idx,
                ..HierarchyNode::default()
            })
            .collect();

        for (index, node) in tree.iter().enumerate() {
            for &child in &node.children {
                let warning = if child >= nodes.len() {
                    Some(ImportWarning::ChildOutOfRange { node: index, child })
                } else if child == index {
                    Some(ImportWarning::SelfChild { node: index })
                } else if nodes[child].parent.is_some() {
                    Some(ImportWarning::DuplicateChild { node: index, child })
                } else {
                    None
                };

                if let Some(warning) = warning {
                    log::warn!("{warning}");
                    warnings.push(warning);
                    continue;
                }

                nodes[child].parent = Some(index);
                nodes[index].children.push(child);
            }
        }

        Self { nodes }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&HierarchyNode> {
        self.nodes.get(index)
    }

    #[inline]
    #[must_use]
    pub fn parent(&self, index: usize) -> Option<usize> {
        self.nodes.get(index).and_then(|node| node.parent)
    }

    #[must_use]
    pub fn children(&self, index: usize) -> &[usize] {
        self.nodes.get(index).map_or(&[], |node| &node.children)
    }

    #[inline]
    #[must_use]
    pub fn has_joints(&self, index: usize) -> bool {
        self.nodes.get(index).is_some_and(|node| node.has_joints)
    }

    /// Nodes without children, in index order.
    pub fn leaves(&self) -> impl Iterator<Item = usize> + '_ {
        self.nodes
            .iter()
            .filter(|node| node.children.is_empty())
            .map(|node| node.node_idx)
    }

    /// Path from the ultimate root down to `index` (both included).
    ///
    /// Fails on a cyclic parent chain.
    pub fn ancestor_path(&self, index: usize) -> Result<Vec<usize>> {
        if index >= self.nodes.len() {
            return Err(ImportError::out_of_bounds("node", index));
        }

        let mut path = vec![index];
        let mut current = index;
        while let Some(parent) = self.nodes[current].parent {
            if path.len() > self.nodes.len() {
                return Err(ImportError::Malformed(format!(
                    "node {index} has a cyclic ancestor chain"
                )));
            }
            path.push(parent);
            current = parent;
        }
        path.reverse();
        Ok(path)
    }

    /// Flags every node in `joints` and all of their ancestors.
    pub fn mark_joints(&mut self, joints: &[usize]) {
        for &joint in joints {
            let mut current = Some(joint);
            while let Some(index) = current {
                let Some(node) = self.nodes.get_mut(index) else {
                    break;
                };
                if node.has_joints {
                    break;
                }
                node.has_joints = true;
                current = node.parent;
            }
        }
    }

    pub fn clear_joint_marks(&mut self) {
        for node in &mut self.nodes {
            node.has_joints = false;
        }
    }
}

/// Creates one entity per reachable node and wires the entity hierarchy.
///
/// Returns the root entities in creation order. Nodes that are never reached
/// (pure cycles) are reported as [`ImportWarning::UnreachableNode`].
pub fn materialize_entities(
    tree: &mut [TreeNode],
    hierarchy: &NodeHierarchy,
    scene: &mut Scene,
    warnings: &mut Vec<ImportWarning>,
) -> Vec<NodeHandle> {
    let mut roots = Vec::new();

    let leaves: Vec<usize> = hierarchy.leaves().collect();
    for leaf in leaves {
        let mut previous: Option<NodeHandle> = None;
        let mut current = leaf;

        loop {
            if let Some(entity) = tree[current].entity {
                if let Some(child) = previous {
                    scene.attach(child, entity);
                }
                break;
            }

            let record = &tree[current];
            let mut node = Node::new(record.name.clone());
            node.transform = record.transform.clone();
            let entity = scene.add_node(node);
            tree[current].entity = Some(entity);

            if let Some(child) = previous {
                scene.attach(child, entity);
            }
            previous = Some(entity);

            match hierarchy.parent(current) {
                Some(parent) => current = parent,
                None => {
                    tree[current].is_root_node = true;
                    roots.push(entity);
                    break;
                }
            }
        }
    }

    // Restore document order for children.
    for record in tree.iter() {
        let Some(entity) = record.entity else {
            continue;
        };
        let ordered: Vec<NodeHandle> = hierarchy
            .children(record.index)
            .iter()
            .filter_map(|&child| tree[child].entity)
            .collect();
        if let Some(node) = scene.get_node_mut(entity)
            && node.children.len() == ordered.len()
        {
            node.children = ordered;
        }
    }

    for record in tree.iter().filter(|record| record.entity.is_none()) {
        let warning = ImportWarning::UnreachableNode { node: record.index };
        log::warn!("{warning}");
        warnings.push(warning);
    }

    log::debug!("Materialized {} node entities, {} roots", tree.len(), roots.len());
    roots
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(children: &[&[usize]]) -> Vec<TreeNode> {
        children
            .iter()
            .enumerate()
            .map(|(index, children)| {
                let node = document::Node {
                    children: children.to_vec(),
                    ..document::Node::default()
                };
                TreeNode::from_document(index, &node)
            })
            .collect()
    }

    #[test]
    fn bad_child_references_are_skipped() {
        let nodes = tree(&[&[0, 1, 9], &[], &[1]]);
        let mut warnings = Vec::new();
        let hierarchy = NodeHierarchy::build(&nodes, &mut warnings);

        assert_eq!(hierarchy.children(0), &[1]);
        assert!(hierarchy.children(2).is_empty());
        assert_eq!(warnings.len(), 3);
    }

    #[test]
    fn cyclic_chain_is_rejected() {
        // 0 -> 1 -> 2 -> 0 cannot be linked fully: 0 already parents 1, and
        // 2 listing 0 gives 0 a parent, closing the cycle.
        let nodes = tree(&[&[1], &[2], &[0]]);
        let mut warnings = Vec::new();
        let hierarchy = NodeHierarchy::build(&nodes, &mut warnings);
        assert!(hierarchy.ancestor_path(1).is_err());
    }

    #[test]
    fn pure_cycle_is_unreachable() {
        let mut nodes = tree(&[&[1], &[0], &[]]);
        let mut warnings = Vec::new();
        let hierarchy = NodeHierarchy::build(&nodes, &mut warnings);
        let mut scene = Scene::new();
        let roots = materialize_entities(&mut nodes, &hierarchy, &mut scene, &mut warnings);

        assert_eq!(roots.len(), 1);
        assert_eq!(
            warnings
                .iter()
                .filter(|w| matches!(w, ImportWarning::UnreachableNode { .. }))
                .count(),
            2
        );
    }
}
