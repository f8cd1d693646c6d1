use glam::Affine3A;
use slotmap::SlotMap;

use crate::scene::camera::Camera;
use crate::scene::light::Light;
use crate::scene::node::Node;
use crate::scene::skeleton::Skeleton;
use crate::scene::{CameraKey, LightKey, NodeHandle, SkeletonKey};

/// Scene graph container.
///
/// Nodes live in a `SlotMap` arena and reference each other by
/// [`NodeHandle`]; components (cameras, lights, skeletons) are stored in
/// their own pools and attached to nodes by key.
#[derive(Debug, Default)]
pub struct Scene {
    pub name: Option<String>,

    pub nodes: SlotMap<NodeHandle, Node>,
    pub root_nodes: Vec<NodeHandle>,

    // === Component pools ===
    pub cameras: SlotMap<CameraKey, Camera>,
    pub lights: SlotMap<LightKey, Light>,
    pub skeletons: SlotMap<SkeletonKey, Skeleton>,
}

impl Scene {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Nodes & hierarchy
    // ========================================================================

    /// Inserts a parentless node and registers it as a root.
    pub fn add_node(&mut self, node: Node) -> NodeHandle {
        let handle = self.nodes.insert(node);
        self.root_nodes.push(handle);
        handle
    }

    /// Inserts a node under `parent`.
    pub fn add_to_parent(&mut self, node: Node, parent: NodeHandle) -> NodeHandle {
        let handle = self.nodes.insert(node);
        self.link(handle, parent);
        handle
    }

    /// Moves `child` under `parent`, detaching it from its previous parent.
    ///
    /// Attaching a node to itself or to one of its descendants is ignored.
    pub fn attach(&mut self, child: NodeHandle, parent: NodeHandle) {
        if child == parent || self.is_ancestor(child, parent) {
            log::warn!("Refusing to attach a node below itself");
            return;
        }
        if !self.nodes.contains_key(child) || !self.nodes.contains_key(parent) {
            return;
        }

        match self.nodes[child].parent {
            Some(old) => {
                if let Some(old_parent) = self.nodes.get_mut(old) {
                    old_parent.children.retain(|&c| c != child);
                }
            }
            None => self.root_nodes.retain(|&r| r != child),
        }

        self.link(child, parent);
    }

    fn link(&mut self, child: NodeHandle, parent: NodeHandle) {
        if let Some(node) = self.nodes.get_mut(child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.nodes.get_mut(parent) {
            node.children.push(child);
        }
    }

    /// Returns `true` if `ancestor` is on the parent chain of `node`.
    #[must_use]
    pub fn is_ancestor(&self, ancestor: NodeHandle, node: NodeHandle) -> bool {
        let mut current = self.nodes.get(node).and_then(Node::parent);
        while let Some(handle) = current {
            if handle == ancestor {
                return true;
            }
            current = self.nodes.get(handle).and_then(Node::parent);
        }
        false
    }

    #[inline]
    #[must_use]
    pub fn get_node(&self, handle: NodeHandle) -> Option<&Node> {
        self.nodes.get(handle)
    }

    #[inline]
    pub fn get_node_mut(&mut self, handle: NodeHandle) -> Option<&mut Node> {
        self.nodes.get_mut(handle)
    }

    /// First node with the given name.
    #[must_use]
    pub fn find_node_by_name(&self, name: &str) -> Option<NodeHandle> {
        self.nodes
            .iter()
            .find(|(_, node)| node.name() == Some(name))
            .map(|(handle, _)| handle)
    }

    /// Depth-first list of `root` and all of its descendants.
    #[must_use]
    pub fn descendants(&self, root: NodeHandle) -> Vec<NodeHandle> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(handle) = stack.pop() {
            let Some(node) = self.nodes.get(handle) else {
                continue;
            };
            out.push(handle);
            stack.extend(node.children.iter().rev().copied());
        }
        out
    }

    // ========================================================================
    // Components
    // ========================================================================

    pub fn add_camera(&mut self, node: NodeHandle, camera: Camera) -> CameraKey {
        let key = self.cameras.insert(camera);
        if let Some(node) = self.nodes.get_mut(node) {
            node.camera = Some(key);
        }
        key
    }

    pub fn add_light(&mut self, node: NodeHandle, light: Light) -> LightKey {
        let key = self.lights.insert(light);
        if let Some(node) = self.nodes.get_mut(node) {
            node.light = Some(key);
        }
        key
    }

    pub fn add_skeleton(&mut self, skeleton: Skeleton) -> SkeletonKey {
        self.skeletons.insert(skeleton)
    }

    // ========================================================================
    // Transforms
    // ========================================================================

    /// Recomputes every node's world matrix from the local transforms.
    pub fn update_world_matrices(&mut self) {
        let mut stack: Vec<(NodeHandle, Affine3A)> = self
            .root_nodes
            .iter()
            .map(|&root| (root, Affine3A::IDENTITY))
            .collect();

        while let Some((handle, parent_world)) = stack.pop() {
            let Some(node) = self.nodes.get_mut(handle) else {
                continue;
            };
            node.transform.update_local_matrix();
            let world = parent_world * node.transform.local_matrix;
            node.transform.world_matrix = world;
            stack.extend(node.children.iter().map(|&child| (child, world)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn attach_moves_node_between_parents() {
        let mut scene = Scene::new();
        let a = scene.add_node(Node::new(Some("a".into())));
        let b = scene.add_node(Node::new(Some("b".into())));
        let c = scene.add_to_parent(Node::new(None), a);

        scene.attach(c, b);
        assert!(scene.nodes[a].children().is_empty());
        assert_eq!(scene.nodes[b].children(), &[c]);
        assert_eq!(scene.nodes[c].parent(), Some(b));

        scene.attach(b, c);
        assert_eq!(scene.nodes[b].parent(), None);
    }

    #[test]
    fn world_matrices_compose_along_the_chain() {
        let mut scene = Scene::new();
        let mut parent = Node::new(None);
        parent.transform.position = Vec3::X;
        let parent = scene.add_node(parent);
        let mut child = Node::new(None);
        child.transform.position = Vec3::Y;
        let child = scene.add_to_parent(child, parent);

        scene.update_world_matrices();
        let world = scene.nodes[child].transform.world_matrix();
        assert_eq!(Vec3::from(world.translation), Vec3::new(1.0, 1.0, 0.0));
    }
}
