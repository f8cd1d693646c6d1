use glam::{Affine3A, Mat4, Quat, Vec3};

/// Rest pose of a joint, relative to its parent joint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointPose {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl JointPose {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    #[must_use]
    pub fn to_affine(&self) -> Affine3A {
        Affine3A::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

impl Default for JointPose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// One joint of a [`Skeleton`].
#[derive(Debug, Clone, PartialEq)]
pub struct Joint {
    pub name: String,
    /// glTF node index; `None` for a synthetic root.
    pub node: Option<usize>,
    /// Parent joint index inside the skeleton.
    pub parent: Option<usize>,
    pub inverse_bind_matrix: Mat4,
    pub rest: JointPose,
}

/// A skeleton built from a glTF skin.
///
/// Joints are stored depth first, so a parent always precedes its children.
/// When the skin's joints have no common ancestor, index 0 is a synthetic
/// root that parents every disjoint joint tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Skeleton {
    pub name: String,
    /// glTF skin index.
    pub skin: usize,
    pub joints: Vec<Joint>,
    pub synthetic_root: bool,
    /// `remap[slot]` is the skeleton-local index of `skin.joints[slot]`.
    pub remap: Vec<usize>,
}

impl Skeleton {
    #[inline]
    #[must_use]
    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    /// Root joint (index 0).
    #[must_use]
    pub fn root(&self) -> Option<&Joint> {
        self.joints.first()
    }

    /// Skeleton-local index of the joint created for glTF node `node`.
    #[must_use]
    pub fn joint_index_of_node(&self, node: usize) -> Option<usize> {
        self.joints.iter().position(|joint| joint.node == Some(node))
    }

    /// Skeleton-local index of a skin joint slot.
    #[must_use]
    pub fn remap_slot(&self, slot: usize) -> Option<usize> {
        self.remap.get(slot).copied()
    }

    pub fn children_of(&self, joint: usize) -> impl Iterator<Item = usize> + '_ {
        self.joints
            .iter()
            .enumerate()
            .filter(move |(_, candidate)| candidate.parent == Some(joint))
            .map(|(index, _)| index)
    }

    /// Rest-pose matrices in skeleton space.
    #[must_use]
    pub fn global_rest_matrices(&self) -> Vec<Affine3A> {
        let mut globals: Vec<Affine3A> = Vec::with_capacity(self.joints.len());
        for joint in &self.joints {
            let local = joint.rest.to_affine();
            let global = match joint.parent {
                Some(parent) => globals[parent] * local,
                None => local,
            };
            globals.push(global);
        }
        globals
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn joint(parent: Option<usize>, translation: Vec3) -> Joint {
        Joint {
            name: String::new(),
            node: None,
            parent,
            inverse_bind_matrix: Mat4::IDENTITY,
            rest: JointPose {
                translation,
                ..JointPose::IDENTITY
            },
        }
    }

    #[test]
    fn global_rest_accumulates_parent_chain() {
        let skeleton = Skeleton {
            name: "s".into(),
            skin: 0,
            joints: vec![
                joint(None, Vec3::X),
                joint(Some(0), Vec3::Y),
                joint(Some(1), Vec3::Z),
            ],
            synthetic_root: false,
            remap: vec![0, 1, 2],
        };
        let globals = skeleton.global_rest_matrices();
        assert_eq!(Vec3::from(globals[2].translation), Vec3::new(1.0, 1.0, 1.0));
        assert_eq!(skeleton.children_of(0).collect::<Vec<_>>(), vec![1]);
    }
}
