//! Scene Graph
//!
//! Host-side objects produced by the importer:
//! - [`Node`]: an entity with a [`Transform`] and optional components
//! - [`Scene`]: arena of nodes plus camera, light and skeleton pools
//! - [`Skeleton`]: joint hierarchy built from a glTF skin

pub mod camera;
pub mod light;
pub mod node;
pub mod scene;
pub mod skeleton;
pub mod transform;

pub use camera::{Camera, Projection};
pub use light::{Light, LightKind, PointLight, SpotLight};
pub use node::{Node, PrimitiveRef};
pub use scene::Scene;
pub use skeleton::{Joint, JointPose, Skeleton};
pub use transform::Transform;

use slotmap::new_key_type;

new_key_type! {
    pub struct NodeHandle;
    pub struct CameraKey;
    pub struct LightKey;
    pub struct SkeletonKey;
}
