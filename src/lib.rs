#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

//! glTF 2.0 scene-graph assembly and animation baking.
//!
//! [`GltfLoader`] reads a `.gltf` / `.glb` asset and produces an
//! [`ImportedAsset`]: a node arena with cameras, lights and skeletons, baked
//! animation clips with their scene mappings, decoded mesh data and material
//! records.

pub mod animation;
pub mod assets;
pub mod errors;
pub mod scene;

pub use animation::{AnimationClip, AnimationMapping, Channel, ChannelComponent, Keyframe, MappingTarget};
pub use assets::{GltfLoader, ImportOptions, ImportedAsset, PendingImport, SceneRoot};
pub use errors::{ErrorCategory, ImportError, ImportWarning, Result};
pub use scene::{Camera, Light, Node, NodeHandle, Scene, Skeleton};
