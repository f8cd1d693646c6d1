//! Animation Baking
//!
//! - [`registry`]: animatable properties and their scene resolvers
//! - [`baker`]: glTF samplers to per-component keyframe lists
//! - [`keyframes`]: scalar keyframes and cursor-based sampling
//! - [`clip`]: baked channels grouped per animation
//! - [`mapping`]: channel names bound to materialized scene objects

pub mod baker;
pub mod clip;
pub mod keyframes;
pub mod mapping;
pub mod registry;

pub use baker::{BakeSources, InterpolationMode, bake_animation};
pub use clip::{AnimationClip, AnimationTarget, Channel};
pub use keyframes::{ChannelComponent, Interpolation, Keyframe, KeyframeCursor};
pub use mapping::{AnimationMapping, ChannelMapping, MappingScope, MappingTarget, generate_mapping};
pub use registry::{
    CameraProperty, LightProperty, MaterialProperty, PropertyInfo, TargetResolver, TargetType,
    TransformProperty,
};
