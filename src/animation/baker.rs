//! Animation channel baking.
//!
//! glTF samplers store keyframes as an input (time) accessor and an output
//! (value) accessor. Baking splits each output element into per-component
//! scalar keyframe lists, converting cubic-spline tangents into Bézier
//! handles along the way.

use glam::Vec2;
use rustc_hash::FxHashSet;

use crate::animation::clip::{AnimationClip, AnimationTarget, Channel};
use crate::animation::keyframes::{ChannelComponent, Keyframe};
use crate::animation::registry::{self, PropertyInfo, TargetType};
use crate::assets::loaders::gltf::accessor::{self, AccessorRecord, ComponentType, ElementShape};
use crate::assets::loaders::gltf::buffers::{BufferViewRecord, RawBuffer};
use crate::assets::loaders::gltf::document;
use crate::errors::{ImportError, ImportWarning, Result};

/// Sampler interpolation keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpolationMode {
    Step,
    Linear,
    CubicSpline,
}

impl InterpolationMode {
    #[must_use]
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "STEP" => Some(Self::Step),
            "LINEAR" => Some(Self::Linear),
            "CUBICSPLINE" => Some(Self::CubicSpline),
            _ => None,
        }
    }

    /// Output elements stored per keyframe.
    #[inline]
    #[must_use]
    pub fn elements_per_keyframe(self) -> usize {
        match self {
            Self::CubicSpline => 3,
            Self::Step | Self::Linear => 1,
        }
    }
}

/// Parse-context data the baker reads from.
#[derive(Debug, Clone, Copy)]
pub struct BakeSources<'a> {
    pub accessors: &'a [AccessorRecord],
    pub views: &'a [BufferViewRecord],
    pub buffers: &'a [RawBuffer],
    /// Mesh referenced by each node.
    pub node_meshes: &'a [Option<usize>],
    /// Morph target count of each mesh.
    pub morph_target_counts: &'a [usize],
    pub camera_count: usize,
    pub light_count: usize,
    pub material_count: usize,
}

impl BakeSources<'_> {
    fn target_count(&self, target_type: TargetType) -> usize {
        match target_type {
            TargetType::Node => self.node_meshes.len(),
            TargetType::Camera => self.camera_count,
            TargetType::Light => self.light_count,
            TargetType::Material => self.material_count,
        }
    }

    fn morph_target_count(&self, node: usize) -> Option<usize> {
        let mesh = (*self.node_meshes.get(node)?)?;
        self.morph_target_counts.get(mesh).copied()
    }
}

/// A channel before baking.
#[derive(Debug, Clone)]
struct PendingChannel {
    target_type: TargetType,
    target_id: usize,
    path: String,
    sampler: usize,
}

/// Bakes animation `index`. Any invalid channel rejects the whole animation.
pub fn bake_animation(
    index: usize,
    animation: &document::Animation,
    sources: &BakeSources<'_>,
    warnings: &mut Vec<ImportWarning>,
) -> Result<AnimationClip> {
    let name = animation
        .name
        .clone()
        .unwrap_or_else(|| format!("animation_{index}"));
    let fail = |reason: String| ImportError::InvalidAnimation {
        animation: name.clone(),
        reason,
    };

    let mut extension_channels = Vec::new();
    if let Some(property_animation) = &animation.extensions.property_animation {
        for channel in &property_animation.channels {
            let path = registry::parse_property_path(&channel.target)
                .ok_or_else(|| fail(format!("invalid property pointer '{}'", channel.target)))?;
            extension_channels.push(PendingChannel {
                target_type: path.target_type,
                target_id: path.index,
                path: path.property,
                sampler: channel.sampler,
            });
        }
    }
    let overriding: FxHashSet<usize> = extension_channels.iter().map(|c| c.sampler).collect();

    let mut pending = Vec::with_capacity(animation.channels.len() + extension_channels.len());
    for channel in &animation.channels {
        if overriding.contains(&channel.sampler) {
            let warning = ImportWarning::ChannelOverridden {
                animation: name.clone(),
                sampler: channel.sampler,
            };
            log::warn!("{warning}");
            warnings.push(warning);
            continue;
        }
        let Some(node) = channel.target.node else {
            log::debug!("Animation '{name}': channel without a target node ignored");
            continue;
        };
        pending.push(PendingChannel {
            target_type: TargetType::Node,
            target_id: node,
            path: channel.target.path.clone(),
            sampler: channel.sampler,
        });
    }
    pending.extend(extension_channels);

    let mut channels = Vec::with_capacity(pending.len());
    for channel in &pending {
        let info = registry::lookup(channel.target_type, &channel.path).ok_or_else(|| {
            fail(format!(
                "unregistered {:?} property '{}'",
                channel.target_type, channel.path
            ))
        })?;
        if channel.target_id >= sources.target_count(channel.target_type) {
            return Err(fail(format!(
                "{:?} target {} out of range",
                channel.target_type, channel.target_id
            )));
        }
        let sampler = animation
            .samplers
            .get(channel.sampler)
            .ok_or_else(|| fail(format!("sampler {} out of range", channel.sampler)))?;

        let baked = bake_channel(info, channel.target_id, sampler, sources).map_err(|err| match err {
            ImportError::Malformed(reason) => fail(reason),
            other => other,
        })?;
        channels.push(baked);
    }

    log::debug!("Baked animation '{name}' with {} channels", channels.len());
    Ok(AnimationClip::new(name, channels))
}

/// Bakes one channel. Semantic failures are reported as
/// [`ImportError::Malformed`] and rewrapped by the caller.
fn bake_channel(
    info: &PropertyInfo,
    target_id: usize,
    sampler: &document::AnimationSampler,
    sources: &BakeSources<'_>,
) -> Result<Channel> {
    let malformed = |reason: String| ImportError::Malformed(reason);

    let mode = InterpolationMode::from_keyword(&sampler.interpolation)
        .ok_or_else(|| malformed(format!("unknown interpolation '{}'", sampler.interpolation)))?;

    let input = accessor::decode_index(sampler.input, sources.accessors, sources.views, sources.buffers)?;
    if input.component_type != ComponentType::Float || input.shape != ElementShape::Scalar {
        return Err(malformed(format!(
            "sampler input accessor {} must be scalar float",
            sampler.input
        )));
    }
    let times = input.to_f32();

    let output = accessor::decode_index(sampler.output, sources.accessors, sources.views, sources.buffers)?;
    let nb_components = output.components();
    if nb_components != info.components {
        return Err(malformed(format!(
            "'{}' expects {} components per value, sampler output has {nb_components}",
            info.path, info.components
        )));
    }
    let values = output.to_normalized_f32();

    let width = if info.is_morph_weights() {
        sources
            .morph_target_count(target_id)
            .filter(|&count| count > 0)
            .ok_or_else(|| malformed(format!("node {target_id} has no morph targets to animate")))?
    } else {
        nb_components
    };

    let per_key = mode.elements_per_keyframe();
    let expected = times.len() * per_key * width;
    if values.len() != expected {
        return Err(malformed(format!(
            "'{}' needs {expected} output values for {} keyframes, found {}",
            info.path,
            times.len(),
            values.len()
        )));
    }

    let order: Vec<usize> = if info.is_rotation() {
        vec![3, 0, 1, 2]
    } else {
        (0..width).collect()
    };

    let components = order
        .iter()
        .enumerate()
        .map(|(slot, &component)| {
            let keyframes = bake_component(&times, &values, width, component, mode);
            ChannelComponent::new(info.component_name(slot), keyframes)
        })
        .collect();

    Ok(Channel {
        name: info.channel_name(target_id),
        target: AnimationTarget {
            target_type: info.target_type,
            target_id,
            path: info.path.to_string(),
        },
        components,
    })
}

/// Builds the keyframes of one component.
///
/// Cubic-spline keyframes store `in-tangent, value, out-tangent`; the
/// tangents become handles one third of the neighbouring interval away.
/// The open side of the first and last keyframe gets a zero offset.
#[must_use]
pub fn bake_component(
    times: &[f32],
    values: &[f32],
    width: usize,
    component: usize,
    mode: InterpolationMode,
) -> Vec<Keyframe> {
    let count = times.len();
    (0..count)
        .map(|k| {
            let time = times[k];
            match mode {
                InterpolationMode::Step => Keyframe::constant(time, values[k * width + component]),
                InterpolationMode::Linear => Keyframe::linear(time, values[k * width + component]),
                InterpolationMode::CubicSpline => {
                    let base = k * 3 * width;
                    let in_tangent = values[base + component];
                    let value = values[base + width + component];
                    let out_tangent = values[base + 2 * width + component];

                    let left_dt = if k > 0 { (time - times[k - 1]) / 3.0 } else { 0.0 };
                    let right_dt = if k + 1 < count { (times[k + 1] - time) / 3.0 } else { 0.0 };

                    Keyframe::bezier(
                        time,
                        value,
                        Vec2::new(time - left_dt, value - left_dt * in_tangent),
                        Vec2::new(time + right_dt, value + right_dt * out_tangent),
                    )
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpolation_keywords() {
        assert_eq!(InterpolationMode::from_keyword("STEP"), Some(InterpolationMode::Step));
        assert_eq!(
            InterpolationMode::from_keyword("CUBICSPLINE"),
            Some(InterpolationMode::CubicSpline)
        );
        assert_eq!(InterpolationMode::from_keyword("linear"), None);
    }

    #[test]
    fn cubic_middle_keyframe_handles() {
        // Times 0, 3, 9; component values (in, value, out) per keyframe.
        let times = [0.0, 3.0, 9.0];
        let values = [0.0, 1.0, 0.0, 2.0, 5.0, 4.0, 0.0, 7.0, 0.0];
        let keys = bake_component(&times, &values, 1, 0, InterpolationMode::CubicSpline);

        assert_eq!(keys[1].left_handle, Vec2::new(2.0, 5.0 - 1.0 * 2.0));
        assert_eq!(keys[1].right_handle, Vec2::new(5.0, 5.0 + 2.0 * 4.0));
        assert_eq!(keys[0].left_handle, Vec2::new(0.0, 1.0));
        assert_eq!(keys[2].right_handle, Vec2::new(9.0, 7.0));
    }
}
