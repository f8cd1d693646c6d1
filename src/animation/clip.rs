use crate::animation::keyframes::{ChannelComponent, KeyframeCursor};
use crate::animation::registry::TargetType;

/// The glTF object and property a channel animates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimationTarget {
    pub target_type: TargetType,
    pub target_id: usize,
    /// Registered property path, e.g. `rotation` or `spot/innerConeAngle`.
    pub path: String,
}

/// A baked channel: one keyframe list per scalar component.
#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    /// `{base}_{targetId}`, unique per target property.
    pub name: String,
    pub target: AnimationTarget,
    pub components: Vec<ChannelComponent>,
}

impl Channel {
    /// Samples every component at `time`.
    #[must_use]
    pub fn sample(&self, time: f32) -> Vec<f32> {
        self.components.iter().map(|c| c.sample(time)).collect()
    }

    /// Samples every component, reusing one cursor per component.
    pub fn sample_with_cursors(&self, time: f32, cursors: &mut Vec<KeyframeCursor>) -> Vec<f32> {
        cursors.resize_with(self.components.len(), KeyframeCursor::default);
        self.components
            .iter()
            .zip(cursors.iter_mut())
            .map(|(component, cursor)| component.sample_with_cursor(time, cursor))
            .collect()
    }

    #[must_use]
    pub fn component(&self, name: &str) -> Option<&ChannelComponent> {
        self.components.iter().find(|c| c.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnimationClip {
    pub name: String,
    pub duration: f32,
    pub channels: Vec<Channel>,
}

impl AnimationClip {
    /// Creates a clip; the duration is the latest keyframe of any channel.
    #[must_use]
    pub fn new(name: String, channels: Vec<Channel>) -> Self {
        let duration = channels
            .iter()
            .flat_map(|channel| channel.components.iter().map(ChannelComponent::end_time))
            .fold(0.0_f32, f32::max);

        Self {
            name,
            duration,
            channels,
        }
    }

    #[must_use]
    pub fn channel(&self, name: &str) -> Option<&Channel> {
        self.channels.iter().find(|channel| channel.name == name)
    }
}
