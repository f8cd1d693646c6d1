use glam::Vec2;

/// Interpolation of the segment that starts at a keyframe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    Constant,
    Linear,
    Bezier,
}

/// A scalar keyframe.
///
/// Bézier keyframes carry their two control handles as `(time, value)`
/// points; for other interpolations both handles equal the keyframe itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keyframe {
    pub time: f32,
    pub value: f32,
    pub interpolation: Interpolation,
    pub left_handle: Vec2,
    pub right_handle: Vec2,
}

impl Keyframe {
    #[must_use]
    pub fn constant(time: f32, value: f32) -> Self {
        Self::with_mode(time, value, Interpolation::Constant)
    }

    #[must_use]
    pub fn linear(time: f32, value: f32) -> Self {
        Self::with_mode(time, value, Interpolation::Linear)
    }

    #[must_use]
    pub fn bezier(time: f32, value: f32, left_handle: Vec2, right_handle: Vec2) -> Self {
        Self {
            time,
            value,
            interpolation: Interpolation::Bezier,
            left_handle,
            right_handle,
        }
    }

    fn with_mode(time: f32, value: f32, interpolation: Interpolation) -> Self {
        let point = Vec2::new(time, value);
        Self {
            time,
            value,
            interpolation,
            left_handle: point,
            right_handle: point,
        }
    }

    #[inline]
    #[must_use]
    pub fn point(&self) -> Vec2 {
        Vec2::new(self.time, self.value)
    }
}

const MAX_SCAN_OFFSET: usize = 3;
const BEZIER_ITERATIONS: usize = 32;

#[derive(Debug, Clone, Default)]
pub struct KeyframeCursor {
    pub last_index: usize,
}

/// One scalar component of a baked channel (e.g. the `x` of a translation).
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelComponent {
    pub name: String,
    pub keyframes: Vec<Keyframe>,
}

impl ChannelComponent {
    #[must_use]
    pub fn new(name: impl Into<String>, keyframes: Vec<Keyframe>) -> Self {
        Self {
            name: name.into(),
            keyframes,
        }
    }

    #[must_use]
    pub fn start_time(&self) -> f32 {
        self.keyframes.first().map_or(0.0, |k| k.time)
    }

    #[must_use]
    pub fn end_time(&self) -> f32 {
        self.keyframes.last().map_or(0.0, |k| k.time)
    }

    /// Samples the component; times outside the keyframe range clamp.
    /// An empty component samples as `0.0`.
    #[must_use]
    pub fn sample(&self, time: f32) -> f32 {
        if self.keyframes.is_empty() {
            return 0.0;
        }
        let next = self.keyframes.partition_point(|k| k.time <= time);
        self.sample_segment(next.saturating_sub(1), time)
    }

    /// Samples using `cursor` as a hint for the current segment.
    ///
    /// Playback that moves a few keyframes at a time is resolved by a short
    /// linear scan from the cursor; larger jumps fall back to binary search.
    pub fn sample_with_cursor(&self, time: f32, cursor: &mut KeyframeCursor) -> f32 {
        let len = self.keyframes.len();
        if len == 0 {
            return 0.0;
        }
        if len == 1 {
            return self.keyframes[0].value;
        }

        let i = cursor.last_index.min(len - 1);
        let found = if time >= self.keyframes[i].time {
            (0..=MAX_SCAN_OFFSET).map(|offset| i + offset).find_map(|idx| {
                if idx >= len - 1 {
                    Some(len - 1)
                } else if time < self.keyframes[idx + 1].time {
                    Some(idx)
                } else {
                    None
                }
            })
        } else {
            (0..=MAX_SCAN_OFFSET)
                .take_while(|&offset| offset <= i)
                .map(|offset| i - offset)
                .find(|&idx| time >= self.keyframes[idx].time)
        };

        let index = found.unwrap_or_else(|| {
            self.keyframes
                .partition_point(|k| k.time <= time)
                .saturating_sub(1)
        });
        cursor.last_index = index;
        self.sample_segment(index, time)
    }

    fn sample_segment(&self, index: usize, time: f32) -> f32 {
        let len = self.keyframes.len();
        let k0 = &self.keyframes[index];
        if index + 1 >= len || time <= k0.time {
            return k0.value;
        }

        let k1 = &self.keyframes[index + 1];
        let dt = k1.time - k0.time;
        let t = if dt > 1e-6 { ((time - k0.time) / dt).clamp(0.0, 1.0) } else { 0.0 };

        match k0.interpolation {
            Interpolation::Constant => k0.value,
            Interpolation::Linear => k0.value + (k1.value - k0.value) * t,
            Interpolation::Bezier => {
                let p0 = k0.point();
                let p1 = k0.right_handle;
                let p2 = if k1.interpolation == Interpolation::Bezier {
                    k1.left_handle
                } else {
                    k1.point()
                };
                let p3 = k1.point();
                let s = solve_bezier_parameter(p0.x, p1.x, p2.x, p3.x, time);
                cubic_bezier(p0.y, p1.y, p2.y, p3.y, s)
            }
        }
    }
}

#[inline]
fn cubic_bezier(p0: f32, p1: f32, p2: f32, p3: f32, s: f32) -> f32 {
    let u = 1.0 - s;
    u * u * u * p0 + 3.0 * u * u * s * p1 + 3.0 * u * s * s * p2 + s * s * s * p3
}

/// Finds `s` with `bezier_x(s) == x`, assuming `x` is monotonic in `s`.
fn solve_bezier_parameter(x0: f32, x1: f32, x2: f32, x3: f32, x: f32) -> f32 {
    let (mut lo, mut hi) = (0.0_f32, 1.0_f32);
    for _ in 0..BEZIER_ITERATIONS {
        let mid = 0.5 * (lo + hi);
        if cubic_bezier(x0, x1, x2, x3, mid) < x {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    0.5 * (lo + hi)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_and_binary_search_agree() {
        let component = ChannelComponent::new(
            "x",
            (0..10).map(|i| Keyframe::linear(i as f32, (i * i) as f32)).collect(),
        );
        let mut cursor = KeyframeCursor::default();
        for time in [0.25, 1.5, 7.75, 2.0, 9.5, 0.0, 4.2] {
            let a = component.sample_with_cursor(time, &mut cursor);
            let b = component.sample(time);
            assert!((a - b).abs() < 1e-5, "time {time}: {a} != {b}");
        }
    }

    #[test]
    fn thirds_handles_make_time_linear() {
        // Handles at one third in time: the time curve is linear in s.
        let s = solve_bezier_parameter(0.0, 1.0, 2.0, 3.0, 1.5);
        assert!((s - 0.5).abs() < 1e-5);
    }
}
