use glam::Vec3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    /// `None` means infinite range.
    pub range: Option<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpotLight {
    pub range: Option<f32>,
    pub inner_cone: f32,
    pub outer_cone: f32,
}

/// Light type, following `KHR_lights_punctual`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightKind {
    Directional,
    Point(PointLight),
    Spot(SpotLight),
}

/// A light component.
#[derive(Debug, Clone, PartialEq)]
pub struct Light {
    pub name: Option<String>,
    /// Index into the `KHR_lights_punctual` light list.
    pub source: usize,
    pub color: Vec3,
    pub intensity: f32,
    pub kind: LightKind,
}

impl Light {
    #[must_use]
    pub fn new_directional(source: usize, color: Vec3, intensity: f32) -> Self {
        Self {
            name: None,
            source,
            color,
            intensity,
            kind: LightKind::Directional,
        }
    }

    #[must_use]
    pub fn new_point(source: usize, color: Vec3, intensity: f32, range: Option<f32>) -> Self {
        Self {
            name: None,
            source,
            color,
            intensity,
            kind: LightKind::Point(PointLight { range }),
        }
    }

    #[must_use]
    pub fn new_spot(
        source: usize,
        color: Vec3,
        intensity: f32,
        range: Option<f32>,
        inner_cone: f32,
        outer_cone: f32,
    ) -> Self {
        Self {
            name: None,
            source,
            color,
            intensity,
            kind: LightKind::Spot(SpotLight {
                range,
                inner_cone,
                outer_cone,
            }),
        }
    }

    #[must_use]
    pub fn range(&self) -> Option<f32> {
        match self.kind {
            LightKind::Directional => None,
            LightKind::Point(point) => point.range,
            LightKind::Spot(spot) => spot.range,
        }
    }
}
