//! Animatable property registry.
//!
//! Every property an animation channel may target is described by one
//! static [`PropertyInfo`] entry: its target kind, its glTF path, its value
//! width and the [`TargetResolver`] used to map baked channels onto the
//! materialized scene.

/// Kind of object an animation channel targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetType {
    Node,
    Material,
    Camera,
    Light,
}

impl TargetType {
    /// Resolves the group segment of an `EXT_property_animation` pointer.
    #[must_use]
    pub fn from_group(group: &str) -> Option<Self> {
        match group {
            "nodes" => Some(Self::Node),
            "materials" => Some(Self::Material),
            "cameras" => Some(Self::Camera),
            "extensions/KHR_lights_punctual/lights" => Some(Self::Light),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransformProperty {
    Translation,
    Rotation,
    Scale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CameraProperty {
    Yfov,
    AspectRatio,
    Xmag,
    Ymag,
    Znear,
    Zfar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LightProperty {
    Color,
    Intensity,
    Range,
    InnerConeAngle,
    OuterConeAngle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaterialProperty {
    BaseColorFactor,
    MetallicFactor,
    RoughnessFactor,
    EmissiveFactor,
    AlphaCutoff,
    NormalScale,
    OcclusionStrength,
}

/// How a baked channel is mapped onto scene objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetResolver {
    /// Node entity transform, plus every joint created for the node.
    NodeTransform(TransformProperty),
    /// Every primitive entity of the node's mesh.
    MorphWeights,
    /// Every camera component created from the glTF camera.
    CameraLens(CameraProperty),
    /// Every light component created from the glTF light.
    Light(LightProperty),
    /// The material record.
    Material(MaterialProperty),
}

/// Static description of an animatable property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyInfo {
    pub target_type: TargetType,
    /// glTF property path, relative to the target object.
    pub path: &'static str,
    /// Components per output element.
    pub components: usize,
    /// Channel base name; channels are named `{base}_{targetId}`.
    pub base_name: &'static str,
    /// Names of the baked components, in emission order. Empty for morph
    /// weights, whose components are named `weight_{i}`.
    pub component_names: &'static [&'static str],
    pub resolver: TargetResolver,
}

impl PropertyInfo {
    #[must_use]
    pub fn is_morph_weights(&self) -> bool {
        self.resolver == TargetResolver::MorphWeights
    }

    /// Rotations are decoded as `x, y, z, w` and emitted as `w, x, y, z`.
    #[must_use]
    pub fn is_rotation(&self) -> bool {
        self.resolver == TargetResolver::NodeTransform(TransformProperty::Rotation)
    }

    #[must_use]
    pub fn channel_name(&self, target_id: usize) -> String {
        format!("{}_{target_id}", self.base_name)
    }

    #[must_use]
    pub fn component_name(&self, component: usize) -> String {
        self.component_names
            .get(component)
            .map_or_else(|| format!("weight_{component}"), |name| (*name).to_string())
    }
}

const XYZ: &[&str] = &["x", "y", "z"];
const WXYZ: &[&str] = &["w", "x", "y", "z"];
const RGB: &[&str] = &["r", "g", "b"];
const RGBA: &[&str] = &["r", "g", "b", "a"];
const VALUE: &[&str] = &["value"];

macro_rules! property {
    ($target:ident, $path:literal, $components:literal, $base:literal, $names:expr, $resolver:expr) => {
        PropertyInfo {
            target_type: TargetType::$target,
            path: $path,
            components: $components,
            base_name: $base,
            component_names: $names,
            resolver: $resolver,
        }
    };
}

static PROPERTIES: &[PropertyInfo] = &[
    // Nodes
    property!(Node, "translation", 3, "translation", XYZ, TargetResolver::NodeTransform(TransformProperty::Translation)),
    property!(Node, "rotation", 4, "rotation", WXYZ, TargetResolver::NodeTransform(TransformProperty::Rotation)),
    property!(Node, "scale", 3, "scale", XYZ, TargetResolver::NodeTransform(TransformProperty::Scale)),
    property!(Node, "weights", 1, "weights", &[], TargetResolver::MorphWeights),
    // Cameras
    property!(Camera, "perspective/yfov", 1, "camera.yfov", VALUE, TargetResolver::CameraLens(CameraProperty::Yfov)),
    property!(Camera, "perspective/znear", 1, "camera.znear", VALUE, TargetResolver::CameraLens(CameraProperty::Znear)),
    property!(Camera, "perspective/zfar", 1, "camera.zfar", VALUE, TargetResolver::CameraLens(CameraProperty::Zfar)),
    property!(Camera, "perspective/aspectRatio", 1, "camera.aspectRatio", VALUE, TargetResolver::CameraLens(CameraProperty::AspectRatio)),
    property!(Camera, "orthographic/xmag", 1, "camera.xmag", VALUE, TargetResolver::CameraLens(CameraProperty::Xmag)),
    property!(Camera, "orthographic/ymag", 1, "camera.ymag", VALUE, TargetResolver::CameraLens(CameraProperty::Ymag)),
    property!(Camera, "orthographic/znear", 1, "camera.orthoZnear", VALUE, TargetResolver::CameraLens(CameraProperty::Znear)),
    property!(Camera, "orthographic/zfar", 1, "camera.orthoZfar", VALUE, TargetResolver::CameraLens(CameraProperty::Zfar)),
    // Lights
    property!(Light, "color", 3, "light.color", RGB, TargetResolver::Light(LightProperty::Color)),
    property!(Light, "intensity", 1, "light.intensity", VALUE, TargetResolver::Light(LightProperty::Intensity)),
    property!(Light, "range", 1, "light.range", VALUE, TargetResolver::Light(LightProperty::Range)),
    property!(Light, "spot/innerConeAngle", 1, "light.innerConeAngle", VALUE, TargetResolver::Light(LightProperty::InnerConeAngle)),
    property!(Light, "spot/outerConeAngle", 1, "light.outerConeAngle", VALUE, TargetResolver::Light(LightProperty::OuterConeAngle)),
    // Materials
    property!(Material, "pbrMetallicRoughness/baseColorFactor", 4, "material.baseColorFactor", RGBA, TargetResolver::Material(MaterialProperty::BaseColorFactor)),
    property!(Material, "pbrMetallicRoughness/metallicFactor", 1, "material.metallicFactor", VALUE, TargetResolver::Material(MaterialProperty::MetallicFactor)),
    property!(Material, "pbrMetallicRoughness/roughnessFactor", 1, "material.roughnessFactor", VALUE, TargetResolver::Material(MaterialProperty::RoughnessFactor)),
    property!(Material, "emissiveFactor", 3, "material.emissiveFactor", RGB, TargetResolver::Material(MaterialProperty::EmissiveFactor)),
    property!(Material, "alphaCutoff", 1, "material.alphaCutoff", VALUE, TargetResolver::Material(MaterialProperty::AlphaCutoff)),
    property!(Material, "normalTexture/scale", 1, "material.normalScale", VALUE, TargetResolver::Material(MaterialProperty::NormalScale)),
    property!(Material, "occlusionTexture/strength", 1, "material.occlusionStrength", VALUE, TargetResolver::Material(MaterialProperty::OcclusionStrength)),
];

/// Looks up a registered property.
#[must_use]
pub fn lookup(target_type: TargetType, path: &str) -> Option<&'static PropertyInfo> {
    PROPERTIES
        .iter()
        .find(|info| info.target_type == target_type && info.path == path)
}

/// All registered properties.
#[must_use]
pub fn properties() -> &'static [PropertyInfo] {
    PROPERTIES
}

/// A parsed `/{group}/{index}/{property}` pointer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyPath {
    pub target_type: TargetType,
    pub index: usize,
    pub property: String,
}

/// Parses an `EXT_property_animation` target pointer.
///
/// The group is everything before the first all-digit segment, so it may
/// contain slashes (`/extensions/KHR_lights_punctual/lights/0/color`).
#[must_use]
pub fn parse_property_path(pointer: &str) -> Option<PropertyPath> {
    let trimmed = pointer.strip_prefix('/')?;
    let segments: Vec<&str> = trimmed.split('/').collect();
    let index_at = segments
        .iter()
        .position(|segment| !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()))?;

    if index_at == 0 || index_at + 1 >= segments.len() {
        return None;
    }

    let target_type = TargetType::from_group(&segments[..index_at].join("/"))?;
    let index = segments[index_at].parse().ok()?;
    let property = segments[index_at + 1..].join("/");

    Some(PropertyPath {
        target_type,
        index,
        property,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_group() {
        let path = parse_property_path("/extensions/KHR_lights_punctual/lights/2/spot/outerConeAngle").unwrap();
        assert_eq!(path.target_type, TargetType::Light);
        assert_eq!(path.index, 2);
        assert_eq!(path.property, "spot/outerConeAngle");
    }

    #[test]
    fn rejects_incomplete_pointers() {
        assert!(parse_property_path("nodes/0/translation").is_none());
        assert!(parse_property_path("/nodes/0").is_none());
        assert!(parse_property_path("/0/translation").is_none());
        assert!(parse_property_path("/meshes/0/weights").is_none());
    }

    #[test]
    fn registry_paths_are_unique_per_target() {
        for (i, a) in properties().iter().enumerate() {
            for b in &properties()[i + 1..] {
                assert!(a.target_type != b.target_type || a.path != b.path);
                assert_ne!(a.base_name, b.base_name);
            }
        }
    }
}
