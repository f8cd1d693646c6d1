//! Material, texture, sampler and image records.
//!
//! Materials are not turned into render effects here; they are validated and
//! handed over as plain records, with `KHR_texture_transform`,
//! `KHR_materials_unlit` and `KDAB_custom_material` data resolved.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use glam::{Mat3, Vec2, Vec3, Vec4};
use serde::Deserialize;
use serde_json::Value;

use crate::assets::io::decode_data_uri;
use crate::assets::loaders::gltf::document;
use crate::errors::{ImportError, Result};

const TEXTURE_TRANSFORM: &str = "KHR_texture_transform";
const MATERIALS_UNLIT: &str = "KHR_materials_unlit";
const CUSTOM_MATERIAL: &str = "KDAB_custom_material";

// ============================================================================
// Images, Samplers, Textures
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// External file, resolved against the base directory when one is known.
    File { uri: String, path: Option<PathBuf> },
    /// Inline `data:` payload.
    Data(Vec<u8>),
    /// Bytes stored in a buffer view.
    BufferView(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRecord {
    pub name: Option<String>,
    pub mime_type: Option<String>,
    pub source: ImageSource,
}

/// Sampler with glTF defaults applied (`REPEAT` wrapping).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerRecord {
    pub mag_filter: Option<u32>,
    pub min_filter: Option<u32>,
    pub wrap_s: u32,
    pub wrap_t: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureRecord {
    pub name: Option<String>,
    pub sampler: Option<usize>,
    pub image: Option<usize>,
}

const WRAP_REPEAT: u32 = 10497;

pub fn parse_images(
    images: &[document::Image],
    view_count: usize,
    base_dir: Option<&Path>,
    dependencies: &mut Vec<PathBuf>,
) -> Result<Vec<ImageRecord>> {
    images
        .iter()
        .enumerate()
        .map(|(index, image)| {
            let source = match (&image.uri, image.buffer_view) {
                (Some(uri), _) if uri.starts_with("data:") => ImageSource::Data(decode_data_uri(uri)?),
                (Some(uri), _) => {
                    let path = base_dir.map(|dir| dir.join(uri.strip_prefix("file://").unwrap_or(uri)));
                    if let Some(path) = &path {
                        dependencies.push(path.clone());
                    }
                    ImageSource::File {
                        uri: uri.clone(),
                        path,
                    }
                }
                (None, Some(view)) if view < view_count => ImageSource::BufferView(view),
                (None, Some(view)) => {
                    return Err(ImportError::out_of_bounds(format!("image {index} bufferView"), view));
                }
                (None, None) => {
                    return Err(ImportError::Malformed(format!(
                        "image {index} has neither uri nor bufferView"
                    )));
                }
            };
            Ok(ImageRecord {
                name: image.name.clone(),
                mime_type: image.mime_type.clone(),
                source,
            })
        })
        .collect()
}

#[must_use]
pub fn parse_samplers(samplers: &[document::Sampler]) -> Vec<SamplerRecord> {
    samplers
        .iter()
        .map(|sampler| SamplerRecord {
            mag_filter: sampler.mag_filter,
            min_filter: sampler.min_filter,
            wrap_s: sampler.wrap_s.unwrap_or(WRAP_REPEAT),
            wrap_t: sampler.wrap_t.unwrap_or(WRAP_REPEAT),
        })
        .collect()
}

pub fn parse_textures(
    textures: &[document::Texture],
    sampler_count: usize,
    image_count: usize,
) -> Result<Vec<TextureRecord>> {
    textures
        .iter()
        .enumerate()
        .map(|(index, texture)| {
            if let Some(sampler) = texture.sampler.filter(|&s| s >= sampler_count) {
                return Err(ImportError::out_of_bounds(format!("texture {index} sampler"), sampler));
            }
            if let Some(image) = texture.source.filter(|&i| i >= image_count) {
                return Err(ImportError::out_of_bounds(format!("texture {index} source"), image));
            }
            Ok(TextureRecord {
                name: texture.name.clone(),
                sampler: texture.sampler,
                image: texture.source,
            })
        })
        .collect()
}

// ============================================================================
// Materials
// ============================================================================

/// `KHR_texture_transform` parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureTransform {
    pub offset: Vec2,
    pub rotation: f32,
    pub scale: Vec2,
}

impl Default for TextureTransform {
    fn default() -> Self {
        Self {
            offset: Vec2::ZERO,
            rotation: 0.0,
            scale: Vec2::ONE,
        }
    }
}

impl TextureTransform {
    /// UV transform matrix `T * R * S`.
    #[must_use]
    pub fn matrix(&self) -> Mat3 {
        let (sin, cos) = self.rotation.sin_cos();
        let translation = Mat3::from_translation(self.offset);
        let rotation = Mat3::from_cols(
            Vec3::new(cos, -sin, 0.0),
            Vec3::new(sin, cos, 0.0),
            Vec3::Z,
        );
        let scale = Mat3::from_scale(self.scale);
        translation * rotation * scale
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TextureTransformDoc {
    offset: Option<[f32; 2]>,
    rotation: Option<f32>,
    scale: Option<[f32; 2]>,
    tex_coord: Option<u32>,
}

/// Reference from a material slot to a texture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureRef {
    pub texture: usize,
    /// Effective UV set (a texture transform may override `texCoord`).
    pub tex_coord: u32,
    pub transform: Option<TextureTransform>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlphaMode {
    #[default]
    Opaque,
    Mask,
    Blend,
}

/// A material with glTF defaults applied.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialRecord {
    pub name: Option<String>,
    pub base_color_factor: Vec4,
    pub base_color_texture: Option<TextureRef>,
    pub metallic_factor: f32,
    pub roughness_factor: f32,
    pub metallic_roughness_texture: Option<TextureRef>,
    pub normal_texture: Option<TextureRef>,
    pub normal_scale: f32,
    pub occlusion_texture: Option<TextureRef>,
    pub occlusion_strength: f32,
    pub emissive_texture: Option<TextureRef>,
    pub emissive_factor: Vec3,
    pub alpha_mode: AlphaMode,
    pub alpha_cutoff: f32,
    pub double_sided: bool,
    pub unlit: bool,
    /// Raw `KDAB_custom_material` payload.
    pub custom: Option<Value>,
}

impl MaterialRecord {
    pub fn textures(&self) -> impl Iterator<Item = &TextureRef> {
        [
            &self.base_color_texture,
            &self.metallic_roughness_texture,
            &self.normal_texture,
            &self.occlusion_texture,
            &self.emissive_texture,
        ]
        .into_iter()
        .flatten()
    }

    /// Whether any texture slot samples the second UV set.
    #[must_use]
    pub fn uses_tex_coord1(&self) -> bool {
        self.textures().any(|texture| texture.tex_coord == 1)
    }
}

fn texture_ref(
    index: usize,
    tex_coord: u32,
    extensions: Option<&BTreeMap<String, Value>>,
    texture_count: usize,
    material: usize,
) -> Result<TextureRef> {
    if index >= texture_count {
        return Err(ImportError::out_of_bounds(format!("material {material} texture"), index));
    }

    let mut reference = TextureRef {
        texture: index,
        tex_coord,
        transform: None,
    };
    if let Some(raw) = extensions.and_then(|extensions| extensions.get(TEXTURE_TRANSFORM)) {
        let doc: TextureTransformDoc = serde_json::from_value(raw.clone())?;
        reference.transform = Some(TextureTransform {
            offset: doc.offset.map_or(Vec2::ZERO, Vec2::from),
            rotation: doc.rotation.unwrap_or(0.0),
            scale: doc.scale.map_or(Vec2::ONE, Vec2::from),
        });
        if let Some(tex_coord) = doc.tex_coord {
            reference.tex_coord = tex_coord;
        }
    }
    Ok(reference)
}

pub fn parse_materials(materials: &[document::Material], texture_count: usize) -> Result<Vec<MaterialRecord>> {
    materials
        .iter()
        .enumerate()
        .map(|(index, material)| {
            let slot = |info: Option<&document::TextureInfo>| {
                info.map(|info| texture_ref(info.index, info.tex_coord, info.extensions.as_ref(), texture_count, index))
                    .transpose()
            };
            let pbr = material.pbr_metallic_roughness.clone().unwrap_or_default();

            let alpha_mode = match material.alpha_mode.as_deref() {
                None | Some("OPAQUE") => AlphaMode::Opaque,
                Some("MASK") => AlphaMode::Mask,
                Some("BLEND") => AlphaMode::Blend,
                Some(other) => {
                    return Err(ImportError::Malformed(format!(
                        "material {index} has unknown alphaMode '{other}'"
                    )));
                }
            };

            let extensions = material.extensions.as_ref();
            Ok(MaterialRecord {
                name: material.name.clone(),
                base_color_factor: pbr.base_color_factor.map_or(Vec4::ONE, Vec4::from),
                base_color_texture: slot(pbr.base_color_texture.as_ref())?,
                metallic_factor: pbr.metallic_factor.unwrap_or(1.0),
                roughness_factor: pbr.roughness_factor.unwrap_or(1.0),
                metallic_roughness_texture: slot(pbr.metallic_roughness_texture.as_ref())?,
                normal_texture: material
                    .normal_texture
                    .as_ref()
                    .map(|info| texture_ref(info.index, info.tex_coord, info.extensions.as_ref(), texture_count, index))
                    .transpose()?,
                normal_scale: material.normal_texture.as_ref().and_then(|info| info.scale).unwrap_or(1.0),
                occlusion_texture: material
                    .occlusion_texture
                    .as_ref()
                    .map(|info| texture_ref(info.index, info.tex_coord, info.extensions.as_ref(), texture_count, index))
                    .transpose()?,
                occlusion_strength: material
                    .occlusion_texture
                    .as_ref()
                    .and_then(|info| info.strength)
                    .unwrap_or(1.0),
                emissive_texture: slot(material.emissive_texture.as_ref())?,
                emissive_factor: material.emissive_factor.map_or(Vec3::ZERO, Vec3::from),
                alpha_mode,
                alpha_cutoff: material.alpha_cutoff.unwrap_or(0.5),
                double_sided: material.double_sided,
                unlit: extensions.is_some_and(|e| e.contains_key(MATERIALS_UNLIT)),
                custom: extensions.and_then(|e| e.get(CUSTOM_MATERIAL)).cloned(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn material(value: Value) -> document::Material {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn defaults_follow_gltf() {
        let records = parse_materials(&[material(json!({}))], 0).unwrap();
        let record = &records[0];
        assert_eq!(record.base_color_factor, Vec4::ONE);
        assert_eq!(record.alpha_mode, AlphaMode::Opaque);
        assert!((record.alpha_cutoff - 0.5).abs() < f32::EPSILON);
        assert!(!record.uses_tex_coord1());
    }

    #[test]
    fn texture_transform_overrides_tex_coord() {
        let doc = material(json!({
            "emissiveTexture": {
                "index": 0,
                "extensions": { "KHR_texture_transform": { "offset": [0.5, 0.0], "texCoord": 1 } }
            }
        }));
        let record = &parse_materials(&[doc], 1).unwrap()[0];
        let emissive = record.emissive_texture.unwrap();
        assert_eq!(emissive.tex_coord, 1);
        assert_eq!(emissive.transform.unwrap().offset, Vec2::new(0.5, 0.0));
        assert!(record.uses_tex_coord1());
    }

    #[test]
    fn texture_index_is_checked() {
        let doc = material(json!({ "normalTexture": { "index": 3 } }));
        assert!(parse_materials(&[doc], 1).is_err());
    }
}
