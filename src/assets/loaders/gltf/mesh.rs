//! Mesh primitive decoding.
//!
//! Primitive attributes are decoded into packed accessor data and handed to
//! the host unchanged, except for `JOINTS_n` of skinned primitives, which are
//! rewritten to address skeleton-local joint indices.

use std::collections::BTreeMap;

use crate::assets::loaders::gltf::accessor::{self, AccessorRecord, ComponentType, DecodedAccessor};
use crate::assets::loaders::gltf::buffers::{BufferViewRecord, RawBuffer};
use crate::assets::loaders::gltf::document;
use crate::errors::{ImportError, ImportWarning, Result};

const DRACO_EXTENSION: &str = "KHR_draco_mesh_compression";

/// Primitive topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrimitiveMode {
    Points,
    Lines,
    LineLoop,
    LineStrip,
    #[default]
    Triangles,
    TriangleStrip,
    TriangleFan,
}

impl PrimitiveMode {
    #[must_use]
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(Self::Points),
            1 => Some(Self::Lines),
            2 => Some(Self::LineLoop),
            3 => Some(Self::LineStrip),
            4 => Some(Self::Triangles),
            5 => Some(Self::TriangleStrip),
            6 => Some(Self::TriangleFan),
            _ => None,
        }
    }
}

/// Decoded primitive data.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimitiveData {
    pub mode: PrimitiveMode,
    pub material: Option<usize>,
    pub attributes: BTreeMap<String, DecodedAccessor>,
    pub indices: Option<Vec<u32>>,
    pub targets: Vec<BTreeMap<String, DecodedAccessor>>,
}

impl PrimitiveData {
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&DecodedAccessor> {
        self.attributes.get(name)
    }

    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.attributes.get("POSITION").map_or(0, |position| position.count)
    }

    /// Rewrites every `JOINTS_n` attribute through `remap`.
    ///
    /// Storage is widened when a remapped index no longer fits.
    pub fn remap_joints(&mut self, remap: &[usize]) -> Result<()> {
        for (name, joints) in &mut self.attributes {
            if !name.starts_with("JOINTS_") {
                continue;
            }

            let remapped = joints
                .to_u32()?
                .into_iter()
                .map(|slot| {
                    remap
                        .get(slot as usize)
                        .map(|&local| local as u32)
                        .ok_or_else(|| {
                            ImportError::Malformed(format!("{name} references joint slot {slot} outside the skin"))
                        })
                })
                .collect::<Result<Vec<u32>>>()?;

            let max = remapped.iter().copied().max().unwrap_or(0);
            let component_type = match joints.component_type {
                ComponentType::UnsignedByte if max <= u32::from(u8::MAX) => ComponentType::UnsignedByte,
                ComponentType::UnsignedByte | ComponentType::UnsignedShort if max <= u32::from(u16::MAX) => {
                    ComponentType::UnsignedShort
                }
                _ => ComponentType::UnsignedInt,
            };

            joints.data = match component_type {
                ComponentType::UnsignedByte => remapped.iter().map(|&v| v as u8).collect(),
                ComponentType::UnsignedShort => {
                    let narrowed: Vec<u16> = remapped.iter().map(|&v| v as u16).collect();
                    bytemuck::cast_slice(&narrowed).to_vec()
                }
                _ => bytemuck::cast_slice(&remapped).to_vec(),
            };
            joints.component_type = component_type;
        }
        Ok(())
    }
}

/// Decoded mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshData {
    pub name: Option<String>,
    /// `None` for primitives that could not be decoded.
    pub primitives: Vec<Option<PrimitiveData>>,
    /// Default morph weights.
    pub weights: Vec<f32>,
    /// Skin whose joint remap was applied to the primitives.
    pub remapped_for_skin: Option<usize>,
}

/// Morph target count of a mesh: the first primitive's target count, falling
/// back to the length of the default weights when that is zero.
#[must_use]
pub fn morph_target_count(mesh: &document::Mesh) -> usize {
    match mesh.primitives.first().map_or(0, |p| p.targets.len()) {
        0 => mesh.weights.as_ref().map_or(0, Vec::len),
        count => count,
    }
}

/// Checks accessor references and primitive modes.
pub fn validate_meshes(meshes: &[document::Mesh], accessor_count: usize) -> Result<()> {
    for (mesh_index, mesh) in meshes.iter().enumerate() {
        for (primitive_index, primitive) in mesh.primitives.iter().enumerate() {
            let context = |what: &str| format!("mesh {mesh_index} primitive {primitive_index} {what}");
            let referenced = primitive
                .attributes
                .values()
                .chain(primitive.indices.iter())
                .chain(primitive.targets.iter().flat_map(BTreeMap::values));
            for &accessor in referenced {
                if accessor >= accessor_count {
                    return Err(ImportError::out_of_bounds(context("accessor"), accessor));
                }
            }
            if PrimitiveMode::from_code(primitive.mode.unwrap_or(4)).is_none() {
                return Err(ImportError::Malformed(context("has an invalid mode")));
            }
        }
    }
    Ok(())
}

/// Decodes all meshes. Draco-compressed primitives are skipped with a warning.
pub fn decode_meshes(
    meshes: &[document::Mesh],
    accessors: &[AccessorRecord],
    views: &[BufferViewRecord],
    buffers: &[RawBuffer],
    warnings: &mut Vec<ImportWarning>,
) -> Result<Vec<MeshData>> {
    meshes
        .iter()
        .enumerate()
        .map(|(mesh_index, mesh)| {
            let primitives = mesh
                .primitives
                .iter()
                .enumerate()
                .map(|(primitive_index, primitive)| {
                    let compressed = primitive
                        .extensions
                        .as_ref()
                        .is_some_and(|extensions| extensions.contains_key(DRACO_EXTENSION));
                    if compressed {
                        let warning = ImportWarning::PrimitiveSkipped {
                            mesh: mesh_index,
                            primitive: primitive_index,
                            reason: format!("{DRACO_EXTENSION} payloads are not decoded"),
                        };
                        log::warn!("{warning}");
                        warnings.push(warning);
                        return Ok(None);
                    }
                    decode_primitive(primitive, accessors, views, buffers).map(Some)
                })
                .collect::<Result<Vec<_>>>()?;

            Ok(MeshData {
                name: mesh.name.clone(),
                primitives,
                weights: mesh.weights.clone().unwrap_or_default(),
                remapped_for_skin: None,
            })
        })
        .collect()
}

fn decode_primitive(
    primitive: &document::Primitive,
    accessors: &[AccessorRecord],
    views: &[BufferViewRecord],
    buffers: &[RawBuffer],
) -> Result<PrimitiveData> {
    let decode_set = |set: &BTreeMap<String, usize>| -> Result<BTreeMap<String, DecodedAccessor>> {
        set.iter()
            .map(|(name, &index)| Ok((name.clone(), accessor::decode_index(index, accessors, views, buffers)?)))
            .collect()
    };

    let indices = primitive
        .indices
        .map(|index| accessor::decode_index(index, accessors, views, buffers)?.to_u32())
        .transpose()?;

    Ok(PrimitiveData {
        mode: PrimitiveMode::from_code(primitive.mode.unwrap_or(4)).unwrap_or_default(),
        material: primitive.material,
        attributes: decode_set(&primitive.attributes)?,
        indices,
        targets: primitive.targets.iter().map(decode_set).collect::<Result<_>>()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::loaders::gltf::accessor::ElementShape;

    fn joints(component_type: ComponentType, data: Vec<u8>) -> PrimitiveData {
        let accessor = DecodedAccessor {
            component_type,
            shape: ElementShape::Vec4,
            count: 1,
            normalized: false,
            data,
        };
        PrimitiveData {
            mode: PrimitiveMode::Triangles,
            material: None,
            attributes: BTreeMap::from([("JOINTS_0".to_string(), accessor)]),
            indices: None,
            targets: Vec::new(),
        }
    }

    #[test]
    fn remap_widens_bytes_to_shorts() {
        let mut primitive = joints(ComponentType::UnsignedByte, vec![0, 1, 0, 0]);
        primitive.remap_joints(&[0, 300]).unwrap();

        let attribute = primitive.attribute("JOINTS_0").unwrap();
        assert_eq!(attribute.component_type, ComponentType::UnsignedShort);
        assert_eq!(attribute.read::<u16>().unwrap(), vec![0, 300, 0, 0]);
    }

    #[test]
    fn remap_keeps_wide_storage() {
        let data = bytemuck::cast_slice(&[1u32, 0, 0, 0]).to_vec();
        let mut primitive = joints(ComponentType::UnsignedInt, data);
        primitive.remap_joints(&[5, 7]).unwrap();

        let attribute = primitive.attribute("JOINTS_0").unwrap();
        assert_eq!(attribute.component_type, ComponentType::UnsignedInt);
        assert_eq!(attribute.to_u32().unwrap(), vec![7, 5, 5, 5]);
    }

    #[test]
    fn zero_target_primitive_uses_mesh_weights() {
        let mesh = document::Mesh {
            primitives: vec![document::Primitive::default()],
            weights: Some(vec![0.0; 3]),
            ..document::Mesh::default()
        };
        assert_eq!(morph_target_count(&mesh), 3);
    }
}
