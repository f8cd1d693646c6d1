//! Parse context.
//!
//! Holds every intermediate record of one import. Stages run in a fixed
//! order and each one fails fast:
//!
//! ```text
//! buffers -> bufferViews -> accessors -> meshes -> cameras -> nodes -> scenes
//!   -> images -> samplers -> textures -> skins -> materials
//!   -> extensions (layers, punctual lights) -> animations
//! ```

use std::path::PathBuf;

use glam::Vec3;

use crate::animation::{AnimationClip, BakeSources, bake_animation};
use crate::assets::io::AssetReader;
use crate::assets::loaders::gltf::ImportOptions;
use crate::assets::loaders::gltf::accessor::{self, AccessorRecord};
use crate::assets::loaders::gltf::buffers::{self, BufferViewRecord, RawBuffer};
use crate::assets::loaders::gltf::container;
use crate::assets::loaders::gltf::document::{self, AssetInfo, Root};
use crate::assets::loaders::gltf::hierarchy::{NodeHierarchy, TreeNode};
use crate::assets::loaders::gltf::material::{
    self, ImageRecord, MaterialRecord, SamplerRecord, TextureRecord,
};
use crate::assets::loaders::gltf::mesh::{self, MeshData};
use crate::assets::loaders::gltf::skin::{self, SkinRecord};
use crate::errors::{ImportError, ImportWarning, Result};
use crate::scene::{Light, Projection};

/// Extensions the importer understands.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "KDAB_kuesa_layers",
    "KHR_lights_punctual",
    "KHR_draco_mesh_compression",
    "KHR_materials_unlit",
    "KDAB_custom_material",
    "EXT_property_animation",
    "KHR_texture_transform",
];

#[derive(Debug, Clone, PartialEq)]
pub struct CameraRecord {
    pub name: Option<String>,
    pub projection: Projection,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneRecord {
    pub name: Option<String>,
    pub nodes: Vec<usize>,
}

/// All intermediate state of one import.
#[derive(Debug, Default)]
pub struct ParseContext {
    pub options: ImportOptions,
    pub asset: AssetInfo,

    pub buffers: Vec<RawBuffer>,
    pub views: Vec<BufferViewRecord>,
    pub accessors: Vec<AccessorRecord>,
    pub meshes: Vec<document::Mesh>,
    pub mesh_data: Vec<MeshData>,
    pub morph_target_counts: Vec<usize>,
    pub cameras: Vec<CameraRecord>,
    pub tree: Vec<TreeNode>,
    pub hierarchy: NodeHierarchy,
    pub scenes: Vec<SceneRecord>,
    pub default_scene: Option<usize>,
    pub images: Vec<ImageRecord>,
    pub samplers: Vec<SamplerRecord>,
    pub textures: Vec<TextureRecord>,
    pub skins: Vec<SkinRecord>,
    pub materials: Vec<MaterialRecord>,
    pub layers: Vec<String>,
    pub lights: Vec<Light>,
    pub clips: Vec<AnimationClip>,

    pub dependencies: Vec<PathBuf>,
    pub warnings: Vec<ImportWarning>,
}

impl ParseContext {
    /// Parses `bytes` (JSON or GLB) through every stage.
    pub fn parse(bytes: &[u8], reader: &dyn AssetReader, options: ImportOptions) -> Result<Self> {
        let container = container::split(bytes)?;
        let root: Root = serde_json::from_slice(container.json)?;

        let mut ctx = Self {
            options,
            ..Self::default()
        };

        ctx.check_asset(&root)?;
        ctx.parse_buffers(&root, container.bin, reader)?;
        ctx.views = buffers::resolve_buffer_views(&root.buffer_views, &ctx.buffers)?;
        ctx.accessors = accessor::parse_accessors(&root.accessors, &ctx.views)?;
        ctx.parse_meshes(&root)?;
        ctx.parse_cameras(&root)?;
        ctx.parse_nodes(&root)?;
        ctx.parse_scenes(&root)?;
        ctx.images = material::parse_images(
            &root.images,
            ctx.views.len(),
            ctx.options.base_dir.as_deref(),
            &mut ctx.dependencies,
        )?;
        ctx.samplers = material::parse_samplers(&root.samplers);
        ctx.textures = material::parse_textures(&root.textures, ctx.samplers.len(), ctx.images.len())?;
        ctx.skins = skin::parse_skins(&root.skins, ctx.tree.len(), &ctx.accessors, &ctx.views, &ctx.buffers)?;
        ctx.parse_materials(&root)?;
        ctx.parse_extensions(&root)?;
        if ctx.options.load_animations {
            ctx.parse_animations(&root)?;
        }

        log::debug!(
            "Parsed {} buffers, {} accessors, {} nodes, {} skins, {} animations",
            ctx.buffers.len(),
            ctx.accessors.len(),
            ctx.tree.len(),
            ctx.skins.len(),
            ctx.clips.len()
        );
        Ok(ctx)
    }

    pub(crate) fn warn(&mut self, warning: ImportWarning) {
        log::warn!("{warning}");
        self.warnings.push(warning);
    }

    fn is_supported(&self, extension: &str) -> bool {
        SUPPORTED_EXTENSIONS.contains(&extension)
            || self.options.extra_supported_extensions.iter().any(|e| e == extension)
    }

    // ========================================================================
    // Stages
    // ========================================================================

    fn check_asset(&mut self, root: &Root) -> Result<()> {
        if !root.asset.version.starts_with('2') {
            return Err(ImportError::UnsupportedVersion(root.asset.version.clone()));
        }
        self.asset = root.asset.clone();

        if let Some(required) = root.extensions_required.iter().find(|e| !self.is_supported(e)) {
            return Err(ImportError::UnsupportedExtension(required.clone()));
        }
        for used in &root.extensions_used {
            if !self.is_supported(used) {
                self.warn(ImportWarning::UnknownExtension(used.clone()));
            }
        }
        Ok(())
    }

    fn parse_buffers(&mut self, root: &Root, bin: Option<&[u8]>, reader: &dyn AssetReader) -> Result<()> {
        let resolved = buffers::resolve_buffers(&root.buffers, bin, reader)?;
        self.buffers = resolved.buffers;
        self.dependencies.extend(resolved.local_files);
        Ok(())
    }

    fn parse_meshes(&mut self, root: &Root) -> Result<()> {
        mesh::validate_meshes(&root.meshes, self.accessors.len())?;
        self.morph_target_counts = root.meshes.iter().map(mesh::morph_target_count).collect();
        if self.options.decode_meshes {
            self.mesh_data = mesh::decode_meshes(
                &root.meshes,
                &self.accessors,
                &self.views,
                &self.buffers,
                &mut self.warnings,
            )?;
        }
        self.meshes = root.meshes.clone();
        Ok(())
    }

    fn parse_cameras(&mut self, root: &Root) -> Result<()> {
        self.cameras = root
            .cameras
            .iter()
            .enumerate()
            .map(|(index, camera)| {
                let projection = match (camera.kind.as_str(), camera.perspective, camera.orthographic) {
                    ("perspective", Some(p), _) => Projection::Perspective {
                        yfov: p.yfov,
                        aspect_ratio: p.aspect_ratio,
                        znear: p.znear,
                        zfar: p.zfar,
                    },
                    ("orthographic", _, Some(o)) => Projection::Orthographic {
                        xmag: o.xmag,
                        ymag: o.ymag,
                        znear: o.znear,
                        zfar: o.zfar,
                    },
                    (kind, _, _) => {
                        return Err(ImportError::Malformed(format!(
                            "camera {index} of type '{kind}' lacks its projection"
                        )));
                    }
                };
                Ok(CameraRecord {
                    name: camera.name.clone(),
                    projection,
                })
            })
            .collect::<Result<_>>()?;
        Ok(())
    }

    fn parse_nodes(&mut self, root: &Root) -> Result<()> {
        let light_count = root
            .extensions
            .lights_punctual
            .as_ref()
            .map_or(0, |lights| lights.lights.len());
        let layer_count = root.extensions.layers.as_ref().map_or(0, |layers| layers.layers.len());

        for (index, node) in root.nodes.iter().enumerate() {
            let checks = [
                ("mesh", node.mesh, root.meshes.len()),
                ("camera", node.camera, root.cameras.len()),
                ("skin", node.skin, root.skins.len()),
                ("light", node.extensions.light.map(|l| l.light), light_count),
            ];
            for (what, reference, count) in checks {
                if let Some(reference) = reference.filter(|&r| r >= count) {
                    return Err(ImportError::out_of_bounds(format!("node {index} {what}"), reference));
                }
            }
            if let Some(layers) = &node.extensions.layers
                && let Some(&layer) = layers.layers.iter().find(|&&l| l >= layer_count)
            {
                return Err(ImportError::out_of_bounds(format!("node {index} layer"), layer));
            }
            self.tree.push(TreeNode::from_document(index, node));
        }

        self.hierarchy = NodeHierarchy::build(&self.tree, &mut self.warnings);
        Ok(())
    }

    fn parse_scenes(&mut self, root: &Root) -> Result<()> {
        for (index, scene) in root.scenes.iter().enumerate() {
            if let Some(&node) = scene.nodes.iter().find(|&&n| n >= self.tree.len()) {
                return Err(ImportError::out_of_bounds(format!("scene {index} node"), node));
            }
            self.scenes.push(SceneRecord {
                name: scene.name.clone(),
                nodes: scene.nodes.clone(),
            });
        }

        self.default_scene = match root.scene {
            Some(scene) if scene >= self.scenes.len() => {
                return Err(ImportError::out_of_bounds("default scene", scene));
            }
            Some(scene) => Some(scene),
            None if self.scenes.is_empty() => None,
            None => Some(0),
        };
        Ok(())
    }

    fn parse_materials(&mut self, root: &Root) -> Result<()> {
        self.materials = material::parse_materials(&root.materials, self.textures.len())?;

        for (mesh_index, mesh) in root.meshes.iter().enumerate() {
            for primitive in &mesh.primitives {
                if let Some(material) = primitive.material.filter(|&m| m >= self.materials.len()) {
                    return Err(ImportError::out_of_bounds(
                        format!("mesh {mesh_index} primitive material"),
                        material,
                    ));
                }
            }
        }
        Ok(())
    }

    fn parse_extensions(&mut self, root: &Root) -> Result<()> {
        if let Some(layers) = &root.extensions.layers {
            self.layers = layers.layers.iter().map(|layer| layer.name.clone()).collect();
        }

        if let Some(punctual) = &root.extensions.lights_punctual {
            self.lights = punctual
                .lights
                .iter()
                .enumerate()
                .map(|(index, light)| {
                    let color = light.color.map_or(Vec3::ONE, Vec3::from);
                    let intensity = light.intensity.unwrap_or(1.0);
                    let mut record = match light.kind.as_str() {
                        "directional" => Light::new_directional(index, color, intensity),
                        "point" => Light::new_point(index, color, intensity, light.range),
                        "spot" => {
                            let spot = light.spot.unwrap_or_default();
                            Light::new_spot(
                                index,
                                color,
                                intensity,
                                light.range,
                                spot.inner_cone_angle.unwrap_or(0.0),
                                spot.outer_cone_angle.unwrap_or(std::f32::consts::FRAC_PI_4),
                            )
                        }
                        other => {
                            return Err(ImportError::Malformed(format!(
                                "light {index} has unknown type '{other}'"
                            )));
                        }
                    };
                    record.name.clone_from(&light.name);
                    Ok(record)
                })
                .collect::<Result<_>>()?;
        }
        Ok(())
    }

    fn parse_animations(&mut self, root: &Root) -> Result<()> {
        let node_meshes: Vec<Option<usize>> = self.tree.iter().map(|node| node.mesh).collect();
        let sources = BakeSources {
            accessors: &self.accessors,
            views: &self.views,
            buffers: &self.buffers,
            node_meshes: &node_meshes,
            morph_target_counts: &self.morph_target_counts,
            camera_count: self.cameras.len(),
            light_count: self.lights.len(),
            material_count: self.materials.len(),
        };

        let mut clips = Vec::with_capacity(root.animations.len());
        for (index, animation) in root.animations.iter().enumerate() {
            clips.push(bake_animation(index, animation, &sources, &mut self.warnings)?);
        }
        self.clips = clips;
        Ok(())
    }
}
