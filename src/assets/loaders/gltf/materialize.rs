//! Scene assembly.
//!
//! Turns a fully parsed [`ParseContext`] into an [`ImportedAsset`]:
//!
//! 1. entity graph (leaf walk)
//! 2. skeletons from skins, joint handles on the node records
//! 3. per-node content: layers, lights, cameras, primitive entities
//! 4. animation mappings
//! 5. scene roots under the `gltf_root` entity

use smallvec::SmallVec;

use crate::animation::{MappingScope, generate_mapping};
use crate::assets::loaders::gltf::context::ParseContext;
use crate::assets::loaders::gltf::hierarchy::{self, JointHandle};
use crate::assets::loaders::gltf::skin;
use crate::assets::prefab::{ImportedAsset, SceneRoot};
use crate::errors::Result;
use crate::scene::{Camera, CameraKey, LightKey, Node, NodeHandle, PrimitiveRef, Scene, SkeletonKey};

/// Name of the entity that parents every imported root.
pub const IMPORT_ROOT_NAME: &str = "gltf_root";

pub fn materialize(mut ctx: ParseContext) -> Result<ImportedAsset> {
    let mut scene = Scene::new();

    // 1. Entities
    let roots = hierarchy::materialize_entities(&mut ctx.tree, &ctx.hierarchy, &mut scene, &mut ctx.warnings);

    // 2. Skeletons
    let skeletons = build_skeletons(&mut ctx, &mut scene)?;

    // 3. Node content
    let mut camera_keys: Vec<Vec<CameraKey>> = vec![Vec::new(); ctx.cameras.len()];
    let mut light_keys: Vec<Vec<LightKey>> = vec![Vec::new(); ctx.lights.len()];
    let mut primitive_entities: Vec<Vec<NodeHandle>> = vec![Vec::new(); ctx.tree.len()];

    for index in 0..ctx.tree.len() {
        let record = &ctx.tree[index];
        let Some(entity) = record.entity else {
            continue;
        };

        let morph_weights = record
            .morph_weights
            .clone()
            .or_else(|| record.mesh.and_then(|m| ctx.meshes[m].weights.clone()))
            .unwrap_or_default();

        if let Some(node) = scene.get_node_mut(entity) {
            node.layers = record
                .layers
                .iter()
                .filter_map(|&layer| ctx.layers.get(layer).cloned())
                .collect();
            node.morph_weights.clone_from(&morph_weights);
            node.mesh = record.mesh;
        }

        if let Some(light) = record.light {
            let key = scene.add_light(entity, ctx.lights[light].clone());
            light_keys[light].push(key);
        }

        if let Some(camera) = record.camera {
            let source = &ctx.cameras[camera];
            let mut component = Camera::new(camera, source.projection);
            component.name.clone_from(&source.name);
            let key = scene.add_camera(entity, component);
            camera_keys[camera].push(key);
        }

        if let Some(mesh) = record.mesh {
            let armature = record.skin.map(|skin| skeletons[skin]);
            let base_name = record.name.clone().unwrap_or_else(|| format!("node_{index}"));
            for (primitive_index, primitive) in ctx.meshes[mesh].primitives.iter().enumerate() {
                let mut child = Node::new(Some(format!("{base_name}_primitive_{primitive_index}")));
                child.primitive = Some(PrimitiveRef {
                    mesh,
                    primitive: primitive_index,
                    material: primitive.material,
                });
                child.armature = armature;
                child.morph_weights.clone_from(&morph_weights);
                primitive_entities[index].push(scene.add_to_parent(child, entity));
            }
        }
    }

    // 4. Mappings
    let scope = MappingScope {
        nodes: &ctx.tree,
        primitive_entities: &primitive_entities,
        cameras: &camera_keys,
        lights: &light_keys,
    };
    let mappings = ctx
        .clips
        .iter()
        .enumerate()
        .map(|(index, clip)| generate_mapping(index, clip, &scope))
        .collect();

    // 5. Roots
    let root = scene.add_node(Node::new(Some(IMPORT_ROOT_NAME.to_string())));
    for entity in roots {
        scene.attach(entity, root);
    }
    scene.update_world_matrices();

    let scenes = ctx
        .scenes
        .iter()
        .enumerate()
        .map(|(index, record)| SceneRoot {
            name: record.name.clone(),
            index,
            nodes: record.nodes.iter().filter_map(|&node| ctx.tree[node].entity).collect(),
        })
        .collect();

    log::info!(
        "Imported {} nodes, {} skeletons, {} clips ({} warnings)",
        ctx.tree.len(),
        skeletons.len(),
        ctx.clips.len(),
        ctx.warnings.len()
    );

    Ok(ImportedAsset {
        asset: ctx.asset,
        scene,
        root,
        scenes,
        default_scene: ctx.default_scene,
        clips: ctx.clips,
        mappings,
        skeletons,
        meshes: ctx.mesh_data,
        materials: ctx.materials,
        textures: ctx.textures,
        samplers: ctx.samplers,
        images: ctx.images,
        nodes: ctx.tree,
        dependencies: ctx.dependencies,
        warnings: ctx.warnings,
    })
}

/// Builds one skeleton per skin, records joint handles on the node records
/// and remaps `JOINTS_n` of the skinned meshes.
fn build_skeletons(ctx: &mut ParseContext, scene: &mut Scene) -> Result<Vec<SkeletonKey>> {
    let mut keys = Vec::with_capacity(ctx.skins.len());

    for skin_index in 0..ctx.skins.len() {
        let skeleton = skin::build_skeleton(&ctx.skins[skin_index], &mut ctx.hierarchy, &ctx.tree, &mut ctx.warnings)?;

        let joint_nodes: SmallVec<[(usize, usize); 16]> = skeleton
            .joints
            .iter()
            .enumerate()
            .filter_map(|(joint, descriptor)| descriptor.node.map(|node| (node, joint)))
            .collect();
        let remap = skeleton.remap.clone();
        let key = scene.add_skeleton(skeleton);

        for (node, joint) in joint_nodes {
            ctx.tree[node].joints.push(JointHandle {
                skin: skin_index,
                skeleton: key,
                joint,
            });
        }

        if ctx.options.remap_skin_joints {
            remap_skinned_meshes(ctx, skin_index, &remap)?;
        }
        keys.push(key);
    }

    Ok(keys)
}

fn remap_skinned_meshes(ctx: &mut ParseContext, skin_index: usize, remap: &[usize]) -> Result<()> {
    let meshes: Vec<usize> = ctx
        .tree
        .iter()
        .filter(|node| node.skin == Some(skin_index))
        .filter_map(|node| node.mesh)
        .collect();

    for mesh_index in meshes {
        let Some(mesh) = ctx.mesh_data.get_mut(mesh_index) else {
            continue;
        };
        match mesh.remapped_for_skin {
            Some(previous) if previous == skin_index => {}
            Some(previous) => log::warn!(
                "Mesh {mesh_index} is skinned by skins {previous} and {skin_index}; keeping the remap of skin {previous}"
            ),
            None => {
                for primitive in mesh.primitives.iter_mut().flatten() {
                    primitive.remap_joints(remap)?;
                }
                mesh.remapped_for_skin = Some(skin_index);
            }
        }
    }
    Ok(())
}
