//! Scene Assembly Tests
//!
//! Tests for:
//! - Entity graph: one entity per node, leaf-to-root construction, child order
//! - Scene roots, default scene and the `gltf_root` entity
//! - Soft failures: bad child references, cycles
//! - Node content: transforms, cameras, lights, layers, primitive entities

mod common;

use std::collections::HashSet;

use common::{GltfBuilder, json_only};
use glam::Vec3;
use myth_gltf::assets::loaders::gltf::IMPORT_ROOT_NAME;
use myth_gltf::scene::{LightKind, Projection};
use myth_gltf::{GltfLoader, ImportError, ImportOptions, ImportWarning, ImportedAsset};
use serde_json::{Value, json};

const EPSILON: f32 = 1e-5;

fn approx_vec(a: Vec3, b: Vec3) -> bool {
    (a - b).length() < EPSILON
}

fn import(bytes: &[u8]) -> ImportedAsset {
    GltfLoader::load_slice(bytes, ImportOptions::default()).unwrap()
}

fn import_nodes(nodes: Value, scenes: Value) -> ImportedAsset {
    import(&json_only(json!({
        "asset": { "version": "2.0" },
        "nodes": nodes,
        "scenes": scenes,
    })))
}

/// A builder holding one single-triangle mesh per entry of `primitive_counts`.
fn with_meshes(primitive_counts: &[usize]) -> GltfBuilder {
    let mut builder = GltfBuilder::new();
    let position = builder.push_f32(&[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0], "VEC3");
    let meshes: Vec<Value> = primitive_counts
        .iter()
        .map(|&count| {
            let primitives: Vec<Value> = (0..count)
                .map(|_| json!({ "attributes": { "POSITION": position } }))
                .collect();
            json!({ "primitives": primitives })
        })
        .collect();
    builder.set("meshes", Value::Array(meshes));
    builder
}

// ============================================================================
// Entity Graph
// ============================================================================

#[test]
fn single_root_with_mesh_child() {
    let mut builder = with_meshes(&[1]);
    builder
        .set("nodes", json!([{ "children": [1] }, { "mesh": 0 }]))
        .set("scenes", json!([{ "nodes": [0] }]));
    let asset = import(&builder.to_gltf());

    let scene_root = asset.default_scene().unwrap();
    assert_eq!(scene_root.nodes.len(), 1);

    let root = scene_root.nodes[0];
    let child = asset.entity_of_node(1).unwrap();
    assert_eq!(asset.entity_of_node(0), Some(root));
    assert_eq!(asset.scene.get_node(root).unwrap().children(), &[child]);
    assert_eq!(asset.scene.get_node(child).unwrap().parent(), Some(root));

    assert!(asset.nodes[0].is_root_node);
    assert!(!asset.nodes[1].is_root_node);
}

#[test]
fn import_root_parents_every_root() {
    let asset = import_nodes(json!([{}, { "children": [2] }, {}]), json!([{ "nodes": [0, 1] }]));

    assert_eq!(asset.scene.root_nodes, vec![asset.root]);
    let root = asset.scene.get_node(asset.root).unwrap();
    assert_eq!(root.name(), Some(IMPORT_ROOT_NAME));
    assert_eq!(root.children().len(), 2);
    assert!(root.children().contains(&asset.entity_of_node(0).unwrap()));
    assert!(root.children().contains(&asset.entity_of_node(1).unwrap()));
}

#[test]
fn every_node_gets_exactly_one_entity() {
    let asset = import_nodes(
        json!([{ "children": [1, 2] }, { "children": [3] }, {}, {}]),
        json!([{ "nodes": [0] }]),
    );

    // Four node entities plus the import root.
    assert_eq!(asset.scene.nodes.len(), 5);
    let entities: HashSet<_> = (0..4).map(|i| asset.entity_of_node(i).unwrap()).collect();
    assert_eq!(entities.len(), 4);
}

#[test]
fn children_keep_document_order() {
    let asset = import_nodes(
        json!([{ "children": [3, 1, 2] }, {}, {}, {}]),
        json!([{ "nodes": [0] }]),
    );

    let expected: Vec<_> = [3, 1, 2].iter().map(|&i| asset.entity_of_node(i).unwrap()).collect();
    let root = asset.entity_of_node(0).unwrap();
    assert_eq!(asset.scene.get_node(root).unwrap().children(), expected.as_slice());
}

#[test]
fn nodes_outside_scenes_are_still_materialized() {
    let asset = import_nodes(json!([{}, {}]), json!([{ "nodes": [0] }]));

    assert!(asset.entity_of_node(1).is_some());
    assert_eq!(asset.default_scene().unwrap().nodes, vec![asset.entity_of_node(0).unwrap()]);
}

// ============================================================================
// Scenes
// ============================================================================

#[test]
fn one_scene_root_per_declared_scene() {
    let asset = import(&json_only(json!({
        "asset": { "version": "2.0" },
        "nodes": [{ "name": "a" }, { "name": "b" }],
        "scenes": [{ "name": "first", "nodes": [0] }, { "name": "second", "nodes": [0, 1] }],
        "scene": 1,
    })));

    assert_eq!(asset.scenes.len(), 2);
    assert_eq!(asset.scenes[0].name.as_deref(), Some("first"));
    assert_eq!(asset.scenes[1].nodes.len(), 2);
    assert_eq!(asset.default_scene().unwrap().index, 1);
}

#[test]
fn first_scene_is_default_when_unspecified() {
    let asset = import_nodes(json!([{}]), json!([{ "nodes": [0] }]));
    assert_eq!(asset.default_scene, Some(0));
}

#[test]
fn document_without_scenes_has_no_default() {
    let asset = import_nodes(json!([{}]), json!([]));
    assert!(asset.scenes.is_empty());
    assert!(asset.default_scene().is_none());
    assert!(asset.entity_of_node(0).is_some());
}

#[test]
fn scene_with_missing_node_fails() {
    let result = GltfLoader::load_slice(
        &json_only(json!({
            "asset": { "version": "2.0" },
            "nodes": [{}],
            "scenes": [{ "nodes": [0, 4] }],
        })),
        ImportOptions::default(),
    );
    assert!(matches!(result, Err(ImportError::IndexOutOfBounds { index: 4, .. })));
}

// ============================================================================
// Soft Failures
// ============================================================================

#[test]
fn bad_child_references_become_warnings() {
    let asset = import_nodes(
        json!([{ "children": [0, 7, 1, 1] }, {}]),
        json!([{ "nodes": [0] }]),
    );

    assert!(asset.warnings.contains(&ImportWarning::SelfChild { node: 0 }));
    assert!(asset.warnings.contains(&ImportWarning::ChildOutOfRange { node: 0, child: 7 }));
    assert!(asset.warnings.contains(&ImportWarning::DuplicateChild { node: 0, child: 1 }));

    let root = asset.entity_of_node(0).unwrap();
    assert_eq!(asset.scene.get_node(root).unwrap().children(), &[asset.entity_of_node(1).unwrap()]);
}

#[test]
fn shared_child_keeps_its_first_parent() {
    let asset = import_nodes(
        json!([{ "children": [2] }, { "children": [2] }, {}]),
        json!([{ "nodes": [0, 1] }]),
    );

    assert!(asset.warnings.contains(&ImportWarning::DuplicateChild { node: 1, child: 2 }));
    let child = asset.entity_of_node(2).unwrap();
    assert_eq!(asset.scene.get_node(child).unwrap().parent(), asset.entity_of_node(0));
    assert!(asset.scene.get_node(asset.entity_of_node(1).unwrap()).unwrap().children().is_empty());
}

#[test]
fn pure_cycle_is_reported_unreachable() {
    let asset = import_nodes(
        json!([{ "children": [1] }, { "children": [0] }, {}]),
        json!([{ "nodes": [2] }]),
    );

    assert!(asset.warnings.contains(&ImportWarning::UnreachableNode { node: 0 }));
    assert!(asset.warnings.contains(&ImportWarning::UnreachableNode { node: 1 }));
    assert!(asset.entity_of_node(0).is_none());
    assert!(asset.entity_of_node(2).is_some());
}

// ============================================================================
// Transforms
// ============================================================================

#[test]
fn world_matrices_compose_parent_transforms() {
    let asset = import_nodes(
        json!([
            { "translation": [1.0, 0.0, 0.0], "scale": [2.0, 2.0, 2.0], "children": [1] },
            { "translation": [0.0, 1.0, 0.0] },
        ]),
        json!([{ "nodes": [0] }]),
    );

    let child = asset.scene.get_node(asset.entity_of_node(1).unwrap()).unwrap();
    let world = child.transform.world_matrix_as_mat4();
    assert!(approx_vec(world.w_axis.truncate(), Vec3::new(1.0, 2.0, 0.0)));
}

#[test]
fn matrix_wins_over_trs() {
    let matrix = glam::Mat4::from_translation(Vec3::new(4.0, 5.0, 6.0)).to_cols_array();
    let asset = import_nodes(
        json!([{ "matrix": matrix, "translation": [9.0, 9.0, 9.0] }]),
        json!([{ "nodes": [0] }]),
    );

    let node = asset.scene.get_node(asset.entity_of_node(0).unwrap()).unwrap();
    assert!(approx_vec(node.transform.position, Vec3::new(4.0, 5.0, 6.0)));
}

#[test]
fn sheared_matrix_is_kept_verbatim() {
    let sheared = glam::Mat4::from_cols(
        glam::Vec4::new(1.0, 0.0, 0.0, 0.0),
        glam::Vec4::new(0.5, 1.0, 0.0, 0.0),
        glam::Vec4::new(0.0, 0.0, 1.0, 0.0),
        glam::Vec4::new(1.0, 2.0, 3.0, 1.0),
    );
    let asset = import_nodes(
        json!([{ "matrix": sheared.to_cols_array() }]),
        json!([{ "nodes": [0] }]),
    );

    let node = asset.scene.get_node(asset.entity_of_node(0).unwrap()).unwrap();
    assert!(!node.transform.trs_matches_matrix());
    assert!(node.transform.world_matrix_as_mat4().abs_diff_eq(sheared, EPSILON));
    assert!(asset.nodes[0].transform.matrix().is_some());
}

#[test]
fn entities_can_be_found_by_name() {
    let asset = import_nodes(
        json!([{ "name": "hull", "children": [1] }, { "name": "turret" }]),
        json!([{ "nodes": [0] }]),
    );

    assert_eq!(asset.scene.find_node_by_name("turret"), asset.entity_of_node(1));
    assert_eq!(asset.scene.find_node_by_name(IMPORT_ROOT_NAME), Some(asset.root));
    assert_eq!(asset.scene.find_node_by_name("missing"), None);
}

// ============================================================================
// Node Content
// ============================================================================

#[test]
fn primitives_become_child_entities() {
    let mut builder = with_meshes(&[2]);
    builder
        .set("nodes", json!([{ "name": "body", "mesh": 0 }]))
        .set("scenes", json!([{ "nodes": [0] }]));
    let asset = import(&builder.to_gltf());

    let entity = asset.entity_of_node(0).unwrap();
    let node = asset.scene.get_node(entity).unwrap();
    assert_eq!(node.mesh, Some(0));
    assert_eq!(node.children().len(), 2);

    for (index, &child) in node.children().iter().enumerate() {
        let primitive = asset.scene.get_node(child).unwrap();
        assert_eq!(primitive.name(), Some(format!("body_primitive_{index}").as_str()));
        let reference = primitive.primitive.unwrap();
        assert_eq!(reference.mesh, 0);
        assert_eq!(reference.primitive, index);
        assert_eq!(reference.material, None);
    }
}

#[test]
fn node_weights_override_mesh_weights() {
    let mut builder = with_meshes(&[1, 1]);
    let mut meshes = json!([
        { "primitives": [{ "attributes": { "POSITION": 0 } }], "weights": [0.25, 0.5] },
        { "primitives": [{ "attributes": { "POSITION": 0 } }], "weights": [0.25, 0.5] },
    ]);
    meshes[0]["primitives"][0]["targets"] = json!([{ "POSITION": 0 }, { "POSITION": 0 }]);
    meshes[1]["primitives"][0]["targets"] = json!([{ "POSITION": 0 }, { "POSITION": 0 }]);
    builder
        .set("meshes", meshes)
        .set("nodes", json!([{ "mesh": 0 }, { "mesh": 1, "weights": [1.0, 0.0] }]))
        .set("scenes", json!([{ "nodes": [0, 1] }]));
    let asset = import(&builder.to_gltf());

    let first = asset.scene.get_node(asset.entity_of_node(0).unwrap()).unwrap();
    let second = asset.scene.get_node(asset.entity_of_node(1).unwrap()).unwrap();
    assert_eq!(first.morph_weights, vec![0.25, 0.5]);
    assert_eq!(second.morph_weights, vec![1.0, 0.0]);
}

#[test]
fn shared_camera_creates_one_component_per_node() {
    let asset = import(&json_only(json!({
        "asset": { "version": "2.0" },
        "cameras": [{ "name": "lens", "type": "perspective", "perspective": { "yfov": 0.8, "znear": 0.1 } }],
        "nodes": [{ "camera": 0 }, { "camera": 0 }],
        "scenes": [{ "nodes": [0, 1] }],
    })));

    assert_eq!(asset.scene.cameras.len(), 2);
    for index in 0..2 {
        let node = asset.scene.get_node(asset.entity_of_node(index).unwrap()).unwrap();
        let camera = &asset.scene.cameras[node.camera.unwrap()];
        assert_eq!(camera.source, 0);
        assert_eq!(camera.name.as_deref(), Some("lens"));
        assert!(matches!(camera.projection, Projection::Perspective { zfar: None, .. }));
    }
}

#[test]
fn camera_projection_matrices() {
    let asset = import(&json_only(json!({
        "asset": { "version": "2.0" },
        "cameras": [
            { "type": "perspective", "perspective": { "yfov": 0.8, "znear": 0.1, "zfar": 100.0, "aspectRatio": 2.0 } },
            { "type": "perspective", "perspective": { "yfov": 0.8, "znear": 0.1 } },
            { "type": "orthographic", "orthographic": { "xmag": 2.0, "ymag": 1.0, "znear": 0.0, "zfar": 10.0 } },
        ],
        "nodes": [{ "camera": 0 }, { "camera": 1 }, { "camera": 2 }],
        "scenes": [{ "nodes": [0, 1, 2] }],
    })));
    let camera = |index: usize| {
        let node = asset.scene.get_node(asset.entity_of_node(index).unwrap()).unwrap();
        &asset.scene.cameras[node.camera.unwrap()]
    };

    // The document aspect ratio wins over the fallback.
    let finite = camera(0).projection_matrix(1.0);
    assert!(finite.abs_diff_eq(glam::Mat4::perspective_rh(0.8, 2.0, 0.1, 100.0), EPSILON));

    let infinite = camera(1).projection_matrix(1.5);
    assert!(infinite.abs_diff_eq(glam::Mat4::perspective_infinite_rh(0.8, 1.5, 0.1), EPSILON));

    let ortho = camera(2).projection_matrix(1.0);
    assert!(ortho.abs_diff_eq(glam::Mat4::orthographic_rh(-2.0, 2.0, -1.0, 1.0, 0.0, 10.0), EPSILON));
}

#[test]
fn camera_without_projection_fails() {
    let result = GltfLoader::load_slice(
        &json_only(json!({
            "asset": { "version": "2.0" },
            "cameras": [{ "type": "orthographic" }],
        })),
        ImportOptions::default(),
    );
    assert!(matches!(result, Err(ImportError::Malformed(_))));
}

#[test]
fn punctual_lights_are_attached() {
    let asset = import(&json_only(json!({
        "asset": { "version": "2.0" },
        "extensionsUsed": ["KHR_lights_punctual"],
        "extensions": {
            "KHR_lights_punctual": {
                "lights": [
                    { "type": "spot", "color": [1.0, 0.5, 0.0], "intensity": 3.0, "spot": { "outerConeAngle": 0.5 } },
                    { "type": "directional" },
                ]
            }
        },
        "nodes": [{ "extensions": { "KHR_lights_punctual": { "light": 0 } } }],
        "scenes": [{ "nodes": [0] }],
    })));

    assert!(asset.warnings.is_empty());
    let node = asset.scene.get_node(asset.entity_of_node(0).unwrap()).unwrap();
    let light = &asset.scene.lights[node.light.unwrap()];
    assert_eq!(light.source, 0);
    assert!(approx_vec(light.color, Vec3::new(1.0, 0.5, 0.0)));
    assert!((light.intensity - 3.0).abs() < EPSILON);
    match &light.kind {
        LightKind::Spot(spot) => {
            assert!((spot.outer_cone - 0.5).abs() < EPSILON);
            assert!(spot.inner_cone.abs() < EPSILON);
        }
        other => panic!("expected a spot light, got {other:?}"),
    }
    assert_eq!(light.range(), None);
    // The directional light is referenced by no node.
    assert_eq!(asset.scene.lights.len(), 1);
}

#[test]
fn point_light_keeps_its_range() {
    let asset = import(&json_only(json!({
        "asset": { "version": "2.0" },
        "extensions": { "KHR_lights_punctual": { "lights": [{ "type": "point", "range": 12.5 }] } },
        "nodes": [{ "extensions": { "KHR_lights_punctual": { "light": 0 } } }],
        "scenes": [{ "nodes": [0] }],
    })));

    let node = asset.scene.get_node(asset.entity_of_node(0).unwrap()).unwrap();
    assert_eq!(asset.scene.lights[node.light.unwrap()].range(), Some(12.5));
}

#[test]
fn node_light_out_of_range_fails() {
    let result = GltfLoader::load_slice(
        &json_only(json!({
            "asset": { "version": "2.0" },
            "nodes": [{ "extensions": { "KHR_lights_punctual": { "light": 0 } } }],
        })),
        ImportOptions::default(),
    );
    assert!(matches!(result, Err(ImportError::IndexOutOfBounds { .. })));
}

#[test]
fn layers_are_resolved_to_names() {
    let asset = import(&json_only(json!({
        "asset": { "version": "2.0" },
        "extensionsUsed": ["KDAB_kuesa_layers"],
        "extensions": {
            "KDAB_kuesa_layers": { "layers": [{ "name": "opaque" }, { "name": "transparent" }] }
        },
        "nodes": [{ "extensions": { "KDAB_kuesa_layers": { "layers": [1, 0] } } }],
        "scenes": [{ "nodes": [0] }],
    })));

    let node = asset.scene.get_node(asset.entity_of_node(0).unwrap()).unwrap();
    let layers: Vec<&str> = node.layers.iter().map(String::as_str).collect();
    assert_eq!(layers, vec!["transparent", "opaque"]);
}
