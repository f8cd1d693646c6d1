//! Prints a summary of a glTF asset: scene graph, skeletons and baked clips.
//!
//! ```text
//! cargo run --example gltf_inspect -- path/to/model.glb
//! ```

use anyhow::Context;
use myth_gltf::{GltfLoader, ImportedAsset, NodeHandle};

fn print_tree(asset: &ImportedAsset, handle: NodeHandle, depth: usize) {
    let Some(node) = asset.scene.get_node(handle) else {
        return;
    };
    let mut tags = Vec::new();
    if node.camera.is_some() {
        tags.push("camera");
    }
    if node.light.is_some() {
        tags.push("light");
    }
    if node.primitive.is_some() {
        tags.push("primitive");
    }
    if node.armature.is_some() {
        tags.push("skinned");
    }
    println!(
        "{:indent$}{} {}",
        "",
        node.name.as_deref().unwrap_or("<unnamed>"),
        if tags.is_empty() { String::new() } else { format!("[{}]", tags.join(", ")) },
        indent = depth * 2
    );
    for &child in node.children() {
        print_tree(asset, child, depth + 1);
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let path = std::env::args().nth(1).context("usage: gltf_inspect <file.gltf|file.glb>")?;
    let asset = GltfLoader::load_file(&path).with_context(|| format!("failed to import {path}"))?;

    if let Some(generator) = &asset.asset.generator {
        println!("generator: {generator}");
    }
    println!("nodes: {}, meshes: {}, materials: {}", asset.nodes.len(), asset.meshes.len(), asset.materials.len());
    print_tree(&asset, asset.root, 0);

    for key in &asset.skeletons {
        let skeleton = &asset.scene.skeletons[*key];
        println!("skeleton '{}': {} joints", skeleton.name, skeleton.joint_count());
    }

    for (clip, mapping) in asset.clips.iter().zip(&asset.mappings) {
        println!("clip '{}': {:.3}s, {} channels", clip.name, clip.duration, clip.channels.len());
        for entry in &mapping.entries {
            println!("  {} -> {:?}", entry.channel_name, entry.target);
        }
    }

    for warning in &asset.warnings {
        println!("warning: {warning}");
    }
    for dependency in &asset.dependencies {
        println!("dependency: {}", dependency.display());
    }
    Ok(())
}
