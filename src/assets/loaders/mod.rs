pub mod gltf;

pub use gltf::{GltfLoader, ImportOptions, PendingImport};
