pub mod io;
pub mod loaders;
pub mod prefab;

pub use io::{AssetReader, FileAssetReader, MemoryAssetReader, UriPayload};
pub use loaders::{GltfLoader, ImportOptions, PendingImport};
pub use prefab::{ImportedAsset, SceneRoot, SharedAsset};
