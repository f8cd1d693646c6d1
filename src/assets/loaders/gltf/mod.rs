//! glTF 2.0 importer.
//!
//! ```rust,ignore
//! use myth_gltf::{GltfLoader, ImportOptions};
//!
//! let asset = GltfLoader::load_file("models/character.glb")?;
//! for clip in &asset.clips {
//!     println!("{}: {:.2}s, {} channels", clip.name, clip.duration, clip.channels.len());
//! }
//!
//! // Parse on a worker thread and poll for the result.
//! let pending = GltfLoader::spawn("models/city.gltf", ImportOptions::default());
//! let asset = pending.wait()?;
//! ```

pub mod accessor;
pub mod buffers;
pub mod container;
pub mod context;
pub mod document;
pub mod hierarchy;
pub mod material;
pub mod materialize;
pub mod mesh;
pub mod skin;

use std::path::{Path, PathBuf};
use std::thread;

use crate::assets::io::{AssetReader, FileAssetReader};
use crate::assets::prefab::ImportedAsset;
use crate::errors::{ImportError, Result};

pub use context::{ParseContext, SUPPORTED_EXTENSIONS};
pub use materialize::IMPORT_ROOT_NAME;

/// Import settings.
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Directory relative URIs are resolved against. Defaults to the
    /// directory of the imported file.
    pub base_dir: Option<PathBuf>,
    /// Rewrite `JOINTS_n` attributes to skeleton-local joint indices.
    pub remap_skin_joints: bool,
    /// Decode mesh primitive data.
    pub decode_meshes: bool,
    /// Bake animations.
    pub load_animations: bool,
    /// Extensions accepted in addition to [`SUPPORTED_EXTENSIONS`].
    pub extra_supported_extensions: Vec<String>,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            base_dir: None,
            remap_skin_joints: true,
            decode_meshes: true,
            load_animations: true,
            extra_supported_extensions: Vec::new(),
        }
    }
}

impl ImportOptions {
    #[must_use]
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn with_remap_skin_joints(mut self, enabled: bool) -> Self {
        self.remap_skin_joints = enabled;
        self
    }

    #[must_use]
    pub fn with_decode_meshes(mut self, enabled: bool) -> Self {
        self.decode_meshes = enabled;
        self
    }

    #[must_use]
    pub fn with_animations(mut self, enabled: bool) -> Self {
        self.load_animations = enabled;
        self
    }

    #[must_use]
    pub fn with_extension(mut self, name: impl Into<String>) -> Self {
        self.extra_supported_extensions.push(name.into());
        self
    }
}

/// Entry points of the importer.
pub struct GltfLoader;

impl GltfLoader {
    /// Imports a `.gltf` or `.glb` file with default options.
    pub fn load_file(path: impl AsRef<Path>) -> Result<ImportedAsset> {
        Self::load_file_with_options(path, ImportOptions::default())
    }

    pub fn load_file_with_options(path: impl AsRef<Path>, mut options: ImportOptions) -> Result<ImportedAsset> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| ImportError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;

        if options.base_dir.is_none() {
            options.base_dir = Some(path.parent().unwrap_or(Path::new(".")).to_path_buf());
        }

        let mut asset = Self::load_slice(&bytes, options)?;
        asset.dependencies.insert(0, path.to_path_buf());
        Ok(asset)
    }

    /// Imports from memory. External URIs are read from `options.base_dir`
    /// (or the working directory).
    pub fn load_slice(bytes: &[u8], options: ImportOptions) -> Result<ImportedAsset> {
        let reader = FileAssetReader::new(options.base_dir.clone().unwrap_or_else(|| PathBuf::from(".")));
        Self::load_with_reader(bytes, &reader, options)
    }

    /// Imports from memory, resolving external URIs through `reader`.
    pub fn load_with_reader(bytes: &[u8], reader: &dyn AssetReader, options: ImportOptions) -> Result<ImportedAsset> {
        let context = ParseContext::parse(bytes, reader, options)?;
        materialize::materialize(context)
    }

    /// Imports a file on a worker thread.
    #[must_use]
    pub fn spawn(path: impl Into<PathBuf>, options: ImportOptions) -> PendingImport {
        let path = path.into();
        PendingImport::run(move || Self::load_file_with_options(&path, options))
    }

    /// Imports in-memory bytes on a worker thread.
    #[must_use]
    pub fn spawn_bytes(bytes: Vec<u8>, options: ImportOptions) -> PendingImport {
        PendingImport::run(move || Self::load_slice(&bytes, options))
    }
}

/// Handle to an import running on a worker thread.
pub struct PendingImport {
    receiver: flume::Receiver<Result<ImportedAsset>>,
}

impl PendingImport {
    fn run<F>(job: F) -> Self
    where
        F: FnOnce() -> Result<ImportedAsset> + Send + 'static,
    {
        let (sender, receiver) = flume::bounded(1);
        let spawned = thread::Builder::new()
            .name("gltf-import".to_string())
            .spawn(move || {
                // The receiver may already be gone; nothing to report then.
                let _ = sender.send(job());
            });

        if let Err(err) = spawned {
            let (sender, receiver) = flume::bounded(1);
            let _ = sender.send(Err(ImportError::WorkerError(err.to_string())));
            return Self { receiver };
        }
        Self { receiver }
    }

    /// Returns the result if the import has finished.
    #[must_use]
    pub fn try_take(&self) -> Option<Result<ImportedAsset>> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(flume::TryRecvError::Empty) => None,
            Err(flume::TryRecvError::Disconnected) => Some(Err(ImportError::WorkerError(
                "worker exited without a result".to_string(),
            ))),
        }
    }

    /// Blocks until the import has finished.
    pub fn wait(self) -> Result<ImportedAsset> {
        self.receiver
            .recv()
            .map_err(|_| ImportError::WorkerError("worker exited without a result".to_string()))?
    }
}
