//! URI readers used to resolve external buffer and image payloads.
//!
//! glTF documents reference payloads either inline (`data:` URIs with a
//! base64 body) or by a path relative to the document. [`AssetReader`] is the
//! seam that turns such a URI into bytes; [`FileAssetReader`] reads from the
//! local file system and [`MemoryAssetReader`] from an in-memory table.

use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rustc_hash::FxHashMap;

use crate::errors::{ImportError, Result};

/// Bytes obtained for a URI, plus the local path they came from (if any).
#[derive(Debug, Clone)]
pub struct UriPayload {
    pub bytes: Vec<u8>,
    pub local_path: Option<PathBuf>,
}

/// Resolves glTF URIs to byte payloads.
pub trait AssetReader: Send + Sync {
    /// Reads a non-`data:` URI.
    fn read_external(&self, uri: &str) -> Result<UriPayload>;

    /// Reads any URI, decoding `data:` URIs inline.
    fn read_uri(&self, uri: &str) -> Result<UriPayload> {
        if uri.starts_with("data:") {
            Ok(UriPayload {
                bytes: decode_data_uri(uri)?,
                local_path: None,
            })
        } else {
            self.read_external(uri)
        }
    }
}

/// Local file reader rooted at the document's directory.
#[derive(Debug, Clone)]
pub struct FileAssetReader {
    root_path: PathBuf,
}

impl FileAssetReader {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let root_path = if path.is_file() {
            path.parent().unwrap_or(Path::new(".")).to_path_buf()
        } else {
            path.to_path_buf()
        };
        Self { root_path }
    }

    #[inline]
    #[must_use]
    pub fn root_path(&self) -> &Path {
        &self.root_path
    }
}

impl AssetReader for FileAssetReader {
    fn read_external(&self, uri: &str) -> Result<UriPayload> {
        let uri = uri.strip_prefix("file://").unwrap_or(uri);
        let path = self.root_path.join(uri);
        let bytes = std::fs::read(&path).map_err(|source| ImportError::ReadFailed {
            path: path.clone(),
            source,
        })?;
        Ok(UriPayload {
            bytes,
            local_path: Some(path),
        })
    }
}

/// Reader serving payloads from memory, keyed by URI.
#[derive(Debug, Clone, Default)]
pub struct MemoryAssetReader {
    files: FxHashMap<String, Vec<u8>>,
}

impl MemoryAssetReader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a payload for `uri`.
    #[must_use]
    pub fn with_file(mut self, uri: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.files.insert(uri.into(), bytes);
        self
    }
}

impl AssetReader for MemoryAssetReader {
    fn read_external(&self, uri: &str) -> Result<UriPayload> {
        let bytes = self.files.get(uri).cloned().ok_or_else(|| ImportError::ReadFailed {
            path: PathBuf::from(uri),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not registered"),
        })?;
        Ok(UriPayload {
            bytes,
            local_path: None,
        })
    }
}

/// Decodes a `data:[<mime>][;base64],<payload>` URI.
pub fn decode_data_uri(uri: &str) -> Result<Vec<u8>> {
    let body = uri
        .strip_prefix("data:")
        .ok_or_else(|| ImportError::DataUriError("missing 'data:' scheme".to_string()))?;
    let (header, payload) = body
        .split_once(',')
        .ok_or_else(|| ImportError::DataUriError("missing ',' separator".to_string()))?;

    if header.ends_with(";base64") {
        Ok(STANDARD.decode(payload)?)
    } else {
        Err(ImportError::DataUriError(format!(
            "only base64 payloads are supported (header '{header}')"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_base64_data_uri() {
        let bytes = decode_data_uri("data:application/octet-stream;base64,AAECAw==").unwrap();
        assert_eq!(bytes, vec![0, 1, 2, 3]);
    }

    #[test]
    fn rejects_plain_data_uri() {
        assert!(decode_data_uri("data:text/plain,hello").is_err());
    }

    #[test]
    fn memory_reader_serves_registered_files() {
        let reader = MemoryAssetReader::new().with_file("a.bin", vec![7, 7]);
        assert_eq!(reader.read_uri("a.bin").unwrap().bytes, vec![7, 7]);
        assert!(reader.read_uri("b.bin").is_err());
    }
}
