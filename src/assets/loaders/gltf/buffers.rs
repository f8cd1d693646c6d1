//! Buffer and buffer view resolution.
//!
//! Every buffer record is turned into an owned, immutable byte payload that
//! lives for the rest of the parse. Buffer views are validated against those
//! payloads so later stages can slice them without further checks.

use std::path::PathBuf;

use crate::assets::io::AssetReader;
use crate::assets::loaders::gltf::document;
use crate::errors::{ImportError, Result};

/// GLB `BIN` chunks may carry up to three bytes of alignment padding.
const MAX_CHUNK_PADDING: usize = 3;

/// An immutable byte payload identified by its buffer index.
#[derive(Debug, Clone)]
pub struct RawBuffer {
    pub index: usize,
    pub data: Vec<u8>,
}

/// A validated byte window into a [`RawBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferViewRecord {
    pub buffer: usize,
    pub byte_offset: usize,
    pub byte_length: usize,
    /// `0` means tightly packed.
    pub byte_stride: usize,
}

/// Output of the buffer stage.
#[derive(Debug, Default)]
pub struct ResolvedBuffers {
    pub buffers: Vec<RawBuffer>,
    /// Local files that buffers were read from.
    pub local_files: Vec<PathBuf>,
}

/// Loads every buffer of the document.
///
/// Buffer 0 without a `uri` takes its bytes from the GLB binary chunk. Any
/// payload whose size differs from `byteLength` fails the import.
pub fn resolve_buffers(
    buffers: &[document::Buffer],
    bin_chunk: Option<&[u8]>,
    reader: &dyn AssetReader,
) -> Result<ResolvedBuffers> {
    let mut resolved = ResolvedBuffers {
        buffers: Vec::with_capacity(buffers.len()),
        local_files: Vec::new(),
    };

    for (index, buffer) in buffers.iter().enumerate() {
        let data = match (&buffer.uri, index, bin_chunk) {
            (Some(uri), _, _) => {
                let payload = reader.read_uri(uri)?;
                if let Some(path) = payload.local_path {
                    resolved.local_files.push(path);
                }
                if payload.bytes.len() != buffer.byte_length {
                    return Err(ImportError::BufferSizeMismatch {
                        index,
                        declared: buffer.byte_length,
                        actual: payload.bytes.len(),
                    });
                }
                payload.bytes
            }
            (None, 0, Some(chunk)) => {
                let padded = buffer.byte_length + MAX_CHUNK_PADDING;
                if chunk.len() < buffer.byte_length || chunk.len() > padded {
                    return Err(ImportError::BufferSizeMismatch {
                        index,
                        declared: buffer.byte_length,
                        actual: chunk.len(),
                    });
                }
                chunk[..buffer.byte_length].to_vec()
            }
            (None, 0, None) => {
                return Err(ImportError::Malformed(
                    "buffer 0 has no uri and the source has no binary chunk".to_string(),
                ));
            }
            (None, _, _) => {
                return Err(ImportError::Malformed(format!(
                    "buffer {index} has no uri; only buffer 0 may reference the binary chunk"
                )));
            }
        };

        log::debug!("Resolved buffer {index} ({} bytes)", data.len());
        resolved.buffers.push(RawBuffer { index, data });
    }

    Ok(resolved)
}

/// Validates buffer views against the resolved payloads.
pub fn resolve_buffer_views(
    views: &[document::BufferView],
    buffers: &[RawBuffer],
) -> Result<Vec<BufferViewRecord>> {
    views
        .iter()
        .enumerate()
        .map(|(index, view)| {
            let buffer = buffers
                .get(view.buffer)
                .ok_or_else(|| ImportError::out_of_bounds(format!("bufferView {index} buffer"), view.buffer))?;

            let end = view.byte_offset.checked_add(view.byte_length);
            if end.is_none_or(|end| end > buffer.data.len()) {
                return Err(ImportError::InvalidLayout {
                    kind: "bufferView",
                    index,
                    reason: format!(
                        "range {}+{} exceeds buffer {} length {}",
                        view.byte_offset,
                        view.byte_length,
                        view.buffer,
                        buffer.data.len()
                    ),
                });
            }

            Ok(BufferViewRecord {
                buffer: view.buffer,
                byte_offset: view.byte_offset,
                byte_length: view.byte_length,
                byte_stride: view.byte_stride.unwrap_or(0),
            })
        })
        .collect()
}

/// Returns the bytes covered by a buffer view.
#[must_use]
pub fn view_bytes<'a>(view: &BufferViewRecord, buffers: &'a [RawBuffer]) -> &'a [u8] {
    &buffers[view.buffer].data[view.byte_offset..view.byte_offset + view.byte_length]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::io::MemoryAssetReader;

    fn buffer(uri: Option<&str>, byte_length: usize) -> document::Buffer {
        document::Buffer {
            name: None,
            uri: uri.map(str::to_string),
            byte_length,
        }
    }

    #[test]
    fn bin_chunk_padding_is_trimmed() {
        let reader = MemoryAssetReader::new();
        let chunk = [1u8, 2, 3, 4, 5, 0, 0, 0];
        let resolved = resolve_buffers(&[buffer(None, 5)], Some(&chunk), &reader).unwrap();
        assert_eq!(resolved.buffers[0].data, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn external_size_mismatch_fails() {
        let reader = MemoryAssetReader::new().with_file("a.bin", vec![0; 3]);
        let err = resolve_buffers(&[buffer(Some("a.bin"), 4)], None, &reader).unwrap_err();
        assert!(matches!(err, ImportError::BufferSizeMismatch { actual: 3, .. }));
    }

    #[test]
    fn only_buffer_zero_may_use_the_chunk() {
        let reader = MemoryAssetReader::new().with_file("a.bin", vec![0; 4]);
        let buffers = [buffer(Some("a.bin"), 4), buffer(None, 4)];
        assert!(resolve_buffers(&buffers, Some(&[0; 4]), &reader).is_err());
    }

    #[test]
    fn view_outside_buffer_fails() {
        let buffers = [RawBuffer {
            index: 0,
            data: vec![0; 8],
        }];
        let view = document::BufferView {
            name: None,
            buffer: 0,
            byte_offset: 4,
            byte_length: 8,
            byte_stride: None,
            target: None,
        };
        assert!(resolve_buffer_views(&[view], &buffers).is_err());
    }
}
