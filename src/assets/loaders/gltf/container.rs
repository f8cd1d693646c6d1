//! GLB container framing.
//!
//! A GLB file is a 12 byte header followed by length-prefixed chunks:
//!
//! ```text
//! magic:u32 = "glTF" | version:u32 | length:u32
//! chunkLength:u32 | chunkType:u32 | data[chunkLength] ...
//! ```
//!
//! Exactly one `JSON` chunk must be present, at most one `BIN` chunk may be.
//! Chunks of any other type are skipped.

use crate::errors::{ImportError, Result};

/// `"glTF"` read as a little-endian `u32`.
pub const GLB_MAGIC: u32 = 0x4654_6C67;
/// `"JSON"` chunk type.
pub const CHUNK_JSON: u32 = 0x4E4F_534A;
/// `"BIN\0"` chunk type.
pub const CHUNK_BIN: u32 = 0x004E_4942;

const HEADER_LEN: usize = 12;
const CHUNK_HEADER_LEN: usize = 8;

/// The two payloads of an import source, borrowed from the input bytes.
#[derive(Debug, Clone, Copy)]
pub struct Container<'a> {
    pub json: &'a [u8],
    pub bin: Option<&'a [u8]>,
}

/// Returns `true` when `bytes` start with the GLB magic number.
#[must_use]
pub fn is_glb(bytes: &[u8]) -> bool {
    read_u32(bytes, 0) == Some(GLB_MAGIC)
}

/// Splits an import source into its JSON document and optional binary chunk.
///
/// Plain JSON input is returned unchanged with no binary chunk.
pub fn split(bytes: &[u8]) -> Result<Container<'_>> {
    if !is_glb(bytes) {
        return Ok(Container {
            json: bytes,
            bin: None,
        });
    }

    let version = read_u32(bytes, 4).ok_or_else(|| truncated("header"))?;
    if version != 2 {
        return Err(ImportError::ContainerError(format!(
            "unsupported GLB version {version}"
        )));
    }

    let declared = read_u32(bytes, 8).ok_or_else(|| truncated("header"))? as usize;
    if declared > bytes.len() {
        return Err(ImportError::ContainerError(format!(
            "header declares {declared} bytes but only {} are available",
            bytes.len()
        )));
    }
    let bytes = &bytes[..declared];

    let mut json = None;
    let mut bin = None;
    let mut cursor = HEADER_LEN;

    while cursor < bytes.len() {
        let length = read_u32(bytes, cursor).ok_or_else(|| truncated("chunk header"))? as usize;
        let kind = read_u32(bytes, cursor + 4).ok_or_else(|| truncated("chunk header"))?;
        let start = cursor + CHUNK_HEADER_LEN;
        let end = start
            .checked_add(length)
            .filter(|&end| end <= bytes.len())
            .ok_or_else(|| truncated("chunk data"))?;
        let data = &bytes[start..end];

        match kind {
            CHUNK_JSON => {
                if json.replace(data).is_some() {
                    return Err(ImportError::ContainerError(
                        "multiple JSON chunks".to_string(),
                    ));
                }
            }
            CHUNK_BIN => {
                if bin.replace(data).is_some() {
                    return Err(ImportError::ContainerError(
                        "multiple BIN chunks".to_string(),
                    ));
                }
            }
            other => log::debug!("Skipping unknown GLB chunk type {other:#010x}"),
        }

        cursor = end;
    }

    let json = json.ok_or_else(|| ImportError::ContainerError("missing JSON chunk".to_string()))?;
    Ok(Container { json, bin })
}

fn read_u32(bytes: &[u8], offset: usize) -> Option<u32> {
    let raw = bytes.get(offset..offset + 4)?;
    Some(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
}

fn truncated(what: &str) -> ImportError {
    ImportError::ContainerError(format!("truncated {what}"))
}
