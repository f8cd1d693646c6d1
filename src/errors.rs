//! Error Types
//!
//! This module defines the error and warning types produced by the importer.
//!
//! # Overview
//!
//! The main error type [`ImportError`] covers every fatal failure mode:
//! - I/O failures while resolving buffer payloads
//! - Structural problems (container framing, malformed JSON, bad indices)
//! - Semantic problems (component-count mismatches, invalid interpolation
//!   keywords, unsupported required extensions, degenerate skins)
//!
//! Recoverable issues never abort an import. They are collected as
//! [`ImportWarning`] values and returned next to the imported asset.
//!
//! # Usage
//!
//! All fallible APIs return [`Result<T>`] which is an alias for
//! `std::result::Result<T, ImportError>`.
//!
//! ```rust,ignore
//! use myth_gltf::errors::{ImportError, ErrorCategory};
//!
//! match myth_gltf::GltfLoader::load_file("scene.glb") {
//!     Ok(asset) => println!("{} warnings", asset.warnings.len()),
//!     Err(err) if err.category() == ErrorCategory::Io => eprintln!("io: {err}"),
//!     Err(err) => eprintln!("rejected: {err}"),
//! }
//! ```

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Coarse classification of a fatal import error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Unreadable or undersized external payloads.
    Io,
    /// Malformed framing, JSON, indices or buffer layouts.
    Structural,
    /// Well-formed input whose content cannot be honoured.
    Semantic,
}

/// The main error type for the glTF importer.
///
/// Any of these aborts the whole import; no partially materialized scene
/// is ever returned alongside one.
#[derive(Error, Debug)]
pub enum ImportError {
    // ========================================================================
    // I/O Errors
    // ========================================================================
    /// File I/O error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// An external buffer or image could not be read.
    #[error("Failed to read '{}': {source}", path.display())]
    ReadFailed {
        /// Resolved file system path
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// A buffer payload does not have its declared length.
    #[error("Buffer {index} size mismatch: declared {declared} bytes, got {actual}")]
    BufferSizeMismatch {
        /// Buffer index
        index: usize,
        /// `byteLength` from the document
        declared: usize,
        /// Number of bytes actually obtained
        actual: usize,
    },

    // ========================================================================
    // Structural Errors
    // ========================================================================
    /// GLB container framing error.
    #[error("Invalid GLB container: {0}")]
    ContainerError(String),

    /// JSON parsing error.
    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Base64 decoding error.
    #[error("Base64 decode error: {0}")]
    Base64Error(#[from] base64::DecodeError),

    /// Data URI parsing error.
    #[error("Data URI error: {0}")]
    DataUriError(String),

    /// A reference points outside of its collection.
    #[error("Index out of bounds: {context} (index: {index})")]
    IndexOutOfBounds {
        /// Description of what was being accessed
        context: String,
        /// The invalid index
        index: usize,
    },

    /// A buffer view or accessor layout is invalid.
    #[error("Invalid {kind} {index}: {reason}")]
    InvalidLayout {
        /// `"bufferView"`, `"accessor"` or `"sparse accessor"`
        kind: &'static str,
        /// Index of the offending record
        index: usize,
        /// Human readable reason
        reason: String,
    },

    /// Any other malformed document content.
    #[error("Malformed document: {0}")]
    Malformed(String),

    // ========================================================================
    // Semantic Errors
    // ========================================================================
    /// The document requires an extension this importer does not support.
    #[error("Unsupported required extension: {0}")]
    UnsupportedExtension(String),

    /// The asset declares an unsupported glTF version.
    #[error("Unsupported glTF version: {0}")]
    UnsupportedVersion(String),

    /// A skin cannot be turned into a skeleton.
    #[error("Skin {index}: {reason}")]
    InvalidSkin {
        /// Skin index
        index: usize,
        /// Human readable reason
        reason: String,
    },

    /// An animation cannot be baked; the whole animation is rejected.
    #[error("Animation '{animation}': {reason}")]
    InvalidAnimation {
        /// Animation name (or `animation_{index}`)
        animation: String,
        /// Human readable reason
        reason: String,
    },

    // ========================================================================
    // Threading Errors
    // ========================================================================
    /// The background import worker disappeared without a result.
    #[error("Import worker failed: {0}")]
    WorkerError(String),
}

impl ImportError {
    /// Returns the coarse category of this error.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::IoError(_) | Self::ReadFailed { .. } | Self::BufferSizeMismatch { .. } => {
                ErrorCategory::Io
            }
            Self::ContainerError(_)
            | Self::JsonError(_)
            | Self::Base64Error(_)
            | Self::DataUriError(_)
            | Self::IndexOutOfBounds { .. }
            | Self::InvalidLayout { .. }
            | Self::Malformed(_)
            | Self::WorkerError(_) => ErrorCategory::Structural,
            Self::UnsupportedExtension(_)
            | Self::UnsupportedVersion(_)
            | Self::InvalidSkin { .. }
            | Self::InvalidAnimation { .. } => ErrorCategory::Semantic,
        }
    }

    pub(crate) fn out_of_bounds(context: impl Into<String>, index: usize) -> Self {
        Self::IndexOutOfBounds {
            context: context.into(),
            index,
        }
    }
}

/// Alias for `Result<T, ImportError>`.
pub type Result<T> = std::result::Result<T, ImportError>;

// ============================================================================
// Warnings
// ============================================================================

/// A recoverable issue found while importing.
///
/// Warnings are logged when they are recorded and also returned with the
/// imported asset so tools can surface them.
#[derive(Debug, Clone, PartialEq)]
pub enum ImportWarning {
    /// A node lists a child index that does not exist.
    ChildOutOfRange { node: usize, child: usize },
    /// A node lists a child that already has a parent (or lists it twice).
    DuplicateChild { node: usize, child: usize },
    /// A node lists itself as a child.
    SelfChild { node: usize },
    /// The document uses an extension that is not understood.
    UnknownExtension(String),
    /// An ordinary channel was dropped in favour of an extension channel.
    ChannelOverridden { animation: String, sampler: usize },
    /// A primitive could not be decoded and was skipped.
    PrimitiveSkipped { mesh: usize, primitive: usize, reason: String },
    /// The skin's `skeleton` hint disagrees with the computed root.
    SkeletonHintMismatch { skin: usize, hint: usize, computed: Option<usize> },
    /// A node is part of no declared scene and was never materialized.
    UnreachableNode { node: usize },
}

impl fmt::Display for ImportWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ChildOutOfRange { node, child } => {
                write!(f, "node {node} references missing child {child}")
            }
            Self::DuplicateChild { node, child } => {
                write!(f, "node {node} references child {child} which already has a parent")
            }
            Self::SelfChild { node } => write!(f, "node {node} lists itself as a child"),
            Self::UnknownExtension(name) => write!(f, "extension '{name}' is not supported"),
            Self::ChannelOverridden { animation, sampler } => write!(
                f,
                "animation '{animation}': channel using sampler {sampler} overridden by EXT_property_animation"
            ),
            Self::PrimitiveSkipped {
                mesh,
                primitive,
                reason,
            } => write!(f, "mesh {mesh} primitive {primitive} skipped: {reason}"),
            Self::SkeletonHintMismatch {
                skin,
                hint,
                computed,
            } => write!(
                f,
                "skin {skin}: skeleton hint {hint} differs from computed root {computed:?}"
            ),
            Self::UnreachableNode { node } => write!(f, "node {node} is not reachable from any leaf"),
        }
    }
}
