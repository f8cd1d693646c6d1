//! Shared fixtures: a tiny glTF document builder with one binary buffer.

#![allow(dead_code)]

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Map, Value, json};

pub const FLOAT: u32 = 5126;
pub const UNSIGNED_BYTE: u32 = 5121;
pub const UNSIGNED_SHORT: u32 = 5123;

/// Builds glTF documents whose single buffer is assembled in memory.
pub struct GltfBuilder {
    bin: Vec<u8>,
    views: Vec<Value>,
    accessors: Vec<Value>,
    fields: Map<String, Value>,
}

impl Default for GltfBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GltfBuilder {
    pub fn new() -> Self {
        Self {
            bin: Vec::new(),
            views: Vec::new(),
            accessors: Vec::new(),
            fields: Map::new(),
        }
    }

    /// Appends `bytes` as a new buffer view (4-byte aligned).
    pub fn push_view(&mut self, bytes: &[u8], stride: Option<usize>) -> usize {
        while self.bin.len() % 4 != 0 {
            self.bin.push(0);
        }
        let mut view = json!({
            "buffer": 0,
            "byteOffset": self.bin.len(),
            "byteLength": bytes.len(),
        });
        if let Some(stride) = stride {
            view["byteStride"] = json!(stride);
        }
        self.bin.extend_from_slice(bytes);
        self.views.push(view);
        self.views.len() - 1
    }

    /// Adds an accessor description verbatim.
    pub fn push_accessor(&mut self, accessor: Value) -> usize {
        self.accessors.push(accessor);
        self.accessors.len() - 1
    }

    /// Adds tightly packed float data plus its accessor.
    pub fn push_f32(&mut self, data: &[f32], element_type: &str) -> usize {
        let components = match element_type {
            "SCALAR" => 1,
            "VEC2" => 2,
            "VEC3" => 3,
            "VEC4" => 4,
            "MAT4" => 16,
            other => panic!("unsupported fixture type {other}"),
        };
        let view = self.push_view(bytemuck::cast_slice(data), None);
        self.push_accessor(json!({
            "bufferView": view,
            "componentType": FLOAT,
            "count": data.len() / components,
            "type": element_type,
        }))
    }

    /// Sets (or replaces) a top-level document field.
    pub fn set(&mut self, key: &str, value: Value) -> &mut Self {
        self.fields.insert(key.to_string(), value);
        self
    }

    pub fn bin(&self) -> &[u8] {
        &self.bin
    }

    fn document(&self, buffer: Value) -> Value {
        let mut doc = Map::new();
        doc.insert("asset".into(), json!({ "version": "2.0" }));
        if !self.bin.is_empty() {
            doc.insert("buffers".into(), json!([buffer]));
            doc.insert("bufferViews".into(), Value::Array(self.views.clone()));
        }
        if !self.accessors.is_empty() {
            doc.insert("accessors".into(), Value::Array(self.accessors.clone()));
        }
        for (key, value) in &self.fields {
            doc.insert(key.clone(), value.clone());
        }
        Value::Object(doc)
    }

    /// Plain JSON with the buffer embedded as a base64 data URI.
    pub fn to_gltf(&self) -> Vec<u8> {
        let uri = format!("data:application/octet-stream;base64,{}", STANDARD.encode(&self.bin));
        let doc = self.document(json!({ "byteLength": self.bin.len(), "uri": uri }));
        serde_json::to_vec(&doc).unwrap()
    }

    /// Plain JSON referencing the buffer by an external URI.
    pub fn to_gltf_with_uri(&self, uri: &str) -> Vec<u8> {
        let doc = self.document(json!({ "byteLength": self.bin.len(), "uri": uri }));
        serde_json::to_vec(&doc).unwrap()
    }

    /// GLB with one JSON chunk and one BIN chunk.
    pub fn to_glb(&self) -> Vec<u8> {
        let doc = self.document(json!({ "byteLength": self.bin.len() }));
        glb(&serde_json::to_vec(&doc).unwrap(), Some(&self.bin))
    }
}

/// Assembles a GLB container. JSON is padded with spaces, BIN with zeros.
pub fn glb(json: &[u8], bin: Option<&[u8]>) -> Vec<u8> {
    let mut json = json.to_vec();
    while json.len() % 4 != 0 {
        json.push(b' ');
    }

    let mut body = Vec::new();
    body.extend_from_slice(&(json.len() as u32).to_le_bytes());
    body.extend_from_slice(&0x4E4F_534Au32.to_le_bytes());
    body.extend_from_slice(&json);

    if let Some(bin) = bin {
        let mut bin = bin.to_vec();
        while bin.len() % 4 != 0 {
            bin.push(0);
        }
        body.extend_from_slice(&(bin.len() as u32).to_le_bytes());
        body.extend_from_slice(&0x004E_4942u32.to_le_bytes());
        body.extend_from_slice(&bin);
    }

    let mut out = Vec::new();
    out.extend_from_slice(&0x4654_6C67u32.to_le_bytes());
    out.extend_from_slice(&2u32.to_le_bytes());
    out.extend_from_slice(&((12 + body.len()) as u32).to_le_bytes());
    out.extend_from_slice(&body);
    out
}

/// A document with no buffers at all.
pub fn json_only(doc: Value) -> Vec<u8> {
    serde_json::to_vec(&doc).unwrap()
}
