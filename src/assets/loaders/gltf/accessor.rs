//! Accessor decoding.
//!
//! An accessor describes how to read a logical array of elements out of a
//! (possibly strided) buffer view. [`decode`] turns it into a tightly packed
//! byte array that is independent of the source stride, applies sparse
//! patches, and offers typed / normalized views of the result.

use crate::assets::loaders::gltf::buffers::{BufferViewRecord, RawBuffer, view_bytes};
use crate::assets::loaders::gltf::document;
use crate::errors::{ImportError, Result};

// ============================================================================
// Component & element types
// ============================================================================

/// Scalar storage type of an accessor component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentType {
    Byte,
    UnsignedByte,
    Short,
    UnsignedShort,
    Int,
    UnsignedInt,
    Float,
}

impl ComponentType {
    /// Maps a glTF `componentType` code to a component type.
    #[must_use]
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            5120 => Some(Self::Byte),
            5121 => Some(Self::UnsignedByte),
            5122 => Some(Self::Short),
            5123 => Some(Self::UnsignedShort),
            5124 => Some(Self::Int),
            5125 => Some(Self::UnsignedInt),
            5126 => Some(Self::Float),
            _ => None,
        }
    }

    #[must_use]
    pub fn code(self) -> u32 {
        match self {
            Self::Byte => 5120,
            Self::UnsignedByte => 5121,
            Self::Short => 5122,
            Self::UnsignedShort => 5123,
            Self::Int => 5124,
            Self::UnsignedInt => 5125,
            Self::Float => 5126,
        }
    }

    /// Size of one component in bytes.
    #[must_use]
    pub fn byte_size(self) -> usize {
        match self {
            Self::Byte | Self::UnsignedByte => 1,
            Self::Short | Self::UnsignedShort => 2,
            Self::Int | Self::UnsignedInt | Self::Float => 4,
        }
    }

    #[must_use]
    pub fn is_integer(self) -> bool {
        self != Self::Float
    }
}

/// Shape of one accessor element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementShape {
    Scalar,
    Vec2,
    Vec3,
    Vec4,
    Mat2,
    Mat3,
    Mat4,
}

impl ElementShape {
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "SCALAR" => Some(Self::Scalar),
            "VEC2" => Some(Self::Vec2),
            "VEC3" => Some(Self::Vec3),
            "VEC4" => Some(Self::Vec4),
            "MAT2" => Some(Self::Mat2),
            "MAT3" => Some(Self::Mat3),
            "MAT4" => Some(Self::Mat4),
            _ => None,
        }
    }

    /// Number of components per element.
    #[must_use]
    pub fn components(self) -> usize {
        match self {
            Self::Scalar => 1,
            Self::Vec2 => 2,
            Self::Vec3 => 3,
            Self::Vec4 | Self::Mat2 => 4,
            Self::Mat3 => 9,
            Self::Mat4 => 16,
        }
    }
}

/// A primitive numeric type stored in accessor data.
pub trait Component: bytemuck::Pod {
    const TYPE: ComponentType;

    /// Reads one value from the front of `bytes` (unaligned).
    #[inline]
    fn from_bytes(bytes: &[u8]) -> Self {
        bytemuck::pod_read_unaligned(&bytes[..std::mem::size_of::<Self>()])
    }

    /// Maps the value to `[-1, 1]` (signed) or `[0, 1]` (unsigned).
    /// Floats are returned unchanged.
    fn normalize(self) -> f32;

    /// Plain numeric conversion without normalization.
    fn to_f32(self) -> f32;
}

macro_rules! impl_integer_component {
    ($ty:ty, $kind:expr, signed) => {
        impl Component for $ty {
            const TYPE: ComponentType = $kind;

            #[inline]
            fn normalize(self) -> f32 {
                (self as f32 / <$ty>::MAX as f32).max(-1.0)
            }

            #[inline]
            fn to_f32(self) -> f32 {
                self as f32
            }
        }
    };
    ($ty:ty, $kind:expr, unsigned) => {
        impl Component for $ty {
            const TYPE: ComponentType = $kind;

            #[inline]
            fn normalize(self) -> f32 {
                self as f32 / <$ty>::MAX as f32
            }

            #[inline]
            fn to_f32(self) -> f32 {
                self as f32
            }
        }
    };
}

impl_integer_component!(i8, ComponentType::Byte, signed);
impl_integer_component!(u8, ComponentType::UnsignedByte, unsigned);
impl_integer_component!(i16, ComponentType::Short, signed);
impl_integer_component!(u16, ComponentType::UnsignedShort, unsigned);
impl_integer_component!(i32, ComponentType::Int, signed);
impl_integer_component!(u32, ComponentType::UnsignedInt, unsigned);

impl Component for f32 {
    const TYPE: ComponentType = ComponentType::Float;

    #[inline]
    fn normalize(self) -> f32 {
        self
    }

    #[inline]
    fn to_f32(self) -> f32 {
        self
    }
}

// ============================================================================
// Validated accessor records
// ============================================================================

/// Sparse storage of an accessor, validated against the buffer views.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SparseRecord {
    pub count: usize,
    pub indices_view: usize,
    pub indices_offset: usize,
    pub index_type: ComponentType,
    pub values_view: usize,
    pub values_offset: usize,
}

/// A validated accessor.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessorRecord {
    pub index: usize,
    pub name: Option<String>,
    pub buffer_view: Option<usize>,
    pub byte_offset: usize,
    pub component_type: ComponentType,
    pub shape: ElementShape,
    pub count: usize,
    pub normalized: bool,
    pub min: Option<Vec<f64>>,
    pub max: Option<Vec<f64>>,
    pub sparse: Option<SparseRecord>,
}

impl AccessorRecord {
    /// Size in bytes of one tightly packed element.
    #[must_use]
    pub fn element_size(&self) -> usize {
        self.component_type.byte_size() * self.shape.components()
    }
}

fn layout_error(kind: &'static str, index: usize, reason: impl Into<String>) -> ImportError {
    ImportError::InvalidLayout {
        kind,
        index,
        reason: reason.into(),
    }
}

/// Validates accessor records against the buffer views.
pub fn parse_accessors(
    accessors: &[document::Accessor],
    views: &[BufferViewRecord],
) -> Result<Vec<AccessorRecord>> {
    accessors
        .iter()
        .enumerate()
        .map(|(index, accessor)| parse_accessor(index, accessor, views))
        .collect()
}

fn parse_accessor(
    index: usize,
    accessor: &document::Accessor,
    views: &[BufferViewRecord],
) -> Result<AccessorRecord> {
    let component_type = ComponentType::from_code(accessor.component_type).ok_or_else(|| {
        layout_error(
            "accessor",
            index,
            format!("unsupported componentType {}", accessor.component_type),
        )
    })?;
    let shape = ElementShape::from_name(&accessor.element_type).ok_or_else(|| {
        layout_error(
            "accessor",
            index,
            format!("unsupported type '{}'", accessor.element_type),
        )
    })?;

    if let Some(view) = accessor.buffer_view {
        let record = views
            .get(view)
            .ok_or_else(|| ImportError::out_of_bounds(format!("accessor {index} bufferView"), view))?;
        let vertex_size = component_type.byte_size() * shape.components();
        if record.byte_stride > 0 && record.byte_stride < vertex_size {
            return Err(layout_error(
                "accessor",
                index,
                format!(
                    "byteStride {} is smaller than the element size {vertex_size}",
                    record.byte_stride
                ),
            ));
        }
    }

    let sparse = accessor
        .sparse
        .as_ref()
        .map(|sparse| {
            let index_type = ComponentType::from_code(sparse.indices.component_type)
                .filter(|ty| ty.is_integer())
                .ok_or_else(|| {
                    layout_error(
                        "sparse accessor",
                        index,
                        format!(
                            "unsupported index componentType {}",
                            sparse.indices.component_type
                        ),
                    )
                })?;
            for (what, view) in [
                ("indices", sparse.indices.buffer_view),
                ("values", sparse.values.buffer_view),
            ] {
                if view >= views.len() {
                    return Err(ImportError::out_of_bounds(
                        format!("sparse accessor {index} {what} bufferView"),
                        view,
                    ));
                }
            }
            Ok(SparseRecord {
                count: sparse.count,
                indices_view: sparse.indices.buffer_view,
                indices_offset: sparse.indices.byte_offset,
                index_type,
                values_view: sparse.values.buffer_view,
                values_offset: sparse.values.byte_offset,
            })
        })
        .transpose()?;

    Ok(AccessorRecord {
        index,
        name: accessor.name.clone(),
        buffer_view: accessor.buffer_view,
        byte_offset: accessor.byte_offset,
        component_type,
        shape,
        count: accessor.count,
        normalized: accessor.normalized,
        min: accessor.min.clone(),
        max: accessor.max.clone(),
        sparse,
    })
}

// ============================================================================
// Decoded data
// ============================================================================

/// An accessor's elements as a contiguous, tightly packed byte array.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAccessor {
    pub component_type: ComponentType,
    pub shape: ElementShape,
    pub count: usize,
    pub normalized: bool,
    pub data: Vec<u8>,
}

impl DecodedAccessor {
    #[inline]
    #[must_use]
    pub fn components(&self) -> usize {
        self.shape.components()
    }

    #[inline]
    #[must_use]
    pub fn element_size(&self) -> usize {
        self.component_type.byte_size() * self.components()
    }

    /// Reads all components as `T`, or `None` if the storage type differs.
    #[must_use]
    pub fn read<T: Component>(&self) -> Option<Vec<T>> {
        (self.component_type == T::TYPE).then(|| {
            self.data
                .chunks_exact(std::mem::size_of::<T>())
                .map(T::from_bytes)
                .collect()
        })
    }

    /// Reads all components as floats, normalizing integers only when the
    /// accessor is flagged `normalized`.
    #[must_use]
    pub fn to_f32(&self) -> Vec<f32> {
        if self.normalized {
            self.to_normalized_f32()
        } else {
            self.map_components(AnyComponent::to_f32)
        }
    }

    /// Reads all components as floats, always normalizing integer storage.
    #[must_use]
    pub fn to_normalized_f32(&self) -> Vec<f32> {
        self.map_components(AnyComponent::normalize)
    }

    /// Reads all components as unsigned integers (indices, joint ids).
    pub fn to_u32(&self) -> Result<Vec<u32>> {
        let values = match self.component_type {
            ComponentType::UnsignedByte => self.collect::<u8, _>(u32::from),
            ComponentType::UnsignedShort => self.collect::<u16, _>(u32::from),
            ComponentType::UnsignedInt => self.collect::<u32, _>(|v| v),
            other => {
                return Err(ImportError::Malformed(format!(
                    "expected unsigned integer data, found {other:?}"
                )));
            }
        };
        Ok(values)
    }

    fn map_components(&self, f32_of: impl Fn(AnyComponent) -> f32) -> Vec<f32> {
        match self.component_type {
            ComponentType::Byte => self.collect::<i8, _>(|v| f32_of(AnyComponent::I8(v))),
            ComponentType::UnsignedByte => self.collect::<u8, _>(|v| f32_of(AnyComponent::U8(v))),
            ComponentType::Short => self.collect::<i16, _>(|v| f32_of(AnyComponent::I16(v))),
            ComponentType::UnsignedShort => {
                self.collect::<u16, _>(|v| f32_of(AnyComponent::U16(v)))
            }
            ComponentType::Int => self.collect::<i32, _>(|v| f32_of(AnyComponent::I32(v))),
            ComponentType::UnsignedInt => self.collect::<u32, _>(|v| f32_of(AnyComponent::U32(v))),
            ComponentType::Float => self.collect::<f32, _>(|v| f32_of(AnyComponent::F32(v))),
        }
    }

    fn collect<T: Component, U>(&self, f: impl Fn(T) -> U) -> Vec<U> {
        self.data
            .chunks_exact(std::mem::size_of::<T>())
            .map(|chunk| f(T::from_bytes(chunk)))
            .collect()
    }
}

/// Type-erased component used to share the float conversion paths.
#[derive(Debug, Clone, Copy)]
enum AnyComponent {
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    F32(f32),
}

impl AnyComponent {
    fn to_f32(self) -> f32 {
        match self {
            Self::I8(v) => v.to_f32(),
            Self::U8(v) => v.to_f32(),
            Self::I16(v) => v.to_f32(),
            Self::U16(v) => v.to_f32(),
            Self::I32(v) => v.to_f32(),
            Self::U32(v) => v.to_f32(),
            Self::F32(v) => v,
        }
    }

    fn normalize(self) -> f32 {
        match self {
            Self::I8(v) => v.normalize(),
            Self::U8(v) => v.normalize(),
            Self::I16(v) => v.normalize(),
            Self::U16(v) => v.normalize(),
            Self::I32(v) => v.normalize(),
            Self::U32(v) => v.normalize(),
            Self::F32(v) => v,
        }
    }
}

// ============================================================================
// Decoding
// ============================================================================

/// Copies `count` rows of `vertex_size` bytes, `stride` bytes apart, into a
/// tightly packed buffer.
#[must_use]
pub fn unstride(source: &[u8], count: usize, stride: usize, vertex_size: usize) -> Vec<u8> {
    let mut packed = vec![0u8; count * vertex_size];
    for (row, out) in packed.chunks_exact_mut(vertex_size.max(1)).enumerate().take(count) {
        let start = row * stride;
        out.copy_from_slice(&source[start..start + vertex_size]);
    }
    packed
}

/// Decodes the accessor at `index`.
pub fn decode_index(
    index: usize,
    accessors: &[AccessorRecord],
    views: &[BufferViewRecord],
    buffers: &[RawBuffer],
) -> Result<DecodedAccessor> {
    let accessor = accessors
        .get(index)
        .ok_or_else(|| ImportError::out_of_bounds("accessor", index))?;
    decode(accessor, views, buffers)
}

/// Decodes an accessor into a tightly packed array, applying sparse patches.
pub fn decode(
    accessor: &AccessorRecord,
    views: &[BufferViewRecord],
    buffers: &[RawBuffer],
) -> Result<DecodedAccessor> {
    let vertex_size = accessor.element_size();

    let mut data = match accessor.buffer_view {
        Some(view_index) => {
            let view = views
                .get(view_index)
                .ok_or_else(|| ImportError::out_of_bounds("accessor bufferView", view_index))?;
            let byte_stride = if view.byte_stride > 0 {
                view.byte_stride
            } else {
                vertex_size
            };
            if byte_stride < vertex_size {
                return Err(layout_error(
                    "accessor",
                    accessor.index,
                    format!("byteStride {byte_stride} is smaller than the element size {vertex_size}"),
                ));
            }

            let bytes = view_bytes(view, buffers);
            let required = match accessor.count.checked_sub(1) {
                None => Some(accessor.byte_offset),
                Some(last) => last
                    .checked_mul(byte_stride)
                    .and_then(|rows| rows.checked_add(vertex_size))
                    .and_then(|rows| rows.checked_add(accessor.byte_offset)),
            };
            if required.is_none_or(|required| required > bytes.len()) {
                return Err(layout_error(
                    "accessor",
                    accessor.index,
                    format!(
                        "{} elements at offset {} with stride {byte_stride} do not fit in a view of {} bytes",
                        accessor.count,
                        accessor.byte_offset,
                        bytes.len()
                    ),
                ));
            }

            unstride(
                &bytes[accessor.byte_offset..],
                accessor.count,
                byte_stride,
                vertex_size,
            )
        }
        None => Vec::new(),
    };

    if let Some(sparse) = &accessor.sparse {
        apply_sparse(accessor, sparse, views, buffers, &mut data)?;
    } else if data.is_empty() {
        data = zeroed(accessor.count, vertex_size)
            .ok_or_else(|| layout_error("accessor", accessor.index, too_large(accessor.count)))?;
    }

    Ok(DecodedAccessor {
        component_type: accessor.component_type,
        shape: accessor.shape,
        count: accessor.count,
        normalized: accessor.normalized,
        data,
    })
}

/// Zero-filled `count * size` bytes, or `None` when that size overflows or
/// cannot be allocated.
fn zeroed(count: usize, size: usize) -> Option<Vec<u8>> {
    let len = count.checked_mul(size)?;
    let mut data = Vec::new();
    data.try_reserve_exact(len).ok()?;
    data.resize(len, 0);
    Some(data)
}

fn too_large(count: usize) -> String {
    format!("{count} elements exceed the addressable size")
}

// ============================================================================
// Sparse patching
// ============================================================================

/// Integer type usable as a sparse index.
pub trait SparseIndex: Component {
    const SIZE: usize;

    /// Converts to an element index; negative values yield `None`.
    fn to_index(self) -> Option<usize>;
}

macro_rules! impl_sparse_index {
    ($($ty:ty),*) => {
        $(
            impl SparseIndex for $ty {
                const SIZE: usize = std::mem::size_of::<$ty>();

                #[inline]
                fn to_index(self) -> Option<usize> {
                    usize::try_from(self).ok()
                }
            }
        )*
    };
}

impl_sparse_index!(u8, u16, u32, i8, i16, i32);

/// Parameters of a sparse patch over a dense element buffer.
#[derive(Debug, Clone, Copy)]
pub struct SparsePatch<'a> {
    /// Number of elements of the dense buffer.
    pub buffer_count: usize,
    /// Distance in bytes between two elements of the dense buffer.
    pub stride: usize,
    /// Offset of the patched attribute inside an element.
    pub attribute_offset: usize,
    /// Number of bytes written per patched element.
    pub value_size: usize,
    /// Number of sparse entries.
    pub sparse_count: usize,
    /// Tightly packed index array.
    pub indices: &'a [u8],
    /// Tightly packed value array.
    pub values: &'a [u8],
}

/// Overwrites `target` at each sparse index with the matching value.
///
/// An empty `target` is first allocated as a zero-filled dense buffer.
pub fn apply_sparse_patch<I: SparseIndex>(target: &mut Vec<u8>, patch: &SparsePatch<'_>) -> Result<()> {
    if target.is_empty() {
        *target = zeroed(patch.buffer_count, patch.stride)
            .ok_or_else(|| ImportError::Malformed(too_large(patch.buffer_count)))?;
    }

    let fits = |len: usize, size: usize| patch.sparse_count.checked_mul(size).is_some_and(|needed| needed <= len);
    if !fits(patch.indices.len(), I::SIZE) || !fits(patch.values.len(), patch.value_size) {
        return Err(ImportError::Malformed(format!(
            "sparse data too short for {} entries",
            patch.sparse_count
        )));
    }

    for entry in 0..patch.sparse_count {
        let raw = I::from_bytes(&patch.indices[entry * I::SIZE..]);
        let index = raw
            .to_index()
            .filter(|&index| index < patch.buffer_count)
            .ok_or_else(|| ImportError::Malformed(format!("sparse index out of range at entry {entry}")))?;

        let src = entry * patch.value_size;
        let slot = patch
            .stride
            .checked_mul(index)
            .and_then(|dst| dst.checked_add(patch.attribute_offset))
            .and_then(|dst| Some(dst..dst.checked_add(patch.value_size)?))
            .and_then(|range| target.get_mut(range));
        let Some(slot) = slot else {
            return Err(ImportError::Malformed(format!(
                "sparse entry {entry} writes past the dense buffer"
            )));
        };
        slot.copy_from_slice(&patch.values[src..src + patch.value_size]);
    }

    Ok(())
}

fn apply_sparse(
    accessor: &AccessorRecord,
    sparse: &SparseRecord,
    views: &[BufferViewRecord],
    buffers: &[RawBuffer],
    target: &mut Vec<u8>,
) -> Result<()> {
    let sub_view = |view: usize, offset: usize, what: &str| -> Result<&[u8]> {
        let record = views
            .get(view)
            .ok_or_else(|| ImportError::out_of_bounds(format!("sparse {what} bufferView"), view))?;
        view_bytes(record, buffers).get(offset..).ok_or_else(|| {
            layout_error(
                "sparse accessor",
                accessor.index,
                format!("{what} byteOffset {offset} exceeds its view"),
            )
        })
    };

    let vertex_size = accessor.element_size();
    let patch = SparsePatch {
        buffer_count: accessor.count,
        stride: vertex_size,
        attribute_offset: 0,
        value_size: vertex_size,
        sparse_count: sparse.count,
        indices: sub_view(sparse.indices_view, sparse.indices_offset, "indices")?,
        values: sub_view(sparse.values_view, sparse.values_offset, "values")?,
    };

    let result = match sparse.index_type {
        ComponentType::UnsignedByte => apply_sparse_patch::<u8>(target, &patch),
        ComponentType::UnsignedShort => apply_sparse_patch::<u16>(target, &patch),
        ComponentType::UnsignedInt => apply_sparse_patch::<u32>(target, &patch),
        ComponentType::Byte => apply_sparse_patch::<i8>(target, &patch),
        ComponentType::Short => apply_sparse_patch::<i16>(target, &patch),
        ComponentType::Int => apply_sparse_patch::<i32>(target, &patch),
        ComponentType::Float => Err(ImportError::Malformed(
            "float sparse indices".to_string(),
        )),
    };

    result.map_err(|err| match err {
        ImportError::Malformed(reason) => layout_error("sparse accessor", accessor.index, reason),
        other => other,
    })
}
