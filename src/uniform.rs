//! Uniform Layout
//!
//! Converts typed uniform values into the byte layout a GPU uniform buffer
//! expects (std140-like rows).
//!
//! | kind    | data bytes | stride |
//! |---------|-----------:|-------:|
//! | `f32`   | 4          | 16     |
//! | `uvec2` | 8          | 16     |
//! | `vec2`  | 8          | 16     |
//! | `vec3`  | 12         | 16     |
//! | `vec4`  | 16         | 16     |
//! | `mat3`  | 36         | 48     |
//! | `mat4`  | 64         | 64     |
//!
//! Every value is placed at the start of its stride and the remaining bytes are
//! zero. A `mat3` is written as three columns, each padded to a 4-float row.

use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Mat4, UVec2, Vec2, Vec3, Vec4};
use smallvec::SmallVec;

/// A 3x3 matrix laid out for a uniform buffer (`mat3x3<f32>`).
///
/// Memory layout: `[Col0(4 floats), Col1(4 floats), Col2(4 floats)]`; the
/// fourth float of every column is padding and always zero.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Mat3A {
    pub cols: [Vec4; 3],
}

impl Mat3A {
    pub const IDENTITY: Self = Self::from_mat3(Mat3::IDENTITY);

    #[must_use]
    pub const fn from_mat3(m: Mat3) -> Self {
        Self {
            cols: [
                Vec4::new(m.x_axis.x, m.x_axis.y, m.x_axis.z, 0.0),
                Vec4::new(m.y_axis.x, m.y_axis.y, m.y_axis.z, 0.0),
                Vec4::new(m.z_axis.x, m.z_axis.y, m.z_axis.z, 0.0),
            ],
        }
    }
}

/// Value kinds accepted by [`to_aligned`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformKind {
    F32,
    UVec2,
    Vec2,
    Vec3,
    Vec4,
    Mat3,
    Mat4,
}

impl UniformKind {
    /// Size in bytes this kind occupies in a uniform buffer.
    #[must_use]
    pub const fn stride(self) -> usize {
        match self {
            Self::F32 | Self::UVec2 | Self::Vec2 | Self::Vec3 | Self::Vec4 => 16,
            Self::Mat3 => 48,
            Self::Mat4 => 64,
        }
    }

    #[must_use]
    pub const fn wgsl_type_name(self) -> &'static str {
        match self {
            Self::F32 => "f32",
            Self::UVec2 => "vec2<u32>",
            Self::Vec2 => "vec2<f32>",
            Self::Vec3 => "vec3<f32>",
            Self::Vec4 => "vec4<f32>",
            Self::Mat3 => "mat3x3<f32>",
            Self::Mat4 => "mat4x4<f32>",
        }
    }
}

/// A typed uniform value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    F32(f32),
    UVec2(UVec2),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat3(Mat3),
    Mat4(Mat4),
}

impl UniformValue {
    #[must_use]
    pub const fn kind(&self) -> UniformKind {
        match self {
            Self::F32(_) => UniformKind::F32,
            Self::UVec2(_) => UniformKind::UVec2,
            Self::Vec2(_) => UniformKind::Vec2,
            Self::Vec3(_) => UniformKind::Vec3,
            Self::Vec4(_) => UniformKind::Vec4,
            Self::Mat3(_) => UniformKind::Mat3,
            Self::Mat4(_) => UniformKind::Mat4,
        }
    }
}

/// Uniform bytes padded to the stride of their value kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AlignedBytes {
    bytes: SmallVec<[u8; 64]>,
}

impl AlignedBytes {
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Declared size, always equal to the stride of the source kind.
    #[inline]
    #[must_use]
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

impl AsRef<[u8]> for AlignedBytes {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

/// Converts a uniform value to its padded GPU byte layout.
#[must_use]
pub fn to_aligned(value: UniformValue) -> AlignedBytes {
    let stride = value.kind().stride();
    let mut bytes: SmallVec<[u8; 64]> = SmallVec::from_elem(0, stride);

    let data: &[u8] = match &value {
        UniformValue::F32(v) => bytemuck::bytes_of(v),
        UniformValue::UVec2(v) => bytemuck::bytes_of(v),
        UniformValue::Vec2(v) => bytemuck::bytes_of(v),
        UniformValue::Vec3(v) => bytemuck::bytes_of(v),
        UniformValue::Vec4(v) => bytemuck::bytes_of(v),
        UniformValue::Mat4(m) => bytemuck::bytes_of(m),
        UniformValue::Mat3(m) => {
            let padded = Mat3A::from_mat3(*m);
            bytes.copy_from_slice(bytemuck::bytes_of(&padded));
            return AlignedBytes { bytes };
        }
    };
    bytes[..data.len()].copy_from_slice(data);

    AlignedBytes { bytes }
}

// ============================================================================
// Type mapping (Rust type -> uniform kind)
// ============================================================================

/// Rust types that can be written into a uniform binding.
pub trait Uniform: Copy + 'static {
    const KIND: UniformKind;

    fn to_uniform(self) -> UniformValue;
}

macro_rules! impl_uniform {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl Uniform for $ty {
                const KIND: UniformKind = UniformKind::$variant;

                #[inline]
                fn to_uniform(self) -> UniformValue {
                    UniformValue::$variant(self)
                }
            }

            impl From<$ty> for UniformValue {
                #[inline]
                fn from(value: $ty) -> Self {
                    UniformValue::$variant(value)
                }
            }
        )*
    };
}

impl_uniform! {
    f32 => F32,
    UVec2 => UVec2,
    Vec2 => Vec2,
    Vec3 => Vec3,
    Vec4 => Vec4,
    Mat3 => Mat3,
    Mat4 => Mat4,
}
