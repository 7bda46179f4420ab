//! Field declarations and record layout.
//!
//! Fields are placed on 32-bit words in declaration order using
//! storage-buffer alignment rules: scalars align to one word, `vec2`
//! to two, `vec3` and `vec4` to four. A `vec3` occupies three words,
//! so a scalar declared right after it packs into the fourth.

use std::str::FromStr;

use bytemuck::Pod;
use glam::{Vec2, Vec3, Vec4};
use hanami_types::{HanamiError, HanamiResult};

/// Type of one structured-buffer field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Float,
    Int,
    Uint,
    Vec2,
    Vec3,
    Vec4,
}

impl FieldType {
    /// Number of 32-bit words the field occupies.
    pub fn words(self) -> usize {
        match self {
            FieldType::Float | FieldType::Int | FieldType::Uint => 1,
            FieldType::Vec2 => 2,
            FieldType::Vec3 => 3,
            FieldType::Vec4 => 4,
        }
    }

    /// Alignment of the field, in words.
    pub fn align(self) -> usize {
        match self {
            FieldType::Float | FieldType::Int | FieldType::Uint => 1,
            FieldType::Vec2 => 2,
            FieldType::Vec3 | FieldType::Vec4 => 4,
        }
    }

    /// Declaration name of the type.
    pub fn name(self) -> &'static str {
        match self {
            FieldType::Float => "float",
            FieldType::Int => "int",
            FieldType::Uint => "uint",
            FieldType::Vec2 => "vec2",
            FieldType::Vec3 => "vec3",
            FieldType::Vec4 => "vec4",
        }
    }
}

impl FromStr for FieldType {
    type Err = HanamiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "float" => Ok(FieldType::Float),
            "int" => Ok(FieldType::Int),
            "uint" => Ok(FieldType::Uint),
            "vec2" => Ok(FieldType::Vec2),
            "vec3" => Ok(FieldType::Vec3),
            "vec4" => Ok(FieldType::Vec4),
            other => Err(HanamiError::InvalidLayout(format!(
                "unknown field type '{other}'"
            ))),
        }
    }
}

/// One placed field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDesc {
    pub name: String,
    pub ty: FieldType,
    /// Word offset inside the record.
    pub offset: usize,
}

/// Immutable placement of a record's fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructLayout {
    fields: Vec<FieldDesc>,
    stride: usize,
}

impl StructLayout {
    /// Lays out `(name, type_name)` pairs in declaration order.
    ///
    /// Fails on an unknown type name, a duplicate field name, or an
    /// empty declaration.
    pub fn new(declaration: &[(&str, &str)]) -> HanamiResult<Self> {
        if declaration.is_empty() {
            return Err(HanamiError::InvalidLayout(
                "a record needs at least one field".into(),
            ));
        }

        let mut fields: Vec<FieldDesc> = Vec::with_capacity(declaration.len());
        let mut cursor = 0usize;
        let mut max_align = 1usize;

        for &(name, type_name) in declaration {
            if fields.iter().any(|f| f.name == name) {
                return Err(HanamiError::InvalidLayout(format!(
                    "duplicate field '{name}'"
                )));
            }
            let ty: FieldType = type_name.parse()?;
            let offset = align_up(cursor, ty.align());
            cursor = offset + ty.words();
            max_align = max_align.max(ty.align());
            fields.push(FieldDesc {
                name: name.to_string(),
                ty,
                offset,
            });
        }

        Ok(Self {
            fields,
            stride: align_up(cursor, max_align),
        })
    }

    /// Record size in words.
    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Looks a field up by name.
    pub fn field(&self, name: &str) -> Option<&FieldDesc> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// All fields in declaration order.
    pub fn fields(&self) -> &[FieldDesc] {
        &self.fields
    }
}

#[inline]
fn align_up(value: usize, align: usize) -> usize {
    value.div_ceil(align) * align
}

/// A value that can be stored in a structured-buffer field.
pub trait FieldValue: Copy + Send + Sync + 'static {
    /// The declared field type this value maps to.
    const TYPE: FieldType;

    /// Reads the value from the words starting at the field offset.
    fn read(words: &[u32]) -> Self;

    /// Writes the value into the words starting at the field offset.
    fn write(self, words: &mut [u32]);
}

/// Copies a `Pod` value out of the leading words of `words`.
#[inline]
fn read_pod<T: Pod>(words: &[u32]) -> T {
    let n = std::mem::size_of::<T>() / 4;
    bytemuck::pod_read_unaligned(bytemuck::cast_slice(&words[..n]))
}

/// Copies a `Pod` value into the leading words of `words`.
#[inline]
fn write_pod<T: Pod>(value: T, words: &mut [u32]) {
    let n = std::mem::size_of::<T>() / 4;
    bytemuck::cast_slice_mut::<u32, u8>(&mut words[..n])
        .copy_from_slice(bytemuck::bytes_of(&value));
}

macro_rules! pod_field_value {
    ($($ty:ty => $field:ident),* $(,)?) => {
        $(
            impl FieldValue for $ty {
                const TYPE: FieldType = FieldType::$field;

                #[inline]
                fn read(words: &[u32]) -> Self {
                    read_pod(words)
                }

                #[inline]
                fn write(self, words: &mut [u32]) {
                    write_pod(self, words)
                }
            }
        )*
    };
}

pod_field_value! {
    f32 => Float,
    u32 => Uint,
    i32 => Int,
    Vec2 => Vec2,
    Vec3 => Vec3,
    Vec4 => Vec4,
}
