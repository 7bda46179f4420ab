//! Structured arrays: many records of one [`StructLayout`] in one flat buffer.
//!
//! Fields are addressed through typed [`Field`] handles resolved once by
//! name. Kernels capture the handles and work on [`ElementMut`] record
//! views, one per lane.

use std::fmt;
use std::marker::PhantomData;
use std::ops::Range;

use hanami_types::{HanamiError, HanamiResult};

use crate::layout::{FieldValue, StructLayout};

/// Typed handle of one field of a structured array.
pub struct Field<T> {
    offset: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Field<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Field<T> {}

impl<T> fmt::Debug for Field<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field").field("offset", &self.offset).finish()
    }
}

/// A fixed number of records sharing one layout, stored as 32-bit words.
///
/// Field layout is decided once at construction and never changes;
/// index bounds are the caller's responsibility.
#[derive(Debug, Clone)]
pub struct StructuredArray {
    name: String,
    layout: StructLayout,
    len: usize,
    words: Vec<u32>,
}

impl StructuredArray {
    /// Allocates `len` zeroed records.
    pub fn new(layout: StructLayout, len: usize, name: impl Into<String>) -> Self {
        let words = vec![0u32; layout.stride() * len];
        Self {
            name: name.into(),
            layout,
            len,
            words,
        }
    }

    /// Lays out a `(name, type_name)` declaration and allocates `len` records.
    pub fn from_declaration(
        declaration: &[(&str, &str)],
        len: usize,
        name: impl Into<String>,
    ) -> HanamiResult<Self> {
        Ok(Self::new(StructLayout::new(declaration)?, len, name))
    }

    /// Buffer label.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of records.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the array holds no records.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn layout(&self) -> &StructLayout {
        &self.layout
    }

    /// Record size in words.
    #[inline]
    pub fn stride(&self) -> usize {
        self.layout.stride()
    }

    /// Resolves a typed handle for the field called `name`.
    pub fn field<T: FieldValue>(&self, name: &str) -> HanamiResult<Field<T>> {
        let desc = self
            .layout
            .field(name)
            .ok_or_else(|| HanamiError::UnknownField {
                buffer: self.name.clone(),
                field: name.to_string(),
            })?;
        if desc.ty != T::TYPE {
            return Err(HanamiError::FieldTypeMismatch {
                field: name.to_string(),
                declared: desc.ty.name(),
                requested: T::TYPE.name(),
            });
        }
        Ok(Field {
            offset: desc.offset,
            _marker: PhantomData,
        })
    }

    /// Reads `field` of record `index`.
    #[inline]
    pub fn get<T: FieldValue>(&self, index: usize, field: Field<T>) -> T {
        let base = index * self.stride() + field.offset;
        T::read(&self.words[base..])
    }

    /// Writes `field` of record `index`.
    #[inline]
    pub fn set<T: FieldValue>(&mut self, index: usize, field: Field<T>, value: T) {
        let base = index * self.stride() + field.offset;
        value.write(&mut self.words[base..]);
    }

    /// Read-only view of record `index`.
    #[inline]
    pub fn element(&self, index: usize) -> Element<'_> {
        let stride = self.stride();
        Element {
            words: &self.words[index * stride..(index + 1) * stride],
        }
    }

    /// Mutable view of record `index`.
    #[inline]
    pub fn element_mut(&mut self, index: usize) -> ElementMut<'_> {
        let stride = self.stride();
        ElementMut {
            words: &mut self.words[index * stride..(index + 1) * stride],
        }
    }

    /// Disjoint mutable views of the records in `range`.
    pub fn records_mut(&mut self, range: Range<usize>) -> impl Iterator<Item = ElementMut<'_>> {
        let stride = self.stride();
        self.record_words_mut(range)
            .chunks_exact_mut(stride)
            .map(ElementMut::new)
    }

    /// Raw words of the records in `range`.
    pub(crate) fn record_words_mut(&mut self, range: Range<usize>) -> &mut [u32] {
        let stride = self.stride();
        &mut self.words[range.start * stride..range.end * stride]
    }

    /// The whole buffer as words.
    pub fn as_words(&self) -> &[u32] {
        &self.words
    }

    /// The whole buffer as bytes, e.g. for upload or read-back.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.words)
    }
}

/// Read-only view of one record.
#[derive(Debug, Clone, Copy)]
pub struct Element<'a> {
    words: &'a [u32],
}

impl Element<'_> {
    #[inline]
    pub fn get<T: FieldValue>(&self, field: Field<T>) -> T {
        T::read(&self.words[field.offset..])
    }
}

/// Mutable view of one record, owned by a single kernel lane.
#[derive(Debug)]
pub struct ElementMut<'a> {
    words: &'a mut [u32],
}

impl<'a> ElementMut<'a> {
    #[inline]
    pub(crate) fn new(words: &'a mut [u32]) -> Self {
        Self { words }
    }

    #[inline]
    pub fn get<T: FieldValue>(&self, field: Field<T>) -> T {
        T::read(&self.words[field.offset..])
    }

    #[inline]
    pub fn set<T: FieldValue>(&mut self, field: Field<T>, value: T) {
        value.write(&mut self.words[field.offset..]);
    }
}
