//! Byte-level struct layout.
//!
//! Fields are placed in declaration order. Each field's offset is rounded
//! up to its alignment, and the total size is rounded up to the largest
//! field alignment.

use crate::ffi::FfiType;

/// Placement of a single field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSlot {
    /// Byte offset from the start of the struct.
    pub offset: usize,
    /// Size in bytes.
    pub size: usize,
    /// Alignment in bytes.
    pub align: usize,
}

/// Computed layout of a struct.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StructLayout {
    /// Field placements, in declaration order.
    pub fields: Vec<FieldSlot>,
    /// Total size including trailing padding.
    pub size: usize,
    /// Alignment of the whole struct.
    pub align: usize,
}

impl StructLayout {
    /// Computes the layout for the given field descriptors.
    #[must_use]
    pub fn compute<'a, I>(fields: I) -> Self
    where
        I: IntoIterator<Item = &'a FfiType>,
    {
        let mut layout = Self {
            fields: Vec::new(),
            size: 0,
            align: 1,
        };
        let mut offset = 0;

        for field in fields {
            let size = field.size();
            let align = field.alignment();
            offset = align_up(offset, align);
            layout.fields.push(FieldSlot {
                offset,
                size,
                align,
            });
            offset += size;
            layout.align = layout.align.max(align);
        }

        layout.size = align_up(offset, layout.align);
        layout
    }

    /// Returns the sum of the raw field sizes (without padding).
    #[must_use]
    pub fn packed_size(&self) -> usize {
        self.fields.iter().map(|f| f.size).sum()
    }
}

/// Rounds `offset` up to the next multiple of `align`.
#[inline]
#[must_use]
pub const fn align_up(offset: usize, align: usize) -> usize {
    if align <= 1 {
        return offset;
    }
    offset.div_ceil(align) * align
}
