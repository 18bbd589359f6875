//! Primitive type definitions for GObject-Introspection basic types.
//!
//! This module maps the fixed set of GIR basic type names onto their
//! native width, the TypeScript type used in generated code, and the
//! wire-level descriptor handed to the runtime.

use crate::ffi::{FfiType, FloatWidth, IntWidth};

/// GIR basic (non-composite) type enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    /// Signed 8-bit integer.
    Int8,
    /// Signed 16-bit integer.
    Int16,
    /// Signed 32-bit integer.
    Int32,
    /// Signed 64-bit integer.
    Int64,
    /// Unsigned 8-bit integer.
    Uint8,
    /// Unsigned 16-bit integer.
    Uint16,
    /// Unsigned 32-bit integer.
    Uint32,
    /// Unsigned 64-bit integer.
    Uint64,
    /// 32-bit floating point.
    Float,
    /// 64-bit floating point.
    Double,
    /// `gboolean` (a C `int` on the wire).
    Boolean,
    /// NUL-terminated UTF-8 or filename string.
    String,
    /// Untyped pointer (`gpointer`, `gconstpointer`).
    Pointer,
    /// No value (`none`).
    Void,
}

impl PrimitiveType {
    /// Parses a GIR basic type name.
    ///
    /// Returns `None` for anything that is not a basic type; callers then
    /// continue with enum/record/class resolution.
    #[must_use]
    pub fn from_gir_name(name: &str) -> Option<Self> {
        let prim = match name {
            "gint8" | "gchar" => Self::Int8,
            "guint8" | "guchar" => Self::Uint8,
            "gint16" | "gshort" => Self::Int16,
            "guint16" | "gushort" => Self::Uint16,
            "gint" | "gint32" => Self::Int32,
            "guint" | "guint32" | "gunichar" | "GQuark" => Self::Uint32,
            "glong" | "gint64" | "gssize" | "goffset" | "gintptr" => Self::Int64,
            "gulong" | "guint64" | "gsize" | "guintptr" | "GType" => Self::Uint64,
            "gfloat" => Self::Float,
            "gdouble" => Self::Double,
            "gboolean" => Self::Boolean,
            "utf8" | "filename" => Self::String,
            "gpointer" | "gconstpointer" | "va_list" => Self::Pointer,
            "none" => Self::Void,
            _ => return None,
        };
        Some(prim)
    }

    /// Returns the size of the primitive type in bytes.
    #[must_use]
    pub const fn size(&self) -> usize {
        match self {
            Self::Int8 | Self::Uint8 => 1,
            Self::Int16 | Self::Uint16 => 2,
            Self::Int32 | Self::Uint32 | Self::Float | Self::Boolean => 4,
            Self::Int64 | Self::Uint64 | Self::Double | Self::String | Self::Pointer => 8,
            Self::Void => 0,
        }
    }

    /// Returns the TypeScript type name for this primitive.
    #[must_use]
    pub const fn ts_type(&self) -> &'static str {
        match self {
            Self::Int8
            | Self::Int16
            | Self::Int32
            | Self::Int64
            | Self::Uint8
            | Self::Uint16
            | Self::Uint32
            | Self::Uint64
            | Self::Float
            | Self::Double => "number",
            Self::Boolean => "boolean",
            Self::String => "string",
            Self::Pointer => "unknown",
            Self::Void => "void",
        }
    }

    /// Returns true if this is a numeric type (integer or float).
    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        !matches!(
            self,
            Self::Boolean | Self::String | Self::Pointer | Self::Void
        )
    }

    /// Returns the wire descriptor for this primitive.
    ///
    /// `borrowed` only affects strings: a borrowed string is copied by the
    /// runtime and never freed.
    #[must_use]
    pub fn ffi_type(&self, borrowed: bool) -> FfiType {
        match self {
            Self::Int8 => FfiType::int(IntWidth::W8, true),
            Self::Int16 => FfiType::int(IntWidth::W16, true),
            Self::Int32 => FfiType::int(IntWidth::W32, true),
            Self::Int64 => FfiType::int(IntWidth::W64, true),
            Self::Uint8 => FfiType::int(IntWidth::W8, false),
            Self::Uint16 => FfiType::int(IntWidth::W16, false),
            Self::Uint32 => FfiType::int(IntWidth::W32, false),
            Self::Uint64 => FfiType::int(IntWidth::W64, false),
            Self::Float => FfiType::Float(FloatWidth::W32),
            Self::Double => FfiType::Float(FloatWidth::W64),
            Self::Boolean => FfiType::Boolean,
            Self::String => FfiType::String { borrowed },
            Self::Pointer => FfiType::Pointer,
            Self::Void => FfiType::Void,
        }
    }
}
