//! Wire-level type descriptors.
//!
//! Every value crossing the native boundary is described by an [`FfiType`].
//! Generated code embeds these descriptors as object literals and the
//! runtime's `call`/`read`/`write` primitives interpret them, so the
//! [`Display`](std::fmt::Display) impl is the exact literal syntax the runtime
//! expects.

use std::fmt;

/// Integer width in bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntWidth {
    /// 8-bit.
    W8,
    /// 16-bit.
    W16,
    /// 32-bit.
    W32,
    /// 64-bit.
    W64,
}

impl IntWidth {
    /// Returns the width in bits.
    #[must_use]
    pub const fn bits(&self) -> u32 {
        match self {
            Self::W8 => 8,
            Self::W16 => 16,
            Self::W32 => 32,
            Self::W64 => 64,
        }
    }
}

/// Float width in bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FloatWidth {
    /// `float`.
    W32,
    /// `double`.
    W64,
}

impl FloatWidth {
    /// Returns the width in bits.
    #[must_use]
    pub const fn bits(&self) -> u32 {
        match self {
            Self::W32 => 32,
            Self::W64 => 64,
        }
    }
}

/// Trampoline the runtime uses to bridge a native callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Trampoline {
    /// Generic closure (signal handlers, arbitrary function pointers).
    #[default]
    Closure,
    /// `GAsyncReadyCallback` of an async/finish pair.
    AsyncReady,
    /// `GDestroyNotify`.
    Destroy,
}

impl Trampoline {
    /// Name used in the descriptor literal.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Closure => "closure",
            Self::AsyncReady => "asyncReady",
            Self::Destroy => "destroy",
        }
    }
}

/// Callback descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct CallbackType {
    /// Trampoline variant.
    pub trampoline: Trampoline,
    /// Argument descriptors, when known.
    pub arg_types: Option<Vec<FfiType>>,
    /// Return descriptor, when known.
    pub return_type: Option<Box<FfiType>>,
    /// Source object descriptor (async callbacks).
    pub source_type: Option<Box<FfiType>>,
    /// Result object descriptor (async callbacks).
    pub result_type: Option<Box<FfiType>>,
}

impl CallbackType {
    /// The fixed `GAsyncReadyCallback` shape: `(source, result) -> void`.
    #[must_use]
    pub fn async_ready() -> Self {
        Self {
            trampoline: Trampoline::AsyncReady,
            arg_types: None,
            return_type: None,
            source_type: Some(Box::new(FfiType::Object { borrowed: true })),
            result_type: Some(Box::new(FfiType::Object { borrowed: true })),
        }
    }
}

/// Type descriptor for a value crossing the native boundary.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FfiType {
    /// Fixed-width integer.
    Int {
        /// Width.
        width: IntWidth,
        /// Signedness.
        signed: bool,
    },
    /// Floating point.
    Float(FloatWidth),
    /// `gboolean`.
    Boolean,
    /// NUL-terminated string.
    String {
        /// Whether the native side keeps ownership.
        borrowed: bool,
    },
    /// No value.
    Void,
    /// Raw pointer with no further interpretation.
    Pointer,
    /// Reference-counted object instance.
    Object {
        /// Whether the reference is borrowed (must be ref'd to retain).
        borrowed: bool,
    },
    /// Boxed value type.
    Boxed {
        /// Whether the value is borrowed.
        borrowed: bool,
        /// Native type tag.
        type_name: String,
        /// Library providing the type's `get_type` function.
        library: Option<String>,
    },
    /// C array / list of items.
    Array {
        /// Item descriptor.
        item: Box<FfiType>,
    },
    /// Out/inout slot.
    Ref {
        /// Descriptor of the slot's contents.
        inner: Box<FfiType>,
    },
    /// Function pointer.
    Callback(CallbackType),
}

impl FfiType {
    /// Creates an integer descriptor.
    #[must_use]
    pub const fn int(width: IntWidth, signed: bool) -> Self {
        Self::Int { width, signed }
    }

    /// Descriptor used for enumerations and bitfields.
    #[must_use]
    pub const fn enumeration() -> Self {
        Self::Int {
            width: IntWidth::W32,
            signed: true,
        }
    }

    /// Wraps a descriptor in an out/inout slot.
    #[must_use]
    pub fn reference(inner: FfiType) -> Self {
        Self::Ref {
            inner: Box::new(inner),
        }
    }

    /// Wraps a descriptor as an array item.
    #[must_use]
    pub fn array(item: FfiType) -> Self {
        Self::Array {
            item: Box::new(item),
        }
    }

    /// Returns the natural size in bytes when stored in a struct field.
    ///
    /// Everything that is not an integer, float or boolean is stored as a
    /// pointer.
    #[must_use]
    pub const fn size(&self) -> usize {
        match self {
            Self::Int { width, .. } => (width.bits() / 8) as usize,
            Self::Float(width) => (width.bits() / 8) as usize,
            Self::Boolean => 4,
            Self::Void => 0,
            _ => 8,
        }
    }

    /// Returns the natural alignment in bytes (equal to the size).
    #[must_use]
    pub const fn alignment(&self) -> usize {
        match self.size() {
            0 => 1,
            size => size,
        }
    }

    /// Returns true for values stored inline (numbers and booleans).
    ///
    /// Only these get direct field mutators.
    #[must_use]
    pub const fn is_scalar(&self) -> bool {
        matches!(self, Self::Int { .. } | Self::Float(_) | Self::Boolean)
    }
}

impl fmt::Display for FfiType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int { width, signed } => write!(
                f,
                r#"{{ type: "int", size: {}, signed: {} }}"#,
                width.bits(),
                signed
            ),
            Self::Float(width) => write!(f, r#"{{ type: "float", size: {} }}"#, width.bits()),
            Self::Boolean => f.write_str(r#"{ type: "boolean" }"#),
            Self::String { borrowed } => {
                write!(f, r#"{{ type: "string", borrowed: {} }}"#, borrowed)
            }
            Self::Void => f.write_str(r#"{ type: "undefined" }"#),
            Self::Pointer => f.write_str(r#"{ type: "int", size: 64, signed: false }"#),
            Self::Object { borrowed } => {
                write!(f, r#"{{ type: "gobject", borrowed: {} }}"#, borrowed)
            }
            Self::Boxed {
                borrowed,
                type_name,
                library,
            } => {
                write!(
                    f,
                    r#"{{ type: "boxed", borrowed: {}, innerType: "{}""#,
                    borrowed, type_name
                )?;
                if let Some(lib) = library {
                    write!(f, r#", lib: "{}""#, lib)?;
                }
                f.write_str(" }")
            }
            Self::Array { item } => write!(f, r#"{{ type: "array", itemType: {} }}"#, item),
            Self::Ref { inner } => write!(f, r#"{{ type: "ref", innerType: {} }}"#, inner),
            Self::Callback(cb) => {
                write!(
                    f,
                    r#"{{ type: "callback", trampoline: "{}""#,
                    cb.trampoline.as_str()
                )?;
                if let Some(args) = &cb.arg_types {
                    f.write_str(", argTypes: [")?;
                    for (i, arg) in args.iter().enumerate() {
                        if i > 0 {
                            f.write_str(", ")?;
                        }
                        write!(f, "{}", arg)?;
                    }
                    f.write_str("]")?;
                }
                if let Some(ret) = &cb.return_type {
                    write!(f, ", returnType: {}", ret)?;
                }
                if let Some(source) = &cb.source_type {
                    write!(f, ", sourceType: {}", source)?;
                }
                if let Some(result) = &cb.result_type {
                    write!(f, ", resultType: {}", result)?;
                }
                f.write_str(" }")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_rendering() {
        assert_eq!(
            FfiType::int(IntWidth::W8, false).to_string(),
            r#"{ type: "int", size: 8, signed: false }"#
        );
        assert_eq!(
            FfiType::enumeration().to_string(),
            r#"{ type: "int", size: 32, signed: true }"#
        );
    }

    #[test]
    fn test_boxed_rendering() {
        let boxed = FfiType::Boxed {
            borrowed: true,
            type_name: "GdkRectangle".to_string(),
            library: Some("libgtk-4.so.1".to_string()),
        };
        assert_eq!(
            boxed.to_string(),
            r#"{ type: "boxed", borrowed: true, innerType: "GdkRectangle", lib: "libgtk-4.so.1" }"#
        );

        let no_lib = FfiType::Boxed {
            borrowed: false,
            type_name: "GError".to_string(),
            library: None,
        };
        assert_eq!(
            no_lib.to_string(),
            r#"{ type: "boxed", borrowed: false, innerType: "GError" }"#
        );
    }

    #[test]
    fn test_nested_rendering() {
        let nested = FfiType::reference(FfiType::array(FfiType::String { borrowed: false }));
        assert_eq!(
            nested.to_string(),
            r#"{ type: "ref", innerType: { type: "array", itemType: { type: "string", borrowed: false } } }"#
        );
    }

    #[test]
    fn test_async_callback_rendering() {
        let cb = FfiType::Callback(CallbackType::async_ready());
        assert_eq!(
            cb.to_string(),
            r#"{ type: "callback", trampoline: "asyncReady", sourceType: { type: "gobject", borrowed: true }, resultType: { type: "gobject", borrowed: true } }"#
        );
    }

    #[test]
    fn test_sizes_and_alignment() {
        assert_eq!(FfiType::int(IntWidth::W16, true).size(), 2);
        assert_eq!(FfiType::Float(FloatWidth::W32).alignment(), 4);
        assert_eq!(FfiType::Boolean.size(), 4);
        assert_eq!(FfiType::Object { borrowed: true }.size(), 8);
        assert_eq!(FfiType::Void.alignment(), 1);
        assert!(FfiType::Boolean.is_scalar());
        assert!(!FfiType::Pointer.is_scalar());
        assert!(!FfiType::String { borrowed: true }.is_scalar());
    }
}
