//! # girbind Core
//!
//! Shared building blocks for the binding generator.
//!
//! This crate provides:
//! - Primitive type table for GObject-Introspection basic types
//! - Wire-level type descriptors understood by the native runtime
//! - Struct layout computation with natural alignment
//! - Identifier conversions for generated TypeScript

pub mod ffi;
pub mod layout;
pub mod naming;
pub mod types;

pub use ffi::{CallbackType, FfiType, FloatWidth, IntWidth, Trampoline};
pub use layout::{FieldSlot, StructLayout, align_up};
pub use types::PrimitiveType;
