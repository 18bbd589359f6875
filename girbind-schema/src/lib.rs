//! # girbind Schema
//!
//! GObject-Introspection (GIR) parser and type definitions.
//!
//! This crate provides:
//! - GIR XML parsing into a per-namespace intermediate representation
//! - Type definitions for classes, interfaces, records, enums and callables
//! - Namespace validation
//! - A read-only all-namespaces [`Repository`] for cross-namespace lookups

pub mod error;
pub mod members;
pub mod parser;
pub mod repository;
pub mod types;
pub mod validation;

pub use error::{ParseError, SchemaError};
pub use members::{
    CallableDef, ConstructorDef, Direction, FieldDef, FunctionDef, MethodDef, ParameterDef,
    PropertyDef, Scope, SignalDef, SignalWhen,
};
pub use parser::parse_namespace;
pub use repository::Repository;
pub use types::{
    ARRAY_TYPE_NAME, AliasDef, CallbackDef, ClassDef, EnumDef, EnumMember, Include,
    InterfaceDef, Namespace, RecordDef, Transfer, TypeRef, split_qualified,
};
pub use validation::validate_namespace;
