//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types and functions.
//!
//! ```ignore
//! use girbind::prelude::*;
//! ```

// Core types
pub use girbind_core::{FfiType, PrimitiveType, StructLayout};

// Schema types
pub use girbind_schema::{
    ClassDef, EnumDef, InterfaceDef, Namespace, ParseError, RecordDef, Repository, SchemaError,
    parse_namespace,
};

// Generation
pub use girbind_codegen::{
    CodegenError, GeneratedFile, GeneratorConfig, GeneratorConfigBuilder, NamespaceGenerator,
    TypeMapper, TypeRegistry, generate_all, generate_from_xml, write_files,
};
