//! # girbind
//!
//! Typed TypeScript bindings for GObject-based native libraries.
//!
//! girbind reads GObject-Introspection (GIR) documents and emits one
//! TypeScript module per class, interface and record, plus enumerations,
//! free functions and an index per namespace. Generated code calls into the
//! library through a small runtime (`call`, `read`, `write`, `alloc`).
//!
//! ## Features
//!
//! - **Two-phase resolution** - every namespace is registered before any is generated
//! - **Parent-first emission** - classes are ordered so parents precede children
//! - **Promise wrappers** - `foo_async`/`foo_finish` pairs become `foo(): Promise<T>`
//! - **Struct layouts** - records get field accessors at computed offsets
//!
//! ## Quick Start
//!
//! ```ignore
//! use girbind::prelude::*;
//!
//! let repository = Repository::load(&["Gtk-4.0.gir", "Gio-2.0.gir"])?;
//! let config = GeneratorConfig::builder().runtime_module("./native.js").build();
//! let files = generate_all(&repository, &config, &[])?;
//! write_files(&files, "bindings")?;
//! ```
//!
//! ## Crate Organization
//!
//! - [`core`] - Primitive table, wire descriptors, struct layout, naming
//! - [`schema`] - GIR parsing, validation and the namespace repository
//! - [`codegen`] - Type registry, mapper and TypeScript generators

pub mod prelude;

/// Primitive types, wire descriptors and struct layout.
pub mod core {
    pub use girbind_core::*;
}

/// GIR parsing and validation.
pub mod schema {
    pub use girbind_schema::*;
}

/// TypeScript generation.
pub mod codegen {
    pub use girbind_codegen::*;
}

// Re-export commonly used items at the crate root
pub use girbind_codegen::{
    CodegenError, GeneratedFile, GeneratorConfig, GeneratorConfigBuilder, NamespaceGenerator,
    TypeRegistry, generate_all, generate_from_xml, write_files,
};
pub use girbind_schema::{Namespace, Repository, SchemaError, parse_namespace};
