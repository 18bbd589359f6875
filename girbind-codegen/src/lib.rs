//! # girbind Codegen
//!
//! TypeScript binding generation from GObject-Introspection namespaces.
//!
//! This crate provides:
//! - The global type registry and the schema-to-TypeScript type mapper
//! - Per-unit generators for classes, interfaces, records, enums and functions
//! - Member planning (async wrappers, collision renames) and cycle detection
//! - Output formatting and file writing
//!
//! Generation runs in two phases: every namespace is parsed and registered
//! first, then namespaces are generated independently, in parallel unless
//! disabled in the [`GeneratorConfig`].

pub mod config;
pub mod context;
pub mod error;
pub mod format;
pub mod generator;
pub mod graph;
pub mod mapper;
pub mod output;
pub mod plan;
pub mod registry;
pub mod typescript;

pub use config::{GeneratorConfig, GeneratorConfigBuilder};
pub use error::{CodegenError, FormatError};
pub use format::format_typescript;
pub use generator::NamespaceGenerator;
pub use mapper::{MappedType, TypeMapper};
pub use output::{GeneratedFile, write_files};
pub use registry::{RegisteredType, TypeKind, TypeRegistry};

use girbind_schema::{Namespace, Repository, parse_namespace};
use rayon::prelude::*;

/// Generates the files of every namespace in `repository`.
///
/// The type registry is built from all namespaces before any is
/// generated. A non-empty `filter` restricts generation to the named
/// namespaces; the others are still used to resolve types.
///
/// # Errors
/// Returns `CodegenError` if a filtered namespace is not loaded or a
/// namespace fails to generate.
pub fn generate_all(
    repository: &Repository,
    config: &GeneratorConfig,
    filter: &[String],
) -> Result<Vec<GeneratedFile>, CodegenError> {
    let registry = TypeRegistry::from_namespaces(repository.namespaces());
    tracing::info!(
        "registered {} types from {} namespaces",
        registry.len(),
        repository.len()
    );

    if let Some(missing) = filter.iter().find(|name| repository.get(name).is_none()) {
        return Err(CodegenError::generation(format!(
            "namespace {missing} is not loaded"
        )));
    }
    let selected: Vec<&Namespace> = repository
        .namespaces()
        .iter()
        .filter(|ns| filter.is_empty() || filter.contains(&ns.name))
        .collect();

    let generate = |ns: &&Namespace| {
        NamespaceGenerator::new(repository, &registry, config, ns).generate()
    };
    let per_namespace: Vec<Vec<GeneratedFile>> = if config.parallel {
        selected.par_iter().map(generate).collect::<Result<_, _>>()?
    } else {
        selected.iter().map(generate).collect::<Result<_, _>>()?
    };

    let files: Vec<GeneratedFile> = per_namespace.into_iter().flatten().collect();
    tracing::info!(
        "generated {} files for {} namespaces",
        files.len(),
        selected.len()
    );
    Ok(files)
}

/// Generates files from GIR documents held in memory.
///
/// # Arguments
/// * `documents` - GIR XML content, one document per namespace
///
/// # Errors
/// Returns `CodegenError` if parsing, validation or generation fails.
pub fn generate_from_xml(documents: &[&str]) -> Result<Vec<GeneratedFile>, CodegenError> {
    let namespaces = documents
        .iter()
        .map(|xml| parse_namespace(xml))
        .collect::<Result<Vec<_>, _>>()?;
    let repository = Repository::from_namespaces(namespaces)?;
    generate_all(&repository, &GeneratorConfig::default(), &[])
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOBJECT_GIR: &str = r#"<?xml version="1.0"?>
<repository version="1.2">
  <namespace name="GObject" version="2.0" shared-library="libgobject-2.0.so.0">
    <class name="Object" glib:type-name="GObject" glib:get-type="g_object_get_type">
      <method name="ref" c:identifier="g_object_ref">
        <return-value transfer-ownership="full"><type name="Object"/></return-value>
      </method>
    </class>
  </namespace>
</repository>"#;

    const DEMO_GIR: &str = r#"<?xml version="1.0"?>
<repository version="1.2">
  <include name="GObject" version="2.0"/>
  <namespace name="Demo" version="1.0" shared-library="libdemo.so.1">
    <class name="Widget" parent="GObject.Object" glib:type-name="DemoWidget" glib:get-type="demo_widget_get_type">
      <method name="get_parent_object" c:identifier="demo_widget_get_parent_object">
        <return-value nullable="1"><type name="GObject.Object"/></return-value>
      </method>
    </class>
  </namespace>
</repository>"#;

    fn repository() -> Repository {
        Repository::from_namespaces(vec![
            parse_namespace(GOBJECT_GIR).expect("Failed to parse GObject"),
            parse_namespace(DEMO_GIR).expect("Failed to parse Demo"),
        ])
        .expect("Failed to index")
    }

    #[test]
    fn test_generate_from_xml() {
        let files = generate_from_xml(&[GOBJECT_GIR, DEMO_GIR]).expect("Failed to generate");
        let paths: Vec<String> = files.iter().map(|f| f.path.display().to_string()).collect();
        assert!(paths.contains(&"g-object/object.ts".to_string()));
        assert!(paths.contains(&"g-object/index.ts".to_string()));
        assert!(paths.contains(&"demo/widget.ts".to_string()));

        let widget = files
            .iter()
            .find(|f| f.path.ends_with("demo/widget.ts"))
            .expect("widget.ts missing");
        assert!(widget.contents.contains("import * as GObject from \"../g-object/index.js\";\n"));
        assert!(widget.contents.contains("export class Widget extends GObject.GObjectObject {\n"));
        assert!(widget.contents.contains("getParentObject(): GObject.GObjectObject | null {"));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let repository = repository();
        let parallel = generate_all(&repository, &GeneratorConfig::default(), &[])
            .expect("Failed to generate");
        let sequential = generate_all(
            &repository,
            &GeneratorConfig::builder().parallel(false).build(),
            &[],
        )
        .expect("Failed to generate");
        assert_eq!(parallel, sequential);
    }

    #[test]
    fn test_namespace_filter() {
        let repository = repository();
        let config = GeneratorConfig::default();
        let files =
            generate_all(&repository, &config, &["Demo".to_string()]).expect("Failed to generate");
        assert!(files.iter().all(|f| f.path.starts_with("demo")));
        // GObject is still resolved for the parent class
        assert!(files.iter().any(|f| f.contents.contains("extends GObject.GObjectObject")));

        let err = generate_all(&repository, &config, &["Gtk".to_string()])
            .expect_err("unknown namespace accepted");
        assert!(err.to_string().contains("namespace Gtk is not loaded"));
    }

    #[test]
    fn test_invalid_document() {
        let err = generate_from_xml(&["<repository/>"]).expect_err("missing namespace accepted");
        assert!(matches!(err, CodegenError::Schema(_) | CodegenError::Parse(_)));
    }
}
