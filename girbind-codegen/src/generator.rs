//! Namespace generator.
//!
//! Turns one parsed namespace into its output files. Every unit gets a
//! fresh [`UnitContext`], so imports never leak between files and
//! namespaces can be generated in parallel against the shared registry.

use crate::config::GeneratorConfig;
use crate::context::{ENUMS_MODULE, FUNCTIONS_MODULE, UnitContext};
use crate::error::CodegenError;
use crate::format::format_typescript;
use crate::graph::ClassGraph;
use crate::mapper::TypeMapper;
use crate::output::GeneratedFile;
use crate::registry::TypeRegistry;
use crate::typescript::{
    ClassGenerator, EnumGenerator, FunctionGenerator, IndexGenerator, InterfaceGenerator,
    RecordGenerator, file_header,
};
use girbind_core::naming::to_kebab_case;
use girbind_schema::{Namespace, Repository};
use std::collections::HashMap;
use std::path::PathBuf;

/// Module stem of the barrel unit.
pub const INDEX_MODULE: &str = "index";

/// One emitted unit before assembly.
struct Unit {
    module: String,
    body: String,
    ctx: UnitContext,
}

/// Code generator for one namespace.
pub struct NamespaceGenerator<'a> {
    repository: &'a Repository,
    registry: &'a TypeRegistry,
    config: &'a GeneratorConfig,
    ns: &'a Namespace,
}

impl<'a> NamespaceGenerator<'a> {
    /// Creates a new namespace generator.
    ///
    /// `registry` must already hold every namespace of the run.
    #[must_use]
    pub fn new(
        repository: &'a Repository,
        registry: &'a TypeRegistry,
        config: &'a GeneratorConfig,
        ns: &'a Namespace,
    ) -> Self {
        Self {
            repository,
            registry,
            config,
            ns,
        }
    }

    /// Output directory of the namespace, relative to the output root.
    #[must_use]
    pub fn directory(&self) -> String {
        to_kebab_case(&self.ns.name)
    }

    /// Generates every file of the namespace.
    ///
    /// Files come in a fixed order: enums, interfaces, classes (parents
    /// first), records, functions, then the index.
    ///
    /// # Errors
    /// Returns a generation error if two entities map to the same file.
    pub fn generate(&self) -> Result<Vec<GeneratedFile>, CodegenError> {
        let mapper = TypeMapper::new(self.registry, self.repository, &self.ns.name);
        let graph = ClassGraph::new(self.ns);
        let mut units = Vec::new();

        let enums = EnumGenerator::new(self.ns);
        if !enums.is_empty() {
            units.push(Unit {
                module: ENUMS_MODULE.to_string(),
                body: enums.generate(),
                ctx: UnitContext::new(ENUMS_MODULE, ""),
            });
        }

        for iface in &self.ns.interfaces {
            let generator = InterfaceGenerator::new(mapper, self.config, self.ns, iface);
            let module = to_kebab_case(&iface.name);
            let mut ctx = UnitContext::new(&module, generator.class_name());
            let body = generator.generate(&mut ctx);
            units.push(Unit { module, body, ctx });
        }

        for class in graph.topological_order() {
            let generator =
                ClassGenerator::new(self.repository, mapper, self.config, &graph, self.ns, class);
            let module = to_kebab_case(&class.name);
            let mut ctx = UnitContext::new(&module, generator.class_name());
            let body = generator.generate(&mut ctx);
            units.push(Unit { module, body, ctx });
        }

        for record in &self.ns.records {
            let generator = RecordGenerator::new(mapper, self.config, self.ns, record);
            let module = to_kebab_case(&record.name);
            let mut ctx = UnitContext::new(&module, generator.class_name());
            let body = generator.generate(&mut ctx);
            units.push(Unit { module, body, ctx });
        }

        let functions = FunctionGenerator::new(mapper, self.config, self.ns);
        if !functions.is_empty() {
            let mut ctx = UnitContext::new(FUNCTIONS_MODULE, "");
            let body = functions.generate(&mut ctx);
            units.push(Unit {
                module: FUNCTIONS_MODULE.to_string(),
                body,
                ctx,
            });
        }

        self.check_modules(&units)?;

        let mut index = IndexGenerator::new();
        let mut files = Vec::with_capacity(units.len() + 1);
        for unit in &units {
            index.add_module(&unit.module);
            let imports = unit.ctx.render_imports(&self.config.runtime_module);
            let mut contents = file_header(&self.ns.name, &self.ns.version);
            if !imports.is_empty() {
                contents.push_str(&imports);
                contents.push('\n');
            }
            contents.push_str(&unit.body);
            files.push(self.file(&unit.module, contents));
        }

        let mut contents = file_header(&self.ns.name, &self.ns.version);
        contents.push_str(&index.generate());
        files.push(self.file(INDEX_MODULE, contents));

        tracing::debug!("namespace {}: {} files", self.ns.name, files.len());
        Ok(files)
    }

    /// Rejects two units writing the same file.
    fn check_modules(&self, units: &[Unit]) -> Result<(), CodegenError> {
        let mut seen: HashMap<&str, usize> = HashMap::from([(INDEX_MODULE, usize::MAX)]);
        for (i, unit) in units.iter().enumerate() {
            if seen.insert(unit.module.as_str(), i).is_some() {
                return Err(CodegenError::generation(format!(
                    "{}: more than one unit maps to {}/{}.ts",
                    self.ns.name,
                    self.directory(),
                    unit.module
                )));
            }
        }
        Ok(())
    }

    fn file(&self, module: &str, contents: String) -> GeneratedFile {
        let path = PathBuf::from(self.directory()).join(format!("{module}.ts"));
        let contents = if self.config.format_output {
            match format_typescript(&contents) {
                Ok(formatted) => formatted,
                Err(e) => {
                    tracing::warn!("{}: formatting failed, keeping raw output: {}", path.display(), e);
                    contents
                }
            }
        } else {
            contents
        };
        GeneratedFile { path, contents }
    }
}
