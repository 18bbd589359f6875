//! Free functions unit.

use super::callables::{self, CallEnv, Receiver};
use crate::config::GeneratorConfig;
use crate::context::UnitContext;
use crate::mapper::TypeMapper;
use crate::plan::FlatPlan;
use girbind_schema::Namespace;
use std::collections::HashSet;

/// Generator for the `functions` unit.
pub struct FunctionGenerator<'a> {
    mapper: TypeMapper<'a>,
    config: &'a GeneratorConfig,
    ns: &'a Namespace,
}

impl<'a> FunctionGenerator<'a> {
    /// Creates a new function generator.
    #[must_use]
    pub fn new(mapper: TypeMapper<'a>, config: &'a GeneratorConfig, ns: &'a Namespace) -> Self {
        Self { mapper, config, ns }
    }

    /// Returns true if the namespace declares no free functions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ns.functions.is_empty()
    }

    /// Generates the unit body.
    pub fn generate(&self, ctx: &mut UnitContext) -> String {
        let plan = FlatPlan::functions(&self.mapper, &self.ns.name, &self.ns.functions);
        tracing::debug!("functions {}: {} exported", self.ns.name, plan.len());

        let cyclic = HashSet::new();
        let env = CallEnv {
            mapper: self.mapper,
            config: self.config,
            library: self.ns.library(),
            cyclic: &cyclic,
        };

        let mut output = String::new();
        for (i, member) in plan.iter().enumerate() {
            if i > 0 {
                output.push('\n');
            }
            output.push_str(&callables::render_member(&env, ctx, member, &Receiver::Free, ""));
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::FUNCTIONS_MODULE;
    use crate::registry::TypeRegistry;
    use girbind_schema::{Repository, parse_namespace};

    const DEMO_GIR: &str = r#"<?xml version="1.0"?>
<repository version="1.2">
  <namespace name="Demo" version="1.0" shared-library="libdemo.so.1">
    <class name="Widget" glib:type-name="DemoWidget"/>
    <enumeration name="Align">
      <member name="start" value="0"/>
    </enumeration>
    <function name="init" c:identifier="demo_init">
      <return-value><type name="none"/></return-value>
    </function>
    <function name="get_default_widget" c:identifier="demo_get_default_widget">
      <return-value><type name="Widget"/></return-value>
    </function>
    <function name="align_to_string" c:identifier="demo_align_to_string">
      <return-value><type name="utf8"/></return-value>
      <parameters>
        <parameter name="align"><type name="Align"/></parameter>
      </parameters>
    </function>
  </namespace>
</repository>"#;

    #[test]
    fn test_generate_functions() {
        let namespaces = vec![parse_namespace(DEMO_GIR).expect("Failed to parse")];
        let registry = TypeRegistry::from_namespaces(&namespaces);
        let repository = Repository::from_namespaces(namespaces).expect("Failed to index");
        let ns = repository.get("Demo").expect("Demo missing");
        let mapper = TypeMapper::new(&registry, &repository, "Demo");
        let config = GeneratorConfig::default();

        let generator = FunctionGenerator::new(mapper, &config, ns);
        assert!(!generator.is_empty());
        let mut ctx = UnitContext::new(FUNCTIONS_MODULE, "");
        let body = generator.generate(&mut ctx);

        assert!(body.starts_with("export function init(): void {\n"));
        assert!(body.contains("    call(\"libdemo.so.1\", \"demo_init\", [], { type: \"undefined\" });\n"));
        assert!(body.contains("export function getDefaultWidget(): Widget {\n"));
        assert!(ctx.is_value_import("Widget"));
        assert!(body.contains("export function alignToString(align: Align): string {\n"));
        assert!(ctx.is_imported("Align"));
    }
}
