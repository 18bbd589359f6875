//! Interface unit generation.
//!
//! Interfaces are emitted as plain classes wrapping a handle, so values
//! typed by an interface can call its methods. They are not registered
//! with the runtime and never extended; classes implementing an interface
//! carry copies of its methods instead.

use super::callables::{self, CallEnv, Receiver};
use super::signals::SignalGenerator;
use super::{INDENT, render_doc};
use crate::config::GeneratorConfig;
use crate::context::{RuntimeImport, UnitContext};
use crate::mapper::TypeMapper;
use crate::plan::FlatPlan;
use girbind_core::FfiType;
use girbind_core::naming::transformed_type_name;
use girbind_schema::{InterfaceDef, Namespace};
use std::collections::HashSet;

/// Generator for one interface unit.
pub struct InterfaceGenerator<'a> {
    mapper: TypeMapper<'a>,
    config: &'a GeneratorConfig,
    ns: &'a Namespace,
    iface: &'a InterfaceDef,
}

impl<'a> InterfaceGenerator<'a> {
    /// Creates a new interface generator.
    #[must_use]
    pub fn new(
        mapper: TypeMapper<'a>,
        config: &'a GeneratorConfig,
        ns: &'a Namespace,
        iface: &'a InterfaceDef,
    ) -> Self {
        Self {
            mapper,
            config,
            ns,
            iface,
        }
    }

    /// Generated class name.
    #[must_use]
    pub fn class_name(&self) -> String {
        transformed_type_name(&self.ns.name, &self.iface.name)
    }

    /// Generates the unit body.
    pub fn generate(&self, ctx: &mut UnitContext) -> String {
        let name = self.class_name();
        let cyclic = HashSet::new();
        let signals = SignalGenerator::new(self.mapper, &name, &self.iface.signals, &cyclic, false);
        let reserved: &[&str] = if signals.is_empty() { &[] } else { &["connect"] };
        let plan = FlatPlan::build(
            &self.mapper,
            &self.ns.name,
            &name,
            &self.iface.methods,
            &self.iface.static_functions,
            reserved,
            &[],
        );
        tracing::debug!(
            "interface {}.{}: {} methods",
            self.ns.name,
            self.iface.name,
            plan.methods.len()
        );

        let env = CallEnv {
            mapper: self.mapper,
            config: self.config,
            library: self.ns.library(),
            cyclic: &cyclic,
        };

        let mut output = String::new();
        if !signals.is_empty() {
            output.push_str(&signals.generate_table(ctx));
        }

        ctx.runtime(RuntimeImport::NativeHandle);
        output.push_str(&render_doc(self.iface.doc.as_deref(), ""));
        output.push_str(&format!("export class {name} {{\n"));
        output.push_str(&format!("{INDENT}id!: NativeHandle;\n"));

        for member in &plan.statics {
            output.push('\n');
            output.push_str(&callables::render_member(
                &env,
                ctx,
                member,
                &Receiver::Static,
                INDENT,
            ));
        }

        let this = Receiver::Instance(FfiType::Object { borrowed: true });
        for member in &plan.methods {
            output.push('\n');
            output.push_str(&callables::render_member(&env, ctx, member, &this, INDENT));
        }

        if !signals.is_empty() {
            output.push('\n');
            output.push_str(&signals.generate_connect(ctx));
        }

        output.push_str("}\n");
        output
    }
}
