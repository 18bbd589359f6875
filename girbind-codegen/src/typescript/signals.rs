//! Signal metadata tables and typed `connect` overloads.

use super::INDENT;
use crate::context::{RuntimeImport, UnitContext};
use crate::mapper::{MappedType, TypeMapper, TypeUse, ValueKind};
use girbind_core::FfiType;
use girbind_core::naming::to_param_name;
use girbind_schema::SignalDef;
use std::collections::HashSet;

/// Wire shape of one signal parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalParam {
    /// Numbers, booleans, strings and raw pointers, passed through.
    Primitive(FfiType),
    /// Enumeration value.
    Enum(FfiType),
    /// Boxed value, re-wrapped with `class` when known.
    Boxed {
        /// Descriptor.
        ffi: FfiType,
        /// Generated class used to wrap the handle.
        class: Option<String>,
    },
    /// Object, re-wrapped with `class` when known.
    Object {
        /// Descriptor.
        ffi: FfiType,
        /// Generated class used to wrap the handle.
        class: Option<String>,
    },
}

impl SignalParam {
    /// Renders the metadata entry.
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Primitive(ffi) | Self::Enum(ffi) => format!("{{ type: {ffi} }}"),
            Self::Boxed { ffi, class } | Self::Object { ffi, class } => match class {
                Some(class) => format!("{{ type: {ffi}, cls: () => {class} }}"),
                None => format!("{{ type: {ffi} }}"),
            },
        }
    }
}

/// Generator for a unit's signal table and `connect` method.
pub struct SignalGenerator<'a> {
    mapper: TypeMapper<'a>,
    class_name: &'a str,
    signals: Vec<&'a SignalDef>,
    cyclic: &'a HashSet<String>,
    inherits_connect: bool,
}

impl<'a> SignalGenerator<'a> {
    /// Creates a signal generator.
    ///
    /// `signals` lists own signals first, then those of in-namespace
    /// ancestors; the first declaration of a name wins. Classes in `cyclic`
    /// are not referenced at runtime. With `inherits_connect`, unknown
    /// signals are forwarded to `super.connect`.
    #[must_use]
    pub fn new(
        mapper: TypeMapper<'a>,
        class_name: &'a str,
        signals: impl IntoIterator<Item = &'a SignalDef>,
        cyclic: &'a HashSet<String>,
        inherits_connect: bool,
    ) -> Self {
        let mut seen = HashSet::new();
        let signals = signals
            .into_iter()
            .filter(|signal| seen.insert(signal.name.as_str()))
            .collect();
        Self {
            mapper,
            class_name,
            signals,
            cyclic,
            inherits_connect,
        }
    }

    /// Returns true if there is anything to emit.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    /// Classifies a signal parameter.
    fn classify(&self, ctx: &mut UnitContext, mapped: &MappedType) -> SignalParam {
        let ffi = mapped.ffi.clone();
        let class = match mapped.kind {
            ValueKind::Enum => return SignalParam::Enum(ffi),
            ValueKind::Record | ValueKind::Class => self.wrap_class(ctx, mapped),
            ValueKind::Interface => None,
            _ => return SignalParam::Primitive(ffi),
        };
        if mapped.kind == ValueKind::Record {
            SignalParam::Boxed { ffi, class }
        } else {
            SignalParam::Object { ffi, class }
        }
    }

    fn wrap_class(&self, ctx: &mut UnitContext, mapped: &MappedType) -> Option<String> {
        let local = mapped.uses.iter().find_map(|type_use| match type_use {
            TypeUse::Class { name, module } | TypeUse::Record { name, module } => {
                Some((name, module))
            }
            TypeUse::Enum { .. } | TypeUse::External { .. } => None,
        });
        match local {
            Some((name, _)) if self.cyclic.contains(name) => None,
            Some((name, module)) => {
                ctx.use_value(name, module);
                Some(name.clone())
            }
            None => Some(mapped.ts.clone()),
        }
    }

    /// Renders the `SIGNAL_META` table, emitted before the class.
    pub fn generate_table(&self, ctx: &mut UnitContext) -> String {
        ctx.runtime(RuntimeImport::SignalMeta);

        let mut output =
            String::from("const SIGNAL_META: Record<string, SignalMeta | undefined> = {\n");
        for signal in &self.signals {
            let params: Vec<String> = signal
                .parameters
                .iter()
                .map(|param| {
                    let mapped = self.mapper.map_parameter(param);
                    self.classify(ctx, &mapped).render()
                })
                .collect();
            let ret = signal
                .return_type
                .as_ref()
                .map_or(FfiType::Void, |ret| self.mapper.map_type(ret, true).ffi);
            output.push_str(&format!(
                "{INDENT}\"{}\": {{ params: [{}], returnType: {} }},\n",
                signal.name,
                params.join(", "),
                ret
            ));
        }
        output.push_str("};\n\n");
        output
    }

    /// Renders the `connect` overloads and implementation.
    pub fn generate_connect(&self, ctx: &mut UnitContext) -> String {
        let mut output = String::new();

        for signal in &self.signals {
            let mut params = vec![format!("self: {}", self.class_name)];
            let mut used = HashSet::from(["self".to_string()]);
            for param in &signal.parameters {
                let mapped = self.mapper.map_parameter(param);
                // array elements reach the handler unwrapped
                let ts = if mapped.handle_items().is_some() {
                    ctx.runtime(RuntimeImport::NativeHandle);
                    "NativeHandle[]".to_string()
                } else {
                    ctx.use_mapped(&mapped);
                    mapped.ts
                };
                let mut name = to_param_name(&param.name);
                while !used.insert(name.clone()) {
                    name.push('_');
                }
                params.push(format!("{name}: {ts}"));
            }
            let ret = signal.return_type.as_ref().map_or_else(
                || "void".to_string(),
                |ret| {
                    let mapped = self.mapper.map_type(ret, true);
                    ctx.use_mapped(&mapped);
                    mapped.ts
                },
            );
            output.push_str(&format!(
                "{INDENT}connect(signal: \"{}\", handler: ({}) => {}, after?: boolean): number;\n",
                signal.name,
                params.join(", "),
                ret
            ));
        }

        output.push_str(&format!(
            "{INDENT}connect(signal: string, handler: (...args: never[]) => unknown, after?: boolean): number;\n"
        ));
        output.push_str(&format!(
            "{INDENT}connect(signal: string, handler: (...args: never[]) => unknown, after = false): number {{\n"
        ));
        output.push_str(&format!("{INDENT}{INDENT}const meta = SIGNAL_META[signal];\n"));

        ctx.runtime(RuntimeImport::ConnectSignal);
        if self.inherits_connect {
            output.push_str(&format!("{INDENT}{INDENT}if (meta === undefined) {{\n"));
            output.push_str(&format!(
                "{INDENT}{INDENT}{INDENT}return super.connect(signal, handler, after);\n"
            ));
            output.push_str(&format!("{INDENT}{INDENT}}}\n"));
        }
        output.push_str(&format!(
            "{INDENT}{INDENT}return connectSignal(this, signal, handler, meta, after);\n"
        ));
        output.push_str(&format!("{INDENT}}}\n"));
        output
    }
}
