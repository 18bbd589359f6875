//! Per-unit generation context.
//!
//! A [`UnitContext`] is created fresh for every emitted file. Emission steps
//! record the runtime helpers and types they use; the context then renders
//! the minimal import block for the file.

use crate::mapper::{MappedType, TypeUse, ValueKind};
use std::collections::{BTreeMap, BTreeSet};

/// Module stem of the enumerations unit.
pub const ENUMS_MODULE: &str = "enums";
/// Module stem of the free functions unit.
pub const FUNCTIONS_MODULE: &str = "functions";

/// A name imported from the runtime module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RuntimeImport {
    /// `alloc(size, typeTag, lib)`.
    Alloc,
    /// `call(lib, symbol, args, returnType)`.
    Call,
    /// `connectSignal(instance, signal, handler, meta, after)`.
    ConnectSignal,
    /// `createRef(initial)`.
    CreateRef,
    /// `getNativeObject(handle, cls?)`.
    GetNativeObject,
    /// `isInstantiating()`.
    IsInstantiating,
    /// `NativeError` class.
    NativeError,
    /// `read(handle, type, offset)`.
    Read,
    /// `registerType(cls, glibTypeName)`.
    RegisterType,
    /// `setInstantiating(flag)`.
    SetInstantiating,
    /// `write(handle, type, offset, value)`.
    Write,
    /// `NativeHandle` type.
    NativeHandle,
    /// `Ref<T>` type.
    Ref,
    /// `SignalMeta` type.
    SignalMeta,
}

impl RuntimeImport {
    /// Exported name in the runtime module.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Alloc => "alloc",
            Self::Call => "call",
            Self::ConnectSignal => "connectSignal",
            Self::CreateRef => "createRef",
            Self::GetNativeObject => "getNativeObject",
            Self::IsInstantiating => "isInstantiating",
            Self::NativeError => "NativeError",
            Self::Read => "read",
            Self::RegisterType => "registerType",
            Self::SetInstantiating => "setInstantiating",
            Self::Write => "write",
            Self::NativeHandle => "NativeHandle",
            Self::Ref => "Ref",
            Self::SignalMeta => "SignalMeta",
        }
    }

    /// Returns true for names that only exist at the type level.
    #[must_use]
    pub const fn is_type_only(&self) -> bool {
        matches!(self, Self::NativeHandle | Self::Ref | Self::SignalMeta)
    }
}

/// Imports and helpers used by one emitted unit.
#[derive(Debug, Clone)]
pub struct UnitContext {
    module: String,
    own_name: String,
    runtime: BTreeSet<RuntimeImport>,
    externals: BTreeSet<String>,
    // module -> name -> imported as value
    locals: BTreeMap<String, BTreeMap<String, bool>>,
}

impl UnitContext {
    /// Creates the context of module `module`, which exports `own_name`.
    #[must_use]
    pub fn new(module: impl Into<String>, own_name: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            own_name: own_name.into(),
            runtime: BTreeSet::new(),
            externals: BTreeSet::new(),
            locals: BTreeMap::new(),
        }
    }

    /// Module stem of this unit.
    #[must_use]
    pub fn module(&self) -> &str {
        &self.module
    }

    /// Records a runtime helper.
    pub fn runtime(&mut self, import: RuntimeImport) {
        self.runtime.insert(import);
    }

    /// Records the types referenced by a mapping, at the type level.
    pub fn use_mapped(&mut self, mapped: &MappedType) {
        self.use_types(&mapped.uses);
        if mapped.kind == ValueKind::Ref {
            self.runtime(RuntimeImport::Ref);
        }
    }

    /// Records referenced types at the type level.
    pub fn use_types(&mut self, uses: &[TypeUse]) {
        for type_use in uses {
            match type_use {
                TypeUse::Enum { name } => self.add_local(ENUMS_MODULE, name, true),
                TypeUse::Record { name, module } | TypeUse::Class { name, module } => {
                    self.add_local(module, name, false);
                }
                TypeUse::External { namespace } => {
                    self.externals.insert(namespace.clone());
                }
            }
        }
    }

    /// Records a same-namespace type that is needed as a runtime value.
    pub fn use_value(&mut self, name: &str, module: &str) {
        self.add_local(module, name, true);
    }

    fn add_local(&mut self, module: &str, name: &str, value: bool) {
        if module == self.module || name == self.own_name {
            return;
        }
        let entry = self
            .locals
            .entry(module.to_string())
            .or_default()
            .entry(name.to_string())
            .or_insert(false);
        *entry |= value;
    }

    /// Returns true if `name` is imported as a value.
    #[must_use]
    pub fn is_value_import(&self, name: &str) -> bool {
        self.locals
            .values()
            .any(|names| names.get(name).copied().unwrap_or(false))
    }

    /// Returns true if `name` is imported at all.
    #[must_use]
    pub fn is_imported(&self, name: &str) -> bool {
        self.locals.values().any(|names| names.contains_key(name))
    }

    /// Renders the import block.
    ///
    /// Order: runtime module, other namespaces, same-namespace values, then
    /// same-namespace type-only imports.
    #[must_use]
    pub fn render_imports(&self, runtime_module: &str) -> String {
        let mut output = String::new();

        if !self.runtime.is_empty() {
            let names: Vec<String> = self
                .runtime
                .iter()
                .map(|import| {
                    if import.is_type_only() {
                        format!("type {}", import.name())
                    } else {
                        import.name().to_string()
                    }
                })
                .collect();
            output.push_str(&format!(
                "import {{ {} }} from \"{}\";\n",
                names.join(", "),
                runtime_module
            ));
        }

        for namespace in &self.externals {
            output.push_str(&format!(
                "import * as {} from \"../{}/index.js\";\n",
                namespace,
                girbind_core::naming::to_kebab_case(namespace)
            ));
        }

        let mut type_only = String::new();
        for (module, names) in &self.locals {
            let values: Vec<&str> = names
                .iter()
                .filter(|(_, value)| **value)
                .map(|(name, _)| name.as_str())
                .collect();
            let types: Vec<&str> = names
                .iter()
                .filter(|(_, value)| !**value)
                .map(|(name, _)| name.as_str())
                .collect();
            if !values.is_empty() {
                output.push_str(&format!(
                    "import {{ {} }} from \"./{}.js\";\n",
                    values.join(", "),
                    module
                ));
            }
            if !types.is_empty() {
                type_only.push_str(&format!(
                    "import type {{ {} }} from \"./{}.js\";\n",
                    types.join(", "),
                    module
                ));
            }
        }
        output.push_str(&type_only);

        output
    }
}
