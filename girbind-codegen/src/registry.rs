//! Global type registry.
//!
//! The registry maps `(namespace, original name)` to a [`RegisteredType`]
//! for every type of every namespace in a run. It is built once, before
//! any namespace is generated, and only read afterwards.

use girbind_core::naming::transformed_type_name;
use girbind_schema::{
    AliasDef, CallbackDef, ClassDef, EnumDef, InterfaceDef, Namespace, RecordDef, TypeRef,
};
use std::collections::HashMap;

/// Kind of a registered type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// GObject class.
    Class,
    /// GObject interface.
    Interface,
    /// Enumeration or bitfield.
    Enum,
    /// Record (boxed or plain struct).
    Record,
    /// Function-pointer type.
    Callback,
    /// Alias of another type.
    Alias,
}

/// A row of the type registry.
#[derive(Debug, Clone, PartialEq)]
pub struct RegisteredType {
    /// Kind of type.
    pub kind: TypeKind,
    /// Owning namespace.
    pub namespace: String,
    /// Name as declared.
    pub name: String,
    /// Name used in generated code.
    pub transformed_name: String,
    /// GType name, if any.
    pub glib_type_name: Option<String>,
    /// C type name, if any.
    pub c_type: Option<String>,
    /// Shared library of the owning namespace.
    pub library: Option<String>,
    /// Aliased type, for [`TypeKind::Alias`].
    pub alias_target: Option<TypeRef>,
}

impl RegisteredType {
    fn new(kind: TypeKind, ns: &Namespace, name: &str) -> Self {
        Self {
            kind,
            namespace: ns.name.clone(),
            name: name.to_string(),
            transformed_name: transformed_type_name(&ns.name, name),
            glib_type_name: None,
            c_type: None,
            library: ns.shared_library.clone(),
            alias_target: None,
        }
    }

    /// Returns `Namespace.Name`.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.namespace, self.name)
    }

    /// Native type tag used for boxed descriptors and allocation.
    #[must_use]
    pub fn type_tag(&self) -> &str {
        self.glib_type_name
            .as_deref()
            .or(self.c_type.as_deref())
            .unwrap_or(&self.name)
    }

    /// Returns true for classes and interfaces.
    #[must_use]
    pub fn is_object(&self) -> bool {
        matches!(self.kind, TypeKind::Class | TypeKind::Interface)
    }
}

/// Registry of every type across all namespaces.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: HashMap<String, RegisteredType>,
}

impl TypeRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry holding every type of `namespaces`.
    #[must_use]
    pub fn from_namespaces(namespaces: &[Namespace]) -> Self {
        let mut registry = Self::new();
        for ns in namespaces {
            registry.register_namespace(ns);
        }
        tracing::debug!(
            "registered {} types from {} namespaces",
            registry.len(),
            namespaces.len()
        );
        registry
    }

    /// Registers every type of one namespace.
    pub fn register_namespace(&mut self, ns: &Namespace) {
        for class in &ns.classes {
            self.register_class(ns, class);
        }
        for iface in &ns.interfaces {
            self.register_interface(ns, iface);
        }
        for record in &ns.records {
            self.register_record(ns, record);
        }
        for enum_def in ns.all_enums() {
            self.register_enum(ns, enum_def);
        }
        for callback in &ns.callbacks {
            self.register_callback(ns, callback);
        }
        for alias in &ns.aliases {
            self.register_alias(ns, alias);
        }
    }

    /// Registers a class.
    pub fn register_class(&mut self, ns: &Namespace, class: &ClassDef) {
        let mut entry = RegisteredType::new(TypeKind::Class, ns, &class.name);
        entry.glib_type_name = class.glib_type_name.clone();
        entry.c_type = class.c_type.clone();
        self.insert(entry);
    }

    /// Registers an interface.
    pub fn register_interface(&mut self, ns: &Namespace, iface: &InterfaceDef) {
        let mut entry = RegisteredType::new(TypeKind::Interface, ns, &iface.name);
        entry.glib_type_name = iface.glib_type_name.clone();
        entry.c_type = iface.c_type.clone();
        self.insert(entry);
    }

    /// Registers a record.
    pub fn register_record(&mut self, ns: &Namespace, record: &RecordDef) {
        let mut entry = RegisteredType::new(TypeKind::Record, ns, &record.name);
        entry.glib_type_name = record.glib_type_name.clone();
        entry.c_type = record.c_type.clone();
        self.insert(entry);
    }

    /// Registers an enumeration or bitfield.
    pub fn register_enum(&mut self, ns: &Namespace, enum_def: &EnumDef) {
        let mut entry = RegisteredType::new(TypeKind::Enum, ns, &enum_def.name);
        entry.glib_type_name = enum_def.glib_type_name.clone();
        self.insert(entry);
    }

    /// Registers a callback type.
    pub fn register_callback(&mut self, ns: &Namespace, callback: &CallbackDef) {
        self.insert(RegisteredType::new(TypeKind::Callback, ns, &callback.name));
    }

    /// Registers an alias.
    pub fn register_alias(&mut self, ns: &Namespace, alias: &AliasDef) {
        let mut entry = RegisteredType::new(TypeKind::Alias, ns, &alias.name);
        entry.alias_target = Some(alias.target.clone());
        self.insert(entry);
    }

    fn insert(&mut self, entry: RegisteredType) {
        let key = entry.qualified_name();
        if self.types.contains_key(&key) {
            tracing::warn!("type {} registered twice, keeping the first", key);
            return;
        }
        self.types.insert(key, entry);
    }

    /// Resolves a qualified `Namespace.Name`.
    #[must_use]
    pub fn resolve(&self, qualified: &str) -> Option<&RegisteredType> {
        self.types.get(qualified)
    }

    /// Resolves `name` as seen from namespace `current`.
    ///
    /// Bare names are looked up in `current`; dotted names are taken as
    /// already qualified.
    #[must_use]
    pub fn resolve_in_namespace(&self, name: &str, current: &str) -> Option<&RegisteredType> {
        if name.contains('.') {
            self.resolve(name)
        } else {
            self.resolve(&format!("{current}.{name}"))
        }
    }

    /// Returns the number of registered types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
