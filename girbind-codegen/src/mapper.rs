//! Type mapping from schema types to TypeScript types and wire descriptors.
//!
//! Every mapping returns the types it touched in [`MappedType::uses`], so
//! callers decide what to import without the mapper knowing about files.
//! Probing a type is free of side effects.

use crate::registry::{RegisteredType, TypeKind, TypeRegistry};
use girbind_core::naming::{to_kebab_case, to_param_name};
use girbind_core::{CallbackType, FfiType, PrimitiveType, Trampoline};
use girbind_schema::{ParameterDef, Repository, Transfer, TypeRef};

/// Maximum alias indirections followed before giving up.
const MAX_ALIAS_DEPTH: usize = 8;

/// Category of a mapped value, used to pick the conversion at call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// No value.
    Void,
    /// Number or boolean.
    Primitive,
    /// String.
    String,
    /// Enumeration or bitfield.
    Enum,
    /// Boxed record.
    Record,
    /// Object class instance.
    Class,
    /// Object implementing an interface.
    Interface,
    /// Function pointer.
    Callback,
    /// Array or list.
    Array,
    /// Out/inout slot.
    Ref,
    /// Unresolved type passed as a raw pointer.
    Opaque,
}

impl ValueKind {
    /// Returns true for values passed as native handles.
    #[must_use]
    pub const fn is_handle(&self) -> bool {
        matches!(self, Self::Record | Self::Class | Self::Interface)
    }
}

/// A type referenced by a mapping.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeUse {
    /// Enumeration of the current namespace.
    Enum {
        /// Generated name.
        name: String,
    },
    /// Record of the current namespace.
    Record {
        /// Generated name.
        name: String,
        /// Module file stem.
        module: String,
    },
    /// Class or interface of the current namespace.
    Class {
        /// Generated name.
        name: String,
        /// Module file stem.
        module: String,
    },
    /// Any type of another namespace.
    External {
        /// Namespace name.
        namespace: String,
    },
}

/// Result of mapping one type.
#[derive(Debug, Clone, PartialEq)]
pub struct MappedType {
    /// TypeScript type.
    pub ts: String,
    /// Wire descriptor.
    pub ffi: FfiType,
    /// Value category.
    pub kind: ValueKind,
    /// Mapping of the element (arrays) or slot contents (refs).
    pub inner: Option<Box<MappedType>>,
    /// Types referenced.
    pub uses: Vec<TypeUse>,
}

impl MappedType {
    fn new(ts: impl Into<String>, ffi: FfiType, kind: ValueKind) -> Self {
        Self {
            ts: ts.into(),
            ffi,
            kind,
            inner: None,
            uses: Vec::new(),
        }
    }

    fn with_use(mut self, type_use: TypeUse) -> Self {
        self.uses.push(type_use);
        self
    }

    /// The mapping used for anything that cannot be resolved.
    #[must_use]
    pub fn opaque() -> Self {
        Self::new("unknown", FfiType::Pointer, ValueKind::Opaque)
    }

    /// Returns true for `void`.
    #[must_use]
    pub fn is_void(&self) -> bool {
        self.kind == ValueKind::Void
    }

    /// Returns the element mapping of an array of native handles.
    #[must_use]
    pub fn handle_items(&self) -> Option<&MappedType> {
        self.inner
            .as_deref()
            .filter(|item| self.kind == ValueKind::Array && item.kind.is_handle())
    }

    /// Returns true if the raw value is a handle or an array of handles,
    /// which must be wrapped before it reaches callers.
    #[must_use]
    pub fn holds_handles(&self) -> bool {
        self.kind.is_handle() || self.handle_items().is_some()
    }

    /// TypeScript type that can be written without imports.
    fn simple_ts(&self) -> &str {
        match self.kind {
            ValueKind::Void | ValueKind::Primitive | ValueKind::String => &self.ts,
            ValueKind::Enum => "number",
            _ => "unknown",
        }
    }
}

/// Maps schema types as seen from one namespace.
///
/// Bare names resolve against `namespace`; generated names are qualified
/// relative to `viewer`, the namespace of the unit being emitted. The two
/// differ when a unit emits members declared elsewhere (interface methods
/// of a cross-namespace interface).
#[derive(Debug, Clone, Copy)]
pub struct TypeMapper<'a> {
    registry: &'a TypeRegistry,
    repository: &'a Repository,
    namespace: &'a str,
    viewer: &'a str,
}

impl<'a> TypeMapper<'a> {
    /// Creates a mapper for `namespace`.
    #[must_use]
    pub fn new(registry: &'a TypeRegistry, repository: &'a Repository, namespace: &'a str) -> Self {
        Self {
            registry,
            repository,
            namespace,
            viewer: namespace,
        }
    }

    /// Returns a mapper resolving bare names from `namespace` while still
    /// emitting for the same unit.
    #[must_use]
    pub fn resolving_from(&self, namespace: &'a str) -> Self {
        Self { namespace, ..*self }
    }

    /// Returns the namespace types are resolved from.
    #[must_use]
    pub fn namespace(&self) -> &'a str {
        self.namespace
    }

    /// Returns the namespace generated names are relative to.
    #[must_use]
    pub fn viewer(&self) -> &'a str {
        self.viewer
    }

    /// Returns the type registry.
    #[must_use]
    pub fn registry(&self) -> &'a TypeRegistry {
        self.registry
    }

    /// Returns the repository.
    #[must_use]
    pub fn repository(&self) -> &'a Repository {
        self.repository
    }

    /// Maps a type in return (`is_return`) or argument position.
    #[must_use]
    pub fn map_type(&self, type_ref: &TypeRef, is_return: bool) -> MappedType {
        self.map_inner(type_ref, is_return, type_ref.transfer, 0)
    }

    /// Maps a parameter, wrapping `out` and `inout` parameters in a `Ref`.
    #[must_use]
    pub fn map_parameter(&self, param: &ParameterDef) -> MappedType {
        if param.direction.is_output() {
            let inner = self.map_inner(&param.type_ref, false, param.transfer, 0);
            let slot_ts = match inner.kind {
                _ if inner.holds_handles() => format!("{} | null", inner.ts),
                ValueKind::Primitive | ValueKind::String | ValueKind::Enum | ValueKind::Array => {
                    inner.ts.clone()
                }
                _ => "unknown".to_string(),
            };
            let uses = if slot_ts == "unknown" {
                Vec::new()
            } else {
                inner.uses.clone()
            };
            let mut mapped = MappedType::new(
                format!("Ref<{slot_ts}>"),
                FfiType::reference(inner.ffi.clone()),
                ValueKind::Ref,
            );
            mapped.uses = uses;
            mapped.inner = Some(Box::new(inner));
            return mapped;
        }

        self.map_inner(&param.type_ref, false, param.transfer, 0)
    }

    fn map_inner(
        &self,
        type_ref: &TypeRef,
        is_return: bool,
        transfer: Option<Transfer>,
        depth: usize,
    ) -> MappedType {
        if type_ref.is_array {
            return self.map_array(type_ref, is_return, transfer, depth);
        }

        let borrowed = transfer != Some(Transfer::Full);

        if let Some(prim) = PrimitiveType::from_gir_name(&type_ref.name) {
            let kind = match prim {
                PrimitiveType::Void => ValueKind::Void,
                PrimitiveType::String => ValueKind::String,
                PrimitiveType::Pointer => ValueKind::Opaque,
                _ => ValueKind::Primitive,
            };
            return MappedType::new(prim.ts_type(), prim.ffi_type(borrowed), kind);
        }

        let Some(entry) = self
            .registry
            .resolve_in_namespace(&type_ref.name, self.namespace)
        else {
            tracing::warn!(
                "unresolved type {} in {}, mapping to an opaque pointer",
                type_ref.name,
                self.namespace
            );
            return MappedType::opaque();
        };

        self.map_registered(entry, type_ref, is_return, borrowed, depth)
    }

    fn map_array(
        &self,
        type_ref: &TypeRef,
        is_return: bool,
        transfer: Option<Transfer>,
        depth: usize,
    ) -> MappedType {
        let item = match &type_ref.element_type {
            Some(element) => self.map_inner(element, is_return, transfer, depth),
            None => MappedType::opaque(),
        };

        let (item_ts, uses) = match item.kind {
            ValueKind::Primitive
            | ValueKind::String
            | ValueKind::Enum
            | ValueKind::Record
            | ValueKind::Class
            | ValueKind::Interface => (item.ts.clone(), item.uses.clone()),
            _ => ("unknown".to_string(), Vec::new()),
        };

        let mut mapped = MappedType::new(
            format!("{item_ts}[]"),
            FfiType::array(item.ffi.clone()),
            ValueKind::Array,
        );
        mapped.uses = uses;
        mapped.inner = Some(Box::new(item));
        mapped
    }

    fn map_registered(
        &self,
        entry: &'a RegisteredType,
        type_ref: &TypeRef,
        is_return: bool,
        borrowed: bool,
        depth: usize,
    ) -> MappedType {
        let local = entry.namespace == self.viewer;
        let ts = if local {
            entry.transformed_name.clone()
        } else {
            format!("{}.{}", entry.namespace, entry.transformed_name)
        };
        let external = TypeUse::External {
            namespace: entry.namespace.clone(),
        };

        match entry.kind {
            TypeKind::Enum => {
                let mapped = MappedType::new(ts, FfiType::enumeration(), ValueKind::Enum);
                if local {
                    mapped.with_use(TypeUse::Enum {
                        name: entry.transformed_name.clone(),
                    })
                } else {
                    mapped.with_use(external)
                }
            }
            TypeKind::Record => {
                let ffi = FfiType::Boxed {
                    borrowed: is_return,
                    type_name: entry.type_tag().to_string(),
                    library: entry.library.clone(),
                };
                let mapped = MappedType::new(ts, ffi, ValueKind::Record);
                if local {
                    mapped.with_use(TypeUse::Record {
                        name: entry.transformed_name.clone(),
                        module: to_kebab_case(&entry.name),
                    })
                } else {
                    mapped.with_use(external)
                }
            }
            TypeKind::Class | TypeKind::Interface => {
                let kind = if entry.kind == TypeKind::Class {
                    ValueKind::Class
                } else {
                    ValueKind::Interface
                };
                let mapped = MappedType::new(ts, FfiType::Object { borrowed }, kind);
                if local {
                    mapped.with_use(TypeUse::Class {
                        name: entry.transformed_name.clone(),
                        module: to_kebab_case(&entry.name),
                    })
                } else {
                    mapped.with_use(external)
                }
            }
            TypeKind::Callback => self.map_callback(entry),
            TypeKind::Alias => {
                let Some(target) = entry.alias_target.as_ref() else {
                    return MappedType::opaque();
                };
                if depth >= MAX_ALIAS_DEPTH {
                    tracing::warn!("alias chain too deep at {}", entry.qualified_name());
                    return MappedType::opaque();
                }
                let mut target = target.clone();
                if !target.is_array
                    && !target.name.contains('.')
                    && PrimitiveType::from_gir_name(&target.name).is_none()
                {
                    target.name = format!("{}.{}", entry.namespace, target.name);
                }
                let transfer = (!borrowed).then_some(Transfer::Full);
                self.map_inner(&target, is_return, transfer, depth + 1)
            }
        }
    }

    /// Maps a function-pointer type to a callback descriptor.
    fn map_callback(&self, entry: &'a RegisteredType) -> MappedType {
        match (entry.namespace.as_str(), entry.name.as_str()) {
            ("Gio", "AsyncReadyCallback") => {
                return Self::async_ready_callback();
            }
            ("GLib", "DestroyNotify") => {
                let ffi = FfiType::Callback(CallbackType {
                    trampoline: Trampoline::Destroy,
                    ..CallbackType::default()
                });
                return MappedType::new("() => void", ffi, ValueKind::Callback);
            }
            _ => {}
        }

        let def = self
            .repository
            .get(&entry.namespace)
            .and_then(|ns| ns.callbacks.iter().find(|c| c.name == entry.name));
        let Some(def) = def else {
            let ffi = FfiType::Callback(CallbackType::default());
            return MappedType::new("(...args: unknown[]) => unknown", ffi, ValueKind::Callback);
        };

        // Resolve the callback's own types from its defining namespace.
        let view = self.resolving_from(&entry.namespace);
        let mut arg_types = Vec::new();
        let mut params = Vec::new();
        for param in def.parameters.iter().filter(|p| p.closure_index.is_none()) {
            let mapped = view.map_parameter(param);
            params.push(format!(
                "{}: {}",
                to_param_name(&param.name),
                mapped.simple_ts()
            ));
            arg_types.push(mapped.ffi);
        }
        let ret = view.map_type(&def.return_type, true);

        let ffi = FfiType::Callback(CallbackType {
            trampoline: Trampoline::Closure,
            arg_types: Some(arg_types),
            return_type: Some(Box::new(ret.ffi.clone())),
            source_type: None,
            result_type: None,
        });
        MappedType::new(
            format!("({}) => {}", params.join(", "), ret.simple_ts()),
            ffi,
            ValueKind::Callback,
        )
    }

    /// The fixed mapping of `Gio.AsyncReadyCallback`.
    #[must_use]
    pub fn async_ready_callback() -> MappedType {
        MappedType::new(
            "(source: unknown, result: unknown) => void",
            FfiType::Callback(CallbackType::async_ready()),
            ValueKind::Callback,
        )
    }

    /// Returns true if `param` is an async-ready callback.
    #[must_use]
    pub fn is_async_callback(&self, param: &ParameterDef) -> bool {
        if param.direction.is_output() {
            return false;
        }
        self.registry
            .resolve_in_namespace(&param.type_ref.name, self.namespace)
            .is_some_and(|entry| entry.namespace == "Gio" && entry.name == "AsyncReadyCallback")
            || param.type_ref.name == "Gio.AsyncReadyCallback"
    }
}
