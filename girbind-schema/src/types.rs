//! Schema type definitions.
//!
//! This module contains the intermediate representation of one parsed
//! namespace: classes, interfaces, records, enumerations, callbacks,
//! aliases and free functions. Everything is immutable once parsed;
//! references between types are by name string and resolved later.

use crate::members::{CallableDef, FieldDef, PropertyDef, SignalDef};

/// Marker name used by [`TypeRef`] for arrays and linked lists.
pub const ARRAY_TYPE_NAME: &str = "array";

/// Ownership transfer annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transfer {
    /// Ownership stays with the callee (borrowed).
    None,
    /// The container is transferred but not its elements.
    Container,
    /// Full ownership is transferred.
    Full,
}

impl Transfer {
    /// Parses a `transfer-ownership` attribute value.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "none" | "floating" => Some(Self::None),
            "container" => Some(Self::Container),
            "full" => Some(Self::Full),
            _ => None,
        }
    }
}

/// A reference to a type by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeRef {
    /// Bare (`Widget`), dotted (`Gio.File`) or [`ARRAY_TYPE_NAME`].
    pub name: String,
    /// True for arrays and linked lists.
    pub is_array: bool,
    /// Element type for arrays and containers.
    pub element_type: Option<Box<TypeRef>>,
    /// C type, when declared.
    pub c_type: Option<String>,
    /// Ownership transfer (return values).
    pub transfer: Option<Transfer>,
    /// Whether the value may be `null` (return values).
    pub nullable: bool,
}

impl TypeRef {
    /// Creates a reference to a named type.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_array: false,
            element_type: None,
            c_type: None,
            transfer: None,
            nullable: false,
        }
    }

    /// Creates an array of `element`.
    #[must_use]
    pub fn array_of(element: TypeRef) -> Self {
        Self {
            name: ARRAY_TYPE_NAME.to_string(),
            is_array: true,
            element_type: Some(Box::new(element)),
            c_type: None,
            transfer: None,
            nullable: false,
        }
    }

    /// The `none` type.
    #[must_use]
    pub fn void() -> Self {
        Self::named("none")
    }

    /// Returns true for `none`.
    #[must_use]
    pub fn is_void(&self) -> bool {
        !self.is_array && self.name == "none"
    }

    /// Splits a dotted name into `(namespace, name)`.
    #[must_use]
    pub fn qualified(&self) -> Option<(&str, &str)> {
        split_qualified(&self.name)
    }

    /// Returns the innermost non-array type name.
    #[must_use]
    pub fn base_name(&self) -> &str {
        match &self.element_type {
            Some(element) if self.is_array => element.base_name(),
            _ => &self.name,
        }
    }
}

/// Splits `Namespace.Name` into its parts.
#[must_use]
pub fn split_qualified(name: &str) -> Option<(&str, &str)> {
    name.split_once('.')
}

/// An `<include>` dependency of a namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Include {
    /// Included namespace name.
    pub name: String,
    /// Included namespace version.
    pub version: String,
}

/// A parsed namespace.
#[derive(Debug, Clone, Default)]
pub struct Namespace {
    /// Namespace name (`Gtk`).
    pub name: String,
    /// Namespace version (`4.0`).
    pub version: String,
    /// Shared library providing the symbols.
    pub shared_library: Option<String>,
    /// Namespaces this one depends on.
    pub includes: Vec<Include>,
    /// Classes.
    pub classes: Vec<ClassDef>,
    /// Interfaces.
    pub interfaces: Vec<InterfaceDef>,
    /// Records (boxed and plain structs).
    pub records: Vec<RecordDef>,
    /// Free functions.
    pub functions: Vec<CallableDef>,
    /// Enumerations.
    pub enumerations: Vec<EnumDef>,
    /// Bitfields.
    pub bitfields: Vec<EnumDef>,
    /// Function-pointer types.
    pub callbacks: Vec<CallbackDef>,
    /// Type aliases.
    pub aliases: Vec<AliasDef>,
}

impl Namespace {
    /// Creates an empty namespace.
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            ..Self::default()
        }
    }

    /// Looks up a class by unqualified name.
    #[must_use]
    pub fn class(&self, name: &str) -> Option<&ClassDef> {
        self.classes.iter().find(|c| c.name == name)
    }

    /// Looks up an interface by unqualified name.
    #[must_use]
    pub fn interface(&self, name: &str) -> Option<&InterfaceDef> {
        self.interfaces.iter().find(|i| i.name == name)
    }

    /// Looks up a record by unqualified name.
    #[must_use]
    pub fn record(&self, name: &str) -> Option<&RecordDef> {
        self.records.iter().find(|r| r.name == name)
    }

    /// Returns the shared library name, or an empty string.
    #[must_use]
    pub fn library(&self) -> &str {
        self.shared_library.as_deref().unwrap_or("")
    }

    /// Returns every enumeration and bitfield.
    pub fn all_enums(&self) -> impl Iterator<Item = &EnumDef> {
        self.enumerations.iter().chain(self.bitfields.iter())
    }
}

/// A class definition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassDef {
    /// Class name.
    pub name: String,
    /// C type name.
    pub c_type: Option<String>,
    /// Parent class, possibly dotted (`GObject.InitiallyUnowned`).
    pub parent: Option<String>,
    /// Whether the class is abstract.
    pub abstract_: bool,
    /// Implemented interfaces, possibly dotted.
    pub implements: Vec<String>,
    /// GType name.
    pub glib_type_name: Option<String>,
    /// GType getter symbol.
    pub glib_get_type: Option<String>,
    /// Instance methods.
    pub methods: Vec<CallableDef>,
    /// Constructors.
    pub constructors: Vec<CallableDef>,
    /// Static functions.
    pub static_functions: Vec<CallableDef>,
    /// Properties.
    pub properties: Vec<PropertyDef>,
    /// Signals.
    pub signals: Vec<SignalDef>,
    /// Documentation.
    pub doc: Option<String>,
}

impl ClassDef {
    /// Creates an empty class.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Looks up a method by name.
    #[must_use]
    pub fn method(&self, name: &str) -> Option<&CallableDef> {
        self.methods.iter().find(|m| m.name == name)
    }
}

/// An interface definition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InterfaceDef {
    /// Interface name.
    pub name: String,
    /// C type name.
    pub c_type: Option<String>,
    /// GType name.
    pub glib_type_name: Option<String>,
    /// GType getter symbol.
    pub glib_get_type: Option<String>,
    /// Prerequisite types, possibly dotted.
    pub prerequisites: Vec<String>,
    /// Instance methods.
    pub methods: Vec<CallableDef>,
    /// Static functions.
    pub static_functions: Vec<CallableDef>,
    /// Properties.
    pub properties: Vec<PropertyDef>,
    /// Signals.
    pub signals: Vec<SignalDef>,
    /// Documentation.
    pub doc: Option<String>,
}

impl InterfaceDef {
    /// Creates an empty interface.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// A record (struct) definition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordDef {
    /// Record name.
    pub name: String,
    /// C type name.
    pub c_type: Option<String>,
    /// Whether the layout is hidden.
    pub opaque: bool,
    /// Whether the record is a disguised pointer.
    pub disguised: bool,
    /// GType name, for boxed records.
    pub glib_type_name: Option<String>,
    /// GType getter symbol.
    pub glib_get_type: Option<String>,
    /// Fields in declaration order.
    pub fields: Vec<FieldDef>,
    /// Instance methods.
    pub methods: Vec<CallableDef>,
    /// Constructors.
    pub constructors: Vec<CallableDef>,
    /// Static functions.
    pub static_functions: Vec<CallableDef>,
    /// Documentation.
    pub doc: Option<String>,
}

impl RecordDef {
    /// Creates an empty record.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Returns true if the memory layout is known and may be allocated.
    #[must_use]
    pub fn has_layout(&self) -> bool {
        !self.opaque && !self.disguised && !self.fields.is_empty()
    }

    /// Native type tag used for allocation and boxed descriptors.
    #[must_use]
    pub fn type_tag(&self) -> &str {
        self.glib_type_name
            .as_deref()
            .or(self.c_type.as_deref())
            .unwrap_or(&self.name)
    }
}

/// An enumeration member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumMember {
    /// Member name (`snake_case`).
    pub name: String,
    /// Numeric value.
    pub value: i64,
}

/// An enumeration or bitfield definition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnumDef {
    /// Enum name.
    pub name: String,
    /// GType name.
    pub glib_type_name: Option<String>,
    /// Members in declaration order.
    pub members: Vec<EnumMember>,
    /// Documentation.
    pub doc: Option<String>,
}

impl EnumDef {
    /// Creates an empty enum.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// A function-pointer type.
#[derive(Debug, Clone, PartialEq)]
pub struct CallbackDef {
    /// Callback type name.
    pub name: String,
    /// Return type.
    pub return_type: TypeRef,
    /// Parameters.
    pub parameters: Vec<crate::members::ParameterDef>,
}

/// A type alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasDef {
    /// Alias name.
    pub name: String,
    /// Aliased type.
    pub target: TypeRef,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_parse() {
        assert_eq!(Transfer::parse("none"), Some(Transfer::None));
        assert_eq!(Transfer::parse("floating"), Some(Transfer::None));
        assert_eq!(Transfer::parse("full"), Some(Transfer::Full));
        assert_eq!(Transfer::parse("bogus"), None);
    }

    #[test]
    fn test_type_ref_helpers() {
        let widget = TypeRef::named("Gtk.Widget");
        assert_eq!(widget.qualified(), Some(("Gtk", "Widget")));
        assert!(!widget.is_void());

        let list = TypeRef::array_of(TypeRef::named("Widget"));
        assert!(list.is_array);
        assert_eq!(list.name, ARRAY_TYPE_NAME);
        assert_eq!(list.base_name(), "Widget");

        assert!(TypeRef::void().is_void());
        assert_eq!(TypeRef::named("Widget").qualified(), None);
    }

    #[test]
    fn test_record_type_tag() {
        let mut record = RecordDef::new("Rectangle");
        assert_eq!(record.type_tag(), "Rectangle");
        record.c_type = Some("GdkRectangle".to_string());
        assert_eq!(record.type_tag(), "GdkRectangle");
        record.glib_type_name = Some("GdkRectangleBoxed".to_string());
        assert_eq!(record.type_tag(), "GdkRectangleBoxed");
        assert!(!record.has_layout());
    }

    #[test]
    fn test_namespace_lookup() {
        let mut ns = Namespace::new("Demo", "1.0");
        ns.classes.push(ClassDef::new("Widget"));
        ns.interfaces.push(InterfaceDef::new("Container"));
        ns.records.push(RecordDef::new("Point"));

        assert!(ns.class("Widget").is_some());
        assert!(ns.class("Missing").is_none());
        assert!(ns.interface("Container").is_some());
        assert!(ns.record("Point").is_some());
        assert_eq!(ns.library(), "");
    }
}
