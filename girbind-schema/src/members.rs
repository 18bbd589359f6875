//! Member definitions: callables, parameters, signals, properties and fields.

use crate::types::{Transfer, TypeRef};

/// Parameter direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Direction {
    /// Input (default).
    #[default]
    In,
    /// Output slot written by the callee.
    Out,
    /// Slot read and written by the callee.
    InOut,
}

impl Direction {
    /// Parses a direction attribute value.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "in" => Some(Self::In),
            "out" => Some(Self::Out),
            "inout" => Some(Self::InOut),
            _ => None,
        }
    }

    /// Returns true for `out` and `inout`.
    #[must_use]
    pub const fn is_output(&self) -> bool {
        matches!(self, Self::Out | Self::InOut)
    }
}

/// Lifetime scope of a callback parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Invoked once, when an async operation completes.
    Async,
    /// Only valid during the call.
    Call,
    /// Valid until the destroy notify runs.
    Notified,
    /// Valid forever.
    Forever,
}

impl Scope {
    /// Parses a scope attribute value.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "async" => Some(Self::Async),
            "call" => Some(Self::Call),
            "notified" => Some(Self::Notified),
            "forever" => Some(Self::Forever),
            _ => None,
        }
    }
}

/// Signal emission phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SignalWhen {
    /// Run the class handler first.
    First,
    /// Run the class handler last.
    #[default]
    Last,
    /// Run during cleanup.
    Cleanup,
}

impl SignalWhen {
    /// Parses a `when` attribute value.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "first" => Some(Self::First),
            "last" => Some(Self::Last),
            "cleanup" => Some(Self::Cleanup),
            _ => None,
        }
    }
}

/// A callable parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDef {
    /// Parameter name.
    pub name: String,
    /// Parameter type.
    pub type_ref: TypeRef,
    /// Direction.
    pub direction: Direction,
    /// Whether `null` is accepted.
    pub nullable: bool,
    /// Whether an out parameter may be skipped.
    pub optional: bool,
    /// Whether an out parameter's storage is allocated by the caller.
    pub caller_allocates: bool,
    /// Callback scope, for callback-typed parameters.
    pub scope: Option<Scope>,
    /// Index of the user-data parameter for a callback.
    pub closure_index: Option<usize>,
    /// Index of the destroy-notify parameter for a callback.
    pub destroy_index: Option<usize>,
    /// Ownership transfer.
    pub transfer: Option<Transfer>,
}

impl ParameterDef {
    /// Creates an `in` parameter with default metadata.
    #[must_use]
    pub fn new(name: impl Into<String>, type_ref: TypeRef) -> Self {
        Self {
            name: name.into(),
            type_ref,
            direction: Direction::In,
            nullable: false,
            optional: false,
            caller_allocates: false,
            scope: None,
            closure_index: None,
            destroy_index: None,
            transfer: None,
        }
    }

    /// Returns true if a caller may leave this parameter out.
    #[must_use]
    pub fn is_optional(&self) -> bool {
        self.nullable || self.optional
    }
}

/// A method, constructor or function.
#[derive(Debug, Clone, PartialEq)]
pub struct CallableDef {
    /// Name as declared (`snake_case`).
    pub name: String,
    /// Native symbol (`c:identifier`).
    pub native_symbol: String,
    /// Return type (`none` when void).
    pub return_type: TypeRef,
    /// Parameters, excluding the instance parameter.
    pub parameters: Vec<ParameterDef>,
    /// Whether the callable reports errors through a trailing `GError**`.
    pub throws: bool,
    /// Documentation.
    pub doc: Option<String>,
}

impl CallableDef {
    /// Creates a callable with no parameters returning `none`.
    #[must_use]
    pub fn new(name: impl Into<String>, native_symbol: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            native_symbol: native_symbol.into(),
            return_type: TypeRef::void(),
            parameters: Vec::new(),
            throws: false,
            doc: None,
        }
    }

    /// Indices of parameters that never appear in generated signatures:
    /// callback user-data and destroy-notify slots.
    #[must_use]
    pub fn hidden_parameters(&self) -> Vec<usize> {
        let mut hidden = Vec::new();
        for (i, param) in self.parameters.iter().enumerate() {
            if param.scope.is_some() {
                hidden.extend(param.closure_index);
                hidden.extend(param.destroy_index);
            } else if let Some(target) = param.closure_index {
                // user_data pointing back at its callback
                if target != i
                    && self
                        .parameters
                        .get(target)
                        .is_some_and(|p| p.scope.is_some())
                {
                    hidden.push(i);
                }
            }
        }
        hidden.sort_unstable();
        hidden.dedup();
        hidden
    }
}

/// Method definition.
pub type MethodDef = CallableDef;
/// Constructor definition.
pub type ConstructorDef = CallableDef;
/// Function definition (free or static).
pub type FunctionDef = CallableDef;

/// A signal.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalDef {
    /// Signal name (`kebab-case`).
    pub name: String,
    /// Emission phase.
    pub when: SignalWhen,
    /// Return type of handlers, if any.
    pub return_type: Option<TypeRef>,
    /// Handler parameters, excluding the emitting instance.
    pub parameters: Vec<ParameterDef>,
    /// Documentation.
    pub doc: Option<String>,
}

/// A GObject property.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDef {
    /// Property name (`kebab-case`).
    pub name: String,
    /// Property type.
    pub type_ref: TypeRef,
    /// Whether the property can be read.
    pub readable: bool,
    /// Whether the property can be written.
    pub writable: bool,
    /// Whether the property can only be set at construction.
    pub construct_only: bool,
}

/// A record field. Declaration order determines the byte offset.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    /// Field name.
    pub name: String,
    /// Field type.
    pub type_ref: TypeRef,
    /// Whether the field can be read.
    pub readable: bool,
    /// Whether the field can be written.
    pub writable: bool,
    /// Whether the field is private to the library.
    pub private: bool,
    /// Width of a C bit-field (`bits="N"`).
    pub bits: Option<u8>,
}

impl FieldDef {
    /// Returns true if accessors may be generated for this field.
    #[must_use]
    pub fn is_exposed(&self) -> bool {
        !self.private && (self.readable || self.writable)
    }

    /// Returns true if the field is a C bit-field and shares its storage
    /// unit with its neighbours.
    #[must_use]
    pub fn is_bitfield(&self) -> bool {
        self.bits.is_some()
    }
}
