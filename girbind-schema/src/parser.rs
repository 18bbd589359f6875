//! GObject-Introspection XML parser.
//!
//! This module turns one GIR document into a [`Namespace`]. The parser is a
//! single forward pass over the event stream; every element parser consumes
//! its content up to and including its end tag. Members marked
//! `introspectable="0"` and callables taking varargs are dropped here so
//! downstream stages never see them.

use crate::error::{ParseError, SchemaError};
use crate::members::{
    CallableDef, Direction, FieldDef, ParameterDef, PropertyDef, Scope, SignalDef, SignalWhen,
};
use crate::types::{
    AliasDef, CallbackDef, ClassDef, EnumDef, EnumMember, Include, InterfaceDef, Namespace,
    RecordDef, Transfer, TypeRef,
};
use quick_xml::Reader;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesStart, Event};
use std::collections::HashMap;

type XmlReader<'a> = Reader<&'a [u8]>;

/// Parses a GIR document into a namespace.
///
/// # Arguments
/// * `xml` - GIR document content
///
/// # Returns
/// The parsed namespace.
///
/// # Errors
/// Returns `SchemaError::MissingNamespace` if the document has no
/// `<namespace>` element, or `SchemaError::Parse` if the XML is malformed.
pub fn parse_namespace(xml: &str) -> Result<Namespace, SchemaError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut namespace: Option<Namespace> = None;
    let mut includes = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                let tag = tag_name(e)?;
                let attrs = Attrs::from_start(e)?;
                match tag.as_str() {
                    "repository" => {}
                    "include" => {
                        includes.push(parse_include(&attrs)?);
                        skip_to_end(&mut reader, &tag)?;
                    }
                    "namespace" if namespace.is_none() => {
                        namespace = Some(parse_namespace_element(&mut reader, &attrs, false)?);
                    }
                    _ => skip_to_end(&mut reader, &tag)?,
                }
            }
            Ok(Event::Empty(ref e)) => {
                let tag = tag_name(e)?;
                let attrs = Attrs::from_start(e)?;
                match tag.as_str() {
                    "include" => includes.push(parse_include(&attrs)?),
                    "namespace" if namespace.is_none() => {
                        namespace = Some(parse_namespace_element(&mut reader, &attrs, true)?);
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ParseError::Xml(e).into()),
            _ => {}
        }
        buf.clear();
    }

    let mut namespace = namespace.ok_or(SchemaError::MissingNamespace)?;
    namespace.includes = includes;
    tracing::debug!(
        "parsed namespace {}: {} classes, {} records, {} functions",
        namespace.name,
        namespace.classes.len(),
        namespace.records.len(),
        namespace.functions.len()
    );
    Ok(namespace)
}

/// Attributes of one element, keyed by qualified name (`c:type`).
struct Attrs {
    values: HashMap<String, String>,
}

impl Attrs {
    fn from_start(e: &BytesStart<'_>) -> Result<Self, ParseError> {
        let mut values = HashMap::new();
        for attr in e.attributes().flatten() {
            let key = std::str::from_utf8(attr.key.as_ref())?;
            let value = attr.unescape_value().map_err(quick_xml::Error::from)?;
            values.insert(key.to_string(), value.into_owned());
        }
        Ok(Self { values })
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    fn string(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn require(&self, element: &str, key: &str) -> Result<String, ParseError> {
        self.string(key)
            .ok_or_else(|| ParseError::missing_attr(element, key))
    }

    fn flag(&self, key: &str, default: bool) -> bool {
        match self.get(key) {
            Some(value) => value == "1" || value == "true",
            None => default,
        }
    }

    fn index(&self, element: &str, key: &str) -> Result<Option<usize>, ParseError> {
        self.get(key)
            .map(|value| {
                value
                    .parse()
                    .map_err(|_| ParseError::invalid_attr(element, key, value))
            })
            .transpose()
    }

    fn bits(&self) -> Result<Option<u8>, ParseError> {
        self.get("bits")
            .map(|value| {
                value
                    .parse()
                    .map_err(|_| ParseError::invalid_attr("field", "bits", value))
            })
            .transpose()
    }

    fn transfer(&self, element: &str) -> Result<Option<Transfer>, ParseError> {
        self.get("transfer-ownership")
            .map(|value| {
                Transfer::parse(value)
                    .ok_or_else(|| ParseError::invalid_attr(element, "transfer-ownership", value))
            })
            .transpose()
    }

    fn nullable(&self) -> bool {
        self.flag("nullable", false) || self.flag("allow-none", false)
    }

    fn introspectable(&self) -> bool {
        self.flag("introspectable", true)
    }
}

fn tag_name(e: &BytesStart<'_>) -> Result<String, ParseError> {
    Ok(std::str::from_utf8(e.name().as_ref())?.to_string())
}

/// Visits the direct children of the element that was just opened.
///
/// `visit` receives the child's tag, attributes and whether it is an empty
/// element, and returns `true` if it consumed the child's content. Children
/// that were not consumed are skipped.
fn for_each_child<'x, F>(
    reader: &mut XmlReader<'x>,
    element: &str,
    mut visit: F,
) -> Result<(), ParseError>
where
    F: FnMut(&mut XmlReader<'x>, &str, Attrs, bool) -> Result<bool, ParseError>,
{
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let tag = tag_name(&e)?;
                let attrs = Attrs::from_start(&e)?;
                if !visit(reader, &tag, attrs, false)? {
                    skip_to_end(reader, &tag)?;
                }
            }
            Event::Empty(e) => {
                let tag = tag_name(&e)?;
                let attrs = Attrs::from_start(&e)?;
                visit(reader, &tag, attrs, true)?;
            }
            Event::End(_) => return Ok(()),
            Event::Eof => return Err(ParseError::eof(element)),
            _ => {}
        }
        buf.clear();
    }
}

/// Skips to the end of the current element.
fn skip_to_end(reader: &mut XmlReader<'_>, element: &str) -> Result<(), ParseError> {
    let mut buf = Vec::new();
    let mut depth = 1;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(_) => depth += 1,
            Event::End(_) => {
                depth -= 1;
                if depth == 0 {
                    return Ok(());
                }
            }
            Event::Eof => return Err(ParseError::eof(element)),
            _ => {}
        }
        buf.clear();
    }
}

/// Reads the text content of the current element, decoding entity
/// references. Nested markup is flattened into its text.
fn read_text(reader: &mut XmlReader<'_>, element: &str, empty: bool) -> Result<String, ParseError> {
    let mut text = String::new();
    if empty {
        return Ok(text);
    }

    let mut buf = Vec::new();
    let mut depth = 1;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Text(t) => text.push_str(std::str::from_utf8(t.as_ref())?),
            Event::CData(t) => text.push_str(std::str::from_utf8(t.as_ref())?),
            Event::GeneralRef(r) => {
                if let Some(c) = r.resolve_char_ref().map_err(quick_xml::Error::from)? {
                    text.push(c);
                } else {
                    let name = std::str::from_utf8(r.as_ref())?;
                    match resolve_predefined_entity(name) {
                        Some(value) => text.push_str(value),
                        None => {
                            text.push('&');
                            text.push_str(name);
                            text.push(';');
                        }
                    }
                }
            }
            Event::Start(_) => depth += 1,
            Event::End(_) => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            Event::Eof => return Err(ParseError::eof(element)),
            _ => {}
        }
        buf.clear();
    }

    Ok(text.trim().to_string())
}

fn parse_include(attrs: &Attrs) -> Result<Include, ParseError> {
    Ok(Include {
        name: attrs.require("include", "name")?,
        version: attrs.string("version").unwrap_or_default(),
    })
}

/// Parses the namespace element and all of its definitions.
fn parse_namespace_element(
    reader: &mut XmlReader<'_>,
    attrs: &Attrs,
    empty: bool,
) -> Result<Namespace, ParseError> {
    let mut ns = Namespace::new(
        attrs.require("namespace", "name")?,
        attrs.string("version").unwrap_or_default(),
    );
    ns.shared_library = attrs
        .get("shared-library")
        .and_then(|libs| libs.split(',').next())
        .map(str::trim)
        .filter(|lib| !lib.is_empty())
        .map(String::from);

    if empty {
        return Ok(ns);
    }

    for_each_child(reader, "namespace", |reader, tag, attrs, empty| {
        if !attrs.introspectable() {
            return Ok(false);
        }
        match tag {
            "class" => ns.classes.push(parse_class(reader, &attrs, empty)?),
            "interface" => ns.interfaces.push(parse_interface(reader, &attrs, empty)?),
            "record" => {
                if attrs.get("glib:is-gtype-struct-for").is_some() {
                    return Ok(false);
                }
                ns.records.push(parse_record(reader, &attrs, empty)?);
            }
            "function" => {
                if let Some(function) = parse_callable(reader, "function", &attrs, empty)? {
                    ns.functions.push(function);
                }
            }
            "enumeration" => ns.enumerations.push(parse_enum(reader, tag, &attrs, empty)?),
            "bitfield" => ns.bitfields.push(parse_enum(reader, tag, &attrs, empty)?),
            "callback" => {
                let body = parse_callable_body(reader, "callback", empty)?;
                ns.callbacks.push(CallbackDef {
                    name: attrs.require("callback", "name")?,
                    return_type: body.return_type.unwrap_or_else(TypeRef::void),
                    parameters: body.parameters,
                });
            }
            "alias" => {
                let body = parse_typed_body(reader, "alias", empty)?;
                if let Some(target) = body.type_ref {
                    ns.aliases.push(AliasDef {
                        name: attrs.require("alias", "name")?,
                        target,
                    });
                }
            }
            _ => return Ok(false),
        }
        Ok(true)
    })?;

    Ok(ns)
}

/// Parses a class definition.
fn parse_class(
    reader: &mut XmlReader<'_>,
    attrs: &Attrs,
    empty: bool,
) -> Result<ClassDef, ParseError> {
    let mut class = ClassDef::new(attrs.require("class", "name")?);
    class.c_type = attrs.string("c:type");
    class.parent = attrs.string("parent");
    class.abstract_ = attrs.flag("abstract", false);
    class.glib_type_name = attrs.string("glib:type-name");
    class.glib_get_type = attrs.string("glib:get-type");

    if empty {
        return Ok(class);
    }

    for_each_child(reader, "class", |reader, tag, attrs, empty| {
        if !attrs.introspectable() {
            return Ok(false);
        }
        match tag {
            "doc" => class.doc = Some(read_text(reader, tag, empty)?),
            "implements" => {
                class.implements.push(attrs.require(tag, "name")?);
                return Ok(false);
            }
            "constructor" => class
                .constructors
                .extend(parse_callable(reader, tag, &attrs, empty)?),
            "method" => class
                .methods
                .extend(parse_callable(reader, tag, &attrs, empty)?),
            "function" => class
                .static_functions
                .extend(parse_callable(reader, tag, &attrs, empty)?),
            "property" => class.properties.push(parse_property(reader, &attrs, empty)?),
            "glib:signal" => class.signals.push(parse_signal(reader, &attrs, empty)?),
            _ => return Ok(false),
        }
        Ok(true)
    })?;

    Ok(class)
}

/// Parses an interface definition.
fn parse_interface(
    reader: &mut XmlReader<'_>,
    attrs: &Attrs,
    empty: bool,
) -> Result<InterfaceDef, ParseError> {
    let mut iface = InterfaceDef::new(attrs.require("interface", "name")?);
    iface.c_type = attrs.string("c:type");
    iface.glib_type_name = attrs.string("glib:type-name");
    iface.glib_get_type = attrs.string("glib:get-type");

    if empty {
        return Ok(iface);
    }

    for_each_child(reader, "interface", |reader, tag, attrs, empty| {
        if !attrs.introspectable() {
            return Ok(false);
        }
        match tag {
            "doc" => iface.doc = Some(read_text(reader, tag, empty)?),
            "prerequisite" => {
                iface.prerequisites.push(attrs.require(tag, "name")?);
                return Ok(false);
            }
            "method" => iface
                .methods
                .extend(parse_callable(reader, tag, &attrs, empty)?),
            "function" => iface
                .static_functions
                .extend(parse_callable(reader, tag, &attrs, empty)?),
            "property" => iface.properties.push(parse_property(reader, &attrs, empty)?),
            "glib:signal" => iface.signals.push(parse_signal(reader, &attrs, empty)?),
            _ => return Ok(false),
        }
        Ok(true)
    })?;

    Ok(iface)
}

/// Parses a record definition.
fn parse_record(
    reader: &mut XmlReader<'_>,
    attrs: &Attrs,
    empty: bool,
) -> Result<RecordDef, ParseError> {
    let mut record = RecordDef::new(attrs.require("record", "name")?);
    record.c_type = attrs.string("c:type");
    record.opaque = attrs.flag("opaque", false);
    record.disguised = attrs.flag("disguised", false);
    record.glib_type_name = attrs.string("glib:type-name");
    record.glib_get_type = attrs.string("glib:get-type");

    if empty {
        return Ok(record);
    }

    let mut has_union = false;
    for_each_child(reader, "record", |reader, tag, attrs, empty| {
        if tag == "union" {
            // Embedded unions make the layout unknowable.
            has_union = true;
            return Ok(false);
        }
        if tag == "field" {
            // Non-introspectable fields still occupy space.
            record.fields.push(parse_field(reader, &attrs, empty)?);
            return Ok(true);
        }
        if !attrs.introspectable() {
            return Ok(false);
        }
        match tag {
            "doc" => record.doc = Some(read_text(reader, tag, empty)?),
            "constructor" => record
                .constructors
                .extend(parse_callable(reader, tag, &attrs, empty)?),
            "method" => record
                .methods
                .extend(parse_callable(reader, tag, &attrs, empty)?),
            "function" => record
                .static_functions
                .extend(parse_callable(reader, tag, &attrs, empty)?),
            _ => return Ok(false),
        }
        Ok(true)
    })?;

    if has_union {
        record.opaque = true;
    }

    Ok(record)
}

/// Parses an enumeration or bitfield.
fn parse_enum(
    reader: &mut XmlReader<'_>,
    element: &str,
    attrs: &Attrs,
    empty: bool,
) -> Result<EnumDef, ParseError> {
    let mut enum_def = EnumDef::new(attrs.require(element, "name")?);
    enum_def.glib_type_name = attrs.string("glib:type-name");

    if empty {
        return Ok(enum_def);
    }

    for_each_child(reader, element, |reader, tag, attrs, empty| {
        match tag {
            "doc" => enum_def.doc = Some(read_text(reader, tag, empty)?),
            "member" => {
                let name = attrs.require(tag, "name")?;
                let raw = attrs.require(tag, "value")?;
                let value = raw
                    .parse::<i64>()
                    .map_err(|_| ParseError::invalid_attr(tag, "value", raw.as_str()))?;
                enum_def.members.push(EnumMember { name, value });
                return Ok(false);
            }
            _ => return Ok(false),
        }
        Ok(true)
    })?;

    Ok(enum_def)
}

/// Children shared by every callable-like element.
#[derive(Default)]
struct CallableBody {
    doc: Option<String>,
    return_type: Option<TypeRef>,
    parameters: Vec<ParameterDef>,
    varargs: bool,
}

fn parse_callable_body(
    reader: &mut XmlReader<'_>,
    element: &str,
    empty: bool,
) -> Result<CallableBody, ParseError> {
    let mut body = CallableBody::default();
    if empty {
        return Ok(body);
    }

    for_each_child(reader, element, |reader, tag, attrs, empty| {
        match tag {
            "doc" => body.doc = Some(read_text(reader, tag, empty)?),
            "return-value" => {
                let typed = parse_typed_body(reader, tag, empty)?;
                let mut type_ref = typed.type_ref.unwrap_or_else(TypeRef::void);
                type_ref.transfer = attrs.transfer(tag)?;
                type_ref.nullable = attrs.nullable();
                body.return_type = Some(type_ref);
            }
            "parameters" if !empty => {
                for_each_child(reader, tag, |reader, tag, attrs, empty| {
                    if tag != "parameter" {
                        return Ok(false);
                    }
                    let typed = parse_typed_body(reader, tag, empty)?;
                    match typed.type_ref {
                        Some(type_ref) if !typed.varargs => {
                            body.parameters.push(build_parameter(&attrs, type_ref)?);
                        }
                        _ => body.varargs = true,
                    }
                    Ok(true)
                })?;
            }
            _ => return Ok(false),
        }
        Ok(true)
    })?;

    Ok(body)
}

fn build_parameter(attrs: &Attrs, type_ref: TypeRef) -> Result<ParameterDef, ParseError> {
    let mut param = ParameterDef::new(attrs.require("parameter", "name")?, type_ref);
    if let Some(direction) = attrs.get("direction") {
        param.direction = Direction::parse(direction)
            .ok_or_else(|| ParseError::invalid_attr("parameter", "direction", direction))?;
    }
    if let Some(scope) = attrs.get("scope") {
        param.scope = Some(
            Scope::parse(scope)
                .ok_or_else(|| ParseError::invalid_attr("parameter", "scope", scope))?,
        );
    }
    param.nullable = attrs.nullable();
    param.optional = attrs.flag("optional", false);
    param.caller_allocates = attrs.flag("caller-allocates", false);
    param.closure_index = attrs.index("parameter", "closure")?;
    param.destroy_index = attrs.index("parameter", "destroy")?;
    param.transfer = attrs.transfer("parameter")?;
    Ok(param)
}

/// Parses a method, constructor or function. Returns `None` for callables
/// that cannot be called through the fixed-arity runtime primitive.
fn parse_callable(
    reader: &mut XmlReader<'_>,
    element: &str,
    attrs: &Attrs,
    empty: bool,
) -> Result<Option<CallableDef>, ParseError> {
    let name = attrs.require(element, "name")?;
    let body = parse_callable_body(reader, element, empty)?;
    let Some(symbol) = attrs.string("c:identifier") else {
        return Ok(None);
    };
    if body.varargs {
        return Ok(None);
    }

    let mut callable = CallableDef::new(name, symbol);
    callable.throws = attrs.flag("throws", false);
    callable.doc = body.doc;
    callable.parameters = body.parameters;
    if let Some(return_type) = body.return_type {
        callable.return_type = return_type;
    }
    Ok(Some(callable))
}

fn parse_signal(
    reader: &mut XmlReader<'_>,
    attrs: &Attrs,
    empty: bool,
) -> Result<SignalDef, ParseError> {
    let name = attrs.require("glib:signal", "name")?;
    let when = match attrs.get("when") {
        Some(value) => SignalWhen::parse(value)
            .ok_or_else(|| ParseError::invalid_attr("glib:signal", "when", value))?,
        None => SignalWhen::default(),
    };
    let body = parse_callable_body(reader, "glib:signal", empty)?;

    Ok(SignalDef {
        name,
        when,
        return_type: body.return_type.filter(|t| !t.is_void()),
        parameters: body.parameters,
        doc: body.doc,
    })
}

fn parse_property(
    reader: &mut XmlReader<'_>,
    attrs: &Attrs,
    empty: bool,
) -> Result<PropertyDef, ParseError> {
    let body = parse_typed_body(reader, "property", empty)?;
    Ok(PropertyDef {
        name: attrs.require("property", "name")?,
        type_ref: body.type_ref.unwrap_or_else(|| TypeRef::named("gpointer")),
        readable: attrs.flag("readable", true),
        writable: attrs.flag("writable", false),
        construct_only: attrs.flag("construct-only", false),
    })
}

/// Parses a record field.
///
/// Function-pointer fields are not supported as values; they are kept as
/// private pointer-sized slots so later offsets stay correct.
fn parse_field(
    reader: &mut XmlReader<'_>,
    attrs: &Attrs,
    empty: bool,
) -> Result<FieldDef, ParseError> {
    let body = parse_typed_body(reader, "field", empty)?;
    let name = attrs.require("field", "name")?;

    if body.callback || body.type_ref.is_none() {
        return Ok(FieldDef {
            name,
            type_ref: TypeRef::named("gpointer"),
            readable: false,
            writable: false,
            private: true,
            bits: None,
        });
    }

    Ok(FieldDef {
        name,
        type_ref: body.type_ref.unwrap_or_else(|| TypeRef::named("gpointer")),
        readable: attrs.flag("readable", true),
        writable: attrs.flag("writable", false),
        private: attrs.flag("private", false) || !attrs.introspectable(),
        bits: attrs.bits()?,
    })
}

/// Children of an element that carries a single type.
#[derive(Default)]
struct TypedBody {
    type_ref: Option<TypeRef>,
    varargs: bool,
    callback: bool,
}

fn parse_typed_body(
    reader: &mut XmlReader<'_>,
    element: &str,
    empty: bool,
) -> Result<TypedBody, ParseError> {
    let mut body = TypedBody::default();
    if empty {
        return Ok(body);
    }

    for_each_child(reader, element, |reader, tag, attrs, empty| {
        match tag {
            "type" | "array" => {
                let type_ref = parse_type(reader, tag, &attrs, empty)?;
                if body.type_ref.is_none() {
                    body.type_ref = Some(type_ref);
                }
            }
            "varargs" => {
                body.varargs = true;
                return Ok(false);
            }
            "callback" => {
                body.callback = true;
                return Ok(false);
            }
            _ => return Ok(false),
        }
        Ok(true)
    })?;

    Ok(body)
}

/// Parses a `<type>` or `<array>` element.
///
/// C arrays and the two linked-list types collapse into one array
/// representation whose element is the nested type.
fn parse_type(
    reader: &mut XmlReader<'_>,
    tag: &str,
    attrs: &Attrs,
    empty: bool,
) -> Result<TypeRef, ParseError> {
    let mut element: Option<TypeRef> = None;
    if !empty {
        for_each_child(reader, tag, |reader, child, attrs, empty| match child {
            "type" | "array" => {
                let inner = parse_type(reader, child, &attrs, empty)?;
                if element.is_none() {
                    element = Some(inner);
                }
                Ok(true)
            }
            _ => Ok(false),
        })?;
    }

    let name = attrs.get("name");
    let is_list = matches!(name, Some("GLib.List" | "GLib.SList"))
        || (element.is_some() && matches!(name, Some("List" | "SList")));

    let mut type_ref = match name {
        None if tag == "array" => {
            TypeRef::array_of(element.unwrap_or_else(|| TypeRef::named("gpointer")))
        }
        Some(_) if is_list => {
            TypeRef::array_of(element.unwrap_or_else(|| TypeRef::named("gpointer")))
        }
        Some(name) => {
            let mut type_ref = TypeRef::named(name);
            type_ref.element_type = element.map(Box::new);
            type_ref
        }
        None => TypeRef::named("gpointer"),
    };
    type_ref.c_type = attrs.string("c:type");
    Ok(type_ref)
}
