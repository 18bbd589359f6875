//! Member planning: emitted names, async pairs and collision renames.
//!
//! Plans are computed up front for each unit and are immutable during
//! emission. A class method that shadows an inherited member is emitted
//! under `methodName` + class name; when two implemented interfaces declare
//! the same method, later ones get the interface name as suffix.

use crate::mapper::TypeMapper;
use girbind_core::naming::{to_camel_case, transformed_type_name};
use girbind_schema::{CallableDef, ClassDef, InterfaceDef, Namespace, ParameterDef, Repository};
use std::collections::{BTreeMap, HashSet};

/// Instance member names every generated class reserves.
pub const RESERVED_MEMBERS: &[&str] = &["id", "constructor", "connect"];

/// Static member names that clash with `Function` built-ins.
pub const RESERVED_STATICS: &[&str] = &["name", "length", "caller", "arguments", "prototype"];

/// One member to emit.
#[derive(Debug, Clone)]
pub struct MemberPlan<'a> {
    /// Emitted name.
    pub name: String,
    /// The callable (the begin half for promise wrappers).
    pub callable: &'a CallableDef,
    /// Finish half, when the member is emitted as a promise wrapper.
    pub finish: Option<&'a CallableDef>,
    /// Namespace declaring the member.
    pub namespace: &'a str,
    /// Whether collision handling changed the name.
    pub renamed: bool,
}

/// A begin/finish pair.
#[derive(Debug, Clone, Copy)]
pub struct AsyncPair<'a> {
    /// The method taking the async-ready callback.
    pub begin: &'a CallableDef,
    /// The matching `_finish` method.
    pub finish: &'a CallableDef,
}

/// The name a member has before collision handling.
fn natural_name(callable: &CallableDef, finish: Option<&CallableDef>) -> String {
    match finish {
        Some(_) => to_camel_case(async_base(&callable.name)),
        None => to_camel_case(&callable.name),
    }
}

fn async_base(name: &str) -> &str {
    name.strip_suffix("_async").unwrap_or(name)
}

/// Returns true if the visible parameters can be expressed in a TypeScript
/// signature: no required parameter may follow an optional one.
#[must_use]
pub fn has_expressible_optionals(callable: &CallableDef, mapper: &TypeMapper<'_>) -> bool {
    let hidden = callable.hidden_parameters();
    let mut seen_optional = false;
    for (i, param) in callable.parameters.iter().enumerate() {
        if hidden.contains(&i) || mapper.is_async_callback(param) {
            continue;
        }
        if param.is_optional() {
            seen_optional = true;
        } else if seen_optional {
            return false;
        }
    }
    true
}

/// Finds begin/finish pairs among `methods`.
///
/// A method taking an async-ready callback pairs with `<base>_finish`, where
/// `base` is its name without a trailing `_async`.
#[must_use]
pub fn find_async_pairs<'a>(
    methods: &'a [CallableDef],
    mapper: &TypeMapper<'_>,
) -> Vec<AsyncPair<'a>> {
    let mut pairs = Vec::new();
    for begin in methods {
        if !begin.parameters.iter().any(|p| mapper.is_async_callback(p)) {
            continue;
        }
        let finish_name = format!("{}_finish", async_base(&begin.name));
        let Some(finish) = methods.iter().find(|m| m.name == finish_name) else {
            continue;
        };
        if !has_expressible_optionals(begin, mapper) {
            tracing::warn!(
                "{}: optional parameter before a required one, keeping the callback form",
                begin.native_symbol
            );
            continue;
        }
        pairs.push(AsyncPair { begin, finish });
    }
    pairs
}

/// Names already used in one member namespace (instance or static side).
#[derive(Debug, Clone, Default)]
struct NameScope {
    taken: HashSet<String>,
}

impl NameScope {
    fn with_reserved(reserved: &[&str]) -> Self {
        Self {
            taken: reserved.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    fn contains(&self, name: &str) -> bool {
        self.taken.contains(name)
    }

    /// Claims `name`, or `name` + numeric suffix if it is taken.
    fn claim(&mut self, name: String) -> String {
        if self.taken.insert(name.clone()) {
            return name;
        }
        let mut n = 2;
        loop {
            let candidate = format!("{name}{n}");
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}

/// Builds the members for `methods`, pairing async methods.
///
/// `collides` decides whether a natural name must take `suffix`.
fn plan_members<'a>(
    methods: &'a [CallableDef],
    namespace: &'a str,
    mapper: &TypeMapper<'_>,
    scope: &mut NameScope,
    suffix: &str,
    collides: impl Fn(&str, &NameScope) -> bool,
) -> Vec<MemberPlan<'a>> {
    let pairs = find_async_pairs(methods, mapper);
    let own_names: HashSet<String> = methods.iter().map(|m| to_camel_case(&m.name)).collect();
    let mut members = Vec::with_capacity(methods.len());

    for callable in methods {
        let finish = pairs
            .iter()
            .find(|p| std::ptr::eq(p.begin, callable))
            .map(|p| p.finish);
        let mut natural = natural_name(callable, finish);
        if finish.is_some() && own_names.contains(&natural) {
            natural.push_str("Async");
        }
        let name = if collides(&natural, scope) {
            scope.claim(format!("{natural}{suffix}"))
        } else {
            scope.claim(natural.clone())
        };
        members.push(MemberPlan {
            renamed: name != natural,
            name,
            callable,
            finish,
            namespace,
        });
    }

    members
}

/// Instance and static names a class exposes to its subclasses: native
/// names plus the names its members were emitted under.
fn exposed_names(
    repository: &Repository,
    mapper: &TypeMapper<'_>,
    ns: &Namespace,
    class: &ClassDef,
    plan: &ClassPlan<'_>,
) -> (HashSet<String>, HashSet<String>) {
    let mut instance = HashSet::new();
    let mut statics = HashSet::new();

    let mut add_methods = |methods: &[CallableDef], namespace: &str| {
        let view = TypeMapper::new(mapper.registry(), mapper.repository(), namespace);
        for method in methods {
            instance.insert(to_camel_case(&method.name));
            if method.parameters.iter().any(|p| view.is_async_callback(p)) {
                let base = to_camel_case(async_base(&method.name));
                instance.insert(format!("{base}Async"));
                instance.insert(base);
            }
        }
    };

    add_methods(&class.methods, &ns.name);
    for iface in &class.implements {
        if let Some((ins, iface)) = repository.find_interface(iface, &ns.name) {
            add_methods(&iface.methods, &ins.name);
        }
    }

    for function in &class.static_functions {
        statics.insert(to_camel_case(&function.name));
    }
    for ctor in class.constructors.iter().filter(|c| c.name != "new") {
        statics.insert(to_camel_case(&ctor.name));
    }

    instance.extend(
        plan.methods
            .iter()
            .chain(&plan.interface_methods)
            .map(|m| m.name.clone()),
    );
    statics.extend(plan.factories.iter().chain(&plan.statics).map(|m| m.name.clone()));

    (instance, statics)
}

/// Emission plan of a class.
#[derive(Debug, Clone)]
pub struct ClassPlan<'a> {
    /// Constructor emitted as the class constructor.
    pub primary: Option<&'a CallableDef>,
    /// Other constructors, emitted as static factories.
    pub factories: Vec<MemberPlan<'a>>,
    /// Static functions.
    pub statics: Vec<MemberPlan<'a>>,
    /// The class's own methods.
    pub methods: Vec<MemberPlan<'a>>,
    /// Methods of implemented interfaces not provided by the class or an
    /// ancestor.
    pub interface_methods: Vec<MemberPlan<'a>>,
    /// Renamed members keyed by native symbol.
    pub renames: BTreeMap<String, String>,
}

impl<'a> ClassPlan<'a> {
    /// Plans the members of `class`.
    #[must_use]
    pub fn build(
        repository: &'a Repository,
        mapper: &TypeMapper<'_>,
        ns: &'a Namespace,
        class: &'a ClassDef,
    ) -> Self {
        // Plan ancestors root first, so each sees what its own ancestors
        // emitted.
        let mut inherited = HashSet::new();
        let mut inherited_statics = HashSet::new();
        for (ans, ancestor) in repository.ancestors(ns, class).into_iter().rev() {
            let view = TypeMapper::new(mapper.registry(), mapper.repository(), &ans.name);
            let plan =
                Self::build_below(repository, &view, ans, ancestor, &inherited, &inherited_statics);
            let (instance, statics) = exposed_names(repository, &view, ans, ancestor, &plan);
            inherited.extend(instance);
            inherited_statics.extend(statics);
        }
        Self::build_below(repository, mapper, ns, class, &inherited, &inherited_statics)
    }

    /// Plans `class` given the names its ancestors expose.
    fn build_below(
        repository: &'a Repository,
        mapper: &TypeMapper<'_>,
        ns: &'a Namespace,
        class: &'a ClassDef,
        inherited: &HashSet<String>,
        inherited_statics: &HashSet<String>,
    ) -> Self {
        let suffix = transformed_type_name(&ns.name, &class.name);

        let mut scope = NameScope::with_reserved(RESERVED_MEMBERS);
        let methods = plan_members(
            &class.methods,
            &ns.name,
            mapper,
            &mut scope,
            &suffix,
            |name, scope| inherited.contains(name) || scope.contains(name),
        );
        let provided: HashSet<String> = methods
            .iter()
            .map(|m| natural_name(m.callable, m.finish))
            .chain(inherited.iter().cloned())
            .collect();

        let mut interface_methods = Vec::new();
        for iface_name in &class.implements {
            let Some((ins, iface)) = repository.find_interface(iface_name, &ns.name) else {
                tracing::debug!("{}: interface {} not loaded", class.name, iface_name);
                continue;
            };
            interface_methods.extend(Self::plan_interface(
                mapper, ins, iface, &provided, &mut scope,
            ));
        }

        let primary = class.constructors.iter().find(|c| c.name == "new");
        let mut static_scope = NameScope::with_reserved(RESERVED_STATICS);
        let mut plan_static = |callable: &'a CallableDef| {
            let natural = to_camel_case(&callable.name);
            let name =
                if inherited_statics.contains(&natural) || static_scope.contains(&natural) {
                    static_scope.claim(format!("{natural}{suffix}"))
                } else {
                    static_scope.claim(natural.clone())
                };
            MemberPlan {
                renamed: name != natural,
                name,
                callable,
                finish: None,
                namespace: ns.name.as_str(),
            }
        };
        let factories: Vec<MemberPlan<'a>> = class
            .constructors
            .iter()
            .filter(|c| c.name != "new")
            .map(&mut plan_static)
            .collect();
        let statics: Vec<MemberPlan<'a>> =
            class.static_functions.iter().map(&mut plan_static).collect();

        let renames = methods
            .iter()
            .chain(&interface_methods)
            .chain(&factories)
            .chain(&statics)
            .filter(|m| m.renamed)
            .map(|m| (m.callable.native_symbol.clone(), m.name.clone()))
            .collect();

        Self {
            primary,
            factories,
            statics,
            methods,
            interface_methods,
            renames,
        }
    }

    fn plan_interface(
        mapper: &TypeMapper<'_>,
        ins: &'a Namespace,
        iface: &'a InterfaceDef,
        provided: &HashSet<String>,
        scope: &mut NameScope,
    ) -> Vec<MemberPlan<'a>> {
        let view = TypeMapper::new(mapper.registry(), mapper.repository(), &ins.name);
        let suffix = transformed_type_name(&ins.name, &iface.name);
        let pairs = find_async_pairs(&iface.methods, &view);
        let mut members = Vec::new();

        for callable in &iface.methods {
            let finish = pairs
                .iter()
                .find(|p| std::ptr::eq(p.begin, callable))
                .map(|p| p.finish);
            let natural = natural_name(callable, finish);
            if provided.contains(&natural) {
                continue;
            }
            // an earlier interface claimed the name
            let name = if scope.contains(&natural) {
                scope.claim(format!("{natural}{suffix}"))
            } else {
                scope.claim(natural.clone())
            };
            members.push(MemberPlan {
                renamed: name != natural,
                name,
                callable,
                finish,
                namespace: &ins.name,
            });
        }

        members
    }

    /// Looks up the emitted name of a native symbol.
    #[must_use]
    pub fn emitted_name(&self, symbol: &str) -> Option<&str> {
        self.methods
            .iter()
            .chain(&self.interface_methods)
            .chain(&self.factories)
            .chain(&self.statics)
            .find(|m| m.callable.native_symbol == symbol)
            .map(|m| m.name.as_str())
    }
}

/// Emission plan of a unit without inheritance (interface or record).
#[derive(Debug, Clone)]
pub struct FlatPlan<'a> {
    /// Instance methods.
    pub methods: Vec<MemberPlan<'a>>,
    /// Static functions and non-primary constructors.
    pub statics: Vec<MemberPlan<'a>>,
}

impl<'a> FlatPlan<'a> {
    /// Plans instance methods and statics of unit `owner` declared in
    /// `namespace`.
    ///
    /// `reserved` and `static_reserved` list names the unit already uses
    /// on the instance and static side; colliding members take `owner` as
    /// suffix.
    #[must_use]
    pub fn build(
        mapper: &TypeMapper<'_>,
        namespace: &'a str,
        owner: &str,
        methods: &'a [CallableDef],
        statics: impl IntoIterator<Item = &'a CallableDef>,
        reserved: &[&str],
        static_reserved: &[&str],
    ) -> Self {
        let mut instance_reserved = vec!["id", "constructor"];
        instance_reserved.extend_from_slice(reserved);
        let mut scope = NameScope::with_reserved(&instance_reserved);
        let methods = plan_members(methods, namespace, mapper, &mut scope, owner, |name, scope| {
            scope.contains(name)
        });

        let mut reserved = RESERVED_STATICS.to_vec();
        reserved.extend_from_slice(static_reserved);
        let mut static_scope = NameScope::with_reserved(&reserved);
        let statics = statics
            .into_iter()
            .map(|callable| {
                let natural = to_camel_case(&callable.name);
                let name = if static_scope.contains(&natural) {
                    static_scope.claim(format!("{natural}{owner}"))
                } else {
                    static_scope.claim(natural.clone())
                };
                MemberPlan {
                    renamed: name != natural,
                    name,
                    callable,
                    finish: None,
                    namespace,
                }
            })
            .collect();

        Self { methods, statics }
    }

    /// Plans free functions; they share one scope like static members.
    #[must_use]
    pub fn functions(
        mapper: &TypeMapper<'_>,
        namespace: &'a str,
        functions: &'a [CallableDef],
    ) -> Vec<MemberPlan<'a>> {
        let mut scope = NameScope::default();
        plan_members(functions, namespace, mapper, &mut scope, "", |_, _| false)
    }
}

/// Returns the async-ready callback parameter of a begin method.
#[must_use]
pub fn async_callback_index(callable: &CallableDef, mapper: &TypeMapper<'_>) -> Option<usize> {
    callable
        .parameters
        .iter()
        .position(|p: &ParameterDef| mapper.is_async_callback(p))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::TypeRegistry;
    use girbind_schema::parse_namespace;

    const GIO_GIR: &str = r#"<?xml version="1.0"?>
<repository version="1.2">
  <namespace name="Gio" version="2.0" shared-library="libgio-2.0.so.0">
    <callback name="AsyncReadyCallback">
      <return-value><type name="none"/></return-value>
    </callback>
  </namespace>
</repository>"#;

    const DEMO_GIR: &str = r#"<?xml version="1.0"?>
<repository version="1.2">
  <namespace name="Demo" version="1.0" shared-library="libdemo.so.1">
    <interface name="Container">
      <method name="add" c:identifier="demo_container_add">
        <parameters><parameter name="child"><type name="Widget"/></parameter></parameters>
      </method>
      <method name="remove" c:identifier="demo_container_remove">
        <parameters><parameter name="child"><type name="Widget"/></parameter></parameters>
      </method>
    </interface>
    <interface name="Bin">
      <method name="remove" c:identifier="demo_bin_remove"/>
      <method name="clear" c:identifier="demo_bin_clear"/>
    </interface>
    <class name="Widget">
      <constructor name="new" c:identifier="demo_widget_new"/>
      <constructor name="new_with_name" c:identifier="demo_widget_new_with_name"/>
      <method name="show" c:identifier="demo_widget_show"/>
      <method name="add" c:identifier="demo_widget_add"/>
      <function name="get_default" c:identifier="demo_widget_get_default"/>
    </class>
    <class name="Box" parent="Widget">
      <implements name="Container"/>
      <implements name="Bin"/>
      <constructor name="new_with_name" c:identifier="demo_box_new_with_name"/>
      <method name="add" c:identifier="demo_box_add"/>
      <method name="pack" c:identifier="demo_box_pack"/>
      <method name="connect" c:identifier="demo_box_connect"/>
    </class>
    <class name="Panel" parent="Box">
      <method name="add_box" c:identifier="demo_panel_add_box"/>
      <method name="pack" c:identifier="demo_panel_pack"/>
      <method name="resize" c:identifier="demo_panel_resize"/>
      <function name="new_with_name_box" c:identifier="demo_panel_new_with_name_box"/>
    </class>
    <class name="Stream">
      <method name="read_async" c:identifier="demo_stream_read_async">
        <parameters>
          <parameter name="io_priority"><type name="gint"/></parameter>
          <parameter name="callback" scope="async" closure="2">
            <type name="Gio.AsyncReadyCallback"/>
          </parameter>
          <parameter name="user_data"><type name="gpointer"/></parameter>
        </parameters>
      </method>
      <method name="read_finish" c:identifier="demo_stream_read_finish" throws="1">
        <return-value transfer-ownership="full"><type name="utf8"/></return-value>
        <parameters><parameter name="result"><type name="Gio.AsyncResult"/></parameter></parameters>
      </method>
      <method name="close_async" c:identifier="demo_stream_close_async">
        <parameters>
          <parameter name="cancellable" nullable="1"><type name="gpointer"/></parameter>
          <parameter name="flags"><type name="gint"/></parameter>
          <parameter name="callback" scope="async"><type name="Gio.AsyncReadyCallback"/></parameter>
        </parameters>
      </method>
      <method name="close_finish" c:identifier="demo_stream_close_finish"/>
      <method name="skip" c:identifier="demo_stream_skip"/>
      <method name="skip_async" c:identifier="demo_stream_skip_async">
        <parameters>
          <parameter name="callback" scope="async"><type name="Gio.AsyncReadyCallback"/></parameter>
        </parameters>
      </method>
      <method name="skip_finish" c:identifier="demo_stream_skip_finish"/>
    </class>
  </namespace>
</repository>"#;

    struct Fixture {
        registry: TypeRegistry,
        repository: Repository,
    }

    fn fixture() -> Fixture {
        let namespaces = vec![
            parse_namespace(GIO_GIR).expect("Failed to parse Gio"),
            parse_namespace(DEMO_GIR).expect("Failed to parse Demo"),
        ];
        Fixture {
            registry: TypeRegistry::from_namespaces(&namespaces),
            repository: Repository::from_namespaces(namespaces).expect("Failed to index"),
        }
    }

    fn plan<'a>(f: &'a Fixture, class: &str) -> ClassPlan<'a> {
        let ns = f.repository.get("Demo").expect("Demo missing");
        let class = ns.class(class).expect("class missing");
        let mapper = TypeMapper::new(&f.registry, &f.repository, "Demo");
        ClassPlan::build(&f.repository, &mapper, ns, class)
    }

    fn names(members: &[MemberPlan<'_>]) -> Vec<String> {
        members.iter().map(|m| m.name.clone()).collect()
    }

    #[test]
    fn test_inherited_collision_renamed() {
        let f = fixture();
        let plan = plan(&f, "Box");

        // Widget declares add, so Box's own add is renamed
        assert_eq!(names(&plan.methods), vec!["addBox", "pack", "connectBox"]);
        assert_eq!(plan.emitted_name("demo_box_add"), Some("addBox"));
        assert_eq!(
            plan.renames.get("demo_box_connect").map(String::as_str),
            Some("connectBox")
        );
    }

    #[test]
    fn test_ancestor_renamed_members_are_inherited() {
        let f = fixture();
        let plan = plan(&f, "Panel");

        // Box emits its own add as addBox, so Panel's add_box must not
        // shadow it.
        assert_eq!(names(&plan.methods), vec!["addBoxPanel", "packPanel", "resize"]);
        assert_eq!(plan.emitted_name("demo_panel_add_box"), Some("addBoxPanel"));
        // Box's factory is emitted as newWithNameBox
        assert_eq!(names(&plan.statics), vec!["newWithNameBoxPanel"]);
        // interfaces implemented by ancestors are not re-emitted
        assert!(plan.interface_methods.is_empty());
    }

    #[test]
    fn test_interface_methods_skip_provided_and_suffix_collisions() {
        let f = fixture();
        let plan = plan(&f, "Box");

        // Container.add is inherited from Widget; Bin.remove collides with
        // Container.remove.
        assert_eq!(
            names(&plan.interface_methods),
            vec!["remove", "removeBin", "clear"]
        );
    }

    #[test]
    fn test_own_method_covers_interface_method() {
        let f = fixture();
        let ns = f.repository.get("Demo").expect("Demo missing");
        let mut widget = ns.class("Widget").expect("Widget missing").clone();
        widget.implements.push("Container".to_string());
        let mapper = TypeMapper::new(&f.registry, &f.repository, "Demo");
        let plan = ClassPlan::build(&f.repository, &mapper, ns, &widget);

        assert_eq!(names(&plan.methods), vec!["show", "add"]);
        assert_eq!(names(&plan.interface_methods), vec!["remove"]);
    }

    #[test]
    fn test_rename_map_is_unique() {
        let f = fixture();
        for class in ["Widget", "Box", "Stream"] {
            let plan = plan(&f, class);
            let mut seen = HashSet::new();
            for member in plan.methods.iter().chain(&plan.interface_methods) {
                assert!(seen.insert(member.name.clone()), "duplicate {}", member.name);
            }
            for (symbol, name) in &plan.renames {
                assert_ne!(plan.emitted_name(symbol), None);
                assert_ne!(name, symbol);
            }
        }
    }

    #[test]
    fn test_constructors_and_statics() {
        let f = fixture();
        let widget = plan(&f, "Widget");
        assert_eq!(
            widget.primary.map(|c| c.native_symbol.as_str()),
            Some("demo_widget_new")
        );
        assert_eq!(names(&widget.factories), vec!["newWithName"]);
        assert_eq!(names(&widget.statics), vec!["getDefault"]);

        let boxed = plan(&f, "Box");
        assert!(boxed.primary.is_none());
        assert_eq!(names(&boxed.factories), vec!["newWithNameBox"]);
    }

    #[test]
    fn test_async_pairs() {
        let f = fixture();
        let plan = plan(&f, "Stream");

        let read = &plan.methods[0];
        assert_eq!(read.name, "read");
        assert_eq!(
            read.finish.map(|m| m.native_symbol.as_str()),
            Some("demo_stream_read_finish")
        );

        // optional cancellable before required flags: callback form kept
        let close = &plan.methods[2];
        assert_eq!(close.name, "closeAsync");
        assert!(close.finish.is_none());

        // skip already exists, so the wrapper takes the Async suffix
        let skip = plan
            .methods
            .iter()
            .find(|m| m.callable.name == "skip_async")
            .expect("skip_async missing");
        assert_eq!(skip.name, "skipAsync");
        assert!(skip.finish.is_some());
    }
}
