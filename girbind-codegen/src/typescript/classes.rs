//! Class unit generation.

use super::callables::{self, CallEnv, Receiver};
use super::signals::SignalGenerator;
use super::{INDENT, render_doc};
use crate::config::GeneratorConfig;
use crate::context::{RuntimeImport, UnitContext};
use crate::graph::ClassGraph;
use crate::mapper::{TypeMapper, ValueKind};
use crate::plan::ClassPlan;
use girbind_core::naming::{to_kebab_case, transformed_type_name};
use girbind_core::{FfiType, IntWidth};
use girbind_schema::{CallableDef, ClassDef, Namespace, Repository, TypeRef};
use std::collections::HashSet;

/// Generator for one class unit.
pub struct ClassGenerator<'a> {
    repository: &'a Repository,
    mapper: TypeMapper<'a>,
    config: &'a GeneratorConfig,
    graph: &'a ClassGraph<'a>,
    ns: &'a Namespace,
    class: &'a ClassDef,
}

/// Parent of a generated class.
struct Parent {
    ts: String,
}

impl<'a> ClassGenerator<'a> {
    /// Creates a new class generator.
    #[must_use]
    pub fn new(
        repository: &'a Repository,
        mapper: TypeMapper<'a>,
        config: &'a GeneratorConfig,
        graph: &'a ClassGraph<'a>,
        ns: &'a Namespace,
        class: &'a ClassDef,
    ) -> Self {
        Self {
            repository,
            mapper,
            config,
            graph,
            ns,
            class,
        }
    }

    /// Generated class name.
    #[must_use]
    pub fn class_name(&self) -> String {
        transformed_type_name(&self.ns.name, &self.class.name)
    }

    /// Generates the unit body.
    pub fn generate(&self, ctx: &mut UnitContext) -> String {
        let name = self.class_name();
        let plan = ClassPlan::build(self.repository, &self.mapper, self.ns, self.class);
        let cyclic = self.cyclic_returns(&plan);
        let parent = self.parent(ctx);
        tracing::debug!(
            "class {}.{}: {} methods, {} interface methods, {} renamed",
            self.ns.name,
            self.class.name,
            plan.methods.len(),
            plan.interface_methods.len(),
            plan.renames.len()
        );

        let signal_cycles = self.signal_cycles();
        let signals = SignalGenerator::new(
            self.mapper,
            &name,
            self.class
                .signals
                .iter()
                .chain(self.graph.ancestors(self.class).into_iter().flat_map(|a| &a.signals)),
            &signal_cycles,
            self.inherits_connect(),
        );

        let mut output = String::new();
        if !signals.is_empty() {
            output.push_str(&signals.generate_table(ctx));
        }

        output.push_str(&render_doc(self.class.doc.as_deref(), ""));
        match &parent {
            Some(parent) => {
                output.push_str(&format!("export class {} extends {} {{\n", name, parent.ts));
            }
            None => {
                ctx.runtime(RuntimeImport::NativeHandle);
                output.push_str(&format!("export class {name} {{\n"));
                output.push_str(&format!("{INDENT}id!: NativeHandle;\n\n"));
            }
        }

        let env = CallEnv {
            mapper: self.mapper,
            config: self.config,
            library: self.ns.library(),
            cyclic: &cyclic,
        };

        output.push_str(&self.generate_constructor(&env, ctx, plan.primary, parent.as_ref()));

        for factory in &plan.factories {
            output.push('\n');
            output.push_str(&callables::render_factory(
                &env,
                ctx,
                &name,
                factory.callable,
                &factory.name,
                INDENT,
            ));
        }

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

        for member in &plan.interface_methods {
            let library = self
                .repository
                .get(member.namespace)
                .map_or_else(|| self.ns.library(), Namespace::library);
            let iface_env = CallEnv {
                mapper: self.mapper.resolving_from(member.namespace),
                library,
                ..env
            };
            output.push('\n');
            output.push_str(&callables::render_member(&iface_env, ctx, member, &this, INDENT));
        }

        if !signals.is_empty() {
            output.push('\n');
            output.push_str(&signals.generate_connect(ctx));
        }

        output.push_str("}\n");

        if let Some(type_name) = &self.class.glib_type_name {
            ctx.runtime(RuntimeImport::RegisterType);
            output.push_str(&format!("\nregisterType({name}, \"{type_name}\");\n"));
        }

        output
    }

    /// Resolves the parent and records its import.
    fn parent(&self, ctx: &mut UnitContext) -> Option<Parent> {
        if let Some(local) = self.graph.local_parent(self.class) {
            let ts = transformed_type_name(&self.ns.name, &local.name);
            ctx.use_value(&ts, &to_kebab_case(&local.name));
            return Some(Parent { ts });
        }

        let parent = self.class.parent.as_deref()?;
        let mapped = self.mapper.map_type(&TypeRef::named(parent), false);
        if mapped.kind != ValueKind::Class {
            tracing::debug!(
                "{}.{}: parent {} not loaded, emitting a root class",
                self.ns.name,
                self.class.name,
                parent
            );
            return None;
        }
        ctx.use_types(&mapped.uses);
        Some(Parent { ts: mapped.ts })
    }

    /// Returns true if some ancestor emits its own `connect`.
    fn inherits_connect(&self) -> bool {
        self.repository
            .ancestors(self.ns, self.class)
            .iter()
            .any(|(_, ancestor)| !ancestor.signals.is_empty())
    }

    /// Classes returned by own or interface methods that must be cast.
    fn cyclic_returns(&self, plan: &ClassPlan<'_>) -> HashSet<String> {
        let mut cyclic = self.graph.cyclic_returns(self.class);
        for member in plan
            .interface_methods
            .iter()
            .filter(|m| m.namespace == self.ns.name)
        {
            let returned = member.finish.unwrap_or(member.callable);
            if let Some(other) = self.graph.class(&returned.return_type.name) {
                if self.graph.has_return_cycle(self.class, other) {
                    cyclic.insert(transformed_type_name(&self.ns.name, &other.name));
                }
            }
        }
        cyclic
    }

    /// Classes passed to signal handlers that must not be imported as
    /// values.
    fn signal_cycles(&self) -> HashSet<String> {
        std::iter::once(self.class)
            .chain(self.graph.ancestors(self.class))
            .flat_map(|owner| &owner.signals)
            .flat_map(|signal| &signal.parameters)
            .filter_map(|param| self.graph.class(&param.type_ref.name))
            .filter(|other| {
                other.name != self.class.name && self.graph.has_return_cycle(self.class, other)
            })
            .map(|other| transformed_type_name(&self.ns.name, &other.name))
            .collect()
    }

    /// Renders `g_object_new(get_type(), NULL)` for classes without a
    /// primary constructor.
    fn default_allocation(&self, ctx: &mut UnitContext, indent: &str) -> Option<String> {
        if self.class.abstract_ {
            return None;
        }
        let get_type = self.class.glib_get_type.as_deref()?;
        ctx.runtime(RuntimeImport::Call);
        ctx.runtime(RuntimeImport::NativeHandle);

        let gtype = FfiType::int(IntWidth::W64, false);
        let type_call = callables::call_expr(self.ns.library(), get_type, &[], &gtype, "");
        let args = [
            callables::arg(&gtype, &type_call),
            callables::arg(&FfiType::Pointer, "null"),
        ];
        let call = callables::call_expr(
            &self.config.gobject_library,
            "g_object_new",
            &args,
            &FfiType::Object { borrowed: false },
            indent,
        );
        Some(format!("{indent}this.id = {call} as NativeHandle;\n"))
    }

    fn generate_constructor(
        &self,
        env: &CallEnv<'_>,
        ctx: &mut UnitContext,
        primary: Option<&CallableDef>,
        parent: Option<&Parent>,
    ) -> String {
        let body = format!("{INDENT}{INDENT}");
        let nested_body = format!("{body}{INDENT}");

        let slots = match primary {
            Some(ctor) => callables::param_slots(env, ctx, ctor, None),
            None => Vec::new(),
        };
        let decls: Vec<&str> = slots.iter().map(|s| s.decl.as_str()).collect();
        let allocation = match primary {
            Some(ctor) => Some(callables::render_allocation(
                env,
                ctx,
                ctor,
                &slots,
                "this.id",
                &nested_body,
            )),
            None => self.default_allocation(ctx, &nested_body),
        };

        let mut output = String::new();
        if let Some(ctor) = primary {
            output.push_str(&render_doc(ctor.doc.as_deref(), INDENT));
        }

        match parent {
            Some(parent) => {
                ctx.runtime(RuntimeImport::IsInstantiating);
                ctx.runtime(RuntimeImport::SetInstantiating);
                output.push_str(&format!("{INDENT}constructor({}) {{\n", decls.join(", ")));
                output.push_str(&format!("{body}const nested = isInstantiating();\n"));
                output.push_str(&format!("{body}setInstantiating(true);\n"));
                output.push_str(&format!(
                    "{body}super(...([] as unknown as ConstructorParameters<typeof {}>));\n",
                    parent.ts
                ));
                output.push_str(&format!("{body}setInstantiating(nested);\n"));
                if let Some(allocation) = allocation {
                    output.push_str(&format!("{body}if (!nested) {{\n"));
                    output.push_str(&allocation);
                    output.push_str(&format!("{body}}}\n"));
                }
                output.push_str(&format!("{INDENT}}}\n"));
            }
            None => {
                let Some(allocation) = allocation else {
                    return output;
                };
                ctx.runtime(RuntimeImport::IsInstantiating);
                output.push_str(&format!("{INDENT}constructor({}) {{\n", decls.join(", ")));
                output.push_str(&format!("{body}if (!isInstantiating()) {{\n"));
                output.push_str(&allocation);
                output.push_str(&format!("{body}}}\n"));
                output.push_str(&format!("{INDENT}}}\n"));
            }
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::TypeRegistry;
    use girbind_schema::parse_namespace;

    const GOBJECT_GIR: &str = r#"<?xml version="1.0"?>
<repository version="1.2">
  <namespace name="GObject" version="2.0" shared-library="libgobject-2.0.so.0">
    <class name="Object" glib:type-name="GObject" glib:get-type="g_object_get_type">
      <glib:signal name="notify">
        <return-value><type name="none"/></return-value>
      </glib:signal>
    </class>
    <class name="InitiallyUnowned" parent="Object" glib:type-name="GInitiallyUnowned"/>
  </namespace>
</repository>"#;

    const DEMO_GIR: &str = r#"<?xml version="1.0"?>
<repository version="1.2">
  <namespace name="Demo" version="1.0" shared-library="libdemo.so.1">
    <interface name="Container">
      <method name="add" c:identifier="demo_container_add">
        <parameters><parameter name="child"><type name="Widget"/></parameter></parameters>
      </method>
      <method name="get_children" c:identifier="demo_container_get_children">
        <return-value><array><type name="Widget"/></array></return-value>
      </method>
    </interface>
    <class name="Widget" parent="GObject.InitiallyUnowned" glib:type-name="DemoWidget"
           glib:get-type="demo_widget_get_type" abstract="1">
      <method name="get_child" c:identifier="demo_widget_get_child">
        <return-value nullable="1"><type name="Widget"/></return-value>
      </method>
      <method name="show" c:identifier="demo_widget_show"/>
      <glib:signal name="destroy">
        <return-value><type name="none"/></return-value>
      </glib:signal>
    </class>
    <class name="Box" parent="Widget" glib:type-name="DemoBox" glib:get-type="demo_box_get_type">
      <implements name="Container"/>
      <constructor name="new" c:identifier="demo_box_new">
        <return-value transfer-ownership="none"><type name="Widget"/></return-value>
        <parameters><parameter name="spacing"><type name="gint"/></parameter></parameters>
      </constructor>
      <constructor name="new_from_file" c:identifier="demo_box_new_from_file" throws="1">
        <return-value><type name="Box"/></return-value>
        <parameters><parameter name="path"><type name="filename"/></parameter></parameters>
      </constructor>
      <method name="add" c:identifier="demo_box_add">
        <parameters><parameter name="child"><type name="Widget"/></parameter></parameters>
      </method>
      <function name="get_default" c:identifier="demo_box_get_default">
        <return-value><type name="Box"/></return-value>
      </function>
    </class>
    <class name="Canvas" glib:type-name="DemoCanvas" glib:get-type="demo_canvas_get_type"/>
  </namespace>
</repository>"#;

    struct Fixture {
        registry: TypeRegistry,
        repository: Repository,
        config: GeneratorConfig,
    }

    fn fixture() -> Fixture {
        let namespaces = vec![
            parse_namespace(GOBJECT_GIR).expect("Failed to parse GObject"),
            parse_namespace(DEMO_GIR).expect("Failed to parse Demo"),
        ];
        Fixture {
            registry: TypeRegistry::from_namespaces(&namespaces),
            repository: Repository::from_namespaces(namespaces).expect("Failed to index"),
            config: GeneratorConfig::default(),
        }
    }

    fn generate(f: &Fixture, class: &str) -> (String, UnitContext) {
        let ns = f.repository.get("Demo").expect("Demo missing");
        let class = ns.class(class).expect("class missing");
        let graph = ClassGraph::new(ns);
        let mapper = TypeMapper::new(&f.registry, &f.repository, "Demo");
        let generator = ClassGenerator::new(&f.repository, mapper, &f.config, &graph, ns, class);
        let mut ctx = UnitContext::new(to_kebab_case(&class.name), generator.class_name());
        let body = generator.generate(&mut ctx);
        (body, ctx)
    }

    #[test]
    fn test_external_parent_and_self_cycle() {
        let f = fixture();
        let (body, ctx) = generate(&f, "Widget");

        assert!(body.contains("export class Widget extends GObject.InitiallyUnowned {\n"));
        assert!(body.contains("return ptr === null ? null : ({ id: ptr } as Widget);"));
        assert!(!ctx.is_imported("Widget"));
        assert!(ctx.render_imports("rt").contains("import * as GObject from \"../g-object/index.js\";"));
        // abstract: no allocation, but the instantiation guard is kept
        assert!(body.contains("super(...([] as unknown as ConstructorParameters<typeof GObject.InitiallyUnowned>));"));
        assert!(!body.contains("g_object_new"));
        // GObject.Object declares signals, so unknown ones are forwarded
        assert!(body.contains("return super.connect(signal, handler, after);"));
        assert!(body.ends_with("registerType(Widget, \"DemoWidget\");\n"));
    }

    #[test]
    fn test_constructor_invokes_parent_once() {
        let f = fixture();
        let (body, ctx) = generate(&f, "Box");

        assert!(body.contains("export class Box extends Widget {\n"));
        assert!(ctx.is_value_import("Widget"));
        assert_eq!(body.matches("super(").count(), 1);
        assert!(body.contains(
            "    constructor(spacing: number) {\n        const nested = isInstantiating();\n        setInstantiating(true);\n"
        ));
        assert!(body.contains("        if (!nested) {\n            this.id = call(\"libdemo.so.1\", \"demo_box_new\", [\n"));
        assert!(body.contains("], { type: \"gobject\", borrowed: true }) as NativeHandle;"));

        let super_pos = body.find("super(").expect("no super");
        let alloc_pos = body.find("this.id = call").expect("no allocation");
        assert!(super_pos < alloc_pos);
    }

    #[test]
    fn test_factory_and_statics() {
        let f = fixture();
        let (body, _) = generate(&f, "Box");

        assert!(body.contains("    static newFromFile(path: string): Box {\n"));
        assert!(body.contains("        const instance = Object.create(Box.prototype) as Box;\n"));
        assert!(body.contains("        instance.id = call(\"libdemo.so.1\", \"demo_box_new_from_file\", [\n"));
        assert!(body.contains("        return instance;\n"));
        assert!(body.contains("throw new NativeError(error.value);"));
        assert!(body.contains("    static getDefault(): Box {\n"));
        assert!(body.contains("({ id: ptr } as Box)"));
    }

    #[test]
    fn test_own_method_covers_interface_method() {
        let f = fixture();
        let (body, _) = generate(&f, "Box");

        assert!(body.contains("    add(child: Widget): void {\n"));
        assert_eq!(body.matches("add(child: Widget)").count(), 1);
        assert!(!body.contains("demo_container_add"));
        assert!(body.contains("    getChildren(): Widget[] {\n"));
        assert!(body.contains("as NativeHandle[];\n"));
        assert!(body.contains("return ptr.map((item) => "));
        // inherited signals are re-declared with the subclass as `self`
        assert!(body.contains("connect(signal: \"destroy\", handler: (self: Box) => void"));
    }

    #[test]
    fn test_root_class_default_allocation() {
        let f = fixture();
        let (body, _) = generate(&f, "Canvas");

        assert!(body.contains("export class Canvas {\n    id!: NativeHandle;\n"));
        assert!(body.contains("    constructor() {\n        if (!isInstantiating()) {\n"));
        assert!(body.contains("this.id = call(\"libgobject-2.0.so.0\", \"g_object_new\", [\n"));
        assert!(body.contains(
            r#"{ type: { type: "int", size: 64, signed: false }, value: call("libdemo.so.1", "demo_canvas_get_type", [], { type: "int", size: 64, signed: false }) }"#
        ));
        assert!(!body.contains("connect("));
    }
}
