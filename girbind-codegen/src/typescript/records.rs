//! Record unit generation.
//!
//! Records with a known memory layout get a static `size`, an allocating
//! constructor and field accessors reading and writing at computed byte
//! offsets. Opaque records only wrap a handle and expose their methods.

use super::callables::{self, CallEnv, Receiver};
use super::{INDENT, render_doc};
use crate::config::GeneratorConfig;
use crate::context::{RuntimeImport, UnitContext};
use crate::mapper::{MappedType, TypeMapper, ValueKind};
use crate::plan::FlatPlan;
use girbind_core::naming::{to_camel_case, transformed_type_name};
use girbind_core::{FfiType, PrimitiveType, StructLayout};
use girbind_schema::{CallableDef, FieldDef, Namespace, RecordDef};
use std::collections::HashSet;

/// Member names a field accessor may not take.
const RESERVED_ACCESSORS: &[&str] = &["id", "constructor"];

/// A field with its placement.
struct FieldAccess<'a> {
    field: &'a FieldDef,
    name: String,
    mapped: MappedType,
    offset: usize,
}

impl FieldAccess<'_> {
    /// TypeScript type of the value `read` returns.
    fn ts(&self) -> &str {
        match self.mapped.kind {
            ValueKind::Primitive | ValueKind::String | ValueKind::Enum => &self.mapped.ts,
            _ => "unknown",
        }
    }

    /// Only inline numbers, booleans and enums get mutators.
    fn has_setter(&self) -> bool {
        self.field.writable
            && (self.mapped.ffi.is_scalar() || self.mapped.kind == ValueKind::Enum)
    }
}

/// Generator for one record unit.
pub struct RecordGenerator<'a> {
    mapper: TypeMapper<'a>,
    config: &'a GeneratorConfig,
    ns: &'a Namespace,
    record: &'a RecordDef,
}

impl<'a> RecordGenerator<'a> {
    /// Creates a new record generator.
    #[must_use]
    pub fn new(
        mapper: TypeMapper<'a>,
        config: &'a GeneratorConfig,
        ns: &'a Namespace,
        record: &'a RecordDef,
    ) -> Self {
        Self {
            mapper,
            config,
            ns,
            record,
        }
    }

    /// Generated class name.
    #[must_use]
    pub fn class_name(&self) -> String {
        transformed_type_name(&self.ns.name, &self.record.name)
    }

    /// Descriptor of the record's own handle.
    fn self_ffi(&self) -> FfiType {
        FfiType::Boxed {
            borrowed: true,
            type_name: self.record.type_tag().to_string(),
            library: self.ns.shared_library.clone(),
        }
    }

    /// Field descriptors in declaration order, or `None` when the layout
    /// cannot be computed.
    fn field_types(&self) -> Option<Vec<MappedType>> {
        if !self.record.has_layout() {
            return None;
        }
        let mut mapped = Vec::with_capacity(self.record.fields.len());
        for field in &self.record.fields {
            if field.is_bitfield() {
                tracing::debug!(
                    "{}.{}: field {} is a bit-field, layout unknown",
                    self.ns.name,
                    self.record.name,
                    field.name
                );
                return None;
            }
            let by_pointer = field
                .type_ref
                .c_type
                .as_deref()
                .is_some_and(|c_type| c_type.ends_with('*'));
            let field_type = self.mapper.map_type(&field.type_ref, true);
            let inline = match field_type.kind {
                ValueKind::Record => !by_pointer,
                ValueKind::Array => field.type_ref.c_type.is_some() && !by_pointer,
                ValueKind::Opaque => {
                    field.type_ref.c_type.is_some()
                        && !by_pointer
                        && PrimitiveType::from_gir_name(&field.type_ref.name).is_none()
                }
                _ => false,
            };
            if inline {
                tracing::debug!(
                    "{}.{}: field {} is stored inline, layout unknown",
                    self.ns.name,
                    self.record.name,
                    field.name
                );
                return None;
            }
            mapped.push(field_type);
        }
        Some(mapped)
    }

    /// Computes the layout and the accessors of exposed fields.
    fn fields(&self) -> Option<(StructLayout, Vec<FieldAccess<'a>>)> {
        let mapped = self.field_types()?;
        let layout = StructLayout::compute(mapped.iter().map(|m| &m.ffi));

        let mut used: HashSet<String> =
            RESERVED_ACCESSORS.iter().map(|s| (*s).to_string()).collect();
        let accessors = self
            .record
            .fields
            .iter()
            .zip(mapped)
            .zip(&layout.fields)
            .filter(|((field, _), _)| field.is_exposed())
            .map(|((field, mapped), slot)| {
                let mut name = to_camel_case(&field.name);
                if used.contains(&name) {
                    name.push_str("Field");
                }
                used.insert(name.clone());
                FieldAccess {
                    field,
                    name,
                    mapped,
                    offset: slot.offset,
                }
            })
            .collect();
        Some((layout, accessors))
    }

    /// Generates the unit body.
    pub fn generate(&self, ctx: &mut UnitContext) -> String {
        let name = self.class_name();
        let fields = self.fields();
        let cyclic = HashSet::new();
        let env = CallEnv {
            mapper: self.mapper,
            config: self.config,
            library: self.ns.library(),
            cyclic: &cyclic,
        };

        // With a known layout the constructor allocates, so every native
        // constructor becomes a factory.
        let primary = if fields.is_some() {
            None
        } else {
            self.record.constructors.iter().find(|c| c.name == "new")
        };
        let factories: Vec<&CallableDef> = self
            .record
            .constructors
            .iter()
            .filter(|c| primary.is_none_or(|p| !std::ptr::eq(*c, p)))
            .collect();
        let factory_names: Vec<String> =
            factories.iter().map(|c| to_camel_case(&c.name)).collect();

        let accessor_names: Vec<&str> = fields
            .as_ref()
            .map(|(_, accessors)| accessors.iter().map(|a| a.name.as_str()).collect())
            .unwrap_or_default();
        let mut static_reserved: Vec<&str> = factory_names.iter().map(String::as_str).collect();
        if fields.is_some() {
            static_reserved.push("size");
        }
        let plan = FlatPlan::build(
            &self.mapper,
            &self.ns.name,
            &name,
            &self.record.methods,
            &self.record.static_functions,
            &accessor_names,
            &static_reserved,
        );
        tracing::debug!(
            "record {}.{}: {} fields, {} methods",
            self.ns.name,
            self.record.name,
            accessor_names.len(),
            plan.methods.len()
        );

        ctx.runtime(RuntimeImport::NativeHandle);
        let mut output = render_doc(self.record.doc.as_deref(), "");
        output.push_str(&format!("export class {name} {{\n"));
        if let Some((layout, _)) = &fields {
            output.push_str(&format!("{INDENT}static readonly size = {};\n\n", layout.size));
        }
        output.push_str(&format!("{INDENT}id!: NativeHandle;\n"));

        if fields.is_some() {
            ctx.runtime(RuntimeImport::Alloc);
            output.push('\n');
            output.push_str(&format!("{INDENT}constructor() {{\n"));
            output.push_str(&format!(
                "{INDENT}{INDENT}this.id = alloc({name}.size, \"{}\", \"{}\") as NativeHandle;\n",
                self.record.type_tag(),
                self.ns.library()
            ));
            output.push_str(&format!("{INDENT}}}\n"));
        } else if let Some(ctor) = primary {
            let slots = callables::param_slots(&env, ctx, ctor, None);
            let decls: Vec<&str> = slots.iter().map(|s| s.decl.as_str()).collect();
            output.push('\n');
            output.push_str(&render_doc(ctor.doc.as_deref(), INDENT));
            output.push_str(&format!("{INDENT}constructor({}) {{\n", decls.join(", ")));
            output.push_str(&callables::render_allocation(
                &env,
                ctx,
                ctor,
                &slots,
                "this.id",
                &format!("{INDENT}{INDENT}"),
            ));
            output.push_str(&format!("{INDENT}}}\n"));
        }

        for (ctor, factory_name) in factories.iter().zip(&factory_names) {
            output.push('\n');
            output.push_str(&callables::render_factory(
                &env,
                ctx,
                &name,
                ctor,
                factory_name,
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

        if let Some((_, accessors)) = &fields {
            for access in accessors {
                output.push('\n');
                output.push_str(&self.render_accessors(ctx, access));
            }
        }

        let this = Receiver::Instance(self.self_ffi());
        for member in &plan.methods {
            output.push('\n');
            output.push_str(&callables::render_member(&env, ctx, member, &this, INDENT));
        }

        output.push_str("}\n");

        if let Some(type_name) = &self.record.glib_type_name {
            ctx.runtime(RuntimeImport::RegisterType);
            output.push_str(&format!("\nregisterType({name}, \"{type_name}\");\n"));
        }

        output
    }

    fn render_accessors(&self, ctx: &mut UnitContext, access: &FieldAccess<'_>) -> String {
        let ts = access.ts();
        if ts != "unknown" {
            ctx.use_mapped(&access.mapped);
        }
        let ffi = &access.mapped.ffi;
        let mut output = String::new();
        if access.field.readable {
            ctx.runtime(RuntimeImport::Read);
            output.push_str(&format!("{INDENT}get {}(): {ts} {{\n", access.name));
            output.push_str(&format!(
                "{INDENT}{INDENT}return read(this.id, {ffi}, {}) as {ts};\n",
                access.offset
            ));
            output.push_str(&format!("{INDENT}}}\n"));
        }
        if access.has_setter() {
            ctx.runtime(RuntimeImport::Write);
            if access.field.readable {
                output.push('\n');
            }
            output.push_str(&format!("{INDENT}set {}(value: {ts}) {{\n", access.name));
            output.push_str(&format!(
                "{INDENT}{INDENT}write(this.id, {ffi}, {}, value);\n",
                access.offset
            ));
            output.push_str(&format!("{INDENT}}}\n"));
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::TypeRegistry;
    use girbind_core::align_up;
    use girbind_schema::{Repository, parse_namespace};

    const DEMO_GIR: &str = r#"<?xml version="1.0"?>
<repository version="1.2">
  <namespace name="Demo" version="1.0" shared-library="libdemo.so.1">
    <record name="Point" c:type="DemoPoint" glib:type-name="DemoPoint">
      <field name="flag" writable="1"><type name="gboolean"/></field>
      <field name="x" writable="1"><type name="gint16"/></field>
      <field name="scale" writable="1"><type name="gdouble"/></field>
      <field name="tag"><type name="guint8"/></field>
      <field name="label" writable="1"><type name="utf8" c:type="gchar*"/></field>
      <field name="align" writable="1"><type name="Align"/></field>
      <field name="reserved" private="1"><type name="gpointer"/></field>
      <constructor name="new_origin" c:identifier="demo_point_new_origin">
        <return-value transfer-ownership="full"><type name="Point"/></return-value>
      </constructor>
      <method name="get_x" c:identifier="demo_point_get_x">
        <return-value><type name="gint"/></return-value>
      </method>
      <method name="distance" c:identifier="demo_point_distance">
        <return-value><type name="gdouble"/></return-value>
        <parameters>
          <parameter name="other"><type name="Point"/></parameter>
        </parameters>
      </method>
      <function name="size" c:identifier="demo_point_size">
        <return-value><type name="gsize"/></return-value>
      </function>
    </record>
    <record name="Iter" c:type="DemoIter" opaque="1">
      <constructor name="new" c:identifier="demo_iter_new" throws="1">
        <return-value transfer-ownership="full"><type name="Iter"/></return-value>
        <parameters>
          <parameter name="start"><type name="gint"/></parameter>
        </parameters>
      </constructor>
      <method name="next" c:identifier="demo_iter_next">
        <return-value><type name="gboolean"/></return-value>
      </method>
    </record>
    <record name="Line" c:type="DemoLine">
      <field name="start"><type name="Point" c:type="DemoPoint"/></field>
      <field name="end"><type name="Point" c:type="DemoPoint"/></field>
    </record>
    <record name="Flags" c:type="DemoFlags">
      <field name="a" writable="1" bits="1"><type name="guint" c:type="guint"/></field>
      <field name="b" writable="1" bits="1"><type name="guint" c:type="guint"/></field>
      <field name="c" writable="1"><type name="gint" c:type="gint"/></field>
    </record>
    <record name="Extended" c:type="DemoExtended">
      <field name="value" writable="1"><type name="long double" c:type="long double"/></field>
      <field name="data" writable="1"><type name="gpointer" c:type="gpointer"/></field>
    </record>
    <enumeration name="Align">
      <member name="start" value="0"/>
    </enumeration>
  </namespace>
</repository>"#;

    fn fixture() -> (TypeRegistry, Repository) {
        let namespaces = vec![parse_namespace(DEMO_GIR).expect("Failed to parse")];
        let registry = TypeRegistry::from_namespaces(&namespaces);
        (
            registry,
            Repository::from_namespaces(namespaces).expect("Failed to index"),
        )
    }

    fn generate(name: &str) -> (String, UnitContext) {
        let (registry, repository) = fixture();
        let ns = repository.get("Demo").expect("Demo missing");
        let record = ns.record(name).expect("record missing");
        let mapper = TypeMapper::new(&registry, &repository, "Demo");
        let config = GeneratorConfig::default();
        let generator = RecordGenerator::new(mapper, &config, ns, record);
        let mut ctx = UnitContext::new(name.to_lowercase(), generator.class_name());
        let body = generator.generate(&mut ctx);
        (body, ctx)
    }

    #[test]
    fn test_layout_invariants() {
        let (registry, repository) = fixture();
        let ns = repository.get("Demo").expect("Demo missing");
        let record = ns.record("Point").expect("Point missing");
        let mapper = TypeMapper::new(&registry, &repository, "Demo");
        let config = GeneratorConfig::default();
        let generator = RecordGenerator::new(mapper, &config, ns, record);

        let (layout, accessors) = generator.fields().expect("layout known");
        assert!(layout.packed_size() <= layout.size);
        for slot in &layout.fields {
            assert_eq!(slot.offset % slot.align, 0);
        }
        assert_eq!(layout.size, align_up(layout.size, layout.align));
        // boolean 0, int16 4, double 8, uint8 16, pointer 24, enum 32, pointer 40
        let offsets: Vec<usize> = layout.fields.iter().map(|s| s.offset).collect();
        assert_eq!(offsets, vec![0, 4, 8, 16, 24, 32, 40]);
        assert_eq!(layout.size, 48);
        // the private field has no accessor
        assert_eq!(accessors.len(), 6);
    }

    #[test]
    fn test_record_with_layout() {
        let (body, ctx) = generate("Point");
        assert!(body.contains("export class Point {\n    static readonly size = 48;\n"));
        assert!(body.contains(
            "        this.id = alloc(Point.size, \"DemoPoint\", \"libdemo.so.1\") as NativeHandle;\n"
        ));
        assert!(body.contains(
            "    get flag(): boolean {\n        return read(this.id, { type: \"boolean\" }, 0) as boolean;\n    }\n"
        ));
        assert!(body.contains(
            "    set scale(value: number) {\n        write(this.id, { type: \"float\", size: 64 }, 8, value);\n    }\n"
        ));
        assert!(body.contains("    get label(): string {\n"));
        assert!(!body.contains("set label"));
        assert!(!body.contains("set tag"));
        assert!(body.contains("    set align(value: Align) {\n"));
        assert!(!body.contains("reserved"));
        assert!(ctx.is_imported("Align"));

        assert!(body.contains("    static newOrigin(): Point {\n"));
        // `size` is taken by the layout constant
        assert!(body.contains("    static sizePoint(): number {\n"));
        assert!(body.contains("    getX(): number {\n"));
        assert!(body.contains(
            "{ type: { type: \"boxed\", borrowed: true, innerType: \"DemoPoint\", lib: \"libdemo.so.1\" }, value: this.id }"
        ));
        assert!(body.ends_with("\nregisterType(Point, \"DemoPoint\");\n"));
    }

    #[test]
    fn test_opaque_record() {
        let (body, ctx) = generate("Iter");
        assert!(!body.contains("static readonly size"));
        assert!(!body.contains("alloc("));
        assert!(body.contains("    constructor(start: number) {\n"));
        assert!(body.contains("const error = createRef<NativeHandle | null>(null);"));
        assert!(body.contains("this.id = call(\"libdemo.so.1\", \"demo_iter_new\", ["));
        assert!(body.contains("    next(): boolean {\n"));
        assert!(!body.contains("registerType"));
        assert!(!ctx.is_imported("Iter"));
    }

    #[test]
    fn test_inline_record_fields() {
        let (body, _) = generate("Line");
        assert!(!body.contains("static readonly size"));
        assert!(!body.contains("get start"));
    }

    #[test]
    fn test_bitfield_record_has_no_layout() {
        let (body, _) = generate("Flags");
        assert!(body.starts_with("export class Flags {\n"));
        assert!(!body.contains("static readonly size"));
        assert!(!body.contains("alloc("));
        assert!(!body.contains("get a()"));
        assert!(!body.contains("get b()"));
        assert!(!body.contains("get c()"));
    }

    #[test]
    fn test_unsized_field_type_has_no_layout() {
        let (body, _) = generate("Extended");
        assert!(!body.contains("static readonly size"));
        assert!(!body.contains("get value()"));
        assert!(!body.contains("get data()"));
    }
}
