//! Call-site rendering shared by methods, static functions and free
//! functions.
//!
//! Every native operation is rendered as `call(lib, symbol, args, ret)`
//! followed by the conversion of the raw result. Fallible operations use
//! the fixed error-holder template; begin/finish pairs become promise
//! wrappers.

use super::{INDENT, render_doc};
use crate::config::GeneratorConfig;
use crate::context::{RuntimeImport, UnitContext};
use crate::mapper::{MappedType, TypeMapper, TypeUse, ValueKind};
use crate::plan::MemberPlan;
use girbind_core::FfiType;
use girbind_core::naming::to_param_name;
use girbind_schema::{CallableDef, Direction};
use std::collections::HashSet;

/// Local names used by emitted bodies; parameters are renamed around them.
const BODY_LOCALS: &[&str] = &["error", "ptr", "result", "instance", "nested", "res", "item"];

/// Everything a call site needs besides the unit context.
#[derive(Debug, Clone, Copy)]
pub struct CallEnv<'a> {
    /// Mapper resolving from the namespace declaring the callable.
    pub mapper: TypeMapper<'a>,
    /// Generator configuration.
    pub config: &'a GeneratorConfig,
    /// Library exporting the native symbols.
    pub library: &'a str,
    /// Generated names of classes returned through a cast.
    pub cyclic: &'a HashSet<String>,
}

/// Position of a rendered callable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Receiver {
    /// Instance method; the descriptor types `this.id`.
    Instance(FfiType),
    /// `static` class member.
    Static,
    /// Exported free function.
    Free,
}

impl Receiver {
    fn this_arg(&self) -> Option<String> {
        match self {
            Self::Instance(ffi) => Some(arg(ffi, "this.id")),
            Self::Static | Self::Free => None,
        }
    }
}

/// A parameter as it appears in a signature and at the call site.
#[derive(Debug, Clone)]
pub struct ParamSlot {
    /// Position in the schema parameter list.
    pub index: usize,
    /// Generated parameter name.
    pub name: String,
    /// Declaration in the signature.
    pub decl: String,
    /// Argument object.
    pub arg: String,
    /// Mapping of the parameter.
    pub mapped: MappedType,
    /// Whether the caller may pass `null`.
    pub nullable: bool,
    /// Local ref receiving the raw handle of an out parameter before it is
    /// wrapped into the caller's ref.
    pub holder: Option<String>,
}

/// Renders an argument object.
#[must_use]
pub fn arg(ffi: &FfiType, value: &str) -> String {
    format!("{{ type: {ffi}, value: {value} }}")
}

/// Appends `| null`, parenthesizing function types.
#[must_use]
pub fn or_null(ts: &str, kind: ValueKind) -> String {
    if kind == ValueKind::Callback {
        format!("({ts}) | null")
    } else {
        format!("{ts} | null")
    }
}

/// Renders `call(...)`. Arguments go one per line; continuation lines are
/// indented relative to `indent`.
#[must_use]
pub fn call_expr(
    library: &str,
    symbol: &str,
    args: &[String],
    ret: &FfiType,
    indent: &str,
) -> String {
    if args.is_empty() {
        return format!("call(\"{library}\", \"{symbol}\", [], {ret})");
    }

    let mut output = format!("call(\"{library}\", \"{symbol}\", [\n");
    for argument in args {
        let lines: Vec<String> = argument
            .lines()
            .map(|line| format!("{indent}{INDENT}{line}"))
            .collect();
        output.push_str(&lines.join("\n"));
        output.push_str(",\n");
    }
    output.push_str(&format!("{indent}], {ret})"));
    output
}

/// Maps the visible parameters of `callable`, leaving out `omit`.
///
/// Hidden user-data and destroy-notify slots are passed implicitly by the
/// runtime and never appear. Optional parameters after the last required
/// one become `name?:`; other nullable parameters take `| null`.
pub fn param_slots(
    env: &CallEnv<'_>,
    ctx: &mut UnitContext,
    callable: &CallableDef,
    omit: Option<usize>,
) -> Vec<ParamSlot> {
    let hidden = callable.hidden_parameters();
    let visible: Vec<_> = callable
        .parameters
        .iter()
        .enumerate()
        .filter(|(i, _)| !hidden.contains(i) && omit != Some(*i))
        .collect();
    let last_required = visible.iter().rposition(|(_, p)| !p.is_optional());

    let mut used = HashSet::new();
    let mut slots = Vec::with_capacity(visible.len());
    for (pos, (index, param)) in visible.into_iter().enumerate() {
        let mapped = env.mapper.map_parameter(param);
        ctx.use_mapped(&mapped);

        let name = unique_param_name(&param.name, &mut used);
        let nullable = param.is_optional();
        let trailing = last_required.is_none_or(|last| pos > last);
        let ts = if nullable {
            or_null(&mapped.ts, mapped.kind)
        } else {
            mapped.ts.clone()
        };
        let decl = if nullable && trailing {
            format!("{name}?: {ts}")
        } else {
            format!("{name}: {ts}")
        };
        let holder = mapped
            .inner
            .as_deref()
            .filter(|inner| mapped.kind == ValueKind::Ref && inner.holds_handles())
            .map(|_| unique_param_name(&format!("{}_ptr", param.name), &mut used));
        let value = match (&holder, mapped.kind.is_handle(), nullable) {
            (Some(holder), _, _) => holder.clone(),
            (None, _, true) if mapped.handle_items().is_some() => {
                format!("{name}?.map((item) => item.id) ?? null")
            }
            (None, _, false) if mapped.handle_items().is_some() => {
                format!("{name}.map((item) => item.id)")
            }
            (None, true, true) => format!("{name}?.id ?? null"),
            (None, true, false) => format!("{name}.id"),
            (None, false, true) if trailing => format!("{name} ?? null"),
            (None, false, _) => name.clone(),
        };

        slots.push(ParamSlot {
            index,
            arg: arg(&mapped.ffi, &value),
            decl,
            name,
            mapped,
            nullable,
            holder,
        });
    }
    slots
}

fn unique_param_name(raw: &str, used: &mut HashSet<String>) -> String {
    let mut name = to_param_name(raw);
    while BODY_LOCALS.contains(&name.as_str()) || used.contains(&name) {
        name.push('_');
    }
    used.insert(name.clone());
    name
}

/// A mapped return value.
#[derive(Debug, Clone)]
pub struct MappedReturn {
    /// Mapping of the return type.
    pub mapped: MappedType,
    /// Whether the native side may return null.
    pub nullable: bool,
}

impl MappedReturn {
    /// Maps the return type of `callable`.
    pub fn of(env: &CallEnv<'_>, ctx: &mut UnitContext, callable: &CallableDef) -> Self {
        let mapped = env.mapper.map_type(&callable.return_type, true);
        ctx.use_mapped(&mapped);
        Self {
            nullable: callable.return_type.nullable && !mapped.is_void(),
            mapped,
        }
    }

    /// TypeScript type of the converted value.
    #[must_use]
    pub fn ts(&self) -> String {
        if self.nullable {
            or_null(&self.mapped.ts, self.mapped.kind)
        } else {
            self.mapped.ts.clone()
        }
    }
}

/// Statements binding the raw result of `call` plus the converted value.
#[derive(Debug, Clone)]
pub struct Converted {
    /// Binding statement (or bare call for `void`).
    pub binding: String,
    /// Expression producing the converted value.
    pub value: Option<String>,
}

/// Converts the raw result of `call`.
///
/// Class and record handles are re-wrapped through the runtime registry,
/// except returns that would close an import cycle, which are cast.
pub fn convert_return(
    env: &CallEnv<'_>,
    ctx: &mut UnitContext,
    ret: &MappedReturn,
    call: &str,
) -> Converted {
    let mapped = &ret.mapped;
    match mapped.kind {
        ValueKind::Void => Converted {
            binding: format!("{call};"),
            value: None,
        },
        _ if mapped.holds_handles() => {
            ctx.runtime(RuntimeImport::NativeHandle);
            let raw_ts = raw_handle_ts(mapped);
            let ptr_ts = if ret.nullable {
                format!("{raw_ts} | null")
            } else {
                raw_ts.to_string()
            };
            let wrapped = wrap_value(env, ctx, mapped, "ptr");
            let value = if ret.nullable {
                format!("ptr === null ? null : {wrapped}")
            } else {
                wrapped
            };
            Converted {
                binding: format!("const ptr = {call} as {ptr_ts};"),
                value: Some(value),
            }
        }
        _ => Converted {
            binding: format!("const result = {call} as {};", ret.ts()),
            value: Some("result".to_string()),
        },
    }
}

fn local_use(mapped: &MappedType) -> Option<(&str, &str)> {
    mapped.uses.iter().find_map(|type_use| match type_use {
        TypeUse::Class { name, module } | TypeUse::Record { name, module } => {
            Some((name.as_str(), module.as_str()))
        }
        TypeUse::Enum { .. } | TypeUse::External { .. } => None,
    })
}

/// TypeScript type of the raw value behind a handle mapping.
fn raw_handle_ts(mapped: &MappedType) -> &'static str {
    if mapped.handle_items().is_some() {
        "NativeHandle[]"
    } else {
        "NativeHandle"
    }
}

fn wrap_handle(env: &CallEnv<'_>, ctx: &mut UnitContext, mapped: &MappedType, ptr: &str) -> String {
    let ts = &mapped.ts;
    if mapped.kind == ValueKind::Interface {
        ctx.runtime(RuntimeImport::GetNativeObject);
        return format!("getNativeObject({ptr}) as {ts}");
    }
    if let Some((name, module)) = local_use(mapped) {
        if mapped.kind == ValueKind::Class && env.cyclic.contains(name) {
            return format!("({{ id: {ptr} }} as {ts})");
        }
        ctx.use_value(name, module);
    }
    ctx.runtime(RuntimeImport::GetNativeObject);
    format!("getNativeObject({ptr}, {ts}) as {ts}")
}

/// Wraps the non-null raw value `raw` of a handle or handle-array mapping.
fn wrap_value(env: &CallEnv<'_>, ctx: &mut UnitContext, mapped: &MappedType, raw: &str) -> String {
    match mapped.handle_items() {
        Some(item) => {
            let wrapped = wrap_handle(env, ctx, item, "item");
            format!("{raw}.map((item) => {wrapped})")
        }
        None => wrap_handle(env, ctx, mapped, raw),
    }
}

/// Declares the local refs receiving raw handles of out parameters.
fn declare_holders(ctx: &mut UnitContext, slots: &[ParamSlot], indent: &str) -> String {
    let mut output = String::new();
    for slot in slots {
        let (Some(holder), Some(inner)) = (&slot.holder, slot.mapped.inner.as_deref()) else {
            continue;
        };
        ctx.runtime(RuntimeImport::CreateRef);
        ctx.runtime(RuntimeImport::NativeHandle);
        output.push_str(&format!(
            "{indent}const {holder} = createRef<{} | null>(null);\n",
            raw_handle_ts(inner)
        ));
    }
    output
}

/// Stores the wrapped contents of each holder into the caller's ref.
fn write_back_holders(
    env: &CallEnv<'_>,
    ctx: &mut UnitContext,
    slots: &[ParamSlot],
    indent: &str,
) -> String {
    let mut output = String::new();
    for slot in slots {
        let (Some(holder), Some(inner)) = (&slot.holder, slot.mapped.inner.as_deref()) else {
            continue;
        };
        let raw = format!("{holder}.value");
        let wrapped = wrap_value(env, ctx, inner, &raw);
        let store = format!("{}.value = {raw} === null ? null : {wrapped};", slot.name);
        if slot.nullable {
            output.push_str(&format!(
                "{indent}if ({}) {{\n{indent}{INDENT}{store}\n{indent}}}\n",
                slot.name
            ));
        } else {
            output.push_str(&format!("{indent}{store}\n"));
        }
    }
    output
}

/// Error holder statements for fallible calls.
fn error_holder(ctx: &mut UnitContext) -> String {
    ctx.runtime(RuntimeImport::CreateRef);
    ctx.runtime(RuntimeImport::NativeHandle);
    "const error = createRef<NativeHandle | null>(null);".to_string()
}

/// Trailing argument receiving a `GError`.
#[must_use]
pub fn error_arg(config: &GeneratorConfig) -> String {
    let ffi = FfiType::reference(FfiType::Boxed {
        borrowed: true,
        type_name: "GError".to_string(),
        library: Some(config.glib_library.clone()),
    });
    arg(&ffi, "error")
}

fn throw_check(ctx: &mut UnitContext, indent: &str) -> String {
    ctx.runtime(RuntimeImport::NativeError);
    format!(
        "{indent}if (error.value !== null) {{\n{indent}{INDENT}throw new NativeError(error.value);\n{indent}}}\n"
    )
}

/// Renders the statements of a plain call: error holder, call, throw
/// check and return.
pub fn render_body(
    env: &CallEnv<'_>,
    ctx: &mut UnitContext,
    callable: &CallableDef,
    args: &[String],
    slots: &[ParamSlot],
    ret: &MappedReturn,
    indent: &str,
) -> String {
    ctx.runtime(RuntimeImport::Call);
    let mut args = args.to_vec();
    let mut output = String::new();
    if callable.throws {
        output.push_str(&format!("{indent}{}\n", error_holder(ctx)));
        args.push(error_arg(env.config));
    }
    output.push_str(&declare_holders(ctx, slots, indent));
    let write_back = write_back_holders(env, ctx, slots, indent);

    let call = call_expr(
        env.library,
        &callable.native_symbol,
        &args,
        &ret.mapped.ffi,
        indent,
    );

    let direct = !callable.throws
        && write_back.is_empty()
        && !ret.mapped.is_void()
        && !ret.mapped.holds_handles();
    if direct {
        output.push_str(&format!("{indent}return {call} as {};\n", ret.ts()));
        return output;
    }

    let converted = convert_return(env, ctx, ret, &call);
    output.push_str(&format!("{indent}{}\n", converted.binding));
    if callable.throws {
        output.push_str(&throw_check(ctx, indent));
    }
    output.push_str(&write_back);
    if let Some(value) = converted.value {
        output.push_str(&format!("{indent}return {value};\n"));
    }
    output
}

/// Renders a constructor call storing the new handle into `target`.
pub fn render_allocation(
    env: &CallEnv<'_>,
    ctx: &mut UnitContext,
    ctor: &CallableDef,
    slots: &[ParamSlot],
    target: &str,
    indent: &str,
) -> String {
    ctx.runtime(RuntimeImport::Call);
    ctx.runtime(RuntimeImport::NativeHandle);
    let ret = MappedReturn::of(env, ctx, ctor);
    let ffi = if ret.mapped.kind.is_handle() {
        ret.mapped.ffi
    } else {
        FfiType::Object { borrowed: false }
    };

    let mut args: Vec<String> = slots.iter().map(|s| s.arg.clone()).collect();
    let mut output = String::new();
    if ctor.throws {
        output.push_str(&format!("{indent}{}\n", error_holder(ctx)));
        args.push(error_arg(env.config));
    }
    output.push_str(&declare_holders(ctx, slots, indent));
    let call = call_expr(env.library, &ctor.native_symbol, &args, &ffi, indent);
    output.push_str(&format!("{indent}{target} = {call} as NativeHandle;\n"));
    if ctor.throws {
        output.push_str(&throw_check(ctx, indent));
    }
    output.push_str(&write_back_holders(env, ctx, slots, indent));
    output
}

/// Renders a secondary constructor as a static factory that bypasses the
/// class constructor.
pub fn render_factory(
    env: &CallEnv<'_>,
    ctx: &mut UnitContext,
    class_name: &str,
    ctor: &CallableDef,
    name: &str,
    indent: &str,
) -> String {
    let body = format!("{indent}{INDENT}");
    let slots = param_slots(env, ctx, ctor, None);
    let decls: Vec<&str> = slots.iter().map(|s| s.decl.as_str()).collect();

    let mut output = render_doc(ctor.doc.as_deref(), indent);
    output.push_str(&format!(
        "{indent}static {}({}): {} {{\n",
        name,
        decls.join(", "),
        class_name
    ));
    output.push_str(&format!(
        "{body}const instance = Object.create({class_name}.prototype) as {class_name};\n"
    ));
    output.push_str(&render_allocation(env, ctx, ctor, &slots, "instance.id", &body));
    output.push_str(&format!("{body}return instance;\n"));
    output.push_str(&format!("{indent}}}\n"));
    output
}

fn signature_prefix(receiver: &Receiver, name: &str) -> String {
    match receiver {
        Receiver::Instance(_) => name.to_string(),
        Receiver::Static => format!("static {name}"),
        Receiver::Free => format!("export function {name}"),
    }
}

/// Renders a member: a plain call, or a promise wrapper for async pairs.
pub fn render_member(
    env: &CallEnv<'_>,
    ctx: &mut UnitContext,
    member: &MemberPlan<'_>,
    receiver: &Receiver,
    indent: &str,
) -> String {
    match member.finish {
        Some(finish) => render_async(env, ctx, member, finish, receiver, indent),
        None => render_plain(env, ctx, member, receiver, indent),
    }
}

fn render_plain(
    env: &CallEnv<'_>,
    ctx: &mut UnitContext,
    member: &MemberPlan<'_>,
    receiver: &Receiver,
    indent: &str,
) -> String {
    let callable = member.callable;
    let slots = param_slots(env, ctx, callable, None);
    let ret = MappedReturn::of(env, ctx, callable);

    let decls: Vec<&str> = slots.iter().map(|s| s.decl.as_str()).collect();
    let args: Vec<String> = receiver
        .this_arg()
        .into_iter()
        .chain(slots.iter().map(|s| s.arg.clone()))
        .collect();

    let mut output = render_doc(callable.doc.as_deref(), indent);
    output.push_str(&format!(
        "{indent}{}({}): {} {{\n",
        signature_prefix(receiver, &member.name),
        decls.join(", "),
        ret.ts()
    ));
    let body_indent = format!("{indent}{INDENT}");
    output.push_str(&render_body(env, ctx, callable, &args, &slots, &ret, &body_indent));
    output.push_str(&format!("{indent}}}\n"));
    output
}

/// An out parameter of a finish call, collected into a `Ref`.
struct OutSlot {
    name: String,
    ref_ts: String,
    slot_ts: String,
    initial: &'static str,
    arg: String,
    resolved: String,
}

fn out_slot(env: &CallEnv<'_>, ctx: &mut UnitContext, name: String, mapped: &MappedType) -> OutSlot {
    let inner = mapped.inner.as_deref();
    if let Some(inner) = inner.filter(|inner| inner.holds_handles()) {
        ctx.runtime(RuntimeImport::NativeHandle);
        let raw = format!("{name}.value");
        let wrapped = wrap_value(env, ctx, inner, &raw);
        return OutSlot {
            arg: arg(&mapped.ffi, &name),
            ref_ts: format!("{} | null", raw_handle_ts(inner)),
            slot_ts: format!("{} | null", inner.ts),
            initial: "null",
            resolved: format!("{raw} === null ? null : {wrapped}"),
            name,
        };
    }
    let (slot_ts, initial) = match inner {
        Some(inner) if inner.kind == ValueKind::Enum => (inner.ts.clone(), "0"),
        Some(inner) if inner.kind == ValueKind::Primitive && inner.ts == "number" => {
            ("number".to_string(), "0")
        }
        Some(inner) if inner.kind == ValueKind::Primitive && inner.ts == "boolean" => {
            ("boolean".to_string(), "false")
        }
        Some(inner) if matches!(inner.kind, ValueKind::String | ValueKind::Array) => {
            (format!("{} | null", inner.ts), "null")
        }
        _ => ("unknown".to_string(), "null"),
    };
    OutSlot {
        arg: arg(&mapped.ffi, &name),
        ref_ts: slot_ts.clone(),
        resolved: format!("{name}.value"),
        name,
        slot_ts,
        initial,
    }
}

fn render_async(
    env: &CallEnv<'_>,
    ctx: &mut UnitContext,
    member: &MemberPlan<'_>,
    finish: &CallableDef,
    receiver: &Receiver,
    indent: &str,
) -> String {
    let begin = member.callable;
    let callback_index = begin
        .parameters
        .iter()
        .position(|p| env.mapper.is_async_callback(p));
    let slots = param_slots(env, ctx, begin, callback_index);
    let begin_ret = env.mapper.map_type(&begin.return_type, true);

    // finish: the first input is the async result, outputs become refs
    let ret = MappedReturn::of(env, ctx, finish);
    let hidden = finish.hidden_parameters();
    let mut result_bound = false;
    let mut finish_args: Vec<String> = receiver.this_arg().into_iter().collect();
    let mut outs = Vec::new();
    let mut used = HashSet::new();
    for (i, param) in finish.parameters.iter().enumerate() {
        if hidden.contains(&i) {
            continue;
        }
        let mapped = env.mapper.map_parameter(param);
        if param.direction == Direction::In {
            let value = if result_bound { "null" } else { "res" };
            result_bound = true;
            finish_args.push(arg(&mapped.ffi, value));
            continue;
        }
        ctx.use_mapped(&mapped);
        let out = out_slot(env, ctx, unique_param_name(&param.name, &mut used), &mapped);
        finish_args.push(out.arg.clone());
        outs.push(out);
    }
    if finish.throws {
        finish_args.push(error_arg(env.config));
    }

    let promise_ts = if outs.is_empty() {
        ret.ts()
    } else {
        let mut fields = Vec::new();
        if !ret.mapped.is_void() {
            fields.push(format!("value: {}", ret.ts()));
        }
        fields.extend(outs.iter().map(|o| format!("{}: {}", o.name, o.slot_ts)));
        format!("{{ {} }}", fields.join("; "))
    };

    ctx.runtime(RuntimeImport::Call);
    let body = format!("{indent}{INDENT}");
    let promise_body = format!("{body}{INDENT}");
    let callback_body = format!("{promise_body}{INDENT}{INDENT}");

    // trampoline invoked once the operation completes
    let mut callback = String::new();
    if finish.throws {
        callback.push_str(&format!("{callback_body}{}\n", error_holder(ctx)));
    }
    if !outs.is_empty() {
        ctx.runtime(RuntimeImport::CreateRef);
    }
    for out in &outs {
        callback.push_str(&format!(
            "{callback_body}const {} = createRef<{}>({});\n",
            out.name, out.ref_ts, out.initial
        ));
    }
    let finish_call = call_expr(
        env.library,
        &finish.native_symbol,
        &finish_args,
        &ret.mapped.ffi,
        &callback_body,
    );
    let converted = convert_return(env, ctx, &ret, &finish_call);
    callback.push_str(&format!("{callback_body}{}\n", converted.binding));
    if finish.throws {
        ctx.runtime(RuntimeImport::NativeError);
        callback.push_str(&format!(
            "{callback_body}if (error.value !== null) {{\n\
             {callback_body}{INDENT}reject(new NativeError(error.value));\n\
             {callback_body}{INDENT}return;\n\
             {callback_body}}}\n"
        ));
    }
    let resolved = if outs.is_empty() {
        converted.value.unwrap_or_default()
    } else {
        let mut fields = Vec::new();
        if let Some(value) = converted.value {
            fields.push(format!("value: {value}"));
        }
        fields.extend(outs.iter().map(|o| format!("{}: {}", o.name, o.resolved)));
        format!("{{ {} }}", fields.join(", "))
    };
    callback.push_str(&format!("{callback_body}resolve({resolved});\n"));

    let ready = callback_index.map_or_else(TypeMapper::async_ready_callback, |i| {
        env.mapper.map_parameter(&begin.parameters[i])
    });
    let callback_arg = format!(
        "{{\n{INDENT}type: {},\n{INDENT}value: (_source: unknown, res: unknown) => {{\n{}{INDENT}}},\n}}",
        ready.ffi,
        strip_indent(&callback, &promise_body)
    );

    let mut begin_args: Vec<String> = receiver.this_arg().into_iter().collect();
    let mut callback_arg = Some(callback_arg);
    for slot in &slots {
        if callback_index.is_some_and(|ci| slot.index > ci) {
            begin_args.extend(callback_arg.take());
        }
        begin_args.push(slot.arg.clone());
    }
    begin_args.extend(callback_arg);
    let begin_call = call_expr(
        env.library,
        &begin.native_symbol,
        &begin_args,
        &begin_ret.ffi,
        &promise_body,
    );

    let decls: Vec<&str> = slots.iter().map(|s| s.decl.as_str()).collect();
    let mut output = render_doc(begin.doc.as_deref(), indent);
    output.push_str(&format!(
        "{indent}{}({}): Promise<{}> {{\n",
        signature_prefix(receiver, &member.name),
        decls.join(", "),
        promise_ts
    ));
    output.push_str(&format!("{body}return new Promise((resolve, reject) => {{\n"));
    output.push_str(&declare_holders(ctx, &slots, &promise_body));
    output.push_str(&format!("{promise_body}{begin_call};\n"));
    output.push_str(&write_back_holders(env, ctx, &slots, &promise_body));
    output.push_str(&format!("{body}}});\n"));
    output.push_str(&format!("{indent}}}\n"));
    output
}

/// Re-bases the lines of `text` from absolute indentation to indentation
/// relative to `base`, for embedding inside an argument.
fn strip_indent(text: &str, base: &str) -> String {
    text.lines()
        .map(|line| format!("{}\n", line.strip_prefix(base).unwrap_or(line)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::FlatPlan;
    use crate::registry::TypeRegistry;
    use girbind_schema::{Repository, parse_namespace};

    const GIO_GIR: &str = r#"<?xml version="1.0"?>
<repository version="1.2">
  <namespace name="Gio" version="2.0" shared-library="libgio-2.0.so.0">
    <interface name="AsyncResult" glib:type-name="GAsyncResult"/>
    <callback name="AsyncReadyCallback">
      <return-value><type name="none"/></return-value>
    </callback>
  </namespace>
</repository>"#;

    const DEMO_GIR: &str = r#"<?xml version="1.0"?>
<repository version="1.2">
  <namespace name="Demo" version="1.0" shared-library="libdemo.so.1">
    <class name="Widget" glib:type-name="DemoWidget"/>
    <record name="Rect" c:type="DemoRect">
      <field name="x"><type name="gint"/></field>
    </record>
    <function name="find_widget" c:identifier="demo_find_widget">
      <return-value nullable="1"><type name="Widget"/></return-value>
      <parameters>
        <parameter name="name"><type name="utf8"/></parameter>
        <parameter name="parent" nullable="1"><type name="Widget"/></parameter>
      </parameters>
    </function>
    <function name="list_widgets" c:identifier="demo_list_widgets">
      <return-value transfer-ownership="container"><array><type name="Widget"/></array></return-value>
      <parameters>
        <parameter name="focus" direction="out" transfer-ownership="none"><type name="Widget"/></parameter>
        <parameter name="default" direction="out" optional="1"><type name="Widget"/></parameter>
      </parameters>
    </function>
    <function name="select" c:identifier="demo_select">
      <return-value><type name="none"/></return-value>
      <parameters>
        <parameter name="widgets"><array><type name="Widget"/></array></parameter>
      </parameters>
    </function>
    <function name="load" c:identifier="demo_load" throws="1">
      <return-value><type name="gboolean"/></return-value>
      <parameters>
        <parameter name="path"><type name="filename"/></parameter>
      </parameters>
    </function>
    <function name="measure" c:identifier="demo_measure">
      <return-value><type name="none"/></return-value>
      <parameters>
        <parameter name="hint" nullable="1"><type name="utf8"/></parameter>
        <parameter name="width" direction="out"><type name="gint"/></parameter>
      </parameters>
    </function>
    <function name="read_async" c:identifier="demo_read_async">
      <parameters>
        <parameter name="callback" scope="async" closure="1">
          <type name="Gio.AsyncReadyCallback"/>
        </parameter>
        <parameter name="user_data"><type name="gpointer"/></parameter>
      </parameters>
    </function>
    <function name="read_finish" c:identifier="demo_read_finish" throws="1">
      <return-value transfer-ownership="full"><type name="utf8"/></return-value>
      <parameters>
        <parameter name="result"><type name="Gio.AsyncResult"/></parameter>
      </parameters>
    </function>
    <function name="query_async" c:identifier="demo_query_async">
      <parameters>
        <parameter name="key"><type name="utf8"/></parameter>
        <parameter name="callback" scope="async"><type name="Gio.AsyncReadyCallback"/></parameter>
      </parameters>
    </function>
    <function name="query_finish" c:identifier="demo_query_finish">
      <return-value><type name="gboolean"/></return-value>
      <parameters>
        <parameter name="result"><type name="Gio.AsyncResult"/></parameter>
        <parameter name="count" direction="out"><type name="guint"/></parameter>
      </parameters>
    </function>
    <function name="lookup_async" c:identifier="demo_lookup_async">
      <parameters>
        <parameter name="callback" scope="async"><type name="Gio.AsyncReadyCallback"/></parameter>
      </parameters>
    </function>
    <function name="lookup_finish" c:identifier="demo_lookup_finish">
      <return-value transfer-ownership="container"><array><type name="Widget"/></array></return-value>
      <parameters>
        <parameter name="result"><type name="Gio.AsyncResult"/></parameter>
        <parameter name="best" direction="out"><type name="Widget"/></parameter>
      </parameters>
    </function>
  </namespace>
</repository>"#;

    struct Fixture {
        registry: TypeRegistry,
        repository: Repository,
        config: GeneratorConfig,
        cyclic: HashSet<String>,
    }

    fn fixture() -> Fixture {
        let namespaces = vec![
            parse_namespace(GIO_GIR).expect("Failed to parse Gio"),
            parse_namespace(DEMO_GIR).expect("Failed to parse Demo"),
        ];
        Fixture {
            registry: TypeRegistry::from_namespaces(&namespaces),
            repository: Repository::from_namespaces(namespaces).expect("Failed to index"),
            config: GeneratorConfig::default(),
            cyclic: HashSet::new(),
        }
    }

    fn render(f: &Fixture, function: &str) -> (String, UnitContext) {
        let ns = f.repository.get("Demo").expect("Demo missing");
        let mapper = TypeMapper::new(&f.registry, &f.repository, "Demo");
        let env = CallEnv {
            mapper,
            config: &f.config,
            library: ns.library(),
            cyclic: &f.cyclic,
        };
        let members = FlatPlan::functions(&mapper, &ns.name, &ns.functions);
        let member = members
            .iter()
            .find(|m| m.callable.name == function)
            .expect("function missing");
        let mut ctx = UnitContext::new("functions", "");
        let text = render_member(&env, &mut ctx, member, &Receiver::Free, "");
        (text, ctx)
    }

    #[test]
    fn test_nullable_handle_return_and_params() {
        let f = fixture();
        let (text, ctx) = render(&f, "find_widget");

        assert!(text.starts_with(
            "export function findWidget(name: string, parent?: Widget | null): Widget | null {\n"
        ));
        assert!(text.contains(r#"{ type: "string", borrowed: true }, value: name }"#));
        assert!(text.contains("value: parent?.id ?? null }"));
        assert!(text.contains("const ptr = call(\"libdemo.so.1\", \"demo_find_widget\", [\n"));
        assert!(
            text.contains("return ptr === null ? null : getNativeObject(ptr, Widget) as Widget;")
        );
        assert!(ctx.is_value_import("Widget"));
    }

    #[test]
    fn test_object_array_return_and_out_parameters() {
        let f = fixture();
        let (text, ctx) = render(&f, "list_widgets");

        assert!(text.starts_with(
            "export function listWidgets(focus: Ref<Widget | null>, default_?: Ref<Widget | null> | null): Widget[] {\n"
        ));
        assert!(text.contains("    const focusPtr = createRef<NativeHandle | null>(null);\n"));
        assert!(text.contains("    const defaultPtr = createRef<NativeHandle | null>(null);\n"));
        assert!(text.contains(
            r#"{ type: { type: "ref", innerType: { type: "gobject", borrowed: true } }, value: focusPtr }"#
        ));
        assert!(text.contains(
            "], { type: \"array\", itemType: { type: \"gobject\", borrowed: true } }) as NativeHandle[];\n"
        ));
        assert!(text.contains(
            "    focus.value = focusPtr.value === null ? null : getNativeObject(focusPtr.value, Widget) as Widget;\n"
        ));
        assert!(text.contains("    if (default_) {\n        default_.value = defaultPtr.value === null"));
        assert!(text.contains(
            "    return ptr.map((item) => getNativeObject(item, Widget) as Widget);\n"
        ));

        // write-back happens after the call, before the return
        let call_pos = text.find("\"demo_list_widgets\"").expect("no call");
        let store_pos = text.find("focus.value =").expect("no write-back");
        let return_pos = text.find("return ptr.map").expect("no return");
        assert!(call_pos < store_pos && store_pos < return_pos);
        assert!(ctx.is_value_import("Widget"));
    }

    #[test]
    fn test_object_array_argument() {
        let f = fixture();
        let (text, _) = render(&f, "select");

        assert!(text.starts_with("export function select(widgets: Widget[]): void {\n"));
        assert!(text.contains("value: widgets.map((item) => item.id) }"));
    }

    #[test]
    fn test_throws_template() {
        let f = fixture();
        let (text, _) = render(&f, "load");

        assert!(text.contains("const error = createRef<NativeHandle | null>(null);\n"));
        assert!(text.contains(
            r#"{ type: { type: "ref", innerType: { type: "boxed", borrowed: true, innerType: "GError", lib: "libglib-2.0.so.0" } }, value: error }"#
        ));
        assert!(text.contains("const result = call("));
        assert!(text.contains(
            "    if (error.value !== null) {\n        throw new NativeError(error.value);\n    }\n    return result;\n"
        ));

        let error_pos = text.find("if (error.value").expect("no check");
        let return_pos = text.find("return result").expect("no return");
        assert!(error_pos < return_pos);
    }

    #[test]
    fn test_out_parameter_after_nullable() {
        let f = fixture();
        let (text, ctx) = render(&f, "measure");

        // nullable before a required out parameter stays positional
        assert!(text.starts_with(
            "export function measure(hint: string | null, width: Ref<number>): void {\n"
        ));
        assert!(text.contains("    call(\"libdemo.so.1\", \"demo_measure\", [\n"));
        assert!(text.contains(
            r#"{ type: "ref", innerType: { type: "int", size: 32, signed: true } }, value: width }"#
        ));
        assert!(ctx.render_imports("rt").contains("type Ref"));
    }

    #[test]
    fn test_async_wrapper_resolves_value() {
        let f = fixture();
        let (text, _) = render(&f, "read_async");

        assert!(text.starts_with("export function read(): Promise<string> {\n"));
        assert!(text.contains("return new Promise((resolve, reject) => {"));
        assert!(text.contains(r#"type: { type: "callback", trampoline: "asyncReady""#));
        assert!(text.contains("value: (_source: unknown, res: unknown) => {"));
        assert!(text.contains("\"demo_read_finish\""));
        assert!(text.contains("reject(new NativeError(error.value));"));
        assert!(text.contains("resolve(result);"));
        // user_data is never passed
        assert!(!text.contains("userData"));
    }

    #[test]
    fn test_async_wrapper_aggregates_outs() {
        let f = fixture();
        let (text, _) = render(&f, "query_async");

        assert!(text.starts_with(
            "export function query(key: string): Promise<{ value: boolean; count: number }> {\n"
        ));
        assert!(text.contains("const count = createRef<number>(0);"));
        assert!(text.contains("resolve({ value: result, count: count.value });"));
        assert!(!text.contains("reject(new NativeError"));

        // the callback argument follows the key argument
        let key = text.find("value: key }").expect("no key arg");
        let callback = text.find("value: (_source").expect("no callback");
        assert!(key < callback);
    }

    #[test]
    fn test_async_wrapper_wraps_handles() {
        let f = fixture();
        let (text, ctx) = render(&f, "lookup_async");

        assert!(text.starts_with(
            "export function lookup(): Promise<{ value: Widget[]; best: Widget | null }> {\n"
        ));
        assert!(text.contains("const best = createRef<NativeHandle | null>(null);"));
        assert!(text.contains(
            "resolve({ value: ptr.map((item) => getNativeObject(item, Widget) as Widget), best: best.value === null ? null : getNativeObject(best.value, Widget) as Widget });"
        ));
        assert!(ctx.is_value_import("Widget"));
    }
}
