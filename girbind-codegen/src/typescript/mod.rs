//! TypeScript emission modules.
//!
//! Each unit generator renders the body of one output file into a
//! [`UnitContext`](crate::context::UnitContext); the namespace generator
//! prepends the header and the import block.

pub mod callables;
pub mod classes;
pub mod enums;
pub mod functions;
pub mod index;
pub mod interfaces;
pub mod records;
pub mod signals;

pub use callables::{CallEnv, Receiver};
pub use classes::ClassGenerator;
pub use enums::EnumGenerator;
pub use functions::FunctionGenerator;
pub use index::IndexGenerator;
pub use interfaces::InterfaceGenerator;
pub use records::RecordGenerator;
pub use signals::SignalGenerator;

/// One level of indentation.
pub const INDENT: &str = "    ";

/// Renders the header comment of a generated file.
#[must_use]
pub fn file_header(namespace: &str, version: &str) -> String {
    format!("// Generated by girbind from {namespace}-{version}. Do not edit.\n\n")
}

/// Renders a JSDoc block, or nothing when there is no documentation.
#[must_use]
pub fn render_doc(doc: Option<&str>, indent: &str) -> String {
    let Some(doc) = doc.map(str::trim).filter(|d| !d.is_empty()) else {
        return String::new();
    };

    let mut output = format!("{indent}/**\n");
    for line in doc.lines() {
        let line = line.trim_end().replace("*/", "*\\/");
        if line.is_empty() {
            output.push_str(&format!("{indent} *\n"));
        } else {
            output.push_str(&format!("{indent} * {line}\n"));
        }
    }
    output.push_str(&format!("{indent} */\n"));
    output
}
