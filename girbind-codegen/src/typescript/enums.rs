//! Enumerations unit: every enumeration and bitfield of a namespace as a
//! numeric TypeScript enum.

use super::{INDENT, render_doc};
use girbind_core::naming::transformed_type_name;
use girbind_schema::{EnumDef, Namespace};
use std::collections::HashSet;

/// Generator for the `enums` unit.
pub struct EnumGenerator<'a> {
    ns: &'a Namespace,
}

impl<'a> EnumGenerator<'a> {
    /// Creates a new enum generator.
    #[must_use]
    pub fn new(ns: &'a Namespace) -> Self {
        Self { ns }
    }

    /// Returns true if the namespace declares no enumerations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ns.all_enums().next().is_none()
    }

    /// Generates the unit body.
    #[must_use]
    pub fn generate(&self) -> String {
        let mut output = String::new();
        for (i, enum_def) in self.ns.all_enums().enumerate() {
            if i > 0 {
                output.push('\n');
            }
            output.push_str(&self.generate_enum(enum_def));
        }
        output
    }

    fn generate_enum(&self, enum_def: &EnumDef) -> String {
        let name = transformed_type_name(&self.ns.name, &enum_def.name);
        let mut output = render_doc(enum_def.doc.as_deref(), "");
        output.push_str(&format!("export enum {name} {{\n"));

        let mut seen = HashSet::new();
        for member in &enum_def.members {
            let mut member_name = enum_member_name(&member.name);
            while !seen.insert(member_name.clone()) {
                member_name.push('_');
            }
            output.push_str(&format!("{INDENT}{member_name} = {},\n", member.value));
        }

        output.push_str("}\n");
        output
    }
}

/// Converts a member name to an enum key: upper case, `_`-prefixed when it
/// starts with a digit.
#[must_use]
pub fn enum_member_name(name: &str) -> String {
    let upper: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    if upper.is_empty() || upper.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{upper}")
    } else {
        upper
    }
}
