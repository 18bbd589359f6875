//! Namespace validation.
//!
//! This module checks a parsed namespace for the structural properties the
//! code generator relies on: type names are unique and the in-namespace
//! parent graph is a forest.

use crate::error::SchemaError;
use crate::types::{Namespace, split_qualified};
use std::collections::{HashMap, HashSet};

/// Validates a parsed namespace.
///
/// # Arguments
/// * `ns` - The namespace to validate
///
/// # Returns
/// Ok(()) if valid, or SchemaError describing the issue.
///
/// # Errors
/// Returns `SchemaError::DuplicateDefinition` if two types share a name and
/// `SchemaError::InheritanceCycle` if a class is its own ancestor.
pub fn validate_namespace(ns: &Namespace) -> Result<(), SchemaError> {
    validate_unique_names(ns)?;
    validate_enums(ns)?;
    validate_inheritance(ns)?;
    Ok(())
}

/// Validates that every type name in the namespace is unique.
fn validate_unique_names(ns: &Namespace) -> Result<(), SchemaError> {
    let mut seen = HashSet::new();

    let names = ns
        .classes
        .iter()
        .map(|c| ("class", c.name.as_str()))
        .chain(ns.interfaces.iter().map(|i| ("interface", i.name.as_str())))
        .chain(ns.records.iter().map(|r| ("record", r.name.as_str())))
        .chain(ns.enumerations.iter().map(|e| ("enumeration", e.name.as_str())))
        .chain(ns.bitfields.iter().map(|e| ("bitfield", e.name.as_str())))
        .chain(ns.callbacks.iter().map(|c| ("callback", c.name.as_str())))
        .chain(ns.aliases.iter().map(|a| ("alias", a.name.as_str())));

    for (kind, name) in names {
        if !seen.insert(name) {
            return Err(SchemaError::duplicate(kind, format!("{}.{}", ns.name, name)));
        }
    }

    let mut functions = HashSet::new();
    for function in &ns.functions {
        if !functions.insert(function.name.as_str()) {
            return Err(SchemaError::duplicate(
                "function",
                format!("{}.{}", ns.name, function.name),
            ));
        }
    }

    Ok(())
}

/// Validates enumeration and bitfield members.
fn validate_enums(ns: &Namespace) -> Result<(), SchemaError> {
    for enum_def in ns.all_enums() {
        let mut seen = HashSet::new();
        for member in &enum_def.members {
            if !seen.insert(member.name.as_str()) {
                return Err(SchemaError::Validation {
                    message: format!(
                        "Duplicate member name '{}' in enum '{}'",
                        member.name, enum_def.name
                    ),
                });
            }
        }
    }
    Ok(())
}

/// Validates that no class is its own in-namespace ancestor.
fn validate_inheritance(ns: &Namespace) -> Result<(), SchemaError> {
    let parents: HashMap<&str, &str> = ns
        .classes
        .iter()
        .filter_map(|c| {
            let parent = c.parent.as_deref()?;
            let parent = match split_qualified(parent) {
                Some((namespace, name)) if namespace == ns.name => name,
                Some(_) => return None,
                None => parent,
            };
            Some((c.name.as_str(), parent))
        })
        .collect();

    for class in &ns.classes {
        let mut path = vec![class.name.as_str()];
        let mut current = class.name.as_str();
        while let Some(&parent) = parents.get(current) {
            if path.contains(&parent) {
                path.push(parent);
                return Err(SchemaError::InheritanceCycle {
                    path: path.join(" -> "),
                });
            }
            path.push(parent);
            current = parent;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_namespace;

    #[test]
    fn test_validate_valid_namespace() {
        let xml = r#"<?xml version="1.0"?>
<repository version="1.2">
  <namespace name="Demo" version="1.0" shared-library="libdemo.so">
    <class name="Widget" parent="GObject.Object"/>
    <class name="Box" parent="Widget"/>
    <class name="Button" parent="Demo.Widget"/>
    <enumeration name="Align">
      <member name="start" value="0"/>
      <member name="end" value="1"/>
    </enumeration>
  </namespace>
</repository>"#;

        let ns = parse_namespace(xml).expect("Failed to parse");
        assert!(validate_namespace(&ns).is_ok());
    }

    #[test]
    fn test_validate_duplicate_type_name() {
        let xml = r#"<?xml version="1.0"?>
<repository version="1.2">
  <namespace name="Demo" version="1.0">
    <class name="Widget"/>
    <record name="Widget"/>
  </namespace>
</repository>"#;

        let ns = parse_namespace(xml).expect("Failed to parse");
        let result = validate_namespace(&ns);
        assert!(matches!(
            result,
            Err(SchemaError::DuplicateDefinition { ref kind, .. }) if kind == "record"
        ));
    }

    #[test]
    fn test_validate_inheritance_cycle() {
        let xml = r#"<?xml version="1.0"?>
<repository version="1.2">
  <namespace name="Demo" version="1.0">
    <class name="A" parent="C"/>
    <class name="B" parent="A"/>
    <class name="C" parent="Demo.B"/>
  </namespace>
</repository>"#;

        let ns = parse_namespace(xml).expect("Failed to parse");
        match validate_namespace(&ns) {
            Err(SchemaError::InheritanceCycle { path }) => {
                assert_eq!(path, "A -> C -> B -> A");
            }
            other => panic!("expected inheritance cycle, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_duplicate_enum_member() {
        let xml = r#"<?xml version="1.0"?>
<repository version="1.2">
  <namespace name="Demo" version="1.0">
    <bitfield name="Flags">
      <member name="a" value="1"/>
      <member name="a" value="2"/>
    </bitfield>
  </namespace>
</repository>"#;

        let ns = parse_namespace(xml).expect("Failed to parse");
        assert!(matches!(
            validate_namespace(&ns),
            Err(SchemaError::Validation { .. })
        ));
    }
}
