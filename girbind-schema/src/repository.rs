//! The all-namespaces index.
//!
//! A [`Repository`] holds every namespace of one compilation run. It is
//! built once, before any generation starts, and is read-only afterwards.
//! Parent and interface references are name strings; the repository
//! resolves them across namespace boundaries.

use crate::error::{ParseError, SchemaError};
use crate::parser::parse_namespace;
use crate::types::{ClassDef, InterfaceDef, Namespace, split_qualified};
use crate::validation::validate_namespace;
use std::collections::HashMap;
use std::path::Path;

/// Read-only index of parsed namespaces.
#[derive(Debug, Clone, Default)]
pub struct Repository {
    namespaces: Vec<Namespace>,
    index: HashMap<String, usize>,
}

impl Repository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a repository from parsed namespaces.
    ///
    /// # Errors
    /// Returns `SchemaError::DuplicateNamespace` if two namespaces share a
    /// name.
    pub fn from_namespaces(namespaces: Vec<Namespace>) -> Result<Self, SchemaError> {
        let mut repo = Self::new();
        for ns in namespaces {
            repo.add(ns)?;
        }
        Ok(repo)
    }

    /// Parses, validates and indexes every GIR file in `paths`.
    ///
    /// # Errors
    /// Returns `SchemaError` if a file cannot be read, parsed or validated.
    pub fn load<P: AsRef<Path>>(paths: &[P]) -> Result<Self, SchemaError> {
        let mut repo = Self::new();
        for path in paths {
            let path = path.as_ref();
            let xml = std::fs::read_to_string(path).map_err(ParseError::Io)?;
            let ns = parse_namespace(&xml)?;
            validate_namespace(&ns)?;
            tracing::debug!(
                "parsed namespace {}-{} from {}",
                ns.name,
                ns.version,
                path.display()
            );
            repo.add(ns)?;
        }
        tracing::info!("loaded {} namespaces", repo.len());
        Ok(repo)
    }

    /// Adds a namespace.
    ///
    /// # Errors
    /// Returns `SchemaError::DuplicateNamespace` if the name is taken.
    pub fn add(&mut self, ns: Namespace) -> Result<(), SchemaError> {
        if self.index.contains_key(&ns.name) {
            return Err(SchemaError::DuplicateNamespace { name: ns.name });
        }
        self.index.insert(ns.name.clone(), self.namespaces.len());
        self.namespaces.push(ns);
        Ok(())
    }

    /// Looks up a namespace by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Namespace> {
        self.index.get(name).map(|&i| &self.namespaces[i])
    }

    /// Returns all namespaces in load order.
    #[must_use]
    pub fn namespaces(&self) -> &[Namespace] {
        &self.namespaces
    }

    /// Returns the number of namespaces.
    #[must_use]
    pub fn len(&self) -> usize {
        self.namespaces.len()
    }

    /// Returns true if no namespace has been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.namespaces.is_empty()
    }

    /// Resolves a possibly dotted class reference made from `current`.
    #[must_use]
    pub fn find_class<'a>(
        &'a self,
        name: &str,
        current: &str,
    ) -> Option<(&'a Namespace, &'a ClassDef)> {
        let (ns_name, bare) = split_qualified(name).unwrap_or((current, name));
        let ns = self.get(ns_name)?;
        ns.class(bare).map(|class| (ns, class))
    }

    /// Resolves a possibly dotted interface reference made from `current`.
    #[must_use]
    pub fn find_interface<'a>(
        &'a self,
        name: &str,
        current: &str,
    ) -> Option<(&'a Namespace, &'a InterfaceDef)> {
        let (ns_name, bare) = split_qualified(name).unwrap_or((current, name));
        let ns = self.get(ns_name)?;
        ns.interface(bare).map(|iface| (ns, iface))
    }

    /// Returns the ancestors of `class`, nearest first, crossing namespace
    /// boundaries. Parents that are not loaded end the chain.
    #[must_use]
    pub fn ancestors<'a>(
        &'a self,
        ns: &'a Namespace,
        class: &'a ClassDef,
    ) -> Vec<(&'a Namespace, &'a ClassDef)> {
        let mut chain: Vec<(&Namespace, &ClassDef)> = Vec::new();
        let mut current_ns = ns;
        let mut current = class;

        while let Some(parent) = current.parent.as_deref() {
            let Some((parent_ns, parent_class)) = self.find_class(parent, &current_ns.name) else {
                break;
            };
            let seen = chain
                .iter()
                .any(|(n, c)| n.name == parent_ns.name && c.name == parent_class.name);
            if seen || (parent_ns.name == ns.name && parent_class.name == class.name) {
                break;
            }
            chain.push((parent_ns, parent_class));
            current_ns = parent_ns;
            current = parent_class;
        }

        chain
    }
}
