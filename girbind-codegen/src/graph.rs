//! Inheritance graph of one namespace.
//!
//! Provides the topological emission order (parents before children) and
//! the return-type cycle check that decides when a class reference must
//! stay a type-only import.

use girbind_core::naming::transformed_type_name;
use girbind_schema::{ClassDef, Namespace, TypeRef, split_qualified};
use std::collections::{HashMap, HashSet};

/// Parent relation between the classes of one namespace.
#[derive(Debug, Clone)]
pub struct ClassGraph<'a> {
    ns: &'a Namespace,
    classes: HashMap<&'a str, &'a ClassDef>,
}

impl<'a> ClassGraph<'a> {
    /// Builds the graph of `ns`.
    #[must_use]
    pub fn new(ns: &'a Namespace) -> Self {
        let classes = ns.classes.iter().map(|c| (c.name.as_str(), c)).collect();
        Self { ns, classes }
    }

    /// Looks up a class of this namespace by bare or dotted name.
    #[must_use]
    pub fn class(&self, name: &str) -> Option<&'a ClassDef> {
        self.local_name(name)
            .and_then(|bare| self.classes.get(bare).copied())
    }

    /// Returns the bare name if `name` refers to this namespace.
    fn local_name<'n>(&self, name: &'n str) -> Option<&'n str> {
        match split_qualified(name) {
            Some((namespace, bare)) if namespace == self.ns.name => Some(bare),
            Some(_) => None,
            None => Some(name),
        }
    }

    /// Returns the parent of `class` if it lives in this namespace.
    #[must_use]
    pub fn local_parent(&self, class: &ClassDef) -> Option<&'a ClassDef> {
        class.parent.as_deref().and_then(|parent| self.class(parent))
    }

    /// Returns true if `class` has a parent outside this namespace.
    #[must_use]
    pub fn has_external_parent(&self, class: &ClassDef) -> bool {
        class
            .parent
            .as_deref()
            .is_some_and(|parent| self.class(parent).is_none())
    }

    /// Returns the in-namespace ancestors of `class`, nearest first.
    #[must_use]
    pub fn ancestors(&self, class: &ClassDef) -> Vec<&'a ClassDef> {
        let mut chain: Vec<&'a ClassDef> = Vec::new();
        let mut current = self.local_parent(class);
        while let Some(parent) = current {
            if parent.name == class.name || chain.iter().any(|c| c.name == parent.name) {
                break;
            }
            chain.push(parent);
            current = self.local_parent(parent);
        }
        chain
    }

    /// Returns the first ancestor outside this namespace, as written in the
    /// schema, if the chain reaches one.
    #[must_use]
    pub fn external_root(&self, class: &'a ClassDef) -> Option<&'a str> {
        let top = self.ancestors(class).last().copied().unwrap_or(class);
        let top_parent = top.parent.as_deref();
        top_parent.filter(|parent| self.class(parent).is_none())
    }

    /// Returns every class with parents ordered before children.
    ///
    /// Depth-first: visiting a class first visits its in-namespace parent.
    /// Declaration order is kept among unrelated classes.
    #[must_use]
    pub fn topological_order(&self) -> Vec<&'a ClassDef> {
        let mut order = Vec::with_capacity(self.ns.classes.len());
        let mut visited = HashSet::new();
        for class in &self.ns.classes {
            self.visit(class, &mut visited, &mut order);
        }
        order
    }

    fn visit(
        &self,
        class: &'a ClassDef,
        visited: &mut HashSet<&'a str>,
        order: &mut Vec<&'a ClassDef>,
    ) {
        if !visited.insert(class.name.as_str()) {
            return;
        }
        if let Some(parent) = self.local_parent(class) {
            self.visit(parent, visited, order);
        }
        order.push(class);
    }

    /// Returns true if `descendant` inherits, directly or not, from `ancestor`.
    #[must_use]
    pub fn is_descendant(&self, descendant: &ClassDef, ancestor: &ClassDef) -> bool {
        self.ancestors(descendant)
            .iter()
            .any(|a| a.name == ancestor.name)
    }

    /// Returns true if wrapping a `returned` value inside `class` would
    /// create a circular runtime import.
    ///
    /// That is the case when `returned` is `class` itself, descends from it,
    /// or when `returned` or one of its ancestors refers back to `class`
    /// through a method or function return type or a property type.
    #[must_use]
    pub fn has_return_cycle(&self, class: &ClassDef, returned: &ClassDef) -> bool {
        if returned.name == class.name || self.is_descendant(returned, class) {
            return true;
        }
        std::iter::once(returned)
            .chain(self.ancestors(returned))
            .any(|owner| self.refers_to(owner, class))
    }

    fn refers_to(&self, owner: &ClassDef, target: &ClassDef) -> bool {
        let names = |t: &TypeRef| self.local_name(&t.name) == Some(target.name.as_str());
        owner
            .methods
            .iter()
            .chain(&owner.static_functions)
            .any(|m| names(&m.return_type))
            || owner.properties.iter().any(|p| names(&p.type_ref))
    }

    /// Returns the generated names of classes returned by `class`'s methods
    /// and functions that must be emitted as casts.
    #[must_use]
    pub fn cyclic_returns(&self, class: &ClassDef) -> HashSet<String> {
        class
            .methods
            .iter()
            .chain(&class.static_functions)
            .chain(&class.constructors)
            .filter_map(|m| self.class(&m.return_type.name))
            .filter(|returned| self.has_return_cycle(class, returned))
            .map(|returned| transformed_type_name(&self.ns.name, &returned.name))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use girbind_schema::{CallableDef, PropertyDef};

    fn class(name: &str, parent: Option<&str>) -> ClassDef {
        let mut class = ClassDef::new(name);
        class.parent = parent.map(String::from);
        class
    }

    fn returning(name: &str, ty: &str) -> CallableDef {
        let mut method = CallableDef::new(name, format!("demo_{name}"));
        method.return_type = TypeRef::named(ty);
        method
    }

    fn namespace(classes: Vec<ClassDef>) -> Namespace {
        let mut ns = Namespace::new("Demo", "1.0");
        ns.classes = classes;
        ns
    }

    #[test]
    fn test_topological_order_parents_first() {
        let ns = namespace(vec![
            class("Button", Some("Widget")),
            class("ToggleButton", Some("Demo.Button")),
            class("Widget", Some("GObject.InitiallyUnowned")),
            class("Label", Some("Widget")),
        ]);
        let graph = ClassGraph::new(&ns);
        let order: Vec<&str> = graph
            .topological_order()
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(order, vec!["Widget", "Button", "ToggleButton", "Label"]);

        for class in graph.topological_order() {
            if let Some(parent) = graph.local_parent(class) {
                let parent_pos = order.iter().position(|n| *n == parent.name);
                let class_pos = order.iter().position(|n| *n == class.name);
                assert!(parent_pos < class_pos);
            }
        }
    }

    #[test]
    fn test_topological_order_tolerates_cycles() {
        let ns = namespace(vec![class("A", Some("B")), class("B", Some("A"))]);
        let graph = ClassGraph::new(&ns);
        assert_eq!(graph.topological_order().len(), 2);
        assert_eq!(graph.ancestors(&ns.classes[0]).len(), 1);
    }

    #[test]
    fn test_ancestors_and_external_root() {
        let ns = namespace(vec![
            class("Widget", Some("GObject.InitiallyUnowned")),
            class("Button", Some("Widget")),
            class("Root", None),
        ]);
        let graph = ClassGraph::new(&ns);
        let button = &ns.classes[1];

        let names: Vec<&str> = graph.ancestors(button).iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Widget"]);
        assert!(graph.is_descendant(button, &ns.classes[0]));
        assert_eq!(graph.external_root(button), Some("GObject.InitiallyUnowned"));
        assert_eq!(graph.external_root(&ns.classes[0]), Some("GObject.InitiallyUnowned"));
        assert_eq!(graph.external_root(&ns.classes[2]), None);
        assert!(graph.has_external_parent(&ns.classes[0]));
        assert!(!graph.has_external_parent(button));
    }

    #[test]
    fn test_self_return_is_cycle() {
        let mut widget = class("Widget", None);
        widget.methods.push(returning("get_child", "Widget"));
        let ns = namespace(vec![widget]);
        let graph = ClassGraph::new(&ns);

        let cycles = graph.cyclic_returns(&ns.classes[0]);
        assert!(cycles.contains("Widget"));
    }

    #[test]
    fn test_descendant_return_is_cycle() {
        let mut widget = class("Widget", None);
        widget.methods.push(returning("get_root", "Window"));
        let ns = namespace(vec![widget, class("Window", Some("Widget"))]);
        let graph = ClassGraph::new(&ns);

        assert!(graph.has_return_cycle(&ns.classes[0], &ns.classes[1]));
    }

    #[test]
    fn test_back_reference_through_ancestor() {
        // Editor returns Buffer; Buffer's parent Base returns Editor.
        let mut editor = class("Editor", None);
        editor.methods.push(returning("get_buffer", "Buffer"));
        let mut base = class("Base", None);
        base.static_functions.push(returning("default_editor", "Editor"));
        let ns = namespace(vec![editor, base, class("Buffer", Some("Base"))]);
        let graph = ClassGraph::new(&ns);

        assert!(graph.has_return_cycle(&ns.classes[0], &ns.classes[2]));
    }

    #[test]
    fn test_back_reference_through_property() {
        let mut view = class("View", None);
        view.methods.push(returning("get_model", "Model"));
        let mut model = class("Model", None);
        model.properties.push(PropertyDef {
            name: "view".to_string(),
            type_ref: TypeRef::named("Demo.View"),
            readable: true,
            writable: true,
            construct_only: false,
        });
        let ns = namespace(vec![view, model]);
        let graph = ClassGraph::new(&ns);

        assert!(graph.has_return_cycle(&ns.classes[0], &ns.classes[1]));
    }

    #[test]
    fn test_unrelated_return_is_not_cycle() {
        let mut window = class("Window", None);
        window.methods.push(returning("get_title_widget", "Label"));
        let ns = namespace(vec![window, class("Label", None)]);
        let graph = ClassGraph::new(&ns);

        assert!(graph.cyclic_returns(&ns.classes[0]).is_empty());
    }
}
