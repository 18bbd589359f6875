//! Barrel unit re-exporting every module of a namespace.

/// Generator for `index.ts`.
#[derive(Debug, Default)]
pub struct IndexGenerator {
    modules: Vec<String>,
}

impl IndexGenerator {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a module stem; modules are re-exported in insertion order.
    pub fn add_module(&mut self, module: impl Into<String>) {
        self.modules.push(module.into());
    }

    /// Generates the unit body.
    #[must_use]
    pub fn generate(&self) -> String {
        self.modules
            .iter()
            .map(|module| format!("export * from \"./{module}.js\";\n"))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_index() {
        let mut index = IndexGenerator::new();
        assert_eq!(index.generate(), "");
        index.add_module("enums");
        index.add_module("widget");
        index.add_module("functions");
        assert_eq!(
            index.generate(),
            "export * from \"./enums.js\";\nexport * from \"./widget.js\";\nexport * from \"./functions.js\";\n"
        );
    }
}
