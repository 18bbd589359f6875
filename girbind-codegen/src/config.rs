//! Generator configuration.

/// Default module the generated code imports its runtime from.
pub const DEFAULT_RUNTIME_MODULE: &str = "@girbind/native";
/// Default GObject shared library.
pub const DEFAULT_GOBJECT_LIBRARY: &str = "libgobject-2.0.so.0";
/// Default GLib shared library.
pub const DEFAULT_GLIB_LIBRARY: &str = "libglib-2.0.so.0";

/// Settings shared by every namespace of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    /// Module specifier for the runtime imports.
    pub runtime_module: String,
    /// Library used for `g_object_new`.
    pub gobject_library: String,
    /// Library used for GLib helpers.
    pub glib_library: String,
    /// Whether emitted text is run through the formatter.
    pub format_output: bool,
    /// Whether namespaces are generated in parallel.
    pub parallel: bool,
}

impl GeneratorConfig {
    /// Returns a builder with default settings.
    #[must_use]
    pub fn builder() -> GeneratorConfigBuilder {
        GeneratorConfigBuilder::new()
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfigBuilder::new().build()
    }
}

/// Builder for [`GeneratorConfig`].
#[derive(Debug, Clone)]
pub struct GeneratorConfigBuilder {
    runtime_module: String,
    gobject_library: String,
    glib_library: String,
    format_output: bool,
    parallel: bool,
}

impl GeneratorConfigBuilder {
    /// Creates a new builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            runtime_module: DEFAULT_RUNTIME_MODULE.to_string(),
            gobject_library: DEFAULT_GOBJECT_LIBRARY.to_string(),
            glib_library: DEFAULT_GLIB_LIBRARY.to_string(),
            format_output: true,
            parallel: true,
        }
    }

    /// Sets the runtime module specifier.
    #[must_use]
    pub fn runtime_module(mut self, module: impl Into<String>) -> Self {
        self.runtime_module = module.into();
        self
    }

    /// Sets the GObject library name.
    #[must_use]
    pub fn gobject_library(mut self, library: impl Into<String>) -> Self {
        self.gobject_library = library.into();
        self
    }

    /// Sets the GLib library name.
    #[must_use]
    pub fn glib_library(mut self, library: impl Into<String>) -> Self {
        self.glib_library = library.into();
        self
    }

    /// Enables or disables output formatting.
    #[must_use]
    pub fn format_output(mut self, enabled: bool) -> Self {
        self.format_output = enabled;
        self
    }

    /// Enables or disables parallel namespace generation.
    #[must_use]
    pub fn parallel(mut self, enabled: bool) -> Self {
        self.parallel = enabled;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> GeneratorConfig {
        GeneratorConfig {
            runtime_module: self.runtime_module,
            gobject_library: self.gobject_library,
            glib_library: self.glib_library,
            format_output: self.format_output,
            parallel: self.parallel,
        }
    }
}

impl Default for GeneratorConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
