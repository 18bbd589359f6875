//! girbind command line: GIR documents in, TypeScript modules out.
//!
//! Run with: `girbind Gtk-4.0.gir Gio-2.0.gir --output bindings --namespace Gtk`

use anyhow::{Context, Result};
use clap::Parser;
use girbind::{GeneratorConfig, Repository, generate_all, write_files};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "girbind", version, about = "Generate TypeScript bindings from GIR files")]
struct Cli {
    /// GIR files to load. Every file is used for type resolution.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output directory; one subdirectory per namespace.
    #[arg(short, long, default_value = "bindings")]
    output: PathBuf,

    /// Module the generated code imports its runtime from.
    #[arg(long)]
    runtime_module: Option<String>,

    /// Only generate these namespaces (repeatable).
    #[arg(short, long = "namespace", value_name = "NAME")]
    namespaces: Vec<String>,

    /// Skip formatting of the emitted code.
    #[arg(long)]
    no_format: bool,

    /// Generate namespaces one after another.
    #[arg(long)]
    sequential: bool,

    /// Enable debug logging.
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn config(&self) -> GeneratorConfig {
        let mut builder = GeneratorConfig::builder()
            .format_output(!self.no_format)
            .parallel(!self.sequential);
        if let Some(module) = &self.runtime_module {
            builder = builder.runtime_module(module);
        }
        builder.build()
    }
}

fn run(cli: &Cli) -> Result<()> {
    let repository = Repository::load(&cli.inputs).context("failed to load GIR files")?;
    info!("loaded {} namespaces", repository.len());

    let files = generate_all(&repository, &cli.config(), &cli.namespaces)
        .context("failed to generate bindings")?;
    write_files(&files, &cli.output)
        .with_context(|| format!("failed to write {}", cli.output.display()))?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_level.into()),
        )
        .init();

    run(&cli)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;
    use std::fs;

    const DEMO_GIR: &str = r#"<?xml version="1.0"?>
<repository version="1.2">
  <namespace name="Demo" version="1.0" shared-library="libdemo.so.1">
    <class name="Widget" glib:type-name="DemoWidget" glib:get-type="demo_widget_get_type">
      <method name="show" c:identifier="demo_widget_show"/>
    </class>
  </namespace>
</repository>"#;

    #[test]
    fn test_parse_args() {
        let cli = Cli::try_parse_from([
            "girbind",
            "Gtk-4.0.gir",
            "Gio-2.0.gir",
            "-o",
            "out",
            "--namespace",
            "Gtk",
            "--runtime-module",
            "./native.js",
            "--no-format",
            "--sequential",
        ])
        .expect("Failed to parse args");
        assert_eq!(cli.inputs.len(), 2);
        assert_eq!(cli.output, PathBuf::from("out"));
        assert_eq!(cli.namespaces, vec!["Gtk".to_string()]);

        let config = cli.config();
        assert_eq!(config.runtime_module, "./native.js");
        assert!(!config.format_output);
        assert!(!config.parallel);
    }

    #[test]
    fn test_inputs_required() {
        assert!(Cli::try_parse_from(["girbind"]).is_err());
    }

    #[test]
    fn test_run_writes_bindings() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let input = dir.path().join("Demo-1.0.gir");
        fs::write(&input, DEMO_GIR).expect("Failed to write input");
        let output = dir.path().join("out");

        let cli = Cli::try_parse_from([
            OsStr::new("girbind"),
            input.as_os_str(),
            OsStr::new("--output"),
            output.as_os_str(),
        ])
        .expect("Failed to parse args");
        run(&cli).expect("Failed to run");

        let widget =
            fs::read_to_string(output.join("demo/widget.ts")).expect("widget.ts missing");
        assert!(widget.contains("export class Widget {"));
        assert!(widget.contains("from \"@girbind/native\""));
        assert!(output.join("demo/index.ts").is_file());
    }

    #[test]
    fn test_run_missing_input() {
        let cli = Cli::try_parse_from(["girbind", "/nonexistent/Missing-1.0.gir"])
            .expect("Failed to parse args");
        let err = run(&cli).expect_err("missing file accepted");
        assert!(err.to_string().contains("failed to load GIR files"));
    }
}
