use std::path::Path;

use upline_core::{emit, EmitOptions, Layout, SyntheticMode};

use super::load_and_build;
use crate::input::ConfigArgs;
use crate::{manifest, or_exit, LayoutArg, OutputFormat};

pub(crate) struct BuildOptions {
    pub(crate) layout: LayoutArg,
    pub(crate) flatten_synthetic: bool,
    pub(crate) omit_pipeline: bool,
    pub(crate) manifest: bool,
}

impl BuildOptions {
    fn emit_options(&self) -> EmitOptions {
        EmitOptions {
            layout: match self.layout {
                LayoutArg::Tree => Layout::Tree,
                LayoutArg::Flat => Layout::Flat,
            },
            synthetic: if self.flatten_synthetic {
                SyntheticMode::Flatten
            } else {
                SyntheticMode::Inline
            },
            omit_pipeline: self.omit_pipeline,
        }
    }
}

/// The snapshot is always printed as JSON; `--output` only affects errors.
pub(crate) fn cmd_build(
    contacts: &Path,
    config: &ConfigArgs,
    opts: BuildOptions,
    output: OutputFormat,
    quiet: bool,
) {
    let (_, _, snapshot) = or_exit(load_and_build(contacts, config), output, quiet);
    let value = emit(&snapshot, &opts.emit_options());
    let value = if opts.manifest {
        or_exit(
            manifest::build_manifest(value).map_err(|e| format!("serialization error: {}", e)),
            output,
            quiet,
        )
    } else {
        value
    };
    let pretty = serde_json::to_string_pretty(&value)
        .unwrap_or_else(|e| format!("serialization error: {}", e));
    println!("{}", pretty);
}
