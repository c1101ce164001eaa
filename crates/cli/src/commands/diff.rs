use std::path::Path;

use upline_core::{build_snapshot, diff_snapshots, SnapshotDiff};

use crate::input::{self, ConfigArgs};
use crate::{or_exit, OutputFormat};

pub(crate) fn cmd_diff(
    before_path: &Path,
    after_path: &Path,
    config: &ConfigArgs,
    output: OutputFormat,
    quiet: bool,
) {
    let cfg = or_exit(input::load_config(config), output, quiet);
    let build = |path: &Path| {
        let file = input::read_contacts(path)?;
        build_snapshot(&file.contacts, &cfg).map_err(|e| format!("configuration error: {}", e))
    };
    let before = or_exit(build(before_path), output, quiet);
    let after = or_exit(build(after_path), output, quiet);
    let diff = diff_snapshots(&before, &after);

    match output {
        OutputFormat::Json => {
            let json = serde_json::to_value(&diff).unwrap_or_default();
            println!(
                "{}",
                serde_json::to_string_pretty(&json).unwrap_or_default()
            );
        }
        OutputFormat::Text => print_text(&diff),
    }
}

fn print_text(diff: &SnapshotDiff) {
    if diff.is_empty() {
        println!("no changes");
        return;
    }
    if !diff.added.is_empty() {
        println!("added: {}", diff.added.join(", "));
    }
    if !diff.removed.is_empty() {
        println!("removed: {}", diff.removed.join(", "));
    }
    if !diff.reparented.is_empty() {
        println!("reparented:");
        for r in &diff.reparented {
            println!(
                "  {}: {} ({}) -> {} ({})",
                r.id,
                r.before_parent.as_deref().unwrap_or("<root>"),
                r.before_source.as_str(),
                r.after_parent.as_deref().unwrap_or("<root>"),
                r.after_source.as_str()
            );
        }
    }
    let changed: Vec<String> = diff
        .issue_changes
        .iter()
        .filter(|(_, d)| **d != 0)
        .map(|(kind, d)| format!("{}: {:+}", kind, d))
        .collect();
    if !changed.is_empty() {
        println!("issue changes: {}", changed.join(", "));
    }
}
