use std::path::Path;
use std::process;

use upline_core::{IssueKind, Snapshot};

use super::load_and_build;
use crate::input::ConfigArgs;
use crate::{or_exit, OutputFormat};

pub(crate) fn cmd_check(
    contacts: &Path,
    config: &ConfigArgs,
    strict: bool,
    output: OutputFormat,
    quiet: bool,
) {
    let (_, _, snapshot) = or_exit(load_and_build(contacts, config), output, quiet);
    let total = snapshot.issues.total();

    match output {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "issues": snapshot.issues.to_json(),
                "issue_count": total,
                "stats": snapshot.stats,
            });
            println!(
                "{}",
                serde_json::to_string_pretty(&json).unwrap_or_default()
            );
        }
        OutputFormat::Text => print_text(&snapshot, quiet),
    }

    if strict && total > 0 {
        process::exit(1);
    }
}

fn print_text(snapshot: &Snapshot, quiet: bool) {
    let s = &snapshot.stats;
    println!(
        "contacts: {}  roots: {}  resolved: {}  synthetic: {}",
        s.total_contacts, s.root_count, s.resolved_count, s.synthetic_count
    );
    if !quiet {
        println!(
            "active: {}  pending: {}  inactive: {}  vendor-flagged: {}  test candidates: {}  max depth: {}",
            s.active_count,
            s.pending_count,
            s.inactive_count,
            s.vendor_flagged_count,
            s.test_candidate_count,
            s.max_depth
        );
        if s.dropped_duplicate_ids > 0 {
            println!("dropped duplicate ids: {}", s.dropped_duplicate_ids);
        }
    }

    let total = snapshot.issues.total();
    if total == 0 {
        println!("no issues");
        return;
    }
    println!("issues: {}", total);
    for kind in IssueKind::ALL {
        let entries = snapshot.issues.for_kind(kind);
        if entries.is_empty() {
            continue;
        }
        println!("  {} ({})", kind.as_str(), entries.len());
        if quiet {
            continue;
        }
        for issue in entries {
            println!(
                "    - {} ({}): {}",
                issue.contact_id, issue.display_name, issue.message
            );
        }
    }
}
