use std::path::Path;

use tracing::info;
use upline_core::{emit, update_upline, EmitOptions, UplineField};

use crate::input::{self, ConfigArgs, ContactFile};
use crate::{or_exit, OutputFormat};

pub(crate) struct UpdateRequest<'a> {
    pub(crate) contact: &'a str,
    pub(crate) field: UplineField,
    /// Raw value; blank clears the reference.
    pub(crate) value: &'a str,
    pub(crate) write: bool,
}

pub(crate) fn cmd_update(
    contacts_path: &Path,
    config: &ConfigArgs,
    req: UpdateRequest<'_>,
    output: OutputFormat,
    quiet: bool,
) {
    let file = or_exit(input::read_contacts(contacts_path), output, quiet);
    let cfg = or_exit(input::load_config(config), output, quiet);

    let value = Some(req.value).filter(|v| !v.trim().is_empty());
    let (updated, snapshot) = or_exit(
        update_upline(&file.contacts, req.contact, req.field, value, &cfg)
            .map_err(|e| format!("update failed: {}", e)),
        output,
        quiet,
    );

    if req.write {
        let rewritten = ContactFile {
            contacts: updated,
            wrapped: file.wrapped,
        };
        or_exit(input::write_contacts(contacts_path, &rewritten), output, quiet);
        info!(path = %contacts_path.display(), "contact file rewritten");
    }

    let value = emit(&snapshot, &EmitOptions::default());
    let pretty = serde_json::to_string_pretty(&value)
        .unwrap_or_else(|e| format!("serialization error: {}", e));
    println!("{}", pretty);
}
