pub(crate) mod build;
pub(crate) mod check;
pub(crate) mod diff;
pub(crate) mod update;
pub(crate) mod validate;

use std::path::Path;

use upline_core::{ResolverConfig, Snapshot};

use crate::input::{self, ConfigArgs, ContactFile};

/// Load the contact file and config, then run the full pipeline.
pub(crate) fn load_and_build(
    contacts_path: &Path,
    args: &ConfigArgs,
) -> Result<(ContactFile, ResolverConfig, Snapshot), String> {
    let file = input::read_contacts(contacts_path)?;
    let config = input::load_config(args)?;
    let snapshot = upline_core::build_snapshot(&file.contacts, &config)
        .map_err(|e| format!("configuration error: {}", e))?;
    Ok((file, config, snapshot))
}
