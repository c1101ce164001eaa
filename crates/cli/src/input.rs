//! Contact-file and resolver-config loading shared by every subcommand.

use std::path::{Path, PathBuf};

use clap::Args;
use serde_json::Value;
use upline_core::{ContactRecord, ResolverConfig};

/// Resolver settings: an optional TOML file plus flag/env overrides.
#[derive(Args, Debug, Clone, Default)]
pub(crate) struct ConfigArgs {
    /// Resolver settings file (TOML)
    #[arg(long)]
    pub(crate) config: Option<PathBuf>,
    /// Identifier treated as the top of the org (overrides the config file)
    #[arg(long, env = "UPLINE_KNOWN_ROOT")]
    pub(crate) known_root: Option<String>,
    /// Contact id used as the fallback root
    #[arg(long, env = "UPLINE_FALLBACK_ROOT")]
    pub(crate) fallback_root: Option<String>,
    /// Email of the fallback root contact
    #[arg(long)]
    pub(crate) fallback_root_email: Option<String>,
    /// Never pick test-like contacts as parents
    #[arg(long)]
    pub(crate) exclude_test_candidates: bool,
}

/// Read the TOML file (if any) and apply overrides. Validation is left to
/// the pipeline so the error comes back as a `ConfigError`.
pub(crate) fn load_config(args: &ConfigArgs) -> Result<ResolverConfig, String> {
    let mut config = match &args.config {
        Some(path) => {
            let src = std::fs::read_to_string(path)
                .map_err(|e| format!("error reading config '{}': {}", path.display(), e))?;
            toml::from_str::<ResolverConfig>(&src)
                .map_err(|e| format!("error parsing config '{}': {}", path.display(), e))?
        }
        None => ResolverConfig::default(),
    };

    if let Some(id) = &args.known_root {
        config.known_root_identifier = Some(id.clone());
    }
    if let Some(id) = &args.fallback_root {
        config.fallback_root_contact_id = Some(id.clone());
    }
    if let Some(email) = &args.fallback_root_email {
        config.fallback_root_email = Some(email.clone());
    }
    if args.exclude_test_candidates {
        config.exclude_test_candidates = true;
    }
    Ok(config)
}

/// A loaded contact file. `wrapped` remembers whether the records sat
/// under a `contacts` key so a rewrite keeps the same shape.
#[derive(Debug, Clone)]
pub(crate) struct ContactFile {
    pub(crate) contacts: Vec<ContactRecord>,
    pub(crate) wrapped: bool,
}

/// Accept either a bare array or `{"contacts": [...]}`.
pub(crate) fn parse_contacts(value: Value) -> Result<ContactFile, String> {
    let (list, wrapped) = match value {
        Value::Array(_) => (value, false),
        Value::Object(mut map) => match map.remove("contacts") {
            Some(list) => (list, true),
            None => return Err("expected an array or an object with a 'contacts' array".into()),
        },
        _ => return Err("expected an array or an object with a 'contacts' array".into()),
    };
    let contacts = serde_json::from_value(list).map_err(|e| format!("invalid contact: {}", e))?;
    Ok(ContactFile { contacts, wrapped })
}

pub(crate) fn read_json(path: &Path) -> Result<Value, String> {
    let src = std::fs::read_to_string(path)
        .map_err(|e| format!("error reading file '{}': {}", path.display(), e))?;
    serde_json::from_str(&src)
        .map_err(|e| format!("error parsing JSON in '{}': {}", path.display(), e))
}

pub(crate) fn read_contacts(path: &Path) -> Result<ContactFile, String> {
    parse_contacts(read_json(path)?).map_err(|e| format!("{}: {}", path.display(), e))
}

pub(crate) fn write_contacts(path: &Path, file: &ContactFile) -> Result<(), String> {
    let value = if file.wrapped {
        serde_json::json!({ "contacts": file.contacts })
    } else {
        serde_json::json!(file.contacts)
    };
    let pretty = serde_json::to_string_pretty(&value)
        .map_err(|e| format!("serialization error: {}", e))?;
    std::fs::write(path, pretty + "\n")
        .map_err(|e| format!("error writing '{}': {}", path.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_file_shapes_parse() {
        let bare = parse_contacts(serde_json::json!([{ "id": "a" }])).unwrap();
        assert!(!bare.wrapped);
        assert_eq!(bare.contacts[0].id, "a");

        let wrapped = parse_contacts(serde_json::json!({ "contacts": [{ "id": "b" }] })).unwrap();
        assert!(wrapped.wrapped);
        assert_eq!(wrapped.contacts[0].id, "b");

        assert!(parse_contacts(serde_json::json!({ "people": [] })).is_err());
        assert!(parse_contacts(serde_json::json!("a")).is_err());
    }

    #[test]
    fn flags_override_file_values() {
        let args = ConfigArgs {
            known_root: Some("77".into()),
            fallback_root: Some("hq".into()),
            exclude_test_candidates: true,
            ..ConfigArgs::default()
        };
        let cfg = load_config(&args).unwrap();
        assert_eq!(cfg.known_root_identifier.as_deref(), Some("77"));
        assert_eq!(cfg.fallback_root_contact_id.as_deref(), Some("hq"));
        assert!(cfg.exclude_test_candidates);
        assert!(cfg.validate().is_ok());
    }
}
