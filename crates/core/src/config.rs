//! Resolver configuration.
//!
//! Loaded from TOML by the CLI; every field except
//! `known_root_identifier` has a default. [`ResolverConfig::validate`]
//! must pass before a build starts.

use crate::error::ConfigError;
use crate::pass1_normalize::normalize_identifier;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Heuristics and overrides for spotting sandbox/test contacts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TestCandidateConfig {
    /// Ids never treated as test data, whatever the heuristics say.
    pub id_allowlist: BTreeSet<String>,
    /// Ids always treated as test data.
    pub id_blocklist: BTreeSet<String>,
    /// Case-insensitive substring matched against the display name.
    pub name_pattern: Option<String>,
    /// Licensing-state values that only sandbox records carry.
    pub licensing_state_sentinels: Vec<String>,
}

impl Default for TestCandidateConfig {
    fn default() -> Self {
        TestCandidateConfig {
            id_allowlist: BTreeSet::new(),
            id_blocklist: BTreeSet::new(),
            name_pattern: Some(default_name_pattern()),
            licensing_state_sentinels: Vec::new(),
        }
    }
}

fn default_name_pattern() -> String {
    "test".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ResolverConfig {
    pub fallback_root_contact_id: Option<String>,
    pub fallback_root_email: Option<String>,
    /// Identifier treated as the top of the org for root-duplicate handling.
    pub known_root_identifier: Option<String>,
    pub exclude_test_candidates: bool,
    /// Attach unmatched upline references under a `missing:` placeholder
    /// node instead of leaving the contact parentless.
    pub placeholder_for_unresolved: bool,
    pub test_candidates: TestCandidateConfig,
}

impl ResolverConfig {
    pub fn new(known_root_identifier: impl Into<String>) -> Self {
        ResolverConfig {
            known_root_identifier: Some(known_root_identifier.into()),
            ..ResolverConfig::default()
        }
    }

    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let raw = self
            .known_root_identifier
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::MissingKnownRootIdentifier)?;
        if normalize_identifier(Some(raw)).is_none() {
            return Err(ConfigError::InvalidKnownRootIdentifier(raw.to_string()));
        }

        if let Some(id) = &self.fallback_root_contact_id {
            if id.trim().is_empty() {
                return Err(ConfigError::EmptyFallbackRootContactId);
            }
        }

        let tc = &self.test_candidates;
        if let Some(id) = tc.id_allowlist.intersection(&tc.id_blocklist).next() {
            return Err(ConfigError::ConflictingTestCandidateOverride(id.clone()));
        }
        if let Some(pattern) = &tc.name_pattern {
            if pattern.trim().is_empty() {
                return Err(ConfigError::InvalidTestNamePattern);
            }
        }
        Ok(())
    }

    /// Normalized known-root identifier. Only meaningful after `validate`.
    pub fn known_root_key(&self) -> Option<String> {
        normalize_identifier(self.known_root_identifier.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_root_is_required() {
        let err = ResolverConfig::default().validate().unwrap_err();
        assert_eq!(err, ConfigError::MissingKnownRootIdentifier);

        let blank = ResolverConfig::new("   ");
        assert_eq!(
            blank.validate().unwrap_err(),
            ConfigError::MissingKnownRootIdentifier
        );
    }

    #[test]
    fn known_root_needs_digits() {
        let err = ResolverConfig::new("ROOT").validate().unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidKnownRootIdentifier("ROOT".to_string())
        );
        assert!(ResolverConfig::new("NPN 100").validate().is_ok());
        assert_eq!(
            ResolverConfig::new("NPN 100").known_root_key().as_deref(),
            Some("100")
        );
    }

    #[test]
    fn overlapping_overrides_are_rejected() {
        let mut cfg = ResolverConfig::new("1");
        cfg.test_candidates.id_allowlist.insert("c9".to_string());
        cfg.test_candidates.id_blocklist.insert("c9".to_string());
        assert_eq!(
            cfg.validate().unwrap_err(),
            ConfigError::ConflictingTestCandidateOverride("c9".to_string())
        );
    }

    #[test]
    fn blank_pattern_and_fallback_rejected() {
        let mut cfg = ResolverConfig::new("1");
        cfg.test_candidates.name_pattern = Some(" ".to_string());
        assert_eq!(cfg.validate().unwrap_err(), ConfigError::InvalidTestNamePattern);

        let mut cfg = ResolverConfig::new("1");
        cfg.fallback_root_contact_id = Some(String::new());
        assert_eq!(
            cfg.validate().unwrap_err(),
            ConfigError::EmptyFallbackRootContactId
        );
    }

    #[test]
    fn parses_from_toml() {
        let cfg: ResolverConfig = toml::from_str(
            r#"
            known_root_identifier = "555"
            exclude_test_candidates = true

            [test_candidates]
            id_blocklist = ["sandbox-1"]
            licensing_state_sentinels = ["ZZ"]
            "#,
        )
        .unwrap();
        assert!(cfg.validate().is_ok());
        assert!(cfg.exclude_test_candidates);
        assert_eq!(cfg.test_candidates.name_pattern.as_deref(), Some("test"));
        assert!(cfg.test_candidates.id_blocklist.contains("sandbox-1"));
        assert!(!cfg.placeholder_for_unresolved);
    }
}
