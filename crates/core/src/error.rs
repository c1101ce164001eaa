/// Configuration problems that stop a build before any pass runs.
///
/// Data-quality conditions in the contact list are never errors; they end
/// up as issue flags on the snapshot instead.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// `known_root_identifier` was not provided or is blank.
    #[error("known_root_identifier is required")]
    MissingKnownRootIdentifier,

    /// `known_root_identifier` contains no digits once normalized.
    #[error("known_root_identifier '{0}' contains no digits")]
    InvalidKnownRootIdentifier(String),

    /// `fallback_root_contact_id` was set to an empty string.
    #[error("fallback_root_contact_id must not be empty when set")]
    EmptyFallbackRootContactId,

    /// An id appears in both the test-candidate allowlist and blocklist.
    #[error("contact '{0}' is listed in both the test-candidate allowlist and blocklist")]
    ConflictingTestCandidateOverride(String),

    /// The test-name pattern is blank.
    #[error("test_candidates.name_pattern must not be blank")]
    InvalidTestNamePattern,
}

/// Errors from the upline mutation entry point.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UpdateError {
    #[error("contact not found: {0}")]
    UnknownContact(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
