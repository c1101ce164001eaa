//! upline-core: upline hierarchy resolution engine.
//!
//! Turns a flat list of CRM contact records into a forest where every
//! contact has at most one parent (its upline), along with an issues
//! report and aggregate stats.
//!
//! # Public API
//!
//! Key types are re-exported at the crate root:
//!
//! - [`build_snapshot()`] -- run the full seven-pass pipeline
//! - [`update_upline()`] -- rewrite one upline reference and rebuild
//! - [`emit()`] -- render a [`Snapshot`] as canonical JSON
//! - [`diff_snapshots()`] -- compare two builds
//! - [`ContactRecord`], [`ResolverConfig`], [`Snapshot`], [`IssuesReport`]
//!
//! Individual pass entry points stay public for selective execution and
//! testing.

/// Version stamped into every emitted snapshot.
pub const SNAPSHOT_FORMAT_VERSION: &str = "1.0.0";

pub mod config;
pub mod contact;
pub mod diff;
pub mod error;
pub mod pass1_normalize;
pub mod pass2_index;
pub mod pass3_candidates;
pub mod pass4_resolve;
pub mod pass5_cycle;
pub mod pass6_assemble;
pub mod pass7_emit;
pub mod pipeline;
pub mod report;
pub mod snapshot;

// ── Convenience re-exports: key types ────────────────────────────────

pub use config::{ResolverConfig, TestCandidateConfig};
pub use contact::{ContactRecord, ProducerStatus, StatusFlags, UplineField, VendorAffiliation};
pub use diff::{Reparented, SnapshotDiff};
pub use error::{ConfigError, UpdateError};
pub use pass2_index::{Index, KeyKind};
pub use pass7_emit::{EmitOptions, Layout, SyntheticMode};
pub use report::{Issue, IssueKind, IssuesReport};
pub use snapshot::{
    ForestNode, IssueFlags, ParentRef, ResolvedNode, Snapshot, SnapshotStats, SyntheticGroupNode,
    SyntheticKind, UplineSource,
};

// ── Convenience re-exports: pipeline entry points ────────────────────

pub use diff::diff_snapshots;
pub use pass1_normalize::{normalize_all, normalize_email, normalize_identifier};
pub use pass2_index::build_indices;
pub use pass4_resolve::resolve_all;
pub use pass5_cycle::commit_edges;
pub use pass6_assemble::assemble;
pub use pass7_emit::emit;
pub use pipeline::{build_snapshot, update_upline};
