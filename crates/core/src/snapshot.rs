//! Resolved forest types and read-only queries over a finished snapshot.

use crate::contact::{ContactRecord, ProducerStatus};
use crate::pass2_index::KeyKind;
use crate::report::IssuesReport;
use serde::Serialize;
use std::collections::BTreeMap;

// ──────────────────────────────────────────────
// Resolution provenance
// ──────────────────────────────────────────────

/// Which strategy produced a contact's parent.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum UplineSource {
    LicensingNumber,
    SecondaryProducerId,
    Email,
    Synthetic,
    Fallback,
    Unknown,
}

impl UplineSource {
    /// Fixed display score for each strategy.
    pub fn confidence(&self) -> f64 {
        match self {
            UplineSource::LicensingNumber => 0.95,
            UplineSource::SecondaryProducerId => 0.90,
            UplineSource::Email => 0.60,
            UplineSource::Synthetic => 0.50,
            UplineSource::Fallback => 0.40,
            UplineSource::Unknown => 0.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UplineSource::LicensingNumber => "licensing_number",
            UplineSource::SecondaryProducerId => "secondary_producer_id",
            UplineSource::Email => "email",
            UplineSource::Synthetic => "synthetic",
            UplineSource::Fallback => "fallback",
            UplineSource::Unknown => "unknown",
        }
    }
}

impl From<KeyKind> for UplineSource {
    fn from(kind: KeyKind) -> Self {
        match kind {
            KeyKind::LicensingNumber => UplineSource::LicensingNumber,
            KeyKind::SecondaryProducerId => UplineSource::SecondaryProducerId,
            KeyKind::Email => UplineSource::Email,
        }
    }
}

/// A parent pointer: either a real contact or a synthetic group node.
#[derive(Debug, Clone, Serialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ParentRef {
    Contact(String),
    Synthetic(String),
}

impl ParentRef {
    pub fn id(&self) -> &str {
        match self {
            ParentRef::Contact(id) | ParentRef::Synthetic(id) => id,
        }
    }

    pub fn is_synthetic(&self) -> bool {
        matches!(self, ParentRef::Synthetic(_))
    }
}

// ──────────────────────────────────────────────
// Node payloads
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct IssueFlags {
    pub missing_identifier: bool,
    pub duplicate_identifier: bool,
    pub upline_not_found: bool,
    pub cycle_break: bool,
}

impl IssueFlags {
    pub fn any(&self) -> bool {
        self.missing_identifier
            || self.duplicate_identifier
            || self.upline_not_found
            || self.cycle_break
    }
}

/// Status counts over a node's descendants (the node itself excluded).
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct BranchStatusSummary {
    pub active: usize,
    pub pending: usize,
    pub inactive: usize,
}

impl BranchStatusSummary {
    pub fn record(&mut self, status: ProducerStatus) {
        match status {
            ProducerStatus::Active => self.active += 1,
            ProducerStatus::Pending => self.pending += 1,
            ProducerStatus::Inactive => self.inactive += 1,
        }
    }

    pub fn absorb(&mut self, other: &BranchStatusSummary) {
        self.active += other.active;
        self.pending += other.pending;
        self.inactive += other.inactive;
    }

    pub fn total(&self) -> usize {
        self.active + self.pending + self.inactive
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ResolvedNode {
    pub contact: ContactRecord,
    pub parent: Option<ParentRef>,
    pub child_ids: Vec<String>,
    pub upline_source: UplineSource,
    pub upline_confidence: f64,
    pub status: ProducerStatus,
    pub depth: usize,
    pub descendant_count: usize,
    pub branch_status: BranchStatusSummary,
    pub issues: IssueFlags,
    /// Flagged by the test-candidate heuristics (informational).
    pub test_candidate: bool,
}

impl ResolvedNode {
    pub fn id(&self) -> &str {
        &self.contact.id
    }

    pub fn parent_id(&self) -> Option<&str> {
        self.parent.as_ref().map(ParentRef::id)
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SyntheticKind {
    /// The upline identifier matched several real contacts.
    DuplicateGroup,
    /// The upline identifier matched nothing.
    UnresolvedReference,
}

/// Placeholder node. Always a root; never a contact.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SyntheticGroupNode {
    pub id: String,
    pub kind: SyntheticKind,
    pub key_kind: KeyKind,
    /// Normalized identifier value the group is keyed by.
    pub key: String,
    /// Contacts that share the key (empty for unresolved references).
    pub member_ids: Vec<String>,
    pub child_ids: Vec<String>,
    pub descendant_count: usize,
    pub branch_status: BranchStatusSummary,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "node_type", rename_all = "snake_case")]
pub enum ForestNode {
    Contact(ResolvedNode),
    Synthetic(SyntheticGroupNode),
}

impl ForestNode {
    pub fn id(&self) -> &str {
        match self {
            ForestNode::Contact(n) => n.id(),
            ForestNode::Synthetic(s) => &s.id,
        }
    }

    pub fn child_ids(&self) -> &[String] {
        match self {
            ForestNode::Contact(n) => &n.child_ids,
            ForestNode::Synthetic(s) => &s.child_ids,
        }
    }

    pub fn parent_id(&self) -> Option<&str> {
        match self {
            ForestNode::Contact(n) => n.parent_id(),
            ForestNode::Synthetic(_) => None,
        }
    }

    pub fn as_contact(&self) -> Option<&ResolvedNode> {
        match self {
            ForestNode::Contact(n) => Some(n),
            ForestNode::Synthetic(_) => None,
        }
    }

    pub fn as_synthetic(&self) -> Option<&SyntheticGroupNode> {
        match self {
            ForestNode::Contact(_) => None,
            ForestNode::Synthetic(s) => Some(s),
        }
    }
}

// ──────────────────────────────────────────────
// Snapshot
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct SnapshotStats {
    pub total_contacts: usize,
    pub root_count: usize,
    /// Roots with at least one child.
    pub branch_count: usize,
    /// Contacts that ended up with a parent.
    pub resolved_count: usize,
    pub synthetic_count: usize,
    pub vendor_flagged_count: usize,
    pub test_candidate_count: usize,
    pub active_count: usize,
    pub pending_count: usize,
    pub inactive_count: usize,
    pub max_depth: usize,
    /// Input records skipped because their id repeated an earlier one.
    pub dropped_duplicate_ids: usize,
}

/// One complete, immutable build of the hierarchy.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Snapshot {
    /// Real roots in input order, then synthetic nodes in id order.
    pub roots: Vec<String>,
    pub nodes: BTreeMap<String, ForestNode>,
    pub stats: SnapshotStats,
    pub issues: IssuesReport,
    pub fallback_root: Option<String>,
}

impl Snapshot {
    pub fn get(&self, id: &str) -> Option<&ForestNode> {
        self.nodes.get(id)
    }

    pub fn contact(&self, id: &str) -> Option<&ResolvedNode> {
        self.nodes.get(id).and_then(ForestNode::as_contact)
    }

    pub fn synthetic(&self, id: &str) -> Option<&SyntheticGroupNode> {
        self.nodes.get(id).and_then(ForestNode::as_synthetic)
    }

    pub fn contacts(&self) -> impl Iterator<Item = &ResolvedNode> {
        self.nodes.values().filter_map(ForestNode::as_contact)
    }

    /// Ancestor ids from the immediate parent up to the root. `None` for
    /// unknown ids.
    pub fn upline_chain(&self, id: &str) -> Option<Vec<String>> {
        let mut node = self.nodes.get(id)?;
        let mut chain = Vec::new();
        while let Some(parent) = node.parent_id() {
            if chain.len() >= self.nodes.len() {
                break;
            }
            chain.push(parent.to_string());
            match self.nodes.get(parent) {
                Some(p) => node = p,
                None => break,
            }
        }
        Some(chain)
    }
}
