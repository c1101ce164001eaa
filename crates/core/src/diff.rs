//! Structural comparison of two snapshots, used to review a refresh
//! before publishing it.

use crate::report::IssueKind;
use crate::snapshot::{Snapshot, UplineSource};
use serde::Serialize;
use std::collections::BTreeMap;

/// A contact present in both snapshots whose parent changed.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Reparented {
    pub id: String,
    pub before_parent: Option<String>,
    pub after_parent: Option<String>,
    pub before_source: UplineSource,
    pub after_source: UplineSource,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct SnapshotDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub reparented: Vec<Reparented>,
    /// After-minus-before count per issue kind; every kind is present.
    pub issue_changes: BTreeMap<&'static str, i64>,
}

impl SnapshotDiff {
    /// No contact moved, appeared or disappeared, and issue counts held.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.removed.is_empty()
            && self.reparented.is_empty()
            && self.issue_changes.values().all(|d| *d == 0)
    }
}

/// Compare contact nodes by id. Synthetic nodes only show up as parent
/// ids. All lists are ordered by contact id.
pub fn diff_snapshots(before: &Snapshot, after: &Snapshot) -> SnapshotDiff {
    let mut diff = SnapshotDiff::default();

    for old in before.contacts() {
        match after.contact(old.id()) {
            None => diff.removed.push(old.id().to_string()),
            Some(new) if new.parent_id() != old.parent_id() => {
                diff.reparented.push(Reparented {
                    id: old.id().to_string(),
                    before_parent: old.parent_id().map(str::to_owned),
                    after_parent: new.parent_id().map(str::to_owned),
                    before_source: old.upline_source,
                    after_source: new.upline_source,
                });
            }
            Some(_) => {}
        }
    }
    diff.added = after
        .contacts()
        .filter(|n| before.contact(n.id()).is_none())
        .map(|n| n.id().to_string())
        .collect();

    for kind in IssueKind::ALL {
        let delta = after.issues.for_kind(kind).len() as i64
            - before.issues.for_kind(kind).len() as i64;
        diff.issue_changes.insert(kind.as_str(), delta);
    }
    diff
}
