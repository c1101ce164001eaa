//! IssuesReport -- data-quality findings grouped by kind.
//!
//! Every entry points at one contact. The report is built during forest
//! assembly from flags the earlier passes already set; nothing here
//! re-derives them.

use serde::Serialize;
use std::collections::BTreeMap;

/// The four data-quality conditions surfaced to the UI.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    MissingIdentifier,
    DuplicateIdentifier,
    UplineNotFound,
    CycleBreak,
}

impl IssueKind {
    pub const ALL: [IssueKind; 4] = [
        IssueKind::MissingIdentifier,
        IssueKind::DuplicateIdentifier,
        IssueKind::UplineNotFound,
        IssueKind::CycleBreak,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IssueKind::MissingIdentifier => "missing_identifier",
            IssueKind::DuplicateIdentifier => "duplicate_identifier",
            IssueKind::UplineNotFound => "upline_not_found",
            IssueKind::CycleBreak => "cycle_break",
        }
    }
}

/// A single finding against one contact.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Issue {
    pub contact_id: String,
    pub display_name: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct IssuesReport {
    pub missing_identifier: Vec<Issue>,
    pub duplicate_identifier: Vec<Issue>,
    pub upline_not_found: Vec<Issue>,
    pub cycle_break: Vec<Issue>,
}

impl IssuesReport {
    pub fn new() -> Self {
        IssuesReport::default()
    }

    pub fn push(&mut self, kind: IssueKind, issue: Issue) {
        self.bucket_mut(kind).push(issue);
    }

    pub fn for_kind(&self, kind: IssueKind) -> &[Issue] {
        match kind {
            IssueKind::MissingIdentifier => &self.missing_identifier,
            IssueKind::DuplicateIdentifier => &self.duplicate_identifier,
            IssueKind::UplineNotFound => &self.upline_not_found,
            IssueKind::CycleBreak => &self.cycle_break,
        }
    }

    fn bucket_mut(&mut self, kind: IssueKind) -> &mut Vec<Issue> {
        match kind {
            IssueKind::MissingIdentifier => &mut self.missing_identifier,
            IssueKind::DuplicateIdentifier => &mut self.duplicate_identifier,
            IssueKind::UplineNotFound => &mut self.upline_not_found,
            IssueKind::CycleBreak => &mut self.cycle_break,
        }
    }

    /// Per-kind counts, every kind present even when zero.
    pub fn counts(&self) -> BTreeMap<&'static str, usize> {
        IssueKind::ALL
            .iter()
            .map(|k| (k.as_str(), self.for_kind(*k).len()))
            .collect()
    }

    pub fn total(&self) -> usize {
        IssueKind::ALL.iter().map(|k| self.for_kind(*k).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Contact ids flagged with `kind`, in report order.
    pub fn contact_ids(&self, kind: IssueKind) -> Vec<&str> {
        self.for_kind(kind)
            .iter()
            .map(|i| i.contact_id.as_str())
            .collect()
    }

    /// Serialize as `{kind: {count, contacts: [...]}}`.
    pub fn to_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        for kind in IssueKind::ALL {
            let entries = self.for_kind(kind);
            map.insert(
                kind.as_str().to_owned(),
                serde_json::json!({
                    "count": entries.len(),
                    "contacts": entries,
                }),
            );
        }
        serde_json::Value::Object(map)
    }
}
