//! Pass 6: Forest assembly -- wire committed edges into nodes, compute
//! depth, descendant counts and branch status summaries, merge issue
//! flags, and collect the issues report and aggregate stats.

use crate::contact::{ContactRecord, ProducerStatus};
use crate::pass1_normalize::NormalizedKeys;
use crate::pass2_index::{Index, KeyKind};
use crate::pass3_candidates::CandidateFilter;
use crate::pass4_resolve::{Resolution, SyntheticGroup};
use crate::pass5_cycle::CycleBreak;
use crate::report::{Issue, IssueKind, IssuesReport};
use crate::snapshot::{
    BranchStatusSummary, ForestNode, IssueFlags, ResolvedNode, Snapshot, SnapshotStats,
    SyntheticGroupNode,
};
use std::collections::{BTreeMap, HashMap, VecDeque};

/// Everything the assembler consumes, all aligned with input order.
pub struct AssemblyInput<'a> {
    pub contacts: &'a [ContactRecord],
    pub keys: &'a [NormalizedKeys],
    pub index: &'a Index,
    pub filter: &'a CandidateFilter,
    pub resolutions: Vec<Resolution>,
    pub cycle_breaks: Vec<CycleBreak>,
    pub groups: BTreeMap<String, SyntheticGroup>,
    pub fallback_root: Option<String>,
}

pub fn assemble(input: AssemblyInput<'_>) -> Snapshot {
    let AssemblyInput {
        contacts,
        keys,
        index,
        filter,
        resolutions,
        cycle_breaks,
        groups,
        fallback_root,
    } = input;

    let breaks: HashMap<&str, &CycleBreak> = cycle_breaks
        .iter()
        .map(|b| (b.child_id.as_str(), b))
        .collect();

    let mut nodes: BTreeMap<String, ForestNode> = BTreeMap::new();
    let mut roots: Vec<String> = Vec::new();
    let mut children: HashMap<String, Vec<String>> = HashMap::new();
    let mut issues = IssuesReport::new();

    for ((contact, k), r) in contacts.iter().zip(keys).zip(resolutions) {
        let flags = IssueFlags {
            missing_identifier: k.missing_identifier(),
            duplicate_identifier: index.has_duplicate_identifier(k),
            upline_not_found: r.upline_not_found,
            cycle_break: breaks.contains_key(contact.id.as_str()),
        };
        record_issues(&mut issues, contact, k, index, &flags, breaks.get(contact.id.as_str()));

        match &r.parent {
            Some(p) => children
                .entry(p.id().to_string())
                .or_default()
                .push(contact.id.clone()),
            None => roots.push(contact.id.clone()),
        }

        nodes.insert(
            contact.id.clone(),
            ForestNode::Contact(ResolvedNode {
                contact: contact.clone(),
                parent: r.parent,
                child_ids: Vec::new(),
                upline_source: r.source,
                upline_confidence: r.confidence,
                status: contact.status.status(),
                depth: 0,
                descendant_count: 0,
                branch_status: BranchStatusSummary::default(),
                issues: flags,
                test_candidate: filter.is_flagged(&contact.id),
            }),
        );
    }

    for (id, g) in groups {
        roots.push(id.clone());
        nodes.insert(
            id,
            ForestNode::Synthetic(SyntheticGroupNode {
                id: g.id,
                kind: g.kind,
                key_kind: g.key_kind,
                key: g.key,
                member_ids: g.member_ids,
                child_ids: Vec::new(),
                descendant_count: 0,
                branch_status: BranchStatusSummary::default(),
            }),
        );
    }

    for (parent, kids) in children {
        match nodes.get_mut(&parent) {
            Some(ForestNode::Contact(n)) => n.child_ids = kids,
            Some(ForestNode::Synthetic(s)) => s.child_ids = kids,
            None => {}
        }
    }

    let order = compute_depths(&roots, &mut nodes);
    roll_up_descendants(&order, &mut nodes);

    let stats = compute_stats(&roots, &nodes);
    Snapshot {
        roots,
        nodes,
        stats,
        issues,
        fallback_root,
    }
}

fn record_issues(
    issues: &mut IssuesReport,
    contact: &ContactRecord,
    keys: &NormalizedKeys,
    index: &Index,
    flags: &IssueFlags,
    cycle: Option<&&CycleBreak>,
) {
    let entry = |message: String| Issue {
        contact_id: contact.id.clone(),
        display_name: contact.display_name.clone(),
        message,
    };

    if flags.missing_identifier {
        issues.push(
            IssueKind::MissingIdentifier,
            entry("no licensing number or secondary producer id".to_string()),
        );
    }
    if flags.duplicate_identifier {
        let shared: Vec<String> = [
            (KeyKind::LicensingNumber, &keys.licensing_number),
            (KeyKind::SecondaryProducerId, &keys.secondary_producer_id),
        ]
        .iter()
        .filter_map(|(kind, key)| {
            let key = key.as_deref()?;
            let others = index.lookup(*kind, key).len().saturating_sub(1);
            (others > 0).then(|| {
                format!(
                    "{} {} shared with {} other contact(s)",
                    kind.label(),
                    key,
                    others
                )
            })
        })
        .collect();
        issues.push(IssueKind::DuplicateIdentifier, entry(shared.join("; ")));
    }
    if flags.upline_not_found {
        issues.push(
            IssueKind::UplineNotFound,
            entry(format!(
                "upline reference {} matched no contact",
                describe_upline(contact)
            )),
        );
    }
    if let Some(b) = cycle {
        issues.push(
            IssueKind::CycleBreak,
            entry(format!(
                "edge to {} rejected: would close cycle {} \u{2192} {}",
                b.rejected_parent,
                b.child_id,
                b.path.join(" \u{2192} ")
            )),
        );
    }
}

fn describe_upline(contact: &ContactRecord) -> String {
    [
        ("licensing number", &contact.upline_licensing_number),
        ("secondary producer id", &contact.upline_secondary_producer_id),
        ("email", &contact.upline_email),
    ]
    .iter()
    .filter_map(|(label, v)| {
        v.as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("{} '{}'", label, s))
    })
    .collect::<Vec<_>>()
    .join(", ")
}

/// BFS from the roots. Returns the visit order.
fn compute_depths(roots: &[String], nodes: &mut BTreeMap<String, ForestNode>) -> Vec<String> {
    let mut order = Vec::with_capacity(nodes.len());
    let mut queue: VecDeque<(String, usize)> = roots.iter().map(|r| (r.clone(), 0)).collect();
    while let Some((id, depth)) = queue.pop_front() {
        let Some(node) = nodes.get_mut(&id) else {
            continue;
        };
        if let ForestNode::Contact(n) = node {
            n.depth = depth;
        }
        for child in node.child_ids() {
            queue.push_back((child.clone(), depth + 1));
        }
        order.push(id);
    }
    order
}

/// Accumulate descendant counts and status summaries bottom-up by walking
/// the BFS order in reverse.
fn roll_up_descendants(order: &[String], nodes: &mut BTreeMap<String, ForestNode>) {
    let mut acc: HashMap<&str, (usize, BranchStatusSummary)> = HashMap::new();
    for id in order.iter().rev() {
        let Some(node) = nodes.get(id) else {
            continue;
        };
        let mut count = 0;
        let mut summary = BranchStatusSummary::default();
        for child in node.child_ids() {
            if let Some((c_count, c_summary)) = acc.get(child.as_str()) {
                count += 1 + c_count;
                summary.absorb(c_summary);
            }
            if let Some(ForestNode::Contact(c)) = nodes.get(child) {
                summary.record(c.status);
            }
        }
        acc.insert(id.as_str(), (count, summary));
    }

    for (id, (count, summary)) in acc {
        match nodes.get_mut(id) {
            Some(ForestNode::Contact(n)) => {
                n.descendant_count = count;
                n.branch_status = summary;
            }
            Some(ForestNode::Synthetic(s)) => {
                s.descendant_count = count;
                s.branch_status = summary;
            }
            None => {}
        }
    }
}

fn compute_stats(roots: &[String], nodes: &BTreeMap<String, ForestNode>) -> SnapshotStats {
    let mut stats = SnapshotStats {
        root_count: roots.len(),
        branch_count: roots
            .iter()
            .filter(|r| nodes.get(*r).is_some_and(|n| !n.child_ids().is_empty()))
            .count(),
        ..SnapshotStats::default()
    };
    for node in nodes.values() {
        match node {
            ForestNode::Contact(n) => {
                stats.total_contacts += 1;
                if n.parent.is_some() {
                    stats.resolved_count += 1;
                }
                if n.contact.vendor.is_flagged() {
                    stats.vendor_flagged_count += 1;
                }
                if n.test_candidate {
                    stats.test_candidate_count += 1;
                }
                match n.status {
                    ProducerStatus::Active => stats.active_count += 1,
                    ProducerStatus::Pending => stats.pending_count += 1,
                    ProducerStatus::Inactive => stats.inactive_count += 1,
                }
                stats.max_depth = stats.max_depth.max(n.depth);
            }
            ForestNode::Synthetic(_) => stats.synthetic_count += 1,
        }
    }
    stats
}
