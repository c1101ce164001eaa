//! Seven-pass resolver: contact records -> Snapshot.
//!
//! Thin orchestrator over the pass modules. Every call is a full rebuild
//! over its own copy of the input; nothing is cached between builds.

use crate::config::ResolverConfig;
use crate::contact::{ContactRecord, UplineField};
use crate::error::{ConfigError, UpdateError};
use crate::pass1_normalize::{self, normalize_email, normalize_identifier};
use crate::pass2_index;
use crate::pass3_candidates::CandidateFilter;
use crate::pass4_resolve;
use crate::pass5_cycle;
use crate::pass6_assemble::{self, AssemblyInput};
use crate::snapshot::Snapshot;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Resolve `contacts` into a forest snapshot.
///
/// Fails only on invalid configuration; every data-quality problem in the
/// contact list ends up in the snapshot's issues report instead.
pub fn build_snapshot(
    contacts: &[ContactRecord],
    config: &ResolverConfig,
) -> Result<Snapshot, ConfigError> {
    config.validate()?;
    let (contacts, dropped) = dedupe_ids(contacts);

    // Pass 1: identifier normalization
    let keys = pass1_normalize::normalize_all(&contacts);

    // Pass 2: identifier indices
    let index = pass2_index::build_indices(&keys);
    debug!(
        licensing = index.licensing_numbers.len(),
        secondary = index.secondary_producer_ids.len(),
        email = index.emails.len(),
        duplicate_buckets = index.duplicate_bucket_count(),
        "indices built"
    );

    // Pass 3: test-candidate flags
    let filter = CandidateFilter::build(&contacts, config);
    debug!(
        flagged = filter.flagged_count(),
        excluded = filter.is_enabled(),
        "test candidates flagged"
    );

    // Pass 4: parent proposals
    let resolved = pass4_resolve::resolve_all(&contacts, &keys, &index, &filter, config);

    // Pass 5: cycle guard
    let ids: Vec<&str> = contacts.iter().map(|c| c.id.as_str()).collect();
    let (resolutions, cycle_breaks) = pass5_cycle::commit_edges(&ids, resolved.resolutions);

    // Pass 6: forest assembly
    let mut snapshot = pass6_assemble::assemble(AssemblyInput {
        contacts: &contacts,
        keys: &keys,
        index: &index,
        filter: &filter,
        resolutions,
        cycle_breaks,
        groups: resolved.groups,
        fallback_root: resolved.fallback_root,
    });
    snapshot.stats.dropped_duplicate_ids = dropped;

    let s = &snapshot.stats;
    info!(
        contacts = s.total_contacts,
        roots = s.root_count,
        resolved = s.resolved_count,
        synthetic = s.synthetic_count,
        issues = snapshot.issues.total(),
        "snapshot built"
    );
    Ok(snapshot)
}

/// Keep the first record for each id. Returns the kept records and the
/// number dropped.
fn dedupe_ids(contacts: &[ContactRecord]) -> (Vec<ContactRecord>, usize) {
    let mut seen: HashSet<&str> = HashSet::with_capacity(contacts.len());
    let mut kept = Vec::with_capacity(contacts.len());
    let mut dropped = 0;
    for c in contacts {
        if seen.insert(c.id.as_str()) {
            kept.push(c.clone());
        } else {
            warn!(id = %c.id, "duplicate contact id; keeping first record");
            dropped += 1;
        }
    }
    (kept, dropped)
}

/// Normalize a new upline value the same way pass 1 would. Blank or
/// digit-free values clear the field.
pub fn normalize_upline_value(field: UplineField, value: Option<&str>) -> Option<String> {
    match field {
        UplineField::Email => normalize_email(value),
        UplineField::LicensingNumber | UplineField::SecondaryProducerId => {
            normalize_identifier(value)
        }
    }
}

/// Rewrite one contact's upline reference and rebuild from scratch.
///
/// Returns the updated contact list alongside the fresh snapshot so the
/// caller can persist it. The input slice is left untouched.
pub fn update_upline(
    contacts: &[ContactRecord],
    contact_id: &str,
    field: UplineField,
    value: Option<&str>,
    config: &ResolverConfig,
) -> Result<(Vec<ContactRecord>, Snapshot), UpdateError> {
    config.validate()?;
    let pos = contacts
        .iter()
        .position(|c| c.id == contact_id)
        .ok_or_else(|| UpdateError::UnknownContact(contact_id.to_string()))?;

    let mut updated = contacts.to_vec();
    let normalized = normalize_upline_value(field, value);
    debug!(
        contact = contact_id,
        field = field.as_str(),
        value = ?normalized,
        "upline reference updated"
    );
    updated[pos].set_upline(field, normalized);

    let snapshot = build_snapshot(&updated, config)?;
    Ok((updated, snapshot))
}
