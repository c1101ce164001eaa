//! Pass 4: Parent resolution -- pick at most one parent per contact using
//! a short-circuiting precedence chain:
//!
//! 1. upline licensing number
//! 2. upline secondary producer id
//! 3. upline email (only when neither numeric upline is present at all)
//! 4. fallback root (an upline reference exists but nothing matched)
//! 5. unresolved
//!
//! Ambiguous lookups attach to a synthetic duplicate-group node keyed by
//! the normalized value. This pass only proposes edges; the cycle guard
//! decides which are committed.

use crate::config::ResolverConfig;
use crate::contact::ContactRecord;
use crate::pass1_normalize::{normalize_email, NormalizedKeys};
use crate::pass2_index::{Index, KeyKind};
use crate::pass3_candidates::CandidateFilter;
use crate::snapshot::{ParentRef, SyntheticKind, UplineSource};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// Proposed parent for one contact.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub parent: Option<ParentRef>,
    pub source: UplineSource,
    pub confidence: f64,
    /// A raw upline reference existed but matched no contact.
    pub upline_not_found: bool,
}

impl Resolution {
    fn matched(parent: ParentRef, source: UplineSource) -> Self {
        Resolution {
            parent: Some(parent),
            source,
            confidence: source.confidence(),
            upline_not_found: false,
        }
    }

    /// No parent, no claim about why.
    pub fn unresolved() -> Self {
        Resolution {
            parent: None,
            source: UplineSource::Unknown,
            confidence: UplineSource::Unknown.confidence(),
            upline_not_found: false,
        }
    }
}

/// A synthetic node discovered during resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticGroup {
    pub id: String,
    pub kind: SyntheticKind,
    pub key_kind: KeyKind,
    pub key: String,
    pub member_ids: Vec<String>,
}

/// Output of the resolution pass, aligned with the input contact order.
#[derive(Debug, Clone)]
pub struct ResolveOutput {
    pub resolutions: Vec<Resolution>,
    pub groups: BTreeMap<String, SyntheticGroup>,
    pub fallback_root: Option<String>,
}

// ──────────────────────────────────────────────
// Fallback root selection
// ──────────────────────────────────────────────

/// Pick the fallback root once per build:
/// explicit contact id, then explicit email, then the first eligible
/// member of the known-root identifier group.
pub fn select_fallback_root(
    contacts: &[ContactRecord],
    index: &Index,
    filter: &CandidateFilter,
    config: &ResolverConfig,
) -> Option<String> {
    if let Some(id) = config.fallback_root_contact_id.as_deref().map(str::trim) {
        if contacts.iter().any(|c| c.id == id) {
            return Some(id.to_string());
        }
        debug!(id, "configured fallback root id does not match any contact");
    }

    if let Some(email) = normalize_email(config.fallback_root_email.as_deref()) {
        if let Some(id) = index
            .lookup(KeyKind::Email, &email)
            .iter()
            .find(|id| filter.is_eligible(id))
        {
            return Some(id.clone());
        }
        debug!(email = %email, "configured fallback root email does not match any contact");
    }

    let key = config.known_root_key()?;
    [KeyKind::LicensingNumber, KeyKind::SecondaryProducerId]
        .iter()
        .flat_map(|kind| index.lookup(*kind, &key))
        .find(|id| filter.is_eligible(id))
        .cloned()
}

// ──────────────────────────────────────────────
// Resolver
// ──────────────────────────────────────────────

pub struct Resolver<'a> {
    index: &'a Index,
    filter: &'a CandidateFilter,
    contact_ids: HashSet<&'a str>,
    known_root: Option<String>,
    fallback_root: Option<String>,
    placeholder_for_unresolved: bool,
    groups: BTreeMap<String, SyntheticGroup>,
}

impl<'a> Resolver<'a> {
    pub fn new(
        contacts: &'a [ContactRecord],
        index: &'a Index,
        filter: &'a CandidateFilter,
        config: &ResolverConfig,
    ) -> Self {
        let fallback_root = select_fallback_root(contacts, index, filter, config);
        debug!(fallback_root = ?fallback_root, "fallback root selected");
        Resolver {
            index,
            filter,
            contact_ids: contacts.iter().map(|c| c.id.as_str()).collect(),
            known_root: config.known_root_key(),
            fallback_root,
            placeholder_for_unresolved: config.placeholder_for_unresolved,
            groups: BTreeMap::new(),
        }
    }

    pub fn fallback_root(&self) -> Option<&str> {
        self.fallback_root.as_deref()
    }

    pub fn resolve_parent(&mut self, contact: &ContactRecord, keys: &NormalizedKeys) -> Resolution {
        let self_id = contact.id.as_str();

        if let Some(r) = self.try_key(
            KeyKind::LicensingNumber,
            keys.upline_licensing_number.as_deref(),
            self_id,
        ) {
            return r;
        }
        if let Some(r) = self.try_key(
            KeyKind::SecondaryProducerId,
            keys.upline_secondary_producer_id.as_deref(),
            self_id,
        ) {
            return r;
        }
        if !keys.has_numeric_upline() {
            if let Some(r) = self.try_key(KeyKind::Email, keys.upline_email.as_deref(), self_id) {
                return r;
            }
        }

        if !contact.has_upline_reference() {
            return Resolution::unresolved();
        }

        if let Some(root) = self.fallback_root.as_deref().filter(|r| *r != self_id) {
            let mut r = Resolution::matched(ParentRef::Contact(root.to_string()), UplineSource::Fallback);
            r.upline_not_found = true;
            return r;
        }

        let mut r = Resolution::unresolved();
        r.upline_not_found = true;
        if self.placeholder_for_unresolved {
            let (kind, key) = placeholder_key(contact, keys);
            let id =
                self.register_group(SyntheticKind::UnresolvedReference, kind, &key, Vec::new());
            r.parent = Some(ParentRef::Synthetic(id));
        }
        r
    }

    /// One step of the chain. `None` means "fall through to the next step".
    fn try_key(&mut self, kind: KeyKind, key: Option<&str>, self_id: &str) -> Option<Resolution> {
        let key = key?;
        let source = UplineSource::from(kind);

        if kind != KeyKind::Email && self.known_root.as_deref() == Some(key) {
            if let Some(root) = self.fallback_root.as_deref().filter(|r| *r != self_id) {
                return Some(Resolution::matched(
                    ParentRef::Contact(root.to_string()),
                    source,
                ));
            }
        }

        let (index, filter) = (self.index, self.filter);
        let candidates = filter.filter_candidates(index.lookup(kind, key), self_id);
        match candidates.as_slice() {
            [] => None,
            [only] => Some(Resolution::matched(ParentRef::Contact((*only).clone()), source)),
            [_, _, ..] => {
                // Every eligible holder of the key, requester included.
                let members = index
                    .lookup(kind, key)
                    .iter()
                    .filter(|id| filter.is_eligible(id))
                    .cloned()
                    .collect();
                let id = self.register_group(SyntheticKind::DuplicateGroup, kind, key, members);
                Some(Resolution::matched(
                    ParentRef::Synthetic(id),
                    UplineSource::Synthetic,
                ))
            }
        }
    }

    /// Groups are keyed by normalized value, so repeated lookups of the
    /// same ambiguous key land on the same node.
    fn register_group(
        &mut self,
        kind: SyntheticKind,
        key_kind: KeyKind,
        key: &str,
        member_ids: Vec<String>,
    ) -> String {
        let mut id = synthetic_id(kind, key_kind, key);
        if self.contact_ids.contains(id.as_str()) {
            id.push_str("#synthetic");
        }
        self.groups
            .entry(id.clone())
            .or_insert_with(|| SyntheticGroup {
                id: id.clone(),
                kind,
                key_kind,
                key: key.to_string(),
                member_ids,
            });
        id
    }

    pub fn into_groups(self) -> BTreeMap<String, SyntheticGroup> {
        self.groups
    }
}

pub fn synthetic_id(kind: SyntheticKind, key_kind: KeyKind, key: &str) -> String {
    match (kind, key_kind) {
        (SyntheticKind::DuplicateGroup, KeyKind::LicensingNumber) => format!("dup:{}", key),
        (SyntheticKind::DuplicateGroup, KeyKind::SecondaryProducerId) => format!("dup:spid:{}", key),
        (SyntheticKind::DuplicateGroup, KeyKind::Email) => format!("dup:email:{}", key),
        (SyntheticKind::UnresolvedReference, k) => format!("missing:{}:{}", k.as_str(), key),
    }
}

/// Most specific upline field present, preferring normalized values and
/// falling back to the trimmed, lowercased raw text.
fn placeholder_key(contact: &ContactRecord, keys: &NormalizedKeys) -> (KeyKind, String) {
    let fields = [
        (
            KeyKind::LicensingNumber,
            &keys.upline_licensing_number,
            &contact.upline_licensing_number,
        ),
        (
            KeyKind::SecondaryProducerId,
            &keys.upline_secondary_producer_id,
            &contact.upline_secondary_producer_id,
        ),
        (KeyKind::Email, &keys.upline_email, &contact.upline_email),
    ];
    for (kind, normalized, raw) in fields {
        if let Some(n) = normalized {
            return (kind, n.clone());
        }
        if let Some(r) = raw.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
            return (kind, r.to_lowercase());
        }
    }
    (KeyKind::LicensingNumber, String::new())
}

/// Resolve every contact in input order.
pub fn resolve_all(
    contacts: &[ContactRecord],
    keys: &[NormalizedKeys],
    index: &Index,
    filter: &CandidateFilter,
    config: &ResolverConfig,
) -> ResolveOutput {
    let mut resolver = Resolver::new(contacts, index, filter, config);
    let resolutions: Vec<Resolution> = contacts
        .iter()
        .zip(keys)
        .map(|(c, k)| resolver.resolve_parent(c, k))
        .collect();
    let fallback_root = resolver.fallback_root().map(str::to_owned);
    let groups = resolver.into_groups();
    debug!(
        proposed = resolutions.iter().filter(|r| r.parent.is_some()).count(),
        synthetic = groups.len(),
        "parent resolution finished"
    );
    ResolveOutput {
        resolutions,
        groups,
        fallback_root,
    }
}
