//! Pass 2: Identifier indexing -- build lookup indices from normalized
//! keys to contact ids. A bucket with more than one id is the duplicate
//! signal; ambiguity is discovered at lookup time, not here.

use crate::pass1_normalize::NormalizedKeys;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which index a lookup goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyKind {
    LicensingNumber,
    SecondaryProducerId,
    Email,
}

impl KeyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyKind::LicensingNumber => "licensing_number",
            KeyKind::SecondaryProducerId => "secondary_producer_id",
            KeyKind::Email => "email",
        }
    }

    /// Human label used in issue messages.
    pub fn label(&self) -> &'static str {
        match self {
            KeyKind::LicensingNumber => "licensing number",
            KeyKind::SecondaryProducerId => "secondary producer id",
            KeyKind::Email => "email",
        }
    }
}

/// Per-build lookup indices. Buckets keep input order.
#[derive(Debug, Default, Clone)]
pub struct Index {
    pub licensing_numbers: BTreeMap<String, Vec<String>>,
    pub secondary_producer_ids: BTreeMap<String, Vec<String>>,
    pub emails: BTreeMap<String, Vec<String>>,
}

impl Index {
    pub fn lookup(&self, kind: KeyKind, key: &str) -> &[String] {
        let map = match kind {
            KeyKind::LicensingNumber => &self.licensing_numbers,
            KeyKind::SecondaryProducerId => &self.secondary_producer_ids,
            KeyKind::Email => &self.emails,
        };
        map.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// True when the contact's own licensing number or secondary producer
    /// id is shared with at least one other contact.
    pub fn has_duplicate_identifier(&self, keys: &NormalizedKeys) -> bool {
        let shared = |kind: KeyKind, key: &Option<String>| {
            key.as_deref()
                .is_some_and(|k| self.lookup(kind, k).len() > 1)
        };
        shared(KeyKind::LicensingNumber, &keys.licensing_number)
            || shared(KeyKind::SecondaryProducerId, &keys.secondary_producer_id)
    }

    /// Number of buckets holding more than one id, across all three indices.
    pub fn duplicate_bucket_count(&self) -> usize {
        [
            &self.licensing_numbers,
            &self.secondary_producer_ids,
            &self.emails,
        ]
        .iter()
        .flat_map(|m| m.values())
        .filter(|ids| ids.len() > 1)
        .count()
    }
}

pub fn build_indices(keys: &[NormalizedKeys]) -> Index {
    let mut idx = Index::default();
    for k in keys {
        if let Some(n) = &k.licensing_number {
            idx.licensing_numbers
                .entry(n.clone())
                .or_default()
                .push(k.contact_id.clone());
        }
        if let Some(s) = &k.secondary_producer_id {
            idx.secondary_producer_ids
                .entry(s.clone())
                .or_default()
                .push(k.contact_id.clone());
        }
        if let Some(e) = &k.email {
            idx.emails
                .entry(e.clone())
                .or_default()
                .push(k.contact_id.clone());
        }
    }
    idx
}
