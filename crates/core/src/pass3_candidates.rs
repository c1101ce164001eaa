//! Pass 3: Test-candidate filtering -- flag sandbox/test contacts so they
//! cannot be picked as anyone's parent. Flagged contacts stay in the
//! forest; only their candidacy is affected.

use crate::config::{ResolverConfig, TestCandidateConfig};
use crate::contact::ContactRecord;
use std::collections::BTreeSet;

/// Heuristic check for a single contact. Explicit overrides win over the
/// name and licensing-state heuristics.
pub fn is_likely_test_candidate(contact: &ContactRecord, cfg: &TestCandidateConfig) -> bool {
    if cfg.id_blocklist.contains(&contact.id) {
        return true;
    }
    if cfg.id_allowlist.contains(&contact.id) {
        return false;
    }
    if let Some(pattern) = &cfg.name_pattern {
        let pattern = pattern.trim().to_lowercase();
        if !pattern.is_empty() && contact.display_name.to_lowercase().contains(&pattern) {
            return true;
        }
    }
    if let Some(state) = &contact.licensing_state {
        let state = state.trim();
        if cfg
            .licensing_state_sentinels
            .iter()
            .any(|s| s.trim().eq_ignore_ascii_case(state))
        {
            return true;
        }
    }
    false
}

/// Candidate filter for one snapshot build.
#[derive(Debug, Clone, Default)]
pub struct CandidateFilter {
    enabled: bool,
    flagged: BTreeSet<String>,
}

impl CandidateFilter {
    /// Flags every test-like contact. Flags are computed even when
    /// exclusion is disabled so the snapshot can still report them.
    pub fn build(contacts: &[ContactRecord], config: &ResolverConfig) -> Self {
        let flagged: BTreeSet<String> = contacts
            .iter()
            .filter(|c| is_likely_test_candidate(c, &config.test_candidates))
            .map(|c| c.id.clone())
            .collect();
        CandidateFilter {
            enabled: config.exclude_test_candidates,
            flagged,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_flagged(&self, id: &str) -> bool {
        self.flagged.contains(id)
    }

    /// True when `id` may be chosen as a parent.
    pub fn is_eligible(&self, id: &str) -> bool {
        !(self.enabled && self.flagged.contains(id))
    }

    pub fn flagged_count(&self) -> usize {
        self.flagged.len()
    }

    /// Remove the requesting contact and, when enabled, every flagged id.
    /// Input order is preserved.
    pub fn filter_candidates<'a>(&self, ids: &'a [String], self_id: &str) -> Vec<&'a String> {
        ids.iter()
            .filter(|id| id.as_str() != self_id && self.is_eligible(id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact(id: &str, name: &str) -> ContactRecord {
        ContactRecord::new(id, name)
    }

    #[test]
    fn name_heuristic_is_case_insensitive() {
        let cfg = TestCandidateConfig::default();
        assert!(is_likely_test_candidate(&contact("c", "VEE TEST"), &cfg));
        assert!(is_likely_test_candidate(&contact("c", "Contest Winner"), &cfg));
        assert!(!is_likely_test_candidate(&contact("c", "Vee Real"), &cfg));
    }

    #[test]
    fn overrides_beat_heuristics() {
        let mut cfg = TestCandidateConfig::default();
        cfg.id_allowlist.insert("real".to_string());
        cfg.id_blocklist.insert("sandbox".to_string());
        assert!(!is_likely_test_candidate(&contact("real", "Test Account"), &cfg));
        assert!(is_likely_test_candidate(&contact("sandbox", "Jordan"), &cfg));
    }

    #[test]
    fn licensing_state_sentinel() {
        let cfg = TestCandidateConfig {
            licensing_state_sentinels: vec!["zz".to_string()],
            name_pattern: None,
            ..TestCandidateConfig::default()
        };
        let mut c = contact("c", "Pat");
        c.licensing_state = Some(" ZZ ".to_string());
        assert!(is_likely_test_candidate(&c, &cfg));
        c.licensing_state = Some("TX".to_string());
        assert!(!is_likely_test_candidate(&c, &cfg));
    }

    #[test]
    fn filter_drops_self_always_and_flagged_only_when_enabled() {
        let contacts = vec![contact("a", "Alex"), contact("t", "Test Person")];
        let ids: Vec<String> = vec!["a".into(), "t".into(), "d".into()];

        let mut cfg = ResolverConfig::new("1");
        let off = CandidateFilter::build(&contacts, &cfg);
        assert!(off.is_flagged("t"));
        assert_eq!(off.filter_candidates(&ids, "d"), ["a", "t"]);

        cfg.exclude_test_candidates = true;
        let on = CandidateFilter::build(&contacts, &cfg);
        assert_eq!(on.filter_candidates(&ids, "d"), ["a"]);
        assert!(!on.is_eligible("t"));
        assert_eq!(on.flagged_count(), 1);
    }
}
