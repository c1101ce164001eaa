//! Pass 1: Identifier normalization -- digits-only identifiers and
//! lowercased emails, with empty results mapped to `None`.

use crate::contact::ContactRecord;

/// Canonical matching keys for one contact. `None` means "absent" and is
/// never inserted into an index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedKeys {
    pub contact_id: String,
    pub licensing_number: Option<String>,
    pub secondary_producer_id: Option<String>,
    pub email: Option<String>,
    pub upline_licensing_number: Option<String>,
    pub upline_secondary_producer_id: Option<String>,
    pub upline_email: Option<String>,
}

impl NormalizedKeys {
    /// True when the contact has no usable identifying number of its own.
    pub fn missing_identifier(&self) -> bool {
        self.licensing_number.is_none() && self.secondary_producer_id.is_none()
    }

    /// True when either numeric upline reference survived normalization.
    pub fn has_numeric_upline(&self) -> bool {
        self.upline_licensing_number.is_some() || self.upline_secondary_producer_id.is_some()
    }
}

/// Strip every non-digit. Returns `None` when nothing is left.
pub fn normalize_identifier(raw: Option<&str>) -> Option<String> {
    let digits: String = raw?.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        None
    } else {
        Some(digits)
    }
}

/// Trim and lowercase. Returns `None` for blank input.
pub fn normalize_email(raw: Option<&str>) -> Option<String> {
    let trimmed = raw?.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

pub fn normalize(contact: &ContactRecord) -> NormalizedKeys {
    NormalizedKeys {
        contact_id: contact.id.clone(),
        licensing_number: normalize_identifier(contact.licensing_number.as_deref()),
        secondary_producer_id: normalize_identifier(contact.secondary_producer_id.as_deref()),
        email: normalize_email(contact.email.as_deref()),
        upline_licensing_number: normalize_identifier(contact.upline_licensing_number.as_deref()),
        upline_secondary_producer_id: normalize_identifier(
            contact.upline_secondary_producer_id.as_deref(),
        ),
        upline_email: normalize_email(contact.upline_email.as_deref()),
    }
}

pub fn normalize_all(contacts: &[ContactRecord]) -> Vec<NormalizedKeys> {
    contacts.iter().map(normalize).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_keeps_only_digits() {
        assert_eq!(
            normalize_identifier(Some(" NPN-0012 345 ")),
            Some("0012345".to_string())
        );
        assert_eq!(normalize_identifier(Some("n/a")), None);
        assert_eq!(normalize_identifier(Some("")), None);
        assert_eq!(normalize_identifier(None), None);
    }

    #[test]
    fn non_ascii_digits_are_dropped() {
        // Arabic-Indic digits are not valid licensing numbers.
        assert_eq!(normalize_identifier(Some("١٢٣")), None);
    }

    #[test]
    fn email_is_trimmed_and_lowercased() {
        assert_eq!(
            normalize_email(Some("  Jane.Doe@Agency.COM ")),
            Some("jane.doe@agency.com".to_string())
        );
        assert_eq!(normalize_email(Some("   ")), None);
    }

    #[test]
    fn normalize_contact_fields() {
        let mut c = ContactRecord::new("a", "Alex");
        c.licensing_number = Some("123-45".to_string());
        c.upline_email = Some("Boss@X.io".to_string());
        c.upline_secondary_producer_id = Some("--".to_string());
        let keys = normalize(&c);
        assert_eq!(keys.licensing_number.as_deref(), Some("12345"));
        assert_eq!(keys.upline_email.as_deref(), Some("boss@x.io"));
        assert_eq!(keys.upline_secondary_producer_id, None);
        assert!(!keys.missing_identifier());
        assert!(!keys.has_numeric_upline());
    }
}
