//! Contact records as handed over by the CRM fetch layer.
//!
//! A `ContactRecord` is built once per snapshot and never mutated by the
//! resolution passes. Identifier fields are raw (pre-normalization); the
//! passes only ever read them through [`crate::pass1_normalize`].

use serde::{Deserialize, Serialize};

// ──────────────────────────────────────────────
// Status flags
// ──────────────────────────────────────────────

/// Licensing and enrollment milestones for a producer.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StatusFlags {
    pub licensed: bool,
    pub enrollment_started: bool,
    pub enrollment_paid: bool,
}

/// Derived producer status shown on every contact node.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ProducerStatus {
    Active,
    Pending,
    Inactive,
}

impl StatusFlags {
    pub fn status(&self) -> ProducerStatus {
        if self.licensed {
            ProducerStatus::Active
        } else if self.enrollment_started || self.enrollment_paid {
            ProducerStatus::Pending
        } else {
            ProducerStatus::Inactive
        }
    }
}

impl ProducerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProducerStatus::Active => "active",
            ProducerStatus::Pending => "pending",
            ProducerStatus::Inactive => "inactive",
        }
    }
}

// ──────────────────────────────────────────────
// Vendor affiliation
// ──────────────────────────────────────────────

/// Which carrier-vendor programs a producer is affiliated with.
///
/// The CRM stores this as two independent checkboxes; [`VendorAffiliation::from_flags`]
/// folds them at the fetch boundary.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VendorAffiliation {
    #[default]
    None,
    EquitaOnly,
    QuilityOnly,
    Both,
}

impl VendorAffiliation {
    pub fn from_flags(equita: bool, quility: bool) -> Self {
        match (equita, quility) {
            (false, false) => VendorAffiliation::None,
            (true, false) => VendorAffiliation::EquitaOnly,
            (false, true) => VendorAffiliation::QuilityOnly,
            (true, true) => VendorAffiliation::Both,
        }
    }

    pub fn is_flagged(&self) -> bool {
        !matches!(self, VendorAffiliation::None)
    }

    pub fn equita(&self) -> bool {
        matches!(self, VendorAffiliation::EquitaOnly | VendorAffiliation::Both)
    }

    pub fn quility(&self) -> bool {
        matches!(self, VendorAffiliation::QuilityOnly | VendorAffiliation::Both)
    }
}

// ──────────────────────────────────────────────
// Contact record
// ──────────────────────────────────────────────

/// One producer contact from the CRM.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContactRecord {
    pub id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub licensing_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_producer_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upline_licensing_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upline_secondary_producer_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upline_email: Option<String>,
    /// Informational only; never used for matching.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upline_display_name: Option<String>,
    /// Resident licensing state as recorded in the CRM (e.g. "TX").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub licensing_state: Option<String>,
    #[serde(default)]
    pub status: StatusFlags,
    #[serde(default)]
    pub vendor: VendorAffiliation,
    /// Opportunity-pipeline payload carried through to the UI untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline: Option<serde_json::Value>,
}

impl ContactRecord {
    /// A contact with only an id and a display name.
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        ContactRecord {
            id: id.into(),
            display_name: display_name.into(),
            licensing_number: None,
            secondary_producer_id: None,
            email: None,
            upline_licensing_number: None,
            upline_secondary_producer_id: None,
            upline_email: None,
            upline_display_name: None,
            licensing_state: None,
            status: StatusFlags::default(),
            vendor: VendorAffiliation::None,
            pipeline: None,
        }
    }

    /// True when any raw upline field carries non-blank text.
    pub fn has_upline_reference(&self) -> bool {
        [
            &self.upline_licensing_number,
            &self.upline_secondary_producer_id,
            &self.upline_email,
        ]
        .iter()
        .any(|v| v.as_deref().is_some_and(|s| !s.trim().is_empty()))
    }

    pub fn upline(&self, field: UplineField) -> Option<&str> {
        match field {
            UplineField::LicensingNumber => self.upline_licensing_number.as_deref(),
            UplineField::SecondaryProducerId => self.upline_secondary_producer_id.as_deref(),
            UplineField::Email => self.upline_email.as_deref(),
        }
    }

    pub fn set_upline(&mut self, field: UplineField, value: Option<String>) {
        match field {
            UplineField::LicensingNumber => self.upline_licensing_number = value,
            UplineField::SecondaryProducerId => self.upline_secondary_producer_id = value,
            UplineField::Email => self.upline_email = value,
        }
    }
}

/// The three upline reference fields a caller may rewrite.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum UplineField {
    LicensingNumber,
    SecondaryProducerId,
    Email,
}

impl UplineField {
    pub fn as_str(&self) -> &'static str {
        match self {
            UplineField::LicensingNumber => "licensing_number",
            UplineField::SecondaryProducerId => "secondary_producer_id",
            UplineField::Email => "email",
        }
    }
}

impl std::str::FromStr for UplineField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "licensing_number" | "licensing-number" => Ok(UplineField::LicensingNumber),
            "secondary_producer_id" | "secondary-producer-id" => {
                Ok(UplineField::SecondaryProducerId)
            }
            "email" => Ok(UplineField::Email),
            other => Err(format!("unknown upline field '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_precedence() {
        let mut flags = StatusFlags {
            licensed: true,
            enrollment_started: true,
            enrollment_paid: false,
        };
        assert_eq!(flags.status(), ProducerStatus::Active);
        flags.licensed = false;
        assert_eq!(flags.status(), ProducerStatus::Pending);
        flags.enrollment_started = false;
        flags.enrollment_paid = true;
        assert_eq!(flags.status(), ProducerStatus::Pending);
        flags.enrollment_paid = false;
        assert_eq!(flags.status(), ProducerStatus::Inactive);
    }

    #[test]
    fn vendor_from_flags() {
        assert_eq!(VendorAffiliation::from_flags(false, false), VendorAffiliation::None);
        assert_eq!(VendorAffiliation::from_flags(true, true), VendorAffiliation::Both);
        assert!(VendorAffiliation::from_flags(false, true).quility());
        assert!(!VendorAffiliation::from_flags(false, true).equita());
        assert!(!VendorAffiliation::None.is_flagged());
    }

    #[test]
    fn blank_upline_is_not_a_reference() {
        let mut c = ContactRecord::new("c1", "Casey");
        c.upline_email = Some("   ".to_string());
        assert!(!c.has_upline_reference());
        c.upline_licensing_number = Some("N/A".to_string());
        assert!(c.has_upline_reference());
    }

    #[test]
    fn minimal_record_deserializes() {
        let c: ContactRecord =
            serde_json::from_str(r#"{"id": "x", "upline_licensing_number": "12-3"}"#).unwrap();
        assert_eq!(c.display_name, "");
        assert_eq!(c.vendor, VendorAffiliation::None);
        assert_eq!(c.upline(UplineField::LicensingNumber), Some("12-3"));
    }

    #[test]
    fn upline_field_parses_both_spellings() {
        assert_eq!(
            "secondary-producer-id".parse::<UplineField>().unwrap(),
            UplineField::SecondaryProducerId
        );
        assert_eq!(
            "licensing_number".parse::<UplineField>().unwrap(),
            UplineField::LicensingNumber
        );
        assert!("phone".parse::<UplineField>().is_err());
    }
}
