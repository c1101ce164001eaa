//! Validates the sample contact files against docs/contacts-schema.json
//! and checks the resolved sample agency end to end.

use std::path::{Path, PathBuf};
use upline_core::{
    build_snapshot, diff_snapshots, emit, ContactRecord, EmitOptions, IssueKind, ResolverConfig,
    Snapshot, UplineSource,
};

fn repo_path(rel: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../..").join(rel)
}

fn read_json(rel: &str) -> serde_json::Value {
    let path = repo_path(rel);
    let src = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {}", path.display(), e));
    serde_json::from_str(&src).unwrap()
}

fn load_contacts(rel: &str) -> Vec<ContactRecord> {
    let mut value = read_json(rel);
    if let Some(list) = value.get_mut("contacts") {
        value = list.take();
    }
    serde_json::from_value(value).unwrap()
}

fn load_config() -> ResolverConfig {
    let src = std::fs::read_to_string(repo_path("fixtures/upline.toml")).unwrap();
    toml::from_str(&src).unwrap()
}

fn agency() -> Snapshot {
    build_snapshot(&load_contacts("fixtures/agency.json"), &load_config()).unwrap()
}

#[test]
fn sample_files_match_contact_schema() {
    let schema = read_json("docs/contacts-schema.json");
    let validator = jsonschema::validator_for(&schema)
        .unwrap_or_else(|e| panic!("Failed to compile schema: {}", e));

    let mut failures = Vec::new();
    for rel in ["fixtures/agency.json", "fixtures/agency-refresh.json"] {
        if let Err(error) = validator.validate(&read_json(rel)) {
            failures.push(format!("{}: {}", rel, error));
        }
    }
    assert!(failures.is_empty(), "schema failures:\n{}", failures.join("\n"));
}

#[test]
fn schema_rejects_unknown_fields_and_vendors() {
    let schema = read_json("docs/contacts-schema.json");
    let validator = jsonschema::validator_for(&schema).unwrap();
    assert!(!validator.is_valid(&serde_json::json!([{ "id": "a", "npn": "1" }])));
    assert!(!validator.is_valid(&serde_json::json!([{ "id": "a", "vendor": "acme" }])));
    assert!(!validator.is_valid(&serde_json::json!({ "people": [] })));
    assert!(validator.is_valid(&serde_json::json!([])));
}

#[test]
fn sample_agency_resolves() {
    let s = agency();
    assert_eq!(s.fallback_root.as_deref(), Some("c-hq"));
    assert_eq!(
        s.roots,
        ["c-hq", "c-root2", "c-ivy", "c-kai", "c-sandbox", "dup:3000"]
    );

    // Known-root references go to the fallback root, not a duplicate group.
    let ava = s.contact("c-ava").unwrap();
    assert_eq!(ava.parent_id(), Some("c-hq"));
    assert_eq!(ava.upline_source, UplineSource::LicensingNumber);

    assert_eq!(
        s.contact("c-cara").unwrap().upline_source,
        UplineSource::SecondaryProducerId
    );
    let dev = s.contact("c-dev").unwrap();
    assert_eq!(dev.parent_id(), Some("c-ben"));
    assert_eq!(dev.upline_source, UplineSource::Email);
    assert_eq!(dev.depth, 3);

    assert_eq!(s.contact("c-gus").unwrap().parent_id(), Some("dup:3000"));
    let hal = s.contact("c-hal").unwrap();
    assert_eq!(hal.parent_id(), Some("c-hq"));
    assert_eq!(hal.upline_source, UplineSource::Fallback);

    // The blocklisted sandbox record is skipped as a candidate.
    assert_eq!(s.contact("c-max").unwrap().parent_id(), Some("c-lee"));
    assert!(s.contact("c-sandbox").unwrap().test_candidate);
    assert!(s.contact("c-zed").unwrap().test_candidate);
    assert!(!s.contact("c-tess").unwrap().test_candidate);

    assert_eq!(s.contact("c-hq").unwrap().descendant_count, 11);
}

#[test]
fn sample_agency_issues_and_stats() {
    let s = agency();
    assert_eq!(
        s.issues.contact_ids(IssueKind::DuplicateIdentifier),
        ["c-hq", "c-root2", "c-eli", "c-elle", "c-sandbox", "c-lee"]
    );
    assert_eq!(s.issues.contact_ids(IssueKind::MissingIdentifier), ["c-ivy"]);
    assert_eq!(s.issues.contact_ids(IssueKind::UplineNotFound), ["c-hal"]);
    assert_eq!(s.issues.contact_ids(IssueKind::CycleBreak), ["c-kai"]);

    let st = s.stats;
    assert_eq!(st.total_contacts, 18);
    assert_eq!(st.root_count, 6);
    assert_eq!(st.branch_count, 3);
    assert_eq!(st.resolved_count, 13);
    assert_eq!(st.synthetic_count, 1);
    assert_eq!(st.vendor_flagged_count, 3);
    assert_eq!(st.test_candidate_count, 2);
    assert_eq!(st.max_depth, 3);
    assert_eq!(st.active_count + st.pending_count + st.inactive_count, 18);
}

#[test]
fn emitted_sample_is_byte_stable() {
    let opts = EmitOptions::default();
    let a = serde_json::to_string(&emit(&agency(), &opts)).unwrap();
    let b = serde_json::to_string(&emit(&agency(), &opts)).unwrap();
    assert_eq!(a, b);
}

#[test]
fn refresh_diff() {
    let after = build_snapshot(
        &load_contacts("fixtures/agency-refresh.json"),
        &load_config(),
    )
    .unwrap();
    let d = diff_snapshots(&agency(), &after);
    assert_eq!(d.added, ["c-nia"]);
    assert_eq!(d.removed, ["c-ivy"]);
    assert_eq!(d.reparented.len(), 1);
    assert_eq!(d.reparented[0].id, "c-gus");
    assert_eq!(d.reparented[0].before_parent.as_deref(), Some("dup:3000"));
    assert_eq!(d.reparented[0].after_parent.as_deref(), Some("c-ben"));
    assert_eq!(d.issue_changes["missing_identifier"], -1);
}
