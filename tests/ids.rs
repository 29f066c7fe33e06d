use serde_json::json;
use snapshot_flatten::ids::{decode_id, decode_json_id, strip_doi, strip_orcid};

#[test]
fn decodes_uri_and_bare_forms() {
    assert_eq!(decode_id(Some("https://openalex.org/W2741809807")), Some(2_741_809_807));
    assert_eq!(decode_id(Some("W2741809807")), Some(2_741_809_807));
    assert_eq!(decode_id(Some("https://openalex.org/A1")), Some(1));
    assert_eq!(decode_id(Some("  I42  ")), Some(42));
}

#[test]
fn rejects_malformed_ids() {
    assert_eq!(decode_id(None), None);
    assert_eq!(decode_id(Some("")), None);
    assert_eq!(decode_id(Some("W")), None);
    assert_eq!(decode_id(Some("123")), None);
    assert_eq!(decode_id(Some("W12x3")), None);
    assert_eq!(decode_id(Some("W-12")), None);
    assert_eq!(decode_id(Some("https://openalex.org/")), None);
    assert_eq!(decode_id(Some("W99999999999999999999")), None);
    assert_eq!(decode_id(Some("not-an-id")), None);
}

#[test]
fn decodes_ids_from_json_values() {
    assert_eq!(decode_json_id(Some(&json!("https://openalex.org/C41"))), Some(41));
    assert_eq!(decode_json_id(Some(&json!(null))), None);
    assert_eq!(decode_json_id(Some(&json!(41))), None);
    assert_eq!(decode_json_id(None), None);
}

#[test]
fn strips_secondary_identifier_prefixes() {
    assert_eq!(strip_doi(Some("https://doi.org/10.1/abc")).as_deref(), Some("10.1/abc"));
    assert_eq!(strip_doi(Some("10.1/abc")).as_deref(), Some("10.1/abc"));
    assert_eq!(strip_doi(Some("https://doi.org/")), None);
    assert_eq!(strip_doi(None), None);
    assert_eq!(
        strip_orcid(Some("https://orcid.org/0000-0001-2345-6789")).as_deref(),
        Some("0000-0001-2345-6789")
    );
}
