//! Identifier codec.
//!
//! Snapshot records reference each other through opaque URI identifiers such as
//! `https://openalex.org/W2741809807`. Output tables key everything on the
//! numeric suffix instead, which is compact and joins cheaply downstream.
//!
//! Every function here is total: malformed input decodes to `None` and never
//! panics, so callers can treat a missing key as an ordinary null.

/// URI prefix carried by every entity identifier in the snapshot.
pub const ENTITY_URI_PREFIX: &str = "https://openalex.org/";

/// URI prefix carried by DOIs.
pub const DOI_PREFIX: &str = "https://doi.org/";

/// URI prefix carried by ORCID identifiers.
pub const ORCID_PREFIX: &str = "https://orcid.org/";

/// Decode an external entity identifier into its integer key.
///
/// Accepts both the full URI form (`https://openalex.org/W123`) and the bare
/// form (`W123`). The leading entity letter is dropped and the remaining
/// digits are parsed as a signed 64-bit integer.
///
/// Returns `None` for absent or empty input, for a missing entity letter, and
/// for a suffix that is not entirely ASCII digits or overflows `i64`.
///
/// ```
/// use snapshot_flatten::ids::decode_id;
///
/// assert_eq!(decode_id(Some("https://openalex.org/W123")), Some(123));
/// assert_eq!(decode_id(Some("A5023888391")), Some(5023888391));
/// assert_eq!(decode_id(Some("")), None);
/// assert_eq!(decode_id(None), None);
/// ```
#[must_use]
pub fn decode_id(raw: Option<&str>) -> Option<i64> {
    let raw = raw?.trim();
    let bare = raw.strip_prefix(ENTITY_URI_PREFIX).unwrap_or(raw);

    let mut chars = bare.chars();
    let letter = chars.next()?;
    if !letter.is_ascii_alphabetic() {
        return None;
    }
    let digits = chars.as_str();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse::<i64>().ok()
}

/// Decode the identifier stored under `id` in a JSON object, if any.
#[must_use]
pub fn decode_json_id(value: Option<&serde_json::Value>) -> Option<i64> {
    decode_id(value.and_then(serde_json::Value::as_str))
}

/// Strip a known URI prefix from a secondary identifier.
///
/// Values without the prefix pass through trimmed; empty values become `None`.
#[must_use]
pub fn strip_uri_prefix(raw: Option<&str>, prefix: &str) -> Option<String> {
    let raw = raw?.trim();
    let stripped = raw.strip_prefix(prefix).unwrap_or(raw);
    (!stripped.is_empty()).then(|| stripped.to_string())
}

/// `https://doi.org/10.1/abc` → `10.1/abc`.
#[must_use]
pub fn strip_doi(raw: Option<&str>) -> Option<String> {
    strip_uri_prefix(raw, DOI_PREFIX)
}

/// `https://orcid.org/0000-0001-2345-6789` → `0000-0001-2345-6789`.
#[must_use]
pub fn strip_orcid(raw: Option<&str>) -> Option<String> {
    strip_uri_prefix(raw, ORCID_PREFIX)
}
