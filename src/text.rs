//! Free-text cleanup helpers.

use serde_json::Value as Json;
use std::collections::BTreeMap;

/// Rebuild forward text from a word → positions inverted index.
///
/// Each word is placed at every position it lists and the words are joined
/// with single spaces in ascending position order. When two words claim the
/// same position, the one encountered later in the index wins.
///
/// The index may arrive as a JSON object or as a JSON string holding one.
/// Anything that cannot be decoded (a non-object, a non-array position list,
/// a negative or non-integer position) yields an empty string.
///
/// ```
/// use snapshot_flatten::text::reconstruct_inverted_index;
/// use serde_json::json;
///
/// let index = json!({"alpha": [0, 2], "beta": [1]});
/// assert_eq!(reconstruct_inverted_index(&index), "alpha beta alpha");
/// ```
#[must_use]
pub fn reconstruct_inverted_index(index: &Json) -> String {
    match index {
        Json::Object(map) => place_words(map).unwrap_or_default(),
        Json::String(encoded) => match serde_json::from_str::<Json>(encoded) {
            Ok(Json::Object(map)) => place_words(&map).unwrap_or_default(),
            _ => String::new(),
        },
        _ => String::new(),
    }
}

fn place_words(map: &serde_json::Map<String, Json>) -> Option<String> {
    let mut slots: BTreeMap<u64, &str> = BTreeMap::new();
    for (word, positions) in map {
        for pos in positions.as_array()? {
            slots.insert(position(pos)?, word.as_str());
        }
    }
    let mut out = String::new();
    for word in slots.values() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    Some(out)
}

/// Replace embedded newlines (escaped `\n` sequences and real line breaks)
/// with single spaces.
#[must_use]
pub fn collapse_newlines(text: &str) -> String {
    text.replace("\\n", " ").replace("\r\n", " ").replace('\n', " ")
}

/// Encode a nested value as compact JSON text; `null` and absent stay null.
#[must_use]
pub fn compact_json(value: Option<&Json>) -> Option<String> {
    match value {
        None | Some(Json::Null) => None,
        Some(v) => Some(v.to_string()),
    }
}

/// Word position as an index. Integral floats such as `3.0` count.
fn position(value: &Json) -> Option<u64> {
    if let Some(n) = value.as_u64() {
        return Some(n);
    }
    let f = value.as_f64()?;
    if !(f.is_finite() && f >= 0.0 && f.fract() == 0.0) {
        return None;
    }
    format!("{f:.0}").parse().ok()
}
