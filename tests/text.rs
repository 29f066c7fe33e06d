use serde_json::json;
use snapshot_flatten::text::{collapse_newlines, compact_json, reconstruct_inverted_index};

#[test]
fn reconstructs_words_in_position_order() {
    let index = json!({"snapshots": [1, 3], "Flattening": [0], "with": [2]});
    assert_eq!(reconstruct_inverted_index(&index), "Flattening snapshots with snapshots");
}

#[test]
fn later_word_wins_a_position_collision() {
    let index = json!({"first": [0, 1], "second": [1]});
    assert_eq!(reconstruct_inverted_index(&index), "first second");

    let reversed = json!({"second": [1], "first": [0, 1]});
    assert_eq!(reconstruct_inverted_index(&reversed), "first first");
}

#[test]
fn accepts_index_encoded_as_string() {
    let index = json!(r#"{"a": [0], "b": [1]}"#);
    assert_eq!(reconstruct_inverted_index(&index), "a b");
}

#[test]
fn undecodable_index_is_empty() {
    assert_eq!(reconstruct_inverted_index(&json!({})), "");
    assert_eq!(reconstruct_inverted_index(&json!([1, 2])), "");
    assert_eq!(reconstruct_inverted_index(&json!("not json")), "");
    assert_eq!(reconstruct_inverted_index(&json!({"a": "zero"})), "");
    assert_eq!(reconstruct_inverted_index(&json!({"a": [-1]})), "");
}

#[test]
fn integral_float_positions_are_accepted() {
    let index = json!({"alpha": [0.0, 2], "beta": [1]});
    assert_eq!(reconstruct_inverted_index(&index), "alpha beta alpha");

    assert_eq!(reconstruct_inverted_index(&json!({"a": [0.5]})), "");
}

#[test]
fn gaps_in_positions_are_skipped() {
    let index = json!({"a": [0], "c": [5]});
    assert_eq!(reconstruct_inverted_index(&index), "a c");
}

#[test]
fn collapses_escaped_and_real_newlines() {
    assert_eq!(collapse_newlines("one\\ntwo"), "one two");
    assert_eq!(collapse_newlines("one\ntwo\r\nthree"), "one two three");
    assert_eq!(collapse_newlines("plain"), "plain");
}

#[test]
fn compact_json_keeps_null_null() {
    assert_eq!(compact_json(Some(&json!(["a", "b"]))).as_deref(), Some(r#"["a","b"]"#));
    assert_eq!(compact_json(Some(&json!([]))).as_deref(), Some("[]"));
    assert_eq!(compact_json(Some(&json!(null))), None);
    assert_eq!(compact_json(None), None);
}
