use serde_json::json;
use snapshot_flatten::row::Value;
use snapshot_flatten::testing::{assert_row_counts, int_column, sample_work, table, text_column};
use snapshot_flatten::{EntityKind, ShardFlattener, SkipSet};
use snapshot_flatten::flatten::flatten_lines;

fn flatten_one(record: &serde_json::Value) -> snapshot_flatten::RowCollection {
    let skip = SkipSet::new();
    let mut flattener = ShardFlattener::new(EntityKind::Works, &skip);
    flattener.push_record(record);
    let (rows, stats) = flattener.finish();
    assert_eq!(stats.records_written, 1);
    rows
}

#[test]
fn work_fans_out_into_child_tables() {
    let rows = flatten_one(&sample_work(1, &[10, 11]));

    assert_row_counts(
        &rows,
        &[
            ("works", 1),
            ("ids", 1),
            ("primary_location", 1),
            ("locations", 1),
            ("authorships", 2),
            ("biblio", 1),
            ("concepts", 1),
            ("mesh", 0),
            ("open_access", 1),
            ("referenced_works", 2),
            ("related_works", 1),
            ("abstracts", 1),
        ],
    );

    let counts = rows.row_counts();
    assert_eq!(counts.len(), rows.tables().len());
    assert_eq!(counts.iter().map(|(_, n)| n).sum::<usize>(), rows.total_rows());

    let works = table(&rows, "works");
    assert_eq!(int_column(works, "work_id"), vec![Some(1)]);
    assert_eq!(text_column(works, "doi"), vec![Some("10.1000/work.1".to_string())]);
    assert_eq!(
        text_column(works, "title"),
        vec![Some("Work 1 with a line break".to_string())]
    );
    assert_eq!(int_column(works, "num_authors"), vec![Some(2)]);
    assert_eq!(int_column(works, "publication_year"), vec![Some(2021)]);
    assert!(matches!(
        works.rows[0].get(works.schema, "publication_date"),
        Some(Value::Timestamp(_))
    ));

    assert_eq!(
        text_column(table(&rows, "ids"), "doi"),
        vec![Some("10.1000/work.1".to_string())]
    );
    assert_eq!(int_column(table(&rows, "concepts"), "concept_id"), vec![Some(41)]);
    assert_eq!(
        int_column(table(&rows, "referenced_works"), "referenced_work_id"),
        vec![Some(1001), Some(1002)]
    );
    assert_eq!(int_column(table(&rows, "locations"), "source_id"), vec![Some(7)]);
    assert_eq!(
        text_column(table(&rows, "abstracts"), "abstract"),
        vec![Some("Flattening snapshots with snapshots".to_string())]
    );
}

#[test]
fn every_child_row_carries_the_parent_id() {
    let rows = flatten_one(&sample_work(77, &[1, 2, 3]));
    for t in rows.tables() {
        let key = t.schema.columns[0].name;
        for id in int_column(t, key) {
            assert_eq!(id, Some(77), "{}", t.schema.table);
        }
    }
}

#[test]
fn authorship_without_institutions_gets_one_placeholder_row() {
    let work = json!({
        "id": "https://openalex.org/W5",
        "authorships": [
            {"author_position": "first", "author": {"id": "https://openalex.org/A9", "display_name": "Nine"}, "institutions": []},
            {"author_position": "last", "author": {"id": "https://openalex.org/A8", "display_name": "Eight"}}
        ]
    });
    let rows = flatten_one(&work);
    let authorships = table(&rows, "authorships");

    assert_eq!(int_column(authorships, "author_id"), vec![Some(9), Some(8)]);
    assert_eq!(int_column(authorships, "institution_id"), vec![None, None]);
    assert_eq!(text_column(authorships, "institution_name"), vec![None, None]);
    assert_eq!(int_column(table(&rows, "works"), "num_authors"), vec![Some(2)]);
}

#[test]
fn authorship_with_several_institutions_gets_one_row_each() {
    let work = json!({
        "id": "W6",
        "authorships": [{
            "author_position": "first",
            "author": {"id": "A1", "display_name": "One"},
            "institutions": [
                {"id": "https://openalex.org/I10", "display_name": "Ten"},
                {"id": "https://openalex.org/I20", "display_name": "Twenty"}
            ]
        }]
    });
    let rows = flatten_one(&work);
    let authorships = table(&rows, "authorships");

    assert_eq!(int_column(authorships, "institution_id"), vec![Some(10), Some(20)]);
    assert_eq!(int_column(authorships, "author_id"), vec![Some(1), Some(1)]);
    assert_eq!(int_column(table(&rows, "works"), "num_authors"), vec![Some(1)]);
}

#[test]
fn num_authors_counts_distinct_decodable_authors() {
    let work = json!({
        "id": "W7",
        "authorships": [
            {"author": {"id": "A1"}, "institutions": []},
            {"author": {"id": "A1"}, "institutions": []},
            {"author": {"id": null}, "institutions": []},
            {"author": {"id": "A2"}, "institutions": []}
        ]
    });
    let rows = flatten_one(&work);
    assert_eq!(int_column(table(&rows, "works"), "num_authors"), vec![Some(2)]);

    let authorships = table(&rows, "authorships");
    assert_eq!(authorships.len(), 4);
    // the repeated A1 row is identical and written once
    assert_eq!(authorships.rows_to_write().len(), 3);
    assert!(int_column(authorships, "author_id").contains(&None));
}

#[test]
fn missing_collections_emit_nothing() {
    let rows = flatten_one(&json!({"id": "W8", "title": "bare"}));
    assert_row_counts(
        &rows,
        &[
            ("works", 1),
            ("ids", 0),
            ("authorships", 0),
            ("locations", 0),
            ("concepts", 0),
            ("referenced_works", 0),
            ("abstracts", 0),
        ],
    );
    assert_eq!(int_column(table(&rows, "works"), "num_authors"), vec![Some(0)]);
    assert_eq!(text_column(table(&rows, "works"), "doi"), vec![None]);
}

#[test]
fn abstract_collision_keeps_later_word() {
    let work = json!({
        "id": "W9",
        "abstract_inverted_index": {"alpha": [0, 1], "beta": [1], "gamma": [2]}
    });
    let rows = flatten_one(&work);
    assert_eq!(
        text_column(table(&rows, "abstracts"), "abstract"),
        vec![Some("alpha beta gamma".to_string())]
    );
}

#[test]
fn null_abstract_index_emits_no_abstract() {
    let rows = flatten_one(&json!({"id": "W10", "abstract_inverted_index": null}));
    assert_row_counts(&rows, &[("abstracts", 0)]);
}

#[test]
fn shard_counters_track_dropped_records() {
    let merged = sample_work(2, &[]).to_string();
    let kept = sample_work(3, &[1]).to_string();
    let lines = [
        kept.as_str(),
        merged.as_str(),
        "",
        "{not json",
        "[1, 2, 3]",
        r#"{"id": "garbage"}"#,
        r#"{"title": "no id"}"#,
    ];
    let skip: SkipSet = [2_i64].into_iter().collect();
    let (rows, stats) = flatten_lines(EntityKind::Works, lines, &skip);

    assert_eq!(stats.records_read, 6);
    assert_eq!(stats.records_written, 1);
    assert_eq!(stats.records_merged, 1);
    assert_eq!(stats.malformed_lines, 2);
    assert_eq!(stats.records_without_id, 2);
    assert_eq!(int_column(table(&rows, "works"), "work_id"), vec![Some(3)]);
}

#[test]
fn flattening_is_deterministic() {
    let line = sample_work(4, &[1, 2, 3, 4]).to_string();
    let skip = SkipSet::new();
    let (a, _) = flatten_lines(EntityKind::Works, [line.as_str()], &skip);
    let (b, _) = flatten_lines(EntityKind::Works, [line.as_str()], &skip);
    assert_eq!(a, b);
}
