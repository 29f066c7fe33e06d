use serde_json::json;
use snapshot_flatten::EntityKind;
use snapshot_flatten::row::{RowBuilder, RowCollection, Value, format_timestamp_ms, parse_timestamp_ms};
use snapshot_flatten::schema::{
    ColumnType, WORKS, WORKS_AUTHORSHIPS, WORKS_BIBLIO, find_schema, schemas_for,
};

#[test]
fn integer_coercion_respects_column_range() {
    assert_eq!(Value::Int(2021).coerce(ColumnType::Int16), Value::Int(2021));
    assert_eq!(Value::Int(70_000).coerce(ColumnType::Int16), Value::Null);
    assert_eq!(Value::Int(-1).coerce(ColumnType::UInt32), Value::Null);
    assert_eq!(Value::Int(256).coerce(ColumnType::UInt8), Value::Null);
    assert_eq!(Value::from(" 42 ").coerce(ColumnType::Int64), Value::Int(42));
    assert_eq!(Value::from(3.0).coerce(ColumnType::Int64), Value::Int(3));
    assert_eq!(Value::from(3.5).coerce(ColumnType::Int64), Value::Null);
    assert_eq!(Value::from("many").coerce(ColumnType::Int64), Value::Null);
}

#[test]
fn scalar_coercions() {
    assert_eq!(Value::Int(1).coerce(ColumnType::Float64), Value::from(1.0));
    assert_eq!(Value::from("true").coerce(ColumnType::Boolean), Value::Bool(true));
    assert_eq!(Value::Int(0).coerce(ColumnType::Boolean), Value::Bool(false));
    assert_eq!(Value::from("maybe").coerce(ColumnType::Boolean), Value::Null);
    assert_eq!(Value::Int(7).coerce(ColumnType::Utf8), Value::from("7"));
    assert_eq!(Value::Null.coerce(ColumnType::Utf8), Value::Null);
}

#[test]
fn timestamps_parse_common_spellings() {
    let day = parse_timestamp_ms("2023-01-05").unwrap();
    assert_eq!(format_timestamp_ms(day).as_deref(), Some("2023-01-05T00:00:00.000Z"));

    let precise = parse_timestamp_ms("2023-01-05T12:30:00.123456").unwrap();
    assert_eq!(precise - day, (12 * 3600 + 30 * 60) * 1000 + 123);

    assert_eq!(parse_timestamp_ms("2023-01-05T12:30:00Z"), Some(day + (12 * 3600 + 30 * 60) * 1000));
    assert_eq!(parse_timestamp_ms("yesterday"), None);
    assert_eq!(parse_timestamp_ms(""), None);

    assert_eq!(
        Value::from("2023-01-05").coerce(ColumnType::TimestampMs),
        Value::Timestamp(day)
    );
    assert_eq!(Value::from("2023-13-45").coerce(ColumnType::TimestampMs), Value::Null);
}

#[test]
fn builder_fills_declared_columns_only() {
    let record = json!({
        "volume": "12",
        "issue": 3,
        "first_page": "100",
        "unexpected": "dropped"
    });
    let row = RowBuilder::from_object(&WORKS_BIBLIO, record.as_object().unwrap())
        .set("work_id", 9_i64)
        .set("also_unexpected", "dropped")
        .build()
        .unwrap();

    assert_eq!(row.values().len(), WORKS_BIBLIO.columns.len());
    assert_eq!(row.get(&WORKS_BIBLIO, "work_id"), Some(&Value::Int(9)));
    assert_eq!(row.get(&WORKS_BIBLIO, "issue"), Some(&Value::from("3")));
    assert_eq!(row.get(&WORKS_BIBLIO, "last_page"), Some(&Value::Null));
    assert_eq!(row.get(&WORKS_BIBLIO, "unexpected"), None);
}

#[test]
fn rows_without_key_are_not_built() {
    assert!(RowBuilder::new(&WORKS).set("title", "no key").build().is_none());

    let mut rows = RowCollection::new(EntityKind::Works.schemas());
    rows.emit(RowBuilder::new(&WORKS).set("title", "no key"));
    rows.emit(RowBuilder::new(&WORKS).set("work_id", 1_i64));
    assert_eq!(rows.get("works").map(|t| t.len()), Some(1));
    assert_eq!(rows.total_rows(), 1);
}

#[test]
fn authorships_deduplicate_exact_rows_only() {
    let mut rows = RowCollection::new(EntityKind::Works.schemas());
    for author in [1_i64, 1, 2] {
        rows.emit(
            RowBuilder::new(&WORKS_AUTHORSHIPS)
                .set("work_id", 5_i64)
                .set("author_id", author),
        );
    }
    let table = rows.get("authorships").unwrap();
    assert_eq!(table.len(), 3);
    assert_eq!(table.rows_to_write().len(), 2);

    let mut works = RowCollection::new(EntityKind::Works.schemas());
    works.emit(RowBuilder::new(&WORKS).set("work_id", 5_i64));
    works.emit(RowBuilder::new(&WORKS).set("work_id", 5_i64));
    assert_eq!(works.get("works").unwrap().rows_to_write().len(), 2);
}

#[test]
fn every_entity_declares_keyed_schemas() {
    let expected = [
        (EntityKind::Works, 12),
        (EntityKind::Authors, 5),
        (EntityKind::Institutions, 5),
        (EntityKind::Concepts, 5),
        (EntityKind::Venues, 3),
    ];
    for (entity, count) in expected {
        let schemas = schemas_for(entity);
        assert_eq!(schemas.len(), count, "{entity}");
        assert_eq!(schemas[0].table, entity.as_str());
        for schema in schemas {
            assert_eq!(schema.entity, entity);
            assert!(!schema.columns[0].nullable, "{} key must be non-null", schema.table);
            assert_eq!(schema.columns[0].ty, ColumnType::Int64);
        }
    }
    assert_eq!(
        find_schema(EntityKind::Works, "authorships").map(|s| s.table),
        Some("works_authorships")
    );
    assert!(find_schema(EntityKind::Venues, "authorships").is_none());
}

#[test]
fn entity_kind_parses_and_displays() {
    for entity in EntityKind::ALL {
        assert_eq!(entity.to_string().parse::<EntityKind>().unwrap(), entity);
    }
    assert_eq!(" Work ".parse::<EntityKind>().unwrap(), EntityKind::Works);
    assert!("funders".parse::<EntityKind>().is_err());
}
