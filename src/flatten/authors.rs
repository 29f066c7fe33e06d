use super::{display_name, object, objects, text};
use crate::ids::{decode_json_id, strip_orcid};
use crate::row::{RowBuilder, RowCollection, Value};
use crate::schema::{AUTHORS, AUTHORS_CONCEPTS, AUTHORS_COUNTS_BY_YEAR, AUTHORS_HINTS, AUTHORS_IDS};
use crate::text::compact_json;
use serde_json::{Map, Value as Json};

pub(super) fn flatten(author_id: i64, author: &Map<String, Json>, out: &mut RowCollection) {
    let name = display_name(author);
    let works_count = count_or_zero(author, "works_count");
    let cited_by_count = count_or_zero(author, "cited_by_count");

    out.emit(
        RowBuilder::from_object(&AUTHORS, author)
            .set("author_id", author_id)
            .set("author_name", name)
            .set("orcid", strip_orcid(text(author, "orcid")))
            .set(
                "display_name_alternatives",
                compact_json(author.get("display_name_alternatives")),
            )
            .set(
                "last_known_institution",
                object(author, "last_known_institution").and_then(|i| decode_json_id(i.get("id"))),
            ),
    );

    if let Some(ids) = object(author, "ids") {
        out.emit(
            RowBuilder::from_object(&AUTHORS_IDS, ids)
                .set("author_id", author_id)
                .set("author_name", name),
        );
    }

    for year in objects(author, "counts_by_year") {
        out.emit(
            RowBuilder::from_object(&AUTHORS_COUNTS_BY_YEAR, year)
                .set("author_id", author_id)
                .set("author_name", name),
        );
    }

    for concept in objects(author, "x_concepts") {
        out.emit(
            RowBuilder::new(&AUTHORS_CONCEPTS)
                .set("author_id", author_id)
                .set("author_name", name)
                .set("works_count", works_count.clone())
                .set("cited_by_count", cited_by_count.clone())
                .set("concept_id", decode_json_id(concept.get("id")))
                .set("concept_name", display_name(concept))
                .set_json("level", concept.get("level"))
                .set_json("score", concept.get("score")),
        );
    }

    let most_cited = match author.get("most_cited_work") {
        None => Value::from(""),
        Some(v) => Value::from_json(v),
    };
    out.emit(
        RowBuilder::new(&AUTHORS_HINTS)
            .set("author_id", author_id)
            .set("author_name", name)
            .set("works_count", works_count)
            .set("cited_by_count", cited_by_count)
            .set("most_cited_work", most_cited),
    );
}

/// A count field, defaulting to zero when the key is absent.
fn count_or_zero(author: &Map<String, Json>, key: &str) -> Value {
    author.get(key).map_or(Value::Int(0), Value::from_json)
}
