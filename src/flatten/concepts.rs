use super::{display_name, object, objects};
use crate::ids::decode_json_id;
use crate::row::{RowBuilder, RowCollection};
use crate::schema::{
    CONCEPTS, CONCEPTS_ANCESTORS, CONCEPTS_COUNTS_BY_YEAR, CONCEPTS_IDS, CONCEPTS_RELATED,
};
use crate::text::compact_json;
use serde_json::{Map, Value as Json};

pub(super) fn flatten(concept_id: i64, concept: &Map<String, Json>, out: &mut RowCollection) {
    let name = display_name(concept);

    out.emit(
        RowBuilder::from_object(&CONCEPTS, concept)
            .set("concept_id", concept_id)
            .set("concept_name", name),
    );

    if let Some(ids) = object(concept, "ids") {
        out.emit(
            RowBuilder::from_object(&CONCEPTS_IDS, ids)
                .set("concept_id", concept_id)
                .set("concept_name", name)
                .set("umls_aui", compact_json(ids.get("umls_aui")))
                .set("umls_cui", compact_json(ids.get("umls_cui"))),
        );
    }

    for ancestor in objects(concept, "ancestors") {
        if let Some(ancestor_id) = decode_json_id(ancestor.get("id")) {
            out.emit(
                RowBuilder::new(&CONCEPTS_ANCESTORS)
                    .set("concept_id", concept_id)
                    .set("ancestor_id", ancestor_id),
            );
        }
    }

    for year in objects(concept, "counts_by_year") {
        out.emit(
            RowBuilder::from_object(&CONCEPTS_COUNTS_BY_YEAR, year)
                .set("concept_id", concept_id)
                .set("concept_name", name),
        );
    }

    for related in objects(concept, "related_concepts") {
        if let Some(related_id) = decode_json_id(related.get("id")) {
            out.emit(
                RowBuilder::new(&CONCEPTS_RELATED)
                    .set("concept_id", concept_id)
                    .set("related_concept_id", related_id)
                    .set_json("score", related.get("score")),
            );
        }
    }
}
