use super::{array, display_name, object, objects, text};
use crate::ids::{decode_id, decode_json_id, strip_doi};
use crate::row::{RowBuilder, RowCollection};
use crate::schema::{
    WORKS, WORKS_ABSTRACTS, WORKS_AUTHORSHIPS, WORKS_BIBLIO, WORKS_CONCEPTS, WORKS_IDS,
    WORKS_LOCATIONS, WORKS_MESH, WORKS_OPEN_ACCESS, WORKS_PRIMARY_LOCATION, WORKS_REFERENCED_WORKS,
    WORKS_RELATED_WORKS, OutputSchema,
};
use crate::text::{collapse_newlines, reconstruct_inverted_index};
use serde_json::{Map, Value as Json};
use std::collections::BTreeSet;

pub(super) fn flatten(work_id: i64, work: &Map<String, Json>, out: &mut RowCollection) {
    let doi = strip_doi(text(work, "doi"));
    let title = text(work, "title").map(collapse_newlines);
    let year = work.get("publication_year");

    let num_authors = authorships(work_id, work, year, out);

    out.emit(
        RowBuilder::from_object(&WORKS, work)
            .set("work_id", work_id)
            .set("doi", doi.clone())
            .set("title", title.clone())
            .set("num_authors", num_authors),
    );

    if let Some(ids) = object(work, "ids") {
        out.emit(
            RowBuilder::from_object(&WORKS_IDS, ids)
                .set("work_id", work_id)
                .set("doi", doi),
        );
    }

    if let Some(primary) = object(work, "primary_location") {
        location(&WORKS_PRIMARY_LOCATION, work_id, primary, out);
    }
    for loc in objects(work, "locations") {
        location(&WORKS_LOCATIONS, work_id, loc, out);
    }

    if let Some(biblio) = object(work, "biblio") {
        out.emit(RowBuilder::from_object(&WORKS_BIBLIO, biblio).set("work_id", work_id));
    }

    for concept in objects(work, "concepts") {
        let Some(raw_id) = concept.get("id").filter(|v| !v.is_null()) else {
            continue;
        };
        out.emit(
            RowBuilder::new(&WORKS_CONCEPTS)
                .set("work_id", work_id)
                .set_json("publication_year", year)
                .set("concept_id", decode_json_id(Some(raw_id)))
                .set("concept_name", display_name(concept))
                .set_json("level", concept.get("level"))
                .set_json("score", concept.get("score")),
        );
    }

    for mesh in objects(work, "mesh") {
        out.emit(RowBuilder::from_object(&WORKS_MESH, mesh).set("work_id", work_id));
    }

    if let Some(oa) = object(work, "open_access") {
        out.emit(RowBuilder::from_object(&WORKS_OPEN_ACCESS, oa).set("work_id", work_id));
    }

    linked_works(&WORKS_REFERENCED_WORKS, "referenced_work_id", work_id, array(work, "referenced_works"), out);
    linked_works(&WORKS_RELATED_WORKS, "related_work_id", work_id, array(work, "related_works"), out);

    if let Some(index) = work.get("abstract_inverted_index").filter(|v| !v.is_null()) {
        out.emit(
            RowBuilder::new(&WORKS_ABSTRACTS)
                .set("work_id", work_id)
                .set("title", title)
                .set_json("publication_year", year)
                .set("abstract", reconstruct_inverted_index(index)),
        );
    }
}

/// Emit one row per (authorship, institution) pair and return the number of
/// distinct author ids seen.
///
/// An authorship with no institutions still gets exactly one row, with the
/// institution fields null, so every author of the work is represented.
fn authorships(
    work_id: i64,
    work: &Map<String, Json>,
    year: Option<&Json>,
    out: &mut RowCollection,
) -> usize {
    let mut authors = BTreeSet::new();
    for authorship in objects(work, "authorships") {
        let author = object(authorship, "author");
        let author_id = author.and_then(|a| decode_json_id(a.get("id")));
        if let Some(id) = author_id {
            authors.insert(id);
        }
        let base = || {
            RowBuilder::new(&WORKS_AUTHORSHIPS)
                .set("work_id", work_id)
                .set_json("author_position", authorship.get("author_position"))
                .set("author_id", author_id)
                .set("author_name", author.and_then(display_name))
                .set_json("raw_affiliation_string", authorship.get("raw_affiliation_string"))
                .set_json("publication_year", year)
        };

        let mut institutions = objects(authorship, "institutions").peekable();
        if institutions.peek().is_none() {
            out.emit(base());
            continue;
        }
        for inst in institutions {
            out.emit(
                base()
                    .set("institution_id", decode_json_id(inst.get("id")))
                    .set("institution_name", display_name(inst)),
            );
        }
    }
    authors.len()
}

/// Locations only produce a row when they name a source.
fn location(
    schema: &'static OutputSchema,
    work_id: i64,
    loc: &Map<String, Json>,
    out: &mut RowCollection,
) {
    let Some(source) = object(loc, "source") else {
        return;
    };
    out.emit(
        RowBuilder::new(schema)
            .set("work_id", work_id)
            .set("source_id", decode_json_id(source.get("id")))
            .set("source_name", display_name(source))
            .set_json("source_type", source.get("type"))
            .set_json("version", loc.get("version"))
            .set_json("license", loc.get("license"))
            .set_json("is_oa", loc.get("is_oa")),
    );
}

fn linked_works(
    schema: &'static OutputSchema,
    column: &str,
    work_id: i64,
    links: &[Json],
    out: &mut RowCollection,
) {
    for link in links.iter().filter_map(Json::as_str).filter(|s| !s.is_empty()) {
        out.emit(
            RowBuilder::new(schema)
                .set("work_id", work_id)
                .set(column, decode_id(Some(link))),
        );
    }
}
