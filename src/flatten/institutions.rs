use super::{display_name, object, objects};
use crate::ids::decode_json_id;
use crate::row::{RowBuilder, RowCollection};
use crate::schema::{
    INSTITUTIONS, INSTITUTIONS_ASSOCIATED, INSTITUTIONS_COUNTS_BY_YEAR, INSTITUTIONS_GEO,
    INSTITUTIONS_IDS,
};
use crate::text::compact_json;
use serde_json::{Map, Value as Json};

/// Upstream has served both spellings of this key.
const ASSOCIATED_KEYS: [&str; 2] = ["associated_institutions", "associated_insitutions"];

pub(super) fn flatten(institution_id: i64, inst: &Map<String, Json>, out: &mut RowCollection) {
    let name = display_name(inst);
    let acronyms = inst
        .get("display_name_acronyms")
        .or_else(|| inst.get("display_name_acroynyms"));

    out.emit(
        RowBuilder::from_object(&INSTITUTIONS, inst)
            .set("institution_id", institution_id)
            .set("institution_name", name)
            .set("display_name_acronyms", compact_json(acronyms))
            .set(
                "display_name_alternatives",
                compact_json(inst.get("display_name_alternatives")),
            ),
    );

    if let Some(ids) = object(inst, "ids") {
        out.emit(
            RowBuilder::from_object(&INSTITUTIONS_IDS, ids)
                .set("institution_id", institution_id)
                .set("institution_name", name),
        );
    }

    if let Some(geo) = object(inst, "geo") {
        out.emit(
            RowBuilder::from_object(&INSTITUTIONS_GEO, geo)
                .set("institution_id", institution_id)
                .set("institution_name", name),
        );
    }

    let associated_key = ASSOCIATED_KEYS
        .into_iter()
        .find(|k| inst.get(*k).is_some_and(|v| !v.is_null()))
        .unwrap_or(ASSOCIATED_KEYS[0]);
    for assoc in objects(inst, associated_key) {
        if assoc.get("id").is_none_or(Json::is_null) {
            continue;
        }
        out.emit(
            RowBuilder::new(&INSTITUTIONS_ASSOCIATED)
                .set("institution_id", institution_id)
                .set("associated_institution_id", decode_json_id(assoc.get("id")))
                .set_json("relationship", assoc.get("relationship")),
        );
    }

    for year in objects(inst, "counts_by_year") {
        out.emit(
            RowBuilder::from_object(&INSTITUTIONS_COUNTS_BY_YEAR, year)
                .set("institution_id", institution_id)
                .set("institution_name", name),
        );
    }
}
