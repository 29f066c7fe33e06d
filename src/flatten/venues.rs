use super::{display_name, object, objects};
use crate::row::{RowBuilder, RowCollection};
use crate::schema::{VENUES, VENUES_COUNTS_BY_YEAR, VENUES_IDS};
use crate::text::compact_json;
use serde_json::{Map, Value as Json};

pub(super) fn flatten(venue_id: i64, venue: &Map<String, Json>, out: &mut RowCollection) {
    let name = display_name(venue);

    out.emit(
        RowBuilder::from_object(&VENUES, venue)
            .set("venue_id", venue_id)
            .set("venue_name", name)
            .set("issn", compact_json(venue.get("issn"))),
    );

    if let Some(ids) = object(venue, "ids") {
        out.emit(
            RowBuilder::from_object(&VENUES_IDS, ids)
                .set("venue_id", venue_id)
                .set("venue_name", name)
                .set("issn", compact_json(ids.get("issn"))),
        );
    }

    for year in objects(venue, "counts_by_year") {
        out.emit(
            RowBuilder::from_object(&VENUES_COUNTS_BY_YEAR, year)
                .set("venue_id", venue_id)
                .set("venue_name", name),
        );
    }
}
