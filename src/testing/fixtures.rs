//! Sample snapshot records.
//!
//! Each builder returns a record shaped like the upstream dump, with enough
//! nested content to populate every child table of its entity kind.

use serde_json::{Value as Json, json};

/// Full URI form of an entity id, e.g. `entity_uri('W', 7)` →
/// `https://openalex.org/W7`.
#[must_use]
pub fn entity_uri(letter: char, id: i64) -> String {
    format!("https://openalex.org/{letter}{id}")
}

/// A work with one authorship per author id. Authorships alternate between
/// having one institution and having none.
///
/// ```
/// use snapshot_flatten::testing::sample_work;
///
/// let work = sample_work(1, &[10, 11]);
/// assert_eq!(work["authorships"].as_array().map(Vec::len), Some(2));
/// ```
#[must_use]
pub fn sample_work(id: i64, author_ids: &[i64]) -> Json {
    let authorships: Vec<Json> = author_ids
        .iter()
        .enumerate()
        .map(|(i, author)| {
            let institutions = if i % 2 == 0 {
                json!([{"id": entity_uri('I', 100 + *author), "display_name": format!("Institute {author}")}])
            } else {
                json!([])
            };
            json!({
                "author_position": if i == 0 { "first" } else { "middle" },
                "author": {"id": entity_uri('A', *author), "display_name": format!("Author {author}")},
                "institutions": institutions,
                "raw_affiliation_string": null
            })
        })
        .collect();

    json!({
        "id": entity_uri('W', id),
        "doi": format!("https://doi.org/10.1000/work.{id}"),
        "title": format!("Work {id}\\nwith a line break"),
        "publication_year": 2021,
        "publication_date": "2021-03-04",
        "type": "journal-article",
        "cited_by_count": 5,
        "is_retracted": false,
        "is_paratext": false,
        "created_date": "2021-03-05",
        "updated_date": "2023-01-05T12:30:00.000000",
        "ids": {
            "openalex": entity_uri('W', id),
            "doi": format!("https://doi.org/10.1000/work.{id}"),
            "mag": 2_000_000 + id,
            "pmid": null
        },
        "primary_location": {
            "source": {"id": entity_uri('S', 7), "display_name": "Journal of Tests", "type": "journal"},
            "version": "publishedVersion",
            "license": "cc-by",
            "is_oa": true
        },
        "locations": [
            {
                "source": {"id": entity_uri('S', 7), "display_name": "Journal of Tests", "type": "journal"},
                "version": "publishedVersion",
                "license": "cc-by",
                "is_oa": true
            },
            {"source": null, "version": null, "license": null, "is_oa": false}
        ],
        "authorships": authorships,
        "biblio": {"volume": "12", "issue": "3", "first_page": "100", "last_page": "110"},
        "concepts": [
            {"id": entity_uri('C', 41), "display_name": "Testing", "level": 1, "score": 0.75},
            {"id": null, "display_name": "Orphan", "level": 0, "score": 0.1}
        ],
        "mesh": [],
        "open_access": {"is_oa": true, "oa_status": "gold", "oa_url": "https://example.org/oa"},
        "referenced_works": [entity_uri('W', id + 1000), entity_uri('W', id + 1001)],
        "related_works": [entity_uri('W', id + 2000)],
        "abstract_inverted_index": {"Flattening": [0], "snapshots": [1, 3], "with": [2]}
    })
}

#[must_use]
pub fn sample_author(id: i64) -> Json {
    json!({
        "id": entity_uri('A', id),
        "orcid": "https://orcid.org/0000-0001-2345-6789",
        "display_name": format!("Author {id}"),
        "display_name_alternatives": ["A. Author", "Author A."],
        "works_count": 12,
        "cited_by_count": 34,
        "last_known_institution": {"id": entity_uri('I', 55), "display_name": "Institute 55"},
        "updated_date": "2023-01-05",
        "ids": {"openalex": entity_uri('A', id), "orcid": "https://orcid.org/0000-0001-2345-6789", "mag": 42},
        "counts_by_year": [
            {"year": 2022, "works_count": 3, "cited_by_count": 10},
            {"year": 2021, "works_count": 2, "cited_by_count": 8}
        ],
        "x_concepts": [
            {"id": entity_uri('C', 41), "display_name": "Testing", "level": 1, "score": 55.5}
        ],
        "most_cited_work": "Work 1"
    })
}

#[must_use]
pub fn sample_institution(id: i64) -> Json {
    json!({
        "id": entity_uri('I', id),
        "ror": "https://ror.org/00example",
        "display_name": format!("Institute {id}"),
        "country_code": "NL",
        "type": "education",
        "homepage_url": "https://example.edu",
        "display_name_acronyms": ["IE"],
        "display_name_alternatives": ["Institut Example"],
        "works_count": 100,
        "cited_by_count": 1000,
        "updated_date": "2023-01-05",
        "ids": {"openalex": entity_uri('I', id), "ror": "https://ror.org/00example", "mag": 77},
        "geo": {
            "city": "Leiden",
            "geonames_city_id": "2751773",
            "region": null,
            "country_code": "NL",
            "country": "Netherlands",
            "latitude": 52.16,
            "longitude": 4.49
        },
        "associated_institutions": [
            {"id": entity_uri('I', id + 1), "display_name": "Partner", "relationship": "related"},
            {"id": null, "display_name": "Unknown", "relationship": "child"}
        ],
        "counts_by_year": [{"year": 2022, "works_count": 20, "cited_by_count": 200}]
    })
}

#[must_use]
pub fn sample_concept(id: i64) -> Json {
    json!({
        "id": entity_uri('C', id),
        "wikidata": "https://www.wikidata.org/wiki/Q1",
        "display_name": format!("Concept {id}"),
        "level": 2,
        "description": "a concept",
        "works_count": 10,
        "cited_by_count": 20,
        "updated_date": "2023-01-05",
        "ids": {
            "openalex": entity_uri('C', id),
            "wikidata": "https://www.wikidata.org/wiki/Q1",
            "umls_aui": ["A0001"],
            "umls_cui": ["C0001", "C0002"],
            "mag": 99
        },
        "ancestors": [
            {"id": entity_uri('C', 1), "display_name": "Root"},
            {"id": "not-an-id", "display_name": "Broken"}
        ],
        "counts_by_year": [{"year": 2022, "works_count": 4, "cited_by_count": 6}],
        "related_concepts": [{"id": entity_uri('C', 2), "display_name": "Sibling", "level": 2, "score": 1.5}]
    })
}

#[must_use]
pub fn sample_venue(id: i64) -> Json {
    json!({
        "id": entity_uri('V', id),
        "issn_l": "1234-5678",
        "issn": ["1234-5678", "8765-4321"],
        "display_name": format!("Venue {id}"),
        "type": "journal",
        "publisher": "Example Press",
        "works_count": 50,
        "cited_by_count": 500,
        "is_oa": false,
        "is_in_doaj": false,
        "homepage_url": "https://example.org/venue",
        "updated_date": "2023-01-05",
        "ids": {"openalex": entity_uri('V', id), "issn_l": "1234-5678", "issn": ["1234-5678"], "mag": 5},
        "counts_by_year": [{"year": 2022, "works_count": 5, "cited_by_count": 50}]
    })
}
