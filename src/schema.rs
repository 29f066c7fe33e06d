//! Fixed output schemas.
//!
//! Every output kind has a static, ordered column list with declared scalar
//! types. Rows are built against one of these schemas (see [`crate::row`]),
//! so a row can never carry a column its table does not declare, and any
//! column the source record lacks is null.
//!
//! Table directory names follow the `<entity>_<kind>` convention, except for
//! the root table of each entity which is named after the entity itself.

use crate::entity::EntityKind;

/// Declared scalar type of an output column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Int64,
    Int16,
    UInt8,
    UInt16,
    UInt32,
    Float64,
    Boolean,
    Utf8,
    /// Milliseconds since the Unix epoch, UTC.
    TimestampMs,
}

impl ColumnType {
    /// Inclusive integer range for the integral types.
    #[must_use]
    pub const fn int_range(self) -> Option<(i64, i64)> {
        match self {
            Self::Int64 => Some((i64::MIN, i64::MAX)),
            Self::Int16 => Some((i16::MIN as i64, i16::MAX as i64)),
            Self::UInt8 => Some((0, u8::MAX as i64)),
            Self::UInt16 => Some((0, u16::MAX as i64)),
            Self::UInt32 => Some((0, u32::MAX as i64)),
            _ => None,
        }
    }
}

/// One column of an output table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub ty: ColumnType,
    pub nullable: bool,
}

impl Column {
    /// A nullable column.
    #[must_use]
    pub const fn new(name: &'static str, ty: ColumnType) -> Self {
        Self {
            name,
            ty,
            nullable: true,
        }
    }

    /// A non-null column; used for the parent key of every table.
    #[must_use]
    pub const fn key(name: &'static str) -> Self {
        Self {
            name,
            ty: ColumnType::Int64,
            nullable: false,
        }
    }
}

/// Schema of one output kind.
#[derive(Debug, PartialEq, Eq)]
pub struct OutputSchema {
    /// Entity kind whose records feed this table.
    pub entity: EntityKind,
    /// Output kind name, unique within the entity (e.g. `authorships`).
    pub kind: &'static str,
    /// Table directory name (e.g. `works_authorships`).
    pub table: &'static str,
    /// Ordered columns.
    pub columns: &'static [Column],
    /// Drop exact-duplicate rows before writing.
    pub dedup_rows: bool,
}

impl OutputSchema {
    /// Position of a column by name.
    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Column names in order.
    pub fn column_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns.iter().map(|c| c.name)
    }
}

use ColumnType::{Boolean, Float64, Int16, Int64, TimestampMs, UInt16, UInt32, UInt8, Utf8};

const fn table(
    entity: EntityKind,
    kind: &'static str,
    table: &'static str,
    columns: &'static [Column],
) -> OutputSchema {
    OutputSchema {
        entity,
        kind,
        table,
        columns,
        dedup_rows: false,
    }
}

// ---------------------------------------------------------------------------
// works
// ---------------------------------------------------------------------------

pub static WORKS: OutputSchema = table(
    EntityKind::Works,
    "works",
    "works",
    &[
        Column::key("work_id"),
        Column::new("doi", Utf8),
        Column::new("title", Utf8),
        Column::new("publication_year", Int16),
        Column::new("publication_date", TimestampMs),
        Column::new("type", Utf8),
        Column::new("cited_by_count", UInt32),
        Column::new("num_authors", UInt16),
        Column::new("is_retracted", Boolean),
        Column::new("is_paratext", Boolean),
        Column::new("created_date", TimestampMs),
        Column::new("updated_date", TimestampMs),
    ],
);

pub static WORKS_IDS: OutputSchema = table(
    EntityKind::Works,
    "ids",
    "works_ids",
    &[
        Column::key("work_id"),
        Column::new("openalex", Utf8),
        Column::new("doi", Utf8),
        Column::new("mag", Int64),
        Column::new("pmid", Utf8),
        Column::new("pmcid", Utf8),
    ],
);

const LOCATION_COLUMNS: &[Column] = &[
    Column::key("work_id"),
    Column::new("source_id", Int64),
    Column::new("source_name", Utf8),
    Column::new("source_type", Utf8),
    Column::new("version", Utf8),
    Column::new("license", Utf8),
    Column::new("is_oa", Boolean),
];

pub static WORKS_PRIMARY_LOCATION: OutputSchema = table(
    EntityKind::Works,
    "primary_location",
    "works_primary_location",
    LOCATION_COLUMNS,
);

pub static WORKS_LOCATIONS: OutputSchema = table(
    EntityKind::Works,
    "locations",
    "works_locations",
    LOCATION_COLUMNS,
);

/// Malformed upstream authorships can repeat whole rows, so this is the one
/// table that is de-duplicated before writing.
pub static WORKS_AUTHORSHIPS: OutputSchema = OutputSchema {
    dedup_rows: true,
    ..table(
        EntityKind::Works,
        "authorships",
        "works_authorships",
        &[
            Column::key("work_id"),
            Column::new("author_position", Utf8),
            Column::new("author_id", Int64),
            Column::new("author_name", Utf8),
            Column::new("institution_id", Int64),
            Column::new("institution_name", Utf8),
            Column::new("raw_affiliation_string", Utf8),
            Column::new("publication_year", Int16),
        ],
    )
};

pub static WORKS_BIBLIO: OutputSchema = table(
    EntityKind::Works,
    "biblio",
    "works_biblio",
    &[
        Column::key("work_id"),
        Column::new("volume", Utf8),
        Column::new("issue", Utf8),
        Column::new("first_page", Utf8),
        Column::new("last_page", Utf8),
    ],
);

pub static WORKS_CONCEPTS: OutputSchema = table(
    EntityKind::Works,
    "concepts",
    "works_concepts",
    &[
        Column::key("work_id"),
        Column::new("publication_year", Int16),
        Column::new("concept_id", Int64),
        Column::new("concept_name", Utf8),
        Column::new("level", UInt8),
        Column::new("score", Float64),
    ],
);

pub static WORKS_MESH: OutputSchema = table(
    EntityKind::Works,
    "mesh",
    "works_mesh",
    &[
        Column::key("work_id"),
        Column::new("descriptor_ui", Utf8),
        Column::new("descriptor_name", Utf8),
        Column::new("qualifier_ui", Utf8),
        Column::new("qualifier_name", Utf8),
        Column::new("is_major_topic", Boolean),
    ],
);

pub static WORKS_OPEN_ACCESS: OutputSchema = table(
    EntityKind::Works,
    "open_access",
    "works_open_access",
    &[
        Column::key("work_id"),
        Column::new("is_oa", Boolean),
        Column::new("oa_status", Utf8),
        Column::new("oa_url", Utf8),
    ],
);

pub static WORKS_REFERENCED_WORKS: OutputSchema = table(
    EntityKind::Works,
    "referenced_works",
    "works_referenced_works",
    &[
        Column::key("work_id"),
        Column::new("referenced_work_id", Int64),
    ],
);

pub static WORKS_RELATED_WORKS: OutputSchema = table(
    EntityKind::Works,
    "related_works",
    "works_related_works",
    &[
        Column::key("work_id"),
        Column::new("related_work_id", Int64),
    ],
);

pub static WORKS_ABSTRACTS: OutputSchema = table(
    EntityKind::Works,
    "abstracts",
    "works_abstracts",
    &[
        Column::key("work_id"),
        Column::new("title", Utf8),
        Column::new("publication_year", Int16),
        Column::new("abstract", Utf8),
    ],
);

static WORKS_SCHEMAS: [&OutputSchema; 12] = [
    &WORKS,
    &WORKS_IDS,
    &WORKS_PRIMARY_LOCATION,
    &WORKS_LOCATIONS,
    &WORKS_AUTHORSHIPS,
    &WORKS_BIBLIO,
    &WORKS_CONCEPTS,
    &WORKS_MESH,
    &WORKS_OPEN_ACCESS,
    &WORKS_REFERENCED_WORKS,
    &WORKS_RELATED_WORKS,
    &WORKS_ABSTRACTS,
];

// ---------------------------------------------------------------------------
// authors
// ---------------------------------------------------------------------------

pub static AUTHORS: OutputSchema = table(
    EntityKind::Authors,
    "authors",
    "authors",
    &[
        Column::key("author_id"),
        Column::new("orcid", Utf8),
        Column::new("author_name", Utf8),
        Column::new("display_name_alternatives", Utf8),
        Column::new("works_count", Int64),
        Column::new("cited_by_count", Int64),
        Column::new("last_known_institution", Int64),
        Column::new("updated_date", TimestampMs),
    ],
);

pub static AUTHORS_IDS: OutputSchema = table(
    EntityKind::Authors,
    "ids",
    "authors_ids",
    &[
        Column::key("author_id"),
        Column::new("author_name", Utf8),
        Column::new("openalex", Utf8),
        Column::new("orcid", Utf8),
        Column::new("scopus", Utf8),
        Column::new("twitter", Utf8),
        Column::new("wikipedia", Utf8),
        Column::new("mag", Int64),
    ],
);

pub static AUTHORS_COUNTS_BY_YEAR: OutputSchema = table(
    EntityKind::Authors,
    "counts_by_year",
    "authors_counts_by_year",
    &[
        Column::key("author_id"),
        Column::new("author_name", Utf8),
        Column::new("year", Int16),
        Column::new("works_count", Int64),
        Column::new("cited_by_count", Int64),
    ],
);

pub static AUTHORS_CONCEPTS: OutputSchema = table(
    EntityKind::Authors,
    "concepts",
    "authors_concepts",
    &[
        Column::key("author_id"),
        Column::new("author_name", Utf8),
        Column::new("works_count", Int64),
        Column::new("cited_by_count", Int64),
        Column::new("concept_id", Int64),
        Column::new("concept_name", Utf8),
        Column::new("level", UInt8),
        Column::new("score", Float64),
    ],
);

pub static AUTHORS_HINTS: OutputSchema = table(
    EntityKind::Authors,
    "hints",
    "authors_hints",
    &[
        Column::key("author_id"),
        Column::new("author_name", Utf8),
        Column::new("works_count", Int64),
        Column::new("cited_by_count", Int64),
        Column::new("most_cited_work", Utf8),
    ],
);

static AUTHORS_SCHEMAS: [&OutputSchema; 5] = [
    &AUTHORS,
    &AUTHORS_IDS,
    &AUTHORS_COUNTS_BY_YEAR,
    &AUTHORS_CONCEPTS,
    &AUTHORS_HINTS,
];

// ---------------------------------------------------------------------------
// institutions
// ---------------------------------------------------------------------------

pub static INSTITUTIONS: OutputSchema = table(
    EntityKind::Institutions,
    "institutions",
    "institutions",
    &[
        Column::key("institution_id"),
        Column::new("institution_name", Utf8),
        Column::new("ror", Utf8),
        Column::new("country_code", Utf8),
        Column::new("type", Utf8),
        Column::new("homepage_url", Utf8),
        Column::new("display_name_acronyms", Utf8),
        Column::new("display_name_alternatives", Utf8),
        Column::new("works_count", Int64),
        Column::new("cited_by_count", Int64),
        Column::new("updated_date", TimestampMs),
    ],
);

pub static INSTITUTIONS_IDS: OutputSchema = table(
    EntityKind::Institutions,
    "ids",
    "institutions_ids",
    &[
        Column::key("institution_id"),
        Column::new("institution_name", Utf8),
        Column::new("openalex", Utf8),
        Column::new("ror", Utf8),
        Column::new("grid", Utf8),
        Column::new("wikipedia", Utf8),
        Column::new("wikidata", Utf8),
        Column::new("mag", Int64),
    ],
);

pub static INSTITUTIONS_GEO: OutputSchema = table(
    EntityKind::Institutions,
    "geo",
    "institutions_geo",
    &[
        Column::key("institution_id"),
        Column::new("institution_name", Utf8),
        Column::new("city", Utf8),
        Column::new("geonames_city_id", Utf8),
        Column::new("region", Utf8),
        Column::new("country_code", Utf8),
        Column::new("country", Utf8),
        Column::new("latitude", Float64),
        Column::new("longitude", Float64),
    ],
);

pub static INSTITUTIONS_ASSOCIATED: OutputSchema = table(
    EntityKind::Institutions,
    "associated_institutions",
    "institutions_associated_institutions",
    &[
        Column::key("institution_id"),
        Column::new("associated_institution_id", Int64),
        Column::new("relationship", Utf8),
    ],
);

pub static INSTITUTIONS_COUNTS_BY_YEAR: OutputSchema = table(
    EntityKind::Institutions,
    "counts_by_year",
    "institutions_counts_by_year",
    &[
        Column::key("institution_id"),
        Column::new("institution_name", Utf8),
        Column::new("year", Int16),
        Column::new("works_count", Int64),
        Column::new("cited_by_count", Int64),
    ],
);

static INSTITUTIONS_SCHEMAS: [&OutputSchema; 5] = [
    &INSTITUTIONS,
    &INSTITUTIONS_IDS,
    &INSTITUTIONS_GEO,
    &INSTITUTIONS_ASSOCIATED,
    &INSTITUTIONS_COUNTS_BY_YEAR,
];

// ---------------------------------------------------------------------------
// concepts
// ---------------------------------------------------------------------------

pub static CONCEPTS: OutputSchema = table(
    EntityKind::Concepts,
    "concepts",
    "concepts",
    &[
        Column::key("concept_id"),
        Column::new("concept_name", Utf8),
        Column::new("wikidata", Utf8),
        Column::new("level", UInt8),
        Column::new("description", Utf8),
        Column::new("works_count", Int64),
        Column::new("cited_by_count", Int64),
        Column::new("updated_date", TimestampMs),
    ],
);

pub static CONCEPTS_ANCESTORS: OutputSchema = table(
    EntityKind::Concepts,
    "ancestors",
    "concepts_ancestors",
    &[Column::key("concept_id"), Column::new("ancestor_id", Int64)],
);

pub static CONCEPTS_COUNTS_BY_YEAR: OutputSchema = table(
    EntityKind::Concepts,
    "counts_by_year",
    "concepts_counts_by_year",
    &[
        Column::key("concept_id"),
        Column::new("concept_name", Utf8),
        Column::new("year", Int16),
        Column::new("works_count", Int64),
        Column::new("cited_by_count", Int64),
    ],
);

pub static CONCEPTS_IDS: OutputSchema = table(
    EntityKind::Concepts,
    "ids",
    "concepts_ids",
    &[
        Column::key("concept_id"),
        Column::new("concept_name", Utf8),
        Column::new("openalex", Utf8),
        Column::new("wikidata", Utf8),
        Column::new("wikipedia", Utf8),
        Column::new("umls_aui", Utf8),
        Column::new("umls_cui", Utf8),
        Column::new("mag", Int64),
    ],
);

pub static CONCEPTS_RELATED: OutputSchema = table(
    EntityKind::Concepts,
    "related_concepts",
    "concepts_related_concepts",
    &[
        Column::key("concept_id"),
        Column::new("related_concept_id", Int64),
        Column::new("score", Float64),
    ],
);

static CONCEPTS_SCHEMAS: [&OutputSchema; 5] = [
    &CONCEPTS,
    &CONCEPTS_ANCESTORS,
    &CONCEPTS_COUNTS_BY_YEAR,
    &CONCEPTS_IDS,
    &CONCEPTS_RELATED,
];

// ---------------------------------------------------------------------------
// venues
// ---------------------------------------------------------------------------

pub static VENUES: OutputSchema = table(
    EntityKind::Venues,
    "venues",
    "venues",
    &[
        Column::key("venue_id"),
        Column::new("issn_l", Utf8),
        Column::new("issn", Utf8),
        Column::new("venue_name", Utf8),
        Column::new("type", Utf8),
        Column::new("publisher", Utf8),
        Column::new("works_count", Int64),
        Column::new("cited_by_count", Int64),
        Column::new("is_oa", Boolean),
        Column::new("is_in_doaj", Boolean),
        Column::new("homepage_url", Utf8),
        Column::new("updated_date", TimestampMs),
    ],
);

pub static VENUES_IDS: OutputSchema = table(
    EntityKind::Venues,
    "ids",
    "venues_ids",
    &[
        Column::key("venue_id"),
        Column::new("venue_name", Utf8),
        Column::new("openalex", Utf8),
        Column::new("issn_l", Utf8),
        Column::new("issn", Utf8),
        Column::new("mag", Int64),
    ],
);

pub static VENUES_COUNTS_BY_YEAR: OutputSchema = table(
    EntityKind::Venues,
    "counts_by_year",
    "venues_counts_by_year",
    &[
        Column::key("venue_id"),
        Column::new("venue_name", Utf8),
        Column::new("year", Int16),
        Column::new("works_count", Int64),
        Column::new("cited_by_count", Int64),
    ],
);

static VENUES_SCHEMAS: [&OutputSchema; 3] = [&VENUES, &VENUES_IDS, &VENUES_COUNTS_BY_YEAR];

/// All schemas declared for an entity kind, root table first.
#[must_use]
pub fn schemas_for(entity: EntityKind) -> &'static [&'static OutputSchema] {
    match entity {
        EntityKind::Works => &WORKS_SCHEMAS,
        EntityKind::Authors => &AUTHORS_SCHEMAS,
        EntityKind::Institutions => &INSTITUTIONS_SCHEMAS,
        EntityKind::Concepts => &CONCEPTS_SCHEMAS,
        EntityKind::Venues => &VENUES_SCHEMAS,
    }
}

/// Look up a schema by entity and output kind name.
#[must_use]
pub fn find_schema(entity: EntityKind, kind: &str) -> Option<&'static OutputSchema> {
    schemas_for(entity).iter().copied().find(|s| s.kind == kind)
}
