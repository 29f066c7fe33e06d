//! Entity kinds present in a snapshot.

use crate::schema::{self, OutputSchema};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The category of record being flattened. Determines the manifest location,
/// the merged-id directory, and the set of output tables.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Works,
    Authors,
    Institutions,
    Concepts,
    Venues,
}

impl EntityKind {
    /// All kinds, in a stable order.
    pub const ALL: [Self; 5] = [
        Self::Works,
        Self::Authors,
        Self::Institutions,
        Self::Concepts,
        Self::Venues,
    ];

    /// Directory name under `data/` (and under `data/merged_ids/`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Works => "works",
            Self::Authors => "authors",
            Self::Institutions => "institutions",
            Self::Concepts => "concepts",
            Self::Venues => "venues",
        }
    }

    /// Output schemas declared for this kind, root table first.
    #[must_use]
    pub fn schemas(self) -> &'static [&'static OutputSchema] {
        schema::schemas_for(self)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "works" | "work" => Ok(Self::Works),
            "authors" | "author" => Ok(Self::Authors),
            "institutions" | "institution" => Ok(Self::Institutions),
            "concepts" | "concept" => Ok(Self::Concepts),
            "venues" | "venue" => Ok(Self::Venues),
            other => Err(anyhow::anyhow!("unknown entity kind: {other}")),
        }
    }
}
