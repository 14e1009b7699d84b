use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::api::PangenomeRecord;
use crate::error::PangbankError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PangenomeId(pub u64);

impl PangenomeId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for PangenomeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PangenomeId {
    type Err = PangbankError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        value
            .trim()
            .parse::<u64>()
            .map(Self)
            .map_err(|_| PangbankError::PangenomeNotFound(value.to_string()))
    }
}

#[derive(Debug, Clone, Default)]
pub struct SearchFilters {
    pub taxon: Option<String>,
    pub genome: Option<String>,
    pub collection: Option<String>,
}

impl SearchFilters {
    pub fn taxon(name: &str) -> Self {
        Self {
            taxon: Some(name.to_string()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.taxon.is_none() && self.genome.is_none() && self.collection.is_none()
    }

    pub fn validate(&self) -> Result<(), PangbankError> {
        if self.is_empty() {
            return Err(PangbankError::EmptyFilter);
        }
        Ok(())
    }

    /// AND semantics across the provided keys. Server responses are
    /// post-filtered with this predicate, so results hold regardless of how
    /// much the remote side over-returns.
    pub fn matches(&self, record: &PangenomeRecord) -> bool {
        if let Some(taxon) = &self.taxon {
            let needle = taxon.to_lowercase();
            let hit = record
                .taxon_lineage()
                .iter()
                .any(|name| name.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }
        if let Some(genome) = &self.genome {
            if !record.genome_names.is_empty() {
                let hit = record
                    .genome_names
                    .iter()
                    .any(|name| name.eq_ignore_ascii_case(genome));
                if !hit {
                    return false;
                }
            }
        }
        if let Some(collection) = &self.collection {
            if record.collection_release.collection_name != *collection {
                return false;
            }
        }
        true
    }
}
