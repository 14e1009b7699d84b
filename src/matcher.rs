use std::cmp::Ordering;
use std::path::Path;

use crate::api::{CollectionRecord, PangbankClient, PangenomeRecord};
use crate::domain::SearchFilters;
use crate::error::PangbankError;
use crate::mash::{DistanceResult, SketchTool};
use crate::store::OutputStore;

#[derive(Debug, Clone)]
pub struct MatchResult {
    pub pangenome: PangenomeRecord,
    pub collection: CollectionRecord,
    pub best: DistanceResult,
}

pub struct Matcher<'a, C: PangbankClient, S: SketchTool> {
    client: &'a C,
    tool: &'a S,
    store: &'a OutputStore,
}

impl<'a, C: PangbankClient, S: SketchTool> Matcher<'a, C, S> {
    pub fn new(client: &'a C, tool: &'a S, store: &'a OutputStore) -> Self {
        Self {
            client,
            tool,
            store,
        }
    }

    pub fn match_genome(
        &self,
        genome: &Path,
        collection: Option<&str>,
    ) -> Result<MatchResult, PangbankError> {
        // Tool availability is checked before any network traffic.
        self.tool.check_available()?;

        let candidates = self.resolve_candidates(collection)?;
        tracing::info!(
            candidates = candidates.len(),
            genome = %genome.display(),
            "matching genome against candidate collections"
        );

        let sketch_dir = tempfile::Builder::new()
            .prefix("pangbank-sketch")
            .tempdir()
            .map_err(|err| PangbankError::Filesystem(err.to_string()))?;
        let query_sketch = self.tool.sketch(genome, sketch_dir.path())?;

        let mut pool: Vec<(usize, DistanceResult)> = Vec::new();
        let mut failures: Vec<String> = Vec::new();
        for (index, candidate) in candidates.iter().enumerate() {
            match self.distances_for(candidate, &query_sketch) {
                Ok(rows) => {
                    tracing::debug!(
                        collection = %candidate.name,
                        rows = rows.len(),
                        "distance rows collected"
                    );
                    pool.extend(rows.into_iter().map(|row| (index, row)));
                }
                Err(err) => {
                    tracing::warn!(collection = %candidate.name, error = %err, "candidate failed");
                    failures.push(format!("{}: {err}", candidate.name));
                }
            }
        }

        let Some((winner_index, best)) = select_best(&pool).map(|(i, row)| (*i, row.clone()))
        else {
            // MatchFailed is reserved for every candidate failing; an empty
            // pool with surviving candidates is a no-match outcome.
            if failures.len() == candidates.len() {
                return Err(PangbankError::MatchFailed { failures });
            }
            let mut message = format!(
                "no reference genomes in candidate collections for {}",
                genome.display()
            );
            if !failures.is_empty() {
                message.push_str(&format!(" (skipped: {})", failures.join("; ")));
            }
            return Err(PangbankError::PangenomeNotFound(message));
        };
        let winner_collection = candidates[winner_index].clone();
        tracing::info!(
            reference = %best.reference_id,
            distance = best.distance,
            collection = %winner_collection.name,
            "best match selected"
        );

        let pangenome = self.resolve_winner(&winner_collection, &best)?;
        Ok(MatchResult {
            pangenome,
            collection: winner_collection,
            best,
        })
    }

    fn resolve_candidates(
        &self,
        collection: Option<&str>,
    ) -> Result<Vec<CollectionRecord>, PangbankError> {
        match collection {
            Some(name) => {
                let found = self.client.list_collections(Some(name))?;
                if found.is_empty() {
                    return Err(PangbankError::CollectionNotFound(name.to_string()));
                }
                if found.len() > 1 {
                    return Err(PangbankError::AmbiguousCollection {
                        name: name.to_string(),
                        count: found.len(),
                    });
                }
                Ok(found)
            }
            None => {
                let all = self.client.list_collections(None)?;
                if all.is_empty() {
                    return Err(PangbankError::CollectionNotFound(
                        "no collections available".to_string(),
                    ));
                }
                Ok(all)
            }
        }
    }

    fn distances_for(
        &self,
        collection: &CollectionRecord,
        query_sketch: &Path,
    ) -> Result<Vec<DistanceResult>, PangbankError> {
        let release = collection.latest_release().ok_or_else(|| {
            PangbankError::CollectionNotFound(format!(
                "no latest release for collection {}",
                collection.name
            ))
        })?;

        let sketch_db = self.store.sketch_path(&collection.name, &release.version);
        if sketch_db.as_std_path().exists() {
            tracing::debug!(path = %sketch_db, "reusing downloaded sketch database");
        } else {
            self.store.ensure_sketch_root()?;
            tracing::info!(
                collection = %collection.name,
                version = %release.version,
                "downloading sketch database"
            );
            let temp = tempfile::Builder::new()
                .prefix("sketch-dl")
                .tempfile_in(self.store.sketch_root().as_std_path())
                .map_err(|err| PangbankError::Filesystem(err.to_string()))?;
            self.client.download_sketch(collection.id, temp.path())?;
            temp.persist(sketch_db.as_std_path())
                .map_err(|err| PangbankError::Filesystem(err.to_string()))?;
        }

        self.tool.distance(query_sketch, sketch_db.as_std_path())
    }

    fn resolve_winner(
        &self,
        collection: &CollectionRecord,
        best: &DistanceResult,
    ) -> Result<PangenomeRecord, PangbankError> {
        let stem = reference_stem(&best.reference_id);
        let filters = SearchFilters {
            taxon: None,
            genome: Some(stem.clone()),
            collection: Some(collection.name.clone()),
        };
        let mut hits = self.client.search_pangenomes(&filters)?;
        if hits.len() > 1 {
            tracing::warn!(
                reference = %best.reference_id,
                hits = hits.len(),
                collection = %collection.name,
                "multiple pangenomes matched the winning reference"
            );
        }
        // Records that list the genome explicitly beat ones that only
        // survived the filter because their genome list is empty.
        let explicit = hits.iter().position(|record| {
            record
                .genome_names
                .iter()
                .any(|name| name.eq_ignore_ascii_case(&stem))
        });
        match explicit {
            Some(index) => Ok(hits.swap_remove(index)),
            None => hits
                .into_iter()
                .next()
                .ok_or_else(|| PangbankError::PangenomeNotFound(best.reference_id.clone())),
        }
    }
}

/// Lowest distance wins; exact distance ties fall back to the lower p-value,
/// then to the lexicographically smaller reference id.
pub fn select_best(pool: &[(usize, DistanceResult)]) -> Option<&(usize, DistanceResult)> {
    pool.iter().min_by(|(_, a), (_, b)| compare_rows(a, b))
}

fn compare_rows(a: &DistanceResult, b: &DistanceResult) -> Ordering {
    a.distance
        .total_cmp(&b.distance)
        .then_with(|| a.p_value.total_cmp(&b.p_value))
        .then_with(|| a.reference_id.cmp(&b.reference_id))
}

/// Sketch databases carry reference ids as file names; reduce them to the
/// genome name the API knows about.
pub fn reference_stem(reference_id: &str) -> String {
    let base = reference_id
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(reference_id);
    let mut stem = base;
    for ext in [".gz", ".fna", ".fa", ".fasta"] {
        if let Some(stripped) = stem.strip_suffix(ext) {
            stem = stripped;
        }
    }
    stem.to_string()
}
