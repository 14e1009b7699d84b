use std::path::Path;

use assert_matches::assert_matches;

use pangbank_cli::api::{
    CollectionRecord, CollectionReleaseRef, PangbankClient, PangenomeMetrics, PangenomeRecord,
    Taxon, Taxonomy,
};
use pangbank_cli::domain::{PangenomeId, SearchFilters};
use pangbank_cli::error::PangbankError;

fn pangenome(id: u64, collection: &str, lineage: &[&str], genomes: &[&str]) -> PangenomeRecord {
    PangenomeRecord {
        id: PangenomeId(id),
        genome_count: genomes.len() as u64,
        gene_count: 0,
        gene_family_count: 0,
        collection_release: CollectionReleaseRef {
            collection_name: collection.to_string(),
            version: "1.0".to_string(),
        },
        taxonomy: Taxonomy {
            taxa: lineage
                .iter()
                .enumerate()
                .map(|(depth, name)| Taxon {
                    name: name.to_string(),
                    depth: depth as u32,
                })
                .collect(),
        },
        genome_names: genomes.iter().map(|name| name.to_string()).collect(),
    }
}

/// Mirrors the HTTP client's contract: validate, then post-filter whatever
/// the remote side returned with the AND predicate.
struct MockClient {
    catalog: Vec<PangenomeRecord>,
}

impl PangbankClient for MockClient {
    fn list_collections(
        &self,
        _name: Option<&str>,
    ) -> Result<Vec<CollectionRecord>, PangbankError> {
        Ok(Vec::new())
    }

    fn search_pangenomes(
        &self,
        filters: &SearchFilters,
    ) -> Result<Vec<PangenomeRecord>, PangbankError> {
        filters.validate()?;
        Ok(self
            .catalog
            .iter()
            .filter(|record| filters.matches(record))
            .cloned()
            .collect())
    }

    fn get_metrics(&self, id: PangenomeId) -> Result<PangenomeMetrics, PangbankError> {
        Err(PangbankError::PangenomeNotFound(id.to_string()))
    }

    fn get_download_url(&self, id: PangenomeId) -> Result<String, PangbankError> {
        Err(PangbankError::PangenomeNotFound(id.to_string()))
    }

    fn download_pangenome_file(
        &self,
        id: PangenomeId,
        _destination: &Path,
    ) -> Result<(), PangbankError> {
        Err(PangbankError::PangenomeNotFound(id.to_string()))
    }

    fn download_sketch(
        &self,
        collection_id: u64,
        _destination: &Path,
    ) -> Result<(), PangbankError> {
        Err(PangbankError::CollectionNotFound(collection_id.to_string()))
    }
}

fn catalog() -> MockClient {
    MockClient {
        catalog: vec![
            pangenome(1, "GTDB_all", &["d__Bacteria", "g__Escherichia"], &["e1"]),
            pangenome(2, "GTDB_all", &["d__Bacteria", "g__Escherichia"], &["e2"]),
            pangenome(3, "RefSeq", &["d__Bacteria", "g__Escherichia"], &["e3"]),
            pangenome(4, "GTDB_all", &["d__Bacteria", "g__Salmonella"], &["s1"]),
            pangenome(5, "RefSeq", &["d__Bacteria", "g__Bacillus"], &["b1"]),
        ],
    }
}

#[test]
fn taxon_filter_returns_only_tagged_records() {
    let client = catalog();
    let records = client
        .search_pangenomes(&SearchFilters::taxon("g__Escherichia"))
        .unwrap();
    assert_eq!(records.len(), 3);
    assert!(
        records
            .iter()
            .all(|record| record.taxon_lineage().iter().any(|t| t == "g__Escherichia"))
    );
}

#[test]
fn combined_filters_use_and_semantics() {
    let client = catalog();
    let filters = SearchFilters {
        taxon: Some("g__Escherichia".to_string()),
        genome: None,
        collection: Some("GTDB_all".to_string()),
    };
    let records = client.search_pangenomes(&filters).unwrap();
    assert_eq!(records.len(), 2);
    for record in &records {
        assert_eq!(record.collection_release.collection_name, "GTDB_all");
        assert!(record.taxon_lineage().iter().any(|t| t == "g__Escherichia"));
    }
}

#[test]
fn all_three_filters_together() {
    let client = catalog();
    let filters = SearchFilters {
        taxon: Some("Escherichia".to_string()),
        genome: Some("e2".to_string()),
        collection: Some("GTDB_all".to_string()),
    };
    let records = client.search_pangenomes(&filters).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, PangenomeId(2));
}

#[test]
fn empty_filters_always_fail_validation() {
    let client = catalog();
    let err = client
        .search_pangenomes(&SearchFilters::default())
        .unwrap_err();
    assert_matches!(err, PangbankError::EmptyFilter);
}

#[test]
fn unmatched_filters_return_empty_not_error() {
    let client = catalog();
    let records = client
        .search_pangenomes(&SearchFilters::taxon("g__Vibrio"))
        .unwrap();
    assert!(records.is_empty());
}
