use std::collections::BTreeMap;

use crate::api::{CollectionRecord, PangenomeMetrics, PangenomeRecord};
use crate::download::DownloadOutcome;
use crate::matcher::MatchResult;

/// Plain-text rendering of API records. The library never prints; callers
/// decide where these strings go.
pub fn render_collections(collections: &[CollectionRecord]) -> String {
    if collections.is_empty() {
        return "No collections available.\n".to_string();
    }

    let header = [
        "Collection",
        "Description",
        "Latest release",
        "Date",
        "Taxonomy",
        "Pangenomes",
    ];
    let mut rows: Vec<[String; 6]> = Vec::new();
    for collection in collections {
        let Some(release) = collection.latest_release() else {
            continue;
        };
        let taxonomy = release
            .taxonomy_source
            .as_ref()
            .map(|source| format!("{}:{}", source.name, source.version))
            .unwrap_or_default();
        rows.push([
            collection.name.clone(),
            collection.description.clone(),
            release.version.clone(),
            release.date.clone(),
            taxonomy,
            release.pangenome_count.to_string(),
        ]);
    }

    let mut widths: Vec<usize> = header.iter().map(|title| title.len()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.len());
        }
    }

    let mut out = String::new();
    let format_row = |cells: &[String]| {
        cells
            .iter()
            .enumerate()
            .map(|(i, cell)| format!("{cell:<width$}", width = widths[i]))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let header_cells: Vec<String> = header.iter().map(|title| title.to_string()).collect();
    out.push_str(&format_row(&header_cells));
    out.push('\n');
    for row in &rows {
        out.push_str(&format_row(row));
        out.push('\n');
    }
    out
}

pub fn render_pangenomes_by_collection(records: &[PangenomeRecord], details: bool) -> String {
    if records.is_empty() {
        return "No pangenomes matched.\n".to_string();
    }

    let mut by_collection: BTreeMap<&str, Vec<&PangenomeRecord>> = BTreeMap::new();
    for record in records {
        by_collection
            .entry(record.collection_release.collection_name.as_str())
            .or_default()
            .push(record);
    }

    let mut out = String::new();
    for (collection, group) in by_collection {
        out.push_str(&format!("{collection}:\n"));
        if let Some(first) = group.first() {
            out.push_str(&format!("  release: {}\n", first.collection_release.version));
        }
        out.push_str(&format!("  pangenome_count: {}\n", group.len()));
        if details {
            out.push_str("  pangenomes:\n");
            for record in group {
                out.push_str(&format!("    - name: {}\n", record.display_name()));
                out.push_str(&format!("      genome_count: {}\n", record.genome_count));
                out.push_str(&format!(
                    "      taxonomy: {}\n",
                    record.taxon_lineage().join(";")
                ));
            }
        }
        out.push('\n');
    }
    out
}

pub fn search_tsv(records: &[PangenomeRecord]) -> String {
    let mut out = String::from("Collection\tRelease\tGenomes\tTaxonomy\n");
    for record in records {
        out.push_str(&format!(
            "{}\t{}\t{}\t{}\n",
            record.collection_release.collection_name,
            record.collection_release.version,
            record.genome_count,
            record.taxon_lineage().join(";")
        ));
    }
    out
}

pub fn render_metrics(metrics: &PangenomeMetrics) -> String {
    format!(
        "pangenome {id}:\n\
           genomes: {genomes}\n\
           genes: {genes}\n\
           gene families: {families}\n\
           core gene families: {core}\n\
           soft-core gene families: {soft_core}\n",
        id = metrics.id,
        genomes = metrics.genome_count,
        genes = metrics.gene_count,
        families = metrics.gene_family_count,
        core = metrics.core_gene_family_count,
        soft_core = metrics.soft_core_gene_family_count,
    )
}

pub fn render_match(result: &MatchResult) -> String {
    format!(
        "Best match: {name} (pangenome {id}, collection {collection})\n\
           reference: {reference}\n\
           distance: {distance}\n\
           p-value: {p_value}\n\
           shared hashes: {hashes}\n",
        name = result.pangenome.display_name(),
        id = result.pangenome.id,
        collection = result.collection.name,
        reference = result.best.reference_id,
        distance = result.best.distance,
        p_value = result.best.p_value,
        hashes = result.best.shared_hashes,
    )
}

pub fn render_download_outcomes(outcomes: &[DownloadOutcome]) -> String {
    let mut out = String::new();
    for outcome in outcomes {
        match &outcome.result {
            Ok(path) => out.push_str(&format!(
                "downloaded {} ({}) -> {}\n",
                outcome.taxon, outcome.pangenome_id, path
            )),
            Err(message) => out.push_str(&format!(
                "FAILED {} ({}): {}\n",
                outcome.taxon, outcome.pangenome_id, message
            )),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{CollectionReleaseRef, ReleaseRecord, Taxon, Taxonomy, TaxonomySource};
    use crate::domain::PangenomeId;

    fn pangenome(collection: &str, lineage: &[&str], genomes: u64) -> PangenomeRecord {
        PangenomeRecord {
            id: PangenomeId(1),
            genome_count: genomes,
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
            genome_names: Vec::new(),
        }
    }

    #[test]
    fn collections_table_is_aligned() {
        let collections = vec![CollectionRecord {
            id: 1,
            name: "GTDB_all".to_string(),
            description: "GTDB derived pangenomes".to_string(),
            releases: vec![ReleaseRecord {
                version: "1.2".to_string(),
                date: "2025-03-01".to_string(),
                latest: true,
                pangenome_count: 42,
                taxonomy_source: Some(TaxonomySource {
                    name: "GTDB".to_string(),
                    version: "r220".to_string(),
                }),
            }],
        }];
        let rendered = render_collections(&collections);
        assert!(rendered.contains("GTDB_all"));
        assert!(rendered.contains("GTDB:r220"));
        assert!(rendered.lines().count() == 2);
    }

    #[test]
    fn grouped_rendering_sorts_collections() {
        let records = vec![
            pangenome("RefSeq", &["g__B"], 2),
            pangenome("GTDB_all", &["g__A"], 3),
        ];
        let rendered = render_pangenomes_by_collection(&records, true);
        let gtdb = rendered.find("GTDB_all:").unwrap();
        let refseq = rendered.find("RefSeq:").unwrap();
        assert!(gtdb < refseq);
        assert!(rendered.contains("genome_count: 3"));
    }

    #[test]
    fn metrics_rendering_lists_counts() {
        let metrics = PangenomeMetrics {
            id: PangenomeId(9),
            genome_count: 120,
            gene_count: 540_000,
            gene_family_count: 8_200,
            core_gene_family_count: 2_900,
            soft_core_gene_family_count: 3_100,
            partition_count: 3,
        };
        let rendered = render_metrics(&metrics);
        assert!(rendered.starts_with("pangenome 9:"));
        assert!(rendered.contains("core gene families: 2900"));
    }

    #[test]
    fn tsv_has_header_and_rows() {
        let records = vec![pangenome("GTDB_all", &["d__Bacteria", "g__A"], 5)];
        let tsv = search_tsv(&records);
        let mut lines = tsv.lines();
        assert_eq!(lines.next(), Some("Collection\tRelease\tGenomes\tTaxonomy"));
        assert_eq!(lines.next(), Some("GTDB_all\t1.0\t5\td__Bacteria;g__A"));
    }
}
