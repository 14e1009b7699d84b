use camino::Utf8PathBuf;

use crate::api::{PangbankClient, PangenomeRecord};
use crate::error::PangbankError;
use crate::store::{DownloadMetadata, OutputStore};

#[derive(Debug, Clone)]
pub struct DownloadOutcome {
    pub pangenome_id: u64,
    pub taxon: String,
    pub result: Result<Utf8PathBuf, String>,
}

pub struct Downloader<'a, C: PangbankClient> {
    client: &'a C,
    store: &'a OutputStore,
    source: String,
}

impl<'a, C: PangbankClient> Downloader<'a, C> {
    pub fn new(client: &'a C, store: &'a OutputStore, source: String) -> Self {
        Self {
            client,
            store,
            source,
        }
    }

    /// Streams the pangenome artifact into the output store. The file only
    /// appears under its final name once the download completed; an
    /// interrupted transfer leaves nothing behind but the temp file, which
    /// tempfile cleans up on drop.
    pub fn download(&self, record: &PangenomeRecord) -> Result<Utf8PathBuf, PangbankError> {
        let taxon = record.display_name();
        let destination = self.store.pangenome_path(&taxon);
        let parent = destination
            .parent()
            .ok_or_else(|| PangbankError::Filesystem("invalid destination path".to_string()))?;
        std::fs::create_dir_all(parent.as_std_path())
            .map_err(|err| PangbankError::Filesystem(err.to_string()))?;

        let temp = tempfile::Builder::new()
            .prefix("pangenome-dl")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| PangbankError::Filesystem(err.to_string()))?;

        tracing::info!(id = record.id.value(), taxon = %taxon, "downloading pangenome file");
        self.client.download_pangenome_file(record.id, temp.path())?;
        temp.persist(destination.as_std_path())
            .map_err(|err| PangbankError::Filesystem(err.to_string()))?;

        let metadata = DownloadMetadata {
            source: self.source.clone(),
            pangenome_id: record.id.value(),
            collection: record.collection_release.collection_name.clone(),
            taxon: taxon.clone(),
            downloaded_at: chrono::Utc::now().to_rfc3339(),
            tool: format!("pangbank-cli/{}", env!("CARGO_PKG_VERSION")),
        };
        OutputStore::write_metadata(&self.store.metadata_path(&taxon), &metadata)?;

        tracing::info!(path = %destination, "pangenome file saved");
        Ok(destination)
    }

    /// Bulk download with per-item reporting: one record failing never hides
    /// the outcome of the others.
    pub fn download_all(&self, records: &[PangenomeRecord]) -> Vec<DownloadOutcome> {
        records
            .iter()
            .map(|record| DownloadOutcome {
                pangenome_id: record.id.value(),
                taxon: record.display_name(),
                result: self
                    .download(record)
                    .map_err(|err| err.to_string()),
            })
            .collect()
    }
}
