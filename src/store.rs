use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use directories::BaseDirs;
use serde::{Deserialize, Serialize};

use crate::error::PangbankError;

/// Filesystem layout for downloaded artifacts and the per-user sketch cache.
#[derive(Debug, Clone)]
pub struct OutputStore {
    outdir: Utf8PathBuf,
    sketch_root: Utf8PathBuf,
}

impl OutputStore {
    pub fn new(outdir: Utf8PathBuf) -> Result<Self, PangbankError> {
        let sketch_root = BaseDirs::new()
            .and_then(|dirs| {
                Utf8PathBuf::from_path_buf(
                    dirs.home_dir().join(".cache").join("pangbank").join("sketches"),
                )
                .ok()
            })
            .ok_or_else(|| {
                PangbankError::Filesystem("unable to resolve cache directory".to_string())
            })?;

        Ok(Self {
            outdir,
            sketch_root,
        })
    }

    pub fn new_with_paths(outdir: Utf8PathBuf, sketch_root: Utf8PathBuf) -> Self {
        Self {
            outdir,
            sketch_root,
        }
    }

    pub fn outdir(&self) -> &Utf8Path {
        &self.outdir
    }

    pub fn sketch_root(&self) -> &Utf8Path {
        &self.sketch_root
    }

    pub fn sketch_path(&self, collection_name: &str, release_version: &str) -> Utf8PathBuf {
        self.sketch_root
            .join(format!("collection_{collection_name}_{release_version}.msh"))
    }

    pub fn pangenome_dir(&self, taxon: &str) -> Utf8PathBuf {
        self.outdir.join(taxon.replace(' ', "_"))
    }

    pub fn pangenome_path(&self, taxon: &str) -> Utf8PathBuf {
        self.pangenome_dir(taxon).join("pangenome.h5")
    }

    pub fn metadata_path(&self, taxon: &str) -> Utf8PathBuf {
        self.pangenome_dir(taxon).join("metadata.json")
    }

    pub fn search_tsv_path(&self) -> Utf8PathBuf {
        self.outdir.join("pangenomes.tsv")
    }

    pub fn ensure_outdir(&self) -> Result<(), PangbankError> {
        fs::create_dir_all(self.outdir.as_std_path())
            .map_err(|err| PangbankError::Filesystem(err.to_string()))
    }

    pub fn ensure_sketch_root(&self) -> Result<(), PangbankError> {
        fs::create_dir_all(self.sketch_root.as_std_path())
            .map_err(|err| PangbankError::Filesystem(err.to_string()))
    }

    pub fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), PangbankError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent.as_std_path())
                .map_err(|err| PangbankError::Filesystem(err.to_string()))?;
        }
        let tmp_path = path.with_extension("tmp");
        fs::write(tmp_path.as_std_path(), content)
            .map_err(|err| PangbankError::Filesystem(err.to_string()))?;
        fs::rename(tmp_path.as_std_path(), path.as_std_path())
            .map_err(|err| PangbankError::Filesystem(err.to_string()))?;
        Ok(())
    }

    pub fn write_metadata(
        path: &Utf8Path,
        metadata: &DownloadMetadata,
    ) -> Result<(), PangbankError> {
        let content = serde_json::to_vec_pretty(metadata)
            .map_err(|err| PangbankError::Filesystem(err.to_string()))?;
        Self::write_bytes_atomic(path, &content)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadMetadata {
    pub source: String,
    pub pangenome_id: u64,
    pub collection: String,
    pub taxon: String,
    pub downloaded_at: String,
    pub tool: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> OutputStore {
        OutputStore::new_with_paths(
            Utf8PathBuf::from("/tmp/pangbank-out"),
            Utf8PathBuf::from("/tmp/pangbank-sketches"),
        )
    }

    #[test]
    fn layout_paths() {
        let store = store();
        assert_eq!(
            store.sketch_path("GTDB_all", "1.2"),
            Utf8PathBuf::from("/tmp/pangbank-sketches/collection_GTDB_all_1.2.msh")
        );
        assert_eq!(
            store.pangenome_path("s__Escherichia coli"),
            Utf8PathBuf::from("/tmp/pangbank-out/s__Escherichia_coli/pangenome.h5")
        );
        assert_eq!(
            store.search_tsv_path(),
            Utf8PathBuf::from("/tmp/pangbank-out/pangenomes.tsv")
        );
    }

    #[test]
    fn atomic_write_replaces_content() {
        let temp = tempfile::tempdir().unwrap();
        let path =
            Utf8PathBuf::from_path_buf(temp.path().join("nested").join("metadata.json")).unwrap();

        OutputStore::write_bytes_atomic(&path, b"first").unwrap();
        OutputStore::write_bytes_atomic(&path, b"second").unwrap();

        assert_eq!(fs::read(path.as_std_path()).unwrap(), b"second");
        assert!(!path.with_extension("tmp").as_std_path().exists());
    }
}
