use std::fs::File;
use std::path::Path;
use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;

use crate::config::ApiConfig;
use crate::domain::{PangenomeId, SearchFilters};
use crate::error::PangbankError;

const PAGE_LIMIT: usize = 50;

#[derive(Debug, Clone, Deserialize)]
pub struct CollectionRecord {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub releases: Vec<ReleaseRecord>,
}

impl CollectionRecord {
    pub fn latest_release(&self) -> Option<&ReleaseRecord> {
        self.releases.iter().find(|release| release.latest)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseRecord {
    pub version: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub latest: bool,
    #[serde(default)]
    pub pangenome_count: u64,
    #[serde(default)]
    pub taxonomy_source: Option<TaxonomySource>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaxonomySource {
    pub name: String,
    #[serde(default)]
    pub version: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PangenomeRecord {
    pub id: PangenomeId,
    #[serde(default)]
    pub genome_count: u64,
    #[serde(default)]
    pub gene_count: u64,
    #[serde(default)]
    pub gene_family_count: u64,
    pub collection_release: CollectionReleaseRef,
    pub taxonomy: Taxonomy,
    #[serde(default)]
    pub genome_names: Vec<String>,
}

impl PangenomeRecord {
    /// Taxon names sorted from the shallowest to the deepest rank.
    pub fn taxon_lineage(&self) -> Vec<String> {
        let mut taxa: Vec<&Taxon> = self.taxonomy.taxa.iter().collect();
        taxa.sort_by_key(|taxon| taxon.depth);
        taxa.into_iter().map(|taxon| taxon.name.clone()).collect()
    }

    pub fn display_name(&self) -> String {
        self.taxon_lineage()
            .last()
            .cloned()
            .unwrap_or_else(|| format!("pangenome_{}", self.id))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollectionReleaseRef {
    pub collection_name: String,
    #[serde(default)]
    pub version: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Taxonomy {
    #[serde(default)]
    pub taxa: Vec<Taxon>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Taxon {
    pub name: String,
    #[serde(default)]
    pub depth: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PangenomeMetrics {
    pub id: PangenomeId,
    #[serde(default)]
    pub genome_count: u64,
    #[serde(default)]
    pub gene_count: u64,
    #[serde(default)]
    pub gene_family_count: u64,
    #[serde(default)]
    pub core_gene_family_count: u64,
    #[serde(default)]
    pub soft_core_gene_family_count: u64,
    #[serde(default)]
    pub partition_count: u64,
}

pub trait PangbankClient: Send + Sync {
    fn list_collections(&self, name: Option<&str>)
    -> Result<Vec<CollectionRecord>, PangbankError>;
    fn search_pangenomes(
        &self,
        filters: &SearchFilters,
    ) -> Result<Vec<PangenomeRecord>, PangbankError>;
    fn get_metrics(&self, id: PangenomeId) -> Result<PangenomeMetrics, PangbankError>;
    fn get_download_url(&self, id: PangenomeId) -> Result<String, PangbankError>;
    fn download_pangenome_file(
        &self,
        id: PangenomeId,
        destination: &Path,
    ) -> Result<(), PangbankError>;
    fn download_sketch(&self, collection_id: u64, destination: &Path)
    -> Result<(), PangbankError>;
}

#[derive(Clone)]
pub struct PangbankHttpClient {
    client: Client,
    config: ApiConfig,
}

impl PangbankHttpClient {
    pub fn new(config: ApiConfig) -> Result<Self, PangbankError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("pangbank-cli/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| PangbankError::ApiHttp(err.to_string()))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|err| PangbankError::ApiHttp(err.to_string()))?;

        Ok(Self { client, config })
    }

    fn send_with_retries<F>(
        &self,
        mut make_req: F,
    ) -> Result<reqwest::blocking::Response, PangbankError>
    where
        F: FnMut() -> reqwest::blocking::RequestBuilder,
    {
        const MAX_RETRIES: usize = 3;
        const BASE_DELAY_MS: u64 = 200;
        let mut attempt = 0usize;
        loop {
            let response = make_req().send();
            match response {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if attempt < MAX_RETRIES && is_retryable_status(status) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Ok(resp);
                }
                Err(err) => {
                    if attempt < MAX_RETRIES && is_retryable_error(&err) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    if err.is_timeout() {
                        return Err(PangbankError::ApiTimeout(err.to_string()));
                    }
                    return Err(PangbankError::ApiHttp(err.to_string()));
                }
            }
        }
    }

    fn handle_status(
        response: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, PangbankError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "PanGBank request failed".to_string());
        Err(PangbankError::ApiStatus { status, message })
    }

    fn write_response_to_file(
        mut response: reqwest::blocking::Response,
        destination: &Path,
    ) -> Result<(), PangbankError> {
        let mut file = File::create(destination)
            .map_err(|err| PangbankError::Filesystem(err.to_string()))?;
        std::io::copy(&mut response, &mut file)
            .map_err(|err| PangbankError::Filesystem(err.to_string()))?;
        Ok(())
    }

    fn fetch_pangenome_page(
        &self,
        filters: &SearchFilters,
        offset: usize,
    ) -> Result<Vec<PangenomeRecord>, PangbankError> {
        let url = self.config.endpoint("/pangenomes/");
        let response = self.send_with_retries(|| {
            let mut request = self
                .client
                .get(&url)
                .query(&[("offset", offset.to_string()), ("limit", PAGE_LIMIT.to_string())])
                .query(&[("substring_match", "true")]);
            if let Some(taxon) = &filters.taxon {
                request = request.query(&[("taxon_name", taxon.as_str())]);
            }
            if let Some(genome) = &filters.genome {
                request = request.query(&[("genome_name", genome.as_str())]);
            }
            if let Some(collection) = &filters.collection {
                request = request.query(&[("collection_name", collection.as_str())]);
            }
            request
        })?;
        let response = Self::handle_status(response)?;
        response
            .json()
            .map_err(|err| PangbankError::ApiHttp(err.to_string()))
    }
}

impl PangbankClient for PangbankHttpClient {
    fn list_collections(
        &self,
        name: Option<&str>,
    ) -> Result<Vec<CollectionRecord>, PangbankError> {
        let url = self.config.endpoint("/collections/");
        let response = self.send_with_retries(|| {
            let mut request = self
                .client
                .get(&url)
                .query(&[("only_latest_release", "true")]);
            if let Some(name) = name {
                request = request.query(&[("collection_name", name)]);
            }
            request
        })?;
        let response = Self::handle_status(response)?;
        response
            .json()
            .map_err(|err| PangbankError::ApiHttp(err.to_string()))
    }

    fn search_pangenomes(
        &self,
        filters: &SearchFilters,
    ) -> Result<Vec<PangenomeRecord>, PangbankError> {
        filters.validate()?;

        let mut all = Vec::new();
        let mut offset = 0usize;
        loop {
            let page = self.fetch_pangenome_page(filters, offset)?;
            tracing::debug!(offset, count = page.len(), "fetched pangenome page");
            let short_page = page.len() < PAGE_LIMIT;
            all.extend(page);
            if short_page {
                break;
            }
            offset += PAGE_LIMIT;
        }

        all.retain(|record| filters.matches(record));
        tracing::info!(count = all.len(), "pangenomes matched the search filters");
        Ok(all)
    }

    fn get_metrics(&self, id: PangenomeId) -> Result<PangenomeMetrics, PangbankError> {
        let url = self.config.endpoint(&format!("/pangenomes/{id}/metrics"));
        let response = self.send_with_retries(|| self.client.get(&url))?;
        if response.status().as_u16() == 404 {
            return Err(PangbankError::PangenomeNotFound(id.to_string()));
        }
        let response = Self::handle_status(response)?;
        response
            .json()
            .map_err(|err| PangbankError::ApiHttp(err.to_string()))
    }

    fn get_download_url(&self, id: PangenomeId) -> Result<String, PangbankError> {
        // Confirms the id resolves before handing out a location.
        self.get_metrics(id)?;
        Ok(self.config.endpoint(&format!("/pangenomes/{id}/file")))
    }

    fn download_pangenome_file(
        &self,
        id: PangenomeId,
        destination: &Path,
    ) -> Result<(), PangbankError> {
        let url = self.config.endpoint(&format!("/pangenomes/{id}/file"));
        let response = self.send_with_retries(|| self.client.get(&url))?;
        if response.status().as_u16() == 404 {
            return Err(PangbankError::PangenomeNotFound(id.to_string()));
        }
        let response = Self::handle_status(response)?;
        Self::write_response_to_file(response, destination)
    }

    fn download_sketch(
        &self,
        collection_id: u64,
        destination: &Path,
    ) -> Result<(), PangbankError> {
        let url = self
            .config
            .endpoint(&format!("/collections/{collection_id}/mash_sketch"));
        let response = self.send_with_retries(|| self.client.get(&url))?;
        if response.status().as_u16() == 404 {
            return Err(PangbankError::CollectionNotFound(collection_id.to_string()));
        }
        let response = Self::handle_status(response)?;
        Self::write_response_to_file(response, destination)
    }
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}
