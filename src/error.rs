use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum PangbankError {
    #[error("no search criteria given: provide at least one of --taxon, --genome, --collection")]
    EmptyFilter,

    #[error("PanGBank request failed: {0}")]
    ApiHttp(String),

    #[error("PanGBank request timed out: {0}")]
    ApiTimeout(String),

    #[error("PanGBank returned status {status}: {message}")]
    ApiStatus { status: u16, message: String },

    #[error("collection not found: {0}")]
    CollectionNotFound(String),

    #[error("pangenome not found: {0}")]
    PangenomeNotFound(String),

    #[error("expected a single collection named {name}, the API returned {count}")]
    AmbiguousCollection { name: String, count: usize },

    #[error("required tool not found on PATH: {0}")]
    MissingTool(String),

    #[error("{tool} failed: {message}")]
    ToolExecution { tool: String, message: String },

    #[error("tool invocation timed out: {0}")]
    ToolTimeout(String),

    #[error("invalid genome file: {0}")]
    InvalidGenome(String),

    #[error("unparseable distance output: {0}")]
    DistParse(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("distance computation failed for every candidate collection: {}", .failures.join("; "))]
    MatchFailed { failures: Vec<String> },
}
