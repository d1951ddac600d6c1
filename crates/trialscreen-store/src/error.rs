use thiserror::Error;
use trialscreen_core::DataFormatError;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("criteria file not found: {0}")]
    CriteriaNotFound(std::path::PathBuf),

    #[error("no results for query")]
    NoResults,

    #[error("invalid delimiter {0:?}: must be a single printable ASCII character other than '\"' or '\\''")]
    InvalidDelimiter(char),

    #[error("data format error: {0}")]
    DataFormat(#[from] DataFormatError),

    #[cfg(feature = "duckdb")]
    #[error("duckdb error: {0}")]
    DuckDb(#[from] ::duckdb::Error),

    #[error("{0}")]
    Other(String),
}
