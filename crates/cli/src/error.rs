use connectors::{error::ServiceError, file::csv::error::FileError};
use engine_config::error::ConfigError;
use model::{pagination::page_size::InvalidPageSize, query::QueryError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Failed to load settings: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to open source: {0}")]
    Source(#[from] FileError),

    #[error("Query failed: {0}")]
    Service(#[from] ServiceError),

    #[error("Invalid query: {0}")]
    Query(#[from] QueryError),

    #[error("Invalid page size: {0}")]
    PageSize(#[from] InvalidPageSize),

    #[error("Failed to write output: {0}")]
    Output(#[from] std::io::Error),

    #[error("Failed to serialize data to JSON: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    #[error("Shutdown requested")]
    ShutdownRequested,
}
