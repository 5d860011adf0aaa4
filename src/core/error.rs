use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ScanError {
    #[error("Cannot parse config: {0}")]
    ConfigParsingError(String),
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
    #[error("Invalid dataset urn: {0}")]
    InvalidDatasetUrn(String),
    #[error("Update time not found: {0}")]
    UpdateTimeNotFound(String),
    #[error("Catalog listing failed: {0}")]
    CatalogListingFailure(String),
    #[error("Catalog connection failed: {0}")]
    CatalogConnectionFailure(String),
    #[error("Invalid work descriptor: {0}")]
    InvalidWorkDescriptor(String),
    #[error("Scan task failed: {0}")]
    TaskFailure(String),
    #[error("IO error: {0}")]
    IoError(String),
}

impl From<std::io::Error> for ScanError {
    fn from(err: std::io::Error) -> Self {
        ScanError::IoError(err.to_string())
    }
}

impl From<object_store::Error> for ScanError {
    fn from(err: object_store::Error) -> Self {
        ScanError::IoError(err.to_string())
    }
}
