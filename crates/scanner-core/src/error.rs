use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScannerError {
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Unknown symbol: {0}")]
    UnknownSymbol(String),

    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Catalog error: {0}")]
    CatalogError(String),
}

impl ScannerError {
    /// True for the data-unavailable family: a batch scan reports these as
    /// a no-data status instead of failing.
    pub fn is_data_unavailable(&self) -> bool {
        matches!(
            self,
            ScannerError::InsufficientData(_)
                | ScannerError::UnknownSymbol(_)
                | ScannerError::ProviderError(_)
        )
    }
}
