use thiserror::Error;

/// Application-wide error types for metascrape.
#[derive(Error, Debug)]
pub enum AppError {
    /// The `url` query parameter is missing, blank, or repeated.
    #[error("url is required")]
    InvalidInput,

    /// The availability probe failed before any body was fetched.
    #[error("url is unreachable: {0}")]
    UnreachableTarget(String),

    /// The full fetch produced no readable text.
    #[error("empty body")]
    EmptyBody,

    /// HTTP request failed (building the client or sending the request).
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Network/connection error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Request timed out.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The blocking HTML extraction task did not complete.
    #[error("Extraction task failed: {0}")]
    ExtractionFailed(String),
}

impl AppError {
    /// Returns true for the failures a caller can cause with a bad request.
    ///
    /// These are the only errors the extraction endpoint reports; everything
    /// else is folded into one of them before it reaches the response.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AppError::InvalidInput | AppError::UnreachableTarget(_) | AppError::EmptyBody
        )
    }
}
