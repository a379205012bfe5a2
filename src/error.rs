use thiserror::Error;

/// Main error type for the tablepull pipeline
#[derive(Error, Debug)]
pub enum TablePullError {
    #[error("Invalid cell index ({row}, {column}): indices must be non-negative")]
    InvalidIndex { row: i64, column: i64 },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Blob '{blob}' not found in container '{container}'")]
    BlobNotFound { container: String, blob: String },

    #[error("Connection failed: {message}")]
    Connectivity {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Blob storage request failed: {message}")]
    BlobStorage { message: String },

    #[error("Document analysis failed: {message}")]
    Analysis { message: String },
}

impl TablePullError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a connectivity error with its transport-level source
    pub fn connectivity(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Connectivity {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a blob storage service error
    pub fn blob_storage(message: impl Into<String>) -> Self {
        Self::BlobStorage {
            message: message.into(),
        }
    }

    /// Create a document analysis service error
    pub fn analysis(message: impl Into<String>) -> Self {
        Self::Analysis {
            message: message.into(),
        }
    }
}

/// Result type alias for convenience
pub type TablePullResult<T> = Result<T, TablePullError>;
