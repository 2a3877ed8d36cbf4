//! Error types for site-comfort pipelines.

use thiserror::Error;

/// Result type alias using ComfortError.
pub type ComfortResult<T> = Result<T, ComfortError>;

/// Primary error type for ingestion, scoring and storage.
#[derive(Debug, Error)]
pub enum ComfortError {
    // === Upstream Errors ===
    #[error("Fetch failed for {source_name}: {message}")]
    Fetch {
        source_name: String,
        message: String,
    },

    #[error("Upstream returned HTTP {status} for {source_name}")]
    UpstreamStatus { source_name: String, status: u16 },

    #[error("Response schema mismatch ({schema}): {message}")]
    SchemaMismatch { schema: String, message: String },

    // === Storage Errors ===
    #[error("Store error: {0}")]
    Store(String),

    // === Configuration Errors ===
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid rating scale: {0}")]
    InvalidRatingScale(String),

    #[error("Missing credential: environment variable {0} is not set")]
    MissingCredential(String),
}

impl ComfortError {
    pub fn schema(schema: impl Into<String>, message: impl Into<String>) -> Self {
        ComfortError::SchemaMismatch {
            schema: schema.into(),
            message: message.into(),
        }
    }

    pub fn fetch(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        ComfortError::Fetch {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Whether this error happened before anything was written.
    ///
    /// Fetch and schema failures abort a run ahead of the persist phase, so the
    /// scheduler can simply retry on its next invocation.
    pub fn is_pre_persist(&self) -> bool {
        matches!(
            self,
            ComfortError::Fetch { .. }
                | ComfortError::UpstreamStatus { .. }
                | ComfortError::SchemaMismatch { .. }
                | ComfortError::MissingCredential(_)
        )
    }

    /// Short stable label used for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            ComfortError::Fetch { .. } | ComfortError::UpstreamStatus { .. } => "fetch",
            ComfortError::SchemaMismatch { .. } => "schema_mismatch",
            ComfortError::Store(_) => "store",
            ComfortError::InvalidConfig(_) | ComfortError::InvalidRatingScale(_) => "config",
            ComfortError::MissingCredential(_) => "credential",
        }
    }
}

impl From<serde_json::Error> for ComfortError {
    fn from(err: serde_json::Error) -> Self {
        ComfortError::schema("json", err.to_string())
    }
}
