use thiserror::Error;

/// Main error type for the risk service
#[derive(Error, Debug)]
pub enum RiskError {
    // Input errors
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    // Model lifecycle errors
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Invalid model artifact: {0}")]
    Artifact(String),

    #[error("Feature store unavailable: {0}")]
    StoreUnavailable(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl RiskError {
    /// Short machine-readable kind, used in API error bodies and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::NotFound(_) => "not_found",
            Self::ModelUnavailable(_) => "model_unavailable",
            Self::Inference(_) => "inference_error",
            Self::Artifact(_) => "artifact_error",
            Self::StoreUnavailable(_) => "store_unavailable",
            Self::Config(_) => "config_error",
            Self::Database(_) | Self::Migration(_) => "database_error",
            Self::Json(_) => "serialization_error",
            Self::Io(_) => "io_error",
            Self::Internal(_) | Self::Other(_) => "internal_error",
        }
    }

    /// Client errors are the caller's fault and must never be retried as-is.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::NotFound(_))
    }

    /// Only an unloaded model is worth retrying after backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ModelUnavailable(_))
    }
}

/// Result type alias for RiskError
pub type Result<T> = std::result::Result<T, RiskError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_flags() {
        assert!(RiskError::Validation("x".into()).is_client_error());
        assert!(!RiskError::Validation("x".into()).is_retryable());
        assert!(RiskError::ModelUnavailable("loading".into()).is_retryable());
        assert!(!RiskError::Inference("shape".into()).is_retryable());
        assert!(!RiskError::Inference("shape".into()).is_client_error());
    }

    #[test]
    fn kinds_are_stable() {
        assert_eq!(RiskError::Validation(String::new()).kind(), "validation_error");
        assert_eq!(
            RiskError::ModelUnavailable(String::new()).kind(),
            "model_unavailable"
        );
        assert_eq!(RiskError::Inference(String::new()).kind(), "inference_error");
        assert_eq!(
            RiskError::Internal("boom".into()).to_string(),
            "Internal error: boom"
        );
    }
}
