// file: src/error.rs
// description: Custom error types and result type aliases
// reference: https://docs.rs/thiserror

use crate::geocode::GeocodeFailure;
use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ServiceError>;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Elasticsearch returned {status} ({error_type}): {reason}")]
    Elasticsearch {
        status: StatusCode,
        error_type: String,
        reason: String,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Geocoding failed: {0}")]
    Geocoding(#[from] GeocodeFailure),

    #[error("Dataset download failed: {0}")]
    Download(String),

    #[error("Reindex failed: {0}")]
    Reindex(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ServiceError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ServiceError::Elasticsearch { status, .. } if *status == StatusCode::NOT_FOUND
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_detection() {
        let err = ServiceError::Elasticsearch {
            status: StatusCode::NOT_FOUND,
            error_type: "resource_not_found_exception".to_string(),
            reason: "stored script [x] does not exist".to_string(),
        };
        assert!(err.is_not_found());

        let err = ServiceError::Validation("bad".to_string());
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_elasticsearch_error_display() {
        let err = ServiceError::Elasticsearch {
            status: StatusCode::UNAUTHORIZED,
            error_type: "security_exception".to_string(),
            reason: "unable to authenticate".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("401"));
        assert!(message.contains("security_exception"));
    }
}
