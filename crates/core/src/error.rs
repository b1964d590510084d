//! Error types for the kbchat domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use std::path::PathBuf;
use thiserror::Error;

/// The top-level error type for all kbchat operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Configuration errors ---
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    // --- Storage errors ---
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    // --- Extraction errors ---
    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    // --- Generation errors ---
    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    // --- File source errors ---
    #[error("File source error: {0}")]
    Source(#[from] SourceError),
}

impl Error {
    /// Shorthand for an `InvalidConfig` error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failures from an LLM backend.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// The answer path failed. Never retried automatically.
#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    #[error("{0}")]
    Provider(#[from] ProviderError),

    #[error("Completion did not finish within {timeout_secs}s")]
    Timeout { timeout_secs: u64 },
}

/// A write to the persisted repository failed; the mutation was not committed.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to create storage directory {path}: {reason}")]
    CreateDir { path: PathBuf, reason: String },

    #[error("Failed to serialize repository state: {0}")]
    Serialize(String),

    #[error("Failed to write {path}: {reason}")]
    Write { path: PathBuf, reason: String },
}

/// A single file could not be turned into text.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Failed to read {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("PDF extraction failed for {path}: {reason}")]
    Pdf { path: PathBuf, reason: String },

    #[error("CSV parsing failed for {path}: {reason}")]
    Csv { path: PathBuf, reason: String },

    #[error("Spreadsheet parsing failed for {path}: {reason}")]
    Spreadsheet { path: PathBuf, reason: String },
}

/// Failures talking to the file source (cloud drive).
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Not authenticated: {0}")]
    NotAuthenticated(String),

    #[error("Authorization failed: {0}")]
    AuthorizationFailed(String),

    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("I/O error: {0}")]
    Io(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = Error::Generation(GenerationError::Provider(ProviderError::ApiError {
            status_code: 429,
            message: "Too many requests".into(),
        }));
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn storage_error_displays_path() {
        let err = Error::Storage(StorageError::Write {
            path: PathBuf::from("/readonly/docs.json"),
            reason: "permission denied".into(),
        });
        assert!(err.to_string().contains("/readonly/docs.json"));
        assert!(err.to_string().contains("permission denied"));
    }

    #[test]
    fn invalid_config_shorthand() {
        let err = Error::invalid_config("overlap must be smaller than size");
        assert!(matches!(err, Error::InvalidConfig { .. }));
        assert!(err.to_string().contains("overlap"));
    }

    #[test]
    fn generation_timeout_message() {
        let err = GenerationError::Timeout { timeout_secs: 30 };
        assert_eq!(err.to_string(), "Completion did not finish within 30s");
    }
}
