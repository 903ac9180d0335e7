//! Error types for the upload pipeline.
//!
//! Every stage of the pipeline has its own error enum:
//!
//! - [`ValidationError`] - local file and field checks, never sent to the network
//! - [`SubmitError`] - why [`crate::UploadOrchestrator::submit`] refused a request
//! - [`ParseError`] - workbook decoding failures
//! - [`TransferError`] - terminal failures of an upload transfer
//! - [`DownloadError`] - per-artifact retrieval failures
//! - [`ConfigError`] - invalid environment configuration
//! - [`ClientError`] - top-level wrapper used by the CLI
//!
//! Conversion into [`ClientError`] is automatic via `From`, so `?` works
//! across stage boundaries.

use thiserror::Error;

use crate::models::FileKind;

// =============================================================================
// Validation Errors
// =============================================================================

/// A local validation failure for one file or metadata field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Declared MIME type is not allowed for this kind of file.
    #[error("{kind} file has unsupported type '{declared}'")]
    WrongType { kind: FileKind, declared: String },

    /// File is larger than the policy allows.
    #[error("{kind} file is {size} bytes, limit is {max} bytes")]
    TooLarge { kind: FileKind, size: u64, max: u64 },

    /// Required file or metadata field is absent or blank.
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// Field is present but malformed.
    #[error("Invalid value for field '{field}': {reason}")]
    InvalidField { field: String, reason: String },
}

impl ValidationError {
    /// Wire name of the form field this error refers to.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::WrongType { kind, .. } | ValidationError::TooLarge { kind, .. } => {
                kind.field_name()
            }
            ValidationError::MissingField(field) => field,
            ValidationError::InvalidField { field, .. } => field,
        }
    }
}

/// Why a submission was refused before any network activity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    /// One or more local checks failed. Lists every problem found.
    #[error("Invalid submission: {}", join_errors(.0))]
    Invalid(Vec<ValidationError>),

    /// The previous submission succeeded and has not been reset.
    #[error("Previous upload succeeded; reset before submitting again")]
    NotReset,
}

impl SubmitError {
    /// Field names named by an [`SubmitError::Invalid`] error, in check order.
    pub fn fields(&self) -> Vec<&str> {
        match self {
            SubmitError::Invalid(errors) => errors.iter().map(ValidationError::field).collect(),
            SubmitError::NotReset => Vec::new(),
        }
    }
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

// =============================================================================
// Workbook Errors
// =============================================================================

/// Errors while decoding a spreadsheet for preview.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The container could not be opened or a sheet could not be read.
    #[error("Workbook is corrupt or not a spreadsheet: {0}")]
    Corrupt(String),

    /// The workbook declares no sheets.
    #[error("Workbook contains no sheets")]
    EmptyWorkbook,
}

// =============================================================================
// Transfer Errors
// =============================================================================

/// Terminal failure of an upload transfer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    /// Connection could not be established or broke mid-transfer.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Server answered with a non-success status.
    #[error("Server error ({0})")]
    ServerError(u16),

    /// Transfer did not resolve within the configured timeout.
    #[error("Upload timed out")]
    Timeout,

    /// Transfer was cancelled by the caller or superseded.
    #[error("Upload cancelled")]
    Cancelled,

    /// Server answered 2xx but the body matched no known response shape.
    #[error("Unrecognized server response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for TransferError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransferError::Timeout
        } else if let Some(status) = err.status() {
            TransferError::ServerError(status.as_u16())
        } else {
            TransferError::NetworkError(err.to_string())
        }
    }
}

// =============================================================================
// Download Errors
// =============================================================================

/// Failure retrieving one generated artifact.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// HTTP request failed.
    #[error("Download failed: {0}")]
    Network(#[from] reqwest::Error),

    /// Server answered with a non-success status.
    #[error("Download failed with status {0}")]
    Status(u16),

    /// Could not write the artifact to disk.
    #[error("Could not save artifact: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Invalid configuration values.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Backend URL could not be parsed.
    #[error("Invalid backend URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    /// A numeric setting could not be parsed.
    #[error("Invalid value for {name}: '{value}'")]
    InvalidNumber { name: String, value: String },
}

// =============================================================================
// Client Errors (top-level)
// =============================================================================

/// Top-level error for CLI commands.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    Submit(#[from] SubmitError),

    #[error("{0}")]
    Parse(#[from] ParseError),

    #[error("{0}")]
    Transfer(#[from] TransferError),

    #[error("{0}")]
    Download(#[from] DownloadError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Catch-all for user-facing command errors.
    #[error("{0}")]
    Other(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for validation checks.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Result type for workbook parsing.
pub type ParseResult<T> = Result<T, ParseError>;

/// Result type for transfers.
pub type TransferResult<T> = Result<T, TransferError>;

/// Result type for CLI commands.
pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_error_lists_every_field() {
        let err = SubmitError::Invalid(vec![
            ValidationError::MissingField("projectTitle".into()),
            ValidationError::MissingField("companyName".into()),
        ]);
        assert_eq!(err.fields(), vec!["projectTitle", "companyName"]);

        let msg = err.to_string();
        assert!(msg.contains("projectTitle"));
        assert!(msg.contains("companyName"));
    }

    #[test]
    fn test_file_errors_name_the_wire_field() {
        let err = ValidationError::TooLarge {
            kind: FileKind::Logo,
            size: 10,
            max: 5,
        };
        assert_eq!(err.field(), "logoFile");
    }

    #[test]
    fn test_error_conversion_chain() {
        let parse_err = ParseError::EmptyWorkbook;
        let client_err: ClientError = parse_err.into();
        assert!(client_err.to_string().contains("no sheets"));

        let transfer_err = TransferError::ServerError(500);
        let client_err: ClientError = transfer_err.into();
        assert!(client_err.to_string().contains("500"));
    }
}
