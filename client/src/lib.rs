//! # Weekly Report - spreadsheet intake and report upload client
//!
//! Validates a weekly timesheet workbook and its companion files, previews
//! every sheet locally, uploads everything to the report service and fetches
//! the generated report and presentation.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Selected   │────▶│  Validator  │────▶│  Orchestr.  │────▶│  Download   │
//! │    files    │     │ (type/size) │     │ (multipart) │     │ Dispatcher  │
//! └─────────────┘     └──────┬──────┘     └─────────────┘     └─────────────┘
//!                            │
//!                            ▼
//!                     ┌─────────────┐     ┌─────────────┐
//!                     │  Workbook   │────▶│  Preview    │
//!                     │   Parser    │     │   Model     │
//!                     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use weekly_report::{ClientConfig, DownloadDispatcher, UploadOrchestrator, UploadRequest, UploadableFile};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let config = ClientConfig::from_env().unwrap();
//!     let orchestrator = UploadOrchestrator::http(config);
//!
//!     let excel = UploadableFile::load("week.xlsx").await.unwrap();
//!     let request = UploadRequest::new(excel)
//!         .project_title("Apollo")
//!         .week_range("01 Jan 2024 - 07 Jan 2024")
//!         .company_name("Acme");
//!
//!     orchestrator.submit(request).unwrap();
//!     let state = orchestrator.settled().await;
//!     DownloadDispatcher::http(".").dispatch(state.artifacts()).await;
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Error types per pipeline stage
//! - [`models`] - Files, previews, requests, progress, artifacts
//! - [`config`] - Constants and environment configuration
//! - [`validation`] - Local file and field checks
//! - [`workbook`] - Spreadsheet decoding
//! - [`preview`] - Selected-sheet state
//! - [`upload`] - Submission state machine and transport
//! - [`download`] - Artifact retrieval
//! - [`logs`] - Live log stream viewer model

// Core modules
pub mod config;
pub mod error;
pub mod models;

// Intake
pub mod preview;
pub mod validation;
pub mod workbook;

// Network
pub mod download;
pub mod logs;
pub mod upload;

// =============================================================================
// Re-exports - Errors
// =============================================================================

pub use error::{
    ClientError, ClientResult, ConfigError, DownloadError, ParseError, ParseResult, SubmitError,
    TransferError, TransferResult, ValidationError, ValidationResult,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    ArtifactKind, CellValue, FileKind, GeneratedArtifact, PreviewSet, SheetPreview, SubmissionMode,
    UploadProgress, UploadRequest, UploadableFile, WeekRange,
};

// =============================================================================
// Re-exports - Intake
// =============================================================================

pub use config::ClientConfig;
pub use preview::PreviewModel;
pub use validation::{check_request, validate, FilePolicy, KindRule};
pub use workbook::{parse_workbook, parse_workbook_in_background, parse_workbook_with, ParseOptions};

// =============================================================================
// Re-exports - Upload & Download
// =============================================================================

pub use download::{DispatchReport, DownloadDispatcher, DownloadOutcome, Fetcher, HttpFetcher};
pub use logs::{follow_logs, parse_sse_line, LogBuffer, LogEntry, LogLevel};
pub use upload::{HttpTransport, ProgressReporter, Transport, TransportResponse, UploadOrchestrator, UploadPayload, UploadState};
