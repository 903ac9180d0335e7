//! # Report Backend - development stand-in for the weekly report service
//!
//! Speaks the report service's HTTP contract so the client can be exercised
//! end to end without the real generator.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Multipart  │────▶│  Artifact   │────▶│  Download   │
//! │   upload    │     │   store     │     │    URLs     │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │  SSE logs   │
//! └─────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Handler error type
//! - [`store`] - In-memory artifact store
//! - [`api`] - HTTP server, wire types, log broadcaster

pub mod error;
pub mod store;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{ServerError, ServerResult};
pub use store::{ArtifactStore, StoredArtifact};

pub use api::logs::{LogBroadcaster, LogEntry, LogLevel, LOG_BROADCASTER};
pub use api::types::{error_response, PairedUploadResponse, SingleUploadResponse, UploadResponse};

// Server
pub mod server {
    pub use crate::api::server::{router, start_server, AppState, MAX_BODY_BYTES};
}
