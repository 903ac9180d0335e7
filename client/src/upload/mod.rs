//! Upload orchestration.
//!
//! - [`orchestrator`] - the submission state machine and progress reporting
//! - [`transport`] - payload assembly and the [`Transport`] seam (HTTP by default)
//! - [`response`] - decoding download URLs out of the service's reply

pub mod orchestrator;
pub mod response;
pub mod transport;

pub use orchestrator::{ProgressReporter, UploadOrchestrator, UploadState};
pub use response::parse_artifacts;
pub use transport::{HttpTransport, PartBody, PayloadPart, Transport, TransportResponse, UploadPayload};
