//! Multipart payload assembly and the transport seam.
//!
//! [`UploadPayload`] is the wire-neutral form of a submission. A [`Transport`]
//! sends it and hands back the raw response; status interpretation and body
//! parsing happen in the orchestrator so every transport behaves the same.
//!
//! [`HttpTransport`] streams file parts in fixed-size chunks, reporting each
//! chunk to the [`ProgressReporter`] as it is handed to the connection.

use futures::future::BoxFuture;
use futures::stream::{self, Stream};
use futures::{FutureExt, StreamExt};
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, Url};
use std::sync::Arc;

use super::orchestrator::ProgressReporter;
use crate::error::{TransferError, TransferResult};
use crate::models::{FileKind, UploadRequest};

/// Bytes per streamed chunk; one progress tick per chunk.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Content of one multipart field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartBody {
    File {
        file_name: String,
        mime_type: String,
        bytes: Arc<[u8]>,
    },
    Text(String),
}

/// One named multipart field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadPart {
    pub name: String,
    pub body: PartBody,
}

/// Everything a transport needs to send one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPayload {
    parts: Vec<PayloadPart>,
}

impl UploadPayload {
    /// Files first (`excel`, `ppt`, `logoFile`), then metadata fields in key order.
    pub fn from_request(request: &UploadRequest) -> Self {
        let mut parts: Vec<PayloadPart> = request
            .files()
            .map(|(kind, file)| PayloadPart {
                name: kind.field_name().to_string(),
                body: PartBody::File {
                    file_name: file.name().to_string(),
                    mime_type: file.mime_type().to_string(),
                    bytes: file.shared_bytes(),
                },
            })
            .collect();

        parts.extend(request.metadata.iter().map(|(name, value)| PayloadPart {
            name: name.clone(),
            body: PartBody::Text(value.trim().to_string()),
        }));

        Self { parts }
    }

    pub fn parts(&self) -> &[PayloadPart] {
        &self.parts
    }

    pub fn part(&self, name: &str) -> Option<&PayloadPart> {
        self.parts.iter().find(|p| p.name == name)
    }

    pub fn has_file(&self, kind: FileKind) -> bool {
        matches!(
            self.part(kind.field_name()),
            Some(PayloadPart { body: PartBody::File { .. }, .. })
        )
    }

    /// File bytes to transfer; the denominator for progress.
    pub fn total_bytes(&self) -> u64 {
        self.parts
            .iter()
            .map(|p| match &p.body {
                PartBody::File { bytes, .. } => bytes.len() as u64,
                PartBody::Text(_) => 0,
            })
            .sum()
    }

    /// Build a reqwest form whose file parts report progress while streaming.
    pub fn into_form(self, progress: &ProgressReporter) -> TransferResult<Form> {
        let mut form = Form::new();
        for part in self.parts {
            form = match part.body {
                PartBody::Text(value) => form.text(part.name, value),
                PartBody::File {
                    file_name,
                    mime_type,
                    bytes,
                } => {
                    let length = bytes.len() as u64;
                    let body = Body::wrap_stream(chunked(bytes, progress.clone()));
                    let file_part = Part::stream_with_length(body, length)
                        .file_name(file_name)
                        .mime_str(&mime_type)
                        .map_err(|e| TransferError::NetworkError(format!("invalid content type '{}': {}", mime_type, e)))?;
                    form.part(part.name, file_part)
                }
            };
        }
        Ok(form)
    }
}

fn chunked(
    bytes: Arc<[u8]>,
    progress: ProgressReporter,
) -> impl Stream<Item = Result<Vec<u8>, std::io::Error>> + Send + Sync + 'static {
    let len = bytes.len();
    stream::iter((0..len).step_by(CHUNK_SIZE)).map(move |start| {
        let end = (start + CHUNK_SIZE).min(len);
        let chunk = bytes[start..end].to_vec();
        progress.advance(chunk.len() as u64);
        Ok(chunk)
    })
}

/// Raw response from the report service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            content_type: None,
            body: body.into(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends an upload payload somewhere.
///
/// The returned future must own everything it needs: the orchestrator spawns
/// it, may abort it at any await point, and wraps it in a timeout.
pub trait Transport: Send + Sync + 'static {
    fn send(
        &self,
        payload: UploadPayload,
        progress: ProgressReporter,
    ) -> BoxFuture<'static, TransferResult<TransportResponse>>;
}

/// Multipart POST over HTTP.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    url: Url,
}

impl HttpTransport {
    pub fn new(url: Url) -> Self {
        Self::with_client(Client::new(), url)
    }

    pub fn with_client(client: Client, url: Url) -> Self {
        Self { client, url }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl Transport for HttpTransport {
    fn send(
        &self,
        payload: UploadPayload,
        progress: ProgressReporter,
    ) -> BoxFuture<'static, TransferResult<TransportResponse>> {
        let client = self.client.clone();
        let url = self.url.clone();

        async move {
            log::info!("📤 Uploading {} bytes to {}", payload.total_bytes(), url);
            let form = payload.into_form(&progress)?;

            let response = client.post(url).multipart(form).send().await?;

            let status = response.status().as_u16();
            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let body = response.bytes().await?.to_vec();

            Ok(TransportResponse {
                status,
                content_type,
                body,
            })
        }
        .boxed()
    }
}
