//! Decoding the report service's success response into artifacts.
//!
//! Accepted shapes:
//!
//! - `{"excelDownloadUrl": "..", "pptDownloadUrl": ".."}`: a report and a
//!   presentation
//! - `{"downloadUrl": ".."}`: one artifact of the mode's primary kind
//! - a bare URL as the whole body: a JSON string, or plain text when the
//!   response is untyped or `text/plain`
//!
//! Relative URLs resolve against the backend base with RFC 3986 rules, the
//! same way a browser follows a link. A root-relative path such as
//! `/api/download-report/x` replaces any base path, so a base of
//! `https://host/weekly/` yields `https://host/api/download-report/x`, while
//! `api/download-report/x` keeps it. Anything else is
//! [`TransferError::InvalidResponse`].

use reqwest::Url;
use serde::Deserialize;

use crate::error::{TransferError, TransferResult};
use crate::models::{dedup_artifacts, ArtifactKind, GeneratedArtifact, SubmissionMode};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ResponseBody {
    #[serde(rename_all = "camelCase")]
    Paired {
        excel_download_url: String,
        ppt_download_url: String,
    },
    #[serde(rename_all = "camelCase")]
    Single { download_url: String },
    Bare(String),
}

/// Turn a 2xx response body into the artifacts it references.
pub fn parse_artifacts(
    body: &[u8],
    content_type: Option<&str>,
    base: &Url,
    mode: SubmissionMode,
) -> TransferResult<Vec<GeneratedArtifact>> {
    let decoded = match serde_json::from_slice::<ResponseBody>(body) {
        Ok(decoded) => decoded,
        Err(json_err) => {
            let text = std::str::from_utf8(body).unwrap_or_default().trim();
            if !accepts_plain_text(content_type) || !looks_like_url(text) {
                return Err(TransferError::InvalidResponse(format!(
                    "no download URL in response ({})",
                    json_err
                )));
            }
            ResponseBody::Bare(text.to_string())
        }
    };

    let entries = match decoded {
        ResponseBody::Paired {
            excel_download_url,
            ppt_download_url,
        } => vec![
            (excel_download_url, ArtifactKind::Report),
            (ppt_download_url, ArtifactKind::Presentation),
        ],
        ResponseBody::Single { download_url } => vec![(download_url, mode.primary_artifact())],
        ResponseBody::Bare(url) if looks_like_url(url.trim()) => {
            vec![(url.trim().to_string(), mode.primary_artifact())]
        }
        ResponseBody::Bare(other) => {
            return Err(TransferError::InvalidResponse(format!("not a URL: '{}'", other)));
        }
    };

    let artifacts = entries
        .into_iter()
        .map(|(raw, kind)| resolve(base, &raw).map(|url| GeneratedArtifact::new(url, kind)))
        .collect::<TransferResult<Vec<_>>>()?;

    Ok(dedup_artifacts(artifacts))
}

fn accepts_plain_text(content_type: Option<&str>) -> bool {
    match content_type {
        None => true,
        Some(value) => value
            .split(';')
            .next()
            .map(|essence| essence.trim().eq_ignore_ascii_case("text/plain"))
            .unwrap_or(false),
    }
}

fn looks_like_url(text: &str) -> bool {
    text.starts_with("http://") || text.starts_with("https://") || text.starts_with('/')
}

fn resolve(base: &Url, raw: &str) -> TransferResult<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(TransferError::InvalidResponse("empty download URL".to_string()));
    }
    base.join(raw)
        .map(String::from)
        .map_err(|e| TransferError::InvalidResponse(format!("bad download URL '{}': {}", raw, e)))
}
