//! Retrieval of generated artifacts.
//!
//! [`DownloadDispatcher::dispatch`] collapses duplicate URLs, then starts every
//! retrieval at once. Each artifact gets its own outcome; one failure never
//! stops the others.

use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use reqwest::{Client, Url};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::DownloadError;
use crate::models::{dedup_artifacts, GeneratedArtifact};

/// Retrieves one artifact and reports where it ended up.
pub trait Fetcher: Send + Sync {
    fn fetch(&self, artifact: GeneratedArtifact) -> BoxFuture<'static, Result<PathBuf, DownloadError>>;
}

/// Saves artifacts fetched over HTTP into a directory.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    out_dir: PathBuf,
}

impl HttpFetcher {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self::with_client(Client::new(), out_dir)
    }

    pub fn with_client(client: Client, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            out_dir: out_dir.into(),
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, artifact: GeneratedArtifact) -> BoxFuture<'static, Result<PathBuf, DownloadError>> {
        let client = self.client.clone();
        let target = self.out_dir.join(artifact_file_name(&artifact));

        async move {
            log::info!("📥 Downloading {} from {}", artifact.kind, artifact.url);
            let response = client.get(&artifact.url).send().await?;
            if !response.status().is_success() {
                return Err(DownloadError::Status(response.status().as_u16()));
            }
            let bytes = response.bytes().await?;

            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&target, &bytes).await?;

            log::info!("✅ Saved {} ({} bytes)", target.display(), bytes.len());
            Ok(target)
        }
        .boxed()
    }
}

/// Local file name for an artifact: `<kind>-<last URL segment>[.ext]`.
pub fn artifact_file_name(artifact: &GeneratedArtifact) -> String {
    let segment = Url::parse(&artifact.url)
        .ok()
        .and_then(|url| {
            url.path_segments()
                .and_then(|segments| segments.filter(|s| !s.is_empty()).last().map(str::to_string))
        })
        .unwrap_or_else(|| "download".to_string());

    let mut name = format!("{}-{}", artifact.kind, segment);
    if Path::new(&segment).extension().is_none() {
        name.push('.');
        name.push_str(artifact.kind.default_extension());
    }
    name
}

/// Outcome of retrieving one artifact.
#[derive(Debug)]
pub struct DownloadOutcome {
    pub artifact: GeneratedArtifact,
    pub result: Result<PathBuf, DownloadError>,
}

impl DownloadOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Per-artifact outcomes, in server order.
#[derive(Debug, Default)]
pub struct DispatchReport {
    outcomes: Vec<DownloadOutcome>,
}

impl DispatchReport {
    pub fn outcomes(&self) -> &[DownloadOutcome] {
        &self.outcomes
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed() == 0
    }
}

/// Fans artifact retrieval out over a [`Fetcher`].
#[derive(Clone)]
pub struct DownloadDispatcher {
    fetcher: Arc<dyn Fetcher>,
}

impl DownloadDispatcher {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self { fetcher }
    }

    /// Dispatcher saving into `out_dir` over HTTP.
    pub fn http(out_dir: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(HttpFetcher::new(out_dir)))
    }

    /// Retrieve every distinct artifact concurrently.
    pub async fn dispatch(&self, artifacts: &[GeneratedArtifact]) -> DispatchReport {
        let unique = dedup_artifacts(artifacts.iter().cloned());
        if unique.len() < artifacts.len() {
            log::debug!("Skipping {} duplicate artifact URL(s)", artifacts.len() - unique.len());
        }

        let results = join_all(unique.iter().cloned().map(|a| self.fetcher.fetch(a))).await;

        let outcomes: Vec<DownloadOutcome> = unique
            .into_iter()
            .zip(results)
            .map(|(artifact, result)| {
                if let Err(e) = &result {
                    log::warn!("⚠️  {} download failed: {}", artifact.kind, e);
                }
                DownloadOutcome { artifact, result }
            })
            .collect();

        DispatchReport { outcomes }
    }
}
