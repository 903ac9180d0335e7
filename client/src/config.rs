//! Client configuration.
//!
//! Defaults live in constants. [`ClientConfig::from_env`] layers a `.env`
//! file and `REPORT_*` environment variables on top; CLI flags override both.

use reqwest::Url;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;
use crate::models::SubmissionMode;

/// Report service base URL.
pub const BACKEND_URL: &str = "http://localhost:5000";

/// Upload endpoint, relative to the base URL.
pub const UPLOAD_PATH: &str = "/api/upload-report";

/// Live log stream endpoint (SSE), relative to the base URL.
pub const LOGS_PATH: &str = "/api/logs";

/// Maximum file size for upload (in bytes).
///
/// 5 MB limit.
pub const MAX_FILE_SIZE: u64 = 5 * 1024 * 1024;

/// Maximum log entries kept by the log viewer.
pub const MAX_LOG_ENTRIES: usize = 100;

/// Upload timeout in seconds.
pub const DEFAULT_UPLOAD_TIMEOUT_SECS: u64 = 120;

/// Where downloaded artifacts are written.
pub const DEFAULT_DOWNLOAD_DIR: &str = ".";

pub const ENV_BACKEND_URL: &str = "REPORT_BACKEND_URL";
pub const ENV_UPLOAD_TIMEOUT: &str = "REPORT_UPLOAD_TIMEOUT_SECS";
pub const ENV_DOWNLOAD_DIR: &str = "REPORT_DOWNLOAD_DIR";

/// Runtime settings for the upload pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Base URL of the report service.
    pub backend_url: Url,
    /// Transfers unresolved after this long fail with `Timeout`.
    pub upload_timeout: Duration,
    pub mode: SubmissionMode,
    pub download_dir: PathBuf,
}

impl ClientConfig {
    /// Defaults with a custom backend.
    pub fn new(backend_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            backend_url: parse_base_url(backend_url)?,
            ..Self::default()
        })
    }

    /// Load from `.env` and `REPORT_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Try loading .env file
        let _ = dotenvy::dotenv();

        let mut config = Self::default();

        if let Ok(url) = env::var(ENV_BACKEND_URL) {
            config.backend_url = parse_base_url(&url)?;
        }

        if let Ok(value) = env::var(ENV_UPLOAD_TIMEOUT) {
            let secs = value.trim().parse::<u64>().map_err(|_| ConfigError::InvalidNumber {
                name: ENV_UPLOAD_TIMEOUT.to_string(),
                value: value.clone(),
            })?;
            config.upload_timeout = Duration::from_secs(secs);
        }

        if let Ok(dir) = env::var(ENV_DOWNLOAD_DIR) {
            config.download_dir = PathBuf::from(dir);
        }

        Ok(config)
    }

    pub fn with_backend(mut self, backend_url: &str) -> Result<Self, ConfigError> {
        self.backend_url = parse_base_url(backend_url)?;
        Ok(self)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.upload_timeout = timeout;
        self
    }

    pub fn with_mode(mut self, mode: SubmissionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = dir.into();
        self
    }

    pub fn upload_url(&self) -> Url {
        self.endpoint(UPLOAD_PATH)
    }

    pub fn logs_url(&self) -> Url {
        self.endpoint(LOGS_PATH)
    }

    fn endpoint(&self, path: &str) -> Url {
        let mut url = self.backend_url.clone();
        let base = url.path().trim_end_matches('/').to_string();
        url.set_path(&format!("{}{}", base, path));
        url
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend_url: Url::parse(BACKEND_URL).expect("Invalid BACKEND_URL constant"),
            upload_timeout: Duration::from_secs(DEFAULT_UPLOAD_TIMEOUT_SECS),
            mode: SubmissionMode::default(),
            download_dir: PathBuf::from(DEFAULT_DOWNLOAD_DIR),
        }
    }
}

fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim()).map_err(|e| ConfigError::InvalidUrl {
        url: raw.to_string(),
        message: e.to_string(),
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidUrl {
            url: raw.to_string(),
            message: "scheme must be http or https".to_string(),
        });
    }

    Ok(url)
}
