//! Raw input acquisition from URLs, files, and stdin.
//!
//! The [`Ingest`] trait is the seam the coordinator depends on; the
//! [`DefaultIngestor`] dispatches on the shape of the input string:
//!
//! - `-` reads standard input until EOF
//! - anything starting with `http` is fetched over HTTP (feature `fetch`)
//! - everything else is read as a local file

use std::path::PathBuf;
#[cfg(feature = "fetch")]
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncReadExt;

use crate::model::{IngestionPayload, SourceKind};
use crate::{PageDocError, Result};

/// HTTP client configuration for fetching web pages.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Request timeout in seconds.
    pub timeout: u64,
    /// Custom User-Agent string.
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: 30,
            user_agent: "Mozilla/5.0 (compatible; PageDoc/1.1; +https://github.com/stormlightlabs/pagedoc)".to_string(),
        }
    }
}

/// Obtains raw bytes for an input.
#[async_trait]
pub trait Ingest: Send + Sync {
    async fn ingest(&self, input: &str) -> Result<IngestionPayload>;
}

/// Where an input string will be read from.
pub fn classify_input(input: &str) -> SourceKind {
    if input == "-" {
        SourceKind::Stdin
    } else if input.starts_with("http") {
        SourceKind::Url
    } else {
        SourceKind::File
    }
}

/// Reads stdin, local files, and (with `fetch`) HTTP URLs.
#[derive(Debug, Clone, Default)]
pub struct DefaultIngestor {
    config: FetchConfig,
}

impl DefaultIngestor {
    pub fn new(config: FetchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Fetches a URL; the mime type comes from the `content-type` header.
    #[cfg(feature = "fetch")]
    pub async fn fetch_url(&self, url: &str) -> Result<IngestionPayload> {
        let parsed_url = url::Url::parse(url).map_err(|e| PageDocError::InvalidUrl(e.to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.config.timeout))
            .build()
            .map_err(PageDocError::HttpError)?;

        let response = client
            .get(parsed_url)
            .header("User-Agent", &self.config.user_agent)
            .header("Accept", "text/html,application/xhtml+xml,application/json;q=0.9,*/*;q=0.8")
            .header("Accept-Language", "en-US,en;q=0.9")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PageDocError::Timeout { timeout: self.config.timeout }
                } else {
                    PageDocError::HttpError(e)
                }
            })?;

        let mime_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await?;

        tracing::debug!(url, bytes = bytes.len(), mime = ?mime_type, "fetched");

        let payload = IngestionPayload::new(SourceKind::Url, url, bytes.to_vec());
        Ok(match mime_type {
            Some(mime) => payload.with_mime_type(mime),
            None => payload,
        })
    }

    #[cfg(not(feature = "fetch"))]
    pub async fn fetch_url(&self, url: &str) -> Result<IngestionPayload> {
        Err(PageDocError::InvalidUrl(format!("{}: built without the `fetch` feature", url)))
    }

    /// Reads a local file.
    ///
    /// Callers should validate and sanitize the path when accepting user input.
    pub async fn read_file(&self, path: &str) -> Result<IngestionPayload> {
        let path_buf = PathBuf::from(path);
        if !path_buf.exists() {
            return Err(PageDocError::FileNotFound(path_buf));
        }

        let bytes = tokio::fs::read(&path_buf).await?;
        Ok(sniffed(IngestionPayload::new(SourceKind::File, path, bytes)))
    }

    /// Reads standard input until EOF.
    pub async fn read_stdin(&self) -> Result<IngestionPayload> {
        let mut buffer = Vec::new();
        tokio::io::stdin().read_to_end(&mut buffer).await?;
        Ok(sniffed(IngestionPayload::new(SourceKind::Stdin, "-", buffer)))
    }
}

#[async_trait]
impl Ingest for DefaultIngestor {
    async fn ingest(&self, input: &str) -> Result<IngestionPayload> {
        match classify_input(input) {
            SourceKind::Stdin => self.read_stdin().await,
            SourceKind::Url => self.fetch_url(input).await,
            SourceKind::File => self.read_file(input).await,
        }
    }
}

/// Guesses a mime type from the leading non-whitespace byte.
pub fn sniff_mime(body: &[u8]) -> Option<&'static str> {
    match body.iter().find(|b| !b.is_ascii_whitespace()) {
        Some(b'{') | Some(b'[') => Some("application/json"),
        Some(b'<') => Some("text/html"),
        _ => None,
    }
}

fn sniffed(payload: IngestionPayload) -> IngestionPayload {
    match sniff_mime(&payload.raw_content) {
        Some(mime) => payload.with_mime_type(mime),
        None => payload,
    }
}
