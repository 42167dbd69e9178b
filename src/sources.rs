//! Raw content sources.
//!
//! A [`ContentSource`] yields the raw text of a list before any parsing.
//! Resolvers compose these strategies instead of hard-coding where their
//! input comes from:
//!
//! - [`CachedFile`]: a local file, which can also be written back
//! - [`RemoteFetch`]: an HTTP(S) endpoint with a bounded timeout
//! - [`StaticDefault`]: fixed content used when everything else fails

use crate::error::{PacError, Result};
use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, trace};

/// Something that can produce the raw text of a list.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Loads the full content.
    async fn load(&self) -> Result<String>;

    /// Human-readable location, used in logs.
    fn describe(&self) -> String;
}

/// A text file on the local filesystem.
#[derive(Debug, Clone)]
pub struct CachedFile {
    path: PathBuf,
}

impl CachedFile {
    /// Creates a source backed by `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replaces the file content atomically.
    ///
    /// The content is written to a temporary file in the same directory and
    /// renamed over the target, so readers see either the old or the new
    /// content. Concurrent writers are last-writer-wins.
    pub async fn store(&self, content: String) -> Result<()> {
        let path = self.path.clone();
        let bytes = content.len();

        tokio::task::spawn_blocking(move || replace_file(&path, content.as_bytes()))
            .await
            .map_err(|e| PacError::Io(std::io::Error::other(e)))??;

        trace!(path = %self.path.display(), bytes, "Stored file");
        Ok(())
    }
}

fn replace_file(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = tempfile::NamedTempFile::new_in(dir)?;
    temp.write_all(content)?;
    temp.flush()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[async_trait]
impl ContentSource for CachedFile {
    async fn load(&self) -> Result<String> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        trace!(path = %self.path.display(), bytes = content.len(), "Loaded file");
        Ok(content)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// A plain-text list served over HTTP(S).
#[derive(Debug, Clone)]
pub struct RemoteFetch {
    url: String,
    client: reqwest::Client,
}

impl RemoteFetch {
    /// Creates a fetcher for `url`.
    ///
    /// The whole request, body included, must complete within `timeout`.
    pub fn new(url: impl Into<String>, timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| {
                PacError::config_validation(format!("Invalid HTTP client settings: {}", e))
            })?;

        Ok(Self {
            url: url.into(),
            client,
        })
    }
}

#[async_trait]
impl ContentSource for RemoteFetch {
    async fn load(&self) -> Result<String> {
        debug!(url = %self.url, "Fetching remote list");

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| PacError::remote_fetch(&self.url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PacError::remote_fetch(&self.url, format!("HTTP {}", status)));
        }

        response
            .text()
            .await
            .map_err(|e| PacError::remote_fetch(&self.url, e))
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

/// Fixed content.
#[derive(Debug, Clone, Default)]
pub struct StaticDefault {
    content: String,
}

#[async_trait]
impl ContentSource for StaticDefault {
    async fn load(&self) -> Result<String> {
        Ok(self.content.clone())
    }

    fn describe(&self) -> String {
        "built-in default".to_string()
    }
}

/// Returns true when the error means the file simply does not exist.
pub fn is_not_found(err: &PacError) -> bool {
    matches!(err, PacError::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_cached_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let file = CachedFile::new(dir.path().join("domains.txt"));

        file.store("a.com\nb.com".to_string()).await.unwrap();
        assert_eq!(file.load().await.unwrap(), "a.com\nb.com");

        file.store("c.com".to_string()).await.unwrap();
        assert_eq!(file.load().await.unwrap(), "c.com");
    }

    #[tokio::test]
    async fn test_cached_file_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let file = CachedFile::new(dir.path().join("missing.txt"));

        let err = file.load().await.unwrap_err();
        assert!(is_not_found(&err));
    }

    #[tokio::test]
    async fn test_store_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let file = CachedFile::new(dir.path().join("domains.txt"));

        file.store("a.com".to_string()).await.unwrap();
        file.store("b.com".to_string()).await.unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_stores_never_tear() {
        let dir = tempfile::tempdir().unwrap();
        let file = CachedFile::new(dir.path().join("domains.txt"));
        let contents: Vec<String> = (0..8)
            .map(|i| format!("domain{}.com\n", i).repeat(200))
            .collect();

        let tasks: Vec<_> = contents
            .iter()
            .cloned()
            .map(|content| {
                let file = file.clone();
                tokio::spawn(async move { file.store(content).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let stored = file.load().await.unwrap();
        assert!(contents.contains(&stored));
    }

    #[tokio::test]
    async fn test_remote_fetch_sends_user_agent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/domains.txt"))
            .and(header("user-agent", "TestBrowser/1.0"))
            .respond_with(ResponseTemplate::new(200).set_body_string("a.com\nb.com"))
            .mount(&server)
            .await;

        let fetch = RemoteFetch::new(
            format!("{}/domains.txt", server.uri()),
            Duration::from_secs(5),
            "TestBrowser/1.0",
        )
        .unwrap();

        assert_eq!(fetch.load().await.unwrap(), "a.com\nb.com");
    }

    #[tokio::test]
    async fn test_remote_fetch_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let fetch =
            RemoteFetch::new(server.uri(), Duration::from_secs(5), "TestBrowser/1.0").unwrap();
        let err = fetch.load().await.unwrap_err();
        assert!(matches!(err, PacError::RemoteFetch { .. }));
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn test_remote_fetch_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("slow.com")
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let fetch =
            RemoteFetch::new(server.uri(), Duration::from_millis(200), "TestBrowser/1.0").unwrap();
        let err = fetch.load().await.unwrap_err();
        assert!(matches!(err, PacError::RemoteFetch { .. }));
    }

    #[tokio::test]
    async fn test_static_default() {
        assert_eq!(StaticDefault::default().load().await.unwrap(), "");
    }
}
