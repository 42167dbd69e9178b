//! Proxy directive resolution.
//!
//! Proxy directives come only from the operator's local file. They are
//! never fetched or guessed, so a missing file is surfaced to the client.

use crate::config::SourcesConfig;
use crate::error::{PacError, Result};
use crate::sources::{is_not_found, CachedFile, ContentSource};
use tracing::debug;

/// Example value shown to operators.
pub const PROXY_EXAMPLE: &str = "PROXY 127.0.0.1:8118; SOCKS5 127.0.0.1:1080";

/// Ordered PAC proxy directives, e.g. `PROXY 127.0.0.1:8118`.
///
/// Order is the client's fallback priority; duplicates are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyList(Vec<String>);

impl ProxyList {
    /// Splits on `;`, trimming segments and dropping empty ones.
    pub fn parse(raw: &str) -> Self {
        Self(
            raw.split(';')
                .map(str::trim)
                .filter(|segment| !segment.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for ProxyList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Reads the [`ProxyList`] from the operator's configuration file.
#[derive(Debug, Clone)]
pub struct ProxySource {
    file: CachedFile,
}

impl ProxySource {
    pub fn new(file: CachedFile) -> Self {
        Self { file }
    }

    pub fn from_config(config: &SourcesConfig) -> Self {
        Self::new(CachedFile::new(&config.proxies_file))
    }

    /// Reads and parses the proxy file.
    ///
    /// A missing file yields [`PacError::ProxyConfigMissing`] and a file
    /// without directives [`PacError::ProxyConfigEmpty`].
    pub async fn resolve(&self) -> Result<ProxyList> {
        let path = self.file.describe();

        let raw = self.file.load().await.map_err(|e| {
            if is_not_found(&e) {
                PacError::ProxyConfigMissing { path: path.clone() }
            } else {
                e
            }
        })?;

        let proxies = ProxyList::parse(&raw);
        if proxies.is_empty() {
            return Err(PacError::ProxyConfigEmpty { path });
        }

        debug!(count = proxies.len(), "Resolved proxy directives");
        Ok(proxies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source_with(content: Option<&str>) -> (tempfile::TempDir, ProxySource) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("proxies.txt");
        if let Some(content) = content {
            std::fs::write(&path, content).unwrap();
        }
        (dir, ProxySource::new(CachedFile::new(path)))
    }

    #[test]
    fn test_parse_preserves_order_and_duplicates() {
        let list =
            ProxyList::parse(" SOCKS5 5.6.7.8:1080 ;; PROXY 1.2.3.4:8118;SOCKS5 5.6.7.8:1080;\n");
        assert_eq!(
            list.iter().collect::<Vec<_>>(),
            vec!["SOCKS5 5.6.7.8:1080", "PROXY 1.2.3.4:8118", "SOCKS5 5.6.7.8:1080"]
        );
    }

    #[test]
    fn test_parse_example() {
        let list = ProxyList::parse(PROXY_EXAMPLE);
        assert_eq!(list.len(), 2);
    }

    #[tokio::test]
    async fn test_resolve_reads_file() {
        let (_dir, source) = source_with(Some("PROXY 127.0.0.1:8118; DIRECT"));
        let list = source.resolve().await.unwrap();
        assert_eq!(list.iter().collect::<Vec<_>>(), vec!["PROXY 127.0.0.1:8118", "DIRECT"]);
    }

    #[tokio::test]
    async fn test_missing_file() {
        let (_dir, source) = source_with(None);
        let err = source.resolve().await.unwrap_err();
        assert!(matches!(err, PacError::ProxyConfigMissing { .. }));
    }

    #[tokio::test]
    async fn test_blank_file() {
        let (_dir, source) = source_with(Some(" ; \n ;"));
        let err = source.resolve().await.unwrap_err();
        assert!(matches!(err, PacError::ProxyConfigEmpty { .. }));
    }

    #[tokio::test]
    async fn test_proxy_file_is_never_written() {
        let (dir, source) = source_with(None);
        let _ = source.resolve().await;
        assert!(!dir.path().join("proxies.txt").exists());
    }
}
