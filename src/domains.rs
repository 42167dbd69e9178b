//! Domain list resolution.
//!
//! The domain list is resolved on every request. The stages are:
//!
//! 1. **TryCache**: read the local cache file
//! 2. **TryRemote**: on a missing cache, fetch the canonical list and store
//!    the raw result (even an empty one) so the next request hits the cache
//! 3. **Normalize**: trim, lowercase, drop blanks and `#` comments, dedupe, sort
//! 4. **Persist**: write the normalized list back over the cache
//! 5. **Return**
//!
//! Resolution never fails. Every failure degrades towards an empty set.

use crate::config::SourcesConfig;
use crate::error::Result;
use crate::sources::{is_not_found, CachedFile, ContentSource, RemoteFetch, StaticDefault};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Sorted, deduplicated set of lowercase DNS suffixes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainSet(BTreeSet<String>);

impl DomainSet {
    /// Parses newline-separated text, skipping blank lines and `#` comments.
    pub fn parse(raw: &str) -> Self {
        Self(
            raw.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .map(str::to_lowercase)
                .collect(),
        )
    }

    /// Iterates the domains in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, domain: &str) -> bool {
        self.0.contains(domain)
    }

    /// Canonical on-disk form: one domain per line, no trailing newline.
    pub fn to_cache_text(&self) -> String {
        self.0.iter().cloned().collect::<Vec<_>>().join("\n")
    }
}

impl<S: Into<String>> FromIterator<S> for DomainSet {
    /// Normalizes each item as a single entry; items are never split.
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(Into::into)
                .filter_map(|item| {
                    let item = item.trim();
                    (!item.is_empty() && !item.starts_with('#')).then(|| item.to_lowercase())
                })
                .collect(),
        )
    }
}

/// Where the raw text came from; decides what gets persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Cache,
    Remote,
    Fallback,
    /// The cache exists but could not be read. It is left untouched.
    Unreadable,
}

/// Resolution stages, advanced one transition at a time.
enum Stage {
    TryCache,
    TryRemote,
    Normalize { raw: String, origin: Origin },
    Persist { domains: DomainSet, origin: Origin },
    Return(DomainSet),
}

/// Resolves the [`DomainSet`] from a cache with a remote fallback.
#[derive(Clone)]
pub struct DomainSource {
    cache: CachedFile,
    remote: Arc<dyn ContentSource>,
    fallback: Arc<dyn ContentSource>,
}

impl DomainSource {
    /// Creates a resolver from explicit strategies.
    pub fn new(
        cache: CachedFile,
        remote: Arc<dyn ContentSource>,
        fallback: Arc<dyn ContentSource>,
    ) -> Self {
        Self {
            cache,
            remote,
            fallback,
        }
    }

    /// Creates a resolver from the sources configuration.
    pub fn from_config(config: &SourcesConfig) -> Result<Self> {
        let remote = RemoteFetch::new(
            config.remote_url.clone(),
            config.fetch_timeout(),
            &config.user_agent,
        )?;

        Ok(Self::new(
            CachedFile::new(&config.domains_file),
            Arc::new(remote),
            Arc::new(StaticDefault::default()),
        ))
    }

    /// Resolves the current domain set. Never fails.
    pub async fn resolve(&self) -> DomainSet {
        let mut stage = Stage::TryCache;
        loop {
            stage = match stage {
                Stage::TryCache => self.try_cache().await,
                Stage::TryRemote => self.try_remote().await,
                Stage::Normalize { raw, origin } => Stage::Persist {
                    domains: DomainSet::parse(&raw),
                    origin,
                },
                Stage::Persist { domains, origin } => {
                    if origin != Origin::Unreadable {
                        self.persist(domains.to_cache_text()).await;
                    }
                    debug!(count = domains.len(), ?origin, "Resolved domain list");
                    Stage::Return(domains)
                }
                Stage::Return(domains) => return domains,
            };
        }
    }

    async fn try_cache(&self) -> Stage {
        match self.cache.load().await {
            Ok(raw) => Stage::Normalize {
                raw,
                origin: Origin::Cache,
            },
            Err(e) if is_not_found(&e) => {
                info!(
                    path = %self.cache.path().display(),
                    "Domain cache not found, fetching remote list"
                );
                Stage::TryRemote
            }
            Err(e) => {
                warn!(
                    path = %self.cache.path().display(),
                    error = %e,
                    "Domain cache unreadable, serving without domains"
                );
                Stage::Normalize {
                    raw: self.fallback_content().await,
                    origin: Origin::Unreadable,
                }
            }
        }
    }

    async fn try_remote(&self) -> Stage {
        let (raw, origin) = match self.remote.load().await {
            Ok(raw) => {
                info!(
                    source = %self.remote.describe(),
                    bytes = raw.len(),
                    "Fetched remote domain list"
                );
                (raw, Origin::Remote)
            }
            Err(e) => {
                warn!(
                    source = %self.remote.describe(),
                    error = %e,
                    "Remote domain list unavailable, using {}",
                    self.fallback.describe()
                );
                (self.fallback_content().await, Origin::Fallback)
            }
        };

        // Stored raw so the next request is a cache hit.
        self.persist(raw.clone()).await;
        Stage::Normalize { raw, origin }
    }

    async fn fallback_content(&self) -> String {
        self.fallback.load().await.unwrap_or_default()
    }

    async fn persist(&self, content: String) {
        if let Err(e) = self.cache.store(content).await {
            warn!(
                path = %self.cache.path().display(),
                error = %e,
                "Failed to write domain cache"
            );
        }
    }
}
