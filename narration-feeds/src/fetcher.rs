use crate::traits::FeedFetch;
use crate::types::{AggregatorError, FetchConfig, Result};
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Client;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use url::Url;

/// Single-attempt HTTP GET bounded by `FetchConfig::timeout_ms`.
pub struct HttpFetcher {
    client: Client,
    config: FetchConfig,
}

impl HttpFetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        if config.timeout_ms == 0 {
            return Err(AggregatorError::InvalidOption("timeout_ms must be greater than zero".to_string()));
        }

        let client = Client::builder()
            .user_agent(&config.user_agent)
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    async fn get_text(&self, url: Url) -> Result<String> {
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "*/*")
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(AggregatorError::HttpStatus {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        response.text().await.map_err(classify)
    }
}

#[async_trait]
impl FeedFetch for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let parsed = validate_url(url)?;
        let timeout_ms = self.config.timeout_ms;

        debug!("Fetching {}", url);
        let start_time = Instant::now();

        let content = tokio::time::timeout(Duration::from_millis(timeout_ms), self.get_text(parsed))
            .await
            .map_err(|_| AggregatorError::Timeout { ms: timeout_ms })??;

        info!(
            "Fetched {} ({} bytes in {}ms)",
            url,
            content.len(),
            start_time.elapsed().as_millis()
        );
        Ok(content)
    }
}

/// Accepts absolute http(s) URLs only.
pub fn validate_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url.trim()).map_err(|e| AggregatorError::InvalidUrl(format!("{}: {}", url, e)))?;
    match parsed.scheme() {
        "http" | "https" if parsed.host_str().is_some() => Ok(parsed),
        _ => Err(AggregatorError::InvalidUrl(format!("{}: unsupported URL", url))),
    }
}

fn classify(error: reqwest::Error) -> AggregatorError {
    if error.is_builder() {
        AggregatorError::Http(error)
    } else {
        AggregatorError::Network(error.to_string())
    }
}

#[derive(Clone)]
struct CacheEntry {
    fetched_at: Instant,
    body: Arc<str>,
}

/// Read-through cache keyed by URL.
///
/// Only successful bodies are stored, and an entry older than the TTL is
/// always refetched, so a source that starts failing shows up on the next
/// call after expiry. Expired entries are dropped whenever a new body is
/// stored, which keeps the map bounded by what was fetched within one TTL.
pub struct CachedFetcher<F> {
    inner: F,
    ttl: Duration,
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

impl<F: FeedFetch> CachedFetcher<F> {
    pub fn new(inner: F, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn entry_count(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
        debug!("Cleared feed cache");
    }
}

#[async_trait]
impl<F: FeedFetch> FeedFetch for CachedFetcher<F> {
    async fn fetch(&self, url: &str) -> Result<String> {
        {
            let entries = self.entries.read().await;
            if let Some(entry) = entries.get(url) {
                if entry.fetched_at.elapsed() < self.ttl {
                    debug!("Cache hit for {}", url);
                    return Ok(entry.body.to_string());
                }
            }
        }

        match self.inner.fetch(url).await {
            Ok(body) => {
                let mut entries = self.entries.write().await;
                let before = entries.len();
                entries.retain(|_, entry| entry.fetched_at.elapsed() < self.ttl);
                if entries.len() < before {
                    debug!("Dropped {} expired cache entries", before - entries.len());
                }
                entries.insert(
                    url.to_string(),
                    CacheEntry {
                        fetched_at: Instant::now(),
                        body: Arc::from(body.as_str()),
                    },
                );
                Ok(body)
            }
            Err(e) => {
                let mut entries = self.entries.write().await;
                if entries.remove(url).is_some() {
                    warn!("Evicted cached body for {} after failed refresh", url);
                }
                Err(e)
            }
        }
    }
}

/// Builds the fetcher described by `config`: plain HTTP, wrapped in a cache
/// when `cache_ttl_secs` is non-zero.
pub fn build_fetcher(config: FetchConfig) -> Result<Arc<dyn FeedFetch>> {
    let ttl = config.cache_ttl_secs;
    let http = HttpFetcher::new(config)?;
    if ttl > 0 {
        Ok(Arc::new(CachedFetcher::new(http, Duration::from_secs(ttl))))
    } else {
        Ok(Arc::new(http))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingFetch {
        calls: AtomicUsize,
        fail_after: usize,
    }

    #[async_trait]
    impl FeedFetch for CountingFetch {
        async fn fetch(&self, url: &str) -> Result<String> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n > self.fail_after {
                return Err(AggregatorError::Network("down".to_string()));
            }
            Ok(format!("{} #{}", url, n))
        }
    }

    #[test]
    fn validate_url_rejects_non_http() {
        assert!(validate_url("https://vnexpress.net/rss/tin-moi-nhat.rss").is_ok());
        assert!(matches!(validate_url("not a url"), Err(AggregatorError::InvalidUrl(_))));
        assert!(matches!(validate_url("ftp://example.com/feed"), Err(AggregatorError::InvalidUrl(_))));
        assert!(matches!(validate_url(""), Err(AggregatorError::InvalidUrl(_))));
    }

    #[test]
    fn zero_timeout_is_rejected_at_construction() {
        let config = FetchConfig { timeout_ms: 0, ..Default::default() };
        assert!(matches!(HttpFetcher::new(config.clone()), Err(AggregatorError::InvalidOption(_))));
        assert!(matches!(build_fetcher(config), Err(AggregatorError::InvalidOption(_))));
    }

    #[tokio::test]
    async fn cache_drops_expired_entries_on_insert() {
        let inner = CountingFetch { calls: AtomicUsize::new(0), fail_after: usize::MAX };
        let cache = CachedFetcher::new(inner, Duration::from_millis(1));

        for n in 0..200 {
            cache.fetch(&format!("https://page.test/{}", n)).await.unwrap();
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        cache.fetch("https://page.test/latest").await.unwrap();

        assert_eq!(cache.entry_count().await, 1);
    }

    #[tokio::test]
    async fn cache_serves_within_ttl_and_refetches_after() {
        let inner = CountingFetch { calls: AtomicUsize::new(0), fail_after: usize::MAX };
        let cache = CachedFetcher::new(inner, Duration::from_millis(50));

        assert_eq!(cache.fetch("https://a.test/rss").await.unwrap(), "https://a.test/rss #1");
        assert_eq!(cache.fetch("https://a.test/rss").await.unwrap(), "https://a.test/rss #1");
        assert_eq!(cache.inner.calls.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(cache.fetch("https://a.test/rss").await.unwrap(), "https://a.test/rss #2");
        assert_eq!(cache.inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn cache_does_not_mask_failures_after_expiry() {
        let inner = CountingFetch { calls: AtomicUsize::new(0), fail_after: 1 };
        let cache = CachedFetcher::new(inner, Duration::from_millis(30));

        assert!(cache.fetch("https://b.test/rss").await.is_ok());
        tokio::time::sleep(Duration::from_millis(60)).await;

        assert!(cache.fetch("https://b.test/rss").await.is_err());
        assert_eq!(cache.entry_count().await, 0);
        assert!(cache.fetch("https://b.test/rss").await.is_err());
    }
}
