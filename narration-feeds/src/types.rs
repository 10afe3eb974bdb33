use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::env;

/// One configured syndication endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedSource {
    pub id: String,
    pub display_name: String,
    pub url: String,
}

impl FeedSource {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            url: url.into(),
        }
    }
}

/// One item as read from a parsed feed, before any cleaning.
#[derive(Debug, Clone)]
pub struct RawEntry {
    pub title: String,
    pub link: String,
    pub published_at: Option<DateTime<Utc>>,
    pub body_markup: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedItem {
    pub title: String,
    pub link: String,
    pub source_id: String,
    pub source_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    pub short_summary: String,
    pub parts: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translation: Option<Translation>,
}

impl NormalizedItem {
    /// Key used to collapse the same story published by several sources.
    pub fn dedup_key(&self) -> String {
        dedup_key(&self.link, &self.title)
    }
}

const TITLE_KEY_CHARS: usize = 80;

pub fn dedup_key(link: &str, title: &str) -> String {
    let link = link.trim();
    if !link.is_empty() {
        return link.to_lowercase();
    }
    let prefix: String = title.trim().to_lowercase().chars().take(TITLE_KEY_CHARS).collect();
    format!("title:{}", prefix)
}

/// Translated copy of an item's readable fields.
///
/// When the translator fails `translated` is false and every field carries
/// the untranslated source text.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Translation {
    pub language: String,
    pub title: String,
    pub summary: String,
    pub parts: Vec<String>,
    pub translated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceErrorKind {
    InvalidUrl,
    Timeout,
    HttpError,
    NetworkError,
    MalformedFeed,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceError {
    pub source_id: String,
    pub source_name: String,
    pub source_url: String,
    pub kind: SourceErrorKind,
    pub error_message: String,
}

impl SourceError {
    pub fn new(source: &FeedSource, error: &AggregatorError) -> Self {
        Self {
            source_id: source.id.clone(),
            source_name: source.display_name.clone(),
            source_url: source.url.clone(),
            kind: error.kind(),
            error_message: error.to_string(),
        }
    }
}

/// Why an aggregation came back without items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyCause {
    AllSourcesFailed,
    NoTopicMatch,
    NoEntries,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationResult {
    pub items: Vec<NormalizedItem>,
    pub errors: Vec<SourceError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub empty_cause: Option<EmptyCause>,
    pub sources_total: usize,
    pub entries_seen: usize,
}

impl AggregationResult {
    pub fn success(&self) -> bool {
        !self.items.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_ms: u64,
    /// Zero disables the read-through cache.
    pub cache_ttl_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "Narration-Feeds/0.1".to_string(),
            timeout_ms: 10_000,
            cache_ttl_secs: 0,
        }
    }
}

impl FetchConfig {
    /// Defaults overridden by `FEED_USER_AGENT`, `FEED_TIMEOUT_MS` and
    /// `FEED_CACHE_TTL_SECS`. Unparsable values keep the default.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(agent) = env::var("FEED_USER_AGENT") {
            if !agent.trim().is_empty() {
                config.user_agent = agent;
            }
        }
        config.timeout_ms = env_number("FEED_TIMEOUT_MS").unwrap_or(config.timeout_ms);
        config.cache_ttl_secs = env_number("FEED_CACHE_TTL_SECS").unwrap_or(config.cache_ttl_secs);
        config
    }
}

#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Maximum number of sources fetched at the same time.
    pub concurrency: usize,
    pub part_max_len: usize,
    pub boundary_ratio: f64,
    pub summary_chars: usize,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            part_max_len: 800,
            boundary_ratio: crate::normalizer::DEFAULT_BOUNDARY_RATIO,
            summary_chars: 300,
        }
    }
}

impl AggregatorConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.concurrency = env_number("FEED_CONCURRENCY").unwrap_or(config.concurrency);
        config
    }

    pub fn with_part_max_len(mut self, part_max_len: usize) -> Self {
        self.part_max_len = part_max_len;
        self
    }
}

#[derive(Debug, Clone)]
pub struct AggregateOptions {
    /// Case-insensitive substring matched against title or cleaned body.
    pub topic: Option<String>,
    pub max_items: usize,
    /// Raw entries examined per source.
    pub per_source_limit: usize,
    pub translate_to: Option<String>,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            topic: None,
            max_items: 10,
            per_source_limit: 5,
            translate_to: None,
        }
    }
}

fn env_number<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

#[derive(Debug, thiserror::Error)]
pub enum AggregatorError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Request timed out after {ms}ms")]
    Timeout { ms: u64 },

    #[error("HTTP {status}: {reason}")]
    HttpStatus { status: u16, reason: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Malformed feed: {0}")]
    MalformedFeed(String),

    #[error("Translation failed: {0}")]
    Translation(String),

    #[error("Chunk size must be greater than zero")]
    InvalidChunkSize,

    #[error("At least one feed source is required")]
    NoSources,

    #[error("Invalid option: {0}")]
    InvalidOption(String),

    #[error("Unknown source: {0}")]
    UnknownSource(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AggregatorError {
    pub fn kind(&self) -> SourceErrorKind {
        match self {
            AggregatorError::InvalidUrl(_) => SourceErrorKind::InvalidUrl,
            AggregatorError::Timeout { .. } => SourceErrorKind::Timeout,
            AggregatorError::HttpStatus { .. } => SourceErrorKind::HttpError,
            AggregatorError::Network(_) | AggregatorError::Http(_) => SourceErrorKind::NetworkError,
            AggregatorError::MalformedFeed(_) => SourceErrorKind::MalformedFeed,
            _ => SourceErrorKind::Other,
        }
    }
}

pub type Result<T> = std::result::Result<T, AggregatorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_key_prefers_normalized_link() {
        assert_eq!(dedup_key("  HTTPS://Example.com/A ", "Title"), "https://example.com/a");
    }

    #[test]
    fn dedup_key_falls_back_to_title_prefix() {
        let long_title = "Đ".repeat(120);
        let key = dedup_key("", &format!("  {}  ", long_title));
        assert_eq!(key, format!("title:{}", "đ".repeat(80)));
        assert_eq!(dedup_key("   ", "Chuyện Con Cáo"), "title:chuyện con cáo");
    }

    #[test]
    fn error_kinds_map_to_source_error_kinds() {
        assert_eq!(AggregatorError::Timeout { ms: 5 }.kind(), SourceErrorKind::Timeout);
        assert_eq!(
            AggregatorError::HttpStatus { status: 503, reason: "Service Unavailable".into() }.kind(),
            SourceErrorKind::HttpError
        );
        assert_eq!(AggregatorError::MalformedFeed("x".into()).kind(), SourceErrorKind::MalformedFeed);
        assert_eq!(AggregatorError::NoSources.kind(), SourceErrorKind::Other);
    }

    #[test]
    fn result_serializes_camel_case() {
        let result = AggregationResult {
            items: Vec::new(),
            errors: Vec::new(),
            empty_cause: Some(EmptyCause::NoTopicMatch),
            sources_total: 2,
            entries_seen: 4,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["emptyCause"], "no_topic_match");
        assert_eq!(json["sourcesTotal"], 2);
        assert!(!result.success());
    }
}
