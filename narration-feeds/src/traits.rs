use crate::types::Result;
use async_trait::async_trait;

/// Retrieves the raw body behind a URL.
///
/// Implementations make a single attempt and must bound it in time; every
/// outcome is either the body text or a typed error.
#[async_trait]
pub trait FeedFetch: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// Translates text into a target language.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Human-readable name, used in logs.
    fn name(&self) -> String;

    async fn translate(&self, text: &str, target_lang: &str) -> Result<String>;
}
