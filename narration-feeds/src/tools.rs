//! Operations exposed to the tool-dispatch layer.
//!
//! Every operation answers with a `ToolResponse`; request and network
//! problems become `success: false` with a message instead of an error.

use crate::aggregator::FeedAggregator;
use crate::catalog::Catalog;
use crate::fetcher::{build_fetcher, validate_url};
use crate::normalizer::{chunk, extract_article_text, extract_html_title};
use crate::traits::Translator;
use crate::translator::HttpTranslator;
use crate::types::{
    AggregateOptions, AggregationResult, AggregatorConfig, EmptyCause, FeedSource, FetchConfig, Result,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub const MAX_ITEMS_LIMIT: usize = 30;
pub const DEFAULT_MAX_ITEMS: usize = 10;
pub const ARTICLE_PART_LEN: usize = 1000;

const NEWS_PER_SOURCE: usize = 10;
const STORIES_PER_SOURCE: usize = 3;
const INTERNATIONAL_STORIES_PER_SOURCE: usize = 5;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsRequest {
    pub topic: Option<String>,
    pub max_items: Option<usize>,
    pub sources: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryRequest {
    pub topic: Option<String>,
    pub max_items: Option<usize>,
    /// Target language for the translated copy, e.g. `vi`.
    pub translate_to: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleRequest {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub source_id: String,
    pub source_name: String,
    pub title: String,
    pub link: String,
    pub parts: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ToolResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContentKind {
    News,
    Stories,
    InternationalStories,
}

impl ContentKind {
    fn noun(self) -> &'static str {
        match self {
            ContentKind::News => "news items",
            ContentKind::Stories => "Vietnamese stories",
            ContentKind::InternationalStories => "international stories",
        }
    }

    fn topic_hint(self) -> &'static str {
        match self {
            ContentKind::News => "e.g. 'chính trị', 'bóng đá', 'thế giới', 'kinh tế', 'công nghệ'",
            ContentKind::Stories => "e.g. 'cổ tích', 'hài hước', 'tình cảm'",
            ContentKind::InternationalStories => "English keywords work best, e.g. 'fairy tale', 'adventure', 'animal'",
        }
    }
}

/// Clamp a requested item count into `1..=MAX_ITEMS_LIMIT`.
pub fn clamp_max_items(requested: Option<usize>) -> usize {
    requested.unwrap_or(DEFAULT_MAX_ITEMS).clamp(1, MAX_ITEMS_LIMIT)
}

/// Status line for an aggregation, distinct for every empty-result cause.
fn status_message(kind: ContentKind, result: &AggregationResult, topic: Option<&str>) -> String {
    match result.empty_cause {
        None => {
            let mut message = format!(
                "Found {} {}. Text is cleaned of HTML and split into parts for reading aloud.",
                result.items.len(),
                kind.noun()
            );
            if !result.errors.is_empty() {
                message.push_str(&format!(" {} source(s) could not be read.", result.errors.len()));
            }
            message
        }
        Some(EmptyCause::AllSourcesFailed) => format!(
            "All {} sources are unavailable right now ({} failed). Please try again later.",
            kind.noun(),
            result.errors.len()
        ),
        Some(EmptyCause::NoTopicMatch) => format!(
            "No {} matched the topic '{}'. Try a different topic ({}).",
            kind.noun(),
            topic.unwrap_or_default(),
            kind.topic_hint()
        ),
        Some(EmptyCause::NoEntries) => format!("The sources returned no {} at the moment.", kind.noun()),
    }
}

pub struct NarrationTools {
    aggregator: FeedAggregator,
}

impl NarrationTools {
    pub fn new(aggregator: FeedAggregator) -> Self {
        Self { aggregator }
    }

    /// Wires fetcher, aggregator and the optional translator from the
    /// environment.
    pub fn from_env() -> Result<Self> {
        let fetch_config = FetchConfig::from_env();
        let timeout = Duration::from_millis(fetch_config.timeout_ms);
        let fetcher = build_fetcher(fetch_config)?;

        let mut aggregator = FeedAggregator::new(fetcher, AggregatorConfig::from_env());
        if let Some(translator) = HttpTranslator::from_env(timeout)? {
            info!("Translation enabled via {}", translator.name());
            aggregator = aggregator.with_translator(Arc::new(translator));
        }

        Ok(Self::new(aggregator))
    }

    pub fn aggregator(&self) -> &FeedAggregator {
        &self.aggregator
    }

    pub async fn get_news(&self, request: NewsRequest) -> ToolResponse<AggregationResult> {
        let sources = match Catalog::News.select(request.sources.as_deref()) {
            Ok(sources) => sources,
            Err(e) => return ToolResponse::failure(format!("Invalid request: {}", e)),
        };

        let options = AggregateOptions {
            topic: request.topic.clone(),
            max_items: clamp_max_items(request.max_items),
            per_source_limit: NEWS_PER_SOURCE,
            translate_to: None,
        };
        self.run(ContentKind::News, &sources, options).await
    }

    pub async fn get_stories(&self, request: StoryRequest) -> ToolResponse<AggregationResult> {
        let options = story_options(&request, STORIES_PER_SOURCE);
        self.run(ContentKind::Stories, &Catalog::Stories.sources(), options).await
    }

    pub async fn get_international_stories(&self, request: StoryRequest) -> ToolResponse<AggregationResult> {
        let options = story_options(&request, INTERNATIONAL_STORIES_PER_SOURCE);
        self.run(ContentKind::InternationalStories, &Catalog::InternationalStories.sources(), options)
            .await
    }

    async fn run(
        &self,
        kind: ContentKind,
        sources: &[FeedSource],
        options: AggregateOptions,
    ) -> ToolResponse<AggregationResult> {
        match self.aggregator.aggregate(sources, &options).await {
            Ok(result) => {
                let message = status_message(kind, &result, options.topic.as_deref());
                ToolResponse {
                    success: result.success(),
                    message,
                    data: Some(result),
                }
            }
            Err(e) => ToolResponse::failure(format!("Invalid request: {}", e)),
        }
    }

    /// Full text of one article page, split into parts for narration.
    pub async fn read_article(&self, request: ArticleRequest) -> ToolResponse<Article> {
        let url = request.url.trim();
        if let Err(e) = validate_url(url) {
            return ToolResponse::failure(format!("Invalid request: {}", e));
        }

        let (source_id, source_name) = match Catalog::News.source_for_url(url) {
            Some(source) => (source.id, source.display_name),
            None => ("unknown".to_string(), "Unknown Source".to_string()),
        };

        let html = match self.aggregator.fetcher().fetch(url).await {
            Ok(html) => html,
            Err(e) => {
                warn!("Failed to load article {}: {}", url, e);
                return ToolResponse::failure(format!("Could not load the article: {}", e));
            }
        };

        let text = extract_article_text(&html);
        let parts = match chunk(&text, ARTICLE_PART_LEN) {
            Ok(parts) if !parts.is_empty() => parts,
            _ => return ToolResponse::failure("Could not extract any readable text from the article."),
        };

        let title = extract_html_title(&html).unwrap_or_else(|| url.to_string());
        info!("Read article {} in {} parts", url, parts.len());

        ToolResponse::ok(
            "Loaded the full article, split into parts for reading aloud.",
            Article {
                source_id,
                source_name,
                title,
                link: url.to_string(),
                parts,
            },
        )
    }
}

fn story_options(request: &StoryRequest, per_source_limit: usize) -> AggregateOptions {
    AggregateOptions {
        topic: request.topic.clone(),
        max_items: clamp_max_items(request.max_items),
        per_source_limit,
        translate_to: request.translate_to.clone().filter(|lang| !lang.trim().is_empty()),
    }
}
