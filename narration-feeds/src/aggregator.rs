use crate::fetcher::validate_url;
use crate::normalizer::{chunk_with_ratio, clean, summarize};
use crate::parser::{FeedParser, UNTITLED};
use crate::traits::{FeedFetch, Translator};
use crate::types::{
    AggregateOptions, AggregationResult, AggregatorConfig, AggregatorError, EmptyCause, FeedSource,
    NormalizedItem, RawEntry, Result, SourceError, Translation,
};
use futures::stream::{self, StreamExt, TryStreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// What one source produced: how many raw entries were examined and the
/// readable ones among them.
struct SourceBatch {
    seen: usize,
    candidates: Vec<Candidate>,
}

/// Normalized item plus the cleaned body the topic filter looks at.
struct Candidate {
    item: NormalizedItem,
    body: String,
}

impl Candidate {
    fn matches_topic(&self, topic_lower: &str) -> bool {
        self.item.title.to_lowercase().contains(topic_lower) || self.body.to_lowercase().contains(topic_lower)
    }
}

/// Fans out over feed sources and merges their normalized entries.
///
/// Sources run through fetch, parse and normalize with at most
/// `AggregatorConfig::concurrency` in flight. A failure in one source becomes
/// one entry in `AggregationResult::errors` and never affects the others.
pub struct FeedAggregator {
    fetcher: Arc<dyn FeedFetch>,
    translator: Option<Arc<dyn Translator>>,
    config: AggregatorConfig,
}

impl FeedAggregator {
    pub fn new(fetcher: Arc<dyn FeedFetch>, config: AggregatorConfig) -> Self {
        Self {
            fetcher,
            translator: None,
            config,
        }
    }

    pub fn with_translator(mut self, translator: Arc<dyn Translator>) -> Self {
        self.translator = Some(translator);
        self
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    pub fn fetcher(&self) -> Arc<dyn FeedFetch> {
        self.fetcher.clone()
    }

    pub async fn aggregate(&self, sources: &[FeedSource], options: &AggregateOptions) -> Result<AggregationResult> {
        self.validate(sources, options)?;

        let start_time = Instant::now();
        info!(
            "Aggregating {} sources (concurrency {}, topic {:?})",
            sources.len(),
            self.config.concurrency,
            options.topic
        );

        // buffered() keeps source order regardless of completion order
        let outcomes: Vec<(&FeedSource, Result<SourceBatch>)> = stream::iter(sources)
            .map(|source| async move { (source, self.process_source(source, options).await) })
            .buffered(self.config.concurrency)
            .collect()
            .await;

        let mut result = self.merge(sources.len(), outcomes, options);

        if let (Some(lang), Some(translator)) = (options.translate_to.as_deref(), self.translator.as_ref()) {
            let items = std::mem::take(&mut result.items);
            result.items = self.translate_items(translator.as_ref(), items, lang).await;
        }

        info!(
            "Aggregation finished: {} items, {} failed sources, {} entries seen in {}ms",
            result.items.len(),
            result.errors.len(),
            result.entries_seen,
            start_time.elapsed().as_millis()
        );
        Ok(result)
    }

    fn validate(&self, sources: &[FeedSource], options: &AggregateOptions) -> Result<()> {
        if sources.is_empty() {
            return Err(AggregatorError::NoSources);
        }
        if self.config.part_max_len == 0 {
            return Err(AggregatorError::InvalidChunkSize);
        }
        if self.config.concurrency == 0 {
            return Err(AggregatorError::InvalidOption("concurrency must be greater than zero".to_string()));
        }
        if options.max_items == 0 {
            return Err(AggregatorError::InvalidOption("max_items must be greater than zero".to_string()));
        }
        if options.per_source_limit == 0 {
            return Err(AggregatorError::InvalidOption(
                "per_source_limit must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    async fn process_source(&self, source: &FeedSource, options: &AggregateOptions) -> Result<SourceBatch> {
        validate_url(&source.url)?;

        let content = self.fetcher.fetch(&source.url).await?;
        let entries = FeedParser::parse(&content)?;
        debug!("Source {} returned {} entries", source.id, entries.len());

        let mut batch = SourceBatch { seen: 0, candidates: Vec::new() };
        for entry in entries.into_iter().take(options.per_source_limit) {
            batch.seen += 1;
            if let Some(candidate) = self.normalize_entry(source, entry)? {
                batch.candidates.push(candidate);
            }
        }
        Ok(batch)
    }

    /// `None` when the entry has no readable body.
    fn normalize_entry(&self, source: &FeedSource, entry: RawEntry) -> Result<Option<Candidate>> {
        let body = clean(&entry.body_markup);
        if body.is_empty() {
            debug!("Skipping entry without text: {} ({})", entry.title, entry.link);
            return Ok(None);
        }

        let parts = chunk_with_ratio(&body, self.config.part_max_len, self.config.boundary_ratio)?;
        let short_summary = summarize(&body, self.config.summary_chars);

        let title = clean(&entry.title);
        let title = if title.is_empty() { UNTITLED.to_string() } else { title };

        Ok(Some(Candidate {
            item: NormalizedItem {
                title,
                link: entry.link.trim().to_string(),
                source_id: source.id.clone(),
                source_name: source.display_name.clone(),
                published_at: entry.published_at,
                short_summary,
                parts,
                translation: None,
            },
            body,
        }))
    }

    fn merge(
        &self,
        sources_total: usize,
        outcomes: Vec<(&FeedSource, Result<SourceBatch>)>,
        options: &AggregateOptions,
    ) -> AggregationResult {
        let topic = options
            .topic
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase);

        let mut items = Vec::new();
        let mut errors = Vec::new();
        let mut seen_keys = HashSet::new();
        let mut entries_seen = 0;

        for (source, outcome) in outcomes {
            match outcome {
                Ok(batch) => {
                    entries_seen += batch.seen;
                    for candidate in batch.candidates {
                        if let Some(topic) = &topic {
                            if !candidate.matches_topic(topic) {
                                continue;
                            }
                        }
                        if !seen_keys.insert(candidate.item.dedup_key()) {
                            debug!("Removing duplicate entry: {} ({})", candidate.item.title, candidate.item.link);
                            continue;
                        }
                        items.push(candidate.item);
                    }
                }
                Err(e) => {
                    warn!("Source {} ({}) failed: {}", source.id, source.url, e);
                    errors.push(SourceError::new(source, &e));
                }
            }
        }

        items.truncate(options.max_items);

        let empty_cause = if !items.is_empty() {
            None
        } else if errors.len() == sources_total {
            Some(EmptyCause::AllSourcesFailed)
        } else if topic.is_some() && entries_seen > 0 {
            Some(EmptyCause::NoTopicMatch)
        } else {
            Some(EmptyCause::NoEntries)
        };

        AggregationResult {
            items,
            errors,
            empty_cause,
            sources_total,
            entries_seen,
        }
    }

    async fn translate_items(
        &self,
        translator: &dyn Translator,
        items: Vec<NormalizedItem>,
        lang: &str,
    ) -> Vec<NormalizedItem> {
        info!("Translating {} items to {} via {}", items.len(), lang, translator.name());

        stream::iter(items)
            .map(|mut item| async move {
                item.translation = Some(translate_item(translator, &item, lang, self.config.concurrency).await);
                item
            })
            .buffered(self.config.concurrency)
            .collect()
            .await
    }
}

async fn translate_item(
    translator: &dyn Translator,
    item: &NormalizedItem,
    lang: &str,
    concurrency: usize,
) -> Translation {
    let parts = stream::iter(&item.parts)
        .map(|part| translator.translate(part, lang))
        .buffered(concurrency)
        .try_collect::<Vec<String>>();

    let fields = futures::try_join!(
        translator.translate(&item.title, lang),
        translator.translate(&item.short_summary, lang),
        parts,
    );

    match fields {
        Ok((title, summary, parts)) => Translation {
            language: lang.to_string(),
            title,
            summary,
            parts,
            translated: true,
        },
        Err(e) => {
            warn!("Translation of {:?} failed, keeping source text: {}", item.title, e);
            Translation {
                language: lang.to_string(),
                title: item.title.clone(),
                summary: item.short_summary.clone(),
                parts: item.parts.clone(),
                translated: false,
            }
        }
    }
}
