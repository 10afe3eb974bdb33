use crate::types::{AggregatorError, RawEntry, Result};
use chrono::Utc;
use feed_rs::parser;
use tracing::debug;

pub const UNTITLED: &str = "(untitled)";

/// Reads RSS, Atom and JSON Feed documents into ordered raw entries.
pub struct FeedParser;

impl FeedParser {
    pub fn parse(content: &str) -> Result<Vec<RawEntry>> {
        debug!("Parsing feed content ({} bytes)", content.len());

        let feed = parser::parse(content.as_bytes())
            .map_err(|e| AggregatorError::MalformedFeed(e.to_string()))?;

        let entries: Vec<RawEntry> = feed.entries.into_iter().map(Self::parse_entry).collect();

        debug!("Parsed feed with {} entries", entries.len());
        Ok(entries)
    }

    fn parse_entry(entry: feed_rs::model::Entry) -> RawEntry {
        let title = entry
            .title
            .map(|t| t.content.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| UNTITLED.to_string());

        let link = entry
            .links
            .first()
            .map(|l| l.href.trim().to_string())
            .unwrap_or_default();

        let published_at = entry
            .published
            .or(entry.updated)
            .map(|dt| dt.with_timezone(&Utc));

        // content:encoded / atom:content is the full article, description a teaser
        let content = entry.content.and_then(|c| c.body).filter(|b| !b.trim().is_empty());
        let summary = entry.summary.map(|s| s.content).filter(|s| !s.trim().is_empty());
        let body_markup = content.or(summary).unwrap_or_default();

        RawEntry {
            title,
            link,
            published_at,
            body_markup,
        }
    }
}
