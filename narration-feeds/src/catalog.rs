//! Built-in feed source lists.
//!
//! Each URL can be replaced through an environment variable named after the
//! source id, e.g. `NEWS_VNEXPRESS_RSS` or `STORY_GUTENBERG_RSS`.

use crate::types::{AggregatorError, FeedSource, Result};
use std::env;

struct SourceDef {
    id: &'static str,
    name: &'static str,
    url: &'static str,
}

const NEWS: &[SourceDef] = &[
    SourceDef { id: "vnexpress", name: "VnExpress", url: "https://vnexpress.net/rss/tin-moi-nhat.rss" },
    SourceDef { id: "tuoitre", name: "Tuổi Trẻ", url: "https://tuoitre.vn/rss/tin-moi-nhat.rss" },
    SourceDef { id: "thanhnien", name: "Thanh Niên", url: "https://thanhnien.vn/rss/home.rss" },
    SourceDef { id: "dantri", name: "Dân Trí", url: "https://dantri.com.vn/rss/home.rss" },
    SourceDef { id: "vietnamnet", name: "Vietnamnet", url: "https://vietnamnet.vn/rss/home.rss" },
    SourceDef { id: "bbc_world", name: "BBC News - World", url: "https://feeds.bbci.co.uk/news/world/rss.xml" },
];

const STORIES: &[SourceDef] = &[
    SourceDef { id: "vnexpress_giaitri", name: "VnExpress Giải trí", url: "https://vnexpress.net/rss/giai-tri.rss" },
    SourceDef { id: "zingnews_vanhoa", name: "Zing News Văn hóa", url: "https://zingnews.vn/rss/van-hoa.rss" },
    SourceDef { id: "baomoi_giaitri", name: "Báo Mới Giải trí", url: "https://baomoi.com/rss/giai-tri.rss" },
    SourceDef { id: "dantri_vanhoa", name: "Dân Trí Văn hóa", url: "https://dantri.com.vn/rss/van-hoa.rss" },
    SourceDef { id: "tuoitre_vanhoa", name: "Tuổi Trẻ Văn hóa", url: "https://tuoitre.vn/rss/van-hoa.rss" },
];

const INTERNATIONAL_STORIES: &[SourceDef] = &[
    SourceDef { id: "gutenberg", name: "Project Gutenberg", url: "http://www.gutenberg.org/cache/epub/feeds/today.rss" },
    SourceDef { id: "storynory", name: "Storynory", url: "https://www.storynory.com/feeds/stories" },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Catalog {
    News,
    Stories,
    InternationalStories,
}

impl Catalog {
    fn defs(self) -> &'static [SourceDef] {
        match self {
            Catalog::News => NEWS,
            Catalog::Stories => STORIES,
            Catalog::InternationalStories => INTERNATIONAL_STORIES,
        }
    }

    fn env_prefix(self) -> &'static str {
        match self {
            Catalog::News => "NEWS",
            Catalog::Stories | Catalog::InternationalStories => "STORY",
        }
    }

    /// Name of the variable overriding the URL of source `id`.
    pub fn env_key(self, id: &str) -> String {
        format!("{}_{}_RSS", self.env_prefix(), id.to_uppercase())
    }

    /// All sources of this catalog with environment overrides applied.
    pub fn sources(self) -> Vec<FeedSource> {
        self.defs()
            .iter()
            .map(|def| {
                let url = env::var(self.env_key(def.id))
                    .ok()
                    .filter(|u| !u.trim().is_empty())
                    .unwrap_or_else(|| def.url.to_string());
                FeedSource::new(def.id, def.name, url)
            })
            .collect()
    }

    /// The sources named in `ids`, in catalog order. `None` or an empty list
    /// selects every source.
    pub fn select(self, ids: Option<&[String]>) -> Result<Vec<FeedSource>> {
        let all = self.sources();
        let ids = match ids {
            Some(ids) if !ids.is_empty() => ids,
            _ => return Ok(all),
        };

        if let Some(unknown) = ids.iter().find(|id| !all.iter().any(|s| &s.id == *id)) {
            return Err(AggregatorError::UnknownSource(unknown.clone()));
        }

        Ok(all.into_iter().filter(|s| ids.contains(&s.id)).collect())
    }

    /// Source whose feed host matches the host of `url`, if any.
    pub fn source_for_url(self, url: &str) -> Option<FeedSource> {
        let host = url::Url::parse(url).ok()?.host_str()?.trim_start_matches("www.").to_string();
        self.sources().into_iter().find(|source| {
            url::Url::parse(&source.url)
                .ok()
                .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_string()))
                .map_or(false, |h| h == host || host.ends_with(&format!(".{}", h)))
        })
    }
}
