pub mod types;
pub mod traits;
pub mod fetcher;
pub mod parser;
pub mod normalizer;
pub mod aggregator;
pub mod catalog;
pub mod translator;
pub mod tools;

pub use types::*;
pub use traits::{FeedFetch, Translator};
pub use fetcher::{build_fetcher, CachedFetcher, HttpFetcher};
pub use parser::FeedParser;
pub use aggregator::FeedAggregator;
pub use catalog::Catalog;
pub use translator::{HttpTranslator, PassthroughTranslator};
pub use tools::{Article, ArticleRequest, NarrationTools, NewsRequest, StoryRequest, ToolResponse};
