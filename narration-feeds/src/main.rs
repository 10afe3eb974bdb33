use clap::{Parser, Subcommand};
use narration_feeds::{ArticleRequest, Catalog, NarrationTools, NewsRequest, StoryRequest};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "narration-feeds", about = "Fetch feeds and print narration-ready JSON")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Latest Vietnamese and BBC news, optionally filtered by topic
    News {
        #[arg(long)]
        topic: Option<String>,
        #[arg(long)]
        max_items: Option<usize>,
        /// Source ids to use (repeatable); all sources when omitted
        #[arg(long = "source")]
        sources: Vec<String>,
    },
    /// Vietnamese stories from entertainment and culture feeds
    Stories {
        #[arg(long)]
        topic: Option<String>,
        #[arg(long)]
        max_items: Option<usize>,
        #[arg(long)]
        translate_to: Option<String>,
    },
    /// Stories and books from international sources
    IntlStories {
        #[arg(long)]
        topic: Option<String>,
        #[arg(long)]
        max_items: Option<usize>,
        #[arg(long)]
        translate_to: Option<String>,
    },
    /// Full text of one article, split into parts
    Article {
        url: String,
    },
    /// List the configured sources
    Sources,
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // logs go to stderr so stdout carries only JSON
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let tools = NarrationTools::from_env()?;

    match cli.command {
        Command::News { topic, max_items, sources } => {
            let request = NewsRequest {
                topic,
                max_items,
                sources: if sources.is_empty() { None } else { Some(sources) },
            };
            print_json(&tools.get_news(request).await)?;
        }
        Command::Stories { topic, max_items, translate_to } => {
            let request = StoryRequest { topic, max_items, translate_to };
            print_json(&tools.get_stories(request).await)?;
        }
        Command::IntlStories { topic, max_items, translate_to } => {
            let request = StoryRequest { topic, max_items, translate_to };
            print_json(&tools.get_international_stories(request).await)?;
        }
        Command::Article { url } => {
            print_json(&tools.read_article(ArticleRequest { url }).await)?;
        }
        Command::Sources => {
            let catalogs = serde_json::json!({
                "news": Catalog::News.sources(),
                "stories": Catalog::Stories.sources(),
                "internationalStories": Catalog::InternationalStories.sources(),
            });
            print_json(&catalogs)?;
        }
    }

    info!("Done");
    Ok(())
}
