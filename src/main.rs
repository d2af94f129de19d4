mod batch;
mod error;
mod fetcher;
mod parser;
mod scoring;
mod settings;
mod table;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::json;

use parser::document::Document;
use parser::locate::Locator;
use settings::Settings;

#[derive(Parser)]
#[command(
    name = "availability_scraper",
    about = "Score data, code and open-access availability of scholarly articles"
)]
struct Cli {
    /// Settings file (default: availability.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch every article in a CSV export and write the scored table
    Run {
        /// Input CSV (vendor export or canonical columns)
        #[arg(short, long)]
        input: PathBuf,
        /// Output CSV
        #[arg(short, long, default_value = "with_data_availability.csv")]
        output: PathBuf,
        /// Only process the first N rows
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Locate a section in a saved page and print it as JSON
    Locate {
        html: PathBuf,
        /// Comma-separated synonym keys, e.g. data,avail
        #[arg(short, long, value_delimiter = ',', required = true)]
        keys: Vec<String>,
        /// Comma-separated keys for the meta-tag stage
        #[arg(short, long, value_delimiter = ',')]
        meta_keys: Vec<String>,
        /// Match keys against section titles instead of running the cascade
        #[arg(short, long)]
        titled: bool,
    },
    /// List titled sections of a saved page
    Titles { html: PathBuf },
    /// Score a text against a taxonomy CSV
    Score {
        taxonomy: PathBuf,
        text: String,
        /// Category reported when nothing matches
        #[arg(short, long, default_value = "closed access")]
        empty: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            input,
            output,
            limit,
        } => {
            let settings = Settings::load(cli.config.as_deref())?;
            let opts = batch::RunOptions {
                input,
                output,
                limit,
            };
            let summary = batch::run(&settings, &opts).await?;
            summary.print();
            println!("Output: {}", opts.output.display());
            Ok(())
        }
        Commands::Locate {
            html,
            keys,
            meta_keys,
            titled,
        } => {
            let doc = read_page(&html)?;
            let locator = Locator::default();
            let keys: Vec<&str> = keys.iter().map(String::as_str).collect();
            let meta: Vec<&str> = meta_keys.iter().map(String::as_str).collect();
            let hit = if titled {
                locator.trace_titled(&doc, &keys)
            } else {
                locator.trace_with_meta(&doc, &keys, &meta)
            };
            let out = match hit {
                Some(hit) => json!({ "found": true, "strategy": hit.strategy, "text": hit.text }),
                None => json!({ "found": false }),
            };
            println!("{}", serde_json::to_string_pretty(&out)?);
            Ok(())
        }
        Commands::Titles { html } => {
            let doc = read_page(&html)?;
            let titles = parser::locate::titled::section_titles(&doc);
            if titles.is_empty() {
                println!("No titled sections.");
            }
            for (i, title) in titles.iter().enumerate() {
                println!("{:>3}  {}", i + 1, title);
            }
            Ok(())
        }
        Commands::Score {
            taxonomy,
            text,
            empty,
        } => {
            let taxonomy = scoring::taxonomy::Taxonomy::load(&taxonomy)?;
            let result = scoring::score(Some(text.as_str()), &taxonomy, &empty);
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn read_page(path: &std::path::Path) -> anyhow::Result<Document> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(Document::parse(&raw))
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn durations() {
        assert_eq!(format_duration(Duration::from_millis(2500)), "2.5s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
        assert_eq!(format_duration(Duration::from_secs(3725)), "1h 2m 5s");
    }

    #[test]
    fn cli_parses_key_lists() {
        let cli = Cli::try_parse_from([
            "availability_scraper",
            "locate",
            "page.html",
            "--keys",
            "data,avail",
            "--meta-keys",
            "Abstract",
        ])
        .unwrap();
        match cli.command {
            Commands::Locate { keys, meta_keys, titled, .. } => {
                assert_eq!(keys, vec!["data", "avail"]);
                assert_eq!(meta_keys, vec!["Abstract"]);
                assert!(!titled);
            }
            _ => panic!("expected locate"),
        }
    }
}
