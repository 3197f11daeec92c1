use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use metascrape_client::{ProbeMethod, ReqwestFetcher, ScraperExtractor};
use metascrape_core::{ExtractRequest, ExtractService};

#[derive(Parser)]
#[command(name = "metascrape", version, about = "Page metadata extractor")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a page and print its metadata as JSON
    Extract {
        /// Target URL
        url: String,

        /// Named CSS selector query, e.g. `-q title=h1` (repeatable)
        #[arg(short, long = "query", value_name = "NAME=SELECTOR", value_parser = parse_query)]
        queries: Vec<(String, String)>,

        /// Request timeout in seconds
        #[arg(short, long, env = "METASCRAPE_TIMEOUT_SECS", default_value_t = 30)]
        timeout: u64,

        /// Method used to probe the target before fetching (options or head)
        #[arg(long, env = "METASCRAPE_PROBE_METHOD", default_value = "options")]
        probe: ProbeMethod,

        /// Print compact JSON instead of pretty-printed
        #[arg(long, default_value_t = false)]
        compact: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("metascrape=warn".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Extract {
            url,
            queries,
            timeout,
            probe,
            compact,
        } => cmd_extract(url, queries, timeout, probe, compact).await?,
    }

    Ok(())
}

async fn cmd_extract(
    url: String,
    queries: Vec<(String, String)>,
    timeout: u64,
    probe: ProbeMethod,
    compact: bool,
) -> Result<()> {
    let mut request = ExtractRequest::new(url);
    for (name, selector) in queries {
        request = request.with_query(name, selector);
    }

    // The user controls the machine, so local targets are fair game.
    let fetcher = ReqwestFetcher::with_timeout(std::time::Duration::from_secs(timeout))?
        .with_probe_method(probe)
        .allow_private_urls()?;
    let service = ExtractService::new(fetcher, ScraperExtractor::new());

    let result = service
        .extract(&request)
        .await
        .with_context(|| format!("Extraction failed for {}", request.url))?;

    let output = if compact {
        serde_json::to_string(&result)?
    } else {
        serde_json::to_string_pretty(&result)?
    };
    println!("{output}");

    Ok(())
}

/// Parse `NAME=SELECTOR`. The selector may itself contain `=`.
fn parse_query(raw: &str) -> Result<(String, String), String> {
    let (name, selector) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=SELECTOR, got '{raw}'"))?;
    if name.is_empty() {
        return Err(format!("query name is empty in '{raw}'"));
    }
    Ok((name.to_string(), selector.to_string()))
}
