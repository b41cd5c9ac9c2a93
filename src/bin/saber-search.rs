//! Run one search and print the ranked candidates, without downloading.
//!
//! Usage: saber-search "Crab Rave -2"

use anyhow::{Context, Result};
use clap::Parser;

use saber_fetch::config::Config;
use saber_fetch::display::render_table;
use saber_fetch::input::song_from_line;
use saber_fetch::pipeline::resolve_ranked;
use saber_fetch::{HtmlRowSource, HttpTransport, SearchClient};

#[derive(Parser)]
#[command(name = "saber-search", version)]
#[command(about = "Search the map catalog and print the ranked matches")]
struct Args {
    /// Song to search for; a trailing `-N` marks the match auto mode would take
    query: String,

    /// Config file (default: <config dir>/saber-fetch/config.toml)
    #[arg(long)]
    config: Option<std::path::PathBuf>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut clog = colog::default_builder();
    clog.filter(
        None,
        if args.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        },
    );
    clog.init();

    let config = Config::load(args.config.as_deref())?;
    let transport = HttpTransport::new(&config.user_agent, config.timeout(), config.retry_policy());
    let rows = HtmlRowSource;
    let client = SearchClient::new(&config.search_url, &transport, &rows);

    let song = song_from_line(&args.query);
    println!("Query: {}", client.search_url(&song.display_query));
    if let Some(fallback) = &song.fallback_query {
        println!("Fallback: {}", client.search_url(fallback));
    }

    let ranked = resolve_ranked(&client, &song)
        .with_context(|| format!("Search for '{}' failed", song.display_query))?;
    if ranked.is_empty() {
        println!("No song found for {}", song.display_query);
        return Ok(());
    }

    print!("{}", render_table(&ranked));
    let pick = song.preselected_index.unwrap_or(1);
    match ranked.get(pick.wrapping_sub(1)) {
        Some(candidate) => println!(
            "Auto pick #{}: {} ({})",
            pick,
            candidate.title,
            candidate.download_link.as_deref().unwrap_or("no link")
        ),
        None => println!("Auto pick #{}: out of range, would skip", pick),
    }

    Ok(())
}
