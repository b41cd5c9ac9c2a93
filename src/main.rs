use anyhow::{Context, Result};
use clap::{ArgGroup, Parser};
use crossterm::style::Stylize;
use std::fs;
use std::path::PathBuf;

use saber_fetch::acquire::log_path;
use saber_fetch::config::Config;
use saber_fetch::display::TerminalPrompter;
use saber_fetch::input::{song_from_line, song_from_track, songs_from_file};
use saber_fetch::progress::{self, format_duration, SpinnerReporter};
use saber_fetch::spotify::{PlaylistSource, SpotifyClient};
use saber_fetch::{
    AcceptLog, AcquisitionManager, HtmlRowSource, HttpTransport, InputError, Pipeline,
    SearchClient, SelectionMode, WantedSong,
};

#[derive(Parser)]
#[command(name = "saber-fetch", version)]
#[command(about = "Find Beat Saber maps for a list of songs and download them")]
#[command(group(ArgGroup::new("source").args(["file", "song"])))]
#[command(group(ArgGroup::new("mode").args(["auto", "no_auto", "auto_test"])))]
struct Args {
    /// Text file with one song per line; `name -N` picks ranked match N
    #[arg(short, long, value_name = "FILE")]
    file: Option<PathBuf>,

    /// Single song search, same `-N` syntax as the file
    #[arg(short, long, value_name = "SONG")]
    song: Option<String>,

    /// Playlist name (destination folder and log file name)
    #[arg(short = 'p', value_name = "PLAYLIST")]
    playlist: Option<String>,

    /// Download the best (or pre-selected) match automatically
    #[arg(short, long)]
    auto: bool,

    /// Choose from the ranked list for every song
    #[arg(short, long)]
    no_auto: bool,

    /// Automatic matching without downloading
    #[arg(short = 't', long)]
    auto_test: bool,

    /// Parent folder of the playlist; must exist
    #[arg(long, default_value = ".")]
    path: PathBuf,

    /// Config file (default: <config dir>/saber-fetch/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Songs searched ahead of the current one
    #[arg(long)]
    workers: Option<usize>,

    /// Hide spinners and print plain status lines (for tail/log files)
    #[arg(long)]
    log_only: bool,

    /// Write run statistics as JSON to this file
    #[arg(long)]
    stats: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn mode(&self) -> Option<SelectionMode> {
        if self.auto {
            Some(SelectionMode::Auto)
        } else if self.no_auto {
            Some(SelectionMode::Interactive)
        } else if self.auto_test {
            Some(SelectionMode::DryRun)
        } else {
            None
        }
    }
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
    progress::set_log_only(args.log_only);

    if !args.path.is_dir() {
        return Err(InputError::MissingRoot(args.path.clone()).into());
    }
    let config = Config::load(args.config.as_deref())?;

    let mut console = TerminalPrompter::stdio();
    let playlist_link = match (&args.file, &args.song) {
        (None, None) => Some(console.ask_playlist_link().context("No playlist link given")?),
        _ => None,
    };
    let playlist = match &args.playlist {
        Some(name) => name.clone(),
        None => console.ask_playlist_name().context("No playlist name given")?,
    };
    let mode = match args.mode() {
        Some(mode) => mode,
        None => console.ask_mode().context("No mode chosen")?,
    };

    let songs: Vec<WantedSong> = if let Some(file) = &args.file {
        println!("> Songs list provided via {}", file.display().to_string().blue());
        songs_from_file(file)?
    } else if let Some(song) = &args.song {
        println!("> Single song search {}", song.as_str().blue());
        vec![song_from_line(song)]
    } else {
        println!("> Songs list provided via {}", "Spotify playlist".blue());
        let link = playlist_link.unwrap_or_default();
        let client = SpotifyClient::new(&config.spotify, config.timeout())?;
        client
            .fetch_tracks(&link)?
            .iter()
            .map(|(title, artist)| song_from_track(title, artist))
            .collect()
    };
    log::info!("{} songs to search, mode {}", songs.len(), mode);

    let destination = args.path.join(&playlist);
    if !mode.is_dry_run() && !destination.exists() {
        fs::create_dir_all(&destination).map_err(|source| InputError::Destination {
            path: destination.clone(),
            source,
        })?;
    }

    let transport = HttpTransport::new(&config.user_agent, config.timeout(), config.retry_policy());
    let rows = HtmlRowSource;
    let log_file = log_path(&args.path, &playlist);
    let log = AcceptLog::open(log_file.clone())
        .with_context(|| format!("Failed to read log {:?}", log_file))?;

    let pipeline = Pipeline::new(
        SearchClient::new(&config.search_url, &transport, &rows),
        AcquisitionManager::new(&transport, &log, mode.is_dry_run()),
        mode,
        args.path.clone(),
        &playlist,
    )
    .with_workers(args.workers.unwrap_or(config.workers));

    println!();
    let mut reporter = SpinnerReporter::new();
    let stats = pipeline.run(&songs, &mut console, &mut reporter);

    println!("\n{:=<60}", "");
    println!("Run complete!");
    println!("  Wanted: {}", stats.wanted);
    println!("  Accepted: {}", stats.accepted());
    println!("  Skipped: {}", stats.skipped);
    println!("  Not found: {}", stats.not_found);
    println!("  Failed: {}", stats.failed);
    println!(
        "  Elapsed: {}",
        format_duration(std::time::Duration::from_secs_f64(stats.elapsed_seconds))
    );
    println!("{:=<60}", "");

    if progress::is_log_only() {
        stats.log_summary();
    }
    if let Some(path) = &args.stats {
        stats
            .write_to_file(path)
            .with_context(|| format!("Failed to write stats to {:?}", path))?;
    }

    Ok(())
}
