//! End-to-end runs against canned result pages.

use std::fs;
use std::path::Path;
use std::sync::Mutex;

use saber_fetch::acquire::{archive_path, log_path};
use saber_fetch::input::songs_from_lines;
use saber_fetch::search::DEFAULT_SEARCH_URL;
use saber_fetch::{
    AcceptLog, AcquisitionManager, FetchError, HtmlRowSource, Outcome, Pipeline, Prompter,
    RunStats, SearchClient, SelectionMode, SongCandidate, StatusReporter, Transport, WantedSong,
};

const SONG_LIST: &str = "Crab Rave\n\
                         Believer - Imagine Dragons (feat. X) -2\n\
                         \n\
                         Nothing Matches\n";

/// Serves pages and archives by exact URL; everything else is an empty page
/// or a 404.
#[derive(Default)]
struct CannedSite {
    pages: Vec<(String, String)>,
    archives: Vec<(String, Vec<u8>)>,
    archive_requests: Mutex<Vec<String>>,
}

impl Transport for CannedSite {
    fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        Ok(self
            .pages
            .iter()
            .find(|(u, _)| u == url)
            .map(|(_, body)| body.clone())
            .unwrap_or_default())
    }

    fn fetch_bytes(&self, url: &str, _headers: &[(&str, &str)]) -> Result<Vec<u8>, FetchError> {
        self.archive_requests.lock().unwrap().push(url.to_string());
        self.archives
            .iter()
            .find(|(u, _)| u == url)
            .map(|(_, bytes)| bytes.clone())
            .ok_or(FetchError::Status {
                url: url.to_string(),
                status: 404,
            })
    }
}

struct NoAnswers;

impl Prompter for NoAnswers {
    fn ask(&mut self, _ranked: &[SongCandidate], _retry: bool) -> Option<String> {
        None
    }
}

#[derive(Default)]
struct Quiet;

impl StatusReporter for Quiet {
    fn on_search_start(&mut self, _song: &WantedSong) {}
    fn on_searched(&mut self, _song: &WantedSong, _found: usize) {}
    fn on_not_found(&mut self, _song: &WantedSong) {}
    fn on_skipped(&mut self, _song: &WantedSong) {}
    fn on_acquire_start(&mut self, _candidate: &SongCandidate) {}
    fn on_acquired(&mut self, _candidate: &SongCandidate, _outcome: Outcome) {}
    fn on_failed(&mut self, _song: &WantedSong, _reason: &str) {}
}

fn row(title: &str, up: u64, down: u64, link: &str) -> String {
    format!(
        r#"<div class="row">
             <header class="post-title">{title}</header>
             <a class="post-difficulty">Expert</a>
             <span class="post-stat">12 plays</span>
             <span class="post-stat">{up}</span>
             <span class="post-stat">{down}</span>
             <div class="post-bottom-meta post-mapper-id-meta">Mapper
               Kival</div>
             <time content="2020-06-01T10:00:00+00:00">June 1</time>
             <a class="action -download-zip" href="{link}">zip</a>
           </div>"#
    )
}

fn page(rows: &[String]) -> String {
    format!(
        "<html><body>{}<div class=\"row\"><div class=\"widget\">Tags</div></div></body></html>",
        rows.concat()
    )
}

fn site() -> CannedSite {
    let rows = HtmlRowSource;
    let transport = CannedSite::default();
    let client = SearchClient::new(DEFAULT_SEARCH_URL, &transport, &rows);
    let url = |query: &str| client.search_url(query);

    let believer = row("Believer", 5, 0, "https://dl.test/believer.zip");
    CannedSite {
        pages: vec![
            (
                url("Crab Rave"),
                page(&[
                    row("Crab Rave Remix", 50, 1, "https://dl.test/remix.zip"),
                    row("Crab Rave", 10, 0, "https://dl.test/crab.zip"),
                ]),
            ),
            (url("Believer - Imagine Dragons (feat. X)"), page(&[believer.clone()])),
            (
                url("Believer"),
                page(&[believer, row("Believer Nightcore", 1, 0, "https://dl.test/nightcore.zip")]),
            ),
        ],
        archives: vec![
            ("https://dl.test/crab.zip".to_string(), b"crab".to_vec()),
            ("https://dl.test/nightcore.zip".to_string(), b"nightcore".to_vec()),
        ],
        ..Default::default()
    }
}

fn run(site: &CannedSite, root: &Path, mode: SelectionMode, workers: usize) -> RunStats {
    let rows = HtmlRowSource;
    let log = AcceptLog::open(log_path(root, "Mix")).unwrap();
    let pipeline = Pipeline::new(
        SearchClient::new(DEFAULT_SEARCH_URL, site, &rows),
        AcquisitionManager::new(site, &log, mode.is_dry_run()),
        mode,
        root.to_path_buf(),
        "Mix",
    )
    .with_workers(workers);
    pipeline.run(&songs_from_lines(SONG_LIST), &mut NoAnswers, &mut Quiet)
}

#[test]
fn test_auto_run_downloads_best_and_preselected_matches() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("Mix")).unwrap();
    let site = site();

    let stats = run(&site, dir.path(), SelectionMode::Auto, 1);
    assert_eq!(stats.wanted, 3);
    assert_eq!(stats.downloaded, 2);
    assert_eq!(stats.not_found, 1);

    let crab = archive_path(dir.path(), "Mix", "Crab Rave");
    let nightcore = archive_path(dir.path(), "Mix", "Believer Nightcore");
    assert_eq!(fs::read(&crab).unwrap(), b"crab");
    assert_eq!(fs::read(&nightcore).unwrap(), b"nightcore");

    let log = fs::read_to_string(log_path(dir.path(), "Mix")).unwrap();
    assert_eq!(log, "Crab Rave\nBeliever Nightcore\n");
}

#[test]
fn test_second_run_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("Mix")).unwrap();
    let site = site();

    run(&site, dir.path(), SelectionMode::Auto, 1);
    let stats = run(&site, dir.path(), SelectionMode::Auto, 1);

    assert_eq!(stats.downloaded, 0);
    assert_eq!(stats.already_present, 2);
    assert_eq!(site.archive_requests.lock().unwrap().len(), 2);
    let log = fs::read_to_string(log_path(dir.path(), "Mix")).unwrap();
    assert_eq!(log.lines().count(), 2);
}

#[test]
fn test_dry_run_transfers_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let site = site();

    let stats = run(&site, dir.path(), SelectionMode::DryRun, 1);
    assert_eq!(stats.matched_only, 2);
    assert!(site.archive_requests.lock().unwrap().is_empty());
    assert!(!dir.path().join("Mix").exists());
}

#[test]
fn test_prefetch_keeps_song_order() {
    let sequential = tempfile::tempdir().unwrap();
    let parallel = tempfile::tempdir().unwrap();
    for dir in [&sequential, &parallel] {
        fs::create_dir(dir.path().join("Mix")).unwrap();
    }

    run(&site(), sequential.path(), SelectionMode::Auto, 1);
    run(&site(), parallel.path(), SelectionMode::Auto, 4);

    assert_eq!(
        fs::read_to_string(log_path(sequential.path(), "Mix")).unwrap(),
        fs::read_to_string(log_path(parallel.path(), "Mix")).unwrap()
    );
}

#[test]
fn test_interactive_without_answers_skips_everything() {
    let dir = tempfile::tempdir().unwrap();
    let site = site();

    let stats = run(&site, dir.path(), SelectionMode::Interactive, 2);
    assert_eq!(stats.skipped, 2);
    assert_eq!(stats.not_found, 1);
    assert!(!log_path(dir.path(), "Mix").exists());
}
