//! Per-song driver: resolve → rank → select → acquire.
//!
//! Songs are completed strictly in list order. With more than one worker the
//! read-only resolve and rank stages of upcoming songs are prefetched on a
//! rayon pool; prompts, downloads and log appends stay on the calling thread.

use std::path::PathBuf;
use std::time::Instant;

use crossbeam_channel::{unbounded, Receiver};
use rustc_hash::FxHashMap;

use crate::acquire::{archive_path, AcquisitionManager};
use crate::aggregate::resolve;
use crate::error::FetchError;
use crate::models::{Outcome, RunStats, Selection, SongCandidate, SongReport, WantedSong};
use crate::scoring::rank;
use crate::search::SearchClient;
use crate::selection::{select, Prompter, SelectionMode};

type Resolution = Result<Vec<SongCandidate>, FetchError>;

/// Progress events for one run. Calls for a song always arrive in the order
/// start → searched → (outcome), and songs never interleave.
pub trait StatusReporter {
    fn on_search_start(&mut self, song: &WantedSong);
    fn on_searched(&mut self, song: &WantedSong, found: usize);
    fn on_not_found(&mut self, song: &WantedSong);
    fn on_skipped(&mut self, song: &WantedSong);
    fn on_acquire_start(&mut self, candidate: &SongCandidate);
    fn on_acquired(&mut self, candidate: &SongCandidate, outcome: Outcome);
    fn on_failed(&mut self, song: &WantedSong, reason: &str);
}

pub struct Pipeline<'a> {
    search: SearchClient<'a>,
    acquisition: AcquisitionManager<'a>,
    mode: SelectionMode,
    root: PathBuf,
    playlist: String,
    workers: usize,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        search: SearchClient<'a>,
        acquisition: AcquisitionManager<'a>,
        mode: SelectionMode,
        root: PathBuf,
        playlist: &str,
    ) -> Self {
        Self {
            search,
            acquisition,
            mode,
            root,
            playlist: playlist.to_string(),
            workers: 1,
        }
    }

    /// Number of songs resolved concurrently ahead of the current one.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Process every wanted song. Per-song failures are reported and never
    /// stop the run.
    pub fn run(
        &self,
        songs: &[WantedSong],
        prompter: &mut dyn Prompter,
        reporter: &mut dyn StatusReporter,
    ) -> RunStats {
        let start = Instant::now();
        let mut stats = RunStats::default();

        let pool = if self.workers > 1 && songs.len() > 1 {
            match rayon::ThreadPoolBuilder::new().num_threads(self.workers).build() {
                Ok(pool) => Some(pool),
                Err(err) => {
                    log::warn!("falling back to sequential search: {}", err);
                    None
                }
            }
        } else {
            None
        };

        match pool {
            Some(pool) => pool.in_place_scope(|scope| {
                let (tx, rx) = unbounded();
                for (index, song) in songs.iter().enumerate() {
                    let tx = tx.clone();
                    let search = &self.search;
                    scope.spawn(move |_| {
                        // receiver gone means the run is over
                        let _ = tx.send((index, resolve_ranked(search, song)));
                    });
                }
                drop(tx);

                let mut ordered = InOrder::new(rx);
                for (index, song) in songs.iter().enumerate() {
                    reporter.on_search_start(song);
                    let resolution = ordered.take(index).unwrap_or_else(|| {
                        Err(FetchError::Transport {
                            url: song.display_query.clone(),
                            message: "search worker stopped".to_string(),
                        })
                    });
                    let report = self.finish_song(song, resolution, prompter, reporter);
                    stats.record(&report);
                }
            }),
            None => {
                for song in songs {
                    reporter.on_search_start(song);
                    let resolution = resolve_ranked(&self.search, song);
                    let report = self.finish_song(song, resolution, prompter, reporter);
                    stats.record(&report);
                }
            }
        }

        stats.elapsed_seconds = start.elapsed().as_secs_f64();
        stats
    }

    /// Select and acquire for one song whose resolution is known.
    fn finish_song(
        &self,
        song: &WantedSong,
        resolution: Resolution,
        prompter: &mut dyn Prompter,
        reporter: &mut dyn StatusReporter,
    ) -> SongReport {
        let ranked = match resolution {
            Ok(ranked) => ranked,
            Err(err) => {
                log::warn!("search for '{}' failed: {}", song.display_query, err);
                reporter.on_failed(song, &err.to_string());
                return SongReport::Failed {
                    reason: err.to_string(),
                };
            }
        };
        reporter.on_searched(song, ranked.len());

        let index = match select(self.mode, song, &ranked, prompter) {
            Selection::NotFound => {
                reporter.on_not_found(song);
                return SongReport::NotFound;
            }
            Selection::Skipped => {
                reporter.on_skipped(song);
                return SongReport::Skipped;
            }
            Selection::Chosen(index) => index,
        };

        let candidate = &ranked[index - 1];
        let destination = archive_path(&self.root, &self.playlist, &candidate.title);
        reporter.on_acquire_start(candidate);
        match self.acquisition.acquire(candidate, &destination) {
            Ok(outcome) => {
                reporter.on_acquired(candidate, outcome);
                SongReport::Acquired {
                    title: candidate.title.clone(),
                    outcome,
                }
            }
            Err(err) => {
                log::warn!("acquiring '{}' failed: {}", candidate.title, err);
                reporter.on_failed(song, &err.to_string());
                SongReport::Failed {
                    reason: err.to_string(),
                }
            }
        }
    }
}

/// Search, merge and rank the candidates for one song.
pub fn resolve_ranked(search: &SearchClient<'_>, song: &WantedSong) -> Resolution {
    resolve(search, song).map(rank)
}

/// Hands out results received in any order by their song index.
struct InOrder<T> {
    rx: Receiver<(usize, T)>,
    pending: FxHashMap<usize, T>,
}

impl<T> InOrder<T> {
    fn new(rx: Receiver<(usize, T)>) -> Self {
        Self {
            rx,
            pending: FxHashMap::default(),
        }
    }

    /// Block until the result for `index` arrives. `None` if every sender
    /// is gone without producing it.
    fn take(&mut self, index: usize) -> Option<T> {
        loop {
            if let Some(value) = self.pending.remove(&index) {
                return Some(value);
            }
            let (received, value) = self.rx.recv().ok()?;
            self.pending.insert(received, value);
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::acquire::AcceptLog;
    use crate::rows::HtmlRowSource;
    use crate::search::tests::{page, song_row, FakeTransport};
    use crate::search::DEFAULT_SEARCH_URL;
    use crate::selection::tests::ScriptedPrompter;

    /// Reporter recording events as short strings.
    #[derive(Default)]
    pub(crate) struct RecordingReporter {
        pub(crate) events: Vec<String>,
    }

    impl StatusReporter for RecordingReporter {
        fn on_search_start(&mut self, song: &WantedSong) {
            self.events.push(format!("search {}", song.display_query));
        }
        fn on_searched(&mut self, _song: &WantedSong, found: usize) {
            self.events.push(format!("found {}", found));
        }
        fn on_not_found(&mut self, _song: &WantedSong) {
            self.events.push("not found".to_string());
        }
        fn on_skipped(&mut self, _song: &WantedSong) {
            self.events.push("skipped".to_string());
        }
        fn on_acquire_start(&mut self, candidate: &SongCandidate) {
            self.events.push(format!("acquire {}", candidate.title));
        }
        fn on_acquired(&mut self, _candidate: &SongCandidate, outcome: Outcome) {
            self.events.push(format!("{:?}", outcome));
        }
        fn on_failed(&mut self, _song: &WantedSong, _reason: &str) {
            self.events.push("failed".to_string());
        }
    }

    fn url(terms: &str) -> String {
        format!("https://bsaber.com/?s={}&orderby=relevance&order=DESC", terms)
    }

    fn catalog() -> FakeTransport {
        FakeTransport {
            pages: vec![
                (
                    url("alpha"),
                    page(&[
                        song_row("Alpha Low", 1, 5, Some("https://dl/alpha-low.zip")),
                        song_row("Alpha Top", 50, 1, Some("https://dl/alpha-top.zip")),
                    ]),
                ),
                (url("beta"), page(&[song_row("Beta", 3, 0, None)])),
                (url("gamma"), page(&[song_row("Gamma", 7, 0, Some("https://dl/gamma.zip"))])),
            ],
            archives: vec![
                ("https://dl/alpha-top.zip".to_string(), b"a".to_vec()),
                ("https://dl/alpha-low.zip".to_string(), b"l".to_vec()),
                ("https://dl/gamma.zip".to_string(), b"g".to_vec()),
            ],
            ..Default::default()
        }
    }

    fn wanted() -> Vec<WantedSong> {
        vec![
            WantedSong::new("alpha"),
            WantedSong::new("missing"),
            WantedSong::new("beta"),
            WantedSong::new("gamma"),
        ]
    }

    type RunOutput = (RunStats, Vec<String>, Vec<String>, FakeTransport);

    fn run_with(mode: SelectionMode, workers: usize, answers: &[&str]) -> RunOutput {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("Mix")).unwrap();
        let transport = catalog();
        let log = AcceptLog::open(dir.path().join("Mix.log")).unwrap();
        let pipeline = Pipeline::new(
            SearchClient::new(DEFAULT_SEARCH_URL, &transport, &HtmlRowSource),
            AcquisitionManager::new(&transport, &log, mode.is_dry_run()),
            mode,
            dir.path().to_path_buf(),
            "Mix",
        )
        .with_workers(workers);
        let mut prompter = ScriptedPrompter::new(answers);
        let mut reporter = RecordingReporter::default();

        let stats = pipeline.run(&wanted(), &mut prompter, &mut reporter);
        let logged = log.entries().unwrap();
        (stats, reporter.events, logged, transport)
    }

    #[test]
    fn test_auto_run() {
        let (stats, events, logged, _) = run_with(SelectionMode::Auto, 1, &[]);
        assert_eq!(stats.wanted, 4);
        assert_eq!(stats.downloaded, 2);
        assert_eq!(stats.not_found, 1);
        assert_eq!(stats.no_link, 1);
        assert_eq!(logged, vec!["Alpha Top", "Gamma"]);
        assert_eq!(
            events,
            vec![
                "search alpha",
                "found 2",
                "acquire Alpha Top",
                "Downloaded",
                "search missing",
                "found 0",
                "not found",
                "search beta",
                "found 1",
                "acquire Beta",
                "NoLink",
                "search gamma",
                "found 1",
                "acquire Gamma",
                "Downloaded",
            ]
        );
    }

    #[test]
    fn test_parallel_prefetch_keeps_song_order() {
        let (sequential, seq_events, seq_logged, _) = run_with(SelectionMode::Auto, 1, &[]);
        let (parallel, par_events, par_logged, _) = run_with(SelectionMode::Auto, 4, &[]);
        assert_eq!(par_events, seq_events);
        assert_eq!(par_logged, seq_logged);
        assert_eq!(parallel.downloaded, sequential.downloaded);
    }

    #[test]
    fn test_interactive_run() {
        // alpha: pick the lower ranked one; beta: skip; gamma: retry then pick
        let (stats, _, logged, _) = run_with(SelectionMode::Interactive, 2, &["2", "0", "x", "1"]);
        assert_eq!(stats.downloaded, 2);
        assert_eq!(stats.skipped, 1);
        assert_eq!(logged, vec!["Alpha Low", "Gamma"]);
    }

    #[test]
    fn test_dry_run_transfers_nothing() {
        let (stats, _, logged, transport) = run_with(SelectionMode::DryRun, 1, &[]);
        assert_eq!(stats.matched_only, 2);
        assert_eq!(stats.downloaded, 0);
        assert_eq!(logged, vec!["Alpha Top", "Gamma"]);
        assert!(transport.requested().iter().all(|u| !u.starts_with("https://dl/")));
    }

    #[test]
    fn test_search_failure_does_not_stop_run() {
        let dir = tempfile::tempdir().unwrap();
        let transport = FakeTransport {
            fail: true,
            ..Default::default()
        };
        let log = AcceptLog::open(dir.path().join("x.log")).unwrap();
        let pipeline = Pipeline::new(
            SearchClient::new(DEFAULT_SEARCH_URL, &transport, &HtmlRowSource),
            AcquisitionManager::new(&transport, &log, false),
            SelectionMode::Auto,
            dir.path().to_path_buf(),
            "x",
        );
        let mut reporter = RecordingReporter::default();
        let stats = pipeline.run(&wanted(), &mut ScriptedPrompter::default(), &mut reporter);
        assert_eq!(stats.failed, 4);
        assert_eq!(reporter.events.iter().filter(|e| *e == "failed").count(), 4);
    }

    #[test]
    fn test_in_order_reassembles() {
        let (tx, rx) = unbounded();
        for i in [2usize, 0, 1] {
            tx.send((i, i * 10)).unwrap();
        }
        drop(tx);
        let mut ordered = InOrder::new(rx);
        assert_eq!(ordered.take(0), Some(0));
        assert_eq!(ordered.take(1), Some(10));
        assert_eq!(ordered.take(2), Some(20));
        assert_eq!(ordered.take(3), None);
    }
}
