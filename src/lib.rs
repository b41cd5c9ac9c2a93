//! saber-fetch library - song resolution and acquisition pipeline shared by
//! all binaries.

pub mod acquire;
pub mod aggregate;
pub mod config;
pub mod display;
pub mod error;
pub mod input;
pub mod models;
pub mod normalize;
pub mod parser;
pub mod pipeline;
pub mod progress;
pub mod rows;
pub mod scoring;
pub mod search;
pub mod selection;
pub mod spotify;
pub mod transport;

pub use acquire::{AcceptLog, AcquisitionManager};
pub use error::{AcquireError, FetchError, InputError, RowError};
pub use models::{Outcome, RunStats, Selection, SongCandidate, SongReport, WantedSong};
pub use pipeline::{Pipeline, StatusReporter};
pub use rows::HtmlRowSource;
pub use search::SearchClient;
pub use selection::{Prompter, SelectionMode};
pub use transport::{HttpTransport, RetryPolicy, Transport};
