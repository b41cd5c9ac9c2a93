//! Catalog search: one relevance-ordered result page per query.

use crate::error::FetchError;
use crate::models::SongCandidate;
use crate::normalize::query_terms;
use crate::parser::{parse_row, ROW_SELECTOR};
use crate::rows::RowSource;
use crate::transport::Transport;

pub const DEFAULT_SEARCH_URL: &str = "https://bsaber.com/";

pub struct SearchClient<'a> {
    base_url: String,
    transport: &'a dyn Transport,
    rows: &'a dyn RowSource,
}

impl<'a> SearchClient<'a> {
    pub fn new(base_url: &str, transport: &'a dyn Transport, rows: &'a dyn RowSource) -> Self {
        Self {
            base_url: base_url.to_string(),
            transport,
            rows,
        }
    }

    /// Result page URL for `query`, ordered by relevance descending.
    pub fn search_url(&self, query: &str) -> String {
        format!(
            "{}?s={}&orderby=relevance&order=DESC",
            self.base_url,
            query_terms(query)
        )
    }

    /// Search the catalog and parse every song row on the result page.
    ///
    /// Widget rows are dropped silently, malformed rows are logged and
    /// dropped. Transport failures propagate.
    pub fn search(&self, query: &str) -> Result<Vec<SongCandidate>, FetchError> {
        let body = self.transport.fetch_text(&self.search_url(query))?;

        let mut candidates = Vec::new();
        self.rows.visit_rows(&body, ROW_SELECTOR, &mut |row| match parse_row(row) {
            Ok(Some(candidate)) => candidates.push(candidate),
            Ok(None) => {}
            Err(err) => log::warn!("skipping malformed result row for '{}': {}", query, err),
        });

        log::debug!("'{}' returned {} candidates", query, candidates.len());
        Ok(candidates)
    }
}
