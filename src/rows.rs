//! Row-level access to a fetched search page.
//!
//! The candidate parser only needs to look things up inside one result row,
//! so the page format hides behind [`Row`] and [`RowSource`]. The production
//! implementation uses `scraper`; tests use in-memory fakes.

use scraper::{ElementRef, Html, Selector};

/// Query capability over one opaque result row. Selectors are CSS selectors.
pub trait Row {
    /// Whether any descendant matches `selector`.
    fn contains(&self, selector: &str) -> bool;

    /// Text content of the first descendant matching `selector`.
    fn find_text(&self, selector: &str) -> Option<String>;

    /// Text content of every descendant matching `selector`, in document order.
    fn find_all_text(&self, selector: &str) -> Vec<String>;

    /// Attribute `name` of the first descendant matching `selector`.
    fn find_attr(&self, selector: &str, name: &str) -> Option<String>;
}

/// Splits a page body into rows.
pub trait RowSource: Send + Sync {
    /// Call `visit` for every element matching `row_selector`, in page order.
    fn visit_rows(&self, body: &str, row_selector: &str, visit: &mut dyn FnMut(&dyn Row));
}

// ============================================================================
// scraper-backed implementation
// ============================================================================

/// HTML row source backed by `scraper`.
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlRowSource;

impl RowSource for HtmlRowSource {
    fn visit_rows(&self, body: &str, row_selector: &str, visit: &mut dyn FnMut(&dyn Row)) {
        let Some(selector) = parse_selector(row_selector) else {
            return;
        };
        let document = Html::parse_document(body);
        for element in document.select(&selector) {
            visit(&HtmlRow { element });
        }
    }
}

struct HtmlRow<'a> {
    element: ElementRef<'a>,
}

impl HtmlRow<'_> {
    fn first(&self, selector: &str) -> Option<ElementRef<'_>> {
        let selector = parse_selector(selector)?;
        self.element.select(&selector).next()
    }
}

impl Row for HtmlRow<'_> {
    fn contains(&self, selector: &str) -> bool {
        self.first(selector).is_some()
    }

    fn find_text(&self, selector: &str) -> Option<String> {
        self.first(selector).map(|e| e.text().collect())
    }

    fn find_all_text(&self, selector: &str) -> Vec<String> {
        match parse_selector(selector) {
            Some(selector) => self
                .element
                .select(&selector)
                .map(|e| e.text().collect())
                .collect(),
            None => Vec::new(),
        }
    }

    fn find_attr(&self, selector: &str, name: &str) -> Option<String> {
        self.first(selector)
            .and_then(|e| e.value().attr(name))
            .map(str::to_string)
    }
}

fn parse_selector(selector: &str) -> Option<Selector> {
    match Selector::parse(selector) {
        Ok(parsed) => Some(parsed),
        Err(err) => {
            log::error!("invalid selector '{}': {:?}", selector, err);
            None
        }
    }
}
