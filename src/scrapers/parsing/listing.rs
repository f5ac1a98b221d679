//! Search-result listing parser.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::{element_text, ANCHOR, ROW, TABLE, TD, TH};
use crate::config::{resolve_url, SiteConfig};
use crate::models::{ListingPage, ListingSummary, RecordHandle};
use crate::scrapers::error::ParseError;

/// Link texts that mark the "next page" control.
pub const NEXT_PAGE_LABELS: &[&str] = &["次へ", "次ページ", ">", "＞"];

static RESULTS_TABLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table.kekka").unwrap());
static WINDOW_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"window\.open\(\s*['"]([^'"]+)['"]"#).unwrap());

/// Minimum data cells for a result row.
const MIN_ROW_CELLS: usize = 4;

/// Extracts record handles and the next-page flag from a results page.
#[derive(Debug, Clone)]
pub struct ListingParser {
    base_url: String,
    no_results_markers: Vec<String>,
}

impl ListingParser {
    pub fn new(base_url: impl Into<String>, no_results_markers: Vec<String>) -> Self {
        Self {
            base_url: base_url.into(),
            no_results_markers,
        }
    }

    pub fn from_site(site: &SiteConfig) -> Self {
        Self::new(site.base_url.clone(), site.no_results_markers.clone())
    }

    pub fn parse(&self, markup: &str) -> Result<ListingPage, ParseError> {
        let document = Html::parse_document(markup);

        let Some(table) = find_results_table(&document) else {
            if self.no_results_markers.iter().any(|m| markup.contains(m.as_str())) {
                debug!("Listing reports no results");
                return Ok(ListingPage::default());
            }
            return Err(ParseError::ListingParseFailed);
        };

        let records: Vec<RecordHandle> = table
            .select(&ROW)
            .filter_map(|row| self.parse_row(&row))
            .collect();
        let has_next = has_enabled_next_link(&document);

        debug!(
            "Parsed listing: {} records, has_next={}",
            records.len(),
            has_next
        );
        Ok(ListingPage { records, has_next })
    }

    fn parse_row(&self, row: &ElementRef<'_>) -> Option<RecordHandle> {
        if row.select(&TH).next().is_some() {
            return None;
        }
        let cells: Vec<ElementRef<'_>> = row.select(&TD).collect();
        if cells.len() < MIN_ROW_CELLS {
            return None;
        }

        let locator = row_locator(&cells[0])?;
        let summary = ListingSummary {
            construction_name: element_text(&cells[0]),
            bid_opening_datetime: element_text(&cells[1]),
            bid_method: element_text(&cells[2]),
            case_number: element_text(&cells[3]),
        };

        Some(RecordHandle::new(resolve_url(&self.base_url, &locator)).with_summary(summary))
    }
}

/// `table.kekka`, else the first non-form table whose header mentions 開札.
fn find_results_table(document: &Html) -> Option<ElementRef<'_>> {
    if let Some(table) = document.select(&RESULTS_TABLE).next() {
        return Some(table);
    }

    document.select(&TABLE).find(|table| {
        let is_form = table
            .value()
            .attr("class")
            .is_some_and(|c| c.split_whitespace().any(|c| c == "base-table"));
        !is_form && header_mentions_opening(table)
    })
}

fn header_mentions_opening(table: &ElementRef<'_>) -> bool {
    if table.select(&TH).any(|th| element_text(&th).contains("開札")) {
        return true;
    }
    table
        .select(&ROW)
        .next()
        .is_some_and(|row| element_text(&row).contains("開札"))
}

/// Detail-page locator from the first cell: `href`, else a `window.open` target.
fn row_locator(cell: &ElementRef<'_>) -> Option<String> {
    for anchor in cell.select(&ANCHOR) {
        let element = anchor.value();
        if let Some(href) = element.attr("href").map(str::trim) {
            if !href.is_empty() && href != "#" && !href.starts_with("javascript:") {
                return Some(href.to_string());
            }
        }
        if let Some(target) = element.attr("onclick").and_then(onclick_target) {
            return Some(target);
        }
    }
    None
}

fn onclick_target(onclick: &str) -> Option<String> {
    WINDOW_OPEN
        .captures(onclick)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

fn is_next_label(text: &str) -> bool {
    NEXT_PAGE_LABELS.contains(&text) || text.starts_with("次へ")
}

fn is_disabled(anchor: &ElementRef<'_>) -> bool {
    let element = anchor.value();
    let class_disabled = element
        .attr("class")
        .is_some_and(|c| c.split_whitespace().any(|c| c == "disabled"));
    let aria_disabled = element
        .attr("aria-disabled")
        .is_some_and(|v| v.eq_ignore_ascii_case("true"));
    let inert = element.attr("href").is_none() && element.attr("onclick").is_none();
    class_disabled || aria_disabled || inert
}

fn has_enabled_next_link(document: &Html) -> bool {
    document
        .select(&ANCHOR)
        .any(|a| is_next_label(&element_text(&a)) && !is_disabled(&a))
}
