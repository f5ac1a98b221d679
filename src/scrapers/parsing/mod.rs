//! HTML parsers for search-result listings and detail pages.

mod detail;
mod listing;

pub use detail::{labels_for, normalize_label, DetailParser, FieldLabels, FIELD_LABELS};
pub use listing::{ListingParser, NEXT_PAGE_LABELS};

use std::sync::LazyLock;

use scraper::{ElementRef, Selector};

pub(crate) static TABLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("table").unwrap());
pub(crate) static ROW: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").unwrap());
pub(crate) static TH: LazyLock<Selector> = LazyLock::new(|| Selector::parse("th").unwrap());
pub(crate) static TD: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").unwrap());
pub(crate) static CELL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("th, td").unwrap());
pub(crate) static ANCHOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a").unwrap());

/// Text content with runs of whitespace collapsed to single spaces.
pub(crate) fn element_text(element: &ElementRef<'_>) -> String {
    let raw: String = element.text().collect();
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    #[test]
    fn test_element_text_collapses_whitespace() {
        let html =
            Html::parse_document("<table><tr><td>\n  1,234,000\n  円 </td></tr></table>");
        let td = html.select(&TD).next().unwrap();
        assert_eq!(element_text(&td), "1,234,000 円");
    }
}
