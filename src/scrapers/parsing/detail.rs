//! Detail-page parser.
//!
//! Fields are located by their row label rather than position. Each field is
//! looked up in this order, first non-blank value wins:
//!
//! 1. the `table.detail` block, using the detail-table labels;
//! 2. `dt`/`dd` pairs, using the alternate labels;
//! 3. any table row whose first cell carries an alternate label;
//! 4. the listing row the handle came from (name, datetime and method only).

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::{element_text, CELL, ROW};
use crate::models::{BidField, BidRecord, ListingSummary};
use crate::scrapers::error::ParseError;

static DETAIL_ROW: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table.detail tr").unwrap());
static DEFINITION_TERM: LazyLock<Selector> = LazyLock::new(|| Selector::parse("dt").unwrap());

/// Labels under which one field appears.
#[derive(Debug, Clone, Copy)]
pub struct FieldLabels {
    pub field: BidField,
    /// Labels used inside `table.detail`.
    pub detail_table: &'static [&'static str],
    /// Labels used by the other layouts.
    pub alternate: &'static [&'static str],
}

pub const FIELD_LABELS: [FieldLabels; 8] = [
    FieldLabels {
        field: BidField::ConstructionName,
        detail_table: &["工事（業務）名", "工事名"],
        alternate: &["工事名", "件名", "業務名"],
    },
    FieldLabels {
        field: BidField::BidOpeningDatetime,
        detail_table: &["開札日時"],
        alternate: &["入札日時", "開札日時", "開札年月日"],
    },
    FieldLabels {
        field: BidField::BidMethod,
        detail_table: &["入札方式"],
        alternate: &["入札方式", "入札方法"],
    },
    FieldLabels {
        field: BidField::ParticipantCount,
        detail_table: &["参加者数"],
        alternate: &["指名・参加数", "参加者数", "参加数"],
    },
    FieldLabels {
        field: BidField::AwardAmount,
        detail_table: &["落札金額（税込）"],
        alternate: &["決定金額(税抜)", "決定金額", "落札金額(税抜)", "落札金額"],
    },
    FieldLabels {
        field: BidField::EstimatedPrice,
        detail_table: &["予定価格（税込）"],
        alternate: &["予定価格(税抜)", "予定価格"],
    },
    FieldLabels {
        field: BidField::MinimumPrice,
        detail_table: &["最低制限価格（税込）"],
        alternate: &["最低制限価格または調査基準価格(税抜)", "最低制限価格"],
    },
    FieldLabels {
        field: BidField::Counterparty,
        detail_table: &["契約の相手方"],
        alternate: &["契約の相手方", "契約相手", "落札者"],
    },
];

pub fn labels_for(field: BidField) -> &'static FieldLabels {
    // FIELD_LABELS is ordered like BidField::ALL
    &FIELD_LABELS[field as usize]
}

/// Canonical form for label comparison: ASCII parentheses, no whitespace,
/// no trailing colon.
pub fn normalize_label(label: &str) -> String {
    let normalized: String = label
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| match c {
            '（' => '(',
            '）' => ')',
            other => other,
        })
        .collect();
    normalized
        .trim_end_matches([':', '：'])
        .to_string()
}

/// (normalized label, value) pairs from one layout.
type LabelledValues = Vec<(String, String)>;

/// Builds a [`BidRecord`] from a detail page.
#[derive(Debug, Clone, Default)]
pub struct DetailParser;

impl DetailParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse a detail page, completing missing fields from `summary`.
    ///
    /// Fails with [`ParseError::DetailParseFailed`] when the page itself
    /// yields none of the eight fields.
    pub fn parse(&self, markup: &str, summary: &ListingSummary) -> Result<BidRecord, ParseError> {
        let document = Html::parse_document(markup);
        let detail_table = detail_table_values(&document);
        let definitions = definition_list_values(&document);
        let any_rows = labelled_row_values(&document);

        let mut record = BidRecord::new();
        let mut from_page = 0;
        for labels in &FIELD_LABELS {
            let value = lookup(&detail_table, labels.detail_table)
                .or_else(|| lookup(&definitions, labels.alternate))
                .or_else(|| lookup(&any_rows, labels.alternate));
            if let Some(value) = value {
                record.set(labels.field, value);
                from_page += 1;
            }
        }

        if from_page == 0 {
            return Err(ParseError::DetailParseFailed);
        }

        for field in record.missing_fields() {
            if let Some(value) = summary.get(field) {
                debug!("Completing {} from listing row", field);
                record.set(field, value);
            }
        }

        Ok(record)
    }
}

fn lookup<'a>(values: &'a LabelledValues, labels: &[&str]) -> Option<&'a str> {
    labels.iter().find_map(|label| {
        let wanted = normalize_label(label);
        values
            .iter()
            .find(|(l, v)| *l == wanted && !v.is_empty())
            .map(|(_, v)| v.as_str())
    })
}

/// Label/value pairs from a row, read as alternating cells.
fn row_pairs(row: &ElementRef<'_>) -> LabelledValues {
    let cells: Vec<String> = row.select(&CELL).map(|c| element_text(&c)).collect();
    cells
        .chunks(2)
        .filter_map(|pair| match pair {
            [label, value] => Some((normalize_label(label), value.trim().to_string())),
            _ => None,
        })
        .collect()
}

fn detail_table_values(document: &Html) -> LabelledValues {
    document
        .select(&DETAIL_ROW)
        .flat_map(|row| row_pairs(&row))
        .collect()
}

fn definition_list_values(document: &Html) -> LabelledValues {
    document
        .select(&DEFINITION_TERM)
        .filter_map(|dt| {
            let dd = dt
                .next_siblings()
                .filter_map(ElementRef::wrap)
                .find(|e| matches!(e.value().name(), "dd" | "dt"))?;
            if dd.value().name() != "dd" {
                return None;
            }
            Some((normalize_label(&element_text(&dt)), element_text(&dd)))
        })
        .collect()
}

/// First cell as label, second as value, for every row in the document.
fn labelled_row_values(document: &Html) -> LabelledValues {
    document
        .select(&ROW)
        .filter_map(|row| {
            let mut cells = row.select(&CELL);
            let label = cells.next()?;
            let value = cells.next()?;
            Some((normalize_label(&element_text(&label)), element_text(&value)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> ListingSummary {
        ListingSummary {
            construction_name: "テスト工事1".into(),
            bid_opening_datetime: "2025-04-01 10:00".into(),
            bid_method: "一般競争入札".into(),
            case_number: "R7-001".into(),
        }
    }

    #[test]
    fn test_detail_table_fills_every_field() {
        let html = r#"
            <table class="detail">
              <tr><th>工事（業務）名</th><td>テスト工事1</td></tr>
              <tr><th>開札日時</th><td>2025-04-01 10:00</td></tr>
              <tr><th>入札方式</th><td>一般競争入札</td></tr>
              <tr><th>参加者数</th><td>5</td></tr>
              <tr><th>落札金額（税込）</th><td>1,100,000円</td></tr>
              <tr><th>予定価格（税込）</th><td>1,210,000円</td></tr>
              <tr><th>最低制限価格（税込）</th><td>990,000円</td></tr>
              <tr><th>契約の相手方</th><td>テスト会社1</td></tr>
            </table>
        "#;
        let record = DetailParser::new().parse(html, &summary()).unwrap();

        assert!(record.missing_fields().is_empty());
        assert_eq!(record.get(BidField::AwardAmount), "1,100,000円");
        assert_eq!(record.get(BidField::Counterparty), "テスト会社1");
    }

    #[test]
    fn test_two_pairs_per_row() {
        let html = r#"
            <table class="detail">
              <tr><th>参加者数</th><td>3</td><th>入札方式</th><td>指名競争入札</td></tr>
            </table>
        "#;
        let record = DetailParser::new().parse(html, &ListingSummary::default()).unwrap();
        assert_eq!(record.get(BidField::ParticipantCount), "3");
        assert_eq!(record.get(BidField::BidMethod), "指名競争入札");
    }

    #[test]
    fn test_award_amount_from_alternate_row() {
        let html = r#"
            <table class="detail">
              <tr><th>工事名</th><td>テスト工事1</td></tr>
              <tr><th>落札金額（税込）</th><td> </td></tr>
            </table>
            <table class="summary">
              <tr><td>決定金額 (税抜)</td><td>1,000,000</td></tr>
            </table>
        "#;
        let record = DetailParser::new().parse(html, &summary()).unwrap();
        assert_eq!(record.get(BidField::AwardAmount), "1,000,000");
    }

    #[test]
    fn test_definition_list_layout() {
        let html = r#"
            <dl>
              <dt>件名</dt><dd>テスト業務2</dd>
              <dt>落札者</dt><dd>テスト会社2</dd>
              <dt>予定価格</dt>
              <dt>最低制限価格</dt><dd>800,000</dd>
            </dl>
        "#;
        let record = DetailParser::new().parse(html, &ListingSummary::default()).unwrap();
        assert_eq!(record.get(BidField::ConstructionName), "テスト業務2");
        assert_eq!(record.get(BidField::Counterparty), "テスト会社2");
        assert_eq!(record.get(BidField::EstimatedPrice), "");
        assert_eq!(record.get(BidField::MinimumPrice), "800,000");
    }

    #[test]
    fn test_summary_completes_missing_fields_only() {
        let html = r#"
            <table class="detail">
              <tr><th>工事名</th><td>詳細側の工事名</td></tr>
              <tr><th>契約の相手方</th><td>テスト会社1</td></tr>
            </table>
        "#;
        let record = DetailParser::new().parse(html, &summary()).unwrap();
        assert_eq!(record.get(BidField::ConstructionName), "詳細側の工事名");
        assert_eq!(record.get(BidField::BidOpeningDatetime), "2025-04-01 10:00");
        assert_eq!(record.get(BidField::BidMethod), "一般競争入札");
        assert_eq!(record.get(BidField::AwardAmount), BidRecord::EMPTY);
    }

    #[test]
    fn test_page_without_fields_fails_even_with_summary() {
        let html = "<html><body><p>エラーが発生しました</p></body></html>";
        assert_eq!(
            DetailParser::new().parse(html, &summary()).unwrap_err(),
            ParseError::DetailParseFailed
        );
    }

    #[test]
    fn test_normalize_label() {
        assert_eq!(normalize_label(" 工事（業務）名 "), "工事(業務)名");
        assert_eq!(normalize_label("決定金額 (税抜)："), "決定金額(税抜)");
        assert_eq!(normalize_label("指名・参加数"), "指名・参加数");
    }

    #[test]
    fn test_labels_follow_field_order() {
        for field in BidField::ALL {
            assert_eq!(labels_for(field).field, field);
        }
    }
}
