//! Bid record schema and listing handles.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The eight canonical bid-record fields, in output column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BidField {
    ConstructionName,
    BidOpeningDatetime,
    BidMethod,
    ParticipantCount,
    AwardAmount,
    EstimatedPrice,
    MinimumPrice,
    Counterparty,
}

impl BidField {
    /// All fields in schema order.
    pub const ALL: [BidField; 8] = [
        BidField::ConstructionName,
        BidField::BidOpeningDatetime,
        BidField::BidMethod,
        BidField::ParticipantCount,
        BidField::AwardAmount,
        BidField::EstimatedPrice,
        BidField::MinimumPrice,
        BidField::Counterparty,
    ];

    /// Column name used by every sink.
    pub fn column(&self) -> &'static str {
        match self {
            Self::ConstructionName => "工事名",
            Self::BidOpeningDatetime => "開札日時",
            Self::BidMethod => "入札方法",
            Self::ParticipantCount => "参加数",
            Self::AwardAmount => "決定金額",
            Self::EstimatedPrice => "予定価格",
            Self::MinimumPrice => "最低制限価格",
            Self::Counterparty => "契約相手",
        }
    }

    pub fn from_column(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.column() == name.trim())
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for BidField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// Header row in schema order.
pub fn column_headers() -> Vec<&'static str> {
    BidField::ALL.iter().map(|f| f.column()).collect()
}

/// (construction name, bid-opening datetime) pair used for dedup.
pub type IdentityKey = (String, String);

/// One bid result with all eight fields present.
///
/// Every field always has a value; missing data is the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BidRecord {
    values: [String; 8],
}

impl BidRecord {
    /// Value used for a field that could not be found.
    pub const EMPTY: &'static str = "";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: BidField) -> &str {
        &self.values[field.index()]
    }

    pub fn set(&mut self, field: BidField, value: impl Into<String>) {
        self.values[field.index()] = value.into();
    }

    /// Builder-style setter.
    pub fn with(mut self, field: BidField, value: impl Into<String>) -> Self {
        self.set(field, value);
        self
    }

    pub fn is_populated(&self, field: BidField) -> bool {
        !self.get(field).is_empty()
    }

    pub fn populated_count(&self) -> usize {
        self.values.iter().filter(|v| !v.is_empty()).count()
    }

    pub fn missing_fields(&self) -> Vec<BidField> {
        BidField::ALL
            .into_iter()
            .filter(|f| !self.is_populated(*f))
            .collect()
    }

    pub fn identity_key(&self) -> IdentityKey {
        (
            self.get(BidField::ConstructionName).to_string(),
            self.get(BidField::BidOpeningDatetime).to_string(),
        )
    }

    /// Iterate `(field, value)` pairs in schema order.
    pub fn fields(&self) -> impl Iterator<Item = (BidField, &str)> {
        BidField::ALL.into_iter().map(move |f| (f, self.get(f)))
    }

    /// Values in schema order, for row-oriented sinks.
    pub fn to_row(&self) -> Vec<String> {
        self.values.to_vec()
    }

    /// Values laid out under an existing header row.
    ///
    /// Columns that name no field are left empty.
    pub fn to_row_under<H: AsRef<str>>(&self, headers: &[H]) -> Vec<String> {
        headers
            .iter()
            .map(|h| {
                BidField::from_column(h.as_ref())
                    .map(|f| self.get(f).to_string())
                    .unwrap_or_default()
            })
            .collect()
    }

    /// Build a record from a header row and a data row.
    ///
    /// Unknown columns are ignored; columns absent from the header stay empty.
    pub fn from_row<H, V>(headers: &[H], row: &[V]) -> Self
    where
        H: AsRef<str>,
        V: AsRef<str>,
    {
        let mut record = Self::new();
        for (header, value) in headers.iter().zip(row) {
            if let Some(field) = BidField::from_column(header.as_ref()) {
                record.set(field, value.as_ref());
            }
        }
        record
    }
}

/// Fields visible on a listing row, used to complete detail records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingSummary {
    pub construction_name: String,
    pub bid_opening_datetime: String,
    pub bid_method: String,
    pub case_number: String,
}

impl ListingSummary {
    /// Summary value for a field, if the listing carries one.
    pub fn get(&self, field: BidField) -> Option<&str> {
        let value = match field {
            BidField::ConstructionName => &self.construction_name,
            BidField::BidOpeningDatetime => &self.bid_opening_datetime,
            BidField::BidMethod => &self.bid_method,
            _ => return None,
        };
        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    }
}

/// Locator for one record's detail page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordHandle {
    /// Absolute detail-page URL.
    pub url: String,
    pub summary: ListingSummary,
}

impl RecordHandle {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            summary: ListingSummary::default(),
        }
    }

    pub fn with_summary(mut self, summary: ListingSummary) -> Self {
        self.summary = summary;
        self
    }
}

/// One parsed page of search results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPage {
    pub records: Vec<RecordHandle>,
    pub has_next: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_has_every_field_empty() {
        let record = BidRecord::new();
        assert_eq!(record.fields().count(), 8);
        assert!(record.fields().all(|(_, v)| v == BidRecord::EMPTY));
        assert_eq!(record.missing_fields(), BidField::ALL.to_vec());
    }

    #[test]
    fn test_column_round_trip() {
        for field in BidField::ALL {
            assert_eq!(BidField::from_column(field.column()), Some(field));
        }
        assert_eq!(BidField::from_column("案件番号"), None);
    }

    #[test]
    fn test_from_row_maps_by_header() {
        let headers = ["開札日時", "備考", "工事名"];
        let row = ["2025-04-01 10:00", "ignored", "テスト工事1"];
        let record = BidRecord::from_row(&headers, &row);

        assert_eq!(record.get(BidField::ConstructionName), "テスト工事1");
        assert_eq!(record.get(BidField::BidOpeningDatetime), "2025-04-01 10:00");
        assert_eq!(record.get(BidField::AwardAmount), "");
        assert_eq!(
            record.identity_key(),
            ("テスト工事1".to_string(), "2025-04-01 10:00".to_string())
        );
    }

    #[test]
    fn test_to_row_follows_schema_order() {
        let record = BidRecord::new()
            .with(BidField::Counterparty, "テスト会社1")
            .with(BidField::ConstructionName, "テスト工事1");
        let row = record.to_row();
        assert_eq!(row.len(), 8);
        assert_eq!(row[0], "テスト工事1");
        assert_eq!(row[7], "テスト会社1");
        assert_eq!(column_headers()[4], "決定金額");
    }

    #[test]
    fn test_to_row_under_follows_given_header() {
        let record = BidRecord::new()
            .with(BidField::ConstructionName, "テスト工事1")
            .with(BidField::BidOpeningDatetime, "2025-04-01 10:00");
        let row = record.to_row_under(&["開札日時", "備考", "工事名"]);
        assert_eq!(row, vec!["2025-04-01 10:00", "", "テスト工事1"]);
    }

    #[test]
    fn test_summary_only_covers_listing_fields() {
        let summary = ListingSummary {
            construction_name: "道路補修工事".to_string(),
            bid_opening_datetime: String::new(),
            bid_method: "一般競争入札".to_string(),
            case_number: "R7-001".to_string(),
        };
        assert_eq!(summary.get(BidField::ConstructionName), Some("道路補修工事"));
        assert_eq!(summary.get(BidField::BidOpeningDatetime), None);
        assert_eq!(summary.get(BidField::AwardAmount), None);
    }
}
