//! Google Sheets sink over the Sheets v4 REST API.
//!
//! The caller supplies an OAuth access token; obtaining one is left to
//! tooling such as `gcloud auth print-access-token`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{require_identity_columns, RecordSink, SinkError, WriteMode};
use crate::config::SheetsConfig;
use crate::models::{column_headers, BidRecord};

/// Columns A..H hold the eight fields.
const COLUMN_SPAN: &str = "A:H";

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

#[derive(Debug, Serialize)]
struct ValueBody<'a> {
    values: &'a [Vec<String>],
}

/// What to do about the header row before appending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderAction {
    /// Sheet is empty: the header goes in front of the appended rows.
    Prepend,
    /// Sheet holds only a stale header row: overwrite it.
    Replace,
    /// Header is present (or the sheet holds data we must not touch).
    Keep,
}

/// Decide how to treat the header given the sheet's current values.
pub fn header_action(values: &[Vec<String>]) -> HeaderAction {
    let expected = column_headers();
    match values {
        [] => HeaderAction::Prepend,
        [only] if *only != expected => HeaderAction::Replace,
        [first, ..] if *first != expected => {
            warn!("Sheet header differs from the expected columns; leaving it as is");
            HeaderAction::Keep
        }
        _ => HeaderAction::Keep,
    }
}

/// Rows to append given the sheet's current values.
///
/// Under a kept header the cells follow that header's column order.
pub fn rows_to_append(
    action: HeaderAction,
    values: &[Vec<String>],
    records: &[BidRecord],
) -> Result<Vec<Vec<String>>, SinkError> {
    let mut rows: Vec<Vec<String>> = Vec::with_capacity(records.len() + 1);
    match (action, values.first()) {
        (HeaderAction::Keep, Some(header)) => {
            require_identity_columns(header)?;
            rows.extend(records.iter().map(|r| r.to_row_under(header)));
        }
        (HeaderAction::Prepend, _) => {
            rows.push(column_headers().into_iter().map(String::from).collect());
            rows.extend(records.iter().map(BidRecord::to_row));
        }
        _ => rows.extend(records.iter().map(BidRecord::to_row)),
    }
    Ok(rows)
}

/// Map sheet rows (header first) to records.
pub fn values_to_records(values: &[Vec<String>]) -> Vec<BidRecord> {
    match values.split_first() {
        Some((headers, rows)) => rows
            .iter()
            .map(|row| BidRecord::from_row(headers, row))
            .collect(),
        None => Vec::new(),
    }
}

fn cell_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// One worksheet of a Google spreadsheet.
pub struct GoogleSheetsSink {
    client: Client,
    api_base: String,
    spreadsheet_id: String,
    sheet_name: String,
    access_token: String,
}

impl GoogleSheetsSink {
    pub fn new(
        config: &SheetsConfig,
        spreadsheet_id: impl Into<String>,
        access_token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, SinkError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            spreadsheet_id: spreadsheet_id.into(),
            sheet_name: config.sheet_name.clone(),
            access_token: access_token.into(),
        })
    }

    /// `{base}/{id}/values/{sheet!range}{suffix}` with the range encoded.
    fn values_url(&self, range: &str, suffix: &str) -> String {
        let a1 = format!("{}!{}", self.sheet_name, range);
        format!(
            "{}/{}/values/{}{}",
            self.api_base,
            self.spreadsheet_id,
            urlencoding::encode(&a1),
            suffix
        )
    }

    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response, SinkError> {
        let response = request.bearer_auth(&self.access_token).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SinkError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn read_values(&self) -> Result<Vec<Vec<String>>, SinkError> {
        let url = self.values_url(COLUMN_SPAN, "");
        let range: ValueRange = self
            .send(self.client.get(&url))
            .await?
            .json()
            .await
            .map_err(|e| SinkError::Malformed(e.to_string()))?;
        Ok(range
            .values
            .iter()
            .map(|row| row.iter().map(cell_text).collect())
            .collect())
    }

    async fn clear(&self) -> Result<(), SinkError> {
        let url = self.values_url(COLUMN_SPAN, ":clear");
        self.send(self.client.post(&url).json(&serde_json::json!({})))
            .await?;
        Ok(())
    }

    async fn replace_header(&self) -> Result<(), SinkError> {
        let header = vec![column_headers().into_iter().map(String::from).collect()];
        let url = self.values_url("A1:H1", "");
        self.send(
            self.client
                .put(&url)
                .query(&[("valueInputOption", "RAW")])
                .json(&ValueBody { values: &header }),
        )
        .await?;
        Ok(())
    }

    async fn append(&self, rows: &[Vec<String>]) -> Result<(), SinkError> {
        if rows.is_empty() {
            return Ok(());
        }
        let url = self.values_url(COLUMN_SPAN, ":append");
        self.send(
            self.client
                .post(&url)
                .query(&[
                    ("valueInputOption", "RAW"),
                    ("insertDataOption", "INSERT_ROWS"),
                ])
                .json(&ValueBody { values: rows }),
        )
        .await?;
        debug!("Appended {} rows to {}", rows.len(), self.describe());
        Ok(())
    }
}

#[async_trait]
impl RecordSink for GoogleSheetsSink {
    fn describe(&self) -> String {
        format!("Google Sheet {} ({})", self.spreadsheet_id, self.sheet_name)
    }

    async fn read_existing(&self) -> Result<Vec<BidRecord>, SinkError> {
        Ok(values_to_records(&self.read_values().await?))
    }

    async fn write(&self, records: &[BidRecord], mode: WriteMode) -> Result<(), SinkError> {
        let values = match mode {
            WriteMode::Create => {
                self.clear().await?;
                Vec::new()
            }
            WriteMode::Append => self.read_values().await?,
        };
        let action = header_action(&values);
        let rows = rows_to_append(action, &values, records)?;
        if action == HeaderAction::Replace {
            self.replace_header().await?;
        }

        self.append(&rows).await
    }
}
