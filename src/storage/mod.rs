//! Output sinks and the dedup merge applied before every write.

mod csv_sink;
mod gsheet;
mod merge;
mod xlsx_sink;

pub use csv_sink::CsvSink;
pub use gsheet::{
    header_action, rows_to_append, values_to_records, GoogleSheetsSink, HeaderAction,
};
pub use merge::merge_new_records;
pub use xlsx_sink::XlsxSink;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use crate::models::{BidField, BidRecord};

/// Errors from reading or writing a sink.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("XLSX read error: {0}")]
    XlsxRead(#[from] calamine::XlsxError),
    #[error("XLSX write error: {0}")]
    XlsxWrite(#[from] rust_xlsxwriter::XlsxError),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("existing header has no {0} column")]
    MissingColumn(BidField),
}

/// Appending under an existing header needs both identity columns in it.
pub(crate) fn require_identity_columns<H: AsRef<str>>(header: &[H]) -> Result<(), SinkError> {
    for field in [BidField::ConstructionName, BidField::BidOpeningDatetime] {
        if !header
            .iter()
            .any(|h| BidField::from_column(h.as_ref()) == Some(field))
        {
            return Err(SinkError::MissingColumn(field));
        }
    }
    Ok(())
}

/// How a write treats existing sink contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Keep existing rows and add the new ones after them.
    #[default]
    Append,
    /// Replace everything.
    Create,
}

/// Destination for bid records.
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Human-readable location, for logs and the run summary.
    fn describe(&self) -> String;

    /// Records already persisted; empty if the sink does not exist yet.
    async fn read_existing(&self) -> Result<Vec<BidRecord>, SinkError>;

    async fn write(&self, records: &[BidRecord], mode: WriteMode) -> Result<(), SinkError>;
}

/// Dedup `records` against the sink and write the survivors.
///
/// In [`WriteMode::Create`] the existing contents are not consulted.
/// Returns the number of records written.
pub async fn persist(
    sink: &dyn RecordSink,
    records: &[BidRecord],
    mode: WriteMode,
) -> Result<usize, SinkError> {
    let existing = match mode {
        WriteMode::Append => sink.read_existing().await?,
        WriteMode::Create => Vec::new(),
    };
    let fresh = merge_new_records(records.to_vec(), &existing);
    info!(
        "{}: {} new of {} scraped ({} already present)",
        sink.describe(),
        fresh.len(),
        records.len(),
        existing.len()
    );

    if fresh.is_empty() && mode == WriteMode::Append {
        return Ok(0);
    }
    sink.write(&fresh, mode).await?;
    Ok(fresh.len())
}
