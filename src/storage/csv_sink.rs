//! UTF-8 CSV file sink.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use super::{require_identity_columns, RecordSink, SinkError, WriteMode};
use crate::models::{column_headers, BidRecord};

/// CSV file with a header row.
///
/// New files get the schema column order; appends follow whatever header the
/// file already has.
#[derive(Debug, Clone)]
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn is_empty_or_missing(&self) -> bool {
        fs::metadata(&self.path).map(|m| m.len() == 0).unwrap_or(true)
    }

    fn reader(&self) -> Result<csv::Reader<File>, SinkError> {
        Ok(csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&self.path)?)
    }
}

fn header_row(reader: &mut csv::Reader<File>) -> Result<Vec<String>, SinkError> {
    // Spreadsheet tools often prepend a BOM to the first header.
    Ok(reader
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect())
}

#[async_trait]
impl RecordSink for CsvSink {
    fn describe(&self) -> String {
        format!("CSV {}", self.path.display())
    }

    async fn read_existing(&self) -> Result<Vec<BidRecord>, SinkError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let mut reader = self.reader()?;
        let headers = header_row(&mut reader)?;

        let mut records = Vec::new();
        for row in reader.records() {
            let row = row?;
            let values: Vec<&str> = row.iter().collect();
            records.push(BidRecord::from_row(&headers, &values));
        }
        debug!("Read {} records from {}", records.len(), self.path.display());
        Ok(records)
    }

    async fn write(&self, records: &[BidRecord], mode: WriteMode) -> Result<(), SinkError> {
        // Appended rows follow the header already in the file.
        let existing_header = if mode == WriteMode::Append && !self.is_empty_or_missing() {
            let header = header_row(&mut self.reader()?)?;
            require_identity_columns(&header)?;
            Some(header)
        } else {
            None
        };

        let mut options = OpenOptions::new();
        options.create(true);
        match mode {
            WriteMode::Append => options.append(true),
            WriteMode::Create => options.write(true).truncate(true),
        };
        let file = options.open(&self.path)?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        match &existing_header {
            Some(header) => {
                for record in records {
                    writer.write_record(record.to_row_under(header))?;
                }
            }
            None => {
                writer.write_record(column_headers())?;
                for record in records {
                    writer.write_record(record.to_row())?;
                }
            }
        }
        writer.flush()?;

        debug!(
            "Wrote {} records to {} ({:?})",
            records.len(),
            self.path.display(),
            mode
        );
        Ok(())
    }
}
