//! Excel workbook sink.
//!
//! XLSX files cannot be appended to in place, so every write rewrites the
//! workbook: the rows already in the sheet first, then the new ones. Only the
//! target worksheet survives a rewrite.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use calamine::{open_workbook, Data, Reader, Xlsx};
use rust_xlsxwriter::{Workbook, Worksheet};
use tracing::debug;

use super::{require_identity_columns, RecordSink, SinkError, WriteMode};
use crate::models::{column_headers, BidRecord};

/// One worksheet of an `.xlsx` file.
#[derive(Debug, Clone)]
pub struct XlsxSink {
    path: PathBuf,
    sheet_name: String,
}

impl XlsxSink {
    pub fn new(path: impl Into<PathBuf>, sheet_name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            sheet_name: sheet_name.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Cells of the target sheet, header row first.
    ///
    /// Falls back to the first sheet when none has the configured name.
    /// `None` if the file does not exist.
    fn read_table(&self) -> Result<Option<Vec<Vec<Data>>>, SinkError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let mut workbook: Xlsx<_> = open_workbook(&self.path)?;
        let names = workbook.sheet_names();
        let Some(name) = names
            .iter()
            .find(|n| **n == self.sheet_name)
            .or_else(|| names.first())
            .cloned()
        else {
            return Ok(Some(Vec::new()));
        };
        let range = workbook.worksheet_range(&name)?;
        Ok(Some(range.rows().map(|row| row.to_vec()).collect()))
    }

    fn save(
        &self,
        header: &[String],
        kept: &[Vec<Data>],
        added: &[Vec<String>],
    ) -> Result<(), SinkError> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name(&self.sheet_name)?;

        for (col, name) in (0u16..).zip(header) {
            sheet.write_string(0, col, name)?;
        }
        let mut rows = 1u32..;
        for (cells, row) in kept.iter().zip(rows.by_ref()) {
            for (col, cell) in (0u16..).zip(cells) {
                write_cell(sheet, row, col, cell)?;
            }
        }
        for (cells, row) in added.iter().zip(rows) {
            for (col, value) in (0u16..).zip(cells) {
                if !value.is_empty() {
                    sheet.write_string(row, col, value)?;
                }
            }
        }

        workbook.save(&self.path)?;
        Ok(())
    }
}

/// Numbers and booleans keep their type; anything else is written as text.
fn write_cell(sheet: &mut Worksheet, row: u32, col: u16, cell: &Data) -> Result<(), SinkError> {
    match cell {
        Data::Empty => {}
        Data::Float(f) => {
            sheet.write_number(row, col, *f)?;
        }
        Data::Int(i) => {
            sheet.write_number(row, col, *i as f64)?;
        }
        Data::Bool(b) => {
            sheet.write_boolean(row, col, *b)?;
        }
        other => {
            sheet.write_string(row, col, other.to_string())?;
        }
    }
    Ok(())
}

fn cell_texts(row: &[Data]) -> Vec<String> {
    row.iter().map(|c| c.to_string()).collect()
}

#[async_trait]
impl RecordSink for XlsxSink {
    fn describe(&self) -> String {
        format!("XLSX {} ({})", self.path.display(), self.sheet_name)
    }

    async fn read_existing(&self) -> Result<Vec<BidRecord>, SinkError> {
        let Some(table) = self.read_table()? else {
            return Ok(Vec::new());
        };
        let Some((header, rows)) = table.split_first() else {
            return Ok(Vec::new());
        };
        let header = cell_texts(header);
        let records: Vec<BidRecord> = rows
            .iter()
            .map(|row| BidRecord::from_row(&header, &cell_texts(row)))
            .collect();
        debug!("Read {} records from {}", records.len(), self.path.display());
        Ok(records)
    }

    async fn write(&self, records: &[BidRecord], mode: WriteMode) -> Result<(), SinkError> {
        let table = match mode {
            WriteMode::Append => self.read_table()?.unwrap_or_default(),
            WriteMode::Create => Vec::new(),
        };

        let (header, kept) = match table.split_first() {
            Some((header, rows)) => {
                let header = cell_texts(header);
                require_identity_columns(&header)?;
                (header, rows)
            }
            None => (
                column_headers().into_iter().map(String::from).collect(),
                &[][..],
            ),
        };
        let added: Vec<Vec<String>> = records.iter().map(|r| r.to_row_under(&header)).collect();

        self.save(&header, kept, &added)?;
        debug!(
            "Wrote {} records to {} ({} kept, {:?})",
            added.len(),
            self.path.display(),
            kept.len(),
            mode
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BidField;
    use crate::storage::persist;
    use tempfile::tempdir;

    fn record(n: u32) -> BidRecord {
        BidRecord::new()
            .with(BidField::ConstructionName, format!("テスト工事{}", n))
            .with(BidField::BidOpeningDatetime, format!("2025-04-0{} 10:00", n))
            .with(BidField::ParticipantCount, "3")
            .with(BidField::AwardAmount, "1,000,000円")
            .with(BidField::Counterparty, format!("テスト会社{}", n))
    }

    fn sink(dir: &Path) -> XlsxSink {
        XlsxSink::new(dir.join("bids.xlsx"), "Sheet1")
    }

    #[tokio::test]
    async fn test_missing_file_reads_empty() {
        let dir = tempdir().unwrap();
        assert!(sink(dir.path()).read_existing().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_then_read_back() {
        let dir = tempdir().unwrap();
        let sink = sink(dir.path());

        sink.write(&[record(1), record(2)], WriteMode::Create)
            .await
            .unwrap();

        let table = sink.read_table().unwrap().unwrap();
        assert_eq!(cell_texts(&table[0]), column_headers());
        assert_eq!(sink.read_existing().await.unwrap(), vec![record(1), record(2)]);
    }

    #[tokio::test]
    async fn test_append_rewrites_with_earlier_rows_first() {
        let dir = tempdir().unwrap();
        let sink = sink(dir.path());

        assert_eq!(
            persist(&sink, &[record(1), record(2)], WriteMode::Append)
                .await
                .unwrap(),
            2
        );
        assert_eq!(
            persist(&sink, &[record(2), record(3)], WriteMode::Append)
                .await
                .unwrap(),
            1
        );
        assert_eq!(
            persist(&sink, &[record(1), record(3)], WriteMode::Append)
                .await
                .unwrap(),
            0
        );

        assert_eq!(
            sink.read_existing().await.unwrap(),
            vec![record(1), record(2), record(3)]
        );
    }

    #[tokio::test]
    async fn test_create_mode_drops_earlier_rows() {
        let dir = tempdir().unwrap();
        let sink = sink(dir.path());

        persist(&sink, &[record(1), record(2)], WriteMode::Append)
            .await
            .unwrap();
        persist(&sink, &[record(3)], WriteMode::Create).await.unwrap();

        assert_eq!(sink.read_existing().await.unwrap(), vec![record(3)]);
    }

    #[tokio::test]
    async fn test_append_keeps_foreign_header_and_cells() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("legacy.xlsx");
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "開札日時").unwrap();
        sheet.write_string(0, 1, "工事名").unwrap();
        sheet.write_string(0, 2, "備考").unwrap();
        sheet.write_string(1, 0, "2025-04-01 10:00").unwrap();
        sheet.write_string(1, 1, "テスト工事1").unwrap();
        sheet.write_number(1, 2, 42.0).unwrap();
        workbook.save(&path).unwrap();

        let sink = XlsxSink::new(&path, "入札結果");
        assert_eq!(
            persist(&sink, &[record(1), record(2)], WriteMode::Append)
                .await
                .unwrap(),
            1
        );
        assert_eq!(
            persist(&sink, &[record(2)], WriteMode::Append).await.unwrap(),
            0
        );

        let table = sink.read_table().unwrap().unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(cell_texts(&table[0]), vec!["開札日時", "工事名", "備考"]);
        assert_eq!(table[1][2], Data::Float(42.0));
        assert_eq!(
            cell_texts(&table[2])[..2],
            ["2025-04-02 10:00".to_string(), "テスト工事2".to_string()]
        );
    }

    #[tokio::test]
    async fn test_append_refuses_header_without_identity_columns() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("other.xlsx");
        let mut workbook = Workbook::new();
        workbook.add_worksheet().write_string(0, 0, "名前").unwrap();
        workbook.save(&path).unwrap();

        let err = XlsxSink::new(&path, "Sheet1")
            .write(&[record(1)], WriteMode::Append)
            .await
            .unwrap_err();
        assert!(matches!(err, SinkError::MissingColumn(_)));
    }
}
