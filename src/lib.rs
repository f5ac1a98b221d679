//! kobe-bids: Kobe City bid-result acquisition.
//!
//! Searches the city's bid-result site over a date range, extracts each
//! result into a fixed eight-column record, drops records already present in
//! the output, and writes the rest to CSV or Google Sheets.

pub mod cli;
pub mod config;
pub mod models;
pub mod pipeline;
pub mod scrapers;
pub mod storage;
