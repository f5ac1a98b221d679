//! Data models for kobe-bids.

mod date_range;
mod record;

pub use date_range::{parse_date, DateRange, DateRangeError};
pub use record::{
    column_headers, BidField, BidRecord, IdentityKey, ListingPage, ListingSummary, RecordHandle,
};
