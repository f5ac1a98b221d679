//! Command-line interface.

mod report;
mod scrape;

use std::path::PathBuf;

use clap::{ArgGroup, Parser};

#[derive(Parser, Debug)]
#[command(name = "kobe-bids")]
#[command(about = "Fetch Kobe City bid results for a date range into CSV, XLSX or Google Sheets")]
#[command(version)]
#[command(group(ArgGroup::new("sink").required(true).multiple(true).args(["csv", "xlsx", "gsheet"])))]
pub struct Cli {
    /// First bid-opening date to include (YYYY-MM-DD)
    pub start: String,

    /// Last bid-opening date to include (YYYY-MM-DD)
    pub end: String,

    /// Write records to this CSV file
    #[arg(long, value_name = "FILE", env = "KOBE_BIDS_CSV")]
    pub csv: Option<PathBuf>,

    /// Write records to this Excel workbook (rewritten on every run)
    #[arg(long, value_name = "FILE", env = "KOBE_BIDS_XLSX")]
    pub xlsx: Option<PathBuf>,

    /// Write records to this Google spreadsheet (spreadsheet ID)
    #[arg(long, value_name = "SPREADSHEET_ID", env = "KOBE_BIDS_GSHEET")]
    pub gsheet: Option<String>,

    /// OAuth access token for the Sheets API
    #[arg(long, env = "GOOGLE_SHEETS_ACCESS_TOKEN", hide_env_values = true)]
    pub gsheet_token: Option<String>,

    /// Worksheet name for --gsheet and --xlsx (overrides config)
    #[arg(long)]
    pub sheet_name: Option<String>,

    /// Replace sink contents instead of appending new records
    #[arg(long)]
    pub overwrite: bool,

    /// Split the range into one-month searches
    #[arg(long)]
    pub monthly: bool,

    /// Stop after this many listing pages (overrides config)
    #[arg(long)]
    pub max_pages: Option<u32>,

    /// Use only the direct HTTP tier
    #[arg(long)]
    pub no_browser: bool,

    /// Show the browser window instead of running headless
    #[arg(long)]
    pub headed: bool,

    /// Config file path (default: ./kobe-bids.toml if present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    scrape::execute(cli).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_a_sink() {
        let result = Cli::try_parse_from(["kobe-bids", "2025-04-01", "2025-04-30"]);
        // A sink may still arrive through the environment.
        if ["KOBE_BIDS_CSV", "KOBE_BIDS_XLSX", "KOBE_BIDS_GSHEET"]
            .iter()
            .all(|var| std::env::var_os(var).is_none())
        {
            assert!(result.is_err());
        }
    }

    #[test]
    fn test_parses_flags() {
        let cli = Cli::try_parse_from([
            "kobe-bids",
            "2025-04-01",
            "2025-06-30",
            "--csv",
            "out.csv",
            "--overwrite",
            "--monthly",
            "--max-pages",
            "5",
            "--no-browser",
        ])
        .unwrap();

        assert_eq!(cli.start, "2025-04-01");
        assert_eq!(cli.csv, Some(PathBuf::from("out.csv")));
        assert!(cli.overwrite && cli.monthly && cli.no_browser);
        assert_eq!(cli.max_pages, Some(5));
        assert!(!cli.verbose);
    }

    #[test]
    fn test_xlsx_alone_satisfies_sink_group() {
        let cli = Cli::try_parse_from([
            "kobe-bids",
            "2025-04-01",
            "2025-04-30",
            "--xlsx",
            "bids.xlsx",
        ])
        .unwrap();
        assert_eq!(cli.xlsx, Some(PathBuf::from("bids.xlsx")));
    }
}
