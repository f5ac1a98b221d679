//! The scrape command: validate, fetch, dedup, write.

use std::time::Duration;

use anyhow::{bail, Context};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::report::{print_run, print_sink_result};
use super::Cli;
use crate::config::Config;
use crate::models::DateRange;
use crate::pipeline::{scrape_ranges, PaginationDriver, RecordPipeline, RunOutcome};
use crate::scrapers::build_fetcher;
use crate::storage::{persist, CsvSink, GoogleSheetsSink, RecordSink, WriteMode, XlsxSink};

/// Ranges longer than this are usually better run with `--monthly`.
const WIDE_RANGE_DAYS: i64 = 31;

pub async fn execute(cli: Cli) -> anyhow::Result<()> {
    // Reject bad input before touching the network.
    let range = DateRange::parse(&cli.start, &cli.end)?;

    let mut config = Config::load(cli.config.as_deref())?;
    apply_overrides(&mut config, &cli);
    config.validate()?;

    let sinks = build_sinks(&cli, &config)?;
    let mode = if cli.overwrite {
        WriteMode::Create
    } else {
        WriteMode::Append
    };

    let ranges = if cli.monthly {
        range.monthly_chunks()
    } else {
        if range.span_days() > WIDE_RANGE_DAYS {
            warn!(
                "{} spans {} days; the site may truncate large result sets (consider --monthly)",
                range,
                range.span_days()
            );
        }
        vec![range]
    };

    let mut fetcher = build_fetcher(&config).context("failed to set up HTTP client")?;
    let driver = PaginationDriver::new(config.pagination.max_pages);
    let pipeline = RecordPipeline::new().with_progress(detail_progress_bar(cli.verbose));

    let cancel = CancellationToken::new();
    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted; finishing the current request and saving what was collected");
                cancel.cancel();
            }
        })
    };

    println!(
        "{} Searching {} ({} search{})",
        style("→").cyan(),
        range,
        ranges.len(),
        if ranges.len() == 1 { "" } else { "es" }
    );
    let run = scrape_ranges(&mut fetcher, &driver, &pipeline, &ranges, &cancel).await;
    watcher.abort();

    print_run(&run.summary);
    let outcome = run.summary.outcome();

    let mut sink_failures = 0;
    if run.records.is_empty() {
        info!("No records to write");
    } else {
        for sink in &sinks {
            let result = persist(sink.as_ref(), &run.records, mode).await;
            if let Err(ref e) = result {
                error!("Failed to write to {}: {}", sink.describe(), e);
                sink_failures += 1;
            }
            print_sink_result(sink.as_ref(), &result);
        }
    }

    if sink_failures > 0 {
        bail!("{} of {} sinks failed", sink_failures, sinks.len());
    }
    if outcome == RunOutcome::Fatal {
        error!("Fetch failures left no records for {}", range);
        bail!("no records could be retrieved for {}", range);
    }
    Ok(())
}

fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(max_pages) = cli.max_pages {
        config.pagination.max_pages = max_pages;
    }
    if cli.no_browser {
        config.browser.enabled = false;
    }
    if cli.headed {
        config.browser.headless = false;
    }
    if let Some(ref name) = cli.sheet_name {
        config.sheets.sheet_name = name.clone();
    }
}

fn build_sinks(cli: &Cli, config: &Config) -> anyhow::Result<Vec<Box<dyn RecordSink>>> {
    let mut sinks: Vec<Box<dyn RecordSink>> = Vec::new();

    if let Some(ref path) = cli.csv {
        sinks.push(Box::new(CsvSink::new(path)));
    }

    if let Some(ref path) = cli.xlsx {
        sinks.push(Box::new(XlsxSink::new(path, config.sheets.sheet_name.clone())));
    }

    if let Some(ref spreadsheet_id) = cli.gsheet {
        let Some(ref token) = cli.gsheet_token else {
            bail!("--gsheet needs an access token (set GOOGLE_SHEETS_ACCESS_TOKEN or --gsheet-token)");
        };
        sinks.push(Box::new(GoogleSheetsSink::new(
            &config.sheets,
            spreadsheet_id.clone(),
            token.clone(),
            Duration::from_secs(config.http.timeout_secs.max(30)),
        )?));
    }

    Ok(sinks)
}

fn detail_progress_bar(verbose: bool) -> ProgressBar {
    if verbose {
        // Log lines already report each record.
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} records")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn cli(args: &[&str]) -> Cli {
        let mut full = vec!["kobe-bids", "2025-04-01", "2025-04-30"];
        full.extend_from_slice(args);
        Cli::try_parse_from(full).unwrap()
    }

    #[test]
    fn test_overrides_apply_to_config() {
        let mut config = Config::default();
        apply_overrides(
            &mut config,
            &cli(&["--csv", "x.csv", "--max-pages", "3", "--no-browser", "--sheet-name", "R7"]),
        );
        assert_eq!(config.pagination.max_pages, 3);
        assert!(!config.browser.enabled);
        assert_eq!(config.sheets.sheet_name, "R7");
    }

    #[test]
    fn test_gsheet_without_token_is_rejected() {
        let mut parsed = cli(&["--gsheet", "abc"]);
        parsed.gsheet_token = None;
        assert!(build_sinks(&parsed, &Config::default()).is_err());
    }

    #[test]
    fn test_builds_one_sink_per_destination() {
        let mut config = Config::default();
        let parsed = cli(&["--csv", "bids.csv", "--xlsx", "bids.xlsx", "--sheet-name", "R7"]);
        apply_overrides(&mut config, &parsed);

        let sinks = build_sinks(&parsed, &config).unwrap();
        let names: Vec<String> = sinks.iter().map(|s| s.describe()).collect();
        assert_eq!(names, vec!["CSV bids.csv", "XLSX bids.xlsx (R7)"]);
    }

    #[tokio::test]
    async fn test_invalid_date_fails_before_network() {
        let parsed = Cli::try_parse_from(["kobe-bids", "2025/04/01", "2025-04-30", "--csv", "x.csv"])
            .unwrap();
        let err = execute(parsed).await.unwrap_err();
        assert!(err.to_string().contains("invalid date format"));
    }
}
