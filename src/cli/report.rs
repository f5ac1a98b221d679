//! Console output for a finished run.

use console::style;

use crate::pipeline::{RunOutcome, RunSummary};
use crate::storage::{RecordSink, SinkError};

/// Skipped records listed individually before collapsing.
const MAX_LISTED_SKIPS: usize = 10;

pub fn print_run(summary: &RunSummary) {
    println!(
        "{} {} records extracted ({} found across {} listing pages)",
        style("✓").green(),
        summary.records_extracted,
        summary.handles_found,
        summary.pages_fetched
    );

    for warning in &summary.warnings {
        println!("{} {}", style("!").yellow(), warning);
    }

    if !summary.skipped.is_empty() {
        println!(
            "{} {} records skipped",
            style("!").yellow(),
            summary.skipped.len()
        );
        for skip in summary.skipped.iter().take(MAX_LISTED_SKIPS) {
            println!("    {} {}", style("→").dim(), skip);
        }
        if summary.skipped.len() > MAX_LISTED_SKIPS {
            println!(
                "    {} ... and {} more",
                style("→").dim(),
                summary.skipped.len() - MAX_LISTED_SKIPS
            );
        }
    }

    if summary.cancelled {
        println!("{} Run was interrupted", style("!").yellow());
    }

    let outcome = summary.outcome();
    let label = match outcome {
        RunOutcome::FullSuccess => style(outcome.to_string()).green(),
        RunOutcome::Partial { .. } => style(outcome.to_string()).yellow(),
        RunOutcome::Fatal => style(outcome.to_string()).red(),
    };
    println!("{} Result: {}", style("→").cyan(), label);
}

pub fn print_sink_result(sink: &dyn RecordSink, result: &Result<usize, SinkError>) {
    match result {
        Ok(0) => println!(
            "{} {}: nothing new to write",
            style("→").dim(),
            sink.describe()
        ),
        Ok(n) => println!(
            "{} {}: {} new records written",
            style("✓").green(),
            sink.describe(),
            n
        ),
        Err(e) => println!("{} {}: {}", style("✗").red(), sink.describe(), e),
    }
}
