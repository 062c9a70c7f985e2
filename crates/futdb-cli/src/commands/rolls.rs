use std::fmt::Write as _;

use futdb_core::RollSummary;
use futdb_warehouse::rolls::RollDetector;
use futdb_warehouse::Warehouse;

use crate::cli::DetectRollsArgs;
use crate::error::CliError;
use crate::output::CommandOutput;

/// Recompute rolls, or with `--summary` report what is already stored.
pub fn run(warehouse: &Warehouse, args: &DetectRollsArgs) -> Result<CommandOutput, CliError> {
    let detector = RollDetector::new(warehouse);
    let summaries = match (&args.root, args.summary) {
        (Some(root), false) => detector.detect_root(root)?,
        (None, false) => detector.detect_all()?,
        (Some(root), true) => detector.summarize_root(root)?,
        (None, true) => detector.summarize_all()?,
    };
    if args.summary {
        Ok(summary_output(&summaries))
    } else {
        Ok(detection_output(&summaries))
    }
}

fn detection_output(summaries: &[RollSummary]) -> CommandOutput {
    let stored: usize = summaries.iter().map(|summary| summary.roll_count).sum();
    let mut text = String::new();
    for summary in summaries {
        let _ = write!(
            text,
            "{} (rank {}): {} rolls",
            summary.contract_series, summary.rank, summary.roll_count
        );
        if let (Some(first), Some(last)) = (summary.first_roll, summary.last_roll) {
            let _ = write!(text, " ({first} .. {last})");
        }
        text.push('\n');
    }
    let _ = write!(
        text,
        "stored {stored} roll events across {} series",
        summaries.len()
    );

    let data = serde_json::json!({
        "stored_events": stored,
        "series": summaries,
    });
    CommandOutput::new(data, text)
}

fn summary_output(summaries: &[RollSummary]) -> CommandOutput {
    let mut text = String::from("series | rank | rolls | latest roll\n");
    for summary in summaries {
        let latest = summary
            .last_roll
            .map_or_else(|| String::from("-"), |date| date.to_string());
        let _ = writeln!(
            text,
            "{} | {} | {} | {latest}",
            summary.contract_series, summary.rank, summary.roll_count
        );
    }
    let total: usize = summaries.iter().map(|summary| summary.roll_count).sum();
    let _ = write!(text, "{total} stored roll events");

    let rows: Vec<serde_json::Value> = summaries
        .iter()
        .map(|summary| {
            serde_json::json!({
                "contract_series": summary.contract_series,
                "rank": summary.rank,
                "roll_count": summary.roll_count,
                "latest_roll": summary.last_roll,
            })
        })
        .collect();
    CommandOutput::new(
        serde_json::json!({ "stored_events": total, "series": rows }),
        text,
    )
}
