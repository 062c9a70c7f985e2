use std::fmt::Write as _;

use futdb_core::{ContinuousSymbol, FuturesSymbol, RollStrategy, ValidationError, YearResolution};
use serde_json::{json, Value};

use crate::cli::ParseSymbolArgs;
use crate::output::CommandOutput;

/// Unrecognized symbols are listed and make the command exit 1.
pub fn run(args: &ParseSymbolArgs, years: YearResolution) -> Result<CommandOutput, ValidationError> {
    let mut rows = Vec::with_capacity(args.symbols.len());
    let mut text = String::new();
    let mut unrecognized = 0;

    for symbol in &args.symbols {
        if let Some(parsed) = FuturesSymbol::parse(symbol, years) {
            let expiry = parsed.imm_expiry()?;
            let _ = writeln!(
                text,
                "{symbol}: root={} month={} year={} imm_expiry={expiry}",
                parsed.root, parsed.month, parsed.year
            );
            rows.push(json!({
                "symbol": symbol,
                "kind": "outright",
                "root": parsed.root,
                "month": parsed.month,
                "year": parsed.year,
                "imm_expiry": expiry,
            }));
            continue;
        }

        match continuous_series(symbol, args.roll_strategy) {
            Ok((continuous, series_id)) => {
                let _ = writeln!(
                    text,
                    "{symbol}: root={} rank={} series={series_id}",
                    continuous.root, continuous.rank
                );
                rows.push(json!({
                    "symbol": symbol,
                    "kind": "continuous",
                    "root": continuous.root,
                    "rank": continuous.rank,
                    "contract_series": series_id,
                }));
            }
            Err(error) => {
                unrecognized += 1;
                let _ = writeln!(text, "{symbol}: unrecognized ({error})");
                rows.push(json!({ "symbol": symbol, "root": Value::Null, "error": error.to_string() }));
            }
        }
    }

    let output = CommandOutput::new(Value::Array(rows), text);
    Ok(if unrecognized > 0 {
        output.with_exit_code(1)
    } else {
        output
    })
}

fn continuous_series(
    symbol: &str,
    roll_strategy: Option<RollStrategy>,
) -> Result<(ContinuousSymbol, String), ValidationError> {
    let continuous = ContinuousSymbol::parse(symbol)?;
    let series = continuous.to_series(roll_strategy.unwrap_or_else(|| continuous.family()))?;
    Ok((continuous, series.id()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(symbols: &[&str], roll_strategy: Option<RollStrategy>) -> ParseSymbolArgs {
        ParseSymbolArgs {
            symbols: symbols.iter().map(|symbol| (*symbol).to_owned()).collect(),
            roll_strategy,
        }
    }

    #[test]
    fn resolves_single_and_two_digit_years() {
        let output = run(
            &args(&["ESH6", "SR3Z25", "6BM25"], None),
            YearResolution::for_reference_year(2025),
        )
        .expect("parse");
        assert_eq!(output.exit_code, 0);
        assert!(output.text.contains("ESH6: root=ES month=3 year=2026 imm_expiry=2026-03-18"));
        assert!(output.text.contains("SR3Z25: root=SR3 month=12 year=2025"));
        assert!(output.text.contains("6BM25: root=6B month=6 year=2025"));
    }

    #[test]
    fn continuous_symbols_bind_to_a_series_id() {
        let calendar_2d = RollStrategy::parse("calendar-2d").expect("strategy");
        let output = run(
            &args(&["ES.c.0", "NQ.v.1"], Some(calendar_2d)),
            YearResolution::for_reference_year(2025),
        )
        .expect("run");
        assert_eq!(output.data[0]["contract_series"], "ES_FRONT_CALENDAR_2D");
        // The volume family cannot take a calendar rule.
        assert_eq!(output.data[1]["root"], Value::Null);
        assert_eq!(output.exit_code, 1);

        let output = run(&args(&["NQ.v.1"], None), YearResolution::for_reference_year(2025))
            .expect("run");
        assert_eq!(output.data[0]["contract_series"], "NQ_RANK_1_VOLUME");
        assert_eq!(output.exit_code, 0);
    }

    #[test]
    fn unrecognized_symbols_exit_nonzero() {
        let output = run(&args(&["ESH6-ESM6"], None), YearResolution::for_reference_year(2025))
            .expect("run");
        assert_eq!(output.exit_code, 1);
        assert!(output.text.starts_with("ESH6-ESM6: unrecognized"));
    }
}
