//! Artifact export — JSON and CSV persistence for backtest results.
//!
//! Every persisted JSON artifact carries a `schema_version` field; newer
//! versions than this build understands are rejected on load.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use goldcross_core::domain::ClosedTrade;
use goldcross_core::engine::EquityPoint;
use tracing::info;

use crate::runner::{BacktestResult, SCHEMA_VERSION};

/// Serialize a `BacktestResult` to pretty JSON.
pub fn export_json(result: &BacktestResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize BacktestResult to JSON")
}

/// Deserialize a `BacktestResult`, rejecting schema versions newer than
/// this build writes.
pub fn import_json(json: &str) -> Result<BacktestResult> {
    let result: BacktestResult =
        serde_json::from_str(json).context("failed to deserialize BacktestResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

/// Export the trade tape as CSV.
///
/// Columns: symbol, entry_date, entry_price, exit_date, exit_price,
/// quantity, capital_committed, pnl, pnl_pct, reason, signal_strength,
/// days_held
pub fn export_trades_csv(trades: &[ClosedTrade]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "symbol",
        "entry_date",
        "entry_price",
        "exit_date",
        "exit_price",
        "quantity",
        "capital_committed",
        "pnl",
        "pnl_pct",
        "reason",
        "signal_strength",
        "days_held",
    ])?;

    for t in trades {
        wtr.write_record([
            &t.symbol,
            &t.entry_date.to_string(),
            &format!("{:.4}", t.entry_price),
            &t.exit_date.to_string(),
            &format!("{:.4}", t.exit_price),
            &format!("{}", t.quantity),
            &format!("{:.2}", t.capital_committed),
            &format!("{:.2}", t.pnl),
            &format!("{:.4}", t.pnl_pct),
            t.reason.label(),
            &format!("{:.4}", t.signal_strength),
            &t.days_held.to_string(),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export the equity curve as CSV with date and equity columns.
pub fn export_equity_csv(equity_curve: &[EquityPoint]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["date", "equity"])?;
    for point in equity_curve {
        wtr.write_record([&point.date.to_string(), &format!("{:.2}", point.equity)])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Save the full artifact set for a run.
///
/// Creates `{output_dir}/{run_id}/` containing:
/// - `result.json` — the full `BacktestResult`
/// - `trades.csv` — the trade tape
/// - `equity.csv` — the equity curve
///
/// Re-running an identical config overwrites its own directory.
pub fn save_artifacts(result: &BacktestResult, output_dir: &Path) -> Result<PathBuf> {
    let run_dir = output_dir.join(&result.run_id);
    fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact directory {}", run_dir.display()))?;

    fs::write(run_dir.join("result.json"), export_json(result)?)
        .context("failed to write result.json")?;
    fs::write(run_dir.join("trades.csv"), export_trades_csv(&result.trades)?)
        .context("failed to write trades.csv")?;
    fs::write(
        run_dir.join("equity.csv"),
        export_equity_csv(&result.equity_curve)?,
    )
    .context("failed to write equity.csv")?;

    info!(dir = %run_dir.display(), "artifacts saved");
    Ok(run_dir)
}

/// Load a previously saved `result.json` from an artifact directory.
pub fn load_artifacts(run_dir: &Path) -> Result<BacktestResult> {
    let path = run_dir.join("result.json");
    let json = fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DataConfig, RunConfig};
    use crate::runner::run_single_backtest;
    use chrono::NaiveDate;
    use goldcross_core::config::StrategyParams;

    fn sample_result() -> BacktestResult {
        let config = RunConfig {
            universe: vec!["AAA".into(), "BBB".into(), "CCC".into()],
            benchmark: None,
            data: DataConfig::Synthetic {
                seed: 5,
                start_date: NaiveDate::from_ymd_opt(2022, 1, 3).unwrap(),
                bar_count: 300,
            },
            strategy: StrategyParams {
                min_signal_strength: 0.0,
                volume_multiple: 0.0,
                ..StrategyParams::default()
            },
        };
        run_single_backtest(&config).unwrap()
    }

    #[test]
    fn json_round_trip_preserves_the_result() {
        let result = sample_result();
        let json = export_json(&result).unwrap();
        let back = import_json(&json).unwrap();
        assert_eq!(back.run_id, result.run_id);
        assert_eq!(back.trades.len(), result.trades.len());
        assert_eq!(back.final_equity, result.final_equity);
        assert_eq!(back.config, result.config);
    }

    #[test]
    fn future_schema_versions_are_rejected() {
        let result = sample_result();
        let json = export_json(&result)
            .unwrap()
            .replacen("\"schema_version\": 1", "\"schema_version\": 99", 1);
        let err = import_json(&json).unwrap_err();
        assert!(err.to_string().contains("unsupported schema version 99"));
    }

    #[test]
    fn trades_csv_has_header_and_one_row_per_trade() {
        let result = sample_result();
        let csv = export_trades_csv(&result.trades).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), result.trades.len() + 1);
        assert!(lines[0].starts_with("symbol,entry_date,"));
        if let Some(first) = result.trades.first() {
            assert!(lines[1].starts_with(&first.symbol));
            assert!(lines[1].contains(first.reason.label()));
        }
    }

    #[test]
    fn equity_csv_covers_every_bar() {
        let result = sample_result();
        let csv = export_equity_csv(&result.equity_curve).unwrap();
        assert_eq!(csv.lines().count(), result.equity_curve.len() + 1);
    }

    #[test]
    fn artifacts_round_trip_through_disk() {
        let result = sample_result();
        let out = tempfile::tempdir().unwrap();

        let run_dir = save_artifacts(&result, out.path()).unwrap();
        assert_eq!(run_dir, out.path().join(&result.run_id));
        assert!(run_dir.join("trades.csv").exists());
        assert!(run_dir.join("equity.csv").exists());

        let back = load_artifacts(&run_dir).unwrap();
        assert_eq!(
            serde_json::to_string(&back).unwrap(),
            serde_json::to_string(&result).unwrap()
        );
    }
}
