//! CSV export of a snapshot's daily history

use serde::Serialize;
use std::io::Write;
use std::path::Path;

use crate::simulation::{SimulationError, SimulationSnapshot};

#[derive(Debug, Serialize)]
struct HistoryRow {
    day: usize,
    balance: f64,
    trades: u32,
    wins: u32,
    losses: u32,
    cash_out: Option<f64>,
}

/// Write one row per recorded day, day 0 included
pub fn write_history_csv<W: Write>(
    snapshot: &SimulationSnapshot,
    writer: W,
) -> Result<(), SimulationError> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    for (day, balance) in snapshot.balance_history.iter().enumerate() {
        let cash_out = u32::try_from(day)
            .ok()
            .and_then(|d| snapshot.cash_out_on(d))
            .map(|c| c.amount);

        csv_writer.serialize(HistoryRow {
            day,
            balance: *balance,
            trades: snapshot.trades_per_day.get(day).copied().unwrap_or(0),
            wins: snapshot.wins_per_day.get(day).copied().unwrap_or(0),
            losses: snapshot.losses_per_day.get(day).copied().unwrap_or(0),
            cash_out,
        })?;
    }

    csv_writer.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Create (or truncate) `path` and write the history to it
pub fn export_history_csv(
    snapshot: &SimulationSnapshot,
    path: impl AsRef<Path>,
) -> Result<(), SimulationError> {
    let file = std::fs::File::create(path.as_ref()).map_err(csv::Error::from)?;
    write_history_csv(snapshot, file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::{ScriptedSource, SimulationConfig, SimulationEngine};

    #[test]
    fn test_history_csv_layout() {
        // Day 1: one winning trade. Day 2: no trades, cash-out day.
        let config = SimulationConfig::new(1000.0, 10.0, 2.0, 1)
            .with_horizon_days(2)
            .with_cash_out(2, 0.5);
        let source = ScriptedSource::new(vec![0.9, 0.0, 0.0]);
        let snapshot = SimulationEngine::with_source(config, source)
            .unwrap()
            .run_to_end()
            .unwrap();

        let mut buf = Vec::new();
        write_history_csv(&snapshot, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "day,balance,trades,wins,losses,cash_out");
        assert_eq!(lines[1], "0,1000.0,0,0,0,");
        assert_eq!(lines[2], "1,1200.0,1,1,0,");
        assert_eq!(lines[3], "2,1100.0,0,0,0,100.0");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn test_export_writes_file() {
        let snapshot = SimulationEngine::seeded(SimulationConfig::default().with_horizon_days(5), 1)
            .unwrap()
            .run_to_end()
            .unwrap();
        let path = std::env::temp_dir().join(format!("discipline-sim-{}.csv", uuid::Uuid::new_v4()));

        export_history_csv(&snapshot, &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(text.lines().count(), 7);
    }
}
