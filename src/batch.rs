//! Monte Carlo batches of independent simulation runs
//!
//! Runs are seeded `base_seed + i`, so a batch is reproducible regardless of
//! how rayon schedules it.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::simulation::{SimulationConfig, SimulationEngine, SimulationError};

/// Parameters of a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchConfig {
    pub runs: usize,
    pub base_seed: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            runs: 10_000,
            base_seed: 0,
        }
    }
}

/// Final figures of one run
#[derive(Debug, Clone, Copy, PartialEq)]
struct RunOutcome {
    profit_loss: f64,
    max_drawdown: f64,
    win_rate: f64,
    final_balance: f64,
}

/// Distribution of outcomes across a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub runs: usize,
    pub profitable_runs: usize,
    pub profitable_rate: f64,
    /// Runs ending with a balance at or below zero
    pub blown_runs: usize,
    pub mean_profit_loss: f64,
    pub median_profit_loss: f64,
    pub p5_profit_loss: f64,
    pub p95_profit_loss: f64,
    pub mean_max_drawdown: f64,
    pub worst_max_drawdown: f64,
    pub mean_win_rate: f64,
}

/// Run `batch.runs` full simulations of `config` in parallel
pub fn run_batch(
    config: &SimulationConfig,
    batch: &BatchConfig,
) -> Result<BatchSummary, SimulationError> {
    config.validate()?;
    if batch.runs == 0 {
        return Err(SimulationError::InvalidConfig {
            field: "runs",
            reason: "must be > 0".to_string(),
        });
    }

    let outcomes: Vec<RunOutcome> = (0..batch.runs)
        .into_par_iter()
        .map(|i| -> Result<RunOutcome, SimulationError> {
            let seed = batch.base_seed.wrapping_add(i as u64);
            let snapshot = SimulationEngine::seeded(*config, seed)?.run_to_end()?;
            Ok(RunOutcome {
                profit_loss: snapshot.profit_loss,
                max_drawdown: snapshot.max_drawdown,
                win_rate: snapshot.win_rate,
                final_balance: snapshot.final_balance,
            })
        })
        .collect::<Result<_, _>>()?;

    let summary = summarize(&outcomes);
    info!(
        "Batch of {} runs: {:.1}% profitable, median P&L {:.2}",
        summary.runs,
        summary.profitable_rate * 100.0,
        summary.median_profit_loss
    );
    Ok(summary)
}

fn summarize(outcomes: &[RunOutcome]) -> BatchSummary {
    let runs = outcomes.len();
    let n = runs as f64;

    let profitable_runs = outcomes.iter().filter(|o| o.profit_loss > 0.0).count();
    let blown_runs = outcomes.iter().filter(|o| o.final_balance <= 0.0).count();

    let mut pnl: Vec<f64> = outcomes.iter().map(|o| o.profit_loss).collect();
    pnl.sort_by(f64::total_cmp);

    let worst_max_drawdown = outcomes
        .iter()
        .map(|o| o.max_drawdown)
        .fold(0.0, f64::max);

    BatchSummary {
        runs,
        profitable_runs,
        profitable_rate: profitable_runs as f64 / n,
        blown_runs,
        mean_profit_loss: pnl.iter().sum::<f64>() / n,
        median_profit_loss: pnl[runs / 2],
        p5_profit_loss: percentile(&pnl, 0.05),
        p95_profit_loss: percentile(&pnl, 0.95),
        mean_max_drawdown: outcomes.iter().map(|o| o.max_drawdown).sum::<f64>() / n,
        worst_max_drawdown,
        mean_win_rate: outcomes.iter().map(|o| o.win_rate).sum::<f64>() / n,
    }
}

/// Index-based percentile of sorted, non-empty data
fn percentile(sorted: &[f64], p: f64) -> f64 {
    let idx = ((sorted.len() as f64 * p) as usize).min(sorted.len() - 1);
    sorted[idx]
}

impl std::fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SIMULATION RESULTS ({} runs):", self.runs)?;
        writeln!(f, "{}", "-".repeat(40))?;
        writeln!(
            f,
            "  Profitable:         {} ({:.2}%)",
            self.profitable_runs,
            self.profitable_rate * 100.0
        )?;
        writeln!(f, "  Blown (<= 0):       {}", self.blown_runs)?;
        writeln!(f, "  Mean P&L:           ${:.2}", self.mean_profit_loss)?;
        writeln!(f, "  Median P&L:         ${:.2}", self.median_profit_loss)?;
        writeln!(f, "  5th percentile:     ${:.2}", self.p5_profit_loss)?;
        writeln!(f, "  95th percentile:    ${:.2}", self.p95_profit_loss)?;
        writeln!(f, "  Mean max drawdown:  {:.2}%", self.mean_max_drawdown * 100.0)?;
        writeln!(f, "  Worst max drawdown: {:.2}%", self.worst_max_drawdown * 100.0)?;
        write!(f, "  Mean win rate:      {:.2}%", self.mean_win_rate * 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_is_reproducible() {
        let config = SimulationConfig::default().with_horizon_days(60);
        let batch = BatchConfig { runs: 50, base_seed: 3 };

        let a = run_batch(&config, &batch).unwrap();
        let b = run_batch(&config, &batch).unwrap();

        assert_eq!(a, b);
        assert_eq!(a.runs, 50);
        assert!(a.p5_profit_loss <= a.median_profit_loss);
        assert!(a.median_profit_loss <= a.p95_profit_loss);
        assert!((0.0..=1.0).contains(&a.mean_win_rate));
    }

    #[test]
    fn test_batch_rejects_zero_runs() {
        let result = run_batch(&SimulationConfig::default(), &BatchConfig { runs: 0, base_seed: 0 });
        assert!(matches!(result, Err(SimulationError::InvalidConfig { field: "runs", .. })));
    }

    #[test]
    fn test_batch_without_trades_is_flat() {
        let config = SimulationConfig::new(1000.0, 2.0, 2.0, 0).with_horizon_days(30);
        let summary = run_batch(&config, &BatchConfig { runs: 8, base_seed: 1 }).unwrap();

        assert_eq!(summary.profitable_runs, 0);
        assert_eq!(summary.blown_runs, 0);
        assert_eq!(summary.mean_profit_loss, 0.0);
        assert_eq!(summary.worst_max_drawdown, 0.0);
    }

    #[test]
    fn test_percentile_bounds() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(percentile(&sorted, 0.0), 1.0);
        assert_eq!(percentile(&sorted, 0.5), 3.0);
        assert_eq!(percentile(&sorted, 1.0), 4.0);
    }
}
