//! Aggregate performance figures derived from a snapshot

use serde::{Deserialize, Serialize};

use super::snapshot::SimulationSnapshot;

/// Average win rate of retail traders
pub const RETAIL_WIN_RATE: f64 = 0.35;

/// Annual bank interest used as the passive benchmark
pub const BANK_INTEREST_RATE: f64 = 0.05;

/// Win rate above which a run counts as top performing
pub const TOP_PERFORMER_WIN_RATE: f64 = 0.85;

/// How a completed run compares against simple benchmarks
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketComparison {
    pub beats_retail_win_rate: bool,
    /// Return as a multiple of bank interest, `None` when below it
    pub bank_rate_multiple: Option<f64>,
    pub top_performer: bool,
}

/// Summary cards for a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceSummary {
    pub day: u32,
    pub total_trades: u64,
    pub win_rate: f64,
    pub profit_factor: f64,
    /// Expected result of a single trade
    pub expectancy: f64,
    /// Balance still in the account plus everything cashed out
    pub portfolio_value: f64,
    pub total_return_pct: f64,
    pub max_drawdown: f64,
    pub longest_win_streak: u32,
    pub longest_loss_streak: u32,
    pub comparison: MarketComparison,
}

impl PerformanceSummary {
    pub fn from_snapshot(snapshot: &SimulationSnapshot) -> Self {
        let profit_factor = if snapshot.total_loss_amount > 0.0 {
            snapshot.total_win_amount / snapshot.total_loss_amount
        } else if snapshot.total_win_amount > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        let expectancy = snapshot.average_win * snapshot.win_rate
            - snapshot.average_loss * (1.0 - snapshot.win_rate);

        let portfolio_value = snapshot.final_balance + snapshot.total_cashed_out;
        let starting = snapshot
            .balance_history
            .first()
            .copied()
            .unwrap_or(snapshot.initial_balance);
        let total_return_pct = (portfolio_value / starting - 1.0) * 100.0;

        let bank_pct = BANK_INTEREST_RATE * 100.0;
        let comparison = MarketComparison {
            beats_retail_win_rate: snapshot.win_rate > RETAIL_WIN_RATE,
            bank_rate_multiple: (total_return_pct > bank_pct).then(|| total_return_pct / bank_pct),
            top_performer: snapshot.win_rate > TOP_PERFORMER_WIN_RATE,
        };

        Self {
            day: snapshot.day,
            total_trades: snapshot.total_trades(),
            win_rate: snapshot.win_rate,
            profit_factor,
            expectancy,
            portfolio_value,
            total_return_pct,
            max_drawdown: snapshot.max_drawdown,
            longest_win_streak: snapshot.longest_win_streak,
            longest_loss_streak: snapshot.longest_loss_streak,
            comparison,
        }
    }
}

impl std::fmt::Display for PerformanceSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Day {}", self.day)?;
        writeln!(f, "  Portfolio value:    ${:.2}", self.portfolio_value)?;
        writeln!(f, "  Total return:       {:.2}%", self.total_return_pct)?;
        writeln!(f, "  Total trades:       {}", self.total_trades)?;
        writeln!(f, "  Win rate:           {:.2}%", self.win_rate * 100.0)?;
        writeln!(f, "  Profit factor:      {:.2}", self.profit_factor)?;
        writeln!(f, "  Expectancy:         ${:.2}", self.expectancy)?;
        writeln!(f, "  Max drawdown:       {:.2}%", self.max_drawdown * 100.0)?;
        write!(
            f,
            "  Longest streaks:    {} wins / {} losses",
            self.longest_win_streak, self.longest_loss_streak
        )
    }
}
