//! Mutable account state advanced by the engine, one day at a time

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A profit withdrawal made at the end of a day
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CashOut {
    pub day: u32,
    pub amount: f64,
}

/// Result of a single simulated trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeOutcome {
    Win,
    Loss,
}

impl std::fmt::Display for TradeOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradeOutcome::Win => write!(f, "WIN"),
            TradeOutcome::Loss => write!(f, "LOSS"),
        }
    }
}

/// Trades taken during the day currently being simulated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DayTally {
    pub trades: u32,
    pub wins: u32,
    pub losses: u32,
}

/// Account state owned by a [`SimulationEngine`](super::SimulationEngine).
///
/// Day-indexed histories live behind `Arc` so snapshots can share them.
/// Appends go through `Arc::make_mut`: when no snapshot still holds the
/// buffer it grows in place, otherwise the engine copies before writing and
/// the snapshot keeps the old contents untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationState {
    pub day: u32,
    pub balance: f64,
    pub peak_balance: f64,

    pub successful_trades: u64,
    pub failed_trades: u64,

    pub current_win_streak: u32,
    pub current_loss_streak: u32,
    pub longest_win_streak: u32,
    pub longest_loss_streak: u32,

    pub total_win_amount: f64,
    pub total_loss_amount: f64,

    /// Largest peak-to-trough decline seen so far, as a fraction of the peak
    pub max_drawdown: f64,

    pub total_cashed_out: f64,
    pub cash_out_history: Arc<Vec<CashOut>>,

    pub balance_history: Arc<Vec<f64>>,
    pub trades_per_day: Arc<Vec<u32>>,
    pub wins_per_day: Arc<Vec<u32>>,
    pub losses_per_day: Arc<Vec<u32>>,
}

impl SimulationState {
    pub fn new(initial_balance: f64) -> Self {
        Self {
            day: 0,
            balance: initial_balance,
            peak_balance: initial_balance,
            successful_trades: 0,
            failed_trades: 0,
            current_win_streak: 0,
            current_loss_streak: 0,
            longest_win_streak: 0,
            longest_loss_streak: 0,
            total_win_amount: 0.0,
            total_loss_amount: 0.0,
            max_drawdown: 0.0,
            total_cashed_out: 0.0,
            cash_out_history: Arc::new(Vec::new()),
            balance_history: Arc::new(vec![initial_balance]),
            trades_per_day: Arc::new(vec![0]),
            wins_per_day: Arc::new(vec![0]),
            losses_per_day: Arc::new(vec![0]),
        }
    }

    pub fn total_trades(&self) -> u64 {
        self.successful_trades + self.failed_trades
    }

    pub fn win_rate(&self) -> f64 {
        let total = self.total_trades();
        if total > 0 {
            self.successful_trades as f64 / total as f64
        } else {
            0.0
        }
    }

    pub fn average_win(&self) -> f64 {
        if self.successful_trades > 0 {
            self.total_win_amount / self.successful_trades as f64
        } else {
            0.0
        }
    }

    pub fn average_loss(&self) -> f64 {
        if self.failed_trades > 0 {
            self.total_loss_amount / self.failed_trades as f64
        } else {
            0.0
        }
    }

    /// Net result including everything already withdrawn
    pub fn profit_loss(&self, initial_balance: f64) -> f64 {
        self.balance - initial_balance + self.total_cashed_out
    }

    /// Settle one trade against the current balance
    pub(crate) fn apply_trade(
        &mut self,
        outcome: TradeOutcome,
        risk_amount: f64,
        reward_amount: f64,
        tally: &mut DayTally,
    ) {
        tally.trades += 1;

        match outcome {
            TradeOutcome::Win => {
                self.balance += reward_amount;
                self.successful_trades += 1;
                tally.wins += 1;
                self.current_win_streak += 1;
                self.current_loss_streak = 0;
                self.total_win_amount += reward_amount;
                self.longest_win_streak = self.longest_win_streak.max(self.current_win_streak);
            }
            TradeOutcome::Loss => {
                self.balance -= risk_amount;
                self.failed_trades += 1;
                tally.losses += 1;
                self.current_loss_streak += 1;
                self.current_win_streak = 0;
                self.total_loss_amount += risk_amount;
                self.longest_loss_streak = self.longest_loss_streak.max(self.current_loss_streak);
            }
        }

        self.update_drawdown();
    }

    /// `peak_balance` starts at the (positive) initial balance and only grows,
    /// so the division is always by a positive number. A negative balance
    /// yields a drawdown above 1.
    fn update_drawdown(&mut self) {
        if self.balance > self.peak_balance {
            self.peak_balance = self.balance;
        }
        let drawdown = (self.peak_balance - self.balance) / self.peak_balance;
        if drawdown > self.max_drawdown {
            self.max_drawdown = drawdown;
        }
    }

    /// Withdraw `fraction` of the profit above `initial_balance`, if any
    pub(crate) fn apply_cash_out(
        &mut self,
        day: u32,
        initial_balance: f64,
        fraction: f64,
    ) -> Option<CashOut> {
        if self.balance <= initial_balance {
            return None;
        }

        let profit = self.balance - initial_balance;
        let amount = profit * fraction;
        self.balance -= amount;
        self.total_cashed_out += amount;

        let cash_out = CashOut { day, amount };
        Arc::make_mut(&mut self.cash_out_history).push(cash_out);
        Some(cash_out)
    }

    /// Append the finished day to every history
    pub(crate) fn close_day(&mut self, tally: DayTally) {
        Arc::make_mut(&mut self.balance_history).push(self.balance);
        Arc::make_mut(&mut self.trades_per_day).push(tally.trades);
        Arc::make_mut(&mut self.wins_per_day).push(tally.wins);
        Arc::make_mut(&mut self.losses_per_day).push(tally.losses);
    }
}
