use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::config::SimulationConfig;
use super::state::{CashOut, SimulationState};

/// Read-only view of the account after a simulated day.
///
/// Histories are shared with the engine, never mutated after the snapshot is
/// handed out. Holding on to a snapshot only costs a copy of each history on
/// the engine's next append.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationSnapshot {
    #[serde(rename = "currentDay")]
    pub day: u32,
    pub horizon_days: u32,
    pub initial_balance: f64,

    pub successful_trades: u64,
    pub failed_trades: u64,
    pub win_rate: f64,

    pub current_win_streak: u32,
    pub current_loss_streak: u32,
    pub longest_win_streak: u32,
    pub longest_loss_streak: u32,

    pub final_balance: f64,
    pub peak_balance: f64,
    pub profit_loss: f64,
    pub total_win_amount: f64,
    pub total_loss_amount: f64,
    pub average_win: f64,
    pub average_loss: f64,
    pub max_drawdown: f64,

    pub total_cashed_out: f64,
    pub cash_out_history: Arc<Vec<CashOut>>,

    pub balance_history: Arc<Vec<f64>>,
    pub trades_per_day: Arc<Vec<u32>>,
    pub wins_per_day: Arc<Vec<u32>>,
    pub losses_per_day: Arc<Vec<u32>>,
}

impl SimulationSnapshot {
    pub fn capture(state: &SimulationState, config: &SimulationConfig) -> Self {
        Self {
            day: state.day,
            horizon_days: config.horizon_days,
            initial_balance: config.initial_balance,
            successful_trades: state.successful_trades,
            failed_trades: state.failed_trades,
            win_rate: state.win_rate(),
            current_win_streak: state.current_win_streak,
            current_loss_streak: state.current_loss_streak,
            longest_win_streak: state.longest_win_streak,
            longest_loss_streak: state.longest_loss_streak,
            final_balance: state.balance,
            peak_balance: state.peak_balance,
            profit_loss: state.profit_loss(config.initial_balance),
            total_win_amount: state.total_win_amount,
            total_loss_amount: state.total_loss_amount,
            average_win: state.average_win(),
            average_loss: state.average_loss(),
            max_drawdown: state.max_drawdown,
            total_cashed_out: state.total_cashed_out,
            cash_out_history: Arc::clone(&state.cash_out_history),
            balance_history: Arc::clone(&state.balance_history),
            trades_per_day: Arc::clone(&state.trades_per_day),
            wins_per_day: Arc::clone(&state.wins_per_day),
            losses_per_day: Arc::clone(&state.losses_per_day),
        }
    }

    pub fn total_trades(&self) -> u64 {
        self.successful_trades + self.failed_trades
    }

    /// True once the last day of the horizon has been simulated
    pub fn is_complete(&self) -> bool {
        self.day >= self.horizon_days
    }

    /// Cash-out made on `day`, if there was one
    pub fn cash_out_on(&self, day: u32) -> Option<&CashOut> {
        self.cash_out_history.iter().find(|c| c.day == day)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_initial_state() {
        let config = SimulationConfig::default();
        let state = SimulationState::new(config.initial_balance);
        let snapshot = SimulationSnapshot::capture(&state, &config);

        assert_eq!(snapshot.day, 0);
        assert_eq!(snapshot.final_balance, 1000.0);
        assert_eq!(snapshot.profit_loss, 0.0);
        assert_eq!(snapshot.win_rate, 0.0);
        assert!(!snapshot.is_complete());
        assert!(Arc::ptr_eq(&snapshot.balance_history, &state.balance_history));
    }

    #[test]
    fn test_serializes_with_camel_case_names() {
        let config = SimulationConfig::default();
        let state = SimulationState::new(config.initial_balance);
        let json = serde_json::to_value(SimulationSnapshot::capture(&state, &config)).unwrap();

        assert_eq!(json["currentDay"], 0);
        assert_eq!(json["finalBalance"], 1000.0);
        assert_eq!(json["balanceHistory"], serde_json::json!([1000.0]));
        assert!(json.get("cashOutHistory").is_some());
    }
}
