//! Pull-based simulation engine
//!
//! Each [`SimulationEngine::advance`] call simulates exactly one day:
//! 1. DRAW - number of trades for the day, `floor(u * (max + 1))`
//! 2. TRADE - settle each trade against the current balance
//! 3. CASH OUT - on interval days, withdraw part of the profit
//! 4. RECORD - append the day to every history and emit a snapshot
//!
//! The engine does no timing of its own. Pausing is simply not calling
//! `advance`; cancelling is dropping the engine.

use rand::rngs::StdRng;
use tracing::{debug, trace};

use super::config::SimulationConfig;
use super::error::SimulationError;
use super::random::{RandomSource, RngSource};
use super::snapshot::SimulationSnapshot;
use super::state::{DayTally, SimulationState, TradeOutcome};

/// Result of advancing the engine by one day
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// A simulated day and the account after it
    Day(SimulationSnapshot),
    /// The horizon was already exhausted
    Done,
}

impl Step {
    pub fn into_snapshot(self) -> Option<SimulationSnapshot> {
        match self {
            Step::Day(snapshot) => Some(snapshot),
            Step::Done => None,
        }
    }
}

/// Where the engine is in its run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Running,
    /// `Step::Done` has been returned once
    Completed,
}

/// Day-by-day account simulation under a fixed risk policy
#[derive(Debug)]
pub struct SimulationEngine<R = RngSource<StdRng>> {
    config: SimulationConfig,
    state: SimulationState,
    source: R,
    lifecycle: Lifecycle,
}

impl SimulationEngine {
    /// Start a run drawing from operating system entropy
    pub fn start(config: SimulationConfig) -> Result<Self, SimulationError> {
        Self::with_source(config, RngSource::from_entropy())
    }

    /// Start a reproducible run
    pub fn seeded(config: SimulationConfig, seed: u64) -> Result<Self, SimulationError> {
        Self::with_source(config, RngSource::seeded(seed))
    }
}

impl<R: RandomSource> SimulationEngine<R> {
    /// Start a run drawing from `source`
    pub fn with_source(config: SimulationConfig, source: R) -> Result<Self, SimulationError> {
        config.validate()?;

        debug!(
            "Starting simulation: balance={} risk={}% rr={} max_trades={} horizon={}",
            config.initial_balance,
            config.risk_percentage_per_trade,
            config.risk_reward_ratio,
            config.max_trades_per_day,
            config.horizon_days
        );

        Ok(Self {
            state: SimulationState::new(config.initial_balance),
            config,
            source,
            lifecycle: Lifecycle::Running,
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    /// Days simulated so far
    pub fn day(&self) -> u32 {
        self.state.day
    }

    /// True once every day of the horizon has been simulated
    pub fn is_finished(&self) -> bool {
        self.state.day >= self.config.horizon_days
    }

    /// Snapshot of the current state without advancing
    pub fn snapshot(&self) -> SimulationSnapshot {
        SimulationSnapshot::capture(&self.state, &self.config)
    }

    /// Simulate the next day.
    ///
    /// Returns `Step::Done` once after the horizon is exhausted; any call
    /// after that is a lifecycle error.
    pub fn advance(&mut self) -> Result<Step, SimulationError> {
        if self.lifecycle == Lifecycle::Completed {
            return Err(SimulationError::InvalidState(format!(
                "simulation already completed after {} days",
                self.config.horizon_days
            )));
        }

        if self.is_finished() {
            self.lifecycle = Lifecycle::Completed;
            debug!(
                "Simulation finished: balance={:.2} cashed_out={:.2} trades={}",
                self.state.balance,
                self.state.total_cashed_out,
                self.state.total_trades()
            );
            return Ok(Step::Done);
        }

        self.state.day += 1;
        let day = self.state.day;

        let trade_count = self.draw_trade_count();
        let mut tally = DayTally::default();
        for _ in 0..trade_count {
            self.run_trade(&mut tally);
        }

        if day % self.config.cash_out_interval_days == 0 {
            if let Some(cash_out) = self.state.apply_cash_out(
                day,
                self.config.initial_balance,
                self.config.cash_out_fraction,
            ) {
                debug!("Day {}: cashed out {:.2}", day, cash_out.amount);
            }
        }

        self.state.close_day(tally);

        trace!(
            "Day {}: trades={} wins={} losses={} balance={:.2}",
            day,
            tally.trades,
            tally.wins,
            tally.losses,
            self.state.balance
        );

        Ok(Step::Day(self.snapshot()))
    }

    /// Run the remaining days and return the final snapshot.
    ///
    /// Per-day snapshots are dropped before the next day is simulated so the
    /// histories keep a single owner and grow in place.
    pub fn run_to_end(&mut self) -> Result<SimulationSnapshot, SimulationError> {
        while let Step::Day(_) = self.advance()? {}
        Ok(self.snapshot())
    }

    fn draw_trade_count(&mut self) -> u32 {
        let u = self.source.next_unit();
        (u * (self.config.max_trades_per_day as f64 + 1.0)).floor() as u32
    }

    fn run_trade(&mut self, tally: &mut DayTally) {
        let risk_amount = self.config.risk_amount(self.state.balance);
        let reward_amount = risk_amount * self.config.risk_reward_ratio;

        let outcome = if self.source.next_unit() < self.config.win_probability {
            TradeOutcome::Win
        } else {
            TradeOutcome::Loss
        };

        self.state.apply_trade(outcome, risk_amount, reward_amount, tally);
    }
}

impl<R: RandomSource> Iterator for SimulationEngine<R> {
    type Item = SimulationSnapshot;

    fn next(&mut self) -> Option<Self::Item> {
        if self.is_finished() {
            return None;
        }
        match self.advance() {
            Ok(Step::Day(snapshot)) => Some(snapshot),
            Ok(Step::Done) => None,
            Err(e) => {
                debug!("Iteration ended: {}", e);
                None
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.config.horizon_days.saturating_sub(self.state.day) as usize;
        (remaining, Some(remaining))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::random::{FixedSource, ScriptedSource};
    use std::sync::Arc;

    fn short_config(days: u32) -> SimulationConfig {
        SimulationConfig::new(1000.0, 2.0, 2.0, 3).with_horizon_days(days)
    }

    #[test]
    fn test_start_rejects_invalid_config() {
        let result = SimulationEngine::seeded(SimulationConfig::new(0.0, 2.0, 2.0, 3), 1);
        assert!(matches!(
            result,
            Err(SimulationError::InvalidConfig { field: "initialBalance", .. })
        ));
    }

    #[test]
    fn test_lifecycle_done_then_invalid_state() {
        let mut engine = SimulationEngine::seeded(short_config(2), 7).unwrap();

        assert!(matches!(engine.advance(), Ok(Step::Day(s)) if s.day == 1));
        assert!(matches!(engine.advance(), Ok(Step::Day(s)) if s.day == 2));
        assert!(engine.is_finished());
        assert!(matches!(engine.advance(), Ok(Step::Done)));
        assert!(matches!(engine.advance(), Err(SimulationError::InvalidState(_))));
        assert_eq!(engine.day(), 2);
    }

    #[test]
    fn test_trade_count_formula() {
        // floor(0.5 * 4) = 2 trades, both outcomes drawn at 0.5 and lost
        let mut engine =
            SimulationEngine::with_source(short_config(1), FixedSource(0.5)).unwrap();
        let snapshot = engine.advance().unwrap().into_snapshot().unwrap();

        assert_eq!(*snapshot.trades_per_day, vec![0, 2]);
        assert_eq!(snapshot.failed_trades, 2);
        assert_eq!(snapshot.successful_trades, 0);
    }

    #[test]
    fn test_scripted_day_settles_in_order() {
        // count 0.99 -> 3 trades; outcomes: win, win, loss
        let source = ScriptedSource::new(vec![0.99, 0.1, 0.2, 0.9]);
        let mut engine = SimulationEngine::with_source(short_config(1), source).unwrap();
        let snapshot = engine.advance().unwrap().into_snapshot().unwrap();

        // 1000 -> +40 -> 1040 -> +41.6 -> 1081.6 -> -21.632
        let expected = 1000.0 + 40.0 + 41.6 - 21.632;
        assert!((snapshot.final_balance - expected).abs() < 1e-9);
        assert_eq!(snapshot.longest_win_streak, 2);
        assert_eq!(snapshot.current_loss_streak, 1);
        assert_eq!(*snapshot.wins_per_day, vec![0, 2]);
        assert_eq!(*snapshot.losses_per_day, vec![0, 1]);
        assert!((snapshot.win_rate - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let a = SimulationEngine::seeded(SimulationConfig::default(), 99)
            .unwrap()
            .run_to_end()
            .unwrap();
        let b = SimulationEngine::seeded(SimulationConfig::default(), 99)
            .unwrap()
            .run_to_end()
            .unwrap();

        assert_eq!(a, b);
        assert_eq!(a.day, 365);
    }

    #[test]
    fn test_iterator_yields_every_day() {
        let engine = SimulationEngine::seeded(short_config(10), 3).unwrap();
        assert_eq!(engine.size_hint(), (10, Some(10)));

        let days: Vec<u32> = engine.map(|s| s.day).collect();
        assert_eq!(days, (1..=10).collect::<Vec<_>>());
    }

    #[test]
    fn test_retained_snapshot_is_not_mutated() {
        let mut engine = SimulationEngine::seeded(short_config(5), 11).unwrap();
        let first = engine.advance().unwrap().into_snapshot().unwrap();
        let first_history = first.balance_history.as_ref().clone();

        engine.run_to_end().unwrap();

        assert_eq!(*first.balance_history, first_history);
        assert_eq!(first.balance_history.len(), 2);
        assert_eq!(engine.state().balance_history.len(), 6);
    }

    #[test]
    fn test_run_to_end_grows_histories_in_place() {
        let mut engine = SimulationEngine::seeded(short_config(365), 3).unwrap();
        let balances = Arc::as_ptr(&engine.state().balance_history);
        let trades = Arc::as_ptr(&engine.state().trades_per_day);
        let cash_outs = Arc::as_ptr(&engine.state().cash_out_history);

        let last = engine.run_to_end().unwrap();

        assert_eq!(last.day, 365);
        assert_eq!(Arc::as_ptr(&engine.state().balance_history), balances);
        assert_eq!(Arc::as_ptr(&engine.state().trades_per_day), trades);
        assert_eq!(Arc::as_ptr(&engine.state().cash_out_history), cash_outs);
        assert_eq!(Arc::strong_count(&engine.state().balance_history), 2);

        drop(last);
        assert_eq!(Arc::strong_count(&engine.state().balance_history), 1);
    }
}
