//! Configuration for a simulation run

use serde::{Deserialize, Serialize};

use super::error::SimulationError;

/// Default number of simulated days (one calendar year)
pub const DEFAULT_HORIZON_DAYS: u32 = 365;

/// Default probability that a single trade is a winner
pub const DEFAULT_WIN_PROBABILITY: f64 = 0.45;

/// Default spacing between profit cash-outs, in days
pub const DEFAULT_CASH_OUT_INTERVAL_DAYS: u32 = 30;

/// Default share of accumulated profit withdrawn at each cash-out
pub const DEFAULT_CASH_OUT_FRACTION: f64 = 0.5;

/// Immutable parameters of a simulation run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SimulationConfig {
    /// Starting account equity
    pub initial_balance: f64,

    /// Percent of the current balance risked on every trade (2.0 = 2%)
    pub risk_percentage_per_trade: f64,

    /// Reward multiple of the risked amount paid out on a winning trade
    pub risk_reward_ratio: f64,

    /// Upper bound (inclusive) of trades taken on a single day
    pub max_trades_per_day: u32,

    /// Number of days to simulate
    pub horizon_days: u32,

    /// Probability that a trade wins
    pub win_probability: f64,

    /// Cash-outs are evaluated on days divisible by this interval
    pub cash_out_interval_days: u32,

    /// Fraction of profit above the initial balance withdrawn at a cash-out
    pub cash_out_fraction: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            initial_balance: 1000.0,
            risk_percentage_per_trade: 2.0,
            risk_reward_ratio: 2.0,
            max_trades_per_day: 3,
            horizon_days: DEFAULT_HORIZON_DAYS,
            win_probability: DEFAULT_WIN_PROBABILITY,
            cash_out_interval_days: DEFAULT_CASH_OUT_INTERVAL_DAYS,
            cash_out_fraction: DEFAULT_CASH_OUT_FRACTION,
        }
    }
}

impl SimulationConfig {
    /// Build a config from the four user-facing fields, keeping the fixed
    /// constants at their defaults
    pub fn new(
        initial_balance: f64,
        risk_percentage_per_trade: f64,
        risk_reward_ratio: f64,
        max_trades_per_day: u32,
    ) -> Self {
        Self {
            initial_balance,
            risk_percentage_per_trade,
            risk_reward_ratio,
            max_trades_per_day,
            ..Default::default()
        }
    }

    pub fn with_horizon_days(mut self, horizon_days: u32) -> Self {
        self.horizon_days = horizon_days;
        self
    }

    pub fn with_win_probability(mut self, win_probability: f64) -> Self {
        self.win_probability = win_probability;
        self
    }

    pub fn with_cash_out(mut self, interval_days: u32, fraction: f64) -> Self {
        self.cash_out_interval_days = interval_days;
        self.cash_out_fraction = fraction;
        self
    }

    /// Amount risked on one trade at the given balance
    pub fn risk_amount(&self, balance: f64) -> f64 {
        balance * (self.risk_percentage_per_trade / 100.0)
    }

    /// Check every field, returning the first violation found
    pub fn validate(&self) -> Result<(), SimulationError> {
        require_finite("initialBalance", self.initial_balance)?;
        if self.initial_balance <= 0.0 {
            return Err(SimulationError::invalid_config(
                "initialBalance",
                format!("must be > 0, got {}", self.initial_balance),
            ));
        }

        if self.horizon_days == 0 {
            return Err(SimulationError::invalid_config("horizonDays", "must be > 0"));
        }

        require_finite("riskPercentagePerTrade", self.risk_percentage_per_trade)?;
        if self.risk_percentage_per_trade < 0.0 {
            return Err(SimulationError::invalid_config(
                "riskPercentagePerTrade",
                format!("must be >= 0, got {}", self.risk_percentage_per_trade),
            ));
        }

        require_finite("riskRewardRatio", self.risk_reward_ratio)?;
        if self.risk_reward_ratio <= 0.0 {
            return Err(SimulationError::invalid_config(
                "riskRewardRatio",
                format!("must be > 0, got {}", self.risk_reward_ratio),
            ));
        }

        require_unit_interval("winProbability", self.win_probability)?;

        if self.cash_out_interval_days == 0 {
            return Err(SimulationError::invalid_config(
                "cashOutIntervalDays",
                "must be > 0",
            ));
        }

        require_unit_interval("cashOutFraction", self.cash_out_fraction)?;

        Ok(())
    }
}

fn require_finite(field: &'static str, value: f64) -> Result<(), SimulationError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(SimulationError::invalid_config(
            field,
            format!("must be finite, got {}", value),
        ))
    }
}

fn require_unit_interval(field: &'static str, value: f64) -> Result<(), SimulationError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(SimulationError::invalid_config(
            field,
            format!("must lie in [0, 1], got {}", value),
        ))
    }
}
