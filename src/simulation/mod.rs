//! Simulation engine for a trading account under a fixed risk policy
//!
//! This module contains the core components:
//! - Run configuration and validation
//! - Injectable uniform random sources
//! - Account state and its append-only daily histories
//! - The pull-based engine, advanced one day per call
//! - Read-only snapshots and the summary metrics derived from them

mod config;
mod engine;
mod error;
pub mod metrics;
pub mod random;
mod snapshot;
mod state;

pub use config::{
    SimulationConfig, DEFAULT_CASH_OUT_FRACTION, DEFAULT_CASH_OUT_INTERVAL_DAYS,
    DEFAULT_HORIZON_DAYS, DEFAULT_WIN_PROBABILITY,
};
pub use engine::{SimulationEngine, Step};
pub use error::SimulationError;
pub use metrics::{MarketComparison, PerformanceSummary};
pub use random::{FixedSource, RandomSource, RngSource, ScriptedSource};
pub use snapshot::SimulationSnapshot;
pub use state::{CashOut, DayTally, SimulationState, TradeOutcome};
