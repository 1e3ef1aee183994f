// Library crate - simulation engine plus the drivers built around it

pub mod simulation;
pub mod batch;
pub mod driver;
pub mod export;
pub mod server;
pub mod types;

// Re-export commonly used types
pub use simulation::{
    PerformanceSummary, SimulationConfig, SimulationEngine, SimulationError, SimulationSnapshot,
    Step,
};
