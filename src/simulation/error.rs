use thiserror::Error;

/// Errors raised by the simulation engine and its tooling
#[derive(Debug, Error)]
pub enum SimulationError {
    /// A configuration value is out of range. Raised once, at start.
    #[error("invalid config: {field} {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    /// The engine was advanced out of lifecycle order
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Writing a history export failed
    #[error("export failed: {0}")]
    Export(#[from] csv::Error),
}

impl SimulationError {
    pub(crate) fn invalid_config(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }
}
