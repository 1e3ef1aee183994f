use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::simulation::{PerformanceSummary, SimulationConfig, SimulationSnapshot};

/// Messages pushed to WebSocket clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WsMessage {
    Connected {
        #[serde(rename = "sessionId")]
        session_id: Uuid,
    },
    Started {
        #[serde(rename = "runId")]
        run_id: Uuid,
        config: SimulationConfig,
        speed: f64,
    },
    Snapshot {
        #[serde(rename = "runId")]
        run_id: Uuid,
        snapshot: SimulationSnapshot,
    },
    Finished {
        #[serde(rename = "runId")]
        run_id: Uuid,
        summary: PerformanceSummary,
    },
    Stopped {
        #[serde(rename = "runId")]
        run_id: Uuid,
        day: u32,
    },
    Error {
        message: String,
    },
}

/// Commands sent by WebSocket clients.
///
/// `action` is one of `start`, `pause`, `resume`, `set_speed` or `stop`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientMessage {
    pub action: String,
    pub config: Option<SimulationConfig>,
    pub speed: Option<f64>,
    pub seed: Option<u64>,
}

/// Shared application state
#[derive(Debug, Clone)]
pub struct AppState {
    /// Config used when a `start` command carries none
    pub default_config: SimulationConfig,
    /// Playback speed used when a `start` command carries none
    pub default_speed: f64,
}
