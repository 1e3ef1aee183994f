//! WebSocket playback server
//!
//! Each connection owns at most one running playback. Clients drive it with
//! [`ClientMessage`] commands and receive [`WsMessage`] updates.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};
use uuid::Uuid;

use crate::driver::{Playback, PlaybackControl};
use crate::simulation::{PerformanceSummary, SimulationEngine};
use crate::types::{AppState, ClientMessage, WsMessage};

/// Control channel depth per playback
const CONTROL_BUFFER: usize = 16;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Handle to the playback owned by a connection
struct ActiveRun {
    controls: mpsc::Sender<PlaybackControl>,
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<WsMessage>();

    let session_id = Uuid::new_v4();
    let _ = out_tx.send(WsMessage::Connected { session_id });
    info!("WebSocket client connected: {}", session_id);

    // Forward outgoing messages to this client
    let send_task = tokio::spawn(async move {
        while let Some(msg) = out_rx.recv().await {
            if let Ok(json) = serde_json::to_string(&msg) {
                if sender.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
        }
    });

    let mut active: Option<ActiveRun> = None;

    while let Some(Ok(msg)) = receiver.next().await {
        let Message::Text(text) = msg else {
            continue;
        };

        let client_msg = match serde_json::from_str::<ClientMessage>(text.as_str()) {
            Ok(client_msg) => client_msg,
            Err(e) => {
                let _ = out_tx.send(WsMessage::Error {
                    message: format!("malformed command: {}", e),
                });
                continue;
            }
        };

        match client_msg.action.as_str() {
            "start" => {
                if let Some(run) = active.take() {
                    let _ = run.controls.send(PlaybackControl::Stop).await;
                }
                match start_run(&state, &client_msg, out_tx.clone()) {
                    Ok(run) => active = Some(run),
                    Err(message) => {
                        let _ = out_tx.send(WsMessage::Error { message });
                    }
                }
            }
            "pause" => forward(&active, PlaybackControl::Pause, &out_tx).await,
            "resume" => forward(&active, PlaybackControl::Resume, &out_tx).await,
            "set_speed" => match client_msg.speed {
                Some(speed) => forward(&active, PlaybackControl::SetSpeed(speed), &out_tx).await,
                None => {
                    let _ = out_tx.send(WsMessage::Error {
                        message: "set_speed requires a speed".to_string(),
                    });
                }
            },
            "stop" => {
                if let Some(run) = active.take() {
                    let _ = run.controls.send(PlaybackControl::Stop).await;
                }
            }
            other => {
                warn!("Unknown action from {}: {}", session_id, other);
                let _ = out_tx.send(WsMessage::Error {
                    message: format!("unknown action: {}", other),
                });
            }
        }
    }

    if let Some(run) = active.take() {
        let _ = run.controls.send(PlaybackControl::Stop).await;
    }
    drop(out_tx);
    let _ = send_task.await;

    info!("WebSocket client disconnected: {}", session_id);
}

async fn forward(
    active: &Option<ActiveRun>,
    control: PlaybackControl,
    out_tx: &mpsc::UnboundedSender<WsMessage>,
) {
    match active {
        Some(run) => {
            let _ = run.controls.send(control).await;
        }
        None => {
            let _ = out_tx.send(WsMessage::Error {
                message: "no simulation running".to_string(),
            });
        }
    }
}

fn start_run(
    state: &AppState,
    client_msg: &ClientMessage,
    out_tx: mpsc::UnboundedSender<WsMessage>,
) -> Result<ActiveRun, String> {
    let config = client_msg.config.unwrap_or(state.default_config);
    let speed = client_msg.speed.unwrap_or(state.default_speed);

    let engine = match client_msg.seed {
        Some(seed) => SimulationEngine::seeded(config, seed),
        None => SimulationEngine::start(config),
    }
    .map_err(|e| e.to_string())?;

    let playback = Playback::new(engine, speed);
    let run_id = Uuid::new_v4();
    let (controls, control_rx) = mpsc::channel(CONTROL_BUFFER);

    let _ = out_tx.send(WsMessage::Started {
        run_id,
        config,
        speed: playback.speed(),
    });
    info!("Run {} started at {} days/s", run_id, playback.speed());

    tokio::spawn(async move {
        let snapshots = out_tx.clone();
        let result = playback
            .run(control_rx, |snapshot| {
                snapshots
                    .send(WsMessage::Snapshot {
                        run_id,
                        snapshot: snapshot.clone(),
                    })
                    .is_ok()
            })
            .await;

        let msg = match result {
            Ok(end) if end.completed => WsMessage::Finished {
                run_id,
                summary: PerformanceSummary::from_snapshot(&end.last),
            },
            Ok(end) => WsMessage::Stopped {
                run_id,
                day: end.last.day,
            },
            Err(e) => WsMessage::Error {
                message: e.to_string(),
            },
        };
        let _ = out_tx.send(msg);
    });

    Ok(ActiveRun { controls })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::MAX_SPEED;
    use crate::simulation::SimulationConfig;

    fn test_state() -> AppState {
        AppState {
            default_config: SimulationConfig::default().with_horizon_days(3),
            default_speed: MAX_SPEED,
        }
    }

    fn start_msg(config: Option<SimulationConfig>) -> ClientMessage {
        ClientMessage {
            action: "start".to_string(),
            config,
            speed: None,
            seed: Some(1),
        }
    }

    #[tokio::test]
    async fn test_start_run_streams_until_finished() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _run = start_run(&test_state(), &start_msg(None), tx).unwrap();

        assert!(matches!(rx.recv().await, Some(WsMessage::Started { .. })));
        for day in 1..=3 {
            match rx.recv().await {
                Some(WsMessage::Snapshot { snapshot, .. }) => assert_eq!(snapshot.day, day),
                other => panic!("expected snapshot, got {:?}", other),
            }
        }
        match rx.recv().await {
            Some(WsMessage::Finished { summary, .. }) => assert_eq!(summary.day, 3),
            other => panic!("expected finished, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_start_run_rejects_invalid_config() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let bad = SimulationConfig::new(-1.0, 2.0, 2.0, 3);

        let err = start_run(&test_state(), &start_msg(Some(bad)), tx).err().unwrap();
        assert!(err.contains("initialBalance"));
    }

    #[test]
    fn test_client_message_parses_start_command() {
        let msg: ClientMessage = serde_json::from_str(
            r#"{"action":"start","config":{"initialBalance":2500,"maxTradesPerDay":5},"speed":2}"#,
        )
        .unwrap();

        assert_eq!(msg.action, "start");
        assert_eq!(msg.config.unwrap().initial_balance, 2500.0);
        assert_eq!(msg.speed, Some(2.0));
        assert_eq!(msg.seed, None);
    }
}
