//! Paced playback of a simulation
//!
//! The engine has no notion of time. `Playback` pulls one day per tick at a
//! configurable speed (days per second) and listens on a control channel for
//! pause, resume, speed changes and stop requests.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::simulation::{
    RandomSource, RngSource, SimulationEngine, SimulationError, SimulationSnapshot, Step,
};

/// Slowest accepted playback speed, in days per second
pub const MIN_SPEED: f64 = 0.1;

/// Fastest accepted playback speed, in days per second
pub const MAX_SPEED: f64 = 1000.0;

/// Default playback speed, in days per second
pub const DEFAULT_SPEED: f64 = 5.0;

/// Commands accepted by a running playback
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PlaybackControl {
    Pause,
    Resume,
    SetSpeed(f64),
    Stop,
}

/// How a playback ended
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackEnd {
    /// State of the account when playback ended
    pub last: SimulationSnapshot,
    /// False when stopped before the horizon was reached
    pub completed: bool,
}

/// Clamp a requested speed into the accepted range
pub fn clamp_speed(speed: f64) -> f64 {
    if speed.is_nan() {
        return DEFAULT_SPEED;
    }
    speed.clamp(MIN_SPEED, MAX_SPEED)
}

pub struct Playback<R = RngSource<rand::rngs::StdRng>> {
    engine: SimulationEngine<R>,
    speed: f64,
    paused: bool,
}

impl<R: RandomSource> Playback<R> {
    pub fn new(engine: SimulationEngine<R>, speed: f64) -> Self {
        Self {
            engine,
            speed: clamp_speed(speed),
            paused: false,
        }
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Delay between two simulated days
    pub fn interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.speed)
    }

    fn apply(&mut self, control: PlaybackControl) {
        match control {
            PlaybackControl::Pause => self.paused = true,
            PlaybackControl::Resume => self.paused = false,
            PlaybackControl::SetSpeed(speed) => {
                self.speed = clamp_speed(speed);
                debug!("Playback speed set to {} days/s", self.speed);
            }
            // Handled by the run loop
            PlaybackControl::Stop => {}
        }
    }

    fn end(&self, completed: bool) -> PlaybackEnd {
        PlaybackEnd {
            last: self.engine.snapshot(),
            completed,
        }
    }

    /// Advance one day per tick until the horizon is reached, a `Stop`
    /// arrives, or `on_snapshot` returns false.
    ///
    /// A closed control channel leaves playback running; a closed channel
    /// while paused ends it.
    pub async fn run<F>(
        mut self,
        mut controls: mpsc::Receiver<PlaybackControl>,
        mut on_snapshot: F,
    ) -> Result<PlaybackEnd, SimulationError>
    where
        F: FnMut(&SimulationSnapshot) -> bool,
    {
        let mut controls_open = true;

        loop {
            if self.engine.is_finished() {
                info!("Playback completed after {} days", self.engine.day());
                return Ok(self.end(true));
            }

            let delay = self.interval();
            tokio::select! {
                biased;

                control = controls.recv(), if controls_open => match control {
                    Some(PlaybackControl::Stop) => {
                        info!("Playback stopped at day {}", self.engine.day());
                        return Ok(self.end(false));
                    }
                    Some(control) => self.apply(control),
                    None => controls_open = false,
                },

                _ = tokio::time::sleep(delay), if !self.paused => {
                    if let Step::Day(snapshot) = self.engine.advance()? {
                        if !on_snapshot(&snapshot) {
                            debug!("Snapshot consumer gone at day {}", snapshot.day);
                            return Ok(self.end(false));
                        }
                    }
                }

                else => return Ok(self.end(false)),
            }
        }
    }
}
