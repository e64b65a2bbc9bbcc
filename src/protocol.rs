//! JSON messages exchanged over the WebSocket.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::arcade_car::DriverInput;
use crate::events::SoundCue;
use crate::vehicle::VehicleTelemetry;

/// client -> server
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Input(InputAxes),
    Ping,
}

/// Driver values; anything missing reads as released.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct InputAxes {
    pub throttle: f32,
    pub brake: f32,
    pub steer: f32,
    pub reverse: bool,
    pub handbrake: bool,
}

impl From<InputAxes> for DriverInput {
    fn from(axes: InputAxes) -> Self {
        DriverInput {
            throttle: axes.throttle,
            brake: axes.brake,
            steer: axes.steer,
            reverse: axes.reverse,
            handbrake: axes.handbrake,
        }
        .clamped()
    }
}

impl ClientMessage {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// server -> client
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome { player_id: Uuid },
    Pong,
    Snapshot(Snapshot),
}

impl ServerMessage {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub tick: u64,
    pub players: Vec<PlayerSnapshot>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerSnapshot {
    pub id: Uuid,
    pub position: [f32; 3],
    pub rotation: [f32; 4],     // quaternion [i, j, k, w]
    pub velocity: [f32; 3],
    #[serde(flatten)]
    pub telemetry: VehicleTelemetry,
    /// Looping-sound requests raised since the previous snapshot.
    pub sounds: Vec<SoundCue>,
}
