use std::collections::HashMap;

use tokio::sync::mpsc::UnboundedSender;
use tracing::warn;
use uuid::Uuid;

use crate::arcade_car::DriverInput;
use crate::physics::PhysicsWorld;
use crate::protocol::{PlayerSnapshot, ServerMessage, Snapshot};

pub struct Player {
    pub id: Uuid,
    pub last_input: Option<DriverInput>,
    tx: UnboundedSender<String>,
}

pub struct SharedGameState {
    pub tick: u64,
    pub players: HashMap<Uuid, Player>,
    spawned: u64,
}

impl Default for SharedGameState {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedGameState {
    pub fn new() -> Self {
        Self {
            tick: 0,
            players: HashMap::new(),
            spawned: 0,
        }
    }

    /// Register a connected client; returns its id and spawn slot.
    pub fn add_player(&mut self, tx: UnboundedSender<String>) -> (Uuid, usize) {
        let id = Uuid::new_v4();
        self.players.insert(
            id,
            Player {
                id,
                last_input: None,
                tx,
            },
        );
        let slot = self.spawned as usize;
        self.spawned += 1;
        (id, slot)
    }

    pub fn remove_player(&mut self, id: &Uuid) -> bool {
        self.players.remove(id).is_some()
    }

    pub fn update_input(&mut self, id: &Uuid, input: DriverInput) {
        if let Some(player) = self.players.get_mut(id) {
            player.last_input = Some(input);
        }
    }

    /// Queue a message for one client.
    pub fn send_to(&self, id: &Uuid, msg: &ServerMessage) {
        let Some(player) = self.players.get(id) else { return };
        match msg.to_json() {
            Ok(json) => {
                let _ = player.tx.send(json);
            }
            Err(err) => warn!(%err, "failed to encode message"),
        }
    }

    /// Push every player's latest input into the physics world.
    pub fn apply_inputs(&self, physics: &mut PhysicsWorld) {
        for player in self.players.values() {
            if let Some(input) = player.last_input {
                physics.set_input(&player.id, input);
            }
        }
    }

    /// Build the snapshot for this tick; drains pending sound cues.
    pub fn build_snapshot(&self, physics: &mut PhysicsWorld) -> Snapshot {
        let mut players = Vec::with_capacity(self.players.len());

        for id in self.players.keys() {
            let (Some(pose), Some(linvel)) = (physics.chassis_pose(id), physics.chassis_linvel(id))
            else {
                continue;
            };
            let Some(entity) = physics.vehicle_mut(id) else { continue };

            let pos = pose.translation.vector;
            let rot = pose.rotation;
            players.push(PlayerSnapshot {
                id: *id,
                position: [pos.x, pos.y, pos.z],
                rotation: [rot.i, rot.j, rot.k, rot.w],
                velocity: [linvel.x, linvel.y, linvel.z],
                telemetry: entity.vehicle.telemetry(),
                sounds: entity.drain_sound_cues(),
            });
        }

        Snapshot {
            tick: self.tick,
            players,
        }
    }

    /// Build and send a snapshot of all vehicles to all clients.
    pub fn broadcast_snapshot(&self, physics: &mut PhysicsWorld) {
        let msg = ServerMessage::Snapshot(self.build_snapshot(physics));
        let json = match msg.to_json() {
            Ok(json) => json,
            Err(err) => {
                warn!(%err, "failed to encode snapshot");
                return;
            }
        };

        for player in self.players.values() {
            let _ = player.tx.send(json.clone());
        }
    }
}
