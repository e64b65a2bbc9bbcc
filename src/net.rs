use std::net::SocketAddr;
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, info, warn};

use crate::config::VehicleConfig;
use crate::error::ServerError;
use crate::physics::PhysicsWorld;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::SharedGameState;

/// Cars spawn side by side along +X, this far apart.
pub const SPAWN_SPACING: f32 = 4.0;
/// Drop height for freshly spawned cars.
pub const SPAWN_HEIGHT: f32 = 1.0;

pub fn spawn_position(slot: usize) -> [f32; 3] {
    [slot as f32 * SPAWN_SPACING, SPAWN_HEIGHT, 0.0]
}

pub async fn bind(addr: SocketAddr) -> Result<TcpListener, ServerError> {
    Ok(TcpListener::bind(addr).await?)
}

/// Accept WebSocket clients forever; one task per connection.
pub async fn start_websocket_server(
    listener: TcpListener,
    state: Arc<Mutex<SharedGameState>>,
    physics: Arc<Mutex<PhysicsWorld>>,
    vehicle: Arc<VehicleConfig>,
) {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "websocket listening");
    }

    loop {
        let (raw, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(err) => {
                warn!(%err, "accept failed");
                continue;
            }
        };

        tokio::spawn(handle_connection(
            raw,
            peer,
            Arc::clone(&state),
            Arc::clone(&physics),
            Arc::clone(&vehicle),
        ));
    }
}

async fn handle_connection(
    raw: TcpStream,
    peer: SocketAddr,
    state: Arc<Mutex<SharedGameState>>,
    physics: Arc<Mutex<PhysicsWorld>>,
    vehicle: Arc<VehicleConfig>,
) {
    let ws = match accept_async(raw).await {
        Ok(ws) => ws,
        Err(err) => {
            warn!(%peer, %err, "websocket handshake failed");
            return;
        }
    };
    let (mut write, mut read) = ws.split();

    // -------------------------------
    // 1) Outgoing channel + send loop
    // -------------------------------
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if write.send(Message::Text(msg)).await.is_err() {
                break;
            }
        }
    });

    // -------------------------------
    // 2) Register player + spawn car
    // -------------------------------
    let player_id = {
        // lock order everywhere: physics, then state
        let mut phys = physics.lock().await;
        let mut game = state.lock().await;
        let (id, slot) = game.add_player(tx);

        if let Err(err) = phys.spawn_vehicle(id, spawn_position(slot), (*vehicle).clone()) {
            warn!(%id, %err, "could not spawn vehicle");
            game.remove_player(&id);
            return;
        }

        game.send_to(&id, &ServerMessage::Welcome { player_id: id });
        id
    };

    info!(%player_id, %peer, "player connected");

    // -------------------------------
    // 3) Receive loop
    // -------------------------------
    while let Some(msg) = read.next().await {
        let msg = match msg {
            Ok(m) => m,
            Err(err) => {
                debug!(%player_id, %err, "read failed");
                break;
            }
        };

        let text = match msg {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };

        match ClientMessage::parse(&text) {
            Ok(ClientMessage::Ping) => {
                state.lock().await.send_to(&player_id, &ServerMessage::Pong);
            }
            Ok(ClientMessage::Input(axes)) => {
                state.lock().await.update_input(&player_id, axes.into());
            }
            Err(err) => {
                debug!(%player_id, %err, "ignoring malformed message");
            }
        }
    }

    info!(%player_id, "player disconnected");

    let mut phys = physics.lock().await;
    phys.remove_vehicle(&player_id);
    state.lock().await.remove_player(&player_id);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_slots_do_not_overlap() {
        assert_eq!(spawn_position(0), [0.0, SPAWN_HEIGHT, 0.0]);
        assert_eq!(spawn_position(2)[0], 2.0 * SPAWN_SPACING);
    }

    #[tokio::test]
    async fn bind_reports_network_errors() {
        let first = bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let taken = first.local_addr().unwrap();
        let err = bind(taken).await.unwrap_err();
        assert!(matches!(err, ServerError::Net(_)));
    }
}
