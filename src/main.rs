use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use tokio::sync::Mutex;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{info, trace};

use arcade_physics_server::config::VehicleConfig;
use arcade_physics_server::logging::init_logging;
use arcade_physics_server::net::{bind, start_websocket_server};
use arcade_physics_server::physics::PhysicsWorld;
use arcade_physics_server::state::SharedGameState;

#[derive(Parser)]
#[command(about = "Authoritative arcade car physics server (rapier3d + WebSocket)")]
struct Args {
    /// Address the WebSocket server binds to
    #[arg(long, default_value = "0.0.0.0:9001")]
    bind: SocketAddr,

    /// Fixed simulation rate in Hz
    #[arg(long, default_value_t = 60)]
    tick_hz: u32,

    /// Vehicle TOML file; overrides --preset
    #[arg(long)]
    vehicle: Option<PathBuf>,

    /// Built-in vehicle preset (arcade_coupe, offroad_buggy)
    #[arg(long, default_value = "arcade_coupe")]
    preset: String,
}

fn load_vehicle(args: &Args) -> anyhow::Result<VehicleConfig> {
    match &args.vehicle {
        Some(path) => VehicleConfig::load(path)
            .with_context(|| format!("loading vehicle config {}", path.display())),
        None => match VehicleConfig::preset(&args.preset) {
            Some(cfg) => Ok(cfg),
            None => bail!("unknown vehicle preset {:?}", args.preset),
        },
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging().context("installing log subscriber")?;
    let args = Args::parse();

    if args.tick_hz == 0 {
        bail!("--tick-hz must be > 0");
    }

    let vehicle = load_vehicle(&args)?;
    vehicle.validate().context("validating vehicle config")?;
    info!(vehicle = %vehicle.name, tick_hz = args.tick_hz, "starting physics server");

    let listener = bind(args.bind)
        .await
        .with_context(|| format!("binding {}", args.bind))?;

    let state = Arc::new(Mutex::new(SharedGameState::new()));
    let physics = Arc::new(Mutex::new(PhysicsWorld::new()));

    tokio::spawn(start_websocket_server(
        listener,
        Arc::clone(&state),
        Arc::clone(&physics),
        Arc::new(vehicle),
    ));

    // Fixed timestep
    let dt = 1.0 / args.tick_hz as f32;
    let mut ticker = interval(Duration::from_secs_f32(dt));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let mut phys = physics.lock().await;
        let mut game = state.lock().await;

        game.apply_inputs(&mut phys);
        phys.step(dt);

        game.tick += 1;
        game.broadcast_snapshot(&mut phys);
        trace!(tick = game.tick, players = game.players.len(), "tick");
    }
}
