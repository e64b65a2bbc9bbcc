//! Arcade car physics: an engine-agnostic vehicle core (raycast suspension,
//! tire friction, drivetrain, drift detection) hosted by a rapier3d world
//! behind a WebSocket server.

pub mod arcade_car;
pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod net;
pub mod physics;
pub mod protocol;
pub mod rapier_bridge;
pub mod state;
pub mod vehicle;

pub use config::VehicleConfig;
pub use error::{ConfigError, ServerError};
pub use vehicle::{StepReport, Vehicle};
