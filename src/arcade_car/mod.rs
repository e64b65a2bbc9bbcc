//! arcade_car - engine-agnostic arcade vehicle core (wheels, drivetrain, drift)

pub mod types;
pub mod interfaces;
pub mod units;
pub mod suspension;
pub mod friction;
pub mod wheel;
pub mod drivetrain;
pub mod drift;
pub mod steering;

pub use types::*;
pub use interfaces::{ChassisBody, GroundQuery};
pub use wheel::{Wheel, WheelConfig, WheelForces};
pub use drivetrain::{Drivetrain, DrivetrainConfig, DrivetrainInput, DrivetrainOutput};
pub use drift::{DriftConfig, DriftEvent, DriftPolicy, SlipSample};
pub use steering::{solve_steering, SteeringConfig};
