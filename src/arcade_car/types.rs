//! Core shared types for `arcade_car` (engine-agnostic).
// arcade_car/types.rs
use std::fmt;

use nalgebra::{Isometry3, Point3, Vector3};
use serde::{Deserialize, Serialize};

pub type Vec3 = Vector3<f32>;
pub type Pos3 = Point3<f32>;
pub type Pose = Isometry3<f32>;

// ----- chassis-local axes -----
// +Y is up, +Z is forward, -X is right (matches the rapier bridge + client).
#[inline] pub fn local_up() -> Vec3 { Vec3::new(0.0, 1.0, 0.0) }
#[inline] pub fn local_forward() -> Vec3 { Vec3::new(0.0, 0.0, 1.0) }
#[inline] pub fn local_right() -> Vec3 { Vec3::new(-1.0, 0.0, 0.0) }

#[inline] pub fn p3(p: Pos3) -> [f32; 3] { [p.x, p.y, p.z] }

// ============================================
// Wheel identification
// ============================================

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum WheelId { FL, FR, RL, RR }

impl WheelId {
    pub fn as_str(&self) -> &'static str {
        match self {
            WheelId::FL => "FL",
            WheelId::FR => "FR",
            WheelId::RL => "RL",
            WheelId::RR => "RR",
        }
    }

    pub fn is_left(&self) -> bool {
        matches!(self, WheelId::FL | WheelId::RL)
    }
}

impl fmt::Display for WheelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================
// ----- inputs -------------------------------
// ============================================

/// Driver values sampled once per tick by the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DriverInput {
    pub throttle: f32,   // 0..1
    pub brake: f32,      // 0..1
    pub steer: f32,      // -1..1 (positive = right)
    pub reverse: bool,
    pub handbrake: bool,
}

impl DriverInput {
    /// Same input with every analog value clamped into its range.
    pub fn clamped(self) -> Self {
        Self {
            throttle: self.throttle.clamp(0.0, 1.0),
            brake: self.brake.clamp(0.0, 1.0),
            steer: self.steer.clamp(-1.0, 1.0),
            ..self
        }
    }
}

// ============================================
// ----- ground contact -----------------------
// ============================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionMode {
    #[default]
    Ray,
    Sphere,
}

/// One downward cast issued by a wheel.
#[derive(Debug, Clone, Copy)]
pub struct GroundCast {
    pub mode: DetectionMode,
    pub origin: Pos3,
    pub direction: Vec3,   // unit
    pub max_distance: f32,
    pub radius: f32,       // sphere radius, ignored for rays
}

/// What the ground query reports back for a hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundHit {
    pub distance: f32,
    pub point: Pos3,
    pub normal: Vec3,

    /// Velocity of the struck body at `point`, if the surface belongs to one.
    pub surface_velocity: Option<Vec3>,
}
