// ==============================================================================
// friction.rs - WHEEL BASIS + ARCADE TIRE FRICTION (FORCE DOMAIN)
// ------------------------------------------------------------------------------
// wheel_basis_world(pose, steer_angle):
// - forward: chassis forward rotated about chassis up by the steer angle
// - right:   chassis right, NOT steered (lateral grip always acts across the body)
//
// slip_components(point_vel, forward, right):
// - v_long = dot(v, forward), v_lat = dot(v, right)
//
// friction_forces(...):
// - linear "viscous" tire: each component is opposed in proportion to its own
//   velocity and grip coefficient, times a fixed gain
// - handbrake scales sideways grip down (rear steps out -> drift)
//
// drive_brake_force(...):
// - drive torque / radius along forward
// - brake torque / radius against v_long, faded out near standstill so the
//   brake never pushes the car backwards
// ==============================================================================

use nalgebra::UnitQuaternion;
use serde::{Deserialize, Serialize};

use crate::arcade_car::types::{local_forward, local_right, local_up, Pose, Vec3};

/// Below this |v_long| (m/s) brake force fades linearly to zero.
pub const BRAKE_FADE_SPEED: f32 = 0.5;

const fn default_forward_grip() -> f32 { 1.5 }
const fn default_sideways_grip() -> f32 { 2.5 }
const fn default_handbrake_grip_factor() -> f32 { 0.3 }
const fn default_friction_gain() -> f32 { 10.0 }

/// Per-wheel grip coefficients.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TireGrip {
    /// Resistance along the rolling direction.
    #[serde(default = "default_forward_grip")]
    pub forward_grip: f32,

    /// Resistance across the body.
    #[serde(default = "default_sideways_grip")]
    pub sideways_grip: f32,

    /// Fraction of sideways grip left while the handbrake is held (0..1).
    #[serde(default = "default_handbrake_grip_factor")]
    pub handbrake_grip_factor: f32,

    /// Fixed N per (m/s · grip) scale.
    #[serde(default = "default_friction_gain")]
    pub friction_gain: f32,
}

impl Default for TireGrip {
    fn default() -> Self {
        Self {
            forward_grip: default_forward_grip(),
            sideways_grip: default_sideways_grip(),
            handbrake_grip_factor: default_handbrake_grip_factor(),
            friction_gain: default_friction_gain(),
        }
    }
}

impl TireGrip {
    #[inline]
    pub fn effective_sideways_grip(&self, handbrake: bool) -> f32 {
        if handbrake { self.sideways_grip * self.handbrake_grip_factor } else { self.sideways_grip }
    }
}

/// Returns (forward, right) in world space. Positive steer turns right.
#[inline]
pub fn wheel_basis_world(pose: &Pose, steer_angle: f32) -> (Vec3, Vec3) {
    let up = pose.rotation * local_up();
    let chassis_forward = pose.rotation * local_forward();
    let right = pose.rotation * local_right();

    // +Y rotation swings +Z toward +X (left), so right turns are negative.
    let steer_rot = UnitQuaternion::from_axis_angle(&nalgebra::Unit::new_normalize(up), -steer_angle);
    let forward = steer_rot * chassis_forward;

    (forward, right)
}

/// Compute (v_long, v_lat) given point velocity and wheel basis.
#[inline]
pub fn slip_components(point_vel: Vec3, forward: Vec3, right: Vec3) -> (f32, f32) {
    (point_vel.dot(&forward), point_vel.dot(&right))
}

/// Opposing (forward, sideways) friction forces for one contact.
pub fn friction_forces(
    grip: &TireGrip,
    v_long: f32,
    v_lat: f32,
    forward: Vec3,
    right: Vec3,
    handbrake: bool,
) -> (Vec3, Vec3) {
    let side_grip = grip.effective_sideways_grip(handbrake);

    let forward_force = -forward * (grip.forward_grip * v_long * grip.friction_gain);
    let sideways_force = -right * (side_grip * v_lat * grip.friction_gain);

    (forward_force, sideways_force)
}

/// Longitudinal force from wheel torques (N·m) at a contact.
pub fn drive_brake_force(
    drive_torque: f32,
    brake_torque: f32,
    radius: f32,
    v_long: f32,
    forward: Vec3,
) -> Vec3 {
    let drive = drive_torque / radius;

    // Deadzone near zero speed
    let fade = (v_long.abs() / BRAKE_FADE_SPEED).min(1.0);
    let brake = -v_long.signum() * (brake_torque.max(0.0) / radius) * fade;

    forward * (drive + brake)
}
