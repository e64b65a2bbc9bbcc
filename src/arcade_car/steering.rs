// ==============================================================================
// steering.rs - STEER INPUT -> PER-WHEEL STEER ANGLES
// ==============================================================================
// base = steer * max_steer_angle   (steer clamped to -1..1, positive = right)
//
// With ackermann = 0 every steerable wheel gets `base` (parallel steer).
// With ackermann > 0 the steered axle blends toward true Ackermann angles:
// the inside wheel turns tighter than the outside one, both derived from the
// centreline "bicycle model" radius R = wheelbase / tan(base).
// ==============================================================================

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const fn default_max_steer_angle() -> f32 { 0.6 }
const fn default_wheelbase() -> f32 { 2.5 }
const fn default_track_width() -> f32 { 1.5 }

/// Steering configuration (per vehicle)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SteeringConfig {
    #[serde(default = "default_max_steer_angle")]
    pub max_steer_angle: f32,  // radians
    #[serde(default = "default_wheelbase")]
    pub wheelbase: f32,        // meters
    #[serde(default = "default_track_width")]
    pub track_width: f32,      // meters
    #[serde(default)]
    pub ackermann: f32,        // 0 = parallel, 1 = full Ackermann
}

impl Default for SteeringConfig {
    fn default() -> Self {
        Self {
            max_steer_angle: default_max_steer_angle(),
            wheelbase: default_wheelbase(),
            track_width: default_track_width(),
            ackermann: 0.0,
        }
    }
}

impl SteeringConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.max_steer_angle >= 0.0 && self.max_steer_angle < std::f32::consts::FRAC_PI_2) {
            return Err(ConfigError::invalid("steering.max_steer_angle", "must be in [0, π/2)"));
        }
        if !(0.0..=1.0).contains(&self.ackermann) {
            return Err(ConfigError::invalid("steering.ackermann", "must be in [0, 1]"));
        }
        if self.ackermann > 0.0 && !(self.wheelbase > 0.0 && self.track_width > 0.0) {
            return Err(ConfigError::invalid(
                "steering.wheelbase",
                "wheelbase and track_width must be > 0 when ackermann is used",
            ));
        }
        Ok(())
    }
}

/// Ackermann (left, right) angles for a centreline steer angle.
pub fn ackermann_angles(base: f32, wheelbase: f32, track: f32) -> (f32, f32) {
    let eps = 1e-4;
    if base.abs() < eps {
        return (0.0, 0.0);
    }

    let sign = base.signum();
    let a = base.abs();

    // turning radius of the centreline bicycle model
    let r = wheelbase / a.tan();

    let r_in = (r - track * 0.5).max(0.01);
    let r_out = (r + track * 0.5).max(0.01);

    let inner = (wheelbase / r_in).atan() * sign;
    let outer = (wheelbase / r_out).atan() * sign;

    // right turn (positive): right wheel is inside
    if sign > 0.0 { (outer, inner) } else { (inner, outer) }
}

/// (left, right) steer angles for a steer input.
pub fn solve_steering(cfg: &SteeringConfig, steer: f32) -> (f32, f32) {
    let base = steer.clamp(-1.0, 1.0) * cfg.max_steer_angle;
    if cfg.ackermann <= 0.0 {
        return (base, base);
    }

    let (ack_l, ack_r) = ackermann_angles(base, cfg.wheelbase, cfg.track_width);
    (
        (1.0 - cfg.ackermann) * base + cfg.ackermann * ack_l,
        (1.0 - cfg.ackermann) * base + cfg.ackermann * ack_r,
    )
}
