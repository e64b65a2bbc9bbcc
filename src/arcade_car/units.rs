//! Unit conversions shared by the wheel and drivetrain models.

use std::f32::consts::TAU;

/// m/s -> km/h
pub const MPS_TO_KPH: f32 = 3.6;

/// rad/s -> rev/min
pub const RAD_PER_SEC_TO_RPM: f32 = 60.0 / TAU;

/// Engine RPM for a road speed, through one gearbox ratio and the final drive.
///
/// `rpm = v / (2πr) · 60 · gear_ratio · final_gear_ratio`
#[inline]
pub fn speed_kph_to_engine_rpm(speed_kph: f32, gear_ratio: f32, final_gear_ratio: f32, wheel_radius: f32) -> f32 {
    let wheel_rps = (speed_kph / MPS_TO_KPH) / (TAU * wheel_radius);
    wheel_rps * 60.0 * gear_ratio * final_gear_ratio
}
