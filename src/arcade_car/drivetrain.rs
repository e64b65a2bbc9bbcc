// ==============================================================================
// drivetrain.rs - ENGINE RPM STATE + TORQUE OUTPUT (SINGLE FINAL DRIVE)
// ==============================================================================
// One motor, one fixed final drive ratio, no gearbox.
//
// Grounded: motor and driven wheels are rigidly coupled. RPM is read straight
//           off road speed, torque is computed from the curve and handed to
//           the wheels (drive torque + engine-brake torque).
// Airborne: the motor free-spins. RPM is integrated from torque / inertia and
//           decays under engine friction and the driver's brake. No torque
//           reaches the wheels.
//
// There is no blend between the two branches: RPM jumps back to road speed on
// the first grounded tick after a jump.
//
// Rev limiter: if |rpm| is over the limit for the current direction when a
// tick starts, throttle is cut to 0 for that tick. RPM itself is never clamped.
//
// Torque curve (rev_rate = clamp01(rpm / max_rpm)):
//     rev_rate < 0.5  -> 1
//     rev_rate >= 0.5 -> ((1 - rev_rate) * 2)^2
//
// Engine friction: lerp(min, max, rev_rate^2)
// ==============================================================================

use serde::{Deserialize, Serialize};

use crate::arcade_car::units::{speed_kph_to_engine_rpm, RAD_PER_SEC_TO_RPM};
use crate::error::ConfigError;

const fn default_max_forward_speed_kph() -> f32 { 180.0 }
const fn default_max_backward_speed_kph() -> f32 { 60.0 }
const fn default_max_motor_torque() -> f32 { 300.0 }
const fn default_min_motor_friction_torque() -> f32 { 15.0 }
const fn default_max_motor_friction_torque() -> f32 { 75.0 }
const fn default_motor_inertia() -> f32 { 0.1 }
const fn default_final_gear_ratio() -> f32 { 8.0 }
const fn default_max_brake_torque() -> f32 { 800.0 }

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DrivetrainConfig {
    #[serde(default = "default_max_forward_speed_kph")]
    pub max_forward_speed_kph: f32,
    #[serde(default = "default_max_backward_speed_kph")]
    pub max_backward_speed_kph: f32,

    #[serde(default = "default_max_motor_torque")]
    pub max_motor_torque: f32,           // N·m at the motor
    #[serde(default = "default_min_motor_friction_torque")]
    pub min_motor_friction_torque: f32,  // N·m, idle
    #[serde(default = "default_max_motor_friction_torque")]
    pub max_motor_friction_torque: f32,  // N·m, at max rpm
    #[serde(default = "default_motor_inertia")]
    pub motor_inertia: f32,              // kg·m²
    #[serde(default = "default_final_gear_ratio")]
    pub final_gear_ratio: f32,

    /// Service brake, per wheel (N·m at full pedal).
    #[serde(default = "default_max_brake_torque")]
    pub max_brake_torque: f32,
}

impl Default for DrivetrainConfig {
    fn default() -> Self {
        Self {
            max_forward_speed_kph: default_max_forward_speed_kph(),
            max_backward_speed_kph: default_max_backward_speed_kph(),
            max_motor_torque: default_max_motor_torque(),
            min_motor_friction_torque: default_min_motor_friction_torque(),
            max_motor_friction_torque: default_max_motor_friction_torque(),
            motor_inertia: default_motor_inertia(),
            final_gear_ratio: default_final_gear_ratio(),
            max_brake_torque: default_max_brake_torque(),
        }
    }
}

impl DrivetrainConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.motor_inertia > 0.0) {
            return Err(ConfigError::invalid("drivetrain.motor_inertia", "must be > 0"));
        }
        if !(self.final_gear_ratio > 0.0) {
            return Err(ConfigError::invalid("drivetrain.final_gear_ratio", "must be > 0"));
        }
        if !(self.max_forward_speed_kph > 0.0) {
            return Err(ConfigError::invalid("drivetrain.max_forward_speed_kph", "must be > 0"));
        }
        if !(self.max_backward_speed_kph >= 0.0) {
            return Err(ConfigError::invalid("drivetrain.max_backward_speed_kph", "must be >= 0"));
        }
        if !(self.max_motor_torque >= 0.0) {
            return Err(ConfigError::invalid("drivetrain.max_motor_torque", "must be >= 0"));
        }
        if !(self.min_motor_friction_torque >= 0.0
            && self.min_motor_friction_torque <= self.max_motor_friction_torque)
        {
            return Err(ConfigError::invalid(
                "drivetrain.min_motor_friction_torque",
                "must satisfy 0 <= min <= max_motor_friction_torque",
            ));
        }
        if !(self.max_brake_torque >= 0.0) {
            return Err(ConfigError::invalid("drivetrain.max_brake_torque", "must be >= 0"));
        }
        Ok(())
    }
}

/// Per-tick drivetrain inputs.
#[derive(Debug, Clone, Copy, Default)]
pub struct DrivetrainInput {
    pub throttle: f32,      // 0..1
    pub brake: f32,         // 0..1
    pub reverse: bool,
    pub grounded: bool,
    pub speed_kph: f32,     // signed, + = forward
    pub wheel_count: usize,
}

/// Torques handed to the driven wheels this tick (already through the final drive).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DrivetrainOutput {
    pub drive_torque: f32,
    pub friction_torque: f32,
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t.clamp(0.0, 1.0)
}

/// Torque curve coefficient for a rev rate (clamped to [0, 1]).
#[inline]
pub fn torque_curve(rev_rate: f32) -> f32 {
    let rev_rate = rev_rate.clamp(0.0, 1.0);
    if rev_rate < 0.5 {
        1.0
    } else {
        let coef = (1.0 - rev_rate) * 2.0;
        coef * coef
    }
}

#[derive(Debug, Clone)]
pub struct Drivetrain {
    config: DrivetrainConfig,
    wheel_radius: f32,

    max_forward_rpm: f32,
    max_backward_rpm: f32,

    motor_rpm: f32,
    reverse: bool,
}

impl Drivetrain {
    /// `wheel_radius` is the driven wheel radius used for speed <-> rpm.
    pub fn new(config: DrivetrainConfig, wheel_radius: f32) -> Result<Self, ConfigError> {
        config.validate()?;
        if !(wheel_radius > 0.0) {
            return Err(ConfigError::invalid("drivetrain.wheel_radius", "must be > 0"));
        }

        let rpm = |kph| speed_kph_to_engine_rpm(kph, 1.0, config.final_gear_ratio, wheel_radius);

        Ok(Self {
            max_forward_rpm: rpm(config.max_forward_speed_kph),
            max_backward_rpm: rpm(config.max_backward_speed_kph),
            config,
            wheel_radius,
            motor_rpm: 0.0,
            reverse: false,
        })
    }

    pub fn config(&self) -> &DrivetrainConfig { &self.config }
    pub fn motor_rpm(&self) -> f32 { self.motor_rpm }
    pub fn max_forward_rpm(&self) -> f32 { self.max_forward_rpm }
    pub fn max_backward_rpm(&self) -> f32 { self.max_backward_rpm }
    pub fn reverse(&self) -> bool { self.reverse }
    pub fn set_reverse(&mut self, reverse: bool) { self.reverse = reverse; }

    pub fn max_speed_kph(&self) -> f32 {
        self.config.max_forward_speed_kph.max(self.config.max_backward_speed_kph)
    }

    /// Signed fraction of the larger of the two rpm limits.
    pub fn motor_revolution_rate(&self) -> f32 {
        self.motor_rpm / self.max_forward_rpm.max(self.max_backward_rpm)
    }

    pub fn rpm_from_speed_kph(&self, speed_kph: f32) -> f32 {
        speed_kph_to_engine_rpm(speed_kph, 1.0, self.config.final_gear_ratio, self.wheel_radius)
    }

    pub fn exceeds_max_rpm(&self) -> bool {
        let max_rpm = if self.reverse { self.max_backward_rpm } else { self.max_forward_rpm };
        self.motor_rpm.abs() > max_rpm
    }

    /// Motor torque at the current rpm (signed by direction, 0 over the limit).
    pub fn motor_torque(&self) -> f32 {
        if self.exceeds_max_rpm() {
            return 0.0;
        }
        let sign = if self.reverse { -1.0 } else { 1.0 };
        sign * self.config.max_motor_torque * torque_curve(self.motor_revolution_rate())
    }

    /// Internal friction of the motor; grows with rev_rate².
    pub fn motor_friction_torque(&self) -> f32 {
        let rate = self.motor_revolution_rate();
        lerp(
            self.config.min_motor_friction_torque,
            self.config.max_motor_friction_torque,
            rate * rate,
        )
    }

    /// Advance one fixed tick.
    pub fn update(&mut self, input: &DrivetrainInput, dt: f32) -> DrivetrainOutput {
        self.reverse = input.reverse;

        let mut throttle = input.throttle.clamp(0.0, 1.0);
        if self.exceeds_max_rpm() {
            throttle = 0.0;
        }

        let ratio = self.config.final_gear_ratio;

        if input.grounded {
            self.motor_rpm = self.rpm_from_speed_kph(input.speed_kph);

            let motor_torque = self.motor_torque() * throttle;
            let friction_torque = self.motor_friction_torque() * (1.0 - throttle);

            DrivetrainOutput {
                drive_torque: motor_torque * ratio,
                friction_torque: friction_torque * ratio,
            }
        } else {
            let sign = if self.reverse { -1.0 } else { 1.0 };
            let friction = self.motor_friction_torque();

            let drive_torque = sign * friction * throttle * ratio;
            let friction_torque = friction * (1.0 - throttle) * ratio;
            let brake_torque = self.config.max_brake_torque
                * input.brake.clamp(0.0, 1.0)
                * input.wheel_count as f32
                * ratio;

            let inertia = ratio * ratio * self.config.motor_inertia;

            self.motor_rpm += (drive_torque / inertia) * dt * RAD_PER_SEC_TO_RPM;
            self.decelerate(friction_torque, inertia, dt);
            self.decelerate(brake_torque, inertia, dt);

            DrivetrainOutput::default()
        }
    }

    /// Pull rpm toward zero without crossing it.
    fn decelerate(&mut self, torque: f32, inertia: f32, dt: f32) {
        let delta = (torque / inertia) * dt * RAD_PER_SEC_TO_RPM;
        if delta >= self.motor_rpm.abs() {
            self.motor_rpm = 0.0;
        } else {
            self.motor_rpm -= self.motor_rpm.signum() * delta;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    fn drivetrain() -> Drivetrain {
        Drivetrain::new(DrivetrainConfig::default(), 0.35).unwrap()
    }

    fn grounded(throttle: f32, speed_kph: f32) -> DrivetrainInput {
        DrivetrainInput {
            throttle,
            grounded: true,
            speed_kph,
            wheel_count: 4,
            ..Default::default()
        }
    }

    fn airborne(throttle: f32, brake: f32) -> DrivetrainInput {
        DrivetrainInput {
            throttle,
            brake,
            grounded: false,
            wheel_count: 4,
            ..Default::default()
        }
    }

    #[test]
    fn torque_curve_shape() {
        assert_eq!(torque_curve(0.0), 1.0);
        assert_eq!(torque_curve(0.49), 1.0);
        assert!((torque_curve(0.5) - 1.0).abs() < 1e-6);
        assert!((torque_curve(0.75) - 0.25).abs() < 1e-6);
        assert!(torque_curve(1.0).abs() < 1e-6);
        // negative (reverse) rates clamp to the flat part
        assert_eq!(torque_curve(-0.8), 1.0);
    }

    #[test]
    fn max_rpm_from_top_speed() {
        let dt = drivetrain();
        let expected = speed_kph_to_engine_rpm(180.0, 1.0, 8.0, 0.35);
        assert!((dt.max_forward_rpm() - expected).abs() < 1e-2);
        assert!(dt.max_backward_rpm() < dt.max_forward_rpm());
        assert_eq!(dt.max_speed_kph(), 180.0);
    }

    #[test]
    fn grounded_rpm_follows_road_speed() {
        let mut dt = drivetrain();
        dt.update(&grounded(0.5, 90.0), DT);
        assert!((dt.motor_rpm() - dt.rpm_from_speed_kph(90.0)).abs() < 1e-3);
        assert!((dt.motor_revolution_rate() - 0.5).abs() < 1e-4);
    }

    #[test]
    fn grounded_full_throttle_low_revs_gives_full_torque() {
        let mut dt = drivetrain();
        let out = dt.update(&grounded(1.0, 20.0), DT);
        assert!((out.drive_torque - 300.0 * 8.0).abs() < 1e-2);
        assert_eq!(out.friction_torque, 0.0);
    }

    #[test]
    fn grounded_three_quarter_revs_gives_quarter_torque() {
        let mut dt = drivetrain();
        // 0.75 * 180 kph -> rev_rate 0.75
        let out = dt.update(&grounded(1.0, 135.0), DT);
        assert!((out.drive_torque - 0.25 * 300.0 * 8.0).abs() < 0.5);
    }

    #[test]
    fn reverse_drive_torque_is_negative() {
        let mut dt = drivetrain();
        let input = DrivetrainInput { reverse: true, ..grounded(1.0, -5.0) };
        let out = dt.update(&input, DT);
        assert!(out.drive_torque < 0.0);
        assert!(dt.motor_revolution_rate() < 0.0);
    }

    #[test]
    fn coasting_applies_engine_brake() {
        let mut dt = drivetrain();
        let out = dt.update(&grounded(0.0, 90.0), DT);
        assert_eq!(out.drive_torque, 0.0);
        // rev_rate 0.5 -> lerp(15, 75, 0.25) = 30
        assert!((out.friction_torque - 30.0 * 8.0).abs() < 0.1);
    }

    #[test]
    fn rev_limiter_cuts_throttle_next_tick() {
        let mut dt = drivetrain();
        // over the forward limit
        dt.update(&grounded(1.0, 200.0), DT);
        assert!(dt.exceeds_max_rpm());
        let out = dt.update(&grounded(1.0, 200.0), DT);
        assert_eq!(out.drive_torque, 0.0);
        // throttle is cut, so friction acts with the full (1 - 0) share
        assert!(out.friction_torque > 0.0);
    }

    #[test]
    fn revolution_rate_is_bounded_within_limits() {
        let mut dt = drivetrain();
        for kph in [-60.0, -30.0, 0.0, 45.0, 120.0, 180.0] {
            dt.update(&grounded(0.3, kph), DT);
            let rate = dt.motor_revolution_rate();
            assert!((-1.0..=1.0).contains(&rate), "kph {kph} -> {rate}");
        }
    }

    #[test]
    fn over_limit_rpm_never_grows_without_throttle() {
        let mut dt = drivetrain();
        dt.update(&grounded(0.0, 220.0), DT); // couple to an over-limit road speed
        let mut over_limit_ticks = 0;
        for _ in 0..200 {
            let was_over = dt.exceeds_max_rpm();
            let prev = dt.motor_rpm().abs();
            dt.update(&airborne(1.0, 0.0), DT);
            if was_over {
                over_limit_ticks += 1;
                let now = dt.motor_rpm().abs();
                assert!(now <= prev, "rpm grew over the limit: {prev} -> {now}");
            }
        }
        assert!(over_limit_ticks > 0);
    }

    #[test]
    fn airborne_throttle_spins_up_and_friction_spins_down() {
        let mut dt = drivetrain();
        for _ in 0..30 {
            dt.update(&airborne(1.0, 0.0), DT);
        }
        let spun = dt.motor_rpm();
        assert!(spun > 0.0);

        for _ in 0..30 {
            dt.update(&airborne(0.0, 0.0), DT);
        }
        assert!(dt.motor_rpm() < spun);
        assert!(dt.motor_rpm() >= 0.0);
    }

    #[test]
    fn airborne_reverse_throttle_spins_the_motor_backwards() {
        let mut fwd = drivetrain();
        let mut rev = drivetrain();
        let reverse = DrivetrainInput { reverse: true, ..airborne(1.0, 0.0) };

        for _ in 0..30 {
            fwd.update(&airborne(1.0, 0.0), DT);
            let out = rev.update(&reverse, DT);
            assert_eq!(out, DrivetrainOutput::default());
        }

        assert!(rev.motor_rpm() < 0.0);
        assert!((rev.motor_rpm() + fwd.motor_rpm()).abs() < 1e-3, "{} vs {}", rev.motor_rpm(), fwd.motor_rpm());
    }

    #[test]
    fn airborne_brake_stops_motor_without_flipping_sign() {
        let mut dt = drivetrain();
        dt.update(&grounded(0.0, 100.0), DT);
        assert!(dt.motor_rpm() > 0.0);
        let out = dt.update(&airborne(0.0, 1.0), DT);
        assert_eq!(out, DrivetrainOutput::default());
        for _ in 0..600 {
            dt.update(&airborne(0.0, 1.0), DT);
            assert!(dt.motor_rpm() >= 0.0);
        }
        assert_eq!(dt.motor_rpm(), 0.0);

        // and from below zero
        dt.update(&grounded(0.0, -40.0), DT);
        assert!(dt.motor_rpm() < 0.0);
        for _ in 0..600 {
            dt.update(&airborne(0.0, 1.0), DT);
            assert!(dt.motor_rpm() <= 0.0);
        }
        assert_eq!(dt.motor_rpm(), 0.0);
    }

    #[test]
    fn friction_torque_monotone_in_rev_rate_squared() {
        let mut dt = drivetrain();
        let mut prev = f32::MIN;
        for step in 0..=40 {
            let kph = step as f32 * 5.0; // 0..200 kph, past the limit
            dt.update(&grounded(0.0, kph), DT);
            let f = dt.motor_friction_torque();
            assert!(f >= prev, "friction dropped at {kph} kph: {prev} -> {f}");
            assert!(f <= dt.config().max_motor_friction_torque + 1e-4);
            prev = f;
        }
    }

    #[test]
    fn config_validation() {
        let cfg = DrivetrainConfig { motor_inertia: 0.0, ..Default::default() };
        assert!(Drivetrain::new(cfg, 0.35).is_err());

        let cfg = DrivetrainConfig { final_gear_ratio: 0.0, ..Default::default() };
        assert!(cfg.validate().is_err());

        let cfg = DrivetrainConfig {
            min_motor_friction_torque: 90.0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());

        assert!(Drivetrain::new(DrivetrainConfig::default(), 0.0).is_err());
    }
}
