// ==============================================================================
// wheel.rs - PER-WHEEL SIMULATION (GROUND CHECK -> SUSPENSION -> FRICTION -> SPIN)
// ------------------------------------------------------------------------------
// One Wheel per corner, owned by the Vehicle. Each tick runs in two halves so
// the drivetrain can sit between them:
//
//   detect_ground()   probe the ground, refresh `grounded` + hit, measure the
//                     wheel's road speed for the drivetrain
//   apply_forces()    compression -> spring/damper -> drive/brake + friction
//                     -> spin integration
//
// `step()` runs both halves back to back for callers without a drivetrain.
//
// Forces go through ChassisBody::apply_force_at_point() at the hit point and
// are only produced while grounded. An airborne wheel reports 0 compression,
// 0 suspension force, no friction and 0 sideways velocity.
// ==============================================================================

use std::f32::consts::{FRAC_PI_4, TAU};

use serde::{Deserialize, Serialize};

use crate::arcade_car::friction::{
    drive_brake_force, friction_forces, slip_components, wheel_basis_world, TireGrip,
};
use crate::arcade_car::interfaces::{ChassisBody, GroundQuery};
use crate::arcade_car::suspension::{
    cast_length, compression_from_hit, compute_suspension_force, effective_radius,
};
use crate::arcade_car::types::{local_up, DetectionMode, GroundCast, GroundHit, Pos3, Vec3, WheelId};
use crate::error::ConfigError;

const fn default_stroke() -> f32 { 0.1 }
const fn default_width() -> f32 { 0.2 }

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WheelConfig {
    pub id: WheelId,

    /// Suspension top mount in chassis space (m).
    pub mount: [f32; 3],

    #[serde(default)]
    pub detection: DetectionMode,

    /// Max suspension travel (m).
    #[serde(default = "default_stroke")]
    pub suspension_stroke: f32,
    pub suspension_spring: f32,     // N/m
    pub suspension_damper: f32,     // N·s/m

    pub radius: f32,                // m
    #[serde(default = "default_width")]
    pub width: f32,                 // m
    /// Camber (rad), within ±45°.
    #[serde(default)]
    pub camber: f32,
    #[serde(default)]
    pub ground_offset: f32,         // m

    #[serde(default)]
    pub grip: TireGrip,

    #[serde(default)]
    pub drive: bool,                // receives drivetrain torque
    #[serde(default)]
    pub steer: bool,                // follows steering input
}

impl WheelConfig {
    pub fn validate(&self, index: usize) -> Result<(), ConfigError> {
        let field = |name: &str| format!("wheels[{index}].{name}");

        if !(self.radius > 0.0) {
            return Err(ConfigError::invalid(field("radius"), "must be > 0"));
        }
        if !(self.width > 0.0) {
            return Err(ConfigError::invalid(field("width"), "must be > 0"));
        }
        if !(self.suspension_stroke > 0.0) {
            return Err(ConfigError::invalid(field("suspension_stroke"), "must be > 0"));
        }
        if !(self.suspension_spring >= 0.0) {
            return Err(ConfigError::invalid(field("suspension_spring"), "must be >= 0"));
        }
        if !(self.suspension_damper >= 0.0) {
            return Err(ConfigError::invalid(field("suspension_damper"), "must be >= 0"));
        }
        if !(self.camber.abs() <= FRAC_PI_4) {
            return Err(ConfigError::invalid(field("camber"), "must be within ±45° (±0.785 rad)"));
        }
        if !self.ground_offset.is_finite() {
            return Err(ConfigError::invalid(field("ground_offset"), "must be finite"));
        }
        if !(self.grip.forward_grip >= 0.0 && self.grip.sideways_grip >= 0.0) {
            return Err(ConfigError::invalid(field("grip"), "grip coefficients must be >= 0"));
        }
        if !(0.0..=1.0).contains(&self.grip.handbrake_grip_factor) {
            return Err(ConfigError::invalid(field("grip.handbrake_grip_factor"), "must be in [0, 1]"));
        }
        if !(self.grip.friction_gain >= 0.0) {
            return Err(ConfigError::invalid(field("grip.friction_gain"), "must be >= 0"));
        }
        if self.mount.iter().any(|c| !c.is_finite()) {
            return Err(ConfigError::invalid(field("mount"), "must be finite"));
        }
        Ok(())
    }

    pub fn mount_point(&self) -> Pos3 {
        Pos3::new(self.mount[0], self.mount[1], self.mount[2])
    }
}

/// Forces one wheel produced this tick (world space, N).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WheelForces {
    pub suspension: f32,
    pub friction: Vec3,
    pub drive: Vec3,
}

impl WheelForces {
    pub fn total(&self, up: Vec3) -> Vec3 {
        up * self.suspension + self.friction + self.drive
    }
}

#[derive(Debug, Clone)]
pub struct Wheel {
    config: WheelConfig,

    // suspension state
    compression: f32,
    prev_compression: f32,

    // contact
    grounded: bool,
    hit: Option<GroundHit>,

    // kinematics
    steer_angle: f32,       // rad, positive = right
    spin_angle: f32,        // rad, [0, 2π)
    angular_velocity: f32,  // rad/s
    sideways_vel: f32,      // m/s
    forward_speed: f32,     // m/s, road-relative, measured at the mount

    // cached from the last ground check
    mount_world: Pos3,
    up: Vec3,

    last_forces: WheelForces,
}

impl Wheel {
    pub fn new(config: WheelConfig) -> Self {
        let mount_world = config.mount_point();
        Self {
            config,
            compression: 0.0,
            prev_compression: 0.0,
            grounded: false,
            hit: None,
            steer_angle: 0.0,
            spin_angle: 0.0,
            angular_velocity: 0.0,
            sideways_vel: 0.0,
            forward_speed: 0.0,
            mount_world,
            up: local_up(),
            last_forces: WheelForces::default(),
        }
    }

    // --------------------------------------------------------------
    // accessors
    // --------------------------------------------------------------

    pub fn config(&self) -> &WheelConfig { &self.config }
    pub fn id(&self) -> WheelId { self.config.id }
    pub fn radius(&self) -> f32 { self.config.radius }
    pub fn is_driven(&self) -> bool { self.config.drive }
    pub fn is_steered(&self) -> bool { self.config.steer }

    pub fn grounded(&self) -> bool { self.grounded }
    pub fn hit(&self) -> Option<&GroundHit> { self.hit.as_ref() }
    pub fn compression(&self) -> f32 { self.compression }
    pub fn prev_compression(&self) -> f32 { self.prev_compression }

    /// Distance from mount to wheel centre.
    pub fn suspension_length(&self) -> f32 {
        self.config.suspension_stroke - self.compression
    }

    /// Wheel centre in world space as of the last tick.
    pub fn center(&self) -> Pos3 {
        self.mount_world - self.up * self.suspension_length()
    }

    pub fn steer_angle(&self) -> f32 { self.steer_angle }
    pub fn set_steer_angle(&mut self, angle: f32) { self.steer_angle = angle; }

    pub fn spin_angle(&self) -> f32 { self.spin_angle }
    pub fn angular_velocity(&self) -> f32 { self.angular_velocity }

    /// Lateral velocity at the contact, 0 while airborne.
    pub fn sideways_velocity(&self) -> f32 { self.sideways_vel }

    /// Rolling-direction speed relative to the ground (m/s).
    pub fn forward_speed(&self) -> f32 { self.forward_speed }

    pub fn last_forces(&self) -> WheelForces { self.last_forces }

    /// Visual camber: mirrored so both sides lean the same way.
    pub fn fixed_camber_angle(&self) -> f32 {
        -self.config.mount[0].signum() * self.config.camber
    }

    // --------------------------------------------------------------
    // tick, first half
    // --------------------------------------------------------------

    pub fn detect_ground(&mut self, chassis: &dyn ChassisBody, ground: &dyn GroundQuery) {
        let cfg = &self.config;
        let pose = chassis.pose();

        self.mount_world = pose * cfg.mount_point();
        self.up = pose.rotation * local_up();

        let origin = match cfg.detection {
            DetectionMode::Ray => self.mount_world,
            DetectionMode::Sphere => self.mount_world + self.up * cfg.radius,
        };

        let cast = GroundCast {
            mode: cfg.detection,
            origin,
            direction: -self.up,
            max_distance: cast_length(cfg.detection, cfg.suspension_stroke, cfg.radius, cfg.camber),
            radius: cfg.radius,
        };

        self.hit = ground.cast(&cast);
        self.grounded = self.hit.is_some();

        // road speed for the drivetrain
        let (forward, _) = wheel_basis_world(&pose, self.steer_angle);
        let mut vel = chassis.velocity_at_point(&self.mount_world);
        if let Some(surface_vel) = self.hit.and_then(|h| h.surface_velocity) {
            vel -= surface_vel;
        }
        self.forward_speed = vel.dot(&forward);
    }

    // --------------------------------------------------------------
    // tick, second half
    // --------------------------------------------------------------

    pub fn apply_forces(
        &mut self,
        chassis: &mut dyn ChassisBody,
        drive_torque: f32,
        brake_torque: f32,
        handbrake: bool,
        dt: f32,
    ) -> WheelForces {
        self.update_compression();

        let mut forces = WheelForces::default();

        if let Some(hit) = self.hit.filter(|_| self.grounded) {
            // 1) suspension
            forces.suspension = compute_suspension_force(
                self.config.suspension_spring,
                self.config.suspension_damper,
                self.compression,
                self.prev_compression,
                dt,
            );
            chassis.apply_force_at_point(self.up * forces.suspension, hit.point);

            // 2) friction + drive
            let pose = chassis.pose();
            let (forward, right) = wheel_basis_world(&pose, self.steer_angle);
            // chassis velocity as-is; only spin is measured against the ground body
            let point_vel = chassis.velocity_at_point(&hit.point);
            let (v_long, v_lat) = slip_components(point_vel, forward, right);

            self.sideways_vel = v_lat;

            let (f_long, f_lat) =
                friction_forces(&self.config.grip, v_long, v_lat, forward, right, handbrake);
            forces.friction = f_long + f_lat;
            forces.drive = drive_brake_force(drive_torque, brake_torque, self.config.radius, v_long, forward);

            chassis.apply_force_at_point(forces.friction + forces.drive, hit.point);
        } else {
            self.sideways_vel = 0.0;
        }

        self.update_spin(chassis, dt);

        self.last_forces = forces;
        forces
    }

    /// Full single-wheel tick: ground check followed by force application.
    pub fn step(
        &mut self,
        chassis: &mut dyn ChassisBody,
        ground: &dyn GroundQuery,
        drive_torque: f32,
        brake_torque: f32,
        handbrake: bool,
        dt: f32,
    ) -> WheelForces {
        self.detect_ground(chassis, ground);
        self.apply_forces(chassis, drive_torque, brake_torque, handbrake, dt)
    }

    fn update_compression(&mut self) {
        self.prev_compression = self.compression;

        self.compression = match self.hit.filter(|_| self.grounded) {
            Some(hit) => {
                let cfg = &self.config;
                let r_eff = effective_radius(cfg.detection, cfg.radius, cfg.camber);
                compression_from_hit(cfg.suspension_stroke, hit.distance, cfg.ground_offset, r_eff)
            }
            None => 0.0,
        };
    }

    fn update_spin(&mut self, chassis: &dyn ChassisBody, dt: f32) {
        if let Some(hit) = self.hit.filter(|_| self.grounded) {
            let (forward, _) = wheel_basis_world(&chassis.pose(), self.steer_angle);
            let mut vel = chassis.velocity_at_point(&hit.point);
            if let Some(surface_vel) = hit.surface_velocity {
                vel -= surface_vel;
            }
            self.angular_velocity = vel.dot(&forward) / self.config.radius;
        }

        if dt > 0.0 {
            self.spin_angle = (self.spin_angle + self.angular_velocity * dt).rem_euclid(TAU);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arcade_car::types::Pose;
    use nalgebra::{Isometry3, Translation3, UnitQuaternion};

    // ---------------------------------------------------------
    // test doubles
    // ---------------------------------------------------------

    /// Rigid chassis translating with a constant velocity; records forces.
    struct TestChassis {
        pose: Pose,
        linvel: Vec3,
        forces: Vec<(Vec3, Pos3)>,
    }

    impl TestChassis {
        fn at_height(y: f32) -> Self {
            Self {
                pose: Isometry3::from_parts(Translation3::new(0.0, y, 0.0), UnitQuaternion::identity()),
                linvel: Vec3::zeros(),
                forces: Vec::new(),
            }
        }

        fn net_force(&self) -> Vec3 {
            self.forces.iter().fold(Vec3::zeros(), |acc, (f, _)| acc + f)
        }
    }

    impl ChassisBody for TestChassis {
        fn pose(&self) -> Pose { self.pose }
        fn velocity_at_point(&self, _point: &Pos3) -> Vec3 { self.linvel }
        fn apply_force_at_point(&mut self, force: Vec3, point: Pos3) {
            self.forces.push((force, point));
        }
    }

    /// Horizontal plane at y = `height`, optionally moving.
    struct Plane {
        height: f32,
        velocity: Option<Vec3>,
    }

    impl GroundQuery for Plane {
        fn cast(&self, cast: &GroundCast) -> Option<GroundHit> {
            // only straight-down casts are used here
            let drop = match cast.mode {
                DetectionMode::Ray => cast.origin.y - self.height,
                DetectionMode::Sphere => cast.origin.y - self.height - cast.radius,
            };
            if drop < 0.0 || drop > cast.max_distance {
                return None;
            }
            Some(GroundHit {
                distance: drop,
                point: Pos3::new(cast.origin.x, self.height, cast.origin.z),
                normal: Vec3::y(),
                surface_velocity: self.velocity,
            })
        }
    }

    struct Void;

    impl GroundQuery for Void {
        fn cast(&self, _cast: &GroundCast) -> Option<GroundHit> { None }
    }

    fn wheel_cfg() -> WheelConfig {
        WheelConfig {
            id: WheelId::RL,
            mount: [0.8, 0.0, -1.2],
            detection: DetectionMode::Ray,
            suspension_stroke: 0.2,
            suspension_spring: 20_000.0,
            suspension_damper: 2_000.0,
            radius: 0.35,
            width: 0.2,
            camber: 0.0,
            ground_offset: 0.0,
            grip: TireGrip::default(),
            drive: true,
            steer: false,
        }
    }

    // ---------------------------------------------------------
    // tests
    // ---------------------------------------------------------

    #[test]
    fn grounded_wheel_compresses_and_pushes_up() {
        // mount 0.45 above ground -> 0.2 - (0.45 - 0.35) = 0.1 compression
        let mut chassis = TestChassis::at_height(0.45);
        let ground = Plane { height: 0.0, velocity: None };
        let mut wheel = Wheel::new(wheel_cfg());

        let forces = wheel.step(&mut chassis, &ground, 0.0, 0.0, false, 0.02);

        assert!(wheel.grounded());
        assert!((wheel.compression() - 0.1).abs() < 1e-5);
        // first tick: prev = 0 -> damper adds 2000 * 0.1 / 0.02
        assert!((forces.suspension - (2_000.0 + 10_000.0)).abs() < 0.5);
        assert!(chassis.net_force().y > 0.0);

        // second tick at the same height: spring only
        chassis.forces.clear();
        let forces = wheel.step(&mut chassis, &ground, 0.0, 0.0, false, 0.02);
        assert!((forces.suspension - 2_000.0).abs() < 0.5);
    }

    #[test]
    fn airborne_wheel_produces_nothing() {
        let mut chassis = TestChassis::at_height(5.0);
        chassis.linvel = Vec3::new(3.0, 0.0, 12.0);
        let mut wheel = Wheel::new(wheel_cfg());

        let forces = wheel.step(&mut chassis, &Void, 500.0, 200.0, false, 0.02);

        assert!(!wheel.grounded());
        assert_eq!(wheel.compression(), 0.0);
        assert_eq!(forces, WheelForces::default());
        assert!(chassis.forces.is_empty());
        assert_eq!(wheel.sideways_velocity(), 0.0);
        assert!((wheel.center().y - (5.0 - 0.2)).abs() < 1e-5);
    }

    #[test]
    fn sideways_velocity_is_measured_and_reset_when_airborne() {
        let mut chassis = TestChassis::at_height(0.45);
        chassis.linvel = Vec3::new(-2.0, 0.0, 5.0); // -X is right
        let ground = Plane { height: 0.0, velocity: None };
        let mut wheel = Wheel::new(wheel_cfg());

        let grounded = wheel.step(&mut chassis, &ground, 0.0, 0.0, false, 0.02);
        assert!((wheel.sideways_velocity() - 2.0).abs() < 1e-5);
        assert!((wheel.forward_speed() - 5.0).abs() < 1e-5);
        assert!(grounded.friction.norm() > 0.0);

        // still sliding sideways, but nothing to push against
        chassis.pose.translation.vector.y = 10.0;
        let airborne = wheel.step(&mut chassis, &Void, 0.0, 0.0, false, 0.02);
        assert_eq!(wheel.sideways_velocity(), 0.0);
        assert_eq!(airborne, WheelForces::default());
        assert_eq!(wheel.last_forces(), WheelForces::default());
    }

    #[test]
    fn friction_on_a_platform_uses_chassis_velocity() {
        // car and platform move together; friction still sees the car's own motion
        let mut chassis = TestChassis::at_height(0.45);
        chassis.linvel = Vec3::new(-3.0, 0.0, 5.0);
        let ground = Plane { height: 0.0, velocity: Some(Vec3::new(-3.0, 0.0, 5.0)) };
        let mut wheel = Wheel::new(wheel_cfg());

        let forces = wheel.step(&mut chassis, &ground, 0.0, 0.0, false, 0.02);

        assert!((wheel.sideways_velocity() - 3.0).abs() < 1e-5);
        // pushes back toward +X, against the slide
        assert!(forces.friction.x > 0.0, "{:?}", forces.friction);
        assert!(forces.friction.z < 0.0, "{:?}", forces.friction);
        // spin is relative to the platform, which the wheel is not rolling on
        assert!(wheel.angular_velocity().abs() < 1e-5);
    }

    #[test]
    fn compression_never_exceeds_stroke() {
        // mount below the wheel radius: hit distance 0.1 < radius
        let mut chassis = TestChassis::at_height(0.1);
        let ground = Plane { height: 0.0, velocity: None };
        let mut wheel = Wheel::new(wheel_cfg());
        wheel.step(&mut chassis, &ground, 0.0, 0.0, false, 0.02);
        assert_eq!(wheel.compression(), wheel.config().suspension_stroke);
    }

    #[test]
    fn sphere_mode_reaches_stroke_plus_radius() {
        let mut cfg = wheel_cfg();
        cfg.detection = DetectionMode::Sphere;
        let mut wheel = Wheel::new(cfg);
        let ground = Plane { height: 0.0, velocity: None };

        // wheel bottom at full extension: 0.2 + 0.35 below mount
        let mut chassis = TestChassis::at_height(0.5);
        wheel.step(&mut chassis, &ground, 0.0, 0.0, false, 0.02);
        assert!(wheel.grounded());
        assert!((wheel.compression() - 0.05).abs() < 1e-5);

        let mut chassis = TestChassis::at_height(0.6);
        wheel.step(&mut chassis, &ground, 0.0, 0.0, false, 0.02);
        assert!(!wheel.grounded());
    }

    #[test]
    fn spin_follows_road_speed_relative_to_moving_ground() {
        let mut chassis = TestChassis::at_height(0.45);
        chassis.linvel = Vec3::new(0.0, 0.0, 7.0);
        // platform moving forward at 3 m/s under the car
        let ground = Plane { height: 0.0, velocity: Some(Vec3::new(0.0, 0.0, 3.0)) };
        let mut wheel = Wheel::new(wheel_cfg());

        wheel.step(&mut chassis, &ground, 0.0, 0.0, false, 0.1);
        assert!((wheel.angular_velocity() - 4.0 / 0.35).abs() < 1e-3);
        assert!((wheel.spin_angle() - (4.0 / 0.35 * 0.1)).abs() < 1e-3);
        assert!((wheel.forward_speed() - 4.0).abs() < 1e-5);

        // airborne keeps spinning at the last rate
        chassis.pose.translation.vector.y = 10.0;
        wheel.step(&mut chassis, &Void, 0.0, 0.0, false, 0.1);
        assert!((wheel.angular_velocity() - 4.0 / 0.35).abs() < 1e-3);
    }

    #[test]
    fn handbrake_cuts_lateral_force() {
        let ground = Plane { height: 0.0, velocity: None };

        let mut chassis = TestChassis::at_height(0.45);
        chassis.linvel = Vec3::new(-3.0, 0.0, 0.0);
        let mut wheel = Wheel::new(wheel_cfg());
        let free = wheel.step(&mut chassis, &ground, 0.0, 0.0, false, 0.02);

        let mut chassis = TestChassis::at_height(0.45);
        chassis.linvel = Vec3::new(-3.0, 0.0, 0.0);
        let mut wheel = Wheel::new(wheel_cfg());
        let held = wheel.step(&mut chassis, &ground, 0.0, 0.0, true, 0.02);

        assert!((held.friction.norm() - free.friction.norm() * 0.3).abs() < 1e-3);
    }

    #[test]
    fn validation_rejects_degenerate_geometry() {
        let mut cfg = wheel_cfg();
        cfg.radius = 0.0;
        assert!(cfg.validate(0).is_err());

        let mut cfg = wheel_cfg();
        cfg.suspension_stroke = 0.0;
        let err = cfg.validate(2).unwrap_err();
        assert!(err.to_string().contains("wheels[2].suspension_stroke"));

        let mut cfg = wheel_cfg();
        cfg.camber = 1.0;
        assert!(cfg.validate(0).is_err());

        let mut cfg = wheel_cfg();
        cfg.grip.handbrake_grip_factor = 1.5;
        assert!(cfg.validate(0).is_err());

        assert!(wheel_cfg().validate(0).is_ok());
    }
}
