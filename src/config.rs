use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::arcade_car::friction::TireGrip;
use crate::arcade_car::{
    DetectionMode, DriftConfig, DrivetrainConfig, SteeringConfig, WheelConfig, WheelId,
};
use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Serde default functions
// ---------------------------------------------------------------------------

fn default_name() -> String {
    "custom".into()
}
const fn default_linear_damping() -> f32 {
    0.05
}
const fn default_angular_damping() -> f32 {
    0.5
}

// ---------------------------------------------------------------------------
// ChassisConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChassisConfig {
    pub mass: f32,                  // kg
    pub half_extents: [f32; 3],     // [hx, hy, hz] meters
    /// Centre of mass relative to the body origin.
    #[serde(default)]
    pub com_offset: [f32; 3],
    #[serde(default = "default_linear_damping")]
    pub linear_damping: f32,
    #[serde(default = "default_angular_damping")]
    pub angular_damping: f32,
}

impl ChassisConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.mass > 0.0) {
            return Err(ConfigError::invalid("chassis.mass", "must be > 0"));
        }
        if self.half_extents.iter().any(|&h| !(h > 0.0)) {
            return Err(ConfigError::invalid("chassis.half_extents", "all extents must be > 0"));
        }
        if self.com_offset.iter().any(|c| !c.is_finite()) {
            return Err(ConfigError::invalid("chassis.com_offset", "must be finite"));
        }
        if !(self.linear_damping >= 0.0 && self.angular_damping >= 0.0) {
            return Err(ConfigError::invalid("chassis.damping", "must be >= 0"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// VehicleConfig
// ---------------------------------------------------------------------------

/// Everything needed to build a Vehicle and its chassis body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleConfig {
    #[serde(default = "default_name")]
    pub name: String,

    pub chassis: ChassisConfig,
    pub wheels: Vec<WheelConfig>,

    #[serde(default)]
    pub drivetrain: DrivetrainConfig,
    #[serde(default)]
    pub steering: SteeringConfig,
    #[serde(default)]
    pub drift: DriftConfig,

    /// Wheel whose road speed feeds the drivetrain.
    #[serde(default)]
    pub speed_source_wheel: usize,
}

impl Default for VehicleConfig {
    fn default() -> Self {
        Self::arcade_coupe()
    }
}

impl VehicleConfig {
    /// Parse from a TOML string, then validate.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file, then validate.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Look up a built-in preset by name.
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "arcade_coupe" | "coupe" => Some(Self::arcade_coupe()),
            "offroad_buggy" | "buggy" => Some(Self::offroad_buggy()),
            _ => None,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.chassis.validate()?;

        if self.wheels.is_empty() {
            return Err(ConfigError::NoWheels);
        }
        for (i, wheel) in self.wheels.iter().enumerate() {
            wheel.validate(i)?;
        }
        if !self.wheels.iter().any(|w| w.drive) {
            return Err(ConfigError::NoDrivenWheels);
        }
        if self.speed_source_wheel >= self.wheels.len() {
            return Err(ConfigError::WheelIndexOutOfRange {
                field: "speed_source_wheel",
                index: self.speed_source_wheel,
                count: self.wheels.len(),
            });
        }

        self.drivetrain.validate()?;
        self.steering.validate()?;
        self.drift.validate(self.wheels.len())?;
        Ok(())
    }

    /// Radius used by the drivetrain for speed <-> rpm (first driven wheel).
    pub fn driven_wheel_radius(&self) -> Option<f32> {
        self.wheels.iter().find(|w| w.drive).map(|w| w.radius)
    }

    // -----------------------------------------------------------------------
    // presets
    // -----------------------------------------------------------------------

    /// Rear-drive coupe, ray suspension, loose rear for handbrake drifts.
    pub fn arcade_coupe() -> Self {
        let grip = TireGrip {
            forward_grip: 1.5,
            sideways_grip: 60.0,
            handbrake_grip_factor: 0.3,
            friction_gain: 10.0,
        };
        let wheel = |id: WheelId, mount: [f32; 3], drive: bool, steer: bool| WheelConfig {
            id,
            mount,
            detection: DetectionMode::Ray,
            suspension_stroke: 0.2,
            suspension_spring: 30_000.0,
            suspension_damper: 3_000.0,
            radius: 0.34,
            width: 0.22,
            camber: 0.0,
            ground_offset: 0.0,
            grip,
            drive,
            steer,
        };

        Self {
            name: "arcade_coupe".into(),
            chassis: ChassisConfig {
                mass: 1200.0,
                half_extents: [0.9, 0.35, 2.0],
                com_offset: [0.0, -0.2, 0.0],
                linear_damping: default_linear_damping(),
                angular_damping: default_angular_damping(),
            },
            wheels: vec![
                wheel(WheelId::FL, [0.8, -0.1, 1.3], false, true),
                wheel(WheelId::FR, [-0.8, -0.1, 1.3], false, true),
                wheel(WheelId::RL, [0.8, -0.1, -1.3], true, false),
                wheel(WheelId::RR, [-0.8, -0.1, -1.3], true, false),
            ],
            drivetrain: DrivetrainConfig::default(),
            steering: SteeringConfig {
                max_steer_angle: 0.6,
                wheelbase: 2.6,
                track_width: 1.6,
                ackermann: 0.8,
            },
            drift: DriftConfig::default(),
            speed_source_wheel: 0,
        }
    }

    /// All-wheel-drive buggy on sphere-cast wheels with long travel.
    pub fn offroad_buggy() -> Self {
        let grip = TireGrip {
            forward_grip: 2.0,
            sideways_grip: 45.0,
            handbrake_grip_factor: 0.4,
            friction_gain: 10.0,
        };
        let wheel = |id: WheelId, mount: [f32; 3], steer: bool| WheelConfig {
            id,
            mount,
            detection: DetectionMode::Sphere,
            suspension_stroke: 0.35,
            suspension_spring: 16_000.0,
            suspension_damper: 1_800.0,
            radius: 0.42,
            width: 0.3,
            camber: 3f32.to_radians(),
            ground_offset: 0.0,
            grip,
            drive: true,
            steer,
        };

        Self {
            name: "offroad_buggy".into(),
            chassis: ChassisConfig {
                mass: 900.0,
                half_extents: [0.85, 0.3, 1.6],
                com_offset: [0.0, -0.15, 0.0],
                linear_damping: 0.1,
                angular_damping: 0.8,
            },
            wheels: vec![
                wheel(WheelId::FL, [0.85, -0.05, 1.1], true),
                wheel(WheelId::FR, [-0.85, -0.05, 1.1], true),
                wheel(WheelId::RL, [0.85, -0.05, -1.1], false),
                wheel(WheelId::RR, [-0.85, -0.05, -1.1], false),
            ],
            drivetrain: DrivetrainConfig {
                max_forward_speed_kph: 120.0,
                max_backward_speed_kph: 40.0,
                max_motor_torque: 260.0,
                final_gear_ratio: 10.0,
                ..DrivetrainConfig::default()
            },
            steering: SteeringConfig {
                max_steer_angle: 0.55,
                wheelbase: 2.2,
                track_width: 1.7,
                ackermann: 0.5,
            },
            drift: DriftConfig {
                threshold: 1.2,
                tracked_wheels: vec![2, 3],
            },
            speed_source_wheel: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_validate() {
        VehicleConfig::arcade_coupe().validate().unwrap();
        VehicleConfig::offroad_buggy().validate().unwrap();
        assert_eq!(VehicleConfig::default(), VehicleConfig::arcade_coupe());
        assert!(VehicleConfig::preset("buggy").is_some());
        assert!(VehicleConfig::preset("tank").is_none());
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let toml_str = r#"
            [chassis]
            mass = 1000.0
            half_extents = [0.8, 0.3, 1.8]

            [[wheels]]
            id = "RL"
            mount = [0.7, 0.0, -1.2]
            suspension_spring = 25000.0
            suspension_damper = 2500.0
            radius = 0.3
            drive = true

            [[wheels]]
            id = "RR"
            mount = [-0.7, 0.0, -1.2]
            suspension_spring = 25000.0
            suspension_damper = 2500.0
            radius = 0.3
            drive = true
            detection = "sphere"

            [drift]
            tracked_wheels = [0, 1]
        "#;
        let cfg = VehicleConfig::from_toml_str(toml_str).unwrap();

        assert_eq!(cfg.name, "custom");
        assert_eq!(cfg.wheels.len(), 2);
        assert_eq!(cfg.wheels[0].suspension_stroke, 0.1);
        assert_eq!(cfg.wheels[0].width, 0.2);
        assert_eq!(cfg.wheels[0].grip, TireGrip::default());
        assert_eq!(cfg.wheels[1].detection, DetectionMode::Sphere);
        assert_eq!(cfg.drivetrain, DrivetrainConfig::default());
        assert_eq!(cfg.drivetrain.final_gear_ratio, 8.0);
        assert_eq!(cfg.drift.threshold, 0.9);
        assert_eq!(cfg.drift.tracked_wheels, vec![0, 1]);
        assert_eq!(cfg.driven_wheel_radius(), Some(0.3));
    }

    #[test]
    fn default_drift_tracking_needs_four_wheels() {
        let mut cfg = VehicleConfig::arcade_coupe();
        cfg.wheels.truncate(2);
        cfg.wheels.iter_mut().for_each(|w| w.drive = true);
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::WheelIndexOutOfRange { field: "drift.tracked_wheels", .. })
        ));
    }

    #[test]
    fn rejects_bad_geometry_and_indices() {
        let mut cfg = VehicleConfig::arcade_coupe();
        cfg.wheels[1].radius = 0.0;
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidValue { .. })));

        let mut cfg = VehicleConfig::arcade_coupe();
        cfg.drivetrain.motor_inertia = 0.0;
        assert!(cfg.validate().is_err());

        let mut cfg = VehicleConfig::arcade_coupe();
        cfg.speed_source_wheel = 4;
        assert!(matches!(cfg.validate(), Err(ConfigError::WheelIndexOutOfRange { .. })));

        let mut cfg = VehicleConfig::arcade_coupe();
        cfg.wheels.iter_mut().for_each(|w| w.drive = false);
        assert!(matches!(cfg.validate(), Err(ConfigError::NoDrivenWheels)));

        let mut cfg = VehicleConfig::arcade_coupe();
        cfg.wheels.clear();
        assert!(matches!(cfg.validate(), Err(ConfigError::NoWheels)));
    }

    #[test]
    fn toml_errors_surface_as_config_errors() {
        let err = VehicleConfig::from_toml_str("chassis = 3").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }
}
