// ==============================================================================
// vehicle.rs - ONE ARCADE CAR: WHEELS + DRIVETRAIN + DRIFT + SIGNALS
// ------------------------------------------------------------------------------
// Engine-agnostic. The host supplies the chassis body and the ground query
// each tick; Vehicle::step() runs, in order:
//
//   0) steer angles from input
//   1) ground check on every wheel
//   2) drivetrain rpm/torque from the speed-source wheel
//   3) per wheel: compression -> suspension -> drive/brake + friction -> spin
//   4) drift policy over the fresh sideways velocities
//   5) signals (engine pitch every tick, drift sound on transitions)
// ==============================================================================

use serde::Serialize;
use tracing::{debug, trace};

use crate::arcade_car::units::MPS_TO_KPH;
use crate::arcade_car::{
    p3, solve_steering, ChassisBody, DriftEvent, DriftPolicy, DriverInput, Drivetrain,
    DrivetrainInput, DrivetrainOutput, GroundQuery, SlipSample, Wheel, WheelForces, WheelId,
};
use crate::config::VehicleConfig;
use crate::error::ConfigError;
use crate::events::{LoopingSound, VehicleSignals};

/// What one tick produced.
#[derive(Debug, Clone, Default)]
pub struct StepReport {
    /// false when the tick was skipped (dt <= 0)
    pub stepped: bool,
    pub drivetrain: DrivetrainOutput,
    pub drift_event: Option<DriftEvent>,
    pub wheel_forces: Vec<WheelForces>,
}

pub struct Vehicle {
    config: VehicleConfig,
    wheels: Vec<Wheel>,
    drivetrain: Drivetrain,
    drift: DriftPolicy,
    input: DriverInput,
    pub signals: VehicleSignals,
}

impl std::fmt::Debug for Vehicle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vehicle")
            .field("name", &self.config.name)
            .field("wheels", &self.wheels.len())
            .field("motor_rpm", &self.drivetrain.motor_rpm())
            .field("drifting", &self.drift.is_drifting())
            .finish()
    }
}

impl Vehicle {
    pub fn new(config: VehicleConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let radius = config.driven_wheel_radius().ok_or(ConfigError::NoDrivenWheels)?;
        let drivetrain = Drivetrain::new(config.drivetrain, radius)?;
        let drift = DriftPolicy::new(config.drift.threshold, config.drift.tracked_wheels.len());
        let wheels = config.wheels.iter().cloned().map(Wheel::new).collect();

        Ok(Self {
            config,
            wheels,
            drivetrain,
            drift,
            input: DriverInput::default(),
            signals: VehicleSignals::default(),
        })
    }

    /// Announce the engine (raises the CarEngine looping sound).
    pub fn start(&mut self) {
        self.signals.start_looping_sound.raise(&LoopingSound::CarEngine);
    }

    // --------------------------------------------------------------
    // accessors
    // --------------------------------------------------------------

    pub fn config(&self) -> &VehicleConfig { &self.config }
    pub fn wheels(&self) -> &[Wheel] { &self.wheels }
    pub fn drivetrain(&self) -> &Drivetrain { &self.drivetrain }
    pub fn drift(&self) -> &DriftPolicy { &self.drift }
    pub fn is_drifting(&self) -> bool { self.drift.is_drifting() }
    pub fn last_input(&self) -> DriverInput { self.input }

    pub fn wheel(&self, id: WheelId) -> Option<&Wheel> {
        self.wheels.iter().find(|w| w.id() == id)
    }

    /// Signed road speed of the speed-source wheel.
    pub fn speed_kph(&self) -> f32 {
        self.wheels[self.config.speed_source_wheel].forward_speed() * MPS_TO_KPH
    }

    /// Any driven wheel touching the ground.
    pub fn grounded(&self) -> bool {
        self.wheels.iter().any(|w| w.is_driven() && w.grounded())
    }

    pub fn driven_wheel_count(&self) -> usize {
        self.wheels.iter().filter(|w| w.is_driven()).count()
    }

    // --------------------------------------------------------------
    // tick
    // --------------------------------------------------------------

    pub fn step(
        &mut self,
        chassis: &mut dyn ChassisBody,
        ground: &dyn GroundQuery,
        input: DriverInput,
        dt: f32,
    ) -> StepReport {
        if !(dt > 0.0) {
            trace!(dt, vehicle = %self.config.name, "skipping vehicle step");
            return StepReport::default();
        }

        let input = input.clamped();
        self.input = input;

        // 0) steering
        let (steer_l, steer_r) = solve_steering(&self.config.steering, input.steer);
        for wheel in self.wheels.iter_mut().filter(|w| w.is_steered()) {
            let angle = if wheel.id().is_left() { steer_l } else { steer_r };
            wheel.set_steer_angle(angle);
        }

        // 1) ground checks
        for wheel in &mut self.wheels {
            wheel.detect_ground(chassis, ground);
        }

        // 2) drivetrain
        let output = self.drivetrain.update(
            &DrivetrainInput {
                throttle: input.throttle,
                brake: input.brake,
                reverse: input.reverse,
                grounded: self.grounded(),
                speed_kph: self.speed_kph(),
                wheel_count: self.wheels.len(),
            },
            dt,
        );

        // 3) wheel forces
        let driven = self.driven_wheel_count().max(1) as f32;
        let service_brake = self.drivetrain.config().max_brake_torque * input.brake;

        let wheel_forces: Vec<WheelForces> = self
            .wheels
            .iter_mut()
            .map(|wheel| {
                let (drive, brake) = if wheel.is_driven() {
                    (
                        output.drive_torque / driven,
                        service_brake + output.friction_torque / driven,
                    )
                } else {
                    (0.0, service_brake)
                };
                wheel.apply_forces(&mut *chassis, drive, brake, input.handbrake, dt)
            })
            .collect();

        // 4) drift
        let samples: Vec<SlipSample> = self
            .config
            .drift
            .tracked_wheels
            .iter()
            .map(|&i| SlipSample {
                grounded: self.wheels[i].grounded(),
                sideways_velocity: self.wheels[i].sideways_velocity(),
            })
            .collect();
        let drift_event = self.drift.evaluate(&samples);

        // 5) signals
        self.signals
            .engine_pitch
            .raise(&self.drivetrain.motor_revolution_rate());

        match drift_event {
            Some(DriftEvent::Started) => {
                debug!(vehicle = %self.config.name, speed_kph = self.speed_kph(), "drift started");
                self.signals.start_looping_sound.raise(&LoopingSound::CarDrift);
            }
            Some(DriftEvent::Stopped) => {
                debug!(vehicle = %self.config.name, "drift stopped");
                self.signals.stop_looping_sound.raise(&LoopingSound::CarDrift);
            }
            None => {}
        }

        StepReport {
            stepped: true,
            drivetrain: output,
            drift_event,
            wheel_forces,
        }
    }

    // --------------------------------------------------------------
    // telemetry
    // --------------------------------------------------------------

    pub fn telemetry(&self) -> VehicleTelemetry {
        let tracked = &self.config.drift.tracked_wheels;

        let wheels = self
            .wheels
            .iter()
            .enumerate()
            .map(|(i, w)| {
                let slipping = tracked
                    .iter()
                    .position(|&t| t == i)
                    .and_then(|slot| self.drift.slipping().get(slot).copied())
                    .unwrap_or(false);

                WheelTelemetry {
                    id: w.id(),
                    grounded: w.grounded(),
                    compression: w.compression(),
                    center: p3(w.center()),
                    contact: w.hit().map(|h| p3(h.point)),
                    steer_angle: w.steer_angle(),
                    spin_angle: w.spin_angle(),
                    camber: w.fixed_camber_angle(),
                    sideways_velocity: w.sideways_velocity(),
                    suspension_force: w.last_forces().suspension,
                    slipping,
                }
            })
            .collect();

        VehicleTelemetry {
            speed_kph: self.speed_kph(),
            motor_rpm: self.drivetrain.motor_rpm(),
            motor_revolution_rate: self.drivetrain.motor_revolution_rate(),
            reverse: self.drivetrain.reverse(),
            grounded: self.grounded(),
            drifting: self.drift.is_drifting(),
            wheels,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WheelTelemetry {
    pub id: WheelId,
    pub grounded: bool,
    pub compression: f32,
    pub center: [f32; 3],
    pub contact: Option<[f32; 3]>,
    pub steer_angle: f32,
    pub spin_angle: f32,
    pub camber: f32,
    pub sideways_velocity: f32,
    pub suspension_force: f32,
    pub slipping: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct VehicleTelemetry {
    pub speed_kph: f32,
    pub motor_rpm: f32,
    pub motor_revolution_rate: f32,
    pub reverse: bool,
    pub grounded: bool,
    pub drifting: bool,
    pub wheels: Vec<WheelTelemetry>,
}
