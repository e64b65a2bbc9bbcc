// src/physics.rs

use std::collections::HashMap;

use rapier3d::prelude::*;
use rapier3d::prelude::{Group, InteractionGroups};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::arcade_car::{DriverInput, Pose};
use crate::config::VehicleConfig;
use crate::error::ConfigError;
use crate::events::SoundCue;
use crate::rapier_bridge::{RapierChassis, RapierGround};
use crate::vehicle::{StepReport, Vehicle};

const GROUP_GROUND: Group = Group::from_bits_truncate(0b0001);
const GROUP_CHASSIS: Group = Group::from_bits_truncate(0b0010);

/// Bodies further than this from the origin (or non-finite) are reset.
pub const WORLD_LIMIT: Real = 1_000.0;

/// A vehicle core bound to its rapier chassis body.
pub struct VehicleEntity {
    pub body: RigidBodyHandle,
    pub vehicle: Vehicle,
    pub input: DriverInput,
    pub spawn: Isometry<Real>,
    pub last_report: StepReport,
    sound_cues: UnboundedReceiver<SoundCue>,
}

impl VehicleEntity {
    /// Sound requests raised since the last call.
    pub fn drain_sound_cues(&mut self) -> Vec<SoundCue> {
        let mut cues = Vec::new();
        while let Ok(cue) = self.sound_cues.try_recv() {
            cues.push(cue);
        }
        cues
    }
}

pub struct PhysicsWorld {
    pub gravity: Vector<Real>,
    pub integration_parameters: IntegrationParameters,
    pub pipeline: PhysicsPipeline,
    pub island_manager: IslandManager,
    pub broad_phase: DefaultBroadPhase,
    pub narrow_phase: NarrowPhase,
    pub bodies: RigidBodySet,
    pub colliders: ColliderSet,
    pub joints: ImpulseJointSet,
    pub multibody_joints: MultibodyJointSet,
    pub ccd: CCDSolver,
    pub query_pipeline: QueryPipeline,      // ground probes
    pub vehicles: HashMap<Uuid, VehicleEntity>,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsWorld {
    pub fn new() -> Self {
        let gravity = vector![0.0, -9.81, 0.0];

        let mut bodies = RigidBodySet::new();
        let mut colliders = ColliderSet::new();

        // Static ground plane at y = 0. A halfspace keeps ray and sphere probes
        // exact; against a box the sphere cast iterates and jitters.
        let ground_rb = RigidBodyBuilder::fixed().build();
        let ground_handle = bodies.insert(ground_rb);

        let ground_collider = ColliderBuilder::halfspace(Vector::y_axis())
            .collision_groups(InteractionGroups::new(GROUP_GROUND, GROUP_CHASSIS))
            .friction(1.2)
            .restitution(0.0)
            .build();
        colliders.insert_with_parent(ground_collider, ground_handle, &mut bodies);

        info!(bodies = bodies.len(), colliders = colliders.len(), "ground inserted");

        Self {
            gravity,
            integration_parameters: IntegrationParameters::default(),
            pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies,
            colliders,
            joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            vehicles: HashMap::new(),
        }
    }

    /// Build the vehicle core and its chassis body; the car drops from `position`.
    pub fn spawn_vehicle(
        &mut self,
        id: Uuid,
        position: [f32; 3],
        config: VehicleConfig,
    ) -> Result<RigidBodyHandle, ConfigError> {
        let mut vehicle = Vehicle::new(config)?;

        let chassis = &vehicle.config().chassis;
        let [hx, hy, hz] = chassis.half_extents;
        let [cx, cy, cz] = chassis.com_offset;
        let m = chassis.mass;

        // solid box inertia about the centre, mass placed at the COM offset
        let inertia = vector![
            m / 3.0 * (hy * hy + hz * hz),
            m / 3.0 * (hx * hx + hz * hz),
            m / 3.0 * (hx * hx + hy * hy)
        ];

        let spawn = Isometry::translation(position[0], position[1], position[2]);

        let rb = RigidBodyBuilder::dynamic()
            .position(spawn)
            .linear_damping(chassis.linear_damping)
            .angular_damping(chassis.angular_damping)
            .additional_mass_properties(MassProperties::new(point![cx, cy, cz], m, inertia))
            .can_sleep(false)
            .ccd_enabled(true)
            .build();

        // Massless box: mass comes from the properties above. Zero friction so
        // only the wheels grip.
        let collider = ColliderBuilder::cuboid(hx, hy, hz)
            .collision_groups(InteractionGroups::new(GROUP_CHASSIS, GROUP_GROUND | GROUP_CHASSIS))
            .density(0.0)
            .friction(0.0)
            .restitution(0.0)
            .build();

        let handle = self.bodies.insert(rb);
        self.colliders.insert_with_parent(collider, handle, &mut self.bodies);

        let (tx, sound_cues) = mpsc::unbounded_channel();
        vehicle.signals.forward_sound_cues(tx);
        vehicle.start();

        info!(%id, vehicle = %vehicle.config().name, ?position, ?handle, "spawned vehicle");

        if let Some(old) = self.vehicles.insert(
            id,
            VehicleEntity {
                body: handle,
                vehicle,
                input: DriverInput::default(),
                spawn,
                last_report: StepReport::default(),
                sound_cues,
            },
        ) {
            warn!(%id, "replaced existing vehicle");
            self.remove_body(old.body);
        }

        Ok(handle)
    }

    pub fn remove_vehicle(&mut self, id: &Uuid) -> bool {
        match self.vehicles.remove(id) {
            Some(entity) => {
                self.remove_body(entity.body);
                debug!(%id, "removed vehicle");
                true
            }
            None => false,
        }
    }

    fn remove_body(&mut self, handle: RigidBodyHandle) {
        self.bodies.remove(
            handle,
            &mut self.island_manager,
            &mut self.colliders,
            &mut self.joints,
            &mut self.multibody_joints,
            true,
        );
    }

    /// Store the input used by the next step. False for unknown ids.
    pub fn set_input(&mut self, id: &Uuid, input: DriverInput) -> bool {
        match self.vehicles.get_mut(id) {
            Some(entity) => {
                entity.input = input.clamped();
                true
            }
            None => false,
        }
    }

    pub fn vehicle(&self, id: &Uuid) -> Option<&VehicleEntity> {
        self.vehicles.get(id)
    }

    pub fn vehicle_mut(&mut self, id: &Uuid) -> Option<&mut VehicleEntity> {
        self.vehicles.get_mut(id)
    }

    pub fn chassis_pose(&self, id: &Uuid) -> Option<Pose> {
        let entity = self.vehicles.get(id)?;
        self.bodies.get(entity.body).map(|b| *b.position())
    }

    pub fn chassis_linvel(&self, id: &Uuid) -> Option<Vector<Real>> {
        let entity = self.vehicles.get(id)?;
        self.bodies.get(entity.body).map(|b| *b.linvel())
    }

    pub fn step(&mut self, dt: Real) {
        // 1) Vehicle cores against the current scene; forces are buffered.
        self.query_pipeline.update(&self.colliders);

        let mut chassis_forces = Vec::with_capacity(self.vehicles.len());

        for entity in self.vehicles.values_mut() {
            let Some(mut chassis) = RapierChassis::capture(&self.bodies, entity.body) else {
                continue;
            };
            let ground = RapierGround::new(
                &self.query_pipeline,
                &self.bodies,
                &self.colliders,
                entity.body,
            );

            entity.last_report = entity.vehicle.step(&mut chassis, &ground, entity.input, dt);
            chassis_forces.push(chassis);
        }

        // 2) Hand the forces to rapier.
        for chassis in chassis_forces {
            chassis.flush(&mut self.bodies);
        }

        // 3) Step physics.
        self.integration_parameters.dt = dt;
        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.joints,
            &mut self.multibody_joints,
            &mut self.ccd,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );

        // 4) Safety: put exploded or escaped cars back on their spawn.
        self.reset_out_of_bounds();
    }

    fn reset_out_of_bounds(&mut self) {
        for (id, entity) in &self.vehicles {
            let Some(body) = self.bodies.get_mut(entity.body) else { continue };
            let pos = *body.translation();

            let bad = !pos.iter().all(|c| c.is_finite()) || pos.amax() > WORLD_LIMIT;
            if bad {
                body.set_position(entity.spawn, true);
                body.set_linvel(Vector::zeros(), true);
                body.set_angvel(Vector::zeros(), true);
                body.reset_forces(true);
                body.reset_torques(true);
                warn!(%id, ?pos, "reset vehicle to spawn");
            }
        }
    }
}
