// ==============================================================================
// rapier_bridge.rs - RAPIER3D BEHIND ChassisBody + GroundQuery
// ------------------------------------------------------------------------------
// RapierGround borrows the query pipeline and the body/collider sets read-only,
// so the chassis cannot be mutated while wheels probe the ground. RapierChassis
// therefore works on a snapshot of the body (pose, velocities, world COM) and
// collects forces; flush() writes them to the real body afterwards:
//
//   capture()  -> Vehicle::step(&mut chassis, &ground, ..)  -> flush()
//
// flush() resets the body's accumulated forces AND torques first. Rapier keeps
// both across steps, and add_force_at_point() feeds the torque accumulator too,
// so a force-only reset lets every off-COM force pile up tick after tick.
// ==============================================================================

use rapier3d::parry::query::ShapeCastOptions;
use rapier3d::prelude::*;

use crate::arcade_car::{ChassisBody, DetectionMode, GroundCast, GroundHit, GroundQuery, Pos3, Pose, Vec3};

pub struct RapierChassis {
    handle: RigidBodyHandle,
    pose: Pose,
    linvel: Vec3,
    angvel: Vec3,
    com: Pos3,                   // world space
    pending: Vec<(Vec3, Pos3)>,  // (force, world point)
}

impl RapierChassis {
    /// None if the handle no longer refers to a body.
    pub fn capture(bodies: &RigidBodySet, handle: RigidBodyHandle) -> Option<Self> {
        let body = bodies.get(handle)?;
        Some(Self {
            handle,
            pose: *body.position(),
            linvel: *body.linvel(),
            angvel: *body.angvel(),
            com: *body.center_of_mass(),
            pending: Vec::with_capacity(8),
        })
    }

    pub fn handle(&self) -> RigidBodyHandle { self.handle }
    pub fn pending(&self) -> &[(Vec3, Pos3)] { &self.pending }

    /// Replace the body's user forces with the buffered ones.
    /// Returns how many forces were applied.
    pub fn flush(self, bodies: &mut RigidBodySet) -> usize {
        let Some(body) = bodies.get_mut(self.handle) else { return 0 };

        body.reset_forces(true);
        body.reset_torques(true);
        for &(force, point) in &self.pending {
            body.add_force_at_point(force, point, true);
        }
        self.pending.len()
    }
}

impl ChassisBody for RapierChassis {
    fn pose(&self) -> Pose {
        self.pose
    }

    fn velocity_at_point(&self, point: &Pos3) -> Vec3 {
        self.linvel + self.angvel.cross(&(*point - self.com))
    }

    fn apply_force_at_point(&mut self, force: Vec3, point: Pos3) {
        if force.iter().all(|c| c.is_finite()) {
            self.pending.push((force, point));
        }
    }
}

pub struct RapierGround<'a> {
    query: &'a QueryPipeline,
    bodies: &'a RigidBodySet,
    colliders: &'a ColliderSet,
    filter: QueryFilter<'a>,
}

impl<'a> RapierGround<'a> {
    /// Ground view that ignores the chassis' own colliders.
    pub fn new(
        query: &'a QueryPipeline,
        bodies: &'a RigidBodySet,
        colliders: &'a ColliderSet,
        chassis: RigidBodyHandle,
    ) -> Self {
        Self {
            query,
            bodies,
            colliders,
            filter: QueryFilter::default().exclude_rigid_body(chassis),
        }
    }

    /// Velocity of the struck body at `point`, None for fixed/parentless colliders.
    fn surface_velocity(&self, collider: ColliderHandle, point: &Pos3) -> Option<Vec3> {
        let parent = self.colliders.get(collider)?.parent()?;
        let body = self.bodies.get(parent)?;
        (!body.is_fixed()).then(|| body.velocity_at_point(point))
    }
}

impl GroundQuery for RapierGround<'_> {
    fn cast(&self, cast: &GroundCast) -> Option<GroundHit> {
        let (collider, distance, point, normal) = match cast.mode {
            DetectionMode::Ray => {
                let ray = Ray::new(cast.origin, cast.direction);
                let (collider, hit) = self.query.cast_ray_and_get_normal(
                    self.bodies,
                    self.colliders,
                    &ray,
                    cast.max_distance,
                    true,
                    self.filter,
                )?;
                (collider, hit.time_of_impact, ray.point_at(hit.time_of_impact), hit.normal)
            }
            DetectionMode::Sphere => {
                let ball = Ball::new(cast.radius);
                let start = Isometry::translation(cast.origin.x, cast.origin.y, cast.origin.z);
                let (collider, hit) = self.query.cast_shape(
                    self.bodies,
                    self.colliders,
                    &start,
                    &cast.direction,
                    &ball,
                    ShapeCastOptions {
                        max_time_of_impact: cast.max_distance,
                        target_distance: 0.0,
                        stop_at_penetration: true,
                        compute_impact_geometry_on_penetration: true,
                    },
                    self.filter,
                )?;
                // contact sits one radius below the ball centre at impact
                let normal = hit.normal1.into_inner();
                let centre = cast.origin + cast.direction * hit.time_of_impact;
                (collider, hit.time_of_impact, centre - normal * cast.radius, normal)
            }
        };

        Some(GroundHit {
            distance,
            point,
            normal,
            surface_velocity: self.surface_velocity(collider, &point),
        })
    }
}
