// ==============================================================================
// interfaces.rs - COLLABORATOR SEAMS (CHASSIS BODY + GROUND QUERY)
// ------------------------------------------------------------------------------
// The wheel/drivetrain core never talks to a physics engine directly. It reads
// the chassis through ChassisBody and probes the world through GroundQuery.
//
// - rapier_bridge.rs implements both on top of rapier3d
// - tests implement both with flat planes and recording bodies
//
// Forces handed to apply_force_at_point() are world-space Newtons. The
// implementor decides when they reach the solver (rapier_bridge buffers them).
// ==============================================================================

use crate::arcade_car::types::{GroundCast, GroundHit, Pos3, Pose, Vec3};

/// The rigid body a set of wheels is mounted on.
pub trait ChassisBody {
    /// World pose of the body frame (wheel mounts are expressed in it).
    fn pose(&self) -> Pose;

    /// World-space velocity of a point rigidly attached to the body.
    fn velocity_at_point(&self, point: &Pos3) -> Vec3;

    fn apply_force_at_point(&mut self, force: Vec3, point: Pos3);
}

/// Ground probing used by each wheel once per tick.
pub trait GroundQuery {
    fn cast(&self, cast: &GroundCast) -> Option<GroundHit>;
}
