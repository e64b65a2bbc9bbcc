// ==============================================================================
// suspension.rs - RAYCAST SUSPENSION (COMPRESSION + SPRING/DAMPER FORCE)
// ------------------------------------------------------------------------------
// Pure numeric helpers used by wheel.rs:
// - cast_length(): how far below the mount the ground probe reaches
// - effective_radius(): wheel radius as seen by the probe (camber for rays)
// - compression_from_hit(): stroke minus the measured suspension length
// - compute_suspension_force(): F = k*x + c*(x - x_prev)/dt, never negative
//
// Compression is a distance in [0, stroke]. 0 = fully extended, stroke = bump
// stop. The damper works on the compression delta, so holding a compression
// for two ticks yields a pure spring force.
// ==============================================================================

use crate::arcade_car::types::DetectionMode;

/// Radius the probe "sees". Ray mode projects the cambered wheel onto the
/// cast axis; a sphere is the same radius from every direction.
#[inline]
pub fn effective_radius(mode: DetectionMode, radius: f32, camber: f32) -> f32 {
    match mode {
        DetectionMode::Ray => radius * camber.cos(),
        DetectionMode::Sphere => radius,
    }
}

/// Max probe distance below the cast origin.
#[inline]
pub fn cast_length(mode: DetectionMode, stroke: f32, radius: f32, camber: f32) -> f32 {
    stroke + effective_radius(mode, radius, camber)
}

/// Compression for a grounded wheel, clamped into `[0, stroke]`.
#[inline]
pub fn compression_from_hit(stroke: f32, hit_distance: f32, ground_offset: f32, effective_radius: f32) -> f32 {
    let raw = stroke - (hit_distance + ground_offset - effective_radius);
    raw.clamp(0.0, stroke)
}

/// Spring + damper force along the chassis up axis.
///
/// The suspension can only push: a net pull (fast rebound) is clamped to 0.
/// A non-positive `dt` drops the damper term instead of dividing by it.
pub fn compute_suspension_force(
    spring: f32,
    damper: f32,
    compression: f32,
    prev_compression: f32,
    dt: f32,
) -> f32 {
    let spring_force = spring * compression;                    // F_s = k * x

    let suspension_vel = if dt > 0.0 {
        (compression - prev_compression) / dt                   // dx/dt
    } else {
        0.0
    };
    let damper_force = damper * suspension_vel;                 // F_d = c * dx/dt

    (spring_force + damper_force).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    #[test]
    fn spring_and_damper_scenario() {
        let f = compute_suspension_force(20_000.0, 2_000.0, 0.05, 0.03, 0.02);
        assert!((f - 3_000.0).abs() < 1e-2, "force = {f}");
    }

    #[test]
    fn constant_compression_has_no_damper_term() {
        let spring = 18_000.0;
        let x = 0.042;
        let f = compute_suspension_force(spring, 5_000.0, x, x, 1.0 / 60.0);
        assert!((f - spring * x).abs() < 1e-3);
    }

    #[test]
    fn rebound_never_pulls() {
        // Wheel dropping fast: damper term is strongly negative.
        let f = compute_suspension_force(20_000.0, 4_000.0, 0.01, 0.09, 0.02);
        assert_eq!(f, 0.0);
    }

    #[test]
    fn force_is_never_negative() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..10_000 {
            let spring = rng.gen_range(0.0..100_000.0);
            let damper = rng.gen_range(0.0..20_000.0);
            let x = rng.gen_range(0.0..0.5);
            let x_prev = rng.gen_range(0.0..0.5);
            let dt = rng.gen_range(0.0..0.1);
            let f = compute_suspension_force(spring, damper, x, x_prev, dt);
            assert!(f >= 0.0, "k={spring} c={damper} x={x} x_prev={x_prev} dt={dt} -> {f}");
        }
    }

    #[test]
    fn zero_dt_drops_damper() {
        let f = compute_suspension_force(10_000.0, 1_000.0, 0.05, 0.0, 0.0);
        assert!((f - 500.0).abs() < 1e-3);
    }

    #[test]
    fn compression_is_clamped_to_stroke() {
        let stroke = 0.2;
        // Hit right at the mount: would be > stroke.
        assert_eq!(compression_from_hit(stroke, 0.0, 0.0, 0.35), stroke);
        // Hit at full cast length: fully extended.
        let c = compression_from_hit(stroke, stroke + 0.35, 0.0, 0.35);
        assert!(c.abs() < 1e-6);
        // Ground offset pushing the contact further away can't go negative.
        assert_eq!(compression_from_hit(stroke, stroke + 0.35, 0.1, 0.35), 0.0);
    }

    #[test]
    fn mid_stroke_compression() {
        // 0.3 m hit with 0.35 m wheel, 0.2 m stroke -> 0.2 - (0.3 - 0.35) = 0.25 -> clamped
        // 0.45 m hit -> 0.2 - 0.1 = 0.1
        let c = compression_from_hit(0.2, 0.45, 0.0, 0.35);
        assert!((c - 0.1).abs() < 1e-6);
    }

    #[test]
    fn camber_shortens_ray_but_not_sphere() {
        let camber = 30f32.to_radians();
        let ray = cast_length(DetectionMode::Ray, 0.1, 0.4, camber);
        let sphere = cast_length(DetectionMode::Sphere, 0.1, 0.4, camber);
        assert!((ray - (0.1 + 0.4 * camber.cos())).abs() < 1e-6);
        assert!((sphere - 0.5).abs() < 1e-6);
    }
}
