//! CPU reference implementation of the force evaluator.
//!
//! The WGSL compute kernel in [`crate::shaders`] is the production path; the
//! functions here compute the same math on slices so the flocking behavior
//! can be unit-tested and benchmarked without a GPU. Keep the two in sync.
//!
//! Per agent, one pass over the whole flock accumulates the neighbor terms
//! (any other agent with `0 < |d| < range` counts as a neighbor), then four
//! weighted forces are combined:
//!
//! - alignment: normalized average neighbor velocity
//! - cohesion: direction toward the neighbor centroid
//! - separation: inverse-distance-weighted repulsion
//! - centering: pull toward the world origin, proportional to distance
//!
//! The sum is clamped to `max_force`, integrated into velocity (clamped to
//! `max_speed`), and the velocity integrated into position. Zero neighbors
//! and zero-length vectors are handled by `normalize_or_zero`, so the math
//! cannot divide by zero or emit NaN.

use glam::Vec3;

use crate::params::SimulationParams;

/// Combined steering acceleration for agent `index`, clamped to `max_force`.
pub fn evaluate_forces(
    index: usize,
    positions: &[Vec3],
    velocities: &[Vec3],
    params: &SimulationParams,
) -> Vec3 {
    let p = positions[index];

    let mut vel_sum = Vec3::ZERO;
    let mut pos_sum = Vec3::ZERO;
    let mut sep_sum = Vec3::ZERO;
    let mut count = 0u32;

    for j in 0..positions.len() {
        let d = positions[j] - p;
        let dist = d.length();
        if dist > 0.0 && dist < params.range {
            count += 1;
            vel_sum += velocities[j];
            pos_sum += positions[j];
            sep_sum -= d / (dist * dist);
        }
    }

    let mut force = -p * params.center_factor;
    if count > 0 {
        force += vel_sum.normalize_or_zero() * params.align_factor;
        let centroid = pos_sum / count as f32;
        force += (centroid - p).normalize_or_zero() * params.cohesion_factor;
        force += sep_sum * params.separation_factor;
    }

    force.clamp_length_max(params.max_force)
}

/// Integrate one agent: `v' = clamp(v + a*dt, max_speed)`, `p' = p + v'*dt`.
pub fn integrate(
    position: Vec3,
    velocity: Vec3,
    acceleration: Vec3,
    delta_time: f32,
    max_speed: f32,
) -> (Vec3, Vec3) {
    let velocity = (velocity + acceleration * delta_time).clamp_length_max(max_speed);
    let position = position + velocity * delta_time;
    (position, velocity)
}

/// Advance the whole flock by one step, reading the `*_in` slices and
/// writing the `*_out` slices. Inputs and outputs must not alias, mirroring
/// the current/scratch split of the GPU state store.
pub fn step(
    positions_in: &[Vec3],
    velocities_in: &[Vec3],
    positions_out: &mut [Vec3],
    velocities_out: &mut [Vec3],
    params: &SimulationParams,
    delta_time: f32,
) {
    debug_assert_eq!(positions_in.len(), velocities_in.len());
    debug_assert_eq!(positions_in.len(), positions_out.len());
    debug_assert_eq!(positions_in.len(), velocities_out.len());

    for i in 0..positions_in.len() {
        let acceleration = evaluate_forces(i, positions_in, velocities_in, params);
        let (p, v) = integrate(
            positions_in[i],
            velocities_in[i],
            acceleration,
            delta_time,
            params.max_speed,
        );
        positions_out[i] = p;
        velocities_out[i] = v;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::initial_state;

    fn zeroed_params() -> SimulationParams {
        SimulationParams {
            align_factor: 0.0,
            cohesion_factor: 0.0,
            separation_factor: 0.0,
            center_factor: 0.0,
            max_speed: 100.0,
            max_force: 100.0,
            range: 10.0,
        }
    }

    fn run_step(
        positions: &[Vec3],
        velocities: &[Vec3],
        params: &SimulationParams,
        dt: f32,
    ) -> (Vec<Vec3>, Vec<Vec3>) {
        let mut p_out = vec![Vec3::ZERO; positions.len()];
        let mut v_out = vec![Vec3::ZERO; velocities.len()];
        step(positions, velocities, &mut p_out, &mut v_out, params, dt);
        (p_out, v_out)
    }

    #[test]
    fn test_no_neighbors_no_centering_is_inert() {
        // range = 0 means nothing ever qualifies as a neighbor.
        let mut params = zeroed_params();
        params.range = 0.0;
        params.align_factor = 1.0;
        params.cohesion_factor = 1.0;
        params.separation_factor = 3.0;

        let positions = vec![Vec3::new(5.0, -2.0, 1.0), Vec3::new(-4.0, 0.0, 3.0)];
        let velocities = vec![Vec3::ZERO; 2];

        let (p_out, v_out) = run_step(&positions, &velocities, &params, 1.0);
        assert_eq!(p_out, positions);
        assert!(v_out.iter().all(|v| *v == Vec3::ZERO));
    }

    #[test]
    fn test_coincident_agents_produce_no_nan() {
        // All agents stacked at the origin: |d| = 0 for every pair, so none
        // are neighbors and no force term may divide by zero.
        let params = SimulationParams {
            align_factor: 1.0,
            cohesion_factor: 1.0,
            separation_factor: 3.0,
            ..zeroed_params()
        };
        let positions = vec![Vec3::ZERO; 4];
        let velocities = vec![Vec3::ZERO; 4];

        let (p_out, v_out) = run_step(&positions, &velocities, &params, 1.0);
        for (p, v) in p_out.iter().zip(&v_out) {
            assert!(p.is_finite() && v.is_finite());
            assert_eq!(*p, Vec3::ZERO);
            assert_eq!(*v, Vec3::ZERO);
        }
    }

    #[test]
    fn test_separation_pushes_agents_apart() {
        let params = SimulationParams {
            separation_factor: 1.0,
            max_force: 1000.0,
            ..zeroed_params()
        };
        let positions = vec![Vec3::new(-1.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0)];
        let velocities = vec![Vec3::ZERO; 2];

        let (_, v_out) = run_step(&positions, &velocities, &params, 1.0);
        assert!(v_out[0].x < 0.0, "left agent should move further left");
        assert!(v_out[1].x > 0.0, "right agent should move further right");
        assert_eq!(v_out[0].y, 0.0);
        assert_eq!(v_out[0].z, 0.0);
    }

    #[test]
    fn test_alignment_steers_toward_neighbor_heading() {
        let params = SimulationParams {
            align_factor: 1.0,
            ..zeroed_params()
        };
        let positions = vec![Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0)];
        let velocities = vec![Vec3::ZERO, Vec3::new(0.0, 3.0, 0.0)];

        let accel = evaluate_forces(0, &positions, &velocities, &params);
        assert!((accel - Vec3::Y).length() < 1e-6);
    }

    #[test]
    fn test_cohesion_steers_toward_centroid() {
        let params = SimulationParams {
            cohesion_factor: 2.0,
            ..zeroed_params()
        };
        let positions = vec![Vec3::ZERO, Vec3::new(0.0, 0.0, 4.0)];
        let velocities = vec![Vec3::ZERO; 2];

        let accel = evaluate_forces(0, &positions, &velocities, &params);
        assert!((accel - Vec3::new(0.0, 0.0, 2.0)).length() < 1e-6);
    }

    #[test]
    fn test_centering_scales_with_distance() {
        let params = SimulationParams {
            center_factor: 0.5,
            max_force: 1000.0,
            range: 0.0,
            ..zeroed_params()
        };
        let positions = vec![Vec3::new(10.0, 0.0, 0.0)];
        let velocities = vec![Vec3::ZERO];

        let accel = evaluate_forces(0, &positions, &velocities, &params);
        assert!((accel - Vec3::new(-5.0, 0.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_acceleration_clamped_to_max_force() {
        let params = SimulationParams {
            separation_factor: 10.0,
            center_factor: 10.0,
            max_force: 2.0,
            ..zeroed_params()
        };
        let state = initial_state(64, 3);

        for i in 0..64 {
            let accel = evaluate_forces(i, &state.positions, &state.velocities, &params);
            assert!(accel.length() <= params.max_force + 1e-4);
        }
    }

    #[test]
    fn test_velocity_clamped_to_max_speed_every_step() {
        let params = SimulationParams {
            align_factor: 3.0,
            cohesion_factor: 3.0,
            separation_factor: 10.0,
            center_factor: 5.0,
            max_speed: 40.0,
            max_force: 40.0,
            range: 20.0,
        };
        let state = initial_state(128, 11);
        let mut positions = state.positions;
        let mut velocities = state.velocities;

        for _ in 0..20 {
            let (p, v) = run_step(&positions, &velocities, &params, 0.5);
            positions = p;
            velocities = v;
            for v in &velocities {
                assert!(v.length() <= params.max_speed + 1e-3);
            }
        }
    }

    #[test]
    fn test_huge_delta_stays_finite() {
        let params = SimulationParams::default();
        let state = initial_state(32, 5);

        let (p_out, v_out) = run_step(&state.positions, &state.velocities, &params, 1000.0);
        for (p, v) in p_out.iter().zip(&v_out) {
            assert!(p.is_finite() && v.is_finite());
        }
    }

    #[test]
    fn test_fixed_input_is_deterministic() {
        let params = SimulationParams::default();
        let state = initial_state(96, 21);

        let run = || {
            let mut positions = state.positions.clone();
            let mut velocities = state.velocities.clone();
            for _ in 0..50 {
                let (p, v) = run_step(&positions, &velocities, &params, 1.0 / 60.0);
                positions = p;
                velocities = v;
            }
            (positions, velocities)
        };

        let (pa, va) = run();
        let (pb, vb) = run();
        assert_eq!(pa, pb);
        assert_eq!(va, vb);
    }
}
