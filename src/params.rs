//! Tunable flocking parameters.
//!
//! [`SimulationParams`] is a plain record of named numeric fields so an
//! external control surface (sliders, config files) can bind to it without
//! this crate depending on any UI toolkit. Fields are read once per kernel
//! dispatch; mutating them between frames needs no synchronization.
//!
//! Bad values never fail a frame: [`SimulationParams::sanitize`] clamps
//! non-finite or negative values back into the valid domain and logs a
//! warning.

use bytemuck::{Pod, Zeroable};

/// Suggested control ranges for each parameter, as `(min, max)`.
///
/// These are hints for slider construction, not enforced invariants; only
/// finiteness and non-negativity are required.
pub mod ranges {
    pub const ALIGN_FACTOR: (f32, f32) = (0.0, 3.0);
    pub const COHESION_FACTOR: (f32, f32) = (0.0, 3.0);
    pub const SEPARATION_FACTOR: (f32, f32) = (1.0, 10.0);
    pub const CENTER_FACTOR: (f32, f32) = (0.0, 10.0);
    pub const MAX_SPEED: (f32, f32) = (0.0, 400.0);
    pub const MAX_FORCE: (f32, f32) = (0.0, 40.0);
    pub const RANGE: (f32, f32) = (0.0, 20.0);
}

/// Runtime-tunable parameters of the flocking model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationParams {
    /// Weight of steering toward the average neighbor heading.
    pub align_factor: f32,
    /// Weight of steering toward the neighbor centroid.
    pub cohesion_factor: f32,
    /// Weight of inverse-distance repulsion from neighbors.
    pub separation_factor: f32,
    /// Weight of the pull toward the world origin; bounds the flock.
    pub center_factor: f32,
    /// Upper bound on agent speed, world units per second.
    pub max_speed: f32,
    /// Upper bound on the combined steering force.
    pub max_force: f32,
    /// Neighbor radius. Agents beyond this distance exert no influence.
    pub range: f32,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            align_factor: 1.0,
            cohesion_factor: 0.95,
            separation_factor: 3.0,
            center_factor: 0.25,
            max_speed: 120.0,
            max_force: 8.0,
            range: 10.0,
        }
    }
}

impl SimulationParams {
    /// Clamp every field to the valid domain (finite, non-negative).
    ///
    /// Called once per kernel dispatch, before the values are uploaded.
    /// Returns `true` if anything had to be corrected. A live-tunable system
    /// must never crash from a bad slider value, so the policy is clamp and
    /// warn rather than fail.
    pub fn sanitize(&mut self) -> bool {
        let defaults = Self::default();
        let mut changed = false;
        changed |= sanitize_field(&mut self.align_factor, "align_factor", defaults.align_factor);
        changed |= sanitize_field(
            &mut self.cohesion_factor,
            "cohesion_factor",
            defaults.cohesion_factor,
        );
        changed |= sanitize_field(
            &mut self.separation_factor,
            "separation_factor",
            defaults.separation_factor,
        );
        changed |= sanitize_field(&mut self.center_factor, "center_factor", defaults.center_factor);
        changed |= sanitize_field(&mut self.max_speed, "max_speed", defaults.max_speed);
        changed |= sanitize_field(&mut self.max_force, "max_force", defaults.max_force);
        changed |= sanitize_field(&mut self.range, "range", defaults.range);
        changed
    }
}

fn sanitize_field(value: &mut f32, name: &str, default: f32) -> bool {
    if !value.is_finite() {
        log::warn!("parameter {} was {}, resetting to {}", name, value, default);
        *value = default;
        true
    } else if *value < 0.0 {
        log::warn!("parameter {} was negative ({}), clamping to 0", name, value);
        *value = 0.0;
        true
    } else {
        false
    }
}

/// GPU mirror of [`SimulationParams`] plus per-dispatch values.
///
/// Layout matches the `SimParams` struct in the WGSL kernel.
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub(crate) struct ParamsUniform {
    align_factor: f32,
    cohesion_factor: f32,
    separation_factor: f32,
    center_factor: f32,
    max_speed: f32,
    max_force: f32,
    range: f32,
    delta_time: f32,
    agent_count: u32,
    _padding: [u32; 3],
}

impl ParamsUniform {
    pub(crate) fn new(params: &SimulationParams, delta_time: f32, agent_count: u32) -> Self {
        Self {
            align_factor: params.align_factor,
            cohesion_factor: params.cohesion_factor,
            separation_factor: params.separation_factor,
            center_factor: params.center_factor,
            max_speed: params.max_speed,
            max_force: params.max_force,
            range: params.range,
            delta_time,
            agent_count,
            _padding: [0; 3],
        }
    }
}
