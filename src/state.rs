//! Double-buffered agent state.
//!
//! All agent positions and velocities live in two ping-ponged buffer pairs:
//! the "current" half is readable (by the next force dispatch and by the
//! renderer) while the "scratch" half is being written, and both channels
//! swap together in one atomic step. This is the only mechanism protecting
//! in-flight writes from being read mid-update, so no partial-frame state is
//! ever observable.
//!
//! The store is generic over its backing type: `wgpu::Buffer` in production,
//! plain `Vec<Vec3>` when the CPU kernel drives it in tests.

use glam::Vec3;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Radius of the sphere agents spawn in, world units.
pub const SPAWN_RADIUS: f32 = 200.0;
/// Upper bound on the magnitude of spawned velocities.
pub const SPAWN_SPEED: f32 = 20.0;

/// The two state channels held per agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Position,
    Velocity,
}

/// A pair of ping-ponged buffer pairs indexed by agent.
///
/// Exactly one slot per channel is current at any time; [`StateStore::swap`]
/// exchanges current and scratch for both channels at once.
pub struct StateStore<B> {
    position: [B; 2],
    velocity: [B; 2],
    current: usize,
    len: u32,
}

impl<B> StateStore<B> {
    pub fn new(position: [B; 2], velocity: [B; 2], len: u32) -> Self {
        Self {
            position,
            velocity,
            current: 0,
            len,
        }
    }

    /// The current (readable) buffer for a channel.
    pub fn read(&self, channel: Channel) -> &B {
        self.slot(channel, self.current)
    }

    /// The scratch (being-written) buffer for a channel.
    pub fn write(&self, channel: Channel) -> &B {
        self.slot(channel, self.current ^ 1)
    }

    /// Mutable access to both scratch buffers at once. Only CPU-backed
    /// stores need this; GPU writes go through bind groups.
    pub fn scratch_mut(&mut self) -> (&mut B, &mut B) {
        let scratch = self.current ^ 1;
        (&mut self.position[scratch], &mut self.velocity[scratch])
    }

    /// Access a buffer by explicit slot index (0 or 1), regardless of which
    /// is current. Used to build one GPU bind group per parity up front.
    pub fn slot(&self, channel: Channel, index: usize) -> &B {
        match channel {
            Channel::Position => &self.position[index],
            Channel::Velocity => &self.velocity[index],
        }
    }

    /// Exchange current and scratch for both channels atomically.
    ///
    /// Called once per simulation step, after the write pass for that step
    /// has been issued and before the next read.
    pub fn swap(&mut self) {
        self.current ^= 1;
    }

    /// Index of the current slot. Selects the matching pre-built bind group.
    pub fn parity(&self) -> usize {
        self.current
    }

    /// Number of agents held per buffer.
    pub fn len(&self) -> u32 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Side length of the square texel grid that holds `agent_count` agents.
pub fn store_side(agent_count: u32) -> u32 {
    (agent_count as f64).sqrt().ceil() as u32
}

/// Flatten an agent index into a 2D texel coordinate on a grid of the given
/// side length.
pub fn texel_coord(index: u32, side: u32) -> (u32, u32) {
    (index % side, index / side)
}

/// Seed-reproducible spawn state for a flock.
pub struct InitialState {
    pub positions: Vec<Vec3>,
    pub velocities: Vec<Vec3>,
}

impl InitialState {
    /// Pack both channels as `vec4<f32>` texels for GPU upload. The fourth
    /// component is reserved and written as zero.
    pub fn packed(&self) -> (Vec<[f32; 4]>, Vec<[f32; 4]>) {
        let pack = |v: &[Vec3]| v.iter().map(|p| [p.x, p.y, p.z, 0.0]).collect();
        (pack(&self.positions), pack(&self.velocities))
    }
}

/// Randomize agent state: positions uniform in a sphere of [`SPAWN_RADIUS`],
/// velocities uniform in a sphere of [`SPAWN_SPEED`].
///
/// The same seed always produces the same state, so trajectories are
/// reproducible given the same parameters and timestep sequence.
pub fn initial_state(agent_count: u32, seed: u64) -> InitialState {
    let mut rng = SmallRng::seed_from_u64(seed);
    let positions = (0..agent_count)
        .map(|_| random_in_sphere(&mut rng) * SPAWN_RADIUS)
        .collect();
    let velocities = (0..agent_count)
        .map(|_| random_in_sphere(&mut rng) * SPAWN_SPEED)
        .collect();
    InitialState {
        positions,
        velocities,
    }
}

/// Uniform sample inside the unit sphere, by rejection from the unit cube.
fn random_in_sphere(rng: &mut SmallRng) -> Vec3 {
    loop {
        let v = Vec3::new(
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
        );
        if v.length_squared() <= 1.0 {
            return v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cpu_store() -> StateStore<Vec<Vec3>> {
        StateStore::new(
            [vec![Vec3::X], vec![Vec3::Y]],
            [vec![Vec3::Z], vec![Vec3::ONE]],
            1,
        )
    }

    #[test]
    fn test_read_and_write_are_distinct() {
        let store = cpu_store();
        assert_eq!(store.read(Channel::Position)[0], Vec3::X);
        assert_eq!(store.write(Channel::Position)[0], Vec3::Y);
        assert_eq!(store.read(Channel::Velocity)[0], Vec3::Z);
        assert_eq!(store.write(Channel::Velocity)[0], Vec3::ONE);
    }

    #[test]
    fn test_swap_exchanges_both_channels() {
        let mut store = cpu_store();
        store.swap();

        // The old scratch is now current for both channels at once.
        assert_eq!(store.read(Channel::Position)[0], Vec3::Y);
        assert_eq!(store.read(Channel::Velocity)[0], Vec3::ONE);
        assert_eq!(store.write(Channel::Position)[0], Vec3::X);
        assert_eq!(store.parity(), 1);

        store.swap();
        assert_eq!(store.read(Channel::Position)[0], Vec3::X);
        assert_eq!(store.parity(), 0);
    }

    #[test]
    fn test_store_side_covers_agent_count() {
        assert_eq!(store_side(1), 1);
        assert_eq!(store_side(4), 2);
        assert_eq!(store_side(5), 3);
        assert_eq!(store_side(8192), 91);

        for n in [1u32, 4, 5, 100, 8192] {
            let side = store_side(n);
            assert!(side * side >= n);
        }
    }

    #[test]
    fn test_texel_coord_roundtrip() {
        let side = store_side(8192);
        for index in [0u32, 1, 90, 91, 8191] {
            let (x, y) = texel_coord(index, side);
            assert!(x < side);
            assert_eq!(y * side + x, index);
        }
    }

    #[test]
    fn test_initial_state_is_seed_reproducible() {
        let a = initial_state(128, 7);
        let b = initial_state(128, 7);
        let c = initial_state(128, 8);

        assert_eq!(a.positions, b.positions);
        assert_eq!(a.velocities, b.velocities);
        assert_ne!(a.positions, c.positions);
    }

    #[test]
    fn test_initial_state_respects_spawn_bounds() {
        let state = initial_state(256, 42);
        assert_eq!(state.positions.len(), 256);
        for p in &state.positions {
            assert!(p.length() <= SPAWN_RADIUS + 1e-3);
        }
        for v in &state.velocities {
            assert!(v.length() <= SPAWN_SPEED + 1e-3);
        }
    }

    #[test]
    fn test_packed_reserves_fourth_component() {
        let state = initial_state(16, 1);
        let (positions, velocities) = state.packed();
        assert_eq!(positions.len(), 16);
        assert!(positions.iter().chain(&velocities).all(|t| t[3] == 0.0));
        assert_eq!(positions[3][0], state.positions[3].x);
    }
}
