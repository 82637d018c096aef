//! # gpuflock
//!
//! A GPU-resident boid flocking simulation rendered as instanced meshes.
//!
//! Thousands of agents live entirely in double-buffered GPU storage buffers.
//! Each frame a compute kernel evaluates four weighted steering forces per
//! agent (alignment, cohesion, separation, and a pull toward the origin),
//! integrates the state, and ping-pongs the buffers; the renderer then draws
//! one template mesh per agent in a single instanced draw call, deriving
//! each instance's transform from its position and velocity in the vertex
//! stage. No agent data ever round-trips through the CPU.
//!
//! ## Quick start
//!
//! ```ignore
//! use gpuflock::prelude::*;
//!
//! let mut simulation = FlockSimulation::new(&device, 8192, Time::new(), 42)?;
//! let mut renderer = FlockRenderer::new(&device, &simulation, surface_format);
//! renderer.set_geometry(&device, &TemplateMesh::dart());
//!
//! // Per frame, in order:
//! simulation.update(&mut ctx); // dispatch forces, swap state
//! renderer.update(&mut ctx);   // instanced draw of the current state
//! ```
//!
//! ## Core concepts
//!
//! - **State store** ([`state::StateStore`]): two ping-ponged buffer pairs
//!   (position, velocity). The previous step's state is always readable
//!   while the next is written; a single atomic swap per step is the only
//!   synchronization the design needs.
//! - **Force kernel** ([`kernel`], [`shaders`]): one invocation per agent
//!   scans the flock for neighbors within `range` and combines the weighted
//!   forces, clamped to `max_force`/`max_speed`. A CPU twin of the WGSL
//!   kernel backs the test suite.
//! - **Parameters** ([`params::SimulationParams`]): plain named fields an
//!   external control surface can bind to; bad values are clamped with a
//!   warning, never a crash.
//! - **Scene nodes** ([`scene::SceneNode`]): the controller and renderer
//!   compose into any host loop that updates them in order.

pub mod camera;
pub mod error;
pub mod kernel;
pub mod params;
pub mod renderer;
pub mod scene;
pub mod shaders;
pub mod simulation;
pub mod state;
pub mod time;

pub use camera::OrbitCamera;
pub use error::FlockError;
pub use glam::{Mat4, Vec3};
pub use params::SimulationParams;
pub use renderer::{FlockRenderer, TemplateMesh};
pub use scene::{FrameContext, Scene, SceneNode};
pub use simulation::FlockSimulation;
pub use state::{Channel, StateStore};
pub use time::Time;

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::camera::OrbitCamera;
    pub use crate::error::FlockError;
    pub use crate::params::SimulationParams;
    pub use crate::renderer::{FlockRenderer, TemplateMesh};
    pub use crate::scene::{FrameContext, Scene, SceneNode};
    pub use crate::simulation::FlockSimulation;
    pub use crate::state::{Channel, StateStore};
    pub use crate::time::Time;
    pub use crate::{Mat4, Vec3};
}
