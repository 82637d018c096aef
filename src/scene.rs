//! Scene-node capability interface.
//!
//! The simulation controller and the instance renderer are composed into a
//! host scene as small "update me once per frame" nodes rather than through
//! an inheritance chain. A [`Scene`] holds them polymorphically; the host
//! builds one [`FrameContext`] per frame and updates nodes in insertion
//! order, so the controller must be added before the renderer (the renderer
//! must only ever see post-swap state).

use glam::Mat4;

/// Everything a node may need during one frame.
pub struct FrameContext<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
    pub encoder: &'a mut wgpu::CommandEncoder,
    /// Surface view the frame renders into.
    pub color_view: &'a wgpu::TextureView,
    pub depth_view: &'a wgpu::TextureView,
    /// View-projection matrix for this frame.
    pub view_proj: Mat4,
    /// Ping-pong slot holding the current agent state. Published by the
    /// simulation controller after its swap; consumed by the renderer.
    pub state_parity: usize,
}

/// A node the scene updates once per frame.
pub trait SceneNode {
    fn update(&mut self, ctx: &mut FrameContext<'_>);
}

/// Ordered container of boxed scene nodes.
#[derive(Default)]
pub struct Scene {
    nodes: Vec<Box<dyn SceneNode>>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, node: Box<dyn SceneNode>) {
        self.nodes.push(node);
    }

    /// Update every node in insertion order.
    pub fn update(&mut self, ctx: &mut FrameContext<'_>) {
        for node in &mut self.nodes {
            node.update(ctx);
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
