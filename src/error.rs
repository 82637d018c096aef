//! Error types for gpuflock.
//!
//! Construction-time failures (GPU setup, buffer allocation) are surfaced to
//! the caller through [`FlockError`]; per-frame numerical issues never reach
//! this module, they are guarded away at the computation sites.

use std::fmt;

/// Errors that can occur while setting up or running the simulation.
#[derive(Debug)]
pub enum FlockError {
    /// The agent state buffers would exceed what the device can allocate or
    /// bind. Fatal: the simulation does not start.
    Allocation {
        /// Which resource failed (e.g. "agent state buffer").
        what: &'static str,
        /// Requested size in bytes.
        bytes: u64,
        /// The device limit that was exceeded.
        limit: u64,
    },
    /// Failed to create a surface for rendering.
    SurfaceCreation(wgpu::CreateSurfaceError),
    /// No compatible GPU adapter found.
    NoAdapter,
    /// Failed to create GPU device.
    DeviceCreation(wgpu::RequestDeviceError),
    /// Failed to create event loop.
    EventLoop(winit::error::EventLoopError),
    /// Failed to create window.
    Window(winit::error::OsError),
}

impl fmt::Display for FlockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlockError::Allocation { what, bytes, limit } => write!(
                f,
                "Cannot allocate {} ({} bytes, device limit {} bytes). Reduce the agent count.",
                what, bytes, limit
            ),
            FlockError::SurfaceCreation(e) => write!(f, "Failed to create GPU surface: {}", e),
            FlockError::NoAdapter => write!(
                f,
                "No compatible GPU adapter found. Ensure your system has a GPU with WebGPU/Vulkan/Metal/DX12 support."
            ),
            FlockError::DeviceCreation(e) => write!(f, "Failed to create GPU device: {}", e),
            FlockError::EventLoop(e) => write!(f, "Failed to create event loop: {}", e),
            FlockError::Window(e) => write!(f, "Failed to create window: {}", e),
        }
    }
}

impl std::error::Error for FlockError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FlockError::SurfaceCreation(e) => Some(e),
            FlockError::DeviceCreation(e) => Some(e),
            FlockError::EventLoop(e) => Some(e),
            FlockError::Window(e) => Some(e),
            _ => None,
        }
    }
}

impl From<wgpu::CreateSurfaceError> for FlockError {
    fn from(e: wgpu::CreateSurfaceError) -> Self {
        FlockError::SurfaceCreation(e)
    }
}

impl From<wgpu::RequestDeviceError> for FlockError {
    fn from(e: wgpu::RequestDeviceError) -> Self {
        FlockError::DeviceCreation(e)
    }
}

impl From<winit::error::EventLoopError> for FlockError {
    fn from(e: winit::error::EventLoopError) -> Self {
        FlockError::EventLoop(e)
    }
}

impl From<winit::error::OsError> for FlockError {
    fn from(e: winit::error::OsError) -> Self {
        FlockError::Window(e)
    }
}
