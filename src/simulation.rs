//! Simulation controller.
//!
//! [`FlockSimulation`] owns the double-buffered state store, the compute
//! pipeline for the force kernel, and the clock. It is the only component
//! that triggers a state update: once per frame it reads a clamped delta
//! from the clock, uploads the sanitized parameters, dispatches one kernel
//! invocation per agent against the current state, and swaps the store.

use wgpu::util::DeviceExt;

use crate::error::FlockError;
use crate::params::{ParamsUniform, SimulationParams};
use crate::scene::{FrameContext, SceneNode};
use crate::shaders;
use crate::state::{initial_state, Channel, StateStore};
use crate::time::Time;

/// Bytes per agent per channel: one `vec4<f32>` texel.
const TEXEL_SIZE: u64 = 16;

pub struct FlockSimulation {
    /// Live-tunable flocking parameters, read once per dispatch.
    pub params: SimulationParams,
    state: StateStore<wgpu::Buffer>,
    uniform_buffer: wgpu::Buffer,
    pipeline: wgpu::ComputePipeline,
    /// One bind group per ping-pong parity: reads slot `p`, writes `p ^ 1`.
    bind_groups: [wgpu::BindGroup; 2],
    time: Time,
    agent_count: u32,
}

impl FlockSimulation {
    /// Build the state store and compute pipeline for `agent_count` agents,
    /// spawned reproducibly from `seed`.
    ///
    /// Fails with [`FlockError::Allocation`] if the device cannot hold or
    /// bind buffers of the required size. That failure is fatal to the
    /// simulation; the caller decides whether to retry with a smaller count.
    pub fn new(
        device: &wgpu::Device,
        agent_count: u32,
        time: Time,
        seed: u64,
    ) -> Result<Self, FlockError> {
        check_limits(agent_count, &device.limits())?;

        let (positions, velocities) = initial_state(agent_count, seed).packed();
        let make_buffer = |label: &str, data: &[[f32; 4]]| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::cast_slice(data),
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            })
        };
        // Scratch slots start as copies of the spawn state; their contents
        // are fully overwritten before ever becoming current.
        let state = StateStore::new(
            [
                make_buffer("Position Buffer A", &positions),
                make_buffer("Position Buffer B", &positions),
            ],
            [
                make_buffer("Velocity Buffer A", &velocities),
                make_buffer("Velocity Buffer B", &velocities),
            ],
            agent_count,
        );

        let params = SimulationParams::default();
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Sim Params Buffer"),
            contents: bytemuck::bytes_of(&ParamsUniform::new(&params, 0.0, agent_count)),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let storage_entry = |binding: u32, read_only: bool| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Force Bind Group Layout"),
            entries: &[
                storage_entry(0, true),
                storage_entry(1, true),
                storage_entry(2, false),
                storage_entry(3, false),
                wgpu::BindGroupLayoutEntry {
                    binding: 4,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let bind_group_for = |parity: usize| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Force Bind Group"),
                layout: &bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: state.slot(Channel::Position, parity).as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: state.slot(Channel::Velocity, parity).as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: state
                            .slot(Channel::Position, parity ^ 1)
                            .as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: state
                            .slot(Channel::Velocity, parity ^ 1)
                            .as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 4,
                        resource: uniform_buffer.as_entire_binding(),
                    },
                ],
            })
        };
        let bind_groups = [bind_group_for(0), bind_group_for(1)];

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Force Shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::COMPUTE_SHADER.into()),
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Force Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Force Pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some("main"),
            compilation_options: Default::default(),
            cache: None,
        });

        Ok(Self {
            params,
            state,
            uniform_buffer,
            pipeline,
            bind_groups,
            time,
            agent_count,
        })
    }

    /// Advance the flock by one step.
    ///
    /// Reads the elapsed (clamped) delta from the clock, dispatches the
    /// force kernel against the current state, and swaps the store. Call at
    /// most once per frame, before the renderer's update.
    pub fn step(&mut self, queue: &wgpu::Queue, encoder: &mut wgpu::CommandEncoder) {
        let (_, delta_time) = self.time.update();
        if delta_time <= 0.0 {
            // Paused or zero-length frame: no dispatch, no swap.
            return;
        }

        self.params.sanitize();
        let uniform = ParamsUniform::new(&self.params, delta_time, self.agent_count);
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniform));

        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Force Pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &self.bind_groups[self.state.parity()], &[]);
            let workgroups = self.agent_count.div_ceil(shaders::WORKGROUP_SIZE);
            pass.dispatch_workgroups(workgroups, 1, 1);
        }

        self.state.swap();
    }

    /// The double-buffered agent state. `read` always reflects the latest
    /// completed step.
    pub fn state(&self) -> &StateStore<wgpu::Buffer> {
        &self.state
    }

    pub fn agent_count(&self) -> u32 {
        self.agent_count
    }

    pub fn time(&self) -> &Time {
        &self.time
    }

    pub fn time_mut(&mut self) -> &mut Time {
        &mut self.time
    }
}

impl SceneNode for FlockSimulation {
    fn update(&mut self, ctx: &mut FrameContext<'_>) {
        self.step(ctx.queue, ctx.encoder);
        ctx.state_parity = self.state.parity();
    }
}

fn check_limits(agent_count: u32, limits: &wgpu::Limits) -> Result<(), FlockError> {
    let bytes = agent_count as u64 * TEXEL_SIZE;
    let limit = (limits.max_storage_buffer_binding_size as u64).min(limits.max_buffer_size);
    if bytes > limit {
        return Err(FlockError::Allocation {
            what: "agent state buffer",
            bytes,
            limit,
        });
    }
    Ok(())
}
