//! WGSL sources for the force kernel and the instanced render pass.
//!
//! The compute kernel must stay in lockstep with the CPU reference in
//! [`crate::kernel`]; the tests below validate both modules with naga so a
//! typo fails `cargo test` instead of a device at runtime.

/// Threads per compute workgroup. Dispatch `ceil(agent_count / 256)` groups.
pub const WORKGROUP_SIZE: u32 = 256;

/// Force evaluation kernel.
///
/// Bindings: current position/velocity read-only, scratch position/velocity
/// writable, parameter uniform. One invocation per agent scans the whole
/// flock; the current/scratch split means every invocation reads a stable
/// snapshot of the previous step.
pub const COMPUTE_SHADER: &str = r#"
struct SimParams {
    align_factor: f32,
    cohesion_factor: f32,
    separation_factor: f32,
    center_factor: f32,
    max_speed: f32,
    max_force: f32,
    range: f32,
    delta_time: f32,
    agent_count: u32,
}

@group(0) @binding(0) var<storage, read> position_in: array<vec4<f32>>;
@group(0) @binding(1) var<storage, read> velocity_in: array<vec4<f32>>;
@group(0) @binding(2) var<storage, read_write> position_out: array<vec4<f32>>;
@group(0) @binding(3) var<storage, read_write> velocity_out: array<vec4<f32>>;
@group(0) @binding(4) var<uniform> params: SimParams;

fn limit(v: vec3<f32>, max_len: f32) -> vec3<f32> {
    let len = length(v);
    if len > max_len && len > 0.0 {
        return v * (max_len / len);
    }
    return v;
}

fn safe_normalize(v: vec3<f32>) -> vec3<f32> {
    let len = length(v);
    if len > 1e-6 {
        return v / len;
    }
    return vec3<f32>(0.0);
}

@compute @workgroup_size(256)
fn main(@builtin(global_invocation_id) global_id: vec3<u32>) {
    let index = global_id.x;
    if index >= params.agent_count {
        return;
    }

    let p = position_in[index].xyz;
    let v = velocity_in[index].xyz;

    var vel_sum = vec3<f32>(0.0);
    var pos_sum = vec3<f32>(0.0);
    var sep_sum = vec3<f32>(0.0);
    var count = 0u;

    for (var j = 0u; j < params.agent_count; j++) {
        let d = position_in[j].xyz - p;
        let dist = length(d);
        if dist > 0.0 && dist < params.range {
            count += 1u;
            vel_sum += velocity_in[j].xyz;
            pos_sum += position_in[j].xyz;
            sep_sum -= d / (dist * dist);
        }
    }

    var force = -p * params.center_factor;
    if count > 0u {
        force += safe_normalize(vel_sum) * params.align_factor;
        force += safe_normalize(pos_sum / f32(count) - p) * params.cohesion_factor;
        force += sep_sum * params.separation_factor;
    }

    let accel = limit(force, params.max_force);
    let v_next = limit(v + accel * params.delta_time, params.max_speed);
    let p_next = p + v_next * params.delta_time;

    position_out[index] = vec4<f32>(p_next, 0.0);
    velocity_out[index] = vec4<f32>(v_next, 0.0);
}
"#;

/// Instanced mesh shader.
///
/// Each instance looks up its own agent state by `instance_index`; the model
/// transform (translation from position, orientation basis from the velocity
/// direction) is derived here in the vertex stage, never on the CPU. The
/// template mesh is modeled facing +Z, so the basis maps +Z onto the
/// direction of travel. Near-zero velocity falls back to the identity
/// forward instead of producing NaN.
pub const RENDER_SHADER: &str = r#"
struct Camera {
    view_proj: mat4x4<f32>,
}

@group(0) @binding(0) var<uniform> camera: Camera;
@group(1) @binding(0) var<storage, read> agent_position: array<vec4<f32>>;
@group(1) @binding(1) var<storage, read> agent_velocity: array<vec4<f32>>;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
}

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) normal: vec3<f32>,
}

fn orientation(velocity: vec3<f32>) -> mat3x3<f32> {
    let speed = length(velocity);
    var forward = vec3<f32>(0.0, 0.0, 1.0);
    if speed > 1e-5 {
        forward = velocity / speed;
    }
    var up = vec3<f32>(0.0, 1.0, 0.0);
    if abs(forward.y) > 0.999 {
        up = vec3<f32>(1.0, 0.0, 0.0);
    }
    let right = normalize(cross(up, forward));
    let true_up = cross(forward, right);
    return mat3x3<f32>(right, true_up, forward);
}

@vertex
fn vs_main(in: VertexInput, @builtin(instance_index) instance: u32) -> VertexOutput {
    let basis = orientation(agent_velocity[instance].xyz);
    let world = basis * in.position + agent_position[instance].xyz;

    var out: VertexOutput;
    out.clip_position = camera.view_proj * vec4<f32>(world, 1.0);
    out.normal = basis * in.normal;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let light_dir = normalize(vec3<f32>(0.4, 0.8, 0.3));
    let n = normalize(in.normal);
    let diffuse = max(dot(n, light_dir), 0.0);
    let base = vec3<f32>(0.55, 0.65, 0.9);
    return vec4<f32>(base * (0.25 + 0.75 * diffuse), 1.0);
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    /// Validates WGSL code using naga.
    fn validate_wgsl(code: &str) -> Result<(), String> {
        let module = naga::front::wgsl::parse_str(code)
            .map_err(|e| format!("WGSL parse error: {:?}", e))?;

        let mut validator = naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        );
        validator
            .validate(&module)
            .map_err(|e| format!("WGSL validation error: {:?}", e))?;

        Ok(())
    }

    #[test]
    fn test_compute_shader_is_valid() {
        validate_wgsl(COMPUTE_SHADER).expect("compute shader should be valid");
    }

    #[test]
    fn test_render_shader_is_valid() {
        validate_wgsl(RENDER_SHADER).expect("render shader should be valid");
    }

    #[test]
    fn test_compute_shader_matches_workgroup_constant() {
        assert!(COMPUTE_SHADER.contains(&format!("@workgroup_size({})", WORKGROUP_SIZE)));
    }

    #[test]
    fn test_compute_shader_guards_stray_invocations() {
        assert!(COMPUTE_SHADER.contains("index >= params.agent_count"));
    }
}
