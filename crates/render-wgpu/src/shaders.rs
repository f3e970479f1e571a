/// Uniform layouts shared by every pass.
const UNIFORMS: &str = r#"
struct Globals {
    view_proj: mat4x4<f32>,
    light_view_proj: mat4x4<f32>,
    camera_pos: vec4<f32>,
    ambient: vec4<f32>,
    sun_dir: vec4<f32>,
    sun_color: vec4<f32>,
    // w: distance at which the light fades out
    point_pos: vec4<f32>,
    point_color: vec4<f32>,
    env_low: vec4<f32>,
    env_high: vec4<f32>,
};

struct Node {
    model: mat4x4<f32>,
    color: vec4<f32>,
    // metalness, roughness, env intensity, shadow opacity
    material: vec4<f32>,
    // x: receives shadows
    flags: vec4<f32>,
};
"#;

/// Depth-only pass from the directional light.
const SHADOW: &str = r#"
@group(0) @binding(0)
var<uniform> globals: Globals;

@group(1) @binding(0)
var<uniform> node: Node;

@vertex
fn vs_shadow(@location(0) position: vec3<f32>) -> @builtin(position) vec4<f32> {
    return globals.light_view_proj * node.model * vec4<f32>(position, 1.0);
}
"#;

/// Lit cube and shadow-catching floor.
const SCENE: &str = r#"
@group(0) @binding(0)
var<uniform> globals: Globals;
@group(0) @binding(1)
var shadow_map: texture_depth_2d;
@group(0) @binding(2)
var shadow_sampler: sampler_comparison;

@group(1) @binding(0)
var<uniform> node: Node;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) world_pos: vec3<f32>,
    @location(1) world_normal: vec3<f32>,
    @location(2) light_space: vec4<f32>,
};

@vertex
fn vs_main(vertex: VertexInput) -> VertexOutput {
    let world = node.model * vec4<f32>(vertex.position, 1.0);
    var out: VertexOutput;
    out.clip_position = globals.view_proj * world;
    out.world_pos = world.xyz;
    out.world_normal = (node.model * vec4<f32>(vertex.normal, 0.0)).xyz;
    out.light_space = globals.light_view_proj * world;
    return out;
}

// 3x3 PCF over the shadow map. 1.0 = fully lit.
fn shadow_visibility(light_space: vec4<f32>) -> f32 {
    let ndc = light_space.xyz / light_space.w;
    let uv = vec2<f32>(ndc.x * 0.5 + 0.5, ndc.y * -0.5 + 0.5);
    if (uv.x < 0.0 || uv.x > 1.0 || uv.y < 0.0 || uv.y > 1.0 || ndc.z > 1.0) {
        return 1.0;
    }
    let texel = 1.0 / f32(textureDimensions(shadow_map).x);
    var lit = 0.0;
    for (var x = -1; x <= 1; x += 1) {
        for (var y = -1; y <= 1; y += 1) {
            let offset = vec2<f32>(f32(x), f32(y)) * texel;
            lit += textureSampleCompareLevel(shadow_map, shadow_sampler, uv + offset, ndc.z - 0.001);
        }
    }
    return lit / 9.0;
}

@fragment
fn fs_cube(in: VertexOutput) -> @location(0) vec4<f32> {
    let n = normalize(in.world_normal);
    let v = normalize(globals.camera_pos.xyz - in.world_pos);
    let base = node.color.rgb;
    let metalness = node.material.x;
    let roughness = node.material.y;
    let env_intensity = node.material.z;

    let diffuse_color = base * (1.0 - metalness);
    let f0 = mix(vec3<f32>(0.04), base, metalness);
    let shininess = mix(512.0, 8.0, roughness);

    var visibility = 1.0;
    if (node.flags.x > 0.5) {
        visibility = shadow_visibility(in.light_space);
    }

    var color = globals.ambient.rgb * base;

    let l = normalize(globals.sun_dir.xyz);
    let h = normalize(l + v);
    let n_dot_l = max(dot(n, l), 0.0);
    let spec = pow(max(dot(n, h), 0.0), shininess);
    color += (diffuse_color + f0 * spec) * globals.sun_color.rgb * n_dot_l * visibility;

    let to_point = globals.point_pos.xyz - in.world_pos;
    let dist = length(to_point);
    let pl = to_point / max(dist, 0.0001);
    let fade = clamp(1.0 - dist / globals.point_pos.w, 0.0, 1.0);
    let ph = normalize(pl + v);
    let p_dot_l = max(dot(n, pl), 0.0);
    let p_spec = pow(max(dot(n, ph), 0.0), shininess);
    color += (diffuse_color + f0 * p_spec) * globals.point_color.rgb * p_dot_l * fade * fade;

    let r = reflect(-v, n);
    let env = mix(globals.env_low.rgb, globals.env_high.rgb, clamp(r.y * 0.5 + 0.5, 0.0, 1.0));
    let fresnel = f0 + (vec3<f32>(1.0) - f0) * pow(1.0 - max(dot(n, v), 0.0), 5.0);
    color += env * fresnel * env_intensity * (1.0 - 0.5 * roughness);

    return vec4<f32>(color, node.color.a);
}

// Transparent everywhere except where the cube's shadow falls.
@fragment
fn fs_ground(in: VertexOutput) -> @location(0) vec4<f32> {
    let visibility = shadow_visibility(in.light_space);
    return vec4<f32>(0.0, 0.0, 0.0, (1.0 - visibility) * node.material.w);
}
"#;

/// WGSL for the light's depth pass.
pub fn shadow_shader() -> String {
    format!("{UNIFORMS}{SHADOW}")
}

/// WGSL for the main pass.
pub fn scene_shader() -> String {
    format!("{UNIFORMS}{SCENE}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shaders_share_uniform_layout() {
        assert!(shadow_shader().starts_with(UNIFORMS));
        assert!(scene_shader().starts_with(UNIFORMS));
        assert!(scene_shader().contains("fn fs_cube"));
        assert!(scene_shader().contains("fn fs_ground"));
        assert!(shadow_shader().contains("fn vs_shadow"));
    }
}
