//! GLSL ES 1.00 sources for the three ripple programs.

use crate::gpu::UniformType;
use crate::program::{ProgramKind, UniformDecl, UniformName};

/// Name of the position attribute, bound to index 0 before linking.
pub const VERTEX_ATTRIBUTE: &str = "vertex";

/// Per-step velocity damping.
pub const VELOCITY_DAMPING: f32 = 0.995;
/// Extra damping applied within one texel of the border.
pub const EDGE_DAMPING: f32 = 0.95;
/// Distance over which refraction and highlights fade out at the edges.
pub const EDGE_FADE: f32 = 0.05;

pub const SIMULATION_VERTEX: &str = r#"
attribute vec2 vertex;
varying vec2 coord;

void main() {
    coord = vertex * 0.5 + 0.5;
    gl_Position = vec4(vertex, 0.0, 1.0);
}
"#;

pub const PERTURB_FRAGMENT: &str = r#"
precision highp float;

const float PI = 3.141592653589793;
uniform sampler2D field;
uniform vec2 center;
uniform float radius;
uniform float strength;

varying vec2 coord;

void main() {
    vec4 info = texture2D(field, coord);

    float drop = max(0.0, 1.0 - length(center * 0.5 + 0.5 - coord) / radius);
    drop = 0.5 - cos(drop * PI) * 0.5;

    info.r += drop * strength;

    gl_FragColor = info;
}
"#;

pub const DIFFUSE_FRAGMENT: &str = r#"
precision highp float;

uniform sampler2D field;
uniform vec2 delta;

varying vec2 coord;

void main() {
    vec4 info = texture2D(field, coord);

    vec2 dx = vec2(delta.x, 0.0);
    vec2 dy = vec2(0.0, delta.y);

    float average = (
        texture2D(field, coord - dx).r +
        texture2D(field, coord - dy).r +
        texture2D(field, coord + dx).r +
        texture2D(field, coord + dy).r
    ) * 0.25;

    float edge = 1.0;
    if (coord.x <= delta.x || coord.x >= 1.0 - delta.x ||
        coord.y <= delta.y || coord.y >= 1.0 - delta.y) {
        edge = 0.95;
    }

    info.g += (average - info.r) * 2.0;
    info.g *= 0.995 * edge;
    info.r += info.g;

    info.r = clamp(info.r, -1.0, 1.0);
    info.g = clamp(info.g, -1.0, 1.0);

    gl_FragColor = info;
}
"#;

pub const COMPOSITE_VERTEX: &str = r#"
precision highp float;

attribute vec2 vertex;
uniform vec2 topLeft;
uniform vec2 bottomRight;
uniform vec2 containerRatio;
varying vec2 ripplesCoord;
varying vec2 backgroundCoord;

void main() {
    backgroundCoord = mix(topLeft, bottomRight, vertex * 0.5 + 0.5);
    backgroundCoord.y = 1.0 - backgroundCoord.y;
    ripplesCoord = vec2(vertex.x, -vertex.y) * containerRatio * 0.5 + 0.5;
    gl_Position = vec4(vertex.x, -vertex.y, 0.0, 1.0);
}
"#;

pub const COMPOSITE_FRAGMENT: &str = r#"
precision highp float;

uniform sampler2D samplerBackground;
uniform sampler2D samplerRipples;
uniform vec2 delta;

uniform float perturbance;
varying vec2 ripplesCoord;
varying vec2 backgroundCoord;

void main() {
    float height = texture2D(samplerRipples, ripplesCoord).r;
    float heightX = texture2D(samplerRipples, clamp(ripplesCoord + vec2(delta.x, 0.0), 0.0, 1.0)).r;
    float heightY = texture2D(samplerRipples, clamp(ripplesCoord + vec2(0.0, delta.y), 0.0, 1.0)).r;
    vec3 dx = vec3(delta.x, heightX - height, 0.0);
    vec3 dy = vec3(0.0, heightY - height, delta.y);
    vec2 offset = -normalize(cross(dy, dx)).xz;

    float fade = smoothstep(0.0, 0.05, ripplesCoord.x) *
        smoothstep(0.0, 0.05, 1.0 - ripplesCoord.x) *
        smoothstep(0.0, 0.05, ripplesCoord.y) *
        smoothstep(0.0, 0.05, 1.0 - ripplesCoord.y);

    float specular = pow(max(0.0, dot(offset, normalize(vec2(-0.6, 1.0)))), 4.0) * fade;

    gl_FragColor = texture2D(samplerBackground, backgroundCoord + offset * perturbance * fade) + specular;
}
"#;

/// Sources and uniform schema of one program.
#[derive(Debug, Clone, Copy)]
pub struct ProgramSource {
    pub kind: ProgramKind,
    pub vertex: &'static str,
    pub fragment: &'static str,
    pub uniforms: &'static [UniformDecl],
}

pub const PERTURB: ProgramSource = ProgramSource {
    kind: ProgramKind::Perturb,
    vertex: SIMULATION_VERTEX,
    fragment: PERTURB_FRAGMENT,
    uniforms: &[
        UniformDecl::new(UniformName::Field, UniformType::Sampler),
        UniformDecl::new(UniformName::Center, UniformType::Vec2),
        UniformDecl::new(UniformName::Radius, UniformType::Float),
        UniformDecl::new(UniformName::Strength, UniformType::Float),
    ],
};

pub const DIFFUSE: ProgramSource = ProgramSource {
    kind: ProgramKind::Diffuse,
    vertex: SIMULATION_VERTEX,
    fragment: DIFFUSE_FRAGMENT,
    uniforms: &[
        UniformDecl::new(UniformName::Field, UniformType::Sampler),
        UniformDecl::new(UniformName::Delta, UniformType::Vec2),
    ],
};

pub const COMPOSITE: ProgramSource = ProgramSource {
    kind: ProgramKind::Composite,
    vertex: COMPOSITE_VERTEX,
    fragment: COMPOSITE_FRAGMENT,
    uniforms: &[
        UniformDecl::new(UniformName::SamplerBackground, UniformType::Sampler),
        UniformDecl::new(UniformName::SamplerRipples, UniformType::Sampler),
        UniformDecl::new(UniformName::Delta, UniformType::Vec2),
        UniformDecl::new(UniformName::Perturbance, UniformType::Float),
        UniformDecl::new(UniformName::TopLeft, UniformType::Vec2),
        UniformDecl::new(UniformName::BottomRight, UniformType::Vec2),
        UniformDecl::new(UniformName::ContainerRatio, UniformType::Vec2),
    ],
};

#[cfg(test)]
mod tests {
    use super::*;

    fn glsl_type(ty: UniformType) -> &'static str {
        match ty {
            UniformType::Float => "float",
            UniformType::Vec2 => "vec2",
            UniformType::Sampler => "sampler2D",
        }
    }

    #[test]
    fn schema_matches_declarations() {
        for program in [PERTURB, DIFFUSE, COMPOSITE] {
            let source = format!("{}{}", program.vertex, program.fragment);
            for decl in program.uniforms {
                let line = format!("uniform {} {};", glsl_type(decl.ty), decl.name.glsl());
                assert!(
                    source.contains(&line),
                    "{} is missing `{line}`",
                    program.kind.label()
                );
            }
        }
    }

    #[test]
    fn every_declared_uniform_is_in_schema() {
        for program in [PERTURB, DIFFUSE, COMPOSITE] {
            let source = format!("{}{}", program.vertex, program.fragment);
            for line in source.lines().map(str::trim).filter(|l| l.starts_with("uniform ")) {
                let name = line.trim_end_matches(';').split_whitespace().last().unwrap();
                assert!(
                    program.uniforms.iter().any(|d| d.name.glsl() == name),
                    "{} declares unlisted uniform {name}",
                    program.kind.label()
                );
            }
        }
    }

    #[test]
    fn constants_match_glsl_literals() {
        assert!(DIFFUSE_FRAGMENT.contains(&format!("{VELOCITY_DAMPING}")));
        assert!(DIFFUSE_FRAGMENT.contains(&format!("edge = {EDGE_DAMPING};")));
        assert_eq!(
            COMPOSITE_FRAGMENT.matches(&format!("smoothstep(0.0, {EDGE_FADE},")).count(),
            4
        );
    }

    #[test]
    fn vertex_stages_use_shared_attribute() {
        for src in [SIMULATION_VERTEX, COMPOSITE_VERTEX] {
            assert!(src.contains(&format!("attribute vec2 {VERTEX_ATTRIBUTE};")));
        }
    }
}
