//! Final draw of the refracted background to the default target.

use crate::boundary::BoundaryRect;
use crate::error::RipplesError;
use crate::gpu::{FullscreenQuad, Gpu, UniformValue};
use crate::program::{ShaderProgram, UniformName};

/// Per-frame inputs of the composite pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompositeParams {
    pub boundary: BoundaryRect,
    pub perturbance: f32,
    /// Drawing buffer size of the surface.
    pub surface_size: (u32, u32),
}

/// Draws one frame. The background goes to unit 0, the ripples to unit 1.
pub fn render<G: Gpu>(
    gpu: &mut G,
    composite: &ShaderProgram<G>,
    quad: &FullscreenQuad<G>,
    background: &G::Texture,
    ripples: &G::Texture,
    params: &CompositeParams,
) -> Result<(), RipplesError> {
    gpu.bind_framebuffer(None);
    gpu.viewport(params.surface_size.0, params.surface_size.1);
    gpu.set_blending(true);
    gpu.clear();

    composite.activate(gpu);
    gpu.bind_texture(0, Some(background));
    gpu.bind_texture(1, Some(ripples));

    let result = set_frame_uniforms(gpu, composite, params);
    if result.is_ok() {
        quad.draw(gpu);
    }
    gpu.set_blending(false);
    result
}

fn set_frame_uniforms<G: Gpu>(
    gpu: &mut G,
    composite: &ShaderProgram<G>,
    params: &CompositeParams,
) -> Result<(), RipplesError> {
    composite.set(gpu, UniformName::Perturbance, UniformValue::Float(params.perturbance))?;
    composite.set(gpu, UniformName::TopLeft, UniformValue::Vec2(params.boundary.top_left))?;
    composite.set(
        gpu,
        UniformName::BottomRight,
        UniformValue::Vec2(params.boundary.bottom_right),
    )?;
    composite.set(
        gpu,
        UniformName::ContainerRatio,
        UniformValue::Vec2(params.boundary.container_ratio),
    )
}
