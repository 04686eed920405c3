//! GPU abstraction.
//!
//! Every GPU operation in the crate goes through an explicit `&mut G` where
//! `G: Gpu`. The browser build implements it over a WebGL 1 context; the
//! [`headless`] backend implements it in software for native hosts and tests.

use std::fmt;

pub mod headless;

pub use headless::{HeadlessGpu, HeadlessImage, HeadlessProfile};

/// Vertices of the fullscreen quad, drawn as a triangle fan.
pub const QUAD_VERTICES: [f32; 8] = [-1.0, -1.0, 1.0, -1.0, 1.0, 1.0, -1.0, 1.0];

/// Attribute index the quad is bound to before linking.
pub const VERTEX_ATTRIBUTE_INDEX: u32 = 0;

/// WebGL extensions the capability prober cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Extension {
    TextureFloat,
    TextureHalfFloat,
    TextureFloatLinear,
    TextureHalfFloatLinear,
}

impl Extension {
    pub const ALL: [Extension; 4] = [
        Extension::TextureFloat,
        Extension::TextureHalfFloat,
        Extension::TextureFloatLinear,
        Extension::TextureHalfFloatLinear,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Extension::TextureFloat => "OES_texture_float",
            Extension::TextureHalfFloat => "OES_texture_half_float",
            Extension::TextureFloatLinear => "OES_texture_float_linear",
            Extension::TextureHalfFloatLinear => "OES_texture_half_float_linear",
        }
    }
}

/// Component type of an RGBA texture allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TexelType {
    UnsignedByte,
    Float,
    HalfFloat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    Nearest,
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wrap {
    ClampToEdge,
    Repeat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sampling {
    pub filter: Filter,
    pub wrap: Wrap,
}

impl Sampling {
    pub const NEAREST_CLAMP: Sampling = Sampling {
        filter: Filter::Nearest,
        wrap: Wrap::ClampToEdge,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    pub fn label(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformType {
    Float,
    Vec2,
    Sampler,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Vec2([f32; 2]),
    Sampler(i32),
}

impl UniformValue {
    pub fn ty(&self) -> UniformType {
        match self {
            UniformValue::Float(_) => UniformType::Float,
            UniformValue::Vec2(_) => UniformType::Vec2,
            UniformValue::Sampler(_) => UniformType::Sampler,
        }
    }
}

/// Failures reported by a [`Gpu`] backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GpuError {
    ContextLost,
    /// `create*` returned nothing.
    ResourceCreation(&'static str),
    Allocation {
        width: u32,
        height: u32,
        texel: TexelType,
    },
    Upload(String),
}

impl fmt::Display for GpuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ContextLost => write!(f, "context lost"),
            Self::ResourceCreation(what) => write!(f, "failed to create {what}"),
            Self::Allocation {
                width,
                height,
                texel,
            } => write!(f, "failed to allocate {width}x{height} {texel:?} texture"),
            Self::Upload(msg) => write!(f, "texture upload failed: {msg}"),
        }
    }
}

impl std::error::Error for GpuError {}

/// Explicit GPU context handle.
///
/// Binding state (current program, framebuffer, texture units) lives in the
/// backend exactly like a GL context; callers never rely on ambient state
/// set by anyone but themselves.
pub trait Gpu {
    type Texture: Clone + fmt::Debug;
    type Framebuffer: Clone + fmt::Debug;
    type Shader;
    type Program: Clone + fmt::Debug;
    type Buffer: Clone + fmt::Debug;
    type UniformLocation: Clone + fmt::Debug;
    /// Decoded image ready for upload.
    type Image;

    /// Enables an extension, returning whether it is available.
    fn enable_extension(&mut self, ext: Extension) -> bool;

    fn create_texture(&mut self) -> Result<Self::Texture, GpuError>;
    fn delete_texture(&mut self, texture: &Self::Texture);
    /// Binds `texture` to texture unit `unit`, leaving `unit` active.
    fn bind_texture(&mut self, unit: u32, texture: Option<&Self::Texture>);
    /// Sets filter and wrap modes. Leaves the texture bound to unit 0.
    fn configure_texture(&mut self, texture: &Self::Texture, sampling: Sampling);
    /// Allocates zeroed RGBA storage.
    fn allocate_texture(
        &mut self,
        texture: &Self::Texture,
        width: u32,
        height: u32,
        texel: TexelType,
    ) -> Result<(), GpuError>;
    /// Uploads RGBA8 pixels.
    fn upload_pixels(
        &mut self,
        texture: &Self::Texture,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> Result<(), GpuError>;
    /// Uploads a decoded image with its rows flipped to bottom-up order.
    fn upload_image(&mut self, texture: &Self::Texture, image: &Self::Image)
        -> Result<(), GpuError>;
    fn image_size(&self, image: &Self::Image) -> (u32, u32);

    fn create_framebuffer(&mut self) -> Result<Self::Framebuffer, GpuError>;
    fn delete_framebuffer(&mut self, framebuffer: &Self::Framebuffer);
    /// `None` selects the default (on-screen) target.
    fn bind_framebuffer(&mut self, framebuffer: Option<&Self::Framebuffer>);
    /// Binds `framebuffer` and attaches `texture` as its color target.
    fn attach_color(&mut self, framebuffer: &Self::Framebuffer, texture: &Self::Texture);
    /// Completeness of the currently bound framebuffer.
    fn framebuffer_complete(&mut self) -> bool;

    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<Self::Shader, String>;
    fn delete_shader(&mut self, shader: Self::Shader);
    /// Binds attribute 0 to `vertex` and links.
    fn link_program(
        &mut self,
        label: &str,
        vertex: &Self::Shader,
        fragment: &Self::Shader,
    ) -> Result<Self::Program, String>;
    fn delete_program(&mut self, program: &Self::Program);
    fn use_program(&mut self, program: &Self::Program);
    fn uniform_location(
        &mut self,
        program: &Self::Program,
        name: &str,
    ) -> Option<Self::UniformLocation>;
    /// Writes to a uniform of the program currently in use.
    fn set_uniform(&mut self, location: &Self::UniformLocation, value: UniformValue);

    fn create_vertex_buffer(&mut self, data: &[f32]) -> Result<Self::Buffer, GpuError>;
    fn delete_buffer(&mut self, buffer: &Self::Buffer);
    fn enable_vertex_attribute(&mut self, index: u32);
    fn vertex_attribute_pointer(&mut self, buffer: &Self::Buffer, index: u32, components: i32);

    /// Draws four vertices as a triangle fan.
    fn draw_quad(&mut self);
    fn viewport(&mut self, width: u32, height: u32);
    /// Enables or disables `SRC_ALPHA, ONE_MINUS_SRC_ALPHA` blending.
    fn set_blending(&mut self, enabled: bool);
    /// Clears color to transparent and depth.
    fn clear(&mut self);
}

/// The shared fullscreen quad.
#[derive(Debug)]
pub struct FullscreenQuad<G: Gpu> {
    buffer: G::Buffer,
}

impl<G: Gpu> FullscreenQuad<G> {
    pub fn new(gpu: &mut G) -> Result<Self, GpuError> {
        let buffer = gpu.create_vertex_buffer(&QUAD_VERTICES)?;
        gpu.vertex_attribute_pointer(&buffer, VERTEX_ATTRIBUTE_INDEX, 2);
        gpu.enable_vertex_attribute(VERTEX_ATTRIBUTE_INDEX);
        Ok(Self { buffer })
    }

    pub fn draw(&self, gpu: &mut G) {
        gpu.draw_quad();
    }

    pub fn release(self, gpu: &mut G) {
        gpu.delete_buffer(&self.buffer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_names_match_webgl() {
        let names: Vec<_> = Extension::ALL.iter().map(|e| e.name()).collect();
        assert_eq!(
            names,
            [
                "OES_texture_float",
                "OES_texture_half_float",
                "OES_texture_float_linear",
                "OES_texture_half_float_linear",
            ]
        );
    }

    #[test]
    fn quad_is_clip_space_square() {
        for pair in QUAD_VERTICES.chunks(2) {
            assert_eq!(pair[0].abs(), 1.0);
            assert_eq!(pair[1].abs(), 1.0);
        }
    }

    #[test]
    fn uniform_value_reports_type() {
        assert_eq!(UniformValue::Float(0.0).ty(), UniformType::Float);
        assert_eq!(UniformValue::Vec2([0.0; 2]).ty(), UniformType::Vec2);
        assert_eq!(UniformValue::Sampler(1).ty(), UniformType::Sampler);
    }
}
