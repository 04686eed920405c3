//! Detection of a float texture format the device can render into.

use tracing::debug;

use crate::gpu::{Extension, Gpu, Sampling, TexelType};

/// Size of the throwaway texture used to verify render support.
const PROBE_SIZE: u32 = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericFormat {
    Float,
    HalfFloat,
}

impl NumericFormat {
    pub fn texel_type(self) -> TexelType {
        match self {
            NumericFormat::Float => TexelType::Float,
            NumericFormat::HalfFloat => TexelType::HalfFloat,
        }
    }
}

/// What the device can do for the height field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capabilities {
    pub format: NumericFormat,
    pub linear_filterable: bool,
    /// Extensions that must stay enabled on the rendering context.
    pub extensions: Vec<Extension>,
}

/// Finds the first float format that can back a complete framebuffer.
///
/// Returns `None` when the float texture extension is missing or when no
/// candidate verifies.
pub fn probe<G: Gpu>(gpu: &mut G) -> Option<Capabilities> {
    let mut available = Vec::new();
    for ext in Extension::ALL {
        if gpu.enable_extension(ext) {
            available.push(ext);
        }
    }
    let has = |ext: Extension| available.contains(&ext);

    if !has(Extension::TextureFloat) {
        debug!(missing = Extension::TextureFloat.name(), "float textures unavailable");
        return None;
    }

    let mut candidates = vec![candidate(
        NumericFormat::Float,
        Extension::TextureFloat,
        Extension::TextureFloatLinear,
        &has,
    )];
    if has(Extension::TextureHalfFloat) {
        candidates.push(candidate(
            NumericFormat::HalfFloat,
            Extension::TextureHalfFloat,
            Extension::TextureHalfFloatLinear,
            &has,
        ));
    }

    let texture = gpu.create_texture().ok()?;
    let framebuffer = match gpu.create_framebuffer() {
        Ok(fb) => fb,
        Err(_) => {
            gpu.delete_texture(&texture);
            return None;
        }
    };
    gpu.configure_texture(&texture, Sampling::NEAREST_CLAMP);

    let mut found = None;
    for caps in candidates {
        let allocated = gpu
            .allocate_texture(&texture, PROBE_SIZE, PROBE_SIZE, caps.format.texel_type())
            .is_ok();
        if !allocated {
            continue;
        }
        gpu.attach_color(&framebuffer, &texture);
        if gpu.framebuffer_complete() {
            found = Some(caps);
            break;
        }
        debug!(format = ?caps.format, "framebuffer incomplete");
    }

    gpu.bind_framebuffer(None);
    gpu.bind_texture(0, None);
    gpu.delete_framebuffer(&framebuffer);
    gpu.delete_texture(&texture);
    found
}

fn candidate(
    format: NumericFormat,
    base: Extension,
    linear: Extension,
    has: &impl Fn(Extension) -> bool,
) -> Capabilities {
    let linear_filterable = has(linear);
    let mut extensions = vec![base];
    if linear_filterable {
        extensions.push(linear);
    }
    Capabilities {
        format,
        linear_filterable,
        extensions,
    }
}
