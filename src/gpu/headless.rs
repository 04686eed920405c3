//! Software implementation of [`Gpu`].
//!
//! Texture storage is RGBA `f32`. Offscreen draws run the perturb and diffuse
//! kernels on the CPU, selected by the label the program was linked with;
//! on-screen draws are recorded as [`CompositeDraw`] snapshots. Binding rules
//! mirror WebGL closely enough that misuse (feedback loops, uniforms written
//! to the wrong program, double deletes) is observable.

use std::collections::{HashMap, HashSet};
use std::f32::consts::PI;

use super::{
    Extension, Gpu, GpuError, Sampling, ShaderStage, TexelType, UniformValue,
};

/// What the emulated device supports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadlessProfile {
    pub extensions: Vec<Extension>,
    /// Texel types that can back a complete framebuffer.
    pub renderable: Vec<TexelType>,
}

impl HeadlessProfile {
    /// Float and half float, both renderable and linear-filterable.
    pub fn full() -> Self {
        Self {
            extensions: Extension::ALL.to_vec(),
            renderable: vec![TexelType::UnsignedByte, TexelType::Float, TexelType::HalfFloat],
        }
    }

    /// Float textures exist but only half float can be rendered to.
    pub fn half_float_only() -> Self {
        Self {
            extensions: Extension::ALL.to_vec(),
            renderable: vec![TexelType::UnsignedByte, TexelType::HalfFloat],
        }
    }

    /// No float texture extensions at all.
    pub fn none() -> Self {
        Self {
            extensions: Vec::new(),
            renderable: vec![TexelType::UnsignedByte],
        }
    }

    #[must_use]
    pub fn without_linear(mut self) -> Self {
        self.extensions.retain(|e| {
            !matches!(
                e,
                Extension::TextureFloatLinear | Extension::TextureHalfFloatLinear
            )
        });
        self
    }
}

impl Default for HeadlessProfile {
    fn default() -> Self {
        Self::full()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FramebufferId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(pub u32);

#[derive(Debug)]
pub struct HeadlessShader {
    stage: ShaderStage,
    source: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadlessUniform {
    program: ProgramId,
    name: String,
}

/// Decoded RGBA8 image, rows top-down.
#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl HeadlessImage {
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixels = rgba
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        Self {
            width,
            height,
            pixels,
        }
    }
}

/// Creation and release counts across every resource kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceStats {
    pub created: usize,
    pub released: usize,
    /// Deletes of handles that were already gone.
    pub invalid_releases: usize,
}

impl ResourceStats {
    pub fn live(&self) -> usize {
        self.created - self.released
    }
}

/// Snapshot of one draw to the default target.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeDraw {
    pub background: Option<TextureId>,
    pub ripples: Option<TextureId>,
    pub uniforms: HashMap<String, UniformValue>,
    pub viewport: (u32, u32),
    pub blending: bool,
}

#[derive(Debug, Clone)]
struct TextureSlot {
    width: u32,
    height: u32,
    texel: Option<TexelType>,
    sampling: Sampling,
    data: Vec<[f32; 4]>,
}

impl TextureSlot {
    /// Nearest, clamp-to-edge fetch at normalized coordinates.
    fn sample(&self, u: f32, v: f32) -> [f32; 4] {
        if self.width == 0 || self.height == 0 {
            return [0.0; 4];
        }
        let x = ((u * self.width as f32).floor() as i64).clamp(0, self.width as i64 - 1);
        let y = ((v * self.height as f32).floor() as i64).clamp(0, self.height as i64 - 1);
        self.data[y as usize * self.width as usize + x as usize]
    }
}

#[derive(Debug)]
struct ProgramSlot {
    label: String,
    source: String,
    uniforms: HashMap<String, UniformValue>,
}

#[derive(Debug)]
pub struct HeadlessGpu {
    profile: HeadlessProfile,
    enabled: HashSet<Extension>,
    textures: Vec<Option<TextureSlot>>,
    framebuffers: Vec<Option<Option<TextureId>>>,
    programs: Vec<Option<ProgramSlot>>,
    buffers: Vec<Option<Vec<f32>>>,
    units: [Option<TextureId>; 8],
    current_program: Option<ProgramId>,
    framebuffer: Option<FramebufferId>,
    viewport: (u32, u32),
    blending: bool,
    attributes: HashSet<u32>,
    composites: Vec<CompositeDraw>,
    offscreen_draws: usize,
    feedback_loops: usize,
    misdirected_uniforms: usize,
    stats: ResourceStats,
}

impl HeadlessGpu {
    pub fn new(profile: HeadlessProfile) -> Self {
        Self {
            profile,
            enabled: HashSet::new(),
            textures: Vec::new(),
            framebuffers: Vec::new(),
            programs: Vec::new(),
            buffers: Vec::new(),
            units: [None; 8],
            current_program: None,
            framebuffer: None,
            viewport: (0, 0),
            blending: false,
            attributes: HashSet::new(),
            composites: Vec::new(),
            offscreen_draws: 0,
            feedback_loops: 0,
            misdirected_uniforms: 0,
            stats: ResourceStats::default(),
        }
    }

    pub fn profile(&self) -> &HeadlessProfile {
        &self.profile
    }

    pub fn stats(&self) -> ResourceStats {
        self.stats
    }

    pub fn composites(&self) -> &[CompositeDraw] {
        &self.composites
    }

    pub fn last_composite(&self) -> Option<&CompositeDraw> {
        self.composites.last()
    }

    pub fn offscreen_draws(&self) -> usize {
        self.offscreen_draws
    }

    /// Draws skipped because the source texture was also the render target.
    pub fn feedback_loops(&self) -> usize {
        self.feedback_loops
    }

    pub fn misdirected_uniforms(&self) -> usize {
        self.misdirected_uniforms
    }

    pub fn bound_framebuffer(&self) -> Option<FramebufferId> {
        self.framebuffer
    }

    pub fn blending(&self) -> bool {
        self.blending
    }

    pub fn is_texture_alive(&self, id: TextureId) -> bool {
        self.texture(id).is_some()
    }

    pub fn texture_size(&self, id: TextureId) -> Option<(u32, u32)> {
        self.texture(id).map(|t| (t.width, t.height))
    }

    pub fn texture_sampling(&self, id: TextureId) -> Option<Sampling> {
        self.texture(id).map(|t| t.sampling)
    }

    pub fn texture_type(&self, id: TextureId) -> Option<TexelType> {
        self.texture(id).and_then(|t| t.texel)
    }

    /// Texel at `(x, y)` with `y = 0` at the bottom row.
    pub fn read_texel(&self, id: TextureId, x: u32, y: u32) -> Option<[f32; 4]> {
        let tex = self.texture(id)?;
        if x >= tex.width || y >= tex.height {
            return None;
        }
        tex.data.get((y * tex.width + x) as usize).copied()
    }

    /// Overwrites a texel. Test hook for seeding state.
    pub fn write_texel(&mut self, id: TextureId, x: u32, y: u32, value: [f32; 4]) -> bool {
        let Some(tex) = self.texture_mut(id) else {
            return false;
        };
        if x >= tex.width || y >= tex.height {
            return false;
        }
        let idx = (y * tex.width + x) as usize;
        tex.data[idx] = value;
        true
    }

    fn texture(&self, id: TextureId) -> Option<&TextureSlot> {
        self.textures.get(id.0 as usize).and_then(Option::as_ref)
    }

    fn texture_mut(&mut self, id: TextureId) -> Option<&mut TextureSlot> {
        self.textures.get_mut(id.0 as usize).and_then(Option::as_mut)
    }

    fn release<T>(slots: &mut [Option<T>], index: usize, stats: &mut ResourceStats) {
        match slots.get_mut(index).and_then(Option::take) {
            Some(_) => stats.released += 1,
            None => stats.invalid_releases += 1,
        }
    }

    fn run_kernel(&mut self, label: &str, uniforms: &HashMap<String, UniformValue>) {
        let Some(target_id) = self
            .framebuffer
            .and_then(|fb| self.framebuffers.get(fb.0 as usize).copied().flatten())
            .flatten()
        else {
            return;
        };
        let source_id = self.units[0];
        if source_id == Some(target_id) {
            self.feedback_loops += 1;
            return;
        }
        let Some(source) = source_id.and_then(|id| self.texture(id)).cloned() else {
            return;
        };
        let Some(target) = self.texture_mut(target_id) else {
            return;
        };
        let (w, h) = (target.width, target.height);
        let vec2 = |name: &str, fallback: [f32; 2]| match uniforms.get(name) {
            Some(UniformValue::Vec2(v)) => *v,
            _ => fallback,
        };
        let float = |name: &str| match uniforms.get(name) {
            Some(UniformValue::Float(v)) => *v,
            _ => 0.0,
        };

        let mut out = Vec::with_capacity(target.data.len());
        for y in 0..h {
            for x in 0..w {
                let u = (x as f32 + 0.5) / w as f32;
                let v = (y as f32 + 0.5) / h as f32;
                let mut info = source.sample(u, v);
                match label {
                    "perturb" => {
                        let center = vec2("center", [0.0, 0.0]);
                        let radius = float("radius");
                        let strength = float("strength");
                        let dx = center[0] * 0.5 + 0.5 - u;
                        let dy = center[1] * 0.5 + 0.5 - v;
                        let mut drop = (1.0 - (dx * dx + dy * dy).sqrt() / radius).max(0.0);
                        drop = 0.5 - (drop * PI).cos() * 0.5;
                        info[0] += drop * strength;
                    }
                    "diffuse" => {
                        let delta = vec2("delta", [1.0 / w as f32, 1.0 / h as f32]);
                        let average = (source.sample(u - delta[0], v)[0]
                            + source.sample(u, v - delta[1])[0]
                            + source.sample(u + delta[0], v)[0]
                            + source.sample(u, v + delta[1])[0])
                            * 0.25;
                        let near_edge = u <= delta[0]
                            || u >= 1.0 - delta[0]
                            || v <= delta[1]
                            || v >= 1.0 - delta[1];
                        let edge = if near_edge {
                            crate::shaders::EDGE_DAMPING
                        } else {
                            1.0
                        };
                        info[1] += (average - info[0]) * 2.0;
                        info[1] *= crate::shaders::VELOCITY_DAMPING * edge;
                        info[0] += info[1];
                        info[0] = info[0].clamp(-1.0, 1.0);
                        info[1] = info[1].clamp(-1.0, 1.0);
                    }
                    _ => {}
                }
                out.push(info);
            }
        }
        target.data = out;
    }
}

impl Default for HeadlessGpu {
    fn default() -> Self {
        Self::new(HeadlessProfile::full())
    }
}

impl Gpu for HeadlessGpu {
    type Texture = TextureId;
    type Framebuffer = FramebufferId;
    type Shader = HeadlessShader;
    type Program = ProgramId;
    type Buffer = BufferId;
    type UniformLocation = HeadlessUniform;
    type Image = HeadlessImage;

    fn enable_extension(&mut self, ext: Extension) -> bool {
        if self.profile.extensions.contains(&ext) {
            self.enabled.insert(ext);
            true
        } else {
            false
        }
    }

    fn create_texture(&mut self) -> Result<TextureId, GpuError> {
        self.textures.push(Some(TextureSlot {
            width: 0,
            height: 0,
            texel: None,
            sampling: Sampling::NEAREST_CLAMP,
            data: Vec::new(),
        }));
        self.stats.created += 1;
        Ok(TextureId(self.textures.len() as u32 - 1))
    }

    fn delete_texture(&mut self, texture: &TextureId) {
        Self::release(&mut self.textures, texture.0 as usize, &mut self.stats);
        for unit in self.units.iter_mut() {
            if *unit == Some(*texture) {
                *unit = None;
            }
        }
    }

    fn bind_texture(&mut self, unit: u32, texture: Option<&TextureId>) {
        if let Some(slot) = self.units.get_mut(unit as usize) {
            *slot = texture.copied();
        }
    }

    fn configure_texture(&mut self, texture: &TextureId, sampling: Sampling) {
        self.units[0] = Some(*texture);
        if let Some(tex) = self.texture_mut(*texture) {
            tex.sampling = sampling;
        }
    }

    fn allocate_texture(
        &mut self,
        texture: &TextureId,
        width: u32,
        height: u32,
        texel: TexelType,
    ) -> Result<(), GpuError> {
        let required = match texel {
            TexelType::UnsignedByte => None,
            TexelType::Float => Some(Extension::TextureFloat),
            TexelType::HalfFloat => Some(Extension::TextureHalfFloat),
        };
        let failure = GpuError::Allocation {
            width,
            height,
            texel,
        };
        if required.is_some_and(|ext| !self.enabled.contains(&ext)) {
            return Err(failure);
        }
        let tex = self.texture_mut(*texture).ok_or(failure)?;
        tex.width = width;
        tex.height = height;
        tex.texel = Some(texel);
        tex.data = vec![[0.0; 4]; width as usize * height as usize];
        Ok(())
    }

    fn upload_pixels(
        &mut self,
        texture: &TextureId,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> Result<(), GpuError> {
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(GpuError::Upload(format!(
                "expected {expected} bytes, got {}",
                pixels.len()
            )));
        }
        let tex = self
            .texture_mut(*texture)
            .ok_or_else(|| GpuError::Upload("texture deleted".into()))?;
        tex.width = width;
        tex.height = height;
        tex.texel = Some(TexelType::UnsignedByte);
        tex.data = pixels
            .chunks_exact(4)
            .map(|p| [p[0], p[1], p[2], p[3]].map(|c| c as f32 / 255.0))
            .collect();
        Ok(())
    }

    fn upload_image(&mut self, texture: &TextureId, image: &HeadlessImage) -> Result<(), GpuError> {
        let row = image.width as usize * 4;
        let flipped: Vec<u8> = if row == 0 {
            Vec::new()
        } else {
            image.pixels.chunks(row).rev().flatten().copied().collect()
        };
        self.upload_pixels(texture, image.width, image.height, &flipped)
    }

    fn image_size(&self, image: &HeadlessImage) -> (u32, u32) {
        (image.width, image.height)
    }

    fn create_framebuffer(&mut self) -> Result<FramebufferId, GpuError> {
        self.framebuffers.push(Some(None));
        self.stats.created += 1;
        Ok(FramebufferId(self.framebuffers.len() as u32 - 1))
    }

    fn delete_framebuffer(&mut self, framebuffer: &FramebufferId) {
        Self::release(&mut self.framebuffers, framebuffer.0 as usize, &mut self.stats);
        if self.framebuffer == Some(*framebuffer) {
            self.framebuffer = None;
        }
    }

    fn bind_framebuffer(&mut self, framebuffer: Option<&FramebufferId>) {
        self.framebuffer = framebuffer.copied();
    }

    fn attach_color(&mut self, framebuffer: &FramebufferId, texture: &TextureId) {
        self.framebuffer = Some(*framebuffer);
        if let Some(Some(slot)) = self.framebuffers.get_mut(framebuffer.0 as usize) {
            *slot = Some(*texture);
        }
    }

    fn framebuffer_complete(&mut self) -> bool {
        let attachment = self
            .framebuffer
            .and_then(|fb| self.framebuffers.get(fb.0 as usize).copied().flatten())
            .flatten();
        attachment
            .and_then(|id| self.texture(id))
            .and_then(|tex| tex.texel)
            .is_some_and(|texel| self.profile.renderable.contains(&texel))
    }

    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<HeadlessShader, String> {
        if !source.contains("void main(") {
            return Err("ERROR: 0:0: 'main' : function not defined".into());
        }
        self.stats.created += 1;
        Ok(HeadlessShader {
            stage,
            source: source.to_string(),
        })
    }

    fn delete_shader(&mut self, _shader: HeadlessShader) {
        self.stats.released += 1;
    }

    fn link_program(
        &mut self,
        label: &str,
        vertex: &HeadlessShader,
        fragment: &HeadlessShader,
    ) -> Result<ProgramId, String> {
        if vertex.stage != ShaderStage::Vertex || fragment.stage != ShaderStage::Fragment {
            return Err("attached shaders do not form a vertex/fragment pair".into());
        }
        self.programs.push(Some(ProgramSlot {
            label: label.to_string(),
            source: format!("{}\n{}", vertex.source, fragment.source),
            uniforms: HashMap::new(),
        }));
        self.stats.created += 1;
        Ok(ProgramId(self.programs.len() as u32 - 1))
    }

    fn delete_program(&mut self, program: &ProgramId) {
        Self::release(&mut self.programs, program.0 as usize, &mut self.stats);
        if self.current_program == Some(*program) {
            self.current_program = None;
        }
    }

    fn use_program(&mut self, program: &ProgramId) {
        self.current_program = Some(*program);
    }

    fn uniform_location(&mut self, program: &ProgramId, name: &str) -> Option<HeadlessUniform> {
        let slot = self.programs.get(program.0 as usize)?.as_ref()?;
        let declared = slot.source.lines().any(|line| {
            let line = line.trim();
            line.starts_with("uniform ")
                && line.trim_end_matches(';').split_whitespace().last() == Some(name)
        });
        declared.then(|| HeadlessUniform {
            program: *program,
            name: name.to_string(),
        })
    }

    fn set_uniform(&mut self, location: &HeadlessUniform, value: UniformValue) {
        if self.current_program != Some(location.program) {
            self.misdirected_uniforms += 1;
            return;
        }
        if let Some(Some(slot)) = self.programs.get_mut(location.program.0 as usize) {
            slot.uniforms.insert(location.name.clone(), value);
        }
    }

    fn create_vertex_buffer(&mut self, data: &[f32]) -> Result<BufferId, GpuError> {
        self.buffers.push(Some(data.to_vec()));
        self.stats.created += 1;
        Ok(BufferId(self.buffers.len() as u32 - 1))
    }

    fn delete_buffer(&mut self, buffer: &BufferId) {
        Self::release(&mut self.buffers, buffer.0 as usize, &mut self.stats);
    }

    fn enable_vertex_attribute(&mut self, index: u32) {
        self.attributes.insert(index);
    }

    fn vertex_attribute_pointer(&mut self, _buffer: &BufferId, _index: u32, _components: i32) {}

    fn draw_quad(&mut self) {
        let Some(program) = self.current_program else {
            return;
        };
        let Some(slot) = self.programs.get(program.0 as usize).and_then(Option::as_ref) else {
            return;
        };
        let label = slot.label.clone();
        let uniforms = slot.uniforms.clone();
        if self.framebuffer.is_some() {
            self.offscreen_draws += 1;
            self.run_kernel(&label, &uniforms);
        } else {
            self.composites.push(CompositeDraw {
                background: self.units[0],
                ripples: self.units[1],
                uniforms,
                viewport: self.viewport,
                blending: self.blending,
            });
        }
    }

    fn viewport(&mut self, width: u32, height: u32) {
        self.viewport = (width, height);
    }

    fn set_blending(&mut self, enabled: bool) {
        self.blending = enabled;
    }

    fn clear(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn float_texture(gpu: &mut HeadlessGpu, size: u32) -> TextureId {
        gpu.enable_extension(Extension::TextureFloat);
        let tex = gpu.create_texture().unwrap();
        gpu.allocate_texture(&tex, size, size, TexelType::Float).unwrap();
        tex
    }

    #[test]
    fn float_allocation_needs_extension() {
        let mut gpu = HeadlessGpu::default();
        let tex = gpu.create_texture().unwrap();
        assert!(gpu.allocate_texture(&tex, 4, 4, TexelType::Float).is_err());
        gpu.enable_extension(Extension::TextureFloat);
        assert!(gpu.allocate_texture(&tex, 4, 4, TexelType::Float).is_ok());
    }

    #[test]
    fn missing_extension_cannot_be_enabled() {
        let mut gpu = HeadlessGpu::new(HeadlessProfile::none());
        assert!(!gpu.enable_extension(Extension::TextureFloat));
    }

    #[test]
    fn completeness_follows_renderable_set() {
        let mut gpu = HeadlessGpu::new(HeadlessProfile::half_float_only());
        let tex = float_texture(&mut gpu, 2);
        let fb = gpu.create_framebuffer().unwrap();
        gpu.attach_color(&fb, &tex);
        assert!(!gpu.framebuffer_complete());

        gpu.enable_extension(Extension::TextureHalfFloat);
        gpu.allocate_texture(&tex, 2, 2, TexelType::HalfFloat).unwrap();
        assert!(gpu.framebuffer_complete());
    }

    #[test]
    fn double_delete_is_counted() {
        let mut gpu = HeadlessGpu::default();
        let tex = gpu.create_texture().unwrap();
        gpu.delete_texture(&tex);
        gpu.delete_texture(&tex);
        let stats = gpu.stats();
        assert_eq!(stats.released, 1);
        assert_eq!(stats.invalid_releases, 1);
        assert_eq!(stats.live(), 0);
    }

    #[test]
    fn image_upload_flips_rows() {
        let mut gpu = HeadlessGpu::default();
        let tex = gpu.create_texture().unwrap();
        let image = HeadlessImage {
            width: 1,
            height: 2,
            pixels: vec![255, 0, 0, 255, 0, 0, 255, 255],
        };
        gpu.upload_image(&tex, &image).unwrap();
        assert_eq!(gpu.read_texel(tex, 0, 0), Some([0.0, 0.0, 1.0, 1.0]));
        assert_eq!(gpu.read_texel(tex, 0, 1), Some([1.0, 0.0, 0.0, 1.0]));
    }

    #[test]
    fn uniform_location_requires_declaration() {
        let mut gpu = HeadlessGpu::default();
        let vs = gpu
            .compile_shader(ShaderStage::Vertex, "attribute vec2 vertex;\nvoid main() {}")
            .unwrap();
        let fs = gpu
            .compile_shader(
                ShaderStage::Fragment,
                "uniform float strength;\nvoid main() {}",
            )
            .unwrap();
        let program = gpu.link_program("perturb", &vs, &fs).unwrap();
        assert!(gpu.uniform_location(&program, "strength").is_some());
        assert!(gpu.uniform_location(&program, "radius").is_none());
    }

    #[test]
    fn swapped_stages_fail_to_link() {
        let mut gpu = HeadlessGpu::default();
        let vs = gpu.compile_shader(ShaderStage::Vertex, "void main() {}").unwrap();
        let fs = gpu.compile_shader(ShaderStage::Fragment, "void main() {}").unwrap();
        assert!(gpu.link_program("x", &fs, &vs).is_err());
    }

    #[test]
    fn sampling_from_render_target_is_rejected() {
        let mut gpu = HeadlessGpu::default();
        let tex = float_texture(&mut gpu, 2);
        let vs = gpu.compile_shader(ShaderStage::Vertex, "void main() {}").unwrap();
        let fs = gpu.compile_shader(ShaderStage::Fragment, "void main() {}").unwrap();
        let program = gpu.link_program("diffuse", &vs, &fs).unwrap();
        gpu.use_program(&program);
        let fb = gpu.create_framebuffer().unwrap();
        gpu.attach_color(&fb, &tex);
        gpu.bind_texture(0, Some(&tex));
        gpu.draw_quad();
        assert_eq!(gpu.feedback_loops(), 1);
    }
}
