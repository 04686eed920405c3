//! Program compilation against a static uniform schema.

use crate::error::RipplesError;
use crate::gpu::{Gpu, ShaderStage, UniformType, UniformValue, VERTEX_ATTRIBUTE_INDEX};
use crate::shaders::{ProgramSource, COMPOSITE, DIFFUSE, PERTURB};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgramKind {
    Perturb,
    Diffuse,
    Composite,
}

impl ProgramKind {
    pub fn label(self) -> &'static str {
        match self {
            ProgramKind::Perturb => "perturb",
            ProgramKind::Diffuse => "diffuse",
            ProgramKind::Composite => "composite",
        }
    }
}

/// Every uniform any program declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformName {
    Field,
    Center,
    Radius,
    Strength,
    Delta,
    SamplerBackground,
    SamplerRipples,
    Perturbance,
    TopLeft,
    BottomRight,
    ContainerRatio,
}

impl UniformName {
    /// Identifier used in the GLSL source.
    pub fn glsl(self) -> &'static str {
        match self {
            UniformName::Field => "field",
            UniformName::Center => "center",
            UniformName::Radius => "radius",
            UniformName::Strength => "strength",
            UniformName::Delta => "delta",
            UniformName::SamplerBackground => "samplerBackground",
            UniformName::SamplerRipples => "samplerRipples",
            UniformName::Perturbance => "perturbance",
            UniformName::TopLeft => "topLeft",
            UniformName::BottomRight => "bottomRight",
            UniformName::ContainerRatio => "containerRatio",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformDecl {
    pub name: UniformName,
    pub ty: UniformType,
}

impl UniformDecl {
    pub const fn new(name: UniformName, ty: UniformType) -> Self {
        Self { name, ty }
    }
}

/// A linked program with its resolved uniform locations.
#[derive(Debug)]
pub struct ShaderProgram<G: Gpu> {
    kind: ProgramKind,
    handle: G::Program,
    uniforms: Vec<(UniformDecl, G::UniformLocation)>,
}

impl<G: Gpu> ShaderProgram<G> {
    /// Compiles, links and resolves every schema uniform.
    ///
    /// Leaves the program active with the vertex attribute enabled.
    pub fn compile(gpu: &mut G, source: &ProgramSource) -> Result<Self, RipplesError> {
        let kind = source.kind;
        let vertex = gpu
            .compile_shader(ShaderStage::Vertex, source.vertex)
            .map_err(|log| RipplesError::ShaderCompile {
                program: kind,
                stage: ShaderStage::Vertex,
                log,
            })?;
        let fragment = match gpu.compile_shader(ShaderStage::Fragment, source.fragment) {
            Ok(shader) => shader,
            Err(log) => {
                gpu.delete_shader(vertex);
                return Err(RipplesError::ShaderCompile {
                    program: kind,
                    stage: ShaderStage::Fragment,
                    log,
                });
            }
        };

        let linked = gpu.link_program(kind.label(), &vertex, &fragment);
        gpu.delete_shader(vertex);
        gpu.delete_shader(fragment);
        let handle = linked.map_err(|log| RipplesError::ShaderLink { program: kind, log })?;

        gpu.use_program(&handle);
        gpu.enable_vertex_attribute(VERTEX_ATTRIBUTE_INDEX);

        let mut uniforms = Vec::with_capacity(source.uniforms.len());
        for decl in source.uniforms {
            match gpu.uniform_location(&handle, decl.name.glsl()) {
                Some(location) => uniforms.push((*decl, location)),
                None => {
                    gpu.delete_program(&handle);
                    return Err(RipplesError::MissingUniform {
                        program: kind,
                        uniform: decl.name,
                    });
                }
            }
        }

        Ok(Self {
            kind,
            handle,
            uniforms,
        })
    }

    pub fn kind(&self) -> ProgramKind {
        self.kind
    }

    pub fn activate(&self, gpu: &mut G) {
        gpu.use_program(&self.handle);
    }

    /// Writes a uniform. The program must be active.
    pub fn set(&self, gpu: &mut G, name: UniformName, value: UniformValue) -> Result<(), RipplesError> {
        let (decl, location) = self
            .uniforms
            .iter()
            .find(|(decl, _)| decl.name == name)
            .ok_or(RipplesError::MissingUniform {
                program: self.kind,
                uniform: name,
            })?;
        if decl.ty != value.ty() {
            return Err(RipplesError::UniformType {
                program: self.kind,
                uniform: name,
                expected: decl.ty,
            });
        }
        gpu.set_uniform(location, value);
        Ok(())
    }

    pub fn release(self, gpu: &mut G) {
        gpu.delete_program(&self.handle);
    }
}

/// The three programs one instance owns.
#[derive(Debug)]
pub struct Programs<G: Gpu> {
    pub perturb: ShaderProgram<G>,
    pub diffuse: ShaderProgram<G>,
    pub composite: ShaderProgram<G>,
}

impl<G: Gpu> Programs<G> {
    /// Compiles all three programs and writes the uniforms that never change:
    /// the texel size and the sampler units.
    pub fn compile_all(gpu: &mut G, resolution: u32) -> Result<Self, RipplesError> {
        let perturb = ShaderProgram::compile(gpu, &PERTURB)?;
        let diffuse = match ShaderProgram::compile(gpu, &DIFFUSE) {
            Ok(program) => program,
            Err(err) => {
                perturb.release(gpu);
                return Err(err);
            }
        };
        let composite = match ShaderProgram::compile(gpu, &COMPOSITE) {
            Ok(program) => program,
            Err(err) => {
                perturb.release(gpu);
                diffuse.release(gpu);
                return Err(err);
            }
        };
        let programs = Self {
            perturb,
            diffuse,
            composite,
        };
        if let Err(err) = programs.write_constants(gpu, resolution) {
            programs.release(gpu);
            return Err(err);
        }
        Ok(programs)
    }

    fn write_constants(&self, gpu: &mut G, resolution: u32) -> Result<(), RipplesError> {
        let texel = 1.0 / resolution as f32;
        let delta = UniformValue::Vec2([texel, texel]);

        self.perturb.activate(gpu);
        self.perturb.set(gpu, UniformName::Field, UniformValue::Sampler(0))?;

        self.diffuse.activate(gpu);
        self.diffuse.set(gpu, UniformName::Field, UniformValue::Sampler(0))?;
        self.diffuse.set(gpu, UniformName::Delta, delta)?;

        self.composite.activate(gpu);
        self.composite
            .set(gpu, UniformName::SamplerBackground, UniformValue::Sampler(0))?;
        self.composite
            .set(gpu, UniformName::SamplerRipples, UniformValue::Sampler(1))?;
        self.composite.set(gpu, UniformName::Delta, delta)?;
        Ok(())
    }

    pub fn release(self, gpu: &mut G) {
        self.perturb.release(gpu);
        self.diffuse.release(gpu);
        self.composite.release(gpu);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::HeadlessGpu;

    #[test]
    fn compiles_all_three() {
        let mut gpu = HeadlessGpu::default();
        let programs = Programs::compile_all(&mut gpu, 64).unwrap();
        assert_eq!(programs.perturb.kind(), ProgramKind::Perturb);
        assert_eq!(programs.diffuse.kind(), ProgramKind::Diffuse);
        assert_eq!(programs.composite.kind(), ProgramKind::Composite);
        assert_eq!(gpu.misdirected_uniforms(), 0);
        programs.release(&mut gpu);
        assert_eq!(gpu.stats().live(), 0);
    }

    #[test]
    fn fragment_failure_reports_stage_and_frees_vertex() {
        let mut gpu = HeadlessGpu::default();
        let broken = ProgramSource {
            fragment: "precision highp float;",
            ..PERTURB
        };
        let err = ShaderProgram::compile(&mut gpu, &broken).unwrap_err();
        assert!(matches!(
            err,
            RipplesError::ShaderCompile {
                program: ProgramKind::Perturb,
                stage: ShaderStage::Fragment,
                ..
            }
        ));
        assert_eq!(gpu.stats().live(), 0);
    }

    #[test]
    fn schema_uniform_without_location_fails() {
        let mut gpu = HeadlessGpu::default();
        let mismatched = ProgramSource {
            uniforms: COMPOSITE.uniforms,
            ..PERTURB
        };
        let err = ShaderProgram::compile(&mut gpu, &mismatched).unwrap_err();
        assert!(matches!(err, RipplesError::MissingUniform { .. }));
        assert_eq!(gpu.stats().live(), 0);
    }

    #[test]
    fn typed_writes_are_checked() {
        let mut gpu = HeadlessGpu::default();
        let program = ShaderProgram::compile(&mut gpu, &PERTURB).unwrap();
        let err = program
            .set(&mut gpu, UniformName::Radius, UniformValue::Vec2([0.0, 0.0]))
            .unwrap_err();
        assert_eq!(
            err,
            RipplesError::UniformType {
                program: ProgramKind::Perturb,
                uniform: UniformName::Radius,
                expected: UniformType::Float,
            }
        );
        assert!(program
            .set(&mut gpu, UniformName::Perturbance, UniformValue::Float(0.1))
            .is_err());
    }
}
