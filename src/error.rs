//! Error types shared by the engine, the GPU layer and the wasm front end.

use std::fmt;

use crate::gpu::{GpuError, ShaderStage, UniformType};
use crate::program::{ProgramKind, UniformName};

/// Errors raised while constructing or driving a ripples instance.
#[derive(Debug, Clone, PartialEq)]
pub enum RipplesError {
    /// No float-renderable texture format, or no GPU context at all.
    UnsupportedPlatform(String),
    /// The target element could not be resolved.
    ElementNotFound(String),
    ShaderCompile {
        program: ProgramKind,
        stage: ShaderStage,
        log: String,
    },
    ShaderLink {
        program: ProgramKind,
        log: String,
    },
    /// A schema uniform has no location in the linked program.
    MissingUniform {
        program: ProgramKind,
        uniform: UniformName,
    },
    /// A uniform write did not match the schema type.
    UniformType {
        program: ProgramKind,
        uniform: UniformName,
        expected: UniformType,
    },
    InvalidConfig(String),
    Gpu(GpuError),
    /// A DOM or host collaborator failed.
    Host(String),
}

impl fmt::Display for RipplesError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedPlatform(why) => write!(f, "platform not supported: {why}"),
            Self::ElementNotFound(what) => write!(f, "element not found: {what}"),
            Self::ShaderCompile {
                program,
                stage,
                log,
            } => write!(
                f,
                "{} {} shader failed to compile: {log}",
                program.label(),
                stage.label()
            ),
            Self::ShaderLink { program, log } => {
                write!(f, "{} program failed to link: {log}", program.label())
            }
            Self::MissingUniform { program, uniform } => write!(
                f,
                "{} program has no uniform `{}`",
                program.label(),
                uniform.glsl()
            ),
            Self::UniformType {
                program,
                uniform,
                expected,
            } => write!(
                f,
                "{} uniform `{}` expects {expected:?}",
                program.label(),
                uniform.glsl()
            ),
            Self::InvalidConfig(msg) => write!(f, "invalid configuration: {msg}"),
            Self::Gpu(err) => write!(f, "gpu error: {err}"),
            Self::Host(msg) => write!(f, "host error: {msg}"),
        }
    }
}

impl std::error::Error for RipplesError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Gpu(err) => Some(err),
            _ => None,
        }
    }
}

impl From<GpuError> for RipplesError {
    fn from(err: GpuError) -> Self {
        Self::Gpu(err)
    }
}
