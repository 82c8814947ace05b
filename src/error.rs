use crate::compile::CompileError;
use crate::config::ShaderStage;
use std::path::PathBuf;
use thiserror::Error;

/// Failure to load a configuration file. Fatal for the process.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read configuration '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("empty suffix in the {} extension list", .stage.label())]
    EmptyExtension { stage: ShaderStage },
}

/// Error that aborts the current build. The watch loop survives all of these.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("I/O error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to preprocess shader '{file}': {source}")]
    Preprocess {
        file: String,
        #[source]
        source: minijinja::Error,
    },

    #[error("failed to write processed shader '{}': {source}", .path.display())]
    ProcessedWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}:{line}: {reason}", .path.display())]
    ProgramList {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("program '{name}' is declared more than once")]
    DuplicateProgram { name: String },

    #[error("program '{program}' references unknown shader '{shader}'")]
    UnknownShaderReference { program: String, shader: String },

    #[error("shader '{shader}' failed to compile: {source}")]
    Compile {
        shader: String,
        #[source]
        source: CompileError,
    },

    #[error("program '{program}' failed to link: {source}")]
    Link {
        program: String,
        #[source]
        source: CompileError,
    },
}

impl BuildError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BuildError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Failure producing one output file. Recorded in the report, never fatal.
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("render failed: {0}")]
    Render(#[from] minijinja::Error),

    #[error("write failed: {0}")]
    Write(#[from] std::io::Error),
}

/// Failure to subscribe to change notifications for a directory.
#[derive(Error, Debug)]
#[error("cannot watch '{}': {source}", .path.display())]
pub struct WatchError {
    pub path: PathBuf,
    #[source]
    pub source: notify::Error,
}

/// Outcome of a batch run: either the compiler context could not be acquired
/// or the build itself failed.
#[derive(Error, Debug)]
pub enum RunError {
    #[error("compiler unavailable: {0}")]
    Acquire(#[source] CompileError),

    #[error(transparent)]
    Build(#[from] BuildError),
}
