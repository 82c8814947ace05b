//! Template-driven GLSL build pipeline with watch-mode rebuilds.
//!
//! A build scans an input folder for shader sources, preprocesses each one as a
//! template (so sources can share includes and macros), compiles and links the
//! programs listed in a program file, and renders every template of a template
//! folder against the resulting catalog of shaders, programs and uniforms.
//! In watch mode, changes to shaders or templates queue full rebuilds that run
//! one at a time on the thread owning the compiler.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use shader_forge::{MainLoop, NagaCompiler, PipelineConfig};
//! use std::sync::Arc;
//!
//! let config = PipelineConfig::load("shaders.json").expect("configuration");
//! let main_loop = MainLoop::new(Arc::new(config));
//! main_loop.watch().expect("watch folders");
//!
//! let shutdown = main_loop.shutdown_handle();
//! std::thread::spawn(move || {
//!     std::thread::sleep(std::time::Duration::from_secs(60));
//!     shutdown.request();
//! });
//!
//! main_loop
//!     .run(|| Ok(NagaCompiler::new()), |_, result| {
//!         if let Err(e) = result {
//!             eprintln!("{e}");
//!         }
//!     })
//!     .expect("compiler");
//! ```
//!
//! Configuration files are JSON:
//!
//! ```json
//! {
//!     "Input folder": "shaders",
//!     "Template folder": "templates",
//!     "Output folder": "generated",
//!     "Processed shaders folder": "generated/processed",
//!     "Program file": "programs.txt",
//!     "Vertex extensions": [".vert", ".vertex"],
//!     "Fragment extensions": [".frag", ".fragment"],
//!     "Geometry extensions": [".geom", ".geometry"]
//! }
//! ```

pub mod builder;
pub mod catalog;
pub mod compile;
pub mod config;
pub mod error;
mod glsl_compat;
pub mod main_loop;
pub mod pipeline;
pub mod programs;
pub mod queue;
pub mod template;
pub mod watcher;

pub use builder::PipelineConfigBuilder;
pub use catalog::{Program, ShaderCatalog, ShaderSource, Uniform};
pub use compile::{CompileError, CompilerOracle, NagaCompiler, UniformInfo};
pub use config::{PipelineConfig, ShaderStage, StageTable};
pub use error::{BuildError, ConfigError, OutputError, RunError, WatchError};
pub use main_loop::{MainLoop, RebuildRequest, ShutdownHandle, run_once};
pub use pipeline::{BuildReport, OutputReport, run_build};
pub use watcher::ChangeWatcher;

const DEFAULT_TEMP_SUFFIX: &str = "~";
