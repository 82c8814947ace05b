#![allow(dead_code)]

use parking_lot::Mutex;
use shader_forge::{CompileError, CompilerOracle, PipelineConfigBuilder, ShaderStage, UniformInfo};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::ThreadId;

// ============================================================================
// Temporary project folders
// ============================================================================

static NEXT_DIR: AtomicUsize = AtomicUsize::new(0);

/// A scratch project with `shaders/`, `templates/` and `out/` folders.
pub struct Project {
    root: PathBuf,
}

impl Project {
    pub fn new(tag: &str) -> Self {
        let root = std::env::temp_dir().join(format!(
            "shader-forge-{tag}-{}-{}",
            std::process::id(),
            NEXT_DIR.fetch_add(1, Ordering::Relaxed)
        ));
        let _ = std::fs::remove_dir_all(&root);
        std::fs::create_dir_all(root.join("shaders")).unwrap();
        std::fs::create_dir_all(root.join("templates")).unwrap();
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    pub fn write(&self, rel: &str, contents: &str) -> &Self {
        let path = self.root.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, contents).unwrap();
        self
    }

    pub fn read(&self, rel: &str) -> String {
        std::fs::read_to_string(self.root.join(rel)).unwrap()
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.root.join(rel).exists()
    }

    /// Builder with the usual `.vert`, `.frag`, `.geom` suffixes.
    pub fn config(&self) -> PipelineConfigBuilder {
        shader_forge::PipelineConfig::builder(
            self.path("shaders"),
            self.path("templates"),
            self.path("out"),
        )
        .vertex_extension(".vert")
        .fragment_extension(".frag")
        .geometry_extension(".geom")
    }
}

impl Drop for Project {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.root);
    }
}

// ============================================================================
// Recording compiler
// ============================================================================

#[derive(Debug, Default)]
pub struct CompilerLog {
    /// Sources passed to `compile`, in call order.
    pub compiled: Vec<(ShaderStage, String)>,
    /// Program name and attached sources, in call order.
    pub linked: Vec<(String, Vec<String>)>,
    pub threads: Vec<ThreadId>,
}

/// Compiler oracle that accepts everything except sources containing
/// `#error` and programs marked with [`FakeCompiler::failing_link`], and
/// reports uniforms configured per program name.
#[derive(Clone, Default)]
pub struct FakeCompiler {
    pub log: Arc<Mutex<CompilerLog>>,
    pub uniforms: HashMap<String, Vec<UniformInfo>>,
    pub failing_links: Vec<String>,
}

pub struct FakeUnit {
    source: String,
}

pub struct FakeProgram {
    name: String,
}

impl FakeCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_uniforms(mut self, program: &str, uniforms: Vec<UniformInfo>) -> Self {
        self.uniforms.insert(program.to_string(), uniforms);
        self
    }

    pub fn failing_link(mut self, program: &str) -> Self {
        self.failing_links.push(program.to_string());
        self
    }
}

impl CompilerOracle for FakeCompiler {
    type Unit = FakeUnit;
    type Linked = FakeProgram;

    fn compile(&mut self, stage: ShaderStage, source: &str) -> Result<FakeUnit, CompileError> {
        let mut log = self.log.lock();
        log.threads.push(std::thread::current().id());
        log.compiled.push((stage, source.to_string()));
        if source.contains("#error") {
            return Err(CompileError::Compile {
                stage,
                message: "0:1: #error directive".into(),
            });
        }
        Ok(FakeUnit {
            source: source.to_string(),
        })
    }

    fn link(&mut self, name: &str, units: &[&FakeUnit]) -> Result<FakeProgram, CompileError> {
        let mut log = self.log.lock();
        log.threads.push(std::thread::current().id());
        log.linked.push((
            name.to_string(),
            units.iter().map(|unit| unit.source.clone()).collect(),
        ));
        if self.failing_links.iter().any(|program| program == name) {
            return Err(CompileError::Link {
                message: "error: varying 'uv' not written by vertex shader".into(),
            });
        }
        Ok(FakeProgram {
            name: name.to_string(),
        })
    }

    fn active_uniforms(&mut self, program: &FakeProgram) -> Vec<UniformInfo> {
        self.uniforms.get(&program.name).cloned().unwrap_or_default()
    }
}
